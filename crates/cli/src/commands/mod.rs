//! Command implementations.

pub mod account;
pub mod admin;
pub mod cart;
pub mod catalog;
pub mod orders;

use std::path::{Path, PathBuf};

use thiserror::Error;

use sole_society_client::{ClientError, ImageUpload, Notification};

/// Errors a command can end with.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Client(#[from] ClientError),

    /// A local file named on the command line could not be read.
    #[error("Cannot read {}: {source}", path.display())]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl CliError {
    /// Notifications to show for this error.
    #[must_use]
    pub fn notifications(&self) -> Vec<Notification> {
        match self {
            Self::Client(e) => Notification::from_error(e),
            Self::ReadFile { .. } => vec![Notification::error(self.to_string())],
        }
    }
}

/// Read an image file for upload.
async fn read_image(path: &Path) -> Result<ImageUpload, CliError> {
    ImageUpload::from_path(path)
        .await
        .map_err(|source| CliError::ReadFile {
            path: path.to_path_buf(),
            source,
        })
}
