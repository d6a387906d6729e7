//! Request bodies.
//!
//! A multipart form is consumed when sent, so it cannot be replayed after a
//! session refresh. [`MultipartPayload`] keeps the parts as plain data and
//! builds a fresh form for every attempt.

use std::fmt;
use std::path::Path;

use reqwest::multipart::{Form, Part};
use serde::Serialize;

use crate::error::ApiError;

/// Body of an API request.
#[derive(Debug, Clone)]
pub enum Body {
    /// No body.
    Empty,
    /// JSON body, sent with `Content-Type: application/json`.
    Json(serde_json::Value),
    /// Multipart form, sent as-is.
    Multipart(MultipartPayload),
}

impl Body {
    /// Serialize a value into a JSON body.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Parse` if the value cannot be represented as JSON.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, ApiError> {
        Ok(Self::Json(serde_json::to_value(value)?))
    }
}

/// An image file ready to upload.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    /// Create an upload from bytes already in memory.
    #[must_use]
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    /// Read an image from disk, inferring its content type from the extension.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the file cannot be read.
    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map_or_else(|| "image".to_string(), |n| n.to_string_lossy().into_owned());
        Ok(Self::new(file_name, content_type_for(path), bytes))
    }
}

impl fmt::Debug for ImageUpload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageUpload")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

fn content_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("jpg" | "jpeg") => "image/jpeg",
        _ => "application/octet-stream",
    }
}

/// Replayable multipart form contents.
#[derive(Debug, Clone, Default)]
pub struct MultipartPayload {
    fields: Vec<(String, String)>,
    files: Vec<(String, ImageUpload)>,
}

impl MultipartPayload {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a text field.
    #[must_use]
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    /// Add a file part.
    #[must_use]
    pub fn file(mut self, name: impl Into<String>, upload: ImageUpload) -> Self {
        self.files.push((name.into(), upload));
        self
    }

    /// Value of the first text field with this name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Number of file parts.
    #[must_use]
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Build a fresh form for one send attempt.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Http` if a content type is not a valid MIME string.
    pub fn to_form(&self) -> Result<Form, ApiError> {
        let mut form = Form::new();
        for (name, value) in &self.fields {
            form = form.text(name.clone(), value.clone());
        }
        for (name, upload) in &self.files {
            let part = Part::bytes(upload.bytes.clone())
                .file_name(upload.file_name.clone())
                .mime_str(&upload.content_type)?;
            form = form.part(name.clone(), part);
        }
        Ok(form)
    }
}
