//! User-facing notifications.
//!
//! Every failure path ends in a notification rather than a crash. This module
//! turns errors into short messages without leaking transport details.

use std::fmt;

use crate::error::{ApiError, ClientError, GENERIC_FAILURE};

/// Message shown when the backend could not be reached at all.
pub const SERVER_UNREACHABLE: &str = "Server not responding";

/// Severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    Info,
    Success,
    Warning,
    Error,
}

/// A non-blocking message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: Level,
    pub message: String,
}

impl Notification {
    /// Informational message.
    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: Level::Info,
            message: message.into(),
        }
    }

    /// Confirmation of a completed action.
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: Level::Success,
            message: message.into(),
        }
    }

    /// Problem the user can fix (usually input).
    #[must_use]
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: Level::Warning,
            message: message.into(),
        }
    }

    /// Failed operation.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: Level::Error,
            message: message.into(),
        }
    }

    /// Notifications for an error. Validation failures yield one per problem.
    #[must_use]
    pub fn from_error(err: &ClientError) -> Vec<Self> {
        match err {
            ClientError::Validation(errors) => errors
                .iter()
                .map(|e| Self::warning(e.to_string()))
                .collect(),
            ClientError::Api(api) => vec![Self::from_api_error(api)],
            ClientError::NotAuthenticated => vec![Self::info(err.to_string())],
            ClientError::NoVariantSelected => vec![Self::warning(err.to_string())],
            _ => vec![Self::error(err.to_string())],
        }
    }

    fn from_api_error(err: &ApiError) -> Self {
        match err {
            ApiError::Status { message, .. } => Self::error(message.clone()),
            ApiError::Http(_) => Self::error(SERVER_UNREACHABLE),
            ApiError::Parse(_) => Self::error(GENERIC_FAILURE),
            ApiError::MissingCredential => Self::info(ClientError::NotAuthenticated.to_string()),
        }
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.level {
            Level::Info => "info",
            Level::Success => "ok",
            Level::Warning => "warn",
            Level::Error => "error",
        };
        write!(f, "[{tag}] {}", self.message)
    }
}

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;

    use super::*;
    use crate::validation::{ValidationError, ValidationErrors};

    #[test]
    fn test_server_message_is_surfaced() {
        let err = ClientError::Api(ApiError::Status {
            status: StatusCode::BAD_REQUEST,
            message: "Only 2 left in stock".to_string(),
        });
        assert_eq!(
            Notification::from_error(&err),
            vec![Notification::error("Only 2 left in stock")]
        );
    }

    #[test]
    fn test_validation_errors_become_warnings() {
        let err = ClientError::Validation(ValidationErrors::from(vec![
            ValidationError::Required("Address"),
            ValidationError::Required("City"),
        ]));
        let notes = Notification::from_error(&err);
        assert_eq!(notes.len(), 2);
        assert!(notes.iter().all(|n| n.level == Level::Warning));
        assert_eq!(notes[0].message, "Address is required");
    }

    #[test]
    fn test_not_authenticated_is_info() {
        let notes = Notification::from_error(&ClientError::NotAuthenticated);
        assert_eq!(notes, vec![Notification::info("Please login first")]);
    }

    #[test]
    fn test_display_tags_level() {
        assert_eq!(
            Notification::success("Added to cart!").to_string(),
            "[ok] Added to cart!"
        );
    }
}
