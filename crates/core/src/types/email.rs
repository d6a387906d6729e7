//! Email address accepted at sign-up.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Why a sign-up email was refused.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EmailError {
    #[error("email cannot be empty")]
    Empty,
    #[error("email must be at most {max} characters")]
    TooLong { max: usize },
    #[error("email cannot contain spaces")]
    Whitespace,
    #[error("email must contain an @ symbol")]
    MissingAtSymbol,
    #[error("email needs a name before the @")]
    EmptyLocalPart,
    /// `user@localhost`, `user@host.` and similar.
    #[error("email domain must look like name.tld")]
    InvalidDomain,
}

/// A trimmed address of the form `name@domain.tld` with no whitespace.
///
/// Sign-in does not require this type; accounts are looked up by whatever
/// the backend stored.
///
/// ```
/// use sole_society_core::Email;
///
/// assert_eq!(Email::parse(" asha@example.com ").unwrap().as_str(), "asha@example.com");
/// assert!(Email::parse("asha@localhost").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Email(String);

impl Email {
    /// RFC 5321 limit.
    pub const MAX_LENGTH: usize = 254;

    /// Trim and check an address.
    ///
    /// # Errors
    ///
    /// Returns the first rule the trimmed input breaks.
    pub fn parse(input: &str) -> Result<Self, EmailError> {
        let address = input.trim();

        if address.is_empty() {
            return Err(EmailError::Empty);
        }
        if address.len() > Self::MAX_LENGTH {
            return Err(EmailError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        if address.chars().any(char::is_whitespace) {
            return Err(EmailError::Whitespace);
        }

        let (local, domain) = address
            .rsplit_once('@')
            .ok_or(EmailError::MissingAtSymbol)?;
        if local.is_empty() {
            return Err(EmailError::EmptyLocalPart);
        }
        let dotted = domain
            .rsplit_once('.')
            .is_some_and(|(name, tld)| !name.is_empty() && !tld.is_empty());
        if !dotted {
            return Err(EmailError::InvalidDomain);
        }

        Ok(Self(address.to_owned()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
