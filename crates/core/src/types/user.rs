//! Authenticated user.

use secrecy::SecretString;
use serde::{Deserialize, Deserializer, Serialize};

use super::id::UserId;
use super::status::Role;

/// A user as returned by `/auth/login` and `/auth/profile`.
///
/// The bearer token is only present on login/refresh responses. It is never
/// serialized back out; persistence stores it separately and explicitly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: UserId,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub role: Role,
    /// Server-relative path of the avatar image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_image: Option<String>,
    #[serde(default, skip_serializing, deserialize_with = "deserialize_token")]
    pub token: Option<SecretString>,
}

fn deserialize_token<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?
        .filter(|token| !token.is_empty())
        .map(SecretString::from))
}

impl User {
    /// Whether the user may use admin endpoints.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Adopt a freshly fetched profile while keeping the credential this
    /// client already holds (profile responses omit the token).
    #[must_use]
    pub fn with_profile(self, profile: Self) -> Self {
        Self {
            token: profile.token.or(self.token),
            ..profile
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    #[test]
    fn test_deserialize_login_response() {
        let json = r#"{
            "_id": "u1",
            "username": "asha",
            "email": "asha@example.com",
            "role": "user",
            "token": "tok-123"
        }"#;
        let user: User = serde_json::from_str(json).unwrap();
        assert_eq!(user.id.as_str(), "u1");
        assert_eq!(user.role, Role::Customer);
        assert_eq!(user.token.unwrap().expose_secret(), "tok-123");
    }

    #[test]
    fn test_token_is_never_serialized() {
        let user: User = serde_json::from_str(
            r#"{"_id":"u1","username":"a","email":"a@b.c","token":"secret"}"#,
        )
        .unwrap();
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secret"));
    }

    #[test]
    fn test_with_profile_keeps_existing_token() {
        let stored: User = serde_json::from_str(
            r#"{"_id":"u1","username":"old","email":"a@b.c","token":"tok"}"#,
        )
        .unwrap();
        let profile: User = serde_json::from_str(
            r#"{"_id":"u1","username":"new","email":"a@b.c","role":"admin"}"#,
        )
        .unwrap();

        let merged = stored.with_profile(profile);
        assert_eq!(merged.username, "new");
        assert!(merged.is_admin());
        assert_eq!(merged.token.unwrap().expose_secret(), "tok");
    }
}
