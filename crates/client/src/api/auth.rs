//! Authentication endpoints.

use reqwest::Method;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use sole_society_core::{Email, User};

use super::{ApiClient, Body, ImageUpload, MultipartPayload, TokenResponse};
use crate::error::ApiError;

/// Plain acknowledgement returned by endpoints that carry no entity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Acknowledgement {
    #[serde(default)]
    pub message: Option<String>,
}

impl ApiClient {
    /// Start a registration. The backend emails a one-time code.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the backend rejects the registration.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn register(
        &self,
        username: &str,
        email: &Email,
        password: &SecretString,
    ) -> Result<Acknowledgement, ApiError> {
        let body = json!({
            "username": username,
            "email": email.as_str(),
            "password": password.expose_secret(),
        });
        let ack: Option<Acknowledgement> = self
            .request(Method::POST, "/auth/register", Body::Json(body))
            .await?;
        Ok(ack.unwrap_or_default())
    }

    /// Confirm a registration with the emailed code.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the code is wrong or expired.
    #[instrument(skip(self, otp), fields(email = %email))]
    pub async fn verify_registration(
        &self,
        email: &str,
        otp: &str,
    ) -> Result<Acknowledgement, ApiError> {
        let body = json!({ "email": email, "otp": otp });
        let ack: Option<Acknowledgement> = self
            .request(Method::POST, "/auth/verify-register", Body::Json(body))
            .await?;
        Ok(ack.unwrap_or_default())
    }

    /// Sign in and adopt the returned bearer token.
    ///
    /// The response body is not trusted as the user record; callers fetch
    /// [`profile`](Self::profile) afterwards.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Status` for bad credentials.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn login(&self, email: &str, password: &SecretString) -> Result<(), ApiError> {
        let body = json!({
            "email": email,
            "password": password.expose_secret(),
        });
        let response: Option<TokenResponse> = self
            .request(Method::POST, "/auth/login", Body::Json(body))
            .await?;

        if let Some(token) = response.and_then(TokenResponse::into_token) {
            self.set_token(Some(token)).await;
        }
        Ok(())
    }

    /// Fetch the signed-in user's profile.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Status` with 401 when there is no valid session.
    #[instrument(skip(self))]
    pub async fn profile(&self) -> Result<User, ApiError> {
        self.get("/auth/profile").await
    }

    /// End the session on the backend.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the backend call fails.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<(), ApiError> {
        let _: Option<Acknowledgement> = self
            .request(Method::POST, "/auth/logout", Body::Empty)
            .await?;
        Ok(())
    }

    /// Replace the profile image. Returns the updated user.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the upload is rejected.
    #[instrument(skip(self, image), fields(file = %image.file_name))]
    pub async fn upload_profile_image(&self, image: ImageUpload) -> Result<User, ApiError> {
        let payload = MultipartPayload::new().file("image", image);
        self.request(Method::PUT, "/auth/profile-image", Body::Multipart(payload))
            .await
    }

    /// Remove the profile image. Returns the updated user.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the backend call fails.
    #[instrument(skip(self))]
    pub async fn delete_profile_image(&self) -> Result<User, ApiError> {
        self.request(Method::DELETE, "/auth/profile-image", Body::Empty)
            .await
    }
}
