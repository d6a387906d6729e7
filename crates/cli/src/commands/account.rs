//! Sign-in, registration and profile commands.

use std::path::Path;

use sole_society_client::validation::{LoginForm, RegisterForm};
use sole_society_client::{Notification, Storefront};

use super::{CliError, read_image};
use crate::output;

/// `sole login`
pub async fn login(storefront: &Storefront, email: String, password: String) -> Result<(), CliError> {
    let user = storefront.login(&LoginForm { email, password }).await?;
    output::notify(&Notification::success(format!("Welcome back, {}!", user.username)));
    Ok(())
}

/// `sole logout`
pub async fn logout(storefront: &Storefront) -> Result<(), CliError> {
    storefront.logout().await?;
    output::notify(&Notification::success("Logged out"));
    Ok(())
}

/// `sole whoami`
pub fn whoami(storefront: &Storefront) {
    match storefront.session().user() {
        Some(user) => {
            output::line(format_args!("{} <{}> ({})", user.username, user.email, user.role));
            output::line(format_args!(
                "Avatar: {}",
                storefront.assets().resolve(user.profile_image.as_deref())
            ));
        }
        None => output::notify(&Notification::info("Not signed in")),
    }
}

/// `sole register`
pub async fn register(
    storefront: &Storefront,
    username: String,
    email: String,
    password: String,
    confirm_password: String,
) -> Result<(), CliError> {
    let form = RegisterForm {
        username,
        email,
        password,
        confirm_password,
    };
    let ack = storefront.register(&form).await?;
    output::notify(&Notification::success(ack.message.unwrap_or_else(|| {
        "Verification code sent. Run `sole verify` to finish.".to_string()
    })));
    Ok(())
}

/// `sole verify`
pub async fn verify(storefront: &Storefront, email: &str, otp: &str) -> Result<(), CliError> {
    let ack = storefront.verify_registration(email, otp).await?;
    output::notify(&Notification::success(
        ack.message
            .unwrap_or_else(|| "Account verified. You can now log in.".to_string()),
    ));
    Ok(())
}

/// `sole profile-image set <path>`
pub async fn set_profile_image(storefront: &Storefront, path: &Path) -> Result<(), CliError> {
    let image = read_image(path).await?;
    let user = storefront.upload_profile_image(image).await?;
    output::notify(&Notification::success(format!(
        "Profile image updated: {}",
        storefront.assets().resolve(user.profile_image.as_deref())
    )));
    Ok(())
}

/// `sole profile-image remove`
pub async fn remove_profile_image(storefront: &Storefront) -> Result<(), CliError> {
    storefront.delete_profile_image().await?;
    output::notify(&Notification::success("Profile image removed"));
    Ok(())
}
