//! Client-side form validation.
//!
//! Forms are checked before any request is made. Sign-up and sign-in stop at
//! the first problem (one message at a time); the admin product form and the
//! shipping form report every problem at once.

use std::fmt;

use rust_decimal::Decimal;
use thiserror::Error;

use sole_society_core::{Email, Price, ShippingAddress, Variant};

use crate::api::ImageUpload;

/// Minimum password length accepted at sign-up.
pub const MIN_PASSWORD_LENGTH: usize = 6;
/// Minimum product name length accepted by the admin form.
pub const MIN_PRODUCT_NAME_LENGTH: usize = 3;

/// A single validation problem.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    Required(&'static str),
    #[error("All fields are required")]
    AllFieldsRequired,
    #[error("Enter a valid email address")]
    InvalidEmail,
    #[error("Password must be at least {min} characters")]
    PasswordTooShort { min: usize },
    #[error("Passwords do not match")]
    PasswordMismatch,
    #[error("Product name must be at least {min} characters")]
    NameTooShort { min: usize },
    #[error("Price must be greater than 0")]
    NonPositivePrice,
    #[error("Original price cannot be less than selling price")]
    OriginalBelowPrice,
    #[error("Discount must be between 0 and 100")]
    DiscountOutOfRange,
    #[error("At least one product image is required")]
    MissingImage,
    #[error("At least one variant is required")]
    NoVariants,
    #[error("Variant {0}: Size is required")]
    VariantSize(usize),
    #[error("Variant {0}: Color is required")]
    VariantColor(usize),
    #[error("Variant {0}: Stock cannot be negative")]
    NegativeStock(usize),
    #[error("Rating must be between 1 and 5")]
    RatingOutOfRange,
}

/// One or more validation problems.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationErrors(Vec<ValidationError>);

impl ValidationErrors {
    /// Iterate over the problems in report order.
    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.0.iter()
    }

    /// Number of problems.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no problems.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `Ok(())` when empty, otherwise `Err(self)`.
    ///
    /// # Errors
    ///
    /// Returns the collected problems when there is at least one.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl From<Vec<ValidationError>> for ValidationErrors {
    fn from(errors: Vec<ValidationError>) -> Self {
        Self(errors)
    }
}

impl From<ValidationError> for ValidationErrors {
    fn from(error: ValidationError) -> Self {
        Self(vec![error])
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        f.write_str(&messages.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

// =============================================================================
// Account Forms
// =============================================================================

/// Sign-up form.
#[derive(Debug, Clone, Default)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl RegisterForm {
    /// Check the form, stopping at the first problem.
    ///
    /// # Errors
    ///
    /// Returns the first problem found, returning the parsed email otherwise.
    pub fn validate(&self) -> Result<Email, ValidationErrors> {
        if [
            &self.username,
            &self.email,
            &self.password,
            &self.confirm_password,
        ]
        .iter()
        .any(|field| field.is_empty())
        {
            return Err(ValidationError::AllFieldsRequired.into());
        }

        let email = Email::parse(&self.email).map_err(|_| ValidationError::InvalidEmail)?;

        if self.password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(ValidationError::PasswordTooShort {
                min: MIN_PASSWORD_LENGTH,
            }
            .into());
        }

        if self.password != self.confirm_password {
            return Err(ValidationError::PasswordMismatch.into());
        }

        Ok(email)
    }
}

/// Sign-in form.
#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    /// Check the form, stopping at the first problem.
    ///
    /// Only an `@` is required of the email; sign-up rules do not apply.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        if self.email.trim().is_empty() || self.password.trim().is_empty() {
            return Err(ValidationError::AllFieldsRequired.into());
        }
        if !self.email.contains('@') {
            return Err(ValidationError::InvalidEmail.into());
        }
        Ok(())
    }
}

// =============================================================================
// Checkout
// =============================================================================

/// Check a shipping address. Blank-after-trim fields are reported together.
///
/// # Errors
///
/// Returns every missing field.
pub fn validate_shipping(address: &ShippingAddress) -> Result<(), ValidationErrors> {
    let fields = [
        ("Address", &address.address),
        ("City", &address.city),
        ("Postal code", &address.postal_code),
        ("Country", &address.country),
    ];
    ValidationErrors::from(
        fields
            .into_iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| ValidationError::Required(name))
            .collect::<Vec<_>>(),
    )
    .into_result()
}

// =============================================================================
// Reviews
// =============================================================================

/// Review form.
#[derive(Debug, Clone, Default)]
pub struct ReviewForm {
    pub rating: u8,
    pub comment: String,
}

impl ReviewForm {
    /// Check rating range and comment presence.
    ///
    /// # Errors
    ///
    /// Returns every problem found.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = Vec::new();
        if !(1..=5).contains(&self.rating) {
            errors.push(ValidationError::RatingOutOfRange);
        }
        if self.comment.trim().is_empty() {
            errors.push(ValidationError::Required("Comment"));
        }
        ValidationErrors::from(errors).into_result()
    }
}

// =============================================================================
// Admin Product Form
// =============================================================================

/// One variant row in the admin form. Stock is signed here so that a negative
/// entry can be reported instead of silently clamped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariantInput {
    pub size: String,
    pub color: String,
    pub stock: i64,
}

/// Admin create/update product form.
#[derive(Debug, Clone, Default)]
pub struct ProductForm {
    pub name: String,
    pub brand: String,
    pub category: String,
    pub kind: String,
    pub description: String,
    pub price: Decimal,
    pub original_price: Option<Decimal>,
    pub discount: Decimal,
    pub variants: Vec<VariantInput>,
    pub images: Vec<ImageUpload>,
    pub is_featured: bool,
    pub is_new_arrival: bool,
}

impl ProductForm {
    /// Check every rule and collect all problems.
    ///
    /// New products must carry at least one image; updates may keep the
    /// existing ones.
    ///
    /// # Errors
    ///
    /// Returns every problem found.
    pub fn validate(&self, creating: bool) -> Result<(), ValidationErrors> {
        let mut errors = Vec::new();

        if self.name.trim().chars().count() < MIN_PRODUCT_NAME_LENGTH {
            errors.push(ValidationError::NameTooShort {
                min: MIN_PRODUCT_NAME_LENGTH,
            });
        }
        if self.price <= Decimal::ZERO {
            errors.push(ValidationError::NonPositivePrice);
        }
        if self
            .original_price
            .is_some_and(|original| original < self.price)
        {
            errors.push(ValidationError::OriginalBelowPrice);
        }
        if !(Decimal::ZERO..=Decimal::ONE_HUNDRED).contains(&self.discount) {
            errors.push(ValidationError::DiscountOutOfRange);
        }
        if creating && self.images.is_empty() {
            errors.push(ValidationError::MissingImage);
        }
        if self.variants.is_empty() {
            errors.push(ValidationError::NoVariants);
        }
        for (index, variant) in self.variants.iter().enumerate() {
            let row = index + 1;
            if variant.size.trim().is_empty() {
                errors.push(ValidationError::VariantSize(row));
            }
            if variant.color.trim().is_empty() {
                errors.push(ValidationError::VariantColor(row));
            }
            if variant.stock < 0 {
                errors.push(ValidationError::NegativeStock(row));
            }
        }

        ValidationErrors::from(errors).into_result()
    }

    /// Selling price after the discount, floored at zero.
    #[must_use]
    pub fn final_price(&self) -> Price {
        Price::new(self.price).discounted(self.discount)
    }

    /// Variants as sent to the backend. Call after [`validate`](Self::validate).
    #[must_use]
    pub fn wire_variants(&self) -> Vec<Variant> {
        self.variants
            .iter()
            .map(|v| {
                Variant::new(
                    v.size.trim(),
                    v.color.trim(),
                    u32::try_from(v.stock.max(0)).unwrap_or(u32::MAX),
                )
            })
            .collect()
    }
}
