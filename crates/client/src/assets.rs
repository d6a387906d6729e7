//! Image reference resolution.
//!
//! The backend stores uploads as server-relative paths (`/uploads/x.jpg`).
//! They resolve against the asset origin; absolute URLs pass through.

use url::Url;

/// Shown when a product or profile has no image.
pub const PLACEHOLDER_IMAGE: &str = "/placeholder.png";

/// Resolves image references to absolute URLs.
#[derive(Debug, Clone)]
pub struct AssetResolver {
    origin: Url,
}

impl AssetResolver {
    #[must_use]
    pub const fn new(origin: Url) -> Self {
        Self { origin }
    }

    /// Absolute URL for an image reference, or the placeholder when absent.
    #[must_use]
    pub fn resolve(&self, image: Option<&str>) -> String {
        let Some(image) = image.map(str::trim).filter(|i| !i.is_empty()) else {
            return PLACEHOLDER_IMAGE.to_string();
        };

        if image.starts_with("http://") || image.starts_with("https://") {
            return image.to_string();
        }

        format!(
            "{}/{}",
            self.origin.as_str().trim_end_matches('/'),
            image.trim_start_matches('/')
        )
    }

    /// First image of a list, resolved.
    #[must_use]
    pub fn first(&self, images: &[String]) -> String {
        self.resolve(images.first().map(String::as_str))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn resolver() -> AssetResolver {
        AssetResolver::new(Url::parse("http://localhost:5000").unwrap())
    }

    #[test]
    fn test_relative_paths_join_origin() {
        assert_eq!(
            resolver().resolve(Some("/uploads/runner.jpg")),
            "http://localhost:5000/uploads/runner.jpg"
        );
        assert_eq!(
            resolver().resolve(Some("uploads/runner.jpg")),
            "http://localhost:5000/uploads/runner.jpg"
        );
    }

    #[test]
    fn test_absolute_urls_pass_through() {
        assert_eq!(
            resolver().resolve(Some("https://cdn.example.com/a.jpg")),
            "https://cdn.example.com/a.jpg"
        );
    }

    #[test]
    fn test_missing_image_uses_placeholder() {
        assert_eq!(resolver().resolve(None), PLACEHOLDER_IMAGE);
        assert_eq!(resolver().resolve(Some("  ")), PLACEHOLDER_IMAGE);
        assert_eq!(resolver().first(&[]), PLACEHOLDER_IMAGE);
    }
}
