//! Validation of image specifications and resource files.
//!
//! The lifecycle controller uses the `require_*` checks before any remote
//! call; the `validate` entry point collects every problem of a resource file
//! for the `validate` command.

use reqwest::Url;
use tracing::debug;

use crate::error::{ProviderError, Result};
use crate::hcloud::{Architecture, Compression, ImageFormat};

use super::spec::{Credential, ImageSpec, ResourceConfig};

/// Validator for resource files.
#[derive(Debug, Default)]
pub struct ConfigValidator;

/// Validation result containing all problems found.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// List of validation errors.
    pub errors: Vec<ValidationIssue>,
    /// List of warnings (non-fatal issues).
    pub warnings: Vec<String>,
}

/// A single validation error.
#[derive(Debug)]
pub struct ValidationIssue {
    /// The field path that failed validation.
    pub field: String,
    /// The error message.
    pub message: String,
}

impl ConfigValidator {
    /// Creates a new validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Fails unless a credential is present.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an empty credential.
    pub fn require_token(token: &Credential) -> Result<()> {
        if token.is_empty() {
            return Err(ProviderError::validation("credential required", "token"));
        }
        Ok(())
    }

    /// Fails unless the spec names an architecture.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an empty architecture.
    pub fn require_architecture(spec: &ImageSpec) -> Result<()> {
        if spec.architecture.trim().is_empty() {
            return Err(ProviderError::validation(
                "architecture required",
                "architecture",
            ));
        }
        Ok(())
    }

    /// Fails unless the spec names a source URL, returning it.
    ///
    /// # Errors
    ///
    /// Returns a validation error if no source is given.
    pub fn require_source(spec: &ImageSpec) -> Result<&str> {
        spec.image_url
            .as_deref()
            .ok_or_else(|| ProviderError::validation("source required", "image_url"))
    }

    /// Validates a resource file.
    ///
    /// # Errors
    ///
    /// Returns the first error found; the full list is only available on success
    /// through the returned warnings, or via [`Self::collect`].
    pub fn validate(&self, config: &ResourceConfig) -> Result<ValidationResult> {
        let result = self.collect(config);

        if let Some(first_error) = result.errors.first() {
            return Err(ProviderError::Validation {
                message: first_error.message.clone(),
                field: Some(first_error.field.clone()),
            });
        }

        debug!("Resource file validation passed");
        Ok(result)
    }

    /// Collects all errors and warnings of a resource file.
    #[must_use]
    pub fn collect(&self, config: &ResourceConfig) -> ValidationResult {
        let mut result = ValidationResult::default();

        if config.resource.name.trim().is_empty() {
            result.error("resource.name", "Resource name cannot be empty");
        }

        if config.provider.upload_command.trim().is_empty() {
            result.error("provider.upload_command", "Upload command cannot be empty");
        }

        Self::validate_image(&config.image, &mut result);
        result
    }

    /// Validates the image specification.
    fn validate_image(spec: &ImageSpec, result: &mut ValidationResult) {
        if spec.token.is_empty() {
            result.error(
                "image.token",
                "API token is required (set it in the file or via HCLOUD_TOKEN)",
            );
        }

        let compression = spec.compression.as_deref().map(Compression::parse);
        if let (Some(value), Some(None)) = (&spec.compression, compression) {
            result.error(
                "image.compression",
                format!("Unsupported compression '{value}'. Supported: none, bz2, xz"),
            );
        }

        if let Some(value) = &spec.format
            && ImageFormat::parse(value).is_none()
        {
            result.error(
                "image.format",
                format!("Unsupported format '{value}'. Supported: raw, qcow2"),
            );
        }

        if spec.architecture.trim().is_empty() {
            result.error("image.architecture", "Architecture is required (x86 or arm)");
        } else if Architecture::parse(&spec.architecture).is_none() {
            result.error(
                "image.architecture",
                format!(
                    "Unsupported architecture '{}'. Supported: x86, arm",
                    spec.architecture
                ),
            );
        }

        match spec.image_url.as_deref() {
            None => result.error("image.image_url", "Image URL is required"),
            Some(raw) => match Url::parse(raw) {
                Err(e) => result.error("image.image_url", format!("Invalid image URL: {e}")),
                Ok(url) => {
                    if !matches!(url.scheme(), "http" | "https") {
                        result.warning(format!(
                            "Image URL uses scheme '{}', the temporary server may not be able to fetch it",
                            url.scheme()
                        ));
                    }
                    if let Some(Some(compression)) = compression {
                        Self::check_extension(url.path(), compression, result);
                    }
                }
            },
        }

        if let Some(size) = spec.image_size
            && size <= 0
        {
            result.error("image.image_size", "Image size must be positive");
        }

        if spec.server_type.as_deref().is_some_and(|s| s.trim().is_empty()) {
            result.error("image.server_type", "Server type cannot be empty when set");
        }

        for key in spec.labels.keys() {
            if key.is_empty() {
                result.error("image.labels", "Label keys cannot be empty");
            }
        }
    }

    /// Warns when the file extension hints at a different compression.
    fn check_extension(path: &str, compression: Compression, result: &mut ValidationResult) {
        let hinted = if path.ends_with(".xz") {
            Some(Compression::Xz)
        } else if path.ends_with(".bz2") {
            Some(Compression::Bz2)
        } else {
            None
        };

        match hinted {
            Some(hint) if hint != compression => result.warning(format!(
                "Image URL ends with .{} but compression is '{}'",
                hint.as_str(),
                compression.as_str()
            )),
            None if compression != Compression::None => result.warning(format!(
                "Compression is '{}' but the image URL has no matching extension",
                compression.as_str()
            )),
            _ => {}
        }
    }
}

impl ValidationResult {
    /// Returns true if no errors were found.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(ValidationIssue {
            field: field.to_string(),
            message: message.into(),
        });
    }

    fn warning(&mut self, message: String) {
        self.warnings.push(message);
    }
}
