//! Error types for the image provider.
//!
//! Every lifecycle operation reports failures through [`ProviderError`], whose
//! variants let the calling control plane tell caller-fixable problems
//! (validation, unsupported values, malformed identities) apart from remote,
//! upload and cleanup failures. Underlying causes are always kept as sources.

use std::num::ParseIntError;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the image provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// A required input is missing or empty.
    #[error("Validation failed: {message}")]
    Validation {
        /// Description of the validation failure.
        message: String,
        /// Field that failed validation.
        field: Option<String>,
    },

    /// An enumerated input carries a value that is not recognized.
    #[error("Unsupported value for {field}: {value}")]
    UnsupportedValue {
        /// Name of the offending field.
        field: String,
        /// The value that was supplied.
        value: String,
    },

    /// The external resource identity could not be parsed.
    #[error("Invalid image ID '{id}'")]
    InvalidIdentity {
        /// The identity that was supplied.
        id: String,
        /// Parse failure.
        #[source]
        source: ParseIntError,
    },

    /// A referenced remote object does not exist.
    #[error("{resource} not found: {name}")]
    NotFound {
        /// Kind of the missing object.
        resource: String,
        /// Name or identity that was looked up.
        name: String,
    },

    /// The remote API call failed.
    #[error("Hetzner Cloud API error: {0}")]
    Remote(#[from] HcloudError),

    /// The upload collaborator failed.
    #[error("Failed to upload image: {0}")]
    Upload(#[from] UploadError),

    /// The cleanup routine of the upload collaborator failed.
    #[error("Failed to cleanup temporary resources: {0}")]
    Cleanup(#[source] UploadError),

    /// The operation observed cancellation and stopped.
    #[error("Operation cancelled")]
    Cancelled,

    /// Configuration loading errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// State storage errors.
    #[error("State error: {0}")]
    State(#[from] StateError),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file was not found.
    #[error("Configuration file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The configuration file could not be parsed.
    #[error("Failed to parse configuration: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// Environment variable is missing.
    #[error("Missing environment variable: {name}")]
    MissingEnvVar {
        /// Name of the missing variable.
        name: String,
    },
}

/// State storage errors.
#[derive(Debug, Error)]
pub enum StateError {
    /// State is corrupted.
    #[error("State is corrupted: {message}")]
    Corrupted {
        /// Description of the corruption.
        message: String,
    },

    /// Serialization error.
    #[error("State serialization error: {message}")]
    SerializationError {
        /// Description of the serialization error.
        message: String,
    },

    /// State could not be written.
    #[error("Failed to write state: {message}")]
    WriteFailed {
        /// Description of the write failure.
        message: String,
    },

    /// State version mismatch.
    #[error("State version mismatch: expected {expected}, found {found}")]
    VersionMismatch {
        /// Expected state version.
        expected: String,
        /// Found state version.
        found: String,
    },
}

/// Hetzner Cloud API errors.
#[derive(Debug, Error)]
pub enum HcloudError {
    /// The referenced object does not exist.
    #[error("{resource} not found")]
    NotFound {
        /// Path of the missing resource.
        resource: String,
    },

    /// The token was rejected.
    #[error("Hetzner Cloud authentication failed: {message}")]
    Unauthorized {
        /// Message returned by the API.
        message: String,
    },

    /// API request failed.
    #[error("Hetzner Cloud API request failed: {status} {code} - {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error code from the API body.
        code: String,
        /// Error message from the API body.
        message: String,
    },

    /// Rate limited.
    #[error("Hetzner Cloud API rate limited, retry after {retry_after_secs} seconds")]
    RateLimited {
        /// Seconds to wait before retrying.
        retry_after_secs: u64,
    },

    /// Network error.
    #[error("Network error communicating with Hetzner Cloud: {message}")]
    Network {
        /// Description of the network error.
        message: String,
    },

    /// Invalid response from API.
    #[error("Invalid response from Hetzner Cloud API: {message}")]
    InvalidResponse {
        /// Description of the response issue.
        message: String,
    },
}

/// Upload collaborator errors.
#[derive(Debug, Error)]
pub enum UploadError {
    /// The upload program could not be started.
    #[error("failed to start {program}: {source}")]
    Spawn {
        /// Program that was invoked.
        program: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The upload program exited unsuccessfully.
    #[error("{program} exited with {status}: {stderr}")]
    CommandFailed {
        /// Program that was invoked.
        program: String,
        /// Exit status description.
        status: String,
        /// Captured standard error.
        stderr: String,
    },

    /// The finished image could not be located afterwards.
    #[error("uploaded image with marker {marker} not found")]
    ImageMissing {
        /// Marker label value attached to the upload.
        marker: String,
    },

    /// A remote call made by the collaborator failed.
    #[error(transparent)]
    Remote(#[from] HcloudError),
}

/// Result type alias for provider operations.
pub type Result<T> = std::result::Result<T, ProviderError>;

impl ProviderError {
    /// Creates a validation error for a specific field.
    #[must_use]
    pub fn validation(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Creates an unsupported value error.
    #[must_use]
    pub fn unsupported(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::UnsupportedValue {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Returns true if the caller may retry the failed operation.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Remote(
                HcloudError::RateLimited { .. } | HcloudError::Network { .. }
            ) | Self::Remote(HcloudError::Api { status: 500..=599, .. })
        )
    }

    /// Returns the suggested retry delay in seconds, if applicable.
    #[must_use]
    pub const fn retry_delay_secs(&self) -> Option<u64> {
        match self {
            Self::Remote(HcloudError::RateLimited { retry_after_secs }) => Some(*retry_after_secs),
            Self::Remote(HcloudError::Network { .. } | HcloudError::Api { .. }) => Some(5),
            _ => None,
        }
    }
}

impl StateError {
    /// Creates a serialization error with the given message.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::SerializationError {
            message: message.into(),
        }
    }

    /// Creates a write error with the given message.
    #[must_use]
    pub fn write(message: impl Into<String>) -> Self {
        Self::WriteFailed {
            message: message.into(),
        }
    }
}

impl HcloudError {
    /// Creates an API request error.
    #[must_use]
    pub fn api(status: u16, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            code: code.into(),
            message: message.into(),
        }
    }

    /// Creates a network error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Returns true if the error is worth retrying at the transport level.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::Network { .. } | Self::Api { status: 500..=599, .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_remote_errors() {
        assert!(ProviderError::Remote(HcloudError::network("reset")).is_retryable());
        assert!(ProviderError::Remote(HcloudError::api(503, "unavailable", "down")).is_retryable());
        assert!(!ProviderError::Remote(HcloudError::api(422, "invalid_input", "bad")).is_retryable());
        assert!(!ProviderError::validation("credential required", "token").is_retryable());
    }

    #[test]
    fn test_unsupported_value_names_field_and_value() {
        let err = ProviderError::unsupported("architecture", "mips");
        assert_eq!(err.to_string(), "Unsupported value for architecture: mips");
    }

    #[test]
    fn test_retry_delay_from_rate_limit() {
        let err = ProviderError::Remote(HcloudError::RateLimited {
            retry_after_secs: 12,
        });
        assert_eq!(err.retry_delay_secs(), Some(12));
        assert_eq!(ProviderError::Cancelled.retry_delay_secs(), None);
    }
}
