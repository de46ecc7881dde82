//! Configuration specification types for the image provider.
//!
//! This module defines the desired specification of one uploaded image and
//! the structs that map to the `hcloud-image.yaml` resource file.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Default compression of the source image.
pub const DEFAULT_COMPRESSION: &str = "none";

/// Default format of the source image.
pub const DEFAULT_FORMAT: &str = "raw";

/// Root structure of a resource file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResourceConfig {
    /// Resource identification.
    pub resource: ResourceMeta,
    /// State storage configuration.
    #[serde(default)]
    pub state: StateConfig,
    /// Provider connection settings.
    #[serde(default)]
    pub provider: ProviderSettings,
    /// Desired image specification.
    pub image: ImageSpec,
}

/// Resource identification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResourceMeta {
    /// Logical name of the resource.
    pub name: String,
}

/// Local state storage configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StateConfig {
    /// Directory holding the state file.
    #[serde(default)]
    pub path: Option<String>,
}

/// Settings for reaching the remote API and the upload program.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProviderSettings {
    /// Base URL of the Hetzner Cloud API.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Program performing the actual image upload.
    #[serde(default = "default_upload_command")]
    pub upload_command: String,
    /// Request timeout for API calls.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// API token used for every remote call.
///
/// The wrapped value never shows up in `Debug` output.
#[derive(Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Credential(String);

/// Desired specification of one uploaded image.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImageSpec {
    /// Hetzner Cloud API token.
    #[serde(default)]
    pub token: Credential,
    /// URL the image is downloaded from.
    #[serde(default)]
    pub image_url: Option<String>,
    /// Compression of the image file (`none`, `bz2`, `xz`).
    #[serde(default = "default_compression")]
    pub compression: Option<String>,
    /// Format of the image file (`raw`, `qcow2`).
    #[serde(default = "default_format")]
    pub format: Option<String>,
    /// Expected image size in bytes, checked against the temporary server disk.
    #[serde(default)]
    pub image_size: Option<i64>,
    /// CPU architecture of the image (`x86`, `arm`).
    #[serde(default)]
    pub architecture: String,
    /// Server type used for the temporary upload server.
    #[serde(default)]
    pub server_type: Option<String>,
    /// Description of the resulting image.
    #[serde(default)]
    pub description: Option<String>,
    /// Labels of the resulting image.
    #[serde(default)]
    pub labels: HashMap<String, String>,
}

fn default_endpoint() -> String {
    String::from("https://api.hetzner.cloud/v1")
}

fn default_upload_command() -> String {
    String::from("hcloud-upload-image")
}

const fn default_timeout_secs() -> u64 {
    30
}

#[allow(clippy::unnecessary_wraps)]
fn default_compression() -> Option<String> {
    Some(String::from(DEFAULT_COMPRESSION))
}

#[allow(clippy::unnecessary_wraps)]
fn default_format() -> Option<String> {
    Some(String::from(DEFAULT_FORMAT))
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            upload_command: default_upload_command(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Credential {
    /// Wraps a raw token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the raw token for use in an authorization header.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Returns true if no token was supplied.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            write!(f, "Credential(<empty>)")
        } else {
            write!(f, "Credential(<redacted>)")
        }
    }
}

impl ImageSpec {
    /// Creates a spec with the required fields and defaults for the rest.
    #[must_use]
    pub fn new(token: impl Into<String>, image_url: impl Into<String>, architecture: impl Into<String>) -> Self {
        Self {
            token: Credential::new(token),
            image_url: Some(image_url.into()),
            compression: default_compression(),
            format: default_format(),
            architecture: architecture.into(),
            ..Self::default()
        }
    }

    /// Returns the labels sorted by key.
    #[must_use]
    pub fn sorted_labels(&self) -> Vec<(&str, &str)> {
        let mut labels: Vec<_> = self
            .labels
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        labels.sort_unstable();
        labels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_debug_is_redacted() {
        let spec = ImageSpec::new("super-secret", "https://example.com/a.raw", "x86");
        let rendered = format!("{spec:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_defaults_applied_when_absent() {
        let spec: ImageSpec = serde_yaml::from_str("architecture: arm\n").expect("valid yaml");
        assert_eq!(spec.compression.as_deref(), Some("none"));
        assert_eq!(spec.format.as_deref(), Some("raw"));
        assert!(spec.image_url.is_none());
        assert!(spec.token.is_empty());
        assert!(spec.labels.is_empty());
    }

    #[test]
    fn test_sorted_labels() {
        let mut spec = ImageSpec::new("t", "https://example.com/a.raw", "x86");
        spec.labels.insert(String::from("b"), String::from("2"));
        spec.labels.insert(String::from("a"), String::from("1"));
        assert_eq!(spec.sorted_labels(), vec![("a", "1"), ("b", "2")]);
    }
}
