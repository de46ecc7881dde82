//! Hetzner Cloud API types and data structures.
//!
//! This module defines the types used for communication with the Hetzner
//! Cloud API and with the upload collaborator.

use chrono::{DateTime, Utc};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A Hetzner Cloud image.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Image {
    /// Unique image identifier.
    pub id: i64,
    /// Unique name, only set for system images.
    #[serde(default)]
    pub name: Option<String>,
    /// Description of the image.
    #[serde(default)]
    pub description: String,
    /// Point in time the image was created.
    pub created: DateTime<Utc>,
    /// Size of the disk contained in the image in GB.
    #[serde(default)]
    pub disk_size: f32,
    /// Flavor of the operating system.
    #[serde(default)]
    pub os_flavor: String,
    /// Operating system version.
    #[serde(default)]
    pub os_version: Option<String>,
    /// Status of the image.
    #[serde(default)]
    pub status: ImageStatus,
    /// Type of the image.
    #[serde(rename = "type", default)]
    pub image_type: ImageType,
    /// CPU architecture the image is compatible with.
    #[serde(default)]
    pub architecture: Option<Architecture>,
    /// User-defined labels.
    #[serde(default)]
    pub labels: HashMap<String, String>,
}

/// Image status.
///
/// Values the API adds later are kept verbatim in [`ImageStatus::Other`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ImageStatus {
    /// Image is ready to use.
    Available,
    /// Image is being created.
    Creating,
    /// Image creation failed or the image is otherwise unusable.
    Unavailable,
    /// Any other status, as reported.
    #[serde(untagged)]
    Other(String),
}

/// Image type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ImageType {
    /// Snapshot of a server disk.
    Snapshot,
    /// Automatic backup.
    Backup,
    /// Public system image.
    System,
    /// Application image.
    App,
    /// Image created while a snapshot or upload is in progress.
    Temporary,
    /// Any other type, as reported.
    #[serde(untagged)]
    Other(String),
}

impl Default for ImageStatus {
    fn default() -> Self {
        Self::Other(String::new())
    }
}

impl Default for ImageType {
    fn default() -> Self {
        Self::Other(String::new())
    }
}

/// A Hetzner Cloud server type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerType {
    /// Server type identifier.
    pub id: i64,
    /// Unique name, e.g. `cx22`.
    pub name: String,
    /// CPU architecture.
    #[serde(default)]
    pub architecture: Option<Architecture>,
    /// Number of cores.
    #[serde(default)]
    pub cores: u32,
    /// Disk size in GB.
    #[serde(default)]
    pub disk: u32,
}

/// CPU architecture of an image.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Architecture {
    /// `x86_64`.
    X86,
    /// `AArch64`.
    Arm,
}

/// Compression of the source image file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    /// Uncompressed.
    #[default]
    None,
    /// bzip2.
    Bz2,
    /// xz.
    Xz,
}

/// Format of the source image file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageFormat {
    /// Raw disk image.
    #[default]
    Raw,
    /// QEMU copy-on-write image.
    Qcow2,
}

/// Payload of an image update. Only description and labels are mutable.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct ImageUpdate {
    /// New description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// New labels, replacing the current set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
}

/// Fully resolved options handed to the upload collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadOptions {
    /// Location of the image file.
    pub image_url: Url,
    /// Compression of the image file.
    pub compression: Compression,
    /// Format of the image file.
    pub format: ImageFormat,
    /// Expected size in bytes.
    pub image_size: Option<i64>,
    /// CPU architecture.
    pub architecture: Architecture,
    /// Server type for the temporary server.
    pub server_type: Option<ServerType>,
    /// Description of the resulting image.
    pub description: Option<String>,
    /// Labels of the resulting image.
    pub labels: HashMap<String, String>,
}

impl Architecture {
    /// Parses a user-supplied architecture name.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "x86" => Some(Self::X86),
            "arm" => Some(Self::Arm),
            _ => None,
        }
    }

    /// Returns the API representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::X86 => "x86",
            Self::Arm => "arm",
        }
    }
}

impl Compression {
    /// Parses a user-supplied compression name. Empty means uncompressed.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "none" | "" => Some(Self::None),
            "bz2" => Some(Self::Bz2),
            "xz" => Some(Self::Xz),
            _ => None,
        }
    }

    /// Returns the representation understood by the upload program.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Bz2 => "bz2",
            Self::Xz => "xz",
        }
    }
}

impl ImageFormat {
    /// Parses a user-supplied format name. Empty means raw.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "raw" | "" => Some(Self::Raw),
            "qcow2" => Some(Self::Qcow2),
            _ => None,
        }
    }

    /// Returns the representation understood by the upload program.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Raw => "raw",
            Self::Qcow2 => "qcow2",
        }
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for ImageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Available => "available",
            Self::Creating => "creating",
            Self::Unavailable => "unavailable",
            Self::Other(raw) => raw,
        };
        f.write_str(s)
    }
}

impl fmt::Display for ImageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Snapshot => "snapshot",
            Self::Backup => "backup",
            Self::System => "system",
            Self::App => "app",
            Self::Temporary => "temporary",
            Self::Other(raw) => raw,
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_deserialize() {
        let json = r#"{
            "id": 4711,
            "name": null,
            "description": "Talos",
            "created": "2024-05-01T10:00:00+00:00",
            "disk_size": 20.0,
            "os_flavor": "unknown",
            "os_version": null,
            "status": "available",
            "type": "snapshot",
            "architecture": "arm",
            "labels": {"os": "talos"},
            "rapid_deploy": false
        }"#;
        let image: Image = serde_json::from_str(json).expect("valid image");

        assert_eq!(image.id, 4711);
        assert_eq!(image.status, ImageStatus::Available);
        assert_eq!(image.image_type, ImageType::Snapshot);
        assert_eq!(image.architecture, Some(Architecture::Arm));
        assert_eq!(image.labels.get("os").map(String::as_str), Some("talos"));
    }

    #[test]
    fn test_status_and_type_values_are_kept() {
        let json = r#"{"id": 1, "created": "2024-05-01T10:00:00Z", "status": "unavailable", "type": "temporary"}"#;
        let image: Image = serde_json::from_str(json).expect("valid image");
        assert_eq!(image.status, ImageStatus::Unavailable);
        assert_eq!(image.image_type, ImageType::Temporary);

        let json = r#"{"id": 1, "created": "2024-05-01T10:00:00Z", "status": "deprecated"}"#;
        let image: Image = serde_json::from_str(json).expect("valid image");
        assert_eq!(image.status, ImageStatus::Other(String::from("deprecated")));
        assert_eq!(image.status.to_string(), "deprecated");
        assert_eq!(image.image_type.to_string(), "");
    }

    #[test]
    fn test_parse_user_values() {
        assert_eq!(Compression::parse(""), Some(Compression::None));
        assert_eq!(Compression::parse("xz"), Some(Compression::Xz));
        assert_eq!(Compression::parse("gzip"), None);
        assert_eq!(ImageFormat::parse("qcow2"), Some(ImageFormat::Qcow2));
        assert_eq!(ImageFormat::parse("vmdk"), None);
        assert_eq!(Architecture::parse("arm"), Some(Architecture::Arm));
        assert_eq!(Architecture::parse("mips"), None);
        assert_eq!(Architecture::parse(""), None);
    }

    #[test]
    fn test_update_payload_skips_absent_fields() {
        let update = ImageUpdate {
            description: Some(String::from("new")),
            labels: None,
        };
        let json = serde_json::to_value(&update).expect("serializable");

        assert_eq!(json, serde_json::json!({ "description": "new" }));
    }
}
