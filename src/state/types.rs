//! State types for tracking uploaded images.
//!
//! [`ObservedState`] is the durable record of one image: the spec that was
//! in effect at the last write plus the attributes assigned by the remote
//! service. [`StateFile`] is the on-disk layout used by the local store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::ImageSpec;

/// Current version of the state format.
pub const STATE_VERSION: &str = "1.0";

/// Durable state of one image resource.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ObservedState {
    /// Spec fields in effect at the last write.
    #[serde(flatten)]
    pub inputs: ImageSpec,
    /// Attributes assigned by the remote service.
    #[serde(flatten)]
    pub remote: RemoteAttributes,
}

/// Read-only attributes assigned by the remote service.
///
/// All fields are zero-valued until the image exists.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RemoteAttributes {
    /// Remote image identity.
    pub image_id: i64,
    /// Image name.
    pub image_name: String,
    /// Creation timestamp (RFC 3339).
    pub created: String,
    /// Disk size in GB.
    pub disk_size: i64,
    /// Operating system flavor.
    pub os_flavor: String,
    /// Operating system version.
    pub os_version: String,
    /// Image status.
    pub status: String,
    /// Image type.
    pub image_type: String,
}

/// A stored resource: identity, name and last observed state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResourceRecord {
    /// External identity returned by create.
    pub id: String,
    /// Logical resource name.
    pub name: String,
    /// Last observed state.
    pub state: ObservedState,
    /// When the record was last written.
    pub updated_at: DateTime<Utc>,
}

/// Layout of the local state file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateFile {
    /// State format version.
    pub version: String,
    /// Records keyed by resource name.
    #[serde(default)]
    pub resources: BTreeMap<String, ResourceRecord>,
}

impl ObservedState {
    /// Returns true once a remote image has been recorded.
    #[must_use]
    pub const fn is_created(&self) -> bool {
        self.remote.image_id != 0
    }
}

impl ResourceRecord {
    /// Creates a record stamped with the current time.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, state: ObservedState) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            state,
            updated_at: Utc::now(),
        }
    }
}

impl Default for StateFile {
    fn default() -> Self {
        Self {
            version: STATE_VERSION.to_string(),
            resources: BTreeMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_serializes_flat() {
        let mut state = ObservedState {
            inputs: ImageSpec::new("t", "https://example.com/a.raw", "x86"),
            remote: RemoteAttributes::default(),
        };
        state.remote.image_id = 42;

        let json = serde_json::to_value(&state).expect("serializable");

        assert_eq!(json["image_id"], 42);
        assert_eq!(json["architecture"], "x86");
        assert_eq!(json["token"], "t");
    }

    #[test]
    fn test_state_roundtrip() {
        let mut state = ObservedState::default();
        state.inputs = ImageSpec::new("t", "https://example.com/a.raw", "arm");
        state.inputs.labels.insert(String::from("os"), String::from("talos"));
        state.remote.image_id = 7;
        state.remote.status = String::from("available");

        let json = serde_json::to_string(&state).expect("serializable");
        let parsed: ObservedState = serde_json::from_str(&json).expect("deserializable");

        assert_eq!(parsed, state);
        assert!(parsed.is_created());
    }
}
