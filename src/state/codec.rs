//! Mapping between image specs, remote images and durable state.

use crate::config::ImageSpec;
use crate::hcloud::Image;

use super::types::{ObservedState, RemoteAttributes};

/// Builds the initial state of a spec, with zero-valued remote attributes.
#[must_use]
pub fn to_state(spec: &ImageSpec) -> ObservedState {
    ObservedState {
        inputs: spec.clone(),
        remote: RemoteAttributes::default(),
    }
}

/// Overlays the attributes of a remote image onto a prior state.
///
/// Remote attributes always win; spec fields are kept from `prior`.
#[must_use]
pub fn overlay(image: &Image, prior: &ObservedState) -> ObservedState {
    ObservedState {
        inputs: prior.inputs.clone(),
        remote: remote_attributes(image),
    }
}

/// Like [`overlay`], but the supplied spec replaces the spec fields in full.
#[must_use]
pub fn overlay_with_spec(image: &Image, spec: &ImageSpec) -> ObservedState {
    ObservedState {
        inputs: spec.clone(),
        remote: remote_attributes(image),
    }
}

/// Extracts the remote-assigned attributes of an image.
#[must_use]
pub fn remote_attributes(image: &Image) -> RemoteAttributes {
    #[allow(clippy::cast_possible_truncation)]
    let disk_size = image.disk_size as i64;

    RemoteAttributes {
        image_id: image.id,
        image_name: image.name.clone().unwrap_or_default(),
        created: image.created.to_rfc3339(),
        disk_size,
        os_flavor: image.os_flavor.clone(),
        os_version: image.os_version.clone().unwrap_or_default(),
        status: image.status.to_string(),
        image_type: image.image_type.to_string(),
    }
}
