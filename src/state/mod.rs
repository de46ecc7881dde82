//! State management module for the image provider.
//!
//! This module holds the durable record of an uploaded image, the mapping
//! between specs, remote images and that record, and the local store the
//! CLI persists it in.

mod codec;
mod local;
mod store;
mod types;

pub use codec::{overlay, overlay_with_spec, remote_attributes, to_state};
pub use local::{LocalStateStore, STATE_DIR};
pub use store::StateStore;
pub use types::{ObservedState, RemoteAttributes, ResourceRecord, StateFile, STATE_VERSION};
