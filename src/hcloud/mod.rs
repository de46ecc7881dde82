//! Hetzner Cloud integration module.
//!
//! This module provides the remote image API client, the upload collaborator
//! wrapper and the credential-scoped connector tying both together.

mod api;
mod client;
mod connector;
mod types;
mod uploader;

use crate::error::HcloudError;

/// Result type of remote API calls.
pub type ApiResult<T> = std::result::Result<T, HcloudError>;

pub use api::ImageApi;
#[cfg(test)]
pub use api::MockImageApi;
pub use client::{HcloudClient, HCLOUD_API_URL};
pub use connector::{Connection, Connector, HcloudConnector};
pub use types::{
    Architecture, Compression, Image, ImageFormat, ImageStatus, ImageType, ImageUpdate,
    ServerType, UploadOptions,
};
#[cfg(test)]
pub use uploader::MockImageUploader;
pub use uploader::{
    upload_args, CommandUploader, ImageUploader, CLEANUP_SUCCESS_MESSAGE, UPLOAD_MARKER_LABEL,
};
