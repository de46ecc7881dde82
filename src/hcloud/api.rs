//! Remote image API abstraction.
//!
//! The lifecycle controller only talks to the remote service through this
//! trait, so it can be exercised without a running API.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use super::types::{Image, ImageUpdate, ServerType};
use super::ApiResult;

/// Operations of the remote cloud API used by the provider.
///
/// Every method distinguishes "not found" from other failures: lookups return
/// `Ok(None)`, mutations return [`crate::error::HcloudError::NotFound`].
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ImageApi: Send + Sync {
    /// Looks up a server type by its unique name.
    async fn get_server_type_by_name(&self, name: &str) -> ApiResult<Option<ServerType>>;

    /// Fetches an image by its identity.
    async fn get_image_by_id(&self, id: i64) -> ApiResult<Option<Image>>;

    /// Replaces description and labels of an image.
    async fn update_image(&self, id: i64, update: &ImageUpdate) -> ApiResult<Image>;

    /// Deletes an image.
    async fn delete_image(&self, id: i64) -> ApiResult<()>;

    /// Lists snapshot images matching a label selector.
    async fn list_images(&self, label_selector: &str) -> ApiResult<Vec<Image>>;
}
