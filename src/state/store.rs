//! State store trait definition.
//!
//! This module defines the common interface for state storage backends.

use async_trait::async_trait;

use crate::error::Result;
use super::types::ResourceRecord;

/// Trait for state storage backends.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Loads the record of a resource.
    ///
    /// Returns `None` if the resource has no record yet.
    async fn load(&self, name: &str) -> Result<Option<ResourceRecord>>;

    /// Saves a record, replacing any previous record of the same name.
    async fn save(&self, record: &ResourceRecord) -> Result<()>;

    /// Removes the record of a resource.
    ///
    /// Returns true if a record existed.
    async fn remove(&self, name: &str) -> Result<bool>;

    /// Lists all records.
    async fn list(&self) -> Result<Vec<ResourceRecord>>;

    /// Gets the backend type name.
    fn backend_type(&self) -> &'static str;
}

#[async_trait]
impl StateStore for Box<dyn StateStore> {
    async fn load(&self, name: &str) -> Result<Option<ResourceRecord>> {
        (**self).load(name).await
    }

    async fn save(&self, record: &ResourceRecord) -> Result<()> {
        (**self).save(record).await
    }

    async fn remove(&self, name: &str) -> Result<bool> {
        (**self).remove(name).await
    }

    async fn list(&self) -> Result<Vec<ResourceRecord>> {
        (**self).list().await
    }

    fn backend_type(&self) -> &'static str {
        (**self).backend_type()
    }
}
