//! Credential-scoped construction of remote collaborators.
//!
//! Each lifecycle operation connects with the credential it was given, so
//! nothing credential-bound outlives a single call.

use std::sync::Arc;
use tracing::debug;

use crate::config::{Credential, ProviderSettings};
use crate::error::Result;

use super::api::ImageApi;
use super::client::HcloudClient;
use super::uploader::{CommandUploader, ImageUploader};

/// A remote API handle and an uploader bound to one credential.
pub struct Connection {
    /// Remote image API.
    pub api: Arc<dyn ImageApi>,
    /// Upload collaborator.
    pub uploader: Arc<dyn ImageUploader>,
}

/// Factory for credential-scoped connections.
pub trait Connector: Send + Sync {
    /// Connects to the remote service with the given credential.
    ///
    /// # Errors
    ///
    /// Returns an error if the client cannot be constructed.
    fn connect(&self, token: &Credential) -> Result<Connection>;
}

/// Connector for the real Hetzner Cloud API and upload program.
#[derive(Debug, Clone, Default)]
pub struct HcloudConnector {
    /// Endpoint, timeout and upload program settings.
    settings: ProviderSettings,
}

impl HcloudConnector {
    /// Creates a connector from provider settings.
    #[must_use]
    pub const fn new(settings: ProviderSettings) -> Self {
        Self { settings }
    }
}

impl Connector for HcloudConnector {
    fn connect(&self, token: &Credential) -> Result<Connection> {
        debug!("Connecting to {}", self.settings.endpoint);

        let client = Arc::new(HcloudClient::with_endpoint(
            token,
            &self.settings.endpoint,
            self.settings.timeout_secs,
        )?);
        let uploader = CommandUploader::new(
            self.settings.upload_command.clone(),
            token.clone(),
            client.clone(),
        );

        Ok(Connection {
            api: client,
            uploader: Arc::new(uploader),
        })
    }
}
