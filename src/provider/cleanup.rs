//! Cleanup of temporary resources left behind by interrupted uploads.

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::{ConfigValidator, Credential};
use crate::error::{ProviderError, Result};
use crate::hcloud::Connector;

use super::cancellable;
use super::lifecycle::ImageProvider;

/// Outcome of a cleanup run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleanupOutcome {
    /// Message reported by the upload collaborator.
    pub message: String,
}

impl<C: Connector> ImageProvider<C> {
    /// Asks the upload collaborator to remove leftover temporary resources.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a missing credential and
    /// [`ProviderError::Cleanup`] if the collaborator fails.
    pub async fn cleanup(
        &self,
        token: &Credential,
        cancel: &CancellationToken,
    ) -> Result<CleanupOutcome> {
        ConfigValidator::require_token(token)?;

        let connection = self.connector.connect(token)?;
        info!("Cleaning up temporary upload resources");

        let message = cancellable(cancel, async {
            connection
                .uploader
                .cleanup_temp_resources()
                .await
                .map_err(ProviderError::Cleanup)
        })
        .await?;

        info!("{message}");
        Ok(CleanupOutcome { message })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UploadError;
    use crate::hcloud::{MockImageApi, MockImageUploader, CLEANUP_SUCCESS_MESSAGE};
    use crate::provider::lifecycle::tests::TestConnector;

    #[tokio::test]
    async fn test_cleanup_requires_credential() {
        let provider = ImageProvider::new(TestConnector::untouched());

        let err = provider
            .cleanup(&Credential::default(), &CancellationToken::new())
            .await
            .expect_err("missing credential");

        assert!(matches!(err, ProviderError::Validation { .. }));
        assert_eq!(provider.connector.connect_count(), 0);
    }

    #[tokio::test]
    async fn test_cleanup_returns_message_verbatim() {
        let mut uploader = MockImageUploader::new();
        uploader
            .expect_cleanup_temp_resources()
            .times(1)
            .returning(|| Ok(String::from(CLEANUP_SUCCESS_MESSAGE)));

        let provider = ImageProvider::new(TestConnector::new(MockImageApi::new(), uploader));

        let outcome = provider
            .cleanup(&Credential::new("token"), &CancellationToken::new())
            .await
            .expect("cleanup succeeds");

        assert_eq!(outcome.message, "Successfully cleaned up temporary resources");
    }

    #[tokio::test]
    async fn test_cleanup_failure_is_wrapped() {
        let mut uploader = MockImageUploader::new();
        uploader.expect_cleanup_temp_resources().returning(|| {
            Err(UploadError::CommandFailed {
                program: String::from("hcloud-upload-image"),
                status: String::from("exit status: 2"),
                stderr: String::from("unauthorized"),
            })
        });

        let provider = ImageProvider::new(TestConnector::new(MockImageApi::new(), uploader));

        let err = provider
            .cleanup(&Credential::new("token"), &CancellationToken::new())
            .await
            .expect_err("cleanup fails");

        assert!(matches!(err, ProviderError::Cleanup(UploadError::CommandFailed { .. })));
    }
}
