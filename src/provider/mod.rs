//! Lifecycle provider for uploaded images.
//!
//! This module drives create, read, update and delete of one image against
//! the remote API and the upload collaborator, and exposes the collaborator's
//! cleanup routine.

mod cleanup;
mod lifecycle;
mod resolve;

pub use cleanup::CleanupOutcome;
pub use lifecycle::{CreateResponse, ImageProvider, ReadResponse};
pub use resolve::{parse_identity, resolve_server_type, upload_options};

use std::future::Future;
use tokio_util::sync::CancellationToken;

use crate::error::{ProviderError, Result};

/// Races a remote call against cancellation.
///
/// An already cancelled token wins without polling `call`.
async fn cancellable<T, E, F>(cancel: &CancellationToken, call: F) -> Result<T>
where
    F: Future<Output = std::result::Result<T, E>>,
    E: Into<ProviderError>,
{
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(ProviderError::Cancelled),
        result = call => result.map_err(Into::into),
    }
}
