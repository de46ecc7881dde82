//! Create, read, update and delete of an uploaded image.
//!
//! Every operation is a function of its explicit inputs: the provider keeps
//! no per-resource state between calls and connects with the credential of
//! the call at hand. Inputs are validated before any connection is made.

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{ConfigValidator, ImageSpec};
use crate::error::{HcloudError, ProviderError, Result};
use crate::hcloud::{Connector, ImageUpdate};
use crate::planner::{DiffEngine, DiffKind, DiffResult};
use crate::state::{overlay, overlay_with_spec, to_state, ObservedState};

use super::cancellable;
use super::resolve::{parse_identity, resolve_server_type, upload_options};

/// Lifecycle provider for uploaded images.
pub struct ImageProvider<C: Connector> {
    /// Builds credential-scoped collaborators.
    pub(super) connector: C,
    /// Diff engine.
    diff_engine: DiffEngine,
}

/// Result of a create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateResponse {
    /// External identity to present on later calls.
    pub id: String,
    /// State of the new image.
    pub state: ObservedState,
}

/// Result of a read of an existing image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReadResponse {
    /// External identity.
    pub id: String,
    /// Inputs, echoed back.
    pub inputs: ImageSpec,
    /// Refreshed state.
    pub state: ObservedState,
}

impl<C: Connector> ImageProvider<C> {
    /// Creates a provider using the given connector.
    #[must_use]
    pub const fn new(connector: C) -> Self {
        Self {
            connector,
            diff_engine: DiffEngine::new(),
        }
    }

    /// Uploads a new image.
    ///
    /// With `dry_run` set, returns the resource name as identity and the
    /// spec as state without contacting anything.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a missing credential or source, an
    /// unsupported value error for unknown enum strings, not found for an
    /// unknown server type, and remote or upload errors from the collaborators.
    pub async fn create(
        &self,
        name: &str,
        spec: &ImageSpec,
        dry_run: bool,
        cancel: &CancellationToken,
    ) -> Result<CreateResponse> {
        ConfigValidator::require_token(&spec.token)?;
        ConfigValidator::require_architecture(spec)?;
        ConfigValidator::require_source(spec)?;

        if dry_run {
            info!("Dry run: would upload image for {name}");
            return Ok(CreateResponse {
                id: name.to_string(),
                state: to_state(spec),
            });
        }

        let mut options = upload_options(spec)?;
        if cancel.is_cancelled() {
            return Err(ProviderError::Cancelled);
        }
        let connection = self.connector.connect(&spec.token)?;

        if let Some(server_type) = spec.server_type.as_deref() {
            let resolved =
                cancellable(cancel, resolve_server_type(connection.api.as_ref(), server_type))
                    .await?;
            options.server_type = Some(resolved);
        }

        info!("Uploading image for {name} from {}", options.image_url);
        let image = cancellable(cancel, connection.uploader.upload(&options)).await?;

        let state = overlay(&image, &to_state(spec));
        let id = image.id.to_string();
        info!("Created image {id} for {name}");

        Ok(CreateResponse { id, state })
    }

    /// Refreshes the state of an image.
    ///
    /// Returns `None` if the image no longer exists.
    ///
    /// # Errors
    ///
    /// Returns an invalid identity error for a malformed id, a validation
    /// error for a missing credential and remote errors from the API.
    pub async fn read(
        &self,
        id: &str,
        spec: &ImageSpec,
        last_state: &ObservedState,
        cancel: &CancellationToken,
    ) -> Result<Option<ReadResponse>> {
        let image_id = parse_identity(id)?;
        ConfigValidator::require_token(&spec.token)?;

        let connection = self.connector.connect(&spec.token)?;
        debug!("Fetching image {image_id}");

        let Some(image) = cancellable(cancel, connection.api.get_image_by_id(image_id)).await?
        else {
            warn!("Image {image_id} no longer exists");
            return Ok(None);
        };

        Ok(Some(ReadResponse {
            id: id.to_string(),
            inputs: spec.clone(),
            state: overlay(&image, last_state),
        }))
    }

    /// Applies description and label changes to an image.
    ///
    /// Changes to the source URL or architecture are rejected; they require a
    /// replacement.
    ///
    /// # Errors
    ///
    /// Returns an invalid identity error for a malformed id, a validation
    /// error for a missing credential or a replace-only change, and remote
    /// errors from the API.
    pub async fn update(
        &self,
        id: &str,
        spec: &ImageSpec,
        current_state: &ObservedState,
        cancel: &CancellationToken,
    ) -> Result<ObservedState> {
        let image_id = parse_identity(id)?;
        ConfigValidator::require_token(&spec.token)?;

        let replace_fields = self
            .diff_engine
            .compute_diff(spec, current_state)
            .fields_of(DiffKind::Replace);
        if let Some(field) = replace_fields.first() {
            return Err(ProviderError::validation(
                format!(
                    "{} cannot be changed in place, the image must be replaced",
                    replace_fields.join(", ")
                ),
                *field,
            ));
        }

        let update = ImageUpdate {
            description: spec.description.clone(),
            labels: Some(spec.labels.clone()),
        };

        let connection = self.connector.connect(&spec.token)?;
        info!("Updating image {image_id}");
        let image = cancellable(cancel, connection.api.update_image(image_id, &update)).await?;

        Ok(overlay_with_spec(&image, spec))
    }

    /// Deletes an image using the credential recorded in its state.
    ///
    /// Deleting an image that no longer exists succeeds.
    ///
    /// # Errors
    ///
    /// Returns an invalid identity error for a malformed id, a validation
    /// error if the state holds no credential and remote errors from the API.
    pub async fn delete(
        &self,
        id: &str,
        state: &ObservedState,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let image_id = parse_identity(id)?;
        ConfigValidator::require_token(&state.inputs.token)?;

        let connection = self.connector.connect(&state.inputs.token)?;
        info!("Deleting image {image_id}");

        match cancellable(cancel, connection.api.delete_image(image_id)).await {
            Ok(()) => Ok(()),
            Err(ProviderError::Remote(HcloudError::NotFound { .. })) => {
                info!("Image {image_id} already deleted");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Computes which fields changed between a spec and a prior state.
    #[must_use]
    pub fn diff(&self, spec: &ImageSpec, state: &ObservedState) -> DiffResult {
        self.diff_engine.compute_diff(spec, state)
    }
}

impl<C: Connector + std::fmt::Debug> std::fmt::Debug for ImageProvider<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageProvider")
            .field("connector", &self.connector)
            .finish_non_exhaustive()
    }
}
