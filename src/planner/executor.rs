//! Plan executor for applying resource plans.
//!
//! The executor drives the lifecycle provider action by action and persists
//! the record after every successful step, so a failure part-way through a
//! replacement never loses track of an image that was already uploaded.

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::ImageSpec;
use crate::error::{ProviderError, Result};
use crate::hcloud::Connector;
use crate::provider::ImageProvider;
use crate::state::{ResourceRecord, StateStore};

use super::plan::{ActionType, ResourcePlan};

/// Executor for resource plans.
pub struct PlanExecutor<'a, C: Connector> {
    /// Lifecycle provider.
    provider: &'a ImageProvider<C>,
    /// Store the resulting record is written to.
    store: &'a dyn StateStore,
    /// Cancellation signal passed to every call.
    cancel: &'a CancellationToken,
}

/// Result of executing a single action.
#[derive(Debug, Clone, Serialize)]
pub struct ActionResult {
    /// Action that was executed.
    pub action_type: ActionType,
    /// Image the action applied to.
    pub image_id: String,
}

/// Result of executing an entire plan.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    /// Results of the executed actions, in order.
    pub results: Vec<ActionResult>,
    /// Record after execution, `None` if the resource was removed.
    pub record: Option<ResourceRecord>,
}

impl<'a, C: Connector> PlanExecutor<'a, C> {
    /// Creates a new plan executor.
    #[must_use]
    pub fn new(
        provider: &'a ImageProvider<C>,
        store: &'a dyn StateStore,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            provider,
            store,
            cancel,
        }
    }

    /// Executes a plan against the stored record of its resource.
    ///
    /// # Errors
    ///
    /// Returns the first failing action's error after persisting the progress
    /// made so far.
    pub async fn execute(
        &self,
        plan: &ResourcePlan,
        spec: &ImageSpec,
        prior: Option<&ResourceRecord>,
    ) -> Result<ExecutionResult> {
        info!(
            "Executing plan for {} with {} actions",
            plan.resource_name,
            plan.actions.len()
        );

        let mut current = prior.cloned();
        let mut results = Vec::new();

        for action in &plan.actions {
            if self.cancel.is_cancelled() {
                return Err(ProviderError::Cancelled);
            }

            info!("{}: {} ({})", plan.resource_name, action.action_type, action.reason);
            let outcome = match action.action_type {
                ActionType::Create => self.create(&plan.resource_name, spec).await,
                ActionType::Update => self.update(current.as_ref(), spec).await,
                ActionType::Delete => self.delete(prior, current.as_ref()).await,
            };

            match outcome {
                Ok((image_id, record)) => {
                    if action.action_type != ActionType::Delete
                        || current.as_ref().is_some_and(|c| c.id == image_id)
                    {
                        current = record;
                    }
                    results.push(ActionResult {
                        action_type: action.action_type,
                        image_id,
                    });
                }
                Err(e) => {
                    error!("{} failed for {}: {e}", action.action_type, plan.resource_name);
                    return Err(e);
                }
            }
        }

        Ok(ExecutionResult {
            results,
            record: current,
        })
    }

    async fn create(
        &self,
        name: &str,
        spec: &ImageSpec,
    ) -> Result<(String, Option<ResourceRecord>)> {
        let response = self.provider.create(name, spec, false, self.cancel).await?;
        let record = ResourceRecord::new(response.id.clone(), name, response.state);
        self.store.save(&record).await?;
        Ok((response.id, Some(record)))
    }

    async fn update(
        &self,
        current: Option<&ResourceRecord>,
        spec: &ImageSpec,
    ) -> Result<(String, Option<ResourceRecord>)> {
        let current = current.ok_or_else(|| missing_record("update"))?;
        let state = self
            .provider
            .update(&current.id, spec, &current.state, self.cancel)
            .await?;
        let record = ResourceRecord::new(current.id.clone(), current.name.clone(), state);
        self.store.save(&record).await?;
        Ok((record.id.clone(), Some(record)))
    }

    /// Deletes the prior image. The stored record is only removed when it
    /// still points at that image.
    async fn delete(
        &self,
        prior: Option<&ResourceRecord>,
        current: Option<&ResourceRecord>,
    ) -> Result<(String, Option<ResourceRecord>)> {
        let prior = prior.ok_or_else(|| missing_record("delete"))?;
        self.provider
            .delete(&prior.id, &prior.state, self.cancel)
            .await?;

        if current.is_some_and(|c| c.id == prior.id) {
            self.store.remove(&prior.name).await?;
        }
        Ok((prior.id.clone(), None))
    }
}

fn missing_record(action: &str) -> ProviderError {
    ProviderError::Validation {
        message: format!("cannot {action} a resource without recorded state"),
        field: None,
    }
}
