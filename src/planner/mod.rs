//! Planning module for image changes.
//!
//! This module compares desired specs with observed state and turns the
//! differences into plans of lifecycle calls.

mod compare;
mod diff;
mod executor;
mod plan;

pub use compare::{labels_differ, option_differs};
pub use diff::{DiffAction, DiffEngine, DiffKind, DiffResult};
pub use executor::{ActionResult, ExecutionResult, PlanExecutor};
pub use plan::{ActionType, PlannedAction, ResourcePlan};
