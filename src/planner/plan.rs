//! Resource plan types and construction.
//!
//! A plan turns a diff (or the absence of an image) into the ordered list
//! of lifecycle calls that converges one resource.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::diff::{DiffAction, DiffKind, DiffResult};

/// Plan for one image resource.
#[derive(Debug, Clone, Serialize)]
pub struct ResourcePlan {
    /// When the plan was created.
    pub created_at: DateTime<Utc>,
    /// Logical resource name.
    pub resource_name: String,
    /// Hash of the desired spec.
    pub spec_hash: String,
    /// Identity of the existing image, if any.
    pub current_id: Option<String>,
    /// Diff the plan was derived from.
    pub diff: Option<DiffResult>,
    /// Planned actions in execution order.
    pub actions: Vec<PlannedAction>,
}

/// A single planned action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedAction {
    /// Action type.
    pub action_type: ActionType,
    /// Reason for this action.
    pub reason: String,
    /// Fields that triggered the action.
    pub fields: Vec<&'static str>,
}

/// Types of actions in a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionType {
    /// Upload a new image.
    Create,
    /// Update description and labels in place.
    Update,
    /// Delete the existing image.
    Delete,
}

impl ResourcePlan {
    fn new(resource_name: &str, spec_hash: &str, current_id: Option<&str>) -> Self {
        Self {
            created_at: Utc::now(),
            resource_name: resource_name.to_string(),
            spec_hash: spec_hash.to_string(),
            current_id: current_id.map(String::from),
            diff: None,
            actions: Vec::new(),
        }
    }

    /// Plans the creation of an image that does not exist yet.
    #[must_use]
    pub fn for_create(resource_name: &str, spec_hash: &str, reason: &str) -> Self {
        let mut plan = Self::new(resource_name, spec_hash, None);
        plan.actions.push(PlannedAction {
            action_type: ActionType::Create,
            reason: reason.to_string(),
            fields: Vec::new(),
        });
        plan
    }

    /// Plans the deletion of an existing image.
    #[must_use]
    pub fn for_destroy(resource_name: &str, current_id: &str) -> Self {
        let mut plan = Self::new(resource_name, "", Some(current_id));
        plan.actions.push(PlannedAction {
            action_type: ActionType::Delete,
            reason: String::from("Resource destroyed"),
            fields: Vec::new(),
        });
        plan
    }

    /// Plans the convergence of an existing image from its diff.
    ///
    /// A replacement creates the new image before deleting the old one unless
    /// the diff demands the opposite order.
    #[must_use]
    pub fn from_diff(
        resource_name: &str,
        current_id: &str,
        diff: &DiffResult,
        spec_hash: &str,
    ) -> Self {
        let mut plan = Self::new(resource_name, spec_hash, Some(current_id));

        match diff.action() {
            DiffAction::None => {}
            DiffAction::Update => plan.actions.push(PlannedAction {
                action_type: ActionType::Update,
                reason: String::from("Mutable fields changed"),
                fields: diff.fields_of(DiffKind::Update),
            }),
            DiffAction::Replace => {
                let fields = diff.fields_of(DiffKind::Replace);
                let reason = format!("Replacing image due to {}", fields.join(", "));
                let create = PlannedAction {
                    action_type: ActionType::Create,
                    reason: reason.clone(),
                    fields: fields.clone(),
                };
                let delete = PlannedAction {
                    action_type: ActionType::Delete,
                    reason,
                    fields,
                };
                if diff.delete_before_replace {
                    plan.actions.extend([delete, create]);
                } else {
                    plan.actions.extend([create, delete]);
                }
            }
        }

        plan.diff = Some(diff.clone());
        plan
    }

    /// Returns true if the plan is empty (no changes).
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Returns the overall action of the plan.
    #[must_use]
    pub fn summary(&self) -> &'static str {
        let has = |t: ActionType| self.actions.iter().any(|a| a.action_type == t);
        match (has(ActionType::Create), has(ActionType::Update), has(ActionType::Delete)) {
            (true, _, true) => "replace",
            (true, _, false) => "create",
            (false, true, _) => "update",
            (false, false, true) => "delete",
            (false, false, false) => "no change",
        }
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diff(fields: &[(&'static str, DiffKind)]) -> DiffResult {
        DiffResult {
            fields: fields.iter().copied().collect(),
            delete_before_replace: false,
        }
    }

    fn action_types(plan: &ResourcePlan) -> Vec<ActionType> {
        plan.actions.iter().map(|a| a.action_type).collect()
    }

    #[test]
    fn test_no_change_plan_is_empty() {
        let plan = ResourcePlan::from_diff("talos", "42", &diff(&[]), "hash");

        assert!(plan.is_empty());
        assert_eq!(plan.summary(), "no change");
    }

    #[test]
    fn test_update_plan() {
        let plan = ResourcePlan::from_diff(
            "talos",
            "42",
            &diff(&[("labels", DiffKind::Update), ("description", DiffKind::Update)]),
            "hash",
        );

        assert_eq!(action_types(&plan), vec![ActionType::Update]);
        assert_eq!(plan.actions[0].fields, vec!["description", "labels"]);
        assert_eq!(plan.summary(), "update");
    }

    #[test]
    fn test_replace_creates_before_delete() {
        let plan = ResourcePlan::from_diff(
            "talos",
            "42",
            &diff(&[("architecture", DiffKind::Replace), ("labels", DiffKind::Update)]),
            "hash",
        );

        assert_eq!(action_types(&plan), vec![ActionType::Create, ActionType::Delete]);
        assert_eq!(plan.actions[0].fields, vec!["architecture"]);
        assert_eq!(plan.summary(), "replace");
        assert_eq!(plan.current_id.as_deref(), Some("42"));
    }

    #[test]
    fn test_replace_honors_delete_before_replace() {
        let mut result = diff(&[("image_url", DiffKind::Replace)]);
        result.delete_before_replace = true;

        let plan = ResourcePlan::from_diff("talos", "42", &result, "hash");

        assert_eq!(action_types(&plan), vec![ActionType::Delete, ActionType::Create]);
    }

    #[test]
    fn test_create_and_destroy_plans() {
        let create = ResourcePlan::for_create("talos", "hash", "Resource does not exist");
        assert_eq!(action_types(&create), vec![ActionType::Create]);
        assert!(create.current_id.is_none());

        let destroy = ResourcePlan::for_destroy("talos", "42");
        assert_eq!(action_types(&destroy), vec![ActionType::Delete]);
        assert_eq!(destroy.summary(), "delete");
    }
}
