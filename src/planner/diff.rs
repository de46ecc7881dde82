//! Diff engine for comparing a desired spec with observed state.
//!
//! Only `image_url` and `architecture` force a replacement, since the remote
//! image is derived from the source bytes and the CPU architecture at
//! creation time. Every other spec field can be changed in place.

use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

use crate::config::ImageSpec;
use crate::state::ObservedState;

use super::compare::{labels_differ, option_differs};

/// Engine for computing diffs between desired specs and observed state.
#[derive(Debug, Default)]
pub struct DiffEngine;

/// How a changed field must be applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffKind {
    /// The field can be changed in place.
    Update,
    /// The image must be recreated.
    Replace,
}

/// Action required to converge an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffAction {
    /// Nothing changed.
    None,
    /// In-place update.
    Update,
    /// Full replacement.
    Replace,
}

/// Result of diffing one resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct DiffResult {
    /// Changed fields and how each must be applied.
    pub fields: BTreeMap<&'static str, DiffKind>,
    /// Whether the old image must be deleted before its replacement is created.
    pub delete_before_replace: bool,
}

impl DiffEngine {
    /// Creates a new diff engine.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Computes the diff between a desired spec and the observed state.
    #[must_use]
    pub fn compute_diff(&self, desired: &ImageSpec, observed: &ObservedState) -> DiffResult {
        let current = &observed.inputs;
        let mut fields = BTreeMap::new();

        if option_differs(desired.image_url.as_deref(), current.image_url.as_deref()) {
            fields.insert("image_url", DiffKind::Replace);
        }
        if desired.architecture != current.architecture {
            fields.insert("architecture", DiffKind::Replace);
        }

        if desired.token != current.token {
            fields.insert("token", DiffKind::Update);
        }
        if option_differs(desired.compression.as_deref(), current.compression.as_deref()) {
            fields.insert("compression", DiffKind::Update);
        }
        if option_differs(desired.format.as_deref(), current.format.as_deref()) {
            fields.insert("format", DiffKind::Update);
        }
        if option_differs(desired.image_size.as_ref(), current.image_size.as_ref()) {
            fields.insert("image_size", DiffKind::Update);
        }
        if option_differs(desired.server_type.as_deref(), current.server_type.as_deref()) {
            fields.insert("server_type", DiffKind::Update);
        }
        if labels_differ(&desired.labels, &current.labels) {
            fields.insert("labels", DiffKind::Update);
        }
        if option_differs(desired.description.as_deref(), current.description.as_deref()) {
            fields.insert("description", DiffKind::Update);
        }

        let result = DiffResult {
            fields,
            delete_before_replace: false,
        };
        debug!("Diff computed: {result}");
        result
    }
}

impl DiffResult {
    /// Returns true if any field changed.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        !self.fields.is_empty()
    }

    /// Returns true if any change forces a replacement.
    #[must_use]
    pub fn requires_replace(&self) -> bool {
        self.fields.values().any(|kind| *kind == DiffKind::Replace)
    }

    /// Returns the overall action.
    #[must_use]
    pub fn action(&self) -> DiffAction {
        if self.requires_replace() {
            DiffAction::Replace
        } else if self.has_changes() {
            DiffAction::Update
        } else {
            DiffAction::None
        }
    }

    /// Returns the names of the changed fields of the given kind.
    #[must_use]
    pub fn fields_of(&self, kind: DiffKind) -> Vec<&'static str> {
        self.fields
            .iter()
            .filter(|(_, k)| **k == kind)
            .map(|(name, _)| *name)
            .collect()
    }
}

impl fmt::Display for DiffKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Update => "update",
            Self::Replace => "replace",
        };
        write!(f, "{s}")
    }
}

impl fmt::Display for DiffAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::None => "no change",
            Self::Update => "update",
            Self::Replace => "replace",
        };
        write!(f, "{s}")
    }
}

impl fmt::Display for DiffResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.action())?;
        if !self.fields.is_empty() {
            write!(f, " (")?;
            for (i, (field, kind)) in self.fields.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{field}: {kind}")?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}
