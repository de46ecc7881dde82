//! Output formatting for CLI commands.
//!
//! This module provides formatting utilities for displaying
//! information to the user in various formats.

use colored::Colorize;
use serde::Serialize;
use std::fmt::Write;
use tabled::{Table, Tabled};

use crate::config::{ResourceConfig, SpecHasher, ValidationResult};
use crate::planner::{ActionType, DiffKind, ExecutionResult, ResourcePlan};
use crate::provider::CleanupOutcome;
use crate::state::ResourceRecord;

use super::commands::OutputFormat;

/// Placeholder shown instead of credentials.
const REDACTED: &str = "<redacted>";

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// Plan action row for table display.
#[derive(Tabled)]
struct PlanActionRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Fields")]
    fields: String,
    #[tabled(rename = "Reason")]
    reason: String,
}

/// Field change row for table display.
#[derive(Tabled)]
struct FieldRow {
    #[tabled(rename = "Field")]
    field: String,
    #[tabled(rename = "Change")]
    change: String,
}

/// Record row for table display.
#[derive(Tabled)]
struct RecordRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Arch")]
    architecture: String,
    #[tabled(rename = "Source")]
    source: String,
    #[tabled(rename = "Updated")]
    updated: String,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats the result of validating a resource file.
    #[must_use]
    pub fn format_validation(
        &self,
        config: &ResourceConfig,
        result: &ValidationResult,
        show_warnings: bool,
    ) -> String {
        match self.format {
            OutputFormat::Json => to_json(&serde_json::json!({
                "valid": result.is_valid(),
                "resource": config.resource.name,
                "errors": result
                    .errors
                    .iter()
                    .map(|e| serde_json::json!({ "field": e.field, "message": e.message }))
                    .collect::<Vec<_>>(),
                "warnings": result.warnings,
            })),
            OutputFormat::Text => {
                let mut output = String::new();

                if result.is_valid() {
                    let _ = writeln!(output, "{} Resource file is valid", "✓".green());
                } else {
                    let _ = writeln!(output, "{} Resource file is invalid:", "✗".red());
                    for issue in &result.errors {
                        let _ = writeln!(output, "   - {}: {}", issue.field, issue.message);
                    }
                }

                if show_warnings && !result.warnings.is_empty() {
                    let _ = writeln!(output, "\n{} Warnings:", "⚠".yellow());
                    for warning in &result.warnings {
                        let _ = writeln!(output, "   - {warning}");
                    }
                }

                let image = &config.image;
                let _ = writeln!(output, "\nResource summary:");
                let _ = writeln!(output, "   Name: {}", config.resource.name);
                let _ = writeln!(
                    output,
                    "   Source: {}",
                    image.image_url.as_deref().unwrap_or("-")
                );
                let _ = writeln!(output, "   Architecture: {}", image.architecture);
                let _ = writeln!(output, "   Labels: {}", image.labels.len());
                output
            }
        }
    }

    /// Formats a resource plan for display.
    #[must_use]
    pub fn format_plan(&self, plan: &ResourcePlan) -> String {
        match self.format {
            OutputFormat::Json => to_json(plan),
            OutputFormat::Text => Self::format_plan_text(plan),
        }
    }

    /// Formats a plan as text.
    fn format_plan_text(plan: &ResourcePlan) -> String {
        if plan.is_empty() {
            return format!(
                "{} No changes required, {} is up to date.\n",
                "✓".green(),
                plan.resource_name
            );
        }

        let mut output = String::new();

        let _ = writeln!(output, "\nPlan for {}", plan.resource_name.bold());
        if let Some(id) = &plan.current_id {
            let _ = writeln!(output, "   Current image: {id}");
        }
        if !plan.spec_hash.is_empty() {
            let short = SpecHasher::new().short_hash(&plan.spec_hash);
            let _ = writeln!(output, "   Spec hash: {short}");
        }
        output.push('\n');

        let rows: Vec<PlanActionRow> = plan
            .actions
            .iter()
            .enumerate()
            .map(|(i, a)| PlanActionRow {
                index: i + 1,
                action: Self::format_action_type(a.action_type),
                fields: a.fields.join(", "),
                reason: Self::truncate(&a.reason, 48),
            })
            .collect();
        output.push_str(&Table::new(rows).to_string());
        output.push('\n');

        if let Some(diff) = plan.diff.as_ref().filter(|d| d.has_changes()) {
            let rows: Vec<FieldRow> = diff
                .fields
                .iter()
                .map(|(field, kind)| FieldRow {
                    field: (*field).to_string(),
                    change: match kind {
                        DiffKind::Update => "~update".yellow().to_string(),
                        DiffKind::Replace => "±replace".red().to_string(),
                    },
                })
                .collect();
            let _ = writeln!(output, "\nChanged fields:");
            output.push_str(&Table::new(rows).to_string());
            output.push('\n');
        }

        let _ = writeln!(output, "\nPlan: {}", plan.summary().bold());
        output
    }

    /// Formats the result of an apply or destroy.
    #[must_use]
    pub fn format_execution(&self, result: &ExecutionResult) -> String {
        match self.format {
            OutputFormat::Json => to_json(&serde_json::json!({
                "results": result.results,
                "record": result.record.as_ref().map(redacted_json),
            })),
            OutputFormat::Text => {
                let mut output = String::new();
                for action in &result.results {
                    let _ = writeln!(
                        output,
                        "{} {} image {}",
                        "✓".green(),
                        Self::format_action_type(action.action_type),
                        action.image_id
                    );
                }
                match &result.record {
                    Some(record) => {
                        let _ = writeln!(output, "\nRecorded {} as image {}", record.name, record.id);
                    }
                    None => output.push_str("\nNo image recorded.\n"),
                }
                output
            }
        }
    }

    /// Formats recorded state.
    #[must_use]
    pub fn format_records(&self, records: &[ResourceRecord]) -> String {
        match self.format {
            OutputFormat::Json => to_json(&records.iter().map(redacted_json).collect::<Vec<_>>()),
            OutputFormat::Text => {
                if records.is_empty() {
                    return String::from("No state found.\n");
                }

                let rows: Vec<RecordRow> = records
                    .iter()
                    .map(|r| RecordRow {
                        name: r.name.clone(),
                        id: r.id.clone(),
                        status: Self::format_status(&r.state.remote.status),
                        architecture: r.state.inputs.architecture.clone(),
                        source: Self::truncate(r.state.inputs.image_url.as_deref().unwrap_or("-"), 40),
                        updated: r.updated_at.format("%Y-%m-%d %H:%M").to_string(),
                    })
                    .collect();

                let mut output = Table::new(rows).to_string();
                output.push('\n');
                output
            }
        }
    }

    /// Formats the outcome of a cleanup run.
    #[must_use]
    pub fn format_cleanup(&self, outcome: &CleanupOutcome) -> String {
        match self.format {
            OutputFormat::Json => to_json(outcome),
            OutputFormat::Text => format!("{} {}\n", "✓".green(), outcome.message),
        }
    }

    /// Formats a plain message.
    #[must_use]
    pub fn format_message(&self, message: &str) -> String {
        match self.format {
            OutputFormat::Json => to_json(&serde_json::json!({ "message": message })),
            OutputFormat::Text => format!("{message}\n"),
        }
    }

    /// Formats an action type with color.
    fn format_action_type(action_type: ActionType) -> String {
        match action_type {
            ActionType::Create => "+create".green().to_string(),
            ActionType::Update => "~update".yellow().to_string(),
            ActionType::Delete => "-delete".red().to_string(),
        }
    }

    /// Formats an image status with color.
    fn format_status(status: &str) -> String {
        match status {
            "available" => status.green().to_string(),
            "creating" => status.yellow().to_string(),
            "" => "pending".dimmed().to_string(),
            other => other.dimmed().to_string(),
        }
    }

    /// Truncates a string to a maximum number of characters.
    fn truncate(s: &str, max_len: usize) -> String {
        if s.chars().count() <= max_len {
            s.to_string()
        } else {
            let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
            format!("{head}...")
        }
    }
}

/// Serializes a record with its credential replaced.
fn redacted_json(record: &ResourceRecord) -> serde_json::Value {
    let mut value = serde_json::to_value(record).unwrap_or_default();
    if let Some(token) = value
        .get_mut("state")
        .and_then(|state| state.get_mut("token"))
    {
        *token = serde_json::Value::from(REDACTED);
    }
    value
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}
