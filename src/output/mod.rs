//! Run summary formatting
//!
//! This module provides:
//! - Text output for human-readable display
//! - JSON output for machine processing
//!
//! The summary lists, per dependency, the action taken
//! (`created|updated|closed:<reason>`) and, separately, the error
//! count with a per-error-type breakdown.

use crate::updater::RunOutcome;
use colored::Colorize;
use serde_json::json;
use std::io::Write;

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable text output
    #[default]
    Text,
    /// JSON output for machine processing
    Json,
}

/// Formats a run outcome to a writer.
pub trait Formatter {
    fn format(&self, outcome: &RunOutcome, writer: &mut dyn Write) -> std::io::Result<()>;
}

/// Picks the formatter for a format.
pub fn create_formatter(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Text => Box::new(TextFormatter),
        OutputFormat::Json => Box::new(JsonFormatter),
    }
}

/// Human-readable summary.
pub struct TextFormatter;

impl Formatter for TextFormatter {
    fn format(&self, outcome: &RunOutcome, writer: &mut dyn Write) -> std::io::Result<()> {
        if outcome.outcomes.is_empty() {
            writeln!(writer, "{}", "No pull request changes".dimmed())?;
        } else {
            writeln!(writer, "{}", "Pull request changes:".bold())?;
            for entry in &outcome.outcomes {
                let action = entry.action.to_string();
                let painted = if action == "created" {
                    action.green()
                } else if action == "updated" {
                    action.cyan()
                } else {
                    action.yellow()
                };
                writeln!(writer, "  {} {}", painted, entry.dependencies)?;
            }
        }

        let total_errors = outcome.error_count();
        if total_errors > 0 {
            writeln!(
                writer,
                "{}",
                format!("Errors: {total_errors}").red().bold()
            )?;
            for (error_type, count) in &outcome.error_counts {
                writeln!(writer, "  {error_type}: {count}")?;
            }
        }
        Ok(())
    }
}

/// Machine-readable summary.
pub struct JsonFormatter;

impl Formatter for JsonFormatter {
    fn format(&self, outcome: &RunOutcome, writer: &mut dyn Write) -> std::io::Result<()> {
        let outcomes: Vec<serde_json::Value> = outcome
            .outcomes
            .iter()
            .map(|entry| {
                json!({
                    "dependencies": entry.dependencies,
                    "action": entry.action.to_string(),
                })
            })
            .collect();
        let document = json!({
            "outcomes": outcomes,
            "errors": outcome.error_counts,
        });
        writeln!(writer, "{}", serde_json::to_string_pretty(&document)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::updater::{DependencyOutcome, OutcomeAction};

    fn outcome() -> RunOutcome {
        let mut outcome = RunOutcome::default();
        outcome.outcomes.push(DependencyOutcome {
            dependencies: "serde".to_string(),
            action: OutcomeAction::Created,
        });
        outcome.outcomes.push(DependencyOutcome {
            dependencies: "lodash".to_string(),
            action: OutcomeAction::Closed("up_to_date"),
        });
        outcome
            .error_counts
            .insert("unknown_error".to_string(), 2);
        outcome
    }

    #[test]
    fn test_text_format_lists_actions_and_errors() {
        let mut buffer = Vec::new();
        TextFormatter.format(&outcome(), &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.contains("serde"));
        assert!(text.contains("created"));
        assert!(text.contains("closed:up_to_date"));
        assert!(text.contains("unknown_error: 2"));
    }

    #[test]
    fn test_text_format_empty_run() {
        let mut buffer = Vec::new();
        TextFormatter
            .format(&RunOutcome::default(), &mut buffer)
            .unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.contains("No pull request changes"));
    }

    #[test]
    fn test_json_format() {
        let mut buffer = Vec::new();
        JsonFormatter.format(&outcome(), &mut buffer).unwrap();
        let document: serde_json::Value = serde_json::from_slice(&buffer).unwrap();
        assert_eq!(document["outcomes"][0]["action"], "created");
        assert_eq!(document["outcomes"][1]["action"], "closed:up_to_date");
        assert_eq!(document["errors"]["unknown_error"], 2);
    }

    #[test]
    fn test_create_formatter() {
        let mut buffer = Vec::new();
        create_formatter(OutputFormat::Json)
            .format(&RunOutcome::default(), &mut buffer)
            .unwrap();
        assert!(serde_json::from_slice::<serde_json::Value>(&buffer).is_ok());
    }
}
