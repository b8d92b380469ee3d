use serde_json::{Map, Value};
use thiserror::Error;

use crate::report::{ComplianceStatus, Issue, Severity};

const DEFAULT_RECOMMENDATION: &str = "Please review this issue.";

/// Reasons a structured `tool_output` cannot be mapped into a report.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StructuredError {
    #[error("issue #{index} is not an object")]
    IssueNotObject { index: usize },
    #[error("issue #{index} has unsupported severity `{value}`")]
    InvalidSeverity { index: usize, value: String },
    #[error("issue #{index} field `{field}` must be a string")]
    InvalidField { index: usize, field: &'static str },
    #[error("score must be a number within 0..=100 (got {value})")]
    InvalidScore { value: String },
    #[error("unsupported status `{value}`")]
    InvalidStatus { value: String },
}

/// Issues plus any summary values the backend asserted itself.
#[derive(Debug)]
pub(crate) struct StructuredOutput {
    pub issues: Vec<Issue>,
    pub score: Option<u8>,
    pub status: Option<ComplianceStatus>,
}

/// Map a structured tool output. `Ok(None)` means there is no `issues` array to use.
pub(crate) fn map_tool_output(
    output: &Map<String, Value>,
) -> Result<Option<StructuredOutput>, StructuredError> {
    let Some(Value::Array(entries)) = output.get("issues") else {
        return Ok(None);
    };

    let issues = entries
        .iter()
        .enumerate()
        .map(|(index, entry)| map_issue(index, entry))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Some(StructuredOutput {
        issues,
        score: map_score(output.get("score"))?,
        status: map_status(output.get("status"))?,
    }))
}

fn map_issue(index: usize, entry: &Value) -> Result<Issue, StructuredError> {
    let Value::Object(fields) = entry else {
        return Err(StructuredError::IssueNotObject { index });
    };
    let ordinal = index + 1;

    let id = match fields.get("id") {
        Some(Value::Number(n)) => Some(n.to_string()),
        other => string_field(index, "id", other)?,
    }
    .unwrap_or_else(|| format!("issue-{ordinal}"));

    let severity = match string_field(index, "severity", fields.get("severity"))? {
        Some(label) => {
            Severity::parse(&label).ok_or(StructuredError::InvalidSeverity { index, value: label })?
        }
        None => Severity::Medium,
    };

    let title = string_field(index, "title", fields.get("title"))?
        .unwrap_or_else(|| format!("Issue {ordinal}"));
    let description = string_field(index, "description", fields.get("description"))?
        .unwrap_or_default();
    let recommendation = string_field(index, "recommendation", fields.get("recommendation"))?
        .unwrap_or_else(|| DEFAULT_RECOMMENDATION.to_string());
    let timestamp = string_field(index, "timestamp", fields.get("timestamp"))?;

    Ok(Issue::new(id, severity, &title, &description, recommendation).with_timestamp(timestamp))
}

/// Missing, null and empty strings all count as absent.
fn string_field(
    index: usize,
    field: &'static str,
    value: Option<&Value>,
) -> Result<Option<String>, StructuredError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(StructuredError::InvalidField { index, field }),
    }
}

/// A reported score of 0 is kept as-is; only a missing or null score falls
/// back to the derived one.
fn map_score(value: Option<&Value>) -> Result<Option<u8>, StructuredError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => match n.as_f64() {
            Some(score) if (0.0..=100.0).contains(&score) => Ok(Some(score.round() as u8)),
            _ => Err(StructuredError::InvalidScore {
                value: n.to_string(),
            }),
        },
        Some(other) => Err(StructuredError::InvalidScore {
            value: other.to_string(),
        }),
    }
}

fn map_status(value: Option<&Value>) -> Result<Option<ComplianceStatus>, StructuredError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(label)) => ComplianceStatus::parse(label)
            .map(Some)
            .ok_or_else(|| StructuredError::InvalidStatus {
                value: label.clone(),
            }),
        Some(other) => Err(StructuredError::InvalidStatus {
            value: other.to_string(),
        }),
    }
}
