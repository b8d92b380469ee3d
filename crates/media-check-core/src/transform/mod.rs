use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, instrument, trace, warn};

use crate::report::{ComplianceReport, ReportMetadata, ReportSubject};

pub mod structured;
pub(crate) mod text;

pub use structured::StructuredError;

/// Tool invocation the backend planned for the request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BackendPlan {
    #[serde(default)]
    pub tool: Option<String>,
    #[serde(default)]
    pub args: Map<String, Value>,
}

/// Analysis reply returned by the backend `/run` endpoint.
///
/// Every field is optional on the wire; a `null` `tool_output` counts as absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BackendResponse {
    #[serde(default)]
    pub plan: Option<BackendPlan>,
    #[serde(default)]
    pub tool_output: Option<Value>,
    #[serde(default)]
    pub llm_response: Option<String>,
}

/// Raised when a backend payload is not JSON (strict or relaxed) of the expected shape.
#[derive(Debug, Error)]
#[error("malformed backend payload: {reason}")]
pub struct PayloadError {
    reason: String,
}

impl BackendResponse {
    /// A reply carrying only a free-text narrative.
    pub fn from_text(llm_response: impl Into<String>) -> Self {
        Self {
            plan: None,
            tool_output: None,
            llm_response: Some(llm_response.into()),
        }
    }

    /// Parse a payload, retrying with relaxed JSON5 syntax when strict JSON fails.
    pub fn parse(raw: &str) -> Result<Self, PayloadError> {
        match serde_json::from_str::<Self>(raw) {
            Ok(response) => Ok(response),
            Err(strict_err) => {
                trace!(error = %strict_err, "strict JSON rejected, retrying as JSON5");
                let value: Value = json5::from_str(raw).map_err(|err| PayloadError {
                    reason: err.to_string(),
                })?;
                serde_json::from_value(value).map_err(|err| PayloadError {
                    reason: err.to_string(),
                })
            }
        }
    }
}

/// Converts backend replies into immutable compliance reports.
///
/// Structured `tool_output` takes priority; the free-text `llm_response` is
/// parsed only when no usable structured issues exist. Results from the two
/// channels are never merged.
#[derive(Debug, Default, Clone, Copy)]
pub struct ResponseTransformer;

impl ResponseTransformer {
    pub fn new() -> Self {
        Self
    }

    /// Transform using the current wall-clock time for `checkedAt`.
    pub fn transform(&self, response: &BackendResponse, subject: &ReportSubject) -> ComplianceReport {
        self.transform_at(response, subject, SystemTime::now())
    }

    /// Transform with an explicit `checkedAt` instant.
    #[instrument(name = "transform_response", skip_all, fields(file_name = %subject.file_name))]
    pub fn transform_at(
        &self,
        response: &BackendResponse,
        subject: &ReportSubject,
        checked_at: SystemTime,
    ) -> ComplianceReport {
        let metadata = ReportMetadata::new(subject, checked_at);

        if let Some(Value::Object(output)) = &response.tool_output {
            match structured::map_tool_output(output) {
                Ok(Some(mapped)) => {
                    let report = ComplianceReport::with_overrides(
                        mapped.issues,
                        mapped.score,
                        mapped.status,
                        metadata,
                    );
                    debug!(
                        source = "tool_output",
                        issues = report.issues().len(),
                        score = report.score(),
                        "report built"
                    );
                    return report;
                }
                Ok(None) => trace!("tool_output has no issues array"),
                Err(err) => warn!(
                    error = %err,
                    "failed to map structured tool_output, falling back to text parsing"
                ),
            }
        }

        let text = response.llm_response.as_deref().unwrap_or_default();
        let report = ComplianceReport::from_issues(text::extract_issues(text), metadata);
        debug!(
            source = "llm_response",
            issues = report.issues().len(),
            score = report.score(),
            "report built"
        );
        report
    }
}
