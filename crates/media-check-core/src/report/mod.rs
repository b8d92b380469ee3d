use std::time::SystemTime;

use serde::{Deserialize, Serialize};

pub mod render;

/// Maximum number of characters kept from an issue title.
pub const MAX_TITLE_CHARS: usize = 100;
/// Maximum number of characters kept from an issue description.
pub const MAX_DESCRIPTION_CHARS: usize = 500;

const BASE_SCORE: u32 = 100;
const FAIL_BELOW: u8 = 50;
const PASS_FROM: u8 = 80;

/// Severity assigned to a detected compliance issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    High,
    Medium,
    Low,
}

impl Severity {
    /// Points subtracted from the base score for one issue of this severity.
    pub fn penalty(self) -> u32 {
        match self {
            Self::High => 30,
            Self::Medium => 15,
            Self::Low => 5,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }

    /// Parse a severity label, ignoring ASCII case and surrounding whitespace.
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "high" => Some(Self::High),
            "medium" => Some(Self::Medium),
            "low" => Some(Self::Low),
            _ => None,
        }
    }
}

/// Overall verdict shown as the report badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceStatus {
    Pass,
    PartialFail,
    Fail,
}

impl ComplianceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::PartialFail => "partial_fail",
            Self::Fail => "fail",
        }
    }

    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "pass" => Some(Self::Pass),
            "partial_fail" => Some(Self::PartialFail),
            "fail" => Some(Self::Fail),
            _ => None,
        }
    }
}

/// One detected problem together with its suggested remedy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub id: String,
    pub severity: Severity,
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    pub recommendation: String,
}

impl Issue {
    /// Build an issue, truncating title and description to their display limits.
    pub fn new(
        id: impl Into<String>,
        severity: Severity,
        title: &str,
        description: &str,
        recommendation: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            severity,
            title: truncate_chars(title, MAX_TITLE_CHARS),
            description: truncate_chars(description, MAX_DESCRIPTION_CHARS),
            timestamp: None,
            recommendation: recommendation.into(),
        }
    }

    pub fn with_timestamp(mut self, timestamp: Option<String>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// Aggregate numbers shown above the issue list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub status: ComplianceStatus,
    pub issues_count: usize,
    pub recommendations_count: usize,
    pub score: u8,
}

/// What was checked, as supplied by the caller before the backend round trip.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReportSubject {
    pub file_name: String,
    pub file_size: u64,
    pub duration_sec: Option<f64>,
}

impl ReportSubject {
    pub fn new(file_name: impl Into<String>, file_size: u64) -> Self {
        Self {
            file_name: file_name.into(),
            file_size,
            duration_sec: None,
        }
    }

    /// Attach the media duration. Non-finite or negative values are dropped.
    pub fn with_duration(mut self, duration_sec: Option<f64>) -> Self {
        self.duration_sec = duration_sec.filter(|secs| secs.is_finite() && *secs >= 0.0);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportMetadata {
    pub file_name: String,
    pub file_size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_sec: Option<f64>,
    /// RFC 3339 UTC timestamp taken when the report was built.
    pub checked_at: String,
}

impl ReportMetadata {
    pub fn new(subject: &ReportSubject, checked_at: SystemTime) -> Self {
        Self {
            file_name: subject.file_name.clone(),
            file_size: subject.file_size,
            duration_sec: subject.duration_sec,
            checked_at: humantime::format_rfc3339_millis(checked_at).to_string(),
        }
    }
}

/// Immutable compliance report built once per backend response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceReport {
    summary: ReportSummary,
    issues: Vec<Issue>,
    metadata: ReportMetadata,
}

impl ComplianceReport {
    /// Build a report whose score and status are derived from `issues`.
    pub fn from_issues(issues: Vec<Issue>, metadata: ReportMetadata) -> Self {
        Self::with_overrides(issues, None, None, metadata)
    }

    /// Build a report honouring a score and/or status supplied by the backend.
    ///
    /// Missing values are derived; a supplied score still feeds status derivation.
    pub(crate) fn with_overrides(
        issues: Vec<Issue>,
        score: Option<u8>,
        status: Option<ComplianceStatus>,
        metadata: ReportMetadata,
    ) -> Self {
        let score = score.unwrap_or_else(|| compliance_score(&issues));
        let status = status.unwrap_or_else(|| derive_status(score, &issues));
        Self {
            summary: ReportSummary {
                status,
                issues_count: issues.len(),
                recommendations_count: issues.len(),
                score,
            },
            issues,
            metadata,
        }
    }

    pub fn summary(&self) -> &ReportSummary {
        &self.summary
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    pub fn metadata(&self) -> &ReportMetadata {
        &self.metadata
    }

    pub fn score(&self) -> u8 {
        self.summary.score
    }

    pub fn status(&self) -> ComplianceStatus {
        self.summary.status
    }
}

/// Score an issue list: 100 minus the summed severity penalties, floored at 0.
pub fn compliance_score(issues: &[Issue]) -> u8 {
    let penalty: u32 = issues.iter().map(|issue| issue.severity.penalty()).sum();
    // Bounded by BASE_SCORE, so the narrowing cast cannot truncate.
    BASE_SCORE.saturating_sub(penalty) as u8
}

/// Derive the badge status. Any issue at all rules out `pass`.
pub fn derive_status(score: u8, issues: &[Issue]) -> ComplianceStatus {
    let has_high = issues.iter().any(|issue| issue.severity == Severity::High);
    if has_high || score < FAIL_BELOW {
        ComplianceStatus::Fail
    } else if !issues.is_empty() || score < PASS_FROM {
        ComplianceStatus::PartialFail
    } else {
        ComplianceStatus::Pass
    }
}

pub(crate) fn truncate_chars(input: &str, max_chars: usize) -> String {
    match input.char_indices().nth(max_chars) {
        Some((idx, _)) => input[..idx].to_string(),
        None => input.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, UNIX_EPOCH};

    fn issue(severity: Severity) -> Issue {
        Issue::new("issue-1", severity, "title", "description", "fix it")
    }

    fn metadata() -> ReportMetadata {
        ReportMetadata::new(
            &ReportSubject::new("clip.mp4", 2048),
            UNIX_EPOCH + Duration::from_millis(1_700_000_000_123),
        )
    }

    #[test]
    fn score_subtracts_penalties_per_severity() {
        let issues = vec![
            issue(Severity::High),
            issue(Severity::Medium),
            issue(Severity::Low),
        ];
        assert_eq!(compliance_score(&issues), 50);
        assert_eq!(compliance_score(&[]), 100);
    }

    #[test]
    fn unusable_durations_are_dropped() {
        assert_eq!(ReportSubject::new("a.mp4", 1).with_duration(Some(f64::NAN)).duration_sec, None);
        assert_eq!(
            ReportSubject::new("a.mp4", 1)
                .with_duration(Some(f64::INFINITY))
                .duration_sec,
            None
        );
        assert_eq!(ReportSubject::new("a.mp4", 1).with_duration(Some(-1.0)).duration_sec, None);
        assert_eq!(
            ReportSubject::new("a.mp4", 1).with_duration(Some(12.5)).duration_sec,
            Some(12.5)
        );
    }

    #[test]
    fn score_is_floored_at_zero() {
        let issues = vec![issue(Severity::High); 4];
        assert_eq!(compliance_score(&issues), 0);
    }

    #[test]
    fn status_rules_apply_in_order() {
        assert_eq!(derive_status(100, &[]), ComplianceStatus::Pass);
        assert_eq!(
            derive_status(95, &[issue(Severity::Low)]),
            ComplianceStatus::PartialFail
        );
        assert_eq!(
            derive_status(70, &[issue(Severity::High)]),
            ComplianceStatus::Fail
        );
        assert_eq!(derive_status(49, &[]), ComplianceStatus::Fail);
        assert_eq!(derive_status(79, &[]), ComplianceStatus::PartialFail);
    }

    #[test]
    fn issue_new_truncates_by_characters() {
        let long_title = "é".repeat(150);
        let long_description = "x".repeat(700);
        let issue = Issue::new("a", Severity::Low, &long_title, &long_description, "r");
        assert_eq!(issue.title.chars().count(), MAX_TITLE_CHARS);
        assert_eq!(issue.description.len(), MAX_DESCRIPTION_CHARS);
    }

    #[test]
    fn report_counts_follow_issue_list() {
        let report = ComplianceReport::from_issues(
            vec![issue(Severity::Medium), issue(Severity::Low)],
            metadata(),
        );
        assert_eq!(report.summary().issues_count, 2);
        assert_eq!(report.summary().recommendations_count, 2);
        assert_eq!(report.score(), 80);
        assert_eq!(report.status(), ComplianceStatus::PartialFail);
    }

    #[test]
    fn overrides_keep_counts_derived() {
        let report = ComplianceReport::with_overrides(
            vec![issue(Severity::Low)],
            Some(42),
            None,
            metadata(),
        );
        assert_eq!(report.score(), 42);
        assert_eq!(report.status(), ComplianceStatus::Fail);
        assert_eq!(report.summary().issues_count, 1);
    }

    #[test]
    fn serializes_with_camel_case_fields() {
        let report = ComplianceReport::from_issues(vec![issue(Severity::Low)], metadata());
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["summary"]["status"], "partial_fail");
        assert_eq!(value["summary"]["issuesCount"], 1);
        assert_eq!(value["metadata"]["fileName"], "clip.mp4");
        assert_eq!(value["metadata"]["checkedAt"], "2023-11-14T22:13:20.123Z");
        assert!(value["metadata"].get("durationSec").is_none());
        assert!(value["issues"][0].get("timestamp").is_none());
    }

    #[test]
    fn labels_parse_case_insensitively() {
        assert_eq!(Severity::parse(" HIGH "), Some(Severity::High));
        assert_eq!(Severity::parse("critical"), None);
        assert_eq!(
            ComplianceStatus::parse("Partial_Fail"),
            Some(ComplianceStatus::PartialFail)
        );
    }
}
