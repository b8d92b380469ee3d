use aho_corasick::AhoCorasick;
use once_cell::sync::Lazy;
use regex::{Match, Regex};
use tracing::trace;

use crate::report::{Issue, Severity};

const DEFAULT_RECOMMENDATION: &str = "Please review and address this issue.";
const SUMMARY_TITLE: &str = "Compliance Review";
const SUMMARY_RECOMMENDATION: &str = "Please review the analysis and take appropriate action.";

const HIGH_KEYWORDS: &[&str] = &["critical", "severe", "violation", "illegal", "prohibited"];
const MEDIUM_KEYWORDS: &[&str] = &["warning", "concern", "issue", "problem"];

/// Pattern families applied in order. Group 1 is the title, group 2 (when
/// present) the description.
static ISSUE_PATTERNS: Lazy<[Regex; 3]> = Lazy::new(|| {
    [
        Regex::new(r"(?i)(?:ISSUE|Problem|Warning|Error):\s*([^\n-]+)(?:\s*-\s*([^\n]+))?")
            .expect("Invalid keyword issue regex"),
        Regex::new(r"(?i)[-•]\s*(Critical|High|Medium|Low):\s*([^\n]+)")
            .expect("Invalid severity bullet regex"),
        Regex::new(r"[0-9]+\.\s*([^\n]+)").expect("Invalid numbered list regex"),
    ]
});

static RECOMMENDATION_PATTERNS: Lazy<[Regex; 2]> = Lazy::new(|| {
    [
        Regex::new(r"(?i)(?:Recommendation|Suggest|Should|Must|Need to):\s*([^\n]+)")
            .expect("Invalid recommendation regex"),
        Regex::new(r"(?i)(?:Fix|Resolve|Address):\s*([^\n]+)").expect("Invalid remedy regex"),
    ]
});

static TIME_OFFSET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:[0-9]{1,2}:)?[0-9]{1,2}:[0-9]{2}\b").expect("Invalid time offset regex")
});

static HIGH_SEVERITY: Lazy<AhoCorasick> = Lazy::new(|| keyword_automaton(HIGH_KEYWORDS));
static MEDIUM_SEVERITY: Lazy<AhoCorasick> = Lazy::new(|| keyword_automaton(MEDIUM_KEYWORDS));

fn keyword_automaton(keywords: &[&str]) -> AhoCorasick {
    AhoCorasick::builder()
        .ascii_case_insensitive(true)
        .build(keywords)
        .expect("Invalid severity keyword automaton")
}

/// Extract issues from a free-text backend narrative.
///
/// Every pattern family runs over the whole text and appends its matches, so a
/// line matched by two families yields two issues. Severity is always taken
/// from the keyword scan of the matched substring, even when the line declares
/// its own level.
pub(crate) fn extract_issues(text: &str) -> Vec<Issue> {
    let mut issues = Vec::new();

    for (family, pattern) in ISSUE_PATTERNS.iter().enumerate() {
        let before = issues.len();
        for caps in pattern.captures_iter(text) {
            let Some(matched) = caps.get(0).map(|m| m.as_str()) else {
                continue;
            };
            let ordinal = issues.len() + 1;
            let title_group = non_blank(caps.get(1));
            let title = title_group
                .map(str::to_string)
                .unwrap_or_else(|| format!("Issue {ordinal}"));
            let description = non_blank(caps.get(2))
                .or(title_group)
                .unwrap_or_else(|| matched.trim());
            let recommendation = extract_recommendation(matched)
                .unwrap_or_else(|| DEFAULT_RECOMMENDATION.to_string());

            issues.push(
                Issue::new(
                    format!("issue-{ordinal}"),
                    determine_severity(matched),
                    &title,
                    description,
                    recommendation,
                )
                .with_timestamp(extract_time_offset(matched)),
            );
        }
        trace!(family, matches = issues.len() - before, "applied issue pattern");
    }

    if issues.is_empty() && !text.trim().is_empty() {
        issues.push(Issue::new(
            "issue-1",
            determine_severity(text),
            SUMMARY_TITLE,
            text,
            SUMMARY_RECOMMENDATION,
        ));
    }

    issues
}

/// Keyword scan: high-severity vocabulary wins over medium, anything else is low.
pub(crate) fn determine_severity(text: &str) -> Severity {
    if HIGH_SEVERITY.is_match(text) {
        Severity::High
    } else if MEDIUM_SEVERITY.is_match(text) {
        Severity::Medium
    } else {
        Severity::Low
    }
}

fn extract_recommendation(text: &str) -> Option<String> {
    RECOMMENDATION_PATTERNS.iter().find_map(|pattern| {
        pattern
            .captures(text)
            .and_then(|caps| non_blank(caps.get(1)))
            .map(str::to_string)
    })
}

fn extract_time_offset(text: &str) -> Option<String> {
    TIME_OFFSET.find(text).map(|m| m.as_str().to_string())
}

fn non_blank(group: Option<Match<'_>>) -> Option<&str> {
    group.map(|m| m.as_str().trim()).filter(|s| !s.is_empty())
}
