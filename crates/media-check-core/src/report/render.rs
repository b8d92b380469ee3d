use std::fmt::Write;
use std::fs;
use std::io::{self, Write as _};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::Context;

use super::{ComplianceReport, ComplianceStatus};
use crate::media::store::numbered_path;

/// Format styles supported by the built-in renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Human,
    Json,
}

/// Produce a report string from a `ComplianceReport` using the desired format.
pub fn render_report(report: &ComplianceReport, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Human => render_human(report),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(report)?),
    }
}

/// One-line verdict matching the report badge.
pub fn status_message(report: &ComplianceReport) -> String {
    match report.status() {
        ComplianceStatus::Pass => format!(
            "This content meets compliance guidelines. Score: {}/100",
            report.score()
        ),
        ComplianceStatus::PartialFail => {
            "Some issues found. Review the highlighted sections and apply suggested changes."
                .to_string()
        }
        ComplianceStatus::Fail => {
            "Critical compliance issues detected. Stop publishing until these are resolved."
                .to_string()
        }
    }
}

fn render_human(report: &ComplianceReport) -> anyhow::Result<String> {
    let mut out = String::new();
    let metadata = report.metadata();
    writeln!(
        out,
        "File: {} ({})",
        metadata.file_name,
        format_file_size(metadata.file_size)
    )?;
    if let Some(duration) = metadata.duration_sec {
        writeln!(out, "Duration: {}", format_duration(duration))?;
    }
    writeln!(out, "Checked At: {}", metadata.checked_at)?;
    writeln!(
        out,
        "Status: {} • Score: {}/100",
        report.status().as_str().to_ascii_uppercase(),
        report.score()
    )?;
    writeln!(out, "{}", status_message(report))?;
    writeln!(out)?;

    if report.issues().is_empty() {
        writeln!(out, "No issues detected.")?;
        return Ok(out);
    }

    writeln!(out, "Issues ({}):", report.summary().issues_count)?;
    for issue in report.issues() {
        let at = issue
            .timestamp
            .as_deref()
            .map(|ts| format!(" @ {ts}"))
            .unwrap_or_default();
        writeln!(
            out,
            "  - {id} [{severity}] {title}{at}",
            id = issue.id,
            severity = issue.severity.as_str(),
            title = single_line(&issue.title),
        )?;
        if !issue.description.trim().is_empty() {
            writeln!(out, "    {}", single_line(&issue.description))?;
        }
        writeln!(out, "    Recommendation: {}", single_line(&issue.recommendation))?;
    }

    Ok(out)
}

fn single_line(input: &str) -> String {
    input
        .chars()
        .map(|c| match c {
            '\n' | '\r' => ' ',
            _ => c,
        })
        .collect()
}

fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit + 1 < UNITS.len() {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}

fn format_duration(seconds: f64) -> String {
    let total = seconds.max(0.0).round() as u64;
    let (hours, minutes, secs) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes}:{secs:02}")
    }
}

/// File name used for an export taken at `now`: `compliance-report-YYYY-MM-DD.json`.
pub fn export_file_name(now: SystemTime) -> String {
    let stamp = humantime::format_rfc3339_seconds(now).to_string();
    let date = stamp.split('T').next().unwrap_or(&stamp);
    format!("compliance-report-{date}.json")
}

/// Write the report verbatim as pretty JSON into `dir`, returning the file path.
///
/// An existing export is never replaced; later ones on the same day get a
/// `-1`, `-2`, ... suffix.
pub fn export_report(report: &ComplianceReport, dir: &Path) -> anyhow::Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create export directory {}", dir.display()))?;
    let body = serde_json::to_string_pretty(report)?;
    let name = export_file_name(SystemTime::now());
    let mut counter = 0usize;
    loop {
        let path = numbered_path(dir, &name, counter);
        match fs::OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                file.write_all(body.as_bytes())
                    .with_context(|| format!("failed to write report to {}", path.display()))?;
                tracing::info!(path = %path.display(), "report exported");
                return Ok(path);
            }
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => counter += 1,
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed to create report file {}", path.display()))
            }
        }
    }
}

/// Read back a report previously written by [`export_report`].
pub fn load_report(path: &Path) -> anyhow::Result<ComplianceReport> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read report at {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("invalid report JSON in {}", path.display()))
}
