use std::collections::HashMap;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Deserializer};

const DEFAULT_BASE_URL: &str = "http://localhost:8000/";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Which backend strategy to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Http,
    #[default]
    Mock,
}

impl BackendKind {
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "http" => Some(Self::Http),
            "mock" => Some(Self::Mock),
            _ => None,
        }
    }
}

/// Backend connection settings, read from a config file and/or the environment.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BackendSettings {
    pub kind: BackendKind,
    pub base_url: String,
    /// Fixed deadline applied to every request.
    #[serde(deserialize_with = "deserialize_duration")]
    pub timeout: Duration,
    /// Artificial delay added by the mock backend: milliseconds or a duration string.
    #[serde(deserialize_with = "deserialize_latency")]
    pub mock_latency: Duration,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            kind: BackendKind::default(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            mock_latency: Duration::ZERO,
        }
    }
}

impl BackendSettings {
    const BACKEND_ENV: &'static str = "MEDIA_CHECK_BACKEND";
    const BASE_URL_ENV: &'static str = "MEDIA_CHECK_BASE_URL";
    const TIMEOUT_ENV: &'static str = "MEDIA_CHECK_TIMEOUT";
    const MOCK_LATENCY_ENV: &'static str = "MEDIA_CHECK_MOCK_LATENCY_MS";

    /// Load settings from environment variables on top of the defaults.
    ///
    /// * `MEDIA_CHECK_BACKEND`: `http` or `mock` (default: `mock`).
    /// * `MEDIA_CHECK_BASE_URL`: backend base URL (default: `http://localhost:8000/`).
    /// * `MEDIA_CHECK_TIMEOUT`: request deadline such as `30s` or `5m` (default: `5m`).
    /// * `MEDIA_CHECK_MOCK_LATENCY_MS`: simulated mock latency in milliseconds.
    pub fn from_env() -> Result<Self> {
        Self::default().with_env()
    }

    /// Apply environment overrides to already-loaded settings.
    pub fn with_env(self) -> Result<Self> {
        self.with_overrides(&std::env::vars().collect())
    }

    fn with_overrides(mut self, vars: &HashMap<String, String>) -> Result<Self> {
        let get = |key: &str| {
            vars.get(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(kind) = get(Self::BACKEND_ENV) {
            self.kind = BackendKind::parse(&kind).with_context(|| {
                format!(
                    "environment variable {} must be `http` or `mock` (got `{}`)",
                    Self::BACKEND_ENV,
                    kind
                )
            })?;
        }
        if let Some(base_url) = get(Self::BASE_URL_ENV) {
            self.base_url = base_url;
        }
        if let Some(timeout) = get(Self::TIMEOUT_ENV) {
            self.timeout = humantime::parse_duration(&timeout).with_context(|| {
                format!("invalid duration `{}` in {}", timeout, Self::TIMEOUT_ENV)
            })?;
        }
        if let Some(latency) = get(Self::MOCK_LATENCY_ENV) {
            let millis: u64 = latency.parse().with_context(|| {
                format!("invalid milliseconds `{}` in {}", latency, Self::MOCK_LATENCY_ENV)
            })?;
            self.mock_latency = Duration::from_millis(millis);
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.timeout.is_zero() {
            bail!("backend timeout must be greater than zero");
        }
        if self.kind == BackendKind::Http {
            reqwest::Url::parse(&self.base_url)
                .with_context(|| format!("invalid backend base URL `{}`", self.base_url))?;
        }
        Ok(())
    }
}

fn deserialize_duration<'de, D>(deserializer: D) -> std::result::Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    humantime::parse_duration(raw.trim()).map_err(serde::de::Error::custom)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LatencyValue {
    Millis(u64),
    Text(String),
}

fn deserialize_latency<'de, D>(deserializer: D) -> std::result::Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    match LatencyValue::deserialize(deserializer)? {
        LatencyValue::Millis(millis) => Ok(Duration::from_millis(millis)),
        LatencyValue::Text(raw) => {
            humantime::parse_duration(raw.trim()).map_err(serde::de::Error::custom)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults_to_mock_backend() {
        let settings = BackendSettings::default()
            .with_overrides(&HashMap::new())
            .expect("defaults are valid");
        assert_eq!(settings.kind, BackendKind::Mock);
        assert_eq!(settings.base_url, DEFAULT_BASE_URL);
        assert_eq!(settings.timeout, Duration::from_secs(300));
        assert!(settings.mock_latency.is_zero());
    }

    #[test]
    fn parses_overrides() {
        let settings = BackendSettings::default()
            .with_overrides(&vars(&[
                ("MEDIA_CHECK_BACKEND", "HTTP"),
                ("MEDIA_CHECK_BASE_URL", "http://analysis.internal:9000"),
                ("MEDIA_CHECK_TIMEOUT", "45s"),
                ("MEDIA_CHECK_MOCK_LATENCY_MS", "250"),
            ]))
            .expect("should parse overrides");
        assert_eq!(settings.kind, BackendKind::Http);
        assert_eq!(settings.base_url, "http://analysis.internal:9000");
        assert_eq!(settings.timeout, Duration::from_secs(45));
        assert_eq!(settings.mock_latency, Duration::from_millis(250));
    }

    #[test]
    fn blank_values_are_ignored() {
        let settings = BackendSettings::default()
            .with_overrides(&vars(&[("MEDIA_CHECK_BACKEND", "  ")]))
            .unwrap();
        assert_eq!(settings.kind, BackendKind::Mock);
    }

    #[test]
    fn rejects_unknown_backend() {
        let err = BackendSettings::default()
            .with_overrides(&vars(&[("MEDIA_CHECK_BACKEND", "grpc")]))
            .expect_err("unknown backend should error");
        assert!(err.to_string().contains("MEDIA_CHECK_BACKEND"));
    }

    #[test]
    fn rejects_bad_timeout_and_url() {
        let err = BackendSettings::default()
            .with_overrides(&vars(&[("MEDIA_CHECK_TIMEOUT", "soon")]))
            .expect_err("bad duration should error");
        assert!(err.to_string().contains("MEDIA_CHECK_TIMEOUT"));

        let err = BackendSettings::default()
            .with_overrides(&vars(&[
                ("MEDIA_CHECK_BACKEND", "http"),
                ("MEDIA_CHECK_BASE_URL", "not a url"),
            ]))
            .expect_err("bad url should error");
        assert!(err.to_string().contains("base URL"));
    }

    #[test]
    fn deserializes_from_json_with_humantime_durations() {
        let settings: BackendSettings = serde_json::from_str(
            r#"{ "kind": "http", "base_url": "http://127.0.0.1:8000", "timeout": "2m" }"#,
        )
        .unwrap();
        assert_eq!(settings.kind, BackendKind::Http);
        assert_eq!(settings.timeout, Duration::from_secs(120));
        assert!(settings.mock_latency.is_zero());
    }

    #[test]
    fn mock_latency_accepts_millis_or_duration_text() {
        let millis: BackendSettings =
            serde_json::from_str(r#"{ "mock_latency": 250 }"#).unwrap();
        assert_eq!(millis.mock_latency, Duration::from_millis(250));

        let text: BackendSettings =
            serde_json::from_str(r#"{ "mock_latency": "1s 500ms" }"#).unwrap();
        assert_eq!(text.mock_latency, Duration::from_millis(1500));

        assert!(serde_json::from_str::<BackendSettings>(r#"{ "mock_latency": -5 }"#).is_err());
    }
}
