use std::path::PathBuf;

use thiserror::Error;
use tracing::{info, instrument};

use crate::backend::{BackendClient, TransportError};
use crate::media::{
    is_youtube_url, validate_file, validate_text, validate_url, ValidationError,
    DEFAULT_MAX_FILE_BYTES,
};
use crate::report::{truncate_chars, ComplianceReport, ReportSubject};
use crate::transform::ResponseTransformer;

const TEXT_PREVIEW_CHARS: usize = 100;
const TEXT_INPUT_NAME: &str = "text-input.txt";

/// Content a user asked to have checked.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckRequest {
    File {
        path: PathBuf,
        duration_sec: Option<f64>,
    },
    Url {
        url: String,
    },
    Text {
        text: String,
    },
}

/// Why a check produced no report.
#[derive(Debug, Error)]
pub enum CheckError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("failed to read `{}`: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CheckError {
    /// Message to show next to the input or as a retry prompt.
    pub fn user_message(&self) -> String {
        match self {
            Self::Transport(err) => err.user_message().to_string(),
            other => other.to_string(),
        }
    }
}

/// Backend message plus the report subject derived from a validated request.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedCheck {
    pub message: String,
    pub subject: ReportSubject,
}

/// Validates requests, asks the backend for an analysis and builds the report.
pub struct ComplianceChecker<B> {
    backend: B,
    transformer: ResponseTransformer,
    max_file_bytes: u64,
}

impl<B: BackendClient> ComplianceChecker<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            transformer: ResponseTransformer::new(),
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
        }
    }

    pub fn with_max_file_bytes(mut self, max_file_bytes: u64) -> Self {
        self.max_file_bytes = max_file_bytes;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Validate a request and phrase it for the backend. No request is sent.
    pub async fn prepare(&self, request: &CheckRequest) -> Result<PreparedCheck, CheckError> {
        match request {
            CheckRequest::File { path, duration_sec } => {
                let size = tokio::fs::metadata(path)
                    .await
                    .map_err(|source| CheckError::Io {
                        path: path.clone(),
                        source,
                    })?
                    .len();
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string());
                let media = validate_file(&name, size, self.max_file_bytes)?;
                Ok(PreparedCheck {
                    message: format!(
                        "{}: {} ({} bytes, {})",
                        media.kind.message_label(),
                        media.name,
                        media.size,
                        media.mime
                    ),
                    subject: ReportSubject::new(media.name, media.size)
                        .with_duration(*duration_sec),
                })
            }
            CheckRequest::Url { url } => {
                validate_url(url)?;
                let label = if is_youtube_url(url) {
                    "YouTube URL"
                } else {
                    "URL"
                };
                Ok(PreparedCheck {
                    message: format!("{label}: {}", url.trim()),
                    subject: ReportSubject::new(url.trim(), 0),
                })
            }
            CheckRequest::Text { text } => {
                validate_text(text)?;
                Ok(PreparedCheck {
                    message: format!(
                        "Text content: {}...",
                        truncate_chars(text, TEXT_PREVIEW_CHARS)
                    ),
                    subject: ReportSubject::new(TEXT_INPUT_NAME, text.chars().count() as u64),
                })
            }
        }
    }

    /// Run a full check and return the resulting report.
    #[instrument(name = "compliance_check", skip_all)]
    pub async fn check(&self, request: &CheckRequest) -> Result<ComplianceReport, CheckError> {
        let prepared = self.prepare(request).await?;
        let response = self.backend.run(&prepared.message).await?;
        let report = self.transformer.transform(&response, &prepared.subject);
        info!(
            file_name = %report.metadata().file_name,
            score = report.score(),
            status = report.status().as_str(),
            "compliance check finished"
        );
        Ok(report)
    }
}
