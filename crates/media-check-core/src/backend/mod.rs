mod http;
mod mock;
mod settings;

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::transform::BackendResponse;

pub use http::HttpBackendClient;
pub use mock::MockBackendClient;
pub use settings::{BackendKind, BackendSettings};

/// Session handed out after a media directory has been submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectorySubmission {
    pub session_id: String,
    pub message: String,
    pub directory_path: String,
}

/// Assistant answer to a chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    pub message: String,
    pub timestamp: String,
}

/// Failures while talking to the analysis backend.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("backend unreachable at {url}: {reason}")]
    Unreachable { url: String, reason: String },
    #[error("backend did not answer within {}", format_timeout(.timeout))]
    Timeout { timeout: Duration },
    #[error("backend returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("failed to decode backend response: {reason}")]
    Decode { reason: String },
}

impl TransportError {
    /// Generic message suitable for showing to an end user.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Unreachable { .. } => {
                "Unable to connect to server. Check if the backend is running and try again."
            }
            Self::Timeout { .. } => "Request timeout. The backend is taking too long; please try again.",
            Self::Status { .. } | Self::Decode { .. } => {
                "The backend could not process the request. Please try again."
            }
        }
    }
}

/// Capability for reaching the analysis backend. Implementations are chosen at
/// startup from [`BackendSettings`] via [`build_client`].
#[async_trait]
pub trait BackendClient: Send + Sync {
    /// Ask the backend to analyse the described content.
    async fn run(&self, message: &str) -> Result<BackendResponse, TransportError>;

    /// Register a local directory of saved media and open a chat session on it.
    async fn submit_directory(
        &self,
        directory_path: &str,
    ) -> Result<DirectorySubmission, TransportError>;

    /// Send a chat message within an optional session.
    async fn chat(
        &self,
        message: &str,
        session_id: Option<&str>,
    ) -> Result<ChatReply, TransportError>;
}

#[async_trait]
impl<T: BackendClient + ?Sized> BackendClient for Box<T> {
    async fn run(&self, message: &str) -> Result<BackendResponse, TransportError> {
        (**self).run(message).await
    }

    async fn submit_directory(
        &self,
        directory_path: &str,
    ) -> Result<DirectorySubmission, TransportError> {
        (**self).submit_directory(directory_path).await
    }

    async fn chat(
        &self,
        message: &str,
        session_id: Option<&str>,
    ) -> Result<ChatReply, TransportError> {
        (**self).chat(message, session_id).await
    }
}

/// Instantiate the backend strategy selected by `settings`.
pub fn build_client(settings: &BackendSettings) -> anyhow::Result<Box<dyn BackendClient>> {
    tracing::debug!(kind = ?settings.kind, "building backend client");
    match settings.kind {
        BackendKind::Http => Ok(Box::new(HttpBackendClient::new(settings)?)),
        BackendKind::Mock => Ok(Box::new(MockBackendClient::with_latency(
            settings.mock_latency,
        ))),
    }
}

fn format_timeout(timeout: &Duration) -> humantime::FormattedDuration {
    humantime::format_duration(*timeout)
}

pub(crate) fn now_rfc3339() -> String {
    humantime::format_rfc3339_millis(SystemTime::now()).to_string()
}

pub(crate) fn unix_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_messages_are_generic() {
        let err = TransportError::Status {
            status: 500,
            body: "stack trace".into(),
        };
        assert!(!err.user_message().contains("stack trace"));
        assert!(err.to_string().contains("500"));

        let err = TransportError::Timeout {
            timeout: Duration::from_secs(300),
        };
        assert!(err.to_string().contains("5m"));
        assert!(err.user_message().contains("try again"));
    }

    #[tokio::test]
    async fn builds_mock_client_from_settings() {
        let settings = BackendSettings::default();
        let client = build_client(&settings).unwrap();
        let response = client.run("Text content: hello...").await.unwrap();
        assert!(response.llm_response.is_some());
    }
}
