use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::{
    now_rfc3339, unix_millis, BackendClient, BackendSettings, ChatReply, DirectorySubmission,
    TransportError,
};
use crate::transform::BackendResponse;

const DEFAULT_WELCOME: &str = "Directory submitted successfully. How can I help you?";
const DEFAULT_CHAT_REPLY: &str = "I received your message.";

/// REST client for the analysis backend.
#[derive(Debug, Clone)]
pub struct HttpBackendClient {
    http: Client,
    base_url: String,
    timeout: Duration,
}

impl HttpBackendClient {
    pub fn new(settings: &BackendSettings) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("media-check/", env!("CARGO_PKG_VERSION")))
            .timeout(settings.timeout)
            .build()
            .context("failed to build backend HTTP client")?;
        Ok(Self {
            http,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            timeout: settings.timeout,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    #[instrument(name = "backend_post", skip(self, body))]
    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, TransportError>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.endpoint(path);
        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|err| self.classify(&url, err))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        debug!(status = status.as_u16(), "backend responded");
        response.json::<T>().await.map_err(|err| {
            if err.is_timeout() {
                TransportError::Timeout {
                    timeout: self.timeout,
                }
            } else {
                TransportError::Decode {
                    reason: err.to_string(),
                }
            }
        })
    }

    fn classify(&self, url: &str, err: reqwest::Error) -> TransportError {
        if err.is_timeout() {
            TransportError::Timeout {
                timeout: self.timeout,
            }
        } else {
            TransportError::Unreachable {
                url: url.to_string(),
                reason: err.to_string(),
            }
        }
    }
}

#[async_trait]
impl BackendClient for HttpBackendClient {
    async fn run(&self, message: &str) -> Result<BackendResponse, TransportError> {
        self.post("run", &RunRequest { message }).await
    }

    async fn submit_directory(
        &self,
        directory_path: &str,
    ) -> Result<DirectorySubmission, TransportError> {
        let reply: SubmitDirectoryResponse = self
            .post(
                "submit-directory",
                &SubmitDirectoryRequest {
                    directory_path,
                    timestamp: now_rfc3339(),
                },
            )
            .await?;
        Ok(DirectorySubmission {
            session_id: reply
                .session_id
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| format!("session_{}", unix_millis())),
            message: reply
                .message
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| DEFAULT_WELCOME.to_string()),
            directory_path: directory_path.to_string(),
        })
    }

    async fn chat(
        &self,
        message: &str,
        session_id: Option<&str>,
    ) -> Result<ChatReply, TransportError> {
        let reply: ChatResponse = self
            .post(
                "chat",
                &ChatRequest {
                    message,
                    session_id,
                    timestamp: now_rfc3339(),
                },
            )
            .await?;
        Ok(ChatReply {
            message: reply
                .message
                .filter(|m| !m.is_empty())
                .or(reply.response.filter(|m| !m.is_empty()))
                .unwrap_or_else(|| DEFAULT_CHAT_REPLY.to_string()),
            timestamp: now_rfc3339(),
        })
    }
}

#[derive(Serialize)]
struct RunRequest<'a> {
    message: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SubmitDirectoryRequest<'a> {
    directory_path: &'a str,
    timestamp: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ChatRequest<'a> {
    message: &'a str,
    session_id: Option<&'a str>,
    timestamp: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmitDirectoryResponse {
    #[serde(default)]
    session_id: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    response: Option<String>,
}
