use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;
use tracing::debug;

use super::{
    now_rfc3339, unix_millis, BackendClient, ChatReply, DirectorySubmission, TransportError,
};
use crate::transform::{BackendPlan, BackendResponse};

const WELCOME: &str =
    "Hello! I'm your AI assistant. I've received your media file. How can I help you analyze it?";

const CHAT_REPLIES: [&str; 5] = [
    "That's an interesting question! Based on the media you uploaded, I can help you analyze it.",
    "I understand your query. The file you submitted contains valuable information.",
    "Great question! Let me help you with that. The media file shows various elements that we can explore.",
    "I've analyzed the content. Here are some insights from your uploaded file.",
    "Thanks for asking! The media you shared has been processed successfully.",
];

const VIDEO_NARRATIVE: &str = "Analysis of video content reveals the following compliance issues:

ISSUE: Inappropriate Language - Multiple instances of profanity detected at 00:45 and 01:23.
Recommendation: Remove or bleep profane language to meet platform guidelines.

ISSUE: Copyright Concern - Background music may be copyrighted material.
Recommendation: Verify licensing or replace with royalty-free music.

- Medium: Video quality drops below 720p in several segments.
Recommendation: Re-encode video maintaining minimum 720p resolution throughout.";

const DOCUMENT_NARRATIVE: &str = "Policy document review completed. The following issues were identified:

ISSUE: Outdated References - Document references regulations from 2018 that have been updated.
Recommendation: Update all regulatory references to current versions.

ISSUE: Missing Signatures - Section 4.2 requires authorized signatures which are absent.
Recommendation: Obtain required signatures from department heads.

- Low: Formatting inconsistencies in section headings.
Recommendation: Apply consistent heading styles throughout the document.";

const YOUTUBE_NARRATIVE: &str = "YouTube video compliance check completed:

ISSUE: Age-Restricted Content - Video contains content requiring age verification.
Recommendation: Enable age restrictions on the video or edit content.

- Medium: Thumbnail may be clickbait and violate community guidelines.
Recommendation: Update thumbnail to accurately represent video content.";

const URL_NARRATIVE: &str = "Article content analysis shows:

ISSUE: Factual Inaccuracy - Claims made in paragraph 3 lack proper citation.
Recommendation: Add credible sources or remove unverified claims.

- Low: Grammar and spelling errors detected in multiple sections.
Recommendation: Run spell check and review for grammatical correctness.";

const TEXT_NARRATIVE: &str = "Text content review findings:

- Medium: Potentially misleading statements detected.
Recommendation: Clarify ambiguous statements and provide supporting evidence.

- Low: Tone may not be appropriate for professional context.
Recommendation: Adjust language to maintain professional standards.";

/// Offline backend returning canned narratives, for demos and development.
#[derive(Debug, Default)]
pub struct MockBackendClient {
    latency: Duration,
    next_reply: AtomicUsize,
}

impl MockBackendClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency,
            next_reply: AtomicUsize::new(0),
        }
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            sleep(self.latency).await;
        }
    }

    /// Pick the canned narrative matching how the request message was phrased.
    fn narrative_for(message: &str) -> &'static str {
        if message.contains("Video file:") {
            VIDEO_NARRATIVE
        } else if message.contains("Document file:") {
            DOCUMENT_NARRATIVE
        } else if message.contains("YouTube URL:") {
            YOUTUBE_NARRATIVE
        } else if message.contains("URL:") {
            URL_NARRATIVE
        } else {
            TEXT_NARRATIVE
        }
    }
}

#[async_trait]
impl BackendClient for MockBackendClient {
    async fn run(&self, message: &str) -> Result<BackendResponse, TransportError> {
        self.simulate_latency().await;
        debug!(message_len = message.len(), "mock backend answering run");
        Ok(BackendResponse {
            plan: Some(BackendPlan::default()),
            tool_output: None,
            llm_response: Some(Self::narrative_for(message).to_string()),
        })
    }

    async fn submit_directory(
        &self,
        directory_path: &str,
    ) -> Result<DirectorySubmission, TransportError> {
        self.simulate_latency().await;
        Ok(DirectorySubmission {
            session_id: format!("mock_session_{}", unix_millis()),
            message: WELCOME.to_string(),
            directory_path: directory_path.to_string(),
        })
    }

    async fn chat(
        &self,
        _message: &str,
        _session_id: Option<&str>,
    ) -> Result<ChatReply, TransportError> {
        self.simulate_latency().await;
        let idx = self.next_reply.fetch_add(1, Ordering::Relaxed) % CHAT_REPLIES.len();
        Ok(ChatReply {
            message: CHAT_REPLIES[idx].to_string(),
            timestamp: now_rfc3339(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn run_picks_narrative_by_message_kind() {
        let client = MockBackendClient::new();
        let cases = [
            ("Video file: a.mp4 (1 bytes, video/mp4)", VIDEO_NARRATIVE),
            ("Document file: a.pdf (1 bytes, application/pdf)", DOCUMENT_NARRATIVE),
            ("YouTube URL: https://youtu.be/abc", YOUTUBE_NARRATIVE),
            ("URL: https://example.com/post", URL_NARRATIVE),
            ("Text content: hello...", TEXT_NARRATIVE),
            ("Audio file: a.mp3 (1 bytes, audio/mpeg)", TEXT_NARRATIVE),
        ];
        for (message, expected) in cases {
            let response = client.run(message).await.unwrap();
            assert_eq!(response.llm_response.as_deref(), Some(expected), "{message}");
            assert!(response.tool_output.is_none());
        }
    }

    #[tokio::test]
    async fn chat_rotates_replies() {
        let client = MockBackendClient::new();
        let first = client.chat("a", None).await.unwrap();
        let second = client.chat("b", None).await.unwrap();
        assert_eq!(first.message, CHAT_REPLIES[0]);
        assert_eq!(second.message, CHAT_REPLIES[1]);
    }

    #[tokio::test]
    async fn submit_directory_opens_mock_session() {
        let client = MockBackendClient::new();
        let submission = client.submit_directory("/tmp/media").await.unwrap();
        assert!(submission.session_id.starts_with("mock_session_"));
        assert_eq!(submission.message, WELCOME);
        assert_eq!(submission.directory_path, "/tmp/media");
    }

    #[tokio::test]
    async fn latency_is_simulated() {
        let client = MockBackendClient::with_latency(Duration::from_millis(30));
        let started = std::time::Instant::now();
        client.run("Text content: x").await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(30));
    }
}
