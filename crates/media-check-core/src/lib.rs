pub mod backend;
pub mod chat;
pub mod checker;
pub mod media;
pub mod report;
pub mod transform;

pub use backend::{
    build_client, BackendClient, BackendKind, BackendSettings, ChatReply, DirectorySubmission,
    HttpBackendClient, MockBackendClient, TransportError,
};
pub use chat::{ChatError, ChatMessage, ChatSession, MessageRole};
pub use checker::{CheckError, CheckRequest, ComplianceChecker, PreparedCheck};
pub use media::{store::MediaStore, MediaKind, ValidationError};
pub use report::{
    compliance_score, derive_status, ComplianceReport, ComplianceStatus, Issue, ReportMetadata,
    ReportSubject, ReportSummary, Severity,
};
pub use transform::{BackendResponse, PayloadError, ResponseTransformer, StructuredError};
