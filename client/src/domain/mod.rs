//! Domain primitives, services and ports.
//!
//! Purpose: keep portal identities, the session state machine and record
//! workflows independent of HTTP. Services depend only on the traits in
//! [`ports`]; the reqwest adapter lives in [`crate::outbound`].
//!
//! Public surface:
//! - Error (alias to `error::DomainError`): display-ready failure.
//! - Session / SessionHolder: who is signed in, and the operations that
//!   change it.
//! - PatientRecordsService, FileUploadService, Conversation: dashboard,
//!   upload and assistant workflows.

pub mod assistant;
pub mod auth;
pub mod error;
pub mod ports;
pub mod records;
pub mod session;
pub mod session_service;
pub mod upload;
pub mod user;

pub use self::assistant::{
    ChatMessage, Conversation, DocumentResponder, KeywordResponder, KeywordRule,
    RemoteResponder, Responder, Sender,
};
pub use self::auth::{CredentialsValidationError, DoctorCredentials, PatientCredentials};
pub use self::error::{DomainError as Error, ErrorCode, ErrorValidationError};
pub use self::records::{
    PatientOverview, PatientRecord, PatientRecordsService, RecordKind, VisitRequest,
};
pub use self::session::{LogoutOutcome, Role, Session, SessionSnapshot};
pub use self::session_service::SessionHolder;
pub use self::upload::{
    FileUploadService, PDF_CONTENT_TYPE, UploadCandidate, UploadQueue, UploadStatus, UploadedFile,
    format_file_size,
};
pub use self::user::{
    DoctorId, DoctorProfile, DoctorRegistration, PatientId, PatientProfile, PatientRegistration,
    RegistrationReceipt, UserValidationError,
};
