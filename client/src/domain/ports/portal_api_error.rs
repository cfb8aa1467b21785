//! Error contract shared by every portal API port.

use super::define_port_error;
use crate::domain::{Error, ErrorCode};

define_port_error! {
    /// Errors surfaced while calling the portal backend.
    pub enum PortalApiError {
        /// Network transport failed before a response arrived.
        Transport { message: String } =>
            "portal transport failed: {message}",
        /// The call exceeded the configured timeout.
        Timeout { message: String } =>
            "portal request timed out: {message}",
        /// The backend answered with a non-2xx status.
        Rejected { status: u16, message: String } =>
            "portal rejected request with status {status}: {message}",
        /// The response body could not be decoded.
        Decode { message: String } =>
            "portal response decode failed: {message}",
        /// The adapter refused to build the request.
        InvalidRequest { message: String } =>
            "portal request invalid: {message}",
    }
}

impl PortalApiError {
    /// HTTP status of a rejected call.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Stable domain code for this failure.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Rejected { status, .. } => match status {
                401 => ErrorCode::Unauthorized,
                403 => ErrorCode::Forbidden,
                404 => ErrorCode::NotFound,
                409 => ErrorCode::Conflict,
                429 | 500..=599 => ErrorCode::ServiceUnavailable,
                _ => ErrorCode::InvalidRequest,
            },
            Self::Transport { .. } | Self::Timeout { .. } => ErrorCode::ServiceUnavailable,
            Self::Decode { .. } => ErrorCode::InternalError,
            Self::InvalidRequest { .. } => ErrorCode::InvalidRequest,
        }
    }

    /// Translate into a domain error for display.
    ///
    /// Rejections carry the backend's own message; every other failure uses
    /// its description. `fallback` covers a blank backend message.
    pub fn to_domain(&self, fallback: &str) -> Error {
        let message = match self {
            Self::Rejected { message, .. } => message.clone(),
            other => other.to_string(),
        };
        Error::with_fallback(self.code(), Some(message.as_str()), fallback)
    }
}
