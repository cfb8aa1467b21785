//! Session state: who is signed in, and what the holder is doing about it.

use serde::{Deserialize, Serialize};

use super::error::DomainError;
use super::user::{DoctorProfile, PatientId, PatientProfile};

/// Role of an authenticated portal user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Clinician account, signed in by email.
    Doctor,
    /// Patient account, signed in by phone.
    Patient,
}

/// Current identity held by a [`SessionHolder`](super::SessionHolder).
///
/// A session carries exactly one role or none, so "doctor and patient at
/// once" cannot be represented.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", content = "user", rename_all = "snake_case")]
pub enum Session {
    /// Nobody is signed in.
    #[default]
    Anonymous,
    /// A doctor is signed in.
    Doctor(DoctorProfile),
    /// A patient is signed in.
    Patient(PatientProfile),
}

impl Session {
    /// Role of the signed-in user, if any.
    pub fn role(&self) -> Option<Role> {
        match self {
            Self::Anonymous => None,
            Self::Doctor(_) => Some(Role::Doctor),
            Self::Patient(_) => Some(Role::Patient),
        }
    }

    /// Whether anyone is signed in.
    pub fn is_authenticated(&self) -> bool {
        !matches!(self, Self::Anonymous)
    }

    /// Whether a doctor is signed in.
    pub fn is_doctor(&self) -> bool {
        matches!(self, Self::Doctor(_))
    }

    /// Whether a patient is signed in.
    pub fn is_patient(&self) -> bool {
        matches!(self, Self::Patient(_))
    }

    /// Patient identifier when a patient is signed in.
    pub fn patient_id(&self) -> Option<PatientId> {
        match self {
            Self::Patient(profile) => Some(profile.id),
            Self::Anonymous | Self::Doctor(_) => None,
        }
    }

    /// Display name of the signed-in user.
    pub fn display_name(&self) -> Option<&str> {
        match self {
            Self::Anonymous => None,
            Self::Doctor(profile) => Some(profile.name.as_str()),
            Self::Patient(profile) => Some(profile.name.as_str()),
        }
    }
}

/// Point-in-time copy of a holder's observable state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    /// Signed-in identity.
    pub session: Session,
    /// True while an operation is in flight, and before the first
    /// `initialize` completes.
    pub loading: bool,
    /// Message of the last surfaced failure.
    pub error: Option<String>,
}

impl SessionSnapshot {
    pub(crate) fn starting() -> Self {
        Self {
            session: Session::Anonymous,
            loading: true,
            error: None,
        }
    }
}

/// Result of [`SessionHolder::logout`](super::SessionHolder::logout).
///
/// The local session is always cleared; this only reports whether the
/// backend acknowledged it.
#[derive(Debug, Clone, PartialEq)]
pub enum LogoutOutcome {
    /// The backend ended the session.
    Confirmed,
    /// The backend call failed; only the local session was cleared.
    LocalOnly {
        /// Failure reported by the backend or transport.
        error: DomainError,
    },
}

impl LogoutOutcome {
    /// Whether the backend acknowledged the logout.
    pub fn is_confirmed(&self) -> bool {
        matches!(self, Self::Confirmed)
    }
}
