//! Session holder: the single owner of "who is signed in".
//!
//! The holder is an explicit value created at application start and dropped
//! at teardown; callers that need the session share it by reference or
//! `Arc`. Every state-changing operation passes through one FIFO gate, so a
//! `logout` issued while a login is pending runs after that login settles.
//!
//! State transitions:
//!
//! ```text
//! Anonymous --login ok--> Doctor | Patient --logout--> Anonymous
//! ```
//!
//! Failed logins and registrations only touch `error`.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, warn};

use crate::domain::ports::AuthApi;
use crate::domain::{
    DoctorCredentials, DoctorProfile, DoctorRegistration, Error, LogoutOutcome,
    PatientCredentials, PatientProfile, PatientRegistration, RegistrationReceipt, Session,
    SessionSnapshot,
};

const LOGIN_FAILED: &str = "Login failed";
const LOGOUT_FAILED: &str = "Logout failed";
const REGISTRATION_FAILED: &str = "Registration failed";

/// Holds the current session and mediates every authentication call.
pub struct SessionHolder<A> {
    api: Arc<A>,
    state: Mutex<SessionSnapshot>,
    gate: AsyncMutex<()>,
}

/// Marks an operation in flight; clears `loading` on drop, including when
/// the operation's future is cancelled.
struct InFlight<'a> {
    state: &'a Mutex<SessionSnapshot>,
    _gate: tokio::sync::MutexGuard<'a, ()>,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        lock(self.state).loading = false;
    }
}

fn lock(state: &Mutex<SessionSnapshot>) -> MutexGuard<'_, SessionSnapshot> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<A> SessionHolder<A> {
    /// Create a holder in its start-up state: anonymous and loading until
    /// [`SessionHolder::initialize`] completes.
    pub fn new(api: Arc<A>) -> Self {
        Self {
            api,
            state: Mutex::new(SessionSnapshot::starting()),
            gate: AsyncMutex::new(()),
        }
    }

    /// Copy of the observable state.
    pub fn snapshot(&self) -> SessionSnapshot {
        lock(&self.state).clone()
    }

    /// Current identity.
    pub fn session(&self) -> Session {
        lock(&self.state).session.clone()
    }

    /// Whether an operation is in flight.
    pub fn is_loading(&self) -> bool {
        lock(&self.state).loading
    }

    /// Message of the last surfaced failure.
    pub fn last_error(&self) -> Option<String> {
        lock(&self.state).error.clone()
    }

    /// Wait for the gate, then mark the holder as busy.
    async fn begin(&self, clear_error: bool) -> InFlight<'_> {
        let gate = self.gate.lock().await;
        let mut state = lock(&self.state);
        state.loading = true;
        if clear_error {
            state.error = None;
        }
        drop(state);
        InFlight {
            state: &self.state,
            _gate: gate,
        }
    }

    fn set_session(&self, session: Session) {
        lock(&self.state).session = session;
    }

    fn record_error(&self, error: &Error) {
        lock(&self.state).error = Some(error.message().to_owned());
    }
}

impl<A: AuthApi> SessionHolder<A> {
    /// Restore a patient session from the backend's cookie, if one exists.
    ///
    /// Never fails: a missing or unreadable session simply leaves the holder
    /// anonymous. The error state is not touched.
    pub async fn initialize(&self) {
        let _in_flight = self.begin(false).await;
        match self.api.patient_profile().await {
            Ok(Some(profile)) => {
                debug!(patient_id = %profile.id, "restored patient session");
                self.set_session(Session::Patient(profile));
            }
            Ok(None) => {
                debug!("profile endpoint returned no content; session is anonymous");
                self.set_session(Session::Anonymous);
            }
            Err(err) => {
                debug!(error = %err, "user not authenticated or not a patient");
                self.set_session(Session::Anonymous);
            }
        }
    }

    /// Sign in as a doctor.
    ///
    /// On failure the previous session is kept, `error` holds the message,
    /// and the same error is returned.
    pub async fn doctor_login(
        &self,
        credentials: &DoctorCredentials,
    ) -> Result<DoctorProfile, Error> {
        let _in_flight = self.begin(true).await;
        match self.api.doctor_login(credentials).await {
            Ok(profile) => {
                info!(doctor_id = %profile.id, "doctor signed in");
                self.set_session(Session::Doctor(profile.clone()));
                Ok(profile)
            }
            Err(err) => Err(self.fail(&err.to_domain(LOGIN_FAILED))),
        }
    }

    /// Sign in as a patient.
    ///
    /// On failure the previous session is kept, `error` holds the message,
    /// and the same error is returned.
    pub async fn patient_login(
        &self,
        credentials: &PatientCredentials,
    ) -> Result<PatientProfile, Error> {
        let _in_flight = self.begin(true).await;
        match self.api.patient_login(credentials).await {
            Ok(profile) => {
                info!(patient_id = %profile.id, "patient signed in");
                self.set_session(Session::Patient(profile.clone()));
                Ok(profile)
            }
            Err(err) => Err(self.fail(&err.to_domain(LOGIN_FAILED))),
        }
    }

    /// Sign out.
    ///
    /// The local session is cleared whatever the backend answers. A backend
    /// failure is stored in `error` and reported as
    /// [`LogoutOutcome::LocalOnly`] rather than as an `Err`.
    pub async fn logout(&self) -> LogoutOutcome {
        let _in_flight = self.begin(false).await;
        let outcome = match self.api.logout().await {
            Ok(()) => LogoutOutcome::Confirmed,
            Err(err) => {
                let error = err.to_domain(LOGOUT_FAILED);
                warn!(error = %err, "backend logout failed; clearing local session");
                self.record_error(&error);
                LogoutOutcome::LocalOnly { error }
            }
        };
        self.set_session(Session::Anonymous);
        outcome
    }

    /// Register a doctor account. The current session is left unchanged.
    pub async fn register_doctor(
        &self,
        registration: &DoctorRegistration,
    ) -> Result<RegistrationReceipt, Error> {
        let _in_flight = self.begin(true).await;
        self.api
            .register_doctor(registration)
            .await
            .map_err(|err| self.fail(&err.to_domain(REGISTRATION_FAILED)))
    }

    /// Register a patient account. The current session is left unchanged.
    pub async fn register_patient(
        &self,
        registration: &PatientRegistration,
    ) -> Result<RegistrationReceipt, Error> {
        let _in_flight = self.begin(true).await;
        self.api
            .register_patient(registration)
            .await
            .map_err(|err| self.fail(&err.to_domain(REGISTRATION_FAILED)))
    }

    fn fail(&self, error: &Error) -> Error {
        debug!(code = ?error.code(), message = error.message(), "session operation failed");
        self.record_error(error);
        error.clone()
    }
}

#[cfg(test)]
#[path = "session_service_tests.rs"]
mod tests;
