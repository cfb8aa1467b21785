//! Driven port for authentication calls against the portal backend.
//!
//! The session holder talks to this trait only, so its state machine can be
//! exercised with mocks instead of a live service.

use async_trait::async_trait;

use super::PortalApiError;
use crate::domain::{
    DoctorCredentials, DoctorProfile, DoctorRegistration, PatientCredentials, PatientProfile,
    PatientRegistration, RegistrationReceipt,
};

/// Port for credential exchange, logout, registration and profile lookup.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Exchange doctor credentials for a session; returns the doctor record.
    async fn doctor_login(
        &self,
        credentials: &DoctorCredentials,
    ) -> Result<DoctorProfile, PortalApiError>;

    /// Exchange patient credentials for a session; returns the patient record.
    async fn patient_login(
        &self,
        credentials: &PatientCredentials,
    ) -> Result<PatientProfile, PortalApiError>;

    /// End the backend session.
    async fn logout(&self) -> Result<(), PortalApiError>;

    /// Create a doctor account.
    async fn register_doctor(
        &self,
        registration: &DoctorRegistration,
    ) -> Result<RegistrationReceipt, PortalApiError>;

    /// Create a patient account.
    async fn register_patient(
        &self,
        registration: &PatientRegistration,
    ) -> Result<RegistrationReceipt, PortalApiError>;

    /// Fetch the signed-in patient's profile.
    ///
    /// `Ok(None)` means the backend answered without a body.
    async fn patient_profile(&self) -> Result<Option<PatientProfile>, PortalApiError>;
}

#[cfg(test)]
mod fixture;

#[cfg(test)]
pub use self::fixture::FixtureAuthApi;
