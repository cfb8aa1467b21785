//! In-memory [`AuthApi`] used by session tests.

use async_trait::async_trait;

use super::{AuthApi, PortalApiError};
use crate::domain::{
    DoctorCredentials, DoctorId, DoctorProfile, DoctorRegistration, PatientCredentials, PatientId,
    PatientProfile, PatientRegistration, RegistrationReceipt,
};

/// In-memory authenticator with one doctor and one patient account.
///
/// - doctor: `doctor@portal.example` / `password`
/// - patient: `555-1234` / `secret`
///
/// The fixture has no cookie jar, so `patient_profile` always reports an
/// unauthenticated caller.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureAuthApi;

const FIXTURE_DOCTOR_EMAIL: &str = "doctor@portal.example";
const FIXTURE_PATIENT_PHONE: &str = "555-1234";

#[async_trait]
impl AuthApi for FixtureAuthApi {
    async fn doctor_login(
        &self,
        credentials: &DoctorCredentials,
    ) -> Result<DoctorProfile, PortalApiError> {
        if credentials.email() != FIXTURE_DOCTOR_EMAIL || credentials.password() != "password" {
            return Err(PortalApiError::rejected(401_u16, "Invalid email or password"));
        }
        let id = DoctorId::new(1)
            .map_err(|err| PortalApiError::decode(format!("invalid fixture doctor id: {err}")))?;
        Ok(DoctorProfile {
            id,
            name: "Dr. Sarah Johnson".to_owned(),
            email: Some(FIXTURE_DOCTOR_EMAIL.to_owned()),
            extra: serde_json::Map::new(),
        })
    }

    async fn patient_login(
        &self,
        credentials: &PatientCredentials,
    ) -> Result<PatientProfile, PortalApiError> {
        if credentials.phone() != FIXTURE_PATIENT_PHONE || credentials.password() != "secret" {
            return Err(PortalApiError::rejected(401_u16, "Invalid phone or password"));
        }
        let id = PatientId::new(1)
            .map_err(|err| PortalApiError::decode(format!("invalid fixture patient id: {err}")))?;
        Ok(PatientProfile {
            id,
            name: "John Doe".to_owned(),
            phone: Some(FIXTURE_PATIENT_PHONE.to_owned()),
            extra: serde_json::Map::new(),
        })
    }

    async fn logout(&self) -> Result<(), PortalApiError> {
        Ok(())
    }

    async fn register_doctor(
        &self,
        registration: &DoctorRegistration,
    ) -> Result<RegistrationReceipt, PortalApiError> {
        if registration.email() == FIXTURE_DOCTOR_EMAIL {
            return Err(PortalApiError::rejected(400_u16, "Email already registered"));
        }
        Ok(RegistrationReceipt::default())
    }

    async fn register_patient(
        &self,
        registration: &PatientRegistration,
    ) -> Result<RegistrationReceipt, PortalApiError> {
        if registration.phone() == FIXTURE_PATIENT_PHONE {
            return Err(PortalApiError::rejected(400_u16, "Phone already registered"));
        }
        Ok(RegistrationReceipt::default())
    }

    async fn patient_profile(&self) -> Result<Option<PatientProfile>, PortalApiError> {
        Err(PortalApiError::rejected(401_u16, "Authentication credentials were not provided."))
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for the fixture accounts.
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("doctor@portal.example", "password", true)]
    #[case("doctor@portal.example", "wrong", false)]
    #[case("other@portal.example", "password", false)]
    #[tokio::test]
    async fn fixture_doctor_login_checks_credentials(
        #[case] email: &str,
        #[case] password: &str,
        #[case] should_succeed: bool,
    ) {
        let creds = DoctorCredentials::try_from_parts(email, password).expect("credentials shape");
        let result = FixtureAuthApi.doctor_login(&creds).await;
        match (should_succeed, result) {
            (true, Ok(profile)) => assert_eq!(profile.id.get(), 1),
            (false, Err(err)) => assert_eq!(err.status(), Some(401)),
            (true, Err(err)) => panic!("expected success, got error: {err:?}"),
            (false, Ok(profile)) => panic!("expected failure, got success: {profile:?}"),
        }
    }

    #[rstest]
    #[tokio::test]
    async fn fixture_profile_is_unauthenticated() {
        let err = FixtureAuthApi
            .patient_profile()
            .await
            .expect_err("fixture has no session");
        assert_eq!(err.status(), Some(401));
    }
}
