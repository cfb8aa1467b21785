//! Driven port for patient records: visits, tests, medications and files.

use async_trait::async_trait;

use super::PortalApiError;
use crate::domain::{PatientId, PatientRecord, RecordKind, VisitRequest};

/// Port for reading and creating patient records.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RecordsApi: Send + Sync {
    /// List one record collection for a patient.
    async fn patient_records(
        &self,
        kind: RecordKind,
        patient: PatientId,
    ) -> Result<Vec<PatientRecord>, PortalApiError>;

    /// Record a new visit.
    async fn create_visit(&self, visit: &VisitRequest) -> Result<PatientRecord, PortalApiError>;

    /// Fetch one visit by its identifier.
    async fn visit_details(&self, visit_id: u64) -> Result<PatientRecord, PortalApiError>;
}
