//! Patient records and the dashboard overview built from them.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::ports::RecordsApi;
use crate::domain::{Error, PatientId, Session};

/// Record collections exposed per patient by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    /// Consultations.
    Visits,
    /// Lab and imaging tests.
    Tests,
    /// Prescriptions.
    Medications,
    /// Uploaded documents.
    Files,
}

impl RecordKind {
    /// Every collection, in dashboard order.
    pub const ALL: [Self; 4] = [Self::Visits, Self::Tests, Self::Medications, Self::Files];

    /// Collection path relative to the API root.
    pub fn collection_path(self) -> &'static str {
        match self {
            Self::Visits => "/visits/",
            Self::Tests => "/tests/",
            Self::Medications => "/medications/",
            Self::Files => "/files/",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Visits => "visits",
            Self::Tests => "tests",
            Self::Medications => "medications",
            Self::Files => "files",
        };
        f.write_str(label)
    }
}

/// One record as returned by the backend.
///
/// The client does not interpret record contents beyond the identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientRecord {
    /// Backend identifier, when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    /// Record fields.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// Payload for `POST /visits/`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisitRequest {
    /// Patient the visit belongs to.
    pub patient: PatientId,
    /// Visit details such as date, reason and notes.
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl VisitRequest {
    /// Start a visit with no details.
    pub fn new(patient: PatientId) -> Self {
        Self {
            patient,
            details: Map::new(),
        }
    }

    /// Attach one detail field.
    #[must_use]
    pub fn with_detail(mut self, key: impl Into<String>, value: Value) -> Self {
        self.details.insert(key.into(), value);
        self
    }
}

/// Everything a patient dashboard shows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatientOverview {
    /// Past and upcoming visits.
    pub visits: Vec<PatientRecord>,
    /// Test results.
    pub tests: Vec<PatientRecord>,
    /// Current and past prescriptions.
    pub medications: Vec<PatientRecord>,
    /// Uploaded documents.
    pub files: Vec<PatientRecord>,
}

/// Loads patient records through a [`RecordsApi`].
#[derive(Clone)]
pub struct PatientRecordsService<R> {
    api: Arc<R>,
}

impl<R> PatientRecordsService<R> {
    /// Create a service over the given API.
    pub fn new(api: Arc<R>) -> Self {
        Self { api }
    }
}

impl<R: RecordsApi> PatientRecordsService<R> {
    /// List one collection for `patient`.
    pub async fn records(
        &self,
        kind: RecordKind,
        patient: PatientId,
    ) -> Result<Vec<PatientRecord>, Error> {
        self.api
            .patient_records(kind, patient)
            .await
            .map_err(|err| err.to_domain(&format!("Failed to load {kind}")))
    }

    /// Load every collection for `patient` concurrently.
    ///
    /// The first failure aborts the overview.
    pub async fn overview(&self, patient: PatientId) -> Result<PatientOverview, Error> {
        let (visits, tests, medications, files) = tokio::try_join!(
            self.records(RecordKind::Visits, patient),
            self.records(RecordKind::Tests, patient),
            self.records(RecordKind::Medications, patient),
            self.records(RecordKind::Files, patient),
        )?;
        Ok(PatientOverview {
            visits,
            tests,
            medications,
            files,
        })
    }

    /// Load the overview of the patient signed into `session`.
    pub async fn overview_for(&self, session: &Session) -> Result<PatientOverview, Error> {
        let patient = session
            .patient_id()
            .ok_or_else(|| Error::unauthorized("a patient must be signed in"))?;
        self.overview(patient).await
    }

    /// Record a visit.
    pub async fn create_visit(&self, visit: &VisitRequest) -> Result<PatientRecord, Error> {
        self.api
            .create_visit(visit)
            .await
            .map_err(|err| err.to_domain("Failed to create visit"))
    }

    /// Fetch one visit.
    pub async fn visit_details(&self, visit_id: u64) -> Result<PatientRecord, Error> {
        self.api
            .visit_details(visit_id)
            .await
            .map_err(|err| err.to_domain("Failed to load visit"))
    }
}
