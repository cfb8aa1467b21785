//! Driven port for the backend's question-answering endpoint.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::PortalApiError;
use crate::domain::PatientId;

/// Answer produced by the backend assistant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssistantReply {
    /// Answer text.
    pub answer: String,
}

/// Port for asking the backend assistant about a patient's records.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AssistantApi: Send + Sync {
    /// Ask one question in the context of `patient`.
    async fn interact(
        &self,
        patient: PatientId,
        question: &str,
    ) -> Result<AssistantReply, PortalApiError>;
}
