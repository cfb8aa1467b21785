//! Driven port for uploading patient documents.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::PortalApiError;
use crate::domain::UploadCandidate;

/// Storage locations reported by the backend for an upload batch.
///
/// Entries are positional: index `i` describes the `i`-th submitted file.
/// Either list may be shorter than the batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadReceipt {
    /// Server-side paths of stored files.
    #[serde(default)]
    pub file_paths: Vec<String>,
    /// Server-side identifiers of stored files.
    #[serde(default)]
    pub file_ids: Vec<String>,
}

/// Port for sending document batches to the backend.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FileApi: Send + Sync {
    /// Upload every candidate in one multipart request.
    async fn upload_files(
        &self,
        files: &[UploadCandidate],
    ) -> Result<UploadReceipt, PortalApiError>;
}
