//! Document upload: a PDF-only queue and the service that submits it.
//!
//! Upload failures never propagate as errors. The service reports an
//! [`UploadStatus`] and leaves the queue intact so the caller can retry.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

use crate::domain::ports::FileApi;

/// Content type accepted by the upload queue.
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

const UNKNOWN_PATH: &str = "Unknown path";
const UPLOAD_SUCCEEDED: &str = "Files uploaded successfully!";
const UPLOAD_FAILED: &str = "Failed to upload files";

/// A file selected for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadCandidate {
    file_name: String,
    content_type: String,
    bytes: Vec<u8>,
}

impl UploadCandidate {
    /// Describe a file by name, declared content type and contents.
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    /// Describe a PDF document.
    pub fn pdf(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self::new(file_name, PDF_CONTENT_TYPE, bytes)
    }

    /// File name shown to the user and sent to the backend.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Declared MIME type.
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// File contents.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Size in bytes.
    pub fn size(&self) -> u64 {
        u64::try_from(self.bytes.len()).unwrap_or(u64::MAX)
    }

    fn is_pdf(&self) -> bool {
        self.content_type.eq_ignore_ascii_case(PDF_CONTENT_TYPE)
    }
}

/// A file the backend has stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    /// Original file name.
    pub name: String,
    /// Size in bytes.
    pub size: u64,
    /// Server path, or `Unknown path` when the backend did not report one.
    pub path: String,
    /// Server id, or a `temp_<millis>_<index>` placeholder.
    pub id: String,
    /// When the batch was accepted.
    pub uploaded_at: DateTime<Utc>,
}

/// Pending files plus the history of files already uploaded.
#[derive(Debug, Clone, Default)]
pub struct UploadQueue {
    pending: Vec<UploadCandidate>,
    uploaded: Vec<UploadedFile>,
}

impl UploadQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue every PDF among `candidates`; returns names of rejected files.
    pub fn add(&mut self, candidates: impl IntoIterator<Item = UploadCandidate>) -> Vec<String> {
        let mut rejected = Vec::new();
        for candidate in candidates {
            if candidate.is_pdf() {
                self.pending.push(candidate);
            } else {
                rejected.push(candidate.file_name);
            }
        }
        rejected
    }

    /// Drop the pending file at `index`.
    pub fn remove(&mut self, index: usize) -> Option<UploadCandidate> {
        (index < self.pending.len()).then(|| self.pending.remove(index))
    }

    /// Files waiting to be uploaded.
    pub fn pending(&self) -> &[UploadCandidate] {
        &self.pending
    }

    /// Files uploaded so far, oldest first.
    pub fn uploaded(&self) -> &[UploadedFile] {
        &self.uploaded
    }

    /// Whether nothing is waiting.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Outcome of one upload attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UploadStatus {
    /// The queue was empty; nothing was sent.
    Skipped,
    /// Every pending file was stored.
    Succeeded {
        /// Files stored by this attempt.
        files: Vec<UploadedFile>,
        /// Confirmation for display.
        message: String,
    },
    /// The backend or transport refused the batch.
    Failed {
        /// Failure for display.
        message: String,
    },
}

/// Submits an [`UploadQueue`] through a [`FileApi`].
#[derive(Clone)]
pub struct FileUploadService<F> {
    api: Arc<F>,
    clock: Arc<dyn Clock>,
}

impl<F> FileUploadService<F> {
    /// Create a service; `clock` stamps uploads and placeholder ids.
    pub fn new(api: Arc<F>, clock: Arc<dyn Clock>) -> Self {
        Self { api, clock }
    }
}

impl<F: FileApi> FileUploadService<F> {
    /// Upload every pending file in `queue` as one batch.
    ///
    /// On success the pending files move into the queue's history. On
    /// failure they stay pending.
    pub async fn upload(&self, queue: &mut UploadQueue) -> UploadStatus {
        if queue.is_empty() {
            return UploadStatus::Skipped;
        }

        match self.api.upload_files(&queue.pending).await {
            Ok(receipt) => {
                let uploaded_at = self.clock.utc();
                let millis = uploaded_at.timestamp_millis();
                let files: Vec<UploadedFile> = queue
                    .pending
                    .drain(..)
                    .enumerate()
                    .map(|(index, candidate)| UploadedFile {
                        size: candidate.size(),
                        name: candidate.file_name,
                        path: receipt
                            .file_paths
                            .get(index)
                            .cloned()
                            .unwrap_or_else(|| UNKNOWN_PATH.to_owned()),
                        id: receipt
                            .file_ids
                            .get(index)
                            .cloned()
                            .unwrap_or_else(|| format!("temp_{millis}_{index}")),
                        uploaded_at,
                    })
                    .collect();
                tracing::info!(count = files.len(), "uploaded patient documents");
                queue.uploaded.extend(files.iter().cloned());
                UploadStatus::Succeeded {
                    files,
                    message: UPLOAD_SUCCEEDED.to_owned(),
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "document upload failed");
                UploadStatus::Failed {
                    message: err.to_domain(UPLOAD_FAILED).message().to_owned(),
                }
            }
        }
    }
}

/// Human-readable size: bytes below 1 KiB, then KB, then MB with one decimal.
///
/// Halves round up, so 1280 bytes is `1.3 KB`.
///
/// # Examples
/// ```
/// use portal_client::domain::format_file_size;
///
/// assert_eq!(format_file_size(512), "512 bytes");
/// assert_eq!(format_file_size(1536), "1.5 KB");
/// ```
#[expect(
    clippy::cast_precision_loss,
    reason = "display rounding to one decimal place"
)]
pub fn format_file_size(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = 1024 * 1024;
    if bytes < KIB {
        format!("{bytes} bytes")
    } else if bytes < MIB {
        format!("{:.1} KB", round_half_up(bytes as f64 / KIB as f64))
    } else {
        format!("{:.1} MB", round_half_up(bytes as f64 / MIB as f64))
    }
}

/// One decimal place, ties away from zero; `{:.1}` alone rounds ties to even.
fn round_half_up(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
