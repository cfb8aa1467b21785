//! Reqwest-backed portal adapter.
//!
//! This adapter owns transport details only: URL assembly, cookie continuity,
//! HTTP error mapping and JSON decoding into domain values. Session rules live
//! in [`crate::domain::SessionHolder`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::dto::{
    DoctorLoginDto, DoctorRegistrationDto, ErrorBodyDto, InteractDto, PatientLoginDto,
    PatientRegistrationDto, RecordListDto, UploadResponseDto,
};
use crate::domain::ports::{
    AssistantApi, AssistantReply, AuthApi, FileApi, PortalApiError, RecordsApi, UploadReceipt,
};
use crate::domain::{
    DoctorCredentials, DoctorProfile, DoctorRegistration, PatientCredentials, PatientId,
    PatientProfile, PatientRecord, PatientRegistration, RecordKind, RegistrationReceipt,
    UploadCandidate, VisitRequest,
};

/// User agent sent when none is configured.
pub const DEFAULT_USER_AGENT: &str = concat!("portal-client/", env!("CARGO_PKG_VERSION"));
const GENERIC_ERROR_MESSAGE: &str = "An error occurred";
const UPLOAD_FAILED_MESSAGE: &str = "File upload failed";

/// Transport settings for [`PortalHttpClient`].
#[derive(Debug, Clone)]
pub struct PortalHttpOptions {
    /// HTTP user-agent sent with every request.
    pub user_agent: String,
    /// Whole-request timeout; `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

impl Default for PortalHttpOptions {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            timeout: None,
        }
    }
}

/// Portal adapter that talks JSON to one backend root.
///
/// Cookies set by the backend are kept in the client's own jar, so a login
/// made through this value authenticates every later call made through it.
#[derive(Debug, Clone)]
pub struct PortalHttpClient {
    client: Client,
    base_url: Url,
}

impl PortalHttpClient {
    /// Build an adapter with default options.
    /// ```rust,ignore
    /// let client = PortalHttpClient::new(Url::parse("http://localhost:8000/api")?)?;
    /// ```
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(base_url: Url) -> Result<Self, reqwest::Error> {
        Self::with_options(base_url, PortalHttpOptions::default())
    }

    /// Build an adapter with explicit transport options.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn with_options(base_url: Url, options: PortalHttpOptions) -> Result<Self, reqwest::Error> {
        let mut builder = Client::builder()
            .cookie_store(true)
            .user_agent(options.user_agent);
        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            base_url,
        })
    }

    /// Backend root every endpoint is appended to.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, PortalApiError> {
        let url = join_endpoint(&self.base_url, path)?;
        Ok(self
            .client
            .request(method, url)
            .header(reqwest::header::ACCEPT, "application/json"))
    }

    /// Send a request and return its body, or `None` for 204.
    async fn send(
        &self,
        path: &str,
        request: RequestBuilder,
    ) -> Result<Option<Vec<u8>>, PortalApiError> {
        let request = request.build().map_err(map_transport_error)?;
        let method = request.method().clone();
        let response = self
            .client
            .execute(request)
            .await
            .map_err(map_transport_error)?;
        let status = response.status();
        let body = response.bytes().await.map_err(map_transport_error)?;
        debug!(
            %method,
            path,
            status = status.as_u16(),
            bytes = body.len(),
            "portal call completed"
        );
        if !status.is_success() {
            return Err(map_status_error(status, body.as_ref()));
        }
        if status == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        Ok(Some(body.to_vec()))
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        path: &str,
        request: RequestBuilder,
    ) -> Result<T, PortalApiError> {
        let body = self.send(path, request).await?;
        decode_required(path, body.as_deref())
    }
}

#[async_trait]
impl AuthApi for PortalHttpClient {
    async fn doctor_login(
        &self,
        credentials: &DoctorCredentials,
    ) -> Result<DoctorProfile, PortalApiError> {
        const PATH: &str = "/doctors/login/";
        let request = self
            .request(Method::POST, PATH)?
            .json(&DoctorLoginDto::from(credentials));
        self.fetch(PATH, request).await
    }

    async fn patient_login(
        &self,
        credentials: &PatientCredentials,
    ) -> Result<PatientProfile, PortalApiError> {
        const PATH: &str = "/patients/login/";
        let request = self
            .request(Method::POST, PATH)?
            .json(&PatientLoginDto::from(credentials));
        self.fetch(PATH, request).await
    }

    async fn logout(&self) -> Result<(), PortalApiError> {
        const PATH: &str = "/logout/";
        let request = self.request(Method::POST, PATH)?;
        self.send(PATH, request).await.map(drop)
    }

    async fn register_doctor(
        &self,
        registration: &DoctorRegistration,
    ) -> Result<RegistrationReceipt, PortalApiError> {
        const PATH: &str = "/doctors/register/";
        let request = self
            .request(Method::POST, PATH)?
            .json(&DoctorRegistrationDto::from(registration));
        let body = self.send(PATH, request).await?;
        Ok(decode_optional(PATH, body.as_deref())?.unwrap_or_default())
    }

    async fn register_patient(
        &self,
        registration: &PatientRegistration,
    ) -> Result<RegistrationReceipt, PortalApiError> {
        const PATH: &str = "/patients/register/";
        let request = self
            .request(Method::POST, PATH)?
            .json(&PatientRegistrationDto::from(registration));
        let body = self.send(PATH, request).await?;
        Ok(decode_optional(PATH, body.as_deref())?.unwrap_or_default())
    }

    async fn patient_profile(&self) -> Result<Option<PatientProfile>, PortalApiError> {
        const PATH: &str = "/patients/profile/";
        let request = self.request(Method::GET, PATH)?;
        let body = self.send(PATH, request).await?;
        decode_optional(PATH, body.as_deref())
    }
}

#[async_trait]
impl RecordsApi for PortalHttpClient {
    async fn patient_records(
        &self,
        kind: RecordKind,
        patient: PatientId,
    ) -> Result<Vec<PatientRecord>, PortalApiError> {
        let path = kind.collection_path();
        let request = self
            .request(Method::GET, path)?
            .query(&[("patient", patient.get())]);
        let list: RecordListDto = self.fetch(path, request).await?;
        Ok(list.into())
    }

    async fn create_visit(&self, visit: &VisitRequest) -> Result<PatientRecord, PortalApiError> {
        let path = RecordKind::Visits.collection_path();
        let request = self.request(Method::POST, path)?.json(visit);
        self.fetch(path, request).await
    }

    async fn visit_details(&self, visit_id: u64) -> Result<PatientRecord, PortalApiError> {
        let path = format!("{}{visit_id}/", RecordKind::Visits.collection_path());
        let request = self.request(Method::GET, &path)?;
        self.fetch(&path, request).await
    }
}

#[async_trait]
impl FileApi for PortalHttpClient {
    async fn upload_files(
        &self,
        files: &[UploadCandidate],
    ) -> Result<UploadReceipt, PortalApiError> {
        let path = RecordKind::Files.collection_path();
        let form = build_upload_form(files)?;
        let request = self.request(Method::POST, path)?.multipart(form);
        match self.fetch::<UploadResponseDto>(path, request).await {
            Ok(response) => Ok(response.into()),
            Err(PortalApiError::Rejected { status, .. }) => {
                Err(PortalApiError::rejected(status, UPLOAD_FAILED_MESSAGE))
            }
            Err(other) => Err(other),
        }
    }
}

#[async_trait]
impl AssistantApi for PortalHttpClient {
    async fn interact(
        &self,
        patient: PatientId,
        question: &str,
    ) -> Result<AssistantReply, PortalApiError> {
        const PATH: &str = "/ai/interact/";
        let request = self.request(Method::POST, PATH)?.json(&InteractDto {
            patient_id: patient,
            question,
        });
        self.fetch(PATH, request).await
    }
}

/// Append `path` to the base URL, keeping any base path such as `/api`.
fn join_endpoint(base: &Url, path: &str) -> Result<Url, PortalApiError> {
    let root = base.as_str().trim_end_matches('/');
    let joined = format!("{root}/{}", path.trim_start_matches('/'));
    Url::parse(&joined).map_err(|error| {
        PortalApiError::invalid_request(format!("invalid endpoint {joined}: {error}"))
    })
}

fn build_upload_form(files: &[UploadCandidate]) -> Result<Form, PortalApiError> {
    files
        .iter()
        .enumerate()
        .try_fold(Form::new(), |form, (index, file)| {
            let part = Part::bytes(file.bytes().to_vec())
                .file_name(file.file_name().to_owned())
                .mime_str(file.content_type())
                .map_err(|error| {
                    PortalApiError::invalid_request(format!(
                        "invalid content type for {}: {error}",
                        file.file_name()
                    ))
                })?;
            Ok(form.part(format!("file_{index}"), part))
        })
}

fn decode_optional<T: DeserializeOwned>(
    path: &str,
    body: Option<&[u8]>,
) -> Result<Option<T>, PortalApiError> {
    body.map(|bytes| {
        serde_json::from_slice(bytes).map_err(|error| {
            PortalApiError::decode(format!("invalid JSON payload from {path}: {error}"))
        })
    })
    .transpose()
}

fn decode_required<T: DeserializeOwned>(
    path: &str,
    body: Option<&[u8]>,
) -> Result<T, PortalApiError> {
    decode_optional(path, body)?
        .ok_or_else(|| PortalApiError::decode(format!("{path} answered without content")))
}

fn map_transport_error(error: reqwest::Error) -> PortalApiError {
    if error.is_timeout() {
        PortalApiError::timeout(error.to_string())
    } else {
        PortalApiError::transport(error.to_string())
    }
}

fn map_status_error(status: StatusCode, body: &[u8]) -> PortalApiError {
    let message = serde_json::from_slice::<ErrorBodyDto>(body)
        .ok()
        .and_then(ErrorBodyDto::into_message)
        .unwrap_or_else(|| {
            debug!(status = status.as_u16(), body = %body_preview(body), "unrecognised error body");
            GENERIC_ERROR_MESSAGE.to_owned()
        });
    PortalApiError::rejected(status.as_u16(), message)
}

fn body_preview(body: &[u8]) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 160;

    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let preview = compact.chars().take(PREVIEW_CHAR_LIMIT).collect::<String>();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}
