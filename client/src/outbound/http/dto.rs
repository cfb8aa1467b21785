//! Wire shapes for the portal backend.
//!
//! Request DTOs borrow from domain values so secrets are never copied into
//! long-lived buffers. Response DTOs decode first, then convert into domain
//! or port types in one pass.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::ports::UploadReceipt;
use crate::domain::{
    DoctorCredentials, DoctorRegistration, PatientCredentials, PatientId, PatientRecord,
    PatientRegistration,
};

#[derive(Debug, Serialize)]
pub(super) struct DoctorLoginDto<'a> {
    email: &'a str,
    password: &'a str,
}

impl<'a> From<&'a DoctorCredentials> for DoctorLoginDto<'a> {
    fn from(value: &'a DoctorCredentials) -> Self {
        Self {
            email: value.email(),
            password: value.password(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct PatientLoginDto<'a> {
    phone: &'a str,
    password: &'a str,
}

impl<'a> From<&'a PatientCredentials> for PatientLoginDto<'a> {
    fn from(value: &'a PatientCredentials) -> Self {
        Self {
            phone: value.phone(),
            password: value.password(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct DoctorRegistrationDto<'a> {
    name: &'a str,
    email: &'a str,
    password: &'a str,
    #[serde(flatten)]
    extra: &'a Map<String, Value>,
}

impl<'a> From<&'a DoctorRegistration> for DoctorRegistrationDto<'a> {
    fn from(value: &'a DoctorRegistration) -> Self {
        Self {
            name: value.name(),
            email: value.email(),
            password: value.password(),
            extra: value.extra(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct PatientRegistrationDto<'a> {
    name: &'a str,
    phone: &'a str,
    password: &'a str,
    #[serde(flatten)]
    extra: &'a Map<String, Value>,
}

impl<'a> From<&'a PatientRegistration> for PatientRegistrationDto<'a> {
    fn from(value: &'a PatientRegistration) -> Self {
        Self {
            name: value.name(),
            phone: value.phone(),
            password: value.password(),
            extra: value.extra(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct InteractDto<'a> {
    pub(super) patient_id: PatientId,
    pub(super) question: &'a str,
}

/// Error envelope; Django views use `error`, DRF uses `detail`.
#[derive(Debug, Default, Deserialize)]
pub(super) struct ErrorBodyDto {
    #[serde(default)]
    error: Option<Value>,
    #[serde(default)]
    detail: Option<Value>,
    #[serde(default)]
    message: Option<Value>,
}

impl ErrorBodyDto {
    pub(super) fn into_message(self) -> Option<String> {
        [self.error, self.detail, self.message]
            .into_iter()
            .flatten()
            .filter_map(|value| match value {
                Value::String(text) => Some(text),
                _ => None,
            })
            .find(|text| !text.trim().is_empty())
    }
}

/// List endpoints answer either a bare array or a paginated envelope.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(super) enum RecordListDto {
    Plain(Vec<PatientRecord>),
    Paged { results: Vec<PatientRecord> },
}

impl From<RecordListDto> for Vec<PatientRecord> {
    fn from(value: RecordListDto) -> Self {
        match value {
            RecordListDto::Plain(records) | RecordListDto::Paged { results: records } => records,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(super) enum RawIdDto {
    Number(u64),
    Text(String),
}

#[derive(Debug, Deserialize)]
pub(super) struct UploadResponseDto {
    #[serde(default)]
    file_paths: Vec<String>,
    #[serde(default)]
    file_ids: Vec<RawIdDto>,
}

impl From<UploadResponseDto> for UploadReceipt {
    fn from(value: UploadResponseDto) -> Self {
        Self {
            file_paths: value.file_paths,
            file_ids: value
                .file_ids
                .into_iter()
                .map(|id| match id {
                    RawIdDto::Number(number) => number.to_string(),
                    RawIdDto::Text(text) => text,
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for wire shapes.
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case(json!({"error": "Invalid credentials"}), Some("Invalid credentials"))]
    #[case(json!({"detail": "Not found."}), Some("Not found."))]
    #[case(json!({"error": " ", "message": "fallback field"}), Some("fallback field"))]
    #[case(json!({"error": {"phone": ["required"]}}), None)]
    #[case(json!({}), None)]
    fn error_body_picks_first_text_field(#[case] body: Value, #[case] expected: Option<&str>) {
        let dto: ErrorBodyDto = serde_json::from_value(body).expect("decode");
        assert_eq!(dto.into_message().as_deref(), expected);
    }

    #[rstest]
    #[case(json!([{"id": 1, "date": "2025-03-15"}]))]
    #[case(json!({"count": 1, "results": [{"id": 1, "date": "2025-03-15"}]}))]
    fn record_lists_accept_both_shapes(#[case] body: Value) {
        let dto: RecordListDto = serde_json::from_value(body).expect("decode");
        let records: Vec<PatientRecord> = dto.into();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, Some(1));
        assert_eq!(records[0].fields.get("date"), Some(&json!("2025-03-15")));
    }

    #[rstest]
    fn upload_ids_accept_numbers_and_text() {
        let dto: UploadResponseDto = serde_json::from_value(json!({
            "file_paths": ["/media/a.pdf"],
            "file_ids": [4, "b-5"]
        }))
        .expect("decode");
        let receipt = UploadReceipt::from(dto);
        assert_eq!(receipt.file_ids, ["4", "b-5"]);
        assert_eq!(receipt.file_paths, ["/media/a.pdf"]);
    }

    #[rstest]
    fn registration_flattens_extra_fields() {
        let form = DoctorRegistration::try_new("Grey", "grey@sloan.example", "pw")
            .and_then(|form| form.with_field("specialization", json!("surgery")))
            .expect("form");
        let value = serde_json::to_value(DoctorRegistrationDto::from(&form)).expect("serialise");
        assert_eq!(
            value,
            json!({
                "name": "Grey",
                "email": "grey@sloan.example",
                "password": "pw",
                "specialization": "surgery"
            })
        );
    }
}
