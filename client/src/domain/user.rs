//! Portal identities: doctors, patients, and the payloads used to register them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use zeroize::Zeroizing;

use super::auth::{
    CredentialsValidationError, normalize_email, normalize_phone, require_password,
};

/// Validation errors returned by identity constructors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserValidationError {
    /// Identifiers are backend primary keys and start at one.
    ZeroId,
    /// Identifier text was not a positive integer.
    InvalidId,
    /// Registration name was blank.
    EmptyName,
    /// Contact or password failed credential validation.
    Credentials(CredentialsValidationError),
    /// An extra registration field tried to overwrite a core field.
    ReservedField(String),
}

impl fmt::Display for UserValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroId => write!(f, "identifier must be greater than zero"),
            Self::InvalidId => write!(f, "identifier must be a positive integer"),
            Self::EmptyName => write!(f, "name must not be empty"),
            Self::Credentials(err) => write!(f, "{err}"),
            Self::ReservedField(field) => {
                write!(f, "field `{field}` is set by a dedicated argument")
            }
        }
    }
}

impl std::error::Error for UserValidationError {}

impl From<CredentialsValidationError> for UserValidationError {
    fn from(value: CredentialsValidationError) -> Self {
        Self::Credentials(value)
    }
}

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "u64", into = "u64")]
        pub struct $name(u64);

        impl $name {
            /// Validate and construct the identifier.
            pub fn new(id: u64) -> Result<Self, UserValidationError> {
                if id == 0 {
                    return Err(UserValidationError::ZeroId);
                }
                Ok(Self(id))
            }

            /// Raw numeric value.
            pub fn get(self) -> u64 {
                self.0
            }
        }

        impl TryFrom<u64> for $name {
            type Error = UserValidationError;

            fn try_from(value: u64) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for u64 {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl FromStr for $name {
            type Err = UserValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let parsed = s
                    .trim()
                    .parse::<u64>()
                    .map_err(|_| UserValidationError::InvalidId)?;
                Self::new(parsed)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

numeric_id! {
    /// Backend identifier of a patient record.
    PatientId
}

numeric_id! {
    /// Backend identifier of a doctor record.
    DoctorId
}

/// Doctor record returned by the portal after login.
///
/// Fields the client does not model are kept verbatim in `extra` so nothing
/// the backend sends is lost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoctorProfile {
    /// Backend identifier.
    pub id: DoctorId,
    /// Display name.
    #[serde(default, alias = "full_name")]
    pub name: String,
    /// Login email.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Remaining server fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Patient record returned by the portal after login or profile lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientProfile {
    /// Backend identifier.
    pub id: PatientId,
    /// Display name.
    #[serde(default, alias = "full_name")]
    pub name: String,
    /// Login phone number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Remaining server fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn require_name(name: &str) -> Result<String, UserValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(UserValidationError::EmptyName);
    }
    Ok(trimmed.to_owned())
}

fn insert_extra(
    extra: &mut Map<String, Value>,
    reserved: &[&str],
    key: &str,
    value: Value,
) -> Result<(), UserValidationError> {
    let key = key.trim();
    if key.is_empty() || reserved.contains(&key) {
        return Err(UserValidationError::ReservedField(key.to_owned()));
    }
    extra.insert(key.to_owned(), value);
    Ok(())
}

const DOCTOR_RESERVED: &[&str] = &["name", "email", "password"];
const PATIENT_RESERVED: &[&str] = &["name", "phone", "password"];

/// Registration form for a new doctor account.
///
/// # Examples
/// ```
/// use portal_client::domain::DoctorRegistration;
/// use serde_json::json;
///
/// let form = DoctorRegistration::try_new("Meredith Grey", "grey@sloan.example", "pw")
///     .and_then(|form| form.with_field("specialization", json!("surgery")))
///     .unwrap();
/// assert_eq!(form.extra()["specialization"], "surgery");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct DoctorRegistration {
    name: String,
    email: String,
    password: Zeroizing<String>,
    extra: Map<String, Value>,
}

impl DoctorRegistration {
    /// Validate the core registration fields.
    pub fn try_new(name: &str, email: &str, password: &str) -> Result<Self, UserValidationError> {
        Ok(Self {
            name: require_name(name)?,
            email: normalize_email(email)?,
            password: require_password(password)?,
            extra: Map::new(),
        })
    }

    /// Attach an additional form field such as `specialization`.
    pub fn with_field(mut self, key: &str, value: Value) -> Result<Self, UserValidationError> {
        insert_extra(&mut self.extra, DOCTOR_RESERVED, key, value)?;
        Ok(self)
    }

    /// Doctor's display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Login email.
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Chosen password.
    pub fn password(&self) -> &str {
        self.password.as_str()
    }

    /// Additional form fields.
    pub fn extra(&self) -> &Map<String, Value> {
        &self.extra
    }
}

/// Registration form for a new patient account.
#[derive(Debug, Clone, PartialEq)]
pub struct PatientRegistration {
    name: String,
    phone: String,
    password: Zeroizing<String>,
    extra: Map<String, Value>,
}

impl PatientRegistration {
    /// Validate the core registration fields.
    pub fn try_new(name: &str, phone: &str, password: &str) -> Result<Self, UserValidationError> {
        Ok(Self {
            name: require_name(name)?,
            phone: normalize_phone(phone)?,
            password: require_password(password)?,
            extra: Map::new(),
        })
    }

    /// Attach an additional form field such as `date_of_birth`.
    pub fn with_field(mut self, key: &str, value: Value) -> Result<Self, UserValidationError> {
        insert_extra(&mut self.extra, PATIENT_RESERVED, key, value)?;
        Ok(self)
    }

    /// Patient's display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Login phone number.
    pub fn phone(&self) -> &str {
        &self.phone
    }

    /// Chosen password.
    pub fn password(&self) -> &str {
        self.password.as_str()
    }

    /// Additional form fields.
    pub fn extra(&self) -> &Map<String, Value> {
        &self.extra
    }
}

/// Server acknowledgement of a registration.
///
/// Registration never signs the caller in, so the receipt is informational.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegistrationReceipt {
    fields: Map<String, Value>,
}

impl RegistrationReceipt {
    /// Wrap the raw JSON object answered by the backend.
    pub fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// Identifier of the created account, when the backend reports one.
    pub fn id(&self) -> Option<u64> {
        self.fields.get("id").and_then(Value::as_u64)
    }

    /// Confirmation message, when the backend reports one.
    pub fn message(&self) -> Option<&str> {
        self.fields
            .get("message")
            .or_else(|| self.fields.get("detail"))
            .and_then(Value::as_str)
    }

    /// Every field in the acknowledgement.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }
}
