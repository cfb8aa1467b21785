//! Authentication primitives such as login credentials.
//!
//! Raw form input is validated here before the session holder hands it to the
//! portal API, so a blank email or phone never leaves the process.

use std::fmt;

use zeroize::Zeroizing;

/// Domain error returned when login payload values are invalid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialsValidationError {
    /// Email was missing or blank once trimmed.
    EmptyEmail,
    /// Email did not look like `local@domain`.
    InvalidEmail,
    /// Phone number was missing or blank once trimmed.
    EmptyPhone,
    /// Phone number contained characters other than digits and separators.
    InvalidPhone,
    /// Password was blank.
    EmptyPassword,
}

impl fmt::Display for CredentialsValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyEmail => write!(f, "email must not be empty"),
            Self::InvalidEmail => write!(f, "email must contain a local part and a domain"),
            Self::EmptyPhone => write!(f, "phone must not be empty"),
            Self::InvalidPhone => write!(
                f,
                "phone may only contain digits, spaces, dashes, dots, parentheses, or a leading +",
            ),
            Self::EmptyPassword => write!(f, "password must not be empty"),
        }
    }
}

impl std::error::Error for CredentialsValidationError {}

pub(crate) fn normalize_email(email: &str) -> Result<String, CredentialsValidationError> {
    let normalized = email.trim();
    if normalized.is_empty() {
        return Err(CredentialsValidationError::EmptyEmail);
    }
    match normalized.split_once('@') {
        Some((local, domain))
            if !local.is_empty() && !domain.is_empty() && !domain.contains('@') =>
        {
            Ok(normalized.to_owned())
        }
        _ => Err(CredentialsValidationError::InvalidEmail),
    }
}

pub(crate) fn normalize_phone(phone: &str) -> Result<String, CredentialsValidationError> {
    let normalized = phone.trim();
    if normalized.is_empty() {
        return Err(CredentialsValidationError::EmptyPhone);
    }
    let digits = normalized.strip_prefix('+').unwrap_or(normalized);
    let allowed = digits
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '-' | '.' | '(' | ')'));
    if !allowed || !digits.chars().any(|c| c.is_ascii_digit()) {
        return Err(CredentialsValidationError::InvalidPhone);
    }
    Ok(normalized.to_owned())
}

pub(crate) fn require_password(
    password: &str,
) -> Result<Zeroizing<String>, CredentialsValidationError> {
    if password.is_empty() {
        return Err(CredentialsValidationError::EmptyPassword);
    }
    Ok(Zeroizing::new(password.to_owned()))
}

/// Validated doctor credentials (email and password).
///
/// ## Invariants
/// - `email` is trimmed and has a non-empty local part and domain.
/// - `password` is non-empty and keeps caller-provided whitespace.
///
/// # Examples
/// ```
/// use portal_client::domain::DoctorCredentials;
///
/// let creds = DoctorCredentials::try_from_parts(" house@clinic.example ", "vicodin").unwrap();
/// assert_eq!(creds.email(), "house@clinic.example");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoctorCredentials {
    email: String,
    password: Zeroizing<String>,
}

impl DoctorCredentials {
    /// Construct credentials from raw email/password inputs.
    pub fn try_from_parts(email: &str, password: &str) -> Result<Self, CredentialsValidationError> {
        Ok(Self {
            email: normalize_email(email)?,
            password: require_password(password)?,
        })
    }

    /// Email used as the doctor's login.
    pub fn email(&self) -> &str {
        self.email.as_str()
    }

    /// Password provided by the caller.
    pub fn password(&self) -> &str {
        self.password.as_str()
    }
}

/// Validated patient credentials (phone and password).
///
/// ## Invariants
/// - `phone` is trimmed and contains at least one digit.
/// - `password` is non-empty and keeps caller-provided whitespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatientCredentials {
    phone: String,
    password: Zeroizing<String>,
}

impl PatientCredentials {
    /// Construct credentials from raw phone/password inputs.
    pub fn try_from_parts(phone: &str, password: &str) -> Result<Self, CredentialsValidationError> {
        Ok(Self {
            phone: normalize_phone(phone)?,
            password: require_password(password)?,
        })
    }

    /// Phone number used as the patient's login.
    pub fn phone(&self) -> &str {
        self.phone.as_str()
    }

    /// Password provided by the caller.
    pub fn password(&self) -> &str {
        self.password.as_str()
    }
}
