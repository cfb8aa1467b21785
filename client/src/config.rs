//! Client configuration loaded via OrthoConfig.

use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use url::Url;

use crate::domain::Error;
use crate::outbound::http::{DEFAULT_USER_AGENT, PortalHttpOptions};

/// Backend root used when nothing is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";

/// Settings for reaching the portal backend.
///
/// Values come from `PORTAL_*` environment variables or a configuration
/// file. Only the base URL has a default; the other fields are optional.
#[derive(Debug, Clone, Default, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "PORTAL")]
pub struct ClientSettings {
    /// Backend API root, including its path prefix.
    #[ortho_config(default = DEFAULT_BASE_URL.to_owned())]
    pub base_url: String,
    /// Whole-request timeout in seconds. Unset means no timeout.
    pub request_timeout_secs: Option<u64>,
    /// User agent override.
    pub user_agent: Option<String>,
}

impl ClientSettings {
    /// Parse the configured base URL; a blank value means [`DEFAULT_BASE_URL`].
    ///
    /// # Errors
    ///
    /// Returns an invalid request error when the value is not an absolute
    /// URL.
    pub fn base_url(&self) -> Result<Url, Error> {
        let trimmed = self.base_url.trim();
        let raw = if trimmed.is_empty() {
            DEFAULT_BASE_URL
        } else {
            trimmed
        };
        Url::parse(raw)
            .map_err(|err| Error::invalid_request(format!("invalid base URL {raw}: {err}")))
    }

    /// Configured timeout; zero is treated as unset.
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    /// Configured user agent, falling back to [`DEFAULT_USER_AGENT`].
    pub fn user_agent(&self) -> &str {
        self.user_agent
            .as_deref()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or(DEFAULT_USER_AGENT)
    }

    /// Transport options for [`crate::outbound::http::PortalHttpClient`].
    pub fn http_options(&self) -> PortalHttpOptions {
        PortalHttpOptions {
            user_agent: self.user_agent().to_owned(),
            timeout: self.request_timeout(),
        }
    }
}
