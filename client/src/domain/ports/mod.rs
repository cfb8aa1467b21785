//! Domain ports and supporting types for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod assistant_api;
mod auth_api;
mod file_api;
mod portal_api_error;
mod records_api;

#[cfg(test)]
pub use assistant_api::MockAssistantApi;
pub use assistant_api::{AssistantApi, AssistantReply};
pub use auth_api::AuthApi;
#[cfg(test)]
pub use auth_api::{FixtureAuthApi, MockAuthApi};
#[cfg(test)]
pub use file_api::MockFileApi;
pub use file_api::{FileApi, UploadReceipt};
pub use portal_api_error::PortalApiError;
#[cfg(test)]
pub use records_api::MockRecordsApi;
pub use records_api::RecordsApi;
