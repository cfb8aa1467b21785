//! Portal HTTP adapter.
//!
//! This module provides the reqwest implementation of every portal port.
//! One client instance owns one cookie jar, so every port served by the same
//! instance shares the backend session.

mod client;
mod dto;

pub use client::{DEFAULT_USER_AGENT, PortalHttpClient, PortalHttpOptions};
