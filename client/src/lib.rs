//! Healthcare portal client.
//!
//! The crate keeps the signed-in identity of a portal user and talks to the
//! portal's JSON API on their behalf. It is laid out as a small hexagon:
//!
//! - [`domain`] owns the session state machine, record and upload services,
//!   the assistant responders, and the driven ports they depend on.
//! - [`outbound`] implements those ports over HTTP with a cookie-aware
//!   reqwest client.
//! - [`config`] loads backend settings from the environment.

pub mod config;
pub mod domain;
pub mod outbound;
