//! Client SDK for the tenderdesk workspace/tender platform.
//!
//! ARCHITECTURE
//! ============
//! Two cooperating pieces form the core. [`SessionManager`] owns the
//! authenticated identity and the short-lived access token, renewing it
//! silently through the backend's refresh-cookie flow. [`ApiClient`] wraps
//! every outgoing request with auth/CSRF headers and recovers from
//! access-token expiry exactly once per request, collapsing concurrent
//! failures into a single shared refresh call.
//!
//! The resource modules ([`resources`]), the assistant proxy ([`chat`]) and
//! the live analysis signal ([`live`]) all sit on top of that pipeline.

pub mod chat;
pub mod client;
pub mod config;
pub mod error;
pub mod live;
pub mod resources;
pub mod session;

#[cfg(test)]
pub(crate) mod testutil;

pub use client::ApiClient;
pub use config::ClientConfig;
pub use error::{ApiError, SessionError};
pub use session::{SessionManager, SessionPhase, UserProfile};
