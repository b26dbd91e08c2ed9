//! Error taxonomy for session and API operations.
//!
//! Session operations never escape with a raw transport error chain: login
//! and signup report a structured [`SessionError`], refresh reports boolean
//! status. Everything routed through the API client surfaces as [`ApiError`].

use serde::Deserialize;

/// Structured outcome of a failed login or signup.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The backend rejected the credentials; `detail` is its message.
    #[error("{detail}")]
    Rejected { detail: String },
    /// Transport failure, normalized to a single user-facing message.
    #[error("Network error")]
    Network,
}

/// Failures surfaced by the API client and everything layered on it.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The refresh-after-401 path was exhausted; the session is gone.
    #[error("session expired")]
    SessionExpired,
    /// Application-level failure: non-2xx with the backend's `detail` field.
    #[error("{detail}")]
    Api { status: u16, detail: String },
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
    #[error("websocket connect failed: {0}")]
    WsConnect(Box<tokio_tungstenite::tungstenite::Error>),
}

/// Standard error body shape used by the backend on non-2xx responses.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub detail: Option<String>,
}

/// Extract the backend's `detail` message from an error response, falling
/// back to the bare status code when the body is empty or not JSON.
pub(crate) async fn response_detail(response: reqwest::Response) -> String {
    let status = response.status();
    response
        .json::<ErrorBody>()
        .await
        .ok()
        .and_then(|body| body.detail)
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()))
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
