//! Resilient API client: header pipeline and refresh-on-401 retry.
//!
//! ARCHITECTURE
//! ============
//! Every backend call flows through [`ApiClient::request`], which attaches
//! the bearer token, a JSON content type for non-multipart bodies, and the
//! CSRF mirror header for unsafe methods. A 401 triggers exactly one retry,
//! after a refresh that is shared process-wide: when N in-flight requests
//! expire together, the first installs a refresh future in a shared slot and
//! the other N-1 await the same outcome, so the backend sees one refresh
//! round trip instead of a thundering herd.
//!
//! TRADE-OFFS
//! ==========
//! The slot is cleared inside the refresh future itself, before its outcome
//! becomes observable. A 401 that arrives while the refresh is pending joins
//! it; one that arrives after settlement starts a fresh refresh rather than
//! reusing a stale result.

use std::sync::{Arc, Mutex, PoisonError};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;

use crate::error::{ApiError, response_detail};
use crate::session::SessionManager;

const CSRF_COOKIE: &str = "csrf_token";
const CSRF_HEADER: &str = "X-CSRF-Token";

/// Marker for a refresh that could not produce a token. The session has
/// already been logged out by the time callers observe it.
#[derive(Debug, Clone, Copy)]
struct RefreshFailed;

type RefreshOutcome = Result<String, RefreshFailed>;
type RefreshSlot = Mutex<Option<Shared<BoxFuture<'static, RefreshOutcome>>>>;

/// HTTP front door for all authenticated backend calls. Cheap to clone; all
/// clones share the session and the refresh slot.
#[derive(Clone)]
pub struct ApiClient {
    session: SessionManager,
    refresh_slot: Arc<RefreshSlot>,
}

impl ApiClient {
    #[must_use]
    pub fn new(session: SessionManager) -> Self {
        Self { session, refresh_slot: Arc::new(Mutex::new(None)) }
    }

    #[must_use]
    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    // =========================================================================
    // REQUEST PIPELINE
    // =========================================================================

    /// Issue a request with full header construction and one-shot
    /// retry-after-refresh on 401.
    ///
    /// Non-401 responses pass through unparsed, success or not; callers layer
    /// interpretation on top. A second 401 after the retry is surfaced
    /// unmodified.
    ///
    /// # Errors
    ///
    /// [`ApiError::Http`] on transport failure, [`ApiError::SessionExpired`]
    /// when the refresh path is exhausted.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<Response, ApiError> {
        let response = self.send_json(method.clone(), path, body).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        self.refresh_access_token().await?;
        // Headers are rebuilt from scratch; the CSRF cookie may have rotated.
        self.send_json(method, path, body).await
    }

    /// Issue a multipart upload with the same 401-retry discipline. Multipart
    /// bodies are not replayable, so the form is rebuilt per attempt.
    ///
    /// # Errors
    ///
    /// See [`request`](Self::request).
    pub async fn upload<F>(&self, path: &str, form: F) -> Result<Response, ApiError>
    where
        F: Fn() -> Result<reqwest::multipart::Form, ApiError>,
    {
        let response = self.send_multipart(path, form()?).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        self.refresh_access_token().await?;
        self.send_multipart(path, form()?).await
    }

    /// [`request`](Self::request) plus response interpretation: non-2xx maps
    /// to [`ApiError::Api`] carrying the backend's `detail`, 2xx bodies are
    /// deserialized.
    ///
    /// # Errors
    ///
    /// See [`request`](Self::request), plus [`ApiError::Api`] on non-2xx.
    pub async fn request_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<T, ApiError> {
        let response = self.request(method, path, body).await?;
        expect_json(response).await
    }

    /// Variant for endpoints that answer with no meaningful body.
    ///
    /// # Errors
    ///
    /// See [`request_json`](Self::request_json).
    pub async fn request_empty(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<(), ApiError> {
        let response = self.request(method, path, body).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Api {
                status: status.as_u16(),
                detail: response_detail(response).await,
            });
        }
        Ok(())
    }

    async fn send_json(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<Response, ApiError> {
        let mut request = self
            .session
            .http()
            .request(method.clone(), self.url(path))
            .header(CONTENT_TYPE, "application/json");
        if let Some(token) = self.session.access_token() {
            request = request.bearer_auth(token);
        }
        if let Some(json) = body {
            request = request.json(json);
        }
        request = self.apply_csrf(request, &method);
        Ok(request.send().await?)
    }

    async fn send_multipart(
        &self,
        path: &str,
        form: reqwest::multipart::Form,
    ) -> Result<Response, ApiError> {
        // Multipart carries its own boundary content type; only auth and
        // CSRF headers apply.
        let mut request = self.session.http().post(self.url(path)).multipart(form);
        if let Some(token) = self.session.access_token() {
            request = request.bearer_auth(token);
        }
        request = self.apply_csrf(request, &Method::POST);
        Ok(request.send().await?)
    }

    /// Mirror the CSRF cookie into a header for unsafe methods. A missing
    /// cookie is tolerated so that unsafe requests before any cookie is
    /// issued (e.g. first signup) still pass.
    fn apply_csrf(&self, request: reqwest::RequestBuilder, method: &Method) -> reqwest::RequestBuilder {
        if is_safe_method(method) {
            return request;
        }
        match self.session.cookie(CSRF_COOKIE) {
            Some(token) => request.header(CSRF_HEADER, token),
            None => {
                tracing::warn!(%method, "no csrf cookie present; proceeding without {CSRF_HEADER}");
                request
            }
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.session.base_url())
    }

    // =========================================================================
    // SINGLE-FLIGHT REFRESH
    // =========================================================================

    /// Join or install the shared refresh. Exactly one refresh network call
    /// is outstanding at a time; every concurrent 401 awaits the same
    /// outcome.
    async fn refresh_access_token(&self) -> Result<String, ApiError> {
        let pending = {
            let mut slot = self.refresh_slot.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(pending) = slot.as_ref() {
                pending.clone()
            } else {
                let session = self.session.clone();
                let slot_handle = Arc::clone(&self.refresh_slot);
                let fut = async move {
                    let outcome = if session.refresh().await {
                        session.access_token().ok_or(RefreshFailed)
                    } else {
                        Err(RefreshFailed)
                    };
                    if outcome.is_err() {
                        // Session is gone; local logout and hooks fire here.
                        session.logout().await;
                    }
                    // Clear before the outcome becomes observable so the next
                    // independent 401 starts a fresh refresh.
                    slot_handle
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .take();
                    outcome
                }
                .boxed()
                .shared();
                *slot = Some(fut.clone());
                fut
            }
        };

        pending.await.map_err(|_| ApiError::SessionExpired)
    }
}

/// Interpret a response: non-2xx maps to [`ApiError::Api`], 2xx bodies are
/// deserialized as JSON.
///
/// # Errors
///
/// [`ApiError::Api`] on non-2xx, [`ApiError::Http`] on body decode failure.
pub async fn expect_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let status = response.status();
    if !status.is_success() {
        return Err(ApiError::Api { status: status.as_u16(), detail: response_detail(response).await });
    }
    Ok(response.json::<T>().await?)
}

fn is_safe_method(method: &Method) -> bool {
    matches!(method.as_str(), "GET" | "HEAD" | "OPTIONS" | "TRACE")
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
