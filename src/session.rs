//! Session lifecycle: identity, access token, silent renewal.
//!
//! ARCHITECTURE
//! ============
//! The manager is the single source of truth for "who is logged in". It
//! talks to four backend endpoints (login, signup, refresh, logout) through
//! its own cookie-jar-backed HTTP client, so the long-lived refresh cookie
//! travels automatically and is never exposed to callers. The short-lived
//! access token and the user profile are committed together as one
//! [`AuthSnapshot`], which makes "token without user" unrepresentable.
//!
//! TRADE-OFFS
//! ==========
//! A failed keep-alive tick leaves the session state untouched and waits for
//! the next interval. A transient blip is tolerated; a sustained outage only
//! surfaces once a real request comes back 401 and the API client's refresh
//! path gives up.

use std::sync::{Arc, Mutex, PoisonError};

use reqwest::cookie::Jar;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::error::{ApiError, SessionError, response_detail};

/// Profile snapshot from the last successful auth response. Never mutated in
/// place, always replaced wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    /// The backend keys this as `full_name`.
    #[serde(rename = "full_name")]
    pub name: String,
    #[serde(default)]
    pub picture: Option<String>,
}

/// Identity and access token, committed atomically as a pair.
#[derive(Debug, Clone)]
pub struct AuthSnapshot {
    pub user: UserProfile,
    pub access_token: String,
}

/// Session state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Initial silent refresh has not settled yet; gates protected rendering.
    Bootstrapping,
    Authenticated,
    Anonymous,
}

type SessionEndHook = Arc<dyn Fn() + Send + Sync>;

struct SessionInner {
    phase: SessionPhase,
    snapshot: Option<AuthSnapshot>,
    on_session_end: Vec<SessionEndHook>,
}

/// Owner of the authenticated identity. Cheap to clone; all clones share the
/// same state, HTTP client and cookie jar.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Mutex<SessionInner>>,
    http: reqwest::Client,
    jar: Arc<Jar>,
    config: ClientConfig,
}

/// Body of a successful refresh: the only path that establishes the access
/// token, always alongside the profile it belongs to.
#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
    user: UserProfile,
}

impl SessionManager {
    /// Build a manager with its own cookie-jar-backed HTTP client.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be constructed.
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        let jar = Arc::new(Jar::default());
        let http = reqwest::Client::builder()
            .cookie_provider(Arc::clone(&jar))
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(Mutex::new(SessionInner {
                phase: SessionPhase::Bootstrapping,
                snapshot: None,
                on_session_end: Vec::new(),
            })),
            http,
            jar,
            config,
        })
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.lock().phase
    }

    #[must_use]
    pub fn user(&self) -> Option<UserProfile> {
        self.lock().snapshot.as_ref().map(|s| s.user.clone())
    }

    #[must_use]
    pub fn access_token(&self) -> Option<String> {
        self.lock().snapshot.as_ref().map(|s| s.access_token.clone())
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Read a cookie from the jar by name, for the backend origin.
    pub(crate) fn cookie(&self, name: &str) -> Option<String> {
        use reqwest::cookie::CookieStore;

        let url = self.config.base_url.parse::<reqwest::Url>().ok()?;
        let header = self.jar.cookies(&url)?;
        let raw = header.to_str().ok()?;
        raw.split(';').map(str::trim).find_map(|pair| {
            pair.strip_prefix(name)
                .and_then(|rest| rest.strip_prefix('='))
                .map(ToOwned::to_owned)
        })
    }

    /// Register a hook invoked when the session transitions to `Anonymous`
    /// (logout or forced expiry). Used by state owners that must tear down
    /// with the session, e.g. chat history.
    pub fn on_session_end(&self, hook: impl Fn() + Send + Sync + 'static) {
        self.lock().on_session_end.push(Arc::new(hook));
    }

    // =========================================================================
    // OPERATIONS
    // =========================================================================

    /// Authenticate with email and password.
    ///
    /// The login response itself does not carry a usable access token; on
    /// 2xx this immediately runs [`refresh`](Self::refresh), the single path
    /// that establishes the token bound to the new refresh cookie. State is
    /// only mutated once that refresh commits.
    ///
    /// # Errors
    ///
    /// [`SessionError::Rejected`] on a non-2xx login response (state
    /// untouched), [`SessionError::Network`] on transport failure.
    pub async fn login(&self, email: &str, password: &str) -> Result<(), SessionError> {
        self.authenticate(
            "/auth/login/json",
            &serde_json::json!({ "email": email, "password": password }),
        )
        .await
    }

    /// Create an account and authenticate. Same contract as `login`.
    ///
    /// # Errors
    ///
    /// See [`login`](Self::login).
    pub async fn signup(&self, name: &str, email: &str, password: &str) -> Result<(), SessionError> {
        self.authenticate(
            "/auth/signup",
            &serde_json::json!({ "full_name": name, "email": email, "password": password }),
        )
        .await
    }

    async fn authenticate(&self, path: &str, body: &serde_json::Value) -> Result<(), SessionError> {
        let url = format!("{}{path}", self.config.base_url);
        let response = match self.http.post(&url).json(body).send().await {
            Ok(response) => response,
            Err(error) => {
                tracing::debug!(%error, path, "auth transport failure");
                return Err(SessionError::Network);
            }
        };

        if !response.status().is_success() {
            return Err(SessionError::Rejected { detail: response_detail(response).await });
        }

        // The 2xx response set the refresh cookie; the follow-up refresh
        // commits token and profile together.
        if self.refresh().await {
            Ok(())
        } else {
            Err(SessionError::Network)
        }
    }

    /// Silently renew the access token using the refresh cookie.
    ///
    /// Returns true and commits the new snapshot on success. Returns false on
    /// any failure — network or non-2xx — without touching existing state;
    /// callers decide whether failure means logout.
    pub async fn refresh(&self) -> bool {
        let url = format!("{}/auth/refresh", self.config.base_url);
        let response = match self.http.post(&url).send().await {
            Ok(response) => response,
            Err(error) => {
                tracing::debug!(%error, "refresh transport failure");
                return false;
            }
        };

        if !response.status().is_success() {
            tracing::debug!(status = response.status().as_u16(), "refresh rejected");
            return false;
        }

        let body = match response.json::<RefreshResponse>().await {
            Ok(body) => body,
            Err(error) => {
                tracing::debug!(%error, "refresh body decode failed");
                return false;
            }
        };

        let mut inner = self.lock();
        inner.snapshot = Some(AuthSnapshot { user: body.user, access_token: body.access_token });
        inner.phase = SessionPhase::Authenticated;
        true
    }

    /// End the session: best-effort backend logout, then unconditionally
    /// clear local state and notify session-end hooks. Backend failures never
    /// block the local logout.
    pub async fn logout(&self) {
        let url = format!("{}/auth/logout", self.config.base_url);
        if let Err(error) = self.http.post(&url).send().await {
            tracing::warn!(%error, "logout request failed; clearing local session anyway");
        }
        self.force_expire();
    }

    /// Clear local state and transition to `Anonymous`, firing session-end
    /// hooks once per actual transition.
    pub(crate) fn force_expire(&self) {
        let hooks = {
            let mut inner = self.lock();
            if inner.phase == SessionPhase::Anonymous {
                return;
            }
            inner.snapshot = None;
            inner.phase = SessionPhase::Anonymous;
            inner.on_session_end.clone()
        };
        // Hooks run outside the lock; they may call back into the manager.
        for hook in hooks {
            hook();
        }
    }

    /// Run the one initial silent refresh and start the keep-alive task.
    /// Success leaves the session `Authenticated`, failure `Anonymous`.
    pub async fn bootstrap(&self) -> SessionPhase {
        let refreshed = self.refresh().await;
        {
            let mut inner = self.lock();
            if !refreshed && inner.phase == SessionPhase::Bootstrapping {
                inner.phase = SessionPhase::Anonymous;
            }
        }
        self.spawn_keep_alive();
        self.phase()
    }

    /// Background renewal: one independent `refresh` per interval while
    /// authenticated. A failed tick is not retried within the interval and
    /// does not log the user out.
    fn spawn_keep_alive(&self) {
        let session = self.clone();
        let interval = self.config.refresh_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately; bootstrap already refreshed.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if session.phase() != SessionPhase::Authenticated {
                    continue;
                }
                if !session.refresh().await {
                    tracing::debug!("keep-alive refresh failed; next attempt at the next interval");
                }
            }
        });
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SessionInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
