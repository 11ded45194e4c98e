//! Password and token auth against the backend's auth endpoint.
//!
//! [`AuthApi`] holds the live session behind an `RwLock` and mirrors it
//! to a [`SessionStore`](crate::session::SessionStore) when persistence
//! is enabled. State changes fan out on a broadcast channel so callers
//! can react to sign-in, sign-out, and refresh.

use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::backend::{handle_response, read_error_message};
use crate::config::ClientOptions;
use crate::error::{BackendError, BackendResult};
use crate::session::SessionStore;

/// Tokens within this many seconds of expiry are treated as expired.
const EXPIRY_LEEWAY_SECS: i64 = 30;

/// Capacity of the auth event channel.
const EVENT_CHANNEL_CAPACITY: usize = 16;

/// An authenticated backend user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// An access/refresh token pair bound to a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    pub expires_in: i64,
    /// Unix timestamp at which the access token expires.
    #[serde(default)]
    pub expires_at: i64,
    pub refresh_token: String,
    pub user: User,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

impl Session {
    /// Whether the access token is expired or about to expire.
    pub fn is_expired(&self) -> bool {
        self.expires_at - EXPIRY_LEEWAY_SECS <= Utc::now().timestamp()
    }

    /// Derive `expires_at` from `expires_in` when the server omitted it.
    fn normalize(mut self) -> Self {
        if self.expires_at == 0 {
            self.expires_at = Utc::now().timestamp() + self.expires_in;
        }
        self
    }
}

/// Kind of auth state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn,
    SignedOut,
    TokenRefreshed,
}

/// A state transition together with the session it produced, if any.
#[derive(Debug, Clone)]
pub struct AuthChange {
    pub event: AuthEvent,
    pub session: Option<Session>,
}

#[derive(Serialize)]
struct PasswordGrant<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RefreshGrant<'a> {
    refresh_token: &'a str,
}

/// Auth sub-API of a backend client.
#[derive(Clone)]
pub struct AuthApi {
    http: reqwest::Client,
    auth_url: String,
    anon_key: String,
    session: Arc<RwLock<Option<Session>>>,
    store: Arc<dyn SessionStore>,
    persist_session: bool,
    auto_refresh_token: bool,
    events: broadcast::Sender<AuthChange>,
}

impl AuthApi {
    pub(crate) fn new(
        http: reqwest::Client,
        base_url: &str,
        anon_key: &str,
        options: &ClientOptions,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let api = Self {
            http,
            auth_url: format!("{}/auth/v1", base_url),
            anon_key: anon_key.to_string(),
            session: Arc::new(RwLock::new(None)),
            store: Arc::clone(&options.session_store),
            persist_session: options.persist_session,
            auto_refresh_token: options.auto_refresh_token,
            events,
        };

        if api.persist_session {
            match api.store.load() {
                Ok(Some(session)) => {
                    debug!(user_id = %session.user.id, "restored persisted session");
                    *api.session.write() = Some(session);
                }
                Ok(None) => {}
                Err(e) => warn!(error = %e, "failed to restore persisted session"),
            }
        }

        api
    }

    /// Sign in with an email and password.
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> BackendResult<Session> {
        let response = self
            .http
            .post(format!("{}/token?grant_type=password", self.auth_url))
            .header("apikey", &self.anon_key)
            .json(&PasswordGrant { email, password })
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::BAD_REQUEST
            || status == reqwest::StatusCode::UNAUTHORIZED
        {
            return Err(BackendError::Auth(read_error_message(response).await));
        }

        let session: Session = handle_response(response).await?;
        let session = session.normalize();
        self.install_session(session.clone(), AuthEvent::SignedIn);
        Ok(session)
    }

    /// Exchange a refresh token for a fresh session.
    pub async fn refresh(&self, refresh_token: &str) -> BackendResult<Session> {
        let response = self
            .http
            .post(format!("{}/token?grant_type=refresh_token", self.auth_url))
            .header("apikey", &self.anon_key)
            .json(&RefreshGrant { refresh_token })
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::BAD_REQUEST
            || status == reqwest::StatusCode::UNAUTHORIZED
        {
            return Err(BackendError::Auth(read_error_message(response).await));
        }

        let session: Session = handle_response(response).await?;
        let session = session.normalize();
        self.install_session(session.clone(), AuthEvent::TokenRefreshed);
        Ok(session)
    }

    /// The current session, refreshed first if it has expired.
    ///
    /// Returns `Ok(None)` when nobody is signed in. When refresh is
    /// disabled an expired session is returned as-is.
    pub async fn get_session(&self) -> BackendResult<Option<Session>> {
        let current = self.session.read().clone();
        let Some(session) = current else {
            return Ok(None);
        };

        if !session.is_expired() {
            return Ok(Some(session));
        }
        if !self.auto_refresh_token {
            return Ok(Some(session));
        }

        match self.refresh(&session.refresh_token).await {
            Ok(refreshed) => Ok(Some(refreshed)),
            Err(BackendError::Auth(message)) => {
                debug!(error = %message, "refresh rejected, clearing session");
                self.clear_session();
                Err(BackendError::Auth(message))
            }
            Err(e) => Err(e),
        }
    }

    /// Sign out and revoke the current session.
    pub async fn sign_out(&self) -> BackendResult<()> {
        let Some(session) = self.session.read().clone() else {
            return Ok(());
        };

        let result = self
            .http
            .post(format!("{}/logout", self.auth_url))
            .header("apikey", &self.anon_key)
            .bearer_auth(&session.access_token)
            .send()
            .await;

        match result {
            Ok(response) if !response.status().is_success() => {
                debug!(status = %response.status(), "logout endpoint rejected token");
            }
            Ok(_) => {}
            Err(e) => debug!(error = %e, "logout request failed"),
        }

        // Local state is cleared regardless of what the server said.
        self.clear_session();
        Ok(())
    }

    /// The signed-in user, if any, as reported by the auth endpoint.
    pub async fn get_user(&self) -> BackendResult<Option<User>> {
        let Some(session) = self.get_session().await? else {
            return Ok(None);
        };

        let response = self
            .http
            .get(format!("{}/user", self.auth_url))
            .header("apikey", &self.anon_key)
            .bearer_auth(&session.access_token)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(BackendError::Auth(read_error_message(response).await));
        }

        let user: User = handle_response(response).await?;
        Ok(Some(user))
    }

    /// Subscribe to auth state transitions.
    pub fn on_auth_state_change(&self) -> broadcast::Receiver<AuthChange> {
        self.events.subscribe()
    }

    /// Token sent as the bearer for table requests.
    pub(crate) fn bearer_token(&self) -> String {
        self.session
            .read()
            .as_ref()
            .map(|s| s.access_token.clone())
            .unwrap_or_else(|| self.anon_key.clone())
    }

    fn install_session(&self, session: Session, event: AuthEvent) {
        if self.persist_session {
            if let Err(e) = self.store.save(&session) {
                warn!(error = %e, "failed to persist session");
            }
        }
        *self.session.write() = Some(session.clone());
        let _ = self.events.send(AuthChange {
            event,
            session: Some(session),
        });
    }

    fn clear_session(&self) {
        if self.persist_session {
            if let Err(e) = self.store.clear() {
                warn!(error = %e, "failed to clear persisted session");
            }
        }
        *self.session.write() = None;
        let _ = self.events.send(AuthChange {
            event: AuthEvent::SignedOut,
            session: None,
        });
    }
}
