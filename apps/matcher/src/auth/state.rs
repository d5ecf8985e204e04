use std::sync::{Mutex, PoisonError};

use serde::Serialize;
use tracing::{info, warn};

use super::{AuthError, LoginCredentials};
use crate::api_client::ApiClient;
use crate::models::{Session, UserProfile};
use crate::storage::CredentialStore;

pub const LOGIN_ENDPOINT: &str = "/auth/login";
pub const REFRESH_ENDPOINT: &str = "/auth/refresh-token";

const LOGIN_FAILED: &str = "Login failed. Please try again.";
const REFRESH_FAILED: &str = "Session expired. Please log in again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStatus {
    Anonymous,
    Authenticating,
    Authenticated,
}

/// In-memory view of the session.
#[derive(Clone, PartialEq)]
pub struct AuthSnapshot {
    pub user: Option<UserProfile>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub status: AuthStatus,
    /// Last login or refresh failure, kept until `reset_error`.
    pub error: Option<String>,
}

impl AuthSnapshot {
    fn from_store(store: &CredentialStore) -> Self {
        let access_token = store.access_token();
        let status = if access_token.is_some() {
            AuthStatus::Authenticated
        } else {
            AuthStatus::Anonymous
        };
        Self {
            user: store.user(),
            access_token,
            refresh_token: store.refresh_token(),
            status,
            error: None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.status == AuthStatus::Authenticated
    }

    pub fn is_loading(&self) -> bool {
        self.status == AuthStatus::Authenticating
    }

    fn sign_in(&mut self, session: Session) {
        self.user = Some(session.user);
        self.access_token = Some(session.access_token);
        self.refresh_token = Some(session.refresh_token);
        self.status = AuthStatus::Authenticated;
    }

    fn sign_out(&mut self) {
        self.user = None;
        self.access_token = None;
        self.refresh_token = None;
        self.status = AuthStatus::Anonymous;
    }
}

impl std::fmt::Debug for AuthSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSnapshot")
            .field("user", &self.user)
            .field("has_access_token", &self.access_token.is_some())
            .field("status", &self.status)
            .field("error", &self.error)
            .finish()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest {
    refresh_token: Option<String>,
}

/// Session state container. Every mutation writes the durable store first
/// and then the in-memory snapshot, so the two agree once it returns.
pub struct AuthStore {
    client: ApiClient,
    state: Mutex<AuthSnapshot>,
}

impl AuthStore {
    /// Cold start: the durable store is the source of truth.
    pub fn new(client: ApiClient) -> Self {
        let snapshot = AuthSnapshot::from_store(client.credentials());
        Self {
            client,
            state: Mutex::new(snapshot),
        }
    }

    pub fn snapshot(&self) -> AuthSnapshot {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn update(&self, mutate: impl FnOnce(&mut AuthSnapshot)) -> AuthSnapshot {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        mutate(&mut state);
        state.clone()
    }

    fn store(&self) -> &CredentialStore {
        self.client.credentials()
    }

    /// Validates the credentials locally, then signs in against the backend.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSnapshot, AuthError> {
        let credentials = LoginCredentials::new(email, password)?;

        self.update(|state| {
            state.status = AuthStatus::Authenticating;
            state.error = None;
        });

        match self
            .client
            .post_json::<_, Session>(LOGIN_ENDPOINT, &credentials)
            .await
        {
            Ok(session) => {
                self.store().store_session(&session);
                info!("Signed in as {}", session.user.display_name());
                Ok(self.update(|state| state.sign_in(session)))
            }
            Err(e) => {
                let message = e.server_message().unwrap_or(LOGIN_FAILED).to_string();
                warn!("Login failed: {e}");
                self.store().clear();
                self.update(|state| {
                    state.sign_out();
                    state.error = Some(message.clone());
                });
                Err(AuthError::LoginFailed(message))
            }
        }
    }

    /// Exchanges the stored refresh token for a new session.
    pub async fn refresh_tokens(&self) -> Result<AuthSnapshot, AuthError> {
        let body = RefreshRequest {
            refresh_token: self.store().refresh_token(),
        };

        self.update(|state| state.status = AuthStatus::Authenticating);

        match self
            .client
            .post_json::<_, Session>(REFRESH_ENDPOINT, &body)
            .await
        {
            Ok(session) => {
                self.store().store_session(&session);
                Ok(self.update(|state| state.sign_in(session)))
            }
            Err(e) => {
                let message = e.server_message().unwrap_or(REFRESH_FAILED).to_string();
                warn!("Token refresh failed: {e}");
                self.store().clear();
                self.update(|state| {
                    state.sign_out();
                    state.error = Some(message.clone());
                });
                Err(AuthError::RefreshFailed(message))
            }
        }
    }

    /// Ends the session locally. No backend call is involved.
    pub fn logout(&self) -> AuthSnapshot {
        self.store().clear();
        info!("Signed out");
        self.update(AuthSnapshot::sign_out)
    }

    pub fn reset_error(&self) -> AuthSnapshot {
        self.update(|state| state.error = None)
    }

    /// Reloads the session from durable storage, e.g. after the HTTP client
    /// wiped an expired session. Any stored error is kept.
    pub fn sync_from_store(&self) -> AuthSnapshot {
        let fresh = AuthSnapshot::from_store(self.store());
        self.update(|state| {
            let error = state.error.take();
            *state = AuthSnapshot { error, ..fresh };
        })
    }
}
