//! Credential store: tokens and the user profile, persisted across restarts.
//!
//! Every accessor is synchronous and infallible. A missing or unreadable slot
//! reads as `None`; callers treat absence as a normal state.

use std::sync::Arc;

use tracing::warn;

use crate::models::{Session, UserProfile};

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

/// String key/value backend, the equivalent of browser local storage.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

/// The four persisted slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    AccessToken,
    RefreshToken,
    User,
    IdToken,
}

impl Slot {
    pub const ALL: [Slot; 4] = [Slot::AccessToken, Slot::RefreshToken, Slot::User, Slot::IdToken];

    pub fn key(self) -> &'static str {
        match self {
            Slot::AccessToken => "accessToken",
            Slot::RefreshToken => "refreshToken",
            Slot::User => "user",
            Slot::IdToken => "idToken",
        }
    }
}

#[derive(Clone)]
pub struct CredentialStore {
    backend: Arc<dyn KeyValueStore>,
}

impl CredentialStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    /// A store that lives only as long as the process.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::default()))
    }

    /// Raw slot value. Empty strings count as absent.
    pub fn get(&self, slot: Slot) -> Option<String> {
        self.backend.get(slot.key()).filter(|v| !v.is_empty())
    }

    pub fn set(&self, slot: Slot, value: &str) {
        self.backend.set(slot.key(), value);
    }

    /// Removes all four slots.
    pub fn clear(&self) {
        for slot in Slot::ALL {
            self.backend.remove(slot.key());
        }
    }

    pub fn access_token(&self) -> Option<String> {
        self.get(Slot::AccessToken)
    }

    pub fn set_access_token(&self, token: &str) {
        self.set(Slot::AccessToken, token);
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.get(Slot::RefreshToken)
    }

    pub fn set_refresh_token(&self, token: &str) {
        self.set(Slot::RefreshToken, token);
    }

    pub fn id_token(&self) -> Option<String> {
        self.get(Slot::IdToken)
    }

    pub fn set_id_token(&self, token: &str) {
        self.set(Slot::IdToken, token);
    }

    /// Stored profile, or `None` when missing or not valid JSON.
    pub fn user(&self) -> Option<UserProfile> {
        let raw = self.get(Slot::User)?;
        match serde_json::from_str(&raw) {
            Ok(user) => Some(user),
            Err(e) => {
                warn!("Ignoring malformed stored user profile: {e}");
                None
            }
        }
    }

    pub fn set_user(&self, user: &UserProfile) {
        match serde_json::to_string(user) {
            Ok(raw) => self.set(Slot::User, &raw),
            Err(e) => warn!("Failed to serialize user profile: {e}"),
        }
    }

    pub fn store_session(&self, session: &Session) {
        self.set_access_token(&session.access_token);
        self.set_refresh_token(&session.refresh_token);
        self.set_user(&session.user);
    }

    /// The persisted session, if an access token is present.
    pub fn session(&self) -> Option<Session> {
        let access_token = self.access_token()?;
        Some(Session {
            access_token,
            refresh_token: self.refresh_token().unwrap_or_default(),
            user: self.user().unwrap_or_default(),
        })
    }
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print token values.
        f.debug_struct("CredentialStore")
            .field("has_access_token", &self.access_token().is_some())
            .finish()
    }
}
