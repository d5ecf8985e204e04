//! Single-flight coordination of access-token refreshes.
//!
//! The first request that sees an expired token leads the refresh. Requests
//! failing while it runs queue up and receive the leader's outcome in the
//! order they arrived.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::oneshot;

use super::ApiError;
use crate::models::Session;

/// New access token, or the reason the refresh failed.
pub type RefreshOutcome = Result<String, String>;

/// Mints a new session from the stored refresh token.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self, refresh_token: Option<String>) -> Result<Session, ApiError>;
}

/// Refresher used when the backend's refresh endpoint is not wired in.
/// Every attempt fails, so an expired token always ends the session.
#[derive(Debug, Default, Clone, Copy)]
pub struct RefreshUnavailable;

#[async_trait]
impl TokenRefresher for RefreshUnavailable {
    async fn refresh(&self, _refresh_token: Option<String>) -> Result<Session, ApiError> {
        Err(ApiError::RefreshUnavailable)
    }
}

#[derive(Debug, Default)]
struct RefreshState {
    in_progress: bool,
    waiters: Vec<oneshot::Sender<RefreshOutcome>>,
}

#[derive(Debug, Default)]
pub struct RefreshCoordinator {
    state: Mutex<RefreshState>,
}

pub enum RefreshTicket<'a> {
    /// The caller must run the refresh and complete the lease.
    Lead(RefreshLease<'a>),
    /// A refresh is already running; await its outcome.
    Wait(oneshot::Receiver<RefreshOutcome>),
}

/// Held by the refresh leader. Dropping it without completing releases
/// every waiter with a failure, so the in-progress flag can never stick.
pub struct RefreshLease<'a> {
    coordinator: &'a RefreshCoordinator,
    completed: bool,
}

impl RefreshCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_refresh_or_wait(&self) -> RefreshTicket<'_> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.in_progress {
            let (tx, rx) = oneshot::channel();
            state.waiters.push(tx);
            return RefreshTicket::Wait(rx);
        }

        state.in_progress = true;
        RefreshTicket::Lead(RefreshLease {
            coordinator: self,
            completed: false,
        })
    }

    /// Clears the in-progress flag and hands `outcome` to every waiter in
    /// arrival order. The queue is empty afterwards.
    pub fn complete_refresh(&self, outcome: RefreshOutcome) {
        let waiters = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            state.in_progress = false;
            std::mem::take(&mut state.waiters)
        };

        for waiter in waiters {
            // A waiter whose request was dropped is no longer listening.
            let _ = waiter.send(outcome.clone());
        }
    }

    pub fn is_refreshing(&self) -> bool {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .in_progress
    }

    pub fn waiting(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .waiters
            .len()
    }
}

impl RefreshLease<'_> {
    pub fn complete(mut self, outcome: RefreshOutcome) {
        self.completed = true;
        self.coordinator.complete_refresh(outcome);
    }
}

impl Drop for RefreshLease<'_> {
    fn drop(&mut self) {
        if !self.completed {
            self.coordinator
                .complete_refresh(Err("token refresh was abandoned".to_string()));
        }
    }
}
