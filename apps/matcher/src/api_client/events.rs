use std::sync::{Mutex, PoisonError};

use tracing::{info, warn};

/// User-visible side effects raised by the HTTP client.
pub trait SessionEvents: Send + Sync {
    /// A transient error notification (a toast in a browser shell).
    fn notify_error(&self, message: &str);

    /// Send the user to another entry point, e.g. `/login`.
    fn redirect(&self, path: &str);
}

/// Prints notifications to stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleEvents;

impl SessionEvents for ConsoleEvents {
    fn notify_error(&self, message: &str) {
        warn!("{message}");
        eprintln!("error: {message}");
    }

    fn redirect(&self, path: &str) {
        info!("Redirecting to {path}");
        if path == super::LOGIN_PATH {
            eprintln!("Run `matcher login` to sign in again.");
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Error(String),
    Redirect(String),
}

/// Keeps every event in order. For embedding shells that render their own
/// notifications, and for tests.
#[derive(Debug, Default)]
pub struct RecordingEvents {
    events: Mutex<Vec<SessionEvent>>,
}

impl RecordingEvents {
    pub fn events(&self) -> Vec<SessionEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn push(&self, event: SessionEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

impl SessionEvents for RecordingEvents {
    fn notify_error(&self, message: &str) {
        self.push(SessionEvent::Error(message.to_string()));
    }

    fn redirect(&self, path: &str) {
        self.push(SessionEvent::Redirect(path.to_string()));
    }
}
