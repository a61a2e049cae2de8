//! Session-expiry notifications.

use tokio::sync::broadcast;

use crate::error::ApiError;

const CHANNEL_CAPACITY: usize = 16;

/// Events the UI layer reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// A credential was rejected; the user must log in again.
    Unauthorized,
}

/// Fan-out of [`SessionEvent`]s to any number of subscribers.
///
/// Emitting with no subscribers is not an error.
#[derive(Debug, Clone)]
pub struct SessionEvents {
    tx: broadcast::Sender<SessionEvent>,
}

impl Default for SessionEvents {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionEvents {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    pub fn emit_unauthorized(&self) {
        tracing::warn!("session expired, credential rejected");
        let _ = self.tx.send(SessionEvent::Unauthorized);
    }

    /// Emit [`SessionEvent::Unauthorized`] if `error` is a session expiry.
    /// Returns whether it was.
    pub fn observe(&self, error: &ApiError) -> bool {
        if error.is_session_expiry() {
            self.emit_unauthorized();
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn observe_only_fires_on_unauthorized() {
        let events = SessionEvents::new();
        let mut rx = events.subscribe();

        assert!(!events.observe(&ApiError::NotFound("cart".to_string())));
        assert!(rx.try_recv().is_err());

        assert!(events.observe(&ApiError::Unauthorized));
        assert_eq!(rx.try_recv().unwrap(), SessionEvent::Unauthorized);
    }

    #[test]
    fn emit_without_subscribers_is_silent() {
        SessionEvents::new().emit_unauthorized();
    }
}
