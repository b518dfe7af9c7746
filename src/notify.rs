//! One short-lived status message at a time.

use std::time::{Duration, Instant};

use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Error,
    Info,
}

/// Identifies one notification so its expiry timer can't clear a newer one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NotificationId(u64);

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub id: NotificationId,
    pub kind: NotificationKind,
    pub text: String,
    pub expires_at: Instant,
}

#[derive(Debug)]
pub struct Notifier {
    current: Option<Notification>,
    next_id: u64,
    timeout: Duration,
}

impl Notifier {
    pub fn new(timeout: Duration) -> Self {
        Self {
            current: None,
            next_id: 0,
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Replace whatever is showing. The caller schedules [`Notifier::expire`]
    /// with the returned id after [`Notifier::timeout`].
    pub fn notify(
        &mut self,
        kind: NotificationKind,
        text: impl Into<String>,
        now: Instant,
    ) -> NotificationId {
        self.next_id += 1;
        let id = NotificationId(self.next_id);
        let text = text.into();
        debug!(?kind, %text, "Notification");
        self.current = Some(Notification {
            id,
            kind,
            text,
            expires_at: now + self.timeout,
        });
        id
    }

    /// Clear the notification `id` if it is still the one showing.
    pub fn expire(&mut self, id: NotificationId) {
        if self.current.as_ref().is_some_and(|n| n.id == id) {
            self.current = None;
        }
    }

    /// The notification showing at `now`, if any.
    pub fn visible(&self, now: Instant) -> Option<&Notification> {
        self.current.as_ref().filter(|n| now < n.expires_at)
    }
}
