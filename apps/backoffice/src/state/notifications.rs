//! # Notification State
//!
//! Short-lived messages produced by every command, successful or not.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Notification Lifecycle                               │
//! │                                                                         │
//! │  command outcome ──► push(severity, message)                           │
//! │                           │                                             │
//! │                           ▼                                             │
//! │                 ┌──────────────────────┐                               │
//! │                 │ visible until        │──► dismiss(id)  (user click)  │
//! │                 │ created_at + ttl     │                               │
//! │                 └──────────┬───────────┘                               │
//! │                            ▼                                            │
//! │                 active() prunes expired entries                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use pharmadesk_core::SharedClock;
use serde::Serialize;

use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: u64,
    pub severity: Severity,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Queue {
    next_id: u64,
    items: Vec<Notification>,
}

/// Queue of visible notifications.
pub struct NotificationState {
    ttl: chrono::Duration,
    clock: SharedClock,
    queue: Mutex<Queue>,
}

impl std::fmt::Debug for NotificationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationState")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl NotificationState {
    pub fn new(ttl: Duration, clock: SharedClock) -> Self {
        NotificationState {
            ttl: chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX),
            clock,
            queue: Mutex::new(Queue::default()),
        }
    }

    pub fn push(&self, severity: Severity, message: impl Into<String>) -> Notification {
        let now = self.clock.now();
        let mut queue = self.queue.lock().expect("Notification mutex poisoned");
        queue.next_id += 1;
        let notification = Notification {
            id: queue.next_id,
            severity,
            message: message.into(),
            created_at: now,
            expires_at: now.checked_add_signed(self.ttl).unwrap_or(DateTime::<Utc>::MAX_UTC),
        };
        queue.items.push(notification.clone());
        notification
    }

    pub fn success(&self, message: impl Into<String>) -> Notification {
        self.push(Severity::Success, message)
    }

    pub fn info(&self, message: impl Into<String>) -> Notification {
        self.push(Severity::Info, message)
    }

    pub fn warning(&self, message: impl Into<String>) -> Notification {
        self.push(Severity::Warning, message)
    }

    pub fn error(&self, err: &ApiError) -> Notification {
        self.push(Severity::Error, err.message.clone())
    }

    /// Visible notifications, oldest first. Expired ones are dropped.
    pub fn active(&self) -> Vec<Notification> {
        self.prune();
        self.queue
            .lock()
            .expect("Notification mutex poisoned")
            .items
            .clone()
    }

    /// Removes one notification; returns whether it was still visible.
    pub fn dismiss(&self, id: u64) -> bool {
        let mut queue = self.queue.lock().expect("Notification mutex poisoned");
        let before = queue.items.len();
        queue.items.retain(|n| n.id != id);
        queue.items.len() != before
    }

    /// Drops expired notifications, returning how many were removed.
    pub fn prune(&self) -> usize {
        let now = self.clock.now();
        let mut queue = self.queue.lock().expect("Notification mutex poisoned");
        let before = queue.items.len();
        queue.items.retain(|n| n.expires_at > now);
        before - queue.items.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pharmadesk_core::Clock;
    use std::sync::Arc;

    /// Clock the test can move forward.
    struct ManualClock(Mutex<DateTime<Utc>>);

    impl ManualClock {
        fn advance(&self, ms: i64) {
            let mut now = self.0.lock().unwrap();
            *now += chrono::Duration::milliseconds(ms);
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.0.lock().unwrap()
        }
    }

    fn setup() -> (Arc<ManualClock>, NotificationState) {
        let clock = Arc::new(ManualClock(Mutex::new(
            Utc.with_ymd_and_hms(2024, 3, 15, 10, 0, 0).unwrap(),
        )));
        let state = NotificationState::new(Duration::from_millis(3_000), clock.clone());
        (clock, state)
    }

    #[test]
    fn test_notifications_expire_after_ttl() {
        let (clock, state) = setup();
        state.success("Bill #1 saved");
        clock.advance(1_000);
        state.info("Purchase edit cancelled");

        clock.advance(2_500);
        let active = state.active();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].message, "Purchase edit cancelled");

        clock.advance(1_000);
        assert!(state.active().is_empty());
    }

    #[test]
    fn test_dismiss_removes_only_that_notification() {
        let (_clock, state) = setup();
        let first = state.warning("Cart discarded");
        state.success("Store added");

        assert!(state.dismiss(first.id));
        assert!(!state.dismiss(first.id));
        assert_eq!(state.active().len(), 1);
    }

    #[test]
    fn test_ids_increase() {
        let (_clock, state) = setup();
        let a = state.info("a");
        let b = state.info("b");
        assert!(b.id > a.id);
        assert_eq!(a.severity, Severity::Info);
    }
}
