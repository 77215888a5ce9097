//! Transient user-facing notifications.

use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::broadcast;
use uuid::Uuid;

const CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Warning,
    Error,
    Success,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub id: Uuid,
    pub level: NotificationLevel,
    pub title: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(
        level: NotificationLevel,
        title: impl Into<String>,
        description: impl Into<String>,
        ttl: Duration,
    ) -> Self {
        let created_at = Utc::now();
        let ttl = chrono::Duration::from_std(ttl)
            .unwrap_or_else(|_| chrono::Duration::seconds(i64::from(u32::MAX)));
        Self {
            id: Uuid::now_v7(),
            level,
            title: title.into(),
            description: description.into(),
            created_at,
            expires_at: created_at + ttl,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Shared sink for notifications.
///
/// Clones share the same list and channel. Expired notifications are
/// pruned lazily whenever the active list is read.
#[derive(Clone)]
pub struct NotificationCenter {
    active: Arc<Mutex<Vec<Notification>>>,
    sender: broadcast::Sender<Notification>,
    dismiss_after: Duration,
}

impl NotificationCenter {
    pub fn new(dismiss_after: Duration) -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            active: Arc::new(Mutex::new(Vec::new())),
            sender,
            dismiss_after,
        }
    }

    pub fn dismiss_after(&self) -> Duration {
        self.dismiss_after
    }

    pub fn push(
        &self,
        level: NotificationLevel,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Notification {
        let notification = Notification::new(level, title, description, self.dismiss_after);
        tracing::debug!(
            id = %notification.id,
            level = ?notification.level,
            title = %notification.title,
            "Notification raised"
        );
        self.lock().push(notification.clone());
        // No subscribers is fine.
        let _ = self.sender.send(notification.clone());
        notification
    }

    pub fn active(&self) -> Vec<Notification> {
        self.active_at(Utc::now())
    }

    pub fn active_at(&self, now: DateTime<Utc>) -> Vec<Notification> {
        let mut active = self.lock();
        active.retain(|n| !n.is_expired_at(now));
        active.clone()
    }

    pub fn dismiss(&self, id: Uuid) -> bool {
        let mut active = self.lock();
        let before = active.len();
        active.retain(|n| n.id != id);
        active.len() != before
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Notification>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_dismiss() {
        let center = NotificationCenter::new(Duration::from_secs(5));
        let first = center.push(NotificationLevel::Success, "Saved", "All good");
        let second = center.push(NotificationLevel::Error, "Failed", "Try again");
        assert_eq!(center.active().len(), 2);

        assert!(center.dismiss(first.id));
        assert!(!center.dismiss(first.id));
        let active = center.active();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, second.id);
    }

    #[test]
    fn test_expiry_prunes() {
        let center = NotificationCenter::new(Duration::from_secs(5));
        let n = center.push(NotificationLevel::Info, "Hello", "");
        assert_eq!(n.expires_at - n.created_at, chrono::Duration::seconds(5));
        assert_eq!(center.active_at(n.created_at).len(), 1);
        assert!(center.active_at(n.expires_at).is_empty());
        assert!(center.active().is_empty());
    }

    #[tokio::test]
    async fn test_subscribers_receive_pushes() {
        let center = NotificationCenter::new(Duration::from_secs(5));
        let mut rx = center.subscribe();
        center.push(NotificationLevel::Warning, "Heads up", "Detail");
        let received = rx.recv().await.unwrap();
        assert_eq!(received.title, "Heads up");
        assert_eq!(received.level, NotificationLevel::Warning);
    }
}
