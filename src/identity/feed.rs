use parking_lot::Mutex;
use tokio::sync::mpsc::{self, UnboundedSender};

use super::IdentityEvents;
use crate::models::Identity;

#[derive(Default)]
struct FeedInner {
    // outer None: nothing resolved yet, no initial event is replayed
    current: Option<Option<Identity>>,
    senders: Vec<UnboundedSender<Option<Identity>>>,
}

/// Fans identity changes out to every live subscriber and replays the
/// latest value to new ones.
#[derive(Default)]
pub struct IdentityFeed {
    inner: Mutex<FeedInner>,
}

impl IdentityFeed {
    pub fn new(current: Option<Identity>) -> Self {
        Self {
            inner: Mutex::new(FeedInner {
                current: Some(current),
                senders: Vec::new(),
            }),
        }
    }

    /// A feed that has not learned the session state yet
    pub fn unresolved() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<Identity> {
        self.inner.lock().current.clone().flatten()
    }

    pub fn publish(&self, identity: Option<Identity>) {
        let mut inner = self.inner.lock();
        inner.current = Some(identity.clone());
        inner.senders.retain(|tx| tx.send(identity.clone()).is_ok());
    }

    pub fn subscribe(&self) -> IdentityEvents {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.inner.lock();
        if let Some(current) = &inner.current {
            let _ = tx.send(current.clone());
        }
        inner.senders.push(tx);
        rx
    }

    pub fn subscriber_count(&self) -> usize {
        let mut inner = self.inner.lock();
        inner.senders.retain(|tx| !tx.is_closed());
        inner.senders.len()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::models::UserId;

    fn identity(uid: &str) -> Identity {
        Identity {
            uid: UserId::from(uid),
            email: format!("{uid}@example.com"),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn replays_current_state_to_new_subscribers() {
        let feed = IdentityFeed::new(Some(identity("u1")));
        let mut rx = feed.subscribe();
        let first = rx.recv().await.flatten();
        assert_eq!(Some(UserId::from("u1")), first.map(|i| i.uid));
    }

    #[tokio::test]
    async fn unresolved_feed_stays_silent_until_published() {
        let feed = IdentityFeed::unresolved();
        let mut rx = feed.subscribe();
        assert!(rx.try_recv().is_err());
        feed.publish(None);
        assert_eq!(Some(None), rx.recv().await);
    }

    #[tokio::test]
    async fn dropped_receivers_are_pruned() {
        let feed = IdentityFeed::new(None);
        let rx = feed.subscribe();
        let _kept = feed.subscribe();
        assert_eq!(2, feed.subscriber_count());
        drop(rx);
        feed.publish(Some(identity("u1")));
        assert_eq!(1, feed.subscriber_count());
    }
}
