//! Session manager: the single holder of the current identity.

use std::sync::Arc;

use tokio::{sync::watch, task::JoinHandle};
use tracing::{debug, info, warn};

use crate::error::AuthError;
use crate::identity::IdentityService;
use crate::models::{Identity, SessionStatus};

/// Wraps an identity service and republishes its notifications as a
/// [`SessionStatus`].
///
/// Sign-up, login and logout never touch the status directly; it only moves
/// when the identity service notifies the subscription started by
/// [`SessionManager::start`].
#[derive(Clone)]
pub struct SessionManager {
    identity: Arc<dyn IdentityService>,
    status: Arc<watch::Sender<SessionStatus>>,
}

impl SessionManager {
    pub fn new(identity: Arc<dyn IdentityService>) -> Self {
        let (status, _) = watch::channel(SessionStatus::Unresolved);
        Self {
            identity,
            status: Arc::new(status),
        }
    }

    /// Subscribe to identity changes until the returned handle is dropped
    pub fn start(&self) -> SessionSubscription {
        let mut events = self.identity.subscribe();
        let manager = self.clone();
        let task = tokio::spawn(async move {
            while let Some(identity) = events.recv().await {
                manager.apply(identity);
            }
            debug!("identity feed closed");
        });
        SessionSubscription { task }
    }

    /// Overwrite the held identity with a notification
    pub fn apply(&self, identity: Option<Identity>) {
        match &identity {
            Some(identity) => info!(uid = %identity.uid, "signed in"),
            None => info!("signed out"),
        }
        self.status.send_replace(SessionStatus::from(identity));
    }

    pub fn status(&self) -> SessionStatus {
        self.status.borrow().clone()
    }

    pub fn current_identity(&self) -> Option<Identity> {
        self.status.borrow().identity().cloned()
    }

    pub fn watch(&self) -> watch::Receiver<SessionStatus> {
        self.status.subscribe()
    }

    /// Wait for the status to satisfy `f`
    pub async fn wait_until<F>(&self, f: F) -> SessionStatus
    where
        F: FnMut(&SessionStatus) -> bool,
    {
        let mut rx = self.watch();
        match rx.wait_for(f).await {
            Ok(status) => status.clone(),
            // the sender lives in self, so the channel cannot close here
            Err(_) => self.status(),
        }
    }

    /// Wait for the first identity notification
    pub async fn wait_resolved(&self) -> SessionStatus {
        self.wait_until(SessionStatus::is_resolved).await
    }

    pub async fn signup(&self, email: &str, password: &str) -> Result<(), AuthError> {
        match self.identity.create_account(email, password).await {
            Ok(identity) => {
                debug!(uid = %identity.uid, "sign-up accepted");
                Ok(())
            }
            Err(err) => {
                warn!(%err, "sign-up failed");
                Err(err)
            }
        }
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<(), AuthError> {
        match self.identity.verify_credentials(email, password).await {
            Ok(identity) => {
                debug!(uid = %identity.uid, "login accepted");
                Ok(())
            }
            Err(err) => {
                warn!(%err, "login failed");
                Err(err)
            }
        }
    }

    pub async fn logout(&self) -> Result<(), AuthError> {
        self.identity.end_session().await.inspect_err(|err| {
            warn!(%err, "logout failed");
        })
    }
}

/// Live identity subscription, torn down on drop
pub struct SessionSubscription {
    task: JoinHandle<()>,
}

impl SessionSubscription {
    pub fn unsubscribe(self) {
        self.task.abort();
    }

    pub fn is_active(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for SessionSubscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::testing::{FakeIdentity, identity};

    async fn settle<F>(session: &SessionManager, f: F) -> SessionStatus
    where
        F: FnMut(&SessionStatus) -> bool,
    {
        tokio::time::timeout(Duration::from_secs(1), session.wait_until(f))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn unresolved_until_first_notification() {
        let service = Arc::new(FakeIdentity::unresolved());
        let session = SessionManager::new(service.clone());
        let _subscription = session.start();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(SessionStatus::Unresolved, session.status());

        service.feed().publish(None);
        assert_eq!(SessionStatus::Unauthenticated, settle(&session, SessionStatus::is_resolved).await);
    }

    #[tokio::test]
    async fn last_notification_wins() {
        let session = SessionManager::new(Arc::new(FakeIdentity::signed_out()));
        let sequence = [
            Some(identity("u1")),
            None,
            Some(identity("u2")),
            Some(identity("u3")),
        ];
        for (n, notification) in sequence.iter().enumerate() {
            session.apply(notification.clone());
            assert_eq!(SessionStatus::from(sequence[n].clone()), session.status());
        }
        assert_eq!(Some(identity("u3").uid), session.current_identity().map(|i| i.uid));

        session.apply(None);
        assert_eq!(None, session.current_identity());
    }

    #[tokio::test]
    async fn notifications_are_applied_in_order() {
        let service = Arc::new(FakeIdentity::signed_out());
        let session = SessionManager::new(service.clone());
        let _subscription = session.start();
        for uid in ["u1", "u2", "u3"] {
            service.feed().publish(Some(identity(uid)));
        }
        let status = settle(&session, |s| {
            s.identity().is_some_and(|i| i.uid.as_ref() == "u3")
        })
        .await;
        assert!(status.is_authenticated());
    }

    #[tokio::test]
    async fn login_updates_through_subscription() {
        let service = Arc::new(FakeIdentity::signed_out());
        service.register("a@b.co", "secret1", identity("u1"));
        let session = SessionManager::new(service.clone());
        let _subscription = session.start();
        settle(&session, SessionStatus::is_resolved).await;

        session.login("a@b.co", "secret1").await.unwrap();
        let status = settle(&session, SessionStatus::is_authenticated).await;
        assert_eq!(Some(&identity("u1").uid), status.identity().map(|i| &i.uid));

        session.logout().await.unwrap();
        settle(&session, |s| !s.is_authenticated()).await;
        assert_eq!(SessionStatus::Unauthenticated, session.status());
    }

    #[tokio::test]
    async fn rejected_login_keeps_current_identity() {
        let service = Arc::new(FakeIdentity::signed_out());
        service.register("a@b.co", "secret1", identity("u1"));
        let session = SessionManager::new(service.clone());
        session.apply(Some(identity("u0")));

        let err = session.login("a@b.co", "wrong").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
        assert_eq!(Some(identity("u0").uid), session.current_identity().map(|i| i.uid));
    }

    #[tokio::test]
    async fn signup_does_not_touch_status_directly() {
        let service = Arc::new(FakeIdentity::signed_out());
        let session = SessionManager::new(service.clone());
        session.signup("a@b.co", "secret1").await.unwrap();
        // nobody subscribed, so nothing was delivered
        assert_eq!(SessionStatus::Unresolved, session.status());
    }

    #[tokio::test]
    async fn unsubscribe_stops_updates() {
        let service = Arc::new(FakeIdentity::signed_out());
        let session = SessionManager::new(service.clone());
        let subscription = session.start();
        settle(&session, SessionStatus::is_resolved).await;
        assert!(subscription.is_active());

        subscription.unsubscribe();
        tokio::time::sleep(Duration::from_millis(10)).await;
        service.feed().publish(Some(identity("u1")));
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(SessionStatus::Unauthenticated, session.status());
        assert_eq!(0, service.feed().subscriber_count());
    }
}
