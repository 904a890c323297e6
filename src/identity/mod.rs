//! Identity service contract and the bundled local implementation.

mod feed;
mod local;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::AuthError;
use crate::models::Identity;

pub use feed::IdentityFeed;
pub use local::LocalIdentityService;

/// Identity-change notifications. The first event carries the current state;
/// dropping the receiver unsubscribes.
pub type IdentityEvents = mpsc::UnboundedReceiver<Option<Identity>>;

/// An external service that owns accounts and the signed-in principal
#[async_trait]
pub trait IdentityService: Send + Sync {
    async fn create_account(&self, email: &str, password: &str) -> Result<Identity, AuthError>;

    async fn verify_credentials(&self, email: &str, password: &str)
    -> Result<Identity, AuthError>;

    async fn end_session(&self) -> Result<(), AuthError>;

    fn subscribe(&self) -> IdentityEvents;
}
