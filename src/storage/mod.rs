//! Object store contract, namespace rules and the bundled filesystem store.

mod local;
mod namespace;

use async_trait::async_trait;

use crate::error::StorageError;
use crate::models::ObjectHandle;

pub use local::LocalObjectStore;
pub use namespace::Namespace;

/// An external bucket addressed by slash-separated paths
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Objects directly under `prefix`, in the store's order
    async fn list(&self, prefix: &str) -> Result<Vec<ObjectHandle>, StorageError>;

    async fn resolve_address(&self, handle: &ObjectHandle) -> Result<String, StorageError>;

    async fn delete(&self, path: &str) -> Result<(), StorageError>;

    async fn write(&self, path: &str, bytes: Vec<u8>) -> Result<(), StorageError>;

    async fn read(&self, path: &str) -> Result<Vec<u8>, StorageError>;
}
