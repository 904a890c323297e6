//! In-memory doubles for the identity service and the object store.

use std::{
    collections::{BTreeMap, HashMap},
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
};

use async_trait::async_trait;
use chrono::DateTime;
use parking_lot::Mutex;

use crate::error::{AuthError, StorageError};
use crate::identity::{IdentityEvents, IdentityFeed, IdentityService};
use crate::models::{Identity, ObjectHandle, UserId};
use crate::storage::ObjectStore;

/// 1x1 transparent GIF
pub const GIF: &[u8] = &[
    0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x01, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0xff, 0xff,
    0xff, 0x00, 0x00, 0x00, 0x21, 0xf9, 0x04, 0x01, 0x00, 0x00, 0x00, 0x00, 0x2c, 0x00, 0x00,
    0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x44, 0x01, 0x00, 0x3b,
];

pub fn identity(uid: &str) -> Identity {
    Identity {
        uid: UserId::from(uid),
        email: format!("{uid}@example.com"),
        created_at: DateTime::from_timestamp(0, 0).unwrap(),
    }
}

pub struct FakeIdentity {
    accounts: Mutex<HashMap<String, (String, Identity)>>,
    feed: IdentityFeed,
}

impl FakeIdentity {
    pub fn signed_out() -> Self {
        Self {
            accounts: Mutex::new(HashMap::new()),
            feed: IdentityFeed::new(None),
        }
    }

    pub fn unresolved() -> Self {
        Self {
            accounts: Mutex::new(HashMap::new()),
            feed: IdentityFeed::unresolved(),
        }
    }

    pub fn register(&self, email: &str, password: &str, identity: Identity) {
        self.accounts
            .lock()
            .insert(email.to_string(), (password.to_string(), identity));
    }

    pub fn feed(&self) -> &IdentityFeed {
        &self.feed
    }
}

#[async_trait]
impl IdentityService for FakeIdentity {
    async fn create_account(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let identity = {
            let mut accounts = self.accounts.lock();
            if accounts.contains_key(email) {
                return Err(AuthError::AccountExists(email.to_string()));
            }
            let identity = Identity {
                uid: UserId::generate(),
                email: email.to_string(),
                created_at: DateTime::from_timestamp(0, 0).unwrap(),
            };
            accounts.insert(email.to_string(), (password.to_string(), identity.clone()));
            identity
        };
        self.feed.publish(Some(identity.clone()));
        Ok(identity)
    }

    async fn verify_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Identity, AuthError> {
        let identity = match self.accounts.lock().get(email) {
            None => return Err(AuthError::AccountNotFound(email.to_string())),
            Some((expected, _)) if expected != password => {
                return Err(AuthError::InvalidCredentials);
            }
            Some((_, identity)) => identity.clone(),
        };
        self.feed.publish(Some(identity.clone()));
        Ok(identity)
    }

    async fn end_session(&self) -> Result<(), AuthError> {
        self.feed.publish(None);
        Ok(())
    }

    fn subscribe(&self) -> IdentityEvents {
        self.feed.subscribe()
    }
}

/// Object store over a sorted map, with switches to inject failures
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
    list_calls: AtomicUsize,
    fail_delete: AtomicBool,
    fail_resolve: Mutex<Option<String>>,
    fail_write: Mutex<Option<String>>,
}

impl MemoryObjectStore {
    pub fn with_objects<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let store = Self::default();
        store
            .objects
            .lock()
            .extend(paths.into_iter().map(|p| (p.into(), b"data".to_vec())));
        store
    }

    pub fn insert(&self, path: &str) {
        self.objects.lock().insert(path.to_string(), b"data".to_vec());
    }

    pub fn contains(&self, path: &str) -> bool {
        self.objects.lock().contains_key(path)
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn fail_delete(&self, fail: bool) {
        self.fail_delete.store(fail, Ordering::SeqCst);
    }

    pub fn fail_resolve(&self, name: Option<&str>) {
        *self.fail_resolve.lock() = name.map(str::to_string);
    }

    pub fn fail_write(&self, name: Option<&str>) {
        *self.fail_write.lock() = name.map(str::to_string);
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn list(&self, prefix: &str) -> Result<Vec<ObjectHandle>, StorageError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let dir = format!("{prefix}/");
        Ok(self
            .objects
            .lock()
            .keys()
            .filter_map(|path| {
                let name = path.strip_prefix(&dir)?;
                (!name.contains('/')).then(|| ObjectHandle {
                    path: path.clone(),
                    name: name.to_string(),
                })
            })
            .collect())
    }

    async fn resolve_address(&self, handle: &ObjectHandle) -> Result<String, StorageError> {
        if self.fail_resolve.lock().as_deref() == Some(handle.name.as_str()) {
            return Err(StorageError::Unavailable("address lookup failed".to_string()));
        }
        if !self.contains(&handle.path) {
            return Err(StorageError::NotFound(handle.path.clone()));
        }
        Ok(format!("memory://{}", handle.path))
    }

    async fn delete(&self, path: &str) -> Result<(), StorageError> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("delete failed".to_string()));
        }
        self.objects
            .lock()
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(path.to_string()))
    }

    async fn write(&self, path: &str, bytes: Vec<u8>) -> Result<(), StorageError> {
        let failing = self.fail_write.lock().clone();
        if failing.is_some_and(|name| path.rsplit('/').next() == Some(name.as_str())) {
            return Err(StorageError::Unavailable("write failed".to_string()));
        }
        self.objects.lock().insert(path.to_string(), bytes);
        Ok(())
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        self.objects
            .lock()
            .get(path)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(path.to_string()))
    }
}
