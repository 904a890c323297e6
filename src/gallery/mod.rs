//! Per-user photo gallery over an object store.

mod upload;

use std::sync::Arc;

use chrono::Utc;
use futures::future::try_join_all;
use parking_lot::RwLock;
use tokio::{sync::watch, task::JoinHandle};
use tracing::{Instrument as _, debug, error, info, info_span, warn};

use crate::error::StorageError;
use crate::models::{Listing, SessionStatus, StoredObjectRef, UserId};
use crate::session::SessionManager;
use crate::storage::{Namespace, ObjectStore};

pub use upload::{PendingUpload, Uploader};

/// Lists, uploads and deletes the current identity's photos.
///
/// Every operation is a no-op while nobody is signed in. The listing is
/// rebuilt from the store after each mutation; overlapping loads are not
/// serialized, whichever finishes last owns the cache.
#[derive(Clone)]
pub struct Gallery {
    listing: Arc<RwLock<Listing>>,
    session: SessionManager,
    store: Arc<dyn ObjectStore>,
    uploader: Uploader,
}

impl Gallery {
    pub fn new(store: Arc<dyn ObjectStore>, session: SessionManager) -> Self {
        Self {
            listing: Arc::new(RwLock::new(Listing::default())),
            session,
            uploader: Uploader::new(store.clone()),
            store,
        }
    }

    pub fn listing(&self) -> Listing {
        self.listing.read().clone()
    }

    pub fn objects(&self) -> Vec<StoredObjectRef> {
        self.listing.read().objects.clone()
    }

    fn namespace(&self) -> Option<Namespace> {
        self.session
            .current_identity()
            .map(|identity| Namespace::for_identity(&identity))
    }

    pub async fn load_objects(&self) -> Result<(), StorageError> {
        let Some(identity) = self.session.current_identity() else {
            debug!("no identity, skip loading objects");
            return Ok(());
        };
        let namespace = Namespace::for_identity(&identity);
        let handles = self.store.list(namespace.prefix()).await?;
        let store = &self.store;
        let objects = try_join_all(
            handles
                .into_iter()
                .filter(|handle| {
                    let inside = namespace.contains(&handle.path);
                    if !inside {
                        warn!(path = %handle.path, "skip object outside namespace");
                    }
                    inside
                })
                .map(|handle| async move {
                    let url = store.resolve_address(&handle).await?;
                    Ok::<_, StorageError>(StoredObjectRef {
                        name: handle.name,
                        url,
                    })
                }),
        )
        .await?;
        info!(prefix = namespace.prefix(), objects = objects.len(), "objects loaded");
        *self.listing.write() = Listing {
            objects,
            loaded_at: Some(Utc::now()),
            owner: Some(identity.uid),
        };
        Ok(())
    }

    pub async fn delete_object(&self, name: &str) -> Result<(), StorageError> {
        let Some(namespace) = self.namespace() else {
            debug!(%name, "no identity, skip delete");
            return Ok(());
        };
        let path = namespace.object_path(name)?;
        self.store.delete(&path).await?;
        info!(%path, "photo deleted");
        self.load_objects().await
    }

    pub async fn upload_object(&self, name: &str, bytes: Vec<u8>) -> Result<(), StorageError> {
        self.upload_objects(vec![(name.to_string(), bytes)]).await
    }

    /// Upload several files, then re-list once.
    ///
    /// Every file is checked before the first write, so a bad file rejects
    /// the whole batch. When a write fails part way, the listing is still
    /// refreshed to show what landed.
    pub async fn upload_objects(&self, files: Vec<(String, Vec<u8>)>) -> Result<(), StorageError> {
        let Some(namespace) = self.namespace() else {
            debug!(files = files.len(), "no identity, skip upload");
            return Ok(());
        };
        let batch = files
            .into_iter()
            .map(|(name, bytes)| PendingUpload::new(&namespace, &name, bytes))
            .collect::<Result<Vec<_>, _>>()?;
        for pending in batch {
            if let Err(err) = self.uploader.upload(pending).await {
                if let Err(reload) = self.load_objects().await {
                    warn!(%reload, "failed to reload objects after a failed upload");
                }
                return Err(err);
            }
        }
        self.load_objects().await
    }

    pub fn clear(&self) {
        *self.listing.write() = Listing::default();
    }

    /// Keep the listing in step with the session: load when someone signs
    /// in, drop the cache when they sign out.
    pub fn follow(&self, mut status: watch::Receiver<SessionStatus>) -> GalleryFollower {
        let gallery = self.clone();
        let task = tokio::spawn(
            async move {
                let mut loaded_for: Option<UserId> = None;
                loop {
                    let current = status.borrow_and_update().clone();
                    match current {
                        SessionStatus::Authenticated(identity)
                            if loaded_for.as_ref() != Some(&identity.uid) =>
                        {
                            loaded_for = Some(identity.uid);
                            if let Err(err) = gallery.load_objects().await {
                                error!(%err, "failed to load objects");
                            }
                        }
                        SessionStatus::Unauthenticated => {
                            loaded_for = None;
                            gallery.clear();
                        }
                        SessionStatus::Authenticated(_) | SessionStatus::Unresolved => {}
                    }
                    if status.changed().await.is_err() {
                        break;
                    }
                }
            }
            .instrument(info_span!("gallery follower")),
        );
        GalleryFollower { task }
    }
}

/// Background task started by [`Gallery::follow`], stopped on drop
pub struct GalleryFollower {
    task: JoinHandle<()>,
}

impl Drop for GalleryFollower {
    fn drop(&mut self) {
        self.task.abort();
    }
}
