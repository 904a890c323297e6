use std::{io::Cursor, sync::Arc};

use tracing::info;

use crate::error::StorageError;
use crate::models::Dimension;
use crate::storage::{Namespace, ObjectStore};

/// A payload whose name and image header have been checked, not yet written
#[derive(Debug)]
pub struct PendingUpload {
    path: String,
    dimension: Dimension,
    bytes: Vec<u8>,
}

impl PendingUpload {
    pub fn new(namespace: &Namespace, name: &str, bytes: Vec<u8>) -> Result<Self, StorageError> {
        let path = namespace.object_path(name)?;
        let dimension = sniff_image(name, &bytes)?;
        Ok(Self {
            path,
            dimension,
            bytes,
        })
    }
}

/// Writes image payloads into a namespace
#[derive(Clone)]
pub struct Uploader {
    store: Arc<dyn ObjectStore>,
}

impl Uploader {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    pub async fn upload(&self, pending: PendingUpload) -> Result<Dimension, StorageError> {
        let PendingUpload {
            path,
            dimension,
            bytes,
        } = pending;
        let size = bytes.len();
        self.store.write(&path, bytes).await?;
        info!(%path, size, width = dimension.width, height = dimension.height, "photo uploaded");
        Ok(dimension)
    }
}

/// Read the image header, rejecting anything that is not a picture
pub fn sniff_image(name: &str, bytes: &[u8]) -> Result<Dimension, StorageError> {
    let info = imsz::imsz_from_reader(&mut Cursor::new(bytes)).map_err(|err| {
        StorageError::NotImage {
            name: name.to_string(),
            reason: err.to_string(),
        }
    })?;
    Ok(Dimension::from(&info))
}
