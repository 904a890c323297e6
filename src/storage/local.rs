use std::{
    fs, io,
    path::{Path, PathBuf},
    time::UNIX_EPOCH,
};

use async_trait::async_trait;
use rayon::iter::{IntoParallelIterator as _, ParallelIterator as _};
use tracing::{debug, field, trace_span, warn};

use super::ObjectStore;
use crate::error::StorageError;
use crate::models::{ObjectHandle, hash_string};

/// Object store rooted at a directory, one file per object
#[derive(Clone, Debug)]
pub struct LocalObjectStore {
    root: PathBuf,
    seed: u64,
}

impl LocalObjectStore {
    /// `seed` salts the version component of resolved addresses
    pub fn new(root: impl Into<PathBuf>, seed: u64) -> Self {
        Self {
            root: root.into(),
            seed,
        }
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, StorageError> {
        let mut resolved = self.root.clone();
        for segment in path.trim_end_matches('/').split('/') {
            if segment.is_empty() || segment == "." || segment == ".." || segment.contains('\\') {
                return Err(StorageError::InvalidName(path.to_string()));
            }
            resolved.push(segment);
        }
        Ok(resolved)
    }
}

fn map_io(err: io::Error, path: &str) -> StorageError {
    if err.kind() == io::ErrorKind::NotFound {
        StorageError::NotFound(path.to_string())
    } else {
        StorageError::IO(err)
    }
}

/// List files directly inside `dir`, sorted by name
fn scan_prefix(prefix: &str, dir: &Path) -> Result<Vec<ObjectHandle>, StorageError> {
    let s = trace_span!("scan prefix", %prefix, objects = field::Empty).entered();
    let entries: Vec<_> = match fs::read_dir(dir) {
        Ok(entries) => entries.collect(),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Vec::new(),
        Err(err) => return Err(err.into()),
    };
    let handles: Result<Vec<Option<ObjectHandle>>, io::Error> = entries
        .into_par_iter()
        .map(|entry| -> io::Result<Option<ObjectHandle>> {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                return Ok(None);
            }
            let Ok(name) = entry.file_name().into_string() else {
                warn!(path = ?entry.path(), "skip non UTF-8 file name");
                return Ok(None);
            };
            Ok(Some(ObjectHandle {
                path: format!("{prefix}/{name}"),
                name,
            }))
        })
        .collect();
    let mut handles: Vec<ObjectHandle> = handles?.into_iter().flatten().collect();
    handles.sort_by(|a, b| a.name.cmp(&b.name));
    s.record("objects", handles.len());
    Ok(handles)
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn list(&self, prefix: &str) -> Result<Vec<ObjectHandle>, StorageError> {
        let dir = self.resolve(prefix)?;
        let prefix = prefix.trim_end_matches('/').to_string();
        // directory walk is blocking, keep it off the async workers
        tokio::task::spawn_blocking(move || scan_prefix(&prefix, &dir)).await?
    }

    async fn resolve_address(&self, handle: &ObjectHandle) -> Result<String, StorageError> {
        let file = self.resolve(&handle.path)?;
        let metadata = tokio::fs::metadata(&file)
            .await
            .map_err(|err| map_io(err, &handle.path))?;
        if !metadata.is_file() {
            return Err(StorageError::NotFound(handle.path.clone()));
        }
        let modified = metadata
            .modified()?
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        let version = hash_string(self.seed, format!("{}:{modified}", metadata.len()));
        Ok(format!("/data/{}?v={version}", handle.path))
    }

    async fn delete(&self, path: &str) -> Result<(), StorageError> {
        let file = self.resolve(path)?;
        tokio::fs::remove_file(&file)
            .await
            .map_err(|err| map_io(err, path))?;
        debug!(%path, "object deleted");
        Ok(())
    }

    async fn write(&self, path: &str, bytes: Vec<u8>) -> Result<(), StorageError> {
        let file = self.resolve(path)?;
        if let Some(parent) = file.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let size = bytes.len();
        tokio::fs::write(&file, bytes).await?;
        debug!(%path, size, "object written");
        Ok(())
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        let file = self.resolve(path)?;
        tokio::fs::read(&file).await.map_err(|err| map_io(err, path))
    }
}
