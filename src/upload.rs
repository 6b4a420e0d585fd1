//! Streaming multipart uploads into the served tree.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use axum::extract::Multipart;
use dashmap::DashMap;
use tokio::{
    fs::File,
    io::{AsyncWriteExt, BufWriter},
    sync::{Mutex, OwnedMutexGuard},
};
use tracing::{debug, info};

use crate::{
    config::ServerConfig, error::RequestError, paths::RelativePath, size::human_size,
};

/// Form field carrying the submitted files.
pub const UPLOAD_FIELD: &str = "file";

/// Serializes writers of the same destination file.
///
/// Uploads to different paths never wait on each other. Entries are dropped
/// as soon as the last writer for a path finishes.
#[derive(Default)]
pub struct UploadLocks {
    locks: DashMap<PathBuf, Arc<Mutex<()>>>,
}

pub struct PathGuard<'a> {
    table: &'a UploadLocks,
    path: PathBuf,
    guard: Option<OwnedMutexGuard<()>>,
}

impl UploadLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, path: &Path) -> PathGuard<'_> {
        // Clone out of the map before awaiting so no shard lock is held.
        let lock = self
            .locks
            .entry(path.to_path_buf())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let guard = lock.lock_owned().await;
        PathGuard {
            table: self,
            path: path.to_path_buf(),
            guard: Some(guard),
        }
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

impl Drop for PathGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();
        // Only the map itself still holds the lock: nobody is waiting.
        self.table
            .locks
            .remove_if(&self.path, |_, lock| Arc::strong_count(lock) == 1);
    }
}

/// Writes every `file` part of `multipart` into `destination`, in order.
///
/// Returns each stored filename with its byte count. The first failure aborts
/// the request; a part that fails mid-copy stays on disk as written so far.
pub async fn receive(
    config: &ServerConfig,
    locks: &UploadLocks,
    destination: &RelativePath,
    mut multipart: Multipart,
) -> Result<Vec<(String, u64)>, RequestError> {
    let mut stored = Vec::new();

    while let Some(mut field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            debug!("Ignoring form field {:?}", field.name());
            continue;
        }
        let name = match field.file_name() {
            Some(name) if !name.is_empty() => name.to_string(),
            // An empty file input still submits a part with no filename.
            _ => continue,
        };

        let relative = destination.child(&name)?;
        let file_path = config.absolute(&relative);
        let _guard = locks.acquire(&file_path).await;

        let file = File::create(&file_path)
            .await
            .map_err(|source| RequestError::Create {
                path: file_path.clone(),
                source,
            })?;
        let mut writer = BufWriter::with_capacity(config.upload_buffer(), file);

        let mut written: u64 = 0;
        while let Some(chunk) = field.chunk().await? {
            writer
                .write_all(&chunk)
                .await
                .map_err(|source| RequestError::Save {
                    path: file_path.clone(),
                    source,
                })?;
            written += chunk.len() as u64;
        }
        writer.flush().await.map_err(|source| RequestError::Save {
            path: file_path.clone(),
            source,
        })?;

        info!(
            "File uploaded to: {} ({})",
            file_path.display(),
            human_size(written)
        );
        stored.push((name, written));
    }

    Ok(stored)
}
