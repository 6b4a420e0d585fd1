//! Directory enumeration and the view model handed to the renderer.

use std::{fs::Metadata, io, path::Path};

use chrono::{DateTime, Local};
use serde::Serialize;
use tokio::fs;
use tracing::{debug, error, warn};

use crate::{config::ServerConfig, paths::RelativePath, size::human_size};

/// One row in a directory listing.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub name: String,
    pub is_dir: bool,
    /// Human-readable size; empty for directories.
    pub display_size: String,
    pub relative_path: RelativePath,
    /// Formatted modification time
    pub modified: Option<String>,
}

/// Everything the index page renders.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct DirectoryView {
    pub current_path: RelativePath,
    pub breadcrumbs: Vec<String>,
    pub entries: Vec<DirectoryEntry>,
}

/// Whether an entry may be listed or downloaded: its "other" read bit is set.
///
/// Callers pass metadata that was not resolved through symlinks.
#[cfg(unix)]
pub fn is_publicly_visible(metadata: &Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o004 != 0
}

#[cfg(not(unix))]
pub fn is_publicly_visible(_metadata: &Metadata) -> bool {
    true
}

/// Async lstat plus [`is_publicly_visible`]; missing paths are not readable.
pub async fn is_readable(path: &Path) -> bool {
    match fs::symlink_metadata(path).await {
        Ok(metadata) => is_publicly_visible(&metadata),
        Err(e) => {
            debug!("Unable to lstat {}: {}", path.display(), e);
            false
        }
    }
}

/// Whether every component of `relative` below the root is world-readable.
///
/// A hidden directory hides everything beneath it, so each ancestor is
/// checked, not just the last segment. The root itself is always visible.
pub async fn is_path_visible(config: &ServerConfig, relative: &RelativePath) -> bool {
    let mut path = config.root().to_path_buf();
    for segment in relative.segments() {
        path.push(segment);
        if !is_readable(&path).await {
            return false;
        }
    }
    true
}

/// Lists `relative` under the served root.
///
/// Read failures are logged and produce a view with no entries so the page
/// still renders. So do directories hidden by [`is_path_visible`].
pub async fn list(config: &ServerConfig, relative: &RelativePath) -> DirectoryView {
    let entries = if !is_path_visible(config, relative).await {
        warn!("Refusing to list hidden directory /{}", relative);
        Vec::new()
    } else {
        match read_entries(config, relative).await {
            Ok(entries) => entries,
            Err(e) => {
                error!(
                    "Unable to read contents of directory {}: {}",
                    config.absolute(relative).display(),
                    e
                );
                Vec::new()
            }
        }
    };

    DirectoryView {
        current_path: relative.clone(),
        breadcrumbs: relative.breadcrumbs(config.root_label()),
        entries,
    }
}

/// Reads the visible children of `relative`, sorted directories first.
pub async fn read_entries(
    config: &ServerConfig,
    relative: &RelativePath,
) -> io::Result<Vec<DirectoryEntry>> {
    let full_path = config.absolute(relative);
    let mut reader = fs::read_dir(&full_path).await?;
    let mut items = Vec::new();

    while let Some(entry) = reader.next_entry().await? {
        let entry_path = entry.path();
        let name = match entry.file_name().into_string() {
            Ok(n) => n,
            Err(_) => {
                warn!(
                    "Skipping entry with non-UTF8 filename in {}",
                    full_path.display()
                );
                continue;
            }
        };

        // DirEntry::metadata does not follow symlinks.
        let own_metadata = match entry.metadata().await {
            Ok(m) => m,
            Err(e) => {
                error!("Failed to get metadata for {}: {}", entry_path.display(), e);
                continue;
            }
        };
        if !is_publicly_visible(&own_metadata) {
            continue;
        }

        let metadata = if own_metadata.file_type().is_symlink() {
            fs::metadata(&entry_path).await.unwrap_or(own_metadata)
        } else {
            own_metadata
        };

        let Some(relative_path) = config.relative_to_root(&entry_path) else {
            warn!("Skipping unaddressable entry {}", entry_path.display());
            continue;
        };

        let is_dir = metadata.is_dir();
        items.push(DirectoryEntry {
            display_size: if is_dir {
                String::new()
            } else {
                human_size(metadata.len())
            },
            modified: format_modified(&metadata),
            name,
            is_dir,
            relative_path,
        });
    }

    sort_entries(&mut items);
    Ok(items)
}

/// Directories first, then files; byte-wise name order inside each group.
pub fn sort_entries(entries: &mut [DirectoryEntry]) {
    entries.sort_by(|a, b| b.is_dir.cmp(&a.is_dir).then_with(|| a.name.cmp(&b.name)));
}

fn format_modified(metadata: &Metadata) -> Option<String> {
    metadata.modified().ok().map(|mod_time| {
        let datetime: DateTime<Local> = mod_time.into();
        datetime.format("%Y-%m-%d %H:%M").to_string()
    })
}
