//! Persisted library index.
//!
//! A JSON snapshot of the last scan, so an embedding application can show
//! its library without rescanning the filesystem on every launch. The index
//! also acts as the store's metadata resolver: lookups hit the cached
//! entries first and fall back to probing the disk.

use super::{LibraryError, MetadataResolver, TrackEntry, resolver, scan};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct LibraryIndex {
    entries: BTreeMap<PathBuf, TrackEntry>,
}

impl LibraryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: impl IntoIterator<Item = TrackEntry>) -> Self {
        Self {
            entries: entries.into_iter().map(|e| (e.path.clone(), e)).collect(),
        }
    }

    pub fn insert(&mut self, entry: TrackEntry) {
        self.entries.insert(entry.path.clone(), entry);
    }

    pub fn get(&self, path: &Path) -> Option<&TrackEntry> {
        self.entries.get(path)
    }

    /// Entries in path order.
    pub fn tracks(&self) -> impl Iterator<Item = &TrackEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Load an index from disk. A missing or unreadable file yields an
    /// empty index rather than an error: the caller rescans and moves on.
    pub async fn load(path: &Path) -> Self {
        match load_inner(path).await {
            Ok(index) => {
                if !index.is_empty() {
                    tracing::info!(
                        path = %path.display(),
                        tracks = index.len(),
                        "loaded library index"
                    );
                }
                index
            }
            Err(LibraryError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => Self::new(),
            Err(error) => {
                tracing::warn!(
                    path = %path.display(),
                    %error,
                    "failed to load library index, starting empty"
                );
                Self::new()
            }
        }
    }

    /// Save the index as pretty JSON, creating parent directories as needed.
    pub async fn save(&self, path: &Path) -> Result<(), LibraryError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(self)?;
        let mut file = fs::File::create(path).await?;
        file.write_all(json.as_bytes()).await?;
        file.flush().await?;
        tracing::debug!(path = %path.display(), tracks = self.len(), "library index saved");
        Ok(())
    }
}

async fn load_inner(path: &Path) -> Result<LibraryIndex, LibraryError> {
    let contents = fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&contents)?)
}

impl MetadataResolver for LibraryIndex {
    fn display_name(&self, path: &Path) -> String {
        self.get(path)
            .map(|entry| entry.title.clone())
            .unwrap_or_else(|| scan::display_title(path))
    }

    fn art_locator(&self, path: &Path) -> Option<String> {
        self.get(path)
            .and_then(|entry| entry.art_url.clone())
            .or_else(|| resolver::probe_art(path))
    }
}
