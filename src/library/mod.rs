//! Library layer: folder scanning, a persisted index of scanned tracks, and
//! metadata lookup for the fields the engine cannot supply (artwork,
//! display names).

pub mod index;
pub mod resolver;
pub mod scan;

pub use index::LibraryIndex;
pub use resolver::FolderArtResolver;
pub use scan::scan_folders;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Errors from the library layer.
#[derive(thiserror::Error, Debug)]
pub enum LibraryError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed library index: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Metadata lookup by file path, used by the state store to fill snapshot
/// fields the engine itself cannot supply.
pub trait MetadataResolver: Send + Sync {
    fn display_name(&self, path: &Path) -> String;
    fn art_locator(&self, path: &Path) -> Option<String>;
}

/// One scanned audio file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackEntry {
    pub path: PathBuf,
    pub title: String,
    pub folder: PathBuf,
    pub art_url: Option<String>,
}
