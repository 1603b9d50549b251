//! Filesystem scanning for audio files.

use super::{LibraryError, TrackEntry, resolver};
use once_cell::sync::Lazy;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::warn;

static AUDIO_EXTENSIONS: Lazy<HashSet<&'static str>> =
    Lazy::new(|| ["mp3", "flac", "ogg", "wav", "m4a", "aac"].into_iter().collect());

pub fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| AUDIO_EXTENSIONS.contains(ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Display name for a track: its file stem.
pub fn display_title(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Walk `root` recursively and collect every audio file as a track entry,
/// sorted by path so queues are deterministic. The root itself must be
/// readable; unreadable subfolders are skipped with a warning.
pub fn scan_folders(root: &Path) -> Result<Vec<TrackEntry>, LibraryError> {
    let mut files = Vec::new();
    walk(root, &mut files)?;
    files.sort();
    Ok(files.iter().map(|path| entry_for(path)).collect())
}

fn walk(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), LibraryError> {
    for dirent in std::fs::read_dir(dir)? {
        let Ok(dirent) = dirent else { continue };
        let path = dirent.path();
        if path.is_dir() {
            if let Err(error) = walk(&path, out) {
                warn!(dir = %path.display(), %error, "skipping unreadable folder");
            }
        } else if is_audio_file(&path) {
            out.push(path);
        }
    }
    Ok(())
}

fn entry_for(path: &Path) -> TrackEntry {
    TrackEntry {
        path: path.to_path_buf(),
        title: display_title(path),
        folder: path.parent().map(Path::to_path_buf).unwrap_or_default(),
        art_url: resolver::probe_art(path),
    }
}
