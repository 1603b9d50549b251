//! Artwork and display-name resolution by probing the filesystem around a
//! track.

use super::{MetadataResolver, scan};
use once_cell::sync::Lazy;
use std::path::Path;

/// Cover image names checked beside a track, in preference order.
static ART_CANDIDATES: Lazy<Vec<&'static str>> =
    Lazy::new(|| vec!["cover.jpg", "folder.jpg", "album.jpg", "thumb.jpg"]);

pub(crate) fn probe_art(track_path: &Path) -> Option<String> {
    let folder = track_path.parent()?;
    ART_CANDIDATES
        .iter()
        .map(|name| folder.join(name))
        .find(|candidate| candidate.is_file())
        .map(|candidate| candidate.to_string_lossy().into_owned())
}

/// Resolver backed by nothing but the filesystem layout around the track.
#[derive(Debug, Default, Clone)]
pub struct FolderArtResolver;

impl MetadataResolver for FolderArtResolver {
    fn display_name(&self, path: &Path) -> String {
        scan::display_title(path)
    }

    fn art_locator(&self, path: &Path) -> Option<String> {
        probe_art(path)
    }
}
