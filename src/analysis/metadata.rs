//! Display name lookup from audio file tags

use lofty::prelude::*;
use lofty::probe::Probe;
use std::path::Path;

/// "Artist - Title" when both tags are present, otherwise the file name
pub fn display_name(path: &Path) -> String {
    match read_artist_title(path) {
        Some((artist, title)) => format!("{} - {}", artist, title),
        None => file_name(path),
    }
}

fn read_artist_title(path: &Path) -> Option<(String, String)> {
    let tagged_file = match Probe::open(path).and_then(|p| p.read()) {
        Ok(f) => f,
        Err(e) => {
            log::debug!("No readable tags in {:?}: {}", path, e);
            return None;
        }
    };

    let tag = tagged_file
        .primary_tag()
        .or_else(|| tagged_file.first_tag())?;

    let artist = tag.artist()?.trim().to_string();
    let title = tag.title()?.trim().to_string();
    if artist.is_empty() || title.is_empty() {
        return None;
    }

    Some((artist, title))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}
