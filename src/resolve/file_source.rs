//! Track lists stored on disk: JSON databases and legacy line-based lists.

use std::collections::HashSet;
use std::path::Path;
use tracing::{info, warn};

use super::engine::TrackResolver;
use super::hydrator::HydrateMode;
use crate::catalog::{Track, TRACK_URI_PREFIX};
use crate::local_db::LocalDatabase;

/// Track uris of a legacy list: lines starting with the track-uri prefix,
/// trimmed, duplicates removed in first-seen order.
pub fn parse_legacy_list(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    text.lines()
        .map(str::trim)
        .filter(|line| line.starts_with(TRACK_URI_PREFIX))
        .filter(|line| seen.insert(*line))
        .map(str::to_string)
        .collect()
}

fn is_database(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}

impl TrackResolver {
    /// Load tracks from a database file (verbatim) or a legacy list file.
    /// Unreadable files yield an empty list.
    pub fn resolve_file(&self, path: &Path, mode: HydrateMode) -> Vec<Track> {
        if is_database(path) {
            return match LocalDatabase::read(path) {
                Ok(Some(db)) => {
                    info!("Database {:?}: {} items loaded", path, db.tracks.len());
                    db.to_tracks()
                }
                Ok(None) => {
                    info!("Database {:?} does not exist yet", path);
                    Vec::new()
                }
                Err(e) => {
                    warn!("{}", e);
                    Vec::new()
                }
            };
        }

        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                warn!("Error reading file {:?}: {}", path, e);
                return Vec::new();
            }
        };

        let uris = parse_legacy_list(&text);
        info!("File {:?}: {} uris found", path, uris.len());

        if mode.should_hydrate(false) {
            self.hydrator().hydrate(&uris)
        } else {
            uris.into_iter()
                .map(|uri| Track {
                    id: uri[TRACK_URI_PREFIX.len()..].to_string(),
                    uri: Some(uri),
                    ..Default::default()
                })
                .collect()
        }
    }
}
