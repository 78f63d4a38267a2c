use chrono::Local;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::catalog::{CatalogApi, CatalogError, Track};
use crate::config::pause;

/// Most uris the catalog accepts in one append call.
pub const WRITE_BATCH_SIZE: usize = 100;
const DEFAULT_DESCRIPTION: &str = "Created by mixer";

/// Where a `save` step writes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SaveTarget {
    pub id: Option<String>,
    pub create_new: bool,
    pub name: Option<String>,
    pub description: Option<String>,
}

pub fn default_playlist_name() -> String {
    format!("Mixer {}", Local::now().format("%Y-%m-%d %H:%M"))
}

/// Writes track lists to playlists: clear, settle, then append in batches.
pub struct PlaylistWriter {
    catalog: Arc<dyn CatalogApi>,
    settle: Duration,
}

impl PlaylistWriter {
    pub fn new(catalog: Arc<dyn CatalogApi>, settle: Duration) -> Self {
        Self { catalog, settle }
    }

    /// Replace the target's contents with `tracks`. Returns the playlist id
    /// written to, or `None` when there was nothing to write.
    pub fn write(
        &self,
        tracks: &[Track],
        target: &SaveTarget,
    ) -> Result<Option<String>, CatalogError> {
        if tracks.is_empty() {
            info!("Empty list, nothing saved");
            return Ok(None);
        }

        let playlist_id = match (&target.id, target.create_new) {
            (Some(id), false) => id.clone(),
            _ => {
                let name = target.name.clone().unwrap_or_else(default_playlist_name);
                let description = target.description.as_deref().unwrap_or(DEFAULT_DESCRIPTION);
                let created = self.catalog.create_playlist(&name, description)?;
                info!("Created playlist '{}' ({})", name, created.id);
                created.id
            }
        };

        info!("Saving {} tracks to playlist {}...", tracks.len(), playlist_id);
        let uris: Vec<String> = tracks.iter().map(Track::playable_uri).collect();

        self.catalog.replace_playlist_items(&playlist_id, &[])?;
        pause(self.settle);
        for batch in uris.chunks(WRITE_BATCH_SIZE) {
            self.catalog.add_playlist_items(&playlist_id, batch)?;
        }

        info!("Saved {} tracks", uris.len());
        Ok(Some(playlist_id))
    }
}
