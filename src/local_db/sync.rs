use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use tracing::{error, info, warn};

use super::store::{DbEntry, LocalDatabase};
use crate::catalog::{CatalogApi, SourceRef, Track};
use crate::resolve::{HydrateMode, TrackResolver};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    #[default]
    Append,
    Remove,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreType {
    #[default]
    Tracks,
    Artists,
}

/// Mirrors a playlist into a local database file.
pub struct LocalDbSync<'a> {
    resolver: &'a TrackResolver,
    catalog: &'a dyn CatalogApi,
}

impl<'a> LocalDbSync<'a> {
    pub fn new(resolver: &'a TrackResolver, catalog: &'a dyn CatalogApi) -> Self {
        Self { resolver, catalog }
    }

    /// Append or remove the source's tracks (or their artists) and return the
    /// database entries after the sync. An empty source leaves the file alone.
    pub fn sync(
        &self,
        source: &str,
        db_path: &Path,
        mode: SyncMode,
        store_type: StoreType,
        clear_source: bool,
    ) -> Vec<DbEntry> {
        info!(
            "Syncing {} to DB {:?} (mode: {:?}, type: {:?})",
            source, db_path, mode, store_type
        );

        let items = self.resolver.resolve(source, None, HydrateMode::True);
        if items.is_empty() {
            info!("No items found in source");
            return Vec::new();
        }

        let mut db = LocalDatabase::load(db_path);
        let changed = match mode {
            SyncMode::Append => {
                let added = append_entries(&mut db, &items, store_type);
                info!("{} items added", added);
                added
            }
            SyncMode::Remove => {
                let removed = remove_entries(&mut db, &items, store_type);
                info!("{} items removed", removed);
                removed
            }
        };

        if changed > 0 {
            if let Err(e) = db.save(db_path) {
                error!("Could not write database: {}", e);
            }
        } else {
            info!("No changes");
        }

        if clear_source {
            self.clear_source(source);
        }

        db.tracks
    }

    fn clear_source(&self, source: &str) {
        let source_ref = SourceRef::parse(source);
        let Some(playlist_id) = source_ref.playlist_id() else {
            warn!("Source {} is not a playlist, not clearing it", source);
            return;
        };
        match self.catalog.replace_playlist_items(playlist_id, &[]) {
            Ok(()) => info!("Source playlist {} cleared", playlist_id),
            Err(e) => warn!("Could not clear playlist {}: {}", playlist_id, e),
        }
    }
}

/// Ids contributed by `items` for the given store type.
pub fn contributed_ids(items: &[Track], store_type: StoreType) -> HashSet<&str> {
    match store_type {
        StoreType::Tracks => items.iter().map(|t| t.id.as_str()).collect(),
        StoreType::Artists => items.iter().flat_map(Track::artist_ids).collect(),
    }
}

fn append_entries(db: &mut LocalDatabase, items: &[Track], store_type: StoreType) -> usize {
    let mut existing: HashSet<String> = db.ids().into_iter().map(str::to_string).collect();
    let before = db.tracks.len();

    for track in items {
        match store_type {
            StoreType::Tracks => {
                if existing.insert(track.id.clone()) {
                    db.tracks.push(DbEntry::from_track(track));
                }
            }
            StoreType::Artists => {
                for artist in &track.artists {
                    if existing.insert(artist.id.clone()) {
                        db.tracks.push(DbEntry::from_artist(artist));
                    }
                }
            }
        }
    }

    db.tracks.len() - before
}

fn remove_entries(db: &mut LocalDatabase, items: &[Track], store_type: StoreType) -> usize {
    let doomed = contributed_ids(items, store_type);
    let before = db.tracks.len();
    db.tracks.retain(|entry| !doomed.contains(entry.id.as_str()));
    before - db.tracks.len()
}
