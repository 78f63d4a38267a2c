use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

use super::step::GenreMode;
use crate::catalog::{CatalogApi, Track};

pub const ARTIST_BATCH_SIZE: usize = 50;

/// Lower-cased genres per artist id. Failed batches contribute nothing.
pub fn fetch_artist_genres(
    catalog: &dyn CatalogApi,
    artist_ids: &[String],
) -> HashMap<String, Vec<String>> {
    let mut genres = HashMap::new();
    for batch in artist_ids.chunks(ARTIST_BATCH_SIZE) {
        match catalog.artists(batch) {
            Ok(artists) => {
                for artist in artists {
                    let lowered = artist.genres.iter().map(|g| g.to_lowercase()).collect();
                    genres.insert(artist.id, lowered);
                }
            }
            Err(e) => debug!("Genre lookup failed for {} artists: {}", batch.len(), e),
        }
    }
    genres
}

pub fn filter_genre(
    catalog: &dyn CatalogApi,
    tracks: &[Track],
    targets: &[String],
    mode: GenreMode,
) -> Vec<Track> {
    info!("Genre filter ({:?}) on {} tracks...", mode, tracks.len());
    let targets: Vec<String> = targets.iter().map(|g| g.to_lowercase()).collect();

    let mut seen = HashSet::new();
    let artist_ids: Vec<String> = tracks
        .iter()
        .flat_map(Track::artist_ids)
        .filter(|id| seen.insert(*id))
        .map(str::to_string)
        .collect();
    let genres = fetch_artist_genres(catalog, &artist_ids);

    let matches = |track: &Track| {
        track
            .artist_ids()
            .filter_map(|id| genres.get(id))
            .flatten()
            .any(|genre| targets.iter().any(|target| genre.contains(target.as_str())))
    };

    tracks
        .iter()
        .filter(|t| match mode {
            GenreMode::Include => matches(t),
            GenreMode::Exclude => !matches(t),
        })
        .cloned()
        .collect()
}
