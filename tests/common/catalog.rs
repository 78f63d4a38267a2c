//! In-memory catalog used by the end-to-end tests.

use std::collections::HashMap;
use std::sync::Mutex;

use pezzottify_mixer::catalog::{
    Artist, ArtistRef, AudioFeatures, CatalogApi, CatalogError, Page, PlaylistSummary, TimeRange,
    Track,
};
use pezzottify_mixer::features::{FeatureProvider, FeatureRecord};
use pezzottify_mixer::resolve::PlaylistScraper;

fn not_found() -> CatalogError {
    CatalogError::Status {
        status: 404,
        body: "Not found".to_string(),
    }
}

/// Playlist contents per id and a log of every write.
#[derive(Default)]
pub struct InMemoryCatalog {
    pub readable: HashMap<String, Vec<Track>>,
    pub saved: Vec<Track>,
    pub artists: HashMap<String, Artist>,
    pub writes: Mutex<HashMap<String, Vec<String>>>,
    pub cleared: Mutex<Vec<String>>,
}

impl InMemoryCatalog {
    pub fn playlist(&self, id: &str) -> Vec<String> {
        self.writes
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn cleared(&self) -> Vec<String> {
        self.cleared.lock().unwrap().clone()
    }

    fn all_tracks(&self) -> impl Iterator<Item = &Track> {
        self.readable.values().flatten()
    }
}

impl CatalogApi for InMemoryCatalog {
    fn playlist_items_page(
        &self,
        playlist_id: &str,
        _market: &str,
        _cursor: Option<&str>,
    ) -> Result<Page<Track>, CatalogError> {
        self.readable
            .get(playlist_id)
            .map(|tracks| Page::last(tracks.clone()))
            .ok_or_else(not_found)
    }

    fn saved_tracks_page(&self, _cursor: Option<&str>) -> Result<Page<Track>, CatalogError> {
        Ok(Page::last(self.saved.clone()))
    }

    fn top_tracks_page(
        &self,
        _range: TimeRange,
        _cursor: Option<&str>,
    ) -> Result<Page<Track>, CatalogError> {
        Ok(Page::last(Vec::new()))
    }

    fn tracks(&self, ids: &[String]) -> Result<Vec<Track>, CatalogError> {
        Ok(ids
            .iter()
            .filter_map(|id| self.all_tracks().find(|t| &t.id == id).cloned())
            .collect())
    }

    fn search_tracks(&self, _query: &str, _limit: u32) -> Result<Vec<Track>, CatalogError> {
        Ok(Vec::new())
    }

    fn search_playlists(
        &self,
        _query: &str,
        _limit: u32,
    ) -> Result<Vec<PlaylistSummary>, CatalogError> {
        Ok(Vec::new())
    }

    fn artists(&self, ids: &[String]) -> Result<Vec<Artist>, CatalogError> {
        Ok(ids
            .iter()
            .filter_map(|id| self.artists.get(id).cloned())
            .collect())
    }

    fn audio_features(&self, _ids: &[String]) -> Result<Vec<Option<AudioFeatures>>, CatalogError> {
        Err(CatalogError::Status {
            status: 403,
            body: "Forbidden".to_string(),
        })
    }

    fn create_playlist(
        &self,
        name: &str,
        _description: &str,
    ) -> Result<PlaylistSummary, CatalogError> {
        Ok(PlaylistSummary {
            id: format!("new-{}", name),
            name: Some(name.to_string()),
        })
    }

    fn replace_playlist_items(
        &self,
        playlist_id: &str,
        uris: &[String],
    ) -> Result<(), CatalogError> {
        if uris.is_empty() {
            self.cleared.lock().unwrap().push(playlist_id.to_string());
        }
        self.writes
            .lock()
            .unwrap()
            .insert(playlist_id.to_string(), uris.to_vec());
        Ok(())
    }

    fn add_playlist_items(&self, playlist_id: &str, uris: &[String]) -> Result<(), CatalogError> {
        self.writes
            .lock()
            .unwrap()
            .entry(playlist_id.to_string())
            .or_default()
            .extend(uris.iter().cloned());
        Ok(())
    }
}

/// Scraper for which every embed page is empty.
pub struct NoScraper;

impl PlaylistScraper for NoScraper {
    fn scrape_track_ids(&self, _playlist_id: &str) -> Vec<String> {
        Vec::new()
    }
}

/// Primary feature provider with canned records.
#[derive(Default)]
pub struct CannedFeatures {
    pub records: Vec<FeatureRecord>,
}

impl FeatureProvider for CannedFeatures {
    fn fetch_features(&self, _track_ids: &[String]) -> Vec<FeatureRecord> {
        self.records.clone()
    }
}

pub fn make_track(id: &str, artist_id: &str, popularity: u32) -> Track {
    let mut track = Track::stub(id);
    track.name = Some(format!("Track {}", id));
    track.artists = vec![ArtistRef::new(
        artist_id,
        Some(format!("Artist {}", artist_id)),
    )];
    track.popularity = Some(popularity);
    track
        .external_ids
        .insert("isrc".to_string(), format!("ISRC-{}", id));
    track
}
