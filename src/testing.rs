//! In-memory catalog and helpers shared by unit tests.

use std::collections::{HashMap, HashSet};
use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::Mutex;
use std::thread;

use crate::catalog::{
    Artist, ArtistRef, AudioFeatures, CatalogApi, CatalogError, Page, PlaylistSummary, TimeRange,
    Track,
};
use crate::features::{FeatureProvider, FeatureRecord};
use crate::resolve::PlaylistScraper;

/// Recorded call against the fake.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    PlaylistPage(String, String, Option<String>),
    Tracks(Vec<String>),
    SearchTracks(String),
    SearchPlaylists(String),
    Artists(Vec<String>),
    AudioFeatures(Vec<String>),
    Create(String),
    Replace(String, Vec<String>),
    Add(String, Vec<String>),
}

#[derive(Default)]
pub(crate) struct FakeCatalog {
    pub playlists: HashMap<String, Vec<Track>>,
    pub failing_playlists: HashSet<String>,
    pub page_size: usize,
    pub saved: Vec<Track>,
    pub top: Vec<Track>,
    pub details: HashMap<String, Track>,
    pub failing_detail_ids: HashSet<String>,
    pub search_hits: HashMap<String, Track>,
    pub fail_search: bool,
    pub playlist_hits: HashMap<String, Vec<PlaylistSummary>>,
    pub artists: HashMap<String, Artist>,
    pub failing_artist_ids: HashSet<String>,
    pub features: HashMap<String, AudioFeatures>,
    pub features_error: Option<u16>,
    pub fail_writes: bool,
    pub calls: Mutex<Vec<Call>>,
}

impl FakeCatalog {
    pub fn new() -> Self {
        Self {
            page_size: 100,
            ..Default::default()
        }
    }

    pub fn with_playlist(mut self, id: &str, tracks: Vec<Track>) -> Self {
        self.playlists.insert(id.to_string(), tracks);
        self
    }

    pub fn with_details(mut self, tracks: Vec<Track>) -> Self {
        for track in tracks {
            self.details.insert(track.id.clone(), track);
        }
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn paged(&self, all: &[Track], cursor: Option<&str>) -> Page<Track> {
        let offset: usize = cursor.and_then(|c| c.parse().ok()).unwrap_or(0);
        let end = (offset + self.page_size).min(all.len());
        Page {
            items: all[offset.min(end)..end].to_vec(),
            next: (end < all.len()).then(|| end.to_string()),
        }
    }
}

fn status(code: u16) -> CatalogError {
    CatalogError::Status {
        status: code,
        body: String::new(),
    }
}

impl CatalogApi for FakeCatalog {
    fn playlist_items_page(
        &self,
        playlist_id: &str,
        market: &str,
        cursor: Option<&str>,
    ) -> Result<Page<Track>, CatalogError> {
        self.record(Call::PlaylistPage(
            playlist_id.to_string(),
            market.to_string(),
            cursor.map(str::to_string),
        ));
        if self.failing_playlists.contains(playlist_id) {
            return Err(status(404));
        }
        match self.playlists.get(playlist_id) {
            Some(tracks) => Ok(self.paged(tracks, cursor)),
            None => Err(status(404)),
        }
    }

    fn saved_tracks_page(&self, cursor: Option<&str>) -> Result<Page<Track>, CatalogError> {
        Ok(self.paged(&self.saved, cursor))
    }

    fn top_tracks_page(
        &self,
        _range: TimeRange,
        cursor: Option<&str>,
    ) -> Result<Page<Track>, CatalogError> {
        Ok(self.paged(&self.top, cursor))
    }

    fn tracks(&self, ids: &[String]) -> Result<Vec<Track>, CatalogError> {
        self.record(Call::Tracks(ids.to_vec()));
        if ids.iter().any(|id| self.failing_detail_ids.contains(id)) {
            return Err(status(500));
        }
        Ok(ids
            .iter()
            .filter_map(|id| self.details.get(id).cloned())
            .collect())
    }

    fn search_tracks(&self, query: &str, _limit: u32) -> Result<Vec<Track>, CatalogError> {
        self.record(Call::SearchTracks(query.to_string()));
        if self.fail_search {
            return Err(status(500));
        }
        Ok(self.search_hits.get(query).cloned().into_iter().collect())
    }

    fn search_playlists(
        &self,
        query: &str,
        _limit: u32,
    ) -> Result<Vec<PlaylistSummary>, CatalogError> {
        self.record(Call::SearchPlaylists(query.to_string()));
        Ok(self.playlist_hits.get(query).cloned().unwrap_or_default())
    }

    fn artists(&self, ids: &[String]) -> Result<Vec<Artist>, CatalogError> {
        self.record(Call::Artists(ids.to_vec()));
        if ids.iter().any(|id| self.failing_artist_ids.contains(id)) {
            return Err(status(502));
        }
        Ok(ids
            .iter()
            .filter_map(|id| self.artists.get(id).cloned())
            .collect())
    }

    fn audio_features(&self, ids: &[String]) -> Result<Vec<Option<AudioFeatures>>, CatalogError> {
        self.record(Call::AudioFeatures(ids.to_vec()));
        if let Some(code) = self.features_error {
            return Err(status(code));
        }
        Ok(ids.iter().map(|id| self.features.get(id).cloned()).collect())
    }

    fn create_playlist(
        &self,
        name: &str,
        _description: &str,
    ) -> Result<PlaylistSummary, CatalogError> {
        self.record(Call::Create(name.to_string()));
        if self.fail_writes {
            return Err(status(500));
        }
        Ok(PlaylistSummary {
            id: "created".to_string(),
            name: Some(name.to_string()),
        })
    }

    fn replace_playlist_items(
        &self,
        playlist_id: &str,
        uris: &[String],
    ) -> Result<(), CatalogError> {
        self.record(Call::Replace(playlist_id.to_string(), uris.to_vec()));
        if self.fail_writes {
            return Err(status(500));
        }
        Ok(())
    }

    fn add_playlist_items(&self, playlist_id: &str, uris: &[String]) -> Result<(), CatalogError> {
        self.record(Call::Add(playlist_id.to_string(), uris.to_vec()));
        if self.fail_writes {
            return Err(status(500));
        }
        Ok(())
    }
}

/// Scraper returning canned ids per playlist.
#[derive(Default)]
pub(crate) struct FakeScraper {
    pub pages: HashMap<String, Vec<String>>,
    pub calls: Mutex<Vec<String>>,
}

impl FakeScraper {
    pub fn with_page(mut self, playlist_id: &str, ids: &[&str]) -> Self {
        self.pages.insert(
            playlist_id.to_string(),
            ids.iter().map(|s| s.to_string()).collect(),
        );
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl PlaylistScraper for FakeScraper {
    fn scrape_track_ids(&self, playlist_id: &str) -> Vec<String> {
        self.calls.lock().unwrap().push(playlist_id.to_string());
        self.pages.get(playlist_id).cloned().unwrap_or_default()
    }
}

/// Fully-populated track with one `(id, name)` per artist.
pub(crate) fn track(id: &str, artists: &[&str]) -> Track {
    Track {
        name: Some(format!("Song {}", id)),
        artists: artists
            .iter()
            .map(|a| ArtistRef::new(*a, Some(format!("Artist {}", a))))
            .collect(),
        ..Track::stub(id)
    }
}

pub(crate) fn with_isrc(mut track: Track, isrc: &str) -> Track {
    track
        .external_ids
        .insert("isrc".to_string(), isrc.to_string());
    track
}

pub(crate) fn ids(tracks: &[Track]) -> Vec<&str> {
    tracks.iter().map(|t| t.id.as_str()).collect()
}

/// Feature provider that knows nothing, or a fixed set of records.
#[derive(Default)]
pub(crate) struct FakeFeatures {
    pub records: Vec<FeatureRecord>,
}

impl FeatureProvider for FakeFeatures {
    fn fetch_features(&self, _track_ids: &[String]) -> Vec<FeatureRecord> {
        self.records.clone()
    }
}

/// Serve exactly one HTTP response on a local port and return its base url.
pub(crate) fn serve_once(status_line: &str, body: &str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status_line,
        body.len(),
        body
    );

    thread::spawn(move || {
        let Ok((mut stream, _)) = listener.accept() else {
            return;
        };
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            match stream.read(&mut buf) {
                Ok(0) | Err(_) => break,
                Ok(n) => request.extend_from_slice(&buf[..n]),
            }
        }
        let _ = stream.write_all(response.as_bytes());
        let _ = stream.flush();
    });

    base_url
}

/// Base url of a local port nothing listens on.
pub(crate) fn refused_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}
