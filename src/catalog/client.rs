//! Catalog Web API client.
//!
//! Blocking HTTP client holding a bearer token supplied by configuration.
//! Token acquisition and refresh happen outside this crate.

use anyhow::Result;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::Method;
use serde::de::DeserializeOwned;
use std::time::Duration;

use super::error::CatalogError;
use super::models::{
    ApiArtistsResponse, ApiAudioFeaturesResponse, ApiPaging, ApiSearchResponse, ApiTrack,
    ApiTrackItem, ApiTracksResponse, Artist, AudioFeatures, Page, PlaylistSummary, Track,
};
use super::source_ref::TimeRange;

pub const SPOTIFY_API_BASE: &str = "https://api.spotify.com/v1";

/// Market used when the authenticated user's own market should apply.
const FROM_TOKEN_MARKET: &str = "from_token";
const PLAYLIST_PAGE_LIMIT: &str = "100";
const LIBRARY_PAGE_LIMIT: &str = "50";
/// Error bodies are kept in logs, but not in full.
const MAX_ERROR_BODY: usize = 200;

/// Capabilities the mixer needs from the remote catalog.
///
/// Implementations are blocking; every call either returns data or a
/// `CatalogError` that the caller treats as a recoverable failure.
pub trait CatalogApi: Send + Sync {
    /// One page of a playlist's items. `cursor` is the `next` value of the
    /// previous page, `None` for the first page.
    fn playlist_items_page(
        &self,
        playlist_id: &str,
        market: &str,
        cursor: Option<&str>,
    ) -> Result<Page<Track>, CatalogError>;

    /// One page of the acting user's saved tracks.
    fn saved_tracks_page(&self, cursor: Option<&str>) -> Result<Page<Track>, CatalogError>;

    /// One page of the acting user's top tracks.
    fn top_tracks_page(
        &self,
        range: TimeRange,
        cursor: Option<&str>,
    ) -> Result<Page<Track>, CatalogError>;

    /// Batch detail lookup (at most 50 ids). Unknown ids are omitted.
    fn tracks(&self, ids: &[String]) -> Result<Vec<Track>, CatalogError>;

    fn search_tracks(&self, query: &str, limit: u32) -> Result<Vec<Track>, CatalogError>;

    fn search_playlists(
        &self,
        query: &str,
        limit: u32,
    ) -> Result<Vec<PlaylistSummary>, CatalogError>;

    /// Batch artist lookup (at most 50 ids) with genres lower-cased.
    fn artists(&self, ids: &[String]) -> Result<Vec<Artist>, CatalogError>;

    /// Batch audio features (at most 100 ids), positionally aligned with
    /// `ids`; `None` where the catalog has no data.
    fn audio_features(&self, ids: &[String]) -> Result<Vec<Option<AudioFeatures>>, CatalogError>;

    /// Create a private playlist owned by the acting user.
    fn create_playlist(
        &self,
        name: &str,
        description: &str,
    ) -> Result<PlaylistSummary, CatalogError>;

    /// Replace the playlist contents with `uris` (empty clears it).
    fn replace_playlist_items(&self, playlist_id: &str, uris: &[String])
        -> Result<(), CatalogError>;

    /// Append at most 100 `uris` to the playlist.
    fn add_playlist_items(&self, playlist_id: &str, uris: &[String]) -> Result<(), CatalogError>;
}

/// `CatalogApi` over the Spotify Web API.
pub struct SpotifyClient {
    client: Client,
    base_url: String,
    token: String,
}

impl SpotifyClient {
    pub fn new(base_url: &str, token: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client.request(method, url).bearer_auth(&self.token)
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, CatalogError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.request(Method::GET, &url).query(query).send()?;
        Ok(check_status(response)?.json()?)
    }

    /// Follow an opaque `next` cursor, or fetch the first page.
    fn get_page<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        cursor: Option<&str>,
    ) -> Result<ApiPaging<T>, CatalogError> {
        match cursor {
            Some(next) => {
                let response = self.request(Method::GET, next).send()?;
                Ok(check_status(response)?.json()?)
            }
            None => self.get_json(path, query),
        }
    }

    fn send_uris(
        &self,
        method: Method,
        playlist_id: &str,
        uris: &[String],
    ) -> Result<(), CatalogError> {
        let url = format!("{}/playlists/{}/tracks", self.base_url, playlist_id);
        let response = self
            .request(method, &url)
            .json(&serde_json::json!({ "uris": uris }))
            .send()?;
        check_status(response)?;
        Ok(())
    }
}

fn check_status(response: Response) -> Result<Response, CatalogError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let mut body = response.text().unwrap_or_default();
    truncate_body(&mut body, MAX_ERROR_BODY);
    Err(CatalogError::Status {
        status: status.as_u16(),
        body,
    })
}

/// Cut `body` to at most `max` bytes without splitting a character.
fn truncate_body(body: &mut String, max: usize) {
    if body.len() <= max {
        return;
    }
    let mut end = max;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    body.truncate(end);
}

fn into_track_page(page: ApiPaging<ApiTrackItem>) -> Page<Track> {
    Page {
        items: page
            .items
            .into_iter()
            .filter_map(|item| item.track.and_then(ApiTrack::into_track))
            .collect(),
        next: page.next,
    }
}

impl CatalogApi for SpotifyClient {
    fn playlist_items_page(
        &self,
        playlist_id: &str,
        market: &str,
        cursor: Option<&str>,
    ) -> Result<Page<Track>, CatalogError> {
        let path = format!("/playlists/{}/tracks", playlist_id);
        let page: ApiPaging<ApiTrackItem> = self.get_page(
            &path,
            &[
                ("market", market),
                ("limit", PLAYLIST_PAGE_LIMIT),
                ("additional_types", "track"),
            ],
            cursor,
        )?;
        Ok(into_track_page(page))
    }

    fn saved_tracks_page(&self, cursor: Option<&str>) -> Result<Page<Track>, CatalogError> {
        let page: ApiPaging<ApiTrackItem> = self.get_page(
            "/me/tracks",
            &[("limit", LIBRARY_PAGE_LIMIT), ("market", FROM_TOKEN_MARKET)],
            cursor,
        )?;
        Ok(into_track_page(page))
    }

    fn top_tracks_page(
        &self,
        range: TimeRange,
        cursor: Option<&str>,
    ) -> Result<Page<Track>, CatalogError> {
        let page: ApiPaging<ApiTrack> = self.get_page(
            "/me/top/tracks",
            &[
                ("time_range", range.as_api_str()),
                ("limit", LIBRARY_PAGE_LIMIT),
            ],
            cursor,
        )?;
        Ok(Page {
            items: page
                .items
                .into_iter()
                .filter_map(ApiTrack::into_track)
                .collect(),
            next: page.next,
        })
    }

    fn tracks(&self, ids: &[String]) -> Result<Vec<Track>, CatalogError> {
        let joined = ids.join(",");
        let response: ApiTracksResponse = self.get_json(
            "/tracks",
            &[("ids", joined.as_str()), ("market", FROM_TOKEN_MARKET)],
        )?;
        Ok(response
            .tracks
            .into_iter()
            .flatten()
            .filter(|t| t.name.is_some())
            .filter_map(ApiTrack::into_track)
            .collect())
    }

    fn search_tracks(&self, query: &str, limit: u32) -> Result<Vec<Track>, CatalogError> {
        let limit = limit.to_string();
        let response: ApiSearchResponse = self.get_json(
            "/search",
            &[("q", query), ("type", "track"), ("limit", limit.as_str())],
        )?;
        Ok(response
            .tracks
            .map(|page| {
                page.items
                    .into_iter()
                    .flatten()
                    .filter_map(ApiTrack::into_track)
                    .collect()
            })
            .unwrap_or_default())
    }

    fn search_playlists(
        &self,
        query: &str,
        limit: u32,
    ) -> Result<Vec<PlaylistSummary>, CatalogError> {
        let limit = limit.to_string();
        let response: ApiSearchResponse = self.get_json(
            "/search",
            &[("q", query), ("type", "playlist"), ("limit", limit.as_str())],
        )?;
        Ok(response
            .playlists
            .map(|page| page.items.into_iter().flatten().collect())
            .unwrap_or_default())
    }

    fn artists(&self, ids: &[String]) -> Result<Vec<Artist>, CatalogError> {
        let joined = ids.join(",");
        let response: ApiArtistsResponse =
            self.get_json("/artists", &[("ids", joined.as_str())])?;
        Ok(response
            .artists
            .into_iter()
            .flatten()
            .map(|a| Artist {
                id: a.id,
                name: a.name,
                genres: a.genres.iter().map(|g| g.to_lowercase()).collect(),
            })
            .collect())
    }

    fn audio_features(&self, ids: &[String]) -> Result<Vec<Option<AudioFeatures>>, CatalogError> {
        let joined = ids.join(",");
        let response: ApiAudioFeaturesResponse =
            self.get_json("/audio-features", &[("ids", joined.as_str())])?;
        Ok(response.audio_features)
    }

    fn create_playlist(
        &self,
        name: &str,
        description: &str,
    ) -> Result<PlaylistSummary, CatalogError> {
        let url = format!("{}/me/playlists", self.base_url);
        let response = self
            .request(Method::POST, &url)
            .json(&serde_json::json!({
                "name": name,
                "description": description,
                "public": false,
            }))
            .send()?;
        Ok(check_status(response)?.json()?)
    }

    fn replace_playlist_items(
        &self,
        playlist_id: &str,
        uris: &[String],
    ) -> Result<(), CatalogError> {
        self.send_uris(Method::PUT, playlist_id, uris)
    }

    fn add_playlist_items(&self, playlist_id: &str, uris: &[String]) -> Result<(), CatalogError> {
        self.send_uris(Method::POST, playlist_id, uris)
    }
}
