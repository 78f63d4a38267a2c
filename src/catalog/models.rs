//! Catalog models shared by every component.
//!
//! `Track` is the unit flowing through the pipeline. The `Api*` types mirror
//! the JSON returned by the catalog Web API and are converted into the shared
//! models at the client boundary.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Prefix of canonical track references (`spotify:track:<id>`).
pub const TRACK_URI_PREFIX: &str = "spotify:track:";

/// Attribute names accepted by `sort` and `weighted_shuffle`.
pub const NUMERIC_ATTRS: &[&str] = &["popularity", "bpm", "tempo", "energy"];

/// Extract the bare track id from a reference that may be a URI or an id.
pub fn track_id_from_reference(reference: &str) -> &str {
    reference.rsplit(':').next().unwrap_or(reference)
}

/// Artist as attached to a track: `{id, name}`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ArtistRef {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ArtistRef {
    pub fn new(id: impl Into<String>, name: Option<String>) -> Self {
        Self {
            id: id.into(),
            name,
        }
    }
}

/// Full artist record, only fetched for genre filtering.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Artist {
    pub id: String,
    pub name: String,
    /// Lower-cased genre labels.
    pub genres: Vec<String>,
}

/// A single playable catalog item.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Primary artist first, as provided by the catalog.
    #[serde(default)]
    pub artists: Vec<ArtistRef>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub external_ids: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub popularity: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bpm: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub energy: Option<f64>,
    /// Set when some feature provider answered for this track, even if the
    /// track then failed the numeric range test.
    #[serde(skip)]
    pub audio_found: bool,
}

impl Track {
    /// A bare `{uri, id}` record with no metadata.
    pub fn stub(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            uri: Some(format!("{}{}", TRACK_URI_PREFIX, id)),
            id,
            ..Default::default()
        }
    }

    /// Identity used by set operations: the uri, or the id when no uri is known.
    pub fn identity_key(&self) -> &str {
        self.uri.as_deref().unwrap_or(&self.id)
    }

    /// The uri to send to the catalog when writing playlists.
    pub fn playable_uri(&self) -> String {
        match &self.uri {
            Some(uri) => uri.clone(),
            None => format!("{}{}", TRACK_URI_PREFIX, self.id),
        }
    }

    pub fn primary_artist_name(&self) -> Option<&str> {
        self.artists.first().and_then(|a| a.name.as_deref())
    }

    pub fn artist_ids(&self) -> impl Iterator<Item = &str> {
        self.artists.iter().map(|a| a.id.as_str())
    }

    pub fn isrc(&self) -> Option<&str> {
        self.external_ids.get("isrc").map(String::as_str)
    }

    /// Whether `attr` names an attribute `numeric_attr` knows about.
    pub fn is_numeric_attr(attr: &str) -> bool {
        NUMERIC_ATTRS.contains(&attr)
    }

    /// Numeric attribute lookup used by `sort` and `weighted_shuffle`.
    /// Missing or unknown attributes read as 0.
    pub fn numeric_attr(&self, attr: &str) -> f64 {
        match attr {
            "popularity" => self.popularity.map(f64::from),
            "bpm" | "tempo" => self.bpm,
            "energy" => self.energy,
            _ => None,
        }
        .unwrap_or(0.0)
    }
}

/// Minimal playlist record returned by search and creation.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct PlaylistSummary {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Audio attributes from the catalog's own feature endpoint.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct AudioFeatures {
    #[serde(default)]
    pub id: Option<String>,
    pub tempo: f64,
    pub energy: f64,
}

/// One page of a paged listing. `next` is an opaque cursor.
#[derive(Clone, Debug, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next: Option<String>,
}

impl<T> Page<T> {
    pub fn last(items: Vec<T>) -> Self {
        Self { items, next: None }
    }
}

// =============================================================================
// Web API payloads
// =============================================================================

#[derive(Clone, Debug, Default, Deserialize)]
pub(crate) struct ApiArtistRef {
    pub id: Option<String>,
    pub name: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub(crate) struct ApiTrack {
    pub id: Option<String>,
    pub uri: Option<String>,
    pub name: Option<String>,
    #[serde(default)]
    pub artists: Vec<ApiArtistRef>,
    #[serde(default)]
    pub external_ids: Option<BTreeMap<String, String>>,
    pub popularity: Option<u32>,
}

impl ApiTrack {
    /// Convert to the shared model. Items without a catalog id (local files,
    /// unavailable entries) are dropped.
    pub fn into_track(self) -> Option<Track> {
        let id = self.id.filter(|id| !id.is_empty())?;
        Some(Track {
            uri: self.uri,
            name: self.name,
            artists: self
                .artists
                .into_iter()
                .filter_map(|a| Some(ArtistRef::new(a.id?, a.name)))
                .collect(),
            external_ids: self.external_ids.unwrap_or_default(),
            popularity: self.popularity,
            id,
            ..Default::default()
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiPaging<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    pub next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiTrackItem {
    pub track: Option<ApiTrack>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiTracksResponse {
    #[serde(default)]
    pub tracks: Vec<Option<ApiTrack>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiSearchResponse {
    pub tracks: Option<ApiPaging<Option<ApiTrack>>>,
    pub playlists: Option<ApiPaging<Option<PlaylistSummary>>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiArtist {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub genres: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiArtistsResponse {
    #[serde(default)]
    pub artists: Vec<Option<ApiArtist>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiAudioFeaturesResponse {
    #[serde(default)]
    pub audio_features: Vec<Option<AudioFeatures>>,
}
