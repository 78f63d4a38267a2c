//! On-disk JSON database of tracks or artists.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{info, warn};

use crate::catalog::{ArtistRef, Track};

#[derive(Debug, Error)]
pub enum LocalDbError {
    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed database {path:?}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Could not serialize database: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Could not replace {path:?}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Artist reference inside a database entry.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DbArtist {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// One entry of the database. Either track-shaped, or artist-shaped with a
/// single artist equal to itself so blacklist filters can consume it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DbEntry {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub artists: Vec<DbArtist>,
    /// Fields written by other tools, kept as-is.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DbEntry {
    pub fn from_track(track: &Track) -> Self {
        Self {
            id: track.id.clone(),
            uri: Some(track.playable_uri()),
            name: track.name.clone(),
            artists: track
                .artists
                .iter()
                .map(|a| DbArtist {
                    id: a.id.clone(),
                    name: a.name.clone(),
                })
                .collect(),
            extra: Map::new(),
        }
    }

    pub fn from_artist(artist: &ArtistRef) -> Self {
        Self {
            id: artist.id.clone(),
            uri: None,
            name: artist.name.clone(),
            artists: vec![DbArtist {
                id: artist.id.clone(),
                name: None,
            }],
            extra: Map::new(),
        }
    }

    pub fn to_track(&self) -> Track {
        Track {
            id: self.id.clone(),
            uri: self.uri.clone(),
            name: self.name.clone(),
            artists: self
                .artists
                .iter()
                .map(|a| ArtistRef::new(a.id.clone(), a.name.clone()))
                .collect(),
            ..Default::default()
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LocalDatabase {
    #[serde(default)]
    pub tracks: Vec<DbEntry>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LocalDatabase {
    /// Read the database at `path`. `Ok(None)` when the file does not exist.
    pub fn read(path: &Path) -> Result<Option<Self>, LocalDbError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(LocalDbError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|source| LocalDbError::Malformed {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Like `read`, but a missing or unreadable file is an empty database.
    pub fn load(path: &Path) -> Self {
        match Self::read(path) {
            Ok(Some(db)) => db,
            Ok(None) => Self::default(),
            Err(e) => {
                warn!("{}, treating as empty", e);
                Self::default()
            }
        }
    }

    /// Write with 2-space indentation through a sibling temp file, so readers
    /// never observe a half-written database.
    pub fn save(&self, path: &Path) -> Result<(), LocalDbError> {
        let text = serde_json::to_string_pretty(self)?;
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let io_err = |source| LocalDbError::Io {
            path: path.to_path_buf(),
            source,
        };

        let mut tmp = NamedTempFile::new_in(&parent).map_err(io_err)?;
        tmp.write_all(text.as_bytes()).map_err(io_err)?;
        tmp.flush().map_err(io_err)?;
        tmp.persist(path).map_err(|e| LocalDbError::Persist {
            path: path.to_path_buf(),
            source: e.error,
        })?;

        info!("Database {:?} written ({} entries)", path, self.tracks.len());
        Ok(())
    }

    pub fn ids(&self) -> HashSet<&str> {
        self.tracks.iter().map(|e| e.id.as_str()).collect()
    }

    pub fn to_tracks(&self) -> Vec<Track> {
        self.tracks.iter().map(DbEntry::to_track).collect()
    }
}
