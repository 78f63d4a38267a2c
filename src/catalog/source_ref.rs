//! Parsing of loosely-specified source references.

/// Playlist ids with this prefix are vendor-editorial and usually not
/// reachable through the authenticated playlist endpoint.
pub const CURATED_PREFIX: &str = "37i";

/// Time-range bucket of the user's top tracks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimeRange {
    Short,
    Medium,
    Long,
}

impl TimeRange {
    pub fn as_api_str(&self) -> &'static str {
        match self {
            TimeRange::Short => "short_term",
            TimeRange::Medium => "medium_term",
            TimeRange::Long => "long_term",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SourceRef {
    /// `me`: the acting user's saved tracks.
    SavedTracks,
    /// `top_tracks`, `top_tracks.short`, `top_tracks.long`.
    TopTracks(TimeRange),
    /// Opaque playlist id.
    Playlist(String),
}

impl SourceRef {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        match raw {
            "me" => return SourceRef::SavedTracks,
            "top_tracks" => return SourceRef::TopTracks(TimeRange::Medium),
            "top_tracks.short" => return SourceRef::TopTracks(TimeRange::Short),
            "top_tracks.long" => return SourceRef::TopTracks(TimeRange::Long),
            _ => {}
        }

        if raw.contains("://") || raw.contains("spotify.com") {
            let last_segment = raw.trim_end_matches('/').rsplit('/').next().unwrap_or(raw);
            let id = last_segment.split('?').next().unwrap_or(last_segment);
            return SourceRef::Playlist(id.to_string());
        }

        if let Some(id) = raw.strip_prefix("spotify:playlist:") {
            return SourceRef::Playlist(id.to_string());
        }

        SourceRef::Playlist(raw.to_string())
    }

    pub fn playlist_id(&self) -> Option<&str> {
        match self {
            SourceRef::Playlist(id) => Some(id),
            _ => None,
        }
    }

    pub fn is_curated(&self) -> bool {
        self.playlist_id()
            .is_some_and(|id| id.starts_with(CURATED_PREFIX))
    }
}
