//! Shared constants for end-to-end tests.

/// Regular playlist owned by the test user.
pub const PLAYLIST_MAIN: &str = "mainPlaylist";

/// Playlist used as a source of injected tracks.
pub const PLAYLIST_EXTRA: &str = "extraPlaylist";

/// Vendor-curated playlist that only the public client can read.
pub const PLAYLIST_CURATED: &str = "37i9dQZF1DXcuratedList";

/// Artist shared by the first three tracks of the main playlist.
pub const SHARED_ARTIST: &str = "artist-shared";

pub const MAIN_TRACK_COUNT: usize = 12;
pub const EXTRA_TRACK_COUNT: usize = 4;
