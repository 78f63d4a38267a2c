//! Source resolution: playlists, user library, files.

mod engine;
mod file_source;
mod hydrator;
mod scraper;

pub use engine::{Tier, TierOutcome, TrackResolver};
pub use file_source::parse_legacy_list;
pub use hydrator::{HydrateMode, Hydrator, DETAIL_BATCH_SIZE};
pub use scraper::{EmbedScraper, PlaylistScraper, EMBED_PLAYLIST_BASE};
