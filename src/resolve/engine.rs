//! Track Resolution Engine.
//!
//! Turns a source reference into an ordered list of tracks by walking an
//! explicit chain of tiers:
//!
//! ```text
//! Authenticated → Public → Scrape → Search
//! ```
//!
//! Vendor-curated playlists skip the authenticated tier. A tier's failure
//! never escapes: it is logged and the next tier is tried. When every tier
//! comes back empty the caller gets an empty list.

use std::sync::Arc;
use tracing::{info, warn};

use super::hydrator::{HydrateMode, Hydrator};
use super::scraper::PlaylistScraper;
use crate::catalog::{CatalogApi, CatalogError, Page, SourceRef, Track};

/// Market of the authenticated user.
const USER_MARKET: &str = "from_token";
const PLAYLIST_SEARCH_LIMIT: u32 = 5;
/// Owner qualifier appended to name searches for vendor-curated playlists.
const CURATED_OWNER_QUALIFIER: &str = "owner:spotify";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tier {
    Authenticated,
    Public,
    Scrape,
    Search,
}

impl Tier {
    pub fn chain(curated: bool) -> &'static [Tier] {
        if curated {
            &[Tier::Public, Tier::Scrape, Tier::Search]
        } else {
            &[Tier::Authenticated, Tier::Public, Tier::Scrape, Tier::Search]
        }
    }
}

/// Outcome of one resolution tier.
#[derive(Debug)]
pub enum TierOutcome {
    Tracks(Vec<Track>),
    Empty,
    Failed(CatalogError),
}

impl TierOutcome {
    fn from_tracks(tracks: Vec<Track>) -> Self {
        if tracks.is_empty() {
            TierOutcome::Empty
        } else {
            TierOutcome::Tracks(tracks)
        }
    }
}

pub struct TrackResolver {
    user: Arc<dyn CatalogApi>,
    public: Arc<dyn CatalogApi>,
    scraper: Arc<dyn PlaylistScraper>,
    hydrator: Hydrator,
    public_market: String,
}

impl TrackResolver {
    pub fn new(
        user: Arc<dyn CatalogApi>,
        public: Arc<dyn CatalogApi>,
        scraper: Arc<dyn PlaylistScraper>,
        hydrator: Hydrator,
        public_market: impl Into<String>,
    ) -> Self {
        Self {
            user,
            public,
            scraper,
            hydrator,
            public_market: public_market.into(),
        }
    }

    pub fn hydrator(&self) -> &Hydrator {
        &self.hydrator
    }

    /// Resolve `source` into tracks. Never fails: total failure is empty.
    pub fn resolve(
        &self,
        source: &str,
        display_name: Option<&str>,
        mode: HydrateMode,
    ) -> Vec<Track> {
        match SourceRef::parse(source) {
            SourceRef::SavedTracks => {
                let tracks = self.collect_library("saved tracks", |cursor| {
                    self.user.saved_tracks_page(cursor)
                });
                self.finish_api(tracks, mode)
            }
            SourceRef::TopTracks(range) => {
                let tracks = self.collect_library("top tracks", |cursor| {
                    self.user.top_tracks_page(range, cursor)
                });
                self.finish_api(tracks, mode)
            }
            source_ref @ SourceRef::Playlist(_) => {
                self.resolve_playlist(&source_ref, display_name, mode)
            }
        }
    }

    fn resolve_playlist(
        &self,
        source_ref: &SourceRef,
        display_name: Option<&str>,
        mode: HydrateMode,
    ) -> Vec<Track> {
        let Some(playlist_id) = source_ref.playlist_id() else {
            return Vec::new();
        };
        let curated = source_ref.is_curated();

        for tier in Tier::chain(curated) {
            match self.attempt(*tier, playlist_id, curated, display_name, mode) {
                TierOutcome::Tracks(tracks) => {
                    info!(
                        "Resolved {} tracks for {} via {:?} tier",
                        tracks.len(),
                        playlist_id,
                        tier
                    );
                    return tracks;
                }
                TierOutcome::Empty => {
                    info!("{:?} tier returned nothing for {}", tier, playlist_id);
                }
                TierOutcome::Failed(e) => {
                    warn!("{:?} tier failed for {}: {}", tier, playlist_id, e);
                }
            }
        }

        warn!("All resolution tiers exhausted for {}", playlist_id);
        Vec::new()
    }

    /// Run a single tier. Exposed so the chain order can be tested per tier.
    pub fn attempt(
        &self,
        tier: Tier,
        playlist_id: &str,
        curated: bool,
        display_name: Option<&str>,
        mode: HydrateMode,
    ) -> TierOutcome {
        match tier {
            Tier::Authenticated => {
                match fetch_all_items(self.user.as_ref(), playlist_id, USER_MARKET) {
                    Ok(tracks) => TierOutcome::from_tracks(self.finish_api(tracks, mode)),
                    Err(e) => TierOutcome::Failed(e),
                }
            }
            Tier::Public => {
                match fetch_all_items(self.public.as_ref(), playlist_id, &self.public_market) {
                    Ok(tracks) => TierOutcome::from_tracks(self.finish_api(tracks, mode)),
                    Err(e) => TierOutcome::Failed(e),
                }
            }
            Tier::Scrape => TierOutcome::from_tracks(self.scrape(playlist_id, mode)),
            Tier::Search => match display_name.filter(|name| !name.trim().is_empty()) {
                Some(name) => self.search_fallback(name, curated, mode),
                None => TierOutcome::Empty,
            },
        }
    }

    fn scrape(&self, playlist_id: &str, mode: HydrateMode) -> Vec<Track> {
        let ids = self.scraper.scrape_track_ids(playlist_id);
        if ids.is_empty() {
            return Vec::new();
        }
        if mode.should_hydrate(true) {
            info!("Auto-hydrate active for {} scraped tracks", ids.len());
            self.hydrator.hydrate(&ids)
        } else {
            ids.into_iter().map(Track::stub).collect()
        }
    }

    fn search_fallback(&self, name: &str, curated: bool, mode: HydrateMode) -> TierOutcome {
        let query = if curated {
            format!("\"{}\" {}", name, CURATED_OWNER_QUALIFIER)
        } else {
            name.to_string()
        };
        info!("Fallback: searching for playlist '{}'...", name);

        let hits = match self.user.search_playlists(&query, PLAYLIST_SEARCH_LIMIT) {
            Ok(hits) => hits,
            Err(e) => return TierOutcome::Failed(e),
        };
        let Some(hit) = hits.into_iter().next() else {
            return TierOutcome::Empty;
        };

        match fetch_all_items(self.user.as_ref(), &hit.id, USER_MARKET) {
            Ok(tracks) if !tracks.is_empty() => {
                TierOutcome::Tracks(self.finish_api(tracks, mode))
            }
            Ok(_) => TierOutcome::Empty,
            Err(e) => {
                warn!("Search hit {} not readable ({}), scraping it", hit.id, e);
                TierOutcome::from_tracks(self.scrape(&hit.id, mode))
            }
        }
    }

    /// Hydrate API results when asked to. A fetch that succeeded stays
    /// terminal: if hydration yields nothing the fetched records are kept.
    fn finish_api(&self, tracks: Vec<Track>, mode: HydrateMode) -> Vec<Track> {
        if !mode.should_hydrate(false) || tracks.is_empty() {
            return tracks;
        }
        info!("Forced hydration of {} tracks via re-search", tracks.len());
        let uris: Vec<String> = tracks.iter().map(Track::playable_uri).collect();
        let hydrated = self.hydrator.hydrate(&uris);
        if hydrated.is_empty() {
            warn!(
                "Hydration produced nothing for {} fetched tracks, keeping them as fetched",
                tracks.len()
            );
            return tracks;
        }
        hydrated
    }

    fn collect_library<F>(&self, label: &str, fetch: F) -> Vec<Track>
    where
        F: Fn(Option<&str>) -> Result<Page<Track>, CatalogError>,
    {
        match collect_pages(fetch) {
            Ok(tracks) => tracks,
            Err(e) => {
                warn!("Could not fetch {}: {}", label, e);
                Vec::new()
            }
        }
    }
}

/// All items of a playlist, following cursors until none is left.
fn fetch_all_items(
    catalog: &dyn CatalogApi,
    playlist_id: &str,
    market: &str,
) -> Result<Vec<Track>, CatalogError> {
    collect_pages(|cursor| catalog.playlist_items_page(playlist_id, market, cursor))
}

fn collect_pages<F>(fetch: F) -> Result<Vec<Track>, CatalogError>
where
    F: Fn(Option<&str>) -> Result<Page<Track>, CatalogError>,
{
    let mut tracks = Vec::new();
    let mut cursor: Option<String> = None;
    loop {
        let page = fetch(cursor.as_deref())?;
        tracks.extend(page.items.into_iter().filter(|t| !t.id.is_empty()));
        match page.next {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }
    Ok(tracks)
}
