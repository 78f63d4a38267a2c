//! Metadata hydration: turning bare identifiers into canonical track records.
//!
//! ## Two passes per run
//!
//! ```text
//! ids → batch detail lookup (50 per call) → per-track identity-repair search
//! ```
//!
//! Detail lookups can return records whose internal linkage is stale relative
//! to what search returns, so every record from the first pass is replaced by
//! the first search hit for `track:<name> artist:<primary artist>`.

use serde::{Deserialize, Deserializer};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::catalog::{track_id_from_reference, CatalogApi, Track};
use crate::config::{pause, PacingSettings};

pub const DETAIL_BATCH_SIZE: usize = 50;

/// Hydration setting of a `source`/`source_file` step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HydrateMode {
    /// Always re-resolve.
    True,
    /// Never re-resolve; bare stubs stay bare.
    False,
    /// Re-resolve only lists that came from the scraper.
    #[default]
    Auto,
}

impl HydrateMode {
    /// Interpret a raw setting. Anything unrecognised reads as `False`.
    pub fn from_setting(value: &serde_json::Value) -> Self {
        let text = match value {
            serde_json::Value::Bool(b) => b.to_string(),
            serde_json::Value::String(s) => s.to_lowercase(),
            _ => return HydrateMode::False,
        };
        match text.as_str() {
            "true" => HydrateMode::True,
            "auto" => HydrateMode::Auto,
            _ => HydrateMode::False,
        }
    }

    pub fn should_hydrate(self, from_scraper: bool) -> bool {
        match self {
            HydrateMode::True => true,
            HydrateMode::False => false,
            HydrateMode::Auto => from_scraper,
        }
    }
}

impl<'de> Deserialize<'de> for HydrateMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(HydrateMode::from_setting(&value))
    }
}

pub struct Hydrator {
    catalog: Arc<dyn CatalogApi>,
    pacing: PacingSettings,
}

impl Hydrator {
    pub fn new(catalog: Arc<dyn CatalogApi>, pacing: PacingSettings) -> Self {
        Self { catalog, pacing }
    }

    /// Re-resolve `references` (uris or bare ids) into canonical records.
    ///
    /// Batches that fail in the detail pass are logged and left out. Identity
    /// repair keeps the first-pass record when search errors or finds nothing.
    pub fn hydrate(&self, references: &[String]) -> Vec<Track> {
        if references.is_empty() {
            return Vec::new();
        }

        let ids: Vec<String> = references
            .iter()
            .map(|r| track_id_from_reference(r).to_string())
            .collect();

        let mut fetched = Vec::with_capacity(ids.len());
        for batch in ids.chunks(DETAIL_BATCH_SIZE) {
            match self.catalog.tracks(batch) {
                Ok(tracks) => fetched.extend(tracks.into_iter().filter(|t| t.name.is_some())),
                Err(e) => warn!("Metadata fetch error for batch of {}: {}", batch.len(), e),
            }
        }

        info!(
            "Metadata fetched for {} tracks, refreshing via search to fix linking...",
            fetched.len()
        );

        let every = self.pacing.search_pause_every.max(1);
        let mut repaired = Vec::with_capacity(fetched.len());
        for (idx, track) in fetched.into_iter().enumerate() {
            repaired.push(self.repair_identity(track));
            if (idx + 1) % every == 0 {
                pause(self.pacing.search_pause);
            }
        }
        repaired
    }

    fn repair_identity(&self, original: Track) -> Track {
        let (Some(name), Some(artist)) = (original.name.as_deref(), original.primary_artist_name())
        else {
            return original;
        };

        let query = format!("track:{} artist:{}", name, artist);
        match self.catalog.search_tracks(&query, 1) {
            Ok(hits) => match hits.into_iter().next() {
                Some(mut replacement) => {
                    // The ISRC is the join key for audio matching, never drop it.
                    if replacement.external_ids.is_empty() && !original.external_ids.is_empty() {
                        replacement.external_ids = original.external_ids;
                    }
                    replacement
                }
                None => original,
            },
            Err(e) => {
                debug!("Identity repair search failed for {:?}: {}", query, e);
                original
            }
        }
    }
}
