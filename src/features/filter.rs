use tracing::{info, warn};

use super::breaker::CatalogFeatureSource;
use super::matcher::{match_audio_features, AudioBounds};
use super::reccobeats::FeatureProvider;
use crate::catalog::Track;

/// Value of `fallback` that disables fail-open.
pub const NO_FALLBACK: &str = "none";

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AudioFilterParams {
    pub bounds: AudioBounds,
    pub fallback: Option<String>,
}

impl AudioFilterParams {
    pub fn fail_open(&self) -> bool {
        self.fallback.as_deref() != Some(NO_FALLBACK)
    }
}

/// Tempo/energy filter over two providers. Lives for a whole run so the
/// secondary provider's breaker state carries across steps.
pub struct AudioFilter {
    primary: Box<dyn FeatureProvider>,
    secondary: CatalogFeatureSource,
}

impl AudioFilter {
    pub fn new(primary: Box<dyn FeatureProvider>, secondary: CatalogFeatureSource) -> Self {
        Self { primary, secondary }
    }

    pub fn secondary(&self) -> &CatalogFeatureSource {
        &self.secondary
    }

    pub fn apply(&mut self, tracks: &[Track], params: &AudioFilterParams) -> Vec<Track> {
        info!("Audio analysis on {} tracks...", tracks.len());

        let ids: Vec<String> = tracks
            .iter()
            .filter(|t| !t.id.is_empty())
            .map(|t| t.id.clone())
            .collect();
        let records = self.primary.fetch_features(&ids);
        let matched = match_audio_features(tracks, &records, &params.bounds);
        let mut accepted = matched.passing();

        let remaining = matched.unmatched();
        if !remaining.is_empty() && !self.secondary.breaker().is_open() {
            info!("{} tracks remaining, trying catalog features...", remaining.len());
            let remaining_ids: Vec<String> =
                remaining.iter().map(|&i| tracks[i].id.clone()).collect();
            let features = self.secondary.lookup(&remaining_ids);

            for (&idx, feature) in remaining.iter().zip(features) {
                let Some(feature) = feature else { continue };
                if params.bounds.contains(feature.tempo, feature.energy) {
                    accepted.push(Track {
                        bpm: Some(feature.tempo),
                        energy: Some(feature.energy),
                        ..matched.tracks[idx].clone()
                    });
                }
            }
        }

        if accepted.is_empty() && !tracks.is_empty() && params.fail_open() {
            warn!("Audio filter matched nothing, keeping all {} tracks", tracks.len());
            return tracks.to_vec();
        }

        info!("Audio filter: {} remaining", accepted.len());
        accepted
    }
}
