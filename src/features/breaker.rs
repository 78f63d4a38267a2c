//! Secondary feature provider guarded by a run-scoped circuit breaker.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::catalog::{AudioFeatures, CatalogApi, CatalogError};
use crate::config::pause;

pub const SECONDARY_BATCH_SIZE: usize = 100;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BreakerState {
    #[default]
    Closed,
    Open,
}

/// Opens on the first forbidden-class error and never closes again.
#[derive(Debug, Default)]
pub struct CircuitBreaker {
    state: BreakerState,
}

impl CircuitBreaker {
    pub fn state(&self) -> BreakerState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == BreakerState::Open
    }

    /// Record a failed call. Returns true if this error tripped the breaker.
    pub fn record_failure(&mut self, error: &CatalogError) -> bool {
        if self.is_open() || !error.is_forbidden() {
            return false;
        }
        self.state = BreakerState::Open;
        true
    }
}

/// The catalog's own audio-feature endpoint.
pub struct CatalogFeatureSource {
    catalog: Arc<dyn CatalogApi>,
    breaker: CircuitBreaker,
    batch_pause: Duration,
}

impl CatalogFeatureSource {
    pub fn new(catalog: Arc<dyn CatalogApi>, batch_pause: Duration) -> Self {
        Self {
            catalog,
            breaker: CircuitBreaker::default(),
            batch_pause,
        }
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// Features aligned with `track_ids`. Positions of failed or skipped
    /// batches are `None`.
    pub fn lookup(&mut self, track_ids: &[String]) -> Vec<Option<AudioFeatures>> {
        let mut aligned: Vec<Option<AudioFeatures>> = vec![None; track_ids.len()];

        for (batch_idx, batch) in track_ids.chunks(SECONDARY_BATCH_SIZE).enumerate() {
            if self.breaker.is_open() {
                break;
            }
            match self.catalog.audio_features(batch) {
                Ok(features) => {
                    let offset = batch_idx * SECONDARY_BATCH_SIZE;
                    for (i, feature) in features.into_iter().take(batch.len()).enumerate() {
                        aligned[offset + i] = feature;
                    }
                    pause(self.batch_pause);
                }
                Err(e) => {
                    if self.breaker.record_failure(&e) {
                        warn!("Audio features forbidden ({}), disabling them for this run", e);
                    } else {
                        debug!("Audio features batch failed: {}", e);
                    }
                }
            }
        }

        aligned
    }
}
