//! ReccoBeats client, the primary audio-feature provider.
//!
//! Queried in batches of 30 ids with a fixed pause after every batch.

use anyhow::Result;
use reqwest::blocking::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::matcher::FeatureRecord;
use crate::config::pause;

pub const RECCOBEATS_API_BASE: &str = "https://api.reccobeats.com";
pub const PRIMARY_BATCH_SIZE: usize = 30;

/// Source of feature records for a list of catalog track ids.
pub trait FeatureProvider: Send + Sync {
    /// Records for as many of `track_ids` as the provider knows, in any order.
    /// Failures reduce the result, they are never returned.
    fn fetch_features(&self, track_ids: &[String]) -> Vec<FeatureRecord>;
}

/// The provider answers either `{ "content": [...] }` or a bare array.
#[derive(Deserialize)]
#[serde(untagged)]
enum ReccoBeatsResponse {
    Bare(Vec<FeatureRecord>),
    Wrapped {
        #[serde(default)]
        content: Vec<FeatureRecord>,
    },
}

impl ReccoBeatsResponse {
    fn into_records(self) -> Vec<FeatureRecord> {
        match self {
            ReccoBeatsResponse::Bare(records) => records,
            ReccoBeatsResponse::Wrapped { content } => content,
        }
    }
}

pub struct ReccoBeatsClient {
    client: Client,
    base_url: String,
    batch_pause: Duration,
}

impl ReccoBeatsClient {
    pub fn new(base_url: &str, timeout: Duration, batch_pause: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            batch_pause,
        })
    }

    fn fetch_batch(&self, batch: &[String]) -> Result<Vec<FeatureRecord>> {
        let url = format!("{}/v1/track?ids={}", self.base_url, batch.join(","));
        let response = self.client.get(&url).send()?;

        if !response.status().is_success() {
            anyhow::bail!("ReccoBeats failed with status {}", response.status());
        }

        let body: ReccoBeatsResponse = response.json()?;
        Ok(body.into_records())
    }
}

impl FeatureProvider for ReccoBeatsClient {
    fn fetch_features(&self, track_ids: &[String]) -> Vec<FeatureRecord> {
        info!("Trying ReccoBeats for {} tracks...", track_ids.len());

        let mut records = Vec::new();
        for batch in track_ids.chunks(PRIMARY_BATCH_SIZE) {
            match self.fetch_batch(batch) {
                Ok(found) => {
                    debug!("ReccoBeats answered {} of {}", found.len(), batch.len());
                    records.extend(found);
                }
                Err(e) => warn!("ReccoBeats batch of {} skipped: {}", batch.len(), e),
            }
            pause(self.batch_pause);
        }
        records
    }
}
