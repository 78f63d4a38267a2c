use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub data_dir: Option<String>,
    pub user_token: Option<String>,
    pub app_token: Option<String>,
    pub seed: Option<u64>,
    pub strict_actions: Option<bool>,

    // Feature configs
    pub endpoints: Option<EndpointsConfig>,
    pub pacing: Option<PacingConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct EndpointsConfig {
    pub catalog_api_url: Option<String>,
    pub embed_url: Option<String>,
    pub reccobeats_url: Option<String>,
    pub public_market: Option<String>,
    pub scraper_timeout_sec: Option<u64>,
    pub features_timeout_sec: Option<u64>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct PacingConfig {
    pub search_pause_ms: Option<u64>,
    pub search_pause_every: Option<usize>,
    pub primary_features_batch_ms: Option<u64>,
    pub secondary_features_batch_ms: Option<u64>,
    pub playlist_settle_ms: Option<u64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
