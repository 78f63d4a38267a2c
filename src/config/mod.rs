mod file_config;

pub use file_config::{EndpointsConfig, FileConfig, PacingConfig};

use crate::catalog::SPOTIFY_API_BASE;
use crate::features::RECCOBEATS_API_BASE;
use crate::resolve::EMBED_PLAYLIST_BASE;
use anyhow::{bail, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Market used for the unauthenticated playlist fetch.
pub const DEFAULT_PUBLIC_MARKET: &str = "NL";

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub workflow_path: PathBuf,
    pub data_dir: Option<PathBuf>,
    pub user_token: Option<String>,
    pub app_token: Option<String>,
    pub seed: Option<u64>,
    pub strict_actions: bool,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    // Core settings
    pub workflow_path: PathBuf,
    /// Base directory for relative `filename`s in the workflow.
    pub data_dir: PathBuf,
    pub user_token: String,
    pub app_token: String,
    pub seed: Option<u64>,
    pub strict_actions: bool,

    // Feature configs (with defaults)
    pub endpoints: EndpointSettings,
    pub pacing: PacingSettings,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        if !cli.workflow_path.is_file() {
            bail!("Workflow file does not exist: {:?}", cli.workflow_path);
        }

        let data_dir = file
            .data_dir
            .map(PathBuf::from)
            .or_else(|| cli.data_dir.clone())
            .unwrap_or_else(|| {
                cli.workflow_path
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| PathBuf::from("."))
            });

        if !data_dir.is_dir() {
            bail!("data_dir is not a directory: {:?}", data_dir);
        }

        let user_token = file
            .user_token
            .or_else(|| cli.user_token.clone())
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "user_token must be specified via --user-token, MIXER_USER_TOKEN or in config file"
                )
            })?;

        // The public client falls back to the user's token when no app token is set.
        let app_token = file
            .app_token
            .or_else(|| cli.app_token.clone())
            .unwrap_or_else(|| user_token.clone());

        let seed = file.seed.or(cli.seed);
        let strict_actions = file.strict_actions.unwrap_or(cli.strict_actions);

        let ep_file = file.endpoints.unwrap_or_default();
        let defaults = EndpointSettings::default();
        let endpoints = EndpointSettings {
            catalog_api_url: ep_file.catalog_api_url.unwrap_or(defaults.catalog_api_url),
            embed_url: ep_file.embed_url.unwrap_or(defaults.embed_url),
            reccobeats_url: ep_file.reccobeats_url.unwrap_or(defaults.reccobeats_url),
            public_market: ep_file.public_market.unwrap_or(defaults.public_market),
            scraper_timeout: ep_file
                .scraper_timeout_sec
                .map(Duration::from_secs)
                .unwrap_or(defaults.scraper_timeout),
            features_timeout: ep_file
                .features_timeout_sec
                .map(Duration::from_secs)
                .unwrap_or(defaults.features_timeout),
        };

        let pacing_file = file.pacing.unwrap_or_default();
        let pacing_defaults = PacingSettings::default();
        let pacing = PacingSettings {
            search_pause: pacing_file
                .search_pause_ms
                .map(Duration::from_millis)
                .unwrap_or(pacing_defaults.search_pause),
            search_pause_every: pacing_file
                .search_pause_every
                .filter(|n| *n > 0)
                .unwrap_or(pacing_defaults.search_pause_every),
            primary_features_batch: pacing_file
                .primary_features_batch_ms
                .map(Duration::from_millis)
                .unwrap_or(pacing_defaults.primary_features_batch),
            secondary_features_batch: pacing_file
                .secondary_features_batch_ms
                .map(Duration::from_millis)
                .unwrap_or(pacing_defaults.secondary_features_batch),
            playlist_settle: pacing_file
                .playlist_settle_ms
                .map(Duration::from_millis)
                .unwrap_or(pacing_defaults.playlist_settle),
        };

        Ok(Self {
            workflow_path: cli.workflow_path.clone(),
            data_dir,
            user_token,
            app_token,
            seed,
            strict_actions,
            endpoints,
            pacing,
        })
    }

    /// Resolve a workflow `filename` against the data directory.
    pub fn data_path(&self, filename: &str) -> PathBuf {
        resolve_data_path(&self.data_dir, filename)
    }
}

pub fn resolve_data_path(data_dir: &Path, filename: &str) -> PathBuf {
    let path = Path::new(filename);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        data_dir.join(path)
    }
}

#[derive(Debug, Clone)]
pub struct EndpointSettings {
    pub catalog_api_url: String,
    pub embed_url: String,
    pub reccobeats_url: String,
    pub public_market: String,
    pub scraper_timeout: Duration,
    pub features_timeout: Duration,
}

impl Default for EndpointSettings {
    fn default() -> Self {
        Self {
            catalog_api_url: SPOTIFY_API_BASE.to_string(),
            embed_url: EMBED_PLAYLIST_BASE.to_string(),
            reccobeats_url: RECCOBEATS_API_BASE.to_string(),
            public_market: DEFAULT_PUBLIC_MARKET.to_string(),
            scraper_timeout: Duration::from_secs(15),
            features_timeout: Duration::from_secs(10),
        }
    }
}

/// Fixed delays that keep request rates under provider limits.
#[derive(Debug, Clone, PartialEq)]
pub struct PacingSettings {
    pub search_pause: Duration,
    /// Number of identity-repair searches between two `search_pause`s.
    pub search_pause_every: usize,
    pub primary_features_batch: Duration,
    pub secondary_features_batch: Duration,
    /// Pause between clearing a playlist and appending to it.
    pub playlist_settle: Duration,
}

impl PacingSettings {
    /// No delays at all. Used by tests.
    pub fn none() -> Self {
        Self {
            search_pause: Duration::ZERO,
            search_pause_every: 50,
            primary_features_batch: Duration::ZERO,
            secondary_features_batch: Duration::ZERO,
            playlist_settle: Duration::ZERO,
        }
    }
}

impl Default for PacingSettings {
    fn default() -> Self {
        Self {
            search_pause: Duration::from_millis(50),
            search_pause_every: 50,
            primary_features_batch: Duration::from_secs(1),
            secondary_features_batch: Duration::from_millis(100),
            playlist_settle: Duration::from_millis(500),
        }
    }
}

/// Sleep for `duration` unless it is zero.
pub fn pause(duration: Duration) {
    if !duration.is_zero() {
        std::thread::sleep(duration);
    }
}
