use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use pezzottify_mixer::catalog::{CatalogApi, SpotifyClient};
use pezzottify_mixer::config::{AppConfig, CliConfig, FileConfig};
use pezzottify_mixer::features::{AudioFilter, CatalogFeatureSource, ReccoBeatsClient};
use pezzottify_mixer::pipeline::{PipelineExecutor, PlaylistWriter, Workflow};
use pezzottify_mixer::resolve::{EmbedScraper, Hydrator, TrackResolver};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    if path_buf.is_absolute() {
        return Ok(path_buf);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(path_buf))
}

#[derive(Parser, Debug)]
#[command(name = "mixer", about = "Runs a playlist workflow against the catalog")]
struct CliArgs {
    /// Path to the workflow JSON file.
    #[clap(value_parser = parse_path)]
    pub workflow: PathBuf,

    /// Path to a TOML config file. Values there override CLI arguments.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Bearer token of the acting user.
    #[clap(long, env = "MIXER_USER_TOKEN", hide_env_values = true)]
    pub user_token: Option<String>,

    /// Bearer token for public catalog reads. Defaults to the user token.
    #[clap(long, env = "MIXER_APP_TOKEN", hide_env_values = true)]
    pub app_token: Option<String>,

    /// Seed for every random transform, for reproducible runs.
    #[clap(long)]
    pub seed: Option<u64>,

    /// Reject workflows that use unknown actions instead of skipping them.
    #[clap(long)]
    pub strict_actions: bool,

    /// Base directory for relative file names in the workflow.
    /// Defaults to the workflow's directory.
    #[clap(long, value_parser = parse_path)]
    pub data_dir: Option<PathBuf>,
}

fn build_executor(config: &AppConfig) -> Result<PipelineExecutor> {
    let endpoints = &config.endpoints;
    let pacing = &config.pacing;

    let user: Arc<dyn CatalogApi> = Arc::new(
        SpotifyClient::new(&endpoints.catalog_api_url, &config.user_token)
            .context("Failed to build user catalog client")?,
    );
    let public: Arc<dyn CatalogApi> = Arc::new(
        SpotifyClient::new(&endpoints.catalog_api_url, &config.app_token)
            .context("Failed to build public catalog client")?,
    );
    let scraper = Arc::new(
        EmbedScraper::new(&endpoints.embed_url, endpoints.scraper_timeout)
            .context("Failed to build embed scraper")?,
    );
    let reccobeats = ReccoBeatsClient::new(
        &endpoints.reccobeats_url,
        endpoints.features_timeout,
        pacing.primary_features_batch,
    )
    .context("Failed to build ReccoBeats client")?;

    let resolver = TrackResolver::new(
        user.clone(),
        public,
        scraper,
        Hydrator::new(user.clone(), pacing.clone()),
        endpoints.public_market.clone(),
    );
    let audio = AudioFilter::new(
        Box::new(reccobeats),
        CatalogFeatureSource::new(user.clone(), pacing.secondary_features_batch),
    );
    let writer = PlaylistWriter::new(user.clone(), pacing.playlist_settle);

    let executor = PipelineExecutor::new(user, resolver, audio, writer, &config.data_dir);
    Ok(match config.seed {
        Some(seed) => {
            info!("Using fixed seed {}", seed);
            executor.with_seed(seed)
        }
        None => executor,
    })
}

fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading config from {:?}", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };

    let cli_config = CliConfig {
        workflow_path: cli_args.workflow,
        data_dir: cli_args.data_dir,
        user_token: cli_args.user_token,
        app_token: cli_args.app_token,
        seed: cli_args.seed,
        strict_actions: cli_args.strict_actions,
    };
    let config = AppConfig::resolve(&cli_config, file_config)?;

    info!("Loading workflow {:?}...", config.workflow_path);
    let workflow = Workflow::load(&config.workflow_path)
        .with_context(|| format!("Invalid workflow {:?}", config.workflow_path))?;
    workflow.validate(config.strict_actions)?;

    let mut executor = build_executor(&config)?;
    let summary = executor.run(&workflow);

    for report in &summary.reports {
        info!(
            "  #{} {} -> {}: {} tracks",
            report.index, report.action, report.output, report.tracks
        );
    }
    if summary.unknown_actions > 0 {
        info!("{} steps used unknown actions", summary.unknown_actions);
    }

    Ok(())
}
