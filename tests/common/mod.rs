//! Common test infrastructure
//!
//! Builds a [`PipelineExecutor`] over an in-memory catalog so workflows can
//! run end to end without touching the network.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::{TestMixer, PLAYLIST_MAIN};
//!
//! #[test]
//! fn test_source() {
//!     let mut mixer = TestMixer::new();
//!     mixer.run(r#"{"workflow": [{"action": "source", "id": "mainPlaylist"}]}"#);
//! }
//! ```

mod catalog;
mod constants;

use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use pezzottify_mixer::catalog::{Artist, Track};
use pezzottify_mixer::config::PacingSettings;
use pezzottify_mixer::features::{AudioFilter, CatalogFeatureSource, FeatureRecord};
use pezzottify_mixer::pipeline::{PipelineExecutor, PlaylistWriter, RunSummary, Workflow};
use pezzottify_mixer::resolve::{Hydrator, TrackResolver};

#[allow(unused_imports)]
pub use catalog::{make_track, CannedFeatures, InMemoryCatalog, NoScraper};
pub use constants::*;

/// An executor wired to an in-memory catalog plus a scratch data directory.
pub struct TestMixer {
    pub catalog: Arc<InMemoryCatalog>,
    pub data_dir: TempDir,
    pub executor: PipelineExecutor,
}

#[allow(dead_code)]
impl TestMixer {
    pub fn new() -> Self {
        Self::with_features(Vec::new())
    }

    pub fn with_features(records: Vec<FeatureRecord>) -> Self {
        let catalog = Arc::new(default_catalog());
        let data_dir = TempDir::new().expect("Failed to create temp dir");

        let resolver = TrackResolver::new(
            catalog.clone(),
            catalog.clone(),
            Arc::new(NoScraper),
            Hydrator::new(catalog.clone(), PacingSettings::none()),
            "NL",
        );
        let audio = AudioFilter::new(
            Box::new(CannedFeatures { records }),
            CatalogFeatureSource::new(catalog.clone(), Duration::ZERO),
        );
        let writer = PlaylistWriter::new(catalog.clone(), Duration::ZERO);
        let executor =
            PipelineExecutor::new(catalog.clone(), resolver, audio, writer, data_dir.path())
                .with_seed(1234)
                .with_today(NaiveDate::from_ymd_opt(2026, 7, 15).expect("valid date"));

        Self {
            catalog,
            data_dir,
            executor,
        }
    }

    pub fn run(&mut self, workflow_json: &str) -> RunSummary {
        let workflow = Workflow::from_json(workflow_json).expect("Invalid test workflow");
        self.executor.run(&workflow)
    }

    pub fn get(&self, name: &str) -> Vec<Track> {
        self.executor.memory().get(name).to_vec()
    }

    pub fn write_file(&self, name: &str, content: &str) {
        std::fs::write(self.data_dir.path().join(name), content).expect("Failed to write file");
    }
}

fn default_catalog() -> InMemoryCatalog {
    let mut catalog = InMemoryCatalog::default();

    let main: Vec<Track> = (0..MAIN_TRACK_COUNT)
        .map(|i| {
            let artist = if i < 3 {
                SHARED_ARTIST.to_string()
            } else {
                format!("artist-{}", i)
            };
            make_track(&format!("main{}", i), &artist, (i * 10) as u32)
        })
        .collect();
    let extra: Vec<Track> = (0..EXTRA_TRACK_COUNT)
        .map(|i| make_track(&format!("extra{}", i), &format!("extra-artist-{}", i), 50))
        .collect();

    catalog.artists.insert(
        SHARED_ARTIST.to_string(),
        Artist {
            id: SHARED_ARTIST.to_string(),
            name: "Shared".to_string(),
            genres: vec!["deep house".to_string()],
        },
    );
    catalog
        .readable
        .insert(PLAYLIST_CURATED.to_string(), extra[..2].to_vec());
    catalog.readable.insert(PLAYLIST_MAIN.to_string(), main);
    catalog.readable.insert(PLAYLIST_EXTRA.to_string(), extra);
    catalog
}
