//! Pezzottify Mixer Library
//!
//! Playlist curation over a remote music catalog: source resolution with a
//! tiered fallback chain, audio-feature matching across two providers, a
//! JSON-backed local database, and a step-sequenced transform pipeline.

pub mod catalog;
pub mod config;
pub mod features;
pub mod local_db;
pub mod pipeline;
pub mod resolve;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types for convenience
pub use catalog::{CatalogApi, CatalogError, SpotifyClient, Track};
pub use config::AppConfig;
pub use pipeline::{PipelineExecutor, RunSummary, Workflow};
pub use resolve::{HydrateMode, TrackResolver};
