//! Audio Feature Matcher.
//!
//! Tempo and energy come from two independent providers: ReccoBeats, joined
//! by ISRC, and the catalog's own feature endpoint for whatever the first one
//! did not know about.

mod breaker;
mod filter;
mod matcher;
mod reccobeats;

pub use breaker::{BreakerState, CatalogFeatureSource, CircuitBreaker, SECONDARY_BATCH_SIZE};
pub use filter::{AudioFilter, AudioFilterParams, NO_FALLBACK};
pub use matcher::{match_audio_features, AudioBounds, AudioMatch, FeatureRecord};
pub use reccobeats::{FeatureProvider, ReccoBeatsClient, PRIMARY_BATCH_SIZE, RECCOBEATS_API_BASE};
