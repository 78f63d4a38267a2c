//! Boundary to the remote music catalog.
//!
//! Everything behind `CatalogApi` is an external collaborator: authentication
//! and transport live there, the rest of the crate only sees tracks, pages
//! and `CatalogError`s.

mod client;
mod error;
pub mod models;
mod source_ref;

pub use client::{CatalogApi, SpotifyClient, SPOTIFY_API_BASE};
pub use error::CatalogError;
pub use models::{
    track_id_from_reference, Artist, ArtistRef, AudioFeatures, Page, PlaylistSummary, Track,
    NUMERIC_ATTRS, TRACK_URI_PREFIX,
};
pub use source_ref::{SourceRef, TimeRange, CURATED_PREFIX};
