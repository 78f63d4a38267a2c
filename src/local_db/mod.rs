//! Local Database Sync.
//!
//! A database is a JSON file `{ "tracks": [entry, ...] }` whose entries are
//! unique by id. Entries are either track-shaped or artist-shaped; both load
//! back as `Track`s so artist databases work as blacklists.

mod store;
mod sync;

pub use store::{DbArtist, DbEntry, LocalDatabase, LocalDbError};
pub use sync::{contributed_ids, LocalDbSync, StoreType, SyncMode};
