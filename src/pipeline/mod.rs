//! Pipeline Execution Engine and Transform Library.

mod executor;
mod genre;
mod memory;
mod save;
mod step;
pub mod transforms;

pub use executor::{PipelineExecutor, RunSummary, StepReport};
pub use genre::{fetch_artist_genres, filter_genre, ARTIST_BATCH_SIZE};
pub use memory::{Binding, Memory};
pub use save::{default_playlist_name, PlaylistWriter, SaveTarget, WRITE_BATCH_SIZE};
pub use step::{
    Action, GenreMode, Input, SeasonCase, Workflow, WorkflowError, WorkflowStep, DEFAULT_OUTPUT,
};
