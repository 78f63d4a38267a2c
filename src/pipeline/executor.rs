//! Pipeline executor.
//!
//! Runs workflow steps strictly in order. Every step reads its inputs from
//! [`Memory`], applies one action and binds the result under its `output`.
//! Provider failures degrade results, they never stop a run.

use chrono::{Datelike, Local, NaiveDate};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

use super::genre::filter_genre;
use super::memory::Memory;
use super::save::{PlaylistWriter, SaveTarget};
use super::step::{Action, SeasonCase, Workflow, WorkflowStep};
use super::transforms;
use crate::catalog::{CatalogApi, Track};
use crate::config::resolve_data_path;
use crate::features::{AudioBounds, AudioFilter, AudioFilterParams};
use crate::local_db::LocalDbSync;
use crate::resolve::{HydrateMode, TrackResolver};

/// Size of one step's output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StepReport {
    pub index: usize,
    pub action: String,
    pub output: String,
    pub tracks: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub steps_executed: usize,
    pub comments: usize,
    pub unknown_actions: usize,
    pub reports: Vec<StepReport>,
}

/// Executes workflows against a catalog.
pub struct PipelineExecutor {
    catalog: Arc<dyn CatalogApi>,
    resolver: TrackResolver,
    audio: AudioFilter,
    writer: PlaylistWriter,
    data_dir: PathBuf,
    rng: StdRng,
    today: Option<NaiveDate>,
    memory: Memory,
}

impl PipelineExecutor {
    pub fn new(
        catalog: Arc<dyn CatalogApi>,
        resolver: TrackResolver,
        audio: AudioFilter,
        writer: PlaylistWriter,
        data_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            catalog,
            resolver,
            audio,
            writer,
            data_dir: data_dir.into(),
            rng: StdRng::from_os_rng(),
            today: None,
            memory: Memory::new(),
        }
    }

    /// Use a fixed seed for every random transform.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Pin the date seen by `season`.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Local::now().date_naive())
    }

    pub fn run(&mut self, workflow: &Workflow) -> RunSummary {
        info!("--- Mixer started ({} steps) ---", workflow.steps.len());
        let mut summary = RunSummary::default();

        for step in &workflow.steps {
            if let Some(comment) = &step.comment {
                info!("[{}]", comment);
                summary.comments += 1;
            }
            let Some(action) = &step.action else {
                continue;
            };

            let tag = step.tag.clone().unwrap_or_default();
            info!("> Action: {} -> {}", tag.to_uppercase(), step.output);

            if matches!(action, Action::Unknown) {
                warn!("Unknown action '{}', binding an empty list", tag);
                summary.unknown_actions += 1;
            }

            let result = self.execute(step, action);
            summary.reports.push(StepReport {
                index: step.index,
                action: tag,
                output: step.output.clone(),
                tracks: result.len(),
            });
            summary.steps_executed += 1;
            self.memory.bind(step.index, &step.output, result);
        }

        info!(
            "--- Mixer finished: {} steps executed ---",
            summary.steps_executed
        );
        summary
    }

    fn execute(&mut self, step: &WorkflowStep, action: &Action) -> Vec<Track> {
        match action {
            Action::Source { id, name, hydrate } => {
                let tracks = self.resolver.resolve(id, name.as_deref(), *hydrate);
                info!("Fetched {} tracks (hydrate: {:?})", tracks.len(), hydrate);
                tracks
            }
            Action::SourceFile { filename, hydrate } => {
                let path = resolve_data_path(&self.data_dir, filename);
                let tracks = self.resolver.resolve_file(&path, *hydrate);
                info!("File: {} items (hydrate: {:?})", tracks.len(), hydrate);
                tracks
            }
            Action::SyncLocalDb {
                id,
                filename,
                mode,
                store_type,
                clear_source,
            } => {
                let path = resolve_data_path(&self.data_dir, filename);
                LocalDbSync::new(&self.resolver, self.catalog.as_ref())
                    .sync(id, &path, *mode, *store_type, *clear_source)
                    .iter()
                    .map(|entry| entry.to_track())
                    .collect()
            }
            Action::Slice { input, amount } => {
                let result = transforms::slice(&self.memory.resolve(input), *amount);
                info!("First {} taken", result.len());
                result
            }
            Action::Sample { input, amount } => {
                let result = transforms::sample(&self.memory.resolve(input), *amount, &mut self.rng);
                info!("Sampled {} tracks", result.len());
                result
            }
            Action::Mix { inputs } => {
                let result = transforms::mix(self.memory.resolve(inputs), &mut self.rng);
                info!("Mixed: {} tracks", result.len());
                result
            }
            Action::Inject {
                input,
                inject_input,
                every,
                variance,
            } => {
                let base = self.memory.resolve(input);
                let pool = self.memory.resolve(inject_input);
                info!("Injecting {} tracks every ~{} tracks", pool.len(), every);
                let result = transforms::inject(&base, &pool, *every, *variance, &mut self.rng);
                info!("Injection complete. Total: {} tracks", result.len());
                result
            }
            Action::Dedup { input } => {
                let result = transforms::dedup(&self.memory.resolve(input));
                info!("Dedup: {} remaining", result.len());
                result
            }
            Action::FilterExclude {
                input,
                exclude_input,
            } => {
                let tracks = self.memory.resolve(input);
                let result = transforms::filter_exclude(&tracks, &self.memory.resolve(exclude_input));
                info!("Exclude filter: {} removed", tracks.len() - result.len());
                result
            }
            Action::FilterArtist {
                input,
                blacklist_input,
            } => {
                let tracks = self.memory.resolve(input);
                let result =
                    transforms::filter_artist(&tracks, &self.memory.resolve(blacklist_input));
                info!("Artist filter: {} removed", tracks.len() - result.len());
                result
            }
            Action::FilterGenre {
                input,
                genres,
                mode,
            } => {
                let result = filter_genre(
                    self.catalog.as_ref(),
                    &self.memory.resolve(input),
                    genres,
                    *mode,
                );
                info!("Genre filter: {} remaining", result.len());
                result
            }
            Action::FilterAudio {
                input,
                min_bpm,
                max_bpm,
                min_energy,
                max_energy,
                fallback,
            } => {
                let params = AudioFilterParams {
                    bounds: AudioBounds {
                        min_bpm: *min_bpm,
                        max_bpm: *max_bpm,
                        min_energy: *min_energy,
                        max_energy: *max_energy,
                    },
                    fallback: fallback.clone(),
                };
                self.audio.apply(&self.memory.resolve(input), &params)
            }
            Action::WeightedShuffle {
                input,
                by,
                factor,
                reverse,
            } => transforms::weighted_shuffle(
                &self.memory.resolve(input),
                by,
                *factor,
                *reverse,
                &mut self.rng,
            ),
            Action::Sort { input, by, reverse } => {
                transforms::sort(&self.memory.resolve(input), by, *reverse)
            }
            Action::ArtistSeparation {
                input,
                min_distance,
            } => {
                let result = transforms::artist_separation(
                    &self.memory.resolve(input),
                    *min_distance,
                    &mut self.rng,
                );
                info!("Separation ready. Length: {}", result.len());
                result
            }
            Action::Season { cases, sample } => self.season(cases, *sample),
            Action::Save {
                input,
                id,
                create_new,
                name,
                description,
                shuffle,
            } => {
                let tracks = self.memory.resolve(input);
                let mut to_write = tracks.clone();
                if *shuffle {
                    to_write.shuffle(&mut self.rng);
                }
                let target = SaveTarget {
                    id: id.clone(),
                    create_new: *create_new,
                    name: name.clone(),
                    description: description.clone(),
                };
                if let Err(e) = self.writer.write(&to_write, &target) {
                    error!("Save error in step {}: {}", step.index, e);
                }
                tracks
            }
            Action::Unknown => Vec::new(),
        }
    }

    fn season(&mut self, cases: &[SeasonCase], sample: Option<usize>) -> Vec<Track> {
        let today = self.today();
        let month = today.month();
        info!("Date check: {} (month: {})", today.format("%Y-%m-%d"), month);

        let Some(case) = cases.iter().find(|c| c.months.contains(&month)) else {
            info!("No season active");
            return Vec::new();
        };
        info!(
            "Season '{}' is active",
            case.name.as_deref().unwrap_or("unnamed")
        );

        let mut result = Vec::new();
        for source in &case.sources {
            info!("Fetching source: {}", source);
            result.extend(self.resolver.resolve(source, None, HydrateMode::Auto));
        }

        match sample {
            Some(limit) if limit > 0 && result.len() > limit => {
                let sampled = transforms::sample(&result, limit, &mut self.rng);
                info!("Sampled {} tracks", sampled.len());
                sampled
            }
            _ => result,
        }
    }
}
