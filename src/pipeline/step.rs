//! Workflow file format.
//!
//! ```json
//! { "workflow": [ { "action": "source", "id": "...", "output": "a" }, ... ] }
//! ```
//!
//! Each step is parsed into a closed [`Action`]. Tags outside the known set
//! become [`Action::Unknown`]; whether that is an error is decided by
//! [`Workflow::validate`].

use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::local_db::{StoreType, SyncMode};
use crate::resolve::HydrateMode;

pub const DEFAULT_OUTPUT: &str = "temp";

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("Could not read workflow {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Workflow is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Workflow has no \"workflow\" step list")]
    MissingSteps,

    #[error("Step {index}: {message}")]
    InvalidStep { index: usize, message: String },

    #[error("Step {index}: unknown action '{action}'")]
    UnknownAction { index: usize, action: String },
}

/// One variable name or an ordered list of them.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Input {
    One(String),
    Many(Vec<String>),
}

impl Input {
    pub fn names(&self) -> &[String] {
        match self {
            Input::One(name) => std::slice::from_ref(name),
            Input::Many(names) => names,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenreMode {
    #[default]
    Include,
    Exclude,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct SeasonCase {
    #[serde(default)]
    pub name: Option<String>,
    pub months: Vec<u32>,
    #[serde(default)]
    pub sources: Vec<String>,
}

fn default_every() -> usize {
    10
}

fn default_variance() -> usize {
    4
}

fn default_min_distance() -> usize {
    3
}

fn default_attr() -> String {
    "popularity".to_string()
}

fn default_factor() -> f64 {
    50.0
}

fn default_max_bpm() -> f64 {
    999.0
}

fn default_max_energy() -> f64 {
    1.0
}

fn yes() -> bool {
    true
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    Source {
        id: String,
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        hydrate: HydrateMode,
    },
    SourceFile {
        filename: String,
        #[serde(default)]
        hydrate: HydrateMode,
    },
    SyncLocalDb {
        id: String,
        filename: String,
        #[serde(default)]
        mode: SyncMode,
        #[serde(default)]
        store_type: StoreType,
        #[serde(default = "yes")]
        clear_source: bool,
    },
    Slice {
        input: Input,
        amount: usize,
    },
    Sample {
        input: Input,
        amount: usize,
    },
    Mix {
        #[serde(alias = "input")]
        inputs: Input,
    },
    Inject {
        input: Input,
        inject_input: Input,
        #[serde(default = "default_every")]
        every: usize,
        #[serde(default = "default_variance")]
        variance: usize,
    },
    Dedup {
        input: Input,
    },
    FilterExclude {
        input: Input,
        exclude_input: Input,
    },
    FilterArtist {
        input: Input,
        blacklist_input: Input,
    },
    FilterGenre {
        input: Input,
        genres: Vec<String>,
        #[serde(default)]
        mode: GenreMode,
    },
    FilterAudio {
        input: Input,
        #[serde(default)]
        min_bpm: f64,
        #[serde(default = "default_max_bpm")]
        max_bpm: f64,
        #[serde(default)]
        min_energy: f64,
        #[serde(default = "default_max_energy")]
        max_energy: f64,
        #[serde(default)]
        fallback: Option<String>,
    },
    WeightedShuffle {
        input: Input,
        #[serde(default = "default_attr")]
        by: String,
        #[serde(default = "default_factor")]
        factor: f64,
        #[serde(default = "yes")]
        reverse: bool,
    },
    Sort {
        input: Input,
        #[serde(default = "default_attr")]
        by: String,
        #[serde(default = "yes")]
        reverse: bool,
    },
    ArtistSeparation {
        input: Input,
        #[serde(default = "default_min_distance")]
        min_distance: usize,
    },
    Season {
        #[serde(default)]
        cases: Vec<SeasonCase>,
        #[serde(default)]
        sample: Option<usize>,
    },
    Save {
        input: Input,
        #[serde(default)]
        id: Option<String>,
        #[serde(default)]
        create_new: bool,
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        description: Option<String>,
        #[serde(default)]
        shuffle: bool,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Clone, Debug, PartialEq)]
pub struct WorkflowStep {
    pub index: usize,
    pub output: String,
    pub comment: Option<String>,
    /// Raw `action` tag as written, if any.
    pub tag: Option<String>,
    pub action: Option<Action>,
}

impl WorkflowStep {
    pub fn from_value(index: usize, value: Value) -> Result<Self, WorkflowError> {
        let invalid = |message: String| WorkflowError::InvalidStep { index, message };

        let Value::Object(map) = value else {
            return Err(invalid("step is not an object".to_string()));
        };

        let output = string_field(&map, "output")
            .map_err(invalid)?
            .unwrap_or_else(|| DEFAULT_OUTPUT.to_string());
        let comment = string_field(&map, "comment").map_err(invalid)?;
        let tag = string_field(&map, "action").map_err(invalid)?;

        let action = match &tag {
            Some(_) => Some(
                serde_json::from_value::<Action>(Value::Object(map))
                    .map_err(|e| invalid(e.to_string()))?,
            ),
            None => None,
        };

        Ok(Self {
            index,
            output,
            comment,
            tag,
            action,
        })
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self.action, Some(Action::Unknown))
    }
}

fn string_field(map: &Map<String, Value>, key: &str) -> Result<Option<String>, String> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(format!("'{}' must be a string, got {}", key, other)),
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Workflow {
    pub steps: Vec<WorkflowStep>,
}

impl Workflow {
    pub fn load(path: &Path) -> Result<Self, WorkflowError> {
        let text = std::fs::read_to_string(path).map_err(|source| WorkflowError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Parse a workflow document. Keys other than `workflow` are ignored.
    pub fn from_json(text: &str) -> Result<Self, WorkflowError> {
        let mut document: Value = serde_json::from_str(text)?;
        let Some(Value::Array(raw_steps)) = document.get_mut("workflow").map(Value::take) else {
            return Err(WorkflowError::MissingSteps);
        };

        let steps = raw_steps
            .into_iter()
            .enumerate()
            .map(|(index, value)| WorkflowStep::from_value(index, value))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { steps })
    }

    /// With `strict_actions`, reject steps whose action tag is not known.
    pub fn validate(&self, strict_actions: bool) -> Result<(), WorkflowError> {
        if !strict_actions {
            return Ok(());
        }
        match self.steps.iter().find(|s| s.is_unknown()) {
            Some(step) => Err(WorkflowError::UnknownAction {
                index: step.index,
                action: step.tag.clone().unwrap_or_default(),
            }),
            None => Ok(()),
        }
    }
}
