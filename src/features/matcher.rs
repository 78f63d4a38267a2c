//! Joins feature-provider records to tracks.
//!
//! Records are matched by ISRC first. Records without a usable ISRC fall back
//! to the catalog track id embedded in their `href`.

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::HashMap;

use crate::catalog::Track;

const TRACK_HREF_MARKER: &str = "spotify.com/track/";

/// One record of audio attributes from a feature provider.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct FeatureRecord {
    #[serde(default)]
    pub isrc: Option<String>,
    #[serde(default)]
    pub href: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub tempo: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub energy: Option<Value>,
}

/// Keeps an explicit `null` distinct from an absent field.
fn present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

/// Absent reads as 0. Null, or text that is not a number, is unparsable.
fn numeric(value: Option<&Value>) -> Option<f64> {
    match value {
        None => Some(0.0),
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        Some(_) => None,
    }
}

impl FeatureRecord {
    /// `(tempo, energy)`, or `None` when either is unparsable.
    pub fn values(&self) -> Option<(f64, f64)> {
        Some((numeric(self.tempo.as_ref())?, numeric(self.energy.as_ref())?))
    }

    /// Catalog track id from `href`, if it points at a catalog track.
    pub fn href_track_id(&self) -> Option<&str> {
        let href = self.href.as_deref()?;
        if !href.contains(TRACK_HREF_MARKER) {
            return None;
        }
        let tail = href.rsplit("track/").next()?;
        tail.split('?').next().filter(|id| !id.is_empty())
    }
}

/// Inclusive tempo and energy ranges.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AudioBounds {
    pub min_bpm: f64,
    pub max_bpm: f64,
    pub min_energy: f64,
    pub max_energy: f64,
}

impl Default for AudioBounds {
    fn default() -> Self {
        Self {
            min_bpm: 0.0,
            max_bpm: 999.0,
            min_energy: 0.0,
            max_energy: 1.0,
        }
    }
}

impl AudioBounds {
    pub fn contains(&self, bpm: f64, energy: f64) -> bool {
        (self.min_bpm..=self.max_bpm).contains(&bpm)
            && (self.min_energy..=self.max_energy).contains(&energy)
    }
}

/// Result of matching: annotated copies of every input track, and the
/// indices that passed the range test in the order they were accepted.
#[derive(Clone, Debug, Default)]
pub struct AudioMatch {
    pub tracks: Vec<Track>,
    pub passed: Vec<usize>,
}

impl AudioMatch {
    pub fn found(&self, index: usize) -> bool {
        self.tracks.get(index).map(|t| t.audio_found).unwrap_or(false)
    }

    pub fn passing(&self) -> Vec<Track> {
        self.passed.iter().map(|&i| self.tracks[i].clone()).collect()
    }

    /// Indices no provider answered for.
    pub fn unmatched(&self) -> Vec<usize> {
        (0..self.tracks.len()).filter(|&i| !self.found(i)).collect()
    }
}

pub fn match_audio_features(
    tracks: &[Track],
    records: &[FeatureRecord],
    bounds: &AudioBounds,
) -> AudioMatch {
    let mut result = AudioMatch {
        tracks: tracks.to_vec(),
        passed: Vec::new(),
    };

    let mut by_isrc: HashMap<&str, Vec<usize>> = HashMap::new();
    for (idx, track) in tracks.iter().enumerate() {
        if let Some(isrc) = track.isrc() {
            by_isrc.entry(isrc).or_default().push(idx);
        }
    }

    for record in records {
        let matched: Vec<usize> = match record.isrc.as_deref().and_then(|i| by_isrc.get(i)) {
            Some(indices) => indices.clone(),
            None => match record.href_track_id() {
                Some(id) => (0..tracks.len()).filter(|&i| tracks[i].id == id).collect(),
                None => continue,
            },
        };

        let Some((bpm, energy)) = record.values() else {
            continue;
        };

        for idx in matched {
            let track = &mut result.tracks[idx];
            track.audio_found = true;
            if bounds.contains(bpm, energy) {
                track.bpm = Some(bpm);
                track.energy = Some(energy);
                if !result.passed.contains(&idx) {
                    result.passed.push(idx);
                }
            }
        }
    }

    result
}
