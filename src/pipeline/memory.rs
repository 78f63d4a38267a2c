use std::sync::Arc;

use super::step::Input;
use crate::catalog::Track;

/// A value written by one step.
#[derive(Clone, Debug)]
pub struct Binding {
    pub step: usize,
    pub name: String,
    pub tracks: Arc<[Track]>,
}

/// Variable store of a single run.
///
/// Bindings are never overwritten in place: a later step writing the same
/// name adds a newer binding that shadows the old one.
#[derive(Debug, Default)]
pub struct Memory {
    bindings: Vec<Binding>,
}

impl Memory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, step: usize, name: &str, tracks: Vec<Track>) {
        self.bindings.push(Binding {
            step,
            name: name.to_string(),
            tracks: tracks.into(),
        });
    }

    /// Newest value of `name`; empty when nothing was ever written to it.
    pub fn get(&self, name: &str) -> Arc<[Track]> {
        self.bindings
            .iter()
            .rev()
            .find(|b| b.name == name)
            .map(|b| b.tracks.clone())
            .unwrap_or_else(|| Arc::from(Vec::new()))
    }

    /// Concatenation of every named variable, in order.
    pub fn resolve(&self, input: &Input) -> Vec<Track> {
        input
            .names()
            .iter()
            .flat_map(|name| self.get(name).iter().cloned().collect::<Vec<_>>())
            .collect()
    }

    pub fn history(&self) -> &[Binding] {
        &self.bindings
    }
}
