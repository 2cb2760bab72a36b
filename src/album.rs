//! Named, ordered groupings of tracks.

use std::collections::BTreeMap;

use crate::controller;
use crate::track::TrackHandle;
use crate::types::Field;

/// An ordered collection of track handles under one name. An album owns
/// membership, never track lifetime: the same handle may sit in several
/// album views at once (its natural album and an ad-hoc "Singles" grouping,
/// say) without duplicating the underlying file state.
#[derive(Clone, Default)]
pub struct Album {
    name: String,
    tracks: Vec<TrackHandle>,
}

impl Album {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tracks: Vec::new(),
        }
    }

    pub fn with_tracks(name: impl Into<String>, tracks: Vec<TrackHandle>) -> Self {
        Self {
            name: name.into(),
            tracks,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn push(&mut self, track: TrackHandle) {
        self.tracks.push(track);
    }

    pub fn tracks(&self) -> &[TrackHandle] {
        &self.tracks
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TrackHandle> {
        self.tracks.iter()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Membership by handle identity, not by tag equality.
    pub fn contains(&self, track: &TrackHandle) -> bool {
        self.tracks.iter().any(|t| std::rc::Rc::ptr_eq(t, track))
    }

    /// The shared-tag computation scoped to this album's tracks. Same
    /// algorithm as a controller-level query over a wider selection.
    pub fn shared_tags(&self) -> BTreeMap<Field, String> {
        controller::shared_fields(self.tracks.iter())
    }
}

impl<'a> IntoIterator for &'a Album {
    type Item = &'a TrackHandle;
    type IntoIter = std::slice::Iter<'a, TrackHandle>;

    fn into_iter(self) -> Self::IntoIter {
        self.tracks.iter()
    }
}
