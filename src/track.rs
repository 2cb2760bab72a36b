//! One audio file as a field-addressable, undoable unit of metadata.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

use tracing::debug;

use crate::error::{ServiceError, TagError};
use crate::fingerprint::Fingerprinter;
use crate::tags::{self, Codec, Format, TagRecord};
use crate::types::{Field, FieldDiff, TagPatch};

/// A shared track reference. The core is single-threaded by design, so a
/// track can sit in several album views at once without duplicating the
/// underlying record.
pub type TrackHandle = Rc<RefCell<Track>>;

#[derive(Debug)]
pub struct Track {
    path: PathBuf,
    codec: &'static (dyn Codec + Sync),
    record: TagRecord,
    /// Field values at the last successful load or save.
    snapshot: BTreeMap<Field, String>,
    dirty: bool,
}

impl Track {
    /// Load a track through the format registry, capturing the initial
    /// snapshot. Propagates `UnsupportedFormat` and `CorruptFile` unchanged.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, TagError> {
        let path = path.into();
        let codec = tags::codec_for_path(&path)?;
        let record = codec.load(&path)?;
        let snapshot = record.fields().clone();
        Ok(Self {
            path,
            codec,
            record,
            snapshot,
            dirty: false,
        })
    }

    pub fn into_handle(self) -> TrackHandle {
        Rc::new(RefCell::new(self))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> Format {
        self.codec.format()
    }

    /// Track length, from the container's stream info.
    pub fn length(&self) -> Duration {
        self.record.stream_info().duration
    }

    /// Audio bitrate in kbps, when the container reports one.
    pub fn bitrate(&self) -> Option<u32> {
        self.record.stream_info().bitrate
    }

    /// The live value, or the empty string if the field is unset.
    pub fn get(&self, field: Field) -> &str {
        self.record.get(field)
    }

    /// The live value, `None` if the field is unset.
    pub fn lookup(&self, field: Field) -> Option<&str> {
        self.record.lookup(field)
    }

    /// Every live (field, value) pair, in field order.
    pub fn fields(&self) -> &BTreeMap<Field, String> {
        self.record.fields()
    }

    /// Stage a value in memory. Dirty is re-derived against the snapshot, so
    /// setting a field back to its saved value un-marks the track.
    pub fn set(&mut self, field: Field, value: impl Into<String>) {
        self.record.set(field, value);
        self.dirty = self.record.fields() != &self.snapshot;
    }

    /// Stage every field present in the patch. Absent fields are untouched.
    pub fn apply(&mut self, patch: &TagPatch) {
        for (field, value) in patch.entries() {
            self.set(field, value);
        }
    }

    /// True iff at least one live value differs from the snapshot.
    pub fn dirty(&self) -> bool {
        self.dirty
    }

    /// Restore live values to the last snapshot. Does not touch disk.
    pub fn reset(&mut self) {
        self.record.restore(&self.snapshot);
        self.dirty = false;
    }

    /// Write staged values to disk, then advance the snapshot. On failure
    /// live values and dirty state are left unchanged, so the call is
    /// retry-safe and never half-commits.
    pub fn save(&mut self) -> Result<(), TagError> {
        self.codec.save(&self.path, &self.record)?;
        self.snapshot = self.record.fields().clone();
        self.dirty = false;
        debug!(path = %self.path.display(), "saved tags");
        Ok(())
    }

    /// Unsaved edits as old→new diffs, in field order. Empty iff clean.
    pub fn pending_changes(&self) -> Vec<FieldDiff> {
        Field::ALL
            .iter()
            .filter_map(|&field| {
                let old = self.snapshot.get(&field).cloned();
                let new = self.record.lookup(field).map(str::to_string);
                (old != new).then_some(FieldDiff { field, old, new })
            })
            .collect()
    }

    /// Acoustic fingerprint of the underlying file, via the external
    /// collaborator. Never mutates track state, success or failure.
    pub fn fingerprint(&self, engine: &dyn Fingerprinter) -> Result<String, ServiceError> {
        engine.fingerprint(&self.path)
    }
}
