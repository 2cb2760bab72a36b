//! Batch retagging core for local music collections.
//!
//! The crate presents one audio file as a [`Track`] — a field-addressable,
//! undoable unit of metadata — and lets callers treat a whole [`Album`] or an
//! arbitrary mixed selection as a single editable unit. Per-format tag
//! storage is hidden behind the [`tags::Codec`] seam; fingerprinting and
//! metadata lookup are external collaborators behind narrow traits.

pub mod album;
pub mod cli;
pub mod controller;
pub mod error;
pub mod fingerprint;
pub mod musicbrainz;
pub mod scan;
pub mod tags;
pub mod track;
pub mod types;

#[cfg(test)]
pub mod testutil;

pub use album::Album;
pub use controller::{ScanOutcome, Selected, SkippedFile};
pub use error::{ServiceError, TagError};
pub use fingerprint::Fingerprinter;
pub use musicbrainz::MetadataLookup;
pub use scan::FileLister;
pub use track::{Track, TrackHandle};
pub use types::{Field, FieldDiff, TagPatch};
