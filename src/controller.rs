//! Library-level operations over tracks and albums: loading, directory
//! grouping, shared-tag queries and batch retagging. Everything here stages
//! edits in memory; callers decide when each track writes to disk.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tracing::{info, warn};

use crate::album::Album;
use crate::error::TagError;
use crate::scan::FileLister;
use crate::track::{Track, TrackHandle};
use crate::types::{Field, TagPatch};

/// Name given to the catch-all album for tracks that carry no usable
/// album field, or that don't group with anything in their directory.
pub const SINGLES: &str = "Singles";

/// One item of a mixed track/album selection.
pub enum Selected<'a> {
    Track(&'a TrackHandle),
    Album(&'a Album),
}

impl<'a> From<&'a TrackHandle> for Selected<'a> {
    fn from(track: &'a TrackHandle) -> Self {
        Selected::Track(track)
    }
}

impl<'a> From<&'a Album> for Selected<'a> {
    fn from(album: &'a Album) -> Self {
        Selected::Album(album)
    }
}

/// A file the scan could not load, with the reason it was passed over.
pub struct SkippedFile {
    pub path: PathBuf,
    pub error: TagError,
}

/// The result of grouping a directory tree into albums.
pub struct ScanOutcome {
    /// Albums with at least one member, in deterministic (path, name) order.
    pub albums: Vec<Album>,
    /// The catch-all album. May be empty.
    pub singles: Album,
    /// Files that matched a supported extension but failed to load.
    pub skipped: Vec<SkippedFile>,
}

impl ScanOutcome {
    pub fn track_count(&self) -> usize {
        self.albums.iter().map(Album::len).sum::<usize>() + self.singles.len()
    }
}

/// Load one file into a shareable track handle.
pub fn build_track(path: impl Into<PathBuf>) -> Result<TrackHandle, TagError> {
    Ok(Track::open(path)?.into_handle())
}

/// Scan `root` and group every supported file into albums.
///
/// Two tracks land in the same album iff they sit in the same directory and
/// carry the same non-empty album field. Tracks without an album field, and
/// tracks whose album field nothing else in their directory matches, fall
/// into the shared "Singles" album. Files that fail to load are reported in
/// the outcome rather than aborting the scan; only the directory listing
/// itself can fail the whole call.
pub fn build_albums(
    root: &Path,
    recursive: bool,
    lister: &dyn FileLister,
) -> Result<ScanOutcome, TagError> {
    let paths = lister.list(root, recursive)?;

    let mut groups: BTreeMap<(PathBuf, String), Album> = BTreeMap::new();
    let mut singles = Album::new(SINGLES);
    let mut skipped = Vec::new();

    for path in paths {
        let track = match build_track(&path) {
            Ok(track) => track,
            Err(error) => {
                warn!(path = %path.display(), %error, "skipping unreadable file");
                skipped.push(SkippedFile { path, error });
                continue;
            }
        };

        let album_name = track.borrow().get(Field::Album).to_string();
        if album_name.is_empty() {
            singles.push(track);
            continue;
        }

        let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        groups
            .entry((dir, album_name.clone()))
            .or_insert_with(|| Album::new(album_name))
            .push(track);
    }

    // An album is a grouping of at least two tracks; a lone track is a
    // single even when it names an album.
    let mut albums = Vec::new();
    for album in groups.into_values() {
        if let [track] = album.tracks() {
            singles.push(track.clone());
        } else {
            albums.push(album);
        }
    }
    info!(
        root = %root.display(),
        albums = albums.len(),
        singles = singles.len(),
        skipped = skipped.len(),
        "grouped directory"
    );
    Ok(ScanOutcome {
        albums,
        singles,
        skipped,
    })
}

/// Build an album directly from a set of handles. With no explicit name the
/// album field the tracks agree on is used; if they disagree (or none carry
/// one) the name is left empty for the caller to fill in.
pub fn album_from_tracks(tracks: Vec<TrackHandle>, name: Option<String>) -> Album {
    let name = name.unwrap_or_else(|| {
        shared_fields(tracks.iter())
            .remove(&Field::Album)
            .unwrap_or_default()
    });
    Album::with_tracks(name, tracks)
}

/// Fields on which every track in the selection agrees with the same
/// non-empty value. A track that lacks a field (or carries it empty)
/// counts as disagreement. Albums are flattened to their member tracks and
/// a track appearing more than once is only considered once.
pub fn find_shared_tags(selection: &[Selected<'_>]) -> BTreeMap<Field, String> {
    let mut seen: Vec<TrackHandle> = Vec::new();
    let mut consider = |track: &TrackHandle| {
        if !seen.iter().any(|t| Rc::ptr_eq(t, track)) {
            seen.push(track.clone());
        }
    };
    for item in selection {
        match item {
            Selected::Track(track) => consider(track),
            Selected::Album(album) => album.iter().for_each(&mut consider),
        }
    }
    shared_fields(seen.iter())
}

/// Core of the shared-tag query: seed with the first track's non-empty
/// values, then drop every field a later track contradicts.
pub(crate) fn shared_fields<'a, I>(tracks: I) -> BTreeMap<Field, String>
where
    I: IntoIterator<Item = &'a TrackHandle>,
{
    let mut tracks = tracks.into_iter();
    let Some(first) = tracks.next() else {
        return BTreeMap::new();
    };

    let mut shared: BTreeMap<Field, String> = first
        .borrow()
        .fields()
        .iter()
        .filter(|(_, v)| !v.is_empty())
        .map(|(&f, v)| (f, v.clone()))
        .collect();

    for track in tracks {
        if shared.is_empty() {
            break;
        }
        let track = track.borrow();
        shared.retain(|&field, value| track.lookup(field) == Some(value.as_str()));
    }
    shared
}

/// Stage a patch on one track. Nothing is written to disk.
pub fn retag_track(track: &TrackHandle, patch: &TagPatch) {
    track.borrow_mut().apply(patch);
}

/// Stage a patch on every track of an album. Nothing is written to disk.
pub fn retag_album(album: &Album, patch: &TagPatch) {
    for track in album {
        track.borrow_mut().apply(patch);
    }
}
