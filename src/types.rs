use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TagError;

/// The closed set of editable metadata fields. Nothing outside this set is
/// addressable through the tag layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Artist,
    Album,
    Title,
    #[serde(rename = "tracknumber")]
    TrackNumber,
    Date,
    Genre,
}

impl Field {
    pub const ALL: &[Self] = &[
        Self::Artist,
        Self::Album,
        Self::Title,
        Self::TrackNumber,
        Self::Date,
        Self::Genre,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Artist => "artist",
            Self::Album => "album",
            Self::Title => "title",
            Self::TrackNumber => "tracknumber",
            Self::Date => "date",
            Self::Genre => "genre",
        }
    }

    pub fn from_name(s: &str) -> Option<Self> {
        match s {
            "artist" => Some(Self::Artist),
            "album" => Some(Self::Album),
            "title" => Some(Self::Title),
            "tracknumber" => Some(Self::TrackNumber),
            "date" => Some(Self::Date),
            "genre" => Some(Self::Genre),
            _ => None,
        }
    }

    /// Comma-separated list of all field names (for error messages and help text).
    pub fn all_names_csv() -> String {
        Self::ALL.iter().map(|f| f.as_str()).collect::<Vec<_>>().join(", ")
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Field {
    type Err = TagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| TagError::UnknownField(s.to_string()))
    }
}

/// A set of staged field values for batch retagging. `None` means "leave the
/// field alone" — a patch cannot express a delete.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracknumber: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
}

impl TagPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        match field {
            Field::Artist => self.artist.as_deref(),
            Field::Album => self.album.as_deref(),
            Field::Title => self.title.as_deref(),
            Field::TrackNumber => self.tracknumber.as_deref(),
            Field::Date => self.date.as_deref(),
            Field::Genre => self.genre.as_deref(),
        }
    }

    pub fn set(&mut self, field: Field, value: impl Into<String>) {
        let value = Some(value.into());
        match field {
            Field::Artist => self.artist = value,
            Field::Album => self.album = value,
            Field::Title => self.title = value,
            Field::TrackNumber => self.tracknumber = value,
            Field::Date => self.date = value,
            Field::Genre => self.genre = value,
        }
    }

    /// The (field, value) pairs actually present in the patch, in field order.
    pub fn entries(&self) -> Vec<(Field, &str)> {
        Field::ALL
            .iter()
            .filter_map(|&f| self.get(f).map(|v| (f, v)))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        Field::ALL.iter().all(|&f| self.get(f).is_none())
    }

    /// Parse a single `field=value` assignment. The field name must be one of
    /// the enumerated set; anything else fails with `UnknownField`.
    pub fn parse_assignment(raw: &str) -> Result<(Field, String), TagError> {
        let (name, value) = raw
            .split_once('=')
            .ok_or_else(|| TagError::UnknownField(raw.to_string()))?;
        let field: Field = name.parse()?;
        Ok((field, value.to_string()))
    }

    /// Build a patch from a list of `field=value` assignments. Later
    /// assignments to the same field win.
    pub fn from_assignments<S: AsRef<str>>(assignments: &[S]) -> Result<Self, TagError> {
        let mut patch = Self::new();
        for raw in assignments {
            let (field, value) = Self::parse_assignment(raw.as_ref())?;
            patch.set(field, value);
        }
        Ok(patch)
    }
}

/// One field's unsaved edit: the last-saved value against the live value.
/// `None` means the field is absent on that side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldDiff {
    pub field: Field,
    pub old: Option<String>,
    pub new: Option<String>,
}
