use std::path::PathBuf;

use thiserror::Error;

use crate::types::Field;

/// Errors from the metadata core. Every variant is scoped to one file or one
/// remote call; nothing here is fatal to a batch.
#[derive(Debug, Error)]
pub enum TagError {
    /// File extension is not in the format registry.
    #[error("unsupported format \"{0}\"")]
    UnsupportedFormat(String),

    /// The container exists but cannot be parsed.
    #[error("cannot parse {path}: {reason}")]
    CorruptFile { path: PathBuf, reason: String },

    /// A field name outside the enumerated set reached the string boundary.
    #[error("unknown field \"{0}\"")]
    UnknownField(String),

    /// A staged value violates a format-specific rule. The save fails and
    /// the track stays dirty.
    #[error("invalid {field} \"{value}\" for {format}: {reason}")]
    FormatConstraint {
        field: Field,
        value: String,
        format: &'static str,
        reason: String,
    },

    /// Disk or permission failure. Retry-safe: the track stays dirty.
    #[error("I/O error: {0}")]
    Io(String),

    /// Failure in an external collaborator (fingerprinting, lookup).
    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl From<std::io::Error> for TagError {
    fn from(e: std::io::Error) -> Self {
        TagError::Io(e.to_string())
    }
}

/// Failure of a network- or process-bound collaborator. Surfaced to the
/// caller without mutating any track state; a batch continues past it.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Server-side failure, e.g. 503 from the lookup service.
    #[error("service returned HTTP {0}")]
    Status(u16),

    /// Could not reach the service at all.
    #[error("request failed: {0}")]
    Transport(String),

    /// Reached the service but could not make sense of the reply.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// An external tool (e.g. fpcalc) failed or is missing.
    #[error("{tool} failed: {message}")]
    Tool { tool: String, message: String },
}
