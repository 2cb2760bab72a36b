//! Acoustic fingerprinting through an external analyzer binary.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::error::ServiceError;

/// Produces an acoustic fingerprint for an audio file. The fpcalc runner is
/// the production implementation; tests substitute stubs.
pub trait Fingerprinter {
    fn fingerprint(&self, path: &Path) -> Result<String, ServiceError>;
}

/// Runs Chromaprint's `fpcalc` as a subprocess and reads its JSON output.
pub struct FpcalcFingerprinter {
    binary: PathBuf,
}

#[derive(Debug, Deserialize)]
struct FpcalcOutput {
    fingerprint: String,
    #[allow(dead_code)]
    duration: f64,
}

impl FpcalcFingerprinter {
    pub fn new() -> Self {
        Self {
            binary: PathBuf::from("fpcalc"),
        }
    }

    /// Use a specific analyzer binary instead of resolving `fpcalc` on PATH.
    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for FpcalcFingerprinter {
    fn default() -> Self {
        Self::new()
    }
}

impl Fingerprinter for FpcalcFingerprinter {
    fn fingerprint(&self, path: &Path) -> Result<String, ServiceError> {
        let output = std::process::Command::new(&self.binary)
            .arg("-json")
            .arg(path)
            .output()
            .map_err(|e| ServiceError::Tool {
                tool: "fpcalc".to_string(),
                message: format!("failed to start {}: {e}", self.binary.display()),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let stderr = if stderr.is_empty() {
                "(no stderr output)".to_string()
            } else {
                stderr
            };
            return Err(ServiceError::Tool {
                tool: "fpcalc".to_string(),
                message: format!("analysis failed for '{}': {stderr}", path.display()),
            });
        }

        let parsed = parse_fpcalc_stdout(&output.stdout)?;
        debug!(path = %path.display(), "fingerprinted");
        Ok(parsed.fingerprint)
    }
}

fn parse_fpcalc_stdout(stdout: &[u8]) -> Result<FpcalcOutput, ServiceError> {
    let text = std::str::from_utf8(stdout)
        .map_err(|e| ServiceError::Malformed(format!("fpcalc stdout was not valid UTF-8: {e}")))?;
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::Malformed(
            "fpcalc stdout was empty".to_string(),
        ));
    }
    serde_json::from_str(trimmed)
        .map_err(|e| ServiceError::Malformed(format!("failed to parse fpcalc JSON output: {e}")))
}
