//! Shared helpers for in-crate tests.
//!
//! FLAC is the one supported container simple enough to synthesize by hand:
//! a stream marker plus a single STREAMINFO block is a complete, parseable
//! file. All filesystem-level tests build on it.

use std::path::{Path, PathBuf};

use crate::tags::{Codec, FlacCodec};
use crate::types::Field;

/// A complete minimal FLAC container: "fLaC" marker, one STREAMINFO block
/// (44.1 kHz, stereo, 16-bit, one second of declared samples, no frames),
/// and a trailing PADDING block. The padding matters: lofty's FLAC writer
/// requires at least one block after STREAMINFO.
pub fn minimal_flac_bytes() -> Vec<u8> {
    let mut bytes = Vec::with_capacity(62);
    bytes.extend_from_slice(b"fLaC");
    // Block header: type 0 (STREAMINFO), more blocks follow, length 34.
    bytes.extend_from_slice(&[0x00, 0x00, 0x00, 0x22]);
    // Min/max block size: 4096 samples.
    bytes.extend_from_slice(&[0x10, 0x00, 0x10, 0x00]);
    // Min/max frame size: unknown.
    bytes.extend_from_slice(&[0x00; 6]);
    // 44100 Hz (20 bits), 2 channels (3 bits), 16 bps (5 bits),
    // 44100 total samples (36 bits).
    bytes.extend_from_slice(&[0x0A, 0xC4, 0x42, 0xF0, 0x00, 0x00, 0xAC, 0x44]);
    // MD5 of the (absent) audio data.
    bytes.extend_from_slice(&[0x00; 16]);
    // Block header: last-block flag set, type 1 (PADDING), length 16.
    bytes.extend_from_slice(&[0x81, 0x00, 0x00, 0x10]);
    bytes.extend_from_slice(&[0x00; 16]);
    bytes
}

pub fn write_minimal_flac(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, minimal_flac_bytes()).unwrap();
    path
}

/// Write a minimal FLAC carrying the given field values.
pub fn tagged_flac(dir: &Path, name: &str, fields: &[(Field, &str)]) -> PathBuf {
    let path = write_minimal_flac(dir, name);
    let mut record = FlacCodec.load(&path).unwrap();
    for &(field, value) in fields {
        record.set(field, value);
    }
    FlacCodec.save(&path, &record).unwrap();
    path
}
