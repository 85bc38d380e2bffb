//! Snapshot encoding. Exports are pretty-printed JSON, optionally gzipped;
//! imports sniff the gzip magic bytes so either form can be uploaded.

use std::io::{Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use super::snapshot::{Snapshot, SNAPSHOT_TYPE};
use super::BackupError;

/// First two bytes of every gzip stream.
pub const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// How far a gzipped upload may inflate relative to the upload limit.
pub const MAX_INFLATE_RATIO: usize = 16;

/// Limit on the decoded JSON size for uploads capped at `upload_limit` bytes.
pub fn inflated_limit(upload_limit: usize) -> usize {
    upload_limit.saturating_mul(MAX_INFLATE_RATIO)
}

pub fn is_gzip(bytes: &[u8]) -> bool {
    bytes.starts_with(&GZIP_MAGIC)
}

pub fn encode_snapshot(snapshot: &Snapshot, gzip: bool) -> Result<Vec<u8>, BackupError> {
    let json =
        serde_json::to_vec_pretty(snapshot).map_err(|e| BackupError::Encode(e.to_string()))?;
    if !gzip {
        return Ok(json);
    }

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(&json)
        .map_err(|e| BackupError::Encode(e.to_string()))?;
    encoder.finish().map_err(|e| BackupError::Encode(e.to_string()))
}

/// Decode an uploaded snapshot, gzipped or plain.
///
/// The meta block is checked on the raw JSON before full deserialization so a
/// foreign file reports "invalid snapshot" rather than a shape error.
///
/// A gzipped payload may inflate to at most `max_json_bytes`.
pub fn decode_snapshot(bytes: &[u8], max_json_bytes: usize) -> Result<Snapshot, BackupError> {
    let inflated;
    let json: &[u8] = if is_gzip(bytes) {
        let cap = u64::try_from(max_json_bytes).unwrap_or(u64::MAX).saturating_add(1);
        let mut buf = Vec::new();
        GzDecoder::new(bytes)
            .take(cap)
            .read_to_end(&mut buf)
            .map_err(|e| BackupError::Decode(format!("gzip: {e}")))?;
        if buf.len() > max_json_bytes {
            return Err(BackupError::Decode(format!(
                "snapshot exceeds {max_json_bytes} bytes once decompressed"
            )));
        }
        inflated = buf;
        &inflated
    } else {
        bytes
    };

    let value: serde_json::Value =
        serde_json::from_slice(json).map_err(|e| BackupError::Decode(e.to_string()))?;

    let kind = value
        .get("meta")
        .and_then(|m| m.get("type"))
        .and_then(|t| t.as_str());
    match kind {
        Some(SNAPSHOT_TYPE) => {}
        Some(other) => {
            return Err(BackupError::InvalidSnapshot(format!(
                "expected meta.type '{SNAPSHOT_TYPE}', found '{other}'"
            )))
        }
        None => {
            return Err(BackupError::InvalidSnapshot(
                "missing meta.type".to_string(),
            ))
        }
    }

    serde_json::from_value(value).map_err(|e| BackupError::Decode(e.to_string()))
}
