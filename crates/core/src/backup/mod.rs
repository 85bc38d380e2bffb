//! Database backup and restore.
//!
//! - [`snapshot`] -- the portable snapshot format and collection filtering.
//! - [`codec`] -- JSON / gzip encoding with magic-byte detection.
//! - [`store`] -- the [`DocumentStore`](store::DocumentStore) trait the engines run against.
//! - [`export`] -- dumps user-data collections into a snapshot.
//! - [`restore`] -- replays a snapshot in merge or wipe mode, optionally dry.

pub mod codec;
pub mod export;
pub mod restore;
pub mod snapshot;
pub mod store;

#[cfg(test)]
pub(crate) mod memory;

/// Errors raised by the backup engines and codec.
#[derive(Debug, thiserror::Error)]
pub enum BackupError {
    /// The payload is not a snapshot this service produced.
    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("Unknown collection '{0}'")]
    UnknownCollection(String),

    #[error("Could not decode snapshot: {0}")]
    Decode(String),

    #[error("Could not encode snapshot: {0}")]
    Encode(String),

    /// A storage operation failed.
    #[error("Store error: {0}")]
    Store(String),
}
