//! Error types for the Pack-Engine crate.
//!
//! This module defines a unified error enumeration used across counting,
//! representation selection, delta search, and pack/index writing. It
//! integrates with `thiserror` to provide rich `Display` implementations and
//! error source chaining where applicable.
//!
//! Notes:
//! - Each variant carries contextual details via its message payload.
//! - Per-object anomalies (tolerated missing objects, delta cycles, cache
//!   misses) are handled inside the writer and never appear here; these
//!   variants are run-aborting by definition.

use thiserror::Error;

use crate::hash::ObjectHash;

#[derive(Error, Debug)]
/// Unified error enumeration for the Pack-Engine library.
///
/// - Used across counting, sizing, delta search and pack/index writing.
/// - Implements `std::error::Error` via `thiserror`.
pub enum PackError {
    /// A required object was not found in the backing store.
    #[error("Can't find required object: {0}")]
    ObjectNotFound(ObjectHash),

    /// A reuse representation vanished after the single retry allowed.
    #[error("Stored representation for {0} disappeared during writing")]
    RepresentationGone(ObjectHash),

    /// As-is bytes failed validation while being copied into the output.
    #[error("Corrupt stored data for object {0}: {1}")]
    CorruptObject(ObjectHash, String),

    /// The run was cancelled through the progress monitor.
    #[error("Pack generation was cancelled")]
    Cancelled,

    /// The writer was asked to produce a second pack.
    #[error("PackWriter is single-use; {0}")]
    WriterExhausted(String),

    /// Delta encode/apply failed while recomputing a payload.
    #[error("Delta error for object {0}: {1}")]
    DeltaFailure(ObjectHash, String),

    /// A worker thread died during the compressing phase.
    #[error("Delta search task failed: {0}")]
    TaskFailure(String),

    /// Invalid or unsupported object type in a pack entry header.
    #[error("The `{0}` is not a valid pack object type.")]
    InvalidObjectType(String),

    /// Failed to encode pack entries.
    #[error("Can't encode entries to pack: {0}")]
    PackEncodeError(String),

    /// Invalid index entry set handed to the index builder.
    #[error("Index conversion failed: {0}")]
    ConversionError(String),

    /// I/O error from the underlying reader or writer.
    #[error("IO Error: {0}")]
    IOError(#[from] std::io::Error),
}
