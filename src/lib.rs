//! Pack-Engine: a high-performance Rust library for generating version-control
//! pack files from a content-addressed object store—delta search, caching,
//! as-is reuse, and streaming pack/index output.
//!
//! Goals
//! - Turn an ordered set of reachable objects into a single compact pack stream.
//! - Re-compress as little as possible: reuse stored deltas and whole objects,
//!   reuse entire cached packs when they cover the request.
//! - Parallelize the CPU-bound delta search without changing which objects are
//!   written or in what order.
//!
//! Core Capabilities
//! - Delta compression: windowed, block-hash based search (`DeltaWindow`,
//!   `DeltaIndex`), bounded chain depth, smallest-delta-wins with a
//!   shallower-chain tie-break.
//! - Caching & memory: byte-budgeted `DeltaCache` handing out weak handles;
//!   every lookup is fallible and a vanished entry is recomputed at write time.
//! - Reuse: `ObjectReuseAsIs` lets the backing store offer already-encoded
//!   representations; `CachedPack` lets whole packs be appended verbatim.
//! - Output: pack header, per-object headers (offset or reference delta
//!   bases), zlib payloads, CRC32 per entry, whole-stream hash trailer, and an
//!   optional `.idx` companion via `IdxBuilder`.
//!
//! Modules
//! - `internal::pack`: the writer, delta window/cache/tasks, output stream,
//!   progress and statistics.
//! - `internal::object`: the object type enumeration shared across modules.
//! - `delta`: block-hash delta encoder/decoder toolkit.
//! - `errors`: unified error types.
//! - `hash`: object id helpers.
//! - `utils`: common utilities (e.g. the streaming `HashAlgorithm`).
//!
//! Typical Usage
//! - Feed `PackWriter::prepare_pack` with the traversal's `CountedObject`s,
//!   then `write_pack` into any `std::io::Write` sink.
//! - Collect `IndexEntry` records from the writer and hand them to
//!   `IdxBuilder::write_idx` for the companion index.

pub mod delta;
pub mod errors;
pub mod hash;
pub mod internal;
pub mod utils;

mod config;

// Core types that external users implement/use to drive a pack generation run.
pub use config::PackConfig;
pub use internal::pack::entry::{CountedObject, Entry, path_hash};
pub use internal::pack::progress::{NoProgress, PackPhase, ProgressMonitor};
pub use internal::pack::representation::{
    AsIsCopy, CachedPack, ObjectReuseAsIs, ObjectSource, StoredFormat,
    StoredObjectRepresentation,
};
pub use internal::pack::writer::{PackStats, PackWriter};
