//! Tunables for one pack generation run. The defaults are load-bearing for
//! compression-ratio parity with packs produced by other stores, so change
//! them through configuration rather than editing the constants.

use serde::{Deserialize, Serialize};

/// Default sliding window size for delta search.
pub const DEFAULT_DELTA_SEARCH_WINDOW_SIZE: usize = 10;
/// Default byte budget for the shared delta cache.
pub const DEFAULT_DELTA_CACHE_SIZE: usize = 50 * 1024 * 1024;
/// Deltas at or below this size are always cached.
pub const DEFAULT_DELTA_CACHE_LIMIT: usize = 100;
/// Objects larger than this are never delta-compressed.
pub const DEFAULT_BIG_FILE_THRESHOLD: u64 = 50 * 1024 * 1024;
/// Maximum length of a delta chain.
pub const DEFAULT_MAX_DELTA_DEPTH: u32 = 50;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct PackConfig {
    /// Search for deltas between objects that have none yet. Disabling this
    /// still allows reusing deltas the store already holds.
    pub delta_compress: bool,
    /// Copy already-deflated whole objects from the store when offered.
    pub reuse_objects: bool,
    /// Copy already-encoded deltas from the store when their base is sent too
    /// (or assumed present, for thin packs).
    pub reuse_deltas: bool,
    /// Whether commit and tag deltas may be reused; trees and blobs always
    /// may.
    pub reuse_commit_deltas: bool,
    /// Encode delta bases as negative offsets instead of full object ids when
    /// the base precedes the delta in the stream.
    pub delta_base_as_offset: bool,
    /// Objects larger than this are excluded from delta search and written
    /// whole.
    pub big_file_threshold: u64,
    /// Byte budget shared by all delta-search tasks for retaining computed
    /// deltas until the writing phase.
    pub delta_cache_size: usize,
    /// Deltas at or below this length are always worth caching.
    pub delta_cache_limit: usize,
    /// How many recently deflated objects each search task keeps as candidate
    /// bases.
    pub delta_search_window_size: usize,
    /// Upper bound on the bytes of object content one window may pin in
    /// memory. 0 derives a bound from the window size.
    pub delta_search_memory_limit: u64,
    /// Longest allowed chain of deltas before an object must be stored whole.
    pub max_delta_depth: u32,
    /// Worker threads for the compressing phase. 0 uses all available cores.
    pub threads: usize,
    /// zlib compression level for freshly deflated payloads (0-9).
    pub compression_level: u32,
    /// Permit deltas whose base is not in the pack (receiver must have it).
    pub thin_pack: bool,
    /// Allow appending previously written packs verbatim when they cover part
    /// of the request.
    pub use_cached_packs: bool,
    /// Skip, rather than fail on, uninteresting/edge objects missing from the
    /// store during sizing.
    pub ignore_missing_uninteresting: bool,
    /// Traversal depth limit the caller applied for a shallow clone; recorded
    /// for statistics only, the writer packs whatever it is fed.
    pub shallow_depth: u32,
    /// Companion index version. 0 selects the oldest version compatible with
    /// the current hash kind.
    pub index_version: u32,
}

impl Default for PackConfig {
    fn default() -> Self {
        Self {
            delta_compress: true,
            reuse_objects: true,
            reuse_deltas: true,
            reuse_commit_deltas: false,
            delta_base_as_offset: false,
            big_file_threshold: DEFAULT_BIG_FILE_THRESHOLD,
            delta_cache_size: DEFAULT_DELTA_CACHE_SIZE,
            delta_cache_limit: DEFAULT_DELTA_CACHE_LIMIT,
            delta_search_window_size: DEFAULT_DELTA_SEARCH_WINDOW_SIZE,
            delta_search_memory_limit: 0,
            max_delta_depth: DEFAULT_MAX_DELTA_DEPTH,
            threads: 0,
            compression_level: 6,
            thin_pack: false,
            use_cached_packs: false,
            ignore_missing_uninteresting: false,
            shallow_depth: 0,
            index_version: 0,
        }
    }
}

impl PackConfig {
    /// Effective worker count for the compressing phase.
    pub fn effective_threads(&self) -> usize {
        if self.threads == 0 {
            num_cpus::get()
        } else {
            self.threads
        }
    }

    /// Effective per-window memory ceiling: the explicit limit, or one
    /// big-file-sized buffer per window slot plus the target being encoded.
    pub fn effective_search_memory_limit(&self) -> u64 {
        if self.delta_search_memory_limit > 0 {
            self.delta_search_memory_limit
        } else {
            (self.delta_search_window_size as u64 + 1).saturating_mul(self.big_file_threshold)
        }
    }
}
