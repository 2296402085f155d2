//! Contracts between the pack writer and the backing object database: byte
//! and size access, candidate stored representations for as-is reuse, and
//! wholesale reuse of previously written packs.

use std::io::Write;
use std::sync::Arc;

use crate::{errors::PackError, hash::ObjectHash};

/// How the backing store currently holds one copy of an object's bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoredFormat {
    /// Already encoded as a delta inside some pack.
    PackDelta,
    /// Already deflated as a whole object inside some pack.
    PackWhole,
    /// Some other encoding (e.g. loose); usable only by re-encoding.
    Other,
}

/// One candidate encoding of an object as offered by the object database.
///
/// Transient: produced per candidate, consumed immediately by the writer's
/// selection pass and then discarded.
#[derive(Debug, Clone)]
pub struct StoredObjectRepresentation {
    pub format: StoredFormat,
    /// Stored (compressed) size of this copy, used to prefer the smaller of
    /// two whole copies.
    pub weight: u32,
    /// Base object id when `format` is [`StoredFormat::PackDelta`].
    pub delta_base: Option<ObjectHash>,
}

impl StoredObjectRepresentation {
    pub fn whole(weight: u32) -> Self {
        Self {
            format: StoredFormat::PackWhole,
            weight,
            delta_base: None,
        }
    }

    pub fn delta(weight: u32, base: ObjectHash) -> Self {
        Self {
            format: StoredFormat::PackDelta,
            weight,
            delta_base: Some(base),
        }
    }
}

/// Raw payload handed back for an as-is copy: the deflated bytes exactly as
/// stored, plus the inflated length the entry header must declare.
pub struct AsIsCopy {
    pub inflated_size: u64,
    pub deflated: Vec<u8>,
}

/// Read access the writer requires from the backing object database.
///
/// `read_object` returns whole, uncompressed content; delta search and fresh
/// deflation work from it. Implementations are queried from multiple worker
/// threads during the compressing phase.
pub trait ObjectSource: Send + Sync {
    /// Whether the store currently holds the object.
    fn contains(&self, id: &ObjectHash) -> bool;

    /// Uncompressed content size, or `None` when the object is missing.
    fn object_size(&self, id: &ObjectHash) -> Option<u64>;

    /// Whole uncompressed content.
    fn read_object(&self, id: &ObjectHash) -> Result<Vec<u8>, PackError>;

    /// As-is reuse capability, when the store supports it.
    fn reuse(&self) -> Option<&dyn ObjectReuseAsIs> {
        None
    }
}

/// Optional capability of the object database: offer already-encoded
/// representations the writer can copy into the output without
/// decompressing/recompressing, and enumerate reusable cached packs.
pub trait ObjectReuseAsIs: Send + Sync {
    /// All candidate stored representations for `id`, one per copy the store
    /// holds (an object present in several source packs yields several).
    fn representations(&self, id: &ObjectHash) -> Vec<StoredObjectRepresentation>;

    /// Fetch the raw stored payload for a representation previously offered.
    ///
    /// Returns [`PackError::RepresentationGone`] when the copy vanished in
    /// the meantime (e.g. a concurrent repack); the writer then re-selects
    /// once before giving up.
    fn copy_as_is(
        &self,
        id: &ObjectHash,
        rep: &StoredObjectRepresentation,
    ) -> Result<AsIsCopy, PackError>;

    /// Previously written packs that may be appended to the output verbatim.
    fn cached_packs(&self) -> Vec<Arc<dyn CachedPack>> {
        Vec::new()
    }
}

/// An externally supplied descriptor of a previously written pack whose
/// entries can be appended wholesale instead of re-encoding its objects.
pub trait CachedPack: Send + Sync {
    /// Number of objects the pack contributes to the output count.
    fn object_count(&self) -> u64;

    /// Tip object ids the pack guarantees to contain transitively.
    fn tips(&self) -> Vec<ObjectHash>;

    /// Whether the pack contains `id`.
    fn has_object(&self, id: &ObjectHash) -> bool;

    /// Append the pack's entry bytes (no header, no trailer) to `out`,
    /// returning the number of bytes written.
    fn copy_pack(&self, out: &mut dyn Write) -> Result<u64, PackError>;
}
