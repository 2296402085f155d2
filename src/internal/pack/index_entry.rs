//! One record of the companion index: where an object landed in the pack and
//! the CRC32 guarding its entry bytes.

use serde::{Deserialize, Serialize};

use crate::hash::ObjectHash;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IndexEntry {
    pub hash: ObjectHash,
    pub crc32: u32,
    pub offset: u64, // 64-bit because offsets may exceed 32-bit
}

impl IndexEntry {
    pub fn new(hash: ObjectHash, crc32: u32, offset: u64) -> Self {
        IndexEntry {
            hash,
            crc32,
            offset,
        }
    }
}
