//! Block-hash delta encoder that emits copy/insert instruction streams
//! compatible with `delta::decode`.
//!
//! The encoder indexes a base object by hashing fixed-size blocks of its
//! content into a table of block offsets ([`DeltaIndex`]). Encoding a target
//! scans it for blocks whose hash appears in the table, verifies the match
//! byte-for-byte, extends it greedily, and emits a copy instruction; bytes
//! between matches become insert instructions.

use ahash::AHashMap;

use super::utils::write_size_encoding;

/// Fixed block size for the content-hash table. Objects smaller than one
/// block cannot serve as a useful delta base or target.
pub const BLOCK_SIZE: usize = 16;

/// Maximum literal bytes one insert instruction can carry.
const DATA_INS_LEN: usize = 0x7f;
/// Maximum bytes one copy instruction can transfer (24-bit size field).
const MAX_COPY_LEN: usize = 0x00ff_ffff;
/// Cap on same-hash chain length; degenerate inputs (long runs of one byte)
/// would otherwise make every lookup scan thousands of candidates.
const MAX_CHAIN_LEN: usize = 64;

/// Multiplicative hash over one block of base content.
#[inline]
fn block_hash(block: &[u8]) -> u32 {
    let mut h: u32 = 0x811c_9dc5;
    for &b in block {
        h = h.wrapping_mul(31).wrapping_add(b as u32);
    }
    h
}

/// Incremental builder for the block-offset table of one base object.
///
/// Scans the base in non-overlapping blocks; each block's hash maps to the
/// list of offsets where a block with that hash starts. The table is
/// approximate on purpose: hash collisions are resolved by byte comparison
/// during encoding, never stored.
pub struct DeltaIndexScanner {
    table: AHashMap<u32, Vec<u32>>,
}

impl DeltaIndexScanner {
    fn new() -> Self {
        Self {
            table: AHashMap::new(),
        }
    }

    fn scan(mut self, base: &[u8]) -> AHashMap<u32, Vec<u32>> {
        if base.len() >= BLOCK_SIZE {
            for offset in (0..=base.len() - BLOCK_SIZE).step_by(BLOCK_SIZE) {
                let h = block_hash(&base[offset..offset + BLOCK_SIZE]);
                let chain = self.table.entry(h).or_default();
                if chain.len() < MAX_CHAIN_LEN {
                    chain.push(offset as u32);
                }
            }
        }
        self.table
    }
}

/// Immutable block-offset table over one base object's bytes.
///
/// Built once per window slot and queried for every target compared against
/// that base; never mutated after construction. The index does not retain the
/// base content, so the caller passes the same bytes back to [`DeltaIndex::encode`].
pub struct DeltaIndex {
    table: AHashMap<u32, Vec<u32>>,
    base_len: usize,
}

impl DeltaIndex {
    /// Index `base` for delta matching.
    pub fn new(base: &[u8]) -> Self {
        Self {
            table: DeltaIndexScanner::new().scan(base),
            base_len: base.len(),
        }
    }

    /// Number of bytes the indexed base holds.
    pub fn base_len(&self) -> usize {
        self.base_len
    }

    /// Encode `target` as a delta against `base`, which must be the same
    /// bytes this index was built from.
    ///
    /// Returns `None` when the resulting stream would exceed `max_size`,
    /// letting the window search abandon bases that cannot beat the best
    /// delta found so far.
    pub fn encode(&self, base: &[u8], target: &[u8], max_size: usize) -> Option<Vec<u8>> {
        debug_assert_eq!(base.len(), self.base_len);

        let mut delta = Vec::with_capacity(64);
        delta.extend(write_size_encoding(base.len()));
        delta.extend(write_size_encoding(target.len()));

        let mut tpos = 0;
        let mut pending_insert: Vec<u8> = Vec::new();

        while tpos < target.len() {
            if delta.len() + pending_insert.len() > max_size {
                return None;
            }

            if target.len() - tpos >= BLOCK_SIZE {
                let h = block_hash(&target[tpos..tpos + BLOCK_SIZE]);
                if let Some(src_offset) = self.find_match(base, target, tpos, h) {
                    let match_len = extend_match(base, src_offset, target, tpos);

                    flush_insert(&mut delta, &mut pending_insert);
                    emit_copy(&mut delta, src_offset, match_len);
                    tpos += match_len;
                    continue;
                }
            }

            // No block starts here; the byte joins the literal run.
            pending_insert.push(target[tpos]);
            tpos += 1;

            if pending_insert.len() == DATA_INS_LEN {
                flush_insert(&mut delta, &mut pending_insert);
            }
        }

        flush_insert(&mut delta, &mut pending_insert);

        if delta.len() > max_size {
            None
        } else {
            Some(delta)
        }
    }

    /// Resolve a target block hash to a verified base offset, preferring the
    /// candidate that yields the longest raw block run.
    fn find_match(&self, base: &[u8], target: &[u8], tpos: usize, h: u32) -> Option<usize> {
        let chain = self.table.get(&h)?;
        let block = &target[tpos..tpos + BLOCK_SIZE];
        let mut best: Option<(usize, usize)> = None;
        for &off in chain {
            let off = off as usize;
            if &base[off..off + BLOCK_SIZE] != block {
                continue;
            }
            let len = extend_match(base, off, target, tpos);
            match best {
                Some((_, best_len)) if best_len >= len => {}
                _ => best = Some((off, len)),
            }
        }
        best.map(|(off, _)| off)
    }
}

/// Extend a verified block match between base[src_off..] and target[tgt_off..]
/// as far as the shorter buffer allows.
fn extend_match(base: &[u8], src_off: usize, target: &[u8], tgt_off: usize) -> usize {
    let max_len = std::cmp::min(base.len() - src_off, target.len() - tgt_off);
    let mut len = BLOCK_SIZE;
    while len < max_len && base[src_off + len] == target[tgt_off + len] {
        len += 1;
    }
    len
}

/// Flush pending literal bytes as one or more insert instructions
/// (msb=0, lower 7 bits = literal length, followed by the literal bytes).
fn flush_insert(delta: &mut Vec<u8>, pending: &mut Vec<u8>) {
    let mut rest = pending.as_slice();
    while !rest.is_empty() {
        let chunk_len = std::cmp::min(rest.len(), DATA_INS_LEN);
        delta.push(chunk_len as u8);
        delta.extend_from_slice(&rest[..chunk_len]);
        rest = &rest[chunk_len..];
    }
    pending.clear();
}

/// Emit one or more copy instructions (msb=1, flag bits describe which
/// offset/size bytes follow; absent bytes decode to zero).
fn emit_copy(delta: &mut Vec<u8>, offset: usize, size: usize) {
    let mut off = offset;
    let mut remaining = size;
    while remaining > 0 {
        let chunk = std::cmp::min(remaining, MAX_COPY_LEN);

        let mut instruct: u8 = 0x80;
        let mut copy_data = Vec::with_capacity(7);

        let mut o = off;
        for i in 0..4 {
            let byte = (o & 0xff) as u8;
            if byte != 0 {
                instruct |= 1 << i;
                copy_data.push(byte);
            }
            o >>= 8;
        }

        let mut s = chunk;
        for i in 4..7 {
            let byte = (s & 0xff) as u8;
            if byte != 0 {
                instruct |= 1 << i;
                copy_data.push(byte);
            }
            s >>= 8;
        }

        delta.push(instruct);
        delta.extend_from_slice(&copy_data);

        off += chunk;
        remaining -= chunk;
    }
}

/// Build an index over `base` and encode `target` against it with no size
/// bound. Convenience for write-time recomputation and tests.
pub fn encode_delta(base: &[u8], target: &[u8]) -> Vec<u8> {
    DeltaIndex::new(base)
        .encode(base, target, usize::MAX)
        .expect("unbounded delta encode cannot fail")
}
