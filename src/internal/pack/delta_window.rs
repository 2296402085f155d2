//! Sliding-window delta search over one contiguous slice of the sorted
//! candidate list.
//!
//! The window holds the full content of recently processed objects plus a
//! [`DeltaIndex`] per slot. Each new object is compared against every window
//! member of its type, keeping the smallest delta found; on a size tie the
//! shallower chain wins. Successful targets are inserted into the window so
//! later objects may delta against them; the oldest entry is evicted when
//! the window is full or over its memory ceiling.

use std::{
    collections::VecDeque,
    sync::atomic::{AtomicU64, Ordering},
};

use ahash::AHashMap;

use crate::{
    config::PackConfig,
    delta::{BLOCK_SIZE, DeltaIndex},
    errors::PackError,
    hash::ObjectHash,
    internal::pack::{
        delta_cache::ThreadSafeDeltaCache, output::deflate, progress::ProgressMonitor,
        representation::ObjectSource, to_pack::ObjectToPack,
    },
};

struct DeltaWindowEntry {
    /// Position of the base in the slice being searched.
    slot: usize,
    buffer: Vec<u8>,
    index: DeltaIndex,
}

struct BestDelta {
    delta: Vec<u8>,
    slot: usize,
    depth: u32,
}

/// One delta search instance. Owns no objects; mutates only the slice it is
/// given, which is why disjoint slices can be searched in parallel.
pub(crate) struct DeltaWindow<'a> {
    config: &'a PackConfig,
    cache: &'a ThreadSafeDeltaCache,
    source: &'a dyn ObjectSource,
    monitor: &'a dyn ProgressMonitor,
    counter: &'a AtomicU64,
    window: VecDeque<DeltaWindowEntry>,
    loaded: u64,
}

impl<'a> DeltaWindow<'a> {
    pub fn new(
        config: &'a PackConfig,
        cache: &'a ThreadSafeDeltaCache,
        source: &'a dyn ObjectSource,
        monitor: &'a dyn ProgressMonitor,
        counter: &'a AtomicU64,
    ) -> Self {
        Self {
            config,
            cache,
            source,
            monitor,
            counter,
            window: VecDeque::new(),
            loaded: 0,
        }
    }

    /// Search the whole slice in order. Edge objects are indexed as bases but
    /// never encoded themselves.
    pub fn search(&mut self, list: &mut [ObjectToPack]) -> Result<(), PackError> {
        let ids: AHashMap<ObjectHash, usize> = list
            .iter()
            .enumerate()
            .map(|(i, o)| (o.id(), i))
            .collect();

        for i in 0..list.len() {
            if self.monitor.is_cancelled() {
                return Err(PackError::Cancelled);
            }
            self.counter.fetch_add(1, Ordering::Relaxed);
            self.monitor.update(1);

            if list[i].is_do_not_delta() || list[i].is_reuse_as_is() || list[i].is_delta() {
                continue;
            }

            let buffer = match self.source.read_object(&list[i].id()) {
                Ok(buffer) => buffer,
                Err(err) => {
                    // One unreadable candidate does not sink the run; it is
                    // simply written whole later (or skipped, if edge).
                    tracing::warn!(id = %list[i].id(), %err, "candidate unreadable, excluded from delta search");
                    list[i].set_do_not_delta();
                    continue;
                }
            };
            if buffer.len() as u64 > self.config.big_file_threshold {
                list[i].set_do_not_delta();
                continue;
            }

            if !list[i].is_edge() {
                self.search_one(i, list, &buffer, &ids)?;
                list[i].set_delta_attempted();
            }
            self.insert(i, buffer);
        }
        Ok(())
    }

    /// Try every window member as a base for `list[slot]`, newest first.
    fn search_one(
        &mut self,
        slot: usize,
        list: &mut [ObjectToPack],
        target_buf: &[u8],
        ids: &AHashMap<ObjectHash, usize>,
    ) -> Result<(), PackError> {
        if target_buf.len() < BLOCK_SIZE {
            list[slot].set_do_not_delta();
            return Ok(());
        }

        let target_id = list[slot].id();
        let target_type = list[slot].obj_type();
        let mut best: Option<BestDelta> = None;
        // A delta only pays off below the raw content size; once something is
        // found, later bases must match it to compete (equal length falls to
        // the depth tie-break).
        let mut bound = target_buf.len() - 1;

        for entry in self.window.iter().rev() {
            let base = &list[entry.slot];
            if base.obj_type() != target_type {
                continue;
            }
            let depth = base.depth() + 1;
            if depth > self.config.max_delta_depth {
                continue;
            }
            if forms_cycle(target_id, entry.slot, list, ids, self.config.max_delta_depth) {
                continue;
            }

            if let Some(delta) = entry.index.encode(&entry.buffer, target_buf, bound) {
                let better = match &best {
                    None => true,
                    Some(b) => {
                        delta.len() < b.delta.len()
                            || (delta.len() == b.delta.len() && depth < b.depth)
                    }
                };
                if better {
                    bound = delta.len();
                    best = Some(BestDelta {
                        delta,
                        slot: entry.slot,
                        depth,
                    });
                }
            }
        }

        if let Some(b) = best {
            let base_id = list[b.slot].id();
            let raw_len = b.delta.len();
            let src_weight = list[b.slot].weight();
            let res_weight = list[slot].weight();

            let cached = if self.cache.can_cache(raw_len, src_weight, res_weight) {
                let deflated = deflate(&b.delta, self.config.compression_level)?;
                let actual = deflated.len();
                Some(self.cache.cache(deflated, actual, raw_len))
            } else {
                None
            };

            list[slot].select_delta(base_id, b.depth, raw_len as u64, cached);
            list[slot].set_weight(raw_len.min(u32::MAX as usize) as u32);
        }
        Ok(())
    }

    /// Add a processed object as a candidate base, evicting the oldest when
    /// the window overflows its slot count or memory ceiling.
    fn insert(&mut self, slot: usize, buffer: Vec<u8>) {
        self.loaded += buffer.len() as u64;
        let index = DeltaIndex::new(&buffer);
        self.window.push_back(DeltaWindowEntry {
            slot,
            buffer,
            index,
        });

        let max_slots = self.config.delta_search_window_size.max(1);
        let mem_limit = self.config.effective_search_memory_limit();
        while self.window.len() > max_slots || (self.loaded > mem_limit && self.window.len() > 1) {
            let old = self
                .window
                .pop_front()
                .expect("window cannot be empty here");
            self.loaded -= old.buffer.len() as u64;
        }
    }
}

/// Whether choosing `base_slot` as the base of `target_id` would close a
/// delta chain back onto the target.
fn forms_cycle(
    target_id: ObjectHash,
    base_slot: usize,
    list: &[ObjectToPack],
    ids: &AHashMap<ObjectHash, usize>,
    max_depth: u32,
) -> bool {
    let mut current = Some(base_slot);
    let mut hops = 0;
    while let Some(slot) = current {
        if list[slot].id() == target_id {
            return true;
        }
        hops += 1;
        if hops > max_depth {
            return false;
        }
        current = list[slot]
            .delta_base()
            .and_then(|base| ids.get(&base).copied());
    }
    false
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicU64;

    use ahash::AHashMap;

    use super::DeltaWindow;
    use crate::{
        config::PackConfig,
        errors::PackError,
        hash::{HashKind, ObjectHash, set_hash_kind_for_test},
        internal::{
            object::types::ObjectType,
            pack::{
                delta_cache::ThreadSafeDeltaCache,
                progress::NoProgress,
                representation::ObjectSource,
                to_pack::ObjectToPack,
            },
        },
    };

    struct MemSource {
        objects: AHashMap<ObjectHash, Vec<u8>>,
    }

    impl MemSource {
        fn new(contents: &[&[u8]]) -> (Self, Vec<ObjectHash>) {
            let mut objects = AHashMap::new();
            let mut ids = Vec::new();
            for content in contents {
                let id = ObjectHash::new(content);
                objects.insert(id, content.to_vec());
                ids.push(id);
            }
            (Self { objects }, ids)
        }
    }

    impl ObjectSource for MemSource {
        fn contains(&self, id: &ObjectHash) -> bool {
            self.objects.contains_key(id)
        }

        fn object_size(&self, id: &ObjectHash) -> Option<u64> {
            self.objects.get(id).map(|d| d.len() as u64)
        }

        fn read_object(&self, id: &ObjectHash) -> Result<Vec<u8>, PackError> {
            self.objects
                .get(id)
                .cloned()
                .ok_or(PackError::ObjectNotFound(*id))
        }
    }

    fn candidates(ids: &[ObjectHash], source: &MemSource) -> Vec<ObjectToPack> {
        ids.iter()
            .map(|id| {
                let mut o = ObjectToPack::new(*id, ObjectType::Blob, 1, false);
                let size = source.object_size(id).unwrap();
                o.set_size(size);
                o.set_weight(size.min(u32::MAX as u64) as u32);
                o
            })
            .collect()
    }

    /// Returns the cache so handles held by the searched objects stay alive
    /// for the caller's assertions.
    fn run_search(
        list: &mut [ObjectToPack],
        source: &MemSource,
        config: &PackConfig,
    ) -> ThreadSafeDeltaCache {
        let cache = ThreadSafeDeltaCache::new(config);
        let counter = AtomicU64::new(0);
        let mut window = DeltaWindow::new(config, &cache, source, &NoProgress, &counter);
        window.search(list).unwrap();
        cache
    }

    #[test]
    fn unrelated_blobs_find_no_deltas() {
        let _guard = set_hash_kind_for_test(HashKind::Sha1);
        let a: Vec<u8> = (0u32..600).map(|i| (i * 7 % 251) as u8).collect();
        let b: Vec<u8> = (0u32..600).map(|i| (i * 13 % 241 + 1) as u8).collect();
        let c = vec![0xAAu8; 600];
        let (source, ids) = MemSource::new(&[&a, &b, &c]);
        let mut list = candidates(&ids, &source);

        run_search(&mut list, &source, &PackConfig::default());
        assert!(list.iter().all(|o| !o.is_delta()));
        assert!(list.iter().all(|o| o.is_delta_attempted()));
    }

    #[test]
    fn near_identical_blobs_delta_small() {
        let _guard = set_hash_kind_for_test(HashKind::Sha1);
        let base: Vec<u8> = (0..10 * 1024).map(|i| (i % 251) as u8).collect();
        let mut changed = base.clone();
        changed[4000] ^= 0xFF;
        let (source, ids) = MemSource::new(&[&base, &changed]);
        let mut list = candidates(&ids, &source);

        run_search(&mut list, &source, &PackConfig::default());
        assert!(!list[0].is_delta());
        assert!(list[1].is_delta());
        assert_eq!(list[1].delta_base(), Some(ids[0]));
        assert_eq!(list[1].depth(), 1);
        assert!(list[1].delta_size() < 1024);
    }

    #[test]
    fn depth_limit_forces_whole_objects() {
        let _guard = set_hash_kind_for_test(HashKind::Sha1);
        let v0: Vec<u8> = (0..2048).map(|i| (i % 251) as u8).collect();
        let mut v1 = v0.clone();
        v1[100] ^= 1;
        let mut v2 = v1.clone();
        v2[200] ^= 1;
        let (source, ids) = MemSource::new(&[&v0, &v1, &v2]);
        let mut list = candidates(&ids, &source);

        let config = PackConfig {
            max_delta_depth: 1,
            ..Default::default()
        };
        run_search(&mut list, &source, &config);

        // v1 deltas on v0 (depth 1); v2 may only delta on a whole object.
        assert_eq!(list[1].delta_base(), Some(ids[0]));
        if let Some(base) = list[2].delta_base() {
            assert_eq!(base, ids[0]);
            assert_eq!(list[2].depth(), 1);
        }
        for o in list.iter() {
            assert!(o.depth() <= 1);
        }
    }

    #[test]
    fn tiny_objects_are_excluded() {
        let _guard = set_hash_kind_for_test(HashKind::Sha1);
        let (source, ids) = MemSource::new(&[b"abc", b"abd"]);
        let mut list = candidates(&ids, &source);

        run_search(&mut list, &source, &PackConfig::default());
        assert!(list.iter().all(|o| !o.is_delta()));
        assert!(list.iter().all(|o| o.is_do_not_delta()));
    }

    #[test]
    fn big_file_threshold_excludes_candidate() {
        let _guard = set_hash_kind_for_test(HashKind::Sha1);
        let big: Vec<u8> = (0..4096).map(|i| (i % 251) as u8).collect();
        let other = big.clone();
        let mut other = other;
        other[9] ^= 0x20;
        let (source, ids) = MemSource::new(&[&big, &other]);
        let mut list = candidates(&ids, &source);

        let config = PackConfig {
            big_file_threshold: 1024,
            ..Default::default()
        };
        run_search(&mut list, &source, &config);
        assert!(list.iter().all(|o| !o.is_delta()));
        assert!(list.iter().all(|o| o.is_do_not_delta()));
    }

    #[test]
    fn missing_candidate_is_skipped_not_fatal() {
        let _guard = set_hash_kind_for_test(HashKind::Sha1);
        let a: Vec<u8> = (0..2048).map(|i| (i % 251) as u8).collect();
        let (source, ids) = MemSource::new(&[&a]);
        let ghost = ObjectHash::new(b"not stored anywhere");
        let mut list = candidates(&ids, &source);
        let mut missing = ObjectToPack::new(ghost, ObjectType::Blob, 1, false);
        missing.set_size(2048);
        list.push(missing);

        run_search(&mut list, &source, &PackConfig::default());
        assert!(list[1].is_do_not_delta());
        assert!(!list[1].is_delta());
    }

    #[test]
    fn edge_objects_serve_as_bases_only() {
        let _guard = set_hash_kind_for_test(HashKind::Sha1);
        let base: Vec<u8> = (0..4096).map(|i| (i % 251) as u8).collect();
        let mut target = base.clone();
        target[1000] ^= 0xFF;
        let (source, ids) = MemSource::new(&[&base, &target]);
        let mut list = candidates(&ids, &source);
        list[0] = ObjectToPack::new(ids[0], ObjectType::Blob, 1, true);
        list[0].set_size(4096);
        list[0].set_weight(4096);

        run_search(&mut list, &source, &PackConfig::default());
        assert!(!list[0].is_delta(), "edge objects are never encoded");
        assert!(!list[0].is_delta_attempted());
        assert_eq!(list[1].delta_base(), Some(ids[0]));
    }

    #[test]
    fn window_eviction_limits_bases() {
        let _guard = set_hash_kind_for_test(HashKind::Sha1);
        // First object scrolls out of a 1-slot window before the third shows up.
        let a: Vec<u8> = (0..2048).map(|i| (i % 251) as u8).collect();
        let b = vec![0x55u8; 2048];
        let mut a_again = a.clone();
        a_again[0] ^= 1;
        let (source, ids) = MemSource::new(&[&a, &b, &a_again]);
        let mut list = candidates(&ids, &source);

        let config = PackConfig {
            delta_search_window_size: 1,
            ..Default::default()
        };
        run_search(&mut list, &source, &config);
        // Only b is in the window when a_again is searched; no useful base.
        assert!(!list[2].is_delta() || list[2].delta_base() == Some(ids[1]));
        assert!(!list[1].is_delta());
    }

    #[test]
    fn found_delta_lands_in_cache() {
        let _guard = set_hash_kind_for_test(HashKind::Sha1);
        let base: Vec<u8> = (0..8192).map(|i| (i % 251) as u8).collect();
        let mut changed = base.clone();
        changed[1234] ^= 0xFF;
        let (source, ids) = MemSource::new(&[&base, &changed]);
        let mut list = candidates(&ids, &source);

        let _cache = run_search(&mut list, &source, &PackConfig::default());
        let handle = list[1].cached_delta().expect("small delta must be cached");
        assert!(handle.upgrade().is_some());
    }
}
