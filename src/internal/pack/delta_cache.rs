//! Byte-budgeted retention of computed deltas between the compressing and
//! writing phases.
//!
//! The cache owns strong references in insertion order and hands out
//! [`Weak`] handles. Reclamation drops the oldest strong references, so a
//! handle can stop upgrading at any time and every lookup is a fallible cache
//! probe by contract: a vanished entry is a recompute at write time, never an
//! error.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, Weak},
};

use crate::config::PackConfig;

/// Single-threaded delta cache used within one search window.
pub struct DeltaCache {
    size: usize,
    entry_limit: usize,
    used: usize,
    entries: VecDeque<Arc<Vec<u8>>>,
}

impl DeltaCache {
    pub fn new(config: &PackConfig) -> Self {
        Self {
            size: config.delta_cache_size,
            entry_limit: config.delta_cache_limit,
            used: 0,
            entries: VecDeque::new(),
        }
    }

    /// Decide whether a delta of `length` raw bytes relating a base of
    /// `src_weight` and a target of `res_weight` is worth retaining, and
    /// reserve budget for it when so.
    ///
    /// Small deltas are always kept. Larger ones are kept only when they are
    /// disproportionately smaller than the objects they relate: a delta in
    /// the kilobyte range standing in for multi-megabyte sources was costly
    /// to find and will be costly to recompute. Over-budget requests first
    /// reclaim space by evicting the oldest entries.
    pub fn can_cache(&mut self, length: usize, src_weight: u32, res_weight: u32) -> bool {
        if self.size > 0 && self.size < self.used + length {
            self.evict_for(length);
            if self.size < self.used + length {
                return false;
            }
        }

        if length < self.entry_limit {
            self.used += length;
            return true;
        }

        if (length >> 10) < ((src_weight as usize >> 20) + (res_weight as usize >> 21)) {
            self.used += length;
            return true;
        }

        false
    }

    /// Store the (deflated, possibly shrunk) buffer, adjusting the running
    /// total for the difference between the reserved and actual size.
    /// Returns the weak handle the caller holds onto.
    pub fn cache(
        &mut self,
        mut data: Vec<u8>,
        actual_length: usize,
        reserved_size: usize,
    ) -> Weak<Vec<u8>> {
        data.shrink_to_fit();
        self.used = self.used.saturating_sub(reserved_size) + actual_length;
        let entry = Arc::new(data);
        let handle = Arc::downgrade(&entry);
        self.entries.push_back(entry);
        handle
    }

    /// Release budget reserved by a `can_cache` whose delta was rejected.
    pub fn credit(&mut self, reserved_size: usize) {
        self.used = self.used.saturating_sub(reserved_size);
    }

    /// Bytes currently accounted against the budget.
    pub fn used(&self) -> usize {
        self.used
    }

    /// Drop oldest entries until `incoming` more bytes fit the budget. Also
    /// drops entries whose handles are all gone, the explicit analog of
    /// collecting expired references.
    fn evict_for(&mut self, incoming: usize) {
        while self.size < self.used + incoming {
            let Some(old) = self.entries.pop_front() else {
                break;
            };
            self.used = self.used.saturating_sub(old.len());
        }
    }
}

/// Locking wrapper shared by all delta-search tasks. Every operation holds
/// the mutex for one short critical section.
pub struct ThreadSafeDeltaCache {
    inner: Mutex<DeltaCache>,
}

impl ThreadSafeDeltaCache {
    pub fn new(config: &PackConfig) -> Self {
        Self {
            inner: Mutex::new(DeltaCache::new(config)),
        }
    }

    pub fn can_cache(&self, length: usize, src_weight: u32, res_weight: u32) -> bool {
        self.inner
            .lock()
            .unwrap()
            .can_cache(length, src_weight, res_weight)
    }

    pub fn cache(
        &self,
        data: Vec<u8>,
        actual_length: usize,
        reserved_size: usize,
    ) -> Weak<Vec<u8>> {
        self.inner
            .lock()
            .unwrap()
            .cache(data, actual_length, reserved_size)
    }

    pub fn credit(&self, reserved_size: usize) {
        self.inner.lock().unwrap().credit(reserved_size)
    }

    pub fn used(&self) -> usize {
        self.inner.lock().unwrap().used()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_cache(size: usize, entry_limit: usize) -> DeltaCache {
        DeltaCache::new(&PackConfig {
            delta_cache_size: size,
            delta_cache_limit: entry_limit,
            ..Default::default()
        })
    }

    #[test]
    fn small_deltas_always_accepted() {
        let mut c = small_cache(1024, 100);
        assert!(c.can_cache(99, 10, 10));
        assert_eq!(c.used(), 99);
    }

    #[test]
    fn large_delta_needs_cost_benefit() {
        let mut c = small_cache(1 << 20, 100);
        // 4 KiB delta for two tiny objects: not worth it.
        assert!(!c.can_cache(4096, 1000, 1000));
        // Same delta relating multi-megabyte sources: cheap insurance.
        assert!(c.can_cache(4096, 16 << 20, 16 << 20));
    }

    #[test]
    fn budget_overflow_evicts_oldest() {
        let mut c = small_cache(64, 100);
        assert!(c.can_cache(40, 0, 0));
        let h1 = c.cache(vec![0u8; 40], 40, 40);
        assert!(h1.upgrade().is_some());

        // Second reservation overflows; the first entry gets evicted to fit.
        assert!(c.can_cache(40, 0, 0));
        let h2 = c.cache(vec![1u8; 40], 40, 40);
        assert!(h1.upgrade().is_none());
        assert!(h2.upgrade().is_some());
    }

    #[test]
    fn rejected_reservation_is_credited() {
        let mut c = small_cache(1024, 100);
        assert!(c.can_cache(80, 0, 0));
        c.credit(80);
        assert_eq!(c.used(), 0);
    }

    #[test]
    fn cache_adjusts_reserved_to_actual() {
        let mut c = small_cache(1024, 200);
        assert!(c.can_cache(150, 0, 0));
        // Deflation shrank the buffer to 60 bytes.
        let _h = c.cache(vec![2u8; 60], 60, 150);
        assert_eq!(c.used(), 60);
    }

    #[test]
    fn vanished_entry_is_a_miss_not_an_error() {
        let mut c = small_cache(32, 100);
        assert!(c.can_cache(30, 0, 0));
        let h = c.cache(vec![3u8; 30], 30, 30);
        // Force eviction by a new reservation.
        assert!(c.can_cache(30, 0, 0));
        c.credit(30);
        assert!(h.upgrade().is_none());
    }

    #[test]
    fn thread_safe_wrapper_shares_budget() {
        let c = ThreadSafeDeltaCache::new(&PackConfig {
            delta_cache_size: 1024,
            delta_cache_limit: 100,
            ..Default::default()
        });
        assert!(c.can_cache(50, 0, 0));
        let h = c.cache(vec![4u8; 50], 50, 50);
        assert_eq!(c.used(), 50);
        assert_eq!(h.upgrade().unwrap().len(), 50);
    }
}
