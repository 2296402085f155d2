//! Explicit registry of live pack writers for operational introspection.
//!
//! Writers register on construction and deregister when dropped; the snapshot
//! they publish is updated at phase transitions. `live_writers` is the hook a
//! server's diagnostics endpoint can poll to see what pack generation work is
//! in flight.

use std::sync::{
    LazyLock,
    atomic::{AtomicU64, Ordering},
};

use dashmap::DashMap;

use crate::internal::pack::progress::PackPhase;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);
static REGISTRY: LazyLock<DashMap<u64, WriterSnapshot>> = LazyLock::new(DashMap::new);

/// Published state of one in-flight writer.
#[derive(Debug, Clone)]
pub struct WriterSnapshot {
    pub phase: PackPhase,
    pub objects_counted: usize,
    pub bytes_written: u64,
}

/// Keeps the registration alive; dropping it removes the entry.
pub(crate) struct RegistryHandle {
    id: u64,
}

impl Drop for RegistryHandle {
    fn drop(&mut self) {
        REGISTRY.remove(&self.id);
    }
}

pub(crate) fn register() -> RegistryHandle {
    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    REGISTRY.insert(
        id,
        WriterSnapshot {
            phase: PackPhase::Counting,
            objects_counted: 0,
            bytes_written: 0,
        },
    );
    RegistryHandle { id }
}

pub(crate) fn update(handle: &RegistryHandle, snapshot: WriterSnapshot) {
    REGISTRY.insert(handle.id, snapshot);
}

/// Snapshots of every writer currently alive in this process.
pub fn live_writers() -> Vec<WriterSnapshot> {
    REGISTRY.iter().map(|e| e.value().clone()).collect()
}
