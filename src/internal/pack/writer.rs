//! The pack writer: drives the phases COUNTING → GETTING_SIZES →
//! FINDING_SOURCES → COMPRESSING → WRITING, owns the per-run object state,
//! runs the delta search (inline or on a worker pool), and streams the final
//! pack.
//!
//! A writer is single-use: one `prepare_pack` pass feeds it the traversal's
//! objects, one `write_pack` call produces the stream. Calling `write_pack`
//! again returns an error rather than silently producing a second,
//! inconsistent pack.

use std::io::Write;
use std::sync::{Arc, atomic::AtomicU64};
use std::time::Instant;

use ahash::AHashMap;
use serde::Serialize;

use crate::{
    config::PackConfig,
    delta::{BLOCK_SIZE, encode_delta},
    errors::PackError,
    hash::ObjectHash,
    internal::{
        object::types::ObjectType,
        pack::{
            delta_cache::ThreadSafeDeltaCache,
            delta_task::{self, DeltaTask, SearchParams},
            entry::CountedObject,
            index_entry::IndexEntry,
            output::{PackOutputStream, deflate, inflate_exact},
            pack_index::IdxBuilder,
            progress::{PackPhase, ProgressMonitor},
            registry::{self, RegistryHandle, WriterSnapshot},
            representation::{CachedPack, ObjectSource, StoredFormat, StoredObjectRepresentation},
            to_pack::ObjectToPack,
        },
    },
};

/// Emission order of the per-type buckets.
const TYPE_WRITE_ORDER: [ObjectType; 4] = [
    ObjectType::Commit,
    ObjectType::Tag,
    ObjectType::Tree,
    ObjectType::Blob,
];

/// Per-object-type slice of the statistics snapshot.
#[derive(Debug, Default, Clone, Serialize)]
pub struct TypeStats {
    pub written: u64,
    pub deltas: u64,
    pub reused_objects: u64,
    pub reused_deltas: u64,
}

/// Statistics snapshot for one completed (or failed) run.
#[derive(Debug, Default, Clone, Serialize)]
pub struct PackStats {
    /// Objects in the output stream, cached-pack contributions included.
    pub total_objects: u64,
    /// Entries written as deltas (fresh or reused).
    pub total_deltas: u64,
    /// Entries copied as-is from stored whole representations.
    pub reused_objects: u64,
    /// Entries copied as-is from stored delta representations.
    pub reused_deltas: u64,
    /// Payload bytes that were copied as-is instead of recompressed.
    pub reused_bytes: u64,
    /// Deltas found by the window search this run.
    pub deltas_found: u64,
    /// Objects contributed by appended cached packs.
    pub cached_pack_objects: u64,
    /// Missing uninteresting objects tolerated during sizing.
    pub missing_skipped: u64,
    /// Bytes in the finished stream, trailer included.
    pub total_bytes: u64,
    pub pack_hash: Option<ObjectHash>,

    pub commits: TypeStats,
    pub tags: TypeStats,
    pub trees: TypeStats,
    pub blobs: TypeStats,

    pub time_counting_ms: u128,
    pub time_getting_sizes_ms: u128,
    pub time_finding_sources_ms: u128,
    pub time_compressing_ms: u128,
    pub time_writing_ms: u128,
}

impl PackStats {
    fn for_type_mut(&mut self, obj_type: ObjectType) -> &mut TypeStats {
        match obj_type {
            ObjectType::Commit => &mut self.commits,
            ObjectType::Tag => &mut self.tags,
            ObjectType::Tree => &mut self.trees,
            _ => &mut self.blobs,
        }
    }

    /// Output bytes per second over the writing phase.
    pub fn transfer_rate(&self) -> f64 {
        if self.time_writing_ms == 0 {
            return self.total_bytes as f64;
        }
        self.total_bytes as f64 / (self.time_writing_ms as f64 / 1000.0)
    }
}

enum WriterLife {
    Counting,
    Written,
}

/// Orchestrates one pack generation run against a backing object store.
pub struct PackWriter {
    config: PackConfig,
    source: Arc<dyn ObjectSource>,
    objects: Vec<ObjectToPack>,
    index: AHashMap<ObjectHash, usize>,
    cached_packs: Vec<Arc<dyn CachedPack>>,
    index_entries: Vec<IndexEntry>,
    // Keeps cached deltas alive until the writing phase finished; handles on
    // the objects go dead when this drops.
    delta_cache: Option<Arc<ThreadSafeDeltaCache>>,
    stats: PackStats,
    life: WriterLife,
    registry: RegistryHandle,
}

impl PackWriter {
    pub fn new(config: PackConfig, source: Arc<dyn ObjectSource>) -> Self {
        Self {
            config,
            source,
            objects: Vec::new(),
            index: AHashMap::new(),
            cached_packs: Vec::new(),
            index_entries: Vec::new(),
            delta_cache: None,
            stats: PackStats::default(),
            life: WriterLife::Counting,
            registry: registry::register(),
        }
    }

    /// COUNTING: feed the traversal's ordered objects into the writer. May
    /// be called several times; repeated ids are ignored.
    pub fn prepare_pack<I>(
        &mut self,
        iter: I,
        monitor: &dyn ProgressMonitor,
    ) -> Result<(), PackError>
    where
        I: IntoIterator<Item = CountedObject>,
    {
        if matches!(self.life, WriterLife::Written) {
            return Err(PackError::WriterExhausted(
                "prepare_pack after write_pack".to_string(),
            ));
        }

        let started = Instant::now();
        monitor.begin_phase(PackPhase::Counting, None);
        for counted in iter {
            if monitor.is_cancelled() {
                return Err(PackError::Cancelled);
            }
            self.insert(counted);
            monitor.update(1);
        }
        monitor.end_phase();
        self.stats.time_counting_ms += started.elapsed().as_millis();
        self.publish(PackPhase::Counting, 0);
        Ok(())
    }

    fn insert(&mut self, counted: CountedObject) {
        if self.index.contains_key(&counted.id) {
            return;
        }
        let slot = self.objects.len();
        self.objects.push(ObjectToPack::new(
            counted.id,
            counted.obj_type,
            counted.path_hash,
            counted.edge,
        ));
        self.index.insert(counted.id, slot);
    }

    /// Number of objects that will appear in the output body.
    pub fn object_count(&self) -> usize {
        self.objects.iter().filter(|o| !o.is_edge()).count()
    }

    /// Whether `id` will be written to the output body.
    pub fn will_include(&self, id: &ObjectHash) -> bool {
        self.index
            .get(id)
            .map(|&slot| !self.objects[slot].is_edge())
            .unwrap_or(false)
    }

    /// Index records for the written objects, in emission order. `None` when
    /// cached packs were appended: their entries are unknown to this writer,
    /// so any index it produced would be incomplete.
    pub fn index_entries(&self) -> Option<&[IndexEntry]> {
        if self.cached_packs.is_empty() {
            Some(&self.index_entries)
        } else {
            None
        }
    }

    /// Statistics of the finished run.
    pub fn stats(&self) -> &PackStats {
        &self.stats
    }

    /// Stream the companion index through `sender` using [`IdxBuilder`].
    pub async fn write_index(
        &self,
        sender: tokio::sync::mpsc::Sender<Vec<u8>>,
    ) -> Result<(), PackError> {
        let entries = self.index_entries().ok_or_else(|| {
            PackError::ConversionError(
                "no index is produced for a pack that reuses cached packs".to_string(),
            )
        })?;
        let pack_hash = self.stats.pack_hash.ok_or_else(|| {
            PackError::ConversionError("write_pack has not completed".to_string())
        })?;
        let mut builder = IdxBuilder::with_version(
            entries.len(),
            sender,
            pack_hash,
            self.config.index_version,
        );
        builder.write_idx(entries.to_vec()).await
    }

    /// Run the remaining phases and stream the pack into `out`.
    pub fn write_pack<W: Write>(
        &mut self,
        out: &mut W,
        monitor: Arc<dyn ProgressMonitor>,
    ) -> Result<PackStats, PackError> {
        if matches!(self.life, WriterLife::Written) {
            return Err(PackError::WriterExhausted(
                "write_pack may only be called once".to_string(),
            ));
        }
        self.life = WriterLife::Written;

        self.get_sizes(monitor.as_ref())?;
        self.find_sources(monitor.as_ref())?;
        self.compress(Arc::clone(&monitor))?;
        self.write_objects(out, monitor.as_ref())?;

        // Cached deltas are dead weight once the stream is sealed.
        self.delta_cache = None;
        Ok(self.stats.clone())
    }

    /// GETTING_SIZES: fetch uncompressed sizes for the delta-friendly
    /// objects and filter out the ones delta search cannot help.
    fn get_sizes(&mut self, monitor: &dyn ProgressMonitor) -> Result<(), PackError> {
        let started = Instant::now();
        let sizable: Vec<usize> = (0..self.objects.len())
            .filter(|&slot| self.objects[slot].obj_type().is_delta_friendly())
            .collect();
        monitor.begin_phase(PackPhase::GettingSizes, Some(sizable.len() as u64));

        for slot in sizable {
            if monitor.is_cancelled() {
                return Err(PackError::Cancelled);
            }
            let id = self.objects[slot].id();
            match self.source.object_size(&id) {
                Some(size) => {
                    let o = &mut self.objects[slot];
                    o.set_size(size);
                    o.set_weight(size.min(u32::MAX as u64) as u32);
                    if size > self.config.big_file_threshold || size < BLOCK_SIZE as u64 {
                        o.set_do_not_delta();
                    }
                }
                None => {
                    let edge = self.objects[slot].is_edge();
                    if edge && self.config.ignore_missing_uninteresting {
                        tracing::warn!(%id, "uninteresting object missing, skipped");
                        self.objects[slot].set_do_not_delta();
                        self.stats.missing_skipped += 1;
                    } else {
                        return Err(PackError::ObjectNotFound(id));
                    }
                }
            }
            monitor.update(1);
        }
        monitor.end_phase();
        self.stats.time_getting_sizes_ms = started.elapsed().as_millis();
        self.publish(PackPhase::GettingSizes, 0);
        Ok(())
    }

    /// FINDING_SOURCES: let the object database propose stored
    /// representations and pick the best one per object.
    fn find_sources(&mut self, monitor: &dyn ProgressMonitor) -> Result<(), PackError> {
        let started = Instant::now();
        monitor.begin_phase(PackPhase::FindingSources, Some(self.objects.len() as u64));

        // Local clone so the `reuse` borrow does not pin `self`.
        let source = Arc::clone(&self.source);
        if let Some(reuse) = source.reuse() {
            if self.config.use_cached_packs {
                // A cached pack is reusable when every tip it advertises is
                // part of the interesting set being packed.
                for pack in reuse.cached_packs() {
                    let tips = pack.tips();
                    let covered = !tips.is_empty()
                        && tips.iter().all(|tip| {
                            self.index
                                .get(tip)
                                .map(|&slot| !self.objects[slot].is_edge())
                                .unwrap_or(false)
                        });
                    if covered {
                        self.cached_packs.push(pack);
                    }
                }
            }

            for slot in 0..self.objects.len() {
                if monitor.is_cancelled() {
                    return Err(PackError::Cancelled);
                }
                monitor.update(1);
                if self.objects[slot].is_edge() {
                    continue;
                }
                let id = self.objects[slot].id();
                for rep in reuse.representations(&id) {
                    self.select(slot, &rep, true);
                }
            }
        } else {
            monitor.update(self.objects.len() as u64);
        }

        monitor.end_phase();
        self.stats.time_finding_sources_ms = started.elapsed().as_millis();
        self.publish(PackPhase::FindingSources, 0);
        Ok(())
    }

    /// Pick the best representation for one object, called once per
    /// candidate the store offers. Idempotent for a repeated candidate.
    ///
    /// `allow_edge` is false during the write-time re-selection after a
    /// representation vanished: the output count is already fixed, so the
    /// object may no longer be pruned into a cached pack.
    fn select(&mut self, slot: usize, rep: &StoredObjectRepresentation, allow_edge: bool) {
        let id = self.objects[slot].id();

        // A cached pack will carry this object; prune it from the work.
        if allow_edge
            && matches!(rep.format, StoredFormat::PackDelta | StoredFormat::PackWhole)
            && self.cached_packs.iter().any(|p| p.has_object(&id))
        {
            self.objects[slot].set_edge();
            return;
        }

        match rep.format {
            StoredFormat::PackDelta if self.config.reuse_deltas => {
                let type_ok = self.objects[slot].obj_type().is_delta_friendly()
                    || self.config.reuse_commit_deltas;
                if let (true, Some(base)) = (type_ok, rep.delta_base) {
                    if let Some(&base_slot) = self.index.get(&base) {
                        let base_edge = self.objects[base_slot].is_edge();
                        if !base_edge || self.config.thin_pack {
                            let depth = self.objects[base_slot].depth() + 1;
                            self.objects[slot].select_reuse_delta(base, rep.weight, depth);
                            return;
                        }
                    }
                }
                self.clear_choice(slot);
            }
            StoredFormat::PackWhole if self.config.reuse_objects => {
                let o = &self.objects[slot];
                if o.is_delta() {
                    return; // an adopted delta beats any whole copy
                }
                if !o.is_reuse_as_is() || rep.weight < o.weight() {
                    self.objects[slot].select_reuse_whole(rep.weight);
                }
            }
            _ => self.clear_choice(slot),
        }
    }

    fn clear_choice(&mut self, slot: usize) {
        if self.objects[slot].is_reuse_as_is() {
            self.objects[slot].clear_reuse_as_is();
            self.objects[slot].clear_delta();
        }
    }

    /// COMPRESSING: sort the candidates, partition them, and run the window
    /// search, inline or on the pool.
    fn compress(&mut self, monitor: Arc<dyn ProgressMonitor>) -> Result<(), PackError> {
        if !self.config.delta_compress {
            return Ok(());
        }
        let started = Instant::now();

        let mut candidates: Vec<ObjectToPack> = self
            .objects
            .iter()
            .filter(|o| {
                o.obj_type().is_delta_friendly()
                    && !o.is_do_not_delta()
                    && !o.is_reuse_as_is()
                    && !o.is_delta()
                    && (!o.is_edge() || self.config.thin_pack)
            })
            .cloned()
            .collect();

        let searchable = candidates.iter().filter(|o| !o.is_edge()).count();
        monitor.begin_phase(PackPhase::Compressing, Some(candidates.len() as u64));
        if searchable == 0 || candidates.len() < 2 {
            monitor.end_phase();
            self.stats.time_compressing_ms = started.elapsed().as_millis();
            return Ok(());
        }

        // The order fixed here decides which objects share a window; it does
        // not affect the emission order of the pack.
        candidates.sort_by(|a, b| {
            a.obj_type()
                .to_u8()
                .cmp(&b.obj_type().to_u8())
                .then((a.path_hash() >> 1).cmp(&(b.path_hash() >> 1)))
                .then((a.path_hash() & 1).cmp(&(b.path_hash() & 1)))
                .then(b.is_edge().cmp(&a.is_edge()))
                .then(b.weight().cmp(&a.weight()))
        });

        let cache = Arc::new(ThreadSafeDeltaCache::new(&self.config));
        self.delta_cache = Some(Arc::clone(&cache));

        let threads = self.config.effective_threads();
        let params = SearchParams {
            config: self.config.clone(),
            source: Arc::clone(&self.source),
            cache,
            monitor: Arc::clone(&monitor),
            counter: Arc::new(AtomicU64::new(0)),
        };

        let parallel = threads > 1
            && candidates.len() > 2 * self.config.delta_search_window_size;
        let tasks = if parallel {
            delta_task::partition(candidates, threads)
        } else {
            vec![DeltaTask {
                index: 0,
                batch: candidates,
            }]
        };

        let searched = delta_task::run_tasks(tasks, params)?;
        for result in &searched {
            if let Some(&slot) = self.index.get(&result.id()) {
                self.objects[slot].merge_search_result(result);
                if result.is_delta() && !result.is_reuse_as_is() {
                    self.stats.deltas_found += 1;
                }
            }
        }
        if let Some(cache) = &self.delta_cache {
            tracing::debug!(
                deltas = self.stats.deltas_found,
                cache_bytes = cache.used(),
                "delta search finished"
            );
        }

        monitor.end_phase();
        self.stats.time_compressing_ms = started.elapsed().as_millis();
        self.publish(PackPhase::Compressing, 0);
        Ok(())
    }

    /// WRITING: emit every non-edge object in type order, append selected
    /// cached packs, and seal the stream.
    fn write_objects<W: Write>(
        &mut self,
        out: &mut W,
        monitor: &dyn ProgressMonitor,
    ) -> Result<(), PackError> {
        let started = Instant::now();
        let body_count = self.object_count() as u64;
        let cached_count: u64 = self.cached_packs.iter().map(|p| p.object_count()).sum();
        monitor.begin_phase(PackPhase::Writing, Some(body_count));

        let mut stream = PackOutputStream::new(out);
        stream.write_pack_header((body_count + cached_count) as u32)?;

        for obj_type in TYPE_WRITE_ORDER {
            for slot in 0..self.objects.len() {
                if self.objects[slot].obj_type() != obj_type || self.objects[slot].is_edge() {
                    continue;
                }
                self.write_object(slot, &mut stream, monitor)?;
            }
        }

        let cached_packs = std::mem::take(&mut self.cached_packs);
        for pack in &cached_packs {
            tracing::debug!(objects = pack.object_count(), "appending cached pack");
            pack.copy_pack(&mut stream)?;
            self.stats.cached_pack_objects += pack.object_count();
            self.stats.total_objects += pack.object_count();
        }
        self.cached_packs = cached_packs;

        let hash = stream.write_trailer()?;
        self.stats.total_bytes = stream.offset();
        self.stats.pack_hash = Some(hash);
        tracing::debug!(
            objects = self.stats.total_objects,
            bytes = self.stats.total_bytes,
            "pack sealed {}",
            hash
        );

        monitor.end_phase();
        self.stats.time_writing_ms = started.elapsed().as_millis();
        self.publish(PackPhase::Writing, self.stats.total_bytes);
        Ok(())
    }

    /// Write one object, its delta base first.
    fn write_object<W: Write>(
        &mut self,
        slot: usize,
        stream: &mut PackOutputStream<W>,
        monitor: &dyn ProgressMonitor,
    ) -> Result<(), PackError> {
        if self.objects[slot].is_written() {
            return Ok(());
        }
        if monitor.is_cancelled() {
            return Err(PackError::Cancelled);
        }

        if self.objects[slot].wants_write() {
            // The chain closed back on an object currently being written.
            // Drop its delta and store it whole; the cycle is never visible
            // to the caller.
            tracing::debug!(id = %self.objects[slot].id(), "delta cycle broken");
            self.objects[slot].clear_delta();
            self.objects[slot].clear_reuse_as_is();
        } else {
            self.objects[slot].set_want_write();
            if let Some(base_id) = self.objects[slot].delta_base() {
                if let Some(&base_slot) = self.index.get(&base_id) {
                    if !self.objects[base_slot].is_edge()
                        && !self.objects[base_slot].is_written()
                    {
                        self.write_object(base_slot, stream, monitor)?;
                    }
                }
            }
        }

        // Writing the base may have written this object to break a cycle.
        if self.objects[slot].is_written() {
            return Ok(());
        }

        self.emit(slot, stream)?;
        monitor.update(1);
        Ok(())
    }

    /// Emit header and payload for one object: as-is bytes, a cached delta
    /// replayed, or freshly deflated data.
    fn emit<W: Write>(
        &mut self,
        slot: usize,
        stream: &mut PackOutputStream<W>,
    ) -> Result<(), PackError> {
        let payload = self.build_payload(slot, false)?;
        let obj_type = self.objects[slot].obj_type();

        let offset = stream.begin_entry();
        match payload.base {
            Some(base_id) => {
                let base_offset = self
                    .index
                    .get(&base_id)
                    .map(|&base_slot| &self.objects[base_slot])
                    .filter(|base| !base.is_edge() && base.is_written())
                    .map(|base| base.offset());
                match base_offset {
                    Some(base_offset) if self.config.delta_base_as_offset => {
                        stream.write_entry_header(
                            ObjectType::OffsetDelta.to_u8(),
                            payload.inflated_size,
                        )?;
                        stream.write_ofs_base(offset - base_offset)?;
                    }
                    _ => {
                        stream.write_entry_header(
                            ObjectType::HashDelta.to_u8(),
                            payload.inflated_size,
                        )?;
                        stream.write_ref_base(&base_id)?;
                    }
                }
                self.stats.total_deltas += 1;
                self.stats.for_type_mut(obj_type).deltas += 1;
            }
            None => {
                stream.write_entry_header(obj_type.to_u8(), payload.inflated_size)?;
            }
        }
        stream.write_all(&payload.deflated)?;
        let crc = stream.end_entry();

        if payload.reused {
            self.stats.reused_bytes += payload.deflated.len() as u64;
            if payload.base.is_some() {
                self.stats.reused_deltas += 1;
                self.stats.for_type_mut(obj_type).reused_deltas += 1;
            } else {
                self.stats.reused_objects += 1;
                self.stats.for_type_mut(obj_type).reused_objects += 1;
            }
        }
        self.stats.total_objects += 1;
        self.stats.for_type_mut(obj_type).written += 1;

        let o = &mut self.objects[slot];
        o.set_offset(offset);
        o.set_crc32(crc);
        o.set_written();
        self.index_entries.push(IndexEntry::new(o.id(), crc, offset));
        Ok(())
    }

    /// Produce the deflated payload for one object along with the header
    /// facts. `retried` guards the single re-selection allowed when a reuse
    /// representation vanished.
    fn build_payload(&mut self, slot: usize, retried: bool) -> Result<EntryPayload, PackError> {
        let id = self.objects[slot].id();
        let obj_type = self.objects[slot].obj_type();
        let source = Arc::clone(&self.source);

        if self.objects[slot].is_reuse_as_is() {
            let rep = match self.objects[slot].delta_base() {
                Some(base) => StoredObjectRepresentation::delta(self.objects[slot].weight(), base),
                None => StoredObjectRepresentation::whole(self.objects[slot].weight()),
            };
            let copy = match source.reuse() {
                Some(reuse) => reuse.copy_as_is(&id, &rep),
                None => Err(PackError::RepresentationGone(id)),
            };
            match copy {
                Ok(copy) => {
                    // Structural validation: the stored stream must inflate to
                    // exactly the declared size; for whole objects the content
                    // must also still hash to the object's id.
                    let inflated = inflate_exact(&copy.deflated, copy.inflated_size)
                        .map_err(|e| PackError::CorruptObject(id, e.to_string()))?;
                    if rep.delta_base.is_none() {
                        let check = ObjectHash::from_type_and_data(obj_type, &inflated);
                        if check != id {
                            return Err(PackError::CorruptObject(
                                id,
                                format!("stored bytes hash to {check}"),
                            ));
                        }
                    }
                    return Ok(EntryPayload {
                        inflated_size: copy.inflated_size,
                        deflated: copy.deflated,
                        base: rep.delta_base,
                        reused: true,
                    });
                }
                Err(PackError::RepresentationGone(_)) if !retried => {
                    // The copy vanished (concurrent repack). Re-select once;
                    // nothing for this entry hit the stream yet, so any fresh
                    // representation can still be used.
                    tracing::warn!(%id, "stored representation vanished, re-selecting");
                    self.clear_choice(slot);
                    if let Some(reuse) = source.reuse() {
                        for rep in reuse.representations(&id) {
                            self.select(slot, &rep, false);
                        }
                    }
                    return self.build_payload(slot, true);
                }
                Err(err) => return Err(err),
            }
        }

        if let Some(base_id) = self.objects[slot].delta_base() {
            // Fresh delta: replay the cached deflated stream, or recompute.
            if let Some(cached) = self.objects[slot].cached_delta() {
                if let Some(deflated) = cached.upgrade() {
                    return Ok(EntryPayload {
                        inflated_size: self.objects[slot].delta_size(),
                        deflated: deflated.as_ref().clone(),
                        base: Some(base_id),
                        reused: false,
                    });
                }
            }
            let base = self.source.read_object(&base_id)?;
            let target = self.source.read_object(&id)?;
            let raw = encode_delta(&base, &target);
            let inflated_size = raw.len() as u64;
            let deflated = deflate(&raw, self.config.compression_level)?;
            return Ok(EntryPayload {
                inflated_size,
                deflated,
                base: Some(base_id),
                reused: false,
            });
        }

        // Whole object, freshly deflated.
        let content = self.source.read_object(&id)?;
        let inflated_size = content.len() as u64;
        let deflated = deflate(&content, self.config.compression_level)?;
        Ok(EntryPayload {
            inflated_size,
            deflated,
            base: None,
            reused: false,
        })
    }

    fn publish(&self, phase: PackPhase, bytes: u64) {
        registry::update(
            &self.registry,
            WriterSnapshot {
                phase,
                objects_counted: self.objects.len(),
                bytes_written: bytes,
            },
        );
    }
}

struct EntryPayload {
    inflated_size: u64,
    deflated: Vec<u8>,
    base: Option<ObjectHash>,
    reused: bool,
}
