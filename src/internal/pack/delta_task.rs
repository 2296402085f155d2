//! Partitioning of the sorted candidate list into units of parallel delta
//! search, and their execution on a worker pool.
//!
//! Partitioning is purely a performance optimization: it never changes the
//! set of objects included in the pack nor the emission order, only which
//! base a given object may end up delta-encoded against (a window cannot see
//! across its batch boundary).

use std::sync::{
    Arc,
    atomic::AtomicU64,
    mpsc,
};

use threadpool::ThreadPool;

use crate::{
    config::PackConfig,
    errors::PackError,
    internal::pack::{
        delta_cache::ThreadSafeDeltaCache, delta_window::DeltaWindow, progress::ProgressMonitor,
        representation::ObjectSource, to_pack::ObjectToPack,
    },
};

/// Everything one search task needs, shared across the pool.
pub(crate) struct SearchParams {
    pub config: PackConfig,
    pub source: Arc<dyn ObjectSource>,
    pub cache: Arc<ThreadSafeDeltaCache>,
    pub monitor: Arc<dyn ProgressMonitor>,
    pub counter: Arc<AtomicU64>,
}

/// A contiguous batch of the sorted candidate list handed to one
/// [`DeltaWindow`] instance on a worker thread.
pub(crate) struct DeltaTask {
    pub index: usize,
    pub batch: Vec<ObjectToPack>,
}

impl DeltaTask {
    fn run(mut self, params: &SearchParams) -> (usize, Vec<ObjectToPack>, Result<(), PackError>) {
        let mut window = DeltaWindow::new(
            &params.config,
            &params.cache,
            params.source.as_ref(),
            params.monitor.as_ref(),
            &params.counter,
        );
        let result = window.search(&mut self.batch);
        (self.index, self.batch, result)
    }
}

/// Split the sorted candidates into contiguous batches of roughly
/// `n / (threads * 2)` objects, nudging each boundary forward so a run of
/// identical path-hash objects is never split across two windows.
pub(crate) fn partition(mut candidates: Vec<ObjectToPack>, threads: usize) -> Vec<DeltaTask> {
    let n = candidates.len();
    if n == 0 {
        return Vec::new();
    }

    let batch_size = (n / (threads.max(1) * 2)).max(1);
    let mut tasks = Vec::new();
    while !candidates.is_empty() {
        let mut take = batch_size.min(candidates.len());
        while take < candidates.len()
            && candidates[take].path_hash() == candidates[take - 1].path_hash()
        {
            take += 1;
        }
        let rest = candidates.split_off(take);
        tasks.push(DeltaTask {
            index: tasks.len(),
            batch: candidates,
        });
        candidates = rest;
    }
    tasks
}

/// Run all tasks, inline when there is only one, otherwise on a pool.
/// Reassembles the batches in task order; partial failure in any worker
/// aborts the phase and surfaces the first (lowest task index) error.
pub(crate) fn run_tasks(
    tasks: Vec<DeltaTask>,
    params: SearchParams,
) -> Result<Vec<ObjectToPack>, PackError> {
    if tasks.is_empty() {
        return Ok(Vec::new());
    }

    if tasks.len() == 1 {
        let (_, batch, result) = tasks.into_iter().next().unwrap().run(&params);
        result?;
        return Ok(batch);
    }

    let workers = params.config.effective_threads().min(tasks.len());
    let pool = ThreadPool::new(workers);
    let params = Arc::new(params);
    let task_count = tasks.len();
    let (tx, rx) = mpsc::channel();

    for task in tasks {
        let tx = tx.clone();
        let params = Arc::clone(&params);
        pool.execute(move || {
            // A send can only fail if the receiver gave up on the phase.
            let _ = tx.send(task.run(&params));
        });
    }
    drop(tx);

    let mut slots: Vec<Option<(Vec<ObjectToPack>, Result<(), PackError>)>> =
        (0..task_count).map(|_| None).collect();
    for _ in 0..task_count {
        let (index, batch, result) = rx
            .recv()
            .map_err(|_| PackError::TaskFailure("worker thread died".to_string()))?;
        slots[index] = Some((batch, result));
    }
    pool.join();

    let mut merged = Vec::new();
    for slot in slots {
        let (batch, result) =
            slot.ok_or_else(|| PackError::TaskFailure("worker produced no result".to_string()))?;
        result?;
        merged.extend(batch);
    }
    Ok(merged)
}
