//! Streaming worker pool for Monte Carlo runs.
//!
//! [`SimulationWorker::submit`] splits a path range across worker threads.
//! Each thread sends contiguous batches back over a bounded channel, so a
//! slow consumer applies backpressure instead of buffering the whole run.
//! The consumer folds messages into a [`MonteCarloAggregator`] as they arrive.

use std::any::Any;
use std::ops::Range;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{Receiver, SyncSender, sync_channel};
use std::thread::{self, JoinHandle};

use rustc_hash::FxHashSet;

use crate::error::SimulationError;
use crate::simulation::{MonteCarloAggregator, PathBatch, SimulationRequest, run_path};

/// Message from a worker thread to the run's consumer
#[derive(Debug)]
pub enum BatchMessage {
    /// A completed batch of paths
    Batch(PathBatch),
    /// Paths in `range` were lost to an engine error or a panic
    Failed {
        range: Range<usize>,
        error: SimulationError,
    },
    /// Worker `worker` has finished its share
    Done { worker: usize },
}

/// Launches Monte Carlo runs on background threads.
///
/// Submitting a new run cancels the previous one, so results of a superseded
/// request are never produced past its next path boundary.
pub struct SimulationWorker {
    next_run_id: u64,
    active: Option<Arc<AtomicBool>>,
}

impl SimulationWorker {
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_run_id: 1,
            active: None,
        }
    }

    /// Run paths `range` of `request` on `request.workers` threads.
    pub fn submit(&mut self, request: Arc<SimulationRequest>, range: Range<usize>) -> MonteCarloRun {
        self.cancel();

        let id = self.next_run_id;
        self.next_run_id += 1;
        let cancel_flag = Arc::new(AtomicBool::new(false));
        let progress = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = sync_channel(request.channel_capacity.max(1));

        let shares = split_range(range.clone(), request.workers);
        tracing::info!(
            run = id,
            paths = range.len(),
            workers = shares.len(),
            batch_size = request.batch_size,
            "Starting Monte Carlo run"
        );

        let threads = shares
            .into_iter()
            .enumerate()
            .map(|(worker, share)| {
                let ctx = WorkerContext {
                    worker,
                    run: id,
                    request: Arc::clone(&request),
                    tx: tx.clone(),
                    cancel_flag: Arc::clone(&cancel_flag),
                    progress: Arc::clone(&progress),
                };
                thread::spawn(move || ctx.run(share))
            })
            .collect::<Vec<_>>();

        self.active = Some(Arc::clone(&cancel_flag));

        MonteCarloRun {
            id,
            rx: Some(rx),
            pending: (0..threads.len()).collect(),
            threads,
            cancel_flag,
            progress,
            total: range.len(),
        }
    }

    /// Cancel the most recently submitted run.
    pub fn cancel(&mut self) {
        if let Some(flag) = self.active.take() {
            flag.store(true, Ordering::SeqCst);
        }
    }
}

impl Default for SimulationWorker {
    fn default() -> Self {
        Self::new()
    }
}

/// Split `range` into at most `workers` contiguous, non-empty shares.
fn split_range(range: Range<usize>, workers: usize) -> Vec<Range<usize>> {
    let len = range.len();
    if len == 0 {
        return Vec::new();
    }
    let workers = workers.clamp(1, len);
    let per_worker = len / workers;
    let remainder = len % workers;

    let mut start = range.start;
    (0..workers)
        .map(|w| {
            let size = per_worker + usize::from(w < remainder);
            let share = start..start + size;
            start += size;
            share
        })
        .collect()
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker panicked".to_string()
    }
}

/// State owned by one worker thread.
struct WorkerContext {
    worker: usize,
    run: u64,
    request: Arc<SimulationRequest>,
    tx: SyncSender<BatchMessage>,
    cancel_flag: Arc<AtomicBool>,
    progress: Arc<AtomicUsize>,
}

enum BatchOutcome {
    Completed(PathBatch),
    Cancelled,
}

impl WorkerContext {
    fn run(self, share: Range<usize>) {
        tracing::debug!(
            run = self.run,
            worker = self.worker,
            start = share.start,
            end = share.end,
            "Worker started"
        );

        for range in self.request.batch_ranges(share.clone()) {
            if self.is_cancelled() {
                break;
            }

            let outcome = catch_unwind(AssertUnwindSafe(|| self.run_batch(range.clone())));
            let message = match outcome {
                Ok(Ok(BatchOutcome::Completed(batch))) => BatchMessage::Batch(batch),
                Ok(Ok(BatchOutcome::Cancelled)) => break,
                Ok(Err(error)) => {
                    // Engine errors repeat for every path; give up the rest of the share
                    let lost = range.start..share.end;
                    tracing::error!(run = self.run, worker = self.worker, error = %error, "Worker stopped");
                    let _ = self.tx.send(BatchMessage::Failed { range: lost, error });
                    break;
                }
                Err(payload) => {
                    let reason = panic_message(payload.as_ref());
                    tracing::error!(run = self.run, worker = self.worker, reason = %reason, "Worker panicked");
                    BatchMessage::Failed {
                        range: range.clone(),
                        error: SimulationError::WorkerFailed { range, reason },
                    }
                }
            };

            let delivered = match &message {
                BatchMessage::Batch(batch) => batch.results.len(),
                _ => 0,
            };
            // Blocks while the channel is full; fails once the run is dropped
            if self.tx.send(message).is_err() {
                return;
            }
            self.progress.fetch_add(delivered, Ordering::Relaxed);
        }

        tracing::debug!(run = self.run, worker = self.worker, "Worker finished");
        let _ = self.tx.send(BatchMessage::Done { worker: self.worker });
    }

    fn run_batch(&self, range: Range<usize>) -> Result<BatchOutcome, SimulationError> {
        let mut results = Vec::with_capacity(range.len());
        for index in range.clone() {
            if self.is_cancelled() {
                return Ok(BatchOutcome::Cancelled);
            }
            results.push(run_path(&self.request, index)?);
        }
        Ok(BatchOutcome::Completed(PathBatch { range, results }))
    }

    fn is_cancelled(&self) -> bool {
        self.cancel_flag.load(Ordering::SeqCst)
    }
}

/// Handle to an in-flight Monte Carlo run.
///
/// Dropping the handle cancels the run and joins its threads.
pub struct MonteCarloRun {
    id: u64,
    rx: Option<Receiver<BatchMessage>>,
    pending: FxHashSet<usize>,
    threads: Vec<JoinHandle<()>>,
    cancel_flag: Arc<AtomicBool>,
    progress: Arc<AtomicUsize>,
    total: usize,
}

impl MonteCarloRun {
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Paths in batches handed to the channel so far. Batches abandoned on
    /// cancellation or lost to a fault are not counted.
    #[must_use]
    pub fn progress(&self) -> usize {
        self.progress.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn total_paths(&self) -> usize {
        self.total
    }

    /// All workers have reported `Done`.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn cancel(&self) {
        self.cancel_flag.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel_flag.load(Ordering::SeqCst)
    }

    /// Block for the next message; `None` once every worker has exited.
    pub fn recv(&mut self) -> Option<BatchMessage> {
        let message = self.rx.as_ref()?.recv().ok()?;
        self.track(&message);
        Some(message)
    }

    /// Next message if one is ready.
    pub fn try_recv(&mut self) -> Option<BatchMessage> {
        let message = self.rx.as_ref()?.try_recv().ok()?;
        self.track(&message);
        Some(message)
    }

    /// Apply every ready message to `aggregator` without blocking. Returns
    /// the number of messages applied.
    pub fn drain_into(&mut self, aggregator: &mut MonteCarloAggregator) -> usize {
        let mut applied = 0;
        while let Some(message) = self.try_recv() {
            apply(message, aggregator);
            applied += 1;
        }
        applied
    }

    /// Block until every worker is done, applying messages as they arrive.
    pub fn wait_into(&mut self, aggregator: &mut MonteCarloAggregator) {
        while !self.is_finished() {
            match self.recv() {
                Some(message) => apply(message, aggregator),
                None => break,
            }
        }
    }

    fn track(&mut self, message: &BatchMessage) {
        if let BatchMessage::Done { worker } = message {
            self.pending.remove(worker);
        }
    }
}

fn apply(message: BatchMessage, aggregator: &mut MonteCarloAggregator) {
    match message {
        BatchMessage::Batch(batch) => aggregator.ingest(batch),
        BatchMessage::Failed { range, error } => aggregator.record_failure(range, &error),
        BatchMessage::Done { .. } => {}
    }
}

impl Drop for MonteCarloRun {
    fn drop(&mut self) {
        self.cancel();
        // Dropping the receiver unblocks workers waiting on a full channel
        drop(self.rx.take());
        for thread in self.threads.drain(..) {
            let _ = thread.join();
        }
    }
}
