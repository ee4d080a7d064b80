//! Fixed-size pool of conversion workers.
//!
//! Each worker runs on its own OS thread and pulls tasks from the shared
//! queue until it is closed and drained. Workers share nothing but the
//! queue and the atomic counters in [`PoolState`]; a failed task is logged,
//! counted, and never retried.

use crate::config::Task;
use crate::error::{ConversionError, Result};
use crate::pipeline::ConversionUnit;
use crate::progress::{StatusBoard, WorkerLine};
use crate::queue::TaskReceiver;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info};

/// Counters shared by every worker of one batch.
#[derive(Debug, Default)]
pub struct PoolState {
    /// Failed conversions plus failed deletions.
    errors: AtomicUsize,
    /// Successful conversions.
    converted: AtomicUsize,
    /// Sources removed after conversion.
    deleted: AtomicUsize,
    /// Tasks pulled from the queue.
    pulls: AtomicUsize,
}

impl PoolState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn errors(&self) -> usize {
        self.errors.load(Ordering::SeqCst)
    }

    pub fn converted(&self) -> usize {
        self.converted.load(Ordering::SeqCst)
    }

    pub fn deleted(&self) -> usize {
        self.deleted.load(Ordering::SeqCst)
    }

    pub fn pulls(&self) -> usize {
        self.pulls.load(Ordering::SeqCst)
    }

    /// Record `count` failed tasks.
    pub(crate) fn add_errors(&self, count: usize) {
        self.errors.fetch_add(count, Ordering::SeqCst);
    }

    fn record_error(&self) {
        self.add_errors(1);
    }
}

/// A single worker's processing loop.
#[derive(Debug, Clone)]
pub struct Worker {
    id: usize,
    unit: ConversionUnit,
    delete_on_success: bool,
    line: WorkerLine,
}

impl Worker {
    pub fn new(id: usize, unit: ConversionUnit, delete_on_success: bool) -> Self {
        Self {
            id,
            unit,
            delete_on_success,
            line: WorkerLine::detached(id),
        }
    }

    /// Report status on `line` instead of a detached one.
    pub fn with_line(mut self, line: WorkerLine) -> Self {
        self.line = line;
        self
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn line(&self) -> &WorkerLine {
        &self.line
    }

    /// Process tasks until the queue is closed and empty.
    pub fn run(&self, tasks: TaskReceiver, state: &PoolState) {
        debug!(worker = self.id, "worker started");

        while let Some(task) = tasks.pull() {
            state.pulls.fetch_add(1, Ordering::SeqCst);
            self.process(&task, state);
            self.line.idle();
        }

        self.line.finish();
        debug!(worker = self.id, "worker stopped");
    }

    fn process(&self, task: &Task, state: &PoolState) {
        let input = task.source.display();
        let output = task.destination.display();

        self.line.start(task);
        let result = self
            .unit
            .convert_with_progress(task, |done, total| self.line.advance(done, total));

        match result {
            Ok(image) => {
                state.converted.fetch_add(1, Ordering::SeqCst);
                info!(
                    worker = self.id,
                    input = %input,
                    output = %output,
                    width = image.width,
                    height = image.height,
                    "converted"
                );
                if self.delete_on_success {
                    self.delete_source(task, state);
                }
            }
            Err(e) => {
                state.record_error();
                let stage = e.stage().map(|s| s.to_string()).unwrap_or_default();
                error!(
                    worker = self.id,
                    input = %input,
                    output = %output,
                    stage = %stage,
                    error = %e,
                    "conversion failed"
                );
            }
        }
    }

    fn delete_source(&self, task: &Task, state: &PoolState) {
        match std::fs::remove_file(&task.source) {
            Ok(()) => {
                state.deleted.fetch_add(1, Ordering::SeqCst);
                info!(worker = self.id, input = %task.source.display(), "deleted");
            }
            Err(e) => {
                state.record_error();
                let err = ConversionError::Delete {
                    path: task.source.clone(),
                    source: e,
                };
                error!(worker = self.id, error = %err, "failed to delete source");
            }
        }
    }
}

/// Running workers of one batch.
#[derive(Debug)]
pub struct WorkerPool {
    handles: Vec<(usize, JoinHandle<()>)>,
    state: Arc<PoolState>,
}

impl WorkerPool {
    /// Start `count` workers pulling from `tasks`, each with a line on
    /// `status`.
    ///
    /// If a thread cannot be started, the already running workers are left
    /// attached to the queue; closing it lets them exit.
    pub fn spawn(
        count: usize,
        unit: &ConversionUnit,
        delete_on_success: bool,
        tasks: &TaskReceiver,
        state: Arc<PoolState>,
        status: &StatusBoard,
    ) -> Result<Self> {
        let mut handles = Vec::with_capacity(count);

        for id in 0..count {
            let worker = Worker::new(id, unit.clone(), delete_on_success)
                .with_line(status.add_worker(id));
            let rx = tasks.clone();
            let worker_state = Arc::clone(&state);

            let handle = thread::Builder::new()
                .name(format!("heic2png-worker-{}", id))
                .spawn(move || worker.run(rx, &worker_state))
                .map_err(ConversionError::WorkerSpawn)?;
            handles.push((id, handle));
        }

        Ok(Self { handles, state })
    }

    /// Number of workers started.
    pub fn size(&self) -> usize {
        self.handles.len()
    }

    /// Shared counters.
    pub fn state(&self) -> &Arc<PoolState> {
        &self.state
    }

    /// Wait for every worker to finish.
    ///
    /// A worker that panicked is counted as one failed task.
    pub fn join(self) -> Arc<PoolState> {
        for (id, handle) in self.handles {
            if handle.join().is_err() {
                error!(worker = id, "worker panicked");
                self.state.record_error();
            }
        }
        self.state
    }
}
