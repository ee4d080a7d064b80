//! Batch orchestrator that ties together the task queue and worker pool.
//!
//! A batch runs linearly: resolve the file list, start workers, push one
//! task per file in order, close the queue, wait for the workers, and report
//! the error count. Individual failures never abort the batch.

use crate::codec::{default_decoder, ImageDecoder};
use crate::config::{BatchConfig, BatchReport, Task};
use crate::discover::FileSelection;
use crate::error::Result;
use crate::pipeline::ConversionUnit;
use crate::pool::{PoolState, WorkerPool};
use crate::progress::StatusBoard;
use crate::queue::task_queue;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// Converts batches of HEIC files to PNG.
#[derive(Debug)]
pub struct Converter {
    config: BatchConfig,
    unit: ConversionUnit,
    status: StatusBoard,
}

impl Converter {
    /// Create a converter with an explicit decoder.
    pub fn new(config: BatchConfig, decoder: Arc<dyn ImageDecoder>) -> Result<Self> {
        config.validate()?;
        let unit = ConversionUnit::from_config(&config, decoder);
        Ok(Self {
            config,
            unit,
            status: StatusBoard::hidden(),
        })
    }

    /// Create a converter using the decoder this build was compiled with.
    pub fn with_default_decoder(config: BatchConfig) -> Result<Self> {
        Self::new(config, default_decoder())
    }

    /// Show worker status lines on `status`.
    pub fn with_status(mut self, status: StatusBoard) -> Self {
        self.status = status;
        self
    }

    /// Get the current configuration.
    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// The conversion unit shared by all workers.
    pub fn unit(&self) -> &ConversionUnit {
        &self.unit
    }

    /// Resolve `selection` and convert every file in it.
    ///
    /// Fails only if the selection cannot be resolved; per-file failures
    /// are reported through [`BatchReport::errors`].
    pub fn run_selection(&self, selection: &FileSelection) -> Result<BatchReport> {
        let files = selection.resolve()?;
        self.run(files)
    }

    /// Convert every file in `files`.
    pub fn run(&self, files: Vec<PathBuf>) -> Result<BatchReport> {
        let start = Instant::now();

        if files.is_empty() {
            warn!("no files found, nothing to do");
            return Ok(BatchReport {
                duration: start.elapsed(),
                ..Default::default()
            });
        }

        let file_count = files.len();
        let workers = self.config.effective_workers(file_count);
        let state = Arc::new(PoolState::new());
        let (mut tasks, receiver) = task_queue(self.config.queue_capacity);

        info!(count = workers, files = file_count, "starting workers");
        let pool = WorkerPool::spawn(
            workers,
            &self.unit,
            self.config.delete_on_success,
            &receiver,
            Arc::clone(&state),
            &self.status,
        )?;
        drop(receiver);

        for source in files {
            if let Err(e) = tasks.push(Task::for_source(source)) {
                let unsent = file_count - tasks.pushed();
                error!(error = %e, unsent, "workers exited early, remaining files not converted");
                state.add_errors(unsent);
                break;
            }
        }
        tasks.close();

        let state = pool.join();
        let errors = state.errors();
        info!(num_errors = errors, "all workers stopped");

        Ok(BatchReport {
            files: file_count,
            workers,
            pulls: state.pulls(),
            converted: state.converted(),
            deleted: state.deleted(),
            errors,
            duration: start.elapsed(),
        })
    }
}
