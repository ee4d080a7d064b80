//! Per-worker status lines.
//!
//! Every worker owns one line on a shared [`StatusBoard`]. While a task runs
//! the line shows its input and output next to a bar over the pipeline
//! stages; between tasks it reads `idle`. Lines are redrawn in place, and log
//! output written through [`StatusBoard::log_writer`] is printed above them
//! without tearing.

use crate::config::{ConversionStage, Task};
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::io::{self, Write};
use tracing_subscriber::fmt::MakeWriter;

const LINE_TEMPLATE: &str = "{prefix:>9} [{bar:4}] {msg}";
const BAR_CHARS: &str = "#.";
const IDLE: &str = "idle";

/// The set of worker status lines for one terminal.
#[derive(Clone)]
pub struct StatusBoard {
    multi: MultiProgress,
}

impl std::fmt::Debug for StatusBoard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusBoard")
            .field("hidden", &self.is_hidden())
            .finish()
    }
}

impl Default for StatusBoard {
    fn default() -> Self {
        Self::hidden()
    }
}

impl StatusBoard {
    /// Draw on stderr. Nothing is drawn when stderr is not a terminal.
    pub fn stderr() -> Self {
        Self {
            multi: MultiProgress::with_draw_target(ProgressDrawTarget::stderr()),
        }
    }

    /// Track status without drawing anything.
    pub fn hidden() -> Self {
        Self {
            multi: MultiProgress::with_draw_target(ProgressDrawTarget::hidden()),
        }
    }

    pub fn is_hidden(&self) -> bool {
        self.multi.is_hidden()
    }

    /// Add the status line for worker `id`. It starts out idle.
    pub fn add_worker(&self, id: usize) -> WorkerLine {
        let line = WorkerLine::new(id);
        self.multi.add(line.bar.clone());
        line
    }

    /// A log writer that prints above the status lines.
    pub fn log_writer(&self) -> LogWriter {
        LogWriter {
            multi: self.multi.clone(),
        }
    }
}

/// One worker's transient status line.
#[derive(Clone)]
pub struct WorkerLine {
    bar: ProgressBar,
}

impl std::fmt::Debug for WorkerLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerLine")
            .field("prefix", &self.bar.prefix())
            .field("position", &self.bar.position())
            .field("message", &self.bar.message())
            .finish()
    }
}

impl WorkerLine {
    fn new(id: usize) -> Self {
        let style = ProgressStyle::with_template(LINE_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars(BAR_CHARS);

        let bar = ProgressBar::hidden();
        bar.set_length(ConversionStage::TOTAL as u64);
        bar.set_style(style);
        bar.set_prefix(format!("worker {}", id));
        bar.set_message(IDLE);
        Self { bar }
    }

    /// A line that is not attached to any board.
    pub fn detached(id: usize) -> Self {
        Self::new(id)
    }

    /// Show `task` as in progress with no stage completed.
    pub fn start(&self, task: &Task) {
        self.bar.set_position(0);
        self.bar.set_message(format!(
            "processing {} -> {}",
            task.source.display(),
            task.destination.display()
        ));
    }

    /// Show `completed` of `total` stages done.
    pub fn advance(&self, completed: usize, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.set_position(completed.min(total) as u64);
    }

    /// Show the worker as waiting for work.
    pub fn idle(&self) {
        self.bar.set_position(0);
        self.bar.set_message(IDLE);
    }

    /// Remove the line once the worker stops.
    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }

    pub fn message(&self) -> String {
        self.bar.message()
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    pub fn is_finished(&self) -> bool {
        self.bar.is_finished()
    }
}

/// Log sink that hides the status lines while a record is written.
#[derive(Clone)]
pub struct LogWriter {
    multi: MultiProgress,
}

impl Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.multi.suspend(|| io::stderr().write_all(buf))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()
    }
}

impl<'a> MakeWriter<'a> for LogWriter {
    type Writer = LogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
