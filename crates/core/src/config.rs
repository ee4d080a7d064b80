//! Configuration and task types for heic2png conversion.

use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// What to do when the destination PNG already exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverwritePolicy {
    /// Fail the task; the existing file is left untouched.
    #[default]
    Exclusive,
    /// Truncate and replace the existing file.
    Force,
}

impl OverwritePolicy {
    /// Map a `--force` style flag to a policy.
    pub fn from_force(force: bool) -> Self {
        if force {
            OverwritePolicy::Force
        } else {
            OverwritePolicy::Exclusive
        }
    }
}

/// PNG compression trade-off.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompressionPolicy {
    /// Fastest encoding, larger files.
    #[default]
    Fast,
    /// The encoder's default level.
    Balanced,
    /// Smallest files, slowest encoding.
    Best,
}

impl CompressionPolicy {
    pub(crate) fn to_png(self) -> png::Compression {
        match self {
            CompressionPolicy::Fast => png::Compression::Fast,
            CompressionPolicy::Balanced => png::Compression::Default,
            CompressionPolicy::Best => png::Compression::Best,
        }
    }
}

/// Stage of the per-file conversion pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConversionStage {
    /// Opening the source file.
    Open,
    /// Reading and decoding the HEIC bitmap.
    Decode,
    /// Creating the destination file.
    CreateOutput,
    /// Encoding and writing the PNG.
    Encode,
}

impl ConversionStage {
    /// Number of stages in the pipeline.
    pub const TOTAL: usize = 4;

    /// All stages, in execution order.
    pub const ALL: [ConversionStage; 4] = [
        ConversionStage::Open,
        ConversionStage::Decode,
        ConversionStage::CreateOutput,
        ConversionStage::Encode,
    ];

    /// 1-based position of this stage in the pipeline.
    pub fn step(self) -> usize {
        match self {
            ConversionStage::Open => 1,
            ConversionStage::Decode => 2,
            ConversionStage::CreateOutput => 3,
            ConversionStage::Encode => 4,
        }
    }
}

impl std::fmt::Display for ConversionStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ConversionStage::Open => "open",
            ConversionStage::Decode => "decode",
            ConversionStage::CreateOutput => "create",
            ConversionStage::Encode => "encode",
        };
        f.write_str(name)
    }
}

/// Derive the PNG path for a source image.
///
/// The final extension of the file name is removed and `.png` appended;
/// the directory part is kept as is.
pub fn derive_destination(source: &Path) -> PathBuf {
    let stem: OsString = match source.file_name() {
        Some(name) => match name.to_str() {
            Some(s) => s.rfind('.').map_or(s, |idx| &s[..idx]).into(),
            None => source.file_stem().unwrap_or(name).to_os_string(),
        },
        None => OsString::new(),
    };

    let mut file_name = stem;
    file_name.push(".png");
    source.with_file_name(file_name)
}

/// One unit of work: convert `source` into `destination`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    /// Path to the HEIC input.
    pub source: PathBuf,
    /// Path the PNG is written to.
    pub destination: PathBuf,
}

impl Task {
    /// Create a task with an explicit destination.
    pub fn new(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
        }
    }

    /// Create a task whose destination is derived from the source path.
    pub fn for_source(source: impl Into<PathBuf>) -> Self {
        let source = source.into();
        let destination = derive_destination(&source);
        Self {
            source,
            destination,
        }
    }
}

/// Configuration for a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Requested number of workers. The batch never starts more workers
    /// than it has files.
    /// Default: number of CPU cores.
    pub workers: usize,

    /// Remove the source file after a successful conversion.
    /// Default: false.
    pub delete_on_success: bool,

    /// Behavior when the destination already exists.
    /// Default: fail the task.
    pub overwrite: OverwritePolicy,

    /// PNG compression trade-off.
    /// Default: fast.
    pub compression: CompressionPolicy,

    /// Buffered tasks between the producer and the workers.
    /// Default: 0 (direct handoff).
    pub queue_capacity: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            workers: num_cpus::get(),
            delete_on_success: false,
            overwrite: OverwritePolicy::Exclusive,
            compression: CompressionPolicy::Fast,
            queue_capacity: 0,
        }
    }
}

impl BatchConfig {
    /// Create a batch config with the specified worker count.
    pub fn with_workers(workers: usize) -> Self {
        Self {
            workers,
            ..Default::default()
        }
    }

    /// Delete sources after successful conversion.
    pub fn delete_on_success(mut self, enabled: bool) -> Self {
        self.delete_on_success = enabled;
        self
    }

    /// Set the overwrite policy.
    pub fn overwrite(mut self, policy: OverwritePolicy) -> Self {
        self.overwrite = policy;
        self
    }

    /// Set the PNG compression policy.
    pub fn compression(mut self, policy: CompressionPolicy) -> Self {
        self.compression = policy;
        self
    }

    /// Set the task queue capacity.
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Worker count for a batch of `file_count` files.
    pub fn effective_workers(&self, file_count: usize) -> usize {
        self.workers.min(file_count)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.workers == 0 {
            return Err(crate::error::ConversionError::InvalidConfig(
                "workers must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Highest exit status a batch reports; 255 is reserved for setup failures.
pub const MAX_EXIT_CODE: u8 = 254;

/// Summary of a finished batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    /// Files submitted to the batch.
    pub files: usize,

    /// Workers that were started.
    pub workers: usize,

    /// Tasks pulled from the queue across all workers.
    pub pulls: usize,

    /// Files converted successfully.
    pub converted: usize,

    /// Sources removed after conversion.
    pub deleted: usize,

    /// Failed conversions plus failed deletions.
    pub errors: usize,

    /// Wall-clock time of the batch.
    pub duration: Duration,
}

impl BatchReport {
    /// Whether every task finished without error.
    pub fn is_success(&self) -> bool {
        self.errors == 0
    }

    /// Process exit status for this batch: the error count, saturated at
    /// [`MAX_EXIT_CODE`] so it never wraps to zero in an 8-bit status and
    /// never reads as a setup failure (`-1`, which is 255).
    pub fn exit_code(&self) -> i32 {
        self.errors.min(MAX_EXIT_CODE as usize) as i32
    }
}
