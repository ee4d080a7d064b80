//! # heic2png-core
//!
//! Parallel HEIC to PNG batch conversion.
//!
//! A batch fans one task per source file out to a fixed pool of worker
//! threads. Each worker opens the source, decodes it, creates the
//! destination, and writes a fast-compressed PNG next to the original.
//! Failures are counted rather than propagated, so one bad file never stops
//! the batch. Each worker reports its progress on a [`StatusBoard`] line.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use heic2png_core::{BatchConfig, Converter, FileSelection};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = BatchConfig::with_workers(4).delete_on_success(false);
//!     let converter = Converter::with_default_decoder(config)?;
//!
//!     let report = converter.run_selection(&FileSelection::Directory(".".into()))?;
//!     println!("{} converted, {} failed", report.converted, report.errors);
//!     Ok(())
//! }
//! ```

pub mod codec;
pub mod config;
pub mod converter;
pub mod discover;
pub mod error;
pub mod pipeline;
pub mod pool;
pub mod progress;
pub mod queue;

// Re-export main types for convenience
pub use codec::{default_decoder, ImageDecoder, PngEncoder, UnsupportedDecoder};
#[cfg(feature = "libheif")]
pub use codec::LibHeifDecoder;
pub use config::{
    derive_destination, BatchConfig, BatchReport, CompressionPolicy, ConversionStage,
    OverwritePolicy, Task, MAX_EXIT_CODE,
};
pub use converter::Converter;
pub use discover::{find_heic_files, FileSelection};
pub use error::{ConversionError, DecodeError, EncodeError, Result};
pub use pipeline::{ConversionUnit, ConvertedImage};
pub use progress::{LogWriter, StatusBoard, WorkerLine};

/// Supported HEIC file extensions.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["heic", "heif"];

/// Check if a file extension is supported.
pub fn is_supported_extension(ext: &str) -> bool {
    SUPPORTED_EXTENSIONS
        .iter()
        .any(|&e| e.eq_ignore_ascii_case(ext))
}

/// Initialize logging to stderr.
///
/// `RUST_LOG` takes precedence; otherwise `default_directive` (for example
/// `"info"`) is used. Calling this more than once is harmless.
pub fn init_logging(default_directive: &str) {
    init_logging_with_writer(default_directive, std::io::stderr);
}

/// Initialize logging to `writer`, such as [`StatusBoard::log_writer`].
pub fn init_logging_with_writer<W>(default_directive: &str, writer: W)
where
    W: for<'w> tracing_subscriber::fmt::MakeWriter<'w> + Send + Sync + 'static,
{
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer))
        .with(filter)
        .try_init();
}
