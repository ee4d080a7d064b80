//! Single-file conversion pipeline.
//!
//! Each conversion runs four stages in order: open the source, decode it,
//! create the destination, encode the PNG. The first failing stage ends the
//! conversion; the source file is never modified.

use crate::codec::{ImageDecoder, PngEncoder};
use crate::config::{BatchConfig, ConversionStage, OverwritePolicy, Task};
use crate::error::{ConversionError, DecodeError, EncodeError, Result};
use image::DynamicImage;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// Dimensions of a successfully written PNG.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvertedImage {
    pub width: u32,
    pub height: u32,
}

/// Converts one source image into one PNG file.
#[derive(Clone)]
pub struct ConversionUnit {
    decoder: Arc<dyn ImageDecoder>,
    encoder: PngEncoder,
    overwrite: OverwritePolicy,
}

impl std::fmt::Debug for ConversionUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversionUnit")
            .field("encoder", &self.encoder)
            .field("overwrite", &self.overwrite)
            .finish_non_exhaustive()
    }
}

impl ConversionUnit {
    pub fn new(
        decoder: Arc<dyn ImageDecoder>,
        encoder: PngEncoder,
        overwrite: OverwritePolicy,
    ) -> Self {
        Self {
            decoder,
            encoder,
            overwrite,
        }
    }

    /// Build a unit with the batch's overwrite and compression settings.
    pub fn from_config(config: &BatchConfig, decoder: Arc<dyn ImageDecoder>) -> Self {
        Self::new(decoder, PngEncoder::new(config.compression), config.overwrite)
    }

    pub fn overwrite(&self) -> OverwritePolicy {
        self.overwrite
    }

    /// Convert `task.source` into `task.destination`.
    pub fn convert(&self, task: &Task) -> Result<ConvertedImage> {
        self.convert_with_progress(task, |_, _| {})
    }

    /// Convert with per-stage progress reporting.
    ///
    /// `progress` is called with `(completed_stages, total_stages)` after
    /// every stage that finishes.
    pub fn convert_with_progress<F>(&self, task: &Task, mut progress: F) -> Result<ConvertedImage>
    where
        F: FnMut(usize, usize),
    {
        let total = ConversionStage::TOTAL;

        let mut source = File::open(&task.source).map_err(|e| ConversionError::Open {
            path: task.source.clone(),
            source: e,
        })?;
        progress(ConversionStage::Open.step(), total);

        let bitmap = self.decode_source(&mut source, &task.source)?;
        drop(source);
        progress(ConversionStage::Decode.step(), total);

        let output = self.create_destination(task)?;
        progress(ConversionStage::CreateOutput.step(), total);

        self.write_png(&bitmap, output, &task.destination)?;
        progress(ConversionStage::Encode.step(), total);

        debug!(
            input = %task.source.display(),
            output = %task.destination.display(),
            width = bitmap.width(),
            height = bitmap.height(),
            "wrote png"
        );

        Ok(ConvertedImage {
            width: bitmap.width(),
            height: bitmap.height(),
        })
    }

    fn decode_source(&self, source: &mut File, path: &Path) -> Result<DynamicImage> {
        let decode_err = |source: DecodeError| ConversionError::Decode {
            path: path.to_path_buf(),
            source,
        };

        let size_hint = source.metadata().map(|m| m.len() as usize).unwrap_or(0);
        let mut bytes = Vec::with_capacity(size_hint);
        source
            .read_to_end(&mut bytes)
            .map_err(|e| decode_err(DecodeError(format!("read failed: {}", e))))?;

        self.decoder.decode(&bytes).map_err(decode_err)
    }

    fn create_destination(&self, task: &Task) -> Result<File> {
        let path = task.destination.as_path();
        if same_file(&task.source, path) {
            return Err(ConversionError::Create {
                path: path.to_path_buf(),
                source: io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "destination is the source file",
                ),
            });
        }

        let opened = match self.overwrite {
            OverwritePolicy::Exclusive => OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(path),
            OverwritePolicy::Force => File::create(path),
        };

        opened.map_err(|e| match e.kind() {
            io::ErrorKind::AlreadyExists => ConversionError::DestinationExists {
                path: path.to_path_buf(),
            },
            _ => ConversionError::Create {
                path: path.to_path_buf(),
                source: e,
            },
        })
    }

    fn write_png(&self, bitmap: &DynamicImage, output: File, path: &Path) -> Result<()> {
        let mut writer = BufWriter::new(output);
        let result = self.encoder.encode_to(bitmap, &mut writer).and_then(|()| {
            writer
                .flush()
                .map_err(|e| EncodeError(format!("Failed to flush PNG: {}", e)))
        });
        drop(writer);

        if let Err(source) = result {
            // Don't leave a truncated PNG behind.
            if let Err(e) = fs::remove_file(path) {
                warn!(output = %path.display(), error = %e, "failed to remove partial output");
            }
            return Err(ConversionError::Encode {
                path: path.to_path_buf(),
                source,
            });
        }

        Ok(())
    }
}

/// Whether `a` and `b` name the same file, either literally or after
/// resolving links and relative components.
fn same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
