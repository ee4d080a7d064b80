//! Error types for heic2png conversion.

use crate::config::ConversionStage;
use std::path::PathBuf;
use thiserror::Error;

/// Failure reported by an image decoder.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct DecodeError(pub String);

/// Failure reported by the PNG encoder.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct EncodeError(pub String);

/// Main error type for the heic2png library.
#[derive(Error, Debug)]
pub enum ConversionError {
    /// Source file could not be opened.
    #[error("unable to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Source file could not be read or is not a valid image.
    #[error("unable to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: DecodeError,
    },

    /// Destination exists and overwriting was not requested.
    #[error("unable to create {path}: destination already exists")]
    DestinationExists { path: PathBuf },

    /// Destination file could not be created.
    #[error("unable to create {path}: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// PNG encoding or writing failed.
    #[error("unable to encode {path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: EncodeError,
    },

    /// Source removal after a successful conversion failed.
    #[error("unable to delete {path}: {source}")]
    Delete {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Directory enumeration failed.
    #[error("unable to list directory '{path}': {source}")]
    Discovery {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A worker thread could not be started.
    #[error("Failed to start worker thread: {0}")]
    WorkerSpawn(#[source] std::io::Error),

    /// Every worker is gone, so the task queue cannot accept work.
    #[error("task queue closed")]
    QueueClosed,
}

impl ConversionError {
    /// Pipeline stage that produced this error, for per-task failures.
    pub fn stage(&self) -> Option<ConversionStage> {
        match self {
            ConversionError::Open { .. } => Some(ConversionStage::Open),
            ConversionError::Decode { .. } => Some(ConversionStage::Decode),
            ConversionError::DestinationExists { .. } | ConversionError::Create { .. } => {
                Some(ConversionStage::CreateOutput)
            }
            ConversionError::Encode { .. } => Some(ConversionStage::Encode),
            _ => None,
        }
    }
}

/// Result type alias for convenience.
pub type Result<T> = std::result::Result<T, ConversionError>;

impl<T> From<crossbeam_channel::SendError<T>> for ConversionError {
    fn from(_: crossbeam_channel::SendError<T>) -> Self {
        ConversionError::QueueClosed
    }
}
