use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("shadow bounds must be finite, positive and at most 4096dp (min={min}, max={max})")]
    InvalidBounds { min: f64, max: f64 },
    #[error("minimum shadow edge {min}dp exceeds maximum {max}dp")]
    InvertedBounds { min: f64, max: f64 },
    #[error("provider root '{0}' has an invalid name")]
    InvalidRootName(String),
    #[error("failed to resolve {what} directory: {reason}")]
    Directory { what: &'static str, reason: String },
}

#[derive(Debug, Error)]
pub enum ExposeError {
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),
    #[error("not a regular file: {}", .0.display())]
    NotAFile(PathBuf),
    #[error("{} is not inside any configured provider root", .0.display())]
    OutsideRoots(PathBuf),
    #[error("failed to build content uri: {0}")]
    Uri(String),
    #[error("failed to resolve {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum ShadowError {
    #[error("failed to open media file: {0}")]
    Open(String),
    #[error("failed to read image bounds: {0}")]
    Probe(String),
    #[error("failed to decode image: {0}")]
    Decode(String),
    #[error("media reports zero-sized dimensions")]
    EmptyDimensions,
    #[error("failed to extract video frame: {0}")]
    VideoFrame(String),
    #[error("failed to encode shadow: {0}")]
    Encode(String),
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("url '{0}' has no usable file name")]
    NoFileName(String),
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("native drag is not available on this platform")]
    Unsupported,
    #[error("no window available to start the drag from")]
    NoWindow,
    #[error("main thread dropped the drag request")]
    Dispatch,
    #[error("native drag failed: {0}")]
    Native(String),
}

/// Why a drag request ended in the `Failed` state.
#[derive(Debug, Error)]
pub enum DragFailure {
    #[error("source file is missing: {}", .0.display())]
    ResourceMissing(PathBuf),
    #[error("remote transfer failed: {0}")]
    Transfer(#[from] FetchError),
    #[error("could not expose file: {0}")]
    Expose(ExposeError),
    #[error("platform refused the drag: {0}")]
    Platform(#[from] PlatformError),
    #[error("background task failed: {0}")]
    Task(String),
}

impl From<ExposeError> for DragFailure {
    fn from(err: ExposeError) -> Self {
        match err {
            ExposeError::FileNotFound(path) => DragFailure::ResourceMissing(path),
            other => DragFailure::Expose(other),
        }
    }
}
