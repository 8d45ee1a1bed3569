use std::path::PathBuf;
use thiserror::Error;

use crate::ir::BoxId;
use crate::validation::ValidationReport;

/// The main error type for koma operations.
#[derive(Debug, Error)]
pub enum KomaError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid box geometry: width {width} and height {height} must both be positive")]
    InvalidGeometry { width: f64, height: f64 },

    #[error("Unknown box id {0}")]
    UnknownBoxId(BoxId),

    #[error("Box id {0} appears more than once")]
    DuplicateBoxId(BoxId),

    #[error("Box id {0} leaves no room for further ids")]
    BoxIdExhausted(BoxId),

    #[error("Requested order omits {} box(es): {:?}", .missing.len(), .missing)]
    IncompleteOrder { missing: Vec<BoxId> },

    #[error("Sequencer returned an invalid ordering for {expected} item(s): {message}")]
    SequencerContractViolation { expected: usize, message: String },

    #[error("Arrange mode is not active")]
    ArrangeNotRecording,

    #[error("Failed to parse annotation document {path}: {source}")]
    AnnotationParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write annotation document {path}: {source}")]
    AnnotationWrite {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to replace annotation document {path}: {source}")]
    AnnotationPersist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse label file {path} at line {line}: {message}")]
    LabelParse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("Failed to read image dimensions from {path}: {source}")]
    ImageDimensionRead {
        path: PathBuf,
        #[source]
        source: imagesize::ImageError,
    },

    #[error("Failed to parse config file {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Image '{0}' is not part of the workspace")]
    ImageNotFound(String),

    #[error("Workspace contains no images")]
    NoImageOpen,

    #[error("OCR failed for {path}: {message}")]
    OcrFailed { path: PathBuf, message: String },

    #[error("Validation failed with {error_count} error(s) and {warning_count} warning(s)")]
    ValidationFailed {
        error_count: usize,
        warning_count: usize,
        report: ValidationReport,
    },

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}
