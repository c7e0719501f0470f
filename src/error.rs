use std::path::PathBuf;

use thiserror::Error;

/// The error type for road segmentation pipeline operations.
///
/// Fatal conditions (missing directories, no usable pairs, insufficient data,
/// numerical divergence, model persistence failures) abort the run; per-sample
/// decode problems and optional-artifact failures are logged at their call
/// sites instead of being raised.
#[derive(Error, Debug)]
pub enum RoadNetError {
    /// The configured images directory does not exist.
    #[error("image directory not found: {path}")]
    ImageDirectoryNotFound {
        /// The expected images directory path.
        path: PathBuf,
    },

    /// The configured masks directory does not exist.
    #[error("mask directory not found: {path}")]
    MaskDirectoryNotFound {
        /// The expected masks directory path.
        path: PathBuf,
    },

    /// Error when reading a directory fails.
    #[error("failed to read directory: {path}")]
    DirectoryReadFailed {
        /// The directory path that failed to read.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// No image/mask pair survived ingestion validation.
    #[error("no usable image/mask pairs found in: {path}")]
    NoValidPairs {
        /// The images directory that was scanned.
        path: PathBuf,
    },

    /// The validated dataset is too small to train on.
    #[error("insufficient data: {found} validated samples, training requires at least {required}")]
    InsufficientData {
        /// Number of samples that survived validation.
        found: usize,
        /// Minimum sample count required for training.
        required: usize,
    },

    /// Optimization produced a non-finite loss value.
    #[error("training diverged at epoch {epoch}: loss is not finite ({loss})")]
    DivergentLoss {
        /// The epoch during which divergence was detected.
        epoch: usize,
        /// The offending loss value.
        loss: f32,
    },

    /// Extracting host data from a tensor failed.
    #[error("tensor data conversion failed: {reason}")]
    TensorConversion {
        /// What was being converted and why it failed.
        reason: String,
    },

    /// Persisting the trained model failed.
    #[error("failed to save model to '{path}': {reason}")]
    ModelSaveFailed {
        /// The target artifact path.
        path: PathBuf,
        /// The recorder's failure description.
        reason: String,
    },

    /// Creating the output directory tree failed.
    #[error("failed to create output directory: {path}")]
    OutputDirectoryFailed {
        /// The directory that could not be created.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Writing a primary visual artifact failed.
    #[error("failed to write artifact: {path}")]
    ArtifactWriteFailed {
        /// The artifact file path.
        path: PathBuf,
        /// The underlying image encoding error.
        #[source]
        source: image::ImageError,
    },
}

/// A specialized `Result` type for pipeline operations.
pub type RoadNetResult<T> = Result<T, RoadNetError>;
