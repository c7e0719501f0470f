//! Road segmentation for aerial imagery.
//!
//! An offline experimentation pipeline: paired image/mask files on disk go
//! in; a trained encoder-decoder model, a calibrated decision threshold, and
//! side-by-side visual diagnostics come out.

pub mod artifacts;
pub mod config;
pub mod dataset;
pub mod error;
pub mod inference;
pub mod losses;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod threshold;
pub mod training;

pub use config::PipelineConfig;
pub use dataset::{RoadBatch, RoadBatcher, RoadDataset, RoadSample};
pub use error::{RoadNetError, RoadNetResult};
pub use inference::PredictionSet;
pub use models::{RoadNet, RoadNetConfig};
pub use pipeline::RunSummary;
