//! End-to-end orchestration.
//!
//! Data flows strictly forward through explicit values: validated dataset,
//! trained model, prediction set, selected threshold, artifacts. Each stage
//! receives what it needs by reference; there is no ambient run state.

use std::{fs, path::Path};

use burn::{module::AutodiffModule, tensor::backend::AutodiffBackend};

use crate::{
    artifacts,
    config::PipelineConfig,
    dataset::RoadDataset,
    error::{RoadNetError, RoadNetResult},
    inference,
    metrics::EpochMetrics,
    models::RoadNetConfig,
    threshold, training,
};

/// File stem of the persisted model artifact; the recorder adds its extension.
pub const MODEL_FILE_STEM: &str = "road_model";

/// File name of the serialized per-epoch metric history.
pub const HISTORY_FILE: &str = "training_history.json";

/// What a completed run produced.
#[derive(Debug)]
pub struct RunSummary {
    pub total_samples: usize,
    pub train_samples: usize,
    pub validation_samples: usize,
    pub selected_threshold: f64,
    pub history: Vec<EpochMetrics>,
}

/// Runs the whole pipeline: ingest, split, train, persist, predict,
/// calibrate, and generate artifacts.
///
/// # Errors
///
/// Propagates fatal conditions: unusable input directories, zero validated
/// pairs, fewer samples than the training minimum, divergent loss, model
/// persistence failure, or a primary artifact write failure.
pub fn run<B: AutodiffBackend>(
    config: &PipelineConfig,
    device: &B::Device,
) -> RoadNetResult<RunSummary> {
    tracing::info!(
        images = %config.images_dir,
        masks = %config.masks_dir,
        output = %config.output_dir,
        resolution = config.resolution,
        "starting road segmentation run"
    );

    let output_dir = Path::new(&config.output_dir);
    fs::create_dir_all(output_dir).map_err(|source| RoadNetError::OutputDirectoryFailed {
        path: output_dir.to_path_buf(),
        source,
    })?;

    let dataset = RoadDataset::load(config)?;
    let total_samples = dataset.len();
    if total_samples < config.min_samples {
        return Err(RoadNetError::InsufficientData {
            found: total_samples,
            required: config.min_samples,
        });
    }

    let (train_set, valid_set) = dataset.split(config.validation_fraction, config.seed);
    let train_samples = train_set.len();
    let valid_samples = valid_set.into_samples();
    tracing::info!(
        train = train_samples,
        validation = valid_samples.len(),
        "dataset split"
    );

    let model = RoadNetConfig::new()
        .with_base_channels(config.base_channels)
        .init::<B>(device);

    let outcome = training::train(config, model, train_set, &valid_samples, device)?;

    training::save_model(outcome.model.clone(), &output_dir.join(MODEL_FILE_STEM))?;
    write_history(output_dir, &outcome.history);

    let snapshot = outcome.model.valid();
    let predictions = inference::predict(&snapshot, &valid_samples, device)?;

    let candidates = threshold::sweep(predictions.map(0));
    let selected_threshold = threshold::select(&candidates);

    artifacts::generate(config, &valid_samples, &predictions, selected_threshold, &candidates)?;

    Ok(RunSummary {
        total_samples,
        train_samples,
        validation_samples: valid_samples.len(),
        selected_threshold,
        history: outcome.history,
    })
}

/// Serializes the metric history next to the model. Best-effort: the history
/// is a convenience artifact, not part of the run's primary outputs.
fn write_history(output_dir: &Path, history: &[EpochMetrics]) {
    let path = output_dir.join(HISTORY_FILE);
    match serde_json::to_string_pretty(history) {
        Ok(json) => {
            if let Err(error) = fs::write(&path, json) {
                tracing::warn!(path = %path.display(), %error, "failed to write training history");
            }
        }
        Err(error) => {
            tracing::warn!(%error, "failed to serialize training history");
        }
    }
}
