//! Batched inference over the validation subset.
//!
//! Predictions are computed exactly once per run and held in memory; both the
//! threshold selector and the artifact generator read the same
//! [`PredictionSet`] so they always see identical maps.

use burn::{data::dataloader::batcher::Batcher, tensor::backend::Backend};

use crate::{
    dataset::{RoadBatcher, RoadSample},
    error::{RoadNetError, RoadNetResult},
    models::RoadNet,
};

/// Ordered per-sample probability maps, one per validation sample.
#[derive(Debug, Clone)]
pub struct PredictionSet {
    maps: Vec<Vec<f32>>,
    resolution: usize,
}

impl PredictionSet {
    pub fn new(maps: Vec<Vec<f32>>, resolution: usize) -> Self {
        Self { maps, resolution }
    }

    pub fn len(&self) -> usize {
        self.maps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }

    pub fn resolution(&self) -> usize {
        self.resolution
    }

    /// The probability map for one sample, row-major, values in [0, 1].
    pub fn map(&self, index: usize) -> &[f32] {
        &self.maps[index]
    }
}

/// Runs the trained model over each sample independently, in subset order.
///
/// Samples are processed one at a time; no batch grouping is assumed.
///
/// # Errors
///
/// Returns [`RoadNetError::TensorConversion`] if a probability map cannot be
/// read back from the backend.
pub fn predict<B: Backend>(
    model: &RoadNet<B>,
    samples: &[RoadSample],
    device: &B::Device,
) -> RoadNetResult<PredictionSet> {
    let resolution = samples.first().map_or(0, |sample| sample.resolution);
    let batcher = RoadBatcher::<B>::new();
    let mut maps = Vec::with_capacity(samples.len());

    for sample in samples {
        let batch = batcher.batch(vec![sample.clone()], device);
        let probabilities = model.forward(batch.images);

        let map = probabilities
            .into_data()
            .to_vec::<f32>()
            .map_err(|error| RoadNetError::TensorConversion {
                reason: format!("prediction for sample '{}': {error:?}", sample.name),
            })?;
        maps.push(map);
    }

    tracing::info!(predictions = maps.len(), "validation inference complete");
    Ok(PredictionSet::new(maps, resolution))
}
