//! Validation metrics for binary segmentation.
//!
//! Probability maps are binarized at a fixed cutoff and compared against the
//! ground-truth masks through aggregate confusion counts, from which pixel
//! accuracy, precision, and recall derive.

use burn::{
    prelude::*,
    tensor::{backend::Backend, ElementConversion, Tensor},
};
use serde::{Deserialize, Serialize};

/// Cutoff at which probabilities become predictions for metric purposes.
pub const METRIC_CUTOFF: f64 = 0.5;

/// Aggregate pixel-level confusion counts.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ConfusionCounts {
    pub true_positives: f64,
    pub false_positives: f64,
    pub false_negatives: f64,
    pub true_negatives: f64,
}

impl ConfusionCounts {
    fn total(&self) -> f64 {
        self.true_positives + self.false_positives + self.false_negatives + self.true_negatives
    }

    pub fn accuracy(&self) -> f32 {
        let total = self.total();
        if total > 0.0 {
            ((self.true_positives + self.true_negatives) / total) as f32
        } else {
            0.0
        }
    }

    pub fn precision(&self) -> f32 {
        let predicted = self.true_positives + self.false_positives;
        if predicted > 0.0 {
            (self.true_positives / predicted) as f32
        } else {
            0.0
        }
    }

    pub fn recall(&self) -> f32 {
        let actual = self.true_positives + self.false_negatives;
        if actual > 0.0 {
            (self.true_positives / actual) as f32
        } else {
            0.0
        }
    }
}

impl std::ops::AddAssign for ConfusionCounts {
    fn add_assign(&mut self, other: Self) {
        self.true_positives += other.true_positives;
        self.false_positives += other.false_positives;
        self.false_negatives += other.false_negatives;
        self.true_negatives += other.true_negatives;
    }
}

/// Computes confusion counts between probability maps and binary targets.
pub fn confusion_counts<B: Backend>(
    probabilities: Tensor<B, 4>,
    targets: Tensor<B, 4>,
    cutoff: f64,
) -> ConfusionCounts {
    let total = probabilities.shape().num_elements() as f64;

    let predicted = probabilities.greater_elem(cutoff).float();
    let actual = targets.greater_elem(0.5).float();

    let tp = f64::from(
        (predicted.clone() * actual.clone())
            .sum()
            .into_scalar()
            .elem::<f32>(),
    );
    let predicted_positives = f64::from(predicted.sum().into_scalar().elem::<f32>());
    let actual_positives = f64::from(actual.sum().into_scalar().elem::<f32>());

    let fp = predicted_positives - tp;
    let fn_count = actual_positives - tp;
    let tn = total - predicted_positives - actual_positives + tp;

    ConfusionCounts {
        true_positives: tp,
        false_positives: fp,
        false_negatives: fn_count,
        true_negatives: tn,
    }
}

/// Validation scores for one pass over the holdout subset.
#[derive(Debug, Clone, Copy)]
pub struct ValidationScores {
    pub loss: f32,
    pub accuracy: f32,
    pub precision: f32,
    pub recall: f32,
}

/// One row of the training history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochMetrics {
    pub epoch: usize,
    pub train_loss: f32,
    pub valid_loss: f32,
    pub accuracy: f32,
    pub precision: f32,
    pub recall: f32,
}
