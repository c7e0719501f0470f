//! Run configuration for the road segmentation pipeline.
//!
//! Directory paths and hyperparameters are fixed per run; there is no CLI or
//! environment surface. The defaults reproduce the reference experiment:
//! 128x128 inputs, a 15% holdout at seed 42, 35 epochs of Adam at 1e-4 with
//! single-sample batches.

use burn::prelude::*;

/// Configuration shared by every stage of the pipeline.
#[derive(Config, Debug)]
pub struct PipelineConfig {
    /// Directory containing the aerial source images.
    pub images_dir: String,

    /// Directory containing the paired road masks.
    pub masks_dir: String,

    /// Directory that receives the trained model and all diagnostic artifacts.
    pub output_dir: String,

    /// Working spatial resolution; images and masks are resized to this square.
    #[config(default = 128)]
    pub resolution: usize,

    /// Fraction of the validated dataset held out for validation.
    #[config(default = 0.15)]
    pub validation_fraction: f64,

    /// Seed for the deterministic holdout shuffle.
    #[config(default = 42)]
    pub seed: u64,

    /// Minimum validated sample count below which training is refused.
    #[config(default = 8)]
    pub min_samples: usize,

    /// Number of optimization epochs.
    #[config(default = 35)]
    pub num_epochs: usize,

    /// Per-step batch size. Kept minimal to favor per-sample gradient signal
    /// on small datasets.
    #[config(default = 1)]
    pub batch_size: usize,

    /// Fixed Adam learning rate.
    #[config(default = 1e-4)]
    pub learning_rate: f64,

    /// Channel width of the first encoder stage; deeper stages double it.
    #[config(default = 64)]
    pub base_channels: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_experiment() {
        let config = PipelineConfig::new(
            "images".to_owned(),
            "masks".to_owned(),
            "out".to_owned(),
        );

        assert_eq!(config.resolution, 128);
        assert_eq!(config.validation_fraction, 0.15);
        assert_eq!(config.seed, 42);
        assert_eq!(config.min_samples, 8);
        assert_eq!(config.num_epochs, 35);
        assert_eq!(config.batch_size, 1);
        assert_eq!(config.learning_rate, 1e-4);
        assert_eq!(config.base_channels, 64);
    }

    #[test]
    fn builders_override_fields() {
        let config = PipelineConfig::new(
            "images".to_owned(),
            "masks".to_owned(),
            "out".to_owned(),
        )
        .with_resolution(32)
        .with_num_epochs(2)
        .with_base_channels(4);

        assert_eq!(config.resolution, 32);
        assert_eq!(config.num_epochs, 2);
        assert_eq!(config.base_channels, 4);
    }
}
