//! The road segmentation network.
//!
//! Shapes:
//! - Input images: `[B, 3, H, W]`, values in [0, 1]
//! - Output: `[B, 1, H, W]` per-pixel road probabilities
//!
//! H and W must be divisible by 8 (three 2x downsampling stages).

use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{MaxPool2d, MaxPool2dConfig},
        Dropout, DropoutConfig,
    },
    prelude::*,
    tensor::activation::sigmoid,
};

use super::blocks::{DecoderStage, DecoderStageConfig, DoubleConv, DoubleConvConfig};

/// Configuration for the [`RoadNet`] model.
#[derive(Config, Debug)]
pub struct RoadNetConfig {
    /// Number of input image channels.
    #[config(default = 3)]
    in_channels: usize,
    /// Channel width of the first encoder stage; deeper stages double it.
    #[config(default = 64)]
    base_channels: usize,
    /// Bottleneck dropout rate, the principal regularizer on small datasets.
    #[config(default = 0.3)]
    dropout: f64,
}

impl RoadNetConfig {
    /// Initializes an untrained `RoadNet`.
    pub fn init<B: Backend>(&self, device: &Device<B>) -> RoadNet<B> {
        let c1 = self.base_channels;
        let (c2, c3, c4) = (c1 * 2, c1 * 4, c1 * 8);

        RoadNet {
            enc1: DoubleConvConfig::new(self.in_channels, c1).init(device),
            enc2: DoubleConvConfig::new(c1, c2).init(device),
            enc3: DoubleConvConfig::new(c2, c3).init(device),
            pool: MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init(),
            bottleneck: DoubleConvConfig::new(c3, c4).init(device),
            dropout: DropoutConfig::new(self.dropout).init(),
            dec1: DecoderStageConfig::new(c4, c3, c3).init(device),
            dec2: DecoderStageConfig::new(c3, c2, c2).init(device),
            // The final stage feeds the head directly and skips normalization.
            dec3: DecoderStageConfig::new(c2, c1, c1)
                .with_normalize(false)
                .init(device),
            head: Conv2dConfig::new([c1, 1], [1, 1]).init(device),
        }
    }
}

/// Encoder-decoder with skip connections at three resolution levels.
///
/// Skip connections recover the spatial detail lost to downsampling; the
/// bottleneck dropout is active only under an autodiff backend, so inference
/// through [`burn::module::AutodiffModule::valid`] is deterministic.
#[derive(Module, Debug)]
pub struct RoadNet<B: Backend> {
    enc1: DoubleConv<B>,
    enc2: DoubleConv<B>,
    enc3: DoubleConv<B>,
    pool: MaxPool2d,
    bottleneck: DoubleConv<B>,
    dropout: Dropout,
    dec1: DecoderStage<B>,
    dec2: DecoderStage<B>,
    dec3: DecoderStage<B>,
    head: Conv2d<B>,
}

impl<B: Backend> RoadNet<B> {
    /// Maps a batch of images to per-pixel road probabilities.
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let skip1 = self.enc1.forward(x);
        let x = self.pool.forward(skip1.clone());
        let skip2 = self.enc2.forward(x);
        let x = self.pool.forward(skip2.clone());
        let skip3 = self.enc3.forward(x);
        let x = self.pool.forward(skip3.clone());

        let x = self.bottleneck.forward(x);
        let x = self.dropout.forward(x);

        let x = self.dec1.forward(x, skip3);
        let x = self.dec2.forward(x, skip2);
        let x = self.dec3.forward(x, skip1);

        sigmoid(self.head.forward(x))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestBackend = burn::backend::NdArray<f32>;

    #[test]
    fn forward_maps_images_to_single_channel_probabilities() {
        let device = Default::default();
        let model = RoadNetConfig::new()
            .with_base_channels(4)
            .init::<TestBackend>(&device);

        let x = Tensor::<TestBackend, 4>::random(
            [2, 3, 32, 32],
            burn::tensor::Distribution::Uniform(0.0, 1.0),
            &device,
        );
        let y = model.forward(x);

        assert_eq!(y.shape().dims, [2, 1, 32, 32]);
    }

    #[test]
    fn output_values_stay_in_unit_interval() {
        let device = Default::default();
        let model = RoadNetConfig::new()
            .with_base_channels(4)
            .init::<TestBackend>(&device);

        let x = Tensor::<TestBackend, 4>::random(
            [1, 3, 16, 16],
            burn::tensor::Distribution::Normal(0.0, 3.0),
            &device,
        );
        let y = model.forward(x);

        let max = y.clone().max().into_scalar();
        let min = y.min().into_scalar();
        assert!(max <= 1.0);
        assert!(min >= 0.0);
    }
}
