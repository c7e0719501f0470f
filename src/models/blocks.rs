//! Building blocks shared by the encoder and decoder.

use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        BatchNorm, BatchNormConfig, PaddingConfig2d, Relu,
    },
    prelude::*,
    tensor::{
        module::interpolate,
        ops::{InterpolateMode, InterpolateOptions},
    },
};

/// Configuration for the [`DoubleConv`] block.
#[derive(Config, Debug)]
pub struct DoubleConvConfig {
    in_channels: usize,
    out_channels: usize,
    /// Batch-style normalization after the second convolution.
    #[config(default = true)]
    normalize: bool,
}

impl DoubleConvConfig {
    /// Initializes a `DoubleConv` block.
    pub fn init<B: Backend>(&self, device: &Device<B>) -> DoubleConv<B> {
        let conv1 = Conv2dConfig::new([self.in_channels, self.out_channels], [3, 3])
            .with_padding(PaddingConfig2d::Explicit(1, 1))
            .init(device);
        let conv2 = Conv2dConfig::new([self.out_channels, self.out_channels], [3, 3])
            .with_padding(PaddingConfig2d::Explicit(1, 1))
            .init(device);
        let norm = if self.normalize {
            Some(BatchNormConfig::new(self.out_channels).init(device))
        } else {
            None
        };

        DoubleConv {
            conv1,
            conv2,
            norm,
            relu: Relu::new(),
        }
    }
}

/// Two 3x3 same-padding convolutions with ReLU, optionally normalized.
///
/// The doubled convolution per stage stabilizes training on the small
/// datasets this pipeline targets.
#[derive(Module, Debug)]
pub struct DoubleConv<B: Backend> {
    conv1: Conv2d<B>,
    conv2: Conv2d<B>,
    norm: Option<BatchNorm<B, 2>>,
    relu: Relu,
}

impl<B: Backend> DoubleConv<B> {
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.relu.forward(self.conv1.forward(x));
        let x = self.relu.forward(self.conv2.forward(x));
        match &self.norm {
            Some(norm) => norm.forward(x),
            None => x,
        }
    }
}

/// Configuration for the [`DecoderStage`] module.
#[derive(Config, Debug)]
pub struct DecoderStageConfig {
    in_channels: usize,
    skip_channels: usize,
    out_channels: usize,
    /// Passed through to the inner [`DoubleConv`].
    #[config(default = true)]
    normalize: bool,
}

impl DecoderStageConfig {
    /// Initializes a `DecoderStage` module.
    pub fn init<B: Backend>(&self, device: &Device<B>) -> DecoderStage<B> {
        let convs = DoubleConvConfig::new(self.in_channels + self.skip_channels, self.out_channels)
            .with_normalize(self.normalize)
            .init(device);

        DecoderStage { convs }
    }
}

/// One decoder stage: 2x upsample, skip concatenation, double convolution.
#[derive(Module, Debug)]
pub struct DecoderStage<B: Backend> {
    convs: DoubleConv<B>,
}

impl<B: Backend> DecoderStage<B> {
    /// Upsamples `x` to the skip tensor's resolution, concatenates along the
    /// channel axis, and convolves.
    pub fn forward(&self, x: Tensor<B, 4>, skip: Tensor<B, 4>) -> Tensor<B, 4> {
        let [_, _, height, width] = skip.dims();
        let x = interpolate(
            x,
            [height, width],
            InterpolateOptions::new(InterpolateMode::Nearest),
        );
        let x = Tensor::cat(vec![x, skip], 1);
        self.convs.forward(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestBackend = burn::backend::NdArray<f32>;

    #[test]
    fn double_conv_preserves_spatial_dims() {
        let device = Default::default();
        let block = DoubleConvConfig::new(3, 8).init::<TestBackend>(&device);

        let x = Tensor::<TestBackend, 4>::zeros([1, 3, 16, 16], &device);
        let y = block.forward(x);

        assert_eq!(y.shape().dims, [1, 8, 16, 16]);
    }

    #[test]
    fn decoder_stage_doubles_resolution_to_match_skip() {
        let device = Default::default();
        let stage = DecoderStageConfig::new(16, 8, 8).init::<TestBackend>(&device);

        let x = Tensor::<TestBackend, 4>::zeros([1, 16, 8, 8], &device);
        let skip = Tensor::<TestBackend, 4>::zeros([1, 8, 16, 16], &device);
        let y = stage.forward(x, skip);

        assert_eq!(y.shape().dims, [1, 8, 16, 16]);
    }
}
