//! Encoder-decoder network for per-pixel road probability maps.

mod blocks;
mod unet;

pub use blocks::{DecoderStage, DecoderStageConfig, DoubleConv, DoubleConvConfig};
pub use unet::{RoadNet, RoadNetConfig};
