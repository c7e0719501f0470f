//! Dataset ingestion and validation.
//!
//! Image/mask pairs are read from two flat directories, resized to the working
//! resolution, normalized, and validated. Samples carry raw float buffers;
//! tensor creation and device placement happen in the batcher, following
//! Burn's dataset conventions.

use std::{
    fs,
    marker::PhantomData,
    path::{Path, PathBuf},
};

use burn::{
    data::{dataloader::batcher::Batcher, dataset::Dataset},
    tensor::{backend::Backend, Tensor, TensorData},
};
use image::imageops::FilterType;
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

use crate::{
    config::PipelineConfig,
    error::{RoadNetError, RoadNetResult},
};

/// Filename suffix that pairs a mask file with its image.
///
/// A mask is expected at `<masks_dir>/<image stem>_mask.<image extension>`.
const MASK_SUFFIX: &str = "_mask";

/// One validated image/mask pair at the working resolution.
#[derive(Debug, Clone)]
pub struct RoadSample {
    /// Source image file stem, kept for diagnostics.
    pub name: String,
    /// RGB image data in HWC order with values in [0, 1].
    pub image: Vec<f32>,
    /// Binary mask data in HW order with values in {0, 1}. Contains at least
    /// one positive pixel.
    pub mask: Vec<f32>,
    /// Side length of the square sample.
    pub resolution: usize,
}

impl RoadSample {
    /// Number of positive mask pixels.
    pub fn foreground_pixels(&self) -> usize {
        self.mask.iter().filter(|&&v| v > 0.0).count()
    }
}

/// A batch of samples as `[B, 3, H, W]` image and `[B, 1, H, W]` mask tensors.
#[derive(Debug, Clone)]
pub struct RoadBatch<B: Backend> {
    pub images: Tensor<B, 4>,
    pub masks: Tensor<B, 4>,
}

/// Converts vectors of [`RoadSample`] into [`RoadBatch`] tensors.
#[derive(Clone, Default)]
pub struct RoadBatcher<B: Backend> {
    _phantom: PhantomData<B>,
}

impl<B: Backend> RoadBatcher<B> {
    pub const fn new() -> Self {
        Self {
            _phantom: PhantomData,
        }
    }
}

impl<B: Backend> Batcher<B, RoadSample, RoadBatch<B>> for RoadBatcher<B> {
    fn batch(&self, items: Vec<RoadSample>, device: &B::Device) -> RoadBatch<B> {
        let mut images = Vec::with_capacity(items.len());
        let mut masks = Vec::with_capacity(items.len());

        for item in items {
            let size = item.resolution;

            // HWC to CHW
            let image = Tensor::<B, 3>::from_data(
                TensorData::new(item.image, [size, size, 3]),
                device,
            )
            .permute([2, 0, 1]);

            // Add the channel dimension
            let mask = Tensor::<B, 2>::from_data(TensorData::new(item.mask, [size, size]), device)
                .unsqueeze::<3>();

            images.push(image);
            masks.push(mask);
        }

        RoadBatch {
            images: Tensor::stack(images, 0),
            masks: Tensor::stack(masks, 0),
        }
    }
}

/// Ordered collection of validated samples.
#[derive(Debug, Clone)]
pub struct RoadDataset {
    samples: Vec<RoadSample>,
    resolution: usize,
}

impl RoadDataset {
    /// Loads and validates every image/mask pair under the configured
    /// directories.
    ///
    /// Images are iterated in lexicographic filename order. Pairs with a
    /// missing mask file, an undecodable image or mask, or a mask with no
    /// foreground at all are skipped with a warning. At least one pair must
    /// survive.
    ///
    /// # Errors
    ///
    /// Returns an error if either directory is missing or unreadable, or if
    /// no pair survives validation.
    pub fn load(config: &PipelineConfig) -> RoadNetResult<Self> {
        let images_dir = Path::new(&config.images_dir);
        let masks_dir = Path::new(&config.masks_dir);

        if !images_dir.is_dir() {
            return Err(RoadNetError::ImageDirectoryNotFound {
                path: images_dir.to_path_buf(),
            });
        }
        if !masks_dir.is_dir() {
            return Err(RoadNetError::MaskDirectoryNotFound {
                path: masks_dir.to_path_buf(),
            });
        }

        let mut image_paths = Vec::new();
        let entries = fs::read_dir(images_dir).map_err(|source| {
            RoadNetError::DirectoryReadFailed {
                path: images_dir.to_path_buf(),
                source,
            }
        })?;
        for entry in entries {
            let entry = entry.map_err(|source| RoadNetError::DirectoryReadFailed {
                path: images_dir.to_path_buf(),
                source,
            })?;
            let path = entry.path();
            if path.is_file() && has_supported_extension(&path) {
                image_paths.push(path);
            }
        }
        image_paths.sort();

        let mut samples = Vec::with_capacity(image_paths.len());
        for image_path in &image_paths {
            if let Some(sample) = load_pair(image_path, masks_dir, config.resolution) {
                samples.push(sample);
            }
        }

        if samples.is_empty() {
            return Err(RoadNetError::NoValidPairs {
                path: images_dir.to_path_buf(),
            });
        }

        tracing::info!(
            pairs = samples.len(),
            scanned = image_paths.len(),
            "ingestion complete"
        );

        Ok(Self {
            samples,
            resolution: config.resolution,
        })
    }

    /// Builds a dataset from already-validated samples.
    pub fn from_samples(samples: Vec<RoadSample>, resolution: usize) -> Self {
        Self {
            samples,
            resolution,
        }
    }

    pub fn samples(&self) -> &[RoadSample] {
        &self.samples
    }

    pub fn into_samples(self) -> Vec<RoadSample> {
        self.samples
    }

    pub fn resolution(&self) -> usize {
        self.resolution
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Splits the dataset into training and validation subsets.
    ///
    /// The holdout is a seeded shuffle taking `ceil(n * fraction)` samples
    /// (at least one, never all) for validation, so repeated runs over the
    /// same input produce identical subset membership.
    pub fn split(self, validation_fraction: f64, seed: u64) -> (Self, Self) {
        let n = self.samples.len();
        let resolution = self.resolution;
        let requested = (n as f64 * validation_fraction).ceil() as usize;
        let validation_count = requested.max(1).min(n.saturating_sub(1));

        let mut order: Vec<usize> = (0..n).collect();
        let mut rng = StdRng::seed_from_u64(seed);
        order.shuffle(&mut rng);

        let mut slots: Vec<Option<RoadSample>> = self.samples.into_iter().map(Some).collect();
        let mut validation = Vec::with_capacity(validation_count);
        let mut training = Vec::with_capacity(n - validation_count);
        for (position, index) in order.into_iter().enumerate() {
            let sample = slots[index].take().expect("each index is visited once");
            if position < validation_count {
                validation.push(sample);
            } else {
                training.push(sample);
            }
        }

        (
            Self::from_samples(training, resolution),
            Self::from_samples(validation, resolution),
        )
    }
}

impl Dataset<RoadSample> for RoadDataset {
    fn get(&self, index: usize) -> Option<RoadSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

fn has_supported_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            ["png", "jpg", "jpeg"]
                .iter()
                .any(|supported| ext.eq_ignore_ascii_case(supported))
        })
}

/// Loads, resizes, and validates one pair. Returns `None` (after logging) for
/// any recoverable per-sample problem.
fn load_pair(image_path: &Path, masks_dir: &Path, resolution: usize) -> Option<RoadSample> {
    let stem = image_path.file_stem()?.to_str()?;
    let extension = image_path.extension()?.to_str()?;
    let mask_path: PathBuf = masks_dir.join(format!("{stem}{MASK_SUFFIX}.{extension}"));

    if !mask_path.exists() {
        tracing::warn!(image = %image_path.display(), "no mask file for image, skipping pair");
        return None;
    }

    let image = match image::open(image_path) {
        Ok(image) => image,
        Err(error) => {
            tracing::warn!(image = %image_path.display(), %error, "failed to decode image, skipping pair");
            return None;
        }
    };
    let mask = match image::open(&mask_path) {
        Ok(mask) => mask,
        Err(error) => {
            tracing::warn!(mask = %mask_path.display(), %error, "failed to decode mask, skipping pair");
            return None;
        }
    };

    let size = resolution as u32;
    let image = image
        .resize_exact(size, size, FilterType::Lanczos3)
        .to_rgb32f();
    let mask = mask
        .resize_exact(size, size, FilterType::Nearest)
        .to_luma32f();

    let image_data = image.into_raw();
    // Any positive label value counts as foreground.
    let mask_data: Vec<f32> = mask
        .into_raw()
        .iter()
        .map(|&v| if v > 0.0 { 1.0 } else { 0.0 })
        .collect();

    let foreground = mask_data.iter().filter(|&&v| v > 0.0).count();
    if foreground == 0 {
        tracing::warn!(image = %image_path.display(), "mask has no foreground, skipping pair");
        return None;
    }
    tracing::debug!(image = %image_path.display(), foreground, "pair accepted");

    Some(RoadSample {
        name: stem.to_owned(),
        image: image_data,
        mask: mask_data,
        resolution,
    })
}
