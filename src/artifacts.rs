//! Visual diagnostics for a completed run.
//!
//! Every validation sample gets a side-by-side composite (original image,
//! ground-truth mask, thresholded prediction) plus individual files; the
//! composites are tiled into one aggregate grid. The first sample
//! additionally gets root-level artifacts and one mask per swept threshold.
//! The multi-panel summary is optional: a failure there is logged and the
//! rest of the pipeline is unaffected.

use std::{fs, path::Path};

use image::{imageops, GrayImage, RgbImage};

use crate::{
    config::PipelineConfig,
    dataset::RoadSample,
    error::{RoadNetError, RoadNetResult},
    inference::PredictionSet,
    threshold::{binarize, ThresholdCandidate},
};

/// Column cap of the aggregate grid.
pub const GRID_COLUMNS: usize = 4;

/// Grid geometry for a sample count: `(columns, rows)` with the column cap
/// applied and rows by ceiling division.
pub fn grid_dimensions(sample_count: usize) -> (usize, usize) {
    let columns = GRID_COLUMNS.min(sample_count.max(1));
    let rows = sample_count.div_ceil(columns);
    (columns, rows)
}

/// Writes the full artifact set under the configured output directory.
///
/// The selected threshold is applied uniformly to every sample.
///
/// # Errors
///
/// Returns an error if the output tree cannot be created or a primary
/// artifact cannot be written. The summary plot alone is best-effort.
pub fn generate(
    config: &PipelineConfig,
    samples: &[RoadSample],
    predictions: &PredictionSet,
    selected_threshold: f64,
    candidates: &[ThresholdCandidate],
) -> RoadNetResult<()> {
    let output_dir = Path::new(&config.output_dir);
    let comparisons_dir = output_dir.join("comparisons");
    create_dir(&comparisons_dir)?;

    let size = predictions.resolution() as u32;

    let mut composites = Vec::with_capacity(samples.len());
    for (index, sample) in samples.iter().enumerate() {
        let original = image_panel(&sample.image, size);
        let truth = mask_panel(&sample.mask, size);
        let predicted = bits_panel(&binarize(predictions.map(index), selected_threshold), size);

        let composite = hstack(&[&original, &truth, &predicted]);
        save_rgb(
            &composite,
            &comparisons_dir.join(format!("comparison_{:02}.png", index + 1)),
        )?;

        let sample_dir = comparisons_dir.join(format!("sample_{:02}", index + 1));
        create_dir(&sample_dir)?;
        save_rgb(&original, &sample_dir.join("original.png"))?;
        save_rgb(&truth, &sample_dir.join("ground_truth.png"))?;
        save_rgb(&predicted, &sample_dir.join("prediction.png"))?;

        composites.push(composite);
    }

    write_grid(output_dir, &composites, size, samples.len())?;

    if let Some(sample) = samples.first() {
        let original = image_panel(&sample.image, size);
        let truth = mask_panel(&sample.mask, size);
        let predicted = bits_panel(&binarize(predictions.map(0), selected_threshold), size);

        save_rgb(&original, &output_dir.join("original.png"))?;
        save_rgb(&truth, &output_dir.join("ground_truth.png"))?;
        save_rgb(
            &predicted,
            &output_dir.join(format!("predicted_threshold_{selected_threshold:.2}.png")),
        )?;
        save_rgb(
            &hstack(&[&original, &truth, &predicted]),
            &output_dir.join("comparison.png"),
        )?;

        for candidate in candidates {
            save_gray(
                &bits_gray(&candidate.mask, size),
                &output_dir.join(format!("threshold_{:.2}.png", candidate.threshold)),
            )?;
        }

        if let Err(error) = write_summary(output_dir, &original, &truth, &predicted, candidates, size)
        {
            tracing::warn!(%error, "failed to write summary plot, continuing");
        }
    }

    tracing::info!(
        samples = samples.len(),
        output = %output_dir.display(),
        "artifacts written"
    );
    Ok(())
}

/// Tiles all composites row-major into one image; cells left uncovered by the
/// sample count stay black.
fn write_grid(
    output_dir: &Path,
    composites: &[RgbImage],
    size: u32,
    sample_count: usize,
) -> RoadNetResult<()> {
    let (columns, rows) = grid_dimensions(sample_count);
    let cell_width = 3 * size;
    let mut grid = RgbImage::new(columns as u32 * cell_width, rows as u32 * size);

    for (index, composite) in composites.iter().enumerate() {
        let row = (index / columns) as u32;
        let column = (index % columns) as u32;
        imageops::replace(
            &mut grid,
            composite,
            i64::from(column * cell_width),
            i64::from(row * size),
        );
    }

    save_rgb(&grid, &output_dir.join("grid.png"))
}

/// 2x4 overview montage: original, truth, and selected prediction on top;
/// the first four sweep masks below.
fn write_summary(
    output_dir: &Path,
    original: &RgbImage,
    truth: &RgbImage,
    predicted: &RgbImage,
    candidates: &[ThresholdCandidate],
    size: u32,
) -> RoadNetResult<()> {
    let mut summary = RgbImage::new(4 * size, 2 * size);

    for (index, panel) in [original, truth, predicted].into_iter().enumerate() {
        imageops::replace(&mut summary, panel, index as i64 * i64::from(size), 0);
    }
    for (index, candidate) in candidates.iter().take(4).enumerate() {
        let panel = bits_panel(&candidate.mask, size);
        imageops::replace(
            &mut summary,
            &panel,
            index as i64 * i64::from(size),
            i64::from(size),
        );
    }

    save_rgb(&summary, &output_dir.join("summary.png"))
}

fn create_dir(path: &Path) -> RoadNetResult<()> {
    fs::create_dir_all(path).map_err(|source| RoadNetError::OutputDirectoryFailed {
        path: path.to_path_buf(),
        source,
    })
}

fn save_rgb(image: &RgbImage, path: &Path) -> RoadNetResult<()> {
    image.save(path).map_err(|source| RoadNetError::ArtifactWriteFailed {
        path: path.to_path_buf(),
        source,
    })
}

fn save_gray(image: &GrayImage, path: &Path) -> RoadNetResult<()> {
    image.save(path).map_err(|source| RoadNetError::ArtifactWriteFailed {
        path: path.to_path_buf(),
        source,
    })
}

/// [0, 1] HWC float data to an RGB panel.
fn image_panel(data: &[f32], size: u32) -> RgbImage {
    let bytes: Vec<u8> = data
        .iter()
        .map(|&v| (v.clamp(0.0, 1.0) * 255.0).round() as u8)
        .collect();
    RgbImage::from_raw(size, size, bytes).expect("image buffer matches panel dimensions")
}

/// Binary {0, 1} float mask to an RGB panel, gray broadcast to three channels.
fn mask_panel(mask: &[f32], size: u32) -> RgbImage {
    let mut bytes = Vec::with_capacity(mask.len() * 3);
    for &value in mask {
        let level = if value > 0.0 { 255 } else { 0 };
        bytes.extend_from_slice(&[level, level, level]);
    }
    RgbImage::from_raw(size, size, bytes).expect("mask buffer matches panel dimensions")
}

/// Binarized prediction bits to an RGB panel.
fn bits_panel(bits: &[u8], size: u32) -> RgbImage {
    let mut bytes = Vec::with_capacity(bits.len() * 3);
    for &bit in bits {
        let level = if bit > 0 { 255 } else { 0 };
        bytes.extend_from_slice(&[level, level, level]);
    }
    RgbImage::from_raw(size, size, bytes).expect("bit buffer matches panel dimensions")
}

/// Binarized prediction bits to a single-channel mask file.
fn bits_gray(bits: &[u8], size: u32) -> GrayImage {
    let bytes: Vec<u8> = bits.iter().map(|&bit| if bit > 0 { 255 } else { 0 }).collect();
    GrayImage::from_raw(size, size, bytes).expect("bit buffer matches mask dimensions")
}

/// Horizontal concatenation of equally-tall panels.
fn hstack(panels: &[&RgbImage]) -> RgbImage {
    let height = panels.first().map_or(0, |panel| panel.height());
    let width = panels.iter().map(|panel| panel.width()).sum();
    let mut row = RgbImage::new(width, height);

    let mut x = 0i64;
    for panel in panels {
        imageops::replace(&mut row, *panel, x, 0);
        x += i64::from(panel.width());
    }
    row
}
