use anyhow::Result;
use burn::backend::{ndarray::NdArrayDevice, Autodiff, NdArray};
use roadnet_burn::{pipeline, PipelineConfig};

/// Directory holding the aerial source images.
const IMAGES_DIR: &str = "dataset/images";
/// Directory holding the paired road masks (`<stem>_mask.<ext>`).
const MASKS_DIR: &str = "dataset/masks";
/// Directory that receives the trained model and all diagnostics.
const OUTPUT_DIR: &str = "artifacts";

type TrainingBackend = Autodiff<NdArray>;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let config = PipelineConfig::new(
        IMAGES_DIR.to_owned(),
        MASKS_DIR.to_owned(),
        OUTPUT_DIR.to_owned(),
    );
    let device = NdArrayDevice::default();

    let summary = pipeline::run::<TrainingBackend>(&config, &device)?;

    tracing::info!(
        threshold = summary.selected_threshold,
        validation_samples = summary.validation_samples,
        epochs = summary.history.len(),
        "run complete"
    );
    Ok(())
}
