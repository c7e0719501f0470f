//! Shared helpers for integration tests: synthetic image/mask datasets
//! written to temporary directories.

use std::path::Path;

use image::{GrayImage, Luma, Rgb, RgbImage};

/// Source resolution of synthetic files; ingestion resizes them anyway.
pub const SOURCE_SIZE: u32 = 64;

/// Writes one `<name>.png` image and its `<name>_mask.png` mask.
///
/// The mask carries a horizontal road band when `with_foreground` is set and
/// is entirely black otherwise.
pub fn write_pair(images_dir: &Path, masks_dir: &Path, name: &str, with_foreground: bool) {
    let mut image = RgbImage::new(SOURCE_SIZE, SOURCE_SIZE);
    for (x, y, pixel) in image.enumerate_pixels_mut() {
        *pixel = Rgb([(x * 3) as u8, (y * 3) as u8, 96]);
    }
    image
        .save(images_dir.join(format!("{name}.png")))
        .expect("write synthetic image");

    let mut mask = GrayImage::new(SOURCE_SIZE, SOURCE_SIZE);
    if with_foreground {
        for y in 24..40 {
            for x in 0..SOURCE_SIZE {
                mask.put_pixel(x, y, Luma([255]));
            }
        }
    }
    mask.save(masks_dir.join(format!("{name}_mask.png")))
        .expect("write synthetic mask");
}

/// Creates `images/` and `masks/` under `root` and fills them with `count`
/// foreground-bearing pairs named `pair_00`, `pair_01`, ...
pub fn write_dataset(root: &Path, count: usize) -> (std::path::PathBuf, std::path::PathBuf) {
    let images_dir = root.join("images");
    let masks_dir = root.join("masks");
    std::fs::create_dir_all(&images_dir).expect("create images dir");
    std::fs::create_dir_all(&masks_dir).expect("create masks dir");

    for i in 0..count {
        write_pair(&images_dir, &masks_dir, &format!("pair_{i:02}"), true);
    }
    (images_dir, masks_dir)
}
