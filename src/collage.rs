// 🖼️ Collage Builder - stitch photos side by side on a white canvas
// All tiles share the smallest input height; widths keep each photo's aspect ratio

use crate::error::{DepotError, Result};
use image::{imageops::FilterType, DynamicImage, GenericImage, ImageReader, Rgb, RgbImage};
use std::path::{Path, PathBuf};
use tracing::info;

/// Space between two neighbouring tiles
pub const GAP: u32 = 20;

/// White border on every side of the canvas
pub const MARGIN: u32 = 25;

// ============================================================================
// LAYOUT
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollageLayout {
    pub width: u32,
    pub height: u32,
    pub tiles: Vec<Tile>,
}

impl CollageLayout {
    /// Place images of the given `(width, height)` sizes left to right
    pub fn compute(sizes: &[(u32, u32)]) -> Result<Self> {
        if sizes.is_empty() {
            return Err(DepotError::Business(
                "a collage needs at least one image".to_string(),
            ));
        }
        if sizes.iter().any(|&(w, h)| w == 0 || h == 0) {
            return Err(DepotError::Business(
                "cannot build a collage from an empty image".to_string(),
            ));
        }

        let min_height = sizes.iter().map(|&(_, h)| h).min().unwrap_or(1);

        let mut tiles = Vec::with_capacity(sizes.len());
        let mut x = MARGIN;
        for &(w, h) in sizes {
            let width = ((w as u64 * min_height as u64) / h as u64).max(1) as u32;
            tiles.push(Tile {
                x,
                y: MARGIN,
                width,
                height: min_height,
            });
            x += width + GAP;
        }

        let tiles_width: u32 = tiles.iter().map(|t| t.width).sum();
        let gaps = (tiles.len() as u32 - 1) * GAP;

        Ok(CollageLayout {
            width: tiles_width + gaps + 2 * MARGIN,
            height: min_height + 2 * MARGIN,
            tiles,
        })
    }
}

// ============================================================================
// RENDERING
// ============================================================================

/// Centre-crop `img` to the aspect ratio of `width`×`height`, then resize to it
fn fit(img: &DynamicImage, width: u32, height: u32) -> DynamicImage {
    let (src_w, src_h) = (img.width(), img.height());
    let target_ratio = width as f64 / height as f64;
    let source_ratio = src_w as f64 / src_h as f64;

    let (crop_w, crop_h) = if source_ratio > target_ratio {
        (((target_ratio * src_h as f64).round() as u32).clamp(1, src_w), src_h)
    } else {
        (src_w, ((src_w as f64 / target_ratio).round() as u32).clamp(1, src_h))
    };
    let x = (src_w - crop_w) / 2;
    let y = (src_h - crop_h) / 2;

    img.crop_imm(x, y, crop_w, crop_h)
        .resize_exact(width, height, FilterType::Lanczos3)
}

/// Compose images into one RGB canvas
pub fn compose(images: &[DynamicImage]) -> Result<RgbImage> {
    let sizes: Vec<(u32, u32)> = images.iter().map(|i| (i.width(), i.height())).collect();
    let layout = CollageLayout::compute(&sizes)?;

    let mut canvas = RgbImage::from_pixel(layout.width, layout.height, Rgb([255, 255, 255]));
    for (img, tile) in images.iter().zip(&layout.tiles) {
        let resized = fit(img, tile.width, tile.height).to_rgb8();
        canvas
            .copy_from(&resized, tile.x, tile.y)
            .map_err(|e| DepotError::Image {
                path: PathBuf::new(),
                source: e,
            })?;
    }

    Ok(canvas)
}

/// Open `sources`, compose them and save the result to `output`
pub fn build_collage(sources: &[PathBuf], output: &Path) -> Result<PathBuf> {
    let mut images = Vec::with_capacity(sources.len());
    for path in sources {
        // staged names always end in .jpg, PNG uploads included
        let reader = ImageReader::open(path)
            .and_then(|r| r.with_guessed_format())
            .map_err(|e| DepotError::io(path, e))?;
        let img = reader.decode().map_err(|e| DepotError::Image {
            path: path.clone(),
            source: e,
        })?;
        images.push(img);
    }

    let canvas = compose(&images)?;
    canvas.save(output).map_err(|e| DepotError::Image {
        path: output.to_path_buf(),
        source: e,
    })?;

    info!(
        output = %output.display(),
        sources = sources.len(),
        width = canvas.width(),
        height = canvas.height(),
        "collage written"
    );
    Ok(output.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(width: u32, height: u32, color: [u8; 3]) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(color)))
    }

    #[test]
    fn test_layout_three_images() {
        let layout = CollageLayout::compute(&[(400, 300), (300, 200), (200, 400)]).unwrap();

        // widths scaled to height 200: 266, 300, 100
        assert_eq!(layout.height, 200 + 50);
        assert_eq!(layout.width, 266 + 300 + 100 + 2 * 20 + 50);
        assert_eq!(layout.tiles[0], Tile { x: 25, y: 25, width: 266, height: 200 });
        assert_eq!(layout.tiles[1].x, 25 + 266 + 20);
        assert_eq!(layout.tiles[2].x, 25 + 266 + 20 + 300 + 20);
    }

    #[test]
    fn test_layout_partial_groups() {
        let single = CollageLayout::compute(&[(640, 480)]).unwrap();
        assert_eq!((single.width, single.height), (640 + 50, 480 + 50));

        let pair = CollageLayout::compute(&[(640, 480), (480, 640)]).unwrap();
        assert_eq!(pair.height, 480 + 50);
        assert_eq!(pair.width, 640 + 360 + 20 + 50);
    }

    #[test]
    fn test_layout_rejects_empty_input() {
        let err = CollageLayout::compute(&[]).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Business);
    }

    #[test]
    fn test_compose_paints_tiles_on_white() {
        let images = vec![
            solid(40, 40, [200, 0, 0]),
            solid(80, 40, [0, 200, 0]),
            solid(20, 80, [0, 0, 200]),
        ];
        let canvas = compose(&images).unwrap();

        assert_eq!(canvas.height(), 40 + 50);
        assert_eq!(canvas.width(), 40 + 80 + 10 + 40 + 50);
        assert_eq!(canvas.get_pixel(0, 0), &Rgb([255, 255, 255]));
        // gap between first and second tile stays white
        assert_eq!(canvas.get_pixel(25 + 40 + 10, 45), &Rgb([255, 255, 255]));

        let red = canvas.get_pixel(25 + 20, 45);
        assert!(red[0] > 150 && red[1] < 50 && red[2] < 50, "{:?}", red);
        let green = canvas.get_pixel(25 + 40 + 20 + 40, 45);
        assert!(green[1] > 150 && green[0] < 50, "{:?}", green);
    }

    #[test]
    fn test_build_collage_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.png");
        let b = dir.path().join("b.png");
        solid(30, 60, [10, 10, 10]).save(&a).unwrap();
        solid(60, 30, [90, 90, 90]).save(&b).unwrap();

        let out = dir.path().join("collage_12.jpg");
        build_collage(&[a, b], &out).unwrap();

        let written = image::open(&out).unwrap();
        assert_eq!(written.height(), 30 + 50);
        assert_eq!(written.width(), 15 + 60 + 20 + 50);
    }

    #[test]
    fn test_build_collage_missing_source() {
        let dir = tempfile::tempdir().unwrap();
        let err = build_collage(&[dir.path().join("nope.jpg")], &dir.path().join("out.jpg"))
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Io);
    }

    #[test]
    fn test_png_bytes_behind_jpg_name() {
        let dir = tempfile::tempdir().unwrap();
        let staged = dir.path().join("Dupont_13.jpg");
        solid(50, 20, [0, 0, 0])
            .save_with_format(&staged, image::ImageFormat::Png)
            .unwrap();

        let out = dir.path().join("collage_12.jpg");
        build_collage(&[staged], &out).unwrap();
        assert_eq!(image::open(&out).unwrap().height(), 20 + 50);
    }
}
