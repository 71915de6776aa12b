// Image normalization ahead of digit recognition

use crate::core::constants::*;
use image::imageops::{self, FilterType};
use image::{GrayImage, Luma, RgbImage};
use imageproc::contrast::otsu_level;
use imageproc::distance_transform::Norm;
use imageproc::morphology;

/// Grayscale, edge-preserving denoise, Otsu binarization with polarity
/// detection, 3x3 opening, then a 2x cubic upscale.
pub fn normalize(region: &RgbImage) -> GrayImage {
    let gray = imageops::grayscale(region);
    let smooth = bilateral_filter(
        &gray,
        BILATERAL_DIAMETER,
        BILATERAL_SIGMA_COLOR,
        BILATERAL_SIGMA_SPACE,
    );

    let threshold = otsu_level(&smooth);
    let mut binary = binarize(&smooth, threshold);
    if white_ratio(&binary) < FOREGROUND_RATIO_THRESHOLD {
        imageops::invert(&mut binary);
    }

    let opened = open3x3(&binary);
    let (w, h) = opened.dimensions();
    imageops::resize(
        &opened,
        w * UPSCALE_FACTOR,
        h * UPSCALE_FACTOR,
        FilterType::CatmullRom,
    )
}

pub fn bilateral_filter(src: &GrayImage, diameter: u32, sigma_color: f64, sigma_space: f64) -> GrayImage {
    let (w, h) = src.dimensions();
    let radius = (diameter / 2) as i64;

    let color_weight: Vec<f64> = (0..256)
        .map(|d| (-((d * d) as f64) / (2.0 * sigma_color * sigma_color)).exp())
        .collect();

    let mut kernel = Vec::new();
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            let r2 = (dx * dx + dy * dy) as f64;
            if r2 <= (radius * radius) as f64 {
                kernel.push((dx, dy, (-r2 / (2.0 * sigma_space * sigma_space)).exp()));
            }
        }
    }

    GrayImage::from_fn(w, h, |x, y| {
        let center = src.get_pixel(x, y)[0];
        let mut sum = 0.0;
        let mut norm = 0.0;
        for &(dx, dy, space) in &kernel {
            let nx = (x as i64 + dx).clamp(0, w as i64 - 1) as u32;
            let ny = (y as i64 + dy).clamp(0, h as i64 - 1) as u32;
            let v = src.get_pixel(nx, ny)[0];
            let weight = space * color_weight[center.abs_diff(v) as usize];
            sum += weight * v as f64;
            norm += weight;
        }
        Luma([(sum / norm).round().clamp(0.0, 255.0) as u8])
    })
}

/// Pixels strictly above `threshold` become white.
pub fn binarize(img: &GrayImage, threshold: u8) -> GrayImage {
    GrayImage::from_fn(img.width(), img.height(), |x, y| {
        if img.get_pixel(x, y)[0] > threshold {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}

pub fn white_ratio(binary: &GrayImage) -> f64 {
    let total = binary.width() as u64 * binary.height() as u64;
    if total == 0 {
        return 0.0;
    }
    let white = binary.pixels().filter(|p| p[0] > 0).count();
    white as f64 / total as f64
}

/// Erosion then dilation with a 3x3 square; removes isolated specks.
pub fn open3x3(binary: &GrayImage) -> GrayImage {
    morphology::open(binary, Norm::LInf, 1)
}
