//! Intensity rescaling between 8-bit frames and unit-range floats.

use image::{GrayImage, ImageBuffer, Luma};

use epm_tracker_types::GrayFrame;

pub type FloatImage = ImageBuffer<Luma<f32>, Vec<f32>>;
pub type ByteImage = GrayImage;

/// Copies the visible samples of a frame into a packed image.
pub fn frame_to_image(frame: &GrayFrame) -> ByteImage {
    let width = frame.width() as usize;
    let height = frame.height() as usize;
    let mut data = Vec::with_capacity(width * height);
    for r in 0..height {
        data.extend_from_slice(frame.row(r));
    }
    GrayImage::from_raw(frame.width(), frame.height(), data)
        .unwrap_or_else(|| GrayImage::new(frame.width(), frame.height()))
}

/// Scales `img` so its maximum maps to 1.0. An all-zero image stays zero.
pub fn to_unit_float(img: &ByteImage) -> FloatImage {
    let max = img.as_raw().iter().copied().max().unwrap_or(0);
    if max == 0 {
        return FloatImage::new(img.width(), img.height());
    }
    let max = max as f32;
    let data = img.as_raw().iter().map(|&v| v as f32 / max).collect();
    FloatImage::from_raw(img.width(), img.height(), data)
        .unwrap_or_else(|| FloatImage::new(img.width(), img.height()))
}

/// Scales `img` so its maximum maps to 255, truncating to 8 bits.
pub fn to_byte(img: &FloatImage) -> ByteImage {
    let max = img
        .as_raw()
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(0.0f32, f32::max);
    if max <= 0.0 {
        return ByteImage::new(img.width(), img.height());
    }
    let data = img
        .as_raw()
        .iter()
        .map(|&v| {
            let scaled = v / max * 255.0;
            if scaled.is_finite() {
                scaled.clamp(0.0, 255.0) as u8
            } else {
                0
            }
        })
        .collect();
    ByteImage::from_raw(img.width(), img.height(), data)
        .unwrap_or_else(|| ByteImage::new(img.width(), img.height()))
}
