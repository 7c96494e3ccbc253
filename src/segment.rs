use crate::error::{TrackingError, TrackingResult};
use crate::mask::BinaryMask;
use crate::normalize::{ByteImage, FloatImage, to_unit_float};

const OTSU_BINS: usize = 256;

/// `background - frame` on the unit scale, so a subject darker than the
/// arena floor comes out positive.
pub fn subtract_background(frame: &ByteImage, background: &ByteImage) -> TrackingResult<FloatImage> {
    TrackingError::check_shape(frame.dimensions(), background.dimensions())?;
    let frame = to_unit_float(frame);
    let background = to_unit_float(background);
    let data = background
        .as_raw()
        .iter()
        .zip(frame.as_raw())
        .map(|(b, f)| b - f)
        .collect();
    FloatImage::from_raw(frame.width(), frame.height(), data)
        .ok_or_else(|| TrackingError::invalid_settings("difference buffer does not match shape"))
}

/// Otsu's cutoff over `values`, using 256 bins spanning the data range.
/// A constant input returns that constant.
pub fn otsu_threshold(values: &[f32]) -> f32 {
    let (min, max) = values
        .iter()
        .filter(|v| v.is_finite())
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    if !min.is_finite() {
        return 0.0;
    }
    if min == max {
        return min;
    }

    let min = min as f64;
    let span = max as f64 - min;
    let bin_width = span / OTSU_BINS as f64;
    let mut hist = [0.0f64; OTSU_BINS];
    for &v in values.iter().filter(|v| v.is_finite()) {
        let bin = (((v as f64 - min) / span) * OTSU_BINS as f64) as usize;
        hist[bin.min(OTSU_BINS - 1)] += 1.0;
    }
    let centers: Vec<f64> = (0..OTSU_BINS)
        .map(|i| min + (i as f64 + 0.5) * bin_width)
        .collect();

    // Class weights and means for every split point, below and above.
    let mut weight_low = [0.0f64; OTSU_BINS];
    let mut mean_low = [0.0f64; OTSU_BINS];
    let (mut w, mut m) = (0.0, 0.0);
    for i in 0..OTSU_BINS {
        w += hist[i];
        m += hist[i] * centers[i];
        weight_low[i] = w;
        mean_low[i] = if w > 0.0 { m / w } else { 0.0 };
    }
    let mut weight_high = [0.0f64; OTSU_BINS];
    let mut mean_high = [0.0f64; OTSU_BINS];
    let (mut w, mut m) = (0.0, 0.0);
    for i in (0..OTSU_BINS).rev() {
        w += hist[i];
        m += hist[i] * centers[i];
        weight_high[i] = w;
        mean_high[i] = if w > 0.0 { m / w } else { 0.0 };
    }

    let mut best = 0;
    let mut best_variance = f64::NEG_INFINITY;
    for i in 0..OTSU_BINS - 1 {
        let diff = mean_low[i] - mean_high[i + 1];
        let variance = weight_low[i] * weight_high[i + 1] * diff * diff;
        if variance > best_variance {
            best_variance = variance;
            best = i;
        }
    }
    centers[best] as f32
}

/// Background-subtracts `frame` and keeps pixels whose difference exceeds
/// `cutoff`, or Otsu's cutoff when none is given. Cutoffs are on the unit
/// scale; percentages must be divided by 100 first.
pub fn threshold(
    frame: &ByteImage,
    background: &ByteImage,
    cutoff: Option<f32>,
) -> TrackingResult<BinaryMask> {
    let diff = subtract_background(frame, background)?;
    let cutoff = effective_cutoff(&diff, cutoff);
    Ok(threshold_difference(&diff, cutoff))
}

/// The cutoff a threshold pass uses: the given one, or Otsu's on the difference.
pub fn effective_cutoff(diff: &FloatImage, cutoff: Option<f32>) -> f32 {
    cutoff.unwrap_or_else(|| otsu_threshold(diff.as_raw()))
}

pub fn threshold_difference(diff: &FloatImage, cutoff: f32) -> BinaryMask {
    let values = diff.as_raw();
    let width = diff.width() as usize;
    BinaryMask::from_fn(diff.width(), diff.height(), |r, c| {
        values[r * width + c] > cutoff
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const FLOOR: u8 = 200;

    fn frame_with_square(width: u32, height: u32, square: (u32, u32, u32), value: u8) -> ByteImage {
        let (r0, c0, size) = square;
        ByteImage::from_fn(width, height, |c, r| {
            if (r0..r0 + size).contains(&r) && (c0..c0 + size).contains(&c) {
                image::Luma([value])
            } else {
                image::Luma([FLOOR])
            }
        })
    }

    #[test]
    fn fixed_cutoff_marks_exactly_the_subject() {
        let frame = frame_with_square(20, 16, (4, 6, 5), 20);
        let background = ByteImage::from_pixel(20, 16, image::Luma([FLOOR]));
        let mask = threshold(&frame, &background, Some(0.5)).unwrap();
        assert_eq!(mask.count(), 25);
        for r in 0..16 {
            for c in 0..20 {
                let inside = (4..9).contains(&r) && (6..11).contains(&c);
                assert_eq!(mask.get(r, c), inside, "pixel ({r}, {c})");
            }
        }
    }

    #[test]
    fn brighter_than_background_is_not_foreground() {
        let frame = frame_with_square(10, 10, (2, 2, 3), 255);
        let background = ByteImage::from_pixel(10, 10, image::Luma([FLOOR]));
        let mask = threshold(&frame, &background, Some(0.0)).unwrap();
        // The square normalizes to 1.0, the same as the background.
        assert!(!mask.get(3, 3));
    }

    #[test]
    fn otsu_splits_bimodal_data() {
        let mut values = vec![0.0f32; 100];
        values.extend(vec![0.8f32; 20]);
        let cutoff = otsu_threshold(&values);
        assert!(cutoff > 0.0 && cutoff < 0.8, "cutoff {cutoff}");
    }

    #[test]
    fn otsu_on_constant_data_returns_the_constant() {
        assert_eq!(otsu_threshold(&[0.25; 10]), 0.25);
    }

    #[test]
    fn automatic_cutoff_finds_the_subject() {
        let frame = frame_with_square(20, 20, (8, 8, 4), 10);
        let background = ByteImage::from_pixel(20, 20, image::Luma([FLOOR]));
        let mask = threshold(&frame, &background, None).unwrap();
        assert_eq!(mask.count(), 16);
    }

    #[test]
    fn given_cutoff_wins_over_otsu() {
        let frame = frame_with_square(20, 20, (8, 8, 4), 10);
        let background = ByteImage::from_pixel(20, 20, image::Luma([FLOOR]));
        let diff = subtract_background(&frame, &background).unwrap();
        assert_eq!(effective_cutoff(&diff, Some(0.3)), 0.3);

        let automatic = effective_cutoff(&diff, None);
        assert_eq!(automatic, otsu_threshold(diff.as_raw()));
        assert_eq!(threshold_difference(&diff, automatic).count(), 16);
    }

    #[test]
    fn mismatched_shapes_are_rejected() {
        let frame = ByteImage::new(4, 4);
        let background = ByteImage::new(4, 5);
        assert!(matches!(
            threshold(&frame, &background, None),
            Err(TrackingError::ShapeMismatch { .. })
        ));
    }
}
