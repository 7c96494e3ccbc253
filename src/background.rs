//! Background image estimated as the per-pixel mean of randomly sampled frames.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use epm_tracker_decoder::FrameSource;

use crate::error::{TrackingError, TrackingResult};
use crate::normalize::ByteImage;

pub const DEFAULT_BACKGROUND_FRAMES: usize = 200;

/// Estimates the empty-arena image as the mean of randomly drawn frames.
pub struct BackgroundEstimator {
    rng: StdRng,
}

impl Default for BackgroundEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl BackgroundEstimator {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Draws `sample_count` indices with replacement from
    /// `[0, frame_count - 1)`. The final frame is never drawn; a one-frame
    /// video always yields index 0.
    pub fn sample_indices(&mut self, frame_count: usize, sample_count: usize) -> Vec<usize> {
        let upper = frame_count.saturating_sub(1).max(1);
        (0..sample_count)
            .map(|_| self.rng.gen_range(0..upper))
            .collect()
    }

    pub fn estimate<S>(&mut self, source: &S, sample_count: usize) -> TrackingResult<ByteImage>
    where
        S: FrameSource + ?Sized,
    {
        let frame_count = source.frame_count();
        if frame_count == 0 {
            return Err(TrackingError::invalid_settings(
                "cannot estimate a background from an empty video",
            ));
        }
        let indices = self.sample_indices(frame_count, sample_count);
        estimate_from_indices(source, &indices)
    }
}

/// Mean of the frames at `indices`, truncated to 8 bits.
pub fn estimate_from_indices<S>(source: &S, indices: &[usize]) -> TrackingResult<ByteImage>
where
    S: FrameSource + ?Sized,
{
    if indices.is_empty() {
        return Err(TrackingError::invalid_settings(
            "background estimation needs at least one frame",
        ));
    }
    let metadata = source.metadata();
    let width = metadata.width as usize;
    let height = metadata.height as usize;
    let mut sums = vec![0.0f64; width * height];

    for &index in indices {
        let frame = source.frame(index)?;
        TrackingError::check_shape(
            (frame.width(), frame.height()),
            (metadata.width, metadata.height),
        )?;
        for r in 0..height {
            let row = frame.row(r);
            let acc = &mut sums[r * width..(r + 1) * width];
            for (sum, &value) in acc.iter_mut().zip(row) {
                *sum += value as f64;
            }
        }
    }

    let n = indices.len() as f64;
    let data = sums.iter().map(|&sum| (sum / n) as u8).collect();
    debug!(samples = indices.len(), width, height, "estimated background");
    ByteImage::from_raw(metadata.width, metadata.height, data).ok_or_else(|| {
        TrackingError::invalid_settings("background buffer does not match frame shape")
    })
}
