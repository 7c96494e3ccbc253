use serde::Serialize;

use crate::error::{TrackingError, TrackingResult};
use crate::mask::BinaryMask;
use crate::morphology::{RegionProps, erode_cross, label_regions};
use crate::normalize::ByteImage;
use crate::segment::threshold;

/// Outcome of searching one frame for the animal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DetectionResult {
    Found {
        /// `(row, col)` in pixels.
        centroid: (f64, f64),
        major_axis_length: f64,
        minor_axis_length: f64,
        area: usize,
    },
    NotFound,
}

impl DetectionResult {
    pub fn centroid(&self) -> Option<(f64, f64)> {
        match self {
            DetectionResult::Found { centroid, .. } => Some(*centroid),
            DetectionResult::NotFound => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, DetectionResult::Found { .. })
    }
}

impl From<&RegionProps> for DetectionResult {
    fn from(region: &RegionProps) -> Self {
        DetectionResult::Found {
            centroid: region.centroid,
            major_axis_length: region.major_axis_length,
            minor_axis_length: region.minor_axis_length,
            area: region.area,
        }
    }
}

/// Picks the largest region; equal areas resolve to the lowest label.
pub fn largest_region(regions: &[RegionProps]) -> Option<&RegionProps> {
    regions
        .iter()
        .fold(None, |best: Option<&RegionProps>, region| match best {
            Some(current) if current.area >= region.area => Some(current),
            _ => Some(region),
        })
}

/// Finds the animal in `frame`: threshold against `background`, erode once,
/// gate by `inclusion`, then keep the largest 8-connected component.
pub fn detect(
    frame: &ByteImage,
    background: &ByteImage,
    cutoff: Option<f32>,
    inclusion: Option<&BinaryMask>,
) -> TrackingResult<DetectionResult> {
    let mask = threshold(frame, background, cutoff)?;
    let mut eroded = erode_cross(&mask);
    if let Some(inclusion) = inclusion {
        TrackingError::check_shape(eroded.shape(), inclusion.shape())?;
        eroded.retain_within(inclusion);
    }
    let regions = label_regions(&eroded);
    Ok(largest_region(&regions)
        .map(DetectionResult::from)
        .unwrap_or(DetectionResult::NotFound))
}
