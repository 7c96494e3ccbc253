use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::arena::{Arena, ArenaGeometry};
use crate::geometry::{Point, Polygon};
use crate::trajectory::Trajectory;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArmGroup {
    Open,
    Closed,
}

impl fmt::Display for ArmGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArmGroup::Open => f.write_str("open"),
            ArmGroup::Closed => f.write_str("closed"),
        }
    }
}

#[derive(Debug, Error)]
pub enum StatsError {
    #[error("{group} arms have not been labeled on this arena")]
    ArmsNotLabeled { group: ArmGroup },

    #[error("pixels per unit must be positive and finite, got {0}")]
    InvalidScale(f64),
}

fn centroid_point(centroid: Option<(f64, f64)>) -> Option<Point> {
    centroid.map(|(r, c)| Point::new(r, c))
}

/// Share of all frames whose centroid lies in the given polygons. A frame
/// inside two polygons counts twice; missing frames count in the denominator.
pub fn fraction_in_region(trajectory: &Trajectory, polygons: &[&Polygon]) -> f64 {
    if trajectory.is_empty() {
        return 0.0;
    }
    let hits: usize = trajectory
        .centroids()
        .filter_map(centroid_point)
        .map(|p| polygons.iter().filter(|poly| poly.contains(&p)).count())
        .sum();
    hits as f64 / trajectory.len() as f64
}

pub fn time_in_center(trajectory: &Trajectory, geometry: &ArenaGeometry) -> f64 {
    fraction_in_region(trajectory, &[geometry.central_polygon()])
}

pub fn time_in_open_arms(trajectory: &Trajectory, arena: &Arena) -> Result<f64, StatsError> {
    let arms = arena.open_arms().ok_or(StatsError::ArmsNotLabeled {
        group: ArmGroup::Open,
    })?;
    Ok(fraction_in_region(trajectory, &arms))
}

pub fn time_in_closed_arms(trajectory: &Trajectory, arena: &Arena) -> Result<f64, StatsError> {
    let arms = arena.closed_arms().ok_or(StatsError::ArmsNotLabeled {
        group: ArmGroup::Closed,
    })?;
    Ok(fraction_in_region(trajectory, &arms))
}

fn check_scale(pixels_per_unit: f64) -> Result<(), StatsError> {
    if pixels_per_unit.is_finite() && pixels_per_unit > 0.0 {
        Ok(())
    } else {
        Err(StatsError::InvalidScale(pixels_per_unit))
    }
}

/// Step length between consecutive frames, `None` when either end is missing.
pub fn per_frame_distance(
    trajectory: &Trajectory,
    pixels_per_unit: f64,
) -> Result<Vec<Option<f64>>, StatsError> {
    check_scale(pixels_per_unit)?;
    let points: Vec<Option<Point>> = trajectory.centroids().map(centroid_point).collect();
    Ok(points
        .windows(2)
        .map(|pair| match (pair[0], pair[1]) {
            (Some(a), Some(b)) => Some(a.distance(&b) / pixels_per_unit),
            _ => None,
        })
        .collect())
}

pub fn total_distance(trajectory: &Trajectory, pixels_per_unit: f64) -> Result<f64, StatsError> {
    Ok(per_frame_distance(trajectory, pixels_per_unit)?
        .into_iter()
        .flatten()
        .sum())
}

/// Frames that fall in no region of the maze, including frames without a
/// detection.
pub fn unidentified_frames(trajectory: &Trajectory, geometry: &ArenaGeometry) -> Vec<usize> {
    trajectory
        .centroids()
        .enumerate()
        .filter(|(_, centroid)| {
            centroid_point(*centroid)
                .and_then(|p| geometry.region_of(&p))
                .is_none()
        })
        .map(|(frame, _)| frame)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub frames: usize,
    pub missing_frames: usize,
    pub unidentified_frames: usize,
    pub time_in_center: f64,
    /// Fraction per arm, indexed like the arena's arms.
    pub time_in_arms: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_in_open_arms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_in_closed_arms: Option<f64>,
    pub total_distance: f64,
    pub pixels_per_unit: f64,
}

pub fn summarize(
    trajectory: &Trajectory,
    arena: &Arena,
    pixels_per_unit: f64,
) -> Result<Summary, StatsError> {
    let geometry = arena.geometry();
    let labeled = arena.labels().is_some();
    Ok(Summary {
        frames: trajectory.len(),
        missing_frames: trajectory.missing_frames(),
        unidentified_frames: unidentified_frames(trajectory, geometry).len(),
        time_in_center: time_in_center(trajectory, geometry),
        time_in_arms: geometry
            .arms()
            .iter()
            .map(|arm| fraction_in_region(trajectory, &[arm]))
            .collect(),
        time_in_open_arms: labeled
            .then(|| time_in_open_arms(trajectory, arena))
            .transpose()?,
        time_in_closed_arms: labeled
            .then(|| time_in_closed_arms(trajectory, arena))
            .transpose()?,
        total_distance: total_distance(trajectory, pixels_per_unit)?,
        pixels_per_unit,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::ArmLabels;
    use crate::arena::tests::plus_nodes;
    use crate::blob::DetectionResult;

    fn at(r: f64, c: f64) -> DetectionResult {
        DetectionResult::Found {
            centroid: (r, c),
            major_axis_length: 10.0,
            minor_axis_length: 5.0,
            area: 40,
        }
    }

    fn square() -> Polygon {
        Polygon::new(vec![
            Point::new(0.0, 0.0),
            Point::new(0.0, 10.0),
            Point::new(10.0, 10.0),
            Point::new(10.0, 0.0),
        ])
    }

    #[test]
    fn gaps_break_the_distance_chain() {
        let gapped = Trajectory::from(vec![at(0.0, 0.0), DetectionResult::NotFound, at(3.0, 4.0)]);
        assert_eq!(per_frame_distance(&gapped, 1.0).unwrap(), vec![None, None]);
        assert_eq!(total_distance(&gapped, 1.0).unwrap(), 0.0);

        let joined = Trajectory::from(vec![at(0.0, 0.0), at(3.0, 4.0)]);
        assert_eq!(total_distance(&joined, 1.0).unwrap(), 5.0);
        assert_eq!(total_distance(&joined, 2.0).unwrap(), 2.5);
    }

    #[test]
    fn invalid_scale_is_rejected() {
        let trajectory = Trajectory::from(vec![at(0.0, 0.0), at(3.0, 4.0)]);
        for scale in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                total_distance(&trajectory, scale),
                Err(StatsError::InvalidScale(_))
            ));
        }
    }

    #[test]
    fn missing_frames_dilute_the_fraction() {
        // 6 frames, 4 detected and all inside, 2 missing.
        let trajectory = Trajectory::from(vec![
            at(5.0, 5.0),
            DetectionResult::NotFound,
            at(2.0, 2.0),
            at(8.0, 1.0),
            DetectionResult::NotFound,
            at(1.0, 9.0),
        ]);
        let polygon = square();
        assert!((fraction_in_region(&trajectory, &[&polygon]) - 4.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn overlapping_polygons_count_twice() {
        let trajectory = Trajectory::from(vec![at(5.0, 5.0), at(50.0, 50.0)]);
        let polygon = square();
        assert_eq!(fraction_in_region(&trajectory, &[&polygon, &polygon]), 1.0);
        assert_eq!(fraction_in_region(&Trajectory::new(), &[&polygon]), 0.0);
    }

    #[test]
    fn arm_fractions_require_labels() {
        let arena = Arena::from_nodes(&plus_nodes()).unwrap();
        let trajectory = Trajectory::from(vec![at(50.0, 160.0)]);
        assert!(matches!(
            time_in_open_arms(&trajectory, &arena),
            Err(StatsError::ArmsNotLabeled { group: ArmGroup::Open })
        ));
        assert!(matches!(
            time_in_closed_arms(&trajectory, &arena),
            Err(StatsError::ArmsNotLabeled { group: ArmGroup::Closed })
        ));

        let labeled = arena
            .with_labels(ArmLabels::new(vec![0, 2], vec![1, 3]).unwrap())
            .unwrap();
        assert_eq!(time_in_open_arms(&trajectory, &labeled).unwrap(), 1.0);
        assert_eq!(time_in_closed_arms(&trajectory, &labeled).unwrap(), 0.0);
    }

    fn central_walk() -> Vec<DetectionResult> {
        (0..25)
            .map(|i| at(111.0 + (i / 5) as f64 * 4.5, 151.0 + (i % 5) as f64 * 4.5))
            .collect()
    }

    #[test]
    fn every_frame_in_the_centre_gives_full_time_in_center() {
        let geometry = ArenaGeometry::from_nodes(&plus_nodes()).unwrap();
        let trajectory = Trajectory::from(central_walk());
        assert_eq!(trajectory.len(), 25);
        assert_eq!(time_in_center(&trajectory, &geometry), 1.0);
    }

    #[test]
    fn missing_frames_dilute_time_in_center() {
        let geometry = ArenaGeometry::from_nodes(&plus_nodes()).unwrap();
        let mut detections = central_walk();
        for index in [0, 7, 8, 19, 24] {
            detections[index] = DetectionResult::NotFound;
        }
        let trajectory = Trajectory::from(detections);
        let expected = (25.0 - 5.0) / 25.0;
        assert!((time_in_center(&trajectory, &geometry) - expected).abs() < 1e-12);
    }

    #[test]
    fn frames_outside_the_maze_are_unidentified() {
        let geometry = ArenaGeometry::from_nodes(&plus_nodes()).unwrap();
        let trajectory = Trajectory::from(vec![
            at(120.0, 160.0),
            at(20.0, 20.0),
            DetectionResult::NotFound,
            at(120.0, 250.0),
        ]);
        assert_eq!(unidentified_frames(&trajectory, &geometry), vec![1, 2]);
    }

    #[test]
    fn summary_omits_arm_groups_until_labeled() {
        let arena = Arena::from_nodes(&plus_nodes()).unwrap();
        let trajectory = Trajectory::from(vec![
            at(120.0, 160.0),
            at(50.0, 160.0),
            at(50.0, 163.0),
            DetectionResult::NotFound,
        ]);
        let summary = summarize(&trajectory, &arena, 1.0).unwrap();
        assert_eq!(summary.frames, 4);
        assert_eq!(summary.missing_frames, 1);
        assert_eq!(summary.time_in_center, 0.25);
        assert_eq!(summary.time_in_arms, vec![0.5, 0.0, 0.0, 0.0]);
        assert_eq!(summary.time_in_open_arms, None);
        assert!((summary.total_distance - (70.0 + 3.0)).abs() < 1e-12);

        let json = serde_json::to_value(&summary).unwrap();
        assert!(json.get("time_in_open_arms").is_none());
    }
}
