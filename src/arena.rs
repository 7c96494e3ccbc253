//! Reconstruction of the plus-maze layout from twelve boundary points.
//!
//! The four points closest to the overall centroid form the central square.
//! The eight remaining points are paired by nearest neighbour into the far
//! ends of the arms, and each arm is closed with the two central points
//! nearest to its far edge.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::geometry::{Point, Polygon, centroid, indices_by_distance, sort_clockwise};

pub const NODE_COUNT: usize = 12;
pub const ARM_COUNT: usize = 4;
const CENTRAL_COUNT: usize = 4;
const MIN_NODE_SEPARATION: f64 = 1e-6;

#[derive(Debug, Error)]
pub enum ArenaError {
    #[error("arena needs exactly {expected} nodes, got {actual}")]
    NodeCount { expected: usize, actual: usize },

    #[error("arena node {index} has non-finite coordinates")]
    NonFiniteNode { index: usize },

    #[error("arena nodes do not form a plus maze: {reason}")]
    DegenerateGeometry { reason: String },

    #[error("arm index {index} is out of range 0..4")]
    InvalidArmIndex { index: usize },
}

impl ArenaError {
    fn degenerate(reason: impl Into<String>) -> Self {
        Self::DegenerateGeometry {
            reason: reason.into(),
        }
    }
}

/// Which part of the maze a point falls in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    Center,
    Arm(usize),
}

/// Arm and centre polygons of one maze. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArenaGeometry {
    central_nodes: Vec<Point>,
    central: Polygon,
    arms: Vec<Polygon>,
}

impl ArenaGeometry {
    pub fn from_nodes(nodes: &[Point]) -> Result<Self, ArenaError> {
        validate_nodes(nodes)?;

        let center = centroid(nodes);
        let by_distance = indices_by_distance(nodes, &center);
        let (central_idx, exterior_idx) = by_distance.split_at(CENTRAL_COUNT);
        let central_nodes = sort_clockwise(
            &central_idx.iter().map(|&i| nodes[i]).collect::<Vec<_>>(),
        );
        let exterior: Vec<Point> = exterior_idx.iter().map(|&i| nodes[i]).collect();

        let pairs = pair_exterior(&exterior)?;
        let mut usage = [0usize; CENTRAL_COUNT];
        let mut arms = Vec::with_capacity(ARM_COUNT);
        for (a, b) in pairs {
            let midpoint = centroid(&[exterior[a], exterior[b]]);
            let nearest = indices_by_distance(&central_nodes, &midpoint);
            let mut vertices = vec![exterior[a], exterior[b]];
            for &i in &nearest[..2] {
                usage[i] += 1;
                vertices.push(central_nodes[i]);
            }
            arms.push(Polygon::new(sort_clockwise(&vertices)));
        }
        if let Some(i) = usage.iter().position(|&n| n != 2) {
            return Err(ArenaError::degenerate(format!(
                "central node {i} closes {} arms instead of 2",
                usage[i]
            )));
        }

        let core = centroid(&central_nodes);
        arms.sort_by(|a, b| {
            a.centroid()
                .angle_about(&core)
                .partial_cmp(&b.centroid().angle_about(&core))
                .unwrap_or(Ordering::Equal)
        });

        debug!(center = ?core, "arena geometry built");
        Ok(Self {
            central: Polygon::new(central_nodes.clone()),
            central_nodes,
            arms,
        })
    }

    /// Central nodes, clockwise.
    pub fn central_nodes(&self) -> &[Point] {
        &self.central_nodes
    }

    pub fn central_polygon(&self) -> &Polygon {
        &self.central
    }

    /// Arms ordered clockwise about the centre, starting from the one at the
    /// smallest screen angle.
    pub fn arms(&self) -> &[Polygon] {
        &self.arms
    }

    pub fn arm(&self, index: usize) -> Result<&Polygon, ArenaError> {
        self.arms
            .get(index)
            .ok_or(ArenaError::InvalidArmIndex { index })
    }

    /// First region containing `point`; the centre wins over arms.
    pub fn region_of(&self, point: &Point) -> Option<Region> {
        if self.central.contains(point) {
            return Some(Region::Center);
        }
        self.arms
            .iter()
            .position(|arm| arm.contains(point))
            .map(Region::Arm)
    }
}

fn validate_nodes(nodes: &[Point]) -> Result<(), ArenaError> {
    if nodes.len() != NODE_COUNT {
        return Err(ArenaError::NodeCount {
            expected: NODE_COUNT,
            actual: nodes.len(),
        });
    }
    if let Some(index) = nodes.iter().position(|p| !p.is_finite()) {
        return Err(ArenaError::NonFiniteNode { index });
    }
    for (i, a) in nodes.iter().enumerate() {
        for (j, b) in nodes.iter().enumerate().skip(i + 1) {
            if a.distance(b) < MIN_NODE_SEPARATION {
                return Err(ArenaError::degenerate(format!(
                    "nodes {i} and {j} coincide"
                )));
            }
        }
    }
    Ok(())
}

/// Greedy nearest-neighbour pairing of the exterior nodes. Succeeds only when
/// the pass yields four disjoint pairs.
fn pair_exterior(exterior: &[Point]) -> Result<Vec<(usize, usize)>, ArenaError> {
    let mut pairs: Vec<(usize, usize)> = Vec::with_capacity(ARM_COUNT);
    for (i, point) in exterior.iter().enumerate() {
        let Some(&j) = indices_by_distance(exterior, point)
            .iter()
            .find(|&&j| j != i)
        else {
            continue;
        };
        let key = (i.min(j), i.max(j));
        if !pairs.contains(&key) {
            pairs.push(key);
        }
    }

    let mut seen = BTreeSet::new();
    let disjoint = pairs.iter().all(|&(a, b)| seen.insert(a) && seen.insert(b));
    if pairs.len() != ARM_COUNT || !disjoint || seen.len() != exterior.len() {
        return Err(ArenaError::degenerate(format!(
            "nearest-neighbour pairing of exterior nodes gave {} edges, expected {ARM_COUNT} disjoint edges",
            pairs.len()
        )));
    }
    Ok(pairs)
}

/// Open and closed arm assignment, supplied after the geometry is known.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArmLabels {
    pub open: Vec<usize>,
    pub closed: Vec<usize>,
}

impl ArmLabels {
    pub fn new(open: Vec<usize>, closed: Vec<usize>) -> Result<Self, ArenaError> {
        let labels = Self { open, closed };
        labels.validate()?;
        Ok(labels)
    }

    fn validate(&self) -> Result<(), ArenaError> {
        match self
            .open
            .iter()
            .chain(&self.closed)
            .find(|&&index| index >= ARM_COUNT)
        {
            Some(&index) => Err(ArenaError::InvalidArmIndex { index }),
            None => Ok(()),
        }
    }
}

/// Geometry plus an optional arm labelling.
#[derive(Debug, Clone, PartialEq)]
pub struct Arena {
    geometry: ArenaGeometry,
    labels: Option<ArmLabels>,
}

impl Arena {
    pub fn new(geometry: ArenaGeometry) -> Self {
        Self {
            geometry,
            labels: None,
        }
    }

    pub fn from_nodes(nodes: &[Point]) -> Result<Self, ArenaError> {
        ArenaGeometry::from_nodes(nodes).map(Self::new)
    }

    pub fn with_labels(self, labels: ArmLabels) -> Result<Self, ArenaError> {
        labels.validate()?;
        Ok(Self {
            geometry: self.geometry,
            labels: Some(labels),
        })
    }

    pub fn geometry(&self) -> &ArenaGeometry {
        &self.geometry
    }

    pub fn labels(&self) -> Option<&ArmLabels> {
        self.labels.as_ref()
    }

    /// Polygons of the open arms, or `None` before labelling.
    pub fn open_arms(&self) -> Option<Vec<&Polygon>> {
        self.labels.as_ref().map(|l| self.select(&l.open))
    }

    pub fn closed_arms(&self) -> Option<Vec<&Polygon>> {
        self.labels.as_ref().map(|l| self.select(&l.closed))
    }

    fn select(&self, indices: &[usize]) -> Vec<&Polygon> {
        indices
            .iter()
            .filter_map(|&i| self.geometry.arms.get(i))
            .collect()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Plus maze centred at (120, 160) with arms reaching the edges of a
    /// 240x320 frame.
    pub(crate) fn plus_nodes() -> Vec<Point> {
        vec![
            Point::new(110.0, 150.0),
            Point::new(110.0, 170.0),
            Point::new(130.0, 170.0),
            Point::new(130.0, 150.0),
            Point::new(0.0, 150.0),
            Point::new(0.0, 170.0),
            Point::new(110.0, 319.0),
            Point::new(130.0, 319.0),
            Point::new(239.0, 170.0),
            Point::new(239.0, 150.0),
            Point::new(130.0, 0.0),
            Point::new(110.0, 0.0),
        ]
    }

    #[test]
    fn plus_maze_decomposes_into_four_arms_and_a_center() {
        let geometry = ArenaGeometry::from_nodes(&plus_nodes()).unwrap();
        assert_eq!(geometry.arms().len(), 4);
        assert!(geometry.arms().iter().all(|arm| arm.vertices().len() == 4));
        assert_eq!(geometry.central_nodes().len(), 4);
        assert!(geometry.central_polygon().is_convex());
        assert!(geometry.central_polygon().contains(&Point::new(120.0, 160.0)));
        for arm in geometry.arms() {
            assert!(arm.is_convex());
        }
    }

    #[test]
    fn arms_run_clockwise_from_the_top() {
        let geometry = ArenaGeometry::from_nodes(&plus_nodes()).unwrap();
        assert_eq!(geometry.region_of(&Point::new(50.0, 160.0)), Some(Region::Arm(0)));
        assert_eq!(geometry.region_of(&Point::new(120.0, 250.0)), Some(Region::Arm(1)));
        assert_eq!(geometry.region_of(&Point::new(200.0, 160.0)), Some(Region::Arm(2)));
        assert_eq!(geometry.region_of(&Point::new(120.0, 60.0)), Some(Region::Arm(3)));
        assert_eq!(geometry.region_of(&Point::new(120.0, 160.0)), Some(Region::Center));
        assert_eq!(geometry.region_of(&Point::new(20.0, 20.0)), None);
    }

    #[test]
    fn node_order_does_not_change_the_geometry() {
        let nodes = plus_nodes();
        let expected = ArenaGeometry::from_nodes(&nodes).unwrap();

        let mut reversed = nodes.clone();
        reversed.reverse();
        assert_eq!(ArenaGeometry::from_nodes(&reversed).unwrap(), expected);

        let mut rotated = nodes.clone();
        rotated.rotate_left(5);
        assert_eq!(ArenaGeometry::from_nodes(&rotated).unwrap(), expected);
    }

    #[test]
    fn wrong_node_count_is_rejected() {
        let nodes = &plus_nodes()[..11];
        assert!(matches!(
            ArenaGeometry::from_nodes(nodes),
            Err(ArenaError::NodeCount { expected: 12, actual: 11 })
        ));
    }

    #[test]
    fn non_finite_and_coincident_nodes_are_rejected() {
        let mut nodes = plus_nodes();
        nodes[7] = Point::new(f64::NAN, 3.0);
        assert!(matches!(
            ArenaGeometry::from_nodes(&nodes),
            Err(ArenaError::NonFiniteNode { index: 7 })
        ));

        let mut nodes = plus_nodes();
        nodes[5] = nodes[4];
        assert!(matches!(
            ArenaGeometry::from_nodes(&nodes),
            Err(ArenaError::DegenerateGeometry { .. })
        ));
    }

    #[test]
    fn collinear_nodes_cannot_be_paired() {
        let nodes: Vec<Point> = (0..12)
            .map(|i| Point::new(0.0, ((1u32 << i) - 1) as f64))
            .collect();
        assert!(matches!(
            ArenaGeometry::from_nodes(&nodes),
            Err(ArenaError::DegenerateGeometry { .. })
        ));
    }

    #[test]
    fn labels_are_attached_without_touching_geometry() {
        let arena = Arena::from_nodes(&plus_nodes()).unwrap();
        assert!(arena.open_arms().is_none());
        let geometry = arena.geometry().clone();

        let labeled = arena
            .with_labels(ArmLabels::new(vec![0, 2], vec![1, 3]).unwrap())
            .unwrap();
        assert_eq!(labeled.geometry(), &geometry);
        assert_eq!(labeled.open_arms().unwrap().len(), 2);
        assert_eq!(labeled.closed_arms().unwrap()[0], &geometry.arms()[1]);
    }

    #[test]
    fn out_of_range_arm_labels_are_rejected() {
        assert!(matches!(
            ArmLabels::new(vec![0, 4], vec![1]),
            Err(ArenaError::InvalidArmIndex { index: 4 })
        ));
        let geometry = ArenaGeometry::from_nodes(&plus_nodes()).unwrap();
        assert!(geometry.arm(4).is_err());
    }
}
