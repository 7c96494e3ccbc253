//! Arena node files with columns `node,rr,cc`.
//!
//! Placement is saved twice: the editable file keeps each node relative to
//! the placement anchor, and `<stem>-pixel-coords.csv` holds the same nodes in
//! frame pixel coordinates for analysis.

use std::fs::File;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::OutputError;
use crate::geometry::Point;

const PIXEL_COORDS_SUFFIX: &str = "-pixel-coords";

#[derive(Debug, Serialize, Deserialize)]
struct NodeRecord {
    node: usize,
    rr: f64,
    cc: f64,
}

/// Nodes positioned relative to a movable anchor.
#[derive(Debug, Clone, PartialEq)]
pub struct NodePlacement {
    pub anchor: Point,
    pub offsets: Vec<Point>,
}

impl NodePlacement {
    /// Placement anchored at the first node, with every node as an offset from it.
    pub fn anchored_at_first(nodes: &[Point]) -> Self {
        let anchor = nodes.first().copied().unwrap_or(Point::new(0.0, 0.0));
        Self {
            anchor,
            offsets: nodes
                .iter()
                .map(|p| Point::new(p.r - anchor.r, p.c - anchor.c))
                .collect(),
        }
    }

    pub fn pixel_coords(&self) -> Vec<Point> {
        self.offsets
            .iter()
            .map(|p| Point::new(self.anchor.r + p.r, self.anchor.c + p.c))
            .collect()
    }
}

/// `arena.csv` → `arena-pixel-coords.csv`, next to the input.
pub fn pixel_coords_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!("{stem}{PIXEL_COORDS_SUFFIX}.csv"))
}

/// Picks the pixel-space file for `path`: the path itself when it already is
/// one, otherwise its derived sibling when that exists.
pub fn resolve_pixel_coords(path: &Path) -> PathBuf {
    let is_pixel_file = path
        .file_stem()
        .is_some_and(|s| s.to_string_lossy().ends_with(PIXEL_COORDS_SUFFIX));
    if is_pixel_file {
        return path.to_path_buf();
    }
    let derived = pixel_coords_path(path);
    if derived.exists() {
        derived
    } else {
        warn!(
            path = %path.display(),
            "no pixel-coords file next to node file, reading it as pixel coordinates"
        );
        path.to_path_buf()
    }
}

fn write_nodes(path: &Path, nodes: &[Point]) -> Result<(), OutputError> {
    let mut csv = csv::Writer::from_writer(File::create(path)?);
    for (node, p) in nodes.iter().enumerate() {
        csv.serialize(NodeRecord {
            node,
            rr: p.r,
            cc: p.c,
        })?;
    }
    csv.flush()?;
    Ok(())
}

/// Writes the editable file at `path` and its pixel-coords sibling, returning
/// the sibling's path.
pub fn save_nodes(path: &Path, placement: &NodePlacement) -> Result<PathBuf, OutputError> {
    write_nodes(path, &placement.offsets)?;
    let pixel_path = pixel_coords_path(path);
    write_nodes(&pixel_path, &placement.pixel_coords())?;
    debug!(
        path = %path.display(),
        pixel_path = %pixel_path.display(),
        nodes = placement.offsets.len(),
        "arena nodes written"
    );
    Ok(pixel_path)
}

/// Reads a node file and orders it by the `node` column, which must hold each
/// index `0..n` exactly once.
pub fn load_nodes(path: &Path) -> Result<Vec<Point>, OutputError> {
    let mut csv = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(File::open(path)?);
    let mut records = csv
        .deserialize::<NodeRecord>()
        .collect::<Result<Vec<_>, _>>()?;
    records.sort_by_key(|record| record.node);
    for (expected, record) in records.iter().enumerate() {
        if record.node != expected {
            return Err(OutputError::format(format!(
                "node column must list 0..{} once each, found {} at position {expected}",
                records.len(),
                record.node
            ))
            .in_file(path));
        }
    }
    Ok(records.into_iter().map(|r| Point::new(r.rr, r.cc)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn saving_writes_relative_and_pixel_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("arena.csv");
        let placement = NodePlacement {
            anchor: Point::new(100.0, 50.0),
            offsets: vec![Point::new(0.0, 0.0), Point::new(-10.0, 5.5)],
        };
        let pixel_path = save_nodes(&path, &placement).unwrap();
        assert_eq!(pixel_path, dir.path().join("arena-pixel-coords.csv"));

        assert_eq!(load_nodes(&path).unwrap(), placement.offsets);
        assert_eq!(
            load_nodes(&pixel_path).unwrap(),
            vec![Point::new(100.0, 50.0), Point::new(90.0, 55.5)]
        );
        assert_eq!(resolve_pixel_coords(&path), pixel_path);
        assert_eq!(resolve_pixel_coords(&pixel_path), pixel_path);
    }

    #[test]
    fn first_node_anchors_the_placement() {
        let nodes = vec![Point::new(110.0, 150.0), Point::new(0.0, 170.0)];
        let placement = NodePlacement::anchored_at_first(&nodes);
        assert_eq!(placement.anchor, Point::new(110.0, 150.0));
        assert_eq!(placement.offsets, vec![Point::new(0.0, 0.0), Point::new(-110.0, 20.0)]);
        assert_eq!(placement.pixel_coords(), nodes);
    }

    #[test]
    fn rows_are_ordered_by_node_index() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nodes.csv");
        std::fs::write(&path, "node,rr,cc\n1,5,6\n0,1,2\n").unwrap();
        assert_eq!(
            load_nodes(&path).unwrap(),
            vec![Point::new(1.0, 2.0), Point::new(5.0, 6.0)]
        );
    }

    #[test]
    fn duplicate_node_indices_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nodes.csv");
        std::fs::write(&path, "node,rr,cc\n0,5,6\n0,1,2\n").unwrap();
        assert!(matches!(
            load_nodes(&path),
            Err(OutputError::Format { path: Some(_), .. })
        ));
    }
}
