//! Tracking result files: one row per frame with columns
//! `frame,rr,cc,area,maj,min`. Frames without a detection carry `NaN`.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use super::OutputError;
use crate::blob::DetectionResult;
use crate::trajectory::Trajectory;

/// Largest run of skipped frame numbers accepted between two rows.
const MAX_FRAME_GAP: usize = 1_000_000;

#[derive(Debug, Serialize)]
struct WriteRecord {
    frame: usize,
    rr: f64,
    cc: f64,
    area: f64,
    maj: f64,
    min: f64,
}

impl WriteRecord {
    fn new(frame: usize, detection: &DetectionResult) -> Self {
        match *detection {
            DetectionResult::Found {
                centroid: (rr, cc),
                major_axis_length,
                minor_axis_length,
                area,
            } => Self {
                frame,
                rr,
                cc,
                area: area as f64,
                maj: major_axis_length,
                min: minor_axis_length,
            },
            DetectionResult::NotFound => Self {
                frame,
                rr: f64::NAN,
                cc: f64::NAN,
                area: f64::NAN,
                maj: f64::NAN,
                min: f64::NAN,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct ReadRecord {
    frame: usize,
    #[serde(deserialize_with = "missing_as_none")]
    rr: Option<f64>,
    #[serde(deserialize_with = "missing_as_none")]
    cc: Option<f64>,
    #[serde(default, deserialize_with = "missing_as_none")]
    area: Option<f64>,
    #[serde(default, deserialize_with = "missing_as_none")]
    maj: Option<f64>,
    #[serde(default, deserialize_with = "missing_as_none")]
    min: Option<f64>,
}

impl ReadRecord {
    fn into_detection(self) -> DetectionResult {
        match (self.rr, self.cc) {
            (Some(rr), Some(cc)) => DetectionResult::Found {
                centroid: (rr, cc),
                major_axis_length: self.maj.unwrap_or(f64::NAN),
                minor_axis_length: self.min.unwrap_or(f64::NAN),
                area: self.area.map_or(0, |a| a.max(0.0).round() as usize),
            },
            _ => DetectionResult::NotFound,
        }
    }
}

/// Empty cells, `NaN` and `NA` all read as a missing value.
fn missing_as_none<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    let value = raw.trim();
    if value.is_empty() || value.eq_ignore_ascii_case("nan") || value.eq_ignore_ascii_case("na") {
        return Ok(None);
    }
    value
        .parse::<f64>()
        .map(|v| v.is_finite().then_some(v))
        .map_err(serde::de::Error::custom)
}

pub fn write_trajectory<W: Write>(writer: W, trajectory: &Trajectory) -> Result<(), OutputError> {
    let mut csv = csv::Writer::from_writer(writer);
    for (frame, detection) in trajectory.iter().enumerate() {
        csv.serialize(WriteRecord::new(frame, detection))?;
    }
    csv.flush()?;
    Ok(())
}

/// Reads a tracking file. Frame numbers must increase; skipped frame numbers
/// become missing detections.
pub fn read_trajectory<R: Read>(reader: R) -> Result<Trajectory, OutputError> {
    let mut csv = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut trajectory = Trajectory::new();
    for record in csv.deserialize::<ReadRecord>() {
        let record = record?;
        if record.frame < trajectory.len() {
            return Err(OutputError::format(format!(
                "frame {} appears after frame {}",
                record.frame,
                trajectory.len() - 1
            )));
        }
        let gap = record.frame - trajectory.len();
        if gap > MAX_FRAME_GAP {
            return Err(OutputError::format(format!(
                "frame {} skips {gap} frames, more than the {MAX_FRAME_GAP} allowed",
                record.frame
            )));
        }
        while trajectory.len() < record.frame {
            trajectory.push(DetectionResult::NotFound);
        }
        trajectory.push(record.into_detection());
    }
    Ok(trajectory)
}

pub fn save_trajectory(path: &Path, trajectory: &Trajectory) -> Result<(), OutputError> {
    write_trajectory(File::create(path)?, trajectory)?;
    debug!(path = %path.display(), frames = trajectory.len(), "tracking file written");
    Ok(())
}

pub fn load_trajectory(path: &Path) -> Result<Trajectory, OutputError> {
    read_trajectory(File::open(path)?).map_err(|err| err.in_file(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn found(r: f64, c: f64, area: usize) -> DetectionResult {
        DetectionResult::Found {
            centroid: (r, c),
            major_axis_length: 12.5,
            minor_axis_length: 6.25,
            area,
        }
    }

    #[test]
    fn missing_frames_are_written_as_nan() {
        let trajectory = Trajectory::from(vec![found(1.5, 2.5, 40), DetectionResult::NotFound]);
        let mut buffer = Vec::new();
        write_trajectory(&mut buffer, &trajectory).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "frame,rr,cc,area,maj,min");
        assert!(lines[1].starts_with("0,1.5,2.5,40"));
        assert_eq!(lines[2], "1,NaN,NaN,NaN,NaN,NaN");
    }

    #[test]
    fn written_files_read_back() {
        let trajectory = Trajectory::from(vec![
            found(1.5, 2.5, 40),
            DetectionResult::NotFound,
            found(10.0, 20.0, 7),
        ]);
        let mut buffer = Vec::new();
        write_trajectory(&mut buffer, &trajectory).unwrap();
        let restored = read_trajectory(buffer.as_slice()).unwrap();
        assert_eq!(restored, trajectory);
    }

    #[test]
    fn na_and_empty_cells_read_as_missing() {
        let text = "frame,rr,cc,area,maj,min\n0,NA,NA,NA,NA,NA\n1,,,,,\n2,nan,3,4,5,6\n3,4,5,6,7,8\n";
        let trajectory = read_trajectory(text.as_bytes()).unwrap();
        assert_eq!(trajectory.len(), 4);
        assert_eq!(trajectory.missing_frames(), 3);
        assert_eq!(trajectory.get(3).unwrap().centroid(), Some((4.0, 5.0)));
    }

    #[test]
    fn skipped_frame_numbers_become_gaps() {
        let text = "frame,rr,cc,area,maj,min\n0,1,1,4,2,2\n3,2,2,4,2,2\n";
        let trajectory = read_trajectory(text.as_bytes()).unwrap();
        assert_eq!(trajectory.len(), 4);
        assert_eq!(trajectory.missing_frames(), 2);
    }

    #[test]
    fn frames_out_of_order_are_rejected() {
        let text = "frame,rr,cc,area,maj,min\n1,1,1,4,2,2\n0,2,2,4,2,2\n";
        assert!(matches!(
            read_trajectory(text.as_bytes()),
            Err(OutputError::Format { .. })
        ));
    }

    #[test]
    fn huge_frame_gaps_are_rejected() {
        let text = "frame,rr,cc,area,maj,min\n0,1,1,4,2,2\n1000000000000,2,2,4,2,2\n";
        assert!(matches!(
            read_trajectory(text.as_bytes()),
            Err(OutputError::Format { .. })
        ));
    }

    #[test]
    fn files_on_disk_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tracking.csv");
        let trajectory = Trajectory::from(vec![found(3.0, 4.0, 9), DetectionResult::NotFound]);
        save_trajectory(&path, &trajectory).unwrap();
        assert_eq!(load_trajectory(&path).unwrap(), trajectory);
    }
}
