use std::path::{Path, PathBuf};

use serde::Serialize;
use tokio::fs;

use super::OutputError;
use crate::arena::ArmLabels;
use crate::stats::Summary;

/// Everything `analyze` reports, serialized as one JSON document.
#[derive(Debug, Serialize)]
pub struct AnalysisReport<'a> {
    pub tracking_file: PathBuf,
    pub nodes_file: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<&'a ArmLabels>,
    pub summary: &'a Summary,
}

pub async fn write_report(
    path: &Path,
    report: &AnalysisReport<'_>,
    pretty: bool,
) -> Result<(), OutputError> {
    let encoded = if pretty {
        serde_json::to_vec_pretty(report)?
    } else {
        serde_json::to_vec(report)?
    };
    fs::write(path, encoded).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn report_is_written_as_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.json");
        let summary = Summary {
            frames: 10,
            missing_frames: 1,
            unidentified_frames: 2,
            time_in_center: 0.3,
            time_in_arms: vec![0.1, 0.2, 0.1, 0.2],
            time_in_open_arms: Some(0.2),
            time_in_closed_arms: Some(0.4),
            total_distance: 12.0,
            pixels_per_unit: 1.0,
        };
        let labels = ArmLabels::new(vec![0, 2], vec![1, 3]).unwrap();
        let report = AnalysisReport {
            tracking_file: PathBuf::from("tracking.csv"),
            nodes_file: PathBuf::from("arena-pixel-coords.csv"),
            labels: Some(&labels),
            summary: &summary,
        };
        write_report(&path, &report, true).await.unwrap();

        let value: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(value["summary"]["frames"], 10);
        assert_eq!(value["labels"]["open"], serde_json::json!([0, 2]));
        assert_eq!(value["tracking_file"], "tracking.csv");
    }
}
