use crate::blob::DetectionResult;

/// Per-frame detections in frame order; the position is the frame index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Trajectory {
    detections: Vec<DetectionResult>,
}

impl Trajectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(frames: usize) -> Self {
        Self {
            detections: Vec::with_capacity(frames),
        }
    }

    pub fn push(&mut self, detection: DetectionResult) {
        self.detections.push(detection);
    }

    pub fn len(&self) -> usize {
        self.detections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }

    pub fn get(&self, frame: usize) -> Option<&DetectionResult> {
        self.detections.get(frame)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DetectionResult> {
        self.detections.iter()
    }

    pub fn detections(&self) -> &[DetectionResult] {
        &self.detections
    }

    pub fn missing_frames(&self) -> usize {
        self.detections.iter().filter(|d| !d.is_found()).count()
    }

    /// Centroid per frame, `None` where the animal was not found.
    pub fn centroids(&self) -> impl Iterator<Item = Option<(f64, f64)>> + '_ {
        self.detections.iter().map(DetectionResult::centroid)
    }
}

impl From<Vec<DetectionResult>> for Trajectory {
    fn from(detections: Vec<DetectionResult>) -> Self {
        Self { detections }
    }
}

impl FromIterator<DetectionResult> for Trajectory {
    fn from_iter<I: IntoIterator<Item = DetectionResult>>(iter: I) -> Self {
        Self {
            detections: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Trajectory {
    type Item = &'a DetectionResult;
    type IntoIter = std::slice::Iter<'a, DetectionResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.detections.iter()
    }
}
