use std::time::Duration;

pub use epm_tracker_types::{FrameError, FrameResult, GrayFrame};

pub type DynFrameSource = Box<dyn FrameSource>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoMetadata {
    pub width: u32,
    pub height: u32,
    pub frame_count: usize,
    pub fps: Option<f64>,
}

impl VideoMetadata {
    pub fn new(width: u32, height: u32, frame_count: usize) -> Self {
        Self {
            width,
            height,
            frame_count,
            fps: None,
        }
    }

    pub fn with_fps(mut self, fps: f64) -> Self {
        self.fps = Some(fps);
        self
    }

    pub fn duration(&self) -> Option<Duration> {
        let fps = self.fps?;
        if !(fps.is_finite() && fps > 0.0) {
            return None;
        }
        Some(Duration::from_secs_f64(self.frame_count as f64 / fps))
    }
}

/// Random-access provider of grayscale frames.
///
/// Indices run over `0..frame_count`; anything else yields
/// [`FrameError::FrameOutOfRange`]. The returned frame carries its index and,
/// when the container records one, its timestamp.
pub trait FrameSource: Send + Sync {
    fn metadata(&self) -> VideoMetadata;

    fn frame(&self, index: usize) -> FrameResult<GrayFrame>;

    fn frame_count(&self) -> usize {
        self.metadata().frame_count
    }
}

impl<T: FrameSource + ?Sized> FrameSource for Box<T> {
    fn metadata(&self) -> VideoMetadata {
        (**self).metadata()
    }

    fn frame(&self, index: usize) -> FrameResult<GrayFrame> {
        (**self).frame(index)
    }
}

pub fn check_index(index: usize, frame_count: usize) -> FrameResult<()> {
    if index >= frame_count {
        return Err(FrameError::out_of_range(index, frame_count));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_follows_frame_rate() {
        let metadata = VideoMetadata::new(320, 240, 300).with_fps(30.0);
        assert_eq!(metadata.duration(), Some(Duration::from_secs(10)));
        assert_eq!(VideoMetadata::new(320, 240, 300).duration(), None);
    }

    #[test]
    fn index_check_rejects_end_of_range() {
        assert!(check_index(4, 5).is_ok());
        let err = check_index(5, 5).unwrap_err();
        assert!(matches!(
            err,
            FrameError::FrameOutOfRange {
                index: 5,
                frame_count: 5
            }
        ));
    }
}
