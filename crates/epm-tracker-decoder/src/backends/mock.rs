use std::time::Duration;

use crate::core::{
    DynFrameSource, FrameError, FrameResult, FrameSource, GrayFrame, VideoMetadata, check_index,
};

const FLOOR_LUMA: u8 = 200;
const MOUSE_LUMA: u8 = 30;
const MOUSE_RADIUS: usize = 6;
const FPS: f64 = 30.0;

enum Frames {
    /// A dark disc crossing a bright floor, rendered on demand.
    Synthetic,
    Stored(Vec<GrayFrame>),
}

/// In-memory frame source used for demos and tests.
pub struct MockSource {
    width: u32,
    height: u32,
    frame_count: usize,
    frames: Frames,
}

impl MockSource {
    pub fn new(frame_count: usize, width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            frame_count,
            frames: Frames::Synthetic,
        }
    }

    /// Serves the given frames verbatim. All frames must share one shape.
    pub fn from_frames(frames: Vec<GrayFrame>) -> FrameResult<Self> {
        let (width, height) = frames
            .first()
            .map(|frame| (frame.width(), frame.height()))
            .unwrap_or((0, 0));
        if let Some(frame) = frames.iter().find(|f| f.width() != width || f.height() != height) {
            return Err(FrameError::InvalidFrame {
                reason: format!(
                    "mock frames must share one shape: {}x{} vs {}x{}",
                    frame.width(),
                    frame.height(),
                    width,
                    height
                ),
            });
        }
        Ok(Self {
            width,
            height,
            frame_count: frames.len(),
            frames: Frames::Stored(frames),
        })
    }

    /// Centre of the synthetic mouse in frame `index`, as `(row, col)`.
    pub fn mouse_position(&self, index: usize) -> (usize, usize) {
        let width = self.width as usize;
        let height = self.height as usize;
        let margin = MOUSE_RADIUS + 2;
        let span = width.saturating_sub(2 * margin).max(1);
        let col = margin + (index * 3) % span;
        (height / 2, col)
    }

    fn render(&self, index: usize) -> FrameResult<GrayFrame> {
        let width = self.width as usize;
        let height = self.height as usize;
        let mut data = vec![FLOOR_LUMA; width * height];
        let (mr, mc) = self.mouse_position(index);
        let radius = MOUSE_RADIUS as isize;
        for dr in -radius..=radius {
            for dc in -radius..=radius {
                if dr * dr + dc * dc > radius * radius {
                    continue;
                }
                let r = mr as isize + dr;
                let c = mc as isize + dc;
                if r < 0 || c < 0 || r >= height as isize || c >= width as isize {
                    continue;
                }
                data[r as usize * width + c as usize] = MOUSE_LUMA;
            }
        }
        let timestamp = Some(Duration::from_secs_f64(index as f64 / FPS));
        GrayFrame::from_owned(self.width, self.height, width, timestamp, data)
    }
}

impl FrameSource for MockSource {
    fn metadata(&self) -> VideoMetadata {
        let metadata = VideoMetadata::new(self.width, self.height, self.frame_count);
        match self.frames {
            Frames::Synthetic => metadata.with_fps(FPS),
            Frames::Stored(_) => metadata,
        }
    }

    fn frame(&self, index: usize) -> FrameResult<GrayFrame> {
        check_index(index, self.frame_count)?;
        let frame = match &self.frames {
            Frames::Synthetic => self.render(index)?,
            Frames::Stored(frames) => frames[index].clone(),
        };
        Ok(frame.with_frame_index(Some(index as u64)))
    }
}

pub fn boxed_mock(frame_count: usize, width: u32, height: u32) -> DynFrameSource {
    Box::new(MockSource::new(frame_count, width, height))
}
