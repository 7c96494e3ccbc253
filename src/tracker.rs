use std::time::Instant;

use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info};

use epm_tracker_decoder::FrameSource;

use crate::background::{BackgroundEstimator, DEFAULT_BACKGROUND_FRAMES};
use crate::blob::{DetectionResult, detect};
use crate::error::{TrackingError, TrackingResult};
use crate::mask::BinaryMask;
use crate::normalize::{ByteImage, frame_to_image};
use crate::trajectory::Trajectory;

/// Immutable inputs of one tracking run.
#[derive(Debug, Clone)]
pub struct TrackingSettings {
    /// Cutoff on the unit scale; `None` selects Otsu per frame.
    pub cutoff: Option<f32>,
    pub background_frames: usize,
    pub inclusion_mask: Option<BinaryMask>,
    /// Seeds background sampling for reproducible runs.
    pub seed: Option<u64>,
}

impl Default for TrackingSettings {
    fn default() -> Self {
        Self {
            cutoff: None,
            background_frames: DEFAULT_BACKGROUND_FRAMES,
            inclusion_mask: None,
            seed: None,
        }
    }
}

impl TrackingSettings {
    fn validate(&self) -> TrackingResult<()> {
        if self.background_frames == 0 {
            return Err(TrackingError::invalid_settings(
                "background_frames must be greater than zero",
            ));
        }
        if let Some(cutoff) = self.cutoff {
            if !cutoff.is_finite() || !(-1.0..=1.0).contains(&cutoff) {
                return Err(TrackingError::invalid_settings(format!(
                    "cutoff {cutoff} is outside the unit range [-1, 1]"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackingProgress {
    pub frame_index: usize,
    /// Frames finished so far; strictly increasing within a run.
    pub completed: usize,
    pub total: usize,
}

/// Receives one notification per processed frame. Must not block.
pub trait TrackingObserver: Sync {
    fn on_progress(&self, progress: TrackingProgress);
}

pub struct NoProgress;

impl TrackingObserver for NoProgress {
    fn on_progress(&self, _progress: TrackingProgress) {}
}

impl TrackingObserver for UnboundedSender<TrackingProgress> {
    fn on_progress(&self, progress: TrackingProgress) {
        let _ = self.send(progress);
    }
}

pub struct ObserverFn<F>(pub F);

impl<F> TrackingObserver for ObserverFn<F>
where
    F: Fn(TrackingProgress) + Sync,
{
    fn on_progress(&self, progress: TrackingProgress) {
        (self.0)(progress)
    }
}

pub struct VideoTracker {
    settings: TrackingSettings,
}

impl VideoTracker {
    pub fn new(settings: TrackingSettings) -> TrackingResult<Self> {
        settings.validate()?;
        Ok(Self { settings })
    }

    pub fn settings(&self) -> &TrackingSettings {
        &self.settings
    }

    pub fn background<S>(&self, source: &S) -> TrackingResult<ByteImage>
    where
        S: FrameSource + ?Sized,
    {
        let mut estimator = match self.settings.seed {
            Some(seed) => BackgroundEstimator::with_seed(seed),
            None => BackgroundEstimator::new(),
        };
        estimator.estimate(source, self.settings.background_frames)
    }

    /// Tracks every frame of `source` in order and returns the full
    /// trajectory once the last frame is done.
    pub fn run<S>(&self, source: &S, observer: &dyn TrackingObserver) -> TrackingResult<Trajectory>
    where
        S: FrameSource + ?Sized,
    {
        let background = self.background(source)?;
        self.run_with_background(source, &background, observer)
    }

    pub fn run_with_background<S>(
        &self,
        source: &S,
        background: &ByteImage,
        observer: &dyn TrackingObserver,
    ) -> TrackingResult<Trajectory>
    where
        S: FrameSource + ?Sized,
    {
        let total = source.frame_count();
        self.check_inputs(source, background)?;
        info!(
            frames = total,
            background_frames = self.settings.background_frames,
            cutoff = ?self.settings.cutoff,
            masked = self.settings.inclusion_mask.is_some(),
            "tracking video"
        );
        let started = Instant::now();

        let mut trajectory = Trajectory::with_capacity(total);
        for index in 0..total {
            trajectory.push(self.detect_frame(source, index, background)?);
            observer.on_progress(TrackingProgress {
                frame_index: index,
                completed: index + 1,
                total,
            });
        }

        self.log_summary(&trajectory, started);
        Ok(trajectory)
    }

    /// Same contract as [`run`](Self::run) with frames spread over the rayon
    /// pool. Results keep frame order regardless of completion order.
    #[cfg(feature = "parallel")]
    pub fn run_parallel<S>(
        &self,
        source: &S,
        observer: &dyn TrackingObserver,
    ) -> TrackingResult<Trajectory>
    where
        S: FrameSource + ?Sized,
    {
        let background = self.background(source)?;
        self.run_parallel_with_background(source, &background, observer)
    }

    #[cfg(feature = "parallel")]
    pub fn run_parallel_with_background<S>(
        &self,
        source: &S,
        background: &ByteImage,
        observer: &dyn TrackingObserver,
    ) -> TrackingResult<Trajectory>
    where
        S: FrameSource + ?Sized,
    {
        use rayon::prelude::*;
        use std::sync::{Mutex, PoisonError};

        self.check_inputs(source, background)?;
        let total = source.frame_count();
        info!(frames = total, threads = rayon::current_num_threads(), "tracking video in parallel");
        let started = Instant::now();
        let completed = Mutex::new(0usize);

        let detections = (0..total)
            .into_par_iter()
            .map(|index| {
                let detection = self.detect_frame(source, index, background)?;
                // Held across the callback so `completed` is reported in order.
                let mut done = completed.lock().unwrap_or_else(PoisonError::into_inner);
                *done += 1;
                observer.on_progress(TrackingProgress {
                    frame_index: index,
                    completed: *done,
                    total,
                });
                Ok(detection)
            })
            .collect::<TrackingResult<Vec<_>>>()?;

        let trajectory = Trajectory::from(detections);
        self.log_summary(&trajectory, started);
        Ok(trajectory)
    }

    fn check_inputs<S>(&self, source: &S, background: &ByteImage) -> TrackingResult<()>
    where
        S: FrameSource + ?Sized,
    {
        let metadata = source.metadata();
        let shape = (metadata.width, metadata.height);
        TrackingError::check_shape(shape, background.dimensions())?;
        if let Some(mask) = &self.settings.inclusion_mask {
            TrackingError::check_shape(shape, mask.shape())?;
        }
        Ok(())
    }

    fn detect_frame<S>(
        &self,
        source: &S,
        index: usize,
        background: &ByteImage,
    ) -> TrackingResult<DetectionResult>
    where
        S: FrameSource + ?Sized,
    {
        let frame = frame_to_image(&source.frame(index)?);
        let detection = detect(
            &frame,
            background,
            self.settings.cutoff,
            self.settings.inclusion_mask.as_ref(),
        )?;
        if !detection.is_found() {
            debug!(frame = index, "no foreground detected");
        }
        Ok(detection)
    }

    fn log_summary(&self, trajectory: &Trajectory, started: Instant) {
        info!(
            frames = trajectory.len(),
            missing = trajectory.missing_frames(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "tracking finished"
        );
    }
}
