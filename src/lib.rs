//! Mouse tracking and region statistics for Elevated Plus Maze videos.
//!
//! Frames come from an [`epm_tracker_decoder::FrameSource`]. The
//! [`tracker::VideoTracker`] subtracts an estimated background from every
//! frame, thresholds and erodes the difference and keeps the largest
//! component as the animal. An [`arena::Arena`] rebuilt from twelve boundary
//! points then turns the trajectory into time-in-region and distance figures.

pub mod app;
pub mod arena;
pub mod background;
pub mod blob;
pub mod cli;
pub mod error;
pub mod geometry;
pub mod mask;
pub mod morphology;
pub mod normalize;
pub mod output;
pub mod progress;
pub mod segment;
pub mod settings;
pub mod stats;
pub mod tracker;
pub mod trajectory;

pub use arena::{Arena, ArenaError, ArenaGeometry, ArmLabels, Region};
pub use blob::DetectionResult;
pub use error::{AppError, TrackingError, TrackingResult};
pub use geometry::{Point, Polygon};
pub use mask::BinaryMask;
pub use stats::{StatsError, Summary};
pub use tracker::{TrackingObserver, TrackingProgress, TrackingSettings, VideoTracker};
pub use trajectory::Trajectory;
