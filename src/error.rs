use thiserror::Error;

use crate::arena::ArenaError;
use crate::output::OutputError;
use crate::settings::ConfigError;
use crate::stats::StatsError;
use epm_tracker_types::FrameError;

pub type TrackingResult<T> = Result<T, TrackingError>;

#[derive(Debug, Error)]
pub enum TrackingError {
    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error("image shapes differ: {left:?} vs {right:?}")]
    ShapeMismatch {
        left: (u32, u32),
        right: (u32, u32),
    },

    #[error("invalid tracking settings: {message}")]
    InvalidSettings { message: String },
}

impl TrackingError {
    pub fn invalid_settings(message: impl Into<String>) -> Self {
        Self::InvalidSettings {
            message: message.into(),
        }
    }

    pub(crate) fn check_shape(left: (u32, u32), right: (u32, u32)) -> TrackingResult<()> {
        if left != right {
            return Err(Self::ShapeMismatch { left, right });
        }
        Ok(())
    }
}

/// Top-level error of the command-line application.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error(transparent)]
    Tracking(#[from] TrackingError),

    #[error(transparent)]
    Arena(#[from] ArenaError),

    #[error(transparent)]
    Stats(#[from] StatsError),

    #[error(transparent)]
    Output(#[from] OutputError),

    #[error("tracking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
