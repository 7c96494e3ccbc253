use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use directories::ProjectDirs;
use serde::Deserialize;

use epm_tracker_decoder::Backend;

use crate::arena::ArmLabels;
use crate::background::DEFAULT_BACKGROUND_FRAMES;
use crate::cli::{AnalyzeArgs, CliArgs, CliSources, Command, TrackingArgs, VideoArgs};
use crate::tracker::TrackingSettings;

const PROJECT_CONFIG_FILE: &str = "epm-tracker.toml";
const DEFAULT_PIXELS_PER_UNIT: f64 = 1.0;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    backend: Option<String>,
    tracking: Option<TrackingFileConfig>,
    analysis: Option<AnalysisFileConfig>,
    video: Option<VideoFileConfig>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TrackingFileConfig {
    threshold: Option<f32>,
    background_frames: Option<usize>,
    seed: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AnalysisFileConfig {
    pixels_per_unit: Option<f64>,
    open_arms: Option<Vec<usize>>,
    closed_arms: Option<Vec<usize>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct VideoFileConfig {
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug)]
pub struct EffectiveSettings {
    pub backend: Option<Backend>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Cutoff on the unit scale, already divided by 100.
    pub cutoff: Option<f32>,
    pub background_frames: usize,
    pub seed: Option<u64>,
    pub pixels_per_unit: f64,
    pub labels: Option<ArmLabels>,
    pub config_path: Option<PathBuf>,
}

impl EffectiveSettings {
    /// Tracking inputs without an inclusion mask; callers attach one.
    pub fn tracking(&self) -> TrackingSettings {
        TrackingSettings {
            cutoff: self.cutoff,
            background_frames: self.background_frames,
            inclusion_mask: None,
            seed: self.seed,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    InvalidValue {
        path: Option<PathBuf>,
        field: &'static str,
        value: String,
    },
    NotFound {
        path: PathBuf,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(
                    f,
                    "failed to read config file {}: {}",
                    path.display(),
                    source
                )
            }
            ConfigError::Parse { path, source } => {
                write!(
                    f,
                    "failed to parse config file {}: {}",
                    path.display(),
                    source
                )
            }
            ConfigError::InvalidValue { path, field, value } => {
                if let Some(path) = path {
                    write!(
                        f,
                        "invalid value '{}' for '{}' in {}",
                        value,
                        field,
                        path.display()
                    )
                } else {
                    write!(f, "invalid value '{}' for '{}'", value, field)
                }
            }
            ConfigError::NotFound { path } => {
                write!(f, "config file {} does not exist", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Parse { source, .. } => Some(source),
            ConfigError::InvalidValue { .. } => None,
            ConfigError::NotFound { .. } => None,
        }
    }
}

pub fn resolve_settings(
    cli: &CliArgs,
    sources: &CliSources,
) -> Result<EffectiveSettings, ConfigError> {
    let (file, config_path) = load_config(cli.config.as_deref())?;
    merge(cli, sources, file, config_path)
}

fn load_config(path_override: Option<&Path>) -> Result<(FileConfig, Option<PathBuf>), ConfigError> {
    if let Some(path) = path_override {
        let path = path.to_path_buf();
        if !path.exists() {
            return Err(ConfigError::NotFound { path });
        }
        return read_config(path);
    }

    let candidates = [project_config_path(), default_config_path()];
    match candidates.into_iter().flatten().find(|path| path.exists()) {
        Some(path) => read_config(path),
        None => Ok((FileConfig::default(), None)),
    }
}

fn read_config(path: PathBuf) -> Result<(FileConfig, Option<PathBuf>), ConfigError> {
    let contents = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
        path: path.clone(),
        source,
    })?;
    let config = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.clone(),
        source,
    })?;
    Ok((config, Some(path)))
}

fn merge(
    cli: &CliArgs,
    sources: &CliSources,
    file: FileConfig,
    config_path: Option<PathBuf>,
) -> Result<EffectiveSettings, ConfigError> {
    let (video, tracking, analysis): (Option<&VideoArgs>, Option<&TrackingArgs>, Option<&AnalyzeArgs>) =
        match &cli.command {
            Command::Track(args) => (Some(&args.video), Some(&args.tracking), None),
            Command::Preview(args) => (Some(&args.video), Some(&args.tracking), None),
            Command::Analyze(args) => (None, None, Some(args)),
            Command::Arena(_) | Command::ListBackends => (None, None, None),
        };

    let FileConfig {
        backend: file_backend,
        tracking: file_tracking,
        analysis: file_analysis,
        video: file_video,
    } = file;
    let file_tracking = file_tracking.unwrap_or_default();
    let file_analysis = file_analysis.unwrap_or_default();
    let file_video = file_video.unwrap_or_default();

    let backend = match normalize_string(video.and_then(|v| v.backend.clone())) {
        Some(value) => Some(parse_backend(&value, None)?),
        None => match normalize_string(file_backend) {
            Some(value) => Some(parse_backend(&value, config_path.as_ref())?),
            None => None,
        },
    };

    let width = video.and_then(|v| v.width).or(file_video.width);
    let height = video.and_then(|v| v.height).or(file_video.height);

    let cutoff = match tracking.and_then(|t| t.threshold) {
        Some(percent) => Some(percent_to_cutoff(percent, None)?),
        None => match file_tracking.threshold {
            Some(percent) => Some(percent_to_cutoff(percent, config_path.as_ref())?),
            None => None,
        },
    };

    let mut background_frames = tracking
        .map(|t| t.background_frames)
        .unwrap_or(DEFAULT_BACKGROUND_FRAMES);
    if background_frames == 0 {
        return Err(ConfigError::InvalidValue {
            path: None,
            field: "background_frames",
            value: "0".to_string(),
        });
    }
    if !sources.background_frames_from_cli {
        if let Some(value) = file_tracking.background_frames {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    path: config_path,
                    field: "background_frames",
                    value: value.to_string(),
                });
            }
            background_frames = value;
        }
    }

    let seed = tracking.and_then(|t| t.seed).or(file_tracking.seed);

    let mut pixels_per_unit = analysis
        .map(|a| a.pixels_per_unit)
        .unwrap_or(DEFAULT_PIXELS_PER_UNIT);
    check_scale(pixels_per_unit, None)?;
    if !sources.pixels_per_unit_from_cli {
        if let Some(value) = file_analysis.pixels_per_unit {
            check_scale(value, config_path.as_ref())?;
            pixels_per_unit = value;
        }
    }

    let cli_labels = analysis
        .filter(|a| !a.open_arms.is_empty() || !a.closed_arms.is_empty())
        .map(|a| (a.open_arms.clone(), a.closed_arms.clone(), None));
    let file_labels = (file_analysis.open_arms.is_some() || file_analysis.closed_arms.is_some())
        .then(|| {
            (
                file_analysis.open_arms.unwrap_or_default(),
                file_analysis.closed_arms.unwrap_or_default(),
                config_path.as_ref(),
            )
        });
    let labels = match cli_labels.or(file_labels) {
        Some((open, closed, path)) => Some(
            ArmLabels::new(open, closed).map_err(|err| ConfigError::InvalidValue {
                path: path.cloned(),
                field: "arms",
                value: err.to_string(),
            })?,
        ),
        None => None,
    };

    Ok(EffectiveSettings {
        backend,
        width,
        height,
        cutoff,
        background_frames,
        seed,
        pixels_per_unit,
        labels,
        config_path,
    })
}

fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("rs", "epm-tracker", "epm-tracker")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

fn project_config_path() -> Option<PathBuf> {
    env::current_dir()
        .ok()
        .map(|dir| dir.join(PROJECT_CONFIG_FILE))
}

fn normalize_string(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn parse_backend(value: &str, path: Option<&PathBuf>) -> Result<Backend, ConfigError> {
    Backend::from_str(value).map_err(|_| ConfigError::InvalidValue {
        path: path.cloned(),
        field: "backend",
        value: value.to_string(),
    })
}

/// The threshold is entered in percent; the tracker works on the unit scale.
fn percent_to_cutoff(percent: f32, path: Option<&PathBuf>) -> Result<f32, ConfigError> {
    if !percent.is_finite() || !(0.0..=100.0).contains(&percent) {
        return Err(ConfigError::InvalidValue {
            path: path.cloned(),
            field: "threshold",
            value: percent.to_string(),
        });
    }
    Ok(percent / 100.0)
}

fn check_scale(value: f64, path: Option<&PathBuf>) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            path: path.cloned(),
            field: "pixels_per_unit",
            value: value.to_string(),
        })
    }
}
