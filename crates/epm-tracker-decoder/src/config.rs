use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::core::{DynFrameSource, FrameError, FrameResult};

const DEFAULT_MOCK_FRAMES: usize = 300;
const DEFAULT_MOCK_WIDTH: u32 = 320;
const DEFAULT_MOCK_HEIGHT: u32 = 240;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Mock,
    Raw,
    Fmf,
}

impl FromStr for Backend {
    type Err = FrameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mock" => Ok(Backend::Mock),
            "raw" | "gray8" => Ok(Backend::Raw),
            "fmf" => Ok(Backend::Fmf),
            other => Err(FrameError::configuration(format!(
                "unknown backend '{other}'"
            ))),
        }
    }
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Mock => "mock",
            Backend::Raw => "raw",
            Backend::Fmf => "fmf",
        }
    }

    /// Picks a backend from the file extension of `path`.
    pub fn infer(path: &Path) -> Option<Backend> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "fmf" => Some(Backend::Fmf),
            "raw" | "gray" | "y" => Some(Backend::Raw),
            _ => None,
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn compiled_backends() -> Vec<Backend> {
    let mut backends = Vec::new();
    #[cfg(feature = "backend-fmf")]
    {
        backends.push(Backend::Fmf);
    }
    #[cfg(feature = "backend-raw")]
    {
        backends.push(Backend::Raw);
    }
    #[cfg(feature = "backend-mock")]
    {
        backends.push(Backend::Mock);
    }
    backends
}

#[derive(Debug, Clone, Default)]
pub struct Configuration {
    pub backend: Option<Backend>,
    pub input: Option<PathBuf>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub mock_frames: Option<usize>,
}

impl Configuration {
    pub fn from_env() -> FrameResult<Self> {
        let mut config = Configuration::default();
        if let Ok(backend) = env::var("EPM_BACKEND") {
            config.backend = Some(Backend::from_str(&backend)?);
        }
        if let Ok(path) = env::var("EPM_INPUT") {
            config.input = Some(PathBuf::from(path));
        }
        config.width = parse_env_number("EPM_WIDTH")?;
        config.height = parse_env_number("EPM_HEIGHT")?;
        config.mock_frames = parse_env_number("EPM_MOCK_FRAMES")?;
        Ok(config)
    }

    pub fn available_backends() -> Vec<Backend> {
        compiled_backends()
    }

    /// The explicit backend, or one inferred from the input path.
    pub fn resolved_backend(&self) -> FrameResult<Backend> {
        if let Some(backend) = self.backend {
            return Ok(backend);
        }
        let path = self
            .input
            .as_deref()
            .ok_or_else(|| FrameError::configuration("no input video and no backend selected"))?;
        Backend::infer(path).ok_or_else(|| {
            FrameError::configuration(format!(
                "cannot infer a backend for {}; pass one explicitly",
                path.display()
            ))
        })
    }

    pub fn create_source(&self) -> FrameResult<DynFrameSource> {
        match self.resolved_backend()? {
            Backend::Mock => {
                #[cfg(feature = "backend-mock")]
                {
                    return Ok(crate::backends::mock::boxed_mock(
                        self.mock_frames.unwrap_or(DEFAULT_MOCK_FRAMES),
                        self.width.unwrap_or(DEFAULT_MOCK_WIDTH),
                        self.height.unwrap_or(DEFAULT_MOCK_HEIGHT),
                    ));
                }
                #[cfg(not(feature = "backend-mock"))]
                {
                    return Err(FrameError::unsupported("mock"));
                }
            }
            Backend::Raw => {
                #[cfg(feature = "backend-raw")]
                {
                    let path = self.require_input("raw")?;
                    let (Some(width), Some(height)) = (self.width, self.height) else {
                        return Err(FrameError::configuration(
                            "raw backend requires a frame width and height",
                        ));
                    };
                    return crate::backends::raw::boxed_raw(path, width, height);
                }
                #[cfg(not(feature = "backend-raw"))]
                {
                    return Err(FrameError::unsupported("raw"));
                }
            }
            Backend::Fmf => {
                #[cfg(feature = "backend-fmf")]
                {
                    let path = self.require_input("fmf")?;
                    return crate::backends::fmf::boxed_fmf(path);
                }
                #[cfg(not(feature = "backend-fmf"))]
                {
                    return Err(FrameError::unsupported("fmf"));
                }
            }
        }
    }

    #[allow(dead_code)]
    fn require_input(&self, backend: &str) -> FrameResult<&Path> {
        self.input.as_deref().ok_or_else(|| {
            FrameError::configuration(format!("{backend} backend requires an input path"))
        })
    }
}

fn parse_env_number<T: FromStr>(name: &str) -> FrameResult<Option<T>> {
    let Ok(value) = env::var(name) else {
        return Ok(None);
    };
    value.trim().parse().map(Some).map_err(|_| {
        FrameError::configuration(format!(
            "failed to parse {name}='{value}' as a positive integer"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_names_round_trip() {
        for backend in [Backend::Mock, Backend::Raw, Backend::Fmf] {
            assert_eq!(Backend::from_str(backend.as_str()).unwrap(), backend);
        }
        assert!(Backend::from_str("quicktime").is_err());
    }

    #[test]
    fn backend_is_inferred_from_extension() {
        let config = Configuration {
            input: Some(PathBuf::from("/videos/session-01.FMF")),
            ..Default::default()
        };
        assert_eq!(config.resolved_backend().unwrap(), Backend::Fmf);

        let config = Configuration {
            input: Some(PathBuf::from("/videos/session-01.avi")),
            ..Default::default()
        };
        assert!(config.resolved_backend().is_err());
    }

    #[cfg(feature = "backend-mock")]
    #[test]
    fn mock_source_uses_configured_shape() {
        let config = Configuration {
            backend: Some(Backend::Mock),
            width: Some(80),
            height: Some(60),
            mock_frames: Some(12),
            ..Default::default()
        };
        let source = config.create_source().unwrap();
        let metadata = source.metadata();
        assert_eq!((metadata.width, metadata.height), (80, 60));
        assert_eq!(metadata.frame_count, 12);
    }

    #[cfg(feature = "backend-raw")]
    #[test]
    fn raw_backend_requires_dimensions() {
        let config = Configuration {
            backend: Some(Backend::Raw),
            input: Some(PathBuf::from("/tmp/video.raw")),
            ..Default::default()
        };
        assert!(config.create_source().is_err());
    }
}
