use std::fmt;
use std::path::PathBuf;

#[derive(Debug)]
pub enum OutputError {
    Io(std::io::Error),
    Csv(csv::Error),
    Json(serde_json::Error),
    Encode(image::ImageError),
    Format { path: Option<PathBuf>, message: String },
}

impl OutputError {
    pub(crate) fn format(message: impl Into<String>) -> Self {
        OutputError::Format {
            path: None,
            message: message.into(),
        }
    }

    /// Attaches the offending file to a format error.
    pub(crate) fn in_file(self, file: impl Into<PathBuf>) -> Self {
        match self {
            OutputError::Format { path: None, message } => OutputError::Format {
                path: Some(file.into()),
                message,
            },
            other => other,
        }
    }
}

impl fmt::Display for OutputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputError::Io(err) => write!(f, "I/O error: {err}"),
            OutputError::Csv(err) => write!(f, "CSV error: {err}"),
            OutputError::Json(err) => write!(f, "JSON error: {err}"),
            OutputError::Encode(err) => write!(f, "encoding error: {err}"),
            OutputError::Format {
                path: Some(path),
                message,
            } => write!(f, "malformed file {}: {message}", path.display()),
            OutputError::Format {
                path: None,
                message,
            } => write!(f, "malformed input: {message}"),
        }
    }
}

impl std::error::Error for OutputError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            OutputError::Io(err) => Some(err),
            OutputError::Csv(err) => Some(err),
            OutputError::Json(err) => Some(err),
            OutputError::Encode(err) => Some(err),
            OutputError::Format { .. } => None,
        }
    }
}

impl From<std::io::Error> for OutputError {
    fn from(value: std::io::Error) -> Self {
        OutputError::Io(value)
    }
}

impl From<csv::Error> for OutputError {
    fn from(value: csv::Error) -> Self {
        OutputError::Csv(value)
    }
}

impl From<serde_json::Error> for OutputError {
    fn from(value: serde_json::Error) -> Self {
        OutputError::Json(value)
    }
}

impl From<image::ImageError> for OutputError {
    fn from(value: image::ImageError) -> Self {
        OutputError::Encode(value)
    }
}
