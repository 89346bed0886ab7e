use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failures raised by the file helpers that are allowed to fail loudly.
#[derive(Debug, Error)]
pub enum FileOpsError {
    #[error("path does not exist: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("cannot parse {}: {message}", path.display())]
    Format { path: PathBuf, message: String },

    #[error("{message}")]
    Constraint { message: String },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl FileOpsError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        FileOpsError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        FileOpsError::NotFound { path: path.into() }
    }

    pub fn constraint(message: impl Into<String>) -> Self {
        FileOpsError::Constraint {
            message: message.into(),
        }
    }
}

pub type Result<T, E = FileOpsError> = std::result::Result<T, E>;
