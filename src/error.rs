use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CleanupError>;

#[derive(Debug, Error)]
pub enum CleanupError {
    #[error("destination folder {folder} does not exist at {path:?}")]
    DestinationMissing { folder: String, path: PathBuf },

    #[error("cannot read message {path:?}: {source}")]
    UnreadableMessage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("permission denied on {path:?}: {source}")]
    PermissionDenied {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("folder {folder} at {path:?} is not a maildir")]
    SourceNotMaildir { folder: String, path: PathBuf },

    #[error("{path:?} already exists")]
    DestinationExists { path: PathBuf },

    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl CleanupError {
    /// Wraps an I/O error raised while touching `path`, singling out
    /// permission problems so that they can stop the run.
    pub fn io(path: &Path, source: io::Error) -> Self {
        let path = path.to_path_buf();
        match source.kind() {
            io::ErrorKind::PermissionDenied => CleanupError::PermissionDenied { path, source },
            _ => CleanupError::Io { path, source },
        }
    }

    /// Like `io`, but for failures reading a single message.
    pub fn unreadable(path: &Path, source: io::Error) -> Self {
        match CleanupError::io(path, source) {
            CleanupError::Io { path, source } => CleanupError::UnreadableMessage { path, source },
            other => other,
        }
    }

    /// Whether this error has to stop the whole run rather than the current
    /// folder or message.
    pub fn is_fatal(&self) -> bool {
        matches!(self, CleanupError::PermissionDenied { .. })
    }
}
