//! Error types for tarfs core

use std::path::PathBuf;

/// Core filesystem error type
#[derive(thiserror::Error, Debug)]
pub enum FsError {
    #[error("cannot open archive {}: {reason}", path.display())]
    ArchiveOpen { path: PathBuf, reason: String },
    #[error("{0}: No such file or directory")]
    NoSuchPath(String),
    #[error("Cannot extract file '{0}' from archive")]
    ContentUnavailable(String),
    #[error("File '{0}' contains binary data and cannot be read as text")]
    BinaryContent(String),
    #[error("'{0}' is not a regular file")]
    NotAFile(String),
}

impl FsError {
    pub(crate) fn archive_open(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        FsError::ArchiveOpen {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

pub type FsResult<T> = Result<T, FsError>;
