//! Error types for the filesystem layer.
//!
//! Store implementations report [`StoreError`]; the filesystem maps those,
//! together with its own structural conditions, onto [`Error`].

use std::io;
use std::sync::Arc;

use crate::path::PathError;

/// Errors reported by a [`KvStore`](crate::KvStore) implementation.
///
/// An absent key is not an error at this level: stores return `Ok(None)` or
/// an empty listing instead.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    /// Network or I/O failure while talking to the backend.
    #[error("transport error: {0}")]
    Transport(Box<dyn std::error::Error + Send + Sync>),

    /// The backend answered with an unexpected status.
    #[error("unexpected status {code}: {message}")]
    Status { code: u16, message: String },

    /// The backend's response could not be decoded.
    #[error("malformed response: {message}")]
    Decode { message: String },

    /// The request was aborted through its [`Context`](crate::Context).
    #[error("request canceled")]
    Canceled,
}

/// Errors surfaced by [`KvFs`](crate::KvFs) and its handles.
///
/// Cloning is cheap: a store failure is shared, not copied, so a clone
/// keeps the original variant and source chain.
#[derive(thiserror::Error, Debug, Clone)]
pub enum Error {
    /// Malformed or illegal input path.
    #[error("{op} {path}: invalid path: {source}")]
    InvalidPath {
        op: &'static str,
        path: String,
        #[source]
        source: PathError,
    },

    /// The resolved key or prefix has no value.
    #[error("{op} {path}: file does not exist")]
    NotExist { op: &'static str, path: String },

    /// The handle was already closed.
    #[error("{op} {path}: file already closed")]
    AlreadyClosed { op: &'static str, path: String },

    /// The backing store failed.
    #[error("{op} {path}: {source}")]
    Store {
        op: &'static str,
        path: String,
        #[source]
        source: Arc<StoreError>,
    },

    /// A positive `read_dir` on an exhausted directory handle.
    #[error("end of directory")]
    EndOfSequence,

    /// The operation was aborted through its context.
    #[error("{op} {path}: operation canceled")]
    Canceled { op: &'static str, path: String },

    /// A directory capability was requested from a file handle.
    #[error("{op} {path}: not a directory")]
    NotADirectory { op: &'static str, path: String },

    /// A file capability was requested from a directory handle.
    #[error("{op} {path}: is a directory")]
    IsADirectory { op: &'static str, path: String },
}

/// Coarse classification of an [`Error`], for sentinel checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidPath,
    NotExist,
    AlreadyClosed,
    Store,
    EndOfSequence,
    Canceled,
    NotADirectory,
    IsADirectory,
}

impl Error {
    /// Map a store failure onto the taxonomy, attaching operation context.
    pub fn from_store(op: &'static str, path: impl Into<String>, source: StoreError) -> Self {
        let path = path.into();
        match source {
            StoreError::Canceled => Error::Canceled { op, path },
            source => Error::Store {
                op,
                path,
                source: Arc::new(source),
            },
        }
    }

    pub(crate) fn invalid_path(op: &'static str, path: impl Into<String>, source: PathError) -> Self {
        Error::InvalidPath {
            op,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn not_exist(op: &'static str, path: impl Into<String>) -> Self {
        Error::NotExist {
            op,
            path: path.into(),
        }
    }

    pub(crate) fn already_closed(op: &'static str, path: impl Into<String>) -> Self {
        Error::AlreadyClosed {
            op,
            path: path.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidPath { .. } => ErrorKind::InvalidPath,
            Error::NotExist { .. } => ErrorKind::NotExist,
            Error::AlreadyClosed { .. } => ErrorKind::AlreadyClosed,
            Error::Store { .. } => ErrorKind::Store,
            Error::EndOfSequence => ErrorKind::EndOfSequence,
            Error::Canceled { .. } => ErrorKind::Canceled,
            Error::NotADirectory { .. } => ErrorKind::NotADirectory,
            Error::IsADirectory { .. } => ErrorKind::IsADirectory,
        }
    }

    /// True when the error only says that the entry is absent.
    pub fn is_not_exist(&self) -> bool {
        self.kind() == ErrorKind::NotExist
    }

    /// The store failure behind an [`Error::Store`].
    pub fn store_error(&self) -> Option<&StoreError> {
        match self {
            Error::Store { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }

    /// This error reported under a different operation name.
    ///
    /// Used when a condition recorded at `open` is reported by a later call.
    pub(crate) fn replay(&self, op: &'static str) -> Self {
        let mut error = self.clone();
        match &mut error {
            Error::InvalidPath { op: slot, .. }
            | Error::NotExist { op: slot, .. }
            | Error::AlreadyClosed { op: slot, .. }
            | Error::Store { op: slot, .. }
            | Error::Canceled { op: slot, .. }
            | Error::NotADirectory { op: slot, .. }
            | Error::IsADirectory { op: slot, .. } => *slot = op,
            Error::EndOfSequence => {}
        }
        error
    }
}

impl From<Error> for io::Error {
    fn from(error: Error) -> Self {
        let kind = match error.kind() {
            ErrorKind::NotExist => io::ErrorKind::NotFound,
            ErrorKind::InvalidPath => io::ErrorKind::InvalidInput,
            ErrorKind::Canceled => io::ErrorKind::TimedOut,
            ErrorKind::EndOfSequence => io::ErrorKind::UnexpectedEof,
            _ => io::ErrorKind::Other,
        };
        io::Error::new(kind, error)
    }
}
