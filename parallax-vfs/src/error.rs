//! VFS error types.

use crate::path::VfsPath;
use std::io;
use thiserror::Error;

/// Result type for VFS operations.
pub type VfsResult<T> = Result<T, VfsError>;

/// The errno-style classification of a [`VfsError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// File or directory does not exist.
    NotFound,
    /// Path already exists with an incompatible type.
    AlreadyExists,
    /// Directory is not empty.
    DirectoryNotEmpty,
    /// The arguments are invalid for the operation.
    InvalidArgument,
    /// The two paths live on different trees.
    CrossDeviceLink,
    /// A write could not be completed in full.
    FileTooLarge,
    /// The backend does not implement the operation.
    NotSupported,
    /// An underlying host I/O error.
    Io,
}

impl ErrorKind {
    /// Human-readable description, used by the `Display` impl.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "no such file or directory",
            ErrorKind::AlreadyExists => "file exists",
            ErrorKind::DirectoryNotEmpty => "directory not empty",
            ErrorKind::InvalidArgument => "invalid argument",
            ErrorKind::CrossDeviceLink => "cross-device link",
            ErrorKind::FileTooLarge => "file too large",
            ErrorKind::NotSupported => "function not supported",
            ErrorKind::Io => "I/O error",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error produced by a VFS operation.
///
/// Carries the classification, the name of the failed operation and the one
/// or two paths involved. Callers that only care about the class of failure
/// match on [`VfsError::kind`]; everything else bubbles the error up with
/// `?`.
#[derive(Debug, Error)]
#[error("{}", render(.kind, .op, .path1, .path2))]
pub struct VfsError {
    kind: ErrorKind,
    op: &'static str,
    path1: Option<VfsPath>,
    path2: Option<VfsPath>,
    #[source]
    source: Option<io::Error>,
}

fn render(kind: &ErrorKind, op: &str, path1: &Option<VfsPath>, path2: &Option<VfsPath>) -> String {
    match (path1, path2) {
        (Some(p1), Some(p2)) => format!("{op}: {kind}: '{p1}' -> '{p2}'"),
        (Some(p1), None) => format!("{op}: {kind}: '{p1}'"),
        _ => format!("{op}: {kind}"),
    }
}

impl VfsError {
    pub fn new(op: &'static str, kind: ErrorKind) -> Self {
        Self {
            kind,
            op,
            path1: None,
            path2: None,
            source: None,
        }
    }

    pub fn with_path(mut self, path: impl Into<VfsPath>) -> Self {
        self.path1 = Some(path.into());
        self
    }

    pub fn with_paths(mut self, path1: impl Into<VfsPath>, path2: impl Into<VfsPath>) -> Self {
        self.path1 = Some(path1.into());
        self.path2 = Some(path2.into());
        self
    }

    /// Wraps a host I/O error, classifying it by its `io::ErrorKind`.
    pub fn from_io(op: &'static str, err: io::Error) -> Self {
        let kind = match err.kind() {
            io::ErrorKind::NotFound => ErrorKind::NotFound,
            io::ErrorKind::AlreadyExists => ErrorKind::AlreadyExists,
            io::ErrorKind::DirectoryNotEmpty => ErrorKind::DirectoryNotEmpty,
            io::ErrorKind::InvalidInput => ErrorKind::InvalidArgument,
            io::ErrorKind::CrossesDevices => ErrorKind::CrossDeviceLink,
            io::ErrorKind::FileTooLarge => ErrorKind::FileTooLarge,
            io::ErrorKind::Unsupported => ErrorKind::NotSupported,
            _ => ErrorKind::Io,
        };
        Self {
            kind,
            op,
            path1: None,
            path2: None,
            source: Some(err),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn op(&self) -> &'static str {
        self.op
    }

    /// First path involved in the failed operation, if recorded.
    pub fn path1(&self) -> Option<&VfsPath> {
        self.path1.as_ref()
    }

    /// Second path involved in the failed operation, if recorded.
    pub fn path2(&self) -> Option<&VfsPath> {
        self.path2.as_ref()
    }
}

impl From<VfsError> for io::Error {
    fn from(err: VfsError) -> Self {
        let kind = match err.kind() {
            ErrorKind::NotFound => io::ErrorKind::NotFound,
            ErrorKind::AlreadyExists => io::ErrorKind::AlreadyExists,
            ErrorKind::DirectoryNotEmpty => io::ErrorKind::DirectoryNotEmpty,
            ErrorKind::InvalidArgument => io::ErrorKind::InvalidInput,
            ErrorKind::CrossDeviceLink => io::ErrorKind::CrossesDevices,
            ErrorKind::NotSupported => io::ErrorKind::Unsupported,
            ErrorKind::FileTooLarge => io::ErrorKind::FileTooLarge,
            ErrorKind::Io => io::ErrorKind::Other,
        };
        io::Error::new(kind, err)
    }
}
