//! Directory enumeration.
//!
//! Backends supply a [`DirectoryIterImpl`]; the facade wraps it into a
//! [`ReadDir`], a lazy single-pass iterator in the `std::fs::read_dir`
//! mold.

use crate::error::VfsResult;
use crate::path::VfsPath;

/// A single entry produced by directory iteration, carrying its full path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    path: VfsPath,
}

impl DirectoryEntry {
    pub fn new(path: impl Into<VfsPath>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &VfsPath {
        &self.path
    }

    pub fn file_name(&self) -> Option<String> {
        self.path.file_name().map(str::to_string)
    }
}

/// Backend-side directory iterator.
///
/// A freshly opened iterator is positioned on the first entry (or at end
/// for an empty directory). Calling [`increment`](Self::increment) past end
/// is forbidden.
pub trait DirectoryIterImpl: Send {
    fn increment(&mut self) -> VfsResult<()>;

    /// The entry under the cursor. Must not be called at end.
    fn dereference(&self) -> DirectoryEntry;

    fn is_end(&self) -> bool;
}

/// Lazy, single-pass iterator over the entries of one directory.
///
/// Entries come in no particular order. Mutating the tree during iteration
/// may or may not surface the new entries but never corrupts the walk.
pub struct ReadDir {
    inner: Option<Box<dyn DirectoryIterImpl>>,
}

impl ReadDir {
    pub(crate) fn new(inner: Box<dyn DirectoryIterImpl>) -> Self {
        let inner = (!inner.is_end()).then_some(inner);
        Self { inner }
    }
}

impl Iterator for ReadDir {
    type Item = VfsResult<DirectoryEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        let iter = self.inner.as_mut()?;
        let entry = iter.dereference();
        match iter.increment() {
            Ok(()) => {
                if iter.is_end() {
                    self.inner = None;
                }
                Some(Ok(entry))
            }
            Err(err) => {
                self.inner = None;
                Some(Err(err))
            }
        }
    }
}
