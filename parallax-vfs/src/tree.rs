//! The contract every tree backend implements.

use crate::buffer::{FileBuffer, OpenMode};
use crate::dir::DirectoryIterImpl;
use crate::error::VfsResult;
use crate::path::VfsPath;
use crate::status::{FileStatus, SpaceInfo};
use std::any::Any;
use std::sync::Arc;

/// Opaque shared payload that can be attached to a path, independent of the
/// file's byte contents.
pub type SpecialData = Arc<dyn Any + Send + Sync>;

/// A self-contained filesystem servicing all paths under one root name.
///
/// The facade guarantees that every path handed to a tree is absolute and
/// rooted in that tree; backends do not re-resolve the current directory.
/// Implementations must be safe for concurrent use from multiple threads.
pub trait FilesystemTree: Send + Sync {
    /// Opens a regular file, creating it when `mode` requests write access
    /// and it does not exist. Returns `None` when the parent directory is
    /// missing, the target is a directory, or the target is missing and the
    /// mode is read-only.
    fn open(&self, path: &VfsPath, mode: OpenMode) -> Option<Box<dyn FileBuffer>>;

    /// Opens the directory for enumeration. Entry order is unspecified.
    fn open_directory(&self, path: &VfsPath) -> VfsResult<Box<dyn DirectoryIterImpl>>;

    /// Creates one directory; the parent must already exist. Returns `true`
    /// when the directory was newly created, `false` when it already existed.
    fn create_directory(&self, path: &VfsPath) -> VfsResult<bool>;

    /// Atomically moves `from` to `to` within this tree. Renaming onto an
    /// existing regular file overwrites it; onto a non-empty directory fails
    /// with `DirectoryNotEmpty`; a lexical no-op succeeds; an
    /// ancestor/descendant pair fails with `InvalidArgument`.
    fn rename(&self, from: &VfsPath, to: &VfsPath) -> VfsResult<()>;

    /// `absolute(path, base)` normalized; the path must exist.
    fn canonical(&self, path: &VfsPath, base: &VfsPath) -> VfsResult<VfsPath>;

    /// Like [`canonical`](Self::canonical) but without the existence check.
    fn weakly_canonical(&self, path: &VfsPath) -> VfsResult<VfsPath>;

    /// Size in bytes of a regular file.
    fn file_size(&self, path: &VfsPath) -> VfsResult<u64>;

    /// Type of the entry at `path`. A missing path is not an error; it
    /// reports [`FileType::NotFound`](crate::FileType::NotFound).
    fn status(&self, path: &VfsPath) -> VfsResult<FileStatus>;

    /// Removes a file or an empty directory. Returns `false` when nothing
    /// existed at `path`.
    fn remove(&self, path: &VfsPath) -> VfsResult<bool>;

    /// Removes `path` and everything below it; returns the number of
    /// entries removed. A missing path removes nothing and is not an error.
    fn remove_all(&self, path: &VfsPath) -> VfsResult<u64>;

    /// Virtual trees have no hard links.
    fn hard_link_count(&self) -> u64 {
        0
    }

    /// Virtual trees report zero capacity.
    fn space(&self) -> SpaceInfo {
        SpaceInfo::ZERO
    }

    /// Attaches a shared payload to `path`, creating an empty file node
    /// when nothing exists there yet.
    fn set_special_data(&self, path: &VfsPath, data: SpecialData) -> VfsResult<()>;

    /// The payload attached to `path`: `Ok(None)` when the path exists but
    /// carries no payload, `Err(NotFound)` when the path does not exist.
    fn get_special_data(&self, path: &VfsPath) -> VfsResult<Option<SpecialData>>;
}
