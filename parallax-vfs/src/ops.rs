//! Public facade.
//!
//! Free functions mirroring a conventional filesystem library. Every
//! operation resolves its path(s) to a backend first: a path carrying a
//! `//name` root is served by the tree mounted there, everything else by
//! the host OS. A `//name` path whose root matches no mounted tree fails
//! with `NotFound` rather than silently falling through to the host.

use crate::dir::ReadDir;
use crate::error::{ErrorKind, VfsError, VfsResult};
use crate::buffer::{FileBuffer, OpenMode};
use crate::host::HostTree;
use crate::manager::manager;
use crate::path::VfsPath;
use crate::status::{FileStatus, SpaceInfo};
use crate::stream::{Reader, Writer};
use crate::tree::{FilesystemTree, SpecialData};
use rand::Rng;
use std::fs;
use std::sync::Arc;
use std::time::SystemTime;
use tracing::warn;

/// Chunk size used when streaming file contents between backends.
const COPY_CHUNK: usize = 128 * 1024;

static HOST: HostTree = HostTree;

/// Where a path resolves to: a mounted tree (with the absolute in-tree
/// path) or the host filesystem (with the path as given, so the host can
/// apply its own working directory).
enum Route {
    Tree {
        tree: Arc<dyn FilesystemTree>,
        path: VfsPath,
    },
    Host {
        path: VfsPath,
    },
}

impl Route {
    fn tree(&self) -> &dyn FilesystemTree {
        match self {
            Route::Tree { tree, .. } => tree.as_ref(),
            Route::Host { .. } => &HOST,
        }
    }

    fn path(&self) -> &VfsPath {
        match self {
            Route::Tree { path, .. } | Route::Host { path } => path,
        }
    }

    fn is_host(&self) -> bool {
        matches!(self, Route::Host { .. })
    }

    /// True when both routes land on the same backend.
    fn same_backend(&self, other: &Route) -> bool {
        match (self, other) {
            (Route::Host { .. }, Route::Host { .. }) => true,
            (Route::Tree { tree: a, .. }, Route::Tree { tree: b, .. }) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

fn route(op: &'static str, path: &VfsPath) -> VfsResult<Route> {
    if let Some(root) = path.root_name() {
        // a //name path is virtual by construction and never reaches the
        // host, mounted or not
        match manager().tree_at_root(&root) {
            Some(tree) if path.is_absolute() => Ok(Route::Tree {
                tree,
                path: path.clone(),
            }),
            _ => Err(VfsError::new(op, ErrorKind::NotFound).with_path(path)),
        }
    } else if path.is_absolute() {
        Ok(Route::Host { path: path.clone() })
    } else if let Some(tree) = manager().current_tree() {
        let cwd = manager()
            .current_path()
            .expect("in-tree working directory is set whenever a tree owns it");
        Ok(Route::Tree {
            tree,
            path: cwd.join(path).lexically_normal(),
        })
    } else {
        Ok(Route::Host { path: path.clone() })
    }
}

fn host_current_dir(op: &'static str) -> VfsResult<VfsPath> {
    std::env::current_dir()
        .map(VfsPath::from)
        .map_err(|e| VfsError::from_io(op, e))
}

// ---------------------------------------------------------------------------
// streams

/// Opens a stream buffer on the backend serving `path`.
pub fn open_file<P: Into<VfsPath>>(path: P, mode: OpenMode) -> VfsResult<Box<dyn FileBuffer>> {
    let op = "open_file";
    let path = path.into();
    let route = route(op, &path)?;
    route
        .tree()
        .open(route.path(), mode)
        .ok_or_else(|| VfsError::new(op, ErrorKind::NotFound).with_path(&path))
}

/// Opens `path` for reading.
pub fn open_reader<P: Into<VfsPath>>(path: P) -> VfsResult<Reader> {
    open_file(path, OpenMode::reading()).map(Reader::new)
}

/// Opens `path` for writing, creating or truncating it.
pub fn open_writer<P: Into<VfsPath>>(path: P) -> VfsResult<Writer> {
    open_file(path, OpenMode::writing()).map(Writer::new)
}

// ---------------------------------------------------------------------------
// path resolution

/// Makes `path` absolute against the current working directory without
/// touching any backend.
pub fn absolute<P: Into<VfsPath>>(path: P) -> VfsResult<VfsPath> {
    let path = path.into();
    if path.is_absolute() {
        return Ok(path);
    }
    if let Some(root) = path.root_name() {
        // a bare //name anchors at its own root directory
        return Ok(VfsPath::new(format!("{root}/")).join(path.relative_part()));
    }
    Ok(current_path()?.join(path))
}

/// Host-style alias for [`absolute`].
pub fn system_complete<P: Into<VfsPath>>(path: P) -> VfsResult<VfsPath> {
    absolute(path)
}

/// Canonical absolute form of `path`; the path must exist.
pub fn canonical<P: Into<VfsPath>>(path: P) -> VfsResult<VfsPath> {
    let op = "canonical";
    let path = path.into();
    match route(op, &path)? {
        Route::Tree { tree, path } => tree.canonical(&path, &VfsPath::default()),
        Route::Host { path } => HOST.canonical(&path, &host_current_dir(op)?),
    }
}

/// Canonical absolute form of `path` without requiring existence.
pub fn weakly_canonical<P: Into<VfsPath>>(path: P) -> VfsResult<VfsPath> {
    let path = absolute(path.into())?;
    match route("weakly_canonical", &path)? {
        Route::Tree { tree, path } => tree.weakly_canonical(&path),
        Route::Host { path } => HOST.weakly_canonical(&path),
    }
}

/// `path` expressed relative to the current working directory.
pub fn relative<P: Into<VfsPath>>(path: P) -> VfsResult<VfsPath> {
    relative_to(path, current_path()?)
}

/// `path` expressed relative to `base`, comparing canonical forms.
pub fn relative_to<P: Into<VfsPath>, B: Into<VfsPath>>(path: P, base: B) -> VfsResult<VfsPath> {
    let path = weakly_canonical(path.into())?;
    let base = weakly_canonical(base.into())?;
    Ok(path.lexically_relative(&base))
}

/// The current working directory: the in-tree one when a tree owns it,
/// the host's otherwise.
pub fn current_path() -> VfsResult<VfsPath> {
    match manager().current_path() {
        Some(path) => Ok(path),
        None => host_current_dir("current_path"),
    }
}

/// Moves the working directory, switching between trees and the host as
/// needed.
pub fn set_current_path<P: Into<VfsPath>>(path: P) -> VfsResult<()> {
    let op = "set_current_path";
    let path = path.into();
    if path.has_root_name() {
        if !path.is_absolute() {
            return Err(VfsError::new(op, ErrorKind::InvalidArgument).with_path(&path));
        }
        if manager().tree_at_root(&path.root_name().unwrap()).is_none() {
            return Err(VfsError::new(op, ErrorKind::NotFound).with_path(&path));
        }
        manager().set_current_path(&path);
        Ok(())
    } else if path.is_absolute() {
        // hand the working directory back to the host
        manager().set_current_path(&path);
        std::env::set_current_dir(path.as_std_path())
            .map_err(|e| VfsError::from_io(op, e).with_path(&path))
    } else if manager().current_tree().is_some() {
        manager().set_current_path(&path);
        Ok(())
    } else {
        std::env::set_current_dir(path.as_std_path())
            .map_err(|e| VfsError::from_io(op, e).with_path(&path))
    }
}

// ---------------------------------------------------------------------------
// queries

/// Type of the entry at `path`. A missing entry reports
/// [`FileType::NotFound`](crate::FileType::NotFound) and is not an error.
pub fn status<P: Into<VfsPath>>(path: P) -> VfsResult<FileStatus> {
    let path = path.into();
    let route = route("status", &path)?;
    route.tree().status(route.path())
}

/// Like [`status`] but without following symlinks on the host.
pub fn symlink_status<P: Into<VfsPath>>(path: P) -> VfsResult<FileStatus> {
    let op = "symlink_status";
    let path = path.into();
    let route = route(op, &path)?;
    if route.is_host() {
        return match fs::symlink_metadata(route.path().as_std_path()) {
            Ok(md) => Ok(FileStatus::new(if md.file_type().is_symlink() {
                crate::status::FileType::Other
            } else if md.is_file() {
                crate::status::FileType::Regular
            } else if md.is_dir() {
                crate::status::FileType::Directory
            } else {
                crate::status::FileType::Other
            })),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Ok(FileStatus::new(crate::status::FileType::NotFound))
            }
            Err(err) => Err(VfsError::from_io(op, err).with_path(&path)),
        };
    }
    route.tree().status(route.path())
}

/// True when `path` refers to an existing entry. Never fails; routing and
/// I/O errors read as "does not exist".
pub fn exists<P: Into<VfsPath>>(path: P) -> bool {
    status(path).map(|s| s.exists()).unwrap_or(false)
}

pub fn is_directory<P: Into<VfsPath>>(path: P) -> VfsResult<bool> {
    status(path).map(|s| s.is_directory())
}

pub fn is_regular_file<P: Into<VfsPath>>(path: P) -> VfsResult<bool> {
    status(path).map(|s| s.is_regular_file())
}

pub fn is_other<P: Into<VfsPath>>(path: P) -> VfsResult<bool> {
    status(path).map(|s| s.is_other())
}

/// True when `path` is a host symlink. Virtual trees have no symlinks.
pub fn is_symlink<P: Into<VfsPath>>(path: P) -> VfsResult<bool> {
    let path = path.into();
    let route = route("is_symlink", &path)?;
    if !route.is_host() {
        return Ok(false);
    }
    match fs::symlink_metadata(route.path().as_std_path()) {
        Ok(md) => Ok(md.file_type().is_symlink()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(VfsError::from_io("is_symlink", err).with_path(&path)),
    }
}

/// True for an empty regular file or a directory with no entries.
pub fn is_empty<P: Into<VfsPath>>(path: P) -> VfsResult<bool> {
    let op = "is_empty";
    let path = path.into();
    let st = status(&path)?;
    if st.is_directory() {
        Ok(read_dir(&path)?.next().is_none())
    } else if st.is_regular_file() {
        Ok(file_size(&path)? == 0)
    } else {
        Err(VfsError::new(op, ErrorKind::NotFound).with_path(&path))
    }
}

/// True when both paths name the same existing entry.
pub fn equivalent<P1: Into<VfsPath>, P2: Into<VfsPath>>(
    path1: P1,
    path2: P2,
) -> VfsResult<bool> {
    let op = "equivalent";
    let path1 = path1.into();
    let path2 = path2.into();
    let r1 = route(op, &path1)?;
    let r2 = route(op, &path2)?;
    if !r1.same_backend(&r2) {
        return Ok(false);
    }
    if r1.is_host() {
        let c1 = fs::canonicalize(r1.path().as_std_path())
            .map_err(|e| VfsError::from_io(op, e).with_path(&path1))?;
        let c2 = fs::canonicalize(r2.path().as_std_path())
            .map_err(|e| VfsError::from_io(op, e).with_path(&path2))?;
        return Ok(c1 == c2);
    }
    let c1 = r1.tree().canonical(r1.path(), &VfsPath::default())?;
    let c2 = r2.tree().canonical(r2.path(), &VfsPath::default())?;
    Ok(c1 == c2)
}

/// Size in bytes of the regular file at `path`.
pub fn file_size<P: Into<VfsPath>>(path: P) -> VfsResult<u64> {
    let path = path.into();
    let route = route("file_size", &path)?;
    route.tree().file_size(route.path())
}

/// Number of hard links to `path`; always 0 inside virtual trees.
pub fn hard_link_count<P: Into<VfsPath>>(path: P) -> VfsResult<u64> {
    let op = "hard_link_count";
    let path = path.into();
    let route = route(op, &path)?;
    if !route.is_host() {
        return Ok(route.tree().hard_link_count());
    }
    let md = fs::metadata(route.path().as_std_path())
        .map_err(|e| VfsError::from_io(op, e).with_path(&path))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;
        Ok(md.nlink())
    }
    #[cfg(not(unix))]
    {
        let _ = md;
        Ok(1)
    }
}

/// Capacity of the filesystem holding `path`. Virtual trees report zeros.
pub fn space<P: Into<VfsPath>>(path: P) -> VfsResult<SpaceInfo> {
    let path = path.into();
    let route = route("space", &path)?;
    Ok(route.tree().space())
}

/// Last modification time; only the host tracks timestamps.
pub fn last_write_time<P: Into<VfsPath>>(path: P) -> VfsResult<SystemTime> {
    let op = "last_write_time";
    let path = path.into();
    let route = route(op, &path)?;
    if !route.is_host() {
        return Err(VfsError::new(op, ErrorKind::NotSupported).with_path(&path));
    }
    let md = fs::metadata(route.path().as_std_path())
        .map_err(|e| VfsError::from_io(op, e).with_path(&path))?;
    md.modified()
        .map_err(|e| VfsError::from_io(op, e).with_path(&path))
}

/// Sets the last modification time; only the host tracks timestamps.
pub fn set_last_write_time<P: Into<VfsPath>>(path: P, time: SystemTime) -> VfsResult<()> {
    let op = "set_last_write_time";
    let path = path.into();
    let route = route(op, &path)?;
    if !route.is_host() {
        return Err(VfsError::new(op, ErrorKind::NotSupported).with_path(&path));
    }
    filetime::set_file_mtime(
        route.path().as_std_path(),
        filetime::FileTime::from_system_time(time),
    )
    .map_err(|e| VfsError::from_io(op, e).with_path(&path))
}

// ---------------------------------------------------------------------------
// directories

/// Enumerates the entries of a directory, in unspecified order.
pub fn read_dir<P: Into<VfsPath>>(path: P) -> VfsResult<ReadDir> {
    let path = path.into();
    let route = route("read_dir", &path)?;
    route.tree().open_directory(route.path()).map(ReadDir::new)
}

/// Creates one directory; the parent must exist. Returns `true` when the
/// directory was newly created.
pub fn create_directory<P: Into<VfsPath>>(path: P) -> VfsResult<bool> {
    let path = path.into();
    let route = route("create_directory", &path)?;
    route.tree().create_directory(route.path())
}

/// Creates every missing directory along `path`. Returns `true` when at
/// least one directory was created.
pub fn create_directories<P: Into<VfsPath>>(path: P) -> VfsResult<bool> {
    let path = path.into();
    let route = route("create_directories", &path)?;
    let normal = route.path().lexically_normal();
    let mut prefix = normal.root_path();
    let mut created = false;
    for comp in normal.components() {
        prefix = prefix.join(comp);
        created = route.tree().create_directory(&prefix)? || created;
    }
    Ok(created)
}

// ---------------------------------------------------------------------------
// copy / remove / rename

/// Copies a file or (non-recursively) a directory.
pub fn copy<F: Into<VfsPath>, T: Into<VfsPath>>(from: F, to: T) -> VfsResult<()> {
    let op = "copy";
    let from = from.into();
    let to = to.into();
    let st = status(&from)?;
    if st.is_directory() {
        copy_directory(&from, &to)
    } else if st.is_regular_file() {
        copy_file(&from, &to).map(|_| ())
    } else {
        Err(VfsError::new(op, ErrorKind::NotFound).with_paths(&from, &to))
    }
}

/// Copies the contents of a regular file, streaming through a fixed-size
/// chunk so large reconstructions never sit in memory twice. Returns the
/// number of bytes copied.
pub fn copy_file<F: Into<VfsPath>, T: Into<VfsPath>>(from: F, to: T) -> VfsResult<u64> {
    let op = "copy_file";
    let from = from.into();
    let to = to.into();
    let mut reader = open_file(&from, OpenMode::reading())
        .map_err(|e| VfsError::new(op, e.kind()).with_paths(&from, &to))?;
    let mut writer = open_file(&to, OpenMode::writing())
        .map_err(|e| VfsError::new(op, e.kind()).with_paths(&from, &to))?;

    let mut chunk = vec![0u8; COPY_CHUNK];
    let mut total = 0u64;
    loop {
        let n = reader.read(&mut chunk);
        if n == 0 {
            break;
        }
        if writer.write(&chunk[..n]) < n {
            return Err(VfsError::new(op, ErrorKind::FileTooLarge).with_paths(&from, &to));
        }
        total += n as u64;
    }
    Ok(total)
}

/// Creates `to` as a directory, mirroring an existing directory `from`.
pub fn copy_directory<F: Into<VfsPath>, T: Into<VfsPath>>(from: F, to: T) -> VfsResult<()> {
    let op = "copy_directory";
    let from = from.into();
    let to = to.into();
    if !status(&from)?.is_directory() {
        return Err(VfsError::new(op, ErrorKind::InvalidArgument).with_paths(&from, &to));
    }
    create_directory(&to)?;
    Ok(())
}

/// Removes a file or an empty directory; returns `false` when nothing
/// existed at `path`.
pub fn remove<P: Into<VfsPath>>(path: P) -> VfsResult<bool> {
    let path = path.into();
    let route = route("remove", &path)?;
    route.tree().remove(route.path())
}

/// Removes `path` recursively; returns the number of entries removed.
pub fn remove_all<P: Into<VfsPath>>(path: P) -> VfsResult<u64> {
    let path = path.into();
    let route = route("remove_all", &path)?;
    route.tree().remove_all(route.path())
}

/// Moves `from` to `to`. Within one backend the move is atomic; across
/// backends it degrades to copy-then-remove, which only works for regular
/// files and is not atomic.
pub fn rename<F: Into<VfsPath>, T: Into<VfsPath>>(from: F, to: T) -> VfsResult<()> {
    let op = "rename";
    let from = from.into();
    let to = to.into();
    let from_route = route(op, &from)?;
    let to_route = route(op, &to)?;

    if from_route.same_backend(&to_route) {
        return from_route.tree().rename(from_route.path(), to_route.path());
    }

    if status(&from)?.is_directory() {
        return Err(VfsError::new(op, ErrorKind::CrossDeviceLink).with_paths(&from, &to));
    }
    warn!(
        target: "parallax::vfs",
        from = %from,
        to = %to,
        "cross-tree rename degraded to copy and remove"
    );
    copy_file(&from, &to)?;
    remove(&from)?;
    Ok(())
}

/// Truncates or extends a host file to `size` bytes.
pub fn resize_file<P: Into<VfsPath>>(path: P, size: u64) -> VfsResult<()> {
    let op = "resize_file";
    let path = path.into();
    let route = route(op, &path)?;
    if !route.is_host() {
        return Err(VfsError::new(op, ErrorKind::NotSupported).with_path(&path));
    }
    let file = fs::OpenOptions::new()
        .write(true)
        .open(route.path().as_std_path())
        .map_err(|e| VfsError::from_io(op, e).with_path(&path))?;
    file.set_len(size)
        .map_err(|e| VfsError::from_io(op, e).with_path(&path))
}

// ---------------------------------------------------------------------------
// links

#[cfg(unix)]
fn host_symlink(target: &VfsPath, link: &VfsPath) -> std::io::Result<()> {
    std::os::unix::fs::symlink(target.as_std_path(), link.as_std_path())
}

#[cfg(not(unix))]
fn host_symlink(_target: &VfsPath, _link: &VfsPath) -> std::io::Result<()> {
    Err(std::io::Error::from(std::io::ErrorKind::Unsupported))
}

/// Creates a host symlink at `link` pointing to `target`.
pub fn create_symlink<T: Into<VfsPath>, L: Into<VfsPath>>(target: T, link: L) -> VfsResult<()> {
    let op = "create_symlink";
    let target = target.into();
    let link = link.into();
    let route = route(op, &link)?;
    if !route.is_host() {
        return Err(VfsError::new(op, ErrorKind::NotSupported).with_paths(&target, &link));
    }
    host_symlink(&target, route.path())
        .map_err(|e| VfsError::from_io(op, e).with_paths(&target, &link))
}

/// Creates a host symlink to a directory.
pub fn create_directory_symlink<T: Into<VfsPath>, L: Into<VfsPath>>(
    target: T,
    link: L,
) -> VfsResult<()> {
    create_symlink(target, link)
}

/// Copies a host symlink itself (not its target).
pub fn copy_symlink<F: Into<VfsPath>, T: Into<VfsPath>>(from: F, to: T) -> VfsResult<()> {
    let op = "copy_symlink";
    let from = from.into();
    let to = to.into();
    let target = read_symlink(&from).map_err(|e| {
        VfsError::new(op, e.kind()).with_paths(&from, &to)
    })?;
    create_symlink(&target, &to).map_err(|e| VfsError::new(op, e.kind()).with_paths(&from, &to))
}

/// Creates a hard link on the host; virtual trees have no hard links and
/// cross-backend links fail with `CrossDeviceLink`.
pub fn create_hard_link<T: Into<VfsPath>, L: Into<VfsPath>>(target: T, link: L) -> VfsResult<()> {
    let op = "create_hard_link";
    let target = target.into();
    let link = link.into();
    let target_route = route(op, &target)?;
    let link_route = route(op, &link)?;
    if !target_route.same_backend(&link_route) {
        return Err(VfsError::new(op, ErrorKind::CrossDeviceLink).with_paths(&target, &link));
    }
    if !target_route.is_host() {
        return Err(VfsError::new(op, ErrorKind::NotSupported).with_paths(&target, &link));
    }
    fs::hard_link(target_route.path().as_std_path(), link_route.path().as_std_path())
        .map_err(|e| VfsError::from_io(op, e).with_paths(&target, &link))
}

/// Reads the target of a host symlink.
pub fn read_symlink<P: Into<VfsPath>>(path: P) -> VfsResult<VfsPath> {
    let op = "read_symlink";
    let path = path.into();
    let route = route(op, &path)?;
    if !route.is_host() {
        return Err(VfsError::new(op, ErrorKind::NotSupported).with_path(&path));
    }
    fs::read_link(route.path().as_std_path())
        .map(VfsPath::from)
        .map_err(|e| VfsError::from_io(op, e).with_path(&path))
}

// ---------------------------------------------------------------------------
// temporaries

/// The temporary directory: the manager override when set, the host's
/// default otherwise.
pub fn temp_directory_path() -> VfsResult<VfsPath> {
    match manager().temp_dir() {
        Some(path) => Ok(path),
        None => Ok(VfsPath::from(std::env::temp_dir())),
    }
}

/// Default model used by [`unique_path`].
const UNIQUE_PATH_MODEL: &str = "%%%%-%%%%-%%%%-%%%%";

/// A random path suitable for a temporary file name.
pub fn unique_path() -> VfsPath {
    unique_path_from(UNIQUE_PATH_MODEL)
}

/// Replaces every `%` in `model` with a random lowercase hex digit.
pub fn unique_path_from(model: &str) -> VfsPath {
    let mut rng = rand::thread_rng();
    let name: String = model
        .chars()
        .map(|c| {
            if c == '%' {
                char::from_digit(rng.gen_range(0..16), 16).unwrap()
            } else {
                c
            }
        })
        .collect();
    VfsPath::new(name)
}

// ---------------------------------------------------------------------------
// special data

/// Attaches an opaque shared payload to a path inside a tree.
pub fn set_special_data<P: Into<VfsPath>>(path: P, data: SpecialData) -> VfsResult<()> {
    let path = path.into();
    let route = route("set_special_data", &path)?;
    route.tree().set_special_data(route.path(), data)
}

/// The payload attached to `path`; fails with `NotFound` when there is
/// none.
pub fn get_special_data<P: Into<VfsPath>>(path: P) -> VfsResult<SpecialData> {
    let op = "get_special_data";
    let path = path.into();
    let route = route(op, &path)?;
    route
        .tree()
        .get_special_data(route.path())?
        .ok_or_else(|| VfsError::new(op, ErrorKind::NotFound).with_path(&path))
}

/// Like [`get_special_data`] but absence (of the payload, the path or the
/// whole tree) reads as `None`.
pub fn get_special_data_if_exists<P: Into<VfsPath>>(path: P) -> VfsResult<Option<SpecialData>> {
    let path = path.into();
    let route = match route("get_special_data", &path) {
        Ok(route) => route,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err),
    };
    match route.tree().get_special_data(route.path()) {
        Ok(data) => Ok(data),
        Err(err) if matches!(err.kind(), ErrorKind::NotFound | ErrorKind::NotSupported) => {
            Ok(None)
        }
        Err(err) => Err(err),
    }
}
