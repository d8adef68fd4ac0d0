//! Host-OS passthrough backend.
//!
//! [`HostTree`] delegates every tree operation to `std::fs`. It never
//! appears in the mount table; the facade falls back to it when no mounted
//! tree claims a path.

use crate::buffer::{Cursors, FileBuffer, OpenMode, SeekFrom};
use crate::dir::{DirectoryEntry, DirectoryIterImpl};
use crate::error::{ErrorKind, VfsError, VfsResult};
use crate::path::VfsPath;
use crate::status::{FileStatus, FileType};
use crate::tree::{FilesystemTree, SpecialData};
use std::fs;
use std::io::{Read, Seek, Write};

/// Stream buffer over a host file.
///
/// The host file has a single OS-level position, so the buffer keeps its own
/// read and write cursors and seeks before each transfer. Append mode maps
/// to the OS append flag, which makes concurrent appends atomic.
struct HostFileBuf {
    file: Option<fs::File>,
    append: bool,
    read_pos: u64,
    write_pos: u64,
}

impl HostFileBuf {
    fn open(path: &VfsPath, mode: OpenMode) -> std::io::Result<Self> {
        let mut opts = fs::OpenOptions::new();
        opts.read(mode.is_read());
        if mode.is_out() {
            opts.write(true).create(true);
        }
        if mode.is_truncate() {
            opts.truncate(true);
        }
        if mode.is_append() {
            opts.append(true);
        }
        let file = opts.open(path.as_std_path())?;
        let write_pos = if mode.is_append() {
            file.metadata()?.len()
        } else {
            0
        };
        Ok(Self {
            file: Some(file),
            append: mode.is_append(),
            read_pos: 0,
            write_pos,
        })
    }

    fn len(&self) -> std::io::Result<u64> {
        match &self.file {
            Some(file) => Ok(file.metadata()?.len()),
            None => Ok(0),
        }
    }
}

impl FileBuffer for HostFileBuf {
    fn is_open(&self) -> bool {
        self.file.is_some()
    }

    fn close(&mut self) -> VfsResult<()> {
        self.file = None;
        Ok(())
    }

    fn peek_byte(&mut self) -> Option<u8> {
        let file = self.file.as_mut()?;
        file.seek(SeekFrom::Start(self.read_pos)).ok()?;
        let mut byte = [0u8; 1];
        (file.read(&mut byte).ok()? == 1).then_some(byte[0])
    }

    fn read_byte(&mut self) -> Option<u8> {
        let byte = self.peek_byte()?;
        self.read_pos += 1;
        Some(byte)
    }

    fn read(&mut self, out: &mut [u8]) -> usize {
        let Some(file) = self.file.as_mut() else {
            return 0;
        };
        if file.seek(SeekFrom::Start(self.read_pos)).is_err() {
            return 0;
        }
        let n = file.read(out).unwrap_or(0);
        self.read_pos += n as u64;
        n
    }

    fn put_byte(&mut self, byte: u8) -> bool {
        self.write(&[byte]) == 1
    }

    fn write(&mut self, data: &[u8]) -> usize {
        let Some(file) = self.file.as_mut() else {
            return 0;
        };
        if !self.append && file.seek(SeekFrom::Start(self.write_pos)).is_err() {
            return 0;
        }
        match file.write(data) {
            Ok(n) => {
                self.write_pos += n as u64;
                n
            }
            Err(_) => 0,
        }
    }

    fn seek(&mut self, from: SeekFrom, cursors: Cursors) -> VfsResult<u64> {
        let invalid = || VfsError::new("seek", ErrorKind::InvalidArgument);
        if self.file.is_none() || (!cursors.read && !cursors.write) {
            return Err(invalid());
        }
        let target = match from {
            SeekFrom::Start(pos) => pos as i64,
            SeekFrom::Current(off) => {
                if cursors.read && cursors.write {
                    return Err(invalid());
                }
                let base = if cursors.read {
                    self.read_pos
                } else {
                    self.write_pos
                };
                base as i64 + off
            }
            SeekFrom::End(off) => {
                let len = self.len().map_err(|e| VfsError::from_io("seek", e))?;
                len as i64 + off
            }
        };
        if target < 0 {
            return Err(invalid());
        }
        if cursors.read {
            self.read_pos = target as u64;
        }
        if cursors.write {
            self.write_pos = target as u64;
        }
        Ok(target as u64)
    }
}

struct HostDirIter {
    iter: fs::ReadDir,
    current: Option<DirectoryEntry>,
}

impl HostDirIter {
    fn new(path: &VfsPath) -> std::io::Result<Self> {
        let mut iter = fs::read_dir(path.as_std_path())?;
        let current = match iter.next() {
            Some(entry) => Some(DirectoryEntry::new(entry?.path())),
            None => None,
        };
        Ok(Self { iter, current })
    }
}

impl DirectoryIterImpl for HostDirIter {
    fn increment(&mut self) -> VfsResult<()> {
        debug_assert!(self.current.is_some());
        self.current = match self.iter.next() {
            Some(Ok(entry)) => Some(DirectoryEntry::new(entry.path())),
            Some(Err(err)) => return Err(VfsError::from_io("read_dir", err)),
            None => None,
        };
        Ok(())
    }

    fn dereference(&self) -> DirectoryEntry {
        self.current.clone().expect("dereference past end")
    }

    fn is_end(&self) -> bool {
        self.current.is_none()
    }
}

/// Tree backend delegating to the host operating system.
#[derive(Debug, Default)]
pub struct HostTree;

impl HostTree {
    pub fn new() -> Self {
        Self
    }
}

impl FilesystemTree for HostTree {
    fn open(&self, path: &VfsPath, mode: OpenMode) -> Option<Box<dyn FileBuffer>> {
        let buf = HostFileBuf::open(path, mode).ok()?;
        Some(Box::new(buf))
    }

    fn open_directory(&self, path: &VfsPath) -> VfsResult<Box<dyn DirectoryIterImpl>> {
        let iter = HostDirIter::new(path)
            .map_err(|e| VfsError::from_io("open_directory", e).with_path(path))?;
        Ok(Box::new(iter))
    }

    fn create_directory(&self, path: &VfsPath) -> VfsResult<bool> {
        match fs::create_dir(path.as_std_path()) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
                if path.as_std_path().is_dir() {
                    Ok(false)
                } else {
                    Err(VfsError::new("create_directory", ErrorKind::AlreadyExists)
                        .with_path(path))
                }
            }
            Err(err) => Err(VfsError::from_io("create_directory", err).with_path(path)),
        }
    }

    fn rename(&self, from: &VfsPath, to: &VfsPath) -> VfsResult<()> {
        fs::rename(from.as_std_path(), to.as_std_path())
            .map_err(|e| VfsError::from_io("rename", e).with_paths(from, to))
    }

    fn canonical(&self, path: &VfsPath, base: &VfsPath) -> VfsResult<VfsPath> {
        let abs = if path.is_absolute() {
            path.clone()
        } else {
            base.join(path)
        };
        fs::canonicalize(abs.as_std_path())
            .map(|p| VfsPath::from(p))
            .map_err(|e| VfsError::from_io("canonical", e).with_path(path))
    }

    fn weakly_canonical(&self, path: &VfsPath) -> VfsResult<VfsPath> {
        match fs::canonicalize(path.as_std_path()) {
            Ok(p) => Ok(VfsPath::from(p)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Ok(path.lexically_normal())
            }
            Err(err) => Err(VfsError::from_io("weakly_canonical", err).with_path(path)),
        }
    }

    fn file_size(&self, path: &VfsPath) -> VfsResult<u64> {
        let md = fs::metadata(path.as_std_path())
            .map_err(|e| VfsError::from_io("file_size", e).with_path(path))?;
        if !md.is_file() {
            return Err(VfsError::new("file_size", ErrorKind::InvalidArgument).with_path(path));
        }
        Ok(md.len())
    }

    fn status(&self, path: &VfsPath) -> VfsResult<FileStatus> {
        match fs::metadata(path.as_std_path()) {
            Ok(md) => Ok(FileStatus::new(if md.is_file() {
                FileType::Regular
            } else if md.is_dir() {
                FileType::Directory
            } else {
                FileType::Other
            })),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Ok(FileStatus::new(FileType::NotFound))
            }
            Err(err) => Err(VfsError::from_io("status", err).with_path(path)),
        }
    }

    fn remove(&self, path: &VfsPath) -> VfsResult<bool> {
        let status = self.status(path)?;
        if !status.exists() {
            return Ok(false);
        }
        let result = if status.is_directory() {
            fs::remove_dir(path.as_std_path())
        } else {
            fs::remove_file(path.as_std_path())
        };
        match result {
            Ok(()) => Ok(true),
            Err(err) => Err(VfsError::from_io("remove", err).with_path(path)),
        }
    }

    fn remove_all(&self, path: &VfsPath) -> VfsResult<u64> {
        fn count_entries(path: &std::path::Path) -> std::io::Result<u64> {
            let md = fs::symlink_metadata(path)?;
            if !md.is_dir() {
                return Ok(1);
            }
            let mut n = 1;
            for entry in fs::read_dir(path)? {
                n += count_entries(&entry?.path())?;
            }
            Ok(n)
        }

        let status = self.status(path)?;
        if !status.exists() {
            return Ok(0);
        }
        let count = count_entries(path.as_std_path())
            .map_err(|e| VfsError::from_io("remove_all", e).with_path(path))?;
        let result = if status.is_directory() {
            fs::remove_dir_all(path.as_std_path())
        } else {
            fs::remove_file(path.as_std_path())
        };
        result.map_err(|e| VfsError::from_io("remove_all", e).with_path(path))?;
        Ok(count)
    }

    fn set_special_data(&self, path: &VfsPath, _data: SpecialData) -> VfsResult<()> {
        Err(VfsError::new("set_special_data", ErrorKind::NotSupported).with_path(path))
    }

    fn get_special_data(&self, path: &VfsPath) -> VfsResult<Option<SpecialData>> {
        Err(VfsError::new("get_special_data", ErrorKind::NotSupported).with_path(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vpath(path: &std::path::Path) -> VfsPath {
        VfsPath::from(path)
    }

    #[test]
    fn test_host_write_read_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let tree = HostTree::new();
        let file = vpath(&dir.path().join("data.bin"));

        let mut buf = tree.open(&file, OpenMode::writing()).unwrap();
        assert_eq!(buf.write(b"host bytes"), 10);
        buf.close().unwrap();

        let mut buf = tree.open(&file, OpenMode::reading()).unwrap();
        let mut out = [0u8; 32];
        let n = buf.read(&mut out);
        assert_eq!(&out[..n], b"host bytes");
    }

    #[test]
    fn test_host_open_missing_read_only() {
        let dir = tempfile::tempdir().unwrap();
        let tree = HostTree::new();
        assert!(tree
            .open(&vpath(&dir.path().join("ghost")), OpenMode::reading())
            .is_none());
    }

    #[test]
    fn test_host_sparse_write() {
        let dir = tempfile::tempdir().unwrap();
        let tree = HostTree::new();
        let file = vpath(&dir.path().join("sparse.bin"));

        let mut buf = tree.open(&file, OpenMode::writing()).unwrap();
        buf.write(b"ab");
        buf.seek(SeekFrom::Start(5), Cursors::WRITE).unwrap();
        buf.write(b"xy");
        buf.close().unwrap();

        assert_eq!(fs::read(file.as_std_path()).unwrap(), b"ab\0\0\0xy");
    }

    #[test]
    fn test_host_independent_cursors() {
        let dir = tempfile::tempdir().unwrap();
        let tree = HostTree::new();
        let file = vpath(&dir.path().join("cursors.bin"));
        fs::write(file.as_std_path(), b"0123").unwrap();

        let mut buf = tree
            .open(&file, OpenMode::new().read(true).write(true))
            .unwrap();
        assert_eq!(buf.read_byte(), Some(b'0'));
        buf.write(b"X");
        assert_eq!(buf.read_byte(), Some(b'1'));
        buf.close().unwrap();
        assert_eq!(fs::read(file.as_std_path()).unwrap(), b"X123");
    }

    #[test]
    fn test_host_create_directory() {
        let dir = tempfile::tempdir().unwrap();
        let tree = HostTree::new();
        let sub = vpath(&dir.path().join("sub"));

        assert!(tree.create_directory(&sub).unwrap());
        assert!(!tree.create_directory(&sub).unwrap());
        assert!(tree.status(&sub).unwrap().is_directory());
    }

    #[test]
    fn test_host_status_and_file_size() {
        let dir = tempfile::tempdir().unwrap();
        let tree = HostTree::new();
        let file = vpath(&dir.path().join("f"));
        fs::write(file.as_std_path(), b"12345").unwrap();

        assert!(tree.status(&file).unwrap().is_regular_file());
        assert_eq!(tree.file_size(&file).unwrap(), 5);
        assert_eq!(
            tree.status(&vpath(&dir.path().join("ghost")))
                .unwrap()
                .file_type(),
            FileType::NotFound
        );
    }

    #[test]
    fn test_host_remove_and_remove_all() {
        let dir = tempfile::tempdir().unwrap();
        let tree = HostTree::new();
        let sub = dir.path().join("sub");
        fs::create_dir(&sub).unwrap();
        fs::write(sub.join("a"), b"x").unwrap();
        fs::write(sub.join("b"), b"y").unwrap();

        let err = tree.remove(&vpath(&sub)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DirectoryNotEmpty);

        assert_eq!(tree.remove_all(&vpath(&sub)).unwrap(), 3);
        assert!(!tree.status(&vpath(&sub)).unwrap().exists());
        assert_eq!(tree.remove_all(&vpath(&sub)).unwrap(), 0);
    }

    #[test]
    fn test_host_directory_iteration() {
        let dir = tempfile::tempdir().unwrap();
        let tree = HostTree::new();
        fs::write(dir.path().join("one"), b"").unwrap();
        fs::write(dir.path().join("two"), b"").unwrap();

        let mut iter = tree.open_directory(&vpath(dir.path())).unwrap();
        let mut names = Vec::new();
        while !iter.is_end() {
            names.push(iter.dereference().file_name().unwrap());
            iter.increment().unwrap();
        }
        names.sort();
        assert_eq!(names, ["one", "two"]);
    }

    #[test]
    fn test_host_special_data_unsupported() {
        let tree = HostTree::new();
        let err = tree
            .get_special_data(&VfsPath::new("/tmp/x"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotSupported);
    }
}
