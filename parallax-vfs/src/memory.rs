//! In-memory tree backend.
//!
//! Files and directories live in a rooted node tree in process memory. Each
//! directory guards its child map with its own mutex and each file guards
//! its byte vector with its own mutex, so operations on disjoint paths run
//! fully concurrently. Traversal is hand-over-hand: a directory's lock is
//! held only long enough to clone the child handle, never across a descent.

use crate::buffer::{Cursors, FileBuffer, OpenMode, SeekFrom};
use crate::dir::{DirectoryEntry, DirectoryIterImpl};
use crate::error::{ErrorKind, VfsError, VfsResult};
use crate::path::VfsPath;
use crate::status::{FileStatus, FileType};
use crate::tree::{FilesystemTree, SpecialData};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Byte contents of one regular file, shared between the tree and any open
/// buffers so that unlinking the file does not invalidate open streams.
struct FileData {
    bytes: Mutex<Vec<u8>>,
}

impl FileData {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            bytes: Mutex::new(Vec::new()),
        })
    }
}

enum NodeKind {
    File(Arc<FileData>),
    Directory(Mutex<HashMap<String, Arc<Node>>>),
}

/// A single tree node. The kind is fixed at creation: file nodes never have
/// children and directory nodes never have bytes.
struct Node {
    kind: NodeKind,
    special: Mutex<Option<SpecialData>>,
}

impl Node {
    fn new_file() -> Arc<Self> {
        Arc::new(Self {
            kind: NodeKind::File(FileData::new()),
            special: Mutex::new(None),
        })
    }

    fn new_directory() -> Arc<Self> {
        Arc::new(Self {
            kind: NodeKind::Directory(Mutex::new(HashMap::new())),
            special: Mutex::new(None),
        })
    }

    fn is_directory(&self) -> bool {
        matches!(self.kind, NodeKind::Directory(_))
    }

    fn entries(&self) -> Option<&Mutex<HashMap<String, Arc<Node>>>> {
        match &self.kind {
            NodeKind::Directory(entries) => Some(entries),
            NodeKind::File(_) => None,
        }
    }
}

/// Stream buffer over an in-memory file.
///
/// Holds a shared reference to the file's byte vector; every access takes
/// the file's mutex. Writing past the current end zero-fills the gap. In
/// append mode every write re-positions to the current end under the file
/// lock, so concurrent appenders never clobber each other.
struct MemoryFileBuf {
    file: Option<Arc<FileData>>,
    append: bool,
    read_pos: usize,
    write_pos: usize,
}

impl MemoryFileBuf {
    fn new(file: Arc<FileData>, mode: OpenMode) -> Self {
        if mode.is_truncate() {
            file.bytes.lock().unwrap().clear();
        }
        let write_pos = if mode.is_append() {
            file.bytes.lock().unwrap().len()
        } else {
            0
        };
        Self {
            file: Some(file),
            append: mode.is_append(),
            read_pos: 0,
            write_pos,
        }
    }

    fn bytes(&self) -> Option<MutexGuard<'_, Vec<u8>>> {
        self.file.as_ref().map(|f| f.bytes.lock().unwrap())
    }
}

impl FileBuffer for MemoryFileBuf {
    fn is_open(&self) -> bool {
        self.file.is_some()
    }

    fn close(&mut self) -> VfsResult<()> {
        self.file = None;
        Ok(())
    }

    fn peek_byte(&mut self) -> Option<u8> {
        let bytes = self.bytes()?;
        bytes.get(self.read_pos).copied()
    }

    fn read_byte(&mut self) -> Option<u8> {
        let byte = {
            let bytes = self.bytes()?;
            bytes.get(self.read_pos).copied()?
        };
        self.read_pos += 1;
        Some(byte)
    }

    fn read(&mut self, out: &mut [u8]) -> usize {
        let Some(bytes) = self.bytes() else { return 0 };
        if self.read_pos >= bytes.len() {
            return 0;
        }
        let n = out.len().min(bytes.len() - self.read_pos);
        out[..n].copy_from_slice(&bytes[self.read_pos..self.read_pos + n]);
        drop(bytes);
        self.read_pos += n;
        n
    }

    fn put_byte(&mut self, byte: u8) -> bool {
        self.write(&[byte]) == 1
    }

    fn write(&mut self, data: &[u8]) -> usize {
        let end_pos = {
            let Some(mut bytes) = self.bytes() else { return 0 };
            let pos = if self.append {
                bytes.len()
            } else {
                self.write_pos
            };
            if pos > bytes.len() {
                // sparse write: zero-fill the gap up to the write cursor
                bytes.resize(pos, 0);
            }
            let overlap = data.len().min(bytes.len() - pos);
            bytes[pos..pos + overlap].copy_from_slice(&data[..overlap]);
            bytes.extend_from_slice(&data[overlap..]);
            pos + data.len()
        };
        self.write_pos = end_pos;
        data.len()
    }

    fn seek(&mut self, from: SeekFrom, cursors: Cursors) -> VfsResult<u64> {
        let invalid = || VfsError::new("seek", ErrorKind::InvalidArgument);
        if self.file.is_none() || (!cursors.read && !cursors.write) {
            return Err(invalid());
        }
        match from {
            SeekFrom::Start(pos) => {
                if cursors.read {
                    self.read_pos = pos as usize;
                }
                if cursors.write {
                    self.write_pos = pos as usize;
                }
                Ok(pos)
            }
            SeekFrom::Current(off) => {
                if cursors.read && cursors.write {
                    return Err(invalid());
                }
                let base = if cursors.read {
                    self.read_pos
                } else {
                    self.write_pos
                };
                let target = base as i64 + off;
                if target < 0 {
                    return Err(invalid());
                }
                if cursors.read {
                    self.read_pos = target as usize;
                } else {
                    self.write_pos = target as usize;
                }
                Ok(target as u64)
            }
            SeekFrom::End(off) => {
                let len = self.bytes().map(|b| b.len()).unwrap_or(0);
                let target = len as i64 + off;
                if target < 0 {
                    return Err(invalid());
                }
                if cursors.read {
                    self.read_pos = target as usize;
                }
                if cursors.write {
                    self.write_pos = target as usize;
                }
                Ok(target as u64)
            }
        }
    }
}

struct MemoryDirIter {
    entries: Vec<DirectoryEntry>,
    index: usize,
}

impl DirectoryIterImpl for MemoryDirIter {
    fn increment(&mut self) -> VfsResult<()> {
        debug_assert!(self.index < self.entries.len());
        self.index += 1;
        Ok(())
    }

    fn dereference(&self) -> DirectoryEntry {
        self.entries[self.index].clone()
    }

    fn is_end(&self) -> bool {
        self.index >= self.entries.len()
    }
}

/// Tree backend storing all files and directories in process memory.
///
/// ```
/// use parallax_vfs::{FilesystemTree, MemoryTree, OpenMode, VfsPath};
///
/// let tree = MemoryTree::new();
/// let mut buf = tree
///     .open(&VfsPath::new("//scene/notes.txt"), OpenMode::writing())
///     .unwrap();
/// buf.write(b"hello");
/// ```
pub struct MemoryTree {
    root: Arc<Node>,
}

impl Default for MemoryTree {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTree {
    pub fn new() -> Self {
        Self {
            root: Node::new_directory(),
        }
    }

    /// Normalized relative components of `p`; empty for the tree root.
    fn split_path(p: &VfsPath) -> Vec<String> {
        p.lexically_normal()
            .components()
            .filter(|c| *c != ".")
            .map(str::to_string)
            .collect()
    }

    /// Walks components from the root, taking each directory lock only long
    /// enough to clone the child handle.
    fn find_node(&self, parts: &[String]) -> Option<Arc<Node>> {
        let mut node = Arc::clone(&self.root);
        for part in parts {
            let next = {
                let entries = node.entries()?.lock().unwrap();
                Arc::clone(entries.get(part)?)
            };
            node = next;
        }
        Some(node)
    }

    /// Resolves the parent directory of the path given by `parts`.
    fn find_parent(&self, parts: &[String]) -> Option<(Arc<Node>, String)> {
        let (leaf, dir_parts) = parts.split_last()?;
        let parent = self.find_node(dir_parts)?;
        parent.is_directory().then(|| (parent, leaf.clone()))
    }

    /// Overwrite rules for a rename destination that already exists.
    fn check_overwrite(
        op: &'static str,
        source: &Node,
        existing: &Node,
        from: &VfsPath,
        to: &VfsPath,
    ) -> VfsResult<()> {
        if let Some(entries) = existing.entries() {
            if !entries.lock().unwrap().is_empty() {
                return Err(
                    VfsError::new(op, ErrorKind::DirectoryNotEmpty).with_paths(from, to)
                );
            }
            if !source.is_directory() {
                return Err(VfsError::new(op, ErrorKind::InvalidArgument).with_paths(from, to));
            }
        }
        Ok(())
    }

    fn subtree_len(node: &Arc<Node>) -> u64 {
        match &node.kind {
            NodeKind::File(_) => 1,
            NodeKind::Directory(entries) => {
                let children: Vec<Arc<Node>> =
                    entries.lock().unwrap().values().cloned().collect();
                1 + children.iter().map(Self::subtree_len).sum::<u64>()
            }
        }
    }
}

impl FilesystemTree for MemoryTree {
    fn open(&self, path: &VfsPath, mode: OpenMode) -> Option<Box<dyn FileBuffer>> {
        if !path.is_absolute() {
            return None;
        }
        let parts = Self::split_path(path);
        let (parent, name) = self.find_parent(&parts)?;
        let entries = parent.entries()?;
        let mut entries = entries.lock().unwrap();
        match entries.get(&name) {
            Some(node) => match &node.kind {
                NodeKind::File(file) => {
                    Some(Box::new(MemoryFileBuf::new(Arc::clone(file), mode)))
                }
                NodeKind::Directory(_) => None,
            },
            None => {
                if !mode.is_out() {
                    return None;
                }
                let file = FileData::new();
                entries.insert(
                    name,
                    Arc::new(Node {
                        kind: NodeKind::File(Arc::clone(&file)),
                        special: Mutex::new(None),
                    }),
                );
                Some(Box::new(MemoryFileBuf::new(file, mode)))
            }
        }
    }

    fn open_directory(&self, path: &VfsPath) -> VfsResult<Box<dyn DirectoryIterImpl>> {
        let op = "open_directory";
        let parts = Self::split_path(path);
        let node = self
            .find_node(&parts)
            .ok_or_else(|| VfsError::new(op, ErrorKind::NotFound).with_path(path))?;
        let entries = node
            .entries()
            .ok_or_else(|| VfsError::new(op, ErrorKind::InvalidArgument).with_path(path))?;
        // snapshot the names; entries added or removed after this point are
        // not observed by the iterator
        let base = path.lexically_normal();
        let names: Vec<String> = entries.lock().unwrap().keys().cloned().collect();
        let entries = names
            .into_iter()
            .map(|name| DirectoryEntry::new(base.join(name.as_str())))
            .collect();
        Ok(Box::new(MemoryDirIter { entries, index: 0 }))
    }

    fn create_directory(&self, path: &VfsPath) -> VfsResult<bool> {
        let op = "create_directory";
        let parts = Self::split_path(path);
        if parts.is_empty() {
            // the tree root always exists
            return Ok(false);
        }
        let (parent, name) = self
            .find_parent(&parts)
            .ok_or_else(|| VfsError::new(op, ErrorKind::NotFound).with_path(path))?;
        let mut entries = parent.entries().unwrap().lock().unwrap();
        match entries.get(&name) {
            Some(node) if node.is_directory() => Ok(false),
            Some(_) => Err(VfsError::new(op, ErrorKind::AlreadyExists).with_path(path)),
            None => {
                entries.insert(name, Node::new_directory());
                Ok(true)
            }
        }
    }

    fn rename(&self, from: &VfsPath, to: &VfsPath) -> VfsResult<()> {
        let op = "rename";
        let not_found = || VfsError::new(op, ErrorKind::NotFound).with_paths(from, to);

        let from_parts = Self::split_path(from);
        let to_parts = Self::split_path(to);
        if from_parts == to_parts {
            return Ok(());
        }
        let prefix_len = from_parts.len().min(to_parts.len());
        if from_parts[..prefix_len] == to_parts[..prefix_len] {
            // one path is an ancestor of the other
            return Err(VfsError::new(op, ErrorKind::InvalidArgument).with_paths(from, to));
        }

        let (from_dir, from_name) = self.find_parent(&from_parts).ok_or_else(not_found)?;
        let (to_dir, to_name) = self.find_parent(&to_parts).ok_or_else(not_found)?;
        let from_map = from_dir.entries().unwrap();
        let to_map = to_dir.entries().unwrap();

        if Arc::ptr_eq(&from_dir, &to_dir) {
            let mut entries = from_map.lock().unwrap();
            let node = entries.get(&from_name).cloned().ok_or_else(not_found)?;
            if let Some(existing) = entries.get(&to_name) {
                Self::check_overwrite(op, &node, existing, from, to)?;
            }
            entries.remove(&from_name);
            entries.insert(to_name, node);
            return Ok(());
        }

        // different parents: take both locks in address order to rule out
        // deadlock against a concurrent rename in the opposite direction
        let from_first = Arc::as_ptr(&from_dir).cast::<u8>() < Arc::as_ptr(&to_dir).cast::<u8>();
        let (mut from_entries, mut to_entries);
        if from_first {
            from_entries = from_map.lock().unwrap();
            to_entries = to_map.lock().unwrap();
        } else {
            to_entries = to_map.lock().unwrap();
            from_entries = from_map.lock().unwrap();
        }

        let node = from_entries.get(&from_name).cloned().ok_or_else(not_found)?;
        if let Some(existing) = to_entries.get(&to_name) {
            Self::check_overwrite(op, &node, existing, from, to)?;
        }
        from_entries.remove(&from_name);
        to_entries.insert(to_name, node);
        Ok(())
    }

    fn canonical(&self, path: &VfsPath, base: &VfsPath) -> VfsResult<VfsPath> {
        let abs = if path.is_absolute() {
            path.clone()
        } else {
            base.join(path)
        }
        .lexically_normal();
        if !self.status(&abs)?.exists() {
            return Err(VfsError::new("canonical", ErrorKind::NotFound).with_path(path));
        }
        Ok(abs)
    }

    fn weakly_canonical(&self, path: &VfsPath) -> VfsResult<VfsPath> {
        // no symlinks in this tree, so lexical normalization is enough
        Ok(path.lexically_normal())
    }

    fn file_size(&self, path: &VfsPath) -> VfsResult<u64> {
        let op = "file_size";
        let parts = Self::split_path(path);
        let node = self
            .find_node(&parts)
            .ok_or_else(|| VfsError::new(op, ErrorKind::NotFound).with_path(path))?;
        match &node.kind {
            NodeKind::File(file) => Ok(file.bytes.lock().unwrap().len() as u64),
            NodeKind::Directory(_) => {
                Err(VfsError::new(op, ErrorKind::InvalidArgument).with_path(path))
            }
        }
    }

    fn status(&self, path: &VfsPath) -> VfsResult<FileStatus> {
        let parts = Self::split_path(path);
        Ok(match self.find_node(&parts) {
            Some(node) if node.is_directory() => FileStatus::new(FileType::Directory),
            Some(_) => FileStatus::new(FileType::Regular),
            None => FileStatus::new(FileType::NotFound),
        })
    }

    fn remove(&self, path: &VfsPath) -> VfsResult<bool> {
        let op = "remove";
        let parts = Self::split_path(path);
        if parts.is_empty() {
            // the tree root cannot be removed
            return Ok(false);
        }
        let Some((parent, name)) = self.find_parent(&parts) else {
            return Ok(false);
        };
        let mut entries = parent.entries().unwrap().lock().unwrap();
        let Some(node) = entries.get(&name) else {
            return Ok(false);
        };
        if let Some(children) = node.entries() {
            if !children.lock().unwrap().is_empty() {
                return Err(VfsError::new(op, ErrorKind::DirectoryNotEmpty).with_path(path));
            }
        }
        entries.remove(&name);
        Ok(true)
    }

    fn remove_all(&self, path: &VfsPath) -> VfsResult<u64> {
        let parts = Self::split_path(path);
        if parts.is_empty() {
            // clear the root's children; the root itself stays
            let children: Vec<Arc<Node>> = {
                let mut entries = self.root.entries().unwrap().lock().unwrap();
                let children = entries.values().cloned().collect();
                entries.clear();
                children
            };
            return Ok(children.iter().map(Self::subtree_len).sum());
        }
        let Some((parent, name)) = self.find_parent(&parts) else {
            return Ok(0);
        };
        let mut entries = parent.entries().unwrap().lock().unwrap();
        let Some(node) = entries.remove(&name) else {
            return Ok(0);
        };
        drop(entries);
        Ok(Self::subtree_len(&node))
    }

    fn set_special_data(&self, path: &VfsPath, data: SpecialData) -> VfsResult<()> {
        let op = "set_special_data";
        let parts = Self::split_path(path);
        let (parent, name) = self
            .find_parent(&parts)
            .ok_or_else(|| VfsError::new(op, ErrorKind::NotFound).with_path(path))?;
        let mut entries = parent.entries().unwrap().lock().unwrap();
        let node = entries.entry(name).or_insert_with(Node::new_file);
        *node.special.lock().unwrap() = Some(data);
        Ok(())
    }

    fn get_special_data(&self, path: &VfsPath) -> VfsResult<Option<SpecialData>> {
        let parts = Self::split_path(path);
        let node = self.find_node(&parts).ok_or_else(|| {
            VfsError::new("get_special_data", ErrorKind::NotFound).with_path(path)
        })?;
        let special = node.special.lock().unwrap();
        Ok(special.clone())
    }
}
