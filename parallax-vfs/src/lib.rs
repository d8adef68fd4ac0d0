//! Parallax Virtual File System
//!
//! A process-wide facade that routes filesystem operations to either the
//! host OS or to in-process virtual "trees" mounted under reserved
//! `//name` roots. The rest of the toolkit reads and writes images,
//! features and intermediate reconstructions through this crate without
//! knowing whether the bytes live on disk or in memory.
//!
//! # Usage
//! ```
//! use parallax_vfs as vfs;
//! use std::sync::Arc;
//!
//! vfs::manager().install_tree("//scratch", Arc::new(vfs::MemoryTree::new()));
//! vfs::create_directory("//scratch/depth").unwrap();
//!
//! use std::io::Write;
//! let mut out = vfs::open_writer("//scratch/depth/cam0.bin").unwrap();
//! out.write_all(b"...").unwrap();
//! ```
//!
//! Paths without a `//name` root go straight to the host filesystem; a
//! `//name` root that matches no mounted tree is an error, never a silent
//! fallthrough to the OS.

mod buffer;
mod dir;
mod error;
mod host;
mod manager;
mod memory;
mod ops;
mod path;
mod status;
mod stream;
mod tree;

pub use buffer::{Cursors, FileBuffer, OpenMode, SeekFrom};
pub use dir::{DirectoryEntry, DirectoryIterImpl, ReadDir};
pub use error::{ErrorKind, VfsError, VfsResult};
pub use host::HostTree;
pub use manager::{manager, FilesystemManager};
pub use memory::MemoryTree;
pub use path::VfsPath;
pub use status::{FileStatus, FileType, SpaceInfo};
pub use stream::{Reader, Writer};
pub use tree::{FilesystemTree, SpecialData};

pub use ops::{
    absolute, canonical, copy, copy_directory, copy_file, copy_symlink, create_directories,
    create_directory, create_directory_symlink, create_hard_link, create_symlink, current_path,
    equivalent, exists, file_size, get_special_data, get_special_data_if_exists,
    hard_link_count, is_directory, is_empty, is_other, is_regular_file, is_symlink,
    last_write_time, open_file, open_reader, open_writer, read_dir, read_symlink, relative,
    relative_to, remove, remove_all, rename, resize_file, set_current_path, set_last_write_time,
    set_special_data, space, status, symlink_status, system_complete, temp_directory_path,
    unique_path, unique_path_from, weakly_canonical,
};
