//! File status and filesystem space reporting.

/// The type of a filesystem entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileType {
    /// The path does not refer to anything.
    NotFound,
    /// A regular file.
    Regular,
    /// A directory.
    Directory,
    /// Something else the VFS does not model (device, socket, ...).
    Other,
    /// The type could not be determined.
    #[default]
    Unknown,
}

/// Result of a status query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FileStatus {
    file_type: FileType,
}

impl FileStatus {
    pub fn new(file_type: FileType) -> Self {
        Self { file_type }
    }

    pub fn file_type(&self) -> FileType {
        self.file_type
    }

    /// True when the path refers to an existing entry of known type.
    pub fn exists(&self) -> bool {
        !matches!(self.file_type, FileType::NotFound | FileType::Unknown)
    }

    pub fn is_regular_file(&self) -> bool {
        self.file_type == FileType::Regular
    }

    pub fn is_directory(&self) -> bool {
        self.file_type == FileType::Directory
    }

    /// True for entries that exist but are neither files nor directories.
    pub fn is_other(&self) -> bool {
        self.file_type == FileType::Other
    }
}

/// Capacity information for a filesystem, in bytes.
///
/// Virtual trees report all-zero values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SpaceInfo {
    pub capacity: u64,
    pub free: u64,
    pub available: u64,
}

impl SpaceInfo {
    pub const ZERO: SpaceInfo = SpaceInfo {
        capacity: 0,
        free: 0,
        available: 0,
    };
}
