//! Byte-stream buffer contract.
//!
//! Every tree backend hands out [`FileBuffer`] implementations from its
//! `open`. A buffer keeps two independent positions, one for reads and one
//! for writes; seeks address either or both through [`Cursors`].

use crate::error::VfsResult;
pub use std::io::SeekFrom;

/// Flags controlling how a file is opened.
///
/// Follows the `std::fs::OpenOptions` builder idiom. `write`, `append` and
/// `truncate` all imply that the file is created when missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OpenMode {
    read: bool,
    write: bool,
    append: bool,
    truncate: bool,
}

impl OpenMode {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read-only access.
    pub fn reading() -> Self {
        Self::new().read(true)
    }

    /// Create-or-truncate write access, the common output mode.
    pub fn writing() -> Self {
        Self::new().write(true).truncate(true)
    }

    /// Write access with the write cursor starting at end of file.
    pub fn appending() -> Self {
        Self::new().write(true).append(true)
    }

    pub fn read(mut self, read: bool) -> Self {
        self.read = read;
        self
    }

    pub fn write(mut self, write: bool) -> Self {
        self.write = write;
        self
    }

    pub fn append(mut self, append: bool) -> Self {
        self.append = append;
        self
    }

    pub fn truncate(mut self, truncate: bool) -> Self {
        self.truncate = truncate;
        self
    }

    pub fn is_read(&self) -> bool {
        self.read
    }

    pub fn is_append(&self) -> bool {
        self.append
    }

    pub fn is_truncate(&self) -> bool {
        self.truncate
    }

    /// True when the mode asks for write access in any form, which also
    /// means a missing file is created on open.
    pub fn is_out(&self) -> bool {
        self.write || self.append || self.truncate
    }
}

/// Which of the two stream positions a seek addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursors {
    pub read: bool,
    pub write: bool,
}

impl Cursors {
    pub const READ: Cursors = Cursors {
        read: true,
        write: false,
    };
    pub const WRITE: Cursors = Cursors {
        read: false,
        write: true,
    };
    pub const BOTH: Cursors = Cursors {
        read: true,
        write: true,
    };
}

/// Abstract byte-stream buffer over some backing storage.
///
/// Reads and writes move their own cursor only. Relative seeks
/// (`SeekFrom::Current`) must address exactly one cursor; absolute and
/// end-relative seeks may address both at once. Reading at or past end of
/// data yields end-of-stream, not an error.
pub trait FileBuffer: Send {
    fn is_open(&self) -> bool;

    /// Releases the buffer's hold on the backing storage.
    fn close(&mut self) -> VfsResult<()>;

    /// Returns the byte at the read cursor without consuming it.
    fn peek_byte(&mut self) -> Option<u8>;

    /// Consumes and returns the byte at the read cursor.
    fn read_byte(&mut self) -> Option<u8>;

    /// Reads up to `out.len()` bytes at the read cursor; returns the number
    /// of bytes read, 0 at end of stream.
    fn read(&mut self, out: &mut [u8]) -> usize;

    /// Writes one byte at the write cursor. Returns false when the buffer
    /// cannot accept the byte.
    fn put_byte(&mut self, byte: u8) -> bool;

    /// Writes `data` at the write cursor; returns the number of bytes
    /// accepted.
    fn write(&mut self, data: &[u8]) -> usize;

    /// Repositions the selected cursor(s); returns the resulting position.
    fn seek(&mut self, from: SeekFrom, cursors: Cursors) -> VfsResult<u64>;
}
