//! Standard I/O wrappers over stream buffers.
//!
//! [`Reader`] and [`Writer`] adapt a [`FileBuffer`] to `std::io::Read`,
//! `std::io::Write` and `std::io::Seek`, so VFS-backed files plug into
//! anything that consumes the standard traits (`BufReader`, serializers,
//! image decoders, ...). Each wrapper drives only its own cursor.

use crate::buffer::{Cursors, FileBuffer};
use std::io;

/// Read-side stream over an open file buffer.
pub struct Reader {
    buf: Box<dyn FileBuffer>,
}

impl Reader {
    /// Wraps an open buffer, driving its read cursor.
    pub fn new(buf: Box<dyn FileBuffer>) -> Self {
        Self { buf }
    }

    pub fn is_open(&self) -> bool {
        self.buf.is_open()
    }

    pub fn close(&mut self) -> io::Result<()> {
        self.buf.close().map_err(Into::into)
    }
}

impl io::Read for Reader {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        Ok(self.buf.read(out))
    }
}

impl io::Seek for Reader {
    fn seek(&mut self, pos: io::SeekFrom) -> io::Result<u64> {
        self.buf.seek(pos, Cursors::READ).map_err(Into::into)
    }
}

/// Write-side stream over an open file buffer.
pub struct Writer {
    buf: Box<dyn FileBuffer>,
}

impl Writer {
    /// Wraps an open buffer, driving its write cursor.
    pub fn new(buf: Box<dyn FileBuffer>) -> Self {
        Self { buf }
    }

    pub fn is_open(&self) -> bool {
        self.buf.is_open()
    }

    pub fn close(&mut self) -> io::Result<()> {
        self.buf.close().map_err(Into::into)
    }
}

impl io::Write for Writer {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        Ok(self.buf.write(data))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl io::Seek for Writer {
    fn seek(&mut self, pos: io::SeekFrom) -> io::Result<u64> {
        self.buf.seek(pos, Cursors::WRITE).map_err(Into::into)
    }
}
