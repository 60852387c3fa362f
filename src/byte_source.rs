//! Seekable, read-only views over a file's bytes.
//!
//! Every element reads from exactly one [`ByteSource`]. Two implementations are provided:
//! - [`MemoryByteSource`] over anything that derefs to a byte slice, and
//! - [`FileByteSource`] over a buffered file handle.
//!
//! Both share the same bounds rules: the cursor always stays in `[0, len]`, a read that would
//! cross `len` fails with [`ParseError::Truncated`] without moving the cursor, and a seek past
//! `len` fails with [`ParseError::InvalidOffset`].

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use crate::err::{ParseError, Result};

pub trait ByteSource {
    /// Total number of addressable bytes.
    fn len(&self) -> u64;

    fn position(&self) -> u64;

    /// Absolute seek. `offset == len()` is allowed (EOF).
    fn set_position(&mut self, offset: u64) -> Result<()>;

    /// Fill `buf` completely from the current position and advance past it.
    fn read_into(&mut self, buf: &mut [u8], what: &'static str) -> Result<()>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn remaining(&self) -> u64 {
        self.len().saturating_sub(self.position())
    }

    fn read_bytes(&mut self, n: usize, what: &'static str) -> Result<Vec<u8>> {
        self.ensure_available(n as u64, what)?;
        let mut buf = vec![0_u8; n];
        self.read_into(&mut buf, what)?;
        Ok(buf)
    }

    fn read_array<const N: usize>(&mut self, what: &'static str) -> Result<[u8; N]>
    where
        Self: Sized,
    {
        let mut buf = [0_u8; N];
        self.read_into(&mut buf, what)?;
        Ok(buf)
    }

    /// Consume `n` bytes without looking at them.
    fn skip(&mut self, n: u64, what: &'static str) -> Result<()> {
        self.ensure_available(n, what)?;
        self.set_position(self.position() + n)
    }

    fn ensure_available(&self, need: u64, what: &'static str) -> Result<()> {
        let have = self.remaining();
        if need > have {
            return Err(ParseError::Truncated {
                what,
                offset: self.position(),
                need,
                have,
            });
        }
        Ok(())
    }
}

/// A byte source over an in-memory buffer.
#[derive(Debug, Clone)]
pub struct MemoryByteSource<T: AsRef<[u8]>> {
    data: T,
    pos: usize,
}

impl<T: AsRef<[u8]>> MemoryByteSource<T> {
    pub fn new(data: T) -> Self {
        MemoryByteSource { data, pos: 0 }
    }

    pub fn into_inner(self) -> T {
        self.data
    }
}

impl MemoryByteSource<Vec<u8>> {
    pub fn from_path(path: impl AsRef<Path>) -> io::Result<Self> {
        Ok(MemoryByteSource::new(std::fs::read(path)?))
    }
}

impl<T: AsRef<[u8]>> ByteSource for MemoryByteSource<T> {
    #[inline]
    fn len(&self) -> u64 {
        self.data.as_ref().len() as u64
    }

    #[inline]
    fn position(&self) -> u64 {
        self.pos as u64
    }

    fn set_position(&mut self, offset: u64) -> Result<()> {
        let len = self.len();
        if offset > len {
            return Err(ParseError::InvalidOffset { offset, len });
        }
        self.pos = offset as usize;
        Ok(())
    }

    fn read_into(&mut self, buf: &mut [u8], what: &'static str) -> Result<()> {
        self.ensure_available(buf.len() as u64, what)?;
        let end = self.pos + buf.len();
        buf.copy_from_slice(&self.data.as_ref()[self.pos..end]);
        self.pos = end;
        Ok(())
    }
}

/// A byte source over a buffered file handle.
///
/// The length is captured when the file is opened; the handle is closed when the source is dropped.
#[derive(Debug)]
pub struct FileByteSource {
    reader: BufReader<File>,
    len: u64,
    pos: u64,
}

impl FileByteSource {
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::open(path)?;
        let len = file.metadata()?.len();
        Ok(FileByteSource {
            reader: BufReader::new(file),
            len,
            pos: 0,
        })
    }
}

impl ByteSource for FileByteSource {
    #[inline]
    fn len(&self) -> u64 {
        self.len
    }

    #[inline]
    fn position(&self) -> u64 {
        self.pos
    }

    fn set_position(&mut self, offset: u64) -> Result<()> {
        if offset > self.len {
            return Err(ParseError::InvalidOffset {
                offset,
                len: self.len,
            });
        }
        if offset != self.pos {
            // Short forward/backward hops stay inside the buffer.
            let delta = offset as i64 - self.pos as i64;
            self.reader.seek_relative(delta)?;
            self.pos = offset;
        }
        Ok(())
    }

    fn read_into(&mut self, buf: &mut [u8], what: &'static str) -> Result<()> {
        self.ensure_available(buf.len() as u64, what)?;
        self.reader.read_exact(buf)?;
        self.pos += buf.len() as u64;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const DATA: &[u8] = b"0123456789abcdef";

    fn exercise(source: &mut dyn ByteSource) {
        assert_eq!(source.len(), 16);
        source.set_position(10).unwrap();
        assert_eq!(source.read_bytes(3, "test").unwrap(), b"abc");
        assert_eq!(source.position(), 13);

        source.set_position(2).unwrap();
        assert_eq!(source.read_bytes(2, "test").unwrap(), b"23");

        source.set_position(16).unwrap();
        assert_eq!(source.remaining(), 0);
        assert!(matches!(
            source.read_bytes(1, "test"),
            Err(ParseError::Truncated { need: 1, have: 0, .. })
        ));
        assert!(matches!(
            source.set_position(17),
            Err(ParseError::InvalidOffset { offset: 17, len: 16 })
        ));
        // Failed operations leave the cursor where it was.
        assert_eq!(source.position(), 16);
    }

    #[test]
    fn test_memory_source_bounds() {
        let mut source = MemoryByteSource::new(DATA);
        exercise(&mut source);
    }

    #[test]
    fn test_file_source_matches_memory_source() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(DATA).unwrap();
        tmp.flush().unwrap();

        let mut source = FileByteSource::open(tmp.path()).unwrap();
        exercise(&mut source);
    }

    #[test]
    fn test_truncated_read_does_not_advance() {
        let mut source = MemoryByteSource::new(DATA);
        source.set_position(14).unwrap();
        assert!(source.read_bytes(4, "tail").is_err());
        assert_eq!(source.position(), 14);
        assert_eq!(source.read_array::<2>("tail").unwrap(), *b"ef");
    }
}
