//! Extensions for IO operations, and an in-memory `Read + Seek + Write` buffer.
use anyhow::Result;
use std::io::{Read, Seek, SeekFrom, Write};

/// Little-endian integer reads, implemented for anything [`Read`].
pub trait ReadExt {
    /// Reads a [u8] from the reader.
    fn read_u8(&mut self) -> Result<u8>;
    /// Reads a [u32] from the reader in little-endian order.
    fn read_u32(&mut self) -> Result<u32>;
    /// Reads a [u64] from the reader in little-endian order.
    fn read_u64(&mut self) -> Result<u64>;
    /// Reads a fixed-size, NUL-terminated ASCII name field, trimming the
    /// trailing NUL padding.
    fn read_fixed_name(&mut self, len: usize) -> Result<Vec<u8>>;
}

impl<T: Read> ReadExt for T {
    fn read_u8(&mut self) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    fn read_u32(&mut self) -> Result<u32> {
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    fn read_u64(&mut self) -> Result<u64> {
        let mut buf = [0u8; 8];
        self.read_exact(&mut buf)?;
        Ok(u64::from_le_bytes(buf))
    }

    fn read_fixed_name(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.read_exact(&mut buf)?;
        if let Some(nul) = buf.iter().position(|&b| b == 0) {
            buf.truncate(nul);
        }
        Ok(buf)
    }
}

/// Little-endian integer writes, implemented for anything [`Write`].
pub trait WriteExt {
    /// Writes a [u8] to the writer.
    fn write_u8(&mut self, value: u8) -> Result<()>;
    /// Writes a [u32] to the writer in little-endian order.
    fn write_u32(&mut self, value: u32) -> Result<()>;
    /// Writes a [u64] to the writer in little-endian order.
    fn write_u64(&mut self, value: u64) -> Result<()>;
}

impl<T: Write> WriteExt for T {
    fn write_u8(&mut self, value: u8) -> Result<()> {
        self.write_all(&[value])?;
        Ok(())
    }

    fn write_u32(&mut self, value: u32) -> Result<()> {
        self.write_all(&value.to_le_bytes())?;
        Ok(())
    }

    fn write_u64(&mut self, value: u64) -> Result<()> {
        self.write_all(&value.to_le_bytes())?;
        Ok(())
    }
}

/// An in-memory reader over an owned byte buffer.
#[derive(Debug)]
pub struct MemReader {
    /// The data to read from.
    pub data: Vec<u8>,
    /// The current position in the data.
    pub pos: usize,
}

impl MemReader {
    /// Creates a new `MemReader` with the given data.
    pub fn new(data: Vec<u8>) -> Self {
        MemReader { data, pos: 0 }
    }
}

impl Read for MemReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let remaining = self.data.len().saturating_sub(self.pos);
        let n = buf.len().min(remaining);
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

impl Seek for MemReader {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        let new_pos = match pos {
            SeekFrom::Start(offset) => offset as i64,
            SeekFrom::End(offset) => self.data.len() as i64 + offset,
            SeekFrom::Current(offset) => self.pos as i64 + offset,
        };
        if new_pos < 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "seek to a negative position",
            ));
        }
        self.pos = new_pos as usize;
        Ok(self.pos as u64)
    }
}

/// An in-memory writer growing an owned byte buffer, with independent seek
/// position (so a trailer can be patched in after the body is written).
#[derive(Debug)]
pub struct MemWriter {
    /// The data written so far.
    pub data: Vec<u8>,
    pos: usize,
}

impl MemWriter {
    /// Creates a new, empty `MemWriter`.
    pub fn new() -> Self {
        MemWriter {
            data: Vec::new(),
            pos: 0,
        }
    }

    /// Creates a new `MemWriter` pre-sized to `len` zero bytes.
    pub fn zeroed(len: usize) -> Self {
        MemWriter {
            data: vec![0u8; len],
            pos: 0,
        }
    }
}

impl Write for MemWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let end = self.pos + buf.len();
        if end > self.data.len() {
            self.data.resize(end, 0);
        }
        self.data[self.pos..end].copy_from_slice(buf);
        self.pos = end;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl Seek for MemWriter {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        let new_pos = match pos {
            SeekFrom::Start(offset) => offset as i64,
            SeekFrom::End(offset) => self.data.len() as i64 + offset,
            SeekFrom::Current(offset) => self.pos as i64 + offset,
        };
        if new_pos < 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "seek to a negative position",
            ));
        }
        self.pos = new_pos as usize;
        Ok(self.pos as u64)
    }
}
