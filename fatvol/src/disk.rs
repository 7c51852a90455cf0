//! Byte-addressed backing store for a volume image.
//!
//! All image I/O goes through `Disk`, so the engine runs the same against a
//! real image file and against the in-memory `MemDisk` used in tests.

use std::fs::OpenOptions;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

pub trait Disk {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<()>;
    fn write_at(&mut self, offset: u64, buf: &[u8]) -> io::Result<()>;
    /// Truncate or create the store so that it is exactly `len` zero bytes.
    fn reset(&mut self, len: u64) -> io::Result<()>;
    fn len(&mut self) -> io::Result<u64>;
}

// ─── Image file ────────────────────────────────────────────────────────────────

/// The on-disk image. The file is reopened for every access, so a missing or
/// locked image fails only the operation that touched it.
#[derive(Debug, Clone)]
pub struct ImageFile {
    path: PathBuf,
}

impl ImageFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path { &self.path }
}

impl Disk for ImageFile {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        let mut file = OpenOptions::new().read(true).open(&self.path)?;
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(buf)
    }

    fn write_at(&mut self, offset: u64, buf: &[u8]) -> io::Result<()> {
        let mut file = OpenOptions::new().read(true).write(true).open(&self.path)?;
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(buf)?;
        file.flush()
    }

    fn reset(&mut self, len: u64) -> io::Result<()> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.path)?;
        file.set_len(len)
    }

    fn len(&mut self) -> io::Result<u64> {
        Ok(std::fs::metadata(&self.path)?.len())
    }
}

// ─── In-memory image ───────────────────────────────────────────────────────────

#[derive(Debug, Default, Clone)]
pub struct MemDisk(pub Vec<u8>);

impl MemDisk {
    pub fn new() -> Self { Self(Vec::new()) }

    fn range(&self, offset: u64, len: usize) -> io::Result<core::ops::Range<usize>> {
        let start = offset as usize;
        let end = start.checked_add(len).filter(|&e| e <= self.0.len()).ok_or_else(|| {
            io::Error::new(io::ErrorKind::UnexpectedEof, "access past end of image")
        })?;
        Ok(start..end)
    }
}

impl Disk for MemDisk {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        let range = self.range(offset, buf.len())?;
        buf.copy_from_slice(&self.0[range]);
        Ok(())
    }

    fn write_at(&mut self, offset: u64, buf: &[u8]) -> io::Result<()> {
        let range = self.range(offset, buf.len())?;
        self.0[range].copy_from_slice(buf);
        Ok(())
    }

    fn reset(&mut self, len: u64) -> io::Result<()> {
        self.0.clear();
        self.0.resize(len as usize, 0);
        Ok(())
    }

    fn len(&mut self) -> io::Result<u64> { Ok(self.0.len() as u64) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mem_disk_rejects_out_of_range() {
        let mut disk = MemDisk(vec![0u8; 16]);
        let mut buf = [0u8; 8];
        assert!(disk.read_at(12, &mut buf).is_err());
        assert!(disk.write_at(9, &buf).is_err());
        assert!(disk.read_at(8, &mut buf).is_ok());
    }

    #[test]
    fn mem_disk_reset_zero_fills() {
        let mut disk = MemDisk(vec![7u8; 4]);
        disk.reset(10).unwrap();
        assert_eq!(disk.0, vec![0u8; 10]);
    }

    #[test]
    fn image_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut img = ImageFile::new(dir.path().join("vol.img"));
        img.reset(2048).unwrap();
        img.write_at(1500, b"abc").unwrap();
        let mut buf = [0u8; 3];
        img.read_at(1500, &mut buf).unwrap();
        assert_eq!(&buf, b"abc");
        assert_eq!(img.len().unwrap(), 2048);
    }

    #[test]
    fn missing_image_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut img = ImageFile::new(dir.path().join("absent.img"));
        let mut buf = [0u8; 1];
        let err = img.read_at(0, &mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
