//! # Positional Block I/O
//!
//! `BlockFile` is the lowest layer of navdb: fixed-width reads and writes
//! against one open file handle, addressed by absolute byte offset. There
//! is no shared file cursor; every operation names its position, so
//! readers and writers never contend over seek state.
//!
//! ## EOF Contract
//!
//! A read that cannot deliver the full requested width returns `Ok(None)`.
//! End-of-file is a routine outcome for the record-pointer file (probing
//! one past the last record), so it is reported as a distinguished value
//! rather than an error; callers decide whether `None` means "stop
//! iterating" or "corrupt file". Only genuine I/O failures become errors.
//!
//! ## Endianness
//!
//! All persisted 64-bit integers are little-endian, matching every other
//! structure in the database files.

use std::fs::File;
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};

use eyre::{Result, WrapErr};

pub const INT64_LEN: usize = 8;

/// One open database file addressed by absolute offsets.
#[derive(Debug)]
pub struct BlockFile {
    file: File,
    path: PathBuf,
}

impl BlockFile {
    pub fn new(file: File, path: impl Into<PathBuf>) -> Self {
        Self {
            file,
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads exactly `len` bytes at `offset`, or `None` when the file ends
    /// before `len` bytes are available.
    pub fn read_at(&self, offset: u64, len: usize) -> Result<Option<Vec<u8>>> {
        let mut buf = vec![0u8; len];
        let mut filled = 0;

        while filled < len {
            let n = self
                .file
                .read_at(&mut buf[filled..], offset + filled as u64)
                .wrap_err_with(|| {
                    format!(
                        "failed to read {} bytes at offset {} from '{}'",
                        len,
                        offset,
                        self.path.display()
                    )
                })?;
            if n == 0 {
                return Ok(None);
            }
            filled += n;
        }

        Ok(Some(buf))
    }

    pub fn write_at(&self, offset: u64, buf: &[u8]) -> Result<()> {
        self.file.write_all_at(buf, offset).wrap_err_with(|| {
            format!(
                "failed to write {} bytes at offset {} to '{}'",
                buf.len(),
                offset,
                self.path.display()
            )
        })
    }

    /// Appends `buf` at the end of the file and returns the offset it was
    /// written at.
    pub fn append(&self, buf: &[u8]) -> Result<u64> {
        let offset = self.len()?;
        self.write_at(offset, buf)?;
        Ok(offset)
    }

    pub fn read_u64(&self, offset: u64) -> Result<Option<u64>> {
        let Some(buf) = self.read_at(offset, INT64_LEN)? else {
            return Ok(None);
        };
        let bytes: [u8; INT64_LEN] = buf.as_slice().try_into().expect("read_at returned 8 bytes");
        Ok(Some(u64::from_le_bytes(bytes)))
    }

    pub fn write_u64(&self, offset: u64, value: u64) -> Result<()> {
        self.write_at(offset, &value.to_le_bytes())
    }

    pub fn len(&self) -> Result<u64> {
        let meta = self
            .file
            .metadata()
            .wrap_err_with(|| format!("failed to stat '{}'", self.path.display()))?;
        Ok(meta.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    pub fn sync(&self) -> Result<()> {
        self.file
            .sync_all()
            .wrap_err_with(|| format!("failed to sync '{}'", self.path.display()))
    }
}
