//! # Storage Layer
//!
//! Foundational file access for navdb. Two pieces:
//!
//! - [`BlockFile`]: positional block I/O against one open handle. Absolute
//!   offsets only, short reads reported as a distinguished EOF value,
//!   append returns the offset it wrote at.
//! - [`FileManager`]: resolves and creates the per-table file family
//!   (`.def`, `.rpt`, `.dat`, `.idx`) inside the database folder.
//!
//! ## Record-Pointer Cell
//!
//! The `.rpt` file is a dense array of 9-byte cells, one per record:
//!
//! ```text
//! +--------------------+---------+
//! | data offset (8 LE) | deleted |
//! +--------------------+---------+
//! ```
//!
//! The record number is the cell index. Only the deleted flag ever
//! mutates after the cell is appended. `PointerCell` is the zerocopy view
//! of one cell.
//!
//! ## Concurrency
//!
//! Handles are safe to share for positional reads and writes, but two
//! table instances opened against the same files interleave writes
//! unpredictably; callers must serialize.

mod block;
mod file_manager;

pub use block::{BlockFile, INT64_LEN};
pub use file_manager::{
    FileManager, DATA_FILE_EXTENSION, DEFAULT_DB_FOLDER, DEF_FILE_EXTENSION,
    INDEX_FILE_EXTENSION, POINTER_FILE_EXTENSION,
};

use eyre::Result;
use zerocopy::little_endian::U64;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

/// Width of one record-pointer cell: data offset plus deleted flag.
pub const POINTER_CELL_LEN: usize = 9;

/// One entry of the record-pointer file.
#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct PointerCell {
    data_offset: U64,
    deleted: u8,
}

const _: () = assert!(std::mem::size_of::<PointerCell>() == POINTER_CELL_LEN);

impl PointerCell {
    pub fn new(data_offset: u64) -> Self {
        Self {
            data_offset: U64::new(data_offset),
            deleted: 0,
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::read_from_bytes(&bytes[..POINTER_CELL_LEN])
            .map_err(|e| eyre::eyre!("failed to parse pointer cell: {:?}", e))
    }

    pub fn data_offset(&self) -> u64 {
        self.data_offset.get()
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted != 0
    }
}

/// Reads the pointer cell for `rec_no`, or `None` past the end of the
/// pointer file.
pub fn read_pointer_cell(rpt: &BlockFile, rec_no: i64) -> Result<Option<PointerCell>> {
    if rec_no < 0 {
        return Ok(None);
    }

    let offset = rec_no as u64 * POINTER_CELL_LEN as u64;
    let Some(buf) = rpt.read_at(offset, POINTER_CELL_LEN)? else {
        return Ok(None);
    };

    Ok(Some(PointerCell::from_bytes(&buf)?))
}
