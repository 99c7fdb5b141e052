//! # Per-Key Value Lists
//!
//! Every distinct key in an index owns a singly-linked list of 64-bit
//! payloads (record numbers), stored as 16-byte cells appended to the
//! index file:
//!
//! ```text
//! +-----------------+---------------+
//! | payload (8, LE) | next (8, LE)  |
//! +-----------------+---------------+
//! ```
//!
//! `next == 0` terminates a chain; offset 0 is the index header, so it can
//! never address a cell. Cells are immutable once written except for the
//! in-place `next` update when a new tail is linked. Appending an existing
//! payload is a silent no-op, which keeps re-inserted records from
//! duplicating index hits.

use eyre::{bail, Result};
use zerocopy::little_endian::{I64, U64};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::storage::{BlockFile, INT64_LEN};

pub const CELL_LEN: usize = 16;

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
struct Cell {
    payload: I64,
    next: U64,
}

const _: () = assert!(std::mem::size_of::<Cell>() == CELL_LEN);

/// Appends a single-cell list holding `payload` and returns its offset.
pub fn add_new(file: &BlockFile, payload: i64) -> Result<u64> {
    let cell = Cell {
        payload: I64::new(payload),
        next: U64::new(0),
    };
    file.append(cell.as_bytes())
}

/// Appends `payload` at the tail of the chain starting at `head`, unless
/// some cell already holds it.
pub fn insert(file: &BlockFile, head: u64, payload: i64) -> Result<()> {
    let mut ptr = head;
    loop {
        let (value, next) = read_cell(file, ptr)?;
        if value == payload {
            return Ok(());
        }
        if next == 0 {
            let new_ptr = add_new(file, payload)?;
            return file.write_u64(ptr + INT64_LEN as u64, new_ptr);
        }
        ptr = next;
    }
}

/// Reads one cell, returning `(payload, next)`.
pub fn read_cell(file: &BlockFile, ptr: u64) -> Result<(i64, u64)> {
    let Some(buf) = file.read_at(ptr, CELL_LEN)? else {
        bail!(
            "value list cell at offset {} is past the end of the index file, corrupt index",
            ptr
        );
    };
    let cell = Cell::read_from_bytes(&buf[..CELL_LEN])
        .map_err(|e| eyre::eyre!("failed to parse value list cell: {:?}", e))?;
    Ok((cell.payload.get(), cell.next.get()))
}

/// Collects every payload in the chain, in link order.
pub fn read_all(file: &BlockFile, head: u64) -> Result<Vec<i64>> {
    let mut result = Vec::new();
    let mut ptr = head;
    loop {
        let (value, next) = read_cell(file, ptr)?;
        result.push(value);
        if next == 0 {
            return Ok(result);
        }
        ptr = next;
    }
}
