//! Soft delete: one flag byte in the record-pointer file.

use eyre::{ensure, Result};

use super::table::Table;
use crate::storage::{INT64_LEN, POINTER_CELL_LEN};

impl Table {
    /// Marks `rec_no` deleted. Idempotent; the record's bytes and its
    /// index entries stay in place, and cursors skip it from now on.
    pub fn delete(&mut self, rec_no: i64) -> Result<()> {
        let count = self.rec_count()?;
        ensure!(
            rec_no >= 0 && rec_no < count,
            "record number {rec_no} is out of range (record count {count})"
        );

        let flag_offset = rec_no as u64 * POINTER_CELL_LEN as u64 + INT64_LEN as u64;
        self.rpt.write_at(flag_offset, &[1])
    }
}
