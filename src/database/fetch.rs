//! Read path: point fetch by record number and the navigational verbs.
//!
//! Navigation runs in two modes. With an active index the tree cursor
//! drives and its payloads are record numbers; without one the cursor is
//! the record number itself, stepped by one. Both modes skip soft-deleted
//! rows by continuing in the direction of travel.

use eyre::{bail, Result};

use super::table::Table;
use super::Fetch;
use crate::records::{decode_record, Record, Value, REC_NO_FIELD};
use crate::storage::read_pointer_cell;

impl Table {
    /// Reads the record at `rec_no`. Past-the-end probes report
    /// [`Fetch::Eof`]; soft-deleted rows report [`Fetch::Deleted`]
    /// without a payload.
    pub fn fetch(&mut self, rec_no: i64) -> Result<Fetch> {
        let Some(cell) = read_pointer_cell(&self.rpt, rec_no)? else {
            return Ok(Fetch::Eof);
        };

        if cell.is_deleted() {
            return Ok(Fetch::Deleted);
        }

        let Some(image) = self.dat.read_at(cell.data_offset(), self.record_size)? else {
            return Ok(Fetch::Eof);
        };

        self.record_no = rec_no;
        let mut record = decode_record(&self.def, &image)?;
        record.insert(REC_NO_FIELD.into(), Value::Int(rec_no));
        Ok(Fetch::Record(record))
    }

    /// Re-reads the record under the cursor.
    pub fn fetch_current(&mut self) -> Result<Fetch> {
        let rec_no = self.record_no;
        self.fetch(rec_no)
    }

    /// Moves to the first record (smallest key with an active index,
    /// record 0 otherwise), skipping deleted rows forward.
    pub fn first(&mut self) -> Result<Option<Record>> {
        if self.active_index.is_some() {
            let step = self.active_tree().expect("active index set").first()?;
            let Some((rec_no, _)) = step else {
                return Ok(None);
            };
            self.record_no = rec_no;
        } else {
            self.record_no = 0;
        }

        match self.fetch(self.record_no)? {
            Fetch::Record(record) => Ok(Some(record)),
            Fetch::Deleted => self.next(),
            Fetch::Eof => Ok(None),
        }
    }

    /// Moves to the last record, skipping deleted rows backward.
    pub fn last(&mut self) -> Result<Option<Record>> {
        if self.active_index.is_some() {
            let step = self.active_tree().expect("active index set").last()?;
            let Some((rec_no, _)) = step else {
                return Ok(None);
            };
            self.record_no = rec_no;
        } else {
            self.record_no = self.rec_count()? - 1;
        }

        match self.fetch(self.record_no)? {
            Fetch::Record(record) => Ok(Some(record)),
            Fetch::Deleted => self.prev(),
            Fetch::Eof => Ok(None),
        }
    }

    pub fn next(&mut self) -> Result<Option<Record>> {
        self.move_cursor(true)
    }

    pub fn prev(&mut self) -> Result<Option<Record>> {
        self.move_cursor(false)
    }

    fn move_cursor(&mut self, forward: bool) -> Result<Option<Record>> {
        loop {
            if self.active_index.is_some() {
                let step = {
                    let tree = self.active_tree().expect("active index set");
                    if forward {
                        tree.next()?
                    } else {
                        tree.prev()?
                    }
                };
                let Some((rec_no, _)) = step else {
                    return Ok(None);
                };
                self.record_no = rec_no;
            } else {
                self.record_no += if forward { 1 } else { -1 };
            }

            if self.record_no == -1 {
                return Ok(None);
            }

            match self.fetch(self.record_no)? {
                Fetch::Record(record) => return Ok(Some(record)),
                Fetch::Eof => return Ok(None),
                Fetch::Deleted => continue,
            }
        }
    }

    /// Finds the first record whose `field_name` equals `value`. With an
    /// active index and a text probe this is an index lookup; otherwise a
    /// linear scan from record 0. `None` means not found; a located but
    /// soft-deleted record is an error.
    pub fn locate(&mut self, field_name: &str, value: &Value) -> Result<Option<Record>> {
        if self.active_index.is_some() {
            if let Value::Text(probe) = value {
                let tree = self.active_tree().expect("active index checked above");
                let (rec_no, _, found) = tree.search(probe.as_bytes())?;
                if !found {
                    return Ok(None);
                }
                return match self.fetch(rec_no)? {
                    Fetch::Record(record) => Ok(Some(record)),
                    Fetch::Eof => Ok(None),
                    Fetch::Deleted => bail!("record {rec_no} is deleted"),
                };
            }
        }

        self.record_no = 0;
        let mut current = match self.fetch(0)? {
            Fetch::Eof => return Ok(None),
            Fetch::Deleted => self.next()?,
            Fetch::Record(record) => Some(record),
        };

        while let Some(record) = current {
            if record.get(field_name) == Some(value) {
                return Ok(Some(record));
            }
            current = self.next()?;
        }

        Ok(None)
    }

    /// Positions the cursor at `value` or its closest neighbor via the
    /// active index and returns the record it landed on, if any.
    pub fn seek(&mut self, value: &Value) -> Result<Option<Record>> {
        if self.active_index.is_none() {
            bail!("seek only works while an index is in use");
        }
        let Value::Text(probe) = value else {
            bail!("seek is not implemented for {} values", value.type_name());
        };

        let tree = self.active_tree().expect("active index checked above");
        let (rec_no, _, _) = tree.search(probe.as_bytes())?;

        match self.fetch(rec_no)? {
            Fetch::Record(record) => Ok(Some(record)),
            Fetch::Eof | Fetch::Deleted => Ok(None),
        }
    }
}
