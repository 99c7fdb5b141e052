//! Open-table state: file handles, parsed schema, open indexes, and the
//! cursor position shared by every navigation verb.

use eyre::{bail, Result};
use tracing::debug;

use crate::btree::{KeyType, Tree};
use crate::schema::{FieldDef, FieldType};
use crate::storage::{
    BlockFile, FileManager, DATA_FILE_EXTENSION, POINTER_CELL_LEN, POINTER_FILE_EXTENSION,
};

/// One open B-tree together with the field it indexes.
#[derive(Debug)]
pub(crate) struct OpenIndex {
    pub(crate) name: String,
    pub(crate) field_name: String,
    pub(crate) tree: Tree,
}

/// An open table: schema, data/pointer handles, every declared index, and
/// the navigational cursor. Not safe for concurrent mutation; callers
/// serialize access.
#[derive(Debug)]
pub struct Table {
    pub(crate) name: String,
    pub(crate) def: FieldDef,
    pub(crate) record_size: usize,
    pub(crate) rpt: BlockFile,
    pub(crate) dat: BlockFile,
    pub(crate) indexes: Vec<OpenIndex>,
    pub(crate) active_index: Option<usize>,
    pub(crate) record_no: i64,
}

impl Table {
    pub(crate) fn open(files: &FileManager, name: &str) -> Result<Self> {
        let def = FieldDef::load(files, name)?;
        let record_size = def.record_size()?;

        let rpt = files.open_read_write(&format!("{name}{POINTER_FILE_EXTENSION}"))?;
        let dat = files.open_read_write(&format!("{name}{DATA_FILE_EXTENSION}"))?;

        let mut indexes = Vec::new();
        for field in &def.fields {
            let Some(index_defs) = &field.indexes else {
                continue;
            };
            let key_type = match field.field_type {
                FieldType::Int => KeyType::Int,
                _ => KeyType::Text,
            };
            let width = field.encoded_width()?;
            for index_def in index_defs {
                let tree = Tree::open(files, &index_def.name, key_type, width)?;
                debug!(table = name, index = %index_def.name, field = %field.name, "opened index");
                indexes.push(OpenIndex {
                    name: index_def.name.clone(),
                    field_name: field.name.clone(),
                    tree,
                });
            }
        }

        Ok(Self {
            name: name.to_string(),
            def,
            record_size,
            rpt,
            dat,
            indexes,
            active_index: None,
            record_no: 0,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The table's schema as declared in its `.def` document.
    pub fn structure(&self) -> &FieldDef {
        &self.def
    }

    /// The record number the cursor currently rests on.
    pub fn cursor_pos(&self) -> i64 {
        self.record_no
    }

    /// Number of records ever inserted, deleted ones included.
    pub fn rec_count(&self) -> Result<i64> {
        Ok((self.rpt.len()? / POINTER_CELL_LEN as u64) as i64)
    }

    /// Selects the index driving `first`/`last`/`next`/`prev`/`seek`.
    /// An empty name returns the cursor to plain record-number order.
    pub fn use_index(&mut self, index_name: &str) -> Result<()> {
        if index_name.is_empty() {
            self.active_index = None;
            return Ok(());
        }

        match self.indexes.iter().position(|i| i.name == index_name) {
            Some(idx) => {
                self.active_index = Some(idx);
                Ok(())
            }
            None => bail!("index '{index_name}' does not exist, cannot use it"),
        }
    }

    pub(crate) fn active_tree(&mut self) -> Option<&mut Tree> {
        let idx = self.active_index?;
        Some(&mut self.indexes[idx].tree)
    }

    /// Closes every handle and index, surfacing all failures as one
    /// aggregated error.
    pub fn close(self) -> Result<()> {
        let mut failures: Vec<String> = Vec::new();

        if let Err(e) = self.dat.sync() {
            failures.push(e.to_string());
        }
        if let Err(e) = self.rpt.sync() {
            failures.push(e.to_string());
        }
        for index in self.indexes {
            if let Err(e) = index.tree.close() {
                failures.push(e.to_string());
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            bail!("errors closing table files: {}", failures.join(", "))
        }
    }
}
