//! Database manager: creates and opens tables inside one folder.

use std::path::PathBuf;

use eyre::Result;
use tracing::info;

use super::table::Table;
use crate::btree::{KeyType, Tree};
use crate::schema::{FieldDef, FieldType};
use crate::storage::{FileManager, DATA_FILE_EXTENSION, POINTER_FILE_EXTENSION};

/// Entry point for table lifecycle operations. Holds nothing but the
/// folder; every opened [`Table`] owns its own handles.
#[derive(Debug, Default)]
pub struct Database {
    files: FileManager,
}

impl Database {
    /// A database over the default `./dbfolder` directory.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_folder(path: impl Into<PathBuf>) -> Self {
        Self {
            files: FileManager::new(path.into()),
        }
    }

    /// Creates a table: writes the `.def` document, creates blank pointer
    /// and data files, and creates every declared index file.
    pub fn create_table(&self, name: &str, def: &FieldDef) -> Result<()> {
        def.save(&self.files, name)?;

        self.files
            .create_blank_if_absent(&format!("{name}{POINTER_FILE_EXTENSION}"))?;
        self.files
            .create_blank_if_absent(&format!("{name}{DATA_FILE_EXTENSION}"))?;

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
                Tree::open(&self.files, &index_def.name, key_type, width)?.close()?;
            }
        }

        info!(table = name, "created table");
        Ok(())
    }

    /// Opens a table with all of its declared indexes.
    pub fn open_table(&self, name: &str) -> Result<Table> {
        let table = Table::open(&self.files, name)?;
        info!(
            table = name,
            records = table.rec_count().unwrap_or(0),
            indexes = table.structure().fields.iter().map(|f| f.indexes.as_ref().map_or(0, |i| i.len())).sum::<usize>(),
            "opened table"
        );
        Ok(table)
    }
}
