//! # Table Schema
//!
//! A table's structure lives in its `.def` file as a UTF-8 JSON document:
//!
//! ```json
//! {"Fields":[{"Type":1,"Name":"field_1","Length":15,"Required":true,
//!             "Indexes":[{"Type":"btree","Name":"idx_f1"}]}]}
//! ```
//!
//! Field type codes: 1 = text, 2 = bool, 3 = int, 4 = real (reserved; any
//! attempt to use it is a schema-mismatch error). `Indexes` is nullable.
//! The PascalCase keys and integer codes are the wire format of existing
//! `.def` files and must not drift.
//!
//! Record images are deterministic from the field list: text occupies
//! `Length` bytes zero-padded, bool one byte, int eight bytes
//! little-endian, concatenated in declaration order.

use eyre::{bail, Result, WrapErr};
use serde::{Deserialize, Serialize};

use crate::storage::{FileManager, DEF_FILE_EXTENSION, INT64_LEN};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum FieldType {
    Text,
    Bool,
    Int,
    Real,
}

impl From<FieldType> for u8 {
    fn from(t: FieldType) -> u8 {
        match t {
            FieldType::Text => 1,
            FieldType::Bool => 2,
            FieldType::Int => 3,
            FieldType::Real => 4,
        }
    }
}

impl TryFrom<u8> for FieldType {
    type Error = String;

    fn try_from(code: u8) -> std::result::Result<Self, Self::Error> {
        match code {
            1 => Ok(FieldType::Text),
            2 => Ok(FieldType::Bool),
            3 => Ok(FieldType::Int),
            4 => Ok(FieldType::Real),
            other => Err(format!("unknown field type code {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDef {
    #[serde(rename = "Type")]
    pub index_type: String,
    #[serde(rename = "Name")]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    #[serde(rename = "Type")]
    pub field_type: FieldType,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Length")]
    pub length: usize,
    #[serde(rename = "Required")]
    pub required: bool,
    #[serde(rename = "Indexes")]
    pub indexes: Option<Vec<IndexDef>>,
}

impl Field {
    /// Bytes this field occupies in a record image, which is also the key
    /// width of any index declared on it.
    pub fn encoded_width(&self) -> Result<usize> {
        match self.field_type {
            FieldType::Text => Ok(self.length),
            FieldType::Bool => Ok(1),
            FieldType::Int => Ok(INT64_LEN),
            FieldType::Real => bail!(
                "field '{}': real fields are not implemented",
                self.name
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    #[serde(rename = "Fields")]
    pub fields: Vec<Field>,
}

impl FieldDef {
    /// Total width of one record image.
    pub fn record_size(&self) -> Result<usize> {
        let mut size = 0;
        for field in &self.fields {
            size += field.encoded_width()?;
        }
        Ok(size)
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn load(files: &FileManager, table_name: &str) -> Result<Self> {
        let path = files.full_path(&format!("{table_name}{DEF_FILE_EXTENSION}"));
        let data = std::fs::read(&path)
            .wrap_err_with(|| format!("failed to read table definition '{}'", path.display()))?;
        serde_json::from_slice(&data)
            .wrap_err_with(|| format!("failed to parse table definition '{}'", path.display()))
    }

    pub fn save(&self, files: &FileManager, table_name: &str) -> Result<()> {
        files.create_folder_if_absent()?;
        let path = files.full_path(&format!("{table_name}{DEF_FILE_EXTENSION}"));
        let json = serde_json::to_string(self).wrap_err("failed to encode table definition")?;
        std::fs::write(&path, json)
            .wrap_err_with(|| format!("failed to write table definition '{}'", path.display()))
    }
}
