//! Fixed-width record images.
//!
//! Encoding is deterministic from the schema: each field occupies its
//! declared width (text `Length` bytes zero-padded, bool 1, int 8 LE) and
//! fields concatenate in declaration order. The same per-field encoder
//! feeds the index fan-out, so a field's index key bytes always equal its
//! record bytes.

use eyre::{bail, Result};

use super::value::{Record, Value};
use crate::schema::{Field, FieldDef, FieldType};
use crate::storage::INT64_LEN;

/// Encodes one field value to its fixed width. A missing or wrongly
/// typed value is a schema mismatch.
pub fn encode_field(field: &Field, value: Option<&Value>) -> Result<Vec<u8>> {
    match field.field_type {
        FieldType::Text => match value {
            Some(Value::Text(s)) => {
                let mut buf = vec![0u8; field.length];
                let bytes = s.as_bytes();
                let n = bytes.len().min(field.length);
                buf[..n].copy_from_slice(&bytes[..n]);
                Ok(buf)
            }
            _ => bail!("field '{}' requires a text value", field.name),
        },
        FieldType::Bool => match value {
            Some(Value::Bool(b)) => Ok(vec![*b as u8]),
            _ => bail!("field '{}' requires a bool value", field.name),
        },
        FieldType::Int => match value {
            Some(Value::Int(i)) => Ok(i.to_le_bytes().to_vec()),
            _ => bail!("field '{}' requires an int value", field.name),
        },
        FieldType::Real => bail!(
            "field '{}': real fields are not implemented",
            field.name
        ),
    }
}

/// Encodes a full record image in schema field order.
pub fn encode_record(def: &FieldDef, record: &Record) -> Result<Vec<u8>> {
    let mut image = Vec::with_capacity(def.record_size()?);
    for field in &def.fields {
        let encoded = encode_field(field, record.get(&field.name))?;
        image.extend_from_slice(&encoded);
    }
    Ok(image)
}

/// Decodes a record image back into a field map. Zero bytes inside a
/// text window are padding and are dropped.
pub fn decode_record(def: &FieldDef, image: &[u8]) -> Result<Record> {
    let mut record = Record::new();
    let mut at = 0;

    for field in &def.fields {
        let width = field.encoded_width()?;
        ensure_window(image, at, width, &field.name)?;
        let window = &image[at..at + width];

        let value = match field.field_type {
            FieldType::Text => {
                let bytes: Vec<u8> = window.iter().copied().filter(|&b| b != 0).collect();
                Value::Text(String::from_utf8_lossy(&bytes).into_owned())
            }
            FieldType::Bool => Value::Bool(window[0] != 0),
            FieldType::Int => {
                let bytes: [u8; INT64_LEN] = window.try_into().expect("int window is 8 bytes");
                Value::Int(i64::from_le_bytes(bytes))
            }
            FieldType::Real => bail!(
                "field '{}': real fields are not implemented",
                field.name
            ),
        };

        record.insert(field.name.clone(), value);
        at += width;
    }

    Ok(record)
}

fn ensure_window(image: &[u8], at: usize, width: usize, field: &str) -> Result<()> {
    if at + width > image.len() {
        bail!(
            "record image of {} bytes is too short for field '{}'",
            image.len(),
            field
        );
    }
    Ok(())
}
