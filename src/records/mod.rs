//! # Record Serialization
//!
//! Typed field values and the fixed-width record codec. A record image's
//! layout is fully determined by the schema, so records can be addressed
//! by `record_size * n` arithmetic and decoded without per-row metadata.

mod codec;
mod value;

pub use codec::{decode_record, encode_field, encode_record};
pub use value::{Record, Value, REC_NO_FIELD};
