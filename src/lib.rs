//! # navdb - Embedded Navigational Record Store
//!
//! navdb is a single-process, file-backed record store with secondary
//! indexing. Tables hold fixed-width typed records addressed by record
//! number; each declared index is a persistent B-tree mapping field bytes
//! to chains of record numbers, driving an ordered cursor with
//! first/last/next/prev/seek/locate navigation. Deletion is a soft flag
//! in the record-pointer file.
//!
//! ## Quick Start
//!
//! ```ignore
//! use navdb::database::Database;
//! use navdb::records::{Record, Value};
//!
//! let db = Database::with_folder("./dbfolder");
//! let mut table = db.open_table("users")?;
//!
//! let mut row = Record::new();
//! row.insert("name".into(), Value::from("alice"));
//! row.insert("age".into(), Value::from(34i64));
//! table.insert(&row)?;
//!
//! table.use_index("idx_name")?;
//! let mut current = table.first()?;
//! while let Some(record) = current {
//!     println!("{record:?}");
//!     current = table.next()?;
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────┐
//! │      HTTP/JSON shell (server)     │
//! ├───────────────────────────────────┤
//! │  Database / Table   (database)    │
//! ├──────────────┬────────────────────┤
//! │ record codec │  B-tree indexes    │
//! │  (records)   │     (btree)        │
//! ├──────────────┴────────────────────┤
//! │  schema (.def JSON)   (schema)    │
//! ├───────────────────────────────────┤
//! │  positional block I/O (storage)   │
//! └───────────────────────────────────┘
//! ```
//!
//! ## File Layout
//!
//! Each table is a family of flat files inside the database folder
//! (default `./dbfolder`):
//!
//! ```text
//! dbfolder/
//! ├── users.def        # JSON schema document
//! ├── users.rpt        # record pointers: (data offset, deleted flag)
//! ├── users.dat        # fixed-width record images
//! └── idx_name.idx     # one B-tree per declared index
//! ```
//!
//! All persisted integers are little-endian. Index files are append-only
//! except for in-place pointer repairs; nodes never move once written.
//!
//! ## Concurrency Model
//!
//! Single-threaded cooperative. A [`database::Table`] owns one cursor and
//! is not safe for concurrent mutation; the HTTP shell serializes
//! requests through a mutex. Two table instances over the same files are
//! undefined behavior at the file level - callers must serialize.

pub mod btree;
pub mod database;
pub mod records;
pub mod schema;
pub mod server;
pub mod storage;

pub use database::{Database, Fetch, Table};
pub use records::{Record, Value};
pub use schema::{Field, FieldDef, FieldType, IndexDef};
