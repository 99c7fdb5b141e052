//! # Record Store
//!
//! The table layer ties the pieces together: fixed-width record images in
//! the `.dat` file, a dense pointer file assigning record numbers and
//! carrying the soft-delete flag, and one B-tree per declared index fed
//! on every insert.
//!
//! ## Insert Data Flow
//!
//! ```text
//! record map
//!   └─ encode ──► .dat append ──► data offset D
//!                   └─ .rpt append (D, live) ──► record number N
//!                        └─ for each indexed field:
//!                             tree.insert(field bytes, N)
//! ```
//!
//! ## Navigation
//!
//! `use_index` decides who drives the cursor. With an index the tree
//! cursor walks (key, record-number) pairs in key order; without one the
//! record number steps through the pointer file. Soft-deleted rows are
//! skipped in the direction of travel in both modes.
//!
//! Deletion never touches the trees: the pointer flag flips and stale
//! index entries simply resolve to rows the cursor skips.

mod delete;
mod fetch;
mod insert;
mod manager;
mod table;

pub use manager::Database;
pub use table::Table;

use crate::records::Record;

/// Outcome of a point fetch. Past-the-end and soft-deleted are routine
/// signals the cursor machinery branches on, not errors.
#[derive(Debug, Clone, PartialEq)]
pub enum Fetch {
    Record(Record),
    Deleted,
    Eof,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::Value;
    use crate::schema::{Field, FieldDef, FieldType, IndexDef};
    use tempfile::tempdir;

    fn def_with_index() -> FieldDef {
        FieldDef {
            fields: vec![
                Field {
                    field_type: FieldType::Text,
                    name: "name".into(),
                    length: 10,
                    required: true,
                    indexes: Some(vec![IndexDef {
                        index_type: "btree".into(),
                        name: "idx_name".into(),
                    }]),
                },
                Field {
                    field_type: FieldType::Bool,
                    name: "active".into(),
                    length: 0,
                    required: false,
                    indexes: None,
                },
            ],
        }
    }

    fn row(name: &str, active: bool) -> Record {
        let mut r = Record::new();
        r.insert("name".into(), Value::from(name));
        r.insert("active".into(), Value::from(active));
        r
    }

    fn open_with_rows(dir: &std::path::Path, names: &[&str]) -> Table {
        let db = Database::with_folder(dir.join("db"));
        db.create_table("t", &def_with_index()).unwrap();
        let mut table = db.open_table("t").unwrap();
        for name in names {
            table.insert(&row(name, true)).unwrap();
        }
        table
    }

    #[test]
    fn unindexed_cursor_walks_record_numbers() {
        let dir = tempdir().unwrap();
        let mut table = open_with_rows(dir.path(), &["c", "a", "b"]);

        let first = table.first().unwrap().unwrap();
        assert_eq!(first.get("name"), Some(&Value::from("c")));
        assert_eq!(
            table.next().unwrap().unwrap().get("name"),
            Some(&Value::from("a"))
        );
        assert_eq!(
            table.next().unwrap().unwrap().get("name"),
            Some(&Value::from("b"))
        );
        assert!(table.next().unwrap().is_none());
    }

    #[test]
    fn indexed_cursor_walks_key_order() {
        let dir = tempdir().unwrap();
        let mut table = open_with_rows(dir.path(), &["c", "a", "b"]);

        table.use_index("idx_name").unwrap();

        let names: Vec<_> = {
            let mut out = vec![table.first().unwrap().unwrap()];
            while let Some(r) = table.next().unwrap() {
                out.push(r);
            }
            out.into_iter()
                .map(|r| match r.get("name") {
                    Some(Value::Text(s)) => s.clone(),
                    other => panic!("unexpected name {other:?}"),
                })
                .collect()
        };
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn deleted_rows_are_skipped_both_ways() {
        let dir = tempdir().unwrap();
        let mut table = open_with_rows(dir.path(), &["a", "b", "c"]);

        table.delete(1).unwrap();

        let first = table.first().unwrap().unwrap();
        assert_eq!(first.get("_recNo"), Some(&Value::Int(0)));
        let second = table.next().unwrap().unwrap();
        assert_eq!(second.get("_recNo"), Some(&Value::Int(2)));
        assert!(table.next().unwrap().is_none());

        let last = table.last().unwrap().unwrap();
        assert_eq!(last.get("_recNo"), Some(&Value::Int(2)));
        let before = table.prev().unwrap().unwrap();
        assert_eq!(before.get("_recNo"), Some(&Value::Int(0)));
        assert!(table.prev().unwrap().is_none());
    }

    #[test]
    fn locate_uses_index_when_active() {
        let dir = tempdir().unwrap();
        let mut table = open_with_rows(dir.path(), &["c", "a", "b"]);

        table.use_index("idx_name").unwrap();
        let hit = table.locate("name", &Value::from("b")).unwrap().unwrap();
        assert_eq!(hit.get("_recNo"), Some(&Value::Int(2)));

        assert!(table.locate("name", &Value::from("zz")).unwrap().is_none());
    }

    #[test]
    fn locate_scans_without_index() {
        let dir = tempdir().unwrap();
        let mut table = open_with_rows(dir.path(), &["c", "a", "b"]);

        let hit = table.locate("name", &Value::from("a")).unwrap().unwrap();
        assert_eq!(hit.get("_recNo"), Some(&Value::Int(1)));

        assert!(table.locate("name", &Value::from("zz")).unwrap().is_none());
    }

    #[test]
    fn seek_requires_an_active_index() {
        let dir = tempdir().unwrap();
        let mut table = open_with_rows(dir.path(), &["a", "b"]);

        assert!(table.seek(&Value::from("a")).is_err());

        table.use_index("idx_name").unwrap();
        let hit = table.seek(&Value::from("b")).unwrap().unwrap();
        assert_eq!(hit.get("name"), Some(&Value::from("b")));
    }

    #[test]
    fn fetch_current_reflects_cursor_motion() {
        let dir = tempdir().unwrap();
        let mut table = open_with_rows(dir.path(), &["a", "b"]);

        table.first().unwrap();
        table.next().unwrap();

        let Fetch::Record(r) = table.fetch_current().unwrap() else {
            panic!("cursor should rest on a live record");
        };
        assert_eq!(r.get("name"), Some(&Value::from("b")));
        assert_eq!(table.cursor_pos(), 1);
    }
}
