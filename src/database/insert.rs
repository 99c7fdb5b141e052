//! Insert path: record image append, pointer-cell append, and the
//! per-field index fan-out.

use eyre::Result;
use zerocopy::IntoBytes;

use super::table::Table;
use crate::records::{encode_field, encode_record, Record};
use crate::storage::{PointerCell, POINTER_CELL_LEN};

impl Table {
    /// Appends a record and files its record number under every declared
    /// index. The record number is the pointer file's cell count before
    /// the append.
    pub fn insert(&mut self, record: &Record) -> Result<()> {
        let image = encode_record(&self.def, record)?;
        let data_offset = self.dat.append(&image)?;

        let cell = PointerCell::new(data_offset);
        let rpt_offset = self.rpt.append(cell.as_bytes())?;
        let rec_no = (rpt_offset / POINTER_CELL_LEN as u64) as i64;

        self.add_to_indexes(record, rec_no)
    }

    fn add_to_indexes(&mut self, record: &Record, rec_no: i64) -> Result<()> {
        for open in &mut self.indexes {
            let field = self
                .def
                .field(&open.field_name)
                .expect("index refers to a declared field");
            let key = encode_field(field, record.get(&open.field_name))?;
            open.tree.insert(&key, rec_no)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::database::{Database, Fetch};
    use crate::records::{Record, Value};
    use crate::schema::{Field, FieldDef, FieldType, IndexDef};
    use tempfile::tempdir;

    fn two_field_def() -> FieldDef {
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
                    field_type: FieldType::Int,
                    name: "age".into(),
                    length: 0,
                    required: false,
                    indexes: None,
                },
            ],
        }
    }

    fn row(name: &str, age: i64) -> Record {
        let mut r = Record::new();
        r.insert("name".into(), Value::from(name));
        r.insert("age".into(), Value::from(age));
        r
    }

    #[test]
    fn insert_assigns_sequential_record_numbers() {
        let dir = tempdir().unwrap();
        let db = Database::with_folder(dir.path().join("db"));
        db.create_table("people", &two_field_def()).unwrap();

        let mut table = db.open_table("people").unwrap();
        table.insert(&row("ann", 30)).unwrap();
        table.insert(&row("bob", 40)).unwrap();
        table.insert(&row("cid", 50)).unwrap();

        assert_eq!(table.rec_count().unwrap(), 3);

        for (rec_no, name) in [(0, "ann"), (1, "bob"), (2, "cid")] {
            let Fetch::Record(r) = table.fetch(rec_no).unwrap() else {
                panic!("record {rec_no} should exist");
            };
            assert_eq!(r.get("name"), Some(&Value::from(name)));
            assert_eq!(r.get("_recNo"), Some(&Value::Int(rec_no)));
        }
    }

    #[test]
    fn insert_files_record_under_declared_index() {
        let dir = tempdir().unwrap();
        let db = Database::with_folder(dir.path().join("db"));
        db.create_table("people", &two_field_def()).unwrap();

        let mut table = db.open_table("people").unwrap();
        table.insert(&row("zoe", 20)).unwrap();
        table.insert(&row("ann", 30)).unwrap();

        table.use_index("idx_name").unwrap();
        let first = table.first().unwrap().unwrap();
        assert_eq!(first.get("name"), Some(&Value::from("ann")));
        let second = table.next().unwrap().unwrap();
        assert_eq!(second.get("name"), Some(&Value::from("zoe")));
    }

    #[test]
    fn insert_with_missing_field_fails_before_touching_files() {
        let dir = tempdir().unwrap();
        let db = Database::with_folder(dir.path().join("db"));
        db.create_table("people", &two_field_def()).unwrap();

        let mut table = db.open_table("people").unwrap();
        let mut bad = Record::new();
        bad.insert("name".into(), Value::from("ann"));

        assert!(table.insert(&bad).is_err());
        assert_eq!(table.rec_count().unwrap(), 0);
    }
}
