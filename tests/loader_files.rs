use std::sync::Arc;

use arrow::array::{BooleanArray, Float64Array, Int32Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use autolysis::data::loader::load_file;
use autolysis::data::model::{CellValue, ColumnKind};
use parquet::arrow::ArrowWriter;
use tempfile::tempdir;

#[test]
fn loads_csv_tsv_and_json_by_extension() {
    let dir = tempdir().expect("tempdir");

    let csv = dir.path().join("people.csv");
    std::fs::write(&csv, "name,age\nann,31\nbob,\n").unwrap();
    let ds = load_file(&csv).expect("csv");
    assert_eq!((ds.row_count(), ds.column_count()), (2, 2));
    assert_eq!(ds.column("age").unwrap().null_count(), 1);

    let tsv = dir.path().join("people.tsv");
    std::fs::write(&tsv, "name\tage\nann\t31\n").unwrap();
    assert_eq!(load_file(&tsv).expect("tsv").column("age").unwrap().kind, ColumnKind::Integer);

    let json = dir.path().join("people.json");
    std::fs::write(&json, r#"[{"name": "ann", "age": 31}, {"name": "bob", "age": null}]"#).unwrap();
    let ds = load_file(&json).expect("json");
    assert_eq!(ds.column("age").unwrap().values[1], CellValue::Null);
}

#[test]
fn latin1_csv_loads() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("cafes.csv");
    std::fs::write(&path, b"name,rating\ncaf\xe9,4\n").unwrap();
    let ds = load_file(&path).expect("latin-1 csv");
    assert_eq!(ds.column("name").unwrap().values[0], CellValue::Text("caf\u{e9}".into()));
}

#[test]
fn empty_and_missing_files_are_errors() {
    let dir = tempdir().expect("tempdir");
    let empty = dir.path().join("empty.csv");
    std::fs::write(&empty, "").unwrap();
    assert!(load_file(&empty).is_err());
    assert!(load_file(&dir.path().join("absent.csv")).is_err());
}

#[test]
fn loads_flat_parquet_columns() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("table.parquet");

    let schema = Arc::new(Schema::new(vec![
        Field::new("count", DataType::Int32, false),
        Field::new("price", DataType::Float64, true),
        Field::new("label", DataType::Utf8, false),
        Field::new("active", DataType::Boolean, false),
    ]));
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(Int32Array::from(vec![1, 2, 3])),
            Arc::new(Float64Array::from(vec![Some(1.5), None, Some(3.0)])),
            Arc::new(StringArray::from(vec!["a", "b", "c"])),
            Arc::new(BooleanArray::from(vec![true, false, true])),
        ],
    )
    .expect("batch");
    let file = std::fs::File::create(&path).expect("create");
    let mut writer = ArrowWriter::try_new(file, schema, None).expect("writer");
    writer.write(&batch).expect("write");
    writer.close().expect("close");

    let ds = load_file(&path).expect("parquet");
    assert_eq!(ds.column_names(), vec!["count", "price", "label", "active"]);
    assert_eq!(ds.column("count").unwrap().kind, ColumnKind::Integer);
    assert_eq!(ds.column("price").unwrap().values[1], CellValue::Null);
    assert_eq!(ds.column("label").unwrap().kind, ColumnKind::Text);
    assert_eq!(ds.column("active").unwrap().kind, ColumnKind::Bool);
}
