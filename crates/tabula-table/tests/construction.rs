use pretty_assertions::assert_eq;
use tabula_table::{ErrorKind, FromRowsOptions, Record, RowSource, Table, TableError, Value};

fn people() -> Vec<Record> {
    vec![
        Record::new().with("name", "ada").with("age", 36),
        Record::new().with("name", "alan").with("age", 41),
        Record::new().with("name", "grace").with("age", 85),
    ]
}

#[test]
fn keyed_rows_take_fields_from_the_first_row() {
    let table = Table::from_rows(RowSource::keyed(people())).unwrap();

    assert_eq!(table.fields(), ["name", "age"]);
    assert_eq!(table.len(), 3);
    assert_eq!(
        table.column("age").unwrap(),
        [Value::Integer(36), Value::Integer(41), Value::Integer(85)]
    );
}

#[test]
fn keyed_rows_accept_any_key_order() {
    let rows = vec![
        Record::new().with("a", 1).with("b", 2),
        Record::new().with("b", 20).with("a", 10),
    ];
    let table = Table::from_rows(RowSource::keyed(rows)).unwrap();

    assert_eq!(table.fields(), ["a", "b"]);
    assert_eq!(table.column("a").unwrap(), [Value::Integer(1), Value::Integer(10)]);
}

#[test]
fn keyed_row_with_different_keys_reports_its_index() {
    let mut rows = people();
    rows.push(Record::new().with("name", "linus").with("shell", "bash"));

    let err = Table::from_rows(RowSource::keyed(rows)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Schema);
    assert!(matches!(err, TableError::RowShape { row: 3, .. }), "{err:?}");
}

#[test]
fn keyed_row_missing_a_key_can_be_filled() {
    let rows = vec![
        Record::new().with("a", 1).with("b", 2),
        Record::new().with("a", 3),
    ];
    let strict = Table::from_rows(RowSource::keyed(rows.clone())).unwrap_err();
    assert!(matches!(strict, TableError::RowShape { row: 1, .. }));

    let options = FromRowsOptions::default().fill_missing(Value::Null);
    let table = Table::from_rows_with(RowSource::keyed(rows), options).unwrap();
    assert_eq!(table.column("b").unwrap(), [Value::Integer(2), Value::Null]);
}

#[test]
fn explicit_fields_project_keyed_rows() {
    let options = FromRowsOptions::with_fields(["age", "name"]);
    let table = Table::from_rows_with(RowSource::keyed(people()), options).unwrap();
    assert_eq!(table.fields(), ["age", "name"]);

    let options = FromRowsOptions::with_fields(["age"]);
    let table = Table::from_rows_with(RowSource::keyed(people()), options).unwrap();
    assert_eq!(table.fields(), ["age"]);
    assert_eq!(table.len(), 3);
}

#[test]
fn projection_onto_unknown_field_fails() {
    let options = FromRowsOptions::with_fields(["name", "email"]);
    let err = Table::from_rows_with(RowSource::keyed(people()), options).unwrap_err();
    assert_eq!(
        err,
        TableError::UnknownField {
            field: "email".to_owned()
        }
    );
}

#[test]
fn positional_rows_need_field_names() {
    let rows = vec![vec![Value::Integer(1), Value::from("a")]];
    let err = Table::from_rows(RowSource::positional(rows.clone())).unwrap_err();
    assert_eq!(err, TableError::MissingFieldNames);

    let options = FromRowsOptions::with_fields(["n", "s"]);
    let table = Table::from_rows_with(RowSource::positional(rows), options).unwrap();
    assert_eq!(table.fields(), ["n", "s"]);
    assert_eq!(table.row(0).unwrap().values(), [Value::Integer(1), Value::from("a")]);
}

#[test]
fn positional_row_of_wrong_width_is_rejected() {
    let rows = vec![vec![Value::Integer(1), Value::Integer(2)], vec![Value::Integer(3)]];
    let options = FromRowsOptions::with_fields(["a", "b"]);
    let err = Table::from_rows_with(RowSource::positional(rows), options).unwrap_err();
    assert!(matches!(err, TableError::RowShape { row: 1, .. }), "{err:?}");
}

#[test]
fn described_rows_rebuild_a_table() {
    let original = Table::from_rows(RowSource::keyed(people())).unwrap();
    let copy = Table::from_rows(RowSource::described(original.iter())).unwrap();
    assert_eq!(copy, original);

    let options = FromRowsOptions::with_fields(["age"]);
    let projected = Table::from_rows_with(RowSource::described(original.iter()), options).unwrap();
    assert_eq!(projected.fields(), ["age"]);
    assert_eq!(projected.column("age").unwrap(), original.column("age").unwrap());
}

#[test]
fn described_rows_from_two_tables_with_reordered_fields() {
    let a = Table::from_pairs([("x", vec![Value::Integer(1)]), ("y", vec![Value::Integer(2)])])
        .unwrap();
    let b = Table::from_pairs([("y", vec![Value::Integer(20)]), ("x", vec![Value::Integer(10)])])
        .unwrap();

    let table = Table::from_rows(RowSource::described(a.iter().chain(b.iter()))).unwrap();
    assert_eq!(table.fields(), ["x", "y"]);
    assert_eq!(table.column("x").unwrap(), [Value::Integer(1), Value::Integer(10)]);
}

#[test]
fn empty_source_gives_empty_table() {
    let table = Table::from_rows(RowSource::keyed(Vec::new())).unwrap();
    assert!(table.is_empty());
    assert_eq!(table.width(), 0);

    let options = FromRowsOptions::with_fields(["a", "b"]);
    let table = Table::from_rows_with(RowSource::positional(Vec::new()), options).unwrap();
    assert_eq!(table.fields(), ["a", "b"]);
    assert_eq!(table.len(), 0);
}

#[test]
fn column_constructors_validate_shape() {
    let err = Table::from_columns(
        vec!["a".to_owned(), "b".to_owned()],
        vec![vec![Value::Integer(1)]],
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::LengthMismatch);

    let err = Table::from_pairs([
        ("a", vec![Value::Integer(1)]),
        ("b", vec![Value::Integer(1), Value::Integer(2)]),
    ])
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::LengthMismatch);

    let err = Table::from_pairs([("a", vec![]), ("a", vec![])]).unwrap_err();
    assert_eq!(err, TableError::DuplicateField { field: "a".to_owned() });

    let err = Table::with_fields(["a", ""]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Schema);
}
