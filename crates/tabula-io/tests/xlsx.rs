use pretty_assertions::assert_eq;
use tabula_io::{
    read_xlsx, write_table, write_workbook, IoError, SheetSelector, XlsxReader, XlsxWriter,
};
use tabula_table::{Record, Table, Value};

fn people() -> Table {
    Table::from_pairs([
        ("name", vec![Value::from("ann"), Value::from("b<o>b & co")]),
        ("age", vec![Value::Integer(36), Value::Integer(41)]),
        ("score", vec![Value::Number(2.5), Value::Null]),
        ("active", vec![Value::Boolean(true), Value::Boolean(false)]),
    ])
    .unwrap()
}

fn pets() -> Table {
    Table::from_pairs([
        ("pet", vec![Value::from("cat")]),
        ("legs", vec![Value::Integer(4)]),
    ])
    .unwrap()
}

#[test]
fn workbook_round_trip_keeps_sheets_and_values() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("book.xlsx");
    write_workbook(&path, &[("people", &people()), ("pets", &pets())]).unwrap();

    let mut reader = XlsxReader::open(&path).unwrap();
    assert_eq!(reader.sheet_names(), ["people", "pets"]);
    assert_eq!(reader.read_table().unwrap(), people());

    reader.select_sheet("pets").unwrap();
    assert_eq!(reader.read_table().unwrap(), pets());

    reader.select_sheet(SheetSelector::Index(0)).unwrap();
    assert_eq!(reader.active_sheet(), Some("people"));
    assert_eq!(read_xlsx(&path).unwrap(), people());
}

#[test]
fn unknown_sheet_is_reported() {
    let bytes = {
        let mut writer = XlsxWriter::new();
        write_table(&pets(), &mut writer).unwrap();
        writer.to_bytes().unwrap()
    };
    let mut reader = XlsxReader::from_bytes(bytes).unwrap();
    assert_eq!(reader.sheet_names(), ["default"]);

    assert!(matches!(reader.select_sheet("nope"), Err(IoError::SheetNotFound(_))));
    assert!(matches!(reader.select_sheet(SheetSelector::Index(3)), Err(IoError::SheetNotFound(_))));
}

#[test]
fn switching_back_resumes_a_sheet() {
    let mut writer = XlsxWriter::new();
    writer.set_active_sheet("a").unwrap();
    writer.write_row(&[Value::from("x")]).unwrap();
    writer.set_active_sheet("b").unwrap();
    writer.write_row(&[Value::from("y")]).unwrap();
    writer.set_active_sheet("a").unwrap();
    writer
        .write_rows(vec![vec![Value::Integer(1)], vec![Value::Integer(2)]])
        .unwrap();

    let mut reader = XlsxReader::from_bytes(writer.to_bytes().unwrap()).unwrap();
    assert_eq!(reader.sheet_names(), ["a", "b"]);
    assert_eq!(
        reader.rows().unwrap(),
        vec![
            vec![Value::from("x")],
            vec![Value::Integer(1)],
            vec![Value::Integer(2)],
        ]
    );
}

#[test]
fn records_are_keyed_by_the_header_row() {
    let mut writer = XlsxWriter::new();
    write_table(&pets(), &mut writer).unwrap();
    let mut reader = XlsxReader::from_bytes(writer.to_bytes().unwrap()).unwrap();

    assert_eq!(
        reader.records().unwrap(),
        vec![Record::new().with("pet", "cat").with("legs", 4)]
    );
}

#[test]
fn duplicate_or_blank_headers_are_rejected() {
    let mut writer = XlsxWriter::new();
    writer
        .write_rows([
            vec![Value::from("a"), Value::from("a")],
            vec![Value::Integer(1), Value::Integer(2)],
        ])
        .unwrap();
    let mut reader = XlsxReader::from_bytes(writer.to_bytes().unwrap()).unwrap();
    assert!(matches!(
        reader.read_table(),
        Err(IoError::InvalidHeader { column: 1, .. })
    ));

    let mut writer = XlsxWriter::new();
    writer
        .write_rows([
            vec![Value::from("a"), Value::Null, Value::from("c")],
            vec![Value::Integer(1), Value::Integer(2), Value::Integer(3)],
        ])
        .unwrap();
    let mut reader = XlsxReader::from_bytes(writer.to_bytes().unwrap()).unwrap();
    assert!(matches!(
        reader.records(),
        Err(IoError::InvalidHeader { column: 1, .. })
    ));
}

#[test]
fn finish_saves_to_the_target_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sink.xlsx");
    let mut writer = XlsxWriter::create(&path);
    write_table(&people(), &mut writer).unwrap();

    assert_eq!(read_xlsx(&path).unwrap(), people());
}

#[test]
fn empty_writer_produces_one_empty_sheet() {
    let bytes = XlsxWriter::new().to_bytes().unwrap();
    let mut reader = XlsxReader::from_bytes(bytes).unwrap();
    assert_eq!(reader.sheet_count(), 1);
    assert_eq!(reader.read_table().unwrap(), Table::new());
}

#[test]
fn garbage_is_a_zip_error() {
    let err = XlsxReader::from_bytes(b"not a zip".to_vec()).unwrap_err();
    assert!(matches!(err, IoError::Zip(_)), "{err:?}");
}
