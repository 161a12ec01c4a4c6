use pretty_assertions::assert_eq;
use tabula_table::{
    AggInput, Aggregation, ErrorKind, GroupKey, Record, RowSource, Table, TableError, TableResult,
    Value,
};

fn salaries() -> Table {
    let rows = vec![
        Record::new().with("dept", "x").with("name", "ann").with("sal", 10),
        Record::new().with("dept", "y").with("name", "bob").with("sal", 5),
        Record::new().with("dept", "x").with("name", "cid").with("sal", 20),
    ];
    Table::from_rows(RowSource::keyed(rows)).unwrap()
}

fn summary(table: &Table) -> TableResult<Table> {
    Ok(table
        .group_by(&["dept"])?
        .agg(Aggregation::sum(), &["sal"])?
        .agg_as("n", Aggregation::len(), &[])?
        .collect())
}

#[test]
fn sum_and_count_per_department() {
    let result = summary(&salaries()).unwrap();

    let expected = Table::from_pairs([
        ("dept", vec![Value::from("x"), Value::from("y")]),
        ("sum(sal)", vec![Value::Integer(30), Value::Integer(5)]),
        ("n", vec![Value::Integer(2), Value::Integer(1)]),
    ])
    .unwrap();
    assert_eq!(result, expected);
}

#[test]
fn groups_keep_first_seen_order_and_row_order() {
    let grouped = salaries().group_by(&["dept"]).unwrap();
    assert_eq!(grouped.len(), 2);
    assert_eq!(
        grouped.keys(),
        [GroupKey::Single(Value::from("x")), GroupKey::Single(Value::from("y"))]
    );

    let (key, rows) = grouped.groups().next().unwrap();
    assert_eq!(key.values(), [Value::from("x")]);
    let names: Vec<&Value> = rows.iter().map(|r| r.get("name").unwrap()).collect();
    assert_eq!(names, [&Value::from("ann"), &Value::from("cid")]);
}

#[test]
fn multi_field_keys_are_tuples() {
    let table = Table::from_pairs([
        ("a", vec![Value::Integer(1), Value::Integer(1), Value::Integer(2)]),
        ("b", vec![Value::from("p"), Value::from("p"), Value::from("q")]),
        ("v", vec![Value::Number(0.5), Value::Number(1.5), Value::Number(4.0)]),
    ])
    .unwrap();

    let result = table
        .group_by(&["a", "b"])
        .and_then(|g| g.agg(Aggregation::mean(), &["v"]))
        .unwrap()
        .collect();

    assert_eq!(result.fields(), ["a", "b", "mean(v)"]);
    assert_eq!(result.column("a").unwrap(), [Value::Integer(1), Value::Integer(2)]);
    assert_eq!(result.column("b").unwrap(), [Value::from("p"), Value::from("q")]);
    assert_eq!(result.column("mean(v)").unwrap(), [Value::Number(1.0), Value::Number(4.0)]);
}

#[test]
fn aggregation_input_shape_follows_field_count() {
    let shape = Aggregation::named("shape", |input| {
        Ok(Value::from(match input {
            AggInput::Rows(_) => "rows",
            AggInput::Values(_) => "values",
            AggInput::Tuples(_) => "tuples",
        }))
    });
    let grouped = salaries()
        .group_by(&["dept"])
        .and_then(|g| g.agg(shape, &[]))
        .unwrap();
    let names: Vec<&str> = grouped.output_fields().collect();
    assert_eq!(names, ["shape()"]);

    let table = grouped.collect();
    assert_eq!(table.column("shape()").unwrap()[0], Value::from("rows"));
}

#[test]
fn anonymous_aggregations_are_numbered() {
    let widest = || {
        Aggregation::anonymous(|input| match input {
            AggInput::Tuples(tuples) => Ok(Value::from(tuples.len())),
            _ => Ok(Value::Null),
        })
    };
    let result = salaries()
        .group_by(&["dept"])
        .and_then(|g| g.agg(widest(), &["name", "sal"]))
        .and_then(|g| g.agg(widest(), &["sal"]))
        .unwrap()
        .collect();

    assert_eq!(
        result.fields(),
        ["dept", "lambda0000(name,sal)", "lambda0001(sal)"]
    );
}

#[test]
fn builtin_aggregations() {
    let result = salaries()
        .group_by(&["dept"])
        .and_then(|g| g.agg(Aggregation::min(), &["sal"]))
        .and_then(|g| g.agg(Aggregation::max(), &["sal"]))
        .and_then(|g| g.agg(Aggregation::concat("+"), &["name"]))
        .and_then(|g| g.agg(Aggregation::first(), &["name"]))
        .and_then(|g| g.agg(Aggregation::last(), &["name"]))
        .and_then(|g| g.agg(Aggregation::count_distinct(), &["dept"]))
        .unwrap()
        .collect();

    let row = result.row(0).unwrap();
    assert_eq!(row.get("min(sal)").unwrap(), &Value::Integer(10));
    assert_eq!(row.get("max(sal)").unwrap(), &Value::Integer(20));
    assert_eq!(row.get("concat(name)").unwrap(), &Value::from("ann+cid"));
    assert_eq!(row.get("first(name)").unwrap(), &Value::from("ann"));
    assert_eq!(row.get("last(name)").unwrap(), &Value::from("cid"));
    assert_eq!(row.get("count_distinct(dept)").unwrap(), &Value::Integer(1));
}

#[test]
fn sum_widens_to_number_on_mixed_input() {
    let table = Table::from_pairs([
        ("k", vec![Value::Integer(0), Value::Integer(0)]),
        ("v", vec![Value::Integer(1), Value::Number(0.5)]),
    ])
    .unwrap();
    let result = table
        .group_by(&["k"])
        .and_then(|g| g.agg(Aggregation::sum(), &["v"]))
        .unwrap()
        .collect();
    assert_eq!(result.column("sum(v)").unwrap(), [Value::Number(1.5)]);
}

#[test]
fn sum_of_text_is_a_type_error() {
    let err = salaries()
        .group_by(&["dept"])
        .and_then(|g| g.agg(Aggregation::sum(), &["name"]))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Type);
}

#[test]
fn invalid_group_fields() {
    let table = salaries();
    assert_eq!(table.group_by(&[]).unwrap_err().kind(), ErrorKind::Argument);
    assert_eq!(
        table.group_by(&["nope"]).unwrap_err().kind(),
        ErrorKind::ColumnNotFound
    );
    assert_eq!(
        table
            .group_by(&["dept"])
            .and_then(|g| g.agg(Aggregation::sum(), &["nope"]))
            .unwrap_err()
            .kind(),
        ErrorKind::ColumnNotFound
    );
}

#[test]
fn output_name_collisions_are_rejected() {
    let table = salaries();
    let err = table
        .group_by(&["dept"])
        .and_then(|g| g.agg(Aggregation::len(), &[]))
        .and_then(|g| g.agg(Aggregation::len(), &[]))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Argument);

    let err = table
        .group_by(&["dept"])
        .and_then(|g| g.agg_as("dept", Aggregation::len(), &[]))
        .unwrap_err();
    assert!(matches!(err, TableError::Argument(_)), "{err:?}");
}

#[test]
fn mean_of_empty_input_is_division_by_zero() {
    let err = Aggregation::mean()
        .apply(&AggInput::Values(Vec::new()))
        .unwrap_err();
    assert_eq!(err, TableError::DivisionByZero { operation: "mean" });
    assert_eq!(err.kind(), ErrorKind::Arithmetic);
}

#[test]
fn grouping_an_empty_table() {
    let table = Table::with_fields(["k", "v"]).unwrap();
    let result = table
        .group_by(&["k"])
        .and_then(|g| g.agg(Aggregation::sum(), &["v"]))
        .unwrap()
        .collect();
    assert_eq!(result.fields(), ["k", "sum(v)"]);
    assert!(result.is_empty());
}
