//! Building a [`Table`] from a [`RowSource`].
//!
//! Only the first row is inspected to establish the schema. Every later row is checked against
//! it, and columns are accumulated locally so a failure never leaves a half-built table behind.

use std::collections::HashSet;
use std::sync::Arc;

use crate::error::{TableError, TableResult};
use crate::row::{Record, Row, RowSource};
use crate::store::{validate_field_names, ColumnStore};
use crate::table::Table;
use crate::value::Value;

/// Options for [`Table::from_rows_with`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FromRowsOptions {
    /// Field names.
    ///
    /// Mandatory for positional rows. For keyed or self-describing rows this is a projection:
    /// only the listed fields are kept, in the listed order, and each must exist in the rows.
    pub fields: Option<Vec<String>>,
    /// Value used for keys missing from a keyed row, instead of failing.
    pub fill_missing: Option<Value>,
}

impl FromRowsOptions {
    pub fn with_fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: Some(fields.into_iter().map(Into::into).collect()),
            fill_missing: None,
        }
    }

    pub fn fill_missing(mut self, value: impl Into<Value>) -> Self {
        self.fill_missing = Some(value.into());
        self
    }
}

impl Table {
    /// Build a table from a sequence of rows.
    pub fn from_rows(source: RowSource<'_>) -> TableResult<Self> {
        Self::from_rows_with(source, FromRowsOptions::default())
    }

    pub fn from_rows_with(source: RowSource<'_>, options: FromRowsOptions) -> TableResult<Self> {
        let store = match source {
            RowSource::Keyed(rows) => build_keyed(rows, options)?,
            RowSource::Positional(rows) => build_positional(rows, options)?,
            RowSource::Described(rows) => build_described(rows, options)?,
        };
        Ok(Table::from_store(store))
    }
}

fn empty_store(fields: Option<Vec<String>>) -> TableResult<ColumnStore> {
    let fields = fields.unwrap_or_default();
    validate_field_names(fields.iter().map(String::as_str))?;
    let columns = vec![Vec::new(); fields.len()];
    Ok(ColumnStore::from_parts(fields, columns))
}

/// Apply an explicit field list as a projection over the inferred schema.
fn project(inferred: &[String], explicit: Option<Vec<String>>) -> TableResult<Vec<String>> {
    validate_field_names(inferred.iter().map(String::as_str))?;
    let Some(explicit) = explicit else {
        return Ok(inferred.to_vec());
    };
    validate_field_names(explicit.iter().map(String::as_str))?;
    if let Some(field) = explicit.iter().find(|f| !inferred.contains(f)) {
        return Err(TableError::UnknownField {
            field: field.clone(),
        });
    }
    Ok(explicit)
}

fn describe_fields<'a>(fields: impl IntoIterator<Item = &'a str>) -> String {
    let names: Vec<&str> = fields.into_iter().collect();
    format!("fields {names:?}")
}

fn build_keyed(
    mut rows: Box<dyn Iterator<Item = Record> + '_>,
    options: FromRowsOptions,
) -> TableResult<ColumnStore> {
    let Some(first) = rows.next() else {
        return empty_store(options.fields);
    };

    let inferred: Vec<String> = first.keys().map(str::to_owned).collect();
    let selected = project(&inferred, options.fields)?;
    let known: HashSet<&str> = inferred.iter().map(String::as_str).collect();
    let fill = options.fill_missing;

    let mut columns: Vec<Vec<Value>> = vec![Vec::new(); selected.len()];
    for (idx, record) in std::iter::once(first).chain(rows).enumerate() {
        let extra = record.keys().any(|k| !known.contains(k));
        let missing = record.len() != inferred.len();
        if extra || (missing && fill.is_none()) {
            return Err(TableError::RowShape {
                row: idx,
                expected: describe_fields(inferred.iter().map(String::as_str)),
                actual: describe_fields(record.keys()),
            });
        }
        for (field, column) in selected.iter().zip(columns.iter_mut()) {
            let value = match (record.get(field), &fill) {
                (Some(v), _) => v.clone(),
                (None, Some(fill)) => fill.clone(),
                // Unreachable: key sets were checked above.
                (None, None) => Value::Null,
            };
            column.push(value);
        }
    }

    Ok(ColumnStore::from_parts(selected, columns))
}

fn build_positional(
    rows: Box<dyn Iterator<Item = Vec<Value>> + '_>,
    options: FromRowsOptions,
) -> TableResult<ColumnStore> {
    let fields = options.fields.ok_or(TableError::MissingFieldNames)?;
    validate_field_names(fields.iter().map(String::as_str))?;

    let mut columns: Vec<Vec<Value>> = vec![Vec::new(); fields.len()];
    for (idx, row) in rows.enumerate() {
        if row.len() != fields.len() {
            return Err(TableError::RowShape {
                row: idx,
                expected: format!("{} values", fields.len()),
                actual: format!("{} values", row.len()),
            });
        }
        for (column, value) in columns.iter_mut().zip(row) {
            column.push(value);
        }
    }

    Ok(ColumnStore::from_parts(fields, columns))
}

fn build_described(
    mut rows: Box<dyn Iterator<Item = Row> + '_>,
    options: FromRowsOptions,
) -> TableResult<ColumnStore> {
    let Some(first) = rows.next() else {
        return empty_store(options.fields);
    };

    let inferred: Arc<[String]> = Arc::clone(first.shared_fields());
    let selected = project(&inferred, options.fields)?;
    let positions: Vec<usize> = selected
        .iter()
        .filter_map(|f| first.position(f))
        .collect();

    let mut columns: Vec<Vec<Value>> = vec![Vec::new(); selected.len()];
    for (idx, row) in std::iter::once(first).chain(rows).enumerate() {
        let same_layout =
            Arc::ptr_eq(row.shared_fields(), &inferred) || row.fields() == &inferred[..];
        if same_layout {
            for (column, &pos) in columns.iter_mut().zip(&positions) {
                column.push(row.values()[pos].clone());
            }
            continue;
        }

        let same_set = row.len() == inferred.len()
            && inferred.iter().all(|f| row.position(f).is_some());
        if !same_set {
            return Err(TableError::RowShape {
                row: idx,
                expected: describe_fields(inferred.iter().map(String::as_str)),
                actual: describe_fields(row.fields().iter().map(String::as_str)),
            });
        }
        for (field, column) in selected.iter().zip(columns.iter_mut()) {
            column.push(row.get(field)?.clone());
        }
    }

    Ok(ColumnStore::from_parts(selected, columns))
}
