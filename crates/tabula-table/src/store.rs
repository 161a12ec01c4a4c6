use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::error::{TableError, TableResult};
use crate::value::Value;

/// Ordered mapping of field name to column.
///
/// The store is the single source of truth for a table's contents:
/// - `fields[i]` names `columns[i]`; field order is the display/export order,
/// - `index` maps a field name back to its position,
/// - `shared` is a copy of `fields` handed to every row built before the next schema change,
/// - every column has the same length.
#[derive(Clone, Debug)]
pub struct ColumnStore {
    fields: Vec<String>,
    columns: Vec<Vec<Value>>,
    index: HashMap<String, usize>,
    shared: Arc<[String]>,
}

impl Default for ColumnStore {
    fn default() -> Self {
        Self {
            fields: Vec::new(),
            columns: Vec::new(),
            index: HashMap::new(),
            shared: Arc::from(Vec::new()),
        }
    }
}

pub(crate) fn validate_field_name(field: &str) -> TableResult<()> {
    if field.is_empty() {
        return Err(TableError::InvalidFieldName {
            field: field.to_owned(),
        });
    }
    Ok(())
}

pub(crate) fn validate_field_names<'a>(
    fields: impl IntoIterator<Item = &'a str>,
) -> TableResult<()> {
    let mut seen = HashSet::new();
    for field in fields {
        validate_field_name(field)?;
        if !seen.insert(field) {
            return Err(TableError::DuplicateField {
                field: field.to_owned(),
            });
        }
    }
    Ok(())
}

impl ColumnStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from already-validated parts.
    ///
    /// Callers guarantee unique, non-empty names and equal column lengths.
    pub(crate) fn from_parts(fields: Vec<String>, columns: Vec<Vec<Value>>) -> Self {
        debug_assert_eq!(fields.len(), columns.len());
        debug_assert!(columns.windows(2).all(|w| w[0].len() == w[1].len()));
        let mut store = Self {
            fields,
            columns,
            ..Self::default()
        };
        store.reindex();
        store
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.columns.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.fields.len()
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// The field list shared by rows built from the current schema.
    pub(crate) fn shared_fields(&self) -> &Arc<[String]> {
        &self.shared
    }

    pub fn position(&self, field: &str) -> Option<usize> {
        self.index.get(field).copied()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.index.contains_key(field)
    }

    pub fn column(&self, field: &str) -> Option<&[Value]> {
        let idx = self.position(field)?;
        Some(&self.columns[idx])
    }

    pub fn column_mut(&mut self, field: &str) -> Option<&mut [Value]> {
        let idx = self.position(field)?;
        Some(&mut self.columns[idx])
    }

    pub fn column_at(&self, idx: usize) -> Option<&[Value]> {
        self.columns.get(idx).map(Vec::as_slice)
    }

    pub fn columns(&self) -> &[Vec<Value>] {
        &self.columns
    }

    pub fn value(&self, row: usize, col: usize) -> Option<&Value> {
        self.columns.get(col)?.get(row)
    }

    /// Insert or replace a column.
    ///
    /// A replaced column keeps its position; a new one is appended. The first column of an
    /// empty store fixes the row count.
    pub fn insert(&mut self, field: impl Into<String>, column: Vec<Value>) -> TableResult<()> {
        let field = field.into();
        validate_field_name(&field)?;

        let replacing = self.position(&field);
        let others = self.width() - usize::from(replacing.is_some());
        if others > 0 && column.len() != self.len() {
            return Err(TableError::LengthMismatch {
                what: "column",
                expected: self.len(),
                actual: column.len(),
            });
        }

        match replacing {
            Some(idx) => self.columns[idx] = column,
            None => {
                self.index.insert(field.clone(), self.fields.len());
                self.fields.push(field);
                self.columns.push(column);
                self.shared = Arc::from(self.fields.as_slice());
            }
        }
        Ok(())
    }

    pub fn remove(&mut self, field: &str) -> Option<Vec<Value>> {
        let idx = self.index.remove(field)?;
        self.fields.remove(idx);
        let column = self.columns.remove(idx);
        self.reindex();
        Some(column)
    }

    pub fn rename(&mut self, old: &str, new: impl Into<String>) -> TableResult<()> {
        let new = new.into();
        let idx = self
            .position(old)
            .ok_or_else(|| TableError::column_not_found(old))?;
        validate_field_name(&new)?;
        if old == new {
            return Ok(());
        }
        if self.contains(&new) {
            return Err(TableError::DuplicateField { field: new });
        }
        self.index.remove(old);
        self.index.insert(new.clone(), idx);
        self.fields[idx] = new;
        self.shared = Arc::from(self.fields.as_slice());
        Ok(())
    }

    /// Replace every field name positionally.
    pub fn set_fields(&mut self, names: Vec<String>) -> TableResult<()> {
        if names.len() != self.width() {
            return Err(TableError::LengthMismatch {
                what: "field list",
                expected: self.width(),
                actual: names.len(),
            });
        }
        validate_field_names(names.iter().map(String::as_str))?;
        self.fields = names;
        self.reindex();
        Ok(())
    }

    pub fn reorder(&mut self, order: &[String]) -> TableResult<()> {
        let same_set = order.len() == self.width()
            && order.iter().all(|f| self.contains(f))
            && order.iter().collect::<HashSet<_>>().len() == order.len();
        if !same_set {
            return Err(TableError::FieldSetMismatch {
                operation: "reorder",
                expected: self.fields.clone(),
                actual: order.to_vec(),
            });
        }

        let mut old: Vec<Option<Vec<Value>>> =
            std::mem::take(&mut self.columns).into_iter().map(Some).collect();
        let mut columns = Vec::with_capacity(order.len());
        for field in order {
            let idx = self.index[field.as_str()];
            columns.push(old[idx].take().unwrap_or_default());
        }
        self.columns = columns;
        self.fields = order.to_vec();
        self.reindex();
        Ok(())
    }

    /// Append one row of values in field order. Callers check the width.
    pub(crate) fn push_row(&mut self, values: Vec<Value>) {
        debug_assert_eq!(values.len(), self.width());
        for (column, value) in self.columns.iter_mut().zip(values) {
            column.push(value);
        }
    }

    /// Append `other`'s rows, matching columns by name. Callers check the field sets.
    pub(crate) fn extend_by_name(&mut self, other: &ColumnStore) {
        for (field, column) in self.fields.iter().zip(self.columns.iter_mut()) {
            if let Some(values) = other.column(field) {
                column.extend_from_slice(values);
            }
        }
    }

    /// Copy the given rows (in the given order) into a new store with the same fields.
    pub(crate) fn take_rows(&self, rows: &[usize]) -> ColumnStore {
        let columns = self
            .columns
            .iter()
            .map(|column| rows.iter().map(|&r| column[r].clone()).collect())
            .collect();
        ColumnStore::from_parts(self.fields.clone(), columns)
    }

    /// Reorder every column in place by a row permutation.
    pub(crate) fn permute_rows(&mut self, order: &[usize]) {
        for column in &mut self.columns {
            let mut taken: Vec<Option<Value>> =
                std::mem::take(column).into_iter().map(Some).collect();
            *column = order
                .iter()
                .map(|&r| taken[r].take().unwrap_or_default())
                .collect();
        }
    }

    fn reindex(&mut self) {
        self.index = self
            .fields
            .iter()
            .enumerate()
            .map(|(idx, f)| (f.clone(), idx))
            .collect();
        self.shared = Arc::from(self.fields.as_slice());
    }
}
