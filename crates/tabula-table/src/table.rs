use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::ops::{Bound, RangeBounds};
use std::sync::Arc;

use rand::Rng;

use crate::error::{TableError, TableResult};
use crate::filter::Condition;
use crate::row::{Row, RowInput};
use crate::slice::RowSlice;
use crate::store::{validate_field_names, ColumnStore};
use crate::value::Value;

/// Column contents handed to [`Table::set_column`].
#[derive(Clone, Debug, PartialEq)]
pub enum ColumnInput {
    /// One value per row.
    Values(Vec<Value>),
    /// A single value repeated for every row.
    Scalar(Value),
}

impl From<Vec<Value>> for ColumnInput {
    fn from(value: Vec<Value>) -> Self {
        ColumnInput::Values(value)
    }
}

impl From<Value> for ColumnInput {
    fn from(value: Value) -> Self {
        ColumnInput::Scalar(value)
    }
}

impl<V: Into<Value>> FromIterator<V> for ColumnInput {
    fn from_iter<T: IntoIterator<Item = V>>(iter: T) -> Self {
        ColumnInput::Values(iter.into_iter().map(Into::into).collect())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

/// An in-memory, column-oriented table.
///
/// Every column has the same length; field order is significant. Operations documented as
/// returning a new table never share storage with `self`.
#[derive(Clone, Debug, Default)]
pub struct Table {
    store: ColumnStore,
}

impl PartialEq for Table {
    fn eq(&self, other: &Self) -> bool {
        self.store.fields() == other.store.fields() && self.store.columns() == other.store.columns()
    }
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_store(store: ColumnStore) -> Self {
        Self { store }
    }

    /// An empty table with the given fields and no rows.
    pub fn with_fields<I, S>(fields: I) -> TableResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fields: Vec<String> = fields.into_iter().map(Into::into).collect();
        validate_field_names(fields.iter().map(String::as_str))?;
        let columns = vec![Vec::new(); fields.len()];
        Ok(Self::from_store(ColumnStore::from_parts(fields, columns)))
    }

    pub fn from_columns(fields: Vec<String>, columns: Vec<Vec<Value>>) -> TableResult<Self> {
        if fields.len() != columns.len() {
            return Err(TableError::LengthMismatch {
                what: "column list",
                expected: fields.len(),
                actual: columns.len(),
            });
        }
        Self::from_pairs(fields.into_iter().zip(columns))
    }

    /// Build a table from `(field, column)` pairs, keeping their order.
    pub fn from_pairs<I, S>(pairs: I) -> TableResult<Self>
    where
        I: IntoIterator<Item = (S, Vec<Value>)>,
        S: Into<String>,
    {
        let mut store = ColumnStore::new();
        for (field, column) in pairs {
            let field = field.into();
            if store.contains(&field) {
                return Err(TableError::DuplicateField { field });
            }
            store.insert(field, column)?;
        }
        Ok(Self::from_store(store))
    }

    pub fn store(&self) -> &ColumnStore {
        &self.store
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Number of fields.
    pub fn width(&self) -> usize {
        self.store.width()
    }

    pub fn fields(&self) -> &[String] {
        self.store.fields()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.store.contains(field)
    }

    pub(crate) fn shared_fields(&self) -> Arc<[String]> {
        Arc::clone(self.store.shared_fields())
    }

    pub fn column(&self, field: &str) -> TableResult<&[Value]> {
        self.store
            .column(field)
            .ok_or_else(|| TableError::column_not_found(field))
    }

    /// Live access to a column's values.
    ///
    /// Elements may be modified in place; the column length cannot change through this handle.
    pub fn column_mut(&mut self, field: &str) -> TableResult<&mut [Value]> {
        self.store
            .column_mut(field)
            .ok_or_else(|| TableError::column_not_found(field))
    }

    pub fn column_at(&self, idx: usize) -> TableResult<&[Value]> {
        self.store.column_at(idx).ok_or(TableError::IndexOutOfRange {
            what: "column",
            index: idx,
            len: self.width(),
        })
    }

    /// Several columns, in the requested order.
    pub fn columns(&self, fields: &[&str]) -> TableResult<Vec<&[Value]>> {
        fields.iter().map(|f| self.column(f)).collect()
    }

    pub fn row(&self, idx: usize) -> TableResult<Row> {
        if idx >= self.len() {
            return Err(TableError::IndexOutOfRange {
                what: "row",
                index: idx,
                len: self.len(),
            });
        }
        Ok(self.row_unchecked(idx, self.shared_fields()))
    }

    fn row_unchecked(&self, idx: usize, fields: Arc<[String]>) -> Row {
        let values = self
            .store
            .columns()
            .iter()
            .map(|column| column[idx].clone())
            .collect();
        Row::from_parts(fields, values)
    }

    pub fn iter(&self) -> Rows<'_> {
        Rows {
            table: self,
            fields: self.shared_fields(),
            next: 0,
        }
    }

    pub fn slice(&self, slice: RowSlice) -> TableResult<Table> {
        let rows = slice.indices(self.len())?;
        Ok(Self::from_store(self.store.take_rows(&rows)))
    }

    /// Contiguous rows; bounds past the end are clamped.
    pub fn slice_range(&self, range: impl RangeBounds<usize>) -> Table {
        let len = self.len();
        let start = match range.start_bound() {
            Bound::Included(&s) => s,
            Bound::Excluded(&s) => s.saturating_add(1),
            Bound::Unbounded => 0,
        }
        .min(len);
        let end = match range.end_bound() {
            Bound::Included(&e) => e.saturating_add(1),
            Bound::Excluded(&e) => e,
            Bound::Unbounded => len,
        }
        .min(len);
        let rows: Vec<usize> = (start..end.max(start)).collect();
        Self::from_store(self.store.take_rows(&rows))
    }

    /// Insert or replace a column. A scalar is broadcast to the current length.
    pub fn set_column(
        &mut self,
        field: impl Into<String>,
        input: impl Into<ColumnInput>,
    ) -> TableResult<()> {
        let values = match input.into() {
            ColumnInput::Values(values) => values,
            ColumnInput::Scalar(value) => vec![value; self.len()],
        };
        self.store.insert(field, values)
    }

    pub fn append(&mut self, row: impl Into<RowInput>) -> TableResult<()> {
        match row.into() {
            RowInput::Keyed(record) => {
                if self.width() == 0 {
                    validate_field_names(record.keys())?;
                    let (fields, columns): (Vec<String>, Vec<Vec<Value>>) = record
                        .into_entries()
                        .into_iter()
                        .map(|(f, v)| (f, vec![v]))
                        .unzip();
                    self.store = ColumnStore::from_parts(fields, columns);
                    return Ok(());
                }
                let matches = record.len() == self.width()
                    && self.fields().iter().all(|f| record.contains_key(f));
                if !matches {
                    return Err(TableError::FieldSetMismatch {
                        operation: "append",
                        expected: self.fields().to_vec(),
                        actual: record.keys().map(str::to_owned).collect(),
                    });
                }
                let values = self
                    .fields()
                    .iter()
                    .map(|f| record.get(f).cloned().unwrap_or_default())
                    .collect();
                self.store.push_row(values);
            }
            RowInput::Positional(values) => {
                if self.width() == 0 {
                    return Err(TableError::NoSchema);
                }
                if values.len() != self.width() {
                    return Err(TableError::RowShape {
                        row: self.len(),
                        expected: format!("{} values", self.width()),
                        actual: format!("{} values", values.len()),
                    });
                }
                self.store.push_row(values);
            }
            RowInput::Described(row) => {
                if self.width() == 0 {
                    validate_field_names(row.fields().iter().map(String::as_str))?;
                    let fields = row.fields().to_vec();
                    let columns = row.into_values().into_iter().map(|v| vec![v]).collect();
                    self.store = ColumnStore::from_parts(fields, columns);
                    return Ok(());
                }
                let positions: Option<Vec<usize>> =
                    self.fields().iter().map(|f| row.position(f)).collect();
                let positions = match positions {
                    Some(p) if row.len() == self.width() => p,
                    _ => {
                        return Err(TableError::FieldSetMismatch {
                            operation: "append",
                            expected: self.fields().to_vec(),
                            actual: row.fields().to_vec(),
                        })
                    }
                };
                let values = positions.iter().map(|&p| row.values()[p].clone()).collect();
                self.store.push_row(values);
            }
        }
        Ok(())
    }

    pub fn rename(&mut self, old: &str, new: impl Into<String>) -> TableResult<()> {
        self.store.rename(old, new)
    }

    /// Replace every field name positionally.
    pub fn set_fields<I, S>(&mut self, names: I) -> TableResult<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.store
            .set_fields(names.into_iter().map(Into::into).collect())
    }

    pub fn reorder<S: AsRef<str>>(&mut self, order: &[S]) -> TableResult<()> {
        let order: Vec<String> = order.iter().map(|s| s.as_ref().to_owned()).collect();
        self.store.reorder(&order)
    }

    /// Remove a column and return its values.
    pub fn delete(&mut self, field: &str) -> TableResult<Vec<Value>> {
        self.store
            .remove(field)
            .ok_or_else(|| TableError::column_not_found(field))
    }

    /// Evaluate `f` on the selected fields of every row.
    pub fn apply<F>(&self, fields: &[&str], mut f: F) -> TableResult<Vec<Value>>
    where
        F: FnMut(&[&Value]) -> Value,
    {
        let columns = self.columns(fields)?;
        let mut args: Vec<&Value> = Vec::with_capacity(columns.len());
        let mut out = Vec::with_capacity(self.len());
        for idx in 0..self.len() {
            args.clear();
            args.extend(columns.iter().map(|c| &c[idx]));
            out.push(f(&args));
        }
        Ok(out)
    }

    /// Evaluate `f` on every row.
    pub fn apply_rows<F>(&self, f: F) -> Vec<Value>
    where
        F: FnMut(Row) -> Value,
    {
        self.iter().map(f).collect()
    }

    /// Overwrite a column with `f` applied to each of its values.
    pub fn map_column<F>(&mut self, field: &str, mut f: F) -> TableResult<()>
    where
        F: FnMut(&Value) -> Value,
    {
        for value in self.column_mut(field)? {
            *value = f(value);
        }
        Ok(())
    }

    /// Keep the rows whose mask entry is `true`.
    pub fn mask(&self, mask: &[bool]) -> TableResult<Table> {
        if mask.len() != self.len() {
            return Err(TableError::LengthMismatch {
                what: "mask",
                expected: self.len(),
                actual: mask.len(),
            });
        }
        let rows: Vec<usize> = mask
            .iter()
            .enumerate()
            .filter_map(|(idx, keep)| keep.then_some(idx))
            .collect();
        Ok(Self::from_store(self.store.take_rows(&rows)))
    }

    pub fn where_field(
        &self,
        field: &str,
        condition: Condition<'_>,
        negate: bool,
    ) -> TableResult<Table> {
        let mask: Vec<bool> = self
            .column(field)?
            .iter()
            .map(|v| condition.matches(v) != negate)
            .collect();
        self.mask(&mask)
    }

    pub fn where_eq(&self, field: &str, value: impl Into<Value>) -> TableResult<Table> {
        self.where_field(field, Condition::equals(value), false)
    }

    pub fn where_ne(&self, field: &str, value: impl Into<Value>) -> TableResult<Table> {
        self.where_field(field, Condition::equals(value), true)
    }

    pub fn where_in<I, V>(&self, field: &str, values: I) -> TableResult<Table>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.where_field(field, Condition::one_of(values), false)
    }

    pub fn where_not_in<I, V>(&self, field: &str, values: I) -> TableResult<Table>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.where_field(field, Condition::one_of(values), true)
    }

    pub fn where_fn(&self, field: &str, f: impl Fn(&Value) -> bool) -> TableResult<Table> {
        self.where_field(field, Condition::predicate(f), false)
    }

    /// Keep rows for which `f(row) != negate`.
    pub fn where_rows(&self, f: impl Fn(&Row) -> bool, negate: bool) -> Table {
        let mask: Vec<bool> = self.iter().map(|row| f(&row) != negate).collect();
        let rows: Vec<usize> = mask
            .iter()
            .enumerate()
            .filter_map(|(idx, keep)| keep.then_some(idx))
            .collect();
        Self::from_store(self.store.take_rows(&rows))
    }

    /// Rows whose value is strictly greater than `value`. Incomparable values are an error.
    pub fn where_greater(&self, field: &str, value: impl Into<Value>) -> TableResult<Table> {
        self.where_ordering(field, &value.into(), Ordering::Greater)
    }

    /// Rows whose value is strictly less than `value`. Incomparable values are an error.
    pub fn where_less(&self, field: &str, value: impl Into<Value>) -> TableResult<Table> {
        self.where_ordering(field, &value.into(), Ordering::Less)
    }

    fn where_ordering(&self, field: &str, value: &Value, wanted: Ordering) -> TableResult<Table> {
        let mask = self
            .column(field)?
            .iter()
            .map(|v| Ok(v.try_cmp(value)? == wanted))
            .collect::<TableResult<Vec<bool>>>()?;
        self.mask(&mask)
    }

    /// A sorted copy. The sort is stable in both directions.
    pub fn sort(&self, field: &str, order: SortOrder) -> TableResult<Table> {
        let permutation = self.sort_permutation(field, None, order)?;
        Ok(Self::from_store(self.store.take_rows(&permutation)))
    }

    pub fn sort_by_key<F>(&self, field: &str, key: F, order: SortOrder) -> TableResult<Table>
    where
        F: Fn(&Value) -> Value,
    {
        let key: &dyn Fn(&Value) -> Value = &key;
        let permutation = self.sort_permutation(field, Some(key), order)?;
        Ok(Self::from_store(self.store.take_rows(&permutation)))
    }

    pub fn sort_in_place(&mut self, field: &str, order: SortOrder) -> TableResult<&mut Self> {
        let permutation = self.sort_permutation(field, None, order)?;
        self.store.permute_rows(&permutation);
        Ok(self)
    }

    pub fn sort_by_key_in_place<F>(
        &mut self,
        field: &str,
        key: F,
        order: SortOrder,
    ) -> TableResult<&mut Self>
    where
        F: Fn(&Value) -> Value,
    {
        let key: &dyn Fn(&Value) -> Value = &key;
        let permutation = self.sort_permutation(field, Some(key), order)?;
        self.store.permute_rows(&permutation);
        Ok(self)
    }

    fn sort_permutation(
        &self,
        field: &str,
        key: Option<&dyn Fn(&Value) -> Value>,
        order: SortOrder,
    ) -> TableResult<Vec<usize>> {
        let column = self.column(field)?;
        let keys: Vec<Cow<'_, Value>> = match key {
            Some(key) => column.iter().map(|v| Cow::Owned(key(v))).collect(),
            None => column.iter().map(Cow::Borrowed).collect(),
        };

        let mut permutation: Vec<usize> = (0..keys.len()).collect();
        let mut failure: Option<TableError> = None;
        permutation.sort_by(|&a, &b| {
            if failure.is_some() {
                return Ordering::Equal;
            }
            match keys[a].try_cmp(&keys[b]) {
                Ok(ord) if order == SortOrder::Descending => ord.reverse(),
                Ok(ord) => ord,
                Err(err) => {
                    failure = Some(err);
                    Ordering::Equal
                }
            }
        });
        match failure {
            Some(err) => Err(err),
            None => Ok(permutation),
        }
    }

    /// `self`'s rows followed by `other`'s. Field sets must match; order follows `self`.
    pub fn concat(&self, other: &Table) -> TableResult<Table> {
        let mut out = self.clone();
        out.concat_in_place(other)?;
        Ok(out)
    }

    pub fn concat_in_place(&mut self, other: &Table) -> TableResult<&mut Self> {
        if self.width() == 0 {
            *self = other.clone();
            return Ok(self);
        }
        if other.width() == 0 {
            return Ok(self);
        }
        let same_set =
            self.width() == other.width() && other.fields().iter().all(|f| self.contains(f));
        if !same_set {
            return Err(TableError::FieldSetMismatch {
                operation: "concat",
                expected: self.fields().to_vec(),
                actual: other.fields().to_vec(),
            });
        }
        self.store.extend_by_name(&other.store);
        Ok(self)
    }

    /// Inner join on `on`.
    ///
    /// Each row of `self` is combined with every row of `other` sharing its `on` value; rows
    /// without a match are dropped. Output fields are `self`'s followed by `other`'s remaining
    /// fields, and `other`'s values win where both tables have the same field.
    pub fn join(&self, other: &Table, on: &str) -> TableResult<Table> {
        let left_keys = self.column(on)?;
        let right_keys = other.column(on)?;

        let mut matches: HashMap<&Value, Vec<usize>> = HashMap::new();
        for (row, key) in right_keys.iter().enumerate() {
            matches.entry(key).or_default().push(row);
        }

        enum Source<'t> {
            Left(&'t [Value]),
            Right(&'t [Value]),
        }
        let mut fields: Vec<String> = Vec::with_capacity(self.width() + other.width());
        let mut sources: Vec<Source<'_>> = Vec::with_capacity(fields.capacity());
        for (field, column) in self.fields().iter().zip(self.store.columns()) {
            fields.push(field.clone());
            sources.push(match other.store.column(field) {
                Some(right) => Source::Right(right),
                None => Source::Left(column),
            });
        }
        for (field, column) in other.fields().iter().zip(other.store.columns()) {
            if !self.contains(field) {
                fields.push(field.clone());
                sources.push(Source::Right(column));
            }
        }

        let mut columns: Vec<Vec<Value>> = vec![Vec::new(); fields.len()];
        for (left, key) in left_keys.iter().enumerate() {
            let Some(rights) = matches.get(key) else {
                continue;
            };
            for &right in rights {
                for (column, source) in columns.iter_mut().zip(&sources) {
                    column.push(match source {
                        Source::Left(values) => values[left].clone(),
                        Source::Right(values) => values[right].clone(),
                    });
                }
            }
        }

        let store = ColumnStore::from_parts(fields, columns);
        log::debug!(
            "join on {on}: {} x {} rows -> {} rows",
            self.len(),
            other.len(),
            store.len()
        );
        Ok(Self::from_store(store))
    }

    /// Unique values of a field, in first-seen order.
    pub fn distinct(&self, field: &str) -> TableResult<Vec<Value>> {
        let mut seen = HashSet::new();
        Ok(self
            .column(field)?
            .iter()
            .filter(|v| seen.insert(*v))
            .cloned()
            .collect())
    }

    /// Values of a field whose `key` has not been seen before, in first-seen order.
    pub fn distinct_by<F>(&self, field: &str, key: F) -> TableResult<Vec<Value>>
    where
        F: Fn(&Value) -> Value,
    {
        let mut seen = HashSet::new();
        Ok(self
            .column(field)?
            .iter()
            .filter(|v| seen.insert(key(*v)))
            .cloned()
            .collect())
    }

    /// `n` distinct rows chosen at random, in random order. Asking for at least `len()` rows
    /// returns a copy of the whole table.
    pub fn sample<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> Table {
        if n >= self.len() {
            return self.clone();
        }
        let rows = rand::seq::index::sample(rng, self.len(), n).into_vec();
        Self::from_store(self.store.take_rows(&rows))
    }
}

/// Iterator over a table's rows as [`Row`] snapshots sharing one field list.
#[derive(Debug)]
pub struct Rows<'a> {
    table: &'a Table,
    fields: Arc<[String]>,
    next: usize,
}

impl Iterator for Rows<'_> {
    type Item = Row;

    fn next(&mut self) -> Option<Row> {
        if self.next >= self.table.len() {
            return None;
        }
        let row = self.table.row_unchecked(self.next, Arc::clone(&self.fields));
        self.next += 1;
        Some(row)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.table.len().saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Rows<'_> {}

impl<'a> IntoIterator for &'a Table {
    type Item = Row;
    type IntoIter = Rows<'a>;

    fn into_iter(self) -> Rows<'a> {
        self.iter()
    }
}
