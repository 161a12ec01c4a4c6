use std::fmt;
use std::sync::Arc;

use crate::error::{TableError, TableResult};
use crate::value::Value;

/// A snapshot of one table row.
///
/// Values are copied out of the column store when the row is built; the field list is shared
/// (`Arc`) with every other row produced from the same table at the same moment. A `Row` only
/// hands out shared references, so nothing done with a row can write back into a table.
#[derive(Clone, Debug, PartialEq)]
pub struct Row {
    fields: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    pub fn new(fields: Arc<[String]>, values: Vec<Value>) -> TableResult<Self> {
        if fields.len() != values.len() {
            return Err(TableError::LengthMismatch {
                what: "row",
                expected: fields.len(),
                actual: values.len(),
            });
        }
        Ok(Self { fields, values })
    }

    pub(crate) fn from_parts(fields: Arc<[String]>, values: Vec<Value>) -> Self {
        debug_assert_eq!(fields.len(), values.len());
        Self { fields, values }
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// The shared field list, for building sibling rows without copying names.
    pub fn shared_fields(&self) -> &Arc<[String]> {
        &self.fields
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn position(&self, field: &str) -> Option<usize> {
        // Rows are narrow and name-addressed; a linear scan is fine.
        self.fields.iter().position(|f| f == field)
    }

    pub fn get(&self, field: &str) -> TableResult<&Value> {
        self.position(field)
            .map(|idx| &self.values[idx])
            .ok_or_else(|| TableError::column_not_found(field))
    }

    pub fn get_index(&self, idx: usize) -> TableResult<&Value> {
        self.values.get(idx).ok_or(TableError::IndexOutOfRange {
            what: "row value",
            index: idx,
            len: self.values.len(),
        })
    }

    pub fn get_many(&self, fields: &[&str]) -> TableResult<Vec<&Value>> {
        fields.iter().map(|f| self.get(f)).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> + '_ {
        self.fields
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    pub fn to_record(&self) -> Record {
        self.iter()
            .map(|(f, v)| (f.to_owned(), v.clone()))
            .collect()
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Row(")?;
        for (idx, value) in self.values.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{value}")?;
        }
        f.write_str(")")
    }
}

/// A name-keyed row, keeping keys in insertion order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Record {
    entries: Vec<(String, Value)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, replacing any existing value for the same key in place.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> + '_ {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn into_entries(self) -> Vec<(String, Value)> {
        self.entries
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut record = Record::new();
        for (k, v) in iter {
            record.insert(k, v);
        }
        record
    }
}

/// A single row handed to [`crate::Table::append`].
#[derive(Clone, Debug, PartialEq)]
pub enum RowInput {
    Keyed(Record),
    Positional(Vec<Value>),
    Described(Row),
}

impl From<Record> for RowInput {
    fn from(value: Record) -> Self {
        RowInput::Keyed(value)
    }
}

impl From<Vec<Value>> for RowInput {
    fn from(value: Vec<Value>) -> Self {
        RowInput::Positional(value)
    }
}

impl From<Row> for RowInput {
    fn from(value: Row) -> Self {
        RowInput::Described(value)
    }
}

/// A finite, single-pass sequence of rows used to build a [`crate::Table`].
///
/// The row shape is chosen once, by constructor, rather than re-inspected per row.
pub enum RowSource<'a> {
    /// Name-keyed rows; the first row's keys define the fields.
    Keyed(Box<dyn Iterator<Item = Record> + 'a>),
    /// Plain positional rows; field names must be supplied explicitly.
    Positional(Box<dyn Iterator<Item = Vec<Value>> + 'a>),
    /// Positional rows that carry their own field list.
    Described(Box<dyn Iterator<Item = Row> + 'a>),
}

impl<'a> RowSource<'a> {
    pub fn keyed<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = Record>,
        I::IntoIter: 'a,
    {
        RowSource::Keyed(Box::new(rows.into_iter()))
    }

    pub fn positional<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = Vec<Value>>,
        I::IntoIter: 'a,
    {
        RowSource::Positional(Box::new(rows.into_iter()))
    }

    pub fn described<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = Row>,
        I::IntoIter: 'a,
    {
        RowSource::Described(Box::new(rows.into_iter()))
    }
}

impl fmt::Debug for RowSource<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shape = match self {
            RowSource::Keyed(_) => "Keyed",
            RowSource::Positional(_) => "Positional",
            RowSource::Described(_) => "Described",
        };
        f.debug_tuple("RowSource").field(&shape).finish()
    }
}
