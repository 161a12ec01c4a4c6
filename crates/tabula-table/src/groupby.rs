//! Group-by and aggregation.
//!
//! A [`GroupBy`] is created by [`Table::group_by`], accumulates one output column per
//! [`GroupBy::agg`] call, and is consumed by [`GroupBy::collect`]:
//!
//! ```
//! use tabula_table::{Aggregation, Record, RowSource, Table};
//!
//! let rows = vec![
//!     Record::new().with("dept", "x").with("sal", 10),
//!     Record::new().with("dept", "x").with("sal", 20),
//!     Record::new().with("dept", "y").with("sal", 5),
//! ];
//! let table = Table::from_rows(RowSource::keyed(rows)).unwrap();
//! let summary = table
//!     .group_by(&["dept"])
//!     .and_then(|g| g.agg(Aggregation::sum(), &["sal"]))
//!     .map(|g| g.collect())
//!     .unwrap();
//! assert_eq!(summary.fields(), ["dept", "sum(sal)"]);
//! ```

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use crate::error::{TableError, TableResult};
use crate::row::Row;
use crate::store::ColumnStore;
use crate::table::Table;
use crate::value::Value;

/// Identifies one group: a single value, or a tuple when grouping by several fields.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum GroupKey {
    Single(Value),
    Tuple(Vec<Value>),
}

impl GroupKey {
    pub fn values(&self) -> &[Value] {
        match self {
            GroupKey::Single(v) => std::slice::from_ref(v),
            GroupKey::Tuple(vs) => vs,
        }
    }
}

/// What an aggregation sees for one group.
#[derive(Clone, Debug)]
pub enum AggInput<'a> {
    /// No fields requested: the group's rows.
    Rows(&'a [Row]),
    /// One field requested: its value from each row.
    Values(Vec<Value>),
    /// Several fields requested: one tuple per row.
    Tuples(Vec<Vec<Value>>),
}

impl AggInput<'_> {
    pub fn len(&self) -> usize {
        match self {
            AggInput::Rows(rows) => rows.len(),
            AggInput::Values(values) => values.len(),
            AggInput::Tuples(tuples) => tuples.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn single_field(&self, operation: &'static str) -> TableResult<&[Value]> {
        match self {
            AggInput::Values(values) => Ok(values),
            _ => Err(TableError::Argument(format!(
                "{operation} aggregates exactly one field"
            ))),
        }
    }
}

type AggFn<'f> = Box<dyn Fn(&AggInput<'_>) -> TableResult<Value> + 'f>;

/// A function reducing one group to a single value.
///
/// Named aggregations contribute their name to the output column (`sum(sal)`); anonymous ones
/// are numbered per [`GroupBy`] (`lambda0000(sal)`).
pub struct Aggregation<'f> {
    name: Option<String>,
    func: AggFn<'f>,
}

impl fmt::Debug for Aggregation<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Aggregation")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl<'f> Aggregation<'f> {
    pub fn named(
        name: impl Into<String>,
        func: impl Fn(&AggInput<'_>) -> TableResult<Value> + 'f,
    ) -> Self {
        Self {
            name: Some(name.into()),
            func: Box::new(func),
        }
    }

    pub fn anonymous(func: impl Fn(&AggInput<'_>) -> TableResult<Value> + 'f) -> Self {
        Self {
            name: None,
            func: Box::new(func),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn apply(&self, input: &AggInput<'_>) -> TableResult<Value> {
        (self.func)(input)
    }

    /// Number of rows in the group.
    pub fn len() -> Self {
        Self::named("len", |input| Ok(Value::from(input.len())))
    }

    /// Sum of a numeric field. Stays integral while every value is an integer and the sum fits.
    pub fn sum() -> Self {
        Self::named("sum", |input| sum_values(input.single_field("sum")?))
    }

    pub fn mean() -> Self {
        Self::named("mean", |input| {
            let values = input.single_field("mean")?;
            if values.is_empty() {
                return Err(TableError::DivisionByZero { operation: "mean" });
            }
            let total = sum_values(values)?.as_f64().unwrap_or_default();
            Ok(Value::Number(total / values.len() as f64))
        })
    }

    pub fn min() -> Self {
        Self::named("min", |input| {
            extreme(input.single_field("min")?, "min", std::cmp::Ordering::Less)
        })
    }

    pub fn max() -> Self {
        Self::named("max", |input| {
            extreme(input.single_field("max")?, "max", std::cmp::Ordering::Greater)
        })
    }

    /// Join text values with `separator`.
    pub fn concat(separator: impl Into<String>) -> Self {
        let separator = separator.into();
        Self::named("concat", move |input| {
            let mut out = String::new();
            for (idx, value) in input.single_field("concat")?.iter().enumerate() {
                let Value::Text(text) = value else {
                    return Err(TableError::InvalidOperand {
                        operation: "concat",
                        value: value.clone(),
                    });
                };
                if idx > 0 {
                    out.push_str(&separator);
                }
                out.push_str(text);
            }
            Ok(Value::from(out))
        })
    }

    pub fn first() -> Self {
        Self::named("first", |input| {
            Ok(input.single_field("first")?.first().cloned().unwrap_or_default())
        })
    }

    pub fn last() -> Self {
        Self::named("last", |input| {
            Ok(input.single_field("last")?.last().cloned().unwrap_or_default())
        })
    }

    /// Number of distinct values (or distinct tuples when several fields are aggregated).
    pub fn count_distinct() -> Self {
        Self::named("count_distinct", |input| {
            let count = match input {
                AggInput::Values(values) => values.iter().collect::<HashSet<_>>().len(),
                AggInput::Tuples(tuples) => tuples.iter().collect::<HashSet<_>>().len(),
                AggInput::Rows(_) => {
                    return Err(TableError::Argument(
                        "count_distinct needs at least one field".to_owned(),
                    ))
                }
            };
            Ok(Value::from(count))
        })
    }
}

fn sum_values(values: &[Value]) -> TableResult<Value> {
    let mut int_total: Option<i64> = Some(0);
    let mut float_total = 0.0;
    for value in values {
        match value {
            Value::Integer(n) => {
                int_total = int_total.and_then(|t| t.checked_add(*n));
                float_total += *n as f64;
            }
            Value::Number(n) => {
                int_total = None;
                float_total += n;
            }
            other => {
                return Err(TableError::InvalidOperand {
                    operation: "sum",
                    value: other.clone(),
                })
            }
        }
    }
    Ok(match int_total {
        Some(total) => Value::Integer(total),
        None => Value::Number(float_total),
    })
}

/// The first value that no later value beats in direction `wanted`.
fn extreme(
    values: &[Value],
    operation: &'static str,
    wanted: std::cmp::Ordering,
) -> TableResult<Value> {
    let Some((first, rest)) = values.split_first() else {
        return Err(TableError::Argument(format!("{operation} of an empty group")));
    };
    let mut best = first;
    for value in rest {
        if value.try_cmp(best)? == wanted {
            best = value;
        }
    }
    Ok(best.clone())
}

/// Rows of a table partitioned by key, plus the aggregation columns computed so far.
///
/// Groups appear in first-seen key order and keep their rows in table order.
#[derive(Debug)]
pub struct GroupBy {
    source_fields: Arc<[String]>,
    group_fields: Vec<String>,
    keys: Vec<GroupKey>,
    groups: Vec<Vec<Row>>,
    outputs: Vec<(String, Vec<Value>)>,
    anonymous_count: usize,
}

impl Table {
    /// Partition the rows by the values of `fields`.
    pub fn group_by(&self, fields: &[&str]) -> TableResult<GroupBy> {
        if fields.is_empty() {
            return Err(TableError::Argument(
                "group_by needs at least one field".to_owned(),
            ));
        }
        let mut positions = Vec::with_capacity(fields.len());
        for field in fields {
            let pos = self
                .store()
                .position(field)
                .ok_or_else(|| TableError::column_not_found(field))?;
            if positions.contains(&pos) {
                return Err(TableError::Argument(format!(
                    "group_by field listed twice: {field}"
                )));
            }
            positions.push(pos);
        }

        let mut index: HashMap<GroupKey, usize> = HashMap::new();
        let mut keys = Vec::new();
        let mut groups: Vec<Vec<Row>> = Vec::new();
        for row in self.iter() {
            let key = match positions.as_slice() {
                [pos] => GroupKey::Single(row.values()[*pos].clone()),
                _ => GroupKey::Tuple(positions.iter().map(|&p| row.values()[p].clone()).collect()),
            };
            let slot = *index.entry(key.clone()).or_insert_with(|| {
                keys.push(key);
                groups.push(Vec::new());
                groups.len() - 1
            });
            groups[slot].push(row);
        }

        log::debug!(
            "group_by {:?}: {} rows into {} groups",
            fields,
            self.len(),
            groups.len()
        );
        Ok(GroupBy {
            source_fields: self.shared_fields(),
            group_fields: fields.iter().map(|f| (*f).to_owned()).collect(),
            keys,
            groups,
            outputs: Vec::new(),
            anonymous_count: 0,
        })
    }
}

impl GroupBy {
    /// Number of groups.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn group_fields(&self) -> &[String] {
        &self.group_fields
    }

    pub fn keys(&self) -> &[GroupKey] {
        &self.keys
    }

    pub fn groups(&self) -> impl Iterator<Item = (&GroupKey, &[Row])> + '_ {
        self.keys
            .iter()
            .zip(self.groups.iter().map(Vec::as_slice))
    }

    /// Names of the aggregation columns so far, in call order.
    pub fn output_fields(&self) -> impl Iterator<Item = &str> + '_ {
        self.outputs.iter().map(|(name, _)| name.as_str())
    }

    /// Add one aggregation column named after the aggregation and its fields.
    pub fn agg(self, aggregation: Aggregation<'_>, fields: &[&str]) -> TableResult<Self> {
        self.aggregate(None, aggregation, fields)
    }

    /// Add one aggregation column with an explicit name.
    pub fn agg_as(
        self,
        name: impl Into<String>,
        aggregation: Aggregation<'_>,
        fields: &[&str],
    ) -> TableResult<Self> {
        self.aggregate(Some(name.into()), aggregation, fields)
    }

    fn aggregate(
        mut self,
        name: Option<String>,
        aggregation: Aggregation<'_>,
        fields: &[&str],
    ) -> TableResult<Self> {
        let positions = fields
            .iter()
            .map(|f| {
                self.source_fields
                    .iter()
                    .position(|s| s == *f)
                    .ok_or_else(|| TableError::column_not_found(f))
            })
            .collect::<TableResult<Vec<usize>>>()?;

        let name = match name {
            Some(name) => name,
            None => self.derived_name(&aggregation, fields),
        };
        if name.is_empty() {
            return Err(TableError::InvalidFieldName { field: name });
        }
        let taken =
            self.group_fields.contains(&name) || self.outputs.iter().any(|(n, _)| *n == name);
        if taken {
            return Err(TableError::Argument(format!(
                "aggregation output {name} already exists"
            )));
        }

        let mut column = Vec::with_capacity(self.groups.len());
        for rows in &self.groups {
            let input = match positions.as_slice() {
                [] => AggInput::Rows(rows),
                [pos] => AggInput::Values(rows.iter().map(|r| r.values()[*pos].clone()).collect()),
                _ => AggInput::Tuples(
                    rows.iter()
                        .map(|r| positions.iter().map(|&p| r.values()[p].clone()).collect())
                        .collect(),
                ),
            };
            column.push(aggregation.apply(&input)?);
        }
        self.outputs.push((name, column));
        Ok(self)
    }

    fn derived_name(&mut self, aggregation: &Aggregation<'_>, fields: &[&str]) -> String {
        let base = match aggregation.name() {
            Some(name) => name.to_owned(),
            None => {
                let name = format!("lambda{:04}", self.anonymous_count);
                self.anonymous_count += 1;
                name
            }
        };
        format!("{base}({})", fields.join(","))
    }

    /// Finish: group fields first, then aggregation columns in call order.
    pub fn collect(self) -> Table {
        let mut fields = self.group_fields;
        let mut columns: Vec<Vec<Value>> = (0..fields.len())
            .map(|i| self.keys.iter().map(|k| k.values()[i].clone()).collect())
            .collect();
        for (name, column) in self.outputs {
            fields.push(name);
            columns.push(column);
        }
        Table::from_store(ColumnStore::from_parts(fields, columns))
    }
}
