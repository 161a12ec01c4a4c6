//! In-memory column store for Tabula.
//!
//! This crate focuses on:
//! - A column-oriented [`Table`] with named, ordered fields of equal length.
//! - Row snapshots ([`Row`]) built on demand from the columns.
//! - Filtering, sorting, concatenation and inner joins producing independent tables.
//! - Group-by aggregation ([`GroupBy`]).

#![forbid(unsafe_code)]

mod construct;
mod error;
mod filter;
mod groupby;
pub mod render;
mod row;
mod slice;
mod store;
mod table;
mod value;

pub use crate::construct::FromRowsOptions;
pub use crate::filter::Condition;
pub use crate::groupby::{AggInput, Aggregation, GroupBy, GroupKey};
pub use crate::row::{Record, Row, RowInput, RowSource};
pub use crate::slice::RowSlice;
pub use crate::store::ColumnStore;
pub use crate::table::{ColumnInput, Rows, SortOrder, Table};
pub use crate::value::Value;

pub use crate::error::{ErrorKind, TableError, TableResult};
