//! File-format adapters for Tabula tables.
//!
//! - Delimited text through the `csv` crate ([`read_csv`], [`CsvSink`]).
//! - XLSX workbooks through `zip` + `quick-xml` ([`XlsxReader`], [`XlsxWriter`]).
//!
//! Writers implement [`RowSink`], so any table can be exported with [`write_table`].

#![forbid(unsafe_code)]

mod delimited;
mod error;
mod sink;
mod xlsx;

pub use crate::delimited::{
    parse_column, read_csv, read_csv_path, read_csv_str, to_csv_string, write_csv, write_csv_path,
    CsvOptions, CsvQuoting, CsvRecords, CsvSink,
};
pub use crate::error::{IoError, IoResult};
pub use crate::sink::{write_table, RowSink};
pub use crate::xlsx::{
    read_xlsx, write_workbook, write_xlsx, SheetSelector, XlsxReader, XlsxWriter,
};
