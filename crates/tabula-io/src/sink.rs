use tabula_table::{Table, Value};

use crate::error::IoResult;

/// Destination for a header followed by rows of values.
///
/// `write_header` is called at most once, before any row. Output is only guaranteed to be
/// complete after `finish`.
pub trait RowSink {
    fn write_header(&mut self, fields: &[String]) -> IoResult<()>;

    fn write_row(&mut self, values: &[Value]) -> IoResult<()>;

    fn finish(&mut self) -> IoResult<()>;
}

/// Write the table's fields and rows to `sink`, then finish it.
pub fn write_table<S: RowSink + ?Sized>(table: &Table, sink: &mut S) -> IoResult<()> {
    write_rows(table, sink)?;
    sink.finish()
}

/// Header and rows only; the sink stays open.
pub(crate) fn write_rows<S: RowSink + ?Sized>(table: &Table, sink: &mut S) -> IoResult<()> {
    sink.write_header(table.fields())?;
    for row in table {
        sink.write_row(row.values())?;
    }
    Ok(())
}
