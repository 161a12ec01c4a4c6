//! Delimited text (CSV/TSV) row sources and sinks.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

use csv::StringRecord;
use tabula_table::{FromRowsOptions, Record, RowSource, Table, TableError, Value};

use crate::error::{IoError, IoResult};
use crate::sink::{write_table, RowSink};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// When fields are wrapped in quote characters on write.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CsvQuoting {
    /// Quote every field.
    #[default]
    Always,
    /// Quote only fields containing the delimiter, the quote character or a line break.
    Necessary,
    /// Never quote. On read, quote characters are ordinary text.
    Never,
}

#[derive(Clone, Debug)]
pub struct CsvOptions {
    pub delimiter: u8,
    pub quote: u8,
    pub quoting: CsvQuoting,
    /// Prefix written files with a UTF-8 byte order mark.
    pub write_bom: bool,
    /// Treat the first record as field names.
    pub has_header: bool,
    /// Field names for input without a header row. With a header, a projection of it.
    pub fields: Option<Vec<String>>,
    /// Convert all-integer columns to integers and all-numeric columns to numbers.
    pub infer_types: bool,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            quote: b'"',
            quoting: CsvQuoting::Always,
            write_bom: true,
            has_header: true,
            fields: None,
            infer_types: false,
        }
    }
}

impl CsvOptions {
    pub fn tsv() -> Self {
        Self {
            delimiter: b'\t',
            ..Self::default()
        }
    }
}

/// Consume a leading UTF-8 byte order mark, if any.
fn skip_bom<R: BufRead>(reader: &mut R) -> IoResult<bool> {
    let found = reader.fill_buf()?.starts_with(UTF8_BOM);
    if found {
        reader.consume(UTF8_BOM.len());
    }
    Ok(found)
}

/// Streaming reader over delimited records.
///
/// Every value is read as text. Records are keyed by the header row, or by
/// [`CsvOptions::fields`] when the input has no header.
pub struct CsvRecords<R: BufRead> {
    reader: csv::Reader<R>,
    fields: Option<Arc<[String]>>,
    record: StringRecord,
    row: usize,
}

impl<R: BufRead> CsvRecords<R> {
    pub fn new(mut reader: R, options: &CsvOptions) -> IoResult<Self> {
        if skip_bom(&mut reader)? {
            log::warn!("stripped UTF-8 byte order mark from delimited input");
        }
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(options.delimiter)
            .quote(options.quote)
            .quoting(options.quoting != CsvQuoting::Never)
            // Headers are handled here so ragged rows report table-level row indexes.
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);

        let mut fields = None;
        if options.has_header {
            let mut header = StringRecord::new();
            if reader.read_record(&mut header)? {
                let names: Vec<String> = header.iter().map(str::to_owned).collect();
                validate_header(&names)?;
                fields = Some(Arc::from(names));
            }
        }
        if fields.is_none() {
            fields = options.fields.clone().map(Arc::from);
        }

        Ok(Self {
            reader,
            fields,
            record: StringRecord::new(),
            row: 0,
        })
    }

    /// Field names from the header row or the options.
    pub fn fields(&self) -> Option<&[String]> {
        self.fields.as_deref()
    }

    /// The next record as positional text values, without any width check.
    pub fn next_values(&mut self) -> IoResult<Option<Vec<Value>>> {
        if !self.reader.read_record(&mut self.record)? {
            return Ok(None);
        }
        self.row += 1;
        Ok(Some(self.record.iter().map(Value::from).collect()))
    }

    fn next_record(&mut self) -> IoResult<Option<Record>> {
        let fields = self.fields.clone().ok_or(TableError::MissingFieldNames)?;
        let Some(values) = self.next_values()? else {
            return Ok(None);
        };
        if values.len() != fields.len() {
            return Err(TableError::RowShape {
                row: self.row - 1,
                expected: format!("{} values", fields.len()),
                actual: format!("{} values", values.len()),
            }
            .into());
        }
        Ok(Some(fields.iter().cloned().zip(values).collect()))
    }
}

impl<R: BufRead> Iterator for CsvRecords<R> {
    type Item = IoResult<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}

fn validate_header(names: &[String]) -> IoResult<()> {
    for (column, name) in names.iter().enumerate() {
        if name.is_empty() {
            return Err(IoError::InvalidHeader {
                column,
                reason: "blank field name".to_owned(),
            });
        }
        if names[..column].contains(name) {
            return Err(IoError::InvalidHeader {
                column,
                reason: format!("duplicate field name {name:?}"),
            });
        }
    }
    Ok(())
}

/// Read delimited input into a table.
pub fn read_csv<R: BufRead>(reader: R, options: &CsvOptions) -> IoResult<Table> {
    let mut records = CsvRecords::new(reader, options)?;
    let Some(header) = records.fields.clone() else {
        if options.has_header {
            // Empty input: no header, no rows.
            return Ok(Table::new());
        }
        return Err(TableError::MissingFieldNames.into());
    };
    let projection = match (&options.fields, options.has_header) {
        (Some(fields), true) => fields.clone(),
        _ => header.to_vec(),
    };

    let mut failure = None;
    let rows = std::iter::from_fn(|| match records.next_values() {
        Ok(values) => values,
        Err(err) => {
            failure = Some(err);
            None
        }
    });
    let mut table = Table::from_rows_with(
        RowSource::positional(rows),
        FromRowsOptions::with_fields(header.iter().cloned()),
    )?;
    if let Some(err) = failure {
        return Err(err);
    }

    if projection.as_slice() != &header[..] {
        let mut projected = Table::new();
        for field in &projection {
            projected.set_column(field.clone(), table.column(field)?.to_vec())?;
        }
        table = projected;
    }
    if options.infer_types {
        infer_column_types(&mut table)?;
    }
    log::debug!(
        "read {} rows x {} fields of delimited text",
        table.len(),
        table.width()
    );
    Ok(table)
}

pub fn read_csv_path(path: impl AsRef<Path>, options: &CsvOptions) -> IoResult<Table> {
    let file = File::open(path)?;
    read_csv(BufReader::new(file), options)
}

/// Parse delimited text held in memory, e.g. pasted from a spreadsheet.
///
/// Column types are always inferred with [`parse_column`].
pub fn read_csv_str(text: &str, options: &CsvOptions) -> IoResult<Table> {
    let mut table = read_csv(text.as_bytes(), options)?;
    if !options.infer_types {
        infer_column_types(&mut table)?;
    }
    Ok(table)
}

fn infer_column_types(table: &mut Table) -> IoResult<()> {
    let fields = table.fields().to_vec();
    for field in fields {
        let parsed = parse_column(table.column(&field)?);
        table.set_column(field, parsed)?;
    }
    Ok(())
}

/// Convert a column of text to integers when every value is an integer, else to numbers when
/// every value is numeric, else leave it unchanged.
pub fn parse_column(column: &[Value]) -> Vec<Value> {
    fn as_text(v: &Value) -> Option<&str> {
        v.as_str().map(str::trim)
    }

    let floats: Option<Vec<f64>> = column
        .iter()
        .map(|v| as_text(v)?.parse::<f64>().ok())
        .collect();
    let Some(floats) = floats else {
        return column.to_vec();
    };

    let ints: Option<Vec<i64>> = column
        .iter()
        .map(|v| as_text(v)?.parse::<i64>().ok())
        .collect();
    match ints {
        Some(ints) => ints.into_iter().map(Value::Integer).collect(),
        None => floats.into_iter().map(Value::Number).collect(),
    }
}

/// A [`RowSink`] writing delimited text.
pub struct CsvSink<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> CsvSink<W> {
    pub fn new(mut writer: W, options: &CsvOptions) -> IoResult<Self> {
        if options.write_bom {
            writer.write_all(UTF8_BOM)?;
        }
        let quote_style = match options.quoting {
            CsvQuoting::Always => csv::QuoteStyle::Always,
            CsvQuoting::Necessary => csv::QuoteStyle::Necessary,
            CsvQuoting::Never => csv::QuoteStyle::Never,
        };
        let writer = csv::WriterBuilder::new()
            .delimiter(options.delimiter)
            .quote(options.quote)
            .quote_style(quote_style)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(writer);
        Ok(Self { writer })
    }

    /// Flush and return the underlying writer.
    pub fn into_inner(self) -> IoResult<W> {
        self.writer
            .into_inner()
            .map_err(|err| IoError::Io(err.into_error()))
    }
}

impl<W: Write> RowSink for CsvSink<W> {
    fn write_header(&mut self, fields: &[String]) -> IoResult<()> {
        self.writer.write_record(fields)?;
        Ok(())
    }

    fn write_row(&mut self, values: &[Value]) -> IoResult<()> {
        self.writer
            .write_record(values.iter().map(|v| v.to_string()))?;
        Ok(())
    }

    fn finish(&mut self) -> IoResult<()> {
        self.writer.flush()?;
        Ok(())
    }
}

pub fn write_csv<W: Write>(table: &Table, writer: W, options: &CsvOptions) -> IoResult<()> {
    let mut sink = CsvSink::new(writer, options)?;
    write_table(table, &mut sink)
}

pub fn write_csv_path(table: &Table, path: impl AsRef<Path>, options: &CsvOptions) -> IoResult<()> {
    let file = File::create(path)?;
    write_csv(table, BufWriter::new(file), options)
}

pub fn to_csv_string(table: &Table, options: &CsvOptions) -> IoResult<String> {
    let mut sink = CsvSink::new(Vec::new(), options)?;
    write_table(table, &mut sink)?;
    let bytes = sink.into_inner()?;
    String::from_utf8(bytes).map_err(|err| IoError::Utf8(err.utf8_error()))
}
