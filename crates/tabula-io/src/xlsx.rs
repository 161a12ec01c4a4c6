//! Minimal XLSX workbook reading and writing.
//!
//! Only cell values are handled: numbers, booleans, shared and inline strings. Styles, formulas
//! and other workbook features are ignored on read and not produced on write.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fs::File;
use std::io::{Cursor, Read, Seek, Write};
use std::path::{Path, PathBuf};

use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tabula_table::{FromRowsOptions, Record, RowSource, Table, Value};
use zip::write::FileOptions;
use zip::ZipArchive;

use crate::error::{IoError, IoResult};
use crate::sink::{write_rows, RowSink};

const DEFAULT_SHEET: &str = "default";
const MAX_SHEET_NAME_LEN: usize = 31;
const MAX_PART_BYTES: u64 = 256 * 1024 * 1024;
const MAX_ROWS: usize = 1_048_576;
const MAX_COLUMNS: usize = 16_384;
const REL_OFFICE_DOCUMENT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";

/// Which worksheet a reader works on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SheetSelector {
    Index(usize),
    Name(String),
}

impl From<usize> for SheetSelector {
    fn from(value: usize) -> Self {
        SheetSelector::Index(value)
    }
}

impl From<&str> for SheetSelector {
    fn from(value: &str) -> Self {
        SheetSelector::Name(value.to_owned())
    }
}

impl From<String> for SheetSelector {
    fn from(value: String) -> Self {
        SheetSelector::Name(value)
    }
}

#[derive(Clone, Debug)]
struct SheetEntry {
    name: String,
    part: String,
}

/// Reads worksheets of an XLSX package held in memory.
pub struct XlsxReader {
    archive: ZipArchive<Cursor<Vec<u8>>>,
    sheets: Vec<SheetEntry>,
    shared_strings: Vec<String>,
    active: usize,
}

impl std::fmt::Debug for XlsxReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XlsxReader")
            .field("sheets", &self.sheets)
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}

impl XlsxReader {
    pub fn open(path: impl AsRef<Path>) -> IoResult<Self> {
        let mut file = File::open(path)?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)?;
        Self::from_bytes(bytes)
    }

    pub fn from_bytes(bytes: Vec<u8>) -> IoResult<Self> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;

        let workbook_part = match read_zip_part_optional(&mut archive, "_rels/.rels")? {
            Some(xml) => parse_relationships(&xml)?
                .into_iter()
                .find(|rel| rel.kind == REL_OFFICE_DOCUMENT)
                .map(|rel| resolve_target("", &rel.target))
                .unwrap_or_else(|| "xl/workbook.xml".to_owned()),
            None => "xl/workbook.xml".to_owned(),
        };
        let workbook_xml = read_zip_part_optional(&mut archive, &workbook_part)?
            .ok_or_else(|| IoError::MissingPart(workbook_part.clone()))?;

        let (base_dir, file_name) = match workbook_part.rsplit_once('/') {
            Some((dir, file)) => (dir.to_owned(), file),
            None => (String::new(), workbook_part.as_str()),
        };
        let rels_part = if base_dir.is_empty() {
            format!("_rels/{file_name}.rels")
        } else {
            format!("{base_dir}/_rels/{file_name}.rels")
        };
        let targets: HashMap<String, String> = match read_zip_part_optional(&mut archive, &rels_part)? {
            Some(xml) => parse_relationships(&xml)?
                .into_iter()
                .map(|rel| (rel.id, resolve_target(&base_dir, &rel.target)))
                .collect(),
            None => HashMap::new(),
        };

        let mut sheets = Vec::new();
        for (name, rel_id) in parse_workbook_sheets(&workbook_xml)? {
            let part = targets
                .get(&rel_id)
                .cloned()
                .ok_or_else(|| IoError::MissingPart(format!("relationship {rel_id} for sheet {name}")))?;
            sheets.push(SheetEntry { name, part });
        }

        let shared_part = if base_dir.is_empty() {
            "sharedStrings.xml".to_owned()
        } else {
            format!("{base_dir}/sharedStrings.xml")
        };
        let shared_strings = match read_zip_part_optional(&mut archive, &shared_part)? {
            Some(xml) => parse_shared_strings(&xml)?,
            None => Vec::new(),
        };

        log::debug!(
            "opened xlsx workbook with {} sheets and {} shared strings",
            sheets.len(),
            shared_strings.len()
        );
        Ok(Self {
            archive,
            sheets,
            shared_strings,
            active: 0,
        })
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn sheet_count(&self) -> usize {
        self.sheets.len()
    }

    /// Name of the sheet subsequent reads use.
    pub fn active_sheet(&self) -> Option<&str> {
        self.sheets.get(self.active).map(|s| s.name.as_str())
    }

    pub fn select_sheet(&mut self, selector: impl Into<SheetSelector>) -> IoResult<()> {
        let idx = match selector.into() {
            SheetSelector::Index(idx) if idx < self.sheets.len() => idx,
            SheetSelector::Index(idx) => return Err(IoError::SheetNotFound(format!("#{idx}"))),
            SheetSelector::Name(name) => self
                .sheets
                .iter()
                .position(|s| s.name == name)
                .ok_or(IoError::SheetNotFound(name))?,
        };
        self.active = idx;
        Ok(())
    }

    /// Every row of the active sheet, padded with `Null` to a common width.
    pub fn rows(&mut self) -> IoResult<Vec<Vec<Value>>> {
        let Some(sheet) = self.sheets.get(self.active) else {
            return Err(IoError::SheetNotFound(format!("#{}", self.active)));
        };
        let xml = read_zip_part_optional(&mut self.archive, &sheet.part)?
            .ok_or_else(|| IoError::MissingPart(sheet.part.clone()))?;
        let mut rows = parse_sheet_rows(&xml, &self.shared_strings)?;

        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        if rows.iter().any(|r| !r.is_empty() && r.len() != width) {
            log::warn!(
                "sheet {}: ragged rows padded to {width} columns",
                sheet.name
            );
        }
        for row in &mut rows {
            row.resize(width, Value::Null);
        }
        Ok(rows)
    }

    /// Data rows of the active sheet keyed by its first row.
    pub fn records(&mut self) -> IoResult<Vec<Record>> {
        let mut rows = self.rows()?.into_iter();
        let Some(header) = rows.next() else {
            return Ok(Vec::new());
        };
        let fields = header_fields(header)?;
        Ok(rows
            .map(|row| fields.iter().cloned().zip(row).collect())
            .collect())
    }

    /// The active sheet as a table, taking field names from its first row.
    pub fn read_table(&mut self) -> IoResult<Table> {
        let mut rows = self.rows()?.into_iter();
        let Some(header) = rows.next() else {
            return Ok(Table::new());
        };
        let fields = header_fields(header)?;
        let table = Table::from_rows_with(
            RowSource::positional(rows),
            FromRowsOptions::with_fields(fields),
        )?;
        Ok(table)
    }
}

fn header_fields(header: Vec<Value>) -> IoResult<Vec<String>> {
    let mut fields: Vec<String> = Vec::with_capacity(header.len());
    for (column, value) in header.into_iter().enumerate() {
        let name = match value {
            Value::Null => {
                return Err(IoError::InvalidHeader {
                    column,
                    reason: "blank header cell".to_owned(),
                })
            }
            other => other.to_string(),
        };
        if name.is_empty() || fields.contains(&name) {
            return Err(IoError::InvalidHeader {
                column,
                reason: format!("header {name:?} is blank or repeated"),
            });
        }
        fields.push(name);
    }
    Ok(fields)
}

fn read_zip_part_optional<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> IoResult<Option<String>> {
    read_zip_part_optional_with_limit(archive, name, MAX_PART_BYTES)
}

/// Read a part as UTF-8, refusing more than `max_bytes` of inflated data.
fn read_zip_part_optional_with_limit<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
    max_bytes: u64,
) -> IoResult<Option<String>> {
    let file = match archive.by_name(name) {
        Ok(file) => file,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    let too_large = |size: u64| IoError::PartTooLarge {
        part: name.to_owned(),
        size,
        max: max_bytes,
    };
    if file.size() > max_bytes {
        return Err(too_large(file.size()));
    }

    // The declared size can be forged, so cap the read itself too.
    let mut bytes = Vec::new();
    file.take(max_bytes.saturating_add(1)).read_to_end(&mut bytes)?;
    if bytes.len() as u64 > max_bytes {
        return Err(too_large(bytes.len() as u64));
    }
    let xml = String::from_utf8(bytes).map_err(|err| IoError::Utf8(err.utf8_error()))?;
    Ok(Some(xml))
}

/// Resolve a relationship target against the directory of the part that owns it.
fn resolve_target(base_dir: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_owned();
    }
    let mut parts: Vec<&str> = base_dir.split('/').filter(|p| !p.is_empty()).collect();
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    parts.join("/")
}

fn attr_value(e: &BytesStart<'_>, key: &[u8]) -> IoResult<Option<String>> {
    for attr in e.attributes().with_checks(false) {
        let attr = attr?;
        if attr.key.local_name().as_ref() == key {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

struct Relationship {
    id: String,
    kind: String,
    target: String,
}

fn parse_relationships(xml: &str) -> IoResult<Vec<Relationship>> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    let mut out = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                let id = attr_value(&e, b"Id")?.unwrap_or_default();
                let kind = attr_value(&e, b"Type")?.unwrap_or_default();
                let target = attr_value(&e, b"Target")?.unwrap_or_default();
                out.push(Relationship { id, kind, target });
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(out)
}

/// `(name, relationship id)` for each `<sheet>`, in workbook order.
fn parse_workbook_sheets(xml: &str) -> IoResult<Vec<(String, String)>> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    let mut out = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sheet" => {
                let name = attr_value(&e, b"name")?
                    .ok_or_else(|| IoError::MissingPart("sheet name in workbook".to_owned()))?;
                // `r:id`; matched by local name.
                let rel_id = attr_value(&e, b"id")?
                    .ok_or_else(|| IoError::MissingPart(format!("relationship id for sheet {name}")))?;
                out.push((name, rel_id));
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(out)
}

fn parse_shared_strings(xml: &str) -> IoResult<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);
    let mut buf = Vec::new();
    let mut items = Vec::new();
    let mut current: Option<String> = None;
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.local_name().as_ref() == b"si" => current = Some(String::new()),
            Event::Empty(e) if e.local_name().as_ref() == b"si" => items.push(String::new()),
            Event::Start(e) if e.local_name().as_ref() == b"t" => {
                let text = read_text(&mut reader, b"t")?;
                if let Some(item) = current.as_mut() {
                    item.push_str(&text);
                }
            }
            Event::Start(e) if e.local_name().as_ref() == b"rPh" => {
                // Phonetic runs are not part of the displayed string.
                reader.read_to_end_into(e.name(), &mut Vec::new())?;
            }
            Event::End(e) if e.local_name().as_ref() == b"si" => {
                items.push(current.take().unwrap_or_default());
            }
            Event::Eof if current.is_some() => {
                return Err(IoError::Malformed("unexpected eof in <si>"))
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(items)
}

/// Text content up to the closing tag with local name `end`.
fn read_text(reader: &mut Reader<&[u8]>, end: &[u8]) -> IoResult<String> {
    let mut buf = Vec::new();
    let mut text = String::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Text(e) => {
                let t: Cow<'_, str> = e.unescape()?;
                text.push_str(&t);
            }
            Event::CData(e) => text.push_str(std::str::from_utf8(e.as_ref())?),
            Event::End(e) if e.local_name().as_ref() == end => break,
            Event::Eof if end == b"v" => return Err(IoError::Malformed("unexpected eof in <v>")),
            Event::Eof => return Err(IoError::Malformed("unexpected eof in <t>")),
            _ => {}
        }
        buf.clear();
    }
    Ok(text)
}

/// Cell currently being read.
struct PendingCell {
    reference: String,
    column: usize,
    kind: String,
    text: Option<String>,
}

fn parse_sheet_rows(xml: &str, shared_strings: &[String]) -> IoResult<Vec<Vec<Value>>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);
    let mut buf = Vec::new();
    let mut rows: Vec<Vec<Value>> = Vec::new();
    let mut row: Option<Vec<Value>> = None;
    let mut cell: Option<PendingCell> = None;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.local_name().as_ref() == b"row" => {
                pad_to_row(&mut rows, &e)?;
                row = Some(Vec::new());
            }
            Event::Empty(e) if e.local_name().as_ref() == b"row" => {
                pad_to_row(&mut rows, &e)?;
                rows.push(Vec::new());
            }
            Event::End(e) if e.local_name().as_ref() == b"row" => {
                rows.push(row.take().unwrap_or_default());
            }
            Event::Start(e) if e.local_name().as_ref() == b"c" => {
                let next = row.as_ref().map_or(0, Vec::len);
                let (reference, column) = cell_position(&e, next)?;
                cell = Some(PendingCell {
                    reference,
                    column,
                    kind: attr_value(&e, b"t")?.unwrap_or_default(),
                    text: None,
                });
            }
            Event::Start(e)
                if cell.is_some() && matches!(e.local_name().as_ref(), b"v" | b"t") =>
            {
                let end = if e.local_name().as_ref() == b"v" { &b"v"[..] } else { &b"t"[..] };
                let text = read_text(&mut reader, end)?;
                if let Some(cell) = cell.as_mut() {
                    cell.text.get_or_insert_with(String::new).push_str(&text);
                }
            }
            Event::Start(e) if cell.is_some() && e.local_name().as_ref() == b"rPh" => {
                reader.read_to_end_into(e.name(), &mut Vec::new())?;
            }
            Event::End(e) if e.local_name().as_ref() == b"c" => {
                if let (Some(pending), Some(row)) = (cell.take(), row.as_mut()) {
                    let column = pending.column;
                    let value = cell_value(pending, shared_strings)?;
                    if row.len() <= column {
                        row.resize(column + 1, Value::Null);
                    }
                    row[column] = value;
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    // Trailing empty rows carry no data.
    while rows.last().is_some_and(|r| r.iter().all(Value::is_null)) {
        rows.pop();
    }
    Ok(rows)
}

/// Insert empty rows for any row numbers skipped before `<row r="..">`.
fn pad_to_row(rows: &mut Vec<Vec<Value>>, e: &BytesStart<'_>) -> IoResult<()> {
    let Some(r) = attr_value(e, b"r")? else {
        return Ok(());
    };
    let number: usize = r
        .parse()
        .map_err(|_| IoError::InvalidCellRef(format!("row {r}")))?;
    if number == 0 || number > MAX_ROWS {
        return Err(IoError::CellOutOfRange(format!("row {r}")));
    }
    while rows.len() + 1 < number {
        rows.push(Vec::new());
    }
    Ok(())
}

/// The cell's reference and zero-based column, defaulting to the next free column.
fn cell_position(e: &BytesStart<'_>, next: usize) -> IoResult<(String, usize)> {
    let (reference, column) = match attr_value(e, b"r")? {
        Some(reference) => {
            let column = parse_column_ref(&reference)?;
            (reference, column)
        }
        None => (cell_ref(0, next), next),
    };
    if column >= MAX_COLUMNS {
        return Err(IoError::CellOutOfRange(reference));
    }
    Ok((reference, column))
}

/// Zero-based column of an `A1`-style reference.
fn parse_column_ref(reference: &str) -> IoResult<usize> {
    let letters: &str = reference
        .split(|c: char| c.is_ascii_digit())
        .next()
        .unwrap_or_default();
    let digits = &reference[letters.len()..];
    if letters.is_empty() || digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(IoError::InvalidCellRef(reference.to_owned()));
    }
    let mut column: usize = 0;
    for ch in letters.chars() {
        if !ch.is_ascii_uppercase() {
            return Err(IoError::InvalidCellRef(reference.to_owned()));
        }
        column = column
            .checked_mul(26)
            .and_then(|c| c.checked_add((ch as u8 - b'A' + 1) as usize))
            .ok_or_else(|| IoError::InvalidCellRef(reference.to_owned()))?;
    }
    Ok(column - 1)
}

/// `A1`-style reference for a zero-based row and column.
fn cell_ref(row: usize, column: usize) -> String {
    let mut letters = Vec::new();
    let mut n = column + 1;
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    let mut out = String::from_utf8_lossy(&letters).into_owned();
    out.push_str(&(row + 1).to_string());
    out
}

fn cell_value(cell: PendingCell, shared_strings: &[String]) -> IoResult<Value> {
    let Some(text) = cell.text else {
        return Ok(Value::Null);
    };
    let invalid = || IoError::InvalidCellValue {
        cell: cell.reference.clone(),
        value: text.clone(),
    };
    match cell.kind.as_str() {
        "s" => {
            let idx: usize = text.trim().parse().map_err(|_| invalid())?;
            shared_strings
                .get(idx)
                .map(|s| Value::from(s.as_str()))
                .ok_or_else(invalid)
        }
        "b" => match text.trim() {
            "1" | "true" => Ok(Value::Boolean(true)),
            "0" | "false" => Ok(Value::Boolean(false)),
            _ => Err(invalid()),
        },
        "str" | "inlineStr" | "e" | "d" => Ok(Value::from(text.as_str())),
        _ => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return Ok(Value::Null);
            }
            if let Ok(n) = trimmed.parse::<i64>() {
                return Ok(Value::Integer(n));
            }
            trimmed
                .parse::<f64>()
                .map(Value::Number)
                .map_err(|_| invalid())
        }
    }
}

#[derive(Debug)]
struct SheetBuffer {
    name: String,
    rows: Vec<Vec<Value>>,
}

/// Builds an XLSX workbook sheet by sheet.
///
/// Rows go to the active sheet. Switching to a sheet that already exists resumes appending to
/// it. Writing without an active sheet creates one named `default`.
#[derive(Debug, Default)]
pub struct XlsxWriter {
    sheets: Vec<SheetBuffer>,
    active: Option<usize>,
    target: Option<PathBuf>,
}

impl XlsxWriter {
    /// A writer that is only serialized on request ([`XlsxWriter::save`], [`XlsxWriter::to_bytes`]).
    pub fn new() -> Self {
        Self::default()
    }

    /// A writer whose [`RowSink::finish`] saves to `path`.
    pub fn create(path: impl Into<PathBuf>) -> Self {
        Self {
            target: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn set_active_sheet(&mut self, name: &str) -> IoResult<()> {
        validate_sheet_name(name)?;
        let idx = match self.sheets.iter().position(|s| s.name == name) {
            Some(idx) => idx,
            None => {
                self.sheets.push(SheetBuffer {
                    name: name.to_owned(),
                    rows: Vec::new(),
                });
                self.sheets.len() - 1
            }
        };
        self.active = Some(idx);
        Ok(())
    }

    pub fn active_sheet(&self) -> Option<&str> {
        self.active.map(|idx| self.sheets[idx].name.as_str())
    }

    fn active_rows(&mut self) -> IoResult<&mut Vec<Vec<Value>>> {
        let idx = match self.active {
            Some(idx) => idx,
            None => {
                self.set_active_sheet(DEFAULT_SHEET)?;
                self.sheets.len() - 1
            }
        };
        Ok(&mut self.sheets[idx].rows)
    }

    pub fn write_row(&mut self, values: &[Value]) -> IoResult<()> {
        self.active_rows()?.push(values.to_vec());
        Ok(())
    }

    pub fn write_rows<I>(&mut self, rows: I) -> IoResult<()>
    where
        I: IntoIterator,
        I::Item: AsRef<[Value]>,
    {
        let target = self.active_rows()?;
        target.extend(rows.into_iter().map(|r| r.as_ref().to_vec()));
        Ok(())
    }

    pub fn to_bytes(&self) -> IoResult<Vec<u8>> {
        let empty;
        let sheets: &[SheetBuffer] = if self.sheets.is_empty() {
            empty = [SheetBuffer {
                name: DEFAULT_SHEET.to_owned(),
                rows: Vec::new(),
            }];
            &empty
        } else {
            &self.sheets
        };

        let mut buffer = Cursor::new(Vec::new());
        {
            let mut zip = zip::ZipWriter::new(&mut buffer);
            let options =
                FileOptions::<()>::default().compression_method(zip::CompressionMethod::Deflated);

            zip.start_file("[Content_Types].xml", options)?;
            zip.write_all(content_types_xml(sheets.len()).as_bytes())?;

            zip.start_file("_rels/.rels", options)?;
            zip.write_all(root_rels_xml().as_bytes())?;

            zip.start_file("xl/workbook.xml", options)?;
            zip.write_all(workbook_xml(sheets).as_bytes())?;

            zip.start_file("xl/_rels/workbook.xml.rels", options)?;
            zip.write_all(workbook_rels_xml(sheets.len()).as_bytes())?;

            for (idx, sheet) in sheets.iter().enumerate() {
                zip.start_file(format!("xl/worksheets/sheet{}.xml", idx + 1), options)?;
                zip.write_all(worksheet_xml(&sheet.rows).as_bytes())?;
            }

            zip.finish()?;
        }
        Ok(buffer.into_inner())
    }

    pub fn save(&self, path: impl AsRef<Path>) -> IoResult<()> {
        let bytes = self.to_bytes()?;
        std::fs::write(path.as_ref(), bytes)?;
        log::debug!(
            "saved xlsx workbook with {} sheets to {}",
            self.sheets.len().max(1),
            path.as_ref().display()
        );
        Ok(())
    }
}

impl RowSink for XlsxWriter {
    fn write_header(&mut self, fields: &[String]) -> IoResult<()> {
        let header: Vec<Value> = fields.iter().map(|f| Value::from(f.as_str())).collect();
        self.write_row(&header)
    }

    fn write_row(&mut self, values: &[Value]) -> IoResult<()> {
        XlsxWriter::write_row(self, values)
    }

    fn finish(&mut self) -> IoResult<()> {
        match &self.target {
            Some(path) => self.save(path),
            None => Ok(()),
        }
    }
}

fn validate_sheet_name(name: &str) -> IoResult<()> {
    let reason = if name.is_empty() {
        Some("sheet names cannot be empty")
    } else if name.chars().count() > MAX_SHEET_NAME_LEN {
        Some("sheet names are limited to 31 characters")
    } else if name.contains(['[', ']', ':', '*', '?', '/', '\\']) {
        Some("sheet names cannot contain [ ] : * ? / \\")
    } else if name.starts_with('\'') || name.ends_with('\'') {
        Some("sheet names cannot begin or end with an apostrophe")
    } else {
        None
    };
    match reason {
        Some(reason) => Err(IoError::InvalidSheetName {
            name: name.to_owned(),
            reason,
        }),
        None => Ok(()),
    }
}

/// Write one table per sheet, each with a header row.
pub fn write_workbook(path: impl AsRef<Path>, sheets: &[(&str, &Table)]) -> IoResult<()> {
    let mut writer = XlsxWriter::new();
    for (name, table) in sheets {
        writer.set_active_sheet(name)?;
        write_rows(*table, &mut writer)?;
    }
    writer.save(path)
}

/// Write a single table to a one-sheet workbook.
pub fn write_xlsx(table: &Table, path: impl AsRef<Path>, sheet_name: &str) -> IoResult<()> {
    write_workbook(path, &[(sheet_name, table)])
}

/// Read the first sheet of a workbook as a table.
pub fn read_xlsx(path: impl AsRef<Path>) -> IoResult<Table> {
    XlsxReader::open(path)?.read_table()
}

fn content_types_xml(sheet_count: usize) -> String {
    let mut out = String::new();
    out.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    out.push('\n');
    out.push_str(r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#);
    out.push('\n');
    out.push_str(r#"  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#);
    out.push('\n');
    out.push_str(r#"  <Default Extension="xml" ContentType="application/xml"/>"#);
    out.push('\n');
    out.push_str(r#"  <Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>"#);
    out.push('\n');
    for idx in 1..=sheet_count {
        out.push_str(&format!(
            r#"  <Override PartName="/xl/worksheets/sheet{idx}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#
        ));
        out.push('\n');
    }
    out.push_str("</Types>\n");
    out
}

fn root_rels_xml() -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="{REL_OFFICE_DOCUMENT}" Target="xl/workbook.xml"/>
</Relationships>
"#
    )
}

fn workbook_xml(sheets: &[SheetBuffer]) -> String {
    let mut out = String::new();
    out.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    out.push('\n');
    out.push_str(r#"<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">"#);
    out.push_str("\n  <sheets>\n");
    for (idx, sheet) in sheets.iter().enumerate() {
        let n = idx + 1;
        out.push_str(&format!(
            r#"    <sheet name="{}" sheetId="{n}" r:id="rId{n}"/>"#,
            escape(sheet.name.as_str())
        ));
        out.push('\n');
    }
    out.push_str("  </sheets>\n</workbook>\n");
    out
}

fn workbook_rels_xml(sheet_count: usize) -> String {
    let mut out = String::new();
    out.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    out.push('\n');
    out.push_str(r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#);
    out.push('\n');
    for n in 1..=sheet_count {
        out.push_str(&format!(
            r#"  <Relationship Id="rId{n}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{n}.xml"/>"#
        ));
        out.push('\n');
    }
    out.push_str("</Relationships>\n");
    out
}

fn worksheet_xml(rows: &[Vec<Value>]) -> String {
    let mut out = String::new();
    out.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    out.push('\n');
    out.push_str(r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">"#);
    out.push_str("\n  <sheetData>\n");
    for (r, row) in rows.iter().enumerate() {
        out.push_str(&format!(r#"    <row r="{}">"#, r + 1));
        for (c, value) in row.iter().enumerate() {
            push_cell_xml(&mut out, &cell_ref(r, c), value);
        }
        out.push_str("</row>\n");
    }
    out.push_str("  </sheetData>\n</worksheet>\n");
    out
}

fn push_cell_xml(out: &mut String, reference: &str, value: &Value) {
    match value {
        Value::Null => {}
        Value::Boolean(b) => {
            out.push_str(&format!(r#"<c r="{reference}" t="b"><v>{}</v></c>"#, u8::from(*b)));
        }
        Value::Integer(n) => {
            out.push_str(&format!(r#"<c r="{reference}"><v>{n}</v></c>"#));
        }
        Value::Number(n) if n.is_finite() => {
            out.push_str(&format!(r#"<c r="{reference}"><v>{n}</v></c>"#));
        }
        Value::Number(n) => {
            log::warn!("cell {reference}: writing non-finite number {n} as text");
            push_inline_string(out, reference, &n.to_string());
        }
        Value::Text(s) => push_inline_string(out, reference, s),
    }
}

fn push_inline_string(out: &mut String, reference: &str, text: &str) {
    out.push_str(&format!(
        r#"<c r="{reference}" t="inlineStr"><is><t xml:space="preserve">{}</t></is></c>"#,
        escape(text)
    ));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_references_round_trip() {
        for (column, letters) in [(0, "A"), (25, "Z"), (26, "AA"), (701, "ZZ"), (702, "AAA")] {
            let reference = cell_ref(4, column);
            assert_eq!(reference, format!("{letters}5"));
            assert_eq!(parse_column_ref(&reference).unwrap(), column);
        }
        assert!(parse_column_ref("A").is_err());
        assert!(parse_column_ref("1A").is_err());
        assert!(parse_column_ref("a1").is_err());
    }

    #[test]
    fn targets_resolve_against_the_owning_part() {
        assert_eq!(resolve_target("xl", "worksheets/sheet1.xml"), "xl/worksheets/sheet1.xml");
        assert_eq!(resolve_target("xl", "/xl/worksheets/s.xml"), "xl/worksheets/s.xml");
        assert_eq!(resolve_target("xl/sub", "../sheet.xml"), "xl/sheet.xml");
        assert_eq!(resolve_target("", "xl/workbook.xml"), "xl/workbook.xml");
    }

    #[test]
    fn sheet_rows_fill_gaps_and_resolve_shared_strings() {
        let xml = r#"<worksheet><sheetData>
            <row r="1"><c r="A1" t="s"><v>1</v></c><c r="C1" t="b"><v>1</v></c></row>
            <row r="3"><c r="B3"><v>2.5</v></c><c r="C3" t="inlineStr"><is><t>x &amp; y</t></is></c></row>
        </sheetData></worksheet>"#;
        let shared = vec!["zero".to_owned(), "one".to_owned()];

        let rows = parse_sheet_rows(xml, &shared).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(
            rows[0],
            vec![Value::from("one"), Value::Null, Value::Boolean(true)]
        );
        assert!(rows[1].is_empty());
        assert_eq!(
            rows[2],
            vec![Value::Null, Value::Number(2.5), Value::from("x & y")]
        );
    }

    #[test]
    fn sheet_rows_reject_cells_outside_the_grid() {
        let far_row = r#"<worksheet><sheetData><row r="4000000000"><c r="A4000000000"><v>1</v></c></row></sheetData></worksheet>"#;
        let err = parse_sheet_rows(far_row, &[]).unwrap_err();
        assert!(matches!(err, IoError::CellOutOfRange(_)), "{err:?}");

        let wide = r#"<worksheet><sheetData><row r="1"><c r="XFE1"><v>1</v></c></row></sheetData></worksheet>"#;
        let err = parse_sheet_rows(wide, &[]).unwrap_err();
        assert!(matches!(err, IoError::CellOutOfRange(ref cell) if cell == "XFE1"), "{err:?}");

        let last = r#"<worksheet><sheetData><row r="1"><c r="XFD1"><v>1</v></c></row></sheetData></worksheet>"#;
        let rows = parse_sheet_rows(last, &[]).unwrap();
        assert_eq!(rows[0].len(), MAX_COLUMNS);
        assert_eq!(rows[0][MAX_COLUMNS - 1], Value::Number(1.0));
    }

    #[test]
    fn truncated_text_is_malformed() {
        let err = parse_shared_strings("<sst><si><t>cut").unwrap_err();
        assert!(matches!(err, IoError::Malformed(_)), "{err:?}");

        let err = parse_shared_strings("<sst><si><r><t>a</t></r>").unwrap_err();
        assert!(matches!(err, IoError::Malformed("unexpected eof in <si>")), "{err:?}");

        let sheet = r#"<worksheet><sheetData><row r="1"><c r="A1"><v>12"#;
        let err = parse_sheet_rows(sheet, &[]).unwrap_err();
        assert!(matches!(err, IoError::Malformed("unexpected eof in <v>")), "{err:?}");
    }

    #[test]
    fn oversized_parts_are_refused() {
        let mut bytes = Cursor::new(Vec::new());
        {
            let mut zip = zip::ZipWriter::new(&mut bytes);
            let options = FileOptions::<()>::default()
                .compression_method(zip::CompressionMethod::Deflated);
            zip.start_file("big.xml", options).unwrap();
            zip.write_all(&[b' '; 64]).unwrap();
            zip.finish().unwrap();
        }
        let mut archive = ZipArchive::new(Cursor::new(bytes.into_inner())).unwrap();

        let err = read_zip_part_optional_with_limit(&mut archive, "big.xml", 10).unwrap_err();
        assert!(
            matches!(err, IoError::PartTooLarge { ref part, size: 64, max: 10 } if part == "big.xml"),
            "{err:?}"
        );
        let xml = read_zip_part_optional_with_limit(&mut archive, "big.xml", 64).unwrap();
        assert_eq!(xml.map(|x| x.len()), Some(64));
        assert!(read_zip_part_optional_with_limit(&mut archive, "missing.xml", 64)
            .unwrap()
            .is_none());
    }

    #[test]
    fn shared_strings_concatenate_runs_and_skip_phonetics() {
        let xml = r#"<sst><si><t>plain</t></si><si><r><t>ri</t></r><r><t>ch</t></r><rPh><t>skip</t></rPh></si><si/></sst>"#;
        assert_eq!(
            parse_shared_strings(xml).unwrap(),
            vec!["plain".to_owned(), "rich".to_owned(), String::new()]
        );
    }

    #[test]
    fn sheet_names_are_validated() {
        let mut writer = XlsxWriter::new();
        assert!(writer.set_active_sheet("ok name").is_ok());
        assert!(writer.set_active_sheet("").is_err());
        assert!(writer.set_active_sheet("a/b").is_err());
        assert!(writer.set_active_sheet(&"x".repeat(32)).is_err());
    }
}
