use quick_xml::events::attributes::AttrError;
use tabula_table::TableError;
use thiserror::Error;

pub type IoResult<T> = Result<T, IoError>;

#[derive(Debug, Error)]
pub enum IoError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("xml error: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("xml attribute error: {0}")]
    XmlAttr(#[from] AttrError),
    #[error("utf-8 error: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error(transparent)]
    Table(#[from] TableError),
    #[error("missing required part: {0}")]
    MissingPart(String),
    #[error("worksheet not found: {0}")]
    SheetNotFound(String),
    #[error("invalid worksheet name {name:?}: {reason}")]
    InvalidSheetName { name: String, reason: &'static str },
    #[error("invalid header in column {column}: {reason}")]
    InvalidHeader { column: usize, reason: String },
    #[error("invalid cell reference: {0}")]
    InvalidCellRef(String),
    #[error("cell {0} is outside the worksheet grid")]
    CellOutOfRange(String),
    #[error("part {part} is too large: {size} bytes (max {max})")]
    PartTooLarge { part: String, size: u64, max: u64 },
    #[error("malformed xml: {0}")]
    Malformed(&'static str),
    #[error("invalid value in cell {cell}: {value:?}")]
    InvalidCellValue { cell: String, value: String },
}
