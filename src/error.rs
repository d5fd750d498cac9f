use std::path::PathBuf;

use thiserror::Error;

/// Failures that abort a workbook load. The caller keeps whatever it had
/// loaded before.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("unsupported file extension: .{0}")]
    UnsupportedExtension(String),

    #[error("workbook has no worksheets")]
    NoSheets,

    #[error("sheet '{0}' not found in workbook")]
    SheetNotFound(String),

    #[error("sheet '{0}' has no header row")]
    EmptySheet(String),

    #[error("reading workbook: {0}")]
    Workbook(#[from] calamine::Error),

    #[error("reading CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Failures while pulling cell fills out of an OOXML container. These never
/// abort a load; the table is shown without background colors instead.
#[derive(Debug, Error)]
pub enum StyleError {
    #[error("opening workbook container: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("parsing {part}: {source}")]
    Xml {
        part: String,
        #[source]
        source: quick_xml::Error,
    },

    #[error("workbook part missing: {0}")]
    MissingPart(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("writing snapshot {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("encoding snapshot: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("writing CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("flushing CSV buffer: {0}")]
    Flush(#[from] csv::IntoInnerError<csv::Writer<Vec<u8>>>),

    #[error("CSV output is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A value that cannot take decimal-comma formatting.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("value '{0}' is not numeric")]
pub struct FormatError(pub String);
