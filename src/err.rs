use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, XbfError>;

/// Coarse classification of an [`XbfError`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum XbfErrorKind {
    InvalidFormat,
    MalformedData,
    IndexOutOfRange,
    Io,
}

#[derive(Debug, Error)]
pub enum XbfError {
    /// Bad magic number, or a header that cannot describe the stream it was read from.
    #[error("Offset {offset}: invalid XBF file: {message}")]
    InvalidFormat { offset: u64, message: String },

    /// Out-of-range lengths or counts, unknown discriminants, offset table mismatches,
    /// or a read that ran past the end of a bounded section.
    #[error("Offset {offset}: malformed data: {message}")]
    MalformedData { offset: u64, message: String },

    #[error("index {index} out of range for {table} (len={len})")]
    IndexOutOfRange {
        table: &'static str,
        index: u32,
        len: usize,
    },

    #[error("Offset {offset}: an I/O error has occurred while trying to read {what}")]
    Io {
        what: &'static str,
        offset: u64,
        #[source]
        source: io::Error,
    },
}

impl XbfError {
    pub fn kind(&self) -> XbfErrorKind {
        match self {
            XbfError::InvalidFormat { .. } => XbfErrorKind::InvalidFormat,
            XbfError::MalformedData { .. } => XbfErrorKind::MalformedData,
            XbfError::IndexOutOfRange { .. } => XbfErrorKind::IndexOutOfRange,
            XbfError::Io { .. } => XbfErrorKind::Io,
        }
    }

    /// Offset (relative to the reader the error was raised on), when known.
    pub fn offset(&self) -> Option<u64> {
        match self {
            XbfError::InvalidFormat { offset, .. }
            | XbfError::MalformedData { offset, .. }
            | XbfError::Io { offset, .. } => Some(*offset),
            XbfError::IndexOutOfRange { .. } => None,
        }
    }

    pub(crate) fn invalid_format(offset: u64, message: impl Into<String>) -> Self {
        XbfError::InvalidFormat {
            offset,
            message: message.into(),
        }
    }

    pub(crate) fn malformed(offset: u64, message: impl Into<String>) -> Self {
        XbfError::MalformedData {
            offset,
            message: message.into(),
        }
    }

    pub(crate) fn index_out_of_range(table: &'static str, index: u32, len: usize) -> Self {
        XbfError::IndexOutOfRange { table, index, len }
    }

    /// Maps a failed read. Running out of bytes is a property of the data, not of the stream,
    /// so it becomes `MalformedData`; everything else is surfaced as an I/O failure.
    pub(crate) fn from_read(source: io::Error, what: &'static str, offset: u64) -> Self {
        if source.kind() == io::ErrorKind::UnexpectedEof {
            XbfError::MalformedData {
                offset,
                message: format!("unexpected end of data while reading {what}"),
            }
        } else {
            XbfError::Io {
                what,
                offset,
                source,
            }
        }
    }

    pub(crate) fn io(source: io::Error, what: &'static str, offset: u64) -> Self {
        XbfError::Io {
            what,
            offset,
            source,
        }
    }

    /// Rebases an error raised while reading a buffered section onto file offsets.
    pub(crate) fn at_section(mut self, section_start: u64) -> Self {
        match &mut self {
            XbfError::InvalidFormat { offset, .. }
            | XbfError::MalformedData { offset, .. }
            | XbfError::Io { offset, .. } => *offset += section_start,
            XbfError::IndexOutOfRange { .. } => {}
        }
        self
    }
}
