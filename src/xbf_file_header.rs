use crate::err::{Result, XbfError};
use crate::utils::ReadExt;
use crate::xbf_parser::{HeaderVariant, ReadSeek};

use log::debug;
use std::io;

pub const XBF_MAGIC: [u8; 4] = *b"XBF\x00";

const SUPPORTED_MAJOR_VERSIONS: [u32; 2] = [1, 2];

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct XbfFileVersion {
    pub major: u32,
    pub minor: u32,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct XbfFileHeader {
    pub metadata_size: u32,
    pub nodestream_size: u32,
    /// Only present in the versioned header layout.
    pub version: Option<XbfFileVersion>,
}

impl XbfFileHeader {
    pub const LEGACY_HEADER_SIZE: u64 = 12;
    pub const VERSIONED_HEADER_SIZE: u64 = 20;

    /// Reads the header from the start of `stream`.
    ///
    /// The magic number is validated before anything else is read. The declared section
    /// sizes must add up to the length of the stream for the chosen layout.
    pub fn from_stream<T: ReadSeek>(stream: &mut T, variant: HeaderVariant) -> Result<XbfFileHeader> {
        let mut magic = [0_u8; 4];
        stream.read_exact(&mut magic).map_err(|e| match e.kind() {
            io::ErrorKind::UnexpectedEof => {
                XbfError::invalid_format(0, "stream is too short to hold the magic number")
            }
            _ => XbfError::io(e, "magic number", 0),
        })?;

        if magic != XBF_MAGIC {
            return Err(XbfError::invalid_format(
                0,
                format!("magic number {magic:02X?} does not match {XBF_MAGIC:02X?}"),
            ));
        }

        let len = stream
            .total_len()
            .map_err(|e| XbfError::io(e, "stream length", 4))?;
        if len < Self::LEGACY_HEADER_SIZE {
            return Err(XbfError::invalid_format(
                4,
                format!("stream of {len} bytes is too short to hold a header"),
            ));
        }

        let metadata_size = stream.try_u32_named("metadata size")?;
        let nodestream_size = stream.try_u32_named("node-stream size")?;
        let sections = u64::from(metadata_size) + u64::from(nodestream_size);

        let legacy_len = Self::LEGACY_HEADER_SIZE + sections;
        let versioned_len = Self::VERSIONED_HEADER_SIZE + sections;

        let is_versioned = match variant {
            HeaderVariant::Detect if len == legacy_len => false,
            HeaderVariant::Detect if len == versioned_len => true,
            HeaderVariant::Legacy if len == legacy_len => false,
            HeaderVariant::Versioned if len == versioned_len => true,
            _ => {
                return Err(XbfError::invalid_format(
                    4,
                    format!(
                        "declared sizes (metadata {metadata_size}, node-stream {nodestream_size}) do not fit a {len} byte stream with a {variant:?} header"
                    ),
                ));
            }
        };

        let version = if is_versioned {
            let offset = stream.position_or_zero();
            let major = stream.try_u32_named("major file version")?;
            let minor = stream.try_u32_named("minor file version")?;

            if !SUPPORTED_MAJOR_VERSIONS.contains(&major) {
                return Err(XbfError::invalid_format(
                    offset,
                    format!("unsupported file version {major}.{minor}"),
                ));
            }

            Some(XbfFileVersion { major, minor })
        } else {
            None
        };

        debug!(
            "Header: metadata {metadata_size} bytes, node-stream {nodestream_size} bytes, version {version:?}"
        );

        Ok(XbfFileHeader {
            metadata_size,
            nodestream_size,
            version,
        })
    }

    pub fn header_size(&self) -> u64 {
        match self.version {
            Some(_) => Self::VERSIONED_HEADER_SIZE,
            None => Self::LEGACY_HEADER_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::err::XbfErrorKind;
    use std::io::Cursor;

    fn header(fields: &[u32], body_len: usize) -> Vec<u8> {
        let mut out = XBF_MAGIC.to_vec();
        for f in fields {
            out.extend_from_slice(&f.to_le_bytes());
        }
        out.resize(out.len() + body_len, 0);
        out
    }

    #[test]
    fn test_detects_legacy_header() {
        let bytes = header(&[3, 5], 8);
        let h = XbfFileHeader::from_stream(&mut Cursor::new(bytes), HeaderVariant::Detect).unwrap();
        assert_eq!(
            h,
            XbfFileHeader {
                metadata_size: 3,
                nodestream_size: 5,
                version: None
            }
        );
        assert_eq!(h.header_size(), 12);
    }

    #[test]
    fn test_detects_versioned_header() {
        let bytes = header(&[3, 5, 2, 1], 8);
        let mut cursor = Cursor::new(bytes);
        let h = XbfFileHeader::from_stream(&mut cursor, HeaderVariant::Detect).unwrap();
        assert_eq!(h.version, Some(XbfFileVersion { major: 2, minor: 1 }));
        assert_eq!(cursor.position(), 20);
    }

    #[test]
    fn test_forced_variant_must_match_length() {
        let bytes = header(&[3, 5, 2, 1], 8);
        let err = XbfFileHeader::from_stream(&mut Cursor::new(bytes), HeaderVariant::Legacy)
            .unwrap_err();
        assert_eq!(err.kind(), XbfErrorKind::InvalidFormat);
    }

    #[test]
    fn test_size_mismatch_is_invalid() {
        let bytes = header(&[3, 5], 9);
        let err = XbfFileHeader::from_stream(&mut Cursor::new(bytes), HeaderVariant::Detect)
            .unwrap_err();
        assert_eq!(err.kind(), XbfErrorKind::InvalidFormat);
    }

    #[test]
    fn test_unsupported_major_version() {
        let bytes = header(&[0, 0, 3, 0], 0);
        let err = XbfFileHeader::from_stream(&mut Cursor::new(bytes), HeaderVariant::Versioned)
            .unwrap_err();
        assert_eq!(err.kind(), XbfErrorKind::InvalidFormat);
        assert_eq!(err.offset(), Some(12));
    }

    #[test]
    fn test_bad_magic() {
        let mut bytes = header(&[0, 0], 0);
        bytes[3] = 0x01;
        let err = XbfFileHeader::from_stream(&mut Cursor::new(bytes), HeaderVariant::Detect)
            .unwrap_err();
        assert_eq!(err.kind(), XbfErrorKind::InvalidFormat);
    }

    #[test]
    fn test_short_stream() {
        for bytes in [vec![0x58, 0x42], XBF_MAGIC.to_vec()] {
            let err = XbfFileHeader::from_stream(&mut Cursor::new(bytes), HeaderVariant::Detect)
                .unwrap_err();
            assert_eq!(err.kind(), XbfErrorKind::InvalidFormat);
        }
    }
}
