use crate::err::{Result, XbfError};
use crate::xbf_file::XbfFile;

use log::debug;
use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, Cursor, Read, Seek, SeekFrom};
use std::path::Path;

pub trait ReadSeek: Read + Seek {
    fn tell(&mut self) -> io::Result<u64> {
        self.stream_position()
    }

    /// Total length of the stream. The current position is left unchanged.
    fn total_len(&mut self) -> io::Result<u64> {
        let current = self.stream_position()?;
        let len = self.seek(SeekFrom::End(0))?;
        if current != len {
            self.seek(SeekFrom::Start(current))?;
        }
        Ok(len)
    }
}

impl<T: Read + Seek> ReadSeek for T {}

/// Which header layout to expect.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum HeaderVariant {
    /// Pick the layout whose declared sizes add up to the length of the stream.
    #[default]
    Detect,
    /// Magic and two section sizes, without a file version.
    Legacy,
    /// Magic, two section sizes, then a major and a minor file version.
    Versioned,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParserSettings {
    header_variant: HeaderVariant,
    strict_trusted_indices: bool,
}

impl ParserSettings {
    pub fn new() -> Self {
        ParserSettings::default()
    }

    /// Force a header layout instead of detecting it from the stream length.
    pub fn header_variant(mut self, header_variant: HeaderVariant) -> Self {
        self.header_variant = header_variant;
        self
    }

    /// When set, a trusted index missing from the built-in registry fails the parse.
    /// Otherwise it is kept as an opaque stable index and a warning is logged.
    pub fn strict_trusted_indices(mut self, strict: bool) -> Self {
        self.strict_trusted_indices = strict;
        self
    }

    pub fn get_header_variant(&self) -> HeaderVariant {
        self.header_variant
    }

    pub fn should_reject_unknown_trusted_indices(&self) -> bool {
        self.strict_trusted_indices
    }
}

pub struct XbfParser {
    data: Box<dyn ReadSeek>,
    settings: ParserSettings,
}

impl fmt::Debug for XbfParser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("XbfParser")
            .field("settings", &self.settings)
            .finish()
    }
}

impl XbfParser {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Opening {}", path.display());

        let f = File::open(path).map_err(|e| XbfError::io(e, "input file", 0))?;
        Ok(XbfParser::from_read_seek(BufReader::new(f)))
    }

    pub fn from_buffer(buffer: Vec<u8>) -> Self {
        XbfParser::from_read_seek(Cursor::new(buffer))
    }

    pub fn from_read_seek<T: ReadSeek + 'static>(read_seek: T) -> Self {
        XbfParser {
            data: Box::new(read_seek),
            settings: ParserSettings::default(),
        }
    }

    pub fn with_configuration(mut self, configuration: ParserSettings) -> Self {
        self.settings = configuration;
        self
    }

    pub fn settings(&self) -> &ParserSettings {
        &self.settings
    }

    /// Reads the whole file. The underlying stream is rewound to where it was on return.
    pub fn parse(&mut self) -> Result<XbfFile> {
        XbfFile::from_stream(&mut self.data, &self.settings)
    }
}
