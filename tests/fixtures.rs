#![allow(dead_code)]
use byteorder::{LittleEndian, WriteBytesExt};
use std::fs;
use std::io::{self, Cursor, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Once;

static LOGGER_INIT: Once = Once::new();

// Rust runs the tests concurrently, so unless we synchronize logging access
// it will crash when attempting to run `cargo test` with some logging facilities.
pub fn ensure_env_logger_initialized() {
    use std::io::Write;

    LOGGER_INIT.call_once(|| {
        let mut builder = env_logger::Builder::from_default_env();
        builder
            .format(|buf, record| writeln!(buf, "[{}] - {}", record.level(), record.args()))
            .init();
    });
}

fn write_string(buf: &mut Vec<u8>, s: &str) {
    let units: Vec<u16> = s.encode_utf16().collect();
    buf.write_i32::<LittleEndian>(units.len() as i32).unwrap();
    for u in units {
        buf.write_u16::<LittleEndian>(u).unwrap();
    }
}

/// Writes node-stream bytes one node at a time.
#[derive(Default)]
pub struct NodeWriter {
    buf: Vec<u8>,
}

impl NodeWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(&self) -> u32 {
        self.buf.len() as u32
    }

    fn tagged(mut self, tag: u8, persisted: u16) -> Self {
        self.buf.push(tag);
        self.buf.write_u16::<LittleEndian>(persisted).unwrap();
        self
    }

    pub fn start_object(self, persisted: u16) -> Self {
        self.tagged(0x01, persisted)
    }

    pub fn end_object(mut self) -> Self {
        self.buf.push(0x02);
        self
    }

    pub fn start_property(self, persisted: u16) -> Self {
        self.tagged(0x03, persisted)
    }

    pub fn end_property(mut self) -> Self {
        self.buf.push(0x04);
        self
    }

    pub fn text(self, string_id: u16) -> Self {
        self.tagged(0x05, string_id)
    }

    /// `constant` starts with the constant type byte.
    pub fn value(mut self, constant: &[u8]) -> Self {
        self.buf.push(0x06);
        self.buf.extend_from_slice(constant);
        self
    }

    pub fn namespace(self, prefix: u16, namespace: u16) -> Self {
        let mut w = self.tagged(0x07, prefix);
        w.buf.write_u16::<LittleEndian>(namespace).unwrap();
        w
    }

    pub fn end_of_attributes(mut self) -> Self {
        self.buf.push(0x08);
        self
    }

    pub fn end_of_stream(mut self) -> Self {
        self.buf.push(0x09);
        self
    }

    pub fn line_info(mut self, line_delta: i16, column_delta: i16) -> Self {
        self.buf.push(0x0A);
        self.buf.write_i16::<LittleEndian>(line_delta).unwrap();
        self.buf.write_i16::<LittleEndian>(column_delta).unwrap();
        self
    }

    pub fn line_info_absolute(mut self, line: u32, column: u32) -> Self {
        self.buf.push(0x0B);
        self.buf.write_u32::<LittleEndian>(line).unwrap();
        self.buf.write_u32::<LittleEndian>(column).unwrap();
        self
    }

    /// `data` starts with the 7-bit encoded type index. `substream_index` must be below 128.
    pub fn custom_runtime_data(mut self, data: &[u8], substream_index: u8) -> Self {
        self.buf.push(0x0C);
        self.buf.extend_from_slice(data);
        self.buf.push(substream_index);
        self
    }

    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

/// Assembles a complete XBF file from its tables and substreams.
#[derive(Default, Clone)]
pub struct XbfBuilder {
    strings: Vec<String>,
    assemblies: Vec<(u32, u32)>,
    type_namespaces: Vec<(u32, u32)>,
    types: Vec<(u32, u32, u32)>,
    properties: Vec<(u32, u32, u32)>,
    xml_namespaces: Vec<u32>,
    substreams: Vec<(Vec<u8>, Vec<u8>)>,
    metadata_padding: usize,
    version: Option<(u32, u32)>,
}

impl XbfBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn string(mut self, s: &str) -> Self {
        self.strings.push(s.to_owned());
        self
    }

    pub fn assembly(mut self, kind: u32, string_id: u32) -> Self {
        self.assemblies.push((kind, string_id));
        self
    }

    pub fn type_namespace(mut self, assembly_id: u32, string_id: u32) -> Self {
        self.type_namespaces.push((assembly_id, string_id));
        self
    }

    pub fn xaml_type(mut self, flags: u32, type_namespace_id: u32, string_id: u32) -> Self {
        self.types.push((flags, type_namespace_id, string_id));
        self
    }

    pub fn property(mut self, flags: u32, type_id: u32, string_id: u32) -> Self {
        self.properties.push((flags, type_id, string_id));
        self
    }

    pub fn xml_namespace(mut self, string_id: u32) -> Self {
        self.xml_namespaces.push(string_id);
        self
    }

    pub fn substream(mut self, nodes: Vec<u8>, lines: Vec<u8>) -> Self {
        self.substreams.push((nodes, lines));
        self
    }

    /// Zero bytes appended to the metadata section and counted in its declared size.
    pub fn metadata_padding(mut self, len: usize) -> Self {
        self.metadata_padding = len;
        self
    }

    pub fn version(mut self, major: u32, minor: u32) -> Self {
        self.version = Some((major, minor));
        self
    }

    pub fn header_size(&self) -> usize {
        if self.version.is_some() { 20 } else { 12 }
    }

    pub fn metadata_bytes(&self) -> Vec<u8> {
        let mut buf = vec![];

        buf.write_i32::<LittleEndian>(self.strings.len() as i32).unwrap();
        for s in &self.strings {
            write_string(&mut buf, s);
        }

        buf.write_i32::<LittleEndian>(self.assemblies.len() as i32).unwrap();
        for (kind, string_id) in &self.assemblies {
            buf.write_u32::<LittleEndian>(*kind).unwrap();
            buf.write_u32::<LittleEndian>(*string_id).unwrap();
        }

        buf.write_i32::<LittleEndian>(self.type_namespaces.len() as i32).unwrap();
        for (assembly_id, string_id) in &self.type_namespaces {
            buf.write_u32::<LittleEndian>(*assembly_id).unwrap();
            buf.write_u32::<LittleEndian>(*string_id).unwrap();
        }

        for table in [&self.types, &self.properties] {
            buf.write_i32::<LittleEndian>(table.len() as i32).unwrap();
            for (flags, parent, string_id) in table.iter() {
                buf.write_u32::<LittleEndian>(*flags).unwrap();
                buf.write_u32::<LittleEndian>(*parent).unwrap();
                buf.write_u32::<LittleEndian>(*string_id).unwrap();
            }
        }

        buf.write_i32::<LittleEndian>(self.xml_namespaces.len() as i32).unwrap();
        for string_id in &self.xml_namespaces {
            buf.write_u32::<LittleEndian>(*string_id).unwrap();
        }

        buf.resize(buf.len() + self.metadata_padding, 0);
        buf
    }

    pub fn nodestream_bytes(&self) -> Vec<u8> {
        let mut table = vec![];
        let mut body = vec![];

        table
            .write_i32::<LittleEndian>(self.substreams.len() as i32)
            .unwrap();
        for (nodes, lines) in &self.substreams {
            table.write_u32::<LittleEndian>(body.len() as u32).unwrap();
            table
                .write_u32::<LittleEndian>((body.len() + nodes.len()) as u32)
                .unwrap();
            body.extend_from_slice(nodes);
            body.extend_from_slice(lines);
        }

        table.extend_from_slice(&body);
        table
    }

    /// Absolute offset of the first entry of the substream table.
    pub fn substream_table_offset(&self) -> usize {
        self.header_size() + self.metadata_bytes().len() + 4
    }

    pub fn build(&self) -> Vec<u8> {
        let metadata = self.metadata_bytes();
        let nodestreams = self.nodestream_bytes();

        let mut out = b"XBF\x00".to_vec();
        out.write_u32::<LittleEndian>(metadata.len() as u32).unwrap();
        out.write_u32::<LittleEndian>(nodestreams.len() as u32).unwrap();
        if let Some((major, minor)) = self.version {
            out.write_u32::<LittleEndian>(major).unwrap();
            out.write_u32::<LittleEndian>(minor).unwrap();
        }
        out.extend_from_slice(&metadata);
        out.extend_from_slice(&nodestreams);
        out
    }
}

pub const STR_APP: u32 = 0;
pub const STR_CONTROLS_NAMESPACE: u32 = 1;
pub const STR_FANCY_BUTTON: u32 = 2;
pub const STR_GLOW: u32 = 3;
pub const STR_USING_URI: u32 = 4;
pub const STR_HELLO: u32 = 5;
pub const STR_LOCAL: u32 = 6;
pub const STR_X: u32 = 7;
pub const STR_ACCENT_BRUSH: u32 = 8;
pub const STR_ROOT_GRID: u32 = 9;

/// Trusted persisted node for `index`.
pub const fn trusted(index: u16) -> u16 {
    0x8000 | index
}

/// A page with a local control, a resource dictionary deferring to a second substream and
/// line info for the first substream.
pub fn sample_builder() -> XbfBuilder {
    let page = NodeWriter::new()
        .namespace(STR_X as u16, trusted(1))
        .namespace(STR_LOCAL as u16, 0)
        // Grid
        .start_object(trusted(34))
        .end_of_attributes()
        // FrameworkElement.Name
        .start_property(trusted(0))
        .value(&[0x07, STR_ROOT_GRID as u8, 0x00])
        .end_property()
        // FrameworkElement.Resources, one explicit key deferring to substream 1.
        .start_property(trusted(7))
        .custom_runtime_data(&[0x01, 0x01, STR_ACCENT_BRUSH as u8, 0x00, 0x00], 1)
        .end_property()
        // Panel.Children
        .start_property(trusted(19))
        .start_object(0)
        .start_property(0)
        .value(&[0x03])
        .end_property()
        // Control.Padding
        .start_property(trusted(15))
        .value(&thickness(1.0, 2.0, 3.0, 4.0))
        .end_property()
        .end_object()
        // TextBlock.Text
        .start_object(trusted(40))
        .start_property(trusted(28))
        .text(STR_HELLO as u16)
        .end_property()
        .end_object()
        .end_property()
        .line_info_absolute(12, 4)
        .end_object()
        .end_of_stream()
        .finish();

    let brush = NodeWriter::new()
        // SolidColorBrush.Color
        .start_object(trusted(53))
        .start_property(trusted(51))
        .value(&[0x04, 0xD7, 0x78, 0x00, 0xFF])
        .end_property()
        .end_object()
        .end_of_stream()
        .finish();

    XbfBuilder::new()
        .string("MyApp")
        .string("MyApp.Controls")
        .string("FancyButton")
        .string("Glow")
        .string("using:MyApp.Controls")
        .string("Hello")
        .string("local")
        .string("x")
        .string("AccentBrush")
        .string("RootGrid")
        .assembly(2, STR_APP)
        .type_namespace(0, STR_CONTROLS_NAMESPACE)
        .xaml_type(0, 0, STR_FANCY_BUTTON)
        .property(0, 0, STR_GLOW)
        .xml_namespace(STR_USING_URI)
        .substream(page, vec![0x00, 0x01, 0x01, 0x0A, 0x02, 0x05])
        .substream(brush, vec![])
}

pub fn sample_file() -> Vec<u8> {
    sample_builder().build()
}

pub fn thickness(left: f32, top: f32, right: f32, bottom: f32) -> Vec<u8> {
    let mut out = vec![0x09];
    for v in [left, top, right, bottom] {
        out.write_f32::<LittleEndian>(v).unwrap();
    }
    out
}

/// Writes `bytes` to `name` inside `dir`.
pub fn write_sample(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, bytes).unwrap();
    path
}

/// A stream that fails every read reaching past `limit` bytes.
pub struct PoisonedStream {
    inner: Cursor<Vec<u8>>,
    limit: u64,
}

impl PoisonedStream {
    pub fn new(bytes: Vec<u8>, limit: u64) -> Self {
        PoisonedStream {
            inner: Cursor::new(bytes),
            limit,
        }
    }
}

impl Read for PoisonedStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let position = self.inner.position();
        if position + buf.len() as u64 > self.limit {
            return Err(io::Error::other(format!(
                "read of {} bytes at offset {position} is past the readable prefix",
                buf.len()
            )));
        }
        self.inner.read(buf)
    }
}

impl Seek for PoisonedStream {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.inner.seek(pos)
    }
}
