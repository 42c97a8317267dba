use crate::constant::{read_constant, ConstantValue};
use crate::custom_runtime_data::{read_custom_runtime_data, CustomRuntimeData};
use crate::err::{Result, XbfError};
use crate::persisted_node::{
    read_persisted, DecodeContext, PropertyTable, StringId, StringTable, TypeTable,
    XamlPropertyRef, XamlTypeRef, XmlNamespaceRef, XmlNamespaceTable,
};
use crate::utils::ReadExt;

use log::trace;
use std::io::Cursor;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum XamlNodeType {
    StartObject,
    EndObject,
    StartProperty,
    EndProperty,
    Text,
    Value,
    Namespace,
    EndOfAttributes,
    EndOfStream,
    LineInfo,
    LineInfoAbsolute,
    CustomRuntimeData,
}

impl XamlNodeType {
    pub fn from_u8(byte: u8) -> Option<XamlNodeType> {
        match byte {
            0x01 => Some(XamlNodeType::StartObject),
            0x02 => Some(XamlNodeType::EndObject),
            0x03 => Some(XamlNodeType::StartProperty),
            0x04 => Some(XamlNodeType::EndProperty),
            0x05 => Some(XamlNodeType::Text),
            0x06 => Some(XamlNodeType::Value),
            0x07 => Some(XamlNodeType::Namespace),
            0x08 => Some(XamlNodeType::EndOfAttributes),
            0x09 => Some(XamlNodeType::EndOfStream),
            0x0A => Some(XamlNodeType::LineInfo),
            0x0B => Some(XamlNodeType::LineInfoAbsolute),
            0x0C => Some(XamlNodeType::CustomRuntimeData),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum XamlNode {
    StartObject(XamlTypeRef),
    EndObject,
    StartProperty(XamlPropertyRef),
    EndProperty,
    Text(StringId),
    Value(ConstantValue),
    Namespace {
        prefix: StringId,
        namespace: XmlNamespaceRef,
    },
    EndOfAttributes,
    EndOfStream,
    LineInfo {
        line_delta: i16,
        column_delta: i16,
    },
    LineInfoAbsolute {
        line: u32,
        column: u32,
    },
    CustomRuntimeData {
        data: CustomRuntimeData,
        /// Substream holding the deferred content this data describes.
        substream_index: u32,
    },
}

impl XamlNode {
    pub fn node_type(&self) -> XamlNodeType {
        match self {
            XamlNode::StartObject(_) => XamlNodeType::StartObject,
            XamlNode::EndObject => XamlNodeType::EndObject,
            XamlNode::StartProperty(_) => XamlNodeType::StartProperty,
            XamlNode::EndProperty => XamlNodeType::EndProperty,
            XamlNode::Text(_) => XamlNodeType::Text,
            XamlNode::Value(_) => XamlNodeType::Value,
            XamlNode::Namespace { .. } => XamlNodeType::Namespace,
            XamlNode::EndOfAttributes => XamlNodeType::EndOfAttributes,
            XamlNode::EndOfStream => XamlNodeType::EndOfStream,
            XamlNode::LineInfo { .. } => XamlNodeType::LineInfo,
            XamlNode::LineInfoAbsolute { .. } => XamlNodeType::LineInfoAbsolute,
            XamlNode::CustomRuntimeData { .. } => XamlNodeType::CustomRuntimeData,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct XbfNode {
    /// Offset of the node's tag, relative to the start of its node-stream.
    pub offset: u32,
    pub node: XamlNode,
}

/// Maps a node-stream offset back to a position in the source markup.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct LineInfoEntry {
    pub node_offset: u32,
    pub line: u32,
    pub column: u32,
}

/// The decoded content of one substream.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NodeStream {
    pub nodes: Vec<XbfNode>,
    pub line_info: Vec<LineInfoEntry>,
}

fn read_node(cursor: &mut Cursor<&[u8]>, ctx: &DecodeContext<'_>) -> Result<XamlNode> {
    let offset = cursor.position();
    let tag = cursor.try_u8_named("node type")?;
    let node_type = XamlNodeType::from_u8(tag)
        .ok_or_else(|| XbfError::malformed(offset, format!("unknown node type `0x{tag:02x}`")))?;

    let node = match node_type {
        XamlNodeType::StartObject => {
            XamlNode::StartObject(read_persisted::<TypeTable, _>(cursor, ctx, "object type")?)
        }
        XamlNodeType::EndObject => XamlNode::EndObject,
        XamlNodeType::StartProperty => XamlNode::StartProperty(read_persisted::<PropertyTable, _>(
            cursor,
            ctx,
            "property",
        )?),
        XamlNodeType::EndProperty => XamlNode::EndProperty,
        XamlNodeType::Text => {
            XamlNode::Text(read_persisted::<StringTable, _>(cursor, ctx, "text")?)
        }
        XamlNodeType::Value => XamlNode::Value(read_constant(cursor, ctx)?),
        XamlNodeType::Namespace => XamlNode::Namespace {
            prefix: read_persisted::<StringTable, _>(cursor, ctx, "namespace prefix")?,
            namespace: read_persisted::<XmlNamespaceTable, _>(cursor, ctx, "xml namespace")?,
        },
        XamlNodeType::EndOfAttributes => XamlNode::EndOfAttributes,
        XamlNodeType::EndOfStream => XamlNode::EndOfStream,
        XamlNodeType::LineInfo => XamlNode::LineInfo {
            line_delta: cursor.try_i16_named("line delta")?,
            column_delta: cursor.try_i16_named("column delta")?,
        },
        XamlNodeType::LineInfoAbsolute => XamlNode::LineInfoAbsolute {
            line: cursor.try_u32_named("line")?,
            column: cursor.try_u32_named("column")?,
        },
        XamlNodeType::CustomRuntimeData => {
            let data = read_custom_runtime_data(cursor, ctx)?;
            let index_offset = cursor.position();
            let raw = cursor.try_7bit_encoded_int_named("deferred substream index")?;
            let substream_index = u32::try_from(raw).map_err(|_| {
                XbfError::malformed(
                    index_offset,
                    format!("negative deferred substream index `{raw}`"),
                )
            })?;
            XamlNode::CustomRuntimeData {
                data,
                substream_index,
            }
        }
    };

    trace!("Node-stream offset `0x{offset:08x}`: {node_type:?}");
    Ok(node)
}

fn non_negative(cursor: &mut Cursor<&[u8]>, name: &'static str) -> Result<u32> {
    let offset = cursor.position();
    let raw = cursor.try_7bit_encoded_int_named(name)?;
    u32::try_from(raw).map_err(|_| XbfError::malformed(offset, format!("negative {name} `{raw}`")))
}

impl NodeStream {
    /// Decodes one node-stream slice. Offsets in errors are relative to the slice.
    ///
    /// A non-empty slice must end with exactly one `EndOfStream` node.
    pub(crate) fn read_nodes(buf: &[u8], ctx: &DecodeContext<'_>) -> Result<Vec<XbfNode>> {
        let mut cursor = Cursor::new(buf);
        let len = buf.len() as u64;
        let mut nodes = Vec::new();

        while cursor.position() < len {
            let offset = cursor.position() as u32;
            let node = read_node(&mut cursor, ctx)?;
            let is_end = node == XamlNode::EndOfStream;
            nodes.push(XbfNode { offset, node });

            if is_end {
                if cursor.position() != len {
                    return Err(XbfError::malformed(
                        cursor.position(),
                        format!(
                            "{} bytes follow the end of the node-stream",
                            len - cursor.position()
                        ),
                    ));
                }
                return Ok(nodes);
            }
        }

        if nodes.is_empty() {
            return Ok(nodes);
        }

        Err(XbfError::malformed(
            len,
            "node-stream is missing its EndOfStream node",
        ))
    }

    /// Decodes one line-stream slice. Offsets in errors are relative to the slice.
    pub(crate) fn read_line_info(buf: &[u8]) -> Result<Vec<LineInfoEntry>> {
        let mut cursor = Cursor::new(buf);
        let len = buf.len() as u64;
        let mut entries: Vec<LineInfoEntry> = Vec::new();

        while cursor.position() < len {
            let offset = cursor.position();
            let entry = LineInfoEntry {
                node_offset: non_negative(&mut cursor, "line info node offset")?,
                line: non_negative(&mut cursor, "line info line")?,
                column: non_negative(&mut cursor, "line info column")?,
            };

            if let Some(previous) = entries.last() {
                if entry.node_offset < previous.node_offset {
                    return Err(XbfError::malformed(
                        offset,
                        format!(
                            "line info node offset {} goes back from {}",
                            entry.node_offset, previous.node_offset
                        ),
                    ));
                }
            }

            entries.push(entry);
        }

        Ok(entries)
    }

    /// Every custom runtime data block in the stream, with the substream it defers to.
    pub fn custom_runtime_data(&self) -> impl Iterator<Item = (&CustomRuntimeData, u32)> {
        self.nodes.iter().filter_map(|n| match &n.node {
            XamlNode::CustomRuntimeData {
                data,
                substream_index,
            } => Some((data, *substream_index)),
            _ => None,
        })
    }
}
