use crate::err::{Result, XbfError};
use crate::node_stream::{NodeStream, XamlNode};
use crate::persisted_node::DecodeContext;
use crate::substream::{read_node_streams, SubstreamInfo};
use crate::utils::{PositionGuard, ReadExt};
use crate::xbf_file_header::{XbfFileHeader, XbfFileVersion};
use crate::xbf_metadata::XbfMetadata;
use crate::xbf_parser::{ParserSettings, ReadSeek};

use log::debug;

/// Progress of a single parse. Stages are entered strictly in order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum ParseStage {
    Unopened,
    HeaderValidated,
    MetadataLoaded,
    SubstreamsLoaded,
    Complete,
}

impl ParseStage {
    fn advance(&mut self) {
        let next = match self {
            ParseStage::Unopened => ParseStage::HeaderValidated,
            ParseStage::HeaderValidated => ParseStage::MetadataLoaded,
            ParseStage::MetadataLoaded => ParseStage::SubstreamsLoaded,
            ParseStage::SubstreamsLoaded | ParseStage::Complete => ParseStage::Complete,
        };
        debug!("Parse stage {:?} -> {:?}", self, next);
        *self = next;
    }
}

/// A fully decoded XBF file.
#[derive(Debug, Clone, PartialEq)]
pub struct XbfFile {
    pub header: XbfFileHeader,
    pub metadata: XbfMetadata,
    pub substreams: Vec<SubstreamInfo>,
    /// One node-stream per entry of `substreams`, in the same order.
    pub node_streams: Vec<NodeStream>,
}

impl XbfFile {
    /// Decodes the whole file starting at offset 0 of `stream`.
    ///
    /// The stream is returned to the position it had on entry, whether or not the parse
    /// succeeds. No partial result is ever returned.
    pub fn from_stream<T: ReadSeek>(stream: &mut T, settings: &ParserSettings) -> Result<XbfFile> {
        let mut guard =
            PositionGuard::new(stream).map_err(|e| XbfError::io(e, "stream position", 0))?;
        let stream = &mut *guard;

        let mut stage = ParseStage::Unopened;
        stream.try_seek_abs_named(0, "start of file")?;

        let header = XbfFileHeader::from_stream(stream, settings.get_header_variant())?;
        stage.advance();

        let metadata = XbfMetadata::from_stream(stream, header.metadata_size)?;
        stage.advance();

        let ctx = DecodeContext::new(
            &metadata,
            settings.should_reject_unknown_trusted_indices(),
        );
        let (substreams, node_streams) =
            read_node_streams(stream, &ctx, header.nodestream_size)?;
        stage.advance();

        let substreams_start = header.header_size()
            + u64::from(header.metadata_size)
            + 4
            + 8 * substreams.len() as u64;
        check_deferred_substreams(&substreams, &node_streams, substreams_start)?;
        stage.advance();

        debug_assert_eq!(stage, ParseStage::Complete);

        Ok(XbfFile {
            header,
            metadata,
            substreams,
            node_streams,
        })
    }

    pub fn metadata_size(&self) -> u32 {
        self.header.metadata_size
    }

    pub fn nodestream_size(&self) -> u32 {
        self.header.nodestream_size
    }

    pub fn version(&self) -> Option<XbfFileVersion> {
        self.header.version
    }
}

/// Every custom runtime data block must defer to a substream that exists.
fn check_deferred_substreams(
    substreams: &[SubstreamInfo],
    node_streams: &[NodeStream],
    substreams_start: u64,
) -> Result<()> {
    let count = node_streams.len();

    for (info, node_stream) in substreams.iter().zip(node_streams) {
        for node in &node_stream.nodes {
            if let XamlNode::CustomRuntimeData {
                substream_index, ..
            } = &node.node
            {
                if *substream_index as usize >= count {
                    return Err(XbfError::malformed(
                        substreams_start
                            + u64::from(info.nodestream_offset)
                            + u64::from(node.offset),
                        format!(
                            "custom runtime data defers to substream {substream_index}, but the file has {count}"
                        ),
                    ));
                }
            }
        }
    }

    Ok(())
}
