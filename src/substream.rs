use crate::err::{Result, XbfError};
use crate::node_stream::NodeStream;
use crate::persisted_node::DecodeContext;
use crate::utils::ReadExt;
use crate::xbf_parser::ReadSeek;

use log::debug;

/// Location of one substream, relative to the end of the substream table.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct SubstreamInfo {
    pub nodestream_offset: u32,
    pub linestream_offset: u32,
}

/// Reads the substream table and every substream it describes.
///
/// The section spans exactly `nodestream_size` bytes from the current position. Each substream
/// must start exactly where the previous one ended, so a table that disagrees with the data
/// is rejected rather than skipped over.
pub(crate) fn read_node_streams<T: ReadSeek>(
    stream: &mut T,
    ctx: &DecodeContext<'_>,
    nodestream_size: u32,
) -> Result<(Vec<SubstreamInfo>, Vec<NodeStream>)> {
    let section_start = stream.position_or_zero();
    let section_end = section_start + u64::from(nodestream_size);

    let table = stream.try_read_vector(false, "substream table", |s| {
        Ok(SubstreamInfo {
            nodestream_offset: s.try_u32_named("node-stream offset")?,
            linestream_offset: s.try_u32_named("line-stream offset")?,
        })
    })?;

    let substreams_start = stream.position_or_zero();
    if substreams_start > section_end {
        return Err(XbfError::malformed(
            section_start,
            format!(
                "substream table of {} entries overflows the {nodestream_size} byte node-stream section",
                table.len()
            ),
        ));
    }
    let substreams_len = section_end - substreams_start;

    debug!(
        "{} substreams starting at offset {substreams_start}",
        table.len()
    );

    let mut node_streams = Vec::with_capacity(table.len());

    for (i, info) in table.iter().enumerate() {
        let position = stream.position_or_zero();
        let expected = substreams_start + u64::from(info.nodestream_offset);
        if position != expected {
            return Err(XbfError::malformed(
                position,
                format!("substream {i} should start at offset {expected}"),
            ));
        }

        if info.linestream_offset < info.nodestream_offset {
            return Err(XbfError::malformed(
                position,
                format!(
                    "substream {i} line-stream offset {} precedes its node-stream offset {}",
                    info.linestream_offset, info.nodestream_offset
                ),
            ));
        }

        let line_end = match table.get(i + 1) {
            Some(next) => u64::from(next.nodestream_offset),
            None => substreams_len,
        };
        if line_end < u64::from(info.linestream_offset) || line_end > substreams_len {
            return Err(XbfError::malformed(
                position,
                format!("substream {i} line-stream ends outside of the node-stream section"),
            ));
        }

        let nodestream_size = (info.linestream_offset - info.nodestream_offset) as usize;
        let linestream_size = (line_end - u64::from(info.linestream_offset)) as usize;

        debug!(
            "Substream {i}: {nodestream_size} byte node-stream, {linestream_size} byte line-stream"
        );

        let node_bytes = stream.try_bytes_named(nodestream_size, "node-stream")?;
        let nodes = NodeStream::read_nodes(&node_bytes, ctx).map_err(|e| e.at_section(position))?;

        let line_start = position + nodestream_size as u64;
        let line_bytes = stream.try_bytes_named(linestream_size, "line-stream")?;
        let line_info =
            NodeStream::read_line_info(&line_bytes).map_err(|e| e.at_section(line_start))?;

        node_streams.push(NodeStream { nodes, line_info });
    }

    let position = stream.position_or_zero();
    if position != section_end {
        return Err(XbfError::malformed(
            position,
            format!(
                "substreams end at offset {position}, but the node-stream section ends at {section_end}"
            ),
        ));
    }

    Ok((table, node_streams))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::err::XbfErrorKind;
    use crate::node_stream::{LineInfoEntry, XamlNode};
    use crate::xbf_metadata::XbfMetadata;
    use std::io::Cursor;

    fn section(table: &[(u32, u32)], payload: &[u8]) -> Vec<u8> {
        let mut out = (table.len() as i32).to_le_bytes().to_vec();
        for (n, l) in table {
            out.extend_from_slice(&n.to_le_bytes());
            out.extend_from_slice(&l.to_le_bytes());
        }
        out.extend_from_slice(payload);
        out
    }

    fn decode(bytes: &[u8]) -> Result<(Vec<SubstreamInfo>, Vec<NodeStream>)> {
        let metadata = XbfMetadata::default();
        let ctx = DecodeContext::new(&metadata, false);
        let mut cursor = Cursor::new(bytes);
        read_node_streams(&mut cursor, &ctx, bytes.len() as u32)
    }

    #[test]
    fn test_reads_two_substreams() {
        // [EndObject, EndOfStream] + one line entry, then [EndOfStream] and no line info.
        let payload = [0x02, 0x09, 0x00, 0x03, 0x07, 0x09];
        let bytes = section(&[(0, 2), (5, 6)], &payload);

        let (table, streams) = decode(&bytes).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(streams.len(), 2);
        assert_eq!(streams[0].nodes.len(), 2);
        assert_eq!(
            streams[0].line_info,
            vec![LineInfoEntry {
                node_offset: 0,
                line: 3,
                column: 7
            }]
        );
        assert_eq!(streams[1].nodes[0].node, XamlNode::EndOfStream);
        assert!(streams[1].line_info.is_empty());
    }

    #[test]
    fn test_empty_table() {
        let bytes = section(&[], &[]);
        let (table, streams) = decode(&bytes).unwrap();
        assert!(table.is_empty());
        assert!(streams.is_empty());
    }

    #[test]
    fn test_wrong_offset_is_malformed() {
        let payload = [0x02, 0x09, 0x09];
        let bytes = section(&[(1, 2)], &payload);
        let err = decode(&bytes).unwrap_err();
        assert_eq!(err.kind(), XbfErrorKind::MalformedData);
        assert_eq!(err.offset(), Some(12));
    }

    #[test]
    fn test_overlapping_offsets_are_malformed() {
        let payload = [0x09, 0x09];
        let bytes = section(&[(0, 1), (0, 1)], &payload);
        let err = decode(&bytes).unwrap_err();
        assert_eq!(err.kind(), XbfErrorKind::MalformedData);
    }

    #[test]
    fn test_errors_inside_substreams_use_file_offsets() {
        let payload = [0x02, 0x0E, 0x09];
        let bytes = section(&[(0, 3)], &payload);
        let err = decode(&bytes).unwrap_err();
        assert_eq!(err.kind(), XbfErrorKind::MalformedData);
        assert_eq!(err.offset(), Some(12 + 1));
    }

    #[test]
    fn test_table_larger_than_section() {
        let bytes = section(&[(0, 0)], &[]);
        let metadata = XbfMetadata::default();
        let ctx = DecodeContext::new(&metadata, false);
        let mut cursor = Cursor::new(bytes.as_slice());
        let err = read_node_streams(&mut cursor, &ctx, 4).unwrap_err();
        assert_eq!(err.kind(), XbfErrorKind::MalformedData);
    }
}
