use super::{read_string, read_strings, read_token, read_tokens, StreamOffsetToken};
use crate::err::{Result, XbfError};
use crate::persisted_node::{DecodeContext, StringId};
use crate::utils::ReadExt;
use crate::xbf_parser::ReadSeek;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisualStateGroupCollectionData {
    pub version: u8,
    pub entire_collection_token: StreamOffsetToken,
    pub groups: Vec<VisualStateGroupData>,
    pub states: Vec<VisualStateData>,
    pub transitions: Vec<VisualTransitionData>,
    pub seen_name_directives: Vec<StringId>,
    pub unexpected_tokens_detected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisualStateGroupData {
    pub name: StringId,
    pub deferred_self_token: StreamOffsetToken,
    pub has_dynamic_timelines: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VisualStateData {
    pub name: StringId,
    /// Index into [`VisualStateGroupCollectionData::groups`].
    pub group_index: u32,
    pub storyboard_token: Option<StreamOffsetToken>,
    pub property_setter_tokens: Vec<StreamOffsetToken>,
    /// One list of trigger values per state trigger.
    pub state_trigger_values: Vec<Vec<i32>>,
    pub state_trigger_collection_tokens: Vec<StreamOffsetToken>,
    pub extensible_state_trigger_tokens: Vec<StreamOffsetToken>,
    pub static_resource_trigger_tokens: Vec<StreamOffsetToken>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisualTransitionData {
    pub from: Option<StringId>,
    pub to: Option<StringId>,
    pub token: StreamOffsetToken,
}

/// A string id shifted by one, where `0` means "no string".
fn read_optional_string<T: ReadSeek>(
    stream: &mut T,
    ctx: &DecodeContext<'_>,
    name: &'static str,
) -> Result<Option<StringId>> {
    let offset = stream.position_or_zero();
    match stream.try_7bit_encoded_int_named(name)? {
        0 => Ok(None),
        raw => ctx.string_id(raw.wrapping_sub(1), offset).map(Some),
    }
}

fn read_group<T: ReadSeek>(
    stream: &mut T,
    ctx: &DecodeContext<'_>,
    version: u8,
) -> Result<VisualStateGroupData> {
    Ok(VisualStateGroupData {
        name: read_string(stream, ctx, "visual state group name")?,
        deferred_self_token: read_token(stream, "visual state group token")?,
        has_dynamic_timelines: if version >= 4 {
            stream.try_bool_u8_named("has dynamic timelines")?
        } else {
            false
        },
    })
}

fn read_state<T: ReadSeek>(
    stream: &mut T,
    ctx: &DecodeContext<'_>,
    version: u8,
    group_count: usize,
) -> Result<VisualStateData> {
    let name = read_string(stream, ctx, "visual state name")?;

    let group_offset = stream.position_or_zero();
    let raw_group = stream.try_7bit_encoded_int_named("visual state group index")?;
    if raw_group < 0 {
        return Err(XbfError::malformed(
            group_offset,
            format!("negative visual state group index `{raw_group}`"),
        ));
    }
    if raw_group as usize >= group_count {
        return Err(XbfError::index_out_of_range(
            "visual state groups",
            raw_group as u32,
            group_count,
        ));
    }

    let storyboard_token = if stream.try_bool_u8_named("has storyboard")? {
        Some(read_token(stream, "storyboard token")?)
    } else {
        None
    };

    let mut state = VisualStateData {
        name,
        group_index: raw_group as u32,
        storyboard_token,
        ..Default::default()
    };

    if version >= 2 {
        state.property_setter_tokens = read_tokens(stream, "property setter tokens")?;
    }

    if version >= 3 {
        state.state_trigger_values = stream.try_read_vector(true, "state triggers", |s| {
            s.try_read_vector(true, "state trigger values", |s| {
                s.try_7bit_encoded_int_named("state trigger value")
            })
        })?;
        state.state_trigger_collection_tokens =
            read_tokens(stream, "state trigger collection tokens")?;
    }

    if version >= 4 {
        state.extensible_state_trigger_tokens =
            read_tokens(stream, "extensible state trigger tokens")?;
    }

    if version >= 5 {
        state.static_resource_trigger_tokens =
            read_tokens(stream, "static resource trigger tokens")?;
    }

    Ok(state)
}

pub(super) fn read<T: ReadSeek>(
    stream: &mut T,
    ctx: &DecodeContext<'_>,
    version: u8,
) -> Result<VisualStateGroupCollectionData> {
    let entire_collection_token = read_token(stream, "visual state collection token")?;

    let groups = stream.try_read_vector(true, "visual state groups", |s| {
        read_group(s, ctx, version)
    })?;

    let group_count = groups.len();
    let states = stream.try_read_vector(true, "visual states", |s| {
        read_state(s, ctx, version, group_count)
    })?;

    let transitions = if version >= 2 {
        stream.try_read_vector(true, "visual transitions", |s| {
            Ok(VisualTransitionData {
                from: read_optional_string(s, ctx, "transition from")?,
                to: read_optional_string(s, ctx, "transition to")?,
                token: read_token(s, "transition token")?,
            })
        })?
    } else {
        Vec::new()
    };

    let seen_name_directives = read_strings(stream, ctx, "seen name directives")?;

    let unexpected_tokens_detected = if version >= 3 {
        stream.try_bool_u8_named("unexpected tokens detected")?
    } else {
        false
    };

    Ok(VisualStateGroupCollectionData {
        version,
        entire_collection_token,
        groups,
        states,
        transitions,
        seen_name_directives,
        unexpected_tokens_detected,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::err::XbfErrorKind;
    use crate::xbf_metadata::XbfMetadata;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    fn metadata() -> XbfMetadata {
        XbfMetadata {
            strings: ["CommonStates", "Normal", "PointerOver", "root"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            ..Default::default()
        }
    }

    fn decode(bytes: &[u8], version: u8) -> Result<VisualStateGroupCollectionData> {
        let metadata = metadata();
        let ctx = DecodeContext::new(&metadata, false);
        let mut cursor = Cursor::new(bytes);
        let data = read(&mut cursor, &ctx, version)?;
        assert_eq!(cursor.position(), bytes.len() as u64);
        Ok(data)
    }

    #[test]
    fn test_v1_layout() {
        #[rustfmt::skip]
        let bytes = [
            0x10,                   // entire collection token
            0x01, 0x00, 0x20,       // 1 group: "CommonStates", token 0x20
            0x02,                   // 2 states
            0x01, 0x00, 0x00,       //   "Normal", group 0, no storyboard
            0x02, 0x00, 0x01, 0x30, //   "PointerOver", group 0, storyboard 0x30
            0x01, 0x03,             // seen names: "root"
        ];

        let data = decode(&bytes, 1).unwrap();
        assert_eq!(data.version, 1);
        assert_eq!(data.entire_collection_token, StreamOffsetToken(0x10));
        assert_eq!(
            data.groups,
            vec![VisualStateGroupData {
                name: StringId(0),
                deferred_self_token: StreamOffsetToken(0x20),
                has_dynamic_timelines: false,
            }]
        );
        assert_eq!(data.states.len(), 2);
        assert_eq!(data.states[0].storyboard_token, None);
        assert_eq!(data.states[1].storyboard_token, Some(StreamOffsetToken(0x30)));
        assert!(data.transitions.is_empty());
        assert_eq!(data.seen_name_directives, vec![StringId(3)]);
        assert!(!data.unexpected_tokens_detected);
    }

    #[test]
    fn test_v5_layout() {
        #[rustfmt::skip]
        let bytes = [
            0x00,
            0x01, 0x00, 0x20, 0x01,             // group with dynamic timelines
            0x01,                               // 1 state
            0x01, 0x00, 0x00,                   //   "Normal", group 0, no storyboard
            0x01, 0x40,                         //   property setter tokens
            0x01, 0x02, 0x05, 0x06,             //   trigger values [[5, 6]]
            0x01, 0x41,                         //   trigger collection tokens
            0x01, 0x42,                         //   extensible trigger tokens
            0x01, 0x43,                         //   static resource trigger tokens
            0x01, 0x00, 0x03, 0x50,             // transition: none -> "PointerOver"
            0x00,                               // no seen names
            0x01,                               // unexpected tokens detected
        ];

        let data = decode(&bytes, 5).unwrap();
        assert!(data.groups[0].has_dynamic_timelines);

        let state = &data.states[0];
        assert_eq!(state.property_setter_tokens, vec![StreamOffsetToken(0x40)]);
        assert_eq!(state.state_trigger_values, vec![vec![5, 6]]);
        assert_eq!(state.state_trigger_collection_tokens, vec![StreamOffsetToken(0x41)]);
        assert_eq!(state.extensible_state_trigger_tokens, vec![StreamOffsetToken(0x42)]);
        assert_eq!(state.static_resource_trigger_tokens, vec![StreamOffsetToken(0x43)]);

        assert_eq!(
            data.transitions,
            vec![VisualTransitionData {
                from: None,
                to: Some(StringId(2)),
                token: StreamOffsetToken(0x50),
            }]
        );
        assert!(data.unexpected_tokens_detected);
    }

    #[test]
    fn test_state_group_index_out_of_range() {
        let bytes = [0x00, 0x01, 0x00, 0x20, 0x01, 0x01, 0x01];
        let err = decode(&bytes, 1).unwrap_err();
        assert_eq!(err.kind(), XbfErrorKind::IndexOutOfRange);
    }

    #[test]
    fn test_string_out_of_range() {
        let bytes = [0x00, 0x01, 0x09, 0x20, 0x00, 0x00];
        let err = decode(&bytes, 1).unwrap_err();
        assert_eq!(err.kind(), XbfErrorKind::IndexOutOfRange);
    }

    #[test]
    fn test_invalid_storyboard_flag() {
        let bytes = [0x00, 0x01, 0x00, 0x20, 0x01, 0x01, 0x00, 0x02];
        let err = decode(&bytes, 1).unwrap_err();
        assert_eq!(err.kind(), XbfErrorKind::MalformedData);
    }
}
