use super::{read_string, read_strings, read_token, read_tokens, StreamOffsetToken};
use crate::err::Result;
use crate::persisted_node::{DecodeContext, StringId};
use crate::utils::ReadExt;
use crate::xbf_parser::ReadSeek;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyedToken {
    pub key: StringId,
    pub token: StreamOffsetToken,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceDictionaryData {
    pub version: u8,
    /// Resources declared with `x:Key`.
    pub explicit_keys: Vec<KeyedToken>,
    /// Implicit styles and templates, keyed by their target type name.
    pub implicit_keys: Vec<KeyedToken>,
    pub x_name_keys: Vec<StringId>,
    pub conditionally_declared_tokens: Vec<StreamOffsetToken>,
}

fn read_keyed_tokens<T: ReadSeek>(
    stream: &mut T,
    ctx: &DecodeContext<'_>,
    name: &'static str,
) -> Result<Vec<KeyedToken>> {
    stream.try_read_vector(true, name, |s| {
        Ok(KeyedToken {
            key: read_string(s, ctx, "resource key")?,
            token: read_token(s, "resource token")?,
        })
    })
}

pub(super) fn read<T: ReadSeek>(
    stream: &mut T,
    ctx: &DecodeContext<'_>,
    version: u8,
) -> Result<ResourceDictionaryData> {
    let explicit_keys = read_keyed_tokens(stream, ctx, "explicit resource keys")?;
    let implicit_keys = read_keyed_tokens(stream, ctx, "implicit resource keys")?;

    let x_name_keys = if version >= 2 {
        read_strings(stream, ctx, "x:Name resource keys")?
    } else {
        Vec::new()
    };

    let conditionally_declared_tokens = if version >= 3 {
        read_tokens(stream, "conditionally declared resources")?
    } else {
        Vec::new()
    };

    Ok(ResourceDictionaryData {
        version,
        explicit_keys,
        implicit_keys,
        x_name_keys,
        conditionally_declared_tokens,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::err::XbfErrorKind;
    use crate::xbf_metadata::XbfMetadata;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    fn decode(bytes: &[u8], version: u8) -> Result<ResourceDictionaryData> {
        let metadata = XbfMetadata {
            strings: vec!["AccentBrush".to_string(), "Button".to_string()],
            ..Default::default()
        };
        let ctx = DecodeContext::new(&metadata, false);
        let mut cursor = Cursor::new(bytes);
        let data = read(&mut cursor, &ctx, version)?;
        assert_eq!(cursor.position(), bytes.len() as u64);
        Ok(data)
    }

    #[test]
    fn test_v1_layout() {
        let data = decode(&[0x01, 0x00, 0x05, 0x01, 0x01, 0x09], 1).unwrap();
        assert_eq!(
            data,
            ResourceDictionaryData {
                version: 1,
                explicit_keys: vec![KeyedToken {
                    key: StringId(0),
                    token: StreamOffsetToken(5)
                }],
                implicit_keys: vec![KeyedToken {
                    key: StringId(1),
                    token: StreamOffsetToken(9)
                }],
                x_name_keys: vec![],
                conditionally_declared_tokens: vec![],
            }
        );
    }

    #[test]
    fn test_v3_layout() {
        let data = decode(&[0x00, 0x00, 0x01, 0x00, 0x02, 0x03, 0x04], 3).unwrap();
        assert_eq!(data.x_name_keys, vec![StringId(0)]);
        assert_eq!(
            data.conditionally_declared_tokens,
            vec![StreamOffsetToken(3), StreamOffsetToken(4)]
        );
    }

    #[test]
    fn test_v1_ignores_later_fields() {
        // A v1 dictionary stops after the implicit keys.
        let metadata = XbfMetadata::default();
        let ctx = DecodeContext::new(&metadata, false);
        let mut cursor = Cursor::new(&[0x00, 0x00, 0x01, 0x00][..]);
        read(&mut cursor, &ctx, 1).unwrap();
        assert_eq!(cursor.position(), 2);
    }

    #[test]
    fn test_truncated_dictionary() {
        let err = decode(&[0x02, 0x00, 0x05], 1).unwrap_err();
        assert_eq!(err.kind(), XbfErrorKind::MalformedData);
    }
}
