use super::{read_string, read_token, StreamOffsetToken};
use crate::constant::{read_constant, ConstantValue};
use crate::err::{Result, XbfError};
use crate::persisted_node::{read_persisted, DecodeContext, PropertyTable, StringId, XamlPropertyRef};
use crate::utils::ReadExt;
use crate::xbf_parser::ReadSeek;

#[derive(Debug, Clone, PartialEq)]
pub enum SetterValue {
    Constant(ConstantValue),
    /// The value is a full object serialized in the node-stream.
    Object(StreamOffsetToken),
    StaticResource(StringId),
    ThemeResource(StringId),
}

#[derive(Debug, Clone, PartialEq)]
pub struct StyleSetter {
    pub property: XamlPropertyRef,
    pub value: SetterValue,
    pub is_mutable: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StyleData {
    pub version: u8,
    pub setters: Vec<StyleSetter>,
}

fn read_setter<T: ReadSeek>(
    stream: &mut T,
    ctx: &DecodeContext<'_>,
    version: u8,
) -> Result<StyleSetter> {
    let property = read_persisted::<PropertyTable, _>(stream, ctx, "setter property")?;

    let offset = stream.position_or_zero();
    let value = match stream.try_u8_named("setter value kind")? {
        0 => SetterValue::Constant(read_constant(stream, ctx)?),
        1 => SetterValue::Object(read_token(stream, "setter object token")?),
        2 => SetterValue::StaticResource(read_string(stream, ctx, "StaticResource key")?),
        3 => SetterValue::ThemeResource(read_string(stream, ctx, "ThemeResource key")?),
        other => {
            return Err(XbfError::malformed(
                offset,
                format!("unknown setter value kind `{other}`"),
            ));
        }
    };

    let is_mutable = if version >= 2 {
        stream.try_bool_u8_named("setter is mutable")?
    } else {
        false
    };

    Ok(StyleSetter {
        property,
        value,
        is_mutable,
    })
}

pub(super) fn read<T: ReadSeek>(
    stream: &mut T,
    ctx: &DecodeContext<'_>,
    version: u8,
) -> Result<StyleData> {
    let setters = stream.try_read_vector(true, "style setters", |s| read_setter(s, ctx, version))?;
    Ok(StyleData { version, setters })
}
