use super::read_string;
use crate::constant::{read_constant, ConstantValue};
use crate::err::Result;
use crate::persisted_node::{read_persisted, DecodeContext, PropertyTable, StringId, XamlPropertyRef};
use crate::utils::ReadExt;
use crate::xbf_parser::ReadSeek;

/// A property whose value is applied when the element is created, before it is realized.
#[derive(Debug, Clone, PartialEq)]
pub struct NonDeferredProperty {
    pub property: XamlPropertyRef,
    pub value: ConstantValue,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeferredElementData {
    pub version: u8,
    pub name: StringId,
    pub non_deferred_properties: Vec<NonDeferredProperty>,
    pub realize: bool,
    pub has_load_binding: bool,
}

pub(super) fn read<T: ReadSeek>(
    stream: &mut T,
    ctx: &DecodeContext<'_>,
    version: u8,
) -> Result<DeferredElementData> {
    let name = read_string(stream, ctx, "deferred element name")?;

    let non_deferred_properties = stream.try_read_vector(true, "non-deferred properties", |s| {
        Ok(NonDeferredProperty {
            property: read_persisted::<PropertyTable, _>(s, ctx, "non-deferred property")?,
            value: read_constant(s, ctx)?,
        })
    })?;

    let realize = if version >= 2 {
        stream.try_bool_u8_named("realize")?
    } else {
        false
    };

    let has_load_binding = if version >= 3 {
        stream.try_bool_u8_named("has load binding")?
    } else {
        false
    };

    Ok(DeferredElementData {
        version,
        name,
        non_deferred_properties,
        realize,
        has_load_binding,
    })
}
