//! Structured payloads attached to visual state groups, resource dictionaries, styles and
//! deferred elements.
//!
//! Every payload starts with a 7-bit encoded [`CustomRuntimeDataTypeIndex`] naming both the
//! family and the layout version. Each family decodes every version it ever had into one
//! struct; fields a version does not carry keep their default.

mod deferred_element;
mod resource_dictionary;
mod style;
mod visual_state;

pub use self::deferred_element::{DeferredElementData, NonDeferredProperty};
pub use self::resource_dictionary::{KeyedToken, ResourceDictionaryData};
pub use self::style::{SetterValue, StyleData, StyleSetter};
pub use self::visual_state::{
    VisualStateData, VisualStateGroupCollectionData, VisualStateGroupData, VisualTransitionData,
};

use crate::err::{Result, XbfError};
use crate::persisted_node::{DecodeContext, StringId};
use crate::utils::ReadExt;
use crate::xbf_parser::ReadSeek;

use log::trace;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum CustomRuntimeDataTypeIndex {
    VisualStateGroupCollectionV1,
    ResourceDictionaryV1,
    StyleV1,
    VisualStateGroupCollectionV2,
    DeferredElementV1,
    ResourceDictionaryV2,
    VisualStateGroupCollectionV3,
    DeferredElementV2,
    StyleV2,
    ResourceDictionaryV3,
    VisualStateGroupCollectionV4,
    DeferredElementV3,
    VisualStateGroupCollectionV5,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum CustomRuntimeDataFamily {
    VisualStateGroupCollection,
    ResourceDictionary,
    Style,
    DeferredElement,
}

impl CustomRuntimeDataTypeIndex {
    pub fn from_i32(value: i32) -> Option<CustomRuntimeDataTypeIndex> {
        use CustomRuntimeDataTypeIndex::*;
        match value {
            0 => Some(VisualStateGroupCollectionV1),
            1 => Some(ResourceDictionaryV1),
            2 => Some(StyleV1),
            3 => Some(VisualStateGroupCollectionV2),
            4 => Some(DeferredElementV1),
            5 => Some(ResourceDictionaryV2),
            6 => Some(VisualStateGroupCollectionV3),
            7 => Some(DeferredElementV2),
            8 => Some(StyleV2),
            9 => Some(ResourceDictionaryV3),
            10 => Some(VisualStateGroupCollectionV4),
            11 => Some(DeferredElementV3),
            12 => Some(VisualStateGroupCollectionV5),
            _ => None,
        }
    }

    pub fn family(self) -> CustomRuntimeDataFamily {
        use CustomRuntimeDataTypeIndex::*;
        match self {
            VisualStateGroupCollectionV1
            | VisualStateGroupCollectionV2
            | VisualStateGroupCollectionV3
            | VisualStateGroupCollectionV4
            | VisualStateGroupCollectionV5 => CustomRuntimeDataFamily::VisualStateGroupCollection,
            ResourceDictionaryV1 | ResourceDictionaryV2 | ResourceDictionaryV3 => {
                CustomRuntimeDataFamily::ResourceDictionary
            }
            StyleV1 | StyleV2 => CustomRuntimeDataFamily::Style,
            DeferredElementV1 | DeferredElementV2 | DeferredElementV3 => {
                CustomRuntimeDataFamily::DeferredElement
            }
        }
    }

    /// Layout version within the family, starting at 1.
    pub fn version(self) -> u8 {
        use CustomRuntimeDataTypeIndex::*;
        match self {
            VisualStateGroupCollectionV1 | ResourceDictionaryV1 | StyleV1 | DeferredElementV1 => 1,
            VisualStateGroupCollectionV2 | ResourceDictionaryV2 | StyleV2 | DeferredElementV2 => 2,
            VisualStateGroupCollectionV3 | ResourceDictionaryV3 | DeferredElementV3 => 3,
            VisualStateGroupCollectionV4 => 4,
            VisualStateGroupCollectionV5 => 5,
        }
    }
}

/// Offset of a serialized object inside the node-stream, used to locate deferred content.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamOffsetToken(pub u32);

#[derive(Debug, Clone, PartialEq)]
pub enum CustomRuntimeData {
    VisualStateGroupCollection(VisualStateGroupCollectionData),
    ResourceDictionary(ResourceDictionaryData),
    Style(StyleData),
    DeferredElement(DeferredElementData),
}

impl CustomRuntimeData {
    pub fn family(&self) -> CustomRuntimeDataFamily {
        match self {
            CustomRuntimeData::VisualStateGroupCollection(_) => {
                CustomRuntimeDataFamily::VisualStateGroupCollection
            }
            CustomRuntimeData::ResourceDictionary(_) => CustomRuntimeDataFamily::ResourceDictionary,
            CustomRuntimeData::Style(_) => CustomRuntimeDataFamily::Style,
            CustomRuntimeData::DeferredElement(_) => CustomRuntimeDataFamily::DeferredElement,
        }
    }

    pub fn version(&self) -> u8 {
        match self {
            CustomRuntimeData::VisualStateGroupCollection(d) => d.version,
            CustomRuntimeData::ResourceDictionary(d) => d.version,
            CustomRuntimeData::Style(d) => d.version,
            CustomRuntimeData::DeferredElement(d) => d.version,
        }
    }
}

pub(crate) fn read_custom_runtime_data<T: ReadSeek>(
    stream: &mut T,
    ctx: &DecodeContext<'_>,
) -> Result<CustomRuntimeData> {
    let offset = stream.position_or_zero();
    let raw = stream.try_7bit_encoded_int_named("custom runtime data type")?;
    let type_index = CustomRuntimeDataTypeIndex::from_i32(raw).ok_or_else(|| {
        XbfError::malformed(
            offset,
            format!("unrecognized custom runtime data type `{raw}`"),
        )
    })?;

    trace!("Offset `0x{offset:08x}`: custom runtime data {type_index:?}");

    let version = type_index.version();
    let data = match type_index.family() {
        CustomRuntimeDataFamily::VisualStateGroupCollection => {
            CustomRuntimeData::VisualStateGroupCollection(visual_state::read(stream, ctx, version)?)
        }
        CustomRuntimeDataFamily::ResourceDictionary => {
            CustomRuntimeData::ResourceDictionary(resource_dictionary::read(stream, ctx, version)?)
        }
        CustomRuntimeDataFamily::Style => CustomRuntimeData::Style(style::read(stream, ctx, version)?),
        CustomRuntimeDataFamily::DeferredElement => {
            CustomRuntimeData::DeferredElement(deferred_element::read(stream, ctx, version)?)
        }
    };

    Ok(data)
}

fn read_token<T: ReadSeek>(stream: &mut T, name: &'static str) -> Result<StreamOffsetToken> {
    let offset = stream.position_or_zero();
    let raw = stream.try_7bit_encoded_int_named(name)?;
    u32::try_from(raw)
        .map(StreamOffsetToken)
        .map_err(|_| XbfError::malformed(offset, format!("negative {name} `{raw}`")))
}

fn read_tokens<T: ReadSeek>(
    stream: &mut T,
    name: &'static str,
) -> Result<Vec<StreamOffsetToken>> {
    stream.try_read_vector(true, name, |s| read_token(s, name))
}

fn read_string<T: ReadSeek>(
    stream: &mut T,
    ctx: &DecodeContext<'_>,
    name: &'static str,
) -> Result<StringId> {
    let offset = stream.position_or_zero();
    let raw = stream.try_7bit_encoded_int_named(name)?;
    ctx.string_id(raw, offset)
}

fn read_strings<T: ReadSeek>(
    stream: &mut T,
    ctx: &DecodeContext<'_>,
    name: &'static str,
) -> Result<Vec<StringId>> {
    stream.try_read_vector(true, name, |s| read_string(s, ctx, name))
}
