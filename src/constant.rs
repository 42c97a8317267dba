use crate::err::{Result, XbfError};
use crate::persisted_node::{read_persisted, DecodeContext, StringId, StringTable, TypeTable, XamlTypeRef};
use crate::utils::ReadExt;
use crate::xbf_metadata::XbfMetadata;
use crate::xbf_parser::ReadSeek;

use log::trace;
use std::borrow::Cow;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum PersistedConstantType {
    IsEnum,
    IsNullString,
    IsBoolFalse,
    IsBoolTrue,
    IsColor,
    IsFloat,
    IsGridLength,
    IsSharedString,
    IsSigned,
    IsThickness,
    IsUniqueString,
}

impl PersistedConstantType {
    pub fn from_u8(value: u8) -> Option<PersistedConstantType> {
        match value {
            0 => Some(PersistedConstantType::IsEnum),
            1 => Some(PersistedConstantType::IsNullString),
            2 => Some(PersistedConstantType::IsBoolFalse),
            3 => Some(PersistedConstantType::IsBoolTrue),
            4 => Some(PersistedConstantType::IsColor),
            5 => Some(PersistedConstantType::IsFloat),
            6 => Some(PersistedConstantType::IsGridLength),
            7 => Some(PersistedConstantType::IsSharedString),
            8 => Some(PersistedConstantType::IsSigned),
            9 => Some(PersistedConstantType::IsThickness),
            10 => Some(PersistedConstantType::IsUniqueString),
            _ => None,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum GridUnitType {
    Auto,
    Pixel,
    Star,
}

impl GridUnitType {
    pub fn from_u32(value: u32) -> Option<GridUnitType> {
        match value {
            0 => Some(GridUnitType::Auto),
            1 => Some(GridUnitType::Pixel),
            2 => Some(GridUnitType::Star),
            _ => None,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Thickness {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

/// A decoded literal value.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstantValue {
    Enum { type_ref: XamlTypeRef, value: u32 },
    NullString,
    Bool(bool),
    /// Packed as `0xAARRGGBB`.
    Color(u32),
    Float(f32),
    GridLength { unit_type: GridUnitType, value: f32 },
    SharedString(StringId),
    Signed(i32),
    Thickness(Thickness),
    UniqueString(String),
}

impl ConstantValue {
    pub fn constant_type(&self) -> PersistedConstantType {
        match self {
            ConstantValue::Enum { .. } => PersistedConstantType::IsEnum,
            ConstantValue::NullString => PersistedConstantType::IsNullString,
            ConstantValue::Bool(false) => PersistedConstantType::IsBoolFalse,
            ConstantValue::Bool(true) => PersistedConstantType::IsBoolTrue,
            ConstantValue::Color(_) => PersistedConstantType::IsColor,
            ConstantValue::Float(_) => PersistedConstantType::IsFloat,
            ConstantValue::GridLength { .. } => PersistedConstantType::IsGridLength,
            ConstantValue::SharedString(_) => PersistedConstantType::IsSharedString,
            ConstantValue::Signed(_) => PersistedConstantType::IsSigned,
            ConstantValue::Thickness(_) => PersistedConstantType::IsThickness,
            ConstantValue::UniqueString(_) => PersistedConstantType::IsUniqueString,
        }
    }

    /// The XAML type name of the value. Enums are named after their resolved enum type.
    pub fn type_name<'m>(&self, metadata: &'m XbfMetadata) -> Cow<'m, str> {
        match self {
            ConstantValue::Enum { type_ref, .. } => metadata.type_name(*type_ref),
            ConstantValue::NullString
            | ConstantValue::SharedString(_)
            | ConstantValue::UniqueString(_) => Cow::Borrowed("string"),
            ConstantValue::Bool(_) => Cow::Borrowed("Boolean"),
            ConstantValue::Color(_) => Cow::Borrowed("Color"),
            ConstantValue::Float(_) => Cow::Borrowed("Double"),
            ConstantValue::GridLength { .. } => Cow::Borrowed("GridLength"),
            ConstantValue::Signed(_) => Cow::Borrowed("Int32"),
            ConstantValue::Thickness(_) => Cow::Borrowed("Thickness"),
        }
    }
}

pub(crate) fn read_constant<T: ReadSeek>(
    stream: &mut T,
    ctx: &DecodeContext<'_>,
) -> Result<ConstantValue> {
    let offset = stream.position_or_zero();
    let tag = stream.try_u8_named("constant type")?;
    let constant_type = PersistedConstantType::from_u8(tag).ok_or_else(|| {
        XbfError::malformed(offset, format!("unrecognized constant type `0x{tag:02x}`"))
    })?;

    trace!("Offset `0x{offset:08x}`: constant {constant_type:?}");

    let value = match constant_type {
        PersistedConstantType::IsEnum => {
            let type_ref = read_persisted::<TypeTable, _>(stream, ctx, "enum type")?;
            ConstantValue::Enum {
                type_ref,
                value: stream.try_u32_named("enum value")?,
            }
        }
        PersistedConstantType::IsNullString => ConstantValue::NullString,
        PersistedConstantType::IsBoolFalse => ConstantValue::Bool(false),
        PersistedConstantType::IsBoolTrue => ConstantValue::Bool(true),
        PersistedConstantType::IsColor => ConstantValue::Color(stream.try_u32_named("color")?),
        PersistedConstantType::IsFloat => ConstantValue::Float(stream.try_f32_named("float")?),
        PersistedConstantType::IsGridLength => {
            let unit_offset = stream.position_or_zero();
            let raw_unit = stream.try_u32_named("grid unit type")?;
            let unit_type = GridUnitType::from_u32(raw_unit).ok_or_else(|| {
                XbfError::malformed(unit_offset, format!("unknown grid unit type `{raw_unit}`"))
            })?;
            ConstantValue::GridLength {
                unit_type,
                value: stream.try_f32_named("grid length")?,
            }
        }
        PersistedConstantType::IsSharedString => ConstantValue::SharedString(
            read_persisted::<StringTable, _>(stream, ctx, "shared string")?,
        ),
        PersistedConstantType::IsSigned => ConstantValue::Signed(stream.try_i32_named("signed")?),
        PersistedConstantType::IsThickness => ConstantValue::Thickness(Thickness {
            left: stream.try_f32_named("thickness left")?,
            top: stream.try_f32_named("thickness top")?,
            right: stream.try_f32_named("thickness right")?,
            bottom: stream.try_f32_named("thickness bottom")?,
        }),
        PersistedConstantType::IsUniqueString => {
            ConstantValue::UniqueString(stream.try_xbf_string_named("unique string")?)
        }
    };

    Ok(value)
}
