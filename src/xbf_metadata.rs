use crate::err::{Result, XbfError};
use crate::known_types;
use crate::persisted_node::{StringId, XamlPropertyRef, XamlTypeRef, XmlNamespaceRef};
use crate::utils::ReadExt;
use crate::xbf_parser::ReadSeek;

use bitflags::bitflags;
use log::{debug, trace, warn};
use std::borrow::Cow;
use std::io::Cursor;

bitflags! {
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
    pub struct TypeFlags: u32 {
        const MARKUP_DIRECTIVE = 0x1;
    }
}

bitflags! {
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
    pub struct PropertyFlags: u32 {
        const XML_PROPERTY = 0x1;
        const MARKUP_DIRECTIVE = 0x2;
        const IMPLICIT_PROPERTY = 0x4;
    }
}

/// Who provides the types of an assembly.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum AssemblyKind {
    Unknown,
    Native,
    Managed,
    System,
    Parser,
    Alternate,
}

impl AssemblyKind {
    pub fn from_u32(value: u32) -> Option<AssemblyKind> {
        match value {
            0 => Some(AssemblyKind::Unknown),
            1 => Some(AssemblyKind::Native),
            2 => Some(AssemblyKind::Managed),
            3 => Some(AssemblyKind::System),
            4 => Some(AssemblyKind::Parser),
            5 => Some(AssemblyKind::Alternate),
            _ => None,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct AssemblyEntry {
    pub kind: AssemblyKind,
    pub string_id: u32,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct TypeNamespaceEntry {
    pub assembly_id: u32,
    pub string_id: u32,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct XamlTypeEntry {
    pub flags: TypeFlags,
    pub type_namespace_id: u32,
    pub string_id: u32,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct XamlPropertyEntry {
    pub flags: PropertyFlags,
    /// Declaring type, an index into the type table.
    pub type_id: u32,
    pub string_id: u32,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct XmlNamespaceEntry {
    pub string_id: u32,
}

/// The file-wide lookup tables every node-stream resolves its local references against.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct XbfMetadata {
    pub strings: Vec<String>,
    pub assemblies: Vec<AssemblyEntry>,
    pub type_namespaces: Vec<TypeNamespaceEntry>,
    pub types: Vec<XamlTypeEntry>,
    pub properties: Vec<XamlPropertyEntry>,
    pub xml_namespaces: Vec<XmlNamespaceEntry>,
}

fn check_index(table: &'static str, index: u32, len: usize) -> Result<()> {
    if index as usize >= len {
        return Err(XbfError::index_out_of_range(table, index, len));
    }
    Ok(())
}

impl XbfMetadata {
    /// Reads exactly `metadata_size` bytes from `stream` and decodes them as the metadata
    /// section. The section must describe all of its bytes, no more and no less.
    pub fn from_stream<T: ReadSeek>(stream: &mut T, metadata_size: u32) -> Result<XbfMetadata> {
        let section_start = stream.position_or_zero();
        let buf = stream.try_bytes_named(metadata_size as usize, "metadata section")?;

        debug!(
            "Metadata section at offset {} ({} bytes)",
            section_start, metadata_size
        );

        XbfMetadata::from_buffer(&buf).map_err(|e| e.at_section(section_start))
    }

    pub(crate) fn from_buffer(buf: &[u8]) -> Result<XbfMetadata> {
        let mut cursor = Cursor::new(buf);

        let strings = cursor.try_read_vector(false, "string table", |c| {
            c.try_xbf_string_named("string table entry")
        })?;

        let assemblies = cursor.try_read_vector(false, "assembly table", |c| {
            let offset = c.position_or_zero();
            let raw_kind = c.try_u32_named("assembly kind")?;
            let kind = AssemblyKind::from_u32(raw_kind).ok_or_else(|| {
                XbfError::malformed(offset, format!("unknown assembly kind `{raw_kind}`"))
            })?;
            Ok(AssemblyEntry {
                kind,
                string_id: c.try_u32_named("assembly name")?,
            })
        })?;

        let type_namespaces = cursor.try_read_vector(false, "type namespace table", |c| {
            Ok(TypeNamespaceEntry {
                assembly_id: c.try_u32_named("type namespace assembly")?,
                string_id: c.try_u32_named("type namespace name")?,
            })
        })?;

        let types = cursor.try_read_vector(false, "type table", |c| {
            let raw_flags = c.try_u32_named("type flags")?;
            let flags = TypeFlags::from_bits_retain(raw_flags);
            if flags.bits() & !TypeFlags::all().bits() != 0 {
                warn!("Type flags `0x{raw_flags:08x}` carry unknown bits");
            }
            Ok(XamlTypeEntry {
                flags,
                type_namespace_id: c.try_u32_named("type namespace")?,
                string_id: c.try_u32_named("type name")?,
            })
        })?;

        let properties = cursor.try_read_vector(false, "property table", |c| {
            let raw_flags = c.try_u32_named("property flags")?;
            let flags = PropertyFlags::from_bits_retain(raw_flags);
            if flags.bits() & !PropertyFlags::all().bits() != 0 {
                warn!("Property flags `0x{raw_flags:08x}` carry unknown bits");
            }
            Ok(XamlPropertyEntry {
                flags,
                type_id: c.try_u32_named("property declaring type")?,
                string_id: c.try_u32_named("property name")?,
            })
        })?;

        let xml_namespaces = cursor.try_read_vector(false, "xml namespace table", |c| {
            Ok(XmlNamespaceEntry {
                string_id: c.try_u32_named("xml namespace")?,
            })
        })?;

        let consumed = cursor.position();
        if consumed != buf.len() as u64 {
            return Err(XbfError::malformed(
                consumed,
                format!(
                    "metadata tables end after {consumed} bytes, but the section is {} bytes long",
                    buf.len()
                ),
            ));
        }

        let metadata = XbfMetadata {
            strings,
            assemblies,
            type_namespaces,
            types,
            properties,
            xml_namespaces,
        };

        metadata.validate()?;

        debug!(
            "Metadata: {} strings, {} assemblies, {} type namespaces, {} types, {} properties, {} xml namespaces",
            metadata.strings.len(),
            metadata.assemblies.len(),
            metadata.type_namespaces.len(),
            metadata.types.len(),
            metadata.properties.len(),
            metadata.xml_namespaces.len()
        );

        Ok(metadata)
    }

    /// Bounds-checks every reference one table makes into another.
    fn validate(&self) -> Result<()> {
        let strings = self.strings.len();

        for a in &self.assemblies {
            check_index("strings", a.string_id, strings)?;
        }
        for ns in &self.type_namespaces {
            check_index("assemblies", ns.assembly_id, self.assemblies.len())?;
            check_index("strings", ns.string_id, strings)?;
        }
        for t in &self.types {
            check_index("type namespaces", t.type_namespace_id, self.type_namespaces.len())?;
            check_index("strings", t.string_id, strings)?;
        }
        for p in &self.properties {
            check_index("types", p.type_id, self.types.len())?;
            check_index("strings", p.string_id, strings)?;
        }
        for ns in &self.xml_namespaces {
            check_index("strings", ns.string_id, strings)?;
        }

        trace!("Metadata cross references are in range");
        Ok(())
    }

    pub fn string(&self, id: StringId) -> Option<&str> {
        self.strings.get(id.0 as usize).map(String::as_str)
    }

    fn string_or_placeholder(&self, id: u32) -> Cow<'_, str> {
        match self.strings.get(id as usize) {
            Some(s) => Cow::Borrowed(s.as_str()),
            None => Cow::Owned(format!("<missing string {id}>")),
        }
    }

    pub fn type_name(&self, type_ref: XamlTypeRef) -> Cow<'_, str> {
        match type_ref {
            XamlTypeRef::Known(index) => match known_types::known_type(index) {
                Some(t) => Cow::Borrowed(t.name),
                None => Cow::Owned(format!("StableXbfTypeIndex::{index}")),
            },
            XamlTypeRef::UnknownStable(index) => Cow::Owned(format!("StableXbfTypeIndex::{index}")),
            XamlTypeRef::Local(index) => match self.types.get(usize::from(index)) {
                Some(t) => self.string_or_placeholder(t.string_id),
                None => Cow::Owned(format!("<missing type {index}>")),
            },
        }
    }

    /// The type name qualified with its namespace, e.g. `Microsoft.UI.Xaml.Controls.Grid`.
    pub fn full_type_name(&self, type_ref: XamlTypeRef) -> Cow<'_, str> {
        match type_ref {
            XamlTypeRef::Known(index) => match known_types::known_type(index) {
                Some(t) => Cow::Owned(t.full_name()),
                None => self.type_name(type_ref),
            },
            XamlTypeRef::UnknownStable(_) => self.type_name(type_ref),
            XamlTypeRef::Local(index) => {
                let Some(t) = self.types.get(usize::from(index)) else {
                    return self.type_name(type_ref);
                };
                match self.type_namespaces.get(t.type_namespace_id as usize) {
                    Some(ns) => Cow::Owned(format!(
                        "{}.{}",
                        self.string_or_placeholder(ns.string_id),
                        self.string_or_placeholder(t.string_id)
                    )),
                    None => self.type_name(type_ref),
                }
            }
        }
    }

    pub fn property_name(&self, property_ref: XamlPropertyRef) -> Cow<'_, str> {
        match property_ref {
            XamlPropertyRef::Known(index) => match known_types::known_property(index) {
                Some(p) => Cow::Borrowed(p.name),
                None => Cow::Owned(format!("StableXbfPropertyIndex::{index}")),
            },
            XamlPropertyRef::UnknownStable(index) => {
                Cow::Owned(format!("StableXbfPropertyIndex::{index}"))
            }
            XamlPropertyRef::Local(index) => match self.properties.get(usize::from(index)) {
                Some(p) => self.string_or_placeholder(p.string_id),
                None => Cow::Owned(format!("<missing property {index}>")),
            },
        }
    }

    /// The type declaring a property, when it is known.
    pub fn property_declaring_type(&self, property_ref: XamlPropertyRef) -> Option<XamlTypeRef> {
        match property_ref {
            XamlPropertyRef::Known(index) => known_types::known_property(index)
                .map(|p| XamlTypeRef::Known(p.declaring_type)),
            XamlPropertyRef::UnknownStable(_) => None,
            XamlPropertyRef::Local(index) => {
                let p = self.properties.get(usize::from(index))?;
                u16::try_from(p.type_id).ok().map(XamlTypeRef::Local)
            }
        }
    }

    pub fn xml_namespace(&self, namespace_ref: XmlNamespaceRef) -> Cow<'_, str> {
        match namespace_ref {
            XmlNamespaceRef::Known(index) => match known_types::known_xml_namespace(index) {
                Some(ns) => Cow::Borrowed(ns.uri),
                None => Cow::Owned(format!("StableXbfXmlNamespaceIndex::{index}")),
            },
            XmlNamespaceRef::UnknownStable(index) => {
                Cow::Owned(format!("StableXbfXmlNamespaceIndex::{index}"))
            }
            XmlNamespaceRef::Local(index) => match self.xml_namespaces.get(usize::from(index)) {
                Some(ns) => self.string_or_placeholder(ns.string_id),
                None => Cow::Owned(format!("<missing xml namespace {index}>")),
            },
        }
    }

    /// Finds a type by its short name, preferring the built-in registry over the file's own
    /// type table.
    pub fn find_type(&self, name: &str) -> Option<XamlTypeRef> {
        if let Some(known) = known_types::known_type_by_name(name) {
            return Some(XamlTypeRef::Known(known.index));
        }

        self.types
            .iter()
            .position(|t| self.strings.get(t.string_id as usize).map(String::as_str) == Some(name))
            .and_then(|i| u16::try_from(i).ok())
            .map(XamlTypeRef::Local)
    }
}
