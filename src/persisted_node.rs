//! Compact 16 bit object references and their two-tier resolution.
//!
//! Bit 15 of a persisted node is the trust flag, bits 0-14 the object id. Trusted ids index
//! the built-in registry in [`crate::known_types`], untrusted ids index the file's own
//! metadata tables.

use crate::err::{Result, XbfError};
use crate::known_types::{self, KNOWN_PROPERTIES, KNOWN_TYPES, KNOWN_XML_NAMESPACES};
use crate::utils::ReadExt;
use crate::xbf_metadata::XbfMetadata;
use crate::xbf_parser::ReadSeek;

use log::{trace, warn};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct PersistedXamlNode {
    pub object_id: u16,
    pub is_trusted: bool,
}

impl PersistedXamlNode {
    const TRUSTED_FLAG: u16 = 0x8000;

    pub fn to_u16(self) -> u16 {
        if self.is_trusted {
            self.object_id | Self::TRUSTED_FLAG
        } else {
            self.object_id
        }
    }
}

impl From<u16> for PersistedXamlNode {
    fn from(raw: u16) -> Self {
        PersistedXamlNode {
            object_id: raw & !Self::TRUSTED_FLAG,
            is_trusted: raw & Self::TRUSTED_FLAG != 0,
        }
    }
}

/// Index into the file's string table.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct StringId(pub u32);

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum XamlTypeRef {
    /// An entry of the built-in registry.
    Known(u16),
    /// A trusted index the built-in registry has no entry for.
    UnknownStable(u16),
    /// An entry of the file's type table.
    Local(u16),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum XamlPropertyRef {
    Known(u16),
    UnknownStable(u16),
    Local(u16),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum XmlNamespaceRef {
    Known(u16),
    UnknownStable(u16),
    Local(u16),
}

/// Everything a decoder needs to resolve references while reading a section.
#[derive(Debug, Copy, Clone)]
pub(crate) struct DecodeContext<'m> {
    pub metadata: &'m XbfMetadata,
    pub strict_trusted_indices: bool,
}

impl<'m> DecodeContext<'m> {
    pub fn new(metadata: &'m XbfMetadata, strict_trusted_indices: bool) -> Self {
        DecodeContext {
            metadata,
            strict_trusted_indices,
        }
    }

    /// Validates a string id that was stored as a plain integer rather than a persisted node.
    pub fn string_id(&self, raw: i32, offset: u64) -> Result<StringId> {
        if raw < 0 {
            return Err(XbfError::malformed(
                offset,
                format!("negative string id `{raw}`"),
            ));
        }

        let len = self.metadata.strings.len();
        if raw as usize >= len {
            return Err(XbfError::index_out_of_range("strings", raw as u32, len));
        }

        Ok(StringId(raw as u32))
    }
}

/// The table a persisted node is resolved against.
pub(crate) trait PersistedTable {
    type Ref;

    const NAME: &'static str;

    fn local_len(metadata: &XbfMetadata) -> usize;

    fn local(id: u16) -> Self::Ref;

    fn trusted(id: u16, strict: bool, offset: u64) -> Result<Self::Ref>;
}

pub(crate) struct TypeTable;
pub(crate) struct PropertyTable;
pub(crate) struct XmlNamespaceTable;
pub(crate) struct StringTable;

fn trusted_or_placeholder<R>(
    id: u16,
    found: bool,
    strict: bool,
    registry: &'static str,
    registry_len: usize,
    known: fn(u16) -> R,
    unknown: fn(u16) -> R,
) -> Result<R> {
    if found {
        Ok(known(id))
    } else if strict {
        Err(XbfError::index_out_of_range(
            registry,
            u32::from(id),
            registry_len,
        ))
    } else {
        warn!("Trusted index {id} has no entry in {registry}, keeping it as a stable index");
        Ok(unknown(id))
    }
}

impl PersistedTable for TypeTable {
    type Ref = XamlTypeRef;

    const NAME: &'static str = "types";

    fn local_len(metadata: &XbfMetadata) -> usize {
        metadata.types.len()
    }

    fn local(id: u16) -> XamlTypeRef {
        XamlTypeRef::Local(id)
    }

    fn trusted(id: u16, strict: bool, _offset: u64) -> Result<XamlTypeRef> {
        trusted_or_placeholder(
            id,
            known_types::known_type(id).is_some(),
            strict,
            "known types",
            KNOWN_TYPES.len(),
            XamlTypeRef::Known,
            XamlTypeRef::UnknownStable,
        )
    }
}

impl PersistedTable for PropertyTable {
    type Ref = XamlPropertyRef;

    const NAME: &'static str = "properties";

    fn local_len(metadata: &XbfMetadata) -> usize {
        metadata.properties.len()
    }

    fn local(id: u16) -> XamlPropertyRef {
        XamlPropertyRef::Local(id)
    }

    fn trusted(id: u16, strict: bool, _offset: u64) -> Result<XamlPropertyRef> {
        trusted_or_placeholder(
            id,
            known_types::known_property(id).is_some(),
            strict,
            "known properties",
            KNOWN_PROPERTIES.len(),
            XamlPropertyRef::Known,
            XamlPropertyRef::UnknownStable,
        )
    }
}

impl PersistedTable for XmlNamespaceTable {
    type Ref = XmlNamespaceRef;

    const NAME: &'static str = "xml namespaces";

    fn local_len(metadata: &XbfMetadata) -> usize {
        metadata.xml_namespaces.len()
    }

    fn local(id: u16) -> XmlNamespaceRef {
        XmlNamespaceRef::Local(id)
    }

    fn trusted(id: u16, strict: bool, _offset: u64) -> Result<XmlNamespaceRef> {
        trusted_or_placeholder(
            id,
            known_types::known_xml_namespace(id).is_some(),
            strict,
            "known xml namespaces",
            KNOWN_XML_NAMESPACES.len(),
            XmlNamespaceRef::Known,
            XmlNamespaceRef::UnknownStable,
        )
    }
}

impl PersistedTable for StringTable {
    type Ref = StringId;

    const NAME: &'static str = "strings";

    fn local_len(metadata: &XbfMetadata) -> usize {
        metadata.strings.len()
    }

    fn local(id: u16) -> StringId {
        StringId(u32::from(id))
    }

    fn trusted(id: u16, _strict: bool, offset: u64) -> Result<StringId> {
        Err(XbfError::malformed(
            offset,
            format!("string reference {id} is marked trusted, but there are no built-in strings"),
        ))
    }
}

impl PersistedXamlNode {
    pub(crate) fn resolve<P: PersistedTable>(
        self,
        ctx: &DecodeContext<'_>,
        offset: u64,
    ) -> Result<P::Ref> {
        if self.is_trusted {
            return P::trusted(self.object_id, ctx.strict_trusted_indices, offset);
        }

        let len = P::local_len(ctx.metadata);
        if usize::from(self.object_id) >= len {
            return Err(XbfError::index_out_of_range(
                P::NAME,
                u32::from(self.object_id),
                len,
            ));
        }

        Ok(P::local(self.object_id))
    }
}

/// Reads a persisted node and resolves it against `P`.
pub(crate) fn read_persisted<P: PersistedTable, T: ReadSeek>(
    stream: &mut T,
    ctx: &DecodeContext<'_>,
    name: &'static str,
) -> Result<P::Ref> {
    let offset = stream.position_or_zero();
    let node = PersistedXamlNode::from(stream.try_u16_named(name)?);
    trace!(
        "Offset `0x{offset:08x}`: {name} -> {} id {}",
        if node.is_trusted { "trusted" } else { "local" },
        node.object_id
    );
    node.resolve::<P>(ctx, offset)
}
