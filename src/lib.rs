#![deny(unused_must_use)]
#![forbid(unsafe_code)]
// Don't allow dbg! prints in release.
#![cfg_attr(not(debug_assertions), deny(clippy::dbg_macro))]

pub use constant::{ConstantValue, GridUnitType, PersistedConstantType, Thickness};
pub use custom_runtime_data::{
    CustomRuntimeData, CustomRuntimeDataFamily, CustomRuntimeDataTypeIndex, StreamOffsetToken,
};
pub use err::{Result, XbfError, XbfErrorKind};
pub use node_stream::{LineInfoEntry, NodeStream, XamlNode, XamlNodeType, XbfNode};
pub use persisted_node::{PersistedXamlNode, StringId, XamlPropertyRef, XamlTypeRef, XmlNamespaceRef};
pub use substream::SubstreamInfo;
pub use xbf_file::XbfFile;
pub use xbf_file_header::{XbfFileHeader, XbfFileVersion, XBF_MAGIC};
pub use xbf_metadata::{
    AssemblyEntry, AssemblyKind, PropertyFlags, TypeFlags, TypeNamespaceEntry, XamlPropertyEntry,
    XamlTypeEntry, XbfMetadata, XmlNamespaceEntry,
};
pub use xbf_parser::{HeaderVariant, ParserSettings, ReadSeek, XbfParser};

pub mod constant;
pub mod custom_runtime_data;
pub mod err;
pub mod known_types;
pub mod node_stream;
pub mod persisted_node;
pub mod substream;
pub mod xbf_file;
pub mod xbf_file_header;
pub mod xbf_metadata;
pub mod xbf_parser;

mod json_output;
mod utils;

#[cfg(test)]
use std::sync::Once;

#[cfg(test)]
static LOGGER_INIT: Once = Once::new();

// Rust runs the tests concurrently, so unless we synchronize logging access
// it will crash when attempting to run `cargo test` with some logging facilities.
#[cfg(test)]
pub fn ensure_env_logger_initialized() {
    use std::io::Write;

    LOGGER_INIT.call_once(|| {
        let mut builder = env_logger::Builder::from_default_env();
        builder
            .format(|buf, record| writeln!(buf, "[{}] - {}", record.level(), record.args()))
            .init();
    });
}
