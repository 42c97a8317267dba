use crate::constant::{ConstantValue, GridUnitType};
use crate::custom_runtime_data::{
    CustomRuntimeData, DeferredElementData, KeyedToken, ResourceDictionaryData, SetterValue,
    StreamOffsetToken, StyleData, VisualStateGroupCollectionData,
};
use crate::node_stream::{LineInfoEntry, NodeStream, XamlNode};
use crate::persisted_node::{StringId, XamlPropertyRef};
use crate::xbf_file::XbfFile;
use crate::xbf_metadata::XbfMetadata;

use serde_json::{json, Value};

/// Renders decoded structures as JSON, with every reference replaced by the name it
/// resolves to.
struct JsonRenderer<'a> {
    metadata: &'a XbfMetadata,
}

impl<'a> JsonRenderer<'a> {
    fn string(&self, id: StringId) -> Value {
        match self.metadata.string(id) {
            Some(s) => Value::String(s.to_owned()),
            None => Value::Null,
        }
    }

    fn strings(&self, ids: &[StringId]) -> Value {
        Value::Array(ids.iter().map(|id| self.string(*id)).collect())
    }

    fn tokens(tokens: &[StreamOffsetToken]) -> Value {
        json!(tokens.iter().map(|t| t.0).collect::<Vec<_>>())
    }

    fn property(&self, property: XamlPropertyRef) -> Value {
        let name = self.metadata.property_name(property);
        match self.metadata.property_declaring_type(property) {
            Some(t) => json!(format!("{}.{}", self.metadata.type_name(t), name)),
            None => json!(name),
        }
    }

    fn metadata(&self) -> Value {
        let m = self.metadata;
        let name = |id: u32| self.string(StringId(id));

        json!({
            "strings": m.strings,
            "assemblies": m.assemblies.iter().map(|a| json!({
                "kind": format!("{:?}", a.kind),
                "name": name(a.string_id),
            })).collect::<Vec<_>>(),
            "typeNamespaces": m.type_namespaces.iter().map(|ns| json!({
                "assembly": ns.assembly_id,
                "name": name(ns.string_id),
            })).collect::<Vec<_>>(),
            "types": m.types.iter().map(|t| json!({
                "flags": t.flags.bits(),
                "namespace": t.type_namespace_id,
                "name": name(t.string_id),
            })).collect::<Vec<_>>(),
            "properties": m.properties.iter().map(|p| json!({
                "flags": p.flags.bits(),
                "declaringType": p.type_id,
                "name": name(p.string_id),
            })).collect::<Vec<_>>(),
            "xmlNamespaces": m.xml_namespaces.iter().map(|ns| name(ns.string_id)).collect::<Vec<_>>(),
        })
    }

    fn constant(&self, value: &ConstantValue) -> Value {
        let rendered = match value {
            ConstantValue::Enum { value, .. } => json!(value),
            ConstantValue::NullString => Value::Null,
            ConstantValue::Bool(b) => json!(b),
            ConstantValue::Color(argb) => json!(format!("#{argb:08X}")),
            ConstantValue::Float(f) => json!(f),
            ConstantValue::GridLength { unit_type, value } => match unit_type {
                GridUnitType::Auto => json!("Auto"),
                GridUnitType::Pixel => json!(value),
                GridUnitType::Star => json!(format!("{value}*")),
            },
            ConstantValue::SharedString(id) => self.string(*id),
            ConstantValue::Signed(i) => json!(i),
            ConstantValue::Thickness(t) => json!([t.left, t.top, t.right, t.bottom]),
            ConstantValue::UniqueString(s) => json!(s),
        };

        json!({
            "type": value.type_name(self.metadata),
            "value": rendered,
        })
    }

    fn visual_states(&self, data: &VisualStateGroupCollectionData) -> Value {
        json!({
            "entireCollectionToken": data.entire_collection_token.0,
            "groups": data.groups.iter().map(|g| json!({
                "name": self.string(g.name),
                "token": g.deferred_self_token.0,
                "hasDynamicTimelines": g.has_dynamic_timelines,
            })).collect::<Vec<_>>(),
            "states": data.states.iter().map(|s| json!({
                "name": self.string(s.name),
                "group": s.group_index,
                "storyboardToken": s.storyboard_token.map(|t| t.0),
                "propertySetterTokens": Self::tokens(&s.property_setter_tokens),
                "stateTriggerValues": s.state_trigger_values,
                "stateTriggerCollectionTokens": Self::tokens(&s.state_trigger_collection_tokens),
                "extensibleStateTriggerTokens": Self::tokens(&s.extensible_state_trigger_tokens),
                "staticResourceTriggerTokens": Self::tokens(&s.static_resource_trigger_tokens),
            })).collect::<Vec<_>>(),
            "transitions": data.transitions.iter().map(|t| json!({
                "from": t.from.map_or(Value::Null, |id| self.string(id)),
                "to": t.to.map_or(Value::Null, |id| self.string(id)),
                "token": t.token.0,
            })).collect::<Vec<_>>(),
            "seenNameDirectives": self.strings(&data.seen_name_directives),
            "unexpectedTokensDetected": data.unexpected_tokens_detected,
        })
    }

    fn resource_dictionary(&self, data: &ResourceDictionaryData) -> Value {
        let keyed = |keys: &[KeyedToken]| {
            keys.iter()
                .map(|k| json!({ "key": self.string(k.key), "token": k.token.0 }))
                .collect::<Vec<_>>()
        };

        json!({
            "explicitKeys": keyed(&data.explicit_keys),
            "implicitKeys": keyed(&data.implicit_keys),
            "xNameKeys": self.strings(&data.x_name_keys),
            "conditionallyDeclaredTokens": Self::tokens(&data.conditionally_declared_tokens),
        })
    }

    fn style(&self, data: &StyleData) -> Value {
        let setters: Vec<Value> = data
            .setters
            .iter()
            .map(|s| {
                let value = match &s.value {
                    SetterValue::Constant(c) => json!({ "constant": self.constant(c) }),
                    SetterValue::Object(token) => json!({ "objectToken": token.0 }),
                    SetterValue::StaticResource(key) => json!({ "staticResource": self.string(*key) }),
                    SetterValue::ThemeResource(key) => json!({ "themeResource": self.string(*key) }),
                };
                json!({
                    "property": self.property(s.property),
                    "value": value,
                    "isMutable": s.is_mutable,
                })
            })
            .collect();

        json!({ "setters": setters })
    }

    fn deferred_element(&self, data: &DeferredElementData) -> Value {
        json!({
            "name": self.string(data.name),
            "nonDeferredProperties": data.non_deferred_properties.iter().map(|p| json!({
                "property": self.property(p.property),
                "value": self.constant(&p.value),
            })).collect::<Vec<_>>(),
            "realize": data.realize,
            "hasLoadBinding": data.has_load_binding,
        })
    }

    fn custom_runtime_data(&self, data: &CustomRuntimeData) -> Value {
        let body = match data {
            CustomRuntimeData::VisualStateGroupCollection(d) => self.visual_states(d),
            CustomRuntimeData::ResourceDictionary(d) => self.resource_dictionary(d),
            CustomRuntimeData::Style(d) => self.style(d),
            CustomRuntimeData::DeferredElement(d) => self.deferred_element(d),
        };

        json!({
            "family": format!("{:?}", data.family()),
            "version": data.version(),
            "data": body,
        })
    }

    fn node(&self, offset: u32, node: &XamlNode) -> Value {
        let mut out = json!({
            "offset": offset,
            "node": format!("{:?}", node.node_type()),
        });

        let extra = match node {
            XamlNode::StartObject(t) => json!({ "objectType": self.metadata.full_type_name(*t) }),
            XamlNode::StartProperty(p) => json!({ "property": self.property(*p) }),
            XamlNode::Text(id) => json!({ "text": self.string(*id) }),
            XamlNode::Value(c) => json!({ "value": self.constant(c) }),
            XamlNode::Namespace { prefix, namespace } => json!({
                "prefix": self.string(*prefix),
                "namespace": self.metadata.xml_namespace(*namespace),
            }),
            XamlNode::LineInfo {
                line_delta,
                column_delta,
            } => json!({ "lineDelta": line_delta, "columnDelta": column_delta }),
            XamlNode::LineInfoAbsolute { line, column } => {
                json!({ "line": line, "column": column })
            }
            XamlNode::CustomRuntimeData {
                data,
                substream_index,
            } => json!({
                "customRuntimeData": self.custom_runtime_data(data),
                "substream": substream_index,
            }),
            XamlNode::EndObject
            | XamlNode::EndProperty
            | XamlNode::EndOfAttributes
            | XamlNode::EndOfStream => Value::Null,
        };

        if let (Some(out), Value::Object(extra)) = (out.as_object_mut(), extra) {
            out.extend(extra);
        }

        out
    }

    fn line_info(entries: &[LineInfoEntry]) -> Value {
        Value::Array(
            entries
                .iter()
                .map(|e| json!({ "nodeOffset": e.node_offset, "line": e.line, "column": e.column }))
                .collect(),
        )
    }

    fn node_stream(&self, stream: &NodeStream) -> Value {
        json!({
            "nodes": stream.nodes.iter().map(|n| self.node(n.offset, &n.node)).collect::<Vec<_>>(),
            "lineInfo": Self::line_info(&stream.line_info),
        })
    }
}

impl XbfFile {
    /// Renders the whole file as JSON, resolving references to names.
    pub fn to_json_value(&self) -> Value {
        let renderer = JsonRenderer {
            metadata: &self.metadata,
        };

        let substreams: Vec<Value> = self
            .substreams
            .iter()
            .zip(&self.node_streams)
            .map(|(info, stream)| {
                let mut value = renderer.node_stream(stream);
                if let Some(obj) = value.as_object_mut() {
                    obj.insert("nodestreamOffset".to_owned(), json!(info.nodestream_offset));
                    obj.insert("linestreamOffset".to_owned(), json!(info.linestream_offset));
                }
                value
            })
            .collect();

        json!({
            "header": {
                "metadataSize": self.header.metadata_size,
                "nodestreamSize": self.header.nodestream_size,
                "version": self.header.version.map(|v| json!({ "major": v.major, "minor": v.minor })),
            },
            "metadata": renderer.metadata(),
            "substreams": substreams,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constant::Thickness;
    use crate::persisted_node::XamlTypeRef;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_renders_constants() {
        let metadata = XbfMetadata {
            strings: vec!["Hi".to_string()],
            ..Default::default()
        };
        let renderer = JsonRenderer {
            metadata: &metadata,
        };

        assert_eq!(
            renderer.constant(&ConstantValue::Thickness(Thickness {
                left: 1.0,
                top: 2.0,
                right: 3.0,
                bottom: 4.0
            })),
            json!({ "type": "Thickness", "value": [1.0, 2.0, 3.0, 4.0] })
        );
        assert_eq!(
            renderer.constant(&ConstantValue::Color(0xFF00_80FF)),
            json!({ "type": "Color", "value": "#FF0080FF" })
        );
        assert_eq!(
            renderer.constant(&ConstantValue::SharedString(StringId(0))),
            json!({ "type": "string", "value": "Hi" })
        );
        assert_eq!(
            renderer.constant(&ConstantValue::Enum {
                type_ref: XamlTypeRef::Known(26),
                value: 1
            }),
            json!({ "type": "Visibility", "value": 1 })
        );
        assert_eq!(
            renderer.constant(&ConstantValue::GridLength {
                unit_type: GridUnitType::Star,
                value: 2.0
            }),
            json!({ "type": "GridLength", "value": "2*" })
        );
    }

    #[test]
    fn test_renders_nodes_with_names() {
        let metadata = XbfMetadata::default();
        let renderer = JsonRenderer {
            metadata: &metadata,
        };

        assert_eq!(
            renderer.node(3, &XamlNode::StartObject(XamlTypeRef::Known(34))),
            json!({
                "offset": 3,
                "node": "StartObject",
                "objectType": "Microsoft.UI.Xaml.Controls.Grid",
            })
        );
        assert_eq!(
            renderer.node(9, &XamlNode::StartProperty(XamlPropertyRef::Known(21))),
            json!({ "offset": 9, "node": "StartProperty", "property": "Grid.Row" })
        );
        assert_eq!(
            renderer.node(12, &XamlNode::EndOfStream),
            json!({ "offset": 12, "node": "EndOfStream" })
        );
    }
}
