//! Built-in registry of well-known types, properties and XML namespaces.
//!
//! Trusted persisted nodes carry an index into these tables instead of an index into the
//! file's own metadata. The tables are immutable and shared by every parse; an entry's index
//! is its position in the table.

use std::sync::OnceLock;

use ahash::RandomState;
use hashbrown::HashMap;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct KnownType {
    pub index: u16,
    pub namespace: &'static str,
    pub name: &'static str,
}

impl KnownType {
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.namespace, self.name)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct KnownProperty {
    pub index: u16,
    /// Index of the declaring type in the known type table.
    pub declaring_type: u16,
    pub name: &'static str,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct KnownXmlNamespace {
    pub index: u16,
    pub uri: &'static str,
}

const XAML: &str = "Microsoft.UI.Xaml";
const CONTROLS: &str = "Microsoft.UI.Xaml.Controls";
const MEDIA: &str = "Microsoft.UI.Xaml.Media";
const ANIMATION: &str = "Microsoft.UI.Xaml.Media.Animation";
const DATA: &str = "Microsoft.UI.Xaml.Data";
const FOUNDATION: &str = "Windows.Foundation";
const UI: &str = "Windows.UI";

macro_rules! known_types {
    ($($index:literal => $namespace:ident . $name:literal),* $(,)?) => {
        &[$(KnownType { index: $index, namespace: $namespace, name: $name }),*]
    };
}

macro_rules! known_properties {
    ($($index:literal => ($declaring_type:literal, $name:literal)),* $(,)?) => {
        &[$(KnownProperty { index: $index, declaring_type: $declaring_type, name: $name }),*]
    };
}

pub(crate) const KNOWN_TYPES: &[KnownType] = known_types![
    0 => FOUNDATION."Object",
    1 => FOUNDATION."String",
    2 => FOUNDATION."Boolean",
    3 => FOUNDATION."Double",
    4 => FOUNDATION."Int32",
    5 => UI."Color",
    6 => XAML."DependencyObject",
    7 => XAML."UIElement",
    8 => XAML."FrameworkElement",
    9 => XAML."Application",
    10 => XAML."ResourceDictionary",
    11 => XAML."Style",
    12 => XAML."Setter",
    13 => XAML."SetterBaseCollection",
    14 => XAML."DataTemplate",
    15 => XAML."VisualStateManager",
    16 => XAML."VisualStateGroup",
    17 => XAML."VisualState",
    18 => XAML."VisualTransition",
    19 => XAML."StateTrigger",
    20 => XAML."AdaptiveTrigger",
    21 => XAML."Thickness",
    22 => XAML."CornerRadius",
    23 => XAML."GridLength",
    24 => XAML."GridUnitType",
    25 => XAML."Duration",
    26 => XAML."Visibility",
    27 => XAML."HorizontalAlignment",
    28 => XAML."VerticalAlignment",
    29 => XAML."TextWrapping",
    30 => CONTROLS."Control",
    31 => CONTROLS."ContentControl",
    32 => CONTROLS."ControlTemplate",
    33 => CONTROLS."Panel",
    34 => CONTROLS."Grid",
    35 => CONTROLS."StackPanel",
    36 => CONTROLS."Canvas",
    37 => CONTROLS."Border",
    38 => CONTROLS."Button",
    39 => CONTROLS."CheckBox",
    40 => CONTROLS."TextBlock",
    41 => CONTROLS."TextBox",
    42 => CONTROLS."Image",
    43 => CONTROLS."ContentPresenter",
    44 => CONTROLS."ItemsControl",
    45 => CONTROLS."ListView",
    46 => CONTROLS."ScrollViewer",
    47 => CONTROLS."Page",
    48 => CONTROLS."UserControl",
    49 => CONTROLS."Orientation",
    50 => CONTROLS."ColumnDefinition",
    51 => CONTROLS."RowDefinition",
    52 => MEDIA."Brush",
    53 => MEDIA."SolidColorBrush",
    54 => MEDIA."FontFamily",
    55 => MEDIA."Transform",
    56 => ANIMATION."Storyboard",
    57 => ANIMATION."DoubleAnimation",
    58 => ANIMATION."ObjectAnimationUsingKeyFrames",
    59 => ANIMATION."DiscreteObjectKeyFrame",
    60 => DATA."Binding",
];

pub(crate) const KNOWN_PROPERTIES: &[KnownProperty] = known_properties![
    0 => (8, "Name"),
    1 => (8, "Width"),
    2 => (8, "Height"),
    3 => (8, "Margin"),
    4 => (8, "HorizontalAlignment"),
    5 => (8, "VerticalAlignment"),
    6 => (8, "Style"),
    7 => (8, "Resources"),
    8 => (7, "Visibility"),
    9 => (7, "Opacity"),
    10 => (30, "Template"),
    11 => (30, "Background"),
    12 => (30, "Foreground"),
    13 => (30, "BorderBrush"),
    14 => (30, "BorderThickness"),
    15 => (30, "Padding"),
    16 => (30, "FontSize"),
    17 => (30, "FontFamily"),
    18 => (31, "Content"),
    19 => (33, "Children"),
    20 => (33, "Background"),
    21 => (34, "Row"),
    22 => (34, "Column"),
    23 => (34, "RowSpan"),
    24 => (34, "ColumnSpan"),
    25 => (34, "RowDefinitions"),
    26 => (34, "ColumnDefinitions"),
    27 => (35, "Orientation"),
    28 => (40, "Text"),
    29 => (40, "TextWrapping"),
    30 => (40, "FontWeight"),
    31 => (37, "Child"),
    32 => (37, "CornerRadius"),
    33 => (11, "TargetType"),
    34 => (11, "Setters"),
    35 => (11, "BasedOn"),
    36 => (12, "Property"),
    37 => (12, "Value"),
    38 => (12, "Target"),
    39 => (15, "VisualStateGroups"),
    40 => (16, "States"),
    41 => (16, "Transitions"),
    42 => (17, "Storyboard"),
    43 => (17, "Setters"),
    44 => (17, "StateTriggers"),
    45 => (20, "MinWindowWidth"),
    46 => (20, "MinWindowHeight"),
    47 => (56, "TargetName"),
    48 => (56, "TargetProperty"),
    49 => (50, "Width"),
    50 => (51, "Height"),
    51 => (53, "Color"),
    52 => (32, "TargetType"),
    53 => (60, "Path"),
    54 => (10, "MergedDictionaries"),
    55 => (10, "ThemeDictionaries"),
];

pub(crate) const KNOWN_XML_NAMESPACES: &[KnownXmlNamespace] = &[
    KnownXmlNamespace {
        index: 0,
        uri: "http://schemas.microsoft.com/winfx/2006/xaml/presentation",
    },
    KnownXmlNamespace {
        index: 1,
        uri: "http://schemas.microsoft.com/winfx/2006/xaml",
    },
    KnownXmlNamespace {
        index: 2,
        uri: "http://schemas.microsoft.com/expression/blend/2008",
    },
    KnownXmlNamespace {
        index: 3,
        uri: "http://schemas.openxmlformats.org/markup-compatibility/2006",
    },
];

pub fn known_type(index: u16) -> Option<&'static KnownType> {
    KNOWN_TYPES.get(usize::from(index))
}

pub fn known_property(index: u16) -> Option<&'static KnownProperty> {
    KNOWN_PROPERTIES.get(usize::from(index))
}

pub fn known_xml_namespace(index: u16) -> Option<&'static KnownXmlNamespace> {
    KNOWN_XML_NAMESPACES.get(usize::from(index))
}

type NameIndex<K> = HashMap<K, u16, RandomState>;

fn type_name_index() -> &'static NameIndex<&'static str> {
    static INDEX: OnceLock<NameIndex<&'static str>> = OnceLock::new();
    INDEX.get_or_init(|| {
        let mut map = NameIndex::with_capacity_and_hasher(KNOWN_TYPES.len(), RandomState::new());
        for t in KNOWN_TYPES {
            map.insert(t.name, t.index);
        }
        map
    })
}

fn property_name_index() -> &'static NameIndex<(u16, &'static str)> {
    static INDEX: OnceLock<NameIndex<(u16, &'static str)>> = OnceLock::new();
    INDEX.get_or_init(|| {
        let mut map =
            NameIndex::with_capacity_and_hasher(KNOWN_PROPERTIES.len(), RandomState::new());
        for p in KNOWN_PROPERTIES {
            map.insert((p.declaring_type, p.name), p.index);
        }
        map
    })
}

/// Looks up a known type by its short name (`"Grid"`, `"Style"`).
pub fn known_type_by_name(name: &str) -> Option<&'static KnownType> {
    type_name_index()
        .get(name)
        .and_then(|&index| known_type(index))
}

/// Looks up a known property by its declaring type's short name and its own name.
pub fn known_property_by_name(type_name: &str, property_name: &str) -> Option<&'static KnownProperty> {
    let declaring_type = known_type_by_name(type_name)?.index;
    property_name_index()
        .get(&(declaring_type, property_name))
        .and_then(|&index| known_property(index))
}
