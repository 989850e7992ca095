//! In-memory representation of a decoded vector tile.
//!
//! Layers, features and properties keep the order they were decoded in.
//! Geometry is carried through untouched as the raw command stream.

use std::collections::BTreeSet;
use std::fmt;

use super::proto::GeomType;

/// Property holding the stable feature identifier.
pub const MERGE_ID_KEY: &str = "merge_id";

/// Property holding the display name.
pub const NAME_KEY: &str = "name";

/// Property holding the fill colour.
pub const COLOR_KEY: &str = "color";

/// Presence-only marker for building features.
pub const BUILDING_KEY: &str = "building";

/// A typed property value.
///
/// Each vector tile value type gets its own variant so a value is written
/// back with the same wire type it was read with.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    String(String),
    Float(f32),
    Double(f64),
    Int(i64),
    UInt(u64),
    SInt(i64),
    Bool(bool),
}

impl PropertyValue {
    /// The string payload, if this is a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::String(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::String(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Bool(value)
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::String(v) => write!(f, "{:?}", v),
            PropertyValue::Float(v) => write!(f, "{}", v),
            PropertyValue::Double(v) => write!(f, "{}", v),
            PropertyValue::Int(v) | PropertyValue::SInt(v) => write!(f, "{}", v),
            PropertyValue::UInt(v) => write!(f, "{}", v),
            PropertyValue::Bool(v) => write!(f, "{}", v),
        }
    }
}

/// Insertion-ordered property bag.
///
/// Features carry a handful of properties, so lookups are linear scans.
/// Replacing an existing key keeps its original position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Properties {
    entries: Vec<(String, PropertyValue)>,
}

impl Properties {
    /// Create an empty property bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a value by key.
    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Whether `key` is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    /// Set `key` to `value`, returning the previous value.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<PropertyValue>,
    ) -> Option<PropertyValue> {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    /// Iterate over entries in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropertyValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<PropertyValue>> FromIterator<(K, V)> for Properties {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut properties = Properties::new();
        for (key, value) in iter {
            properties.insert(key, value);
        }
        properties
    }
}

/// Feature classification used by the patch rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureKind {
    Generic,
    /// Carries the `building` marker property (any value).
    Building,
}

impl FeatureKind {
    /// Classify a feature from its properties.
    pub fn classify(properties: &Properties) -> Self {
        if properties.contains_key(BUILDING_KEY) {
            FeatureKind::Building
        } else {
            FeatureKind::Generic
        }
    }
}

/// Raw feature geometry: type tag plus the encoded command stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Geometry {
    /// Wire value of the geometry type, `None` when the field was absent.
    pub geom_type: Option<i32>,
    pub commands: Vec<u32>,
}

impl Geometry {
    pub fn new(geom_type: GeomType, commands: Vec<u32>) -> Self {
        Self {
            geom_type: Some(geom_type as i32),
            commands,
        }
    }

    /// Typed geometry type; unknown wire values map to `GeomType::Unknown`.
    pub fn kind(&self) -> GeomType {
        self.geom_type
            .and_then(|v| GeomType::try_from(v).ok())
            .unwrap_or(GeomType::Unknown)
    }
}

/// A single feature of a layer.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub id: Option<u64>,
    pub geometry: Geometry,
    pub properties: Properties,
    /// Derived from `properties` when the feature is built.
    pub kind: FeatureKind,
}

impl Feature {
    /// Build a feature, classifying its kind from `properties`.
    pub fn new(id: Option<u64>, geometry: Geometry, properties: Properties) -> Self {
        let kind = FeatureKind::classify(&properties);
        Self {
            id,
            geometry,
            properties,
            kind,
        }
    }

    /// The feature's `merge_id`, if present and string-typed.
    pub fn merge_id(&self) -> Option<&str> {
        self.properties.get(MERGE_ID_KEY).and_then(PropertyValue::as_str)
    }

    pub fn is_building(&self) -> bool {
        self.kind == FeatureKind::Building
    }
}

/// A named layer of features.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub name: String,
    pub version: u32,
    /// Tile extent; `None` when absent on the wire (readers assume 4096).
    pub extent: Option<u32>,
    pub features: Vec<Feature>,
}

impl Layer {
    /// Create an empty version 2 layer with the default extent.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: 2,
            extent: Some(4096),
            features: Vec::new(),
        }
    }
}

/// A decoded tile: layers in wire order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedTile {
    pub layers: Vec<Layer>,
}

impl DecodedTile {
    /// Iterate over every feature of every layer.
    pub fn features(&self) -> impl Iterator<Item = &Feature> {
        self.layers.iter().flat_map(|layer| layer.features.iter())
    }

    /// Mutable iteration over every feature of every layer.
    pub fn features_mut(&mut self) -> impl Iterator<Item = &mut Feature> {
        self.layers
            .iter_mut()
            .flat_map(|layer| layer.features.iter_mut())
    }

    /// Unique `merge_id` values across all layers.
    pub fn merge_ids(&self) -> BTreeSet<&str> {
        self.features().filter_map(Feature::merge_id).collect()
    }

    pub fn feature_count(&self) -> usize {
        self.layers.iter().map(|layer| layer.features.len()).sum()
    }
}
