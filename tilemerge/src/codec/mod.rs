//! Tile codec: gzip-framed Mapbox Vector Tiles to and from [`DecodedTile`].
//!
//! [`decode`] requires the gzip framing that [`encode`] produces. Geometry
//! command streams and feature ids pass through untouched; property values
//! keep their wire type. On encode every layer gets fresh key/value tables,
//! interned in first-use order, so an unmodified tile re-encodes to the same
//! structure it was decoded from.

mod model;
pub mod proto;

pub use model::{
    DecodedTile, Feature, FeatureKind, Geometry, Layer, Properties, PropertyValue, BUILDING_KEY,
    COLOR_KEY, MERGE_ID_KEY, NAME_KEY,
};
pub use proto::GeomType;

use std::collections::HashMap;
use std::io::{self, Read, Write};

use bytes::Bytes;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use prost::Message;
use thiserror::Error;

use crate::store::RawTile;

/// Content type of an encoded tile.
pub const CONTENT_TYPE: &str = "application/x-protobuf";

/// Content encoding of an encoded tile.
pub const CONTENT_ENCODING: &str = "gzip";

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Errors raised while decoding or encoding tiles.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Payload does not start with the gzip magic bytes.
    #[error("Tile payload is not gzip-compressed")]
    NotGzip,

    /// The gzip stream is truncated, corrupt or fails its checksum.
    #[error("Failed to decompress tile: {0}")]
    Decompress(#[source] io::Error),

    /// The decompressed bytes are not a vector tile message.
    #[error("Failed to parse vector tile: {0}")]
    Parse(#[from] prost::DecodeError),

    /// A feature references keys or values that do not exist.
    #[error("Malformed feature {feature} in layer '{layer}': {reason}")]
    MalformedFeature {
        layer: String,
        feature: usize,
        reason: String,
    },

    /// A value entry has no typed field set.
    #[error("Value {index} in layer '{layer}' has no typed field")]
    EmptyValue { layer: String, index: usize },

    /// A layer has more distinct keys or values than tag indices can address.
    #[error("Layer '{0}' has too many distinct keys or values to encode")]
    TableOverflow(String),

    /// Compressing the encoded tile failed.
    #[error("Failed to compress tile: {0}")]
    Compress(#[source] io::Error),
}

impl CodecError {
    /// Whether this error came from the encode path.
    pub fn is_encode(&self) -> bool {
        matches!(self, CodecError::TableOverflow(_) | CodecError::Compress(_))
    }
}

/// Decode a gzip-compressed vector tile.
///
/// # Errors
///
/// Returns a `CodecError` if decompression or structural parsing fails. No
/// partial tile is ever returned.
pub fn decode(raw: &RawTile) -> Result<DecodedTile, CodecError> {
    decode_bytes(raw.as_bytes())
}

/// Decode a gzip-compressed vector tile from a byte slice.
pub fn decode_bytes(data: &[u8]) -> Result<DecodedTile, CodecError> {
    let payload = gunzip(data)?;
    let tile = proto::Tile::decode(payload.as_slice())?;
    let layers = tile
        .layers
        .into_iter()
        .map(decode_layer)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(DecodedTile { layers })
}

/// Encode a tile to gzip-compressed vector tile bytes.
pub fn encode(tile: &DecodedTile) -> Result<RawTile, CodecError> {
    let layers = tile
        .layers
        .iter()
        .map(encode_layer)
        .collect::<Result<Vec<_>, _>>()?;
    let payload = proto::Tile { layers }.encode_to_vec();
    let compressed = gzip(&payload)?;
    Ok(RawTile::new(Bytes::from(compressed)))
}

fn gunzip(data: &[u8]) -> Result<Vec<u8>, CodecError> {
    if !data.starts_with(&GZIP_MAGIC) {
        return Err(CodecError::NotGzip);
    }
    let mut decoder = GzDecoder::new(data);
    let mut payload = Vec::with_capacity(data.len() * 4);
    decoder
        .read_to_end(&mut payload)
        .map_err(CodecError::Decompress)?;
    Ok(payload)
}

fn gzip(payload: &[u8]) -> Result<Vec<u8>, CodecError> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(payload.len() / 2), Compression::default());
    encoder.write_all(payload).map_err(CodecError::Compress)?;
    encoder.finish().map_err(CodecError::Compress)
}

fn decode_layer(layer: proto::Layer) -> Result<Layer, CodecError> {
    let proto::Layer {
        name,
        features,
        keys,
        values,
        extent,
        version,
    } = layer;

    let values = values
        .into_iter()
        .enumerate()
        .map(|(index, value)| {
            decode_value(value).ok_or_else(|| CodecError::EmptyValue {
                layer: name.clone(),
                index,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let features = features
        .into_iter()
        .enumerate()
        .map(|(index, feature)| decode_feature(&name, index, feature, &keys, &values))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Layer {
        name,
        version,
        extent,
        features,
    })
}

fn decode_feature(
    layer: &str,
    index: usize,
    feature: proto::Feature,
    keys: &[String],
    values: &[PropertyValue],
) -> Result<Feature, CodecError> {
    let malformed = |reason: String| CodecError::MalformedFeature {
        layer: layer.to_string(),
        feature: index,
        reason,
    };

    if feature.tags.len() % 2 != 0 {
        return Err(malformed(format!(
            "odd number of tags ({})",
            feature.tags.len()
        )));
    }

    let mut properties = Properties::new();
    for pair in feature.tags.chunks_exact(2) {
        let key = keys
            .get(pair[0] as usize)
            .ok_or_else(|| malformed(format!("key index {} out of range", pair[0])))?;
        let value = values
            .get(pair[1] as usize)
            .ok_or_else(|| malformed(format!("value index {} out of range", pair[1])))?;
        properties.insert(key.as_str(), value.clone());
    }

    let geometry = Geometry {
        geom_type: feature.r#type,
        commands: feature.geometry,
    };
    Ok(Feature::new(feature.id, geometry, properties))
}

fn decode_value(value: proto::Value) -> Option<PropertyValue> {
    if let Some(v) = value.string_value {
        Some(PropertyValue::String(v))
    } else if let Some(v) = value.float_value {
        Some(PropertyValue::Float(v))
    } else if let Some(v) = value.double_value {
        Some(PropertyValue::Double(v))
    } else if let Some(v) = value.int_value {
        Some(PropertyValue::Int(v))
    } else if let Some(v) = value.uint_value {
        Some(PropertyValue::UInt(v))
    } else if let Some(v) = value.sint_value {
        Some(PropertyValue::SInt(v))
    } else {
        value.bool_value.map(PropertyValue::Bool)
    }
}

/// Hashable identity of a value for table interning. Floats compare by bits.
#[derive(PartialEq, Eq, Hash)]
enum ValueKey<'a> {
    String(&'a str),
    Float(u32),
    Double(u64),
    Int(i64),
    UInt(u64),
    SInt(i64),
    Bool(bool),
}

impl<'a> From<&'a PropertyValue> for ValueKey<'a> {
    fn from(value: &'a PropertyValue) -> Self {
        match value {
            PropertyValue::String(v) => ValueKey::String(v),
            PropertyValue::Float(v) => ValueKey::Float(v.to_bits()),
            PropertyValue::Double(v) => ValueKey::Double(v.to_bits()),
            PropertyValue::Int(v) => ValueKey::Int(*v),
            PropertyValue::UInt(v) => ValueKey::UInt(*v),
            PropertyValue::SInt(v) => ValueKey::SInt(*v),
            PropertyValue::Bool(v) => ValueKey::Bool(*v),
        }
    }
}

fn encode_value(value: &PropertyValue) -> proto::Value {
    let mut out = proto::Value::default();
    match value {
        PropertyValue::String(v) => out.string_value = Some(v.clone()),
        PropertyValue::Float(v) => out.float_value = Some(*v),
        PropertyValue::Double(v) => out.double_value = Some(*v),
        PropertyValue::Int(v) => out.int_value = Some(*v),
        PropertyValue::UInt(v) => out.uint_value = Some(*v),
        PropertyValue::SInt(v) => out.sint_value = Some(*v),
        PropertyValue::Bool(v) => out.bool_value = Some(*v),
    }
    out
}

fn encode_layer(layer: &Layer) -> Result<proto::Layer, CodecError> {
    let mut keys: Vec<String> = Vec::new();
    let mut key_index: HashMap<&str, u32> = HashMap::new();
    let mut values: Vec<proto::Value> = Vec::new();
    let mut value_index: HashMap<ValueKey<'_>, u32> = HashMap::new();
    let overflow = || CodecError::TableOverflow(layer.name.clone());

    let mut features = Vec::with_capacity(layer.features.len());
    for feature in &layer.features {
        let mut tags = Vec::with_capacity(feature.properties.len() * 2);
        for (key, value) in feature.properties.iter() {
            let k = match key_index.get(key) {
                Some(&k) => k,
                None => {
                    let k = u32::try_from(keys.len()).map_err(|_| overflow())?;
                    keys.push(key.to_string());
                    key_index.insert(key, k);
                    k
                }
            };
            let v = match value_index.get(&ValueKey::from(value)) {
                Some(&v) => v,
                None => {
                    let v = u32::try_from(values.len()).map_err(|_| overflow())?;
                    values.push(encode_value(value));
                    value_index.insert(ValueKey::from(value), v);
                    v
                }
            };
            tags.push(k);
            tags.push(v);
        }

        features.push(proto::Feature {
            id: feature.id,
            tags,
            r#type: feature.geometry.geom_type,
            geometry: feature.geometry.commands.clone(),
        });
    }

    Ok(proto::Layer {
        name: layer.name.clone(),
        features,
        keys,
        values,
        extent: layer.extent,
        version: layer.version,
    })
}
