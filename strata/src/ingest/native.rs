//! Format-neutral decoded values.

use std::fmt;

use serde::de::{
    self, Deserialize, Deserializer, EnumAccess, MapAccess, SeqAccess, VariantAccess, Visitor,
};

/// A value decoded from any self-describing format, before ingestion.
///
/// Mapping keys are kept as values so that non-string keys can be
/// reported with their location instead of failing inside the decoder.
#[derive(Clone, Debug, PartialEq)]
pub enum Native {
    /// Null or unit.
    Null,
    /// Boolean.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Unsigned integer too large for `i64`.
    UInt(u64),
    /// Floating point number.
    Float(f64),
    /// Text.
    String(String),
    /// Binary data.
    Bytes(Vec<u8>),
    /// Ordered sequence.
    Sequence(Vec<Native>),
    /// Ordered key/value pairs.
    Mapping(Vec<(Native, Native)>),
    /// Enum variant or tagged value.
    Tagged {
        /// Variant or tag name.
        tag: String,
        /// Tagged content.
        value: Box<Native>,
    },
}

impl Native {
    /// Short name of the value kind, used in error messages.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::UInt(_) => "u64",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Bytes(_) => "bytes",
            Self::Sequence(_) => "list",
            Self::Mapping(_) => "map",
            Self::Tagged { .. } => "tagged",
        }
    }
}

impl fmt::Display for Native {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Int(value) => write!(f, "{value}"),
            Self::UInt(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::String(text) => write!(f, "{text:?}"),
            Self::Bytes(bytes) => write!(f, "<{} bytes>", bytes.len()),
            Self::Sequence(_) | Self::Mapping(_) => write!(f, "<{}>", self.kind_name()),
            Self::Tagged { tag, .. } => write!(f, "!{tag}"),
        }
    }
}

struct NativeVisitor;

impl<'de> Visitor<'de> for NativeVisitor {
    type Value = Native;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("any document value")
    }

    fn visit_bool<E: de::Error>(self, value: bool) -> Result<Native, E> {
        Ok(Native::Bool(value))
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<Native, E> {
        Ok(Native::Int(value))
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<Native, E> {
        Ok(i64::try_from(value).map_or(Native::UInt(value), Native::Int))
    }

    fn visit_f64<E: de::Error>(self, value: f64) -> Result<Native, E> {
        Ok(Native::Float(value))
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<Native, E> {
        Ok(Native::String(value.to_owned()))
    }

    fn visit_string<E: de::Error>(self, value: String) -> Result<Native, E> {
        Ok(Native::String(value))
    }

    fn visit_bytes<E: de::Error>(self, value: &[u8]) -> Result<Native, E> {
        Ok(Native::Bytes(value.to_vec()))
    }

    fn visit_byte_buf<E: de::Error>(self, value: Vec<u8>) -> Result<Native, E> {
        Ok(Native::Bytes(value))
    }

    fn visit_none<E: de::Error>(self) -> Result<Native, E> {
        Ok(Native::Null)
    }

    fn visit_unit<E: de::Error>(self) -> Result<Native, E> {
        Ok(Native::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Native, D::Error> {
        Native::deserialize(deserializer)
    }

    fn visit_newtype_struct<D: Deserializer<'de>>(
        self,
        deserializer: D,
    ) -> Result<Native, D::Error> {
        Native::deserialize(deserializer)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Native, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(Native::Sequence(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Native, A::Error> {
        let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
        while let Some(entry) = map.next_entry()? {
            entries.push(entry);
        }
        Ok(Native::Mapping(entries))
    }

    fn visit_enum<A: EnumAccess<'de>>(self, data: A) -> Result<Native, A::Error> {
        let (tag, variant): (String, _) = data.variant()?;
        let value = variant.newtype_variant::<Native>()?;
        Ok(Native::Tagged {
            tag,
            value: Box::new(value),
        })
    }
}

impl<'de> Deserialize<'de> for Native {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(NativeVisitor)
    }
}

impl From<serde_json::Value> for Native {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value as Json;
        match value {
            Json::Null => Self::Null,
            Json::Bool(flag) => Self::Bool(flag),
            Json::Number(number) => number
                .as_i64()
                .map(Self::Int)
                .or_else(|| number.as_u64().map(Self::UInt))
                .or_else(|| number.as_f64().map(Self::Float))
                .unwrap_or(Self::Null),
            Json::String(text) => Self::String(text),
            Json::Array(items) => Self::Sequence(items.into_iter().map(Self::from).collect()),
            Json::Object(entries) => Self::Mapping(
                entries
                    .into_iter()
                    .map(|(key, item)| (Self::String(key), Self::from(item)))
                    .collect(),
            ),
        }
    }
}

#[cfg(feature = "toml")]
impl From<toml::Value> for Native {
    fn from(value: toml::Value) -> Self {
        use toml::Value as Toml;
        match value {
            Toml::String(text) => Self::String(text),
            Toml::Integer(number) => Self::Int(number),
            Toml::Float(number) => Self::Float(number),
            Toml::Boolean(flag) => Self::Bool(flag),
            Toml::Datetime(stamp) => Self::String(stamp.to_string()),
            Toml::Array(items) => Self::Sequence(items.into_iter().map(Self::from).collect()),
            Toml::Table(entries) => Self::Mapping(
                entries
                    .into_iter()
                    .map(|(key, item)| (Self::String(key), Self::from(item)))
                    .collect(),
            ),
        }
    }
}
