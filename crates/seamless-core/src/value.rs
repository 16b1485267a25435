//! The Serializable Value grammar.
//!
//! Only values built from primitives, timestamps, ordered sequences and string-keyed
//! mappings may cross the RPC boundary. [`Value`] is that grammar as a closed enum;
//! [`validate_serializable`] checks the invariants the enum alone cannot express.

use crate::config::ProtocolConfig;
use crate::error::{Result, RpcError};
use chrono::{DateTime, Datelike, SecondsFormat, Utc};
use serde::de::{
    self, DeserializeOwned, DeserializeSeed, EnumAccess, IntoDeserializer, MapAccess, SeqAccess,
    VariantAccess, Visitor,
};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{btree_map, BTreeMap};
use std::fmt;

/// Timestamp carried by [`Value::Timestamp`].
pub type Timestamp = DateTime<Utc>;

/// String-keyed mapping of values.
pub type Map = BTreeMap<String, Value>;

/// Largest integer an f64 holds exactly (2^53).
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Years RFC 3339 can spell without an extended-year sign.
const MIN_YEAR: i32 = 0;
const MAX_YEAR: i32 = 9999;

/// Newtype name `Value`'s `Deserialize` asks for. [`ValueDeserializer`] answers it
/// by presenting timestamps as envelopes instead of strings.
const VALUE_TOKEN: &str = "$seamless_core::Value";

/// A value eligible to cross the RPC boundary.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Timestamp(Timestamp),
    Array(Vec<Value>),
    Object(Map),
}

impl Value {
    /// Short name of the variant, used in error context.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Timestamp(_) => "date",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<&Timestamp> {
        match self {
            Value::Timestamp(ts) => Some(ts),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Map> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Look up a key when this is an object.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_object().and_then(|map| map.get(key))
    }

    /// Convert into wire JSON: timestamps become the `{"__type":"Date","value":...}`
    /// envelope.
    pub(crate) fn to_json(&self) -> Result<serde_json::Value> {
        self.to_json_at(0)
    }

    fn to_json_at(&self, depth: usize) -> Result<serde_json::Value> {
        if depth > ProtocolConfig::MAX_VALUE_DEPTH {
            return Err(RpcError::serialization(format!(
                "Value nesting exceeds {} levels",
                ProtocolConfig::MAX_VALUE_DEPTH
            )));
        }

        Ok(match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => serde_json::Value::Number(json_number(*n)?),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Timestamp(ts) => {
                if !timestamp_in_range(ts) {
                    return Err(RpcError::serialization(format!(
                        "Timestamp {} is outside years {}..={}",
                        ts, MIN_YEAR, MAX_YEAR
                    )));
                }
                let mut envelope = serde_json::Map::new();
                envelope.insert(
                    ProtocolConfig::TYPE_TAG_KEY.to_string(),
                    serde_json::Value::String(ProtocolConfig::DATE_TYPE_TAG.to_string()),
                );
                envelope.insert(
                    ProtocolConfig::TYPE_VALUE_KEY.to_string(),
                    serde_json::Value::String(format_timestamp(ts)),
                );
                serde_json::Value::Object(envelope)
            }
            Value::Array(items) => serde_json::Value::Array(
                items
                    .iter()
                    .map(|item| item.to_json_at(depth + 1))
                    .collect::<Result<_>>()?,
            ),
            Value::Object(map) => {
                let mut object = serde_json::Map::new();
                for (key, item) in map {
                    object.insert(key.clone(), item.to_json_at(depth + 1)?);
                }
                serde_json::Value::Object(object)
            }
        })
    }

    /// Build a value from JSON, reviving timestamp envelopes.
    ///
    /// An envelope whose `value` is not a valid RFC 3339 string is kept as a plain
    /// object; [`validate_serializable`] rejects it afterwards.
    pub(crate) fn from_json(json: serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(object) => {
                if let Some(ts) = revive_timestamp(&object) {
                    return Value::Timestamp(ts);
                }
                Value::Object(
                    object
                        .into_iter()
                        .map(|(key, item)| (key, Value::from_json(item)))
                        .collect(),
                )
            }
        }
    }
}

fn json_number(n: f64) -> Result<serde_json::Number> {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < MAX_SAFE_INTEGER {
        return Ok(serde_json::Number::from(n as i64));
    }
    serde_json::Number::from_f64(n)
        .ok_or_else(|| RpcError::serialization(format!("Cannot encode non-finite number {}", n)))
}

fn format_timestamp(ts: &Timestamp) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn revive_timestamp(object: &serde_json::Map<String, serde_json::Value>) -> Option<Timestamp> {
    let tag = object.get(ProtocolConfig::TYPE_TAG_KEY)?.as_str()?;
    if tag != ProtocolConfig::DATE_TYPE_TAG {
        return None;
    }
    parse_timestamp(object.get(ProtocolConfig::TYPE_VALUE_KEY)?.as_str()?)
}

fn parse_timestamp(raw: &str) -> Option<Timestamp> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

fn timestamp_in_range(ts: &Timestamp) -> bool {
    (MIN_YEAR..=MAX_YEAR).contains(&ts.year())
}

/// Timestamp held by an envelope-shaped map, if it parses.
fn revive_map(map: &Map) -> Option<Timestamp> {
    if !is_date_tag(map) {
        return None;
    }
    parse_timestamp(map.get(ProtocolConfig::TYPE_VALUE_KEY)?.as_str()?)
}

fn is_date_tag(map: &Map) -> bool {
    matches!(
        map.get(ProtocolConfig::TYPE_TAG_KEY),
        Some(Value::String(tag)) if tag == ProtocolConfig::DATE_TYPE_TAG
    )
}

/// Check a value against the Serializable Value grammar.
///
/// Rejects non-finite numbers, timestamps outside years 0..=9999 (RFC 3339 has
/// no plain spelling for them), objects shaped like an unrevivable timestamp
/// envelope, and nesting deeper than [`ProtocolConfig::MAX_VALUE_DEPTH`].
pub fn validate_serializable(value: &Value) -> bool {
    validate_at(value, 0)
}

fn validate_at(value: &Value, depth: usize) -> bool {
    if depth > ProtocolConfig::MAX_VALUE_DEPTH {
        return false;
    }
    match value {
        Value::Number(n) => n.is_finite(),
        Value::Array(items) => items.iter().all(|item| validate_at(item, depth + 1)),
        Value::Object(map) => {
            !is_date_tag(map) && map.values().all(|item| validate_at(item, depth + 1))
        }
        Value::Timestamp(ts) => timestamp_in_range(ts),
        Value::Null | Value::Bool(_) | Value::String(_) => true,
    }
}

/// Convert any `Serialize` type into a [`Value`].
pub fn to_value<T: Serialize + ?Sized>(value: &T) -> Result<Value> {
    let json = serde_json::to_value(value)
        .map_err(|e| RpcError::serialization(format!("Failed to serialize value: {}", e)))?;
    Ok(Value::from_json(json))
}

/// Deserialize a [`Value`] into a concrete type.
///
/// Timestamps reach typed fields as RFC 3339 strings, so plain `chrono` fields
/// work; a target that is itself a [`Value`] (at any depth) keeps them as
/// [`Value::Timestamp`].
pub fn from_value<T: DeserializeOwned>(value: Value) -> Result<T> {
    T::deserialize(ValueDeserializer::new(value)).map_err(|e| {
        RpcError::invalid_arguments(format!("Value does not match expected shape: {}", e))
    })
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(n) => {
                if n.is_finite() && n.fract() == 0.0 && n.abs() < MAX_SAFE_INTEGER {
                    serializer.serialize_i64(*n as i64)
                } else {
                    serializer.serialize_f64(*n)
                }
            }
            Value::String(s) => serializer.serialize_str(s),
            Value::Timestamp(ts) => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry(ProtocolConfig::TYPE_TAG_KEY, ProtocolConfig::DATE_TYPE_TAG)?;
                map.serialize_entry(ProtocolConfig::TYPE_VALUE_KEY, &format_timestamp(ts))?;
                map.end()
            }
            Value::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Object(object) => {
                let mut map = serializer.serialize_map(Some(object.len()))?;
                for (key, item) in object {
                    map.serialize_entry(key, item)?;
                }
                map.end()
            }
        }
    }
}

/// Deserializes from any self-describing format, reviving tagged date envelopes.
impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_newtype_struct(VALUE_TOKEN, ValueVisitor)
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a serializable value")
    }

    fn visit_bool<E>(self, b: bool) -> std::result::Result<Value, E> {
        Ok(Value::Bool(b))
    }

    fn visit_i64<E>(self, n: i64) -> std::result::Result<Value, E> {
        Ok(Value::Number(n as f64))
    }

    fn visit_u64<E>(self, n: u64) -> std::result::Result<Value, E> {
        Ok(Value::Number(n as f64))
    }

    fn visit_f64<E>(self, n: f64) -> std::result::Result<Value, E> {
        Ok(Value::Number(n))
    }

    fn visit_str<E>(self, s: &str) -> std::result::Result<Value, E> {
        Ok(Value::String(s.to_string()))
    }

    fn visit_string<E>(self, s: String) -> std::result::Result<Value, E> {
        Ok(Value::String(s))
    }

    fn visit_unit<E>(self) -> std::result::Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_none<E>(self) -> std::result::Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, d: D) -> std::result::Result<Value, D::Error> {
        Value::deserialize(d)
    }

    fn visit_newtype_struct<D: Deserializer<'de>>(
        self,
        d: D,
    ) -> std::result::Result<Value, D::Error> {
        d.deserialize_any(ValueVisitor)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> std::result::Result<Value, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element::<Value>()? {
            items.push(item);
        }
        Ok(Value::Array(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<Value, A::Error> {
        let mut map = Map::new();
        while let Some((key, item)) = access.next_entry::<String, Value>()? {
            map.insert(key, item);
        }
        Ok(match revive_map(&map) {
            Some(ts) => Value::Timestamp(ts),
            None => Value::Object(map),
        })
    }
}

/// Feeds a [`Value`] to serde.
///
/// Typed targets see timestamps as RFC 3339 strings. Once a target asks for a
/// [`Value`], the subtree switches to `envelopes` mode and timestamps are handed
/// over as date envelopes, which [`ValueVisitor`] revives.
struct ValueDeserializer {
    value: Value,
    envelopes: bool,
}

impl ValueDeserializer {
    fn new(value: Value) -> Self {
        Self {
            value,
            envelopes: false,
        }
    }
}

fn date_envelope(ts: &Timestamp) -> Map {
    let mut map = Map::new();
    map.insert(
        ProtocolConfig::TYPE_TAG_KEY.to_string(),
        Value::from(ProtocolConfig::DATE_TYPE_TAG),
    );
    map.insert(
        ProtocolConfig::TYPE_VALUE_KEY.to_string(),
        Value::String(format_timestamp(ts)),
    );
    map
}

impl<'de> Deserializer<'de> for ValueDeserializer {
    type Error = de::value::Error;

    fn deserialize_any<V: Visitor<'de>>(
        self,
        visitor: V,
    ) -> std::result::Result<V::Value, Self::Error> {
        let envelopes = self.envelopes;
        match self.value {
            Value::Null => visitor.visit_unit(),
            Value::Bool(b) => visitor.visit_bool(b),
            Value::Number(n) if n.fract() == 0.0 && n.abs() < MAX_SAFE_INTEGER => {
                if n >= 0.0 {
                    visitor.visit_u64(n as u64)
                } else {
                    visitor.visit_i64(n as i64)
                }
            }
            Value::Number(n) => visitor.visit_f64(n),
            Value::String(s) => visitor.visit_string(s),
            Value::Timestamp(ts) if envelopes => {
                visitor.visit_map(MapAccessor::new(date_envelope(&ts), envelopes))
            }
            Value::Timestamp(ts) => visitor.visit_string(format_timestamp(&ts)),
            Value::Array(items) => visitor.visit_seq(SeqAccessor {
                items: items.into_iter(),
                envelopes,
            }),
            Value::Object(map) => visitor.visit_map(MapAccessor::new(map, envelopes)),
        }
    }

    fn deserialize_option<V: Visitor<'de>>(
        self,
        visitor: V,
    ) -> std::result::Result<V::Value, Self::Error> {
        match self.value {
            Value::Null => visitor.visit_none(),
            _ => visitor.visit_some(self),
        }
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        visitor: V,
    ) -> std::result::Result<V::Value, Self::Error> {
        if name == VALUE_TOKEN {
            visitor.visit_newtype_struct(ValueDeserializer {
                value: self.value,
                envelopes: true,
            })
        } else {
            visitor.visit_newtype_struct(self)
        }
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> std::result::Result<V::Value, Self::Error> {
        let envelopes = self.envelopes;
        match self.value {
            Value::String(variant) => visitor.visit_enum(variant.into_deserializer()),
            Value::Object(map) => {
                let mut entries = map.into_iter();
                match (entries.next(), entries.next()) {
                    (Some((variant, value)), None) => visitor.visit_enum(EnumAccessor {
                        variant,
                        value,
                        envelopes,
                    }),
                    _ => Err(de::Error::custom("expected an object with a single variant key")),
                }
            }
            other => Err(de::Error::custom(format!(
                "expected an enum variant, found {}",
                other.type_name()
            ))),
        }
    }

    serde::forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf unit unit_struct seq tuple tuple_struct map struct
        identifier ignored_any
    }
}

struct SeqAccessor {
    items: std::vec::IntoIter<Value>,
    envelopes: bool,
}

impl<'de> SeqAccess<'de> for SeqAccessor {
    type Error = de::value::Error;

    fn next_element_seed<T: DeserializeSeed<'de>>(
        &mut self,
        seed: T,
    ) -> std::result::Result<Option<T::Value>, Self::Error> {
        match self.items.next() {
            Some(item) => seed
                .deserialize(ValueDeserializer {
                    value: item,
                    envelopes: self.envelopes,
                })
                .map(Some),
            None => Ok(None),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.items.len())
    }
}

struct MapAccessor {
    entries: btree_map::IntoIter<String, Value>,
    pending: Option<Value>,
    envelopes: bool,
}

impl MapAccessor {
    fn new(map: Map, envelopes: bool) -> Self {
        Self {
            entries: map.into_iter(),
            pending: None,
            envelopes,
        }
    }
}

impl<'de> MapAccess<'de> for MapAccessor {
    type Error = de::value::Error;

    fn next_key_seed<K: DeserializeSeed<'de>>(
        &mut self,
        seed: K,
    ) -> std::result::Result<Option<K::Value>, Self::Error> {
        match self.entries.next() {
            Some((key, value)) => {
                self.pending = Some(value);
                seed.deserialize(key.into_deserializer()).map(Some)
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(
        &mut self,
        seed: V,
    ) -> std::result::Result<V::Value, Self::Error> {
        let value = self.pending.take().unwrap_or_default();
        seed.deserialize(ValueDeserializer {
            value,
            envelopes: self.envelopes,
        })
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.entries.len())
    }
}

struct EnumAccessor {
    variant: String,
    value: Value,
    envelopes: bool,
}

impl<'de> EnumAccess<'de> for EnumAccessor {
    type Error = de::value::Error;
    type Variant = ValueDeserializer;

    fn variant_seed<V: DeserializeSeed<'de>>(
        self,
        seed: V,
    ) -> std::result::Result<(V::Value, Self::Variant), Self::Error> {
        let name: de::value::StringDeserializer<de::value::Error> =
            self.variant.into_deserializer();
        let variant = seed.deserialize(name)?;
        Ok((
            variant,
            ValueDeserializer {
                value: self.value,
                envelopes: self.envelopes,
            },
        ))
    }
}

impl<'de> VariantAccess<'de> for ValueDeserializer {
    type Error = de::value::Error;

    fn unit_variant(self) -> std::result::Result<(), Self::Error> {
        match self.value {
            Value::Null => Ok(()),
            other => Err(de::Error::custom(format!(
                "expected a unit variant, found {}",
                other.type_name()
            ))),
        }
    }

    fn newtype_variant_seed<T: DeserializeSeed<'de>>(
        self,
        seed: T,
    ) -> std::result::Result<T::Value, Self::Error> {
        seed.deserialize(self)
    }

    fn tuple_variant<V: Visitor<'de>>(
        self,
        _len: usize,
        visitor: V,
    ) -> std::result::Result<V::Value, Self::Error> {
        self.deserialize_any(visitor)
    }

    fn struct_variant<V: Visitor<'de>>(
        self,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> std::result::Result<V::Value, Self::Error> {
        self.deserialize_any(visitor)
    }
}

/// Serde adapter for timestamp fields of user types.
///
/// Serializes as the tagged date envelope, so [`to_value`] yields a
/// [`Value::Timestamp`] rather than a plain string. Deserializes from either an
/// RFC 3339 string or the envelope.
///
/// ```rust,ignore
/// #[derive(Serialize, Deserialize)]
/// struct User {
///     #[serde(with = "seamless_core::value::tagged_date")]
///     created_at: Timestamp,
/// }
/// ```
pub mod tagged_date {
    use super::{Timestamp, Value};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Plain(Timestamp),
        Tagged { value: Timestamp },
    }

    pub fn serialize<S: Serializer>(ts: &Timestamp, serializer: S) -> Result<S::Ok, S::Error> {
        Value::Timestamp(*ts).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Timestamp, D::Error> {
        Ok(match Repr::deserialize(deserializer)? {
            Repr::Plain(ts) | Repr::Tagged { value: ts } => ts,
        })
    }
}

// Conversions

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Null
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

macro_rules! number_from {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(n: $ty) -> Self {
                    Value::Number(n as f64)
                }
            }
        )*
    };
}

number_from!(f64, f32, i8, i16, i32, i64, u8, u16, u32, u64, usize);

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<Timestamp> for Value {
    fn from(ts: Timestamp) -> Self {
        Value::Timestamp(ts)
    }
}

impl From<Map> for Value {
    fn from(map: Map) -> Self {
        Value::Object(map)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Array(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde::Deserialize;

    fn sample_time() -> Timestamp {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap()
    }

    #[test]
    fn test_conversions() {
        assert_eq!(Value::from(()), Value::Null);
        assert_eq!(Value::from(3u32), Value::Number(3.0));
        assert_eq!(Value::from("ann"), Value::String("ann".into()));
        assert_eq!(Value::from(None::<bool>), Value::Null);
        assert_eq!(
            Value::from(vec![1, 2]),
            Value::Array(vec![Value::Number(1.0), Value::Number(2.0)])
        );
        assert_eq!(Value::from(sample_time()).type_name(), "date");
    }

    #[test]
    fn test_validate_accepts_grammar() {
        let mut map = Map::new();
        map.insert("createdAt".into(), Value::from(sample_time()));
        map.insert("tags".into(), Value::from(vec!["a", "b"]));
        map.insert("score".into(), Value::from(1.5));
        assert!(validate_serializable(&Value::Object(map)));
        assert!(validate_serializable(&Value::Null));
    }

    #[test]
    fn test_validate_rejects_non_finite_numbers() {
        assert!(!validate_serializable(&Value::Number(f64::NAN)));
        assert!(!validate_serializable(&Value::from(vec![f64::INFINITY])));
    }

    #[test]
    fn test_validate_rejects_unrevivable_date_tag() {
        let mut map = Map::new();
        map.insert("__type".into(), Value::from("Date"));
        map.insert("value".into(), Value::from("not a date"));
        assert!(!validate_serializable(&Value::Object(map)));
    }

    #[test]
    fn test_validate_rejects_excessive_depth() {
        let mut value = Value::Null;
        for _ in 0..(ProtocolConfig::MAX_VALUE_DEPTH + 2) {
            value = Value::Array(vec![value]);
        }
        assert!(!validate_serializable(&value));
        assert!(value.to_json().is_err());
    }

    #[test]
    fn test_integral_numbers_have_no_fraction() {
        let json = Value::Number(42.0).to_json().unwrap();
        assert_eq!(json.to_string(), "42");
        let json = Value::Number(0.25).to_json().unwrap();
        assert_eq!(json.to_string(), "0.25");
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct User {
        id: String,
        name: String,
        created_at: Timestamp,
    }

    #[test]
    fn test_typed_roundtrip_through_value() {
        let user = User {
            id: "u1".into(),
            name: "Ann".into(),
            created_at: sample_time(),
        };
        let value = to_value(&user).unwrap();
        assert_eq!(value.get("name"), Some(&Value::from("Ann")));
        let back: User = from_value(value).unwrap();
        assert_eq!(back, user);
    }

    #[test]
    fn test_timestamp_value_deserializes_into_chrono_field() {
        let mut map = Map::new();
        map.insert("id".into(), Value::from("u2"));
        map.insert("name".into(), Value::from("Bo"));
        map.insert("createdAt".into(), Value::from(sample_time()));
        let user: User = from_value(Value::Object(map)).unwrap();
        assert_eq!(user.created_at, sample_time());
    }

    #[test]
    fn test_from_value_shape_mismatch_is_invalid_arguments() {
        let err = from_value::<User>(Value::from("nope")).unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::InvalidArguments);
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Post {
        title: String,
        #[serde(with = "tagged_date")]
        published: Timestamp,
    }

    #[test]
    fn test_tagged_date_fields_become_timestamps() {
        let post = Post {
            title: "Hello".into(),
            published: sample_time(),
        };
        let value = to_value(&post).unwrap();
        assert_eq!(value.get("published"), Some(&Value::from(sample_time())));
        let back: Post = from_value(value).unwrap();
        assert_eq!(back, post);
    }

    #[test]
    fn test_value_deserializes_from_plain_json() {
        let value: Value =
            serde_json::from_str(r#"{"at":{"__type":"Date","value":"2024-03-01T12:30:00Z"},"n":[1]}"#)
                .unwrap();
        assert_eq!(value.get("at"), Some(&Value::from(sample_time())));
        let through: Value = from_value(value.clone()).unwrap();
        assert_eq!(through, value);
        assert_eq!(through.get("at"), Some(&Value::from(sample_time())));
    }

    #[test]
    fn test_nested_value_fields_keep_timestamps() {
        #[derive(Deserialize)]
        struct Filter {
            at: Timestamp,
            extra: Value,
            maybe: Option<Value>,
        }

        let mut inner = Map::new();
        inner.insert("seen".into(), Value::from(vec![sample_time()]));
        let mut map = Map::new();
        map.insert("at".into(), Value::from(sample_time()));
        map.insert("extra".into(), Value::Object(inner.clone()));
        map.insert("maybe".into(), Value::from(sample_time()));

        let filter: Filter = from_value(Value::Object(map)).unwrap();
        assert_eq!(filter.at, sample_time());
        assert_eq!(filter.extra, Value::Object(inner));
        assert_eq!(filter.maybe, Some(Value::from(sample_time())));
    }

    #[derive(Debug, PartialEq, Deserialize)]
    #[serde(rename_all = "camelCase")]
    enum Role {
        Admin,
        Guest { until: Timestamp },
    }

    #[test]
    fn test_from_value_enums() {
        assert_eq!(from_value::<Role>(Value::from("admin")).unwrap(), Role::Admin);

        let mut fields = Map::new();
        fields.insert("until".into(), Value::from(sample_time()));
        let mut map = Map::new();
        map.insert("guest".into(), Value::Object(fields));
        assert_eq!(
            from_value::<Role>(Value::Object(map)).unwrap(),
            Role::Guest { until: sample_time() }
        );
        assert!(from_value::<Role>(Value::from(3)).is_err());
    }

    #[test]
    fn test_from_value_numbers() {
        assert_eq!(from_value::<u32>(Value::from(7)).unwrap(), 7);
        assert_eq!(from_value::<i64>(Value::from(-7)).unwrap(), -7);
        assert_eq!(from_value::<f64>(Value::from(2)).unwrap(), 2.0);
        assert!(from_value::<u8>(Value::from(1.5)).is_err());
    }

    #[test]
    fn test_validate_rejects_out_of_range_years() {
        let far = Utc.with_ymd_and_hms(10000, 1, 1, 0, 0, 0).unwrap();
        assert!(!validate_serializable(&Value::from(far)));
        let first = Utc.with_ymd_and_hms(0, 1, 1, 0, 0, 0).unwrap();
        assert!(validate_serializable(&Value::from(first)));
    }

    #[test]
    fn test_serialize_impl_uses_wire_form() {
        let value = Value::from(vec![Value::from(sample_time())]);
        let text = serde_json::to_string(&value).unwrap();
        assert_eq!(
            text,
            r#"[{"__type":"Date","value":"2024-03-01T12:30:00Z"}]"#
        );
    }
}
