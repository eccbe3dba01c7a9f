//! The in-memory value tree of a document

use std::fmt;

use derive_more::derive::From;
use indexmap::IndexMap;
use serde::{
    de::{self, MapAccess, SeqAccess, Visitor},
    ser::{SerializeMap, SerializeSeq},
    Deserialize, Deserializer, Serialize, Serializer,
};

use crate::types::ValueType;

/// A JSON-like value with the numeric widths preserved
///
/// Object keys keep their insertion order, which is the order they are stored in on disk.
#[derive(From, Debug, Clone, Default, PartialEq)]
pub enum BinaryValue {
    #[default]
    #[from(skip)]
    Null,
    Int32(i32),
    Int64(i64),
    Single(f32),
    Boolean(bool),
    String(String),
    Array(Vec<BinaryValue>),
    Object(IndexMap<String, BinaryValue>),
}

impl BinaryValue {
    /// Pick the narrowest integer tag able to hold `value`
    pub fn from_integer(value: i64) -> Self {
        match i32::try_from(value) {
            Ok(narrow) => BinaryValue::Int32(narrow),
            Err(_) => BinaryValue::Int64(value),
        }
    }

    /// Tag written in front of this value
    pub fn value_type(&self) -> ValueType {
        match self {
            BinaryValue::Null => ValueType::Null,
            BinaryValue::Int32(_) => ValueType::Int32,
            BinaryValue::Int64(_) => ValueType::Int64,
            BinaryValue::Single(_) => ValueType::Single,
            BinaryValue::Boolean(_) => ValueType::Boolean,
            BinaryValue::String(_) => ValueType::String,
            BinaryValue::Array(_) => ValueType::Array,
            BinaryValue::Object(_) => ValueType::Object,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, BinaryValue::Null)
    }

    pub fn as_array(&self) -> Option<&Vec<BinaryValue>> {
        match self {
            BinaryValue::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&IndexMap<String, BinaryValue>> {
        match self {
            BinaryValue::Object(entries) => Some(entries),
            _ => None,
        }
    }

    /// Look up `key` if this is an object
    pub fn get(&self, key: &str) -> Option<&BinaryValue> {
        self.as_object().and_then(|entries| entries.get(key))
    }
}

impl From<&str> for BinaryValue {
    fn from(value: &str) -> Self {
        BinaryValue::String(value.to_owned())
    }
}

impl Serialize for BinaryValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            BinaryValue::Null => serializer.serialize_unit(),
            BinaryValue::Int32(v) => serializer.serialize_i32(*v),
            BinaryValue::Int64(v) => serializer.serialize_i64(*v),
            BinaryValue::Single(v) => serializer.serialize_f32(*v),
            BinaryValue::Boolean(v) => serializer.serialize_bool(*v),
            BinaryValue::String(v) => serializer.serialize_str(v),
            BinaryValue::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            BinaryValue::Object(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (k, v) in entries {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
        }
    }
}

struct BinaryValueVisitor;

impl<'de> Visitor<'de> for BinaryValueVisitor {
    type Value = BinaryValue;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a JSON value")
    }

    fn visit_unit<E>(self) -> Result<Self::Value, E> {
        Ok(BinaryValue::Null)
    }

    fn visit_none<E>(self) -> Result<Self::Value, E> {
        Ok(BinaryValue::Null)
    }

    fn visit_some<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        Deserialize::deserialize(deserializer)
    }

    fn visit_bool<E>(self, v: bool) -> Result<Self::Value, E> {
        Ok(BinaryValue::Boolean(v))
    }

    fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E> {
        Ok(BinaryValue::from_integer(v))
    }

    fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        i64::try_from(v)
            .map(BinaryValue::from_integer)
            .map_err(|_| E::invalid_value(de::Unexpected::Unsigned(v), &"a 64-bit signed integer"))
    }

    fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E> {
        Ok(BinaryValue::Single(v as f32))
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E> {
        Ok(BinaryValue::String(v.to_owned()))
    }

    fn visit_string<E>(self, v: String) -> Result<Self::Value, E> {
        Ok(BinaryValue::String(v))
    }

    fn visit_seq<A>(self, mut access: A) -> Result<Self::Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut items = Vec::with_capacity(access.size_hint().unwrap_or(0).min(4096));
        while let Some(item) = access.next_element()? {
            items.push(item);
        }
        Ok(BinaryValue::Array(items))
    }

    fn visit_map<M>(self, mut access: M) -> Result<Self::Value, M::Error>
    where
        M: MapAccess<'de>,
    {
        let mut entries = IndexMap::with_capacity(access.size_hint().unwrap_or(0).min(4096));
        while let Some((key, value)) = access.next_entry::<String, BinaryValue>()? {
            entries.insert(key, value);
        }
        Ok(BinaryValue::Object(entries))
    }
}

impl<'de> Deserialize<'de> for BinaryValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(BinaryValueVisitor)
    }
}
