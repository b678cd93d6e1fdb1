use crate::error::{Error, Result};
use crate::signature::TypeClass;
use crate::variant::Variant;
use serde::de::{MapAccess, SeqAccess, Visitor};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

/// A dynamically typed host value, the input of packing and the output of unpacking.
///
/// Integers unpack to [`Value::Int`], except `t` values above [`i64::MAX`], which unpack to
/// [`Value::UInt`]. [`Value::from`] a [`u64`] follows the same rule, so all 64 bit integers
/// survive a round trip without loss.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// An absent value, packs as an empty maybe
    #[default]
    Null,
    /// A boolean
    Bool(bool),
    /// A signed integer
    Int(i64),
    /// An unsigned integer that does not fit into [`Value::Int`]
    UInt(u64),
    /// A floating point number
    Double(f64),
    /// A string, object path or signature
    String(String),
    /// The contents of a byte array
    Bytes(Vec<u8>),
    /// The children of an array or a tuple
    Array(Vec<Value>),
    /// An array of dictionary entries, with keys rendered as text.
    ///
    /// Entries are kept sorted by key, so they are packed in key order and not in the
    /// order they were inserted.
    Map(BTreeMap<String, Value>),
    /// A variant that was not unpacked
    Variant(Variant),
}

impl Value {
    /// A short name for the kind of this value, used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "a boolean",
            Value::Int(_) | Value::UInt(_) => "an integer",
            Value::Double(_) => "a number",
            Value::String(_) => "a string",
            Value::Bytes(_) => "a byte buffer",
            Value::Array(_) => "an array",
            Value::Map(_) => "an object",
            Value::Variant(_) => "a variant",
        }
    }

    /// Create a [`Value::Bytes`]
    pub fn bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Value::Bytes(bytes.into())
    }

    /// Whether this is [`Value::Null`]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(value) => Some(*value),
            _ => None,
        }
    }

    /// The integer, if it fits into an [`i64`]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(value) => Some(*value),
            Value::UInt(value) => i64::try_from(*value).ok(),
            _ => None,
        }
    }

    /// The integer, if it fits into an [`u64`]
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::Int(value) => u64::try_from(*value).ok(),
            Value::UInt(value) => Some(*value),
            _ => None,
        }
    }

    /// Any number as [`f64`]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(value) => Some(*value as f64),
            Value::UInt(value) => Some(*value as f64),
            Value::Double(value) => Some(*value),
            _ => None,
        }
    }

    /// The string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(string) => Some(string),
            _ => None,
        }
    }

    /// The byte buffer
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// The children of an array
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// The entries of a map
    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    /// The variant
    pub fn as_variant(&self) -> Option<&Variant> {
        match self {
            Value::Variant(variant) => Some(variant),
            _ => None,
        }
    }

    pub(crate) fn mismatch(&self, expected: impl Into<String>) -> Error {
        Error::mismatch(expected, self.kind())
    }

    pub(crate) fn to_bool(&self) -> Result<bool> {
        self.as_bool().ok_or_else(|| self.mismatch("a boolean"))
    }

    pub(crate) fn to_double(&self) -> Result<f64> {
        self.as_f64().ok_or_else(|| self.mismatch("a number"))
    }

    pub(crate) fn to_str(&self) -> Result<&str> {
        self.as_str().ok_or_else(|| self.mismatch("a string"))
    }

    pub(crate) fn to_items(&self, expected: &str) -> Result<&[Value]> {
        self.as_array().ok_or_else(|| self.mismatch(expected))
    }

    /// Convert to the integer type `T`, which is the native type of `class`.
    ///
    /// Doubles are accepted when they hold an integral value.
    pub(crate) fn to_integer<T>(&self, class: TypeClass) -> Result<T>
    where
        T: TryFrom<i64> + TryFrom<u64>,
    {
        let out_of_range = || Error::OutOfRange {
            value: self.to_string(),
            type_class: class.as_char(),
        };

        match *self {
            Value::Int(value) => <T as TryFrom<i64>>::try_from(value).map_err(|_| out_of_range()),
            Value::UInt(value) => <T as TryFrom<u64>>::try_from(value).map_err(|_| out_of_range()),
            Value::Double(value) if value.is_finite() && value.fract() == 0.0 => {
                if value >= i64::MIN as f64 && value < i64::MAX as f64 {
                    <T as TryFrom<i64>>::try_from(value as i64).map_err(|_| out_of_range())
                } else if value >= 0.0 && value < u64::MAX as f64 {
                    <T as TryFrom<u64>>::try_from(value as u64).map_err(|_| out_of_range())
                } else {
                    Err(out_of_range())
                }
            }
            Value::Double(_) => Err(out_of_range()),
            _ => Err(self.mismatch("an integer")),
        }
    }

    /// Parse a dictionary key from its text form into a value of the basic type `class`
    pub(crate) fn parse_key(key: &str, class: TypeClass) -> Result<Value> {
        let invalid = || {
            Error::mismatch(
                format!("a dictionary key of type '{}'", class.as_char()),
                format!("'{}'", key),
            )
        };

        Ok(match class {
            TypeClass::String | TypeClass::ObjectPath | TypeClass::Signature => {
                Value::String(key.to_string())
            }
            TypeClass::Boolean => Value::Bool(key.parse().map_err(|_| invalid())?),
            TypeClass::UInt64 => Value::UInt(key.parse().map_err(|_| invalid())?),
            TypeClass::Double => Value::Double(key.parse().map_err(|_| invalid())?),
            TypeClass::Byte
            | TypeClass::Int16
            | TypeClass::UInt16
            | TypeClass::Int32
            | TypeClass::UInt32
            | TypeClass::Int64
            | TypeClass::Handle => Value::Int(key.parse().map_err(|_| invalid())?),
            _ => {
                return Err(Error::SimpleTypeExpected {
                    character: class.as_char(),
                    position: 0,
                })
            }
        })
    }

    /// Render an unpacked dictionary key as text
    pub(crate) fn into_key(self) -> Result<String> {
        match self {
            Value::String(string) => Ok(string),
            Value::Bool(value) => Ok(value.to_string()),
            Value::Int(value) => Ok(value.to_string()),
            Value::UInt(value) => Ok(value.to_string()),
            Value::Double(value) => Ok(value.to_string()),
            other => Err(Error::Assertion(format!(
                "dictionary key unpacked to {}",
                other.kind()
            ))),
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(value) => write!(f, "{}", value),
            Value::Int(value) => write!(f, "{}", value),
            Value::UInt(value) => write!(f, "{}", value),
            Value::Double(value) => write!(f, "{:?}", value),
            Value::String(value) => write!(f, "{:?}", value),
            Value::Bytes(bytes) => write!(f, "b{:?}", bytes),
            Value::Array(items) => {
                write!(f, "[")?;
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Map(map) => {
                write!(f, "{{")?;
                for (index, (key, value)) in map.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{:?}: {}", key, value)?;
                }
                write!(f, "}}")
            }
            Value::Variant(variant) => write!(f, "<{}>", variant),
        }
    }
}

macro_rules! from_impls {
    ($($ty:ty => $variant:ident as $as:ty),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Value::$variant(<$as>::from(value))
                }
            }
        )*
    };
}

from_impls! {
    bool => Bool as bool,
    i8 => Int as i64,
    i16 => Int as i64,
    i32 => Int as i64,
    i64 => Int as i64,
    u8 => Int as i64,
    u16 => Int as i64,
    u32 => Int as i64,
    f32 => Double as f64,
    f64 => Double as f64,
    String => String as String,
    Vec<Value> => Array as Vec<Value>,
    BTreeMap<String, Value> => Map as BTreeMap<String, Value>,
    Variant => Variant as Variant,
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        match i64::try_from(value) {
            Ok(value) => Value::Int(value),
            Err(_) => Value::UInt(value),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

impl<T: Into<Value>> FromIterator<T> for Value {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Value::Array(iter.into_iter().map(Into::into).collect())
    }
}

/// Variants are serialized as their recursively unpacked value, losing their type
impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Bool(value) => serializer.serialize_bool(*value),
            Value::Int(value) => serializer.serialize_i64(*value),
            Value::UInt(value) => serializer.serialize_u64(*value),
            Value::Double(value) => serializer.serialize_f64(*value),
            Value::String(value) => serializer.serialize_str(value),
            Value::Bytes(bytes) => serializer.serialize_bytes(bytes),
            Value::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Map(map) => {
                let mut ser_map = serializer.serialize_map(Some(map.len()))?;
                for (key, value) in map {
                    ser_map.serialize_entry(key, value)?;
                }
                ser_map.end()
            }
            Value::Variant(variant) => crate::Marshaller::new()
                .recursive_unpack(variant)
                .map_err(<S::Error as serde::ser::Error>::custom)?
                .serialize(serializer),
        }
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, formatter: &mut Formatter) -> std::fmt::Result {
        formatter.write_str("any value")
    }

    fn visit_bool<E>(self, value: bool) -> std::result::Result<Value, E> {
        Ok(Value::Bool(value))
    }

    fn visit_i64<E>(self, value: i64) -> std::result::Result<Value, E> {
        Ok(Value::Int(value))
    }

    fn visit_u64<E>(self, value: u64) -> std::result::Result<Value, E> {
        Ok(Value::from(value))
    }

    fn visit_f64<E>(self, value: f64) -> std::result::Result<Value, E> {
        Ok(Value::Double(value))
    }

    fn visit_str<E>(self, value: &str) -> std::result::Result<Value, E> {
        Ok(Value::String(value.to_string()))
    }

    fn visit_string<E>(self, value: String) -> std::result::Result<Value, E> {
        Ok(Value::String(value))
    }

    fn visit_bytes<E>(self, value: &[u8]) -> std::result::Result<Value, E> {
        Ok(Value::Bytes(value.to_vec()))
    }

    fn visit_byte_buf<E>(self, value: Vec<u8>) -> std::result::Result<Value, E> {
        Ok(Value::Bytes(value))
    }

    fn visit_none<E>(self) -> std::result::Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_unit<E>(self) -> std::result::Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_some<D: Deserializer<'de>>(
        self,
        deserializer: D,
    ) -> std::result::Result<Value, D::Error> {
        Value::deserialize(deserializer)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> std::result::Result<Value, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(Value::Array(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<Value, A::Error> {
        let mut map = BTreeMap::new();
        while let Some((key, value)) = access.next_entry::<String, Value>()? {
            map.insert(key, value);
        }
        Ok(Value::Map(map))
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_any(ValueVisitor)
    }
}
