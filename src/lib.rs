//! # Pack and unpack GVariant values
//!
//! This crate converts dynamically typed host values into typed GVariant values and back,
//! driven by D-Bus/GVariant type signatures such as `a{sv}` or `(sogvau)`.
//!
//! ## Examples
//!
//! Pack a [`Value`] with [`Variant::from_signature`] and unpack it again
//!
//! ```
//! use gvpack::{Value, Variant};
//!
//! let value = Value::Array(vec![
//!     Value::from("a string"),
//!     Value::from("/a/object/path"),
//!     Value::Array(vec![Value::from(7), Value::from(3)]),
//! ]);
//! let variant = Variant::from_signature("(soau)", &value).unwrap();
//!
//! assert_eq!(variant.to_string(), "('a string', '/a/object/path', [7, 3])");
//! assert_eq!(variant.deep_unpack().unwrap(), value);
//! ```
//!
//! Serialize to the GVariant binary format and read it back
//!
//! ```
//! use gvpack::{Endian, Variant, VariantType};
//!
//! let variant = Variant::new_strv(&["i", "can"]).unwrap();
//! let data = variant.to_bytes(Endian::Little);
//! assert_eq!(data, b"i\0can\0\x02\x06");
//!
//! let read = Variant::from_bytes(&VariantType::STRING_ARRAY, &data, Endian::Little).unwrap();
//! assert_eq!(read, variant);
//! ```
//!
//! Build an `a{sv}` dictionary with [`VariantDict`]
//!
//! ```
//! use gvpack::{Value, VariantDict};
//!
//! let mut dict = VariantDict::new();
//! dict.insert("answer", "u", &Value::from(42)).unwrap();
//!
//! let variant = dict.end().unwrap();
//! assert_eq!(variant.to_string(), "{'answer': <42>}");
//! ```
//!
//! ## Unpacking
//!
//! [`Marshaller::unpack`] converts one level, [`Marshaller::deep_unpack`] converts all container
//! levels but keeps the contents of `v` variants boxed, and [`Marshaller::recursive_unpack`]
//! converts everything and loses all type information.
//!
//! Values that implement serde traits together with [`zvariant::Type`] can be converted directly
//! with [`Variant::from_serialize`] and [`Variant::deserialize`].

#![warn(missing_docs)]

mod dict;
mod endian;
mod error;
mod marshal;
mod signature;
mod value;
mod variant;
mod variant_type;

pub use dict::VariantDict;
pub use endian::Endian;
pub use error::{Error, Result};
pub use marshal::{ByteCodec, Marshaller, NulTerminatedCodec};
pub use signature::{
    signature_length, split_signature, SignatureReader, TypeClass, DEFAULT_MAX_DEPTH,
};
pub use value::Value;
pub use variant::{is_object_path, is_signature, FromVariant, ToVariant, Variant, VariantIter};
pub use variant_type::{ArrayKind, VariantType};
