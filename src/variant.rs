use crate::error::{Error, Result};
use crate::signature::{split_signature, TypeClass};
use crate::variant_type::{ArrayKind, VariantType};
use std::fmt::{Debug, Display, Formatter, Write};

mod bridge;
mod convert;
mod deserialize;
mod serialize;

pub use convert::{FromVariant, ToVariant};

#[derive(Clone, PartialEq)]
enum Repr {
    Boolean(bool),
    Byte(u8),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    Handle(i32),
    Double(f64),
    /// `s`, `o` and `g`
    String(String),
    Variant(Box<Variant>),
    Maybe(Option<Box<Variant>>),
    /// `ay`, stored as one buffer
    Bytes(Vec<u8>),
    /// Arrays, tuples and dict entries
    Container(Vec<Variant>),
}

/// An immutable, typed GVariant value
///
/// A `Variant` is a tree: basic values are leaves, while maybes, arrays, tuples, dictionary
/// entries and variants hold child `Variant`s. The type is fixed at construction and always
/// agrees with the stored value.
#[derive(Clone, PartialEq)]
pub struct Variant {
    typ: VariantType,
    repr: Repr,
}

fn check_nul(string: &str) -> Result<()> {
    if string.contains('\0') {
        Err(Error::InvalidString(string.to_string()))
    } else {
        Ok(())
    }
}

/// Whether `path` is a valid D-Bus object path
pub fn is_object_path(path: &str) -> bool {
    if path == "/" {
        return true;
    }

    let Some(rest) = path.strip_prefix('/') else {
        return false;
    };

    rest.split('/').all(|element| {
        !element.is_empty()
            && element
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'_')
    })
}

/// Whether `signature` is a valid sequence of zero or more single complete types
pub fn is_signature(signature: &str) -> bool {
    split_signature(signature).is_ok()
}

impl Variant {
    fn from_parts(typ: VariantType, repr: Repr) -> Self {
        Self { typ, repr }
    }

    /// Create a new bool `Variant`
    pub fn new_boolean(value: bool) -> Self {
        Self::from_parts(VariantType::BOOLEAN, Repr::Boolean(value))
    }

    /// Create a new byte `Variant`
    pub fn new_byte(value: u8) -> Self {
        Self::from_parts(VariantType::BYTE, Repr::Byte(value))
    }

    /// Create a new int16 `Variant`
    pub fn new_int16(value: i16) -> Self {
        Self::from_parts(VariantType::INT16, Repr::Int16(value))
    }

    /// Create a new uint16 `Variant`
    pub fn new_uint16(value: u16) -> Self {
        Self::from_parts(VariantType::UINT16, Repr::UInt16(value))
    }

    /// Create a new int32 `Variant`
    pub fn new_int32(value: i32) -> Self {
        Self::from_parts(VariantType::INT32, Repr::Int32(value))
    }

    /// Create a new uint32 `Variant`
    pub fn new_uint32(value: u32) -> Self {
        Self::from_parts(VariantType::UINT32, Repr::UInt32(value))
    }

    /// Create a new int64 `Variant`
    pub fn new_int64(value: i64) -> Self {
        Self::from_parts(VariantType::INT64, Repr::Int64(value))
    }

    /// Create a new uint64 `Variant`
    pub fn new_uint64(value: u64) -> Self {
        Self::from_parts(VariantType::UINT64, Repr::UInt64(value))
    }

    /// Create a new handle `Variant`
    pub fn new_handle(value: i32) -> Self {
        Self::from_parts(VariantType::HANDLE, Repr::Handle(value))
    }

    /// Create a new double `Variant`
    pub fn new_double(value: f64) -> Self {
        Self::from_parts(VariantType::DOUBLE, Repr::Double(value))
    }

    /// Create a new string `Variant`. Fails if the string contains a NUL byte.
    pub fn new_string(string: impl Into<String>) -> Result<Self> {
        let string = string.into();
        check_nul(&string)?;
        Ok(Self::from_parts(VariantType::STRING, Repr::String(string)))
    }

    /// Create a new object path `Variant`. Fails if `path` is not a valid D-Bus object path.
    pub fn new_object_path(path: impl Into<String>) -> Result<Self> {
        let path = path.into();
        if !is_object_path(&path) {
            return Err(Error::InvalidObjectPath(path));
        }

        Ok(Self::from_parts(VariantType::OBJECT_PATH, Repr::String(path)))
    }

    /// Create a new signature `Variant`. Fails if `signature` is not a valid type signature.
    pub fn new_signature(signature: impl Into<String>) -> Result<Self> {
        let signature = signature.into();
        if !is_signature(&signature) {
            return Err(Error::InvalidSignatureString(signature));
        }

        Ok(Self::from_parts(VariantType::SIGNATURE, Repr::String(signature)))
    }

    /// Box `child` in a `Variant` of type [`VARIANT`][VariantType::VARIANT]
    pub fn new_variant(child: Variant) -> Self {
        Self::from_parts(VariantType::VARIANT, Repr::Variant(Box::new(child)))
    }

    /// Create a maybe `Variant` with element type `child_type`.
    ///
    /// Fails if `child` is present and does not have type `child_type`.
    pub fn new_maybe(child_type: &VariantType, child: Option<Variant>) -> Result<Self> {
        if let Some(child) = &child {
            if child.type_() != child_type {
                return Err(Error::mismatch(
                    format!("maybe of type '{}'", child_type),
                    format!("'{}'", child.type_()),
                ));
            }
        }

        Ok(Self::from_parts(
            VariantType::new_maybe(child_type),
            Repr::Maybe(child.map(Box::new)),
        ))
    }

    /// Create a maybe `Variant` holding `child`
    pub fn new_just(child: Variant) -> Self {
        Self::from_parts(
            VariantType::new_maybe(child.type_()),
            Repr::Maybe(Some(Box::new(child))),
        )
    }

    /// Create an empty maybe `Variant` with element type `child_type`
    pub fn new_nothing(child_type: &VariantType) -> Self {
        Self::from_parts(VariantType::new_maybe(child_type), Repr::Maybe(None))
    }

    /// Create a new array `Variant` from the provided iterator.
    ///
    /// Fails if any child does not have type `element_type`.
    pub fn new_array<I: IntoIterator<Item = Variant>>(
        element_type: &VariantType,
        children: I,
    ) -> Result<Self> {
        let typ = VariantType::new_array(element_type);
        let children: Vec<Variant> = children.into_iter().collect();

        if let Some(child) = children.iter().find(|child| child.type_() != element_type) {
            return Err(Error::mismatch(
                format!("array elements of type '{}'", element_type),
                format!("'{}'", child.type_()),
            ));
        }

        if element_type.class() == TypeClass::Byte {
            let bytes = children
                .iter()
                .filter_map(|child| match child.repr {
                    Repr::Byte(byte) => Some(byte),
                    _ => None,
                })
                .collect();
            return Ok(Self::from_parts(typ, Repr::Bytes(bytes)));
        }

        Ok(Self::from_parts(typ, Repr::Container(children)))
    }

    /// Create a new string array `Variant`
    pub fn new_strv<S: AsRef<str>>(strings: &[S]) -> Result<Self> {
        let children = strings
            .iter()
            .map(|string| Self::new_string(string.as_ref()))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self::from_parts(
            VariantType::STRING_ARRAY,
            Repr::Container(children),
        ))
    }

    /// Create a new byte array `Variant` backed by `bytes`
    pub fn new_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self::from_parts(VariantType::BYTE_STRING, Repr::Bytes(bytes.into()))
    }

    /// Create a new tuple `Variant` from the provided iterator
    pub fn new_tuple<I: IntoIterator<Item = Variant>>(children: I) -> Self {
        let children: Vec<Variant> = children.into_iter().collect();
        let typ = VariantType::new_tuple(children.iter().map(Variant::type_));
        Self::from_parts(typ, Repr::Container(children))
    }

    /// Create a new dictionary entry `Variant`. Fails if `key` is not a basic type.
    pub fn new_dict_entry(key: Variant, value: Variant) -> Result<Self> {
        let typ = VariantType::new_dict_entry(key.type_(), value.type_())?;
        Ok(Self::from_parts(typ, Repr::Container(vec![key, value])))
    }

    /// Uses [`FromVariant`] to extract a native value
    pub fn get<T: FromVariant>(&self) -> Option<T> {
        T::from_variant(self)
    }

    /// Return the [`VariantType`] corresponding to this Variant
    pub fn type_(&self) -> &VariantType {
        &self.typ
    }

    /// Return the leading type character of this Variant as a [`TypeClass`]
    pub fn classify(&self) -> TypeClass {
        self.typ.class()
    }

    /// Return whether the type of this Variant matches the type pattern `pattern`
    ///
    /// See [`VariantType::is_subtype_of`]
    pub fn is_of_type(&self, pattern: &str) -> bool {
        self.typ.is_subtype_of(pattern)
    }

    /// Return whether the corresponding type is a basic (non-container) type
    pub fn is_basic(&self) -> bool {
        self.typ.is_basic()
    }

    /// Return whether the corresponding type is a container type
    pub fn is_container(&self) -> bool {
        self.typ.is_container()
    }

    /// Return the file descriptor index of a handle
    pub fn handle(&self) -> Option<i32> {
        match self.repr {
            Repr::Handle(handle) => Some(handle),
            _ => None,
        }
    }

    /// Return the string of a string, object path or signature `Variant`
    pub fn str(&self) -> Option<&str> {
        match &self.repr {
            Repr::String(string) => Some(string),
            _ => None,
        }
    }

    /// Return the contents of a byte array `Variant`
    pub fn bytes(&self) -> Option<&[u8]> {
        match &self.repr {
            Repr::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Return the strings of a string array `Variant`
    pub fn strv(&self) -> Option<Vec<&str>> {
        if self.typ != VariantType::STRING_ARRAY {
            return None;
        }

        self.children()?.iter().map(Variant::str).collect()
    }

    /// Return the child of a `Variant` of type [`VARIANT`][VariantType::VARIANT]
    pub fn as_variant(&self) -> Option<&Variant> {
        match &self.repr {
            Repr::Variant(child) => Some(child),
            _ => None,
        }
    }

    /// Return the child of a maybe `Variant`.
    ///
    /// Returns `None` if this is not a maybe and `Some(None)` for an empty maybe.
    pub fn maybe(&self) -> Option<Option<&Variant>> {
        match &self.repr {
            Repr::Maybe(child) => Some(child.as_deref()),
            _ => None,
        }
    }

    /// Return the children of a tuple, dictionary entry or array that is not a byte array
    pub fn children(&self) -> Option<&[Variant]> {
        match &self.repr {
            Repr::Container(children) => Some(children),
            _ => None,
        }
    }

    /// Return key and value of a dictionary entry
    pub fn dict_entry(&self) -> Option<(&Variant, &Variant)> {
        match (self.classify(), &self.repr) {
            (TypeClass::DictEntry, Repr::Container(children)) => match children.as_slice() {
                [key, value] => Some((key, value)),
                _ => None,
            },
            _ => None,
        }
    }

    /// Return the number of children in this `Variant`
    pub fn n_children(&self) -> usize {
        match &self.repr {
            Repr::Variant(_) => 1,
            Repr::Maybe(child) => usize::from(child.is_some()),
            Repr::Bytes(bytes) => bytes.len(),
            Repr::Container(children) => children.len(),
            _ => 0,
        }
    }

    /// Return the child value at `index`
    pub fn try_child_value(&self, index: usize) -> Option<Self> {
        match &self.repr {
            Repr::Variant(child) if index == 0 => Some((**child).clone()),
            Repr::Maybe(Some(child)) if index == 0 => Some((**child).clone()),
            Repr::Bytes(bytes) => bytes.get(index).map(|byte| Self::new_byte(*byte)),
            Repr::Container(children) => children.get(index).cloned(),
            _ => None,
        }
    }

    /// Return the child value at `index`.
    ///
    /// # Panics
    ///
    /// This function will panic if the index is out of range
    pub fn child_value(&self, index: usize) -> Self {
        self.try_child_value(index).unwrap_or_else(|| {
            panic!(
                "Child index {} out of range for variant of type '{}'",
                index, self.typ
            )
        })
    }

    /// Iterate over the child values of this Variant
    pub fn iter(&self) -> VariantIter<'_> {
        VariantIter::new(self)
    }
}

/// An `Iterator` over the children of a container [`Variant`]
pub struct VariantIter<'a> {
    elem: &'a Variant,
    child: usize,
}

impl<'a> VariantIter<'a> {
    /// Create a new `VariantIter`. Basic values have no children.
    pub fn new(elem: &'a Variant) -> Self {
        Self { elem, child: 0 }
    }
}

impl<'a> Iterator for VariantIter<'a> {
    type Item = Variant;

    fn next(&mut self) -> Option<Self::Item> {
        let child = self.elem.try_child_value(self.child);
        self.child += 1;
        child
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.elem.n_children().saturating_sub(self.child);
        (remaining, Some(remaining))
    }
}

impl<'a> IntoIterator for &'a Variant {
    type Item = Variant;
    type IntoIter = VariantIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

fn write_string_literal(f: &mut Formatter<'_>, string: &str) -> std::fmt::Result {
    f.write_char('\'')?;

    for c in string.chars() {
        match c {
            '\'' => f.write_str("\\'")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\t' => f.write_str("\\t")?,
            '\r' => f.write_str("\\r")?,
            c if c.is_control() => write!(f, "\\u{:04x}", c as u32)?,
            c => f.write_char(c)?,
        }
    }

    f.write_char('\'')
}

fn write_bytes(f: &mut Formatter<'_>, bytes: &[u8]) -> std::fmt::Result {
    // NUL terminated printable text is shown as a bytestring literal
    if let Some((0, text)) = bytes.split_last() {
        if text.iter().all(|b| b.is_ascii_graphic() || *b == b' ') {
            f.write_str("b")?;
            return write_string_literal(f, &String::from_utf8_lossy(text));
        }
    }

    f.write_char('[')?;
    for (index, byte) in bytes.iter().enumerate() {
        if index > 0 {
            f.write_str(", ")?;
        }

        write!(f, "0x{:02x}", byte)?;
    }
    f.write_char(']')
}

fn write_list(
    f: &mut Formatter<'_>,
    children: &[Variant],
    open: char,
    close: char,
) -> std::fmt::Result {
    f.write_char(open)?;
    for (index, child) in children.iter().enumerate() {
        if index > 0 {
            f.write_str(", ")?;
        }

        write!(f, "{}", child)?;
    }
    f.write_char(close)
}

/// Prints the GVariant text format, without type annotations
impl Display for Variant {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.repr {
            Repr::Boolean(value) => write!(f, "{}", value),
            Repr::Byte(value) => write!(f, "0x{:02x}", value),
            Repr::Int16(value) => write!(f, "{}", value),
            Repr::UInt16(value) => write!(f, "{}", value),
            Repr::Int32(value) => write!(f, "{}", value),
            Repr::UInt32(value) => write!(f, "{}", value),
            Repr::Int64(value) => write!(f, "{}", value),
            Repr::UInt64(value) => write!(f, "{}", value),
            Repr::Handle(value) => write!(f, "{}", value),
            Repr::Double(value) => write!(f, "{:?}", value),
            Repr::String(value) => write_string_literal(f, value),
            Repr::Variant(child) => write!(f, "<{}>", child),
            Repr::Maybe(None) => f.write_str("nothing"),
            Repr::Maybe(Some(child)) => {
                if child.classify() == TypeClass::Maybe {
                    write!(f, "just {}", child)
                } else {
                    write!(f, "{}", child)
                }
            }
            Repr::Bytes(bytes) => write_bytes(f, bytes),
            Repr::Container(children) => match self.classify() {
                TypeClass::Tuple if children.len() == 1 => write!(f, "({},)", children[0]),
                TypeClass::Tuple => write_list(f, children, '(', ')'),
                TypeClass::DictEntry => write_list(f, children, '{', '}'),
                _ if ArrayKind::of(&self.typ) == Some(ArrayKind::DictEntryArray) => {
                    f.write_char('{')?;
                    for (index, (key, value)) in
                        children.iter().filter_map(Variant::dict_entry).enumerate()
                    {
                        if index > 0 {
                            f.write_str(", ")?;
                        }

                        write!(f, "{}: {}", key, value)?;
                    }
                    f.write_char('}')
                }
                _ => write_list(f, children, '[', ']'),
            },
        }
    }
}

impl Debug for Variant {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Variant {{ type: {}, value: {} }}", self.typ, self)
    }
}

impl AsRef<Variant> for Variant {
    fn as_ref(&self) -> &Variant {
        self
    }
}
