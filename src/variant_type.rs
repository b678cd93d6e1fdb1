use crate::error::{Error, Result};
use crate::signature::{SignatureReader, TypeClass};
use std::borrow::{Borrow, Cow};
use std::cmp::max;
use std::fmt::{Debug, Display, Formatter};
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// Serialization properties of a type
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct TypeInfo {
    pub alignment: usize,
    /// `None` for variable sized types
    pub fixed_size: Option<usize>,
}

impl TypeInfo {
    pub(crate) const fn fixed_aligned(size: usize) -> Self {
        Self {
            alignment: size,
            fixed_size: Some(size),
        }
    }

    pub(crate) const fn variable(alignment: usize) -> Self {
        Self {
            alignment,
            fixed_size: None,
        }
    }
}

pub(crate) fn align_up(offset: usize, alignment: usize) -> usize {
    match offset % alignment {
        0 => offset,
        rem => offset + alignment - rem,
    }
}

/// The type of a [`Variant`][crate::Variant]
///
/// Internally this is just a string that holds exactly one valid single complete type,
/// together with its [`TypeClass`].
#[derive(Clone, PartialEq, Eq)]
pub struct VariantType {
    string: Cow<'static, str>,
    class: TypeClass,
}

impl VariantType {
    /// This type directly converts to bool
    pub const BOOLEAN: VariantType = VariantType::from_static("b", TypeClass::Boolean);

    /// This type directly converts to [`u8`]
    pub const BYTE: VariantType = VariantType::from_static("y", TypeClass::Byte);

    /// This type directly converts to [`i16`]
    pub const INT16: VariantType = VariantType::from_static("n", TypeClass::Int16);

    /// This type directly converts to [`u16`]
    pub const UINT16: VariantType = VariantType::from_static("q", TypeClass::UInt16);

    /// This type directly converts to [`i32`]
    pub const INT32: VariantType = VariantType::from_static("i", TypeClass::Int32);

    /// This type directly converts to [`u32`]
    pub const UINT32: VariantType = VariantType::from_static("u", TypeClass::UInt32);

    /// This type directly converts to [`i64`]
    pub const INT64: VariantType = VariantType::from_static("x", TypeClass::Int64);

    /// This type directly converts to [`u64`]
    pub const UINT64: VariantType = VariantType::from_static("t", TypeClass::UInt64);

    /// A file descriptor index
    pub const HANDLE: VariantType = VariantType::from_static("h", TypeClass::Handle);

    /// This type directly converts to [`f64`]
    pub const DOUBLE: VariantType = VariantType::from_static("d", TypeClass::Double);

    /// This type directly converts to [`String`]
    pub const STRING: VariantType = VariantType::from_static("s", TypeClass::String);

    /// A D-Bus object path
    pub const OBJECT_PATH: VariantType = VariantType::from_static("o", TypeClass::ObjectPath);

    /// A type signature
    pub const SIGNATURE: VariantType = VariantType::from_static("g", TypeClass::Signature);

    /// A container with associated type information
    pub const VARIANT: VariantType = VariantType::from_static("v", TypeClass::Variant);

    /// An empty tuple
    pub const UNIT: VariantType = VariantType::from_static("()", TypeClass::Tuple);

    /// An array of strings
    pub const STRING_ARRAY: VariantType = VariantType::from_static("as", TypeClass::Array);

    /// An array of bytes
    pub const BYTE_STRING: VariantType = VariantType::from_static("ay", TypeClass::Array);

    /// A dictionary of variant types
    pub const VARDICT: VariantType = VariantType::from_static("a{sv}", TypeClass::Array);

    /// A dictionary entry of a [`VARDICT`](Self::VARDICT)
    pub const VARDICT_ENTRY: VariantType = VariantType::from_static("{sv}", TypeClass::DictEntry);

    // Patterns for is_subtype_of
    /// Pattern matching any type
    pub const ANY: &'static str = "*";

    /// Pattern matching any basic type
    pub const BASIC: &'static str = "?";

    /// Pattern matching any tuple type
    pub const TUPLE: &'static str = "r";

    /// Pattern matching any maybe type
    pub const MAYBE: &'static str = "m*";

    /// Pattern matching any array
    pub const ARRAY: &'static str = "a*";

    /// Pattern matching any dict entry
    pub const DICT_ENTRY: &'static str = "{?*}";

    /// Pattern matching any dictionary
    pub const DICTIONARY: &'static str = "a{?*}";

    const fn from_static(string: &'static str, class: TypeClass) -> Self {
        Self {
            string: Cow::Borrowed(string),
            class,
        }
    }

    pub(crate) fn from_parts(string: &str, class: TypeClass) -> Self {
        Self {
            string: Cow::Owned(string.to_string()),
            class,
        }
    }

    /// Create a new type from a type string.
    ///
    /// This will fail if the string is not exactly one valid single complete type.
    pub fn new(type_string: &str) -> Result<Self> {
        let mut reader = SignatureReader::new(type_string);
        let typ = reader.read_single_type(false)?;

        if reader.is_empty() {
            Ok(typ)
        } else {
            Err(Error::TrailingSignatureData {
                remaining: reader.remaining().to_string(),
            })
        }
    }

    /// Construct the type of an array with elements of type `element`
    pub fn new_array(element: &VariantType) -> Self {
        Self::from_parts(&format!("a{}", element), TypeClass::Array)
    }

    /// Construct the type of a maybe containing type `element` or nothing
    pub fn new_maybe(element: &VariantType) -> Self {
        Self::from_parts(&format!("m{}", element), TypeClass::Maybe)
    }

    /// Construct a tuple type from `items`
    pub fn new_tuple<T: AsRef<VariantType>, I: IntoIterator<Item = T>>(items: I) -> Self {
        let mut type_str = String::from('(');

        for typ in items {
            type_str.push_str(typ.as_ref().as_str());
        }

        type_str.push(')');
        Self::from_parts(&type_str, TypeClass::Tuple)
    }

    /// Construct a dictionary entry type.
    ///
    /// Fails if `key` is not a basic type.
    pub fn new_dict_entry(key: &VariantType, value: &VariantType) -> Result<Self> {
        if !key.is_basic() {
            return Err(Error::SimpleTypeExpected {
                character: key.class.as_char(),
                position: 1,
            });
        }

        Ok(Self::from_parts(
            &format!("{{{}{}}}", key, value),
            TypeClass::DictEntry,
        ))
    }

    /// Return the type string
    pub fn as_str(&self) -> &str {
        &self.string
    }

    /// Return the classification of this type
    pub fn class(&self) -> TypeClass {
        self.class
    }

    /// Return whether this type is a basic / non-container type (like int or string)
    pub fn is_basic(&self) -> bool {
        self.class.is_basic()
    }

    /// Return whether this type is a container
    pub fn is_container(&self) -> bool {
        self.class.is_container()
    }

    /// Return whether this type has a fixed serialized size
    pub fn is_fixed_size(&self) -> bool {
        self.type_info().fixed_size.is_some()
    }

    fn sub_types(&self, range: std::ops::Range<usize>) -> Vec<VariantType> {
        let inner = &self.string[range];
        let mut reader = SignatureReader::with_max_depth(inner, usize::MAX);
        let mut types = Vec::new();

        while !reader.is_empty() {
            match reader.read_single_type(false) {
                Ok(typ) => types.push(typ),
                Err(_) => break,
            }
        }

        types
    }

    /// Return the element type of an array or maybe type, `None` for other types
    pub fn element(&self) -> Option<VariantType> {
        match self.class {
            TypeClass::Array | TypeClass::Maybe => {
                self.sub_types(1..self.string.len()).into_iter().next()
            }
            _ => None,
        }
    }

    /// Return the member types of a tuple or dictionary entry type.
    ///
    /// Returns an empty list for all other types.
    pub fn items(&self) -> Vec<VariantType> {
        match self.class {
            TypeClass::Tuple | TypeClass::DictEntry => {
                self.sub_types(1..self.string.len() - 1)
            }
            _ => Vec::new(),
        }
    }

    /// Return the number of members of a tuple or dictionary entry type
    pub fn n_items(&self) -> usize {
        self.items().len()
    }

    /// Return the key type of a dictionary entry type
    pub fn key(&self) -> Option<VariantType> {
        match self.class {
            TypeClass::DictEntry => self.items().into_iter().next(),
            _ => None,
        }
    }

    /// Return the value type of a dictionary entry type
    pub fn value(&self) -> Option<VariantType> {
        match self.class {
            TypeClass::DictEntry => self.items().into_iter().nth(1),
            _ => None,
        }
    }

    /// Return whether this type matches `pattern`.
    ///
    /// A pattern is a type string that may additionally use `*` (any type), `?` (any basic
    /// type) and `r` (any tuple), for example [`VariantType::DICTIONARY`].
    pub fn is_subtype_of(&self, pattern: &str) -> bool {
        let mut type_string = self.string.as_bytes();

        for &pattern_char in pattern.as_bytes() {
            let Some(&type_char) = type_string.first() else {
                return false;
            };

            if type_char == pattern_char {
                type_string = &type_string[1..];
                continue;
            }

            if type_char == b')' || type_char == b'}' {
                return false;
            }

            let length = single_type_length(type_string);
            let matches = match pattern_char {
                b'*' => true,
                b'?' => {
                    length == 1
                        && TypeClass::from_char(type_char as char)
                            .map_or(false, TypeClass::is_basic)
                }
                b'r' => type_char == b'(',
                _ => false,
            };

            if !matches {
                return false;
            }

            type_string = &type_string[length..];
        }

        type_string.is_empty()
    }

    pub(crate) fn type_info(&self) -> TypeInfo {
        match self.class {
            TypeClass::Boolean | TypeClass::Byte => TypeInfo::fixed_aligned(1),
            TypeClass::Int16 | TypeClass::UInt16 => TypeInfo::fixed_aligned(2),
            TypeClass::Int32 | TypeClass::UInt32 | TypeClass::Handle => {
                TypeInfo::fixed_aligned(4)
            }
            TypeClass::Int64 | TypeClass::UInt64 | TypeClass::Double => {
                TypeInfo::fixed_aligned(8)
            }
            TypeClass::String | TypeClass::ObjectPath | TypeClass::Signature => {
                TypeInfo::variable(1)
            }
            TypeClass::Variant => TypeInfo::variable(8),
            TypeClass::Maybe | TypeClass::Array => {
                let alignment = self
                    .element()
                    .map_or(1, |element| element.type_info().alignment);
                TypeInfo::variable(alignment)
            }
            TypeClass::Tuple | TypeClass::DictEntry => {
                let mut alignment = 1;
                let mut size = Some(0);

                for member in self.items() {
                    let info = member.type_info();
                    alignment = max(alignment, info.alignment);
                    size = match (size, info.fixed_size) {
                        (Some(size), Some(member_size)) => {
                            Some(align_up(size, info.alignment) + member_size)
                        }
                        _ => None,
                    };
                }

                match size {
                    // The unit tuple is serialized as a single zero byte
                    Some(0) => TypeInfo::fixed_aligned(1),
                    Some(size) => TypeInfo {
                        alignment,
                        fixed_size: Some(align_up(size, alignment)),
                    },
                    None => TypeInfo::variable(alignment),
                }
            }
        }
    }
}

/// Length of the first complete type (or pattern) at the start of `type_str`
fn single_type_length(type_str: &[u8]) -> usize {
    let mut brackets = 0usize;
    let mut index = 0;

    while index < type_str.len() {
        match type_str[index] {
            b'a' | b'm' => {
                index += 1;
                continue;
            }
            b'(' | b'{' => brackets += 1,
            b')' | b'}' => brackets = brackets.saturating_sub(1),
            _ => {}
        }

        index += 1;

        if brackets == 0 {
            break;
        }
    }

    index
}

/// How the elements of an array type are treated when converting to host values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayKind {
    /// `a{..}`, becomes a string keyed map
    DictEntryArray,
    /// `ay`, becomes a byte buffer
    ByteArray,
    /// Every other array, becomes a sequence
    GenericArray,
}

impl ArrayKind {
    /// Classify an array type. Returns `None` if `typ` is not an array.
    pub fn of(typ: &VariantType) -> Option<Self> {
        if typ.class() != TypeClass::Array {
            None
        } else if typ.is_subtype_of(VariantType::DICTIONARY) {
            Some(Self::DictEntryArray)
        } else if typ == &VariantType::BYTE_STRING {
            Some(Self::ByteArray)
        } else {
            Some(Self::GenericArray)
        }
    }
}

impl Debug for VariantType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("VariantType").field(&self.as_str()).finish()
    }
}

impl Display for VariantType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VariantType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<&str> for VariantType {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        Self::new(value)
    }
}

impl AsRef<VariantType> for VariantType {
    fn as_ref(&self) -> &VariantType {
        self
    }
}

impl AsRef<str> for VariantType {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

// Must agree with the hash of the borrowed str
impl Hash for VariantType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_str().hash(state)
    }
}

impl Borrow<str> for VariantType {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

impl PartialEq<str> for VariantType {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for VariantType {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}
