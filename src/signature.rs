use crate::error::{Error, Result};
use crate::variant_type::VariantType;

/// The default limit for container nesting in signatures, values and serialized data
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// The classification of a single complete type, identified by its leading type character
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeClass {
    /// `b`, a bool
    Boolean,
    /// `y`, an [`u8`]
    Byte,
    /// `n`, an [`i16`]
    Int16,
    /// `q`, an [`u16`]
    UInt16,
    /// `i`, an [`i32`]
    Int32,
    /// `u`, an [`u32`]
    UInt32,
    /// `x`, an [`i64`]
    Int64,
    /// `t`, an [`u64`]
    UInt64,
    /// `h`, an index into an out-of-band file descriptor list, stored as [`i32`]
    Handle,
    /// `d`, an [`f64`]
    Double,
    /// `s`, an UTF-8 string
    String,
    /// `o`, a D-Bus object path
    ObjectPath,
    /// `g`, a type signature
    Signature,
    /// `v`, a boxed value carrying its own type
    Variant,
    /// `m`, an optional value
    Maybe,
    /// `a`, a homogeneous array
    Array,
    /// `(`, a tuple
    Tuple,
    /// `{`, a dictionary entry
    DictEntry,
}

impl TypeClass {
    /// Look up the class for a leading type character
    pub const fn from_char(c: char) -> Option<Self> {
        Some(match c {
            'b' => Self::Boolean,
            'y' => Self::Byte,
            'n' => Self::Int16,
            'q' => Self::UInt16,
            'i' => Self::Int32,
            'u' => Self::UInt32,
            'x' => Self::Int64,
            't' => Self::UInt64,
            'h' => Self::Handle,
            'd' => Self::Double,
            's' => Self::String,
            'o' => Self::ObjectPath,
            'g' => Self::Signature,
            'v' => Self::Variant,
            'm' => Self::Maybe,
            'a' => Self::Array,
            '(' => Self::Tuple,
            '{' => Self::DictEntry,
            _ => return None,
        })
    }

    /// The leading type character of this class
    pub const fn as_char(self) -> char {
        match self {
            Self::Boolean => 'b',
            Self::Byte => 'y',
            Self::Int16 => 'n',
            Self::UInt16 => 'q',
            Self::Int32 => 'i',
            Self::UInt32 => 'u',
            Self::Int64 => 'x',
            Self::UInt64 => 't',
            Self::Handle => 'h',
            Self::Double => 'd',
            Self::String => 's',
            Self::ObjectPath => 'o',
            Self::Signature => 'g',
            Self::Variant => 'v',
            Self::Maybe => 'm',
            Self::Array => 'a',
            Self::Tuple => '(',
            Self::DictEntry => '{',
        }
    }

    /// Whether this is one of the simple (basic, non-container) types
    pub const fn is_basic(self) -> bool {
        !self.is_container()
    }

    /// Whether this class holds child values
    pub const fn is_container(self) -> bool {
        matches!(
            self,
            Self::Variant | Self::Maybe | Self::Array | Self::Tuple | Self::DictEntry
        )
    }
}

/// A cursor over a signature string that reads one single complete type at a time.
///
/// The reader only ever borrows the signature, so a copy for reuse is just another reader
/// over the same string. Container nesting beyond `max_depth` fails with
/// [`Error::MaxNestingExceeded`] instead of recursing further.
#[derive(Debug, Clone)]
pub struct SignatureReader<'a> {
    signature: &'a str,
    position: usize,
    max_depth: usize,
}

impl<'a> SignatureReader<'a> {
    /// Create a reader with the [`DEFAULT_MAX_DEPTH`]
    pub fn new(signature: &'a str) -> Self {
        Self::with_max_depth(signature, DEFAULT_MAX_DEPTH)
    }

    /// Create a reader that refuses container nesting deeper than `max_depth`
    pub fn with_max_depth(signature: &'a str, max_depth: usize) -> Self {
        Self {
            signature,
            position: 0,
            max_depth,
        }
    }

    /// The configured nesting limit
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Byte offset of the next unread character
    pub fn position(&self) -> usize {
        self.position
    }

    /// Whether all characters have been consumed
    pub fn is_empty(&self) -> bool {
        self.position >= self.signature.len()
    }

    /// The unconsumed rest of the signature
    pub fn remaining(&self) -> &'a str {
        &self.signature[self.position..]
    }

    /// The next character, without consuming it
    pub fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    /// Consume and return the next character
    pub fn pop(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.position += c.len_utf8();
        Some(c)
    }

    pub(crate) fn check_depth(&self, depth: usize) -> Result<()> {
        if depth > self.max_depth {
            Err(Error::MaxNestingExceeded {
                limit: self.max_depth,
            })
        } else {
            Ok(())
        }
    }

    /// Consume exactly one single complete type and return it.
    ///
    /// With `force_simple` the type must be a basic type, as required for dictionary entry keys.
    pub fn read_single_type(&mut self, force_simple: bool) -> Result<VariantType> {
        self.read_single_type_at(force_simple, 0)
    }

    pub(crate) fn read_single_type_at(
        &mut self,
        force_simple: bool,
        depth: usize,
    ) -> Result<VariantType> {
        let start = self.position;
        let class = self.read_class(force_simple, depth)?;
        Ok(VariantType::from_parts(
            &self.signature[start..self.position],
            class,
        ))
    }

    fn read_class(&mut self, force_simple: bool, depth: usize) -> Result<TypeClass> {
        self.check_depth(depth)?;

        let position = self.position;
        let character = self.pop().ok_or(Error::EmptySignature)?;
        let class = TypeClass::from_char(character);

        if force_simple && !class.map_or(false, TypeClass::is_basic) {
            return Err(Error::SimpleTypeExpected {
                character,
                position,
            });
        }

        let class = class.ok_or(Error::UnexpectedCharacter {
            character,
            position,
        })?;

        match class {
            TypeClass::Maybe | TypeClass::Array => {
                self.read_class(false, depth + 1)?;
            }
            TypeClass::DictEntry => {
                self.read_class(true, depth + 1)?;
                self.read_class(false, depth + 1)?;
                match self.pop() {
                    Some('}') => {}
                    found => return Err(Error::MissingDictClose { found }),
                }
            }
            TypeClass::Tuple => loop {
                match self.peek() {
                    None => return Err(Error::UnterminatedTuple),
                    Some(')') => {
                        self.pop();
                        break;
                    }
                    Some(_) => {
                        self.read_class(false, depth + 1)?;
                    }
                }
            },
            _ => {}
        }

        Ok(class)
    }
}

/// Split a signature into its single complete types, e.g. the argument list of a D-Bus method.
///
/// The empty signature contains zero types.
pub fn split_signature(signature: &str) -> Result<Vec<VariantType>> {
    let mut reader = SignatureReader::new(signature);
    let mut types = Vec::new();

    while !reader.is_empty() {
        types.push(reader.read_single_type(false)?);
    }

    Ok(types)
}

/// Count the single complete types in a signature
pub fn signature_length(signature: &str) -> Result<usize> {
    split_signature(signature).map(|types| types.len())
}
