use std::fmt::{Display, Formatter};

/// An error that can occur while parsing signatures or converting values
#[non_exhaustive]
#[derive(Debug)]
pub enum Error {
    /// A value was packed against a zero-length signature
    EmptySignature,

    /// A character outside the signature alphabet was found where a type was expected
    UnexpectedCharacter {
        /// The offending character
        character: char,
        /// Byte offset of the character in the signature
        position: usize,
    },

    /// A dictionary entry key was not a basic type
    SimpleTypeExpected {
        /// The offending character
        character: char,
        /// Byte offset of the character in the signature
        position: usize,
    },

    /// The signature ended before a tuple was closed
    UnterminatedTuple,

    /// The children of a tuple were not followed by `)`
    MissingTupleClose {
        /// The character found instead, if any
        found: Option<char>,
    },

    /// The children of a dictionary entry were not followed by `}`
    MissingDictClose {
        /// The character found instead, if any
        found: Option<char>,
    },

    /// More than one single complete type was given where exactly one is expected
    TrailingSignatureData {
        /// The unconsumed rest of the signature
        remaining: String,
    },

    /// Signature, value or data nesting is deeper than the configured limit
    MaxNestingExceeded {
        /// The configured limit
        limit: usize,
    },

    /// A variant violated an invariant of its own representation
    Assertion(String),

    /// A host value does not have the shape the signature asks for
    TypeMismatch {
        /// What the signature expected
        expected: String,
        /// What was found instead
        found: String,
    },

    /// A number does not fit the width of the requested type
    OutOfRange {
        /// The rendered value
        value: String,
        /// The type character that was requested
        type_class: char,
    },

    /// The string is not a valid D-Bus object path
    InvalidObjectPath(String),

    /// The string is not a valid sequence of GVariant types
    InvalidSignatureString(String),

    /// The string contains an interior NUL byte
    InvalidString(String),

    /// Serialized GVariant data is malformed, with context information in the provided string
    Data(String),

    /// An error occured when converting data with zvariant
    ZVariant(zvariant::Error),
}

impl Error {
    /// Whether this error was caused by a malformed type signature
    pub fn is_signature_error(&self) -> bool {
        matches!(
            self,
            Error::EmptySignature
                | Error::UnexpectedCharacter { .. }
                | Error::SimpleTypeExpected { .. }
                | Error::UnterminatedTuple
                | Error::MissingTupleClose { .. }
                | Error::MissingDictClose { .. }
                | Error::TrailingSignatureData { .. }
                | Error::MaxNestingExceeded { .. }
        )
    }

    pub(crate) fn mismatch(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            found: found.into(),
        }
    }
}

impl std::error::Error for Error {}

impl From<zvariant::Error> for Error {
    fn from(err: zvariant::Error) -> Self {
        Self::ZVariant(err)
    }
}

fn found_or_end(found: &Option<char>) -> String {
    match found {
        Some(c) => format!("'{}'", c),
        None => "end of signature".to_string(),
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::EmptySignature => write!(f, "GVariant signature cannot be empty"),
            Error::UnexpectedCharacter {
                character,
                position,
            } => write!(
                f,
                "Invalid GVariant signature (unexpected character '{}' at position {})",
                character, position
            ),
            Error::SimpleTypeExpected {
                character,
                position,
            } => write!(
                f,
                "Invalid GVariant signature (a simple type was expected, found '{}' at position {})",
                character, position
            ),
            Error::UnterminatedTuple => write!(
                f,
                "Invalid GVariant signature for type TUPLE (expected ')' before end of signature)"
            ),
            Error::MissingTupleClose { found } => write!(
                f,
                "Invalid GVariant signature for type TUPLE (expected ')', found {})",
                found_or_end(found)
            ),
            Error::MissingDictClose { found } => write!(
                f,
                "Invalid GVariant signature for type DICT_ENTRY (expected '}}', found {})",
                found_or_end(found)
            ),
            Error::TrailingSignatureData { remaining } => write!(
                f,
                "Invalid GVariant signature (more than one single complete type, '{}' remains)",
                remaining
            ),
            Error::MaxNestingExceeded { limit } => {
                write!(f, "Maximum nesting depth of {} exceeded", limit)
            }
            Error::Assertion(msg) => write!(f, "Assertion failure: {}", msg),
            Error::TypeMismatch { expected, found } => {
                write!(f, "Expected {}, found {}", expected, found)
            }
            Error::OutOfRange { value, type_class } => write!(
                f,
                "Value {} is out of range for type '{}'",
                value, type_class
            ),
            Error::InvalidObjectPath(path) => write!(f, "Invalid object path: '{}'", path),
            Error::InvalidSignatureString(sig) => {
                write!(f, "Invalid signature string: '{}'", sig)
            }
            Error::InvalidString(string) => {
                write!(f, "String contains an interior NUL byte: {:?}", string)
            }
            Error::Data(msg) => write!(f, "Invalid GVariant data: {}", msg),
            Error::ZVariant(err) => write!(f, "Error converting ZVariant data: {}", err),
        }
    }
}

/// The Result type for [`Error`]
pub type Result<T> = std::result::Result<T, Error>;
