use crate::error::{Error, Result};
use crate::signature::{SignatureReader, DEFAULT_MAX_DEPTH};
use crate::value::Value;
use crate::variant::Variant;

mod pack;
mod unpack;

/// Conversion between host strings and the contents of `ay` byte arrays
pub trait ByteCodec {
    /// Encode a host string as the contents of a byte array
    fn bytes_from_str(&self, string: &str) -> Vec<u8>;

    /// Turn the contents of a byte array into a host value
    fn bytes_to_value(&self, bytes: &[u8]) -> Value {
        Value::Bytes(bytes.to_vec())
    }
}

/// Encodes strings as UTF-8 with a terminating NUL byte, unless one is already present.
///
/// This matches how GLib stores bytestrings such as file names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NulTerminatedCodec;

impl ByteCodec for NulTerminatedCodec {
    fn bytes_from_str(&self, string: &str) -> Vec<u8> {
        let mut bytes = string.as_bytes().to_vec();
        if bytes.last() != Some(&0) {
            bytes.push(0);
        }

        bytes
    }
}

/// Converts between host [`Value`]s and [`Variant`]s, driven by type signatures.
///
/// ```
/// use gvpack::{Marshaller, Value};
///
/// let marshaller = Marshaller::new();
/// let value = Value::Array(vec![Value::from("x"), Value::from(5)]);
/// let variant = marshaller.from_signature("(si)", &value).unwrap();
///
/// assert_eq!(variant.type_().as_str(), "(si)");
/// assert_eq!(marshaller.deep_unpack(&variant).unwrap(), value);
/// ```
#[derive(Debug, Clone)]
pub struct Marshaller<C = NulTerminatedCodec> {
    max_depth: usize,
    codec: C,
}

impl Marshaller {
    /// Create a marshaller with the [`DEFAULT_MAX_DEPTH`] and the [`NulTerminatedCodec`]
    pub fn new() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            codec: NulTerminatedCodec,
        }
    }
}

impl Default for Marshaller {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: ByteCodec> Marshaller<C> {
    /// Limit container nesting in signatures and values to `max_depth`
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Use `codec` for converting strings to byte arrays
    pub fn with_codec<D: ByteCodec>(self, codec: D) -> Marshaller<D> {
        Marshaller {
            max_depth: self.max_depth,
            codec,
        }
    }

    /// The configured nesting limit
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// The configured byte codec
    pub fn codec(&self) -> &C {
        &self.codec
    }

    /// Pack `value` into a [`Variant`] of the single complete type `signature`.
    ///
    /// The whole signature is checked before the value is looked at, so a malformed signature
    /// is always reported as such.
    pub fn from_signature(&self, signature: &str, value: &Value) -> Result<Variant> {
        tracing::trace!(signature, "packing value");

        let mut reader = SignatureReader::with_max_depth(signature, self.max_depth);

        let mut check = reader.clone();
        check.read_single_type(false)?;
        if !check.is_empty() {
            return Err(Error::TrailingSignatureData {
                remaining: check.remaining().to_string(),
            });
        }

        let variant = self.pack_variant(&mut reader, value)?;
        if !reader.is_empty() {
            return Err(Error::TrailingSignatureData {
                remaining: reader.remaining().to_string(),
            });
        }

        Ok(variant)
    }

    /// Consume exactly one single complete type from `signature` and pack `value` with it.
    ///
    /// Unlike [`from_signature`](Self::from_signature), the rest of the signature is left
    /// in the reader, e.g. for packing a list of D-Bus method arguments one at a time.
    pub fn pack_variant(&self, signature: &mut SignatureReader<'_>, value: &Value) -> Result<Variant> {
        pack::pack(self, signature, value, 0)
    }

    /// Unpack one level of `variant`: children stay [`Value::Variant`]s
    pub fn unpack(&self, variant: &Variant) -> Result<Value> {
        self.unpack_variant(variant, false, false)
    }

    /// Unpack all container levels of `variant`, but keep the children of `v` variants boxed
    pub fn deep_unpack(&self, variant: &Variant) -> Result<Value> {
        self.unpack_variant(variant, true, false)
    }

    /// Unpack `variant` completely, including the contents of nested `v` variants.
    ///
    /// The result no longer carries any type information.
    pub fn recursive_unpack(&self, variant: &Variant) -> Result<Value> {
        self.unpack_variant(variant, true, true)
    }

    /// Unpack `variant` with explicit flags. `recursive` has no effect without `deep`.
    pub fn unpack_variant(&self, variant: &Variant, deep: bool, recursive: bool) -> Result<Value> {
        tracing::trace!(signature = %variant.type_(), deep, recursive, "unpacking variant");
        unpack::unpack(self, variant, deep, recursive, 0)
    }
}

impl Variant {
    /// Pack `value` with the default [`Marshaller`]
    pub fn from_signature(signature: &str, value: &Value) -> Result<Variant> {
        Marshaller::new().from_signature(signature, value)
    }

    /// Unpack one level with the default [`Marshaller`]
    pub fn unpack(&self) -> Result<Value> {
        Marshaller::new().unpack(self)
    }

    /// Unpack all container levels with the default [`Marshaller`]
    pub fn deep_unpack(&self) -> Result<Value> {
        Marshaller::new().deep_unpack(self)
    }

    /// Unpack everything, including nested variants, with the default [`Marshaller`]
    pub fn recursive_unpack(&self) -> Result<Value> {
        Marshaller::new().recursive_unpack(self)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use matches::assert_matches;
    use pretty_assertions::assert_eq;

    struct Latin1Codec;

    impl ByteCodec for Latin1Codec {
        fn bytes_from_str(&self, string: &str) -> Vec<u8> {
            string.chars().map(|c| c as u32 as u8).collect()
        }

        fn bytes_to_value(&self, bytes: &[u8]) -> Value {
            Value::String(bytes.iter().map(|b| *b as char).collect())
        }
    }

    #[test]
    fn nul_terminated() {
        assert_eq!(NulTerminatedCodec.bytes_from_str("abc"), b"abc\0");
        assert_eq!(NulTerminatedCodec.bytes_from_str("abc\0"), b"abc\0");
        assert_eq!(NulTerminatedCodec.bytes_from_str(""), b"\0");
    }

    #[test]
    fn custom_codec() {
        let marshaller = Marshaller::new().with_codec(Latin1Codec);
        let variant = marshaller
            .from_signature("ay", &Value::from("é"))
            .unwrap();
        assert_eq!(variant.bytes(), Some(&[0xe9u8][..]));
        assert_eq!(marshaller.unpack(&variant).unwrap(), Value::from("é"));
    }

    #[test]
    fn signature_checked_first() {
        let marshaller = Marshaller::new();
        assert_matches!(
            marshaller.from_signature("", &Value::Null),
            Err(Error::EmptySignature)
        );
        assert_matches!(
            marshaller.from_signature("(si", &Value::from(5)),
            Err(Error::UnterminatedTuple)
        );
        assert_matches!(
            marshaller.from_signature("ii", &Value::from("x")),
            Err(Error::TrailingSignatureData { .. })
        );
    }

    #[test]
    fn max_depth() {
        let marshaller = Marshaller::new().with_max_depth(2);
        assert_eq!(marshaller.max_depth(), 2);
        assert!(marshaller
            .from_signature("aai", &Value::Array(vec![]))
            .is_ok());
        assert_matches!(
            marshaller.from_signature("aaai", &Value::Array(vec![])),
            Err(Error::MaxNestingExceeded { limit: 2 })
        );
    }

    #[test]
    fn pack_arguments() {
        let marshaller = Marshaller::new();
        let mut reader = SignatureReader::new("sa{sv}u");

        let first = marshaller.pack_variant(&mut reader, &Value::from("a")).unwrap();
        assert_eq!(first.type_().as_str(), "s");
        assert_eq!(reader.remaining(), "a{sv}u");

        let second = marshaller
            .pack_variant(&mut reader, &Value::Map(Default::default()))
            .unwrap();
        assert_eq!(second.type_().as_str(), "a{sv}");
        assert_eq!(reader.remaining(), "u");
    }
}
