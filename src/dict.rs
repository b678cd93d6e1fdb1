use crate::error::{Error, Result};
use crate::marshal::Marshaller;
use crate::value::Value;
use crate::variant::Variant;
use crate::variant_type::VariantType;
use std::collections::BTreeMap;

/// A mutable builder and reader for `a{sv}` dictionaries.
///
/// Values are stored unboxed and wrapped in `v` variants by [`end`](Self::end).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariantDict {
    entries: BTreeMap<String, Variant>,
}

impl VariantDict {
    /// Create an empty dictionary
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the entries of an `a{sv}` variant
    pub fn from_variant(variant: &Variant) -> Result<Self> {
        if variant.type_() != &VariantType::VARDICT {
            return Err(Error::mismatch(
                "a variant of type 'a{sv}'",
                format!("'{}'", variant.type_()),
            ));
        }

        let mut dict = Self::new();
        for entry in variant.children().unwrap_or_default() {
            let (key, value) = entry
                .dict_entry()
                .and_then(|(key, value)| Some((key.str()?, value.as_variant()?)))
                .ok_or_else(|| Error::Assertion("malformed a{sv} entry".to_string()))?;
            dict.insert_value(key, value.clone());
        }

        Ok(dict)
    }

    /// Create a dictionary where every value is a string, as used for structured log fields
    pub fn from_string_fields<K, V, I>(fields: I) -> Result<Self>
    where
        K: Into<String>,
        V: AsRef<str>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut dict = Self::new();
        for (key, value) in fields {
            dict.insert_value(key, Variant::new_string(value.as_ref())?);
        }

        Ok(dict)
    }

    /// Insert or replace the value for `key`
    pub fn insert_value(&mut self, key: impl Into<String>, value: Variant) {
        self.entries.insert(key.into(), value);
    }

    /// Pack `value` with `signature` and insert it for `key`
    pub fn insert(&mut self, key: impl Into<String>, signature: &str, value: &Value) -> Result<()> {
        let variant = Marshaller::new().from_signature(signature, value)?;
        self.insert_value(key, variant);
        Ok(())
    }

    /// Look up the value for `key`.
    ///
    /// With an `expected_type`, values of other types are treated as missing.
    pub fn lookup_value(&self, key: &str, expected_type: Option<&VariantType>) -> Option<&Variant> {
        self.entries
            .get(key)
            .filter(|value| expected_type.map_or(true, |typ| value.type_() == typ))
    }

    /// Look up the value for `key` and unpack it.
    ///
    /// `expected_type` is a type string; values of other types are treated as missing.
    /// With `deep` the value is unpacked with [`Marshaller::deep_unpack`], otherwise
    /// with [`Marshaller::unpack`].
    pub fn lookup(&self, key: &str, expected_type: Option<&str>, deep: bool) -> Result<Option<Value>> {
        let expected_type = expected_type.map(VariantType::new).transpose()?;

        self.lookup_value(key, expected_type.as_ref())
            .map(|value| Marshaller::new().unpack_variant(value, deep, false))
            .transpose()
    }

    /// Whether there is a value for `key`
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Remove the value for `key`, returning it
    pub fn remove(&mut self, key: &str) -> Option<Variant> {
        self.entries.remove(key)
    }

    /// The number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the dictionary is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over keys and values, sorted by key
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Variant)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// Build the `a{sv}` variant. Fails if a key contains a NUL byte.
    pub fn end(&self) -> Result<Variant> {
        let entries = self
            .entries
            .iter()
            .map(|(key, value)| {
                Variant::new_dict_entry(
                    Variant::new_string(key.as_str())?,
                    Variant::new_variant(value.clone()),
                )
            })
            .collect::<Result<Vec<_>>>()?;

        Variant::new_array(&VariantType::VARDICT_ENTRY, entries)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use matches::assert_matches;
    use pretty_assertions::assert_eq;

    #[test]
    fn lookup() {
        let mut dict = VariantDict::new();
        dict.insert("foo", "s", &Value::from("bar")).unwrap();
        dict.insert("numbers", "as", &Value::Array(vec![Value::from("1")]))
            .unwrap();
        dict.insert_value("n", Variant::new_uint32(7));

        assert!(dict.contains("foo"));
        assert_eq!(dict.len(), 3);
        assert_eq!(
            dict.lookup("foo", None, false).unwrap(),
            Some(Value::from("bar"))
        );
        assert_eq!(dict.lookup("foo", Some("i"), false).unwrap(), None);
        assert_eq!(dict.lookup("missing", None, false).unwrap(), None);
        assert_eq!(
            dict.lookup("numbers", Some("as"), false).unwrap(),
            Some(Value::Array(vec![Value::Variant(
                Variant::new_string("1").unwrap()
            )]))
        );
        assert_eq!(
            dict.lookup("numbers", None, true).unwrap(),
            Some(Value::Array(vec![Value::from("1")]))
        );
        assert_matches!(
            dict.lookup("foo", Some("(s"), false),
            Err(Error::UnterminatedTuple)
        );
        assert_eq!(
            dict.lookup_value("n", Some(&VariantType::UINT32)),
            Some(&Variant::new_uint32(7))
        );

        assert_eq!(dict.remove("n"), Some(Variant::new_uint32(7)));
        assert!(!dict.contains("n"));
    }

    #[test]
    fn end() {
        let mut dict = VariantDict::new();
        dict.insert_value("b", Variant::new_boolean(true));
        dict.insert_value("a", Variant::new_int32(1));

        let variant = dict.end().unwrap();
        assert_eq!(variant.type_(), &VariantType::VARDICT);
        assert_eq!(variant.to_string(), "{'a': <1>, 'b': <true>}");

        assert_eq!(VariantDict::from_variant(&variant).unwrap(), dict);
        assert_matches!(
            VariantDict::from_variant(&Variant::new_int32(1)),
            Err(Error::TypeMismatch { .. })
        );

        let mut bad = VariantDict::new();
        bad.insert_value("a\0", Variant::new_int32(1));
        assert_matches!(bad.end(), Err(Error::InvalidString(_)));
    }

    #[test]
    fn string_fields() {
        let dict = VariantDict::from_string_fields([
            ("MESSAGE", "hello"),
            ("PRIORITY", "4"),
        ])
        .unwrap();

        assert_eq!(dict.lookup("PRIORITY", Some("s"), false).unwrap(), Some(Value::from("4")));
        assert_eq!(
            dict.iter().map(|(key, _)| key).collect::<Vec<_>>(),
            vec!["MESSAGE", "PRIORITY"]
        );
    }
}
