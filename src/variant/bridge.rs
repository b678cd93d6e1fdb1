use super::Variant;
use crate::endian::Endian;
use crate::error::{Error, Result};
use crate::variant_type::VariantType;

fn context() -> zvariant::serialized::Context {
    zvariant::serialized::Context::new_gvariant(Endian::Little.into(), 0)
}

impl Variant {
    /// Create a `Variant` from any value that zvariant can serialize.
    ///
    /// The type is taken from the zvariant signature of `T`.
    pub fn from_serialize<T>(value: &T) -> Result<Self>
    where
        T: zvariant::Type + serde::Serialize + ?Sized,
    {
        let typ = VariantType::new(&<T as zvariant::Type>::SIGNATURE.to_string())?;
        let data = zvariant::to_bytes(context(), value)?;
        Variant::from_bytes(&typ, &data, Endian::Little)
    }

    /// Deserialize this value into any type that zvariant can deserialize.
    ///
    /// The zvariant signature of `T` must match the type of this `Variant` exactly.
    pub fn deserialize<T>(&self) -> Result<T>
    where
        T: zvariant::Type + serde::de::DeserializeOwned,
    {
        let signature = <T as zvariant::Type>::SIGNATURE.to_string();
        if self.type_().as_str() != signature {
            return Err(Error::mismatch(
                format!("type '{}'", signature),
                format!("'{}'", self.type_()),
            ));
        }

        let bytes = self.data();
        let data = zvariant::serialized::Data::new(&bytes[..], context());
        let (value, _): (T, usize) = data.deserialize()?;
        Ok(value)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test::assert_bytes_eq;
    use matches::assert_matches;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    #[test]
    fn from_serialize() {
        let value = Variant::from_serialize(&(5u32, "abc", vec![1i64, 2])).unwrap();
        assert_eq!(value.type_().as_str(), "(usax)");
        assert_eq!(value.child_value(1).str(), Some("abc"));
        assert_eq!(value.child_value(2).child_value(1).get::<i64>(), Some(2));

        let data = zvariant::to_bytes(context(), &(5u32, "abc", vec![1i64, 2])).unwrap();
        assert_bytes_eq(&value.data(), &data, "zvariant data");
    }

    #[test]
    fn deserialize() {
        let dict = Variant::from_serialize(&HashMap::from([("a".to_string(), 1u16)])).unwrap();
        assert_eq!(dict.type_().as_str(), "a{sq}");
        assert_eq!(dict.to_string(), "{'a': 1}");

        let back: HashMap<String, u16> = dict.deserialize().unwrap();
        assert_eq!(back.get("a"), Some(&1));

        assert_matches!(dict.deserialize::<u16>(), Err(Error::TypeMismatch { .. }));
    }
}
