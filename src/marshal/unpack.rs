use super::{ByteCodec, Marshaller};
use crate::error::{Error, Result};
use crate::signature::TypeClass;
use crate::value::Value;
use crate::variant::Variant;
use crate::variant_type::ArrayKind;
use std::collections::BTreeMap;

fn assertion(variant: &Variant) -> Error {
    Error::Assertion(format!(
        "variant of type '{}' does not hold a value of its type",
        variant.type_()
    ))
}

fn scalar<T>(variant: &Variant, value: Option<T>) -> Result<T> {
    value.ok_or_else(|| assertion(variant))
}

pub(super) fn unpack<C: ByteCodec>(
    marshaller: &Marshaller<C>,
    variant: &Variant,
    deep: bool,
    recursive: bool,
    depth: usize,
) -> Result<Value> {
    if depth > marshaller.max_depth() {
        return Err(Error::MaxNestingExceeded {
            limit: marshaller.max_depth(),
        });
    }

    let child = |child: &Variant| -> Result<Value> {
        if deep {
            unpack(marshaller, child, deep, recursive, depth + 1)
        } else {
            Ok(Value::Variant(child.clone()))
        }
    };

    Ok(match variant.classify() {
        TypeClass::Boolean => Value::Bool(scalar(variant, variant.get::<bool>())?),
        TypeClass::Byte => Value::Int(scalar(variant, variant.get::<u8>())?.into()),
        TypeClass::Int16 => Value::Int(scalar(variant, variant.get::<i16>())?.into()),
        TypeClass::UInt16 => Value::Int(scalar(variant, variant.get::<u16>())?.into()),
        TypeClass::Int32 => Value::Int(scalar(variant, variant.get::<i32>())?.into()),
        TypeClass::UInt32 => Value::Int(scalar(variant, variant.get::<u32>())?.into()),
        TypeClass::Int64 => Value::Int(scalar(variant, variant.get::<i64>())?),
        TypeClass::UInt64 => Value::from(scalar(variant, variant.get::<u64>())?),
        TypeClass::Handle => Value::Int(scalar(variant, variant.handle())?.into()),
        TypeClass::Double => Value::Double(scalar(variant, variant.get::<f64>())?),
        TypeClass::String | TypeClass::ObjectPath | TypeClass::Signature => {
            Value::String(scalar(variant, variant.str())?.to_string())
        }
        TypeClass::Variant => {
            let inner = scalar(variant, variant.as_variant())?;
            if deep && recursive {
                unpack(marshaller, inner, deep, recursive, depth + 1)?
            } else {
                Value::Variant(inner.clone())
            }
        }
        TypeClass::Maybe => match scalar(variant, variant.maybe())? {
            None => Value::Null,
            Some(inner) => child(inner)?,
        },
        TypeClass::Array => match ArrayKind::of(variant.type_()) {
            Some(ArrayKind::ByteArray) => marshaller
                .codec()
                .bytes_to_value(scalar(variant, variant.bytes())?),
            Some(ArrayKind::DictEntryArray) => {
                let mut map = BTreeMap::new();

                for entry in scalar(variant, variant.children())? {
                    let (key, value) = scalar(entry, entry.dict_entry())?;
                    // Keys are always unpacked, they become the map keys
                    let key = unpack(marshaller, key, true, recursive, depth + 1)?.into_key()?;
                    map.insert(key, child(value)?);
                }

                Value::Map(map)
            }
            _ => Value::Array(
                scalar(variant, variant.children())?
                    .iter()
                    .map(child)
                    .collect::<Result<_>>()?,
            ),
        },
        TypeClass::Tuple | TypeClass::DictEntry => Value::Array(
            scalar(variant, variant.children())?
                .iter()
                .map(child)
                .collect::<Result<_>>()?,
        ),
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::VariantType;
    use matches::assert_matches;
    use pretty_assertions::assert_eq;

    fn string(s: &str) -> Variant {
        Variant::new_string(s).unwrap()
    }

    fn vardict() -> Variant {
        let entries = [
            ("foo", Variant::new_variant(string("bar"))),
            ("numbers", Variant::new_variant(Variant::new_strv(&["1", "2"]).unwrap())),
        ]
        .into_iter()
        .map(|(key, value)| Variant::new_dict_entry(string(key), value).unwrap());

        Variant::new_array(&VariantType::VARDICT_ENTRY, entries).unwrap()
    }

    #[test]
    fn basic() {
        let marshaller = Marshaller::new();
        assert_eq!(
            marshaller.unpack(&Variant::new_uint64(u64::MAX)).unwrap(),
            Value::UInt(u64::MAX)
        );
        assert_eq!(
            marshaller.unpack(&Variant::new_uint64(7)).unwrap(),
            Value::Int(7)
        );
        assert_eq!(
            marshaller.unpack(&Variant::new_int64(i64::MIN)).unwrap(),
            Value::Int(i64::MIN)
        );
        assert_eq!(
            marshaller.unpack(&Variant::new_handle(4)).unwrap(),
            Value::Int(4)
        );
        assert_eq!(
            marshaller.unpack(&Variant::new_object_path("/x").unwrap()).unwrap(),
            Value::from("/x")
        );
        assert_eq!(
            marshaller.unpack(&Variant::new_nothing(&VariantType::INT32)).unwrap(),
            Value::Null
        );
    }

    #[test]
    fn shallow() {
        let marshaller = Marshaller::new();
        let tuple = Variant::new_tuple([string("a"), Variant::new_int32(1)]);
        assert_eq!(
            marshaller.unpack(&tuple).unwrap(),
            Value::Array(vec![
                Value::Variant(string("a")),
                Value::Variant(Variant::new_int32(1)),
            ])
        );

        let just = Variant::new_just(Variant::new_int32(1));
        assert_eq!(
            marshaller.unpack(&just).unwrap(),
            Value::Variant(Variant::new_int32(1))
        );
        assert_eq!(marshaller.deep_unpack(&just).unwrap(), Value::Int(1));

        // byte arrays are unpacked even when shallow
        assert_eq!(
            marshaller.unpack(&Variant::new_bytes(b"ab".to_vec())).unwrap(),
            Value::bytes(b"ab".to_vec())
        );
    }

    #[test]
    fn dictionaries() {
        let marshaller = Marshaller::new();
        let dict = vardict();

        let Value::Map(shallow) = marshaller.unpack(&dict).unwrap() else {
            panic!("Expected a map");
        };
        assert_eq!(
            shallow.get("foo"),
            Some(&Value::Variant(Variant::new_variant(string("bar"))))
        );

        let Value::Map(deep) = marshaller.deep_unpack(&dict).unwrap() else {
            panic!("Expected a map");
        };
        assert_eq!(deep.get("foo"), Some(&Value::Variant(string("bar"))));

        let Value::Map(recursive) = marshaller.recursive_unpack(&dict).unwrap() else {
            panic!("Expected a map");
        };
        assert_eq!(recursive.get("foo"), Some(&Value::from("bar")));
        assert_eq!(
            recursive.get("numbers"),
            Some(&Value::Array(vec![Value::from("1"), Value::from("2")]))
        );
    }

    #[test]
    fn numeric_keys() {
        let entry = Variant::new_dict_entry(Variant::new_uint32(7), string("x")).unwrap();
        let entry_type = entry.type_().clone();
        let dict = Variant::new_array(&entry_type, [entry]).unwrap();

        assert_eq!(
            Marshaller::new().deep_unpack(&dict).unwrap(),
            Value::Map(BTreeMap::from([("7".to_string(), Value::from("x"))]))
        );
    }

    #[test]
    fn recursive_requires_deep() {
        let boxed = Variant::new_variant(Variant::new_int32(5));
        let marshaller = Marshaller::new();

        assert_eq!(
            marshaller.unpack_variant(&boxed, false, true).unwrap(),
            Value::Variant(Variant::new_int32(5))
        );
        assert_eq!(
            marshaller.deep_unpack(&boxed).unwrap(),
            Value::Variant(Variant::new_int32(5))
        );
        assert_eq!(marshaller.recursive_unpack(&boxed).unwrap(), Value::Int(5));
    }

    #[test]
    fn depth_limit() {
        let mut value = Variant::new_int32(1);
        for _ in 0..5 {
            value = Variant::new_variant(value);
        }

        let marshaller = Marshaller::new().with_max_depth(3);
        assert_matches!(
            marshaller.recursive_unpack(&value),
            Err(Error::MaxNestingExceeded { limit: 3 })
        );
        assert!(marshaller.unpack(&value).is_ok());
    }
}
