use gvpack::{
    ArrayKind, Endian, Error, Marshaller, TypeClass, Value, Variant, VariantDict, VariantType,
};
use matches::assert_matches;
use pretty_assertions::assert_eq;
use rand::Rng;
use std::collections::{BTreeMap, HashMap};

fn pack(signature: &str, value: Value) -> Variant {
    Variant::from_signature(signature, &value).unwrap()
}

fn array(items: impl IntoIterator<Item = Value>) -> Value {
    Value::Array(items.into_iter().collect())
}

#[test]
fn scalar_round_trip() {
    let cases = [
        ("b", Value::Bool(false)),
        ("y", Value::Int(255)),
        ("n", Value::Int(i16::MIN.into())),
        ("q", Value::Int(u16::MAX.into())),
        ("i", Value::Int(i32::MIN.into())),
        ("u", Value::Int(u32::MAX.into())),
        ("x", Value::Int(i64::MIN)),
        ("x", Value::Int(i64::MAX)),
        ("t", Value::UInt(u64::MAX)),
        ("t", Value::from(7u64)),
        ("t", Value::from(i64::MAX as u64)),
        ("h", Value::Int(3)),
        ("d", Value::Double(-1.25e300)),
        ("s", Value::from("a string")),
        ("o", Value::from("/a/object/path")),
        ("g", Value::from("a{sv}")),
    ];

    for (signature, value) in cases {
        let variant = pack(signature, value.clone());
        assert_eq!(variant.type_().as_str(), signature);
        assert_eq!(variant.unpack().unwrap(), value, "signature '{}'", signature);
    }
}

#[test]
fn random_integers() {
    let mut rng = rand::rng();

    for _ in 0..200 {
        let cases = [
            ("y", Value::Int(rng.random_range(0..=u8::MAX as i64))),
            ("n", Value::Int(rng.random_range(i16::MIN as i64..=i16::MAX as i64))),
            ("q", Value::Int(rng.random_range(0..=u16::MAX as i64))),
            ("i", Value::Int(rng.random_range(i32::MIN as i64..=i32::MAX as i64))),
            ("u", Value::Int(rng.random_range(0..=u32::MAX as i64))),
            ("x", Value::Int(rng.random())),
            ("t", Value::from(rng.random::<u64>())),
            ("d", Value::Double(rng.random_range(-1e9..1e9))),
        ];

        for (signature, value) in cases {
            let variant = pack(signature, value.clone());
            assert_eq!(variant.unpack().unwrap(), value);

            let data = variant.to_bytes(Endian::Big);
            let read = Variant::from_bytes(variant.type_(), &data, Endian::Big).unwrap();
            assert_eq!(read, variant);
        }
    }
}

#[test]
fn containers() {
    let ints = array([Value::from(1), Value::from(2), Value::from(3)]);
    assert_eq!(pack("ai", ints.clone()).deep_unpack().unwrap(), ints);

    let tuple = pack("(si)", array([Value::from("x"), Value::from(5)]));
    assert_eq!(
        tuple.deep_unpack().unwrap(),
        array([Value::from("x"), Value::from(5)])
    );

    let nothing = pack("ms", Value::Null);
    assert_eq!(nothing.classify(), TypeClass::Maybe);
    assert_eq!(nothing.deep_unpack().unwrap(), Value::Null);
    assert_eq!(
        pack("ms", Value::from("x")).deep_unpack().unwrap(),
        Value::from("x")
    );

    let strv = pack("as", array([Value::from("a"), Value::from("b")]));
    assert_eq!(strv.type_(), &VariantType::STRING_ARRAY);
    assert_eq!(strv.n_children(), 2);
    assert_eq!(
        strv.deep_unpack().unwrap(),
        array([Value::from("a"), Value::from("b")])
    );
}

#[test]
fn dictionary_round_trip() {
    let map = BTreeMap::from([("foo".to_string(), Value::Variant(pack("s", Value::from("bar"))))]);
    let dict = pack("a{sv}", Value::Map(map));

    let Value::Map(unpacked) = dict.deep_unpack().unwrap() else {
        panic!("Expected a map");
    };
    let Some(Value::Variant(foo)) = unpacked.get("foo") else {
        panic!("Expected a variant for 'foo'");
    };
    assert_eq!(foo.deep_unpack().unwrap(), Value::from("bar"));
}

#[test]
fn byte_arrays() {
    let bytes = pack("ay", array([Value::from(1), Value::from(2), Value::from(3)]));
    assert_eq!(bytes.classify(), TypeClass::Array);
    assert_eq!(ArrayKind::of(bytes.type_()), Some(ArrayKind::ByteArray));
    assert_eq!(bytes.unpack().unwrap(), Value::bytes(vec![1, 2, 3]));
    assert_eq!(bytes.deep_unpack().unwrap(), Value::bytes(vec![1, 2, 3]));

    // Strings are stored NUL terminated, buffers as they are
    assert_eq!(
        pack("ay", Value::from("foo")).unpack().unwrap(),
        Value::bytes(b"foo\0".to_vec())
    );
    assert_eq!(
        pack("ay", Value::bytes(b"foo".to_vec())).unpack().unwrap(),
        Value::bytes(b"foo".to_vec())
    );
}

#[test]
fn shallow_then_deep() {
    let marshaller = Marshaller::new();
    let variants = [
        pack(
            "a(sv)",
            array([
                array([Value::from("a"), Value::Variant(Variant::new_int32(1))]),
                array([Value::from("b"), Value::Variant(Variant::new_boolean(true))]),
            ]),
        ),
        pack(
            "(sa{sv}mu)",
            array([
                Value::from("x"),
                Value::Map(BTreeMap::from([(
                    "k".to_string(),
                    Value::Variant(Variant::new_double(0.5)),
                )])),
                Value::from(5),
            ]),
        ),
        pack(
            "a{s(ii)}",
            Value::Map(BTreeMap::from([
                ("one".to_string(), array([Value::from(1), Value::from(2)])),
                ("two".to_string(), array([Value::from(3), Value::from(4)])),
            ])),
        ),
    ];

    for variant in variants {
        let deep = marshaller.deep_unpack(&variant).unwrap();
        let composed = match marshaller.unpack(&variant).unwrap() {
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|item| marshaller.deep_unpack(item.as_variant().unwrap()).unwrap())
                    .collect(),
            ),
            Value::Map(map) => Value::Map(
                map.iter()
                    .map(|(key, item)| {
                        let item = marshaller.deep_unpack(item.as_variant().unwrap()).unwrap();
                        (key.clone(), item)
                    })
                    .collect(),
            ),
            other => panic!("Unexpected shallow result {}", other),
        };

        assert_eq!(composed, deep, "variant {}", variant);
    }
}

#[test]
fn malformed_signatures() {
    assert_matches!(
        Variant::from_signature("(si", &array([Value::from(1), Value::from(2)])),
        Err(Error::UnterminatedTuple)
    );
    assert_matches!(
        Variant::from_signature("ii", &array([Value::from(1), Value::from(2)])),
        Err(Error::TrailingSignatureData { .. })
    );
    assert_matches!(
        Variant::from_signature("(ii)", &array([Value::from(1)])),
        Err(Error::TypeMismatch { .. })
    );
    assert_matches!(
        Variant::from_signature("", &Value::from(1)),
        Err(Error::EmptySignature)
    );
    assert_matches!(
        Variant::from_signature("a{(i)s}", &Value::Map(BTreeMap::new())),
        Err(Error::SimpleTypeExpected { character: '(', .. })
    );
    assert_matches!(
        Variant::from_signature("a{sv", &Value::Map(BTreeMap::new())),
        Err(Error::MissingDictClose { found: None })
    );
    assert_matches!(
        Variant::from_signature("k", &Value::Null),
        Err(Error::UnexpectedCharacter {
            character: 'k',
            position: 0
        })
    );

    let deep = format!("{}i", "a".repeat(100));
    let err = Variant::from_signature(&deep, &Value::Array(vec![])).unwrap_err();
    assert!(err.is_signature_error());
    assert_matches!(err, Error::MaxNestingExceeded { limit: 64 });
}

#[test]
fn recursive_variants() {
    let boxed = pack("v", Value::Variant(pack("i", Value::from(5))));

    let Value::Variant(inner) = boxed.unpack().unwrap() else {
        panic!("Expected an opaque variant");
    };
    assert_eq!(inner.type_(), &VariantType::INT32);

    let wrapped = pack("av", array([Value::Variant(pack("i", Value::from(5)))]));
    assert_eq!(
        wrapped.recursive_unpack().unwrap(),
        array([Value::from(5)])
    );
    assert_eq!(
        wrapped.deep_unpack().unwrap(),
        array([Value::Variant(Variant::new_int32(5))])
    );
}

#[test]
fn json_values() {
    let value: Value = serde_json::from_str(
        r#"{"name": "gvpack", "version": [0, 1], "tags": {"a": "x"}, "extra": null}"#,
    )
    .unwrap();

    let variant = Variant::from_signature("(sa{sv})", &array([
        Value::from("name"),
        Value::Map(BTreeMap::from([
            ("count".to_string(), Value::Variant(pack("t", Value::from(7u64)))),
        ])),
    ]))
    .unwrap();
    assert_eq!(
        serde_json::to_string(&variant.recursive_unpack().unwrap()).unwrap(),
        r#"["name",{"count":7}]"#
    );

    let Value::Map(map) = &value else {
        panic!("Expected a map");
    };
    let packed = pack("au", map["version"].clone());
    assert_eq!(packed.to_string(), "[0, 1]");
    let tags = pack("a{ss}", map["tags"].clone());
    assert_eq!(tags.to_string(), "{'a': 'x'}");
    assert_eq!(pack("mi", map["extra"].clone()).to_string(), "nothing");
}

#[test]
fn zvariant_compatibility() {
    let value = pack(
        "(sa{sv}au)",
        array([
            Value::from("x"),
            Value::Map(BTreeMap::from([(
                "k".to_string(),
                Value::Variant(pack("i", Value::from(-3))),
            )])),
            array([Value::from(1), Value::from(2)]),
        ]),
    );

    let (name, dict, numbers): (String, HashMap<String, zvariant::OwnedValue>, Vec<u32>) =
        value.deserialize().unwrap();
    assert_eq!(name, "x");
    assert_eq!(*dict["k"], zvariant::Value::I32(-3));
    assert_eq!(numbers, vec![1, 2]);

    let context = zvariant::serialized::Context::new_gvariant(zvariant::Endian::Little, 0);
    let data = zvariant::to_bytes(context, &("x", vec![1u32, 2])).unwrap();
    let read = Variant::from_bytes(&VariantType::new("(sau)").unwrap(), &data, Endian::Little)
        .unwrap();
    assert_eq!(read.to_string(), "('x', [1, 2])");
}

#[test]
fn vardict_lookup() {
    let mut dict = VariantDict::new();
    dict.insert("foo", "s", &Value::from("bar")).unwrap();
    dict.insert("nested", "a{sv}", &Value::Map(BTreeMap::new())).unwrap();

    let variant = dict.end().unwrap();
    let dict = VariantDict::from_variant(&variant).unwrap();

    assert_eq!(
        dict.lookup("foo", Some("s"), false).unwrap(),
        Some(Value::from("bar"))
    );
    assert_eq!(dict.lookup("foo", Some("as"), false).unwrap(), None);
    assert_eq!(
        dict.lookup("nested", None, true).unwrap(),
        Some(Value::Map(BTreeMap::new()))
    );
}
