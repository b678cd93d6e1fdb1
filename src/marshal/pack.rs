use super::{ByteCodec, Marshaller};
use crate::error::{Error, Result};
use crate::signature::{SignatureReader, TypeClass};
use crate::value::Value;
use crate::variant::Variant;
use crate::variant_type::VariantType;

pub(super) fn pack<C: ByteCodec>(
    marshaller: &Marshaller<C>,
    signature: &mut SignatureReader<'_>,
    value: &Value,
    depth: usize,
) -> Result<Variant> {
    signature.check_depth(depth)?;

    let position = signature.position();
    let character = signature.pop().ok_or(Error::EmptySignature)?;
    let class = TypeClass::from_char(character).ok_or(Error::UnexpectedCharacter {
        character,
        position,
    })?;

    match class {
        TypeClass::Boolean => Ok(Variant::new_boolean(value.to_bool()?)),
        TypeClass::Byte => Ok(Variant::new_byte(value.to_integer(class)?)),
        TypeClass::Int16 => Ok(Variant::new_int16(value.to_integer(class)?)),
        TypeClass::UInt16 => Ok(Variant::new_uint16(value.to_integer(class)?)),
        TypeClass::Int32 => Ok(Variant::new_int32(value.to_integer(class)?)),
        TypeClass::UInt32 => Ok(Variant::new_uint32(value.to_integer(class)?)),
        TypeClass::Int64 => Ok(Variant::new_int64(value.to_integer(class)?)),
        TypeClass::UInt64 => Ok(Variant::new_uint64(value.to_integer(class)?)),
        TypeClass::Handle => Ok(Variant::new_handle(value.to_integer(class)?)),
        TypeClass::Double => Ok(Variant::new_double(value.to_double()?)),
        TypeClass::String => Variant::new_string(value.to_str()?),
        TypeClass::ObjectPath => Variant::new_object_path(value.to_str()?),
        TypeClass::Signature => Variant::new_signature(value.to_str()?),
        TypeClass::Variant => match value {
            Value::Variant(variant) => Ok(Variant::new_variant(variant.clone())),
            other => Err(other.mismatch("a variant")),
        },
        TypeClass::Maybe => {
            if value.is_null() {
                let child_type = signature.read_single_type_at(false, depth + 1)?;
                Ok(Variant::new_nothing(&child_type))
            } else {
                pack(marshaller, signature, value, depth + 1).map(Variant::new_just)
            }
        }
        TypeClass::Array => {
            let element_type = signature.read_single_type_at(false, depth + 1)?;
            pack_array(marshaller, &element_type, value, depth + 1)
        }
        TypeClass::Tuple => {
            let mut items = value.to_items("an array of tuple members")?.iter();
            let mut children = Vec::new();

            // Surplus items are ignored
            loop {
                match signature.peek() {
                    None => return Err(Error::UnterminatedTuple),
                    Some(')') => break,
                    Some(_) => {
                        let Some(item) = items.next() else {
                            let member = signature.clone().read_single_type_at(false, depth + 1)?;
                            return Err(Error::mismatch(
                                format!("a tuple member of type '{}'", member),
                                "end of array",
                            ));
                        };
                        children.push(pack(marshaller, signature, item, depth + 1)?);
                    }
                }
            }

            match signature.pop() {
                Some(')') => Ok(Variant::new_tuple(children)),
                found => Err(Error::MissingTupleClose { found }),
            }
        }
        TypeClass::DictEntry => {
            let items = value.to_items("a [key, value] pair")?;
            let [key, item] = items else {
                return Err(value.mismatch("a [key, value] pair"));
            };

            pack_dict_entry_members(marshaller, signature, key, item, depth)
        }
    }
}

/// Packs key and value of a dictionary entry whose `{` was already consumed
fn pack_dict_entry_members<C: ByteCodec>(
    marshaller: &Marshaller<C>,
    signature: &mut SignatureReader<'_>,
    key: &Value,
    value: &Value,
    depth: usize,
) -> Result<Variant> {
    match signature.peek().and_then(TypeClass::from_char) {
        Some(class) if class.is_basic() => {}
        _ => {
            return Err(Error::SimpleTypeExpected {
                character: signature.peek().unwrap_or('}'),
                position: signature.position(),
            })
        }
    }

    let key = pack(marshaller, signature, key, depth + 1)?;
    let value = pack(marshaller, signature, value, depth + 1)?;

    match signature.pop() {
        Some('}') => Variant::new_dict_entry(key, value),
        found => Err(Error::MissingDictClose { found }),
    }
}

fn pack_array<C: ByteCodec>(
    marshaller: &Marshaller<C>,
    element_type: &VariantType,
    value: &Value,
    depth: usize,
) -> Result<Variant> {
    // Every element is packed from a fresh reader over the element type
    let element_signature = || {
        SignatureReader::with_max_depth(element_type.as_str(), marshaller.max_depth())
    };

    match element_type.class() {
        TypeClass::Byte => {
            let bytes = match value {
                Value::Bytes(bytes) => bytes.clone(),
                Value::String(string) => marshaller.codec().bytes_from_str(string),
                Value::Array(items) => items
                    .iter()
                    .map(|item| item.to_integer::<u8>(TypeClass::Byte))
                    .collect::<Result<_>>()?,
                other => return Err(other.mismatch("a byte buffer, string or array")),
            };

            Ok(Variant::new_bytes(bytes))
        }
        TypeClass::String => {
            let strings = value
                .to_items("an array of strings")?
                .iter()
                .map(Value::to_str)
                .collect::<Result<Vec<_>>>()?;

            Variant::new_strv(&strings)
        }
        TypeClass::DictEntry => {
            let map = value
                .as_map()
                .ok_or_else(|| value.mismatch("an object for a dictionary"))?;
            let key_class = element_type
                .key()
                .map(|key| key.class())
                .ok_or_else(|| Error::Assertion(format!("'{}' has no key type", element_type)))?;

            let mut children = Vec::with_capacity(map.len());
            for (key, item) in map {
                let key = Value::parse_key(key, key_class)?;
                let mut signature = element_signature();
                signature.check_depth(depth)?;
                signature.pop();
                children.push(pack_dict_entry_members(
                    marshaller,
                    &mut signature,
                    &key,
                    item,
                    depth,
                )?);
            }

            Variant::new_array(element_type, children)
        }
        _ => {
            let children = value
                .to_items("an array")?
                .iter()
                .map(|item| pack(marshaller, &mut element_signature(), item, depth))
                .collect::<Result<Vec<_>>>()?;

            Variant::new_array(element_type, children)
        }
    }
}
