use super::{Repr, Variant};
use crate::endian::Endian;
use crate::error::{Error, Result};
use crate::signature::{SignatureReader, TypeClass, DEFAULT_MAX_DEPTH};
use crate::variant_type::{align_up, VariantType};

macro_rules! read_number {
    ($ty:ty, $data:expr, $endian:expr, $typ:expr) => {{
        let bytes: [u8; std::mem::size_of::<$ty>()] =
            $data.try_into().map_err(|_| wrong_size($typ, $data.len()))?;
        match $endian {
            Endian::Little => <$ty>::from_le_bytes(bytes),
            Endian::Big => <$ty>::from_be_bytes(bytes),
        }
    }};
}

fn wrong_size(typ: &VariantType, len: usize) -> Error {
    Error::Data(format!(
        "{} bytes are not a valid value of type '{}'",
        len, typ
    ))
}

/// The size of the framing offsets in a container of `len` bytes
fn offset_size(len: usize) -> usize {
    if len == 0 {
        0
    } else if len <= u8::MAX as usize {
        1
    } else if len <= u16::MAX as usize {
        2
    } else if len as u64 <= u32::MAX as u64 {
        4
    } else {
        8
    }
}

fn read_offset(data: &[u8], size: usize) -> Result<usize> {
    let mut bytes = [0u8; 8];
    bytes[..size].copy_from_slice(data.get(..size).ok_or_else(|| {
        Error::Data("Framing offset out of range".to_string())
    })?);
    usize::try_from(u64::from_le_bytes(bytes))
        .map_err(|_| Error::Data("Framing offset does not fit in memory".to_string()))
}

fn slice<'a>(data: &'a [u8], start: usize, end: usize) -> Result<&'a [u8]> {
    data.get(start..end).ok_or_else(|| {
        Error::Data(format!(
            "Child bounds {}..{} exceed container of {} bytes",
            start,
            end,
            data.len()
        ))
    })
}

fn read_str(typ: &VariantType, data: &[u8]) -> Result<String> {
    let Some((0, text)) = data.split_last() else {
        return Err(Error::Data(format!(
            "Value of type '{}' is not NUL terminated",
            typ
        )));
    };

    let string = std::str::from_utf8(text)
        .map_err(|err| Error::Data(format!("Invalid UTF-8 in string: {}", err)))?;
    if string.contains('\0') {
        return Err(Error::InvalidString(string.to_string()));
    }

    Ok(string.to_string())
}

struct Decoder {
    endian: Endian,
    max_depth: usize,
}

impl Decoder {
    fn decode(&self, typ: &VariantType, data: &[u8], depth: usize) -> Result<Variant> {
        if depth > self.max_depth {
            return Err(Error::MaxNestingExceeded {
                limit: self.max_depth,
            });
        }

        let endian = self.endian;
        let repr = match typ.class() {
            TypeClass::Boolean => match data {
                [0] => Repr::Boolean(false),
                [1] => Repr::Boolean(true),
                [other] => {
                    return Err(Error::Data(format!("Invalid boolean value {}", other)))
                }
                _ => return Err(wrong_size(typ, data.len())),
            },
            TypeClass::Byte => match data {
                [byte] => Repr::Byte(*byte),
                _ => return Err(wrong_size(typ, data.len())),
            },
            TypeClass::Int16 => Repr::Int16(read_number!(i16, data, endian, typ)),
            TypeClass::UInt16 => Repr::UInt16(read_number!(u16, data, endian, typ)),
            TypeClass::Int32 => Repr::Int32(read_number!(i32, data, endian, typ)),
            TypeClass::UInt32 => Repr::UInt32(read_number!(u32, data, endian, typ)),
            TypeClass::Int64 => Repr::Int64(read_number!(i64, data, endian, typ)),
            TypeClass::UInt64 => Repr::UInt64(read_number!(u64, data, endian, typ)),
            TypeClass::Handle => Repr::Handle(read_number!(i32, data, endian, typ)),
            TypeClass::Double => Repr::Double(read_number!(f64, data, endian, typ)),
            TypeClass::String => return Variant::new_string(read_str(typ, data)?),
            TypeClass::ObjectPath => return Variant::new_object_path(read_str(typ, data)?),
            TypeClass::Signature => return Variant::new_signature(read_str(typ, data)?),
            TypeClass::Variant => Repr::Variant(Box::new(self.decode_variant(data, depth)?)),
            TypeClass::Maybe => Repr::Maybe(self.decode_maybe(typ, data, depth)?.map(Box::new)),
            TypeClass::Array => {
                let element = element_of(typ)?;
                if element.class() == TypeClass::Byte {
                    Repr::Bytes(data.to_vec())
                } else {
                    Repr::Container(self.decode_array(&element, data, depth)?)
                }
            }
            TypeClass::Tuple | TypeClass::DictEntry => {
                Repr::Container(self.decode_tuple(typ, data, depth)?)
            }
        };

        Ok(Variant::from_parts(typ.clone(), repr))
    }

    fn decode_variant(&self, data: &[u8], depth: usize) -> Result<Variant> {
        let separator = data
            .iter()
            .rposition(|b| *b == 0)
            .ok_or_else(|| Error::Data("Variant has no type string".to_string()))?;

        let type_string = std::str::from_utf8(&data[separator + 1..])
            .map_err(|err| Error::Data(format!("Invalid variant type string: {}", err)))?;
        let mut reader = SignatureReader::with_max_depth(type_string, self.max_depth);
        let child_type = reader.read_single_type_at(false, depth + 1)?;
        if !reader.is_empty() {
            return Err(Error::TrailingSignatureData {
                remaining: reader.remaining().to_string(),
            });
        }

        self.decode(&child_type, &data[..separator], depth + 1)
    }

    fn decode_maybe(
        &self,
        typ: &VariantType,
        data: &[u8],
        depth: usize,
    ) -> Result<Option<Variant>> {
        let element = element_of(typ)?;
        if data.is_empty() {
            return Ok(None);
        }

        let child_data = if element.is_fixed_size() {
            data
        } else {
            match data.split_last() {
                Some((0, child_data)) => child_data,
                _ => {
                    return Err(Error::Data(
                        "Maybe value is missing its trailing NUL byte".to_string(),
                    ))
                }
            }
        };

        self.decode(&element, child_data, depth + 1).map(Some)
    }

    fn decode_array(
        &self,
        element: &VariantType,
        data: &[u8],
        depth: usize,
    ) -> Result<Vec<Variant>> {
        let info = element.type_info();

        if let Some(size) = info.fixed_size {
            if data.len() % size != 0 {
                return Err(Error::Data(format!(
                    "Array of {} bytes is not a multiple of the element size {}",
                    data.len(),
                    size
                )));
            }

            return data
                .chunks_exact(size)
                .map(|chunk| self.decode(element, chunk, depth + 1))
                .collect();
        }

        if data.is_empty() {
            return Ok(Vec::new());
        }

        let osize = offset_size(data.len());
        let last_end = read_offset(&data[data.len() - osize..], osize)?;
        let table = slice(data, last_end, data.len())?;
        if table.len() % osize != 0 {
            return Err(Error::Data(format!(
                "Offset table of {} bytes is not a multiple of the offset size {}",
                table.len(),
                osize
            )));
        }

        let mut children = Vec::with_capacity(table.len() / osize);
        let mut start = 0;
        for offset in table.chunks_exact(osize) {
            let end = read_offset(offset, osize)?;
            start = align_up(start, info.alignment);
            if start > end || end > last_end {
                return Err(Error::Data(format!(
                    "Array element bounds {}..{} are out of order",
                    start, end
                )));
            }

            children.push(self.decode(element, &data[start..end], depth + 1)?);
            start = end;
        }

        Ok(children)
    }

    fn decode_tuple(&self, typ: &VariantType, data: &[u8], depth: usize) -> Result<Vec<Variant>> {
        let info = typ.type_info();
        if let Some(size) = info.fixed_size {
            if data.len() != size {
                return Err(wrong_size(typ, data.len()));
            }
        }

        let items = typ.items();
        let osize = offset_size(data.len());
        let mut offsets_read = 0;
        let mut position = 0;
        let mut children = Vec::with_capacity(items.len());

        for (index, item) in items.iter().enumerate() {
            let item_info = item.type_info();
            position = align_up(position, item_info.alignment);

            let end = if let Some(size) = item_info.fixed_size {
                position + size
            } else if index + 1 == items.len() {
                data.len()
                    .checked_sub(osize * offsets_read)
                    .ok_or_else(|| Error::Data("Tuple offset table too large".to_string()))?
            } else {
                offsets_read += 1;
                let table_position = data
                    .len()
                    .checked_sub(osize * offsets_read)
                    .ok_or_else(|| Error::Data("Tuple offset table too large".to_string()))?;
                read_offset(&data[table_position..], osize)?
            };

            children.push(self.decode(item, slice(data, position, end)?, depth + 1)?);
            position = end;
        }

        Ok(children)
    }
}

fn element_of(typ: &VariantType) -> Result<VariantType> {
    typ.element()
        .ok_or_else(|| Error::Assertion(format!("Type '{}' has no element type", typ)))
}

impl Variant {
    /// Read a value of type `typ` from serialized GVariant data in byte order `endian`
    pub fn from_bytes(typ: &VariantType, data: &[u8], endian: Endian) -> Result<Variant> {
        Self::from_bytes_with_max_depth(typ, data, endian, DEFAULT_MAX_DEPTH)
    }

    /// Like [`from_bytes`](Self::from_bytes), but with a custom limit for container nesting.
    ///
    /// The limit also applies to nesting across variant boundaries.
    pub fn from_bytes_with_max_depth(
        typ: &VariantType,
        data: &[u8],
        endian: Endian,
        max_depth: usize,
    ) -> Result<Variant> {
        Decoder { endian, max_depth }.decode(typ, data, 0)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use matches::assert_matches;
    use pretty_assertions::assert_eq;

    fn ty(s: &str) -> VariantType {
        VariantType::new(s).unwrap()
    }

    fn string(s: &str) -> Variant {
        Variant::new_string(s).unwrap()
    }

    fn sample() -> Variant {
        let entry = Variant::new_dict_entry(
            Variant::new_uint32(1),
            Variant::new_tuple([
                string("x"),
                Variant::new_int64(-7),
                Variant::new_bytes(b"abc".to_vec()),
            ]),
        )
        .unwrap();

        let entry_type = entry.type_().clone();
        Variant::new_tuple([
            Variant::new_array(&entry_type, [entry.clone(), entry]).unwrap(),
            Variant::new_just(Variant::new_strv(&["a", "bc", ""]).unwrap()),
            Variant::new_nothing(&ty("(id)")),
            Variant::new_variant(Variant::new_object_path("/a/b").unwrap()),
            Variant::new_signature("a{sv}").unwrap(),
            Variant::new_boolean(true),
            Variant::new_handle(2),
            Variant::new_double(-0.25),
            Variant::new_tuple([]),
        ])
    }

    #[test]
    fn read_back() {
        let value = sample();
        for endian in [Endian::Little, Endian::Big] {
            let data = value.to_bytes(endian);
            assert_eq!(Variant::from_bytes(value.type_(), &data, endian).unwrap(), value);
        }
    }

    #[test]
    fn byteswap() {
        let value = Variant::new_tuple([Variant::new_uint32(1), string("s")]);
        let swapped = value.byteswap().unwrap();
        assert_eq!(swapped.child_value(0).get::<u32>(), Some(0x0100_0000));
        assert_eq!(swapped.child_value(1), string("s"));
        assert_eq!(swapped.byteswap().unwrap(), value);
    }

    #[test]
    fn large_offsets() {
        let long = "x".repeat(300);
        let value = Variant::new_strv(&[long.as_str(), "y"]).unwrap();
        let data = value.data();
        // 303 bytes of content need two byte offsets
        assert_eq!(data.len(), 303 + 4);
        assert_eq!(Variant::from_bytes(value.type_(), &data, Endian::Little).unwrap(), value);
    }

    #[test]
    fn malformed() {
        assert_matches!(
            Variant::from_bytes(&VariantType::BOOLEAN, &[2], Endian::Little),
            Err(Error::Data(_))
        );
        assert_matches!(
            Variant::from_bytes(&VariantType::UINT32, &[1, 2], Endian::Little),
            Err(Error::Data(_))
        );
        assert_matches!(
            Variant::from_bytes(&VariantType::STRING, b"abc", Endian::Little),
            Err(Error::Data(_))
        );
        assert_matches!(
            Variant::from_bytes(&VariantType::STRING, b"a\0c\0", Endian::Little),
            Err(Error::InvalidString(_))
        );
        assert_matches!(
            Variant::from_bytes(&VariantType::OBJECT_PATH, b"a\0", Endian::Little),
            Err(Error::InvalidObjectPath(_))
        );
        assert_matches!(
            Variant::from_bytes(&VariantType::VARIANT, b"\x01\0z", Endian::Little),
            Err(Error::UnexpectedCharacter { .. })
        );
        assert_matches!(
            Variant::from_bytes(&VariantType::VARIANT, b"\x01", Endian::Little),
            Err(Error::Data(_))
        );
        assert_matches!(
            Variant::from_bytes(&VariantType::STRING_ARRAY, b"ab\0\x09", Endian::Little),
            Err(Error::Data(_))
        );
        assert_matches!(
            Variant::from_bytes(&ty("au"), &[1, 2, 3], Endian::Little),
            Err(Error::Data(_))
        );
        assert_matches!(
            Variant::from_bytes(&ty("(yu)"), &[1, 2, 3], Endian::Little),
            Err(Error::Data(_))
        );
    }

    #[test]
    fn nesting() {
        let mut value = Variant::new_int32(1);
        for _ in 0..10 {
            value = Variant::new_variant(value);
        }

        let data = value.data();
        assert!(Variant::from_bytes(value.type_(), &data, Endian::Little).is_ok());
        assert_matches!(
            Variant::from_bytes_with_max_depth(value.type_(), &data, Endian::Little, 5),
            Err(Error::MaxNestingExceeded { limit: 5 })
        );
    }
}
