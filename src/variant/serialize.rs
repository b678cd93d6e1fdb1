use super::{Repr, Variant};
use crate::endian::Endian;
use crate::signature::TypeClass;
use crate::variant_type::TypeInfo;

macro_rules! write_number {
    ($buf:expr, $value:expr, $endian:expr) => {
        match $endian {
            Endian::Little => $buf.extend_from_slice(&$value.to_le_bytes()),
            Endian::Big => $buf.extend_from_slice(&$value.to_be_bytes()),
        }
    };
}

/// The size of a framing offset for a container with `body_size` bytes of content
/// and `n_offsets` framing offsets
fn offset_size(body_size: usize, n_offsets: usize) -> usize {
    if n_offsets == 0 {
        0
    } else if body_size + n_offsets <= u8::MAX as usize {
        1
    } else if body_size + 2 * n_offsets <= u16::MAX as usize {
        2
    } else if (body_size + 4 * n_offsets) as u64 <= u32::MAX as u64 {
        4
    } else {
        8
    }
}

fn pad(buf: &mut Vec<u8>, start: usize, alignment: usize) {
    while (buf.len() - start) % alignment != 0 {
        buf.push(0);
    }
}

/// Framing offsets are always little endian
fn write_offsets(buf: &mut Vec<u8>, start: usize, offsets: &[usize]) {
    let size = offset_size(buf.len() - start, offsets.len());
    for offset in offsets {
        buf.extend_from_slice(&(*offset as u64).to_le_bytes()[..size]);
    }
}

impl Variant {
    /// The serialized GVariant data in little endian byte order
    pub fn data(&self) -> Vec<u8> {
        self.to_bytes(Endian::Little)
    }

    /// Serialize this value to GVariant normal form with the specified byte order
    pub fn to_bytes(&self, endian: Endian) -> Vec<u8> {
        let mut buf = Vec::new();
        self.serialize_into(&mut buf, endian);
        buf
    }

    /// Return a copy of this value with the byte order of every number reversed.
    ///
    /// This is the value that results when serialized data is read back with the wrong
    /// byte order. Fails when the swapped data is not a valid value, e.g. for booleans.
    pub fn byteswap(&self) -> crate::Result<Variant> {
        Variant::from_bytes(&self.typ, &self.to_bytes(Endian::Little), Endian::Big)
    }

    fn serialize_into(&self, buf: &mut Vec<u8>, endian: Endian) {
        match &self.repr {
            Repr::Boolean(value) => buf.push(u8::from(*value)),
            Repr::Byte(value) => buf.push(*value),
            Repr::Int16(value) => write_number!(buf, value, endian),
            Repr::UInt16(value) => write_number!(buf, value, endian),
            Repr::Int32(value) => write_number!(buf, value, endian),
            Repr::UInt32(value) => write_number!(buf, value, endian),
            Repr::Int64(value) => write_number!(buf, value, endian),
            Repr::UInt64(value) => write_number!(buf, value, endian),
            Repr::Handle(value) => write_number!(buf, value, endian),
            Repr::Double(value) => write_number!(buf, value, endian),
            Repr::String(value) => {
                buf.extend_from_slice(value.as_bytes());
                buf.push(0);
            }
            Repr::Variant(child) => {
                child.serialize_into(buf, endian);
                buf.push(0);
                buf.extend_from_slice(child.typ.as_str().as_bytes());
            }
            Repr::Maybe(None) => {}
            Repr::Maybe(Some(child)) => {
                child.serialize_into(buf, endian);
                if !child.typ.is_fixed_size() {
                    buf.push(0);
                }
            }
            Repr::Bytes(bytes) => buf.extend_from_slice(bytes),
            Repr::Container(children) => match self.classify() {
                TypeClass::Array => self.serialize_array(children, buf, endian),
                _ => self.serialize_tuple(children, buf, endian),
            },
        }
    }

    fn serialize_array(&self, children: &[Variant], buf: &mut Vec<u8>, endian: Endian) {
        let start = buf.len();
        let element_info = self
            .typ
            .element()
            .map_or(TypeInfo::variable(1), |element| element.type_info());

        if element_info.fixed_size.is_some() {
            for child in children {
                child.serialize_into(buf, endian);
            }
            return;
        }

        let mut offsets = Vec::with_capacity(children.len());
        for child in children {
            pad(buf, start, element_info.alignment);
            child.serialize_into(buf, endian);
            offsets.push(buf.len() - start);
        }

        write_offsets(buf, start, &offsets);
    }

    fn serialize_tuple(&self, children: &[Variant], buf: &mut Vec<u8>, endian: Endian) {
        let start = buf.len();
        let info = self.typ.type_info();
        let mut offsets = Vec::new();

        for (index, child) in children.iter().enumerate() {
            let child_info = child.typ.type_info();
            pad(buf, start, child_info.alignment);
            child.serialize_into(buf, endian);

            if child_info.fixed_size.is_none() && index + 1 != children.len() {
                offsets.push(buf.len() - start);
            }
        }

        match info.fixed_size {
            Some(size) => {
                while buf.len() - start < size {
                    buf.push(0);
                }
            }
            None => {
                offsets.reverse();
                write_offsets(buf, start, &offsets);
            }
        }
    }
}
