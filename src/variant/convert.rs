use super::{Repr, Variant};
use std::borrow::Cow;

/// Types that can be converted into a [`Variant`] without failing
pub trait ToVariant {
    /// Create a `Variant` holding a copy of `self`
    fn to_variant(&self) -> Variant;
}

/// Types that can be extracted from a [`Variant`] of the matching type
pub trait FromVariant: Sized {
    /// Extract a native value, returning `None` when the type does not match
    fn from_variant(variant: &Variant) -> Option<Self>;
}

macro_rules! scalar_impls {
    ($($ty:ty => $constructor:ident, $repr:ident;)*) => {
        $(
            impl ToVariant for $ty {
                fn to_variant(&self) -> Variant {
                    Variant::$constructor(*self)
                }
            }

            impl FromVariant for $ty {
                fn from_variant(variant: &Variant) -> Option<Self> {
                    match variant.repr {
                        Repr::$repr(value) => Some(value),
                        _ => None,
                    }
                }
            }
        )*
    };
}

scalar_impls! {
    bool => new_boolean, Boolean;
    u8 => new_byte, Byte;
    i16 => new_int16, Int16;
    u16 => new_uint16, UInt16;
    i32 => new_int32, Int32;
    u32 => new_uint32, UInt32;
    i64 => new_int64, Int64;
    u64 => new_uint64, UInt64;
    f64 => new_double, Double;
}

impl ToVariant for [u8] {
    fn to_variant(&self) -> Variant {
        Variant::new_bytes(self)
    }
}

impl ToVariant for Vec<u8> {
    fn to_variant(&self) -> Variant {
        Variant::new_bytes(self.as_slice())
    }
}

impl ToVariant for Cow<'_, [u8]> {
    fn to_variant(&self) -> Variant {
        Variant::new_bytes(self.as_ref())
    }
}

impl ToVariant for Variant {
    fn to_variant(&self) -> Variant {
        Variant::new_variant(self.clone())
    }
}

impl FromVariant for String {
    fn from_variant(variant: &Variant) -> Option<Self> {
        variant.str().map(ToString::to_string)
    }
}

impl FromVariant for Vec<u8> {
    fn from_variant(variant: &Variant) -> Option<Self> {
        variant.bytes().map(<[u8]>::to_vec)
    }
}

impl FromVariant for Vec<String> {
    fn from_variant(variant: &Variant) -> Option<Self> {
        variant
            .strv()
            .map(|strings| strings.into_iter().map(ToString::to_string).collect())
    }
}

impl FromVariant for Variant {
    fn from_variant(variant: &Variant) -> Option<Self> {
        variant.as_variant().cloned()
    }
}

impl TryFrom<&str> for Variant {
    type Error = crate::Error;

    fn try_from(value: &str) -> crate::Result<Self> {
        Variant::new_string(value)
    }
}

impl TryFrom<String> for Variant {
    type Error = crate::Error;

    fn try_from(value: String) -> crate::Result<Self> {
        Variant::new_string(value)
    }
}
