#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
/// The byte order used when serializing a [`Variant`](crate::Variant)
pub enum Endian {
    /// Values encoded in little endian representation
    #[default]
    Little,
    /// Values encoded in big endian representation
    Big,
}

impl Endian {
    /// The native endianness of the target platform
    pub fn native() -> Self {
        if cfg!(target_endian = "little") {
            Self::Little
        } else {
            Self::Big
        }
    }

    /// The opposite byte order
    pub fn swapped(self) -> Self {
        match self {
            Self::Little => Self::Big,
            Self::Big => Self::Little,
        }
    }
}

impl From<Endian> for zvariant::Endian {
    fn from(value: Endian) -> Self {
        match value {
            Endian::Little => zvariant::Endian::Little,
            Endian::Big => zvariant::Endian::Big,
        }
    }
}
