#![no_main]

use gvpack::{Endian, Marshaller, Variant, VariantType};
use libfuzzer_sys::{fuzz_target, Corpus};

// The data is read as the body of a variant, which carries its own type string
fuzz_target!(|data: &[u8]| -> Corpus {
    let Ok(variant) = Variant::from_bytes(&VariantType::VARIANT, data, Endian::Little) else {
        return Corpus::Reject;
    };

    variant.to_string();
    let _ = Marshaller::new().recursive_unpack(&variant);

    let serialized = variant.data();
    if let Ok(read) = Variant::from_bytes(variant.type_(), &serialized, Endian::Little) {
        assert_eq!(read.data(), serialized);
    }

    Corpus::Keep
});
