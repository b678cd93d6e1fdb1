#![no_main]

use libfuzzer_sys::{fuzz_target, Corpus};

fuzz_target!(|data: &[u8]| -> Corpus {
    let Ok(signature) = std::str::from_utf8(data) else {
        return Corpus::Reject;
    };

    match gvpack::split_signature(signature) {
        Ok(types) => {
            for typ in types {
                typ.to_string();
                typ.items();
                typ.element();
            }

            Corpus::Keep
        }
        Err(_) => Corpus::Reject,
    }
});
