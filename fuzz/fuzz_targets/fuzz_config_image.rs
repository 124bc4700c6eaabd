//! Fuzz target: stored configuration image
//!
//! Treats the input as a raw NVS image. `decode_image` must never panic,
//! and anything it accepts must encode back to an image that decodes to
//! the same configuration.
//!
//! cargo fuzz run fuzz_config_image

#![no_main]

use libfuzzer_sys::fuzz_target;
use doorbell::adapters::nvs::{decode_image, encode_image};

fuzz_target!(|data: &[u8]| {
    let Ok(config) = decode_image(data) else {
        return;
    };
    if let Ok(image) = encode_image(&config) {
        assert_eq!(decode_image(&image).ok(), Some(config));
    }
});
