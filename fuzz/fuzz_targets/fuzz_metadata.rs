//! Fuzz testing for the index metadata block parser.

#![no_main]

use libfuzzer_sys::fuzz_target;

use tinyindex::codec::IndexMetadata;
use tinyindex::config::METADATA_MAGIC;

fuzz_target!(|data: &[u8]| {
    let _ = IndexMetadata::from_bytes(data);

    let mut block = METADATA_MAGIC.to_vec();
    block.extend_from_slice(data);
    if let Ok(metadata) = IndexMetadata::from_bytes(&block) {
        let _ = metadata.to_padded_bytes();
    }
});
