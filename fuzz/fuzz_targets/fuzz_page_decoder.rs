//! Fuzz testing for the page decoder.
//!
//! Feeds arbitrary bytes, optionally wrapped in a valid zstd frame, to the
//! page decoder and the document tuple parser. Neither may panic: a page that
//! does not decode reads as empty, and a malformed tuple is skipped.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use tinyindex::codec::{decode_page, encode_page};
use tinyindex::{Document, Item, Tuple};

#[derive(Debug, Arbitrary)]
struct PageInput {
    data: Vec<u8>,
    as_json: bool,
    page_size: u16,
}

fuzz_target!(|input: PageInput| {
    let _ = decode_page::<Tuple>(&input.data);

    if !input.as_json {
        return;
    }

    // Well-formed frame, arbitrary JSON inside.
    let Ok(value) = serde_json::from_slice::<serde_json::Value>(&input.data) else {
        return;
    };
    let Ok(page) = encode_page(&[value], input.page_size as usize) else {
        return;
    };
    if let Ok(items) = decode_page::<Tuple>(&page) {
        for tuple in items {
            let _ = Document::from_tuple(tuple);
        }
    }
});
