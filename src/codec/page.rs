//! # Page Codec
//!
//! A page is a zstd frame holding a JSON array of item tuples, zero-padded to
//! the index page size:
//!
//! ```text
//! +-----------------------------------------+----------------------+
//! | zstd frame: [["title","url","extract"], | 0x00 0x00 ... 0x00   |
//! |              ["title","url","extract"]] |                      |
//! +-----------------------------------------+----------------------+
//! |<---------------------- page_size bytes ----------------------->|
//! ```
//!
//! Decoding reads exactly one zstd frame and stops, so the zero padding is
//! never interpreted. A page that cannot be decoded is reported as
//! [`EmptyPage`] rather than as an error: never-written slots and damaged
//! pages both read as "no documents".

use std::fmt;
use std::io::Read;

use eyre::{Result, WrapErr};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::COMPRESSION_LEVEL;
use crate::error::IndexError;

/// Why a page read produced no items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyPage {
    /// The slot holds only zero bytes (never written).
    Blank,
    /// The slot holds bytes that are not a valid page.
    Corrupt,
}

impl fmt::Display for EmptyPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmptyPage::Blank => write!(f, "page was never written"),
            EmptyPage::Corrupt => write!(f, "page could not be decoded"),
        }
    }
}

/// JSON-serializes and compresses `items` without padding.
pub fn compress_items<S: Serialize>(items: &[S]) -> Result<Vec<u8>> {
    let json = serde_json::to_vec(items).wrap_err("failed to serialize page items")?;
    zstd::bulk::compress(&json, COMPRESSION_LEVEL).wrap_err("failed to compress page")
}

/// Zero-extends `data` to exactly `page_size` bytes.
pub fn pad_to_page_size(mut data: Vec<u8>, page_size: usize) -> Result<Vec<u8>> {
    if data.len() > page_size {
        return Err(IndexError::PageTooLarge {
            size: data.len(),
            page_size,
        }
        .into());
    }
    data.resize(page_size, 0);
    Ok(data)
}

/// Encodes `items` into a full page.
pub fn encode_page<S: Serialize>(items: &[S], page_size: usize) -> Result<Vec<u8>> {
    pad_to_page_size(compress_items(items)?, page_size)
}

/// Decodes a padded page into its items.
pub fn decode_page<D: DeserializeOwned>(raw: &[u8]) -> std::result::Result<Vec<D>, EmptyPage> {
    if raw.iter().all(|&b| b == 0) {
        return Err(EmptyPage::Blank);
    }

    let mut json = Vec::new();
    zstd::stream::read::Decoder::with_buffer(raw)
        .map_err(|_| EmptyPage::Corrupt)?
        .single_frame()
        .read_to_end(&mut json)
        .map_err(|_| EmptyPage::Corrupt)?;

    serde_json::from_slice(&json).map_err(|_| EmptyPage::Corrupt)
}
