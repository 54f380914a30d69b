//! # Index Metadata Block
//!
//! Every index starts with a metadata block describing its dimensions and the
//! item type stored in its pages:
//!
//! ```text
//! +-------------------------+------------------------------+-------------+
//! | magic (17 bytes)        | JSON body                    | zero fill   |
//! | "mwmbl-tiny-search"     | {"version":1,"page_size":..} | to 16384 B  |
//! +-------------------------+------------------------------+-------------+
//! ```
//!
//! The JSON body names the item type `item_factory`. The same padded block
//! is the first 16384 bytes of a legacy flat file and the value of the
//! `metadata` key in the transactional store.

use eyre::{Result, WrapErr};
use serde::{Deserialize, Serialize};

use crate::codec::pad_to_page_size;
use crate::config::{METADATA_MAGIC, METADATA_SIZE, MIN_PAGE_SIZE, VERSION};
use crate::document::Item;
use crate::error::IndexError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexMetadata {
    pub version: u32,
    pub page_size: usize,
    pub num_pages: u32,
    #[serde(rename = "item_factory")]
    pub item_type_name: String,
}

impl IndexMetadata {
    pub fn new(page_size: usize, num_pages: u32, item_type_name: impl Into<String>) -> Self {
        Self {
            version: VERSION,
            page_size,
            num_pages,
            item_type_name: item_type_name.into(),
        }
    }

    pub fn for_item<T: Item>(page_size: usize, num_pages: u32) -> Self {
        Self::new(page_size, num_pages, T::TYPE_NAME)
    }

    /// Magic followed by the JSON body, without padding.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let body = serde_json::to_vec(self).wrap_err("failed to serialize index metadata")?;

        let mut bytes = Vec::with_capacity(METADATA_MAGIC.len() + body.len());
        bytes.extend_from_slice(METADATA_MAGIC);
        bytes.extend_from_slice(&body);
        Ok(bytes)
    }

    /// Metadata block zero-padded to `METADATA_SIZE`.
    pub fn to_padded_bytes(&self) -> Result<Vec<u8>> {
        pad_to_page_size(self.to_bytes()?, METADATA_SIZE)
    }

    /// Parses a metadata block, padded or not.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let end = data
            .iter()
            .rposition(|&b| b != 0)
            .map_or(0, |last| last + 1);
        let data = &data[..end];

        if !data.starts_with(METADATA_MAGIC) {
            return Err(IndexError::InvalidMetadata(
                "this doesn't seem to be an index (bad magic)".to_string(),
            )
            .into());
        }

        let metadata: Self = serde_json::from_slice(&data[METADATA_MAGIC.len()..])
            .map_err(|e| IndexError::InvalidMetadata(e.to_string()))?;
        metadata.validate()?;
        Ok(metadata)
    }

    /// Fails unless the dimensions describe a usable index.
    pub fn validate(&self) -> Result<()> {
        if self.num_pages == 0 {
            return Err(IndexError::InvalidMetadata("index has no pages".to_string()).into());
        }
        if self.page_size < MIN_PAGE_SIZE {
            return Err(IndexError::InvalidMetadata(format!(
                "page size {} is below the minimum of {} bytes",
                self.page_size, MIN_PAGE_SIZE
            ))
            .into());
        }
        Ok(())
    }

    /// Fails unless the index stores items of type `T`.
    pub fn check_item_type<T: Item>(&self) -> Result<()> {
        if self.item_type_name != T::TYPE_NAME {
            return Err(IndexError::ItemFactoryMismatch {
                expected: T::TYPE_NAME.to_string(),
                found: self.item_type_name.clone(),
            }
            .into());
        }
        Ok(())
    }

    pub fn check_dimensions(&self, num_pages: u32, page_size: usize) -> Result<()> {
        if self.num_pages != num_pages || self.page_size != page_size {
            return Err(IndexError::DimensionMismatch {
                expected_pages: num_pages,
                expected_page_size: page_size,
                found_pages: self.num_pages,
                found_page_size: self.page_size,
            }
            .into());
        }
        Ok(())
    }
}
