//! # Storage Module
//!
//! Persistence for index pages. Two backends hold the same byte blocks (a
//! padded metadata block and one padded compressed page per slot):
//!
//! - [`store::PageStore`]: the transactional store every index is opened
//!   through. Page `i` lives under key `page_<i>`, metadata under `metadata`.
//! - [`legacy::LegacyIndexFile`]: the older flat file, read only to migrate
//!   it into a page store.
//!
//! ```text
//! PageStore directory                 Legacy flat file
//! ┌──────────────────────┐            ┌──────────────────────┐
//! │ "metadata" -> block  │            │ metadata (16384 B)   │
//! │ "page_0"   -> page   │  migrate   │ page 0               │
//! │ "page_1"   -> page   │ <───────── │ page 1               │
//! │ ...                  │            │ ...                  │
//! └──────────────────────┘            └──────────────────────┘
//! ```
//!
//! [`PageStorage`] is the read-side seam shared by both, used by migration
//! and by tools that only need raw pages.

pub mod legacy;
pub mod log;
pub mod snapshot;
pub mod store;

use eyre::Result;

use crate::codec::IndexMetadata;
use crate::config::PAGE_KEY_PREFIX;

pub use legacy::{is_legacy_file, LegacyIndexFile, LegacyIndexWriter};
pub use snapshot::TxnId;
pub use store::{CompactionStats, PageStore, ReadTxn, StoreOptions, StoreStats, WriteTxn};

/// Read access to the raw pages of an index.
pub trait PageStorage {
    fn metadata(&self) -> &IndexMetadata;

    /// Raw bytes of `page`, or `None` if the slot was never written.
    fn read_page(&self, page: u32) -> Result<Option<Vec<u8>>>;
}

/// Store key of page `page`.
pub fn page_key(page: u32) -> String {
    format!("{}{}", PAGE_KEY_PREFIX, page)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_keys() {
        assert_eq!(page_key(0), "page_0");
        assert_eq!(page_key(5_119_999), "page_5119999");
    }
}
