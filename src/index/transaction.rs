//! # Scoped Index Transactions
//!
//! [`IndexReader`] and [`IndexWriter`] wrap a page store transaction with the
//! index's page semantics: page bounds checks, decoding, fitting and
//! trimming.
//!
//! ```text
//! index.read()?        -> IndexReader   consistent snapshot of all pages
//! index.write()?       -> IndexWriter   the single writer, aborts on drop
//! index.transaction(f) -> commit if f returns Ok, abort if it returns Err
//! ```
//!
//! A reader sees every page as of the moment it began, even while a writer
//! commits. A writer sees its own uncommitted page writes.

use eyre::{Result, WrapErr};

use crate::codec::{compress_items, fit, IndexMetadata};
use crate::config::METADATA_KEY;
use crate::document::{Document, Item, Tuple};
use crate::error::{index_error, IndexError};
use crate::index::{decode_items, filter_for_key, TinyIndex};
use crate::merge::{merge, Ranker};
use crate::storage::{page_key, PageStorage, ReadTxn, TxnId, WriteTxn};

pub struct IndexReader<'a, T: Item> {
    index: &'a TinyIndex<T>,
    txn: ReadTxn<'a>,
}

impl<'a, T: Item> IndexReader<'a, T> {
    pub(crate) fn new(index: &'a TinyIndex<T>, txn: ReadTxn<'a>) -> Self {
        Self { index, txn }
    }

    pub fn snapshot(&self) -> TxnId {
        self.txn.snapshot()
    }

    pub fn get_page(&self, page: u32) -> Result<Vec<T>> {
        let raw = self.read_page(page)?;
        Ok(decode_items(page, raw))
    }

    pub fn retrieve(&self, key: &str) -> Result<Vec<T>> {
        let page = self.index.get_key_page_index(key);
        Ok(filter_for_key(self.get_page(page)?, key))
    }
}

impl<T: Item> PageStorage for IndexReader<'_, T> {
    fn metadata(&self) -> &IndexMetadata {
        self.index.metadata()
    }

    fn read_page(&self, page: u32) -> Result<Option<Vec<u8>>> {
        self.index.check_page(page)?;
        self.txn
            .get(&page_key(page))
            .wrap_err_with(|| format!("failed to read page {}", page))
    }
}

pub struct IndexWriter<'a, T: Item> {
    index: &'a TinyIndex<T>,
    txn: WriteTxn<'a>,
}

impl<'a, T: Item> IndexWriter<'a, T> {
    pub(crate) fn new(index: &'a TinyIndex<T>, txn: WriteTxn<'a>) -> Self {
        Self { index, txn }
    }

    pub fn get_page(&self, page: u32) -> Result<Vec<T>> {
        self.index.check_page(page)?;
        let raw = self
            .txn
            .get(&page_key(page))
            .wrap_err_with(|| format!("failed to read page {}", page))?;
        Ok(decode_items(page, raw))
    }

    pub fn retrieve(&self, key: &str) -> Result<Vec<T>> {
        let page = self.index.get_key_page_index(key);
        Ok(filter_for_key(self.get_page(page)?, key))
    }

    /// Replaces the content of `page` with the longest prefix of `items`
    /// that fits. Returns how many items were kept.
    pub fn store_in_page(&mut self, page: u32, items: &[T]) -> Result<usize> {
        self.index.check_page(page)?;
        let page_size = self.index.page_size();

        let tuples: Vec<Tuple> = items.iter().map(Item::to_tuple).collect();
        let fitted = fit(&tuples, page_size)
            .wrap_err_with(|| format!("failed to fit items into page {}", page))?;

        if fitted.count == 0 && !tuples.is_empty() {
            let size = compress_items(&tuples[..1])?.len();
            return Err(IndexError::PageTooLarge { size, page_size }.into());
        }

        if fitted.count < items.len() {
            tracing::debug!(
                page,
                kept = fitted.count,
                dropped = items.len() - fitted.count,
                "page full, dropped lowest priority items"
            );
        }

        self.write_raw_page(page, &fitted.page)?;
        Ok(fitted.count)
    }

    /// Appends `items` after the current content of `page`.
    pub fn add_to_page(&mut self, page: u32, items: Vec<T>) -> Result<usize> {
        let mut current = self.get_page(page)?;
        current.extend(items);
        self.store_in_page(page, &current)
    }

    /// Adds `item` to the page of `key`. Returns false if the item alone is
    /// too large for a page.
    pub fn index(&mut self, key: &str, item: T) -> Result<bool> {
        let page = self.index.get_key_page_index(key);
        match self.add_to_page(page, vec![item]) {
            Ok(_) => Ok(true),
            Err(e) if matches!(index_error(&e), Some(IndexError::PageTooLarge { .. })) => {
                tracing::debug!(key, page, "item too large for a page, not indexed");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    pub(crate) fn write_raw_page(&mut self, page: u32, data: &[u8]) -> Result<()> {
        self.txn
            .put(&page_key(page), data)
            .wrap_err_with(|| format!("failed to write page {}", page))
    }

    pub(crate) fn write_metadata(&mut self, metadata: &IndexMetadata) -> Result<()> {
        self.txn
            .put(METADATA_KEY, &metadata.to_padded_bytes()?)
            .wrap_err("failed to write index metadata")
    }

    pub fn commit(self) -> Result<TxnId> {
        self.txn.commit()
    }

    pub fn abort(self) {
        self.txn.abort()
    }
}

impl IndexWriter<'_, Document> {
    /// Merges `new_documents` into `page` and stores the result.
    pub fn merge_into_page<R: Ranker + ?Sized>(
        &mut self,
        page: u32,
        new_documents: Vec<Document>,
        ranker: &R,
    ) -> Result<usize> {
        let existing = self.get_page(page)?;
        let merged = merge(new_documents, existing, ranker);
        self.store_in_page(page, &merged)
    }
}
