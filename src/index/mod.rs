//! # TinyIndex
//!
//! A fixed-size search index: `num_pages` pages of `page_size` bytes each,
//! addressed by hashing keys. Every page holds a compressed list of items,
//! and a key's results are the items on its page filed under that key.
//!
//! ```text
//!   "python" ──murmur3──> page 85 ──> [doc, doc, doc]  (filtered by term)
//!
//!   TinyIndex<T>
//!   ├── metadata      version, page_size, num_pages, item type
//!   └── PageStore     "metadata" + "page_0" .. "page_<n-1>"
//! ```
//!
//! ## Lifecycle
//!
//! ```text
//! create(path, n, size) ─┐
//!                        ├──> open handle ──> read()/write()/transaction() ──> drop
//! open(path, mode) ──────┘
//! ```
//!
//! `create` writes the metadata and `num_pages` empty pages in a single
//! transaction and returns a handle in write mode. `open` checks the stored
//! item type (and, through the builder, the expected dimensions). Opening a
//! legacy flat file migrates it once into the sibling store `<path>.tinykv`
//! and opens that; the legacy file is never modified.
//!
//! ## Reading and Writing
//!
//! The convenience methods on [`TinyIndex`] (`get_page`, `retrieve`,
//! `store_in_page`, ...) each run in their own transaction. For consistent
//! multi-page reads use [`TinyIndex::read`]; for multi-page updates use
//! [`TinyIndex::write`] or [`TinyIndex::transaction`].
//!
//! Pages that were never written or cannot be decoded read as empty. Writes
//! keep the longest prefix of the item list that fits in the page; the
//! dropped tail is logged and the kept count returned so callers can requeue
//! the rest.

mod builder;
pub mod bulk;
pub mod migrate;
mod transaction;

use std::ffi::OsString;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use eyre::Result;

use crate::codec::{decode_page, EmptyPage, IndexMetadata};
use crate::document::{Document, Item, Tuple};
use crate::error::IndexError;
use crate::hash::page_index;
use crate::merge::Ranker;
use crate::storage::{CompactionStats, PageStorage, PageStore, StoreStats, TxnId};

pub use builder::TinyIndexBuilder;
pub use transaction::{IndexReader, IndexWriter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Read,
    Write,
}

pub struct TinyIndex<T: Item> {
    path: PathBuf,
    store: PageStore,
    metadata: IndexMetadata,
    mode: Mode,
    _item: PhantomData<fn() -> T>,
}

impl<T: Item> TinyIndex<T> {
    pub fn builder() -> TinyIndexBuilder<T> {
        TinyIndexBuilder::new()
    }

    /// Creates a new index at `path` and opens it in write mode.
    pub fn create<P: AsRef<Path>>(path: P, num_pages: u32, page_size: usize) -> Result<Self> {
        Self::builder().path(path).create(num_pages, page_size)
    }

    pub fn open<P: AsRef<Path>>(path: P, mode: Mode) -> Result<Self> {
        Self::builder().path(path).mode(mode).open()
    }

    /// Path the index was opened with.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory of the backing page store.
    pub fn store_path(&self) -> &Path {
        self.store.path()
    }

    pub fn metadata(&self) -> &IndexMetadata {
        &self.metadata
    }

    pub fn store(&self) -> &PageStore {
        &self.store
    }

    pub fn num_pages(&self) -> u32 {
        self.metadata.num_pages
    }

    pub fn page_size(&self) -> usize {
        self.metadata.page_size
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn get_key_page_index(&self, key: &str) -> u32 {
        page_index(key, self.metadata.num_pages)
    }

    pub(crate) fn check_page(&self, page: u32) -> Result<()> {
        if page >= self.metadata.num_pages {
            return Err(IndexError::PageOutOfRange {
                page,
                num_pages: self.metadata.num_pages,
            }
            .into());
        }
        Ok(())
    }

    fn check_writable(&self) -> Result<()> {
        if self.mode != Mode::Write {
            return Err(IndexError::ReadOnlyViolation.into());
        }
        Ok(())
    }

    pub fn read(&self) -> Result<IndexReader<'_, T>> {
        Ok(IndexReader::new(self, self.store.begin_read()?))
    }

    /// Starts the single write transaction, blocking while another writer
    /// is active.
    pub fn write(&self) -> Result<IndexWriter<'_, T>> {
        self.check_writable()?;
        Ok(IndexWriter::new(self, self.store.begin_write()?))
    }

    /// Runs `f` in a write transaction, committing on `Ok` and aborting on
    /// `Err`.
    pub fn transaction<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut IndexWriter<'_, T>) -> Result<R>,
    {
        let mut writer = self.write()?;
        match f(&mut writer) {
            Ok(value) => {
                writer.commit()?;
                Ok(value)
            }
            Err(e) => {
                writer.abort();
                Err(e)
            }
        }
    }

    pub fn get_page(&self, page: u32) -> Result<Vec<T>> {
        self.read()?.get_page(page)
    }

    pub fn retrieve(&self, key: &str) -> Result<Vec<T>> {
        self.read()?.retrieve(key)
    }

    pub fn store_in_page(&self, page: u32, items: &[T]) -> Result<usize> {
        self.transaction(|w| w.store_in_page(page, items))
    }

    pub fn add_to_page(&self, page: u32, items: Vec<T>) -> Result<usize> {
        self.transaction(|w| w.add_to_page(page, items))
    }

    pub fn index(&self, key: &str, item: T) -> Result<bool> {
        self.transaction(|w| w.index(key, item))
    }

    /// Rewrites the store log, dropping superseded page versions.
    pub fn compact(&self) -> Result<CompactionStats> {
        self.check_writable()?;
        self.store.compact()
    }

    pub fn stats(&self) -> StoreStats {
        self.store.stats()
    }

    pub fn committed(&self) -> TxnId {
        self.store.stats().committed
    }
}

impl TinyIndex<Document> {
    pub fn merge_into_page<R: Ranker + ?Sized>(
        &self,
        page: u32,
        new_documents: Vec<Document>,
        ranker: &R,
    ) -> Result<usize> {
        self.transaction(|w| w.merge_into_page(page, new_documents, ranker))
    }
}

impl<T: Item> PageStorage for TinyIndex<T> {
    fn metadata(&self) -> &IndexMetadata {
        &self.metadata
    }

    fn read_page(&self, page: u32) -> Result<Option<Vec<u8>>> {
        self.read()?.read_page(page)
    }
}

/// Store directory a legacy file at `path` migrates into.
pub fn migrated_store_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".");
    name.push(crate::config::MIGRATED_STORE_EXTENSION);
    PathBuf::from(name)
}

pub(crate) fn decode_items<T: Item>(page: u32, raw: Option<Vec<u8>>) -> Vec<T> {
    let Some(raw) = raw else {
        return Vec::new();
    };

    match decode_page::<Tuple>(&raw) {
        Ok(tuples) => tuples
            .into_iter()
            .filter_map(|tuple| match T::from_tuple(tuple) {
                Ok(item) => Some(item),
                Err(e) => {
                    tracing::warn!(page, error = %e, "skipping malformed item");
                    None
                }
            })
            .collect(),
        Err(EmptyPage::Blank) => Vec::new(),
        Err(EmptyPage::Corrupt) => {
            tracing::warn!(page, "page could not be decoded, reading it as empty");
            Vec::new()
        }
    }
}

pub(crate) fn filter_for_key<T: Item>(items: Vec<T>, key: &str) -> Vec<T> {
    items
        .into_iter()
        .filter(|item| item.term().is_none_or(|term| term == key))
        .collect()
}
