//! # Index Builder
//!
//! `TinyIndexBuilder` opens or creates a [`TinyIndex`] with control over the
//! page store settings and the dimensions the caller expects.
//!
//! ## Configuration Options
//!
//! | Option               | Default        | Description                                  |
//! |----------------------|----------------|----------------------------------------------|
//! | mode                 | `Mode::Read`   | Whether writes are allowed (`open` only)     |
//! | sync_on_commit       | true           | fsync the log on every commit                |
//! | compaction_min_bytes | 64 MiB         | Log size below which compaction never runs   |
//! | compaction_ratio     | 4.0            | Log to live data ratio that triggers it      |
//! | expect_dimensions    | none           | Fail `open` unless pages and size match      |
//!
//! ## Usage Examples
//!
//! ```ignore
//! let index = TinyIndex::<Document>::builder()
//!     .path("./index.tinykv")
//!     .create(5_120_000, 4096)?;
//!
//! let index = TinyIndex::<Document>::builder()
//!     .path("./index.tinysearch")       // legacy file, migrated on first open
//!     .mode(Mode::Write)
//!     .expect_dimensions(5_120_000, 4096)
//!     .open()?;
//! ```

use std::fs;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use eyre::{ensure, eyre, Result, WrapErr};

use crate::codec::{compress_items, encode_page, IndexMetadata};
use crate::config::{METADATA_KEY, METADATA_SIZE, MIN_PAGE_SIZE};
use crate::document::{Item, Tuple};
use crate::error::IndexError;
use crate::index::migrate::migrate_with_options;
use crate::index::{migrated_store_path, Mode, TinyIndex};
use crate::storage::{is_legacy_file, LegacyIndexFile, PageStorage, PageStore, StoreOptions};

pub struct TinyIndexBuilder<T: Item> {
    path: Option<PathBuf>,
    mode: Mode,
    options: StoreOptions,
    expected: Option<(u32, usize)>,
    _item: PhantomData<fn() -> T>,
}

impl<T: Item> Default for TinyIndexBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Item> TinyIndexBuilder<T> {
    pub fn new() -> Self {
        Self {
            path: None,
            mode: Mode::Read,
            options: StoreOptions::default(),
            expected: None,
            _item: PhantomData,
        }
    }

    /// Location of the index: a page store directory, or a legacy index file
    /// to migrate on open.
    pub fn path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Turning this off trades durability of the last commits on power loss
    /// for throughput. Crash consistency of the log is unaffected.
    pub fn sync_on_commit(mut self, sync: bool) -> Self {
        self.options.sync_on_commit = sync;
        self
    }

    pub fn compaction_min_bytes(mut self, bytes: u64) -> Self {
        self.options.compaction_min_bytes = bytes;
        self
    }

    pub fn compaction_ratio(mut self, ratio: f64) -> Self {
        self.options.compaction_ratio = ratio;
        self
    }

    pub fn store_options(mut self, options: StoreOptions) -> Self {
        self.options = options;
        self
    }

    /// Makes `open` fail with a dimension mismatch unless the index has
    /// exactly these dimensions.
    pub fn expect_dimensions(mut self, num_pages: u32, page_size: usize) -> Self {
        self.expected = Some((num_pages, page_size));
        self
    }

    fn take_path(&self) -> Result<&Path> {
        self.path
            .as_deref()
            .ok_or_else(|| eyre!("no index path configured, call path() first"))
    }

    /// Opens an existing index.
    pub fn open(self) -> Result<TinyIndex<T>> {
        let path = self.take_path()?.to_path_buf();

        let store_dir = if is_legacy_file(&path) {
            let sibling = migrated_store_path(&path);
            if PageStore::exists(&sibling) {
                tracing::debug!(
                    legacy = %path.display(),
                    store = %sibling.display(),
                    "using previously migrated page store"
                );
            } else {
                let legacy = LegacyIndexFile::open(&path)?;
                legacy.metadata().check_item_type::<T>()?;
                migrate_with_options(&legacy, &sibling, self.options)?;
            }
            sibling
        } else {
            path.clone()
        };

        if !PageStore::exists(&store_dir) {
            return Err(IndexError::MissingMetadata { path }.into());
        }

        let store = PageStore::open(&store_dir, self.options)?;
        let raw = {
            let txn = store.begin_read()?;
            txn.get(METADATA_KEY)?
        };
        let raw = raw.ok_or_else(|| IndexError::MissingMetadata {
            path: store_dir.clone(),
        })?;

        let metadata = IndexMetadata::from_bytes(&raw)
            .wrap_err_with(|| format!("failed to read metadata of '{}'", store_dir.display()))?;
        metadata.check_item_type::<T>()?;
        if let Some((num_pages, page_size)) = self.expected {
            metadata.check_dimensions(num_pages, page_size)?;
        }

        tracing::debug!(
            path = %path.display(),
            num_pages = metadata.num_pages,
            page_size = metadata.page_size,
            mode = ?self.mode,
            "opened index"
        );

        Ok(TinyIndex {
            path,
            store,
            metadata,
            mode: self.mode,
            _item: PhantomData,
        })
    }

    /// Creates a new index of `num_pages` empty pages of `page_size` bytes
    /// and opens it in write mode.
    pub fn create(self, num_pages: u32, page_size: usize) -> Result<TinyIndex<T>> {
        let path = self.take_path()?.to_path_buf();

        if path.exists() {
            return Err(IndexError::AlreadyExists { path }.into());
        }
        ensure!(num_pages > 0, "an index needs at least one page");

        let empty: &[Tuple] = &[];
        let empty_size = compress_items(empty)?.len();
        if empty_size > page_size {
            return Err(IndexError::PageTooLarge {
                size: empty_size,
                page_size,
            }
            .into());
        }
        ensure!(
            page_size >= MIN_PAGE_SIZE,
            "page size {} is below the minimum of {} bytes",
            page_size,
            MIN_PAGE_SIZE
        );

        let metadata = IndexMetadata::for_item::<T>(page_size, num_pages);
        ensure!(
            metadata.to_bytes()?.len() <= METADATA_SIZE,
            "index metadata does not fit in {} bytes",
            METADATA_SIZE
        );

        let store = PageStore::create(&path, self.options)?;
        let index = TinyIndex {
            path: path.clone(),
            store,
            metadata,
            mode: Mode::Write,
            _item: PhantomData,
        };

        if let Err(e) = initialize(&index) {
            drop(index);
            if let Err(cleanup) = fs::remove_dir_all(&path) {
                tracing::warn!(path = %path.display(), error = %cleanup, "failed to remove partial index");
            }
            return Err(e);
        }

        tracing::info!(
            path = %path.display(),
            num_pages,
            page_size,
            item_type = T::TYPE_NAME,
            "created index"
        );

        Ok(index)
    }
}

fn initialize<T: Item>(index: &TinyIndex<T>) -> Result<()> {
    let empty: &[Tuple] = &[];
    let empty_page = encode_page(empty, index.page_size())?;
    let metadata = index.metadata().clone();

    index.transaction(|w| {
        w.write_metadata(&metadata)?;
        for page in 0..metadata.num_pages {
            w.write_raw_page(page, &empty_page)?;
        }
        Ok(())
    })?;
    Ok(())
}
