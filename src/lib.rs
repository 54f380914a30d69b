//! # TinyIndex - Paged Key-Value Search Index
//!
//! TinyIndex maps search terms to short lists of documents. The index is a
//! fixed number of fixed-size pages; a term hashes to one page, and each page
//! holds a zstd-compressed list of items that fit within the page size.
//!
//! ## Quick Start
//!
//! ```ignore
//! use tinyindex::{Document, Mode, TinyIndex};
//!
//! let index = TinyIndex::<Document>::create("./index.tinykv", 5_120_000, 4096)?;
//!
//! let page = index.get_key_page_index("python");
//! let doc = Document::new("Python", "https://python.org", "A language").with_term("python");
//! index.store_in_page(page, &[doc])?;
//!
//! let index = TinyIndex::<Document>::open("./index.tinykv", Mode::Read)?;
//! let results = index.retrieve("python")?;
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │   TinyIndex<T> (create/open/read/   │
//! │   write/transaction, bulk, migrate) │
//! ├──────────────────┬──────────────────┤
//! │  merge (ranking  │  codec (fit,     │
//! │  and interleave) │  page, metadata) │
//! ├──────────────────┴──────────────────┤
//! │  PageStore: append-only log,        │
//! │  snapshot readers, single writer    │
//! ├─────────────────────────────────────┤
//! │  Positional file I/O  │ legacy mmap │
//! └─────────────────────────────────────┘
//! ```
//!
//! ## File Layout
//!
//! ```text
//! index.tinykv/
//! ├── CURRENT            # active log generation
//! ├── LOCK               # writer lock
//! └── data.000001.log    # transactions: "metadata" and "page_<i>" values
//! ```
//!
//! A legacy flat index file (`index.tinysearch`) is migrated on first open
//! into `index.tinysearch.tinykv` next to it.
//!
//! ## Module Overview
//!
//! - [`index`]: the `TinyIndex` handle, scoped transactions, builder, bulk
//!   indexing and migration
//! - [`storage`]: the transactional page store and the legacy file format
//! - [`codec`]: page compression, the capacity fitter, the metadata block
//! - [`merge`]: merge policy for new documents landing on a page
//! - [`document`]: the `Item` trait and `Document`
//! - [`hash`]: term to page hashing

#[macro_use]
mod macros;

pub mod codec;
pub mod config;
pub mod document;
pub mod error;
pub mod hash;
pub mod index;
pub mod merge;
pub mod storage;

pub use document::{Document, DocumentState, Item, Tuple, TupleSchema};
pub use error::{index_error, IndexError};
pub use index::bulk::{copy_pages, index_pages};
pub use index::migrate::migrate;
pub use index::{IndexReader, IndexWriter, Mode, TinyIndex, TinyIndexBuilder};
pub use merge::{merge, Ranker};
pub use storage::{PageStorage, StoreOptions};
