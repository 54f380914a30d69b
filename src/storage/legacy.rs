//! # Legacy Flat Index File
//!
//! Before the transactional store, an index was a single flat file mapped
//! into memory:
//!
//! ```text
//! Offset 0:                              metadata block (16384 bytes)
//! Offset 16384:                          page 0  (page_size bytes)
//! Offset 16384 + page_size:              page 1
//! ...
//! Offset 16384 + i * page_size:          page i
//! ```
//!
//! The file size is exactly `METADATA_SIZE + num_pages * page_size`. The
//! format has no transactions, so it is only read here, to migrate it into a
//! page store. [`LegacyIndexWriter`] produces such files for tooling and
//! tests.

use std::fs::{File, OpenOptions};
use std::io::Read;
use std::path::{Path, PathBuf};

use eyre::{ensure, Result, WrapErr};
use memmap2::{Mmap, MmapMut};

use crate::codec::{encode_page, IndexMetadata};
use crate::config::{METADATA_MAGIC, METADATA_SIZE};
use crate::document::Item;
use crate::error::IndexError;
use crate::storage::PageStorage;

fn expected_file_size(metadata: &IndexMetadata) -> u64 {
    METADATA_SIZE as u64 + metadata.num_pages as u64 * metadata.page_size as u64
}

fn page_range(metadata: &IndexMetadata, page: u32) -> Result<std::ops::Range<usize>> {
    if page >= metadata.num_pages {
        return Err(IndexError::PageOutOfRange {
            page,
            num_pages: metadata.num_pages,
        }
        .into());
    }
    let start = METADATA_SIZE + page as usize * metadata.page_size;
    Ok(start..start + metadata.page_size)
}

/// Whether `path` is a flat file starting with the index magic.
pub fn is_legacy_file(path: &Path) -> bool {
    if !path.is_file() {
        return false;
    }
    let mut magic = [0u8; METADATA_MAGIC.len()];
    File::open(path)
        .and_then(|mut f| f.read_exact(&mut magic))
        .is_ok_and(|()| magic == METADATA_MAGIC)
}

/// Read-only view of a legacy index file.
pub struct LegacyIndexFile {
    path: PathBuf,
    mmap: Mmap,
    metadata: IndexMetadata,
}

impl LegacyIndexFile {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let file = File::open(path)
            .wrap_err_with(|| format!("failed to open legacy index '{}'", path.display()))?;

        let file_size = file
            .metadata()
            .wrap_err_with(|| format!("failed to get metadata for '{}'", path.display()))?
            .len();

        ensure!(
            file_size >= METADATA_SIZE as u64,
            "legacy index '{}' is too small ({} bytes) to hold metadata",
            path.display(),
            file_size
        );

        // SAFETY: Mmap::map is unsafe because the file could be modified or
        // truncated by another process while mapped. Legacy index files are
        // only read here, and every access is bounds-checked against the
        // file size validated below.
        let mmap = unsafe {
            Mmap::map(&file)
                .wrap_err_with(|| format!("failed to memory-map '{}'", path.display()))?
        };

        let metadata = IndexMetadata::from_bytes(&mmap[..METADATA_SIZE])
            .wrap_err_with(|| format!("failed to read metadata of '{}'", path.display()))?;

        let expected = expected_file_size(&metadata);
        ensure!(
            file_size == expected,
            "legacy index '{}' is {} bytes, expected {} for {} pages of {} bytes",
            path.display(),
            file_size,
            expected,
            metadata.num_pages,
            metadata.page_size
        );

        Ok(Self {
            path: path.to_path_buf(),
            mmap,
            metadata,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn page(&self, page: u32) -> Result<&[u8]> {
        let range = page_range(&self.metadata, page)?;
        Ok(&self.mmap[range])
    }
}

impl PageStorage for LegacyIndexFile {
    fn metadata(&self) -> &IndexMetadata {
        &self.metadata
    }

    fn read_page(&self, page: u32) -> Result<Option<Vec<u8>>> {
        Ok(Some(self.page(page)?.to_vec()))
    }
}

/// Builds a legacy index file.
pub struct LegacyIndexWriter {
    path: PathBuf,
    mmap: MmapMut,
    metadata: IndexMetadata,
}

impl LegacyIndexWriter {
    pub fn create<P: AsRef<Path>>(path: P, metadata: IndexMetadata) -> Result<Self> {
        let path = path.as_ref();

        ensure!(metadata.num_pages > 0, "legacy index needs at least one page");

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)
            .wrap_err_with(|| format!("failed to create legacy index '{}'", path.display()))?;

        let file_size = expected_file_size(&metadata);
        file.set_len(file_size)
            .wrap_err_with(|| format!("failed to set file size to {} bytes", file_size))?;

        // SAFETY: MmapMut::map_mut is unsafe because the mapping could be
        // modified externally. The file was just created with create_new, so
        // no other handle exists, and the mapping lives as long as the writer.
        let mut mmap = unsafe {
            MmapMut::map_mut(&file)
                .wrap_err_with(|| format!("failed to memory-map '{}'", path.display()))?
        };

        mmap[..METADATA_SIZE].copy_from_slice(&metadata.to_padded_bytes()?);

        Ok(Self {
            path: path.to_path_buf(),
            mmap,
            metadata,
        })
    }

    pub fn metadata(&self) -> &IndexMetadata {
        &self.metadata
    }

    /// Writes raw page bytes, zero-filling the rest of the slot.
    pub fn write_page(&mut self, page: u32, data: &[u8]) -> Result<()> {
        let range = page_range(&self.metadata, page)?;
        if data.len() > self.metadata.page_size {
            return Err(IndexError::PageTooLarge {
                size: data.len(),
                page_size: self.metadata.page_size,
            }
            .into());
        }

        let slot = &mut self.mmap[range];
        slot[..data.len()].copy_from_slice(data);
        slot[data.len()..].fill(0);
        Ok(())
    }

    pub fn write_items<T: Item>(&mut self, page: u32, items: &[T]) -> Result<()> {
        let tuples: Vec<_> = items.iter().map(Item::to_tuple).collect();
        let encoded = encode_page(&tuples, self.metadata.page_size)
            .wrap_err_with(|| format!("failed to encode legacy page {}", page))?;
        self.write_page(page, &encoded)
    }

    pub fn finish(self) -> Result<()> {
        self.mmap
            .flush()
            .wrap_err_with(|| format!("failed to flush '{}'", self.path.display()))
    }
}
