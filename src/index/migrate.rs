//! # Migration Between Page Storages
//!
//! Copies the metadata block and every page of a [`PageStorage`] byte for
//! byte into a new page store, inside a single write transaction. Either the
//! whole index lands in the destination or, on failure, the partial
//! destination is removed.
//!
//! ```text
//! LegacyIndexFile ──read_page(i)──> WriteTxn ──put("page_<i>")──> commit
//! ```
//!
//! Pages are not decoded: a page that would not decode in the source reads
//! as empty in the destination as well.

use std::fs;
use std::path::Path;
use std::time::Instant;

use eyre::{Result, WrapErr};

use crate::codec::IndexMetadata;
use crate::config::METADATA_KEY;
use crate::error::IndexError;
use crate::storage::{page_key, PageStorage, PageStore, StoreOptions};

const PROGRESS_INTERVAL: u32 = 100_000;

pub fn migrate(source: &dyn PageStorage, dest: &Path) -> Result<IndexMetadata> {
    migrate_with_options(source, dest, StoreOptions::default())
}

pub fn migrate_with_options(
    source: &dyn PageStorage,
    dest: &Path,
    options: StoreOptions,
) -> Result<IndexMetadata> {
    if dest.exists() {
        return Err(IndexError::AlreadyExists {
            path: dest.to_path_buf(),
        }
        .into());
    }

    let metadata = source.metadata().clone();
    tracing::info!(
        dest = %dest.display(),
        num_pages = metadata.num_pages,
        page_size = metadata.page_size,
        "migrating index"
    );

    let started = Instant::now();
    match copy_all(source, &metadata, dest, options) {
        Ok(()) => {
            tracing::info!(
                dest = %dest.display(),
                pages = metadata.num_pages,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "migration complete"
            );
            Ok(metadata)
        }
        Err(e) => {
            if dest.exists() {
                if let Err(cleanup) = fs::remove_dir_all(dest) {
                    tracing::warn!(
                        dest = %dest.display(),
                        error = %cleanup,
                        "failed to remove partial migration"
                    );
                }
            }
            Err(e).wrap_err_with(|| format!("failed to migrate index into '{}'", dest.display()))
        }
    }
}

fn copy_all(
    source: &dyn PageStorage,
    metadata: &IndexMetadata,
    dest: &Path,
    options: StoreOptions,
) -> Result<()> {
    let store = PageStore::create(dest, options)?;
    let mut txn = store.begin_write()?;

    txn.put(METADATA_KEY, &metadata.to_padded_bytes()?)?;

    for page in 0..metadata.num_pages {
        if let Some(raw) = source.read_page(page)? {
            txn.put(&page_key(page), &raw)?;
        }
        let done = page + 1;
        if done % PROGRESS_INTERVAL == 0 {
            tracing::info!(done, total = metadata.num_pages, "migrated pages");
        }
    }

    txn.commit()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::error::index_error;
    use crate::storage::{LegacyIndexFile, LegacyIndexWriter};
    use tempfile::tempdir;

    struct FailingSource {
        metadata: IndexMetadata,
    }

    impl PageStorage for FailingSource {
        fn metadata(&self) -> &IndexMetadata {
            &self.metadata
        }

        fn read_page(&self, page: u32) -> Result<Option<Vec<u8>>> {
            if page == 2 {
                eyre::bail!("disk on fire");
            }
            Ok(Some(vec![0; self.metadata.page_size]))
        }
    }

    #[test]
    fn copies_pages_verbatim() {
        let dir = tempdir().unwrap();
        let legacy = dir.path().join("index.tinysearch");
        let dest = dir.path().join("index.tinykv");

        let mut writer =
            LegacyIndexWriter::create(&legacy, IndexMetadata::for_item::<Document>(128, 3)).unwrap();
        writer.write_page(1, b"not a zstd frame").unwrap();
        writer.finish().unwrap();

        let source = LegacyIndexFile::open(&legacy).unwrap();
        let metadata = migrate(&source, &dest).unwrap();
        assert_eq!(&metadata, source.metadata());

        let store = PageStore::open(&dest, StoreOptions::default()).unwrap();
        let txn = store.begin_read().unwrap();
        for page in 0..3 {
            assert_eq!(
                txn.get(&page_key(page)).unwrap().unwrap(),
                source.page(page).unwrap()
            );
        }
        assert_eq!(
            IndexMetadata::from_bytes(&txn.get(METADATA_KEY).unwrap().unwrap()).unwrap(),
            metadata
        );
    }

    #[test]
    fn existing_destination_is_rejected() {
        let dir = tempdir().unwrap();
        let source = FailingSource {
            metadata: IndexMetadata::for_item::<Document>(64, 1),
        };

        let err = migrate(&source, dir.path()).unwrap_err();

        assert!(matches!(index_error(&err), Some(IndexError::AlreadyExists { .. })));
    }

    #[test]
    fn failure_removes_partial_destination() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("out");
        let source = FailingSource {
            metadata: IndexMetadata::for_item::<Document>(64, 5),
        };

        assert!(migrate(&source, &dest).is_err());
        assert!(!dest.exists());
    }
}
