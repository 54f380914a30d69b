//! # Legacy Index Migration Tests
//!
//! Verifies that flat legacy index files open transparently through the page
//! store, that every page survives byte for byte, and that the legacy file
//! itself is never touched.
//!
//! ## Usage
//!
//! ```sh
//! cargo test --test migration -- --nocapture
//! ```

use std::fs;
use std::path::Path;

use tempfile::tempdir;
use tinyindex::codec::IndexMetadata;
use tinyindex::index::migrated_store_path;
use tinyindex::storage::{LegacyIndexFile, LegacyIndexWriter, PageStore};
use tinyindex::{index_error, migrate, Document, IndexError, Mode, PageStorage, TinyIndex};

const NUM_PAGES: u32 = 64;
const PAGE_SIZE: usize = 2048;

fn build_legacy(path: &Path) -> Vec<Vec<Document>> {
    let mut writer =
        LegacyIndexWriter::create(path, IndexMetadata::for_item::<Document>(PAGE_SIZE, NUM_PAGES)).unwrap();

    let pages: Vec<Vec<Document>> = (0..NUM_PAGES)
        .map(|page| {
            (0..page % 4)
                .map(|i| {
                    Document::new(
                        format!("Doc {} on {}", i, page),
                        format!("https://example.com/{}/{}", page, i),
                        "legacy extract",
                    )
                    .with_term(format!("term{}", page))
                })
                .collect()
        })
        .collect();

    for (page, docs) in pages.iter().enumerate() {
        if !docs.is_empty() {
            writer.write_items(page as u32, docs).unwrap();
        }
    }
    writer.finish().unwrap();
    pages
}

#[test]
fn migrated_store_matches_legacy_pages() {
    let dir = tempdir().unwrap();
    let legacy = dir.path().join("index.tinysearch");
    let dest = dir.path().join("copy.tinykv");
    build_legacy(&legacy);

    let source = LegacyIndexFile::open(&legacy).unwrap();
    let metadata = migrate(&source, &dest).unwrap();
    assert_eq!(metadata.num_pages, NUM_PAGES);
    assert_eq!(metadata.page_size, PAGE_SIZE);

    let index = TinyIndex::<Document>::open(&dest, Mode::Read).unwrap();
    for page in 0..NUM_PAGES {
        assert_eq!(
            index.read_page(page).unwrap().unwrap(),
            source.page(page).unwrap(),
            "page {} differs",
            page
        );
    }
}

#[test]
fn opening_legacy_file_migrates_once() {
    let dir = tempdir().unwrap();
    let legacy = dir.path().join("index.tinysearch");
    let pages = build_legacy(&legacy);
    let original_bytes = fs::read(&legacy).unwrap();

    let index = TinyIndex::<Document>::open(&legacy, Mode::Write).unwrap();
    for (page, docs) in pages.iter().enumerate() {
        assert_eq!(&index.get_page(page as u32).unwrap(), docs);
    }

    let sibling = migrated_store_path(&legacy);
    assert!(PageStore::exists(&sibling));

    let extra = Document::new("New", "https://new.example", "added after migration").with_term("term1");
    index.add_to_page(1, vec![extra.clone()]).unwrap();
    drop(index);

    let index = TinyIndex::<Document>::open(&legacy, Mode::Read).unwrap();
    assert_eq!(index.get_page(1).unwrap().last(), Some(&extra));
    assert_eq!(fs::read(&legacy).unwrap(), original_bytes);
}

#[test]
fn migrate_refuses_existing_destination() {
    let dir = tempdir().unwrap();
    let legacy = dir.path().join("index.tinysearch");
    let dest = dir.path().join("copy.tinykv");
    build_legacy(&legacy);
    fs::create_dir(&dest).unwrap();

    let source = LegacyIndexFile::open(&legacy).unwrap();
    let err = migrate(&source, &dest).unwrap_err();

    assert!(matches!(index_error(&err), Some(IndexError::AlreadyExists { .. })));
    assert!(fs::read_dir(&dest).unwrap().next().is_none());
}

#[test]
fn legacy_file_with_wrong_item_type_is_rejected() {
    let dir = tempdir().unwrap();
    let legacy = dir.path().join("index.tinysearch");
    LegacyIndexWriter::create(&legacy, IndexMetadata::new(PAGE_SIZE, 2, "Term"))
        .unwrap()
        .finish()
        .unwrap();

    let err = TinyIndex::<Document>::open(&legacy, Mode::Read).err().unwrap();

    assert!(matches!(index_error(&err), Some(IndexError::ItemFactoryMismatch { .. })));
    assert!(!migrated_store_path(&legacy).exists());
}
