//! # End-to-End Index Tests
//!
//! Exercises the public API the way an indexer and a search frontend use it:
//! create, store, retrieve, overflow trimming and reopening.
//!
//! ## Usage
//!
//! ```sh
//! cargo test --test end_to_end -- --nocapture
//! ```

use tempfile::tempdir;
use tinyindex::codec::compress_items;
use tinyindex::hash::murmur3_32;
use tinyindex::{index_error, Document, IndexError, Item, Mode, TinyIndex, Tuple};

const NUM_PAGES: u32 = 100;
const PAGE_SIZE: usize = 4096;

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

fn python_doc(i: usize) -> Document {
    Document::new(
        format!("Python result {}", i),
        format!("https://python.example/{}", i),
        format!("Python is a programming language, result {}", i),
    )
    .with_score(1.0 / (i + 1) as f64)
    .with_term("python")
}

/// A document whose text barely compresses.
fn large_doc(i: u32, term: &str) -> Document {
    let noise: String = (0..40u32)
        .map(|j| format!("{:08x}", murmur3_32(&[i.to_le_bytes(), j.to_le_bytes()].concat(), 7)))
        .collect();
    Document::new(
        format!("Title {} {}", i, &noise[..24]),
        format!("https://{}.example/{}", &noise[24..40], i),
        noise,
    )
    .with_score(i as f64)
    .with_term(term)
}

/// A key other than `key` that hashes to the same page.
fn colliding_key(index: &TinyIndex<Document>, key: &str) -> String {
    let page = index.get_key_page_index(key);
    (0..)
        .map(|i| format!("other{}", i))
        .find(|candidate| candidate != key && index.get_key_page_index(candidate) == page)
        .unwrap()
}

// ============================================================================
// SCENARIOS
// ============================================================================

#[test]
fn create_store_retrieve_and_trim() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("index.tinykv");
    let index = TinyIndex::<Document>::create(&path, NUM_PAGES, PAGE_SIZE).unwrap();

    for page in 0..NUM_PAGES {
        assert!(index.get_page(page).unwrap().is_empty());
    }

    let page = index.get_key_page_index("python");
    let docs: Vec<Document> = (0..3).map(python_doc).collect();
    assert_eq!(index.store_in_page(page, &docs).unwrap(), 3);

    let results = index.retrieve("python").unwrap();
    assert_eq!(results, docs);
    assert!(results.iter().all(|d| d.term.as_deref() == Some("python")));

    let other = colliding_key(&index, "python");
    let large: Vec<Document> = (0..10_000).map(|i| large_doc(i, &other)).collect();
    let kept = index.store_in_page(page, &large).unwrap();
    assert!(kept > 0);
    assert!(kept < large.len());

    let stored = index.get_page(page).unwrap();
    assert_eq!(stored.len(), kept);
    assert_eq!(stored[..], large[..kept]);

    let tuples: Vec<Tuple> = stored.iter().map(Item::to_tuple).collect();
    assert!(compress_items(&tuples).unwrap().len() <= PAGE_SIZE);

    assert!(index.retrieve("python").unwrap().is_empty());
    assert_eq!(index.retrieve(&other).unwrap().len(), kept);
}

#[test]
fn data_survives_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("index.tinykv");

    {
        let index = TinyIndex::<Document>::create(&path, NUM_PAGES, PAGE_SIZE).unwrap();
        index.index("python", python_doc(0)).unwrap();
        index.index("python", python_doc(1)).unwrap();
    }

    let index = TinyIndex::<Document>::open(&path, Mode::Read).unwrap();
    let titles: Vec<String> = index.retrieve("python").unwrap().into_iter().map(|d| d.title).collect();
    assert_eq!(titles, ["Python result 0", "Python result 1"]);
}

#[test]
fn multi_page_transaction_commits_together() {
    let dir = tempdir().unwrap();
    let index = TinyIndex::<Document>::create(dir.path().join("i"), NUM_PAGES, PAGE_SIZE).unwrap();

    let mut writer = index.write().unwrap();
    writer.store_in_page(1, &[python_doc(1)]).unwrap();
    writer.store_in_page(2, &[python_doc(2)]).unwrap();

    let reader = index.read().unwrap();
    assert!(reader.get_page(1).unwrap().is_empty());

    writer.commit().unwrap();

    assert!(reader.get_page(2).unwrap().is_empty());
    drop(reader);

    let reader = index.read().unwrap();
    assert_eq!(reader.get_page(1).unwrap().len(), 1);
    assert_eq!(reader.get_page(2).unwrap().len(), 1);
}

#[test]
fn dropped_writer_discards_changes() {
    let dir = tempdir().unwrap();
    let index = TinyIndex::<Document>::create(dir.path().join("i"), NUM_PAGES, PAGE_SIZE).unwrap();

    {
        let mut writer = index.write().unwrap();
        writer.store_in_page(5, &[python_doc(0)]).unwrap();
    }

    assert!(index.get_page(5).unwrap().is_empty());
    index.store_in_page(5, &[python_doc(0)]).unwrap();
    assert_eq!(index.get_page(5).unwrap().len(), 1);
}

#[test]
fn errors_are_typed() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("i");
    TinyIndex::<Document>::create(&path, 4, 512).unwrap();

    let err = TinyIndex::<Document>::create(&path, 4, 512).err().unwrap();
    assert!(matches!(index_error(&err), Some(IndexError::AlreadyExists { .. })));

    let index = TinyIndex::<Document>::open(&path, Mode::Read).unwrap();
    let err = index.index("x", python_doc(0)).unwrap_err();
    assert_eq!(err.downcast_ref::<IndexError>(), Some(&IndexError::ReadOnlyViolation));
}

#[test]
fn compaction_keeps_latest_pages() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("i");
    let index = TinyIndex::<Document>::create(&path, 10, 1024).unwrap();

    for round in 0..20 {
        index.store_in_page(3, &[python_doc(round)]).unwrap();
    }
    let before = index.stats().log_bytes;

    let stats = index.compact().unwrap();
    assert!(stats.new_bytes < before);
    assert_eq!(index.get_page(3).unwrap(), vec![python_doc(19)]);
    drop(index);

    let index = TinyIndex::<Document>::open(&path, Mode::Read).unwrap();
    assert_eq!(index.get_page(3).unwrap(), vec![python_doc(19)]);
    assert_eq!(index.num_pages(), 10);
}
