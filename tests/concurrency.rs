//! # Concurrent Access Tests
//!
//! Single-writer exclusion and snapshot isolation across threads and across
//! independently opened handles on the same index directory.
//!
//! ## Usage
//!
//! ```sh
//! cargo test --test concurrency --release -- --nocapture
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use tempfile::tempdir;
use tinyindex::{Document, Mode, TinyIndex};

fn counter_doc(value: usize) -> Document {
    Document::new("counter", "https://counter.example", value.to_string())
}

fn read_counter(index: &TinyIndex<Document>) -> usize {
    index
        .get_page(0)
        .unwrap()
        .first()
        .map_or(0, |doc| doc.extract.parse().unwrap())
}

#[test]
fn concurrent_increments_are_serialized() {
    const THREADS: usize = 8;
    const ROUNDS: usize = 10;

    let dir = tempdir().unwrap();
    let index = Arc::new(
        TinyIndex::<Document>::builder()
            .path(dir.path().join("i"))
            .sync_on_commit(false)
            .create(4, 1024)
            .unwrap(),
    );
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let index = Arc::clone(&index);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..ROUNDS {
                    index
                        .transaction(|w| {
                            let current = w
                                .get_page(0)?
                                .first()
                                .map_or(0, |doc| doc.extract.parse().unwrap());
                            w.store_in_page(0, &[counter_doc(current + 1)])
                        })
                        .unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(read_counter(&index), THREADS * ROUNDS);
}

#[test]
fn second_writer_blocks_until_first_finishes() {
    let dir = tempdir().unwrap();
    let index = Arc::new(TinyIndex::<Document>::create(dir.path().join("i"), 4, 1024).unwrap());
    let second_started = Arc::new(AtomicBool::new(false));

    let writer = index.write().unwrap();

    let handle = {
        let index = Arc::clone(&index);
        let second_started = Arc::clone(&second_started);
        thread::spawn(move || {
            let mut w = index.write().unwrap();
            second_started.store(true, Ordering::SeqCst);
            w.store_in_page(1, &[counter_doc(2)]).unwrap();
            w.commit().unwrap();
        })
    };

    thread::sleep(Duration::from_millis(100));
    assert!(!second_started.load(Ordering::SeqCst));

    writer.abort();
    handle.join().unwrap();

    assert!(second_started.load(Ordering::SeqCst));
    assert_eq!(index.get_page(1).unwrap(), vec![counter_doc(2)]);
}

#[test]
fn readers_keep_their_snapshot() {
    let dir = tempdir().unwrap();
    let index = TinyIndex::<Document>::create(dir.path().join("i"), 4, 1024).unwrap();
    index.store_in_page(0, &[counter_doc(1)]).unwrap();

    let reader = index.read().unwrap();
    for value in 2..=5 {
        index.store_in_page(0, &[counter_doc(value)]).unwrap();
    }

    assert_eq!(reader.get_page(0).unwrap(), vec![counter_doc(1)]);
    assert_eq!(read_counter(&index), 5);
    drop(reader);

    assert_eq!(read_counter(&index), 5);
}

#[test]
fn readers_run_alongside_a_writer() {
    let dir = tempdir().unwrap();
    let index = Arc::new(TinyIndex::<Document>::create(dir.path().join("i"), 4, 1024).unwrap());
    index.store_in_page(0, &[counter_doc(0)]).unwrap();

    let mut writer = index.write().unwrap();
    writer.store_in_page(0, &[counter_doc(99)]).unwrap();

    let reader_index = Arc::clone(&index);
    let seen = thread::spawn(move || read_counter(&reader_index)).join().unwrap();
    assert_eq!(seen, 0);

    writer.commit().unwrap();
    assert_eq!(read_counter(&index), 99);
}

#[test]
fn separate_handles_see_each_others_commits() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("i");
    let writer = TinyIndex::<Document>::create(&path, 4, 1024).unwrap();
    let reader = TinyIndex::<Document>::open(&path, Mode::Read).unwrap();
    let second_writer = TinyIndex::<Document>::open(&path, Mode::Write).unwrap();

    writer.store_in_page(2, &[counter_doc(1)]).unwrap();
    assert_eq!(reader.get_page(2).unwrap(), vec![counter_doc(1)]);

    second_writer.add_to_page(2, vec![counter_doc(2)]).unwrap();
    assert_eq!(reader.get_page(2).unwrap(), vec![counter_doc(1), counter_doc(2)]);
    assert_eq!(writer.get_page(2).unwrap().len(), 2);

    writer.compact().unwrap();
    assert_eq!(reader.get_page(2).unwrap().len(), 2);
    second_writer.store_in_page(3, &[counter_doc(3)]).unwrap();
    assert_eq!(writer.get_page(3).unwrap(), vec![counter_doc(3)]);
}
