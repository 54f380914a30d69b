//! # Bulk Indexing
//!
//! Batch operations over many pages of a document index.
//!
//! - [`index_pages`] merges batches of new documents into their pages in one
//!   write transaction.
//! - [`copy_pages`] re-files the documents of a range of pages of one index
//!   into another, possibly with different dimensions, by hashing each
//!   document's term against the destination.

use std::collections::BTreeMap;

use eyre::{Result, WrapErr};

use crate::document::Document;
use crate::index::TinyIndex;
use crate::merge::Ranker;

/// Merges each page's new documents into that page. Returns the total number
/// of documents stored across the touched pages.
pub fn index_pages<I, R>(index: &TinyIndex<Document>, page_documents: I, ranker: &R) -> Result<usize>
where
    I: IntoIterator<Item = (u32, Vec<Document>)>,
    R: Ranker + ?Sized,
{
    index.transaction(|w| {
        let mut stored = 0;
        let mut pages = 0usize;
        for (page, documents) in page_documents {
            stored += w
                .merge_into_page(page, documents, ranker)
                .wrap_err_with(|| format!("failed to index documents into page {}", page))?;
            pages += 1;
        }
        tracing::debug!(pages, stored, "indexed pages");
        Ok(stored)
    })
}

/// Copies pages `[start_page, start_page + count)` of `old` into `new`,
/// stopping at the end of `old`. Returns the number of documents stored in
/// the touched pages of `new`.
pub fn copy_pages<R: Ranker + ?Sized>(
    old: &TinyIndex<Document>,
    new: &TinyIndex<Document>,
    start_page: u32,
    count: u32,
    ranker: &R,
) -> Result<usize> {
    tracing::info!(
        from = %old.path().display(),
        to = %new.path().display(),
        start_page,
        "copying pages"
    );

    let end = start_page.saturating_add(count).min(old.num_pages());
    let mut page_documents: BTreeMap<u32, Vec<Document>> = BTreeMap::new();

    let reader = old.read()?;
    for page in start_page..end {
        for document in reader.get_page(page)? {
            let Some(term) = document.term.as_deref() else {
                tracing::warn!(page, url = %document.url, "skipping document without a term");
                continue;
            };
            let target = new.get_key_page_index(term);
            page_documents.entry(target).or_default().push(document);
        }
    }
    drop(reader);

    tracing::info!(pages = page_documents.len(), "copying into destination pages");
    index_pages(new, page_documents, ranker)
}
