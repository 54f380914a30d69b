//! # Merging New Documents into a Page
//!
//! When freshly crawled documents land on a page that already holds
//! documents, the page is rebuilt in priority order. The capacity fitter
//! drops from the tail, so whatever ends up last is what gets lost when the
//! page overflows.
//!
//! ## Order
//!
//! ```text
//! existing: [c1* a1 b1 c2* z1 z2]       (* = curated)
//! new:      [a2 b2]
//!
//! 1. curated first, existing order:      c1 c2
//! 2. group the rest by term:             a: [a2 a1]  b: [b2 b1]  z: [z1 z2]
//! 3. rank groups that got new documents: a: ranker(a) b: ranker(b) z: as is
//! 4. interleave by position in group:    a[0] b[0] z[0] a[1] b[1] z[1]
//! 5. drop repeated (title, url)
//! ```
//!
//! Groups appear in the order their term first shows up in the new
//! documents, followed by terms that only existing documents carry. The
//! interleave keeps one popular term from pushing every other term off the
//! page.

use hashbrown::{HashMap, HashSet};

use crate::document::Document;

/// Orders candidate documents for a query.
pub trait Ranker {
    fn order_results(&self, terms: &[&str], documents: Vec<Document>, is_complete: bool) -> Vec<Document>;
}

impl<F> Ranker for F
where
    F: Fn(&[&str], Vec<Document>, bool) -> Vec<Document>,
{
    fn order_results(&self, terms: &[&str], documents: Vec<Document>, is_complete: bool) -> Vec<Document> {
        self(terms, documents, is_complete)
    }
}

struct TermGroup {
    term: Option<String>,
    new: Vec<Document>,
    existing: Vec<Document>,
}

/// Merges `new_items` into `existing_items` in page priority order.
pub fn merge<R: Ranker + ?Sized>(
    new_items: Vec<Document>,
    existing_items: Vec<Document>,
    ranker: &R,
) -> Vec<Document> {
    let (curated, ordinary): (Vec<_>, Vec<_>) =
        existing_items.into_iter().partition(Document::is_curated);

    let mut groups: Vec<TermGroup> = Vec::new();
    let mut group_of: HashMap<Option<String>, usize> = HashMap::new();
    let mut group_index = |groups: &mut Vec<TermGroup>, term: &Option<String>| {
        *group_of.entry(term.clone()).or_insert_with(|| {
            groups.push(TermGroup {
                term: term.clone(),
                new: Vec::new(),
                existing: Vec::new(),
            });
            groups.len() - 1
        })
    };

    for doc in new_items {
        let i = group_index(&mut groups, &doc.term);
        groups[i].new.push(doc);
    }
    for doc in ordinary {
        let i = group_index(&mut groups, &doc.term);
        groups[i].existing.push(doc);
    }

    let ranked: Vec<Vec<Document>> = groups
        .into_iter()
        .map(|group| {
            if group.new.is_empty() {
                return group.existing;
            }
            let terms: Vec<&str> = group
                .term
                .as_deref()
                .map(|t| t.split_whitespace().collect())
                .unwrap_or_default();
            let mut docs = group.new;
            docs.extend(group.existing);
            ranker.order_results(&terms, docs, true)
        })
        .collect();

    let mut merged = curated;
    merged.extend(interleave(ranked));

    let mut seen = HashSet::new();
    merged.retain(|doc| seen.insert((doc.title.clone(), doc.url.clone())));
    merged
}

/// Takes position 0 of every group in order, then position 1, and so on.
fn interleave(groups: Vec<Vec<Document>>) -> Vec<Document> {
    let total = groups.iter().map(Vec::len).sum();
    let mut iters: Vec<_> = groups.into_iter().map(Vec::into_iter).collect();
    let mut out = Vec::with_capacity(total);

    while out.len() < total {
        for iter in &mut iters {
            if let Some(doc) = iter.next() {
                out.push(doc);
            }
        }
    }
    out
}
