//! # Capacity Fitter
//!
//! Finds the longest prefix of an item list whose compressed page fits in
//! `page_size` bytes. Compressed size grows with the prefix length, so the
//! boundary is found by binary search over the prefix length:
//!
//! ```text
//! items:  [d0 d1 d2 d3 d4 d5 d6 d7]
//!          |<- fits ->|<- overflows ->
//!                     ^ count = 4
//! ```
//!
//! The whole list is tried first since most pages are not full. Items past
//! the boundary are the lowest-priority ones, because callers hand the
//! fitter lists in priority order.

use eyre::Result;
use serde::Serialize;

use crate::codec::page::{compress_items, pad_to_page_size};
use crate::error::IndexError;

/// Result of fitting a list into one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fit {
    /// Number of leading items kept.
    pub count: usize,
    /// Padded page holding exactly those items.
    pub page: Vec<u8>,
}

pub fn fit<S: Serialize>(items: &[S], page_size: usize) -> Result<Fit> {
    let all = compress_items(items)?;
    if all.len() <= page_size {
        return Ok(Fit {
            count: items.len(),
            page: pad_to_page_size(all, page_size)?,
        });
    }

    let empty = compress_items::<S>(&[])?;
    if empty.len() > page_size {
        return Err(IndexError::PageTooLarge {
            size: empty.len(),
            page_size,
        }
        .into());
    }

    // Invariant: prefix `lo` fits (held in `best`), prefix `hi + 1` does not.
    let mut lo = 0;
    let mut hi = items.len() - 1;
    let mut best = empty;
    while lo < hi {
        let mid = lo + (hi - lo).div_ceil(2);
        let compressed = compress_items(&items[..mid])?;
        if compressed.len() <= page_size {
            lo = mid;
            best = compressed;
        } else {
            hi = mid - 1;
        }
    }

    tracing::trace!(count = lo, total = items.len(), page_size, "fitted page");

    Ok(Fit {
        count: lo,
        page: pad_to_page_size(best, page_size)?,
    })
}
