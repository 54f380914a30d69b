//! # Index Errors
//!
//! TinyIndex reports every failure through `eyre::Result`, adding context
//! (paths, page numbers, keys) with `wrap_err_with` as errors travel up. The
//! failures a caller may want to react to are raised as an [`IndexError`]
//! inside the report, so they can be recovered with
//! `report.downcast_ref::<IndexError>()`:
//!
//! ```ignore
//! match TinyIndex::<Document>::create(&path, 100, 4096) {
//!     Err(e) if matches!(e.downcast_ref(), Some(IndexError::AlreadyExists { .. })) => { ... }
//!     other => other?,
//! }
//! ```
//!
//! ## Taxonomy
//!
//! | Variant               | Raised by                     | Caller action             |
//! |-----------------------|-------------------------------|---------------------------|
//! | `AlreadyExists`       | `create`, `migrate`           | pick another path         |
//! | `ItemFactoryMismatch` | `open`                        | open with the stored type |
//! | `DimensionMismatch`   | `open` with expected sizes    | fix configuration         |
//! | `MissingMetadata`     | `open`                        | not an index              |
//! | `InvalidMetadata`     | metadata decoding             | not an index / corrupt    |
//! | `ReadOnlyViolation`   | writes on a read-mode handle  | programmer error          |
//! | `PageTooLarge`        | page encoding, zero-fit store | enlarge pages             |
//! | `PageOutOfRange`      | page access                   | programmer error          |
//!
//! Corrupt or never-written pages are deliberately absent from this list: a
//! page that cannot be decoded reads as an empty page.

use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq)]
pub enum IndexError {
    AlreadyExists {
        path: PathBuf,
    },
    ItemFactoryMismatch {
        expected: String,
        found: String,
    },
    DimensionMismatch {
        expected_pages: u32,
        expected_page_size: usize,
        found_pages: u32,
        found_page_size: usize,
    },
    MissingMetadata {
        path: PathBuf,
    },
    InvalidMetadata(String),
    ReadOnlyViolation,
    PageTooLarge {
        size: usize,
        page_size: usize,
    },
    PageOutOfRange {
        page: u32,
        num_pages: u32,
    },
}

impl fmt::Display for IndexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexError::AlreadyExists { path } => {
                write!(f, "index '{}' already exists", path.display())
            }
            IndexError::ItemFactoryMismatch { expected, found } => write!(
                f,
                "metadata item factory '{}' in the index does not match the requested item type '{}'",
                found, expected
            ),
            IndexError::DimensionMismatch {
                expected_pages,
                expected_page_size,
                found_pages,
                found_page_size,
            } => write!(
                f,
                "index dimensions {} pages x {} bytes do not match expected {} pages x {} bytes",
                found_pages, found_page_size, expected_pages, expected_page_size
            ),
            IndexError::MissingMetadata { path } => {
                write!(f, "no index metadata found at '{}'", path.display())
            }
            IndexError::InvalidMetadata(reason) => write!(f, "invalid index metadata: {}", reason),
            IndexError::ReadOnlyViolation => {
                write!(f, "the index is open in read mode, you cannot write")
            }
            IndexError::PageTooLarge { size, page_size } => write!(
                f,
                "data is too big ({} bytes) for page size ({} bytes)",
                size, page_size
            ),
            IndexError::PageOutOfRange { page, num_pages } => {
                write!(f, "page {} out of range (num_pages={})", page, num_pages)
            }
        }
    }
}

impl std::error::Error for IndexError {}

/// Returns the [`IndexError`] carried by `report`, looking through context layers.
pub fn index_error(report: &eyre::Report) -> Option<&IndexError> {
    report
        .chain()
        .find_map(|cause| cause.downcast_ref::<IndexError>())
}

#[cfg(test)]
mod tests {
    use super::*;
    use eyre::WrapErr;

    #[test]
    fn display_mentions_both_type_names() {
        let err = IndexError::ItemFactoryMismatch {
            expected: "Document".to_string(),
            found: "TokenizedDocument".to_string(),
        };

        let text = err.to_string();
        assert!(text.contains("Document"));
        assert!(text.contains("TokenizedDocument"));
    }

    #[test]
    fn index_error_found_through_context() {
        let result: eyre::Result<()> = Err(eyre::Report::new(IndexError::ReadOnlyViolation))
            .wrap_err("failed to store page 3");

        let report = result.unwrap_err();
        assert_eq!(index_error(&report), Some(&IndexError::ReadOnlyViolation));
    }

    #[test]
    fn index_error_absent_for_plain_reports() {
        let report = eyre::eyre!("disk on fire");
        assert!(index_error(&report).is_none());
    }
}
