//! # Index Encodings
//!
//! Byte-level formats shared by every storage backend:
//!
//! - [`metadata`]: the magic-prefixed JSON metadata block
//! - [`page`]: compressed, zero-padded pages of item tuples
//! - [`fit`]: the capacity fitter that trims item lists to one page
//!
//! Nothing here touches the filesystem; storage backends move the produced
//! byte blocks around unchanged.

pub mod fit;
pub mod metadata;
pub mod page;

pub use fit::{fit, Fit};
pub use metadata::IndexMetadata;
pub use page::{compress_items, decode_page, encode_page, pad_to_page_size, EmptyPage};
