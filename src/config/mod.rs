//! # TinyIndex Configuration Module
//!
//! This module centralizes the configuration constants for TinyIndex. Format
//! constants and tunable defaults live side by side so interdependent values
//! are checked together at compile time.
//!
//! Per-index runtime settings are not ambient: they are passed explicitly
//! through [`crate::storage::StoreOptions`] and the
//! [`crate::index::TinyIndexBuilder`].
//!
//! ## Module Organization
//!
//! - [`constants`]: All format constants and tunable defaults

pub mod constants;
pub use constants::*;
