//! # Internal Macros
//!
//! ## le_fields!
//!
//! Generates accessors for zerocopy struct fields stored as little-endian
//! wrapper types. Every field gets a getter returning the native integer;
//! fields marked `mut` also get a `set_` method. Used by the commit log
//! headers, which are written and read as raw bytes.
//!
//! ```ignore
//! use zerocopy::little_endian::{U32, U64};
//!
//! #[repr(C)]
//! struct FrameHeader {
//!     key_len: U32,
//!     checksum: U64,
//! }
//!
//! impl FrameHeader {
//!     le_fields! {
//!         key_len: U32 => u32,
//!         mut checksum: U64 => u64,
//!     }
//! }
//!
//! // Generates:
//! // pub fn key_len(&self) -> u32 { self.key_len.get() }
//! // pub fn checksum(&self) -> u64 { self.checksum.get() }
//! // pub fn set_checksum(&mut self, val: u64) { self.checksum = U64::new(val); }
//! ```

/// Generates getters (and setters for `mut` fields) for little-endian fields.
#[macro_export]
macro_rules! le_fields {
    () => {};
    (@get $field:ident $native:ty) => {
        #[inline]
        pub fn $field(&self) -> $native {
            self.$field.get()
        }
    };
    (mut $field:ident : $wrapper:ident => $native:ty $(, $($rest:tt)*)?) => {
        $crate::le_fields!(@get $field $native);

        ::paste::paste! {
            #[inline]
            pub fn [<set_ $field>](&mut self, val: $native) {
                self.$field = ::zerocopy::little_endian::$wrapper::new(val);
            }
        }

        $crate::le_fields!($($($rest)*)?);
    };
    ($field:ident : $wrapper:ident => $native:ty $(, $($rest:tt)*)?) => {
        $crate::le_fields!(@get $field $native);
        $crate::le_fields!($($($rest)*)?);
    };
}
