//! # Key Hashing
//!
//! Keys are mapped to pages with MurmurHash3 (x86, 32-bit variant) over the
//! UTF-8 bytes of the key, read as an unsigned integer and reduced modulo the
//! page count:
//!
//! ```text
//! page_index("python", 100) = murmur3_32(b"python", 0) % 100
//! ```
//!
//! The hash must be bit-exact with the reference implementation: indexes are
//! written and read by processes in other languages, and every placement in an
//! existing index depends on it. Blocks are read little-endian regardless of
//! platform.

const C1: u32 = 0xcc9e_2d51;
const C2: u32 = 0x1b87_3593;

/// MurmurHash3 x86 32-bit.
pub fn murmur3_32(data: &[u8], seed: u32) -> u32 {
    let mut h = seed;

    let mut blocks = data.chunks_exact(4);
    for block in &mut blocks {
        let k = u32::from_le_bytes([block[0], block[1], block[2], block[3]]);
        h ^= mix_k(k);
        h = h.rotate_left(13);
        h = h.wrapping_mul(5).wrapping_add(0xe654_6b64);
    }

    let tail = blocks.remainder();
    if !tail.is_empty() {
        let mut k = 0u32;
        for (i, &byte) in tail.iter().enumerate() {
            k |= (byte as u32) << (8 * i);
        }
        h ^= mix_k(k);
    }

    h ^= data.len() as u32;
    fmix32(h)
}

#[inline]
fn mix_k(k: u32) -> u32 {
    k.wrapping_mul(C1).rotate_left(15).wrapping_mul(C2)
}

#[inline]
fn fmix32(mut h: u32) -> u32 {
    h ^= h >> 16;
    h = h.wrapping_mul(0x85eb_ca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2_ae35);
    h ^= h >> 16;
    h
}

/// Page holding `key` in an index of `num_pages` pages.
pub fn page_index(key: &str, num_pages: u32) -> u32 {
    debug_assert!(num_pages > 0, "num_pages must be positive");
    murmur3_32(key.as_bytes(), 0) % num_pages
}
