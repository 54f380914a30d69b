//! # Commit Log Format
//!
//! The page store keeps every committed write in an append-only log segment.
//! A segment is a fixed header followed by frames:
//!
//! ```text
//! data.000001.log
//! +----------------+-----------+-----------+-----------+--------------+----
//! | SegmentHeader  | Put       | Put       | Commit    | Put          | ...
//! | (32 bytes)     | txn 1     | txn 1     | txn 1 (2) | txn 2        |
//! +----------------+-----------+-----------+-----------+--------------+----
//! ```
//!
//! ## Frame Format
//!
//! ```text
//! +---------------------------+-----------+---------------+
//! | FrameHeader (32 bytes)    | key bytes | value bytes   |
//! +---------------------------+-----------+---------------+
//!
//! FrameHeader:
//!   kind       u8    1 = Put, 2 = Commit
//!   reserved   [u8; 3]
//!   key_len    u32   UTF-8 key length (0 for Commit)
//!   value_len  u32   value length (0 for Commit)
//!   count      u32   number of Put frames in the transaction (Commit only)
//!   txn_id     u64
//!   checksum   u64   CRC-64/ECMA-182 over header[..24] + key + value
//! ```
//!
//! All integers are little-endian.
//!
//! ## Replay
//!
//! A transaction is applied only when its Commit frame is present, its
//! checksum is valid and its count matches the Put frames seen. Scanning
//! stops at the first frame that is short, malformed or fails its checksum;
//! everything after the last valid Commit is a torn tail. A writer truncates
//! the torn tail before appending.
//!
//! ## Positional I/O
//!
//! Segment files are shared by concurrent readers and one writer, so every
//! access is positional (`pread`/`pwrite` on unix, `seek_read`/`seek_write`
//! on Windows) and never moves a shared file cursor.

use std::fs::File;
use std::io::{self, BufReader, Read};

use crc::{Crc, CRC_64_ECMA_182};
use eyre::{ensure, Result, WrapErr};
use zerocopy::little_endian::{U32, U64};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::config::{
    LOG_FORMAT_VERSION, LOG_FRAME_HEADER_SIZE, LOG_MAGIC, LOG_SEGMENT_HEADER_SIZE, MAX_KEY_LEN,
    MAX_VALUE_LEN,
};
use crate::storage::snapshot::TxnId;

const CRC64: Crc<u64> = Crc::<u64>::new(&CRC_64_ECMA_182);

/// Bytes of the frame header covered by the checksum.
const CHECKSUMMED_HEADER_LEN: usize = 24;

const SCAN_BUFFER_SIZE: usize = 1 << 20;

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct SegmentHeader {
    magic: [u8; 16],
    version: U32,
    reserved: [u8; 4],
    generation: U64,
}

const _: () = assert!(std::mem::size_of::<SegmentHeader>() == LOG_SEGMENT_HEADER_SIZE);

impl SegmentHeader {
    pub fn new(generation: u64) -> Self {
        Self {
            magic: *LOG_MAGIC,
            version: U32::new(LOG_FORMAT_VERSION),
            reserved: [0; 4],
            generation: U64::new(generation),
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        ensure!(
            bytes.len() >= LOG_SEGMENT_HEADER_SIZE,
            "buffer too small for SegmentHeader: {} < {}",
            bytes.len(),
            LOG_SEGMENT_HEADER_SIZE
        );

        let header = Self::read_from_bytes(&bytes[..LOG_SEGMENT_HEADER_SIZE])
            .map_err(|e| eyre::eyre!("failed to parse SegmentHeader: {:?}", e))?;

        ensure!(&header.magic == LOG_MAGIC, "invalid magic bytes in log segment");
        ensure!(
            header.version() == LOG_FORMAT_VERSION,
            "unsupported log format version: {} (expected {})",
            header.version(),
            LOG_FORMAT_VERSION
        );

        Ok(header)
    }

    le_fields! {
        version: U32 => u32,
        generation: U64 => u64,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FrameKind {
    Put = 1,
    Commit = 2,
}

impl FrameKind {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(FrameKind::Put),
            2 => Some(FrameKind::Commit),
            _ => None,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct FrameHeader {
    kind: u8,
    reserved: [u8; 3],
    key_len: U32,
    value_len: U32,
    count: U32,
    txn_id: U64,
    checksum: U64,
}

const _: () = assert!(std::mem::size_of::<FrameHeader>() == LOG_FRAME_HEADER_SIZE);

impl FrameHeader {
    fn new(kind: FrameKind, key_len: u32, value_len: u32, count: u32, txn_id: TxnId) -> Self {
        Self {
            kind: kind as u8,
            reserved: [0; 3],
            key_len: U32::new(key_len),
            value_len: U32::new(value_len),
            count: U32::new(count),
            txn_id: U64::new(txn_id),
            checksum: U64::new(0),
        }
    }

    pub fn kind(&self) -> Option<FrameKind> {
        FrameKind::from_u8(self.kind)
    }

    le_fields! {
        key_len: U32 => u32,
        value_len: U32 => u32,
        count: U32 => u32,
        txn_id: U64 => u64,
        mut checksum: U64 => u64,
    }

    pub fn compute_checksum(&self, key: &[u8], value: &[u8]) -> u64 {
        let mut digest = CRC64.digest();
        digest.update(&self.as_bytes()[..CHECKSUMMED_HEADER_LEN]);
        digest.update(key);
        digest.update(value);
        digest.finalize()
    }
}

/// Total size of a Put frame.
pub fn put_frame_len(key_len: usize, value_len: usize) -> usize {
    LOG_FRAME_HEADER_SIZE + key_len + value_len
}

/// Appends a Put frame to `buf`.
pub fn encode_put(buf: &mut Vec<u8>, txn_id: TxnId, key: &str, value: &[u8]) -> Result<()> {
    ensure!(
        key.len() <= MAX_KEY_LEN,
        "key of {} bytes exceeds maximum {}",
        key.len(),
        MAX_KEY_LEN
    );
    ensure!(
        value.len() <= MAX_VALUE_LEN,
        "value of {} bytes exceeds maximum {}",
        value.len(),
        MAX_VALUE_LEN
    );

    let mut header = FrameHeader::new(
        FrameKind::Put,
        key.len() as u32,
        value.len() as u32,
        0,
        txn_id,
    );
    header.set_checksum(header.compute_checksum(key.as_bytes(), value));

    buf.reserve(put_frame_len(key.len(), value.len()));
    buf.extend_from_slice(header.as_bytes());
    buf.extend_from_slice(key.as_bytes());
    buf.extend_from_slice(value);
    Ok(())
}

/// Appends the Commit frame closing a transaction of `count` puts.
pub fn encode_commit(buf: &mut Vec<u8>, txn_id: TxnId, count: u32) {
    let mut header = FrameHeader::new(FrameKind::Commit, 0, 0, count, txn_id);
    header.set_checksum(header.compute_checksum(&[], &[]));
    buf.extend_from_slice(header.as_bytes());
}

/// A Put frame of a committed transaction, located in its segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutRecord {
    pub key: String,
    pub value_offset: u64,
    pub value_len: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommittedTxn {
    pub txn_id: TxnId,
    pub puts: Vec<PutRecord>,
}

#[derive(Debug, Default)]
pub struct Scan {
    pub txns: Vec<CommittedTxn>,
    /// Offset just past the last valid Commit frame.
    pub committed_end: u64,
}

/// Scans frames starting at `start` and collects committed transactions.
pub fn scan_segment(file: &File, start: u64) -> Result<Scan> {
    let mut reader = BufReader::with_capacity(SCAN_BUFFER_SIZE, PositionalReader::new(file, start));

    let mut scan = Scan {
        txns: Vec::new(),
        committed_end: start,
    };
    let mut offset = start;
    let mut pending: Option<CommittedTxn> = None;
    let mut header_buf = [0u8; LOG_FRAME_HEADER_SIZE];
    let mut key_buf = Vec::new();
    let mut value_buf = Vec::new();

    loop {
        if !read_frame_part(&mut reader, &mut header_buf)? {
            break;
        }
        let Ok(header) = FrameHeader::read_from_bytes(&header_buf) else {
            break;
        };

        let key_len = header.key_len() as usize;
        let value_len = header.value_len() as usize;
        if key_len > MAX_KEY_LEN || value_len > MAX_VALUE_LEN {
            tracing::debug!(offset, key_len, value_len, "log frame lengths out of range, stopping replay");
            break;
        }

        key_buf.resize(key_len, 0);
        value_buf.resize(value_len, 0);
        if !read_frame_part(&mut reader, &mut key_buf)? || !read_frame_part(&mut reader, &mut value_buf)? {
            break;
        }

        if header.compute_checksum(&key_buf, &value_buf) != header.checksum() {
            tracing::debug!(offset, "log frame checksum mismatch, stopping replay");
            break;
        }

        let frame_len = put_frame_len(key_len, value_len) as u64;
        let txn_id = header.txn_id();

        match header.kind() {
            Some(FrameKind::Put) => {
                let Ok(key) = std::str::from_utf8(&key_buf) else {
                    break;
                };
                let txn = pending.get_or_insert_with(|| CommittedTxn {
                    txn_id,
                    puts: Vec::new(),
                });
                if txn.txn_id != txn_id {
                    break;
                }
                txn.puts.push(PutRecord {
                    key: key.to_string(),
                    value_offset: offset + (LOG_FRAME_HEADER_SIZE + key_len) as u64,
                    value_len: value_len as u32,
                });
            }
            Some(FrameKind::Commit) => {
                let txn = pending.take().unwrap_or(CommittedTxn {
                    txn_id,
                    puts: Vec::new(),
                });
                if txn.txn_id != txn_id || txn.puts.len() != header.count() as usize {
                    tracing::debug!(offset, txn_id, "commit frame does not match its puts, stopping replay");
                    break;
                }
                scan.txns.push(txn);
                scan.committed_end = offset + frame_len;
            }
            None => break,
        }

        offset += frame_len;
    }

    Ok(scan)
}

/// Fills `buf` completely. Returns false if the segment ends first.
fn read_frame_part<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<bool> {
    match reader.read_exact(buf) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e).wrap_err("failed to read log segment"),
    }
}

/// `Read` over a file that never touches the shared cursor.
pub struct PositionalReader<'a> {
    file: &'a File,
    offset: u64,
}

impl<'a> PositionalReader<'a> {
    pub fn new(file: &'a File, offset: u64) -> Self {
        Self { file, offset }
    }
}

impl Read for PositionalReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = read_at(self.file, buf, self.offset)?;
        self.offset += n as u64;
        Ok(n)
    }
}

#[cfg(unix)]
fn read_at(file: &File, buf: &mut [u8], offset: u64) -> io::Result<usize> {
    std::os::unix::fs::FileExt::read_at(file, buf, offset)
}

#[cfg(windows)]
fn read_at(file: &File, buf: &mut [u8], offset: u64) -> io::Result<usize> {
    std::os::windows::fs::FileExt::seek_read(file, buf, offset)
}

pub fn read_exact_at(file: &File, mut buf: &mut [u8], mut offset: u64) -> io::Result<()> {
    while !buf.is_empty() {
        match read_at(file, buf, offset) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "log segment ended inside a value",
                ))
            }
            Ok(n) => {
                buf = &mut buf[n..];
                offset += n as u64;
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

#[cfg(unix)]
pub fn write_all_at(file: &File, buf: &[u8], offset: u64) -> io::Result<()> {
    std::os::unix::fs::FileExt::write_all_at(file, buf, offset)
}

#[cfg(windows)]
pub fn write_all_at(file: &File, mut buf: &[u8], mut offset: u64) -> io::Result<()> {
    while !buf.is_empty() {
        match std::os::windows::fs::FileExt::seek_write(file, buf, offset) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::WriteZero,
                    "failed to write log frame",
                ))
            }
            Ok(n) => {
                buf = &buf[n..];
                offset += n as u64;
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempfile;

    fn segment_with(frames: &[u8]) -> File {
        let mut file = tempfile().unwrap();
        file.write_all(SegmentHeader::new(1).as_bytes()).unwrap();
        file.write_all(frames).unwrap();
        file
    }

    fn txn(buf: &mut Vec<u8>, txn_id: TxnId, puts: &[(&str, &[u8])]) {
        for (key, value) in puts {
            encode_put(buf, txn_id, key, value).unwrap();
        }
        encode_commit(buf, txn_id, puts.len() as u32);
    }

    #[test]
    fn segment_header_roundtrip() {
        let header = SegmentHeader::new(42);

        let parsed = SegmentHeader::from_bytes(header.as_bytes()).unwrap();

        assert_eq!(parsed.generation(), 42);
        assert_eq!(parsed.version(), LOG_FORMAT_VERSION);
    }

    #[test]
    fn segment_header_rejects_bad_magic() {
        let mut bytes = SegmentHeader::new(1).as_bytes().to_vec();
        bytes[0] = b'X';

        assert!(SegmentHeader::from_bytes(&bytes).is_err());
    }

    #[test]
    fn scan_committed_transactions() {
        let mut frames = Vec::new();
        txn(&mut frames, 1, &[("metadata", b"meta"), ("page_0", b"zero")]);
        txn(&mut frames, 2, &[("page_0", b"updated")]);
        let file = segment_with(&frames);

        let start = LOG_SEGMENT_HEADER_SIZE as u64;
        let scan = scan_segment(&file, start).unwrap();

        assert_eq!(scan.txns.len(), 2);
        assert_eq!(scan.committed_end, start + frames.len() as u64);
        assert_eq!(scan.txns[0].puts[1].key, "page_0");

        let put = &scan.txns[1].puts[0];
        let mut value = vec![0u8; put.value_len as usize];
        read_exact_at(&file, &mut value, put.value_offset).unwrap();
        assert_eq!(value, b"updated");
    }

    #[test]
    fn uncommitted_tail_is_ignored() {
        let mut frames = Vec::new();
        txn(&mut frames, 1, &[("a", b"1")]);
        let committed = frames.len();
        encode_put(&mut frames, 2, "b", b"2").unwrap();
        let file = segment_with(&frames);

        let start = LOG_SEGMENT_HEADER_SIZE as u64;
        let scan = scan_segment(&file, start).unwrap();

        assert_eq!(scan.txns.len(), 1);
        assert_eq!(scan.committed_end, start + committed as u64);
    }

    #[test]
    fn torn_frame_stops_replay() {
        let mut frames = Vec::new();
        txn(&mut frames, 1, &[("a", b"1")]);
        let committed = frames.len();
        txn(&mut frames, 2, &[("b", b"some longer value")]);
        frames.truncate(frames.len() - 10);
        let file = segment_with(&frames);

        let start = LOG_SEGMENT_HEADER_SIZE as u64;
        let scan = scan_segment(&file, start).unwrap();

        assert_eq!(scan.txns.len(), 1);
        assert_eq!(scan.committed_end, start + committed as u64);
    }

    #[test]
    fn corrupted_value_fails_checksum() {
        let mut frames = Vec::new();
        txn(&mut frames, 1, &[("a", b"1")]);
        txn(&mut frames, 2, &[("b", b"value")]);
        let first = put_frame_len(1, 1) + LOG_FRAME_HEADER_SIZE;
        let value_pos = first + LOG_FRAME_HEADER_SIZE + 1;
        frames[value_pos] ^= 0xff;
        let file = segment_with(&frames);

        let scan = scan_segment(&file, LOG_SEGMENT_HEADER_SIZE as u64).unwrap();

        assert_eq!(scan.txns.len(), 1);
        assert_eq!(scan.txns[0].txn_id, 1);
    }

    #[test]
    fn commit_count_must_match_puts() {
        let mut frames = Vec::new();
        encode_put(&mut frames, 1, "a", b"1").unwrap();
        encode_commit(&mut frames, 1, 2);
        let file = segment_with(&frames);

        let scan = scan_segment(&file, LOG_SEGMENT_HEADER_SIZE as u64).unwrap();

        assert!(scan.txns.is_empty());
    }

    #[test]
    fn oversized_key_is_rejected() {
        let key = "k".repeat(MAX_KEY_LEN + 1);

        assert!(encode_put(&mut Vec::new(), 1, &key, b"").is_err());
    }
}
