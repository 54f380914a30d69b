//! # Transactional Page Store
//!
//! A directory-based key-value store with snapshot readers and a single
//! writer. Values are kept in an append-only log; memory holds only the key
//! directory with the log location of each committed version.
//!
//! ```text
//! index_dir/
//! ├── CURRENT            # generation number of the active log segment
//! ├── LOCK               # advisory file lock, held by the writer
//! └── data.000001.log    # append-only log of transactions
//! ```
//!
//! ## Transactions
//!
//! - [`ReadTxn`]: a snapshot at the latest committed transaction. Readers
//!   never block each other or the writer, and never see uncommitted data.
//! - [`WriteTxn`]: exactly one at a time. In-process writers serialize on a
//!   mutex, writers in other processes on an exclusive lock of `LOCK`. A
//!   second writer blocks until the first commits or aborts.
//!
//! A write transaction streams its Put frames to the end of the log as it
//! goes and publishes them with a single Commit frame. Aborting (or dropping
//! the transaction) truncates the log back to where it started.
//!
//! ```text
//! begin_write ──> put ──> put ──> commit ──> publish ──> maybe compact
//!      │                   │
//!      │                   └──> (drop) truncate uncommitted frames
//!      └──> lock, refresh, truncate torn tail
//! ```
//!
//! ## Sharing Between Processes
//!
//! Every `begin_*` first picks up transactions committed by other processes:
//! it replays new frames at the end of the active segment and follows
//! `CURRENT` to a newer generation after a compaction.
//!
//! ## Compaction
//!
//! Superseded versions stay in the log until [`PageStore::compact`] rewrites
//! the latest value of every key into a new generation and swaps `CURRENT`
//! (write temp file, then rename). Readers holding older snapshots keep their
//! handle on the previous segment. Compaction runs automatically after a
//! commit once the log exceeds `compaction_min_bytes` and is more than
//! `compaction_ratio` times larger than the live data.
//!
//! ## Thread Safety
//!
//! `PageStore` is `Send + Sync` and cheap to clone. The key directory sits
//! behind a `parking_lot::RwLock`; value reads happen outside the lock using
//! positional I/O.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use eyre::{bail, ensure, Result, WrapErr};
use hashbrown::HashMap;
use parking_lot::{Mutex, MutexGuard, RwLock};
use zerocopy::IntoBytes;

use crate::config::{
    CURRENT_FILE_NAME, DEFAULT_COMPACTION_MIN_BYTES, DEFAULT_COMPACTION_RATIO, LOCK_FILE_NAME,
    LOG_FRAME_HEADER_SIZE, LOG_SEGMENT_HEADER_SIZE,
};
use crate::storage::log::{
    encode_commit, encode_put, put_frame_len, read_exact_at, scan_segment, write_all_at,
    CommittedTxn, PutRecord, SegmentHeader,
};
use crate::storage::snapshot::{SnapshotRegistry, TxnId, VersionChain};

const WRITE_BUFFER_SIZE: usize = 1 << 20;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StoreOptions {
    /// fsync the log on every commit.
    pub sync_on_commit: bool,
    /// Log size below which automatic compaction never runs.
    pub compaction_min_bytes: u64,
    /// Compact once log bytes exceed this multiple of live bytes.
    pub compaction_ratio: f64,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            sync_on_commit: true,
            compaction_min_bytes: DEFAULT_COMPACTION_MIN_BYTES,
            compaction_ratio: DEFAULT_COMPACTION_RATIO,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreStats {
    pub generation: u64,
    pub committed: TxnId,
    pub log_bytes: u64,
    pub live_bytes: u64,
    pub keys: usize,
    pub active_readers: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompactionStats {
    pub generation: u64,
    pub old_bytes: u64,
    pub new_bytes: u64,
}

#[derive(Debug)]
struct Segment {
    generation: u64,
    path: PathBuf,
    file: File,
}

fn segment_path(dir: &Path, generation: u64) -> PathBuf {
    dir.join(format!("data.{:06}.log", generation))
}

impl Segment {
    fn create(dir: &Path, generation: u64) -> Result<Self> {
        let path = segment_path(dir, generation);

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .wrap_err_with(|| format!("failed to create log segment '{}'", path.display()))?;

        write_all_at(&file, SegmentHeader::new(generation).as_bytes(), 0)
            .wrap_err_with(|| format!("failed to write header of '{}'", path.display()))?;

        file.sync_all()
            .wrap_err_with(|| format!("failed to sync '{}'", path.display()))?;

        Ok(Self {
            generation,
            path,
            file,
        })
    }

    fn open(dir: &Path, generation: u64) -> Result<Self> {
        let path = segment_path(dir, generation);

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .wrap_err_with(|| format!("failed to open log segment '{}'", path.display()))?;

        let mut header = [0u8; LOG_SEGMENT_HEADER_SIZE];
        read_exact_at(&file, &mut header, 0)
            .wrap_err_with(|| format!("failed to read header of '{}'", path.display()))?;
        let header = SegmentHeader::from_bytes(&header)
            .wrap_err_with(|| format!("invalid log segment '{}'", path.display()))?;

        ensure!(
            header.generation() == generation,
            "log segment '{}' holds generation {}, expected {}",
            path.display(),
            header.generation(),
            generation
        );

        Ok(Self {
            generation,
            path,
            file,
        })
    }

    fn len(&self) -> Result<u64> {
        Ok(self
            .file
            .metadata()
            .wrap_err_with(|| format!("failed to stat '{}'", self.path.display()))?
            .len())
    }
}

#[derive(Debug, Clone)]
struct Location {
    segment: Arc<Segment>,
    offset: u64,
    len: u32,
}

impl Location {
    fn read(&self) -> Result<Vec<u8>> {
        let mut value = vec![0u8; self.len as usize];
        read_exact_at(&self.segment.file, &mut value, self.offset).wrap_err_with(|| {
            format!(
                "failed to read {} bytes at offset {} of '{}'",
                self.len,
                self.offset,
                self.segment.path.display()
            )
        })?;
        Ok(value)
    }
}

fn live_frame_len(key: &str, value_len: u32) -> u64 {
    put_frame_len(key.len(), value_len as usize) as u64
}

struct State {
    keys: HashMap<String, VersionChain<Location>>,
    segment: Arc<Segment>,
    committed: TxnId,
    /// End of the last transaction applied from the active segment. Bytes
    /// past it are uncommitted or not yet replayed.
    applied_len: u64,
    live_bytes: u64,
}

impl State {
    /// Applies a committed transaction found in `segment`.
    ///
    /// Transactions newer than `committed` add versions. Older ones are
    /// compaction batches that only move the latest version to a new
    /// segment.
    fn apply(&mut self, segment: &Arc<Segment>, txn: CommittedTxn, watermark: TxnId) {
        let fresh = txn.txn_id > self.committed;

        for put in txn.puts {
            let location = Location {
                segment: Arc::clone(segment),
                offset: put.value_offset,
                len: put.value_len,
            };
            let frame_len = live_frame_len(&put.key, put.value_len);

            match self.keys.get_mut(put.key.as_str()) {
                Some(chain) => {
                    let previous = chain.latest().map_or(0, |l| live_frame_len(&put.key, l.len));
                    if fresh {
                        chain.push(txn.txn_id, location);
                    } else if let Some(latest) = chain.latest_mut() {
                        *latest = location;
                    }
                    chain.prune(watermark);
                    self.live_bytes = self.live_bytes - previous + frame_len;
                }
                None => {
                    self.keys.insert(put.key, VersionChain::new(txn.txn_id, location));
                    self.live_bytes += frame_len;
                }
            }
        }

        if fresh {
            self.committed = txn.txn_id;
        }
    }
}

struct Inner {
    dir: PathBuf,
    options: StoreOptions,
    state: RwLock<State>,
    writer: Mutex<()>,
    /// Set while this handle holds the `LOCK` file.
    writing: AtomicBool,
    lock_file: File,
    snapshots: SnapshotRegistry,
}

/// Holds writer exclusion for its lifetime, in-process and cross-process.
struct WriterLock<'a> {
    _guard: MutexGuard<'a, ()>,
    file: &'a File,
    writing: &'a AtomicBool,
}

impl Drop for WriterLock<'_> {
    fn drop(&mut self) {
        self.writing.store(false, Ordering::Release);
        if let Err(e) = self.file.unlock() {
            tracing::warn!(error = %e, "failed to release page store writer lock");
        }
    }
}

impl Inner {
    fn lock_writer(&self) -> Result<WriterLock<'_>> {
        let guard = self.writer.lock();
        self.lock_file.lock().wrap_err_with(|| {
            format!("failed to lock page store '{}' for writing", self.dir.display())
        })?;
        self.writing.store(true, Ordering::Release);
        Ok(WriterLock {
            _guard: guard,
            file: &self.lock_file,
            writing: &self.writing,
        })
    }

    /// Picks up commits from other processes, unless this handle holds the
    /// `LOCK` file and nobody else can be writing. A local writer still
    /// waiting for the lock does not count.
    fn refresh(&self) -> Result<()> {
        if self.writing.load(Ordering::Acquire) {
            return Ok(());
        }
        self.catch_up()
    }

    fn catch_up(&self) -> Result<()> {
        let generation = read_current(&self.dir)?;
        {
            let state = self.state.read();
            if generation == state.segment.generation && state.segment.len()? == state.applied_len {
                return Ok(());
            }
        }

        let mut state = self.state.write();
        self.replay_tail(&mut state)?;

        if generation > state.segment.generation {
            let segment = Arc::new(Segment::open(&self.dir, generation)?);
            tracing::info!(
                dir = %self.dir.display(),
                from = state.segment.generation,
                to = generation,
                "following compacted log generation"
            );
            state.segment = segment;
            state.applied_len = LOG_SEGMENT_HEADER_SIZE as u64;
            self.replay_tail(&mut state)?;
        }

        Ok(())
    }

    fn replay_tail(&self, state: &mut State) -> Result<()> {
        let segment = Arc::clone(&state.segment);

        let scan = scan_segment(&segment.file, state.applied_len)
            .wrap_err_with(|| format!("failed to replay '{}'", segment.path.display()))?;

        let replayed = scan.txns.len();
        for txn in scan.txns {
            let watermark = self.snapshots.watermark(txn.txn_id);
            state.apply(&segment, txn, watermark);
        }
        state.applied_len = scan.committed_end;

        if replayed > 0 {
            tracing::debug!(
                generation = segment.generation,
                replayed,
                committed = state.committed,
                "replayed log transactions"
            );
        }
        Ok(())
    }

    fn maybe_compact(&self) -> Result<()> {
        let (log_bytes, live_bytes) = {
            let state = self.state.read();
            (state.applied_len, state.live_bytes)
        };

        if log_bytes >= self.options.compaction_min_bytes
            && log_bytes as f64 > self.options.compaction_ratio * live_bytes as f64
        {
            self.compact_locked()?;
        }
        Ok(())
    }

    /// Rewrites the latest version of every key into a new generation. The
    /// caller holds the writer lock.
    fn compact_locked(&self) -> Result<CompactionStats> {
        let (old, committed, mut entries) = {
            let state = self.state.read();
            let entries: Vec<(String, Location)> = state
                .keys
                .iter()
                .filter_map(|(key, chain)| chain.latest().map(|l| (key.clone(), l.clone())))
                .collect();
            (Arc::clone(&state.segment), state.committed, entries)
        };
        entries.sort_unstable_by(|a, b| a.0.cmp(&b.0));

        let old_bytes = old.len()?;
        let generation = old.generation + 1;
        let segment = Segment::create(&self.dir, generation)?;

        let mut buffer = Vec::with_capacity(WRITE_BUFFER_SIZE);
        let mut flushed = LOG_SEGMENT_HEADER_SIZE as u64;
        let mut puts = Vec::with_capacity(entries.len());

        for (key, location) in entries {
            let value = location.read()?;
            let frame_start = flushed + buffer.len() as u64;
            encode_put(&mut buffer, committed, &key, &value)?;
            puts.push(PutRecord {
                value_offset: frame_start + (LOG_FRAME_HEADER_SIZE + key.len()) as u64,
                value_len: location.len,
                key,
            });

            if buffer.len() >= WRITE_BUFFER_SIZE {
                write_all_at(&segment.file, &buffer, flushed)
                    .wrap_err_with(|| format!("failed to write '{}'", segment.path.display()))?;
                flushed += buffer.len() as u64;
                buffer.clear();
            }
        }

        encode_commit(&mut buffer, committed, puts.len() as u32);
        write_all_at(&segment.file, &buffer, flushed)
            .wrap_err_with(|| format!("failed to write '{}'", segment.path.display()))?;
        flushed += buffer.len() as u64;

        segment
            .file
            .sync_all()
            .wrap_err_with(|| format!("failed to sync '{}'", segment.path.display()))?;
        write_current(&self.dir, generation)?;

        let segment = Arc::new(segment);
        {
            let mut state = self.state.write();
            let watermark = self.snapshots.watermark(committed);
            state.apply(
                &segment,
                CommittedTxn {
                    txn_id: committed,
                    puts,
                },
                watermark,
            );
            state.segment = segment;
            state.applied_len = flushed;
            state.live_bytes = flushed - LOG_SEGMENT_HEADER_SIZE as u64 - LOG_FRAME_HEADER_SIZE as u64;
        }

        drop(old);
        remove_stale_segments(&self.dir, generation);

        tracing::info!(
            dir = %self.dir.display(),
            generation,
            old_bytes,
            new_bytes = flushed,
            "compacted page store log"
        );

        Ok(CompactionStats {
            generation,
            old_bytes,
            new_bytes: flushed,
        })
    }
}

fn read_current(dir: &Path) -> Result<u64> {
    let path = dir.join(CURRENT_FILE_NAME);
    let text = fs::read_to_string(&path)
        .wrap_err_with(|| format!("failed to read '{}'", path.display()))?;
    text.trim()
        .parse()
        .wrap_err_with(|| format!("invalid generation in '{}': {:?}", path.display(), text))
}

fn write_current(dir: &Path, generation: u64) -> Result<()> {
    let path = dir.join(CURRENT_FILE_NAME);
    let tmp = dir.join(format!("{}.tmp", CURRENT_FILE_NAME));

    {
        let file = File::create(&tmp)
            .wrap_err_with(|| format!("failed to create '{}'", tmp.display()))?;
        write_all_at(&file, format!("{}\n", generation).as_bytes(), 0)
            .wrap_err_with(|| format!("failed to write '{}'", tmp.display()))?;
        file.sync_all()
            .wrap_err_with(|| format!("failed to sync '{}'", tmp.display()))?;
    }

    fs::rename(&tmp, &path)
        .wrap_err_with(|| format!("failed to install '{}'", path.display()))?;
    sync_dir(dir)
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> Result<()> {
    File::open(dir)
        .and_then(|d| d.sync_all())
        .wrap_err_with(|| format!("failed to sync directory '{}'", dir.display()))
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> Result<()> {
    Ok(())
}

/// Deletes segments older than `generation`. Segments still open elsewhere
/// may refuse deletion on some platforms; they are retried next time.
fn remove_stale_segments(dir: &Path, generation: u64) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };

    for entry in entries.flatten() {
        let name = entry.file_name();
        let Some(stale) = name
            .to_str()
            .and_then(|n| n.strip_prefix("data."))
            .and_then(|n| n.strip_suffix(".log"))
            .and_then(|n| n.parse::<u64>().ok())
        else {
            continue;
        };

        if stale < generation {
            if let Err(e) = fs::remove_file(entry.path()) {
                tracing::debug!(generation = stale, error = %e, "could not remove stale log segment");
            }
        }
    }
}

/// Handle to a page store directory.
#[derive(Clone)]
pub struct PageStore {
    inner: Arc<Inner>,
}

impl PageStore {
    /// Whether `dir` holds a page store.
    pub fn exists(dir: &Path) -> bool {
        dir.join(CURRENT_FILE_NAME).is_file()
    }

    pub fn create<P: AsRef<Path>>(dir: P, options: StoreOptions) -> Result<Self> {
        let dir = dir.as_ref();

        ensure!(
            !Self::exists(dir),
            "page store already exists at '{}'",
            dir.display()
        );

        fs::create_dir_all(dir)
            .wrap_err_with(|| format!("failed to create page store directory '{}'", dir.display()))?;

        Segment::create(dir, 1)?;
        write_current(dir, 1)?;

        Self::open(dir, options)
    }

    pub fn open<P: AsRef<Path>>(dir: P, options: StoreOptions) -> Result<Self> {
        let dir = dir.as_ref();

        if !Self::exists(dir) {
            bail!("no page store found at '{}'", dir.display());
        }

        let lock_path = dir.join(LOCK_FILE_NAME);
        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .wrap_err_with(|| format!("failed to open lock file '{}'", lock_path.display()))?;

        let generation = read_current(dir)?;
        let segment = Arc::new(Segment::open(dir, generation)?);

        let inner = Inner {
            dir: dir.to_path_buf(),
            options,
            state: RwLock::new(State {
                keys: HashMap::new(),
                segment,
                committed: 0,
                applied_len: LOG_SEGMENT_HEADER_SIZE as u64,
                live_bytes: 0,
            }),
            writer: Mutex::new(()),
            writing: AtomicBool::new(false),
            lock_file,
            snapshots: SnapshotRegistry::new(),
        };

        {
            let mut state = inner.state.write();
            inner.replay_tail(&mut state)?;
        }

        let store = Self {
            inner: Arc::new(inner),
        };

        tracing::debug!(
            dir = %dir.display(),
            generation,
            committed = store.stats().committed,
            "opened page store"
        );

        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.inner.dir
    }

    pub fn options(&self) -> &StoreOptions {
        &self.inner.options
    }

    pub fn begin_read(&self) -> Result<ReadTxn<'_>> {
        self.inner.refresh()?;

        let state = self.inner.state.read();
        let snapshot = state.committed;
        self.inner.snapshots.register(snapshot);
        drop(state);

        Ok(ReadTxn {
            inner: &self.inner,
            snapshot,
        })
    }

    pub fn begin_write(&self) -> Result<WriteTxn<'_>> {
        let lock = self.inner.lock_writer()?;
        self.inner.catch_up()?;

        let state = self.inner.state.read();
        let segment = Arc::clone(&state.segment);
        let start = state.applied_len;

        let len = segment.len()?;
        if len > start {
            tracing::warn!(
                segment = %segment.path.display(),
                torn_bytes = len - start,
                "truncating torn log tail"
            );
            segment
                .file
                .set_len(start)
                .wrap_err_with(|| format!("failed to truncate '{}'", segment.path.display()))?;
        }

        let txn_id = state.committed + 1;
        drop(state);

        Ok(WriteTxn {
            inner: &self.inner,
            _lock: lock,
            txn_id,
            segment,
            start,
            flushed: start,
            buffer: Vec::new(),
            pending: HashMap::new(),
            puts: 0,
            finished: false,
        })
    }

    /// Rewrites the log keeping only the latest version of every key.
    pub fn compact(&self) -> Result<CompactionStats> {
        let _lock = self.inner.lock_writer()?;
        self.inner.catch_up()?;
        self.inner.compact_locked()
    }

    pub fn stats(&self) -> StoreStats {
        let state = self.inner.state.read();
        StoreStats {
            generation: state.segment.generation,
            committed: state.committed,
            log_bytes: state.applied_len,
            live_bytes: state.live_bytes,
            keys: state.keys.len(),
            active_readers: self.inner.snapshots.active_readers(),
        }
    }
}

/// Snapshot read transaction.
pub struct ReadTxn<'a> {
    inner: &'a Inner,
    snapshot: TxnId,
}

impl ReadTxn<'_> {
    pub fn snapshot(&self) -> TxnId {
        self.snapshot
    }

    pub fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let location = {
            let state = self.inner.state.read();
            state
                .keys
                .get(key)
                .and_then(|chain| chain.visible(self.snapshot))
                .cloned()
        };

        location.map(|l| l.read()).transpose()
    }
}

impl Drop for ReadTxn<'_> {
    fn drop(&mut self) {
        self.inner.snapshots.release(self.snapshot);
    }
}

/// The single write transaction. Dropping it without `commit` aborts.
pub struct WriteTxn<'a> {
    inner: &'a Inner,
    _lock: WriterLock<'a>,
    txn_id: TxnId,
    segment: Arc<Segment>,
    start: u64,
    flushed: u64,
    buffer: Vec<u8>,
    pending: HashMap<String, (u64, u32)>,
    puts: u32,
    finished: bool,
}

impl WriteTxn<'_> {
    pub fn txn_id(&self) -> TxnId {
        self.txn_id
    }

    /// Reads `key`, seeing this transaction's own writes.
    pub fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        if let Some(&(offset, len)) = self.pending.get(key) {
            if offset >= self.flushed {
                let start = (offset - self.flushed) as usize;
                return Ok(Some(self.buffer[start..start + len as usize].to_vec()));
            }
            let mut value = vec![0u8; len as usize];
            read_exact_at(&self.segment.file, &mut value, offset)
                .wrap_err_with(|| format!("failed to read pending value of '{}'", key))?;
            return Ok(Some(value));
        }

        let location = {
            let state = self.inner.state.read();
            state.keys.get(key).and_then(|chain| chain.latest()).cloned()
        };
        location.map(|l| l.read()).transpose()
    }

    pub fn put(&mut self, key: &str, value: &[u8]) -> Result<()> {
        let frame_start = self.flushed + self.buffer.len() as u64;
        encode_put(&mut self.buffer, self.txn_id, key, value)
            .wrap_err_with(|| format!("failed to encode write of '{}'", key))?;

        let value_offset = frame_start + (LOG_FRAME_HEADER_SIZE + key.len()) as u64;
        self.pending
            .insert(key.to_string(), (value_offset, value.len() as u32));
        self.puts += 1;

        if self.buffer.len() >= WRITE_BUFFER_SIZE {
            self.flush()?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        write_all_at(&self.segment.file, &self.buffer, self.flushed)
            .wrap_err_with(|| format!("failed to append to '{}'", self.segment.path.display()))?;
        self.flushed += self.buffer.len() as u64;
        self.buffer.clear();
        Ok(())
    }

    /// Makes every write durable and visible to new readers.
    pub fn commit(mut self) -> Result<TxnId> {
        if self.puts == 0 {
            self.finished = true;
            return Ok(self.txn_id - 1);
        }

        encode_commit(&mut self.buffer, self.txn_id, self.puts);
        self.flush()?;

        if self.inner.options.sync_on_commit {
            self.segment
                .file
                .sync_data()
                .wrap_err_with(|| format!("failed to sync '{}'", self.segment.path.display()))?;
        }

        let puts: Vec<PutRecord> = self
            .pending
            .drain()
            .map(|(key, (value_offset, value_len))| PutRecord {
                key,
                value_offset,
                value_len,
            })
            .collect();

        {
            let mut state = self.inner.state.write();
            let watermark = self.inner.snapshots.watermark(self.txn_id);
            state.apply(
                &self.segment,
                CommittedTxn {
                    txn_id: self.txn_id,
                    puts,
                },
                watermark,
            );
            state.applied_len = self.flushed;
        }
        self.finished = true;

        tracing::debug!(txn_id = self.txn_id, puts = self.puts, "committed transaction");

        if let Err(e) = self.inner.maybe_compact() {
            tracing::warn!(error = %e, "automatic compaction failed");
        }

        Ok(self.txn_id)
    }

    /// Discards every write of this transaction.
    pub fn abort(self) {}
}

impl Drop for WriteTxn<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }

        if self.flushed > self.start {
            if let Err(e) = self.segment.file.set_len(self.start) {
                tracing::warn!(
                    segment = %self.segment.path.display(),
                    error = %e,
                    "failed to truncate aborted transaction, next writer will retry"
                );
            }
        }

        tracing::debug!(txn_id = self.txn_id, puts = self.puts, "aborted transaction");
    }
}
