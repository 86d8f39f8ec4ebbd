use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::backing::Backing;
use crate::error::AlmanacError;
use crate::record::{Almanac, ServiceRecord};

const EMPTY_ALMANAC: &[u8] = b"[]";

struct Inner<B> {
    almanac: Almanac,
    backing: B,
}

/// File-style store for the [`Almanac`].
///
/// The almanac is loaded once at construction and kept in memory. Each
/// [`record_run`](Self::record_run) rewrites the whole document: the backing
/// is truncated, rewound and written in full. The in-memory copy only
/// advances once that write has succeeded.
///
/// All reads and the read-modify-write cycle share one mutex, so concurrent
/// runs against the same store never lose an update.
pub struct AlmanacStore<B> {
    inner: Mutex<Inner<B>>,
}

impl AlmanacStore<File> {
    /// Open (creating if needed) the almanac file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AlmanacError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path.as_ref())
            .map_err(AlmanacError::io("open"))?;
        Self::new(file)
    }
}

impl<B: Backing> AlmanacStore<B> {
    /// Load the almanac from `backing`.
    ///
    /// A zero-length backing is initialized with an empty JSON array.
    pub fn new(mut backing: B) -> Result<Self, AlmanacError> {
        let almanac = load(&mut backing)?;
        tracing::debug!(services = almanac.len(), "almanac loaded");
        Ok(Self {
            inner: Mutex::new(Inner { almanac, backing }),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Inner<B>> {
        // The guarded state is only replaced after a successful write, so a
        // panic while holding the lock cannot leave it half-updated.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of completed runs for `name`, or 0 if unknown.
    pub fn run_count(&self, name: &str) -> u64 {
        self.lock().almanac.run_count(name)
    }

    /// Latest score for `name`, or 0 if unknown.
    pub fn score(&self, name: &str) -> i64 {
        self.lock().almanac.score(name)
    }

    /// All records, most-run service first.
    pub fn list(&self) -> Vec<ServiceRecord> {
        self.lock().almanac.sorted()
    }

    /// A copy of the almanac in on-disk order.
    pub fn snapshot(&self) -> Almanac {
        self.lock().almanac.clone()
    }

    /// Fold one completed run into the almanac and persist it.
    ///
    /// On error nothing changes, in memory or on disk beyond the failed
    /// write itself.
    pub fn record_run(&self, name: &str, score: i64) -> Result<(), AlmanacError> {
        let mut inner = self.lock();

        let mut next = inner.almanac.clone();
        next.record(name, score);
        let bytes = next.to_json()?;

        rewrite(&mut inner.backing, &bytes)?;
        inner.almanac = next;

        tracing::debug!(
            service = name,
            run_count = inner.almanac.run_count(name),
            score,
            "almanac updated"
        );
        Ok(())
    }

    /// Release the backing store.
    pub fn into_backing(self) -> B {
        self.inner
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
            .backing
    }
}

fn load<B: Backing>(backing: &mut B) -> Result<Almanac, AlmanacError> {
    backing
        .seek(SeekFrom::Start(0))
        .map_err(AlmanacError::io("seek"))?;

    if backing.byte_len().map_err(AlmanacError::io("stat"))? == 0 {
        backing
            .write_all(EMPTY_ALMANAC)
            .map_err(AlmanacError::io("initialize"))?;
        backing.sync().map_err(AlmanacError::io("initialize"))?;
        backing
            .seek(SeekFrom::Start(0))
            .map_err(AlmanacError::io("seek"))?;
    }

    let mut bytes = Vec::new();
    backing
        .read_to_end(&mut bytes)
        .map_err(AlmanacError::io("read"))?;
    Ok(Almanac::from_json(&bytes)?)
}

fn rewrite<B: Backing>(backing: &mut B, bytes: &[u8]) -> Result<(), AlmanacError> {
    backing.truncate().map_err(AlmanacError::io("truncate"))?;
    backing
        .seek(SeekFrom::Start(0))
        .map_err(AlmanacError::io("seek"))?;
    backing
        .write_all(bytes)
        .map_err(AlmanacError::io("write"))?;
    backing.sync().map_err(AlmanacError::io("sync"))
}
