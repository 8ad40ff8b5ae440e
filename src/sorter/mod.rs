//! External sorter.
//!
//! A [`Sorter`] accepts key-value pairs in any order and produces them in
//! strictly increasing key order with duplicate keys merged.
//!
//! Entries are buffered in memory. When the buffer exceeds the configured
//! memory budget it is sorted, duplicate keys are merged, and the run is
//! spilled to a temporary table. Draining the sorter performs a k-way merge
//! over all spilled runs and the final in-memory run.
//!
//! ## Duplicate keys
//!
//! Values for equal keys are combined by the [`MergePolicy`] in the order
//! they were added: the policy always receives the older value first.

pub mod merge;

pub use merge::MergeIterator;

use crate::config::{SorterOptions, WriterOptions};
use crate::error::{Error, Result};
use crate::table::{Reader, Writer};
use crate::Entry;
use merge::Source;
use std::fmt;
use std::path::PathBuf;
use tempfile::TempDir;

/// Memory charged per buffered entry on top of its key and value bytes.
const ENTRY_OVERHEAD: usize = std::mem::size_of::<Entry>();

/// User-supplied merge function: `(key, older_value, newer_value) -> merged`.
pub type MergeFn = Box<dyn Fn(&[u8], &[u8], &[u8]) -> Vec<u8> + Send + Sync>;

/// Rule used to combine the values of entries that share a key.
#[derive(Default)]
pub enum MergePolicy {
    /// Keep the most recently added value.
    #[default]
    LastWriteWins,
    /// Keep the first value added.
    FirstWriteWins,
    /// Combine values with a function of `(key, older, newer)`.
    Custom(MergeFn),
}

impl MergePolicy {
    /// Build a [`MergePolicy::Custom`] from a closure.
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&[u8], &[u8], &[u8]) -> Vec<u8> + Send + Sync + 'static,
    {
        MergePolicy::Custom(Box::new(f))
    }

    /// Merge two values for `key`, `older` having been added first.
    pub fn merge(&self, key: &[u8], older: &[u8], newer: &[u8]) -> Vec<u8> {
        match self {
            MergePolicy::LastWriteWins => newer.to_vec(),
            MergePolicy::FirstWriteWins => older.to_vec(),
            MergePolicy::Custom(f) => f(key, older, newer),
        }
    }

    pub(crate) fn merge_into(&self, key: &[u8], acc: &mut Vec<u8>, newer: Vec<u8>) {
        match self {
            MergePolicy::LastWriteWins => *acc = newer,
            MergePolicy::FirstWriteWins => {}
            MergePolicy::Custom(f) => *acc = f(key, acc.as_slice(), &newer),
        }
    }
}

impl fmt::Debug for MergePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergePolicy::LastWriteWins => f.write_str("LastWriteWins"),
            MergePolicy::FirstWriteWins => f.write_str("FirstWriteWins"),
            MergePolicy::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Open,
    /// Drained by `iter` or `write`; spill files are still on disk.
    Finished,
    Closed,
}

/// External sorter that spills sorted runs to disk.
///
/// Usage:
/// ```no_run
/// use mtbl::{Sorter, SorterOptions, Writer, WriterOptions};
///
/// let mut sorter = Sorter::new(SorterOptions::default()).unwrap();
/// sorter.add(b"bbb", b"2").unwrap();
/// sorter.add(b"aaa", b"1").unwrap();
///
/// let mut writer = Writer::create("sorted.mtbl", WriterOptions::default()).unwrap();
/// sorter.write(&mut writer).unwrap();
/// sorter.close().unwrap();
/// writer.close().unwrap();
/// ```
#[derive(Debug)]
pub struct Sorter {
    options: SorterOptions,
    max_memory: usize,
    buffer: Vec<Entry>,
    buffer_bytes: usize,
    spill_dir: Option<TempDir>,
    spills: Vec<PathBuf>,
    state: State,
}

impl Sorter {
    /// Create a sorter. Fails with [`Error::InvalidArgument`] for invalid options.
    pub fn new(options: SorterOptions) -> Result<Self> {
        options.validate()?;
        let max_memory = options.effective_max_memory();

        Ok(Self {
            options,
            max_memory,
            buffer: Vec::new(),
            buffer_bytes: 0,
            spill_dir: None,
            spills: Vec::new(),
            state: State::Open,
        })
    }

    fn check_open(&self, what: impl FnOnce() -> String) -> Result<()> {
        match self.state {
            State::Open => Ok(()),
            State::Finished => Err(Error::already_closed(format!("{}: sorter already written", what()))),
            State::Closed => Err(Error::already_closed(format!("{}: sorter closed", what()))),
        }
    }

    /// Add a key-value pair. Keys may arrive in any order and may repeat.
    pub fn add(&mut self, key: impl AsRef<[u8]>, value: impl AsRef<[u8]>) -> Result<()> {
        let (key, value) = (key.as_ref(), value.as_ref());
        self.check_open(|| format!("Failed to add key {}", key.escape_ascii()))?;

        self.buffer_bytes += key.len() + value.len() + ENTRY_OVERHEAD;
        self.buffer.push((key.to_vec(), value.to_vec()));

        if self.buffer_bytes >= self.max_memory {
            self.spill()?;
        }

        Ok(())
    }

    /// Sort the buffer and write it out as a new spill file.
    fn spill(&mut self) -> Result<()> {
        let run = sort_and_merge(std::mem::take(&mut self.buffer), &self.options.merge_policy);
        self.buffer_bytes = 0;

        let dir = match &self.spill_dir {
            Some(dir) => dir.path().to_path_buf(),
            None => {
                let mut builder = tempfile::Builder::new();
                builder.prefix(".mtbl-sort-");
                let dir = match &self.options.temp_dir {
                    Some(parent) => builder.tempdir_in(parent)?,
                    None => builder.tempdir()?,
                };
                let path = dir.path().to_path_buf();
                self.spill_dir = Some(dir);
                path
            }
        };

        let path = dir.join(format!("run-{:06}.mtbl", self.spills.len()));
        let mut writer = Writer::create(&path, WriterOptions::default())?;
        for (key, value) in &run {
            writer.add(key, value)?;
        }
        writer.close()?;

        log::debug!("Spilled run {} with {} entries to {:?}", self.spills.len(), run.len(), path);
        self.spills.push(path);
        Ok(())
    }

    /// Finish the sorter and return the merged, strictly increasing stream.
    ///
    /// Fails with [`Error::AlreadyClosed`] if the sorter was already drained
    /// or closed.
    pub fn iter(&mut self) -> Result<MergeIterator<'_>> {
        self.check_open(|| "Failed to iterate".to_string())?;
        self.state = State::Finished;

        let final_run = sort_and_merge(std::mem::take(&mut self.buffer), &self.options.merge_policy);
        self.buffer_bytes = 0;

        let mut sources: Vec<Source<'_>> = Vec::with_capacity(self.spills.len() + 1);
        for path in &self.spills {
            sources.push(Box::new(Reader::open(path)?.iter()));
        }
        sources.push(Box::new(final_run.into_iter().map(Ok)));

        MergeIterator::new(sources, &self.options.merge_policy)
    }

    /// Drain the sorter into `writer`, returning the number of entries written.
    pub fn write(&mut self, writer: &mut Writer) -> Result<u64> {
        let spills = self.spills.len();
        let mut count = 0u64;
        for entry in self.iter()? {
            let (key, value) = entry?;
            writer.add(key, value)?;
            count += 1;
        }

        log::info!("Sorter wrote {} entries from {} spilled runs to {:?}", count, spills, writer.path());
        Ok(count)
    }

    /// Release all spill files.
    ///
    /// Calling `close` a second time fails with [`Error::AlreadyClosed`].
    pub fn close(&mut self) -> Result<()> {
        if self.state == State::Closed {
            return Err(Error::already_closed("Sorter is already closed"));
        }
        self.state = State::Closed;
        self.buffer = Vec::new();
        self.buffer_bytes = 0;
        self.spills.clear();

        if let Some(dir) = self.spill_dir.take() {
            dir.close()?;
        }
        Ok(())
    }

    /// Number of runs spilled to disk so far
    pub fn num_spills(&self) -> usize {
        self.spills.len()
    }

    /// Number of entries currently held in memory
    pub fn buffered_entries(&self) -> usize {
        self.buffer.len()
    }
}

/// Stable-sort by key and fold adjacent duplicates in insertion order.
fn sort_and_merge(mut entries: Vec<Entry>, policy: &MergePolicy) -> Vec<Entry> {
    entries.sort_by(|a, b| a.0.cmp(&b.0));

    let mut merged: Vec<Entry> = Vec::with_capacity(entries.len());
    for (key, value) in entries {
        match merged.last_mut() {
            Some((last_key, last_value)) if *last_key == key => {
                policy.merge_into(&key, last_value, value)
            }
            _ => merged.push((key, value)),
        }
    }
    merged
}
