//! The storage engine seam
//!
//! The load driver only needs four things from a store: open it, put a record, compact a key
//! range and close it. `StorageEngine` covers the last three, opening is left to each
//! implementation's constructor since every engine takes different arguments.
//!
//! Two engines are provided: `LevelDbEngine`, the real on-disk store, and `MemoryEngine`, a
//! `BTreeMap` that records every call made to it.

pub mod leveldb;
pub mod memory;

pub use self::leveldb::LevelDbEngine;
pub use self::memory::{EngineCall, MemoryEngine};

use std::error::Error;
use std::fmt;
use std::fmt::{Display, Formatter};
use std::ops::{Deref, DerefMut};

use log::{debug, error};

/// The write buffer is this many times the table size
pub const WRITE_BUFFER_FACTOR: usize = 4;

/// Which operation an `EngineError` came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineErrorKind {
    Open,
    Write,
    Compact,
    Close,
}

impl Display for EngineErrorKind {
    fn fmt(&self, f: &mut Formatter) -> Result<(), fmt::Error> {
        let name = match self {
            EngineErrorKind::Open => "open",
            EngineErrorKind::Write => "write",
            EngineErrorKind::Compact => "compact",
            EngineErrorKind::Close => "close",
        };
        write!(f, "{}", name)
    }
}

/// The error type used by engine module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineError {
    kind: EngineErrorKind,
    description: String
}

impl EngineError {
    pub fn new(kind: EngineErrorKind, description: &str) -> Self {
        EngineError { kind, description: description.to_owned() }
    }

    pub fn kind(&self) -> EngineErrorKind {
        self.kind
    }
}

impl Display for EngineError {
    fn fmt(&self, f: &mut Formatter) -> Result<(), fmt::Error> {
        write!(f, "engine {} error: {}", self.kind, self.description)
    }
}

impl Error for EngineError {
}

/// A key range to compact, unbounded on the sides that are `None`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyRange {
    pub start: Option<Vec<u8>>,
    pub end: Option<Vec<u8>>,
}

impl KeyRange {
    /// The whole key space
    pub fn full() -> Self {
        KeyRange { start: None, end: None }
    }
}

/// Tuning handed to an engine when it is opened
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    /// bytes buffered in the memtable before it is flushed
    pub write_buffer_size: usize,
    /// target size of a single on-disk table, in bytes
    pub table_size: usize,
    pub compression: bool,
    pub block_cache: bool,
    /// `None` means no limit
    pub max_open_files: Option<usize>,
}

impl EngineOptions {
    /// Derive the options used for a load run from a table size in kilobytes
    ///
    /// Compression and block cache are off so every write and read really hits the disk.
    ///
    /// ```
    ///     use diskload::engine::EngineOptions;
    ///     let options = EngineOptions::from_table_size_kb(1024);
    ///     assert_eq!(options.table_size, 1024 * 1024);
    ///     assert_eq!(options.write_buffer_size, 4 * 1024 * 1024);
    /// ```
    pub fn from_table_size_kb(table_size_kb: u64) -> Self {
        let table_size = (table_size_kb as usize).saturating_mul(1024);
        EngineOptions {
            write_buffer_size: table_size.saturating_mul(WRITE_BUFFER_FACTOR),
            table_size,
            compression: false,
            block_cache: false,
            max_open_files: None,
        }
    }
}

/// A store the load driver can write into
pub trait StorageEngine {
    /// Store `value` under `key`, forcing it to stable storage first if `sync` is set
    fn put(&mut self, key: &[u8], value: &[u8], sync: bool) -> Result<(), EngineError>;

    /// Compact `range` synchronously
    fn compact_range(&mut self, range: &KeyRange) -> Result<(), EngineError>;

    /// Flush and release the store. Later calls return `Ok(())` without doing anything.
    fn close(&mut self) -> Result<(), EngineError>;
}

/// Owns an engine and closes it exactly once
///
/// Call `close` to get the result of closing. A guard dropped without it closes the engine
/// anyway and logs a failure, so early returns never leak an open store.
pub struct EngineGuard<E: StorageEngine> {
    engine: E,
    closed: bool,
}

impl<E: StorageEngine> EngineGuard<E> {
    pub fn new(engine: E) -> Self {
        EngineGuard { engine, closed: false }
    }

    pub fn close(mut self) -> Result<(), EngineError> {
        self.closed = true;
        self.engine.close()
    }
}

impl<E: StorageEngine> Deref for EngineGuard<E> {
    type Target = E;

    fn deref(&self) -> &E {
        &self.engine
    }
}

impl<E: StorageEngine> DerefMut for EngineGuard<E> {
    fn deref_mut(&mut self) -> &mut E {
        &mut self.engine
    }
}

impl<E: StorageEngine> Drop for EngineGuard<E> {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        debug!("engine guard dropped while open, closing engine");
        if let Err(e) = self.engine.close() {
            error!("failed closing engine: {}", e);
        }
    }
}
