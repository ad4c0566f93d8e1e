//! `StorageEngine` on top of `rusty_leveldb`
use std::path::{Path, PathBuf};

use log::{debug, info};
use rusty_leveldb::{compressor, CompressorId, Options, Status, WriteBatch, DB};

use crate::engine::{EngineError, EngineErrorKind, EngineOptions, KeyRange, StorageEngine};

/// Stand-in for "no limit" on open files. The table cache is sized from it, so it has to stay
/// a sane number.
pub const UNLIMITED_OPEN_FILES: usize = 1 << 16;

/// Upper bound used when compacting the full key range. Longer than any generated key, so it
/// sorts after all of them.
const FULL_RANGE_END: [u8; 64] = [0xff; 64];

fn engine_error(kind: EngineErrorKind, status: Status) -> EngineError {
    EngineError::new(kind, &status.to_string())
}

pub struct LevelDbEngine {
    db: DB,
    path: PathBuf,
    closed: bool,
}

impl LevelDbEngine {
    /// Open or create the store at `path`
    pub fn open<P: AsRef<Path>>(path: P, options: &EngineOptions) -> Result<Self, EngineError> {
        let path = path.as_ref().to_path_buf();
        let opt = LevelDbEngine::leveldb_options(options);
        debug!("opening leveldb at {} with write buffer {} bytes, max file size {} bytes",
               path.display(), opt.write_buffer_size, opt.max_file_size);
        let db = DB::open(&path, opt).map_err(|e| engine_error(EngineErrorKind::Open, e))?;
        info!("opened store at {}", path.display());
        Ok(LevelDbEngine { db, path, closed: false })
    }

    /// Translate `EngineOptions` into leveldb options
    ///
    /// The engine refuses a zero sized block cache, so "no block cache" keeps room for a single
    /// block.
    pub fn leveldb_options(options: &EngineOptions) -> Options {
        let mut opt = Options::default();
        opt.create_if_missing = true;
        opt.write_buffer_size = options.write_buffer_size;
        opt.max_file_size = options.table_size;
        opt.compressor = if options.compression {
            compressor::SnappyCompressor::ID
        } else {
            compressor::NoneCompressor::ID
        };
        if !options.block_cache {
            opt.block_cache_capacity_bytes = opt.block_size;
        }
        opt.max_open_files = options.max_open_files.unwrap_or(UNLIMITED_OPEN_FILES);
        opt
    }

    /// Read a value back
    pub fn get(&mut self, key: &[u8]) -> Option<Vec<u8>> {
        self.db.get(key).map(|v| v.to_vec())
    }
}

impl StorageEngine for LevelDbEngine {
    fn put(&mut self, key: &[u8], value: &[u8], sync: bool) -> Result<(), EngineError> {
        let mut batch = WriteBatch::default();
        batch.put(key, value);
        self.db.write(batch, sync).map_err(|e| engine_error(EngineErrorKind::Write, e))
    }

    fn compact_range(&mut self, range: &KeyRange) -> Result<(), EngineError> {
        let from = range.start.as_deref().unwrap_or(&[]);
        let to = range.end.as_deref().unwrap_or(&FULL_RANGE_END);
        self.db.compact_range(from, to).map_err(|e| engine_error(EngineErrorKind::Compact, e))
    }

    fn close(&mut self) -> Result<(), EngineError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.db.close().map_err(|e| engine_error(EngineErrorKind::Close, e))?;
        debug!("closed store at {}", self.path.display());
        Ok(())
    }
}
