//! Disk load generator for LevelDB style stores
//!
//! `diskload` writes thousands of synthetic 4 KiB records into a store, in batches of one
//! thousand, optionally compacting after every batch. It is meant to stress the write path of
//! an LSM engine: memtable flushes, the write-ahead log and compaction.
//!
//! ```no_run
//!     use diskload::config::RunConfig;
//!     use diskload::driver::LoadDriver;
//!     use diskload::engine::LevelDbEngine;
//!
//!     let config = RunConfig { iterations: 2, compact: true, seed: Some(42), ..RunConfig::default() };
//!     let engine = LevelDbEngine::open(&config.path, &config.engine_options()).unwrap();
//!     let report = LoadDriver::new(config).run(engine).unwrap();
//!     assert_eq!(report.records_written, 2000);
//! ```
pub mod config;
pub mod driver;
pub mod engine;
pub mod generator;
