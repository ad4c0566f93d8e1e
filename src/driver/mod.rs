//! The load driver: batches of writes with optional compaction in between
//!
//! A run writes `iterations` batches of `BATCH_SIZE` records. With `compact` set, every batch
//! is followed by a full range compaction, and one more compaction runs after the last batch.
//! The engine is closed exactly once on every path out of `LoadDriver::run`.
use std::error::Error;
use std::fmt;
use std::fmt::{Display, Formatter};
use std::time::{Duration, Instant};

use log::{error, info, warn};

use crate::config::{RunConfig, BATCH_SIZE};
use crate::engine::{EngineError, EngineGuard, KeyRange, StorageEngine};
use crate::generator::RecordGenerator;

/// What to do when the engine rejects a write or a compaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// log the error, count it and keep going
    Continue,
    /// end the run with the error
    FailFast,
}

impl ErrorPolicy {
    pub fn from_config(config: &RunConfig) -> Self {
        if config.fail_fast { ErrorPolicy::FailFast } else { ErrorPolicy::Continue }
    }
}

/// The error type used by driver module
#[derive(Debug)]
pub enum DriverError {
    /// an engine error that ended the run under `ErrorPolicy::FailFast`
    Engine { batch: u64, source: EngineError },
}

impl Display for DriverError {
    fn fmt(&self, f: &mut Formatter) -> Result<(), fmt::Error> {
        match self {
            DriverError::Engine { batch, source } => write!(f, "run aborted in batch {}: {}", batch, source),
        }
    }
}

impl Error for DriverError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            DriverError::Engine { source, .. } => Some(source),
        }
    }
}

/// Counters and timing of a finished run
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// puts the engine accepted
    pub records_written: u64,
    pub write_errors: u64,
    /// compactions that completed
    pub compactions: u64,
    pub compaction_errors: u64,
    pub elapsed: Duration,
    pub close_error: Option<EngineError>,
}

impl RunReport {
    pub fn records_attempted(&self) -> u64 {
        self.records_written + self.write_errors
    }

    pub fn records_per_sec(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 { self.records_attempted() as f64 / secs } else { 0.0 }
    }
}

pub struct LoadDriver {
    config: RunConfig,
    policy: ErrorPolicy,
}

impl LoadDriver {
    pub fn new(config: RunConfig) -> Self {
        let policy = ErrorPolicy::from_config(&config);
        LoadDriver { config, policy }
    }

    pub fn policy(&self) -> ErrorPolicy {
        self.policy
    }

    /// The record generator for this run, built from the configured algorithm and seed
    pub fn generator(&self) -> RecordGenerator {
        match self.config.seed {
            Some(seed) => RecordGenerator::new(self.config.algorithm, seed),
            None => RecordGenerator::from_clock(self.config.algorithm),
        }
    }

    /// Drive a full run against `engine`, which is closed before returning
    pub fn run<E: StorageEngine>(&self, engine: E) -> Result<RunReport, DriverError> {
        let mut engine = EngineGuard::new(engine);
        let mut generator = self.generator();
        let mut report = RunReport::default();
        let started = Instant::now();

        info!("Start");
        info!("writing {} records ({} batches of {}), algorithm {}, fsync {}, compact {}",
              self.config.total_records(), self.config.iterations, BATCH_SIZE,
              self.config.algorithm, self.config.fsync, self.config.compact);

        for i in 0..self.config.iterations {
            let batch = i + 1;
            let batch_started = Instant::now();
            for _ in 0..BATCH_SIZE {
                let record = generator.next_record();
                match engine.put(&record.key, &record.value, self.config.fsync) {
                    Ok(()) => report.records_written += 1,
                    Err(e) => {
                        report.write_errors += 1;
                        self.handle_error(batch, e)?;
                    }
                }
            }
            info!("Batch {}/{} written in {} ms", batch, self.config.iterations, batch_started.elapsed().as_millis());

            if self.config.compact {
                info!("Start Compact {}", batch);
                self.compact(&mut engine, batch, &mut report)?;
            }
        }

        if self.config.compact {
            info!("Start Last Compact");
            self.compact(&mut engine, self.config.iterations, &mut report)?;
        }

        if let Err(e) = engine.close() {
            error!("failed closing store: {}", e);
            report.close_error = Some(e);
        }
        report.elapsed = started.elapsed();

        info!("End");
        info!("{} records written, {} write errors, {} compactions, {} compaction errors in {:.3}s ({:.0} records/s)",
              report.records_written, report.write_errors, report.compactions, report.compaction_errors,
              report.elapsed.as_secs_f64(), report.records_per_sec());
        Ok(report)
    }

    fn compact<E: StorageEngine>(&self, engine: &mut EngineGuard<E>, batch: u64, report: &mut RunReport) -> Result<(), DriverError> {
        let compact_started = Instant::now();
        match engine.compact_range(&KeyRange::full()) {
            Ok(()) => report.compactions += 1,
            Err(e) => {
                report.compaction_errors += 1;
                self.handle_error(batch, e)?;
            }
        }
        info!("End Compact ({} ms)", compact_started.elapsed().as_millis());
        Ok(())
    }

    fn handle_error(&self, batch: u64, e: EngineError) -> Result<(), DriverError> {
        match self.policy {
            ErrorPolicy::Continue => {
                warn!("batch {}: {}", batch, e);
                Ok(())
            }
            ErrorPolicy::FailFast => {
                error!("batch {}: {}, aborting run", batch, e);
                Err(DriverError::Engine { batch, source: e })
            }
        }
    }
}
