//! Synthetic record generation
//!
//! Every record carries a `VALUE_SIZE` byte value of uppercase ASCII letters, which looks
//! incompressible enough to force real disk I/O. Keys depend on the selected `WriteAlgorithm`:
//! `line` keys are the hex rendering of the current time in nanoseconds and grow like an append
//! log, `random` keys are the MD5 digest of that text and spread over the whole key space.
//!
//! Two records generated within the same clock tick get the same key. The store simply keeps
//! the last one, and nothing here tries to prevent it.
use std::time::{SystemTime, UNIX_EPOCH};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::WriteAlgorithm;

/// Size of every generated value
pub const VALUE_SIZE: usize = 4 * 1024;

/// Size of a `random` key (an MD5 digest)
pub const RANDOM_KEY_SIZE: usize = 16;

const VALUE_ALPHABET_FIRST: u8 = b'A';
const VALUE_ALPHABET_LAST: u8 = b'Z';

/// A key-value pair ready to be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

impl Record {
    /// The one byte record produced for a selector nobody knows about
    pub fn placeholder() -> Self {
        Record { key: vec![0x0], value: vec![0x0] }
    }
}

/// Produces records for one run
///
/// The generator owns its random source, so a run seeded with the same value produces the same
/// sequence of values. Keys still follow the wall clock.
pub struct RecordGenerator {
    algorithm: WriteAlgorithm,
    rng: StdRng,
    last_nanos: u128,
}

impl RecordGenerator {
    /// Create a generator whose random source is seeded with `seed`
    pub fn new(algorithm: WriteAlgorithm, seed: u64) -> Self {
        RecordGenerator { algorithm, rng: StdRng::seed_from_u64(seed), last_nanos: 0 }
    }

    /// Create a generator seeded from the current time
    pub fn from_clock(algorithm: WriteAlgorithm) -> Self {
        RecordGenerator::new(algorithm, clock_seed())
    }

    pub fn algorithm(&self) -> WriteAlgorithm {
        self.algorithm
    }

    /// Generate the next record, keyed on the current wall clock time
    pub fn next_record(&mut self) -> Record {
        let nanos = now_nanos();
        self.record_at(nanos)
    }

    /// Generate a record as if the clock read `nanos`
    ///
    /// Readings older than the previous one are clamped to it, so `line` keys never go
    /// backwards even if the system clock is stepped back during a run.
    pub fn record_at(&mut self, nanos: u128) -> Record {
        self.last_nanos = self.last_nanos.max(nanos);
        let value = self.gen_value();
        let key = match self.algorithm {
            WriteAlgorithm::Line => line_key(self.last_nanos),
            WriteAlgorithm::Random => random_key(self.last_nanos),
        };
        Record { key, value }
    }

    /// Generate a record from a raw algorithm name
    ///
    /// Names that do not parse as a `WriteAlgorithm` produce `Record::placeholder()`. The CLI
    /// never lets such a name through, this only matters to callers that skip it.
    pub fn generate_for_selector(&mut self, selector: &str, nanos: u128) -> Record {
        match selector.parse::<WriteAlgorithm>() {
            Ok(algorithm) => {
                let saved = self.algorithm;
                self.algorithm = algorithm;
                let record = self.record_at(nanos);
                self.algorithm = saved;
                record
            }
            Err(_) => Record::placeholder(),
        }
    }

    /// generates a `VALUE_SIZE` byte value of uppercase letters
    pub fn gen_value(&mut self) -> Vec<u8> {
        let mut ret = vec![0u8; VALUE_SIZE];
        for v in ret.iter_mut() {
            *v = self.rng.gen_range(VALUE_ALPHABET_FIRST..=VALUE_ALPHABET_LAST);
        }
        ret
    }
}

/// Lowercase hex rendering of `nanos`, without padding or prefix
///
/// ```
///     use diskload::generator::line_key;
///     assert_eq!(line_key(0x16b0_4dfc_aa01_bd00), b"16b04dfcaa01bd00".to_vec());
/// ```
pub fn line_key(nanos: u128) -> Vec<u8> {
    format!("{:x}", nanos).into_bytes()
}

/// MD5 digest of the `line_key` for `nanos`
pub fn random_key(nanos: u128) -> Vec<u8> {
    md5::compute(line_key(nanos)).0.to_vec()
}

/// Nanoseconds since the Unix epoch, or zero if the clock sits before it
pub fn now_nanos() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0)
}

fn clock_seed() -> u64 {
    let nanos = now_nanos();
    (nanos as u64) ^ ((nanos >> 64) as u64)
}
