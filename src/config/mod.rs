//! Run configuration and the command line surface
use std::error::Error;
use std::ffi::OsString;
use std::fmt;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use clap::{App, Arg, ArgMatches, ErrorKind};
use log::info;

use crate::engine::EngineOptions;

/// Records written per iteration
pub const BATCH_SIZE: u64 = 1000;

pub const DEFAULT_PATH: &str = "testing";
pub const DEFAULT_ITERATIONS: u64 = 5;
pub const DEFAULT_TABLE_SIZE_KB: u64 = 2 * 1024;

/// Key generation algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteAlgorithm {
    /// hex encoded nanosecond timestamps, roughly append-only
    Line,
    /// MD5 digest of the timestamp, spread over the key space
    Random,
}

impl WriteAlgorithm {
    pub const NAMES: &'static [&'static str] = &["line", "random"];

    pub fn name(self) -> &'static str {
        match self {
            WriteAlgorithm::Line => "line",
            WriteAlgorithm::Random => "random",
        }
    }
}

impl Default for WriteAlgorithm {
    fn default() -> Self {
        WriteAlgorithm::Line
    }
}

impl Display for WriteAlgorithm {
    fn fmt(&self, f: &mut Formatter) -> Result<(), fmt::Error> {
        write!(f, "{}", self.name())
    }
}

/// The error returned when parsing an unknown algorithm name
#[derive(Debug)]
pub struct UnknownAlgorithm {
    name: String,
}

impl Display for UnknownAlgorithm {
    fn fmt(&self, f: &mut Formatter) -> Result<(), fmt::Error> {
        write!(f, "unknown write algorithm '{}', expected one of: {}", self.name, WriteAlgorithm::NAMES.join(", "))
    }
}

impl Error for UnknownAlgorithm {
}

impl FromStr for WriteAlgorithm {
    type Err = UnknownAlgorithm;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "line" => Ok(WriteAlgorithm::Line),
            "random" => Ok(WriteAlgorithm::Random),
            _ => Err(UnknownAlgorithm { name: s.to_owned() }),
        }
    }
}

/// Everything a run needs to know, fixed once parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub path: String,
    pub algorithm: WriteAlgorithm,
    /// count of thousands of operations
    pub iterations: u64,
    pub compact: bool,
    pub table_size_kb: u64,
    pub fsync: bool,
    pub fail_fast: bool,
    /// seed of the value generator, `None` seeds from the clock
    pub seed: Option<u64>,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            path: DEFAULT_PATH.to_owned(),
            algorithm: WriteAlgorithm::default(),
            iterations: DEFAULT_ITERATIONS,
            compact: false,
            table_size_kb: DEFAULT_TABLE_SIZE_KB,
            fsync: false,
            fail_fast: false,
            seed: None,
        }
    }
}

/// The clap definition of the `diskload` command line
pub fn app<'a, 'b>() -> App<'a, 'b> {
    App::new("diskload")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Disk load emulation: writes synthetic records into a LevelDB store")
        .arg(Arg::with_name("path")
            .short("p")
            .long("path")
            .value_name("PATH")
            .help("Directory of the store [default: testing]")
            .takes_value(true))
        .arg(Arg::with_name("write")
            .short("w")
            .long("write")
            .value_name("ALG")
            .help("Load algorithm (line, random) [default: line]")
            .possible_values(WriteAlgorithm::NAMES)
            .takes_value(true))
        .arg(Arg::with_name("iterations")
            .short("i")
            .long("iterations")
            .value_name("N")
            .help("Count of thousands of operations [default: 5]")
            .validator(validate_positive)
            .takes_value(true))
        .arg(Arg::with_name("compact")
            .short("c")
            .long("compact")
            .help("Compact in every thousand ops, and once more at the end"))
        .arg(Arg::with_name("table-size")
            .short("t")
            .long("table-size")
            .value_name("KB")
            .help("Table size in KB, the write buffer is four times this [default: 2048]")
            .validator(validate_positive)
            .takes_value(true))
        .arg(Arg::with_name("fsync")
            .short("s")
            .long("fsync")
            .help("Run fsync on write"))
        .arg(Arg::with_name("fail-fast")
            .short("f")
            .long("fail-fast")
            .help("Stop at the first failed write or compaction instead of logging it"))
        .arg(Arg::with_name("seed")
            .long("seed")
            .value_name("SEED")
            .help("Seed of the value generator, defaults to the current time")
            .validator(validate_u64)
            .takes_value(true))
}

fn validate_positive(v: String) -> Result<(), String> {
    match v.parse::<u64>() {
        Ok(0) => Err(String::from("must be greater than zero")),
        Ok(_) => Ok(()),
        Err(_) => Err(format!("'{}' is not a positive integer", v)),
    }
}

fn validate_u64(v: String) -> Result<(), String> {
    v.parse::<u64>().map(|_| ()).map_err(|_| format!("'{}' is not an unsigned integer", v))
}

fn parse_number(matches: &ArgMatches, name: &str) -> Result<Option<u64>, clap::Error> {
    match matches.value_of(name) {
        Some(raw) => raw.parse::<u64>().map(Some).map_err(|_| {
            clap::Error::with_description(
                &format!("invalid value '{}' for '--{}'", raw, name),
                ErrorKind::ValueValidation)
        }),
        None => Ok(None),
    }
}

impl RunConfig {
    /// Parse a full argument list, program name included
    ///
    /// Returns the clap error untouched so the caller can print it: usage problems, `--help`
    /// and `--version` all come back this way.
    pub fn from_args<I, T>(args: I) -> Result<Self, clap::Error>
        where I: IntoIterator<Item = T>, T: Into<OsString> + Clone {
        let matches = app().get_matches_from_safe(args)?;
        RunConfig::from_arg_matches(&matches)
    }

    pub fn from_arg_matches(matches: &ArgMatches) -> Result<Self, clap::Error> {
        let path =
            matches
                .value_of("path")
                .unwrap_or_else(|| {
                    info!("no path provided from commandline, using default path '{}'", DEFAULT_PATH);
                    DEFAULT_PATH
                });
        let algorithm = match matches.value_of("write") {
            Some(name) => name.parse::<WriteAlgorithm>().map_err(|e| {
                clap::Error::with_description(&e.to_string(), ErrorKind::InvalidValue)
            })?,
            None => WriteAlgorithm::default(),
        };
        let iterations =
            parse_number(matches, "iterations")?
                .unwrap_or_else(|| {
                    info!("no iteration count provided from commandline, using default value {}", DEFAULT_ITERATIONS);
                    DEFAULT_ITERATIONS
                });
        let table_size_kb =
            parse_number(matches, "table-size")?
                .unwrap_or_else(|| {
                    info!("no table size provided from commandline, using default {} KB", DEFAULT_TABLE_SIZE_KB);
                    DEFAULT_TABLE_SIZE_KB
                });
        let seed = parse_number(matches, "seed")?;

        Ok(RunConfig {
            path: path.to_owned(),
            algorithm,
            iterations,
            compact: matches.is_present("compact"),
            table_size_kb,
            fsync: matches.is_present("fsync"),
            fail_fast: matches.is_present("fail-fast"),
            seed,
        })
    }

    /// Number of records a complete run writes
    pub fn total_records(&self) -> u64 {
        self.iterations.saturating_mul(BATCH_SIZE)
    }

    /// Engine tuning derived from the table size
    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions::from_table_size_kb(self.table_size_kb)
    }
}
