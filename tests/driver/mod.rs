#[cfg(test)]
mod test {
    use diskload::config::{RunConfig, WriteAlgorithm};
    use diskload::driver::{DriverError, LoadDriver};
    use diskload::engine::{EngineCall, EngineErrorKind, MemoryEngine};
    use diskload::generator::{RANDOM_KEY_SIZE, VALUE_SIZE};

    use log::{LevelFilter, Log, Metadata, Record};
    use std::sync::{Mutex, Once};
    use std::thread::{self, ThreadId};

    // Captures log lines per thread, tests run in parallel and share the logger.
    struct CaptureLogger;

    static LINES: Mutex<Vec<(ThreadId, String)>> = Mutex::new(Vec::new());
    static LOGGER: CaptureLogger = CaptureLogger;
    static INIT: Once = Once::new();

    impl Log for CaptureLogger {
        fn enabled(&self, _: &Metadata) -> bool {
            true
        }

        fn log(&self, record: &Record) {
            LINES.lock().unwrap().push((thread::current().id(), record.args().to_string()));
        }

        fn flush(&self) {}
    }

    fn capture_logs() {
        INIT.call_once(|| {
            log::set_logger(&LOGGER).unwrap();
            log::set_max_level(LevelFilter::Info);
        });
    }

    fn my_lines() -> Vec<String> {
        let me = thread::current().id();
        LINES.lock().unwrap().iter().filter(|(id, _)| *id == me).map(|(_, l)| l.clone()).collect()
    }

    fn run(config: RunConfig) -> (MemoryEngine, Result<diskload::driver::RunReport, DriverError>) {
        let engine = MemoryEngine::new();
        let config = RunConfig { seed: Some(1234), ..config };
        let result = LoadDriver::new(config).run(engine.clone());
        (engine, result)
    }

    fn config(args: &[&str]) -> RunConfig {
        let mut full = vec!["diskload"];
        full.extend_from_slice(args);
        RunConfig::from_args(full).unwrap()
    }

    #[test]
    fn test_single_batch_without_compaction() {
        capture_logs();
        let (engine, result) = run(config(&["-i", "1"]));
        let report = result.unwrap();

        assert_eq!(engine.puts(), 1000);
        assert_eq!(engine.compactions(), 0);
        assert_eq!(engine.closes(), 1);
        assert_eq!(report.records_written, 1000);
        assert_eq!(report.write_errors, 0);

        let lines = my_lines();
        let start = lines.iter().position(|l| l == "Start").unwrap();
        let end = lines.iter().position(|l| l == "End").unwrap();
        assert!(start < end);
        assert!(!lines.iter().any(|l| l.starts_with("Start Compact")));
    }

    #[test]
    fn test_two_batches_with_compaction() {
        capture_logs();
        let (engine, result) = run(config(&["-i", "2", "-c"]));
        let report = result.unwrap();

        assert_eq!(engine.puts(), 2000);
        assert_eq!(engine.compactions(), 3);
        assert_eq!(report.compactions, 3);

        let lines = my_lines();
        let markers: Vec<&str> = lines.iter()
            .map(|l| l.as_str())
            .filter(|l| *l == "Start" || *l == "End" || l.starts_with("Start ") || l.starts_with("End Compact"))
            .collect();
        assert_eq!(markers.len(), 8);
        assert_eq!(markers[0], "Start");
        assert_eq!(markers[1], "Start Compact 1");
        assert!(markers[2].starts_with("End Compact"));
        assert_eq!(markers[3], "Start Compact 2");
        assert!(markers[4].starts_with("End Compact"));
        assert_eq!(markers[5], "Start Last Compact");
        assert!(markers[6].starts_with("End Compact"));
        assert_eq!(markers[7], "End");
    }

    #[test]
    fn test_compaction_count_is_iterations_plus_one() {
        for iterations in 1..4u64 {
            let (engine, _) = run(RunConfig { iterations, compact: true, ..RunConfig::default() });
            assert_eq!(engine.compactions() as u64, iterations + 1);
            assert_eq!(engine.puts() as u64, iterations * 1000);
        }
    }

    #[test]
    fn test_total_records() {
        let config = RunConfig { iterations: 3, ..RunConfig::default() };
        assert_eq!(config.total_records(), 3000);
        let (engine, _) = run(config);
        assert_eq!(engine.puts(), 3000);
        assert!(engine.len() <= 3000);
    }

    #[test]
    fn test_fsync_reaches_every_put() {
        let (engine, _) = run(config(&["-i", "1", "-s"]));
        assert_eq!(engine.synced_puts(), 1000);

        let (engine, _) = run(config(&["-i", "1"]));
        assert_eq!(engine.synced_puts(), 0);
    }

    #[test]
    fn test_random_keys_and_values() {
        let (engine, _) = run(config(&["-i", "1", "-w", "random"]));
        for key in engine.keys() {
            assert_eq!(key.len(), RANDOM_KEY_SIZE);
            let value = engine.get(&key).unwrap();
            assert_eq!(value.len(), VALUE_SIZE);
            assert!(value.iter().all(|&b| (65..=90).contains(&b)));
        }
    }

    #[test]
    fn test_line_keys_are_hex_timestamps() {
        let (engine, _) = run(RunConfig { iterations: 1, algorithm: WriteAlgorithm::Line, ..RunConfig::default() });
        // keys may collide within a clock tick, so only check what was stored
        assert!(!engine.is_empty());
        for key in engine.keys() {
            let text = std::str::from_utf8(&key).unwrap();
            assert_eq!(text, text.to_lowercase());
            assert!(u128::from_str_radix(text, 16).is_ok());
        }
    }

    #[test]
    fn test_write_errors_continue_by_default() {
        let engine = MemoryEngine::new();
        engine.fail_puts_after(500);
        let report = LoadDriver::new(config(&["-i", "2"])).run(engine.clone()).unwrap();

        assert_eq!(engine.puts(), 2000);
        assert_eq!(report.records_written, 500);
        assert_eq!(report.write_errors, 1500);
        assert_eq!(report.records_attempted(), 2000);
        assert_eq!(engine.closes(), 1);
    }

    #[test]
    fn test_fail_fast_stops_at_first_error() {
        let engine = MemoryEngine::new();
        engine.fail_puts_after(1500);
        let err = LoadDriver::new(config(&["-i", "3", "-c", "-f"]))
            .run(engine.clone())
            .unwrap_err();

        match err {
            DriverError::Engine { batch, source } => {
                assert_eq!(batch, 2);
                assert_eq!(source.kind(), EngineErrorKind::Write);
            }
        }
        assert_eq!(engine.puts(), 1501);
        assert_eq!(engine.compactions(), 1);
        assert_eq!(engine.closes(), 1);
        assert_eq!(engine.calls().last(), Some(&EngineCall::Close));
    }

    #[test]
    fn test_random_config_writes_random_keys() {
        let (engine, _) = run(RunConfig { iterations: 1, algorithm: WriteAlgorithm::Random, ..RunConfig::default() });
        assert_eq!(engine.puts(), 1000);
        assert!(engine.keys().iter().all(|k| k.len() == RANDOM_KEY_SIZE));
    }

    #[test]
    fn test_invalid_algorithm_is_rejected() {
        let err = RunConfig::from_args(vec!["diskload", "--write", "foo"]).unwrap_err();
        assert!(err.message.contains("foo"));
        assert!(err.message.contains("USAGE"));
    }
}
