use std::process;

use clap::ErrorKind;
use log::error;

use diskload::config::RunConfig;
use diskload::driver::LoadDriver;
use diskload::engine::LevelDbEngine;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match RunConfig::from_args(std::env::args_os()) {
        Ok(config) => config,
        Err(e) => {
            match e.kind {
                ErrorKind::HelpDisplayed | ErrorKind::VersionDisplayed => println!("{}", e.message),
                _ => eprintln!("{}", e.message),
            }
            return;
        }
    };

    let engine = LevelDbEngine::open(&config.path, &config.engine_options()).unwrap_or_else(|e| {
        error!("failed opening store at {}: {}", config.path, e);
        process::exit(1)
    });

    if let Err(e) = LoadDriver::new(config).run(engine) {
        error!("{}", e);
        process::exit(1);
    }
}
