//! Autosaver CLI binary.
//!
//! Entry point for the `autosaver` daemon.

use std::process::ExitCode;

use clap::Parser;

use autosaver_clock::SystemClock;
use autosaver_fs::RealFilesystem;
use autosaver_watcher::exit::{codes, exit_code};
use autosaver_watcher::{
    execute_watch, Cli, RealSleeper, ShutdownFlag, TeeLogger, Verbosity, WatcherConfig,
};

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(err) = cli.validate() {
        eprintln!("error: {err}");
        return ExitCode::from(codes::INVALID_ARGS as u8);
    }

    let config = WatcherConfig::from_cli(&cli);
    let log_path = cli.log_path();
    let logger = match TeeLogger::create(&log_path, Verbosity::from_count(cli.verbose)) {
        Ok(logger) => logger,
        Err(err) => {
            eprintln!("error: cannot open log file {}: {err}", log_path.display());
            return ExitCode::from(codes::IO_ERROR as u8);
        }
    };

    // Ctrl+C requests a graceful exit at the next wake point.
    let shutdown = ShutdownFlag::new();

    let fs = RealFilesystem;
    let clock = SystemClock;
    let sleeper = RealSleeper::new();

    match execute_watch(&config, &fs, &clock, &sleeper, &shutdown, &logger) {
        Ok(result) => {
            println!(
                "watched {} cycles: {} updates, {} rotating backups, {} archive snapshots",
                result.cycles, result.updates_detected, result.rotations, result.archives_written
            );
            ExitCode::from(codes::SUCCESS as u8)
        }
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(exit_code(&err) as u8)
        }
    }
}
