//! This example runs an experiment using a scenario name given on the
//! command line.
//!
//! Pass `--dry-run` to only print the commands, `--verbose` for debug logs.

extern crate jcm_core as jcm;
extern crate simplelog;

use std::env;

use jcm::{DryRunLauncher, Launcher, ProcessLauncher, RunConfig, Runner};
use simplelog::{Config, LevelFilter, TermLogger, TerminalMode};

fn main() {
    let args: Vec<String> = env::args().collect();
    let be_verbose = args.contains(&"--verbose".to_string());
    let dry_run = args.contains(&"--dry-run".to_string());

    let level = if be_verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    TermLogger::init(level, Config::default(), TerminalMode::Mixed).unwrap();

    let scenario = match args.iter().skip(1).find(|a| !a.starts_with("--")) {
        Some(s) => s.clone(),
        None => {
            println!("Please provide a scenario name (e.g. hipat)");
            return;
        }
    };

    if dry_run {
        run(&scenario, DryRunLauncher::new());
    } else {
        run(&scenario, ProcessLauncher::new());
    }
}

fn run<L: Launcher>(scenario: &str, launcher: L) {
    let mut runner = Runner::new(RunConfig::default(), launcher);
    match runner.run(scenario, 3, 0) {
        Ok(report) => print!("{}", report),
        Err(e) => println!("failed running experiment: {}", e),
    }
}
