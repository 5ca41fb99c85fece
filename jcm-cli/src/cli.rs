//! Application definition.

extern crate simplelog;

use std::env;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Error, Result};
use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};
use colored::*;

use jcm::{
    DryRunLauncher, Launcher, PartialConfig, ProcessLauncher, Report, RunConfig, Runner, Variant,
};

use crate::init;
use crate::util;

pub const VERSION: &'static str = env!("CARGO_PKG_VERSION");
pub const AUTHORS: &'static str = env!("CARGO_PKG_AUTHORS");

/// Exit code used when a run is stopped with Ctrl-C.
const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Number of directories searched for an experiment file, starting with the
/// current one.
const CONFIG_SEARCH_LEVELS: usize = 3;

const VARIANTS: &[&str] = &["transmission", "variance"];

pub fn app<'a, 'b>() -> App<'a, 'b> {
    let app = App::new("jcm")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .version(VERSION)
        .author(AUTHORS)
        .about("Run Janzen-Connell model experiments from the command line.\n\
                Launches the simulation once per replicate, optionally followed \
                by the analysis of each produced data file.")
        .arg(Arg::with_name("verbosity")
            .long("verbosity")
            .short("v")
            .takes_value(true)
            .default_value("info")
            .value_name("verb")
            .global(true)
            .help("Set the verbosity of the log output"))

        // run subcommand
        .subcommand(SubCommand::with_name("run")
            .display_order(10)
            .about("Run replicates of a scenario")
            .long_about("Run replicates of a scenario.\n\n\
            Replicates are run one after another. A failing replicate is \n\
            reported in the summary but does not stop the run, unless \n\
            `--fail-fast` is given.")
            .arg(Arg::with_name("scenario")
                .required(true)
                .value_name("scenario")
                .help("Scenario to run (see the `scenarios` subcommand)"))
            .arg(Arg::with_name("replicates")
                .value_name("replicates")
                .help("Number of replicates to run [default: 10]"))
            .arg(Arg::with_name("offset")
                .value_name("offset")
                .help("Index of the first replicate, useful when splitting \
                an experiment across machines [default: 0]"))
            .arg(Arg::with_name("variant")
                .long("variant")
                .takes_value(true)
                .possible_values(VARIANTS)
                .help("Scenario family to use [default: transmission]"))
            .arg(Arg::with_name("config")
                .long("config")
                .short("c")
                .takes_value(true)
                .value_name("path")
                .help("Path to an experiment file (defaults to experiment.toml \
                in the current or a parent directory)"))
            .arg(Arg::with_name("runtime")
                .long("runtime")
                .short("t")
                .takes_value(true)
                .value_name("steps")
                .help("Simulation runtime"))
            .arg(Arg::with_name("datafreq")
                .long("datafreq")
                .short("d")
                .takes_value(true)
                .value_name("steps")
                .help("Data sampling frequency"))
            .arg(Arg::with_name("sim")
                .long("sim")
                .takes_value(true)
                .value_name("path")
                .help("Simulation program [default: ./jcm.jl]"))
            .arg(Arg::with_name("analysis")
                .long("analysis")
                .takes_value(true)
                .value_name("path")
                .help("Analysis program [default: ./analyse.R]"))
            .arg(Arg::with_name("workdir")
                .long("workdir")
                .short("w")
                .takes_value(true)
                .value_name("path")
                .help("Directory to run the programs in"))
            .arg(Arg::with_name("log")
                .long("log")
                .conflicts_with("no-log")
                .help("Tee simulation output into a log file per replicate"))
            .arg(Arg::with_name("no-log")
                .long("no-log")
                .help("Don't write log files"))
            .arg(Arg::with_name("analyse")
                .long("analyse")
                .conflicts_with("no-analyse")
                .help("Run the analysis on each data file"))
            .arg(Arg::with_name("no-analyse")
                .long("no-analyse")
                .help("Don't run the analysis"))
            .arg(Arg::with_name("fail-fast")
                .long("fail-fast")
                .help("Stop at the first failing simulation"))
            .arg(Arg::with_name("dry-run")
                .long("dry-run")
                .short("n")
                .help("Print the commands instead of running them"))
        )

        // scenarios subcommand
        .subcommand(SubCommand::with_name("scenarios")
            .display_order(11)
            .about("List available scenarios")
            .arg(Arg::with_name("variant")
                .long("variant")
                .takes_value(true)
                .possible_values(VARIANTS)
                .help("Only list scenarios of this variant"))
        )

        // new subcommand
        .subcommand(SubCommand::with_name("new")
            .setting(AppSettings::DisableHelpSubcommand)
            .setting(AppSettings::SubcommandRequiredElseHelp)
            .display_order(20)
            .about("Create new experiment")
            .subcommand(SubCommand::with_name("experiment")
                .about("Initialize new experiment directory with an experiment file")
                .arg(Arg::with_name("path")
                    .required(true)
                    .value_name("path"))
                .arg(Arg::with_name("template")
                    .possible_values(VARIANTS)
                    .takes_value(true)
                    .default_value("transmission")
                    .help("Init with a template")
                    .long("template")
                    .short("t")))
        );

    app
}

pub fn app_matches() -> ArgMatches<'static> {
    app().get_matches()
}

/// Runs based on specified subcommand, returning the process exit code.
pub fn start(matches: ArgMatches) -> Result<i32> {
    match matches.subcommand() {
        ("run", Some(m)) => start_run(m),
        ("scenarios", Some(m)) => start_scenarios(m),
        ("new", Some(m)) => start_new(m),
        _ => Ok(0),
    }
}

fn start_run(matches: &ArgMatches) -> Result<i32> {
    setup_log_verbosity(matches);

    let file_layer = match matches.value_of("config") {
        Some(path) => Some(
            PartialConfig::from_file(path)
                .with_context(|| format!("failed loading experiment file: {}", path))?,
        ),
        None => match util::find_config_file(env::current_dir()?, CONFIG_SEARCH_LEVELS) {
            Some(path) => {
                info!("using experiment file at: {}", path.display());
                Some(PartialConfig::from_file(&path).with_context(|| {
                    format!("failed loading experiment file: {}", path.display())
                })?)
            }
            None => None,
        },
    };
    let cli_layer = cli_overrides(matches)?;

    let mut layers: Vec<&PartialConfig> = Vec::new();
    if let Some(file_layer) = &file_layer {
        layers.push(file_layer);
    }
    layers.push(&cli_layer);
    let config = RunConfig::from_layers(&layers);

    let scenario = matches
        .value_of("scenario")
        .ok_or_else(|| Error::msg("scenario must be provided"))?;

    // run a loop allowing graceful shutdown
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .context("failed setting Ctrl-C handler")?;

    let report = if matches.is_present("dry-run") {
        execute(scenario, config, DryRunLauncher::new(), running)?
    } else {
        execute(scenario, config, ProcessLauncher::new(), running)?
    };

    print_report(&report);
    if report.interrupted {
        return Ok(INTERRUPTED_EXIT_CODE);
    }
    Ok(0)
}

fn execute<L: Launcher>(
    scenario: &str,
    config: RunConfig,
    launcher: L,
    running: Arc<AtomicBool>,
) -> Result<Report> {
    let mut runner = Runner::new(config, launcher).with_running_flag(running);
    debug!(
        "resolved config:\n{}",
        PartialConfig::from(runner.config().clone()).to_toml_string()?
    );
    Ok(runner.run_default(scenario)?)
}

fn print_report(report: &Report) {
    let mut lines = report.to_string();
    if lines.ends_with('\n') {
        lines.pop();
    }
    if report.is_success() {
        println!("{}{}", "done: ".green(), lines);
    } else {
        println!("{}{}", "done with failures: ".yellow(), lines);
    }
}

/// Collects the run options given on the command line.
fn cli_overrides(matches: &ArgMatches) -> Result<PartialConfig> {
    let mut partial = PartialConfig::default();
    if let Some(v) = matches.value_of("variant") {
        partial.variant = Some(v.parse::<Variant>()?);
    }
    partial.runtime = parse_u32(matches, "runtime")?;
    partial.data_freq = parse_u32(matches, "datafreq")?;
    partial.replicates = parse_u32(matches, "replicates")?;
    partial.offset = parse_u32(matches, "offset")?;
    partial.sim_program = matches.value_of("sim").map(PathBuf::from);
    partial.analysis_program = matches.value_of("analysis").map(PathBuf::from);
    partial.work_dir = matches.value_of("workdir").map(PathBuf::from);
    partial.logging = switch(matches, "log", "no-log");
    partial.analyse = switch(matches, "analyse", "no-analyse");
    if matches.is_present("fail-fast") {
        partial.fail_fast = Some(true);
    }
    Ok(partial)
}

fn parse_u32(matches: &ArgMatches, name: &str) -> Result<Option<u32>> {
    matches
        .value_of(name)
        .map(|s| {
            s.parse::<u32>()
                .with_context(|| format!("invalid {} value: {}", name, s))
        })
        .transpose()
}

fn switch(matches: &ArgMatches, on: &str, off: &str) -> Option<bool> {
    if matches.is_present(on) {
        Some(true)
    } else if matches.is_present(off) {
        Some(false)
    } else {
        None
    }
}

fn start_scenarios(matches: &ArgMatches) -> Result<i32> {
    setup_log_verbosity(matches);
    let variants = match matches.value_of("variant") {
        Some(v) => vec![v.parse::<Variant>()?],
        None => Variant::ALL.to_vec(),
    };
    for variant in variants {
        let defaults = RunConfig::for_variant(variant);
        println!(
            "{} variant (runtime {}, data frequency {}, {} data files):{}",
            variant.name().bold(),
            defaults.runtime,
            defaults.data_freq,
            variant
                .data_extension()
                .map(|e| format!(".{}", e))
                .unwrap_or_else(|| "extension-less".to_string()),
            util::format_scenario_list(variant.scenarios()),
        );
    }
    Ok(0)
}

// Initiate new experiment structure template based on input args
fn start_new(matches: &ArgMatches) -> Result<i32> {
    setup_log_verbosity(matches);
    // get the current `new` subcommand type t and it's matches m
    let (subcmd, m) = match matches.subcommand() {
        (t, Some(m)) => (t, m),
        _ => return Err(Error::msg("failed to get new subcommand")),
    };
    let path = m
        .value_of("path")
        .ok_or_else(|| Error::msg(format!("failed to get {} path", subcmd)))?;
    let template = m
        .value_of("template")
        .ok_or_else(|| Error::msg(format!("failed to get {} template", subcmd)))?;

    init::init_at_path(subcmd, path, template)?;
    Ok(0)
}

fn setup_log_verbosity(matches: &ArgMatches) {
    use self::simplelog::{LevelFilter, TermLogger};
    let level_filter = match matches.value_of("verbosity") {
        Some(s) => match s {
            "0" | "none" => LevelFilter::Off,
            "1" | "err" | "error" | "min" => LevelFilter::Error,
            "2" | "warn" | "warning" | "default" => LevelFilter::Warn,
            "3" | "info" => LevelFilter::Info,
            "4" | "debug" => LevelFilter::Debug,
            "5" | "trace" | "max" | "all" => LevelFilter::Trace,
            _ => LevelFilter::Warn,
        },
        _ => LevelFilter::Warn,
    };
    let mut config_builder = simplelog::ConfigBuilder::new();
    let logger_conf = config_builder
        .set_time_level(LevelFilter::Error)
        .set_target_level(LevelFilter::Debug)
        .set_location_level(LevelFilter::Error)
        .set_time_format_str("%H:%M:%S%.6f")
        .build();
    if let Err(e) = TermLogger::init(level_filter, logger_conf, simplelog::TerminalMode::Mixed) {
        eprintln!("failed setting up logger: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_matches(args: &[&str]) -> ArgMatches<'static> {
        let mut full = vec!["jcm", "run"];
        full.extend_from_slice(args);
        let matches = app().get_matches_from_safe(full).unwrap();
        matches.subcommand_matches("run").unwrap().clone()
    }

    #[test]
    fn overrides_only_what_was_given() {
        let m = run_matches(&["hipat"]);
        assert_eq!(cli_overrides(&m).unwrap(), PartialConfig::default());
    }

    #[test]
    fn positional_count_and_offset() {
        let m = run_matches(&["hipat", "3", "5"]);
        let partial = cli_overrides(&m).unwrap();
        assert_eq!(partial.replicates, Some(3));
        assert_eq!(partial.offset, Some(5));
        let config = RunConfig::from_layers(&[&partial]);
        assert_eq!((config.runtime, config.data_freq), (1000, 50));
    }

    #[test]
    fn switches_and_options() {
        let m = run_matches(&[
            "null",
            "--variant",
            "variance",
            "--no-analyse",
            "--log",
            "-t",
            "200",
            "--sim",
            "/opt/jcm/jcm.jl",
            "--fail-fast",
        ]);
        let partial = cli_overrides(&m).unwrap();
        assert_eq!(partial.variant, Some(Variant::Variance));
        assert_eq!(partial.analyse, Some(false));
        assert_eq!(partial.logging, Some(true));
        assert_eq!(partial.runtime, Some(200));
        assert_eq!(partial.sim_program, Some(PathBuf::from("/opt/jcm/jcm.jl")));
        assert_eq!(partial.fail_fast, Some(true));
    }

    #[test]
    fn bad_numbers_rejected() {
        let m = run_matches(&["null", "ten"]);
        assert!(cli_overrides(&m).is_err());
    }

    #[test]
    fn conflicting_switches_rejected() {
        let args = vec!["jcm", "run", "null", "--log", "--no-log"];
        assert!(app().get_matches_from_safe(args).is_err());
    }
}
