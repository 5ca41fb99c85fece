//! Construction of external program invocations.

use std::fmt;
use std::path::PathBuf;

use crate::config::RunConfig;
use crate::scenario::{Scenario, Variant};

/// Single indexed run of a scenario.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Replicate {
    pub scenario: Scenario,
    pub index: u32,
}

impl Replicate {
    pub fn new(scenario: Scenario, index: u32) -> Self {
        Replicate { scenario, index }
    }

    fn stem(&self) -> String {
        format!("{}_{}", self.scenario.name(), self.index)
    }

    /// Name of the data file the simulation writes for this replicate.
    pub fn data_file(&self, variant: Variant) -> String {
        match variant.data_extension() {
            Some(ext) => format!("{}.{}", self.stem(), ext),
            None => self.stem(),
        }
    }

    /// Name of the file capturing the simulation output.
    pub fn log_file(&self) -> String {
        format!("{}.log", self.stem())
    }
}

/// Description of one external process launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
    /// File receiving a copy of the process output, relative to the
    /// working directory.
    pub log_file: Option<PathBuf>,
}

impl Invocation {
    /// Simulation run for the given replicate.
    pub fn simulation(config: &RunConfig, replicate: &Replicate) -> Self {
        let mut args = vec![
            "-t".to_string(),
            config.runtime.to_string(),
            "-d".to_string(),
            config.data_freq.to_string(),
            "-f".to_string(),
            replicate.data_file(config.variant),
        ];
        let flags = replicate.scenario.flags();
        if flags.neutral {
            args.push("-n".to_string());
        }
        if flags.pathogens {
            args.push("-p".to_string());
        }
        if let Some(radius) = flags.infection_radius {
            args.push("-i".to_string());
            args.push(radius.to_string());
        }
        Invocation {
            program: config.sim_program.clone(),
            args,
            log_file: if config.logging {
                Some(PathBuf::from(replicate.log_file()))
            } else {
                None
            },
        }
    }

    /// Analysis run on a produced data file.
    pub fn analysis(config: &RunConfig, data_file: &str) -> Self {
        Invocation {
            program: config.analysis_program.clone(),
            args: vec![data_file.to_string()],
            log_file: None,
        }
    }

    /// Value following `flag` in the argument list.
    pub fn arg_value(&self, flag: &str) -> Option<&str> {
        self.args
            .iter()
            .position(|a| a == flag)
            .and_then(|i| self.args.get(i + 1))
            .map(|s| s.as_str())
    }

    pub fn has_flag(&self, flag: &str) -> bool {
        self.args.iter().any(|a| a == flag)
    }
}

/// Renders the shell command line equivalent to this invocation.
impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", shlex::quote(&self.program.to_string_lossy()))?;
        for arg in &self.args {
            write!(f, " {}", shlex::quote(arg))?;
        }
        if let Some(log) = &self.log_file {
            write!(f, " | tee {}", shlex::quote(&log.to_string_lossy()))?;
        }
        Ok(())
    }
}

#[test]
fn file_names() {
    let r = Replicate::new(Scenario::HiPat, 5);
    assert_eq!(r.data_file(Variant::Transmission), "hipat_5.csv");
    assert_eq!(r.log_file(), "hipat_5.log");
    let r = Replicate::new(Scenario::Variance, 12);
    assert_eq!(r.data_file(Variant::Variance), "variance_12");
    assert_eq!(r.log_file(), "variance_12.log");
}

#[test]
fn simulation_args_hipat() {
    let config = RunConfig::default();
    let inv = Invocation::simulation(&config, &Replicate::new(Scenario::HiPat, 5));
    assert_eq!(
        inv.args,
        vec!["-t", "1000", "-d", "50", "-f", "hipat_5.csv", "-p", "-i", "200"]
    );
    assert_eq!(inv.log_file, Some(PathBuf::from("hipat_5.log")));
    assert_eq!(
        inv.to_string(),
        "./jcm.jl -t 1000 -d 50 -f hipat_5.csv -p -i 200 | tee hipat_5.log"
    );
}

#[test]
fn simulation_args_null_without_logging() {
    let mut config = RunConfig::default();
    config.logging = false;
    let inv = Invocation::simulation(&config, &Replicate::new(Scenario::Null, 0));
    assert!(inv.has_flag("-n"));
    assert!(!inv.has_flag("-p"));
    assert!(!inv.has_flag("-i"));
    assert_eq!(inv.log_file, None);
    assert_eq!(inv.to_string(), "./jcm.jl -t 1000 -d 50 -f null_0.csv -n");
}

#[test]
fn analysis_takes_data_file() {
    let config = RunConfig::default();
    let inv = Invocation::analysis(&config, "lopat_3.csv");
    assert_eq!(inv.program, PathBuf::from("./analyse.R"));
    assert_eq!(inv.args, vec!["lopat_3.csv"]);
    assert_eq!(inv.to_string(), "./analyse.R lopat_3.csv");
}

#[test]
fn display_quotes_awkward_paths() {
    let mut config = RunConfig::for_variant(Variant::Variance);
    config.sim_program = PathBuf::from("/opt/my sims/jcm.jl");
    let inv = Invocation::simulation(&config, &Replicate::new(Scenario::Pathogens, 1));
    let line = inv.to_string();
    assert!(line.ends_with(" -t 500 -d 10 -f pathogens_1 -p"));
    // quoting style is up to shlex, but the space must not split the path
    assert!(!line.starts_with("/opt/my sims"));
    assert!(line.contains("/opt/my sims/jcm.jl"));
}
