//! Experiment runner.
//!
//! Runs a contiguous range of replicates of a single scenario, one after
//! another. Each replicate is one simulation launch, optionally followed by
//! one analysis launch on the produced data file. Every launch result is
//! kept in the [`Report`].
//!
//! [`Report`]: struct.Report.html

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Local};

use crate::command::{Invocation, Replicate};
use crate::config::RunConfig;
use crate::error::{Error, Result};
use crate::launcher::Launcher;
use crate::scenario::Scenario;

/// Result of a single launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Completed,
    /// Process exited unsuccessfully, `None` if killed by a signal.
    Exited(Option<i32>),
    /// Process could not be started at all.
    LaunchFailed(String),
    /// Process ran, but its output could not be captured.
    CaptureFailed(String),
}

impl Status {
    pub fn is_success(&self) -> bool {
        *self == Status::Completed
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Completed => write!(f, "completed"),
            Status::Exited(Some(code)) => write!(f, "exited with code {}", code),
            Status::Exited(None) => write!(f, "terminated by signal"),
            Status::LaunchFailed(msg) => write!(f, "launch failed ({})", msg),
            Status::CaptureFailed(msg) => write!(f, "output capture failed ({})", msg),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReplicateOutcome {
    pub replicate: Replicate,
    pub data_file: String,
    pub log_file: Option<String>,
    pub simulation: Status,
    /// `None` if analysis is disabled or the simulation failed.
    pub analysis: Option<Status>,
}

impl ReplicateOutcome {
    pub fn is_success(&self) -> bool {
        self.simulation.is_success()
            && self.analysis.as_ref().map_or(true, |a| a.is_success())
    }
}

/// Summary of an experiment run.
#[derive(Debug, Clone)]
pub struct Report {
    pub scenario: Scenario,
    pub started: DateTime<Local>,
    pub finished: DateTime<Local>,
    pub outcomes: Vec<ReplicateOutcome>,
    /// Run was stopped before reaching the last replicate.
    pub interrupted: bool,
}

impl Report {
    pub fn failures(&self) -> Vec<&ReplicateOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success()).collect()
    }

    pub fn is_success(&self) -> bool {
        !self.interrupted && self.outcomes.iter().all(|o| o.is_success())
    }

    pub fn data_files(&self) -> Vec<&str> {
        self.outcomes.iter().map(|o| o.data_file.as_str()).collect()
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let failures = self.failures();
        let elapsed = self.finished.signed_duration_since(self.started);
        writeln!(
            f,
            "{} scenario: {} replicate(s) run, {} failed ({}.{:03}s)",
            self.scenario,
            self.outcomes.len(),
            failures.len(),
            elapsed.num_seconds(),
            elapsed.num_milliseconds() % 1000,
        )?;
        for outcome in failures {
            write!(
                f,
                "   {}: simulation {}",
                outcome.data_file, outcome.simulation
            )?;
            if let Some(analysis) = &outcome.analysis {
                write!(f, ", analysis {}", analysis)?;
            }
            writeln!(f)?;
        }
        if self.interrupted {
            writeln!(f, "   run interrupted")?;
        }
        Ok(())
    }
}

/// Sequential replicate runner.
pub struct Runner<L: Launcher> {
    config: RunConfig,
    launcher: L,
    running: Option<Arc<AtomicBool>>,
}

impl<L: Launcher> Runner<L> {
    pub fn new(config: RunConfig, launcher: L) -> Self {
        Runner {
            config,
            launcher,
            running: None,
        }
    }

    /// Stops the run before the next replicate once the flag is cleared.
    pub fn with_running_flag(mut self, running: Arc<AtomicBool>) -> Self {
        self.running = Some(running);
        self
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn launcher(&self) -> &L {
        &self.launcher
    }

    /// Replicates that a run with the given arguments would go through.
    pub fn plan(&self, scenario: Scenario, count: u32, offset: u32) -> Vec<Replicate> {
        (offset..offset.saturating_add(count))
            .map(|i| Replicate::new(scenario, i))
            .collect()
    }

    /// Runs `count` replicates of the named scenario, starting at index
    /// `offset`.
    ///
    /// The scenario name and the configuration are validated before anything
    /// is launched.
    pub fn run(&mut self, scenario: &str, count: u32, offset: u32) -> Result<Report> {
        let scenario = Scenario::parse(scenario, self.config.variant)?;
        self.run_scenario(scenario, count, offset)
    }

    /// Same as [`run`] with replicate count and offset taken from the
    /// configuration.
    ///
    /// [`run`]: #method.run
    pub fn run_default(&mut self, scenario: &str) -> Result<Report> {
        let (count, offset) = (self.config.replicates, self.config.offset);
        self.run(scenario, count, offset)
    }

    pub fn run_scenario(&mut self, scenario: Scenario, count: u32, offset: u32) -> Result<Report> {
        // scenarios of the other variant are rejected
        Scenario::parse(scenario.name(), self.config.variant)?;
        let mut check = self.config.clone();
        check.replicates = count;
        check.offset = offset;
        check.validate()?;

        info!(
            "running {} replicate(s) of the {} scenario, starting at {}",
            count, scenario, offset
        );
        let started = Local::now();
        let mut outcomes = Vec::with_capacity(count as usize);
        let mut interrupted = false;

        for replicate in self.plan(scenario, count, offset) {
            if !self.is_running() {
                warn!("run interrupted before replicate {}", replicate.index);
                interrupted = true;
                break;
            }
            let outcome = self.run_replicate(replicate);
            let failed = !outcome.simulation.is_success();
            let status = outcome.simulation.to_string();
            outcomes.push(outcome);
            // Ctrl-C also reaches the child, so a failure here may just be
            // the interrupt
            if !self.is_running() {
                warn!("run interrupted during replicate {}", replicate.index);
                interrupted = true;
                break;
            }
            if failed && self.config.fail_fast {
                return Err(Error::ReplicateFailed {
                    scenario: scenario.to_string(),
                    index: replicate.index,
                    status,
                });
            }
        }

        Ok(Report {
            scenario,
            started,
            finished: Local::now(),
            outcomes,
            interrupted,
        })
    }

    fn is_running(&self) -> bool {
        self.running
            .as_ref()
            .map_or(true, |r| r.load(Ordering::SeqCst))
    }

    fn run_replicate(&mut self, replicate: Replicate) -> ReplicateOutcome {
        println!(
            "Running replicate {} of the {} scenario.",
            replicate.index, replicate.scenario
        );
        let data_file = replicate.data_file(self.config.variant);
        let sim = Invocation::simulation(&self.config, &replicate);
        let simulation = self.launch(&sim);
        if !simulation.is_success() {
            warn!("simulation for {}: {}", data_file, simulation);
        }

        let analysis = if self.config.analyse && simulation.is_success() {
            let analysis = self.launch(&Invocation::analysis(&self.config, &data_file));
            if !analysis.is_success() {
                warn!("analysis of {}: {}", data_file, analysis);
            }
            Some(analysis)
        } else {
            None
        };

        ReplicateOutcome {
            replicate,
            data_file,
            log_file: sim
                .log_file
                .as_ref()
                .map(|p| p.to_string_lossy().to_string()),
            simulation,
            analysis,
        }
    }

    fn launch(&mut self, invocation: &Invocation) -> Status {
        match self.launcher.launch(invocation, &self.config.work_dir) {
            Ok(exit) if exit.success() => Status::Completed,
            Ok(exit) => Status::Exited(exit.code),
            Err(e @ Error::OutputCaptureFailed(..)) => Status::CaptureFailed(e.to_string()),
            Err(e) => Status::LaunchFailed(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::launcher::{DryRunLauncher, ProcessExit};
    use crate::scenario::Variant;
    use std::path::{Path, PathBuf};

    fn dry_runner(config: RunConfig) -> Runner<DryRunLauncher> {
        Runner::new(config, DryRunLauncher::silent())
    }

    /// Fails the simulation of every replicate whose data file is listed.
    struct FailingLauncher {
        failing: Vec<&'static str>,
        launched: Vec<Invocation>,
    }

    impl Launcher for FailingLauncher {
        fn launch(&mut self, invocation: &Invocation, _: &Path) -> Result<ProcessExit> {
            self.launched.push(invocation.clone());
            match invocation.arg_value("-f") {
                Some(data_file) if self.failing.iter().any(|f| *f == data_file) => {
                    Ok(ProcessExit { code: Some(3) })
                }
                _ => Ok(ProcessExit::SUCCESS),
            }
        }
    }

    #[test]
    fn hipat_with_offset() {
        let mut runner = dry_runner(RunConfig::default());
        let report = runner.run("hipat", 3, 5).unwrap();
        assert_eq!(
            report.data_files(),
            vec!["hipat_5.csv", "hipat_6.csv", "hipat_7.csv"]
        );
        assert!(report.is_success());

        let launched = &runner.launcher().launched;
        let sims: Vec<_> = launched.iter().filter(|i| i.has_flag("-f")).collect();
        assert_eq!(sims.len(), 3);
        for (sim, index) in sims.iter().zip(5..) {
            assert_eq!(sim.arg_value("-t"), Some("1000"));
            assert_eq!(sim.arg_value("-d"), Some("50"));
            assert_eq!(sim.arg_value("-i"), Some("200"));
            assert!(sim.has_flag("-p"));
            assert!(!sim.has_flag("-n"));
            assert_eq!(sim.arg_value("-f"), Some(format!("hipat_{}.csv", index).as_str()));
            assert_eq!(sim.log_file, Some(PathBuf::from(format!("hipat_{}.log", index))));
        }
        // one analysis after each simulation
        assert_eq!(launched.len(), 6);
        assert_eq!(launched[1].args, vec!["hipat_5.csv"]);
    }

    #[test]
    fn null_with_defaults() {
        let mut runner = dry_runner(RunConfig::default());
        let report = runner.run_default("null").unwrap();
        let expected: Vec<String> = (0..10).map(|i| format!("null_{}.csv", i)).collect();
        assert_eq!(report.data_files(), expected);
        for sim in runner.launcher().launched.iter().filter(|i| i.has_flag("-f")) {
            assert!(sim.has_flag("-n"));
            assert!(!sim.has_flag("-p"));
            assert!(!sim.has_flag("-i"));
        }
    }

    #[test]
    fn bad_scenario_launches_nothing() {
        let mut runner = dry_runner(RunConfig::default());
        assert!(runner.run("medpat", 10, 0).is_err());
        assert!(runner.run("variance", 10, 0).is_err());
        assert!(runner
            .run_scenario(Scenario::Pathogens, 1, 0)
            .is_err());
        assert!(runner.launcher().launched.is_empty());
    }

    #[test]
    fn invalid_range_launches_nothing() {
        let mut runner = dry_runner(RunConfig::default());
        assert!(runner.run("null", 2, u32::MAX).is_err());
        assert!(runner.launcher().launched.is_empty());
    }

    #[test]
    fn exact_invocation_count() {
        for &(n, b) in &[(0, 0), (1, 0), (4, 7), (12, 100)] {
            let mut config = RunConfig::default();
            config.analyse = false;
            let mut runner = dry_runner(config);
            let report = runner.run("lopat", n, b).unwrap();
            let launched = &runner.launcher().launched;
            assert_eq!(launched.len(), n as usize);
            for (inv, i) in launched.iter().zip(b..) {
                assert_eq!(inv.arg_value("-f"), Some(format!("lopat_{}.csv", i).as_str()));
                assert_eq!(inv.arg_value("-i"), Some("40"));
            }
            assert_eq!(report.outcomes.len(), n as usize);
        }
    }

    #[test]
    fn repeated_runs_use_same_files() {
        let mut runner = dry_runner(RunConfig::default());
        let first = runner.run("nopat", 3, 2).unwrap();
        let second = runner.run("nopat", 3, 2).unwrap();
        assert_eq!(first.data_files(), second.data_files());
    }

    #[test]
    fn variance_variant_files() {
        let mut runner = dry_runner(RunConfig::for_variant(Variant::Variance));
        let report = runner.run("pathogens", 2, 0).unwrap();
        assert_eq!(report.data_files(), vec!["pathogens_0", "pathogens_1"]);
        let launched = &runner.launcher().launched;
        // no analysis and no logging by default
        assert_eq!(launched.len(), 2);
        assert!(launched.iter().all(|i| i.log_file.is_none()));
        assert_eq!(launched[0].arg_value("-t"), Some("500"));
        assert!(launched[0].has_flag("-p"));
        assert!(!launched[0].has_flag("-i"));

        let report = runner.run("variance", 1, 0).unwrap();
        assert_eq!(report.data_files(), vec!["variance_0"]);
    }

    #[test]
    fn failures_are_recorded_and_run_continues() {
        let launcher = FailingLauncher {
            failing: vec!["nopat_1.csv"],
            launched: Vec::new(),
        };
        let mut runner = Runner::new(RunConfig::default(), launcher);
        let report = runner.run("nopat", 3, 0).unwrap();
        assert_eq!(report.outcomes.len(), 3);
        assert!(!report.is_success());
        let failures = report.failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].simulation, Status::Exited(Some(3)));
        // analysis skipped for the failed replicate
        assert_eq!(failures[0].analysis, None);
        assert_eq!(runner.launcher().launched.len(), 5);
        assert!(report.to_string().contains("nopat_1.csv: simulation exited with code 3"));
    }

    #[test]
    fn fail_fast_stops_at_first_failure() {
        let launcher = FailingLauncher {
            failing: vec!["hipat_1.csv"],
            launched: Vec::new(),
        };
        let mut config = RunConfig::default();
        config.fail_fast = true;
        config.analyse = false;
        let mut runner = Runner::new(config, launcher);
        match runner.run("hipat", 5, 0) {
            Err(Error::ReplicateFailed { index, .. }) => assert_eq!(index, 1),
            other => panic!("expected replicate failure, got {:?}", other),
        }
        assert_eq!(runner.launcher().launched.len(), 2);
    }

    #[test]
    fn cleared_flag_interrupts() {
        let running = Arc::new(AtomicBool::new(false));
        let mut runner = dry_runner(RunConfig::default()).with_running_flag(running);
        let report = runner.run("null", 3, 0).unwrap();
        assert!(report.interrupted);
        assert!(report.outcomes.is_empty());
        assert!(!report.is_success());
    }

    /// Clears the running flag and dies by signal, like a simulation
    /// receiving Ctrl-C.
    struct InterruptedLauncher {
        running: Arc<AtomicBool>,
        launches: usize,
    }

    impl Launcher for InterruptedLauncher {
        fn launch(&mut self, _: &Invocation, _: &Path) -> Result<ProcessExit> {
            self.launches += 1;
            self.running.store(false, Ordering::SeqCst);
            Ok(ProcessExit { code: None })
        }
    }

    #[test]
    fn interrupt_wins_over_fail_fast() {
        let running = Arc::new(AtomicBool::new(true));
        let launcher = InterruptedLauncher {
            running: running.clone(),
            launches: 0,
        };
        let mut config = RunConfig::default();
        config.fail_fast = true;
        let mut runner = Runner::new(config, launcher).with_running_flag(running);
        let report = runner.run("hipat", 4, 0).unwrap();
        assert!(report.interrupted);
        assert_eq!(report.outcomes.len(), 1);
        assert_eq!(report.outcomes[0].simulation, Status::Exited(None));
        assert_eq!(runner.launcher().launches, 1);
    }

    #[test]
    fn plan_matches_range() {
        let runner = dry_runner(RunConfig::default());
        let plan = runner.plan(Scenario::LoPat, 3, 8);
        assert_eq!(
            plan.iter().map(|r| r.index).collect::<Vec<_>>(),
            vec![8, 9, 10]
        );
    }

    #[cfg(unix)]
    #[test]
    fn real_processes_write_logs() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = RunConfig::default();
        config.sim_program = PathBuf::from("echo");
        config.analysis_program = PathBuf::from("true");
        config.work_dir = dir.path().to_path_buf();
        let mut runner = Runner::new(config, crate::launcher::ProcessLauncher::quiet());
        let report = runner.run("lopat", 2, 0).unwrap();
        assert!(report.is_success());
        let log = std::fs::read_to_string(dir.path().join("lopat_1.log")).unwrap();
        assert_eq!(log, "-t 1000 -d 50 -f lopat_1.csv -p -i 40\n");
    }

    #[test]
    fn missing_simulation_is_a_failure_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = RunConfig::default();
        config.sim_program = PathBuf::from("./missing-jcm.jl");
        config.logging = false;
        config.work_dir = dir.path().to_path_buf();
        let mut runner = Runner::new(config, crate::launcher::ProcessLauncher::quiet());
        let report = runner.run("null", 2, 0).unwrap();
        assert_eq!(report.failures().len(), 2);
        match &report.outcomes[0].simulation {
            Status::LaunchFailed(msg) => assert!(msg.contains("missing-jcm.jl")),
            other => panic!("expected launch failure, got {:?}", other),
        }
    }
}
