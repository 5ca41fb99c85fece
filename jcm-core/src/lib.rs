//! This library implements the experiment runner for the Janzen-Connell
//! model.
//!
//! The model itself is an external program (`jcm.jl`), as is the statistical
//! analysis (`analyse.R`). What lives here is the part in between: picking
//! the simulation flags for a scenario, naming the data and log files of
//! each replicate, and launching the external programs one replicate at a
//! time.
//!
//! Programming interface is centered around the [`Runner`] structure. A
//! [`Runner`] is created from a [`RunConfig`] and a [`Launcher`]. The
//! launcher decides what "running" an invocation means: [`ProcessLauncher`]
//! spawns real processes, [`DryRunLauncher`] only records and prints them.
//!
//! # Scenarios
//!
//! Scenarios come in two families, called variants. The `transmission`
//! variant knows `null`, `nopat`, `lopat` and `hipat`, the older `variance`
//! variant knows `null`, `variance` and `pathogens`. Each scenario maps to a
//! fixed set of simulation flags, see [`Scenario::flags`].
//!
//! ## Example
//!
//! ```no_run
//! use jcm_core::{ProcessLauncher, RunConfig, Runner};
//!
//! let mut runner = Runner::new(RunConfig::default(), ProcessLauncher::new());
//! let report = runner.run("hipat", 3, 5).unwrap();
//! println!("{}", report);
//! ```
//!
//! [`Runner`]: runner/struct.Runner.html
//! [`RunConfig`]: config/struct.RunConfig.html
//! [`Launcher`]: launcher/trait.Launcher.html
//! [`ProcessLauncher`]: launcher/struct.ProcessLauncher.html
//! [`DryRunLauncher`]: launcher/struct.DryRunLauncher.html
//! [`Scenario::flags`]: scenario/enum.Scenario.html#method.flags

#[macro_use]
extern crate serde;
#[macro_use]
extern crate log;

// reexports
pub use command::{Invocation, Replicate};
pub use config::{PartialConfig, RunConfig};
pub use error::{Error, Result};
pub use launcher::{DryRunLauncher, Launcher, ProcessExit, ProcessLauncher};
pub use runner::{Report, ReplicateOutcome, Runner, Status};
pub use scenario::{Scenario, ScenarioFlags, Variant};

pub mod command;
pub mod config;
pub mod error;
pub mod launcher;
pub mod runner;
pub mod scenario;

/// Default name of the experiment file.
pub const CONFIG_FILE_NAME: &str = "experiment.toml";

/// Simulation program, relative to the working directory.
pub const DEFAULT_SIM_PROGRAM: &str = "./jcm.jl";
/// Analysis program, relative to the working directory.
pub const DEFAULT_ANALYSIS_PROGRAM: &str = "./analyse.R";

pub const DEFAULT_REPLICATES: u32 = 10;

/// Simulation runtime used by the transmission variant.
pub const TRANSMISSION_RUNTIME: u32 = 1000;
/// Data sampling frequency used by the transmission variant.
pub const TRANSMISSION_DATA_FREQ: u32 = 50;
/// Simulation runtime used by the variance variant.
pub const VARIANCE_RUNTIME: u32 = 500;
/// Data sampling frequency used by the variance variant.
pub const VARIANCE_DATA_FREQ: u32 = 10;

/// Infection radius of the `lopat` scenario.
pub const LOW_INFECTION_RADIUS: u32 = 40;
/// Infection radius of the `hipat` scenario.
pub const HIGH_INFECTION_RADIUS: u32 = 200;
