//! Run configuration.
//!
//! A [`RunConfig`] is assembled in layers: the defaults of the selected
//! [`Variant`], then an optional experiment file, then command line
//! overrides. Every layer above the defaults is a [`PartialConfig`].
//!
//! [`RunConfig`]: struct.RunConfig.html
//! [`PartialConfig`]: struct.PartialConfig.html
//! [`Variant`]: ../scenario/enum.Variant.html

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::scenario::Variant;
use crate::{
    DEFAULT_ANALYSIS_PROGRAM, DEFAULT_REPLICATES, DEFAULT_SIM_PROGRAM,
    TRANSMISSION_DATA_FREQ, TRANSMISSION_RUNTIME, VARIANCE_DATA_FREQ, VARIANCE_RUNTIME,
};

/// Complete set of parameters for a single experiment run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub variant: Variant,
    /// Simulation duration passed as `-t`.
    pub runtime: u32,
    /// Data sampling frequency passed as `-d`.
    pub data_freq: u32,
    /// Number of replicates to run.
    pub replicates: u32,
    /// Index of the first replicate.
    pub offset: u32,
    /// Tee simulation output into a log file per replicate.
    pub logging: bool,
    /// Run the analysis program on each produced data file.
    pub analyse: bool,
    /// Abort the run on the first failing simulation.
    pub fail_fast: bool,
    pub sim_program: PathBuf,
    pub analysis_program: PathBuf,
    /// Directory the external programs are run in, and where the data and
    /// log files end up.
    pub work_dir: PathBuf,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig::for_variant(Variant::default())
    }
}

impl RunConfig {
    /// Returns the default configuration for the given variant.
    pub fn for_variant(variant: Variant) -> Self {
        let (runtime, data_freq, extras) = match variant {
            Variant::Transmission => (TRANSMISSION_RUNTIME, TRANSMISSION_DATA_FREQ, true),
            Variant::Variance => (VARIANCE_RUNTIME, VARIANCE_DATA_FREQ, false),
        };
        RunConfig {
            variant,
            runtime,
            data_freq,
            replicates: DEFAULT_REPLICATES,
            offset: 0,
            logging: extras,
            analyse: extras,
            fail_fast: false,
            sim_program: PathBuf::from(DEFAULT_SIM_PROGRAM),
            analysis_program: PathBuf::from(DEFAULT_ANALYSIS_PROGRAM),
            work_dir: PathBuf::from("."),
        }
    }

    /// Builds a configuration from layered partial configs.
    ///
    /// The variant is taken from the last layer that sets one, its defaults
    /// are the base, and the layers are applied in order on top.
    pub fn from_layers(layers: &[&PartialConfig]) -> Self {
        let variant = layers
            .iter()
            .rev()
            .find_map(|l| l.variant)
            .unwrap_or_default();
        let mut config = RunConfig::for_variant(variant);
        for layer in layers {
            config.apply(layer);
        }
        config
    }

    /// Overwrites every field that is set in the partial config.
    pub fn apply(&mut self, partial: &PartialConfig) {
        if let Some(v) = partial.variant {
            self.variant = v;
        }
        if let Some(v) = partial.runtime {
            self.runtime = v;
        }
        if let Some(v) = partial.data_freq {
            self.data_freq = v;
        }
        if let Some(v) = partial.replicates {
            self.replicates = v;
        }
        if let Some(v) = partial.offset {
            self.offset = v;
        }
        if let Some(v) = partial.logging {
            self.logging = v;
        }
        if let Some(v) = partial.analyse {
            self.analyse = v;
        }
        if let Some(v) = partial.fail_fast {
            self.fail_fast = v;
        }
        if let Some(v) = &partial.sim_program {
            self.sim_program = v.clone();
        }
        if let Some(v) = &partial.analysis_program {
            self.analysis_program = v.clone();
        }
        if let Some(v) = &partial.work_dir {
            self.work_dir = v.clone();
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.runtime == 0 {
            return Err(Error::InvalidConfig("runtime must be positive".to_string()));
        }
        if self.data_freq == 0 {
            return Err(Error::InvalidConfig(
                "data frequency must be positive".to_string(),
            ));
        }
        if self.offset.checked_add(self.replicates).is_none() {
            return Err(Error::InvalidConfig(format!(
                "replicate range overflows: offset {} + {} replicates",
                self.offset, self.replicates
            )));
        }
        if self.sim_program.as_os_str().is_empty() {
            return Err(Error::InvalidConfig(
                "simulation program path is empty".to_string(),
            ));
        }
        if self.analyse && self.analysis_program.as_os_str().is_empty() {
            return Err(Error::InvalidConfig(
                "analysis program path is empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration layer where every field is optional.
///
/// This is the structure of the experiment file, and also what command line
/// overrides are collected into.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PartialConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant: Option<Variant>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_freq: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replicates: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analyse: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fail_fast: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sim_program: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis_program: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_dir: Option<PathBuf>,
}

impl PartialConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Reads an experiment file.
    ///
    /// A relative `work_dir` inside the file is taken relative to the
    /// directory containing the file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            Error::IoError(format!("failed reading {}: {}", path.display(), e))
        })?;
        let mut partial = PartialConfig::from_toml_str(&content)?;
        if let (Some(dir), Some(parent)) = (&partial.work_dir, path.parent()) {
            if dir.is_relative() {
                partial.work_dir = Some(parent.join(dir));
            }
        }
        debug!("read experiment config from {}", path.display());
        Ok(partial)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string(self)?)
    }
}

impl From<RunConfig> for PartialConfig {
    fn from(c: RunConfig) -> Self {
        PartialConfig {
            variant: Some(c.variant),
            runtime: Some(c.runtime),
            data_freq: Some(c.data_freq),
            replicates: Some(c.replicates),
            offset: Some(c.offset),
            logging: Some(c.logging),
            analyse: Some(c.analyse),
            fail_fast: Some(c.fail_fast),
            sim_program: Some(c.sim_program),
            analysis_program: Some(c.analysis_program),
            work_dir: Some(c.work_dir),
        }
    }
}

#[test]
fn variant_defaults() {
    let t = RunConfig::for_variant(Variant::Transmission);
    assert_eq!((t.runtime, t.data_freq, t.replicates, t.offset), (1000, 50, 10, 0));
    assert!(t.logging && t.analyse && !t.fail_fast);
    assert_eq!(t.sim_program, PathBuf::from("./jcm.jl"));
    assert_eq!(t.analysis_program, PathBuf::from("./analyse.R"));

    let v = RunConfig::for_variant(Variant::Variance);
    assert_eq!((v.runtime, v.data_freq), (500, 10));
    assert!(!v.logging && !v.analyse);

    assert_eq!(RunConfig::default(), t);
}

#[test]
fn layers_apply_in_order() {
    let file = PartialConfig::from_toml_str(
        r#"
        variant = "variance"
        runtime = 800
        replicates = 4
        "#,
    )
    .unwrap();
    let cli = PartialConfig {
        replicates: Some(2),
        logging: Some(true),
        ..Default::default()
    };
    let config = RunConfig::from_layers(&[&file, &cli]);
    assert_eq!(config.variant, Variant::Variance);
    assert_eq!(config.runtime, 800);
    // untouched fields keep the variance defaults
    assert_eq!(config.data_freq, 10);
    assert!(!config.analyse);
    assert_eq!(config.replicates, 2);
    assert!(config.logging);
}

#[test]
fn unknown_keys_rejected() {
    assert!(PartialConfig::from_toml_str("datafreq = 10").is_err());
    assert!(PartialConfig::from_toml_str("variant = \"older\"").is_err());
}

#[test]
fn validate_catches_bad_values() {
    let mut config = RunConfig::default();
    assert!(config.validate().is_ok());
    config.data_freq = 0;
    assert!(config.validate().is_err());

    let mut config = RunConfig::default();
    config.offset = u32::MAX;
    config.replicates = 1;
    assert!(config.validate().is_err());

    // nothing to run is still a valid run
    let mut config = RunConfig::default();
    config.replicates = 0;
    assert!(config.validate().is_ok());
}

#[test]
fn relative_work_dir_follows_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("experiment.toml");
    fs::write(&path, "work_dir = \"runs\"\nanalyse = false\n").unwrap();
    let partial = PartialConfig::from_file(&path).unwrap();
    assert_eq!(partial.work_dir, Some(dir.path().join("runs")));
    assert_eq!(partial.analyse, Some(false));
}

#[test]
fn full_config_survives_toml() {
    let partial = PartialConfig::from(RunConfig::for_variant(Variant::Variance));
    let text = partial.to_toml_string().unwrap();
    assert!(text.contains("variant = \"variance\""));
    assert_eq!(PartialConfig::from_toml_str(&text).unwrap(), partial);
}
