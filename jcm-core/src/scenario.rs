//! Scenario definitions.
//!
//! A scenario is a named combination of simulation flags. Scenarios come in
//! two families, called *variants*: the `transmission` variant compares
//! pathogen transmission ranges, while the older `variance` variant compares
//! trait variance against pathogen presence.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::{HIGH_INFECTION_RADIUS, LOW_INFECTION_RADIUS};

/// Family of scenarios, also deciding data file naming and run defaults.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    /// `null`, `nopat`, `lopat` and `hipat`, with `.csv` data files.
    Transmission,
    /// `null`, `variance` and `pathogens`, with extension-less data files.
    Variance,
}

impl Default for Variant {
    fn default() -> Self {
        Variant::Transmission
    }
}

impl Variant {
    pub const ALL: [Variant; 2] = [Variant::Transmission, Variant::Variance];

    pub fn name(&self) -> &'static str {
        match self {
            Variant::Transmission => "transmission",
            Variant::Variance => "variance",
        }
    }

    /// Scenarios recognized by this variant, in listing order.
    pub fn scenarios(&self) -> &'static [Scenario] {
        match self {
            Variant::Transmission => &[
                Scenario::Null,
                Scenario::NoPat,
                Scenario::LoPat,
                Scenario::HiPat,
            ],
            Variant::Variance => &[Scenario::Null, Scenario::Variance, Scenario::Pathogens],
        }
    }

    /// Extension given to simulation data files, if any.
    pub fn data_extension(&self) -> Option<&'static str> {
        match self {
            Variant::Transmission => Some("csv"),
            Variant::Variance => None,
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Variant {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "transmission" => Ok(Variant::Transmission),
            "variance" => Ok(Variant::Variance),
            _ => Err(Error::UnknownVariant(s.to_string())),
        }
    }
}

/// Named simulation setup.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Scenario {
    /// No pathogens, all species have identical trait values.
    Null,
    /// No pathogens, species trait values vary.
    NoPat,
    /// Traits vary, pathogens with a short transmission range.
    LoPat,
    /// Traits vary, pathogens with a long transmission range.
    HiPat,
    /// No pathogens, species trait values vary.
    Variance,
    /// Pathogens present, default transmission range.
    Pathogens,
}

/// Simulation flags derived from a scenario.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct ScenarioFlags {
    /// Neutral mode (`-n`).
    pub neutral: bool,
    /// Pathogens enabled (`-p`).
    pub pathogens: bool,
    /// Infection radius (`-i <radius>`).
    pub infection_radius: Option<u32>,
}

/// Renders the flags the way they appear on the simulation command line.
impl fmt::Display for ScenarioFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if self.neutral {
            parts.push("-n".to_string());
        }
        if self.pathogens {
            parts.push("-p".to_string());
        }
        if let Some(radius) = self.infection_radius {
            parts.push(format!("-i {}", radius));
        }
        f.write_str(&parts.join(" "))
    }
}

impl Scenario {
    pub fn name(&self) -> &'static str {
        match self {
            Scenario::Null => "null",
            Scenario::NoPat => "nopat",
            Scenario::LoPat => "lopat",
            Scenario::HiPat => "hipat",
            Scenario::Variance => "variance",
            Scenario::Pathogens => "pathogens",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Scenario::Null => "no pathogens, all species have identical trait values",
            Scenario::NoPat | Scenario::Variance => "no pathogens, species trait values vary",
            Scenario::LoPat => "traits vary, pathogens with transmission = 40",
            Scenario::HiPat => "traits vary, pathogens with transmission = 200",
            Scenario::Pathogens => "traits vary, pathogens with default transmission",
        }
    }

    pub fn flags(&self) -> ScenarioFlags {
        match self {
            Scenario::Null => ScenarioFlags {
                neutral: true,
                ..Default::default()
            },
            Scenario::NoPat | Scenario::Variance => ScenarioFlags::default(),
            Scenario::Pathogens => ScenarioFlags {
                pathogens: true,
                ..Default::default()
            },
            Scenario::LoPat => ScenarioFlags {
                pathogens: true,
                infection_radius: Some(LOW_INFECTION_RADIUS),
                ..Default::default()
            },
            Scenario::HiPat => ScenarioFlags {
                pathogens: true,
                infection_radius: Some(HIGH_INFECTION_RADIUS),
                ..Default::default()
            },
        }
    }

    /// Resolves a scenario label within the given variant.
    ///
    /// Labels are matched exactly. Labels belonging to the other variant are
    /// rejected the same way as unknown ones.
    pub fn parse(name: &str, variant: Variant) -> Result<Scenario> {
        let known = variant.scenarios();
        if let Some(scenario) = known.iter().find(|s| s.name() == name) {
            return Ok(*scenario);
        }
        let hint = known
            .iter()
            .map(|s| (strsim::levenshtein(name, s.name()), s.name()))
            .filter(|(dist, _)| *dist <= 2)
            .min_by_key(|(dist, _)| *dist)
            .map(|(_, closest)| format!(", did you mean `{}`?", closest))
            .unwrap_or_default();
        Err(Error::UnknownScenario {
            name: name.to_string(),
            variant,
            expected: known
                .iter()
                .map(|s| s.name())
                .collect::<Vec<_>>()
                .join(", "),
            hint,
        })
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[test]
fn parse_known_labels() {
    for variant in Variant::ALL.iter() {
        for scenario in variant.scenarios() {
            assert_eq!(Scenario::parse(scenario.name(), *variant).unwrap(), *scenario);
        }
    }
}

#[test]
fn parse_rejects_other_variant_labels() {
    assert!(Scenario::parse("hipat", Variant::Variance).is_err());
    assert!(Scenario::parse("pathogens", Variant::Transmission).is_err());
    assert!(Scenario::parse("variance", Variant::Transmission).is_err());
    assert!(Scenario::parse("Null", Variant::Transmission).is_err());
    assert!(Scenario::parse("", Variant::Transmission).is_err());
}

#[test]
fn parse_suggests_close_label() {
    let err = Scenario::parse("hipath", Variant::Transmission).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("bad scenario: hipath"));
    assert!(msg.contains("did you mean `hipat`?"));

    let err = Scenario::parse("something", Variant::Transmission).unwrap_err();
    assert!(!err.to_string().contains("did you mean"));
}

#[test]
fn flags_follow_table() {
    let null = Scenario::Null.flags();
    assert!(null.neutral && !null.pathogens && null.infection_radius.is_none());

    for s in &[Scenario::NoPat, Scenario::Variance] {
        assert_eq!(s.flags(), ScenarioFlags::default());
    }

    let pathogens = Scenario::Pathogens.flags();
    assert!(pathogens.pathogens && pathogens.infection_radius.is_none());

    assert_eq!(Scenario::LoPat.flags().infection_radius, Some(40));
    assert_eq!(Scenario::HiPat.flags().infection_radius, Some(200));
    assert!(!Scenario::HiPat.flags().neutral);
}

#[test]
fn flags_display() {
    assert_eq!(Scenario::Null.flags().to_string(), "-n");
    assert_eq!(Scenario::NoPat.flags().to_string(), "");
    assert_eq!(Scenario::HiPat.flags().to_string(), "-p -i 200");
}

#[test]
fn variant_from_str() {
    assert_eq!("variance".parse::<Variant>().unwrap(), Variant::Variance);
    assert_eq!(
        "transmission".parse::<Variant>().unwrap(),
        Variant::Transmission
    );
    assert!("older".parse::<Variant>().is_err());
}
