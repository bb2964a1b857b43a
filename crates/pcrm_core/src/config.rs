//! Engine configuration.
//!
//! # Responsibility
//! - Hold the tunables used by scoring, graph enrichment and the dashboard.
//! - Load them from TOML with documented defaults for every missing key.
//!
//! # Invariants
//! - A config that reached the engine has passed `validate()`; range errors are
//!   raised at load time, never mid-render.

use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;

pub const DEFAULT_HALF_LIFE_DAYS: f64 = 30.0;
pub const DEFAULT_NEW_CONTACT_GRACE_DAYS: u32 = 7;
pub const DEFAULT_MAX_PROXIMITY_BOOST: f64 = 0.2;
pub const DEFAULT_TOP_K_SUGGESTIONS: usize = 5;
pub const DEFAULT_OVERDUE_THRESHOLD: f64 = 0.8;
pub const DEFAULT_OCCASION_LEAD_DAYS: u32 = 7;

/// Tunables for one dashboard render.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Days for the recency decay to fall to `1/e`.
    pub half_life_days: f64,
    /// Days a contact without interactions is treated as freshly met.
    pub new_contact_grace_days: u32,
    /// Upper bound for the social-proximity boost.
    pub max_proximity_boost: f64,
    pub top_k_suggestions: usize,
    /// Adjusted scores strictly above this are tagged overdue.
    pub overdue_threshold: f64,
    /// Default advance-notice window for occasions without their own lead.
    pub occasion_lead_days: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            half_life_days: DEFAULT_HALF_LIFE_DAYS,
            new_contact_grace_days: DEFAULT_NEW_CONTACT_GRACE_DAYS,
            max_proximity_boost: DEFAULT_MAX_PROXIMITY_BOOST,
            top_k_suggestions: DEFAULT_TOP_K_SUGGESTIONS,
            overdue_threshold: DEFAULT_OVERDUE_THRESHOLD,
            occasion_lead_days: DEFAULT_OCCASION_LEAD_DAYS,
        }
    }
}

/// Invalid or unreadable configuration.
#[derive(Debug)]
pub enum ConfigurationError {
    /// A numeric field is outside its allowed range.
    OutOfRange {
        field: &'static str,
        value: f64,
        expected: &'static str,
    },
    /// TOML text could not be parsed into `EngineConfig`.
    Parse(toml::de::Error),
    /// Config file could not be read.
    Io(std::io::Error),
}

impl Display for ConfigurationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OutOfRange {
                field,
                value,
                expected,
            } => write!(f, "config `{field}` = {value} is out of range; expected {expected}"),
            Self::Parse(err) => write!(f, "invalid engine config: {err}"),
            Self::Io(err) => write!(f, "failed to read engine config: {err}"),
        }
    }
}

impl Error for ConfigurationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::OutOfRange { .. } => None,
            Self::Parse(err) => Some(err),
            Self::Io(err) => Some(err),
        }
    }
}

impl From<toml::de::Error> for ConfigurationError {
    fn from(value: toml::de::Error) -> Self {
        Self::Parse(value)
    }
}

impl From<std::io::Error> for ConfigurationError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl EngineConfig {
    /// Parses and validates a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigurationError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML config file.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Checks every field range.
    ///
    /// # Errors
    /// - `half_life_days` must be finite and > 0.
    /// - `max_proximity_boost` and `overdue_threshold` must lie within `[0, 1]`.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if !self.half_life_days.is_finite() || self.half_life_days <= 0.0 {
            return Err(ConfigurationError::OutOfRange {
                field: "half_life_days",
                value: self.half_life_days,
                expected: "a finite value > 0",
            });
        }
        require_unit_interval("max_proximity_boost", self.max_proximity_boost)?;
        require_unit_interval("overdue_threshold", self.overdue_threshold)?;
        Ok(())
    }
}

fn require_unit_interval(field: &'static str, value: f64) -> Result<(), ConfigurationError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        return Ok(());
    }
    Err(ConfigurationError::OutOfRange {
        field,
        value,
        expected: "a value within [0, 1]",
    })
}
