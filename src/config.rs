//! Engine configuration.
//!
//! Every field has a default, so an empty TOML document is a valid
//! configuration.
//!
//! ```toml
//! capacity_warning_ratio = 0.85
//! enforce_change_windows = true
//! grade_scale_max = 5.0
//!
//! [risk]
//! red_gpa = 3.0
//! yellow_gpa = 3.5
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{EngineError, EngineResult};
use crate::risk::RiskThresholds;

/// Tunables for validation and risk classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Target occupancy at or above which a capacity warning is emitted.
    #[serde(default = "default_capacity_warning_ratio")]
    pub capacity_warning_ratio: f64,
    /// Whether CREATION/APPROVAL change windows are checked.
    #[serde(default = "default_enforce_change_windows")]
    pub enforce_change_windows: bool,
    /// Upper bound of the grade scale.
    #[serde(default = "default_grade_scale_max")]
    pub grade_scale_max: f64,
    #[serde(default)]
    pub risk: RiskThresholds,
}

fn default_capacity_warning_ratio() -> f64 {
    0.9
}

fn default_enforce_change_windows() -> bool {
    true
}

fn default_grade_scale_max() -> f64 {
    5.0
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            capacity_warning_ratio: default_capacity_warning_ratio(),
            enforce_change_windows: default_enforce_change_windows(),
            grade_scale_max: default_grade_scale_max(),
            risk: RiskThresholds::default(),
        }
    }
}

impl EngineConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(content: &str) -> EngineResult<Self> {
        let config: EngineConfig = toml::from_str(content)
            .map_err(|e| EngineError::Config(format!("failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            EngineError::Config(format!(
                "failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn with_capacity_warning_ratio(mut self, ratio: f64) -> Self {
        self.capacity_warning_ratio = ratio;
        self
    }

    pub fn with_change_windows(mut self, enforce: bool) -> Self {
        self.enforce_change_windows = enforce;
        self
    }

    pub fn with_risk(mut self, risk: RiskThresholds) -> Self {
        self.risk = risk;
        self
    }

    /// Checks value ranges and threshold ordering.
    pub fn validate(&self) -> EngineResult<()> {
        if !(self.capacity_warning_ratio > 0.0 && self.capacity_warning_ratio <= 1.0) {
            return Err(EngineError::Config(format!(
                "capacity_warning_ratio must be in (0, 1], got {}",
                self.capacity_warning_ratio
            )));
        }
        if !(self.grade_scale_max > 0.0) {
            return Err(EngineError::Config(format!(
                "grade_scale_max must be positive, got {}",
                self.grade_scale_max
            )));
        }

        let r = &self.risk;
        if r.red_gpa > r.yellow_gpa {
            return Err(EngineError::Config(format!(
                "risk.red_gpa ({}) must not exceed risk.yellow_gpa ({})",
                r.red_gpa, r.yellow_gpa
            )));
        }
        if r.red_completion_rate > r.yellow_completion_rate {
            return Err(EngineError::Config(format!(
                "risk.red_completion_rate ({}) must not exceed risk.yellow_completion_rate ({})",
                r.red_completion_rate, r.yellow_completion_rate
            )));
        }
        if r.red_max_failed < r.yellow_max_failed {
            return Err(EngineError::Config(format!(
                "risk.red_max_failed ({}) must be at least risk.yellow_max_failed ({})",
                r.red_max_failed, r.yellow_max_failed
            )));
        }
        Ok(())
    }
}
