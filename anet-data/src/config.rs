//! Aggregation configuration.
//!
//! A run is described by one [`AggregationConfig`], built from defaults, an
//! optional JSON file and command line overrides, and validated once before
//! any record is touched.

use crate::error::AggregateError;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Daylength cutoff of the main analysis (hours).
pub const DEFAULT_DAYLENGTH_THRESHOLD_HOURS: f64 = 10.0;

/// Daylength cutoff of the sensitivity analysis (hours).
pub const SENSITIVITY_DAYLENGTH_THRESHOLD_HOURS: f64 = 11.2;

/// How undefined daily values enter an annual sum.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MissingValuePolicy {
    /// Sum the defined values only; a group without any defined value is
    /// undefined.
    #[default]
    Exclude,
    /// Any undefined value makes the group sum undefined.
    Propagate,
}

/// What to do with annual sums that come out as exactly zero.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ZeroSumPolicy {
    /// Keep zeros; the provenance columns identify gated years.
    #[default]
    Keep,
    /// A zero sum from a group in which every day was gated becomes undefined.
    FullyGatedAsMissing,
    /// Every zero net assimilation sum becomes undefined. Genuine zero years
    /// are discarded along with the gated ones, so this needs confirmation.
    AllZeroAsMissing,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AggregationConfig {
    pub daylength_threshold_hours: f64,
    pub missing_value_policy: MissingValuePolicy,
    pub zero_sum_policy: ZeroSumPolicy,
    pub confirm_zero_as_missing: bool,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        AggregationConfig {
            daylength_threshold_hours: DEFAULT_DAYLENGTH_THRESHOLD_HOURS,
            missing_value_policy: MissingValuePolicy::default(),
            zero_sum_policy: ZeroSumPolicy::default(),
            confirm_zero_as_missing: false,
        }
    }
}

impl AggregationConfig {
    pub fn with_threshold(mut self, daylength_threshold_hours: f64) -> Self {
        self.daylength_threshold_hours = daylength_threshold_hours;
        self
    }

    pub fn with_missing_value_policy(mut self, policy: MissingValuePolicy) -> Self {
        self.missing_value_policy = policy;
        self
    }

    pub fn with_zero_sum_policy(mut self, policy: ZeroSumPolicy) -> Self {
        self.zero_sum_policy = policy;
        self
    }

    /// Parse a JSON config; absent fields take their defaults.
    pub fn from_json_str(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn validate(&self) -> Result<(), AggregateError> {
        let threshold = self.daylength_threshold_hours;
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(AggregateError::InvalidThreshold(threshold));
        }
        if self.zero_sum_policy == ZeroSumPolicy::AllZeroAsMissing && !self.confirm_zero_as_missing
        {
            return Err(AggregateError::UnconfirmedZeroPolicy);
        }
        Ok(())
    }
}

impl FromStr for MissingValuePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "exclude" => Ok(MissingValuePolicy::Exclude),
            "propagate" => Ok(MissingValuePolicy::Propagate),
            other => Err(format!(
                "unknown missing value policy `{other}` (expected exclude or propagate)"
            )),
        }
    }
}

impl fmt::Display for MissingValuePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissingValuePolicy::Exclude => write!(f, "exclude"),
            MissingValuePolicy::Propagate => write!(f, "propagate"),
        }
    }
}

impl FromStr for ZeroSumPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "keep" => Ok(ZeroSumPolicy::Keep),
            "fully-gated-as-missing" => Ok(ZeroSumPolicy::FullyGatedAsMissing),
            "all-zero-as-missing" => Ok(ZeroSumPolicy::AllZeroAsMissing),
            other => Err(format!(
                "unknown zero-sum policy `{other}` (expected keep, fully-gated-as-missing or all-zero-as-missing)"
            )),
        }
    }
}

impl fmt::Display for ZeroSumPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ZeroSumPolicy::Keep => write!(f, "keep"),
            ZeroSumPolicy::FullyGatedAsMissing => write!(f, "fully-gated-as-missing"),
            ZeroSumPolicy::AllZeroAsMissing => write!(f, "all-zero-as-missing"),
        }
    }
}
