//! Daylength-threshold sensitivity runs over one pair of input tables.

use crate::{
    aggregate::{aggregate, Aggregation},
    config::{
        AggregationConfig, DEFAULT_DAYLENGTH_THRESHOLD_HOURS,
        SENSITIVITY_DAYLENGTH_THRESHOLD_HOURS,
    },
    error::AggregateError,
};
use anet_core::{daily_record::DailyRecord, phenology::PhenologyRecord};

/// Thresholds of the published main and sensitivity analyses.
pub const DEFAULT_SENSITIVITY_THRESHOLDS: [f64; 2] = [
    DEFAULT_DAYLENGTH_THRESHOLD_HOURS,
    SENSITIVITY_DAYLENGTH_THRESHOLD_HOURS,
];

#[derive(Debug, Clone, PartialEq)]
pub struct SensitivityRun {
    pub threshold_hours: f64,
    pub aggregation: Aggregation,
}

impl SensitivityRun {
    /// Short label for file names, e.g. `10` or `11.2`.
    pub fn label(&self) -> String {
        threshold_label(self.threshold_hours)
    }
}

pub fn threshold_label(threshold_hours: f64) -> String {
    format!("{threshold_hours}")
}

/// Aggregate once per threshold, all other settings taken from `base`.
///
/// Every threshold is validated before the first run starts.
pub fn run_sensitivity(
    daily: &[DailyRecord],
    phenology: &[PhenologyRecord],
    base: &AggregationConfig,
    thresholds: &[f64],
) -> Result<Vec<SensitivityRun>, AggregateError> {
    if thresholds.is_empty() {
        return Err(AggregateError::EmptyThresholdList);
    }
    let configs: Vec<AggregationConfig> = thresholds
        .iter()
        .map(|&threshold| base.clone().with_threshold(threshold))
        .collect();
    for config in &configs {
        config.validate()?;
    }

    configs
        .into_iter()
        .map(|config| {
            log::info!(
                "sensitivity: aggregating with daylength threshold {} h",
                config.daylength_threshold_hours
            );
            Ok(SensitivityRun {
                threshold_hours: config.daylength_threshold_hours,
                aggregation: aggregate(daily, phenology, &config)?,
            })
        })
        .collect()
}
