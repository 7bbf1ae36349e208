//! Summary of one aggregation run, persisted next to the annual table.

use crate::{config::AggregationConfig, join::JoinMismatch};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub config: AggregationConfig,
    pub daily_rows: usize,
    pub phenology_rows: usize,
    pub joined_rows: usize,
    /// Daily rows dropped because their site-year has no phenology record.
    pub join_mismatches: usize,
    pub unmatched_site_years: Vec<JoinMismatch>,
    pub annual_rows: usize,
    /// Joined days with a daylength but no simulated production value.
    pub missing_production_days: usize,
    /// Annual rows whose sum was set undefined by the zero-sum policy.
    pub zero_sums_set_missing: usize,
}

impl RunReport {
    pub fn has_join_mismatches(&self) -> bool {
        self.join_mismatches > 0
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
