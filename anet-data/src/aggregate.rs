//! Daily-to-annual aggregation of gated fluxes.
//!
//! Daily records are joined to their site-year's leaf-on day, gated, grouped
//! by (site_id, latitude, longitude, year) and summed. The whole run is a pure
//! function of its inputs and configuration; rows come out sorted by group
//! key so repeated runs produce identical tables.

use crate::{
    config::{AggregationConfig, MissingValuePolicy, ZeroSumPolicy},
    error::AggregateError,
    gating::GatedDay,
    join::{join_phenology, JoinedDay},
    report::RunReport,
};
use anet_core::{annual::AnnualAssimilation, daily_record::DailyRecord, phenology::PhenologyRecord};
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use std::{cmp::Ordering, collections::BTreeMap};

/// Output of one aggregation run.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    pub rows: Vec<AnnualAssimilation>,
    pub report: RunReport,
}

/// Grouping key of an annual row.
#[derive(Debug, Clone)]
pub struct GroupKey {
    pub site_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub year: i32,
}

impl GroupKey {
    // `+ 0.0` folds -0.0 into 0.0, which total_cmp would otherwise keep apart.
    fn of(record: &DailyRecord) -> Self {
        GroupKey {
            site_id: record.site_id.clone(),
            latitude: record.latitude + 0.0,
            longitude: record.longitude + 0.0,
            year: record.year,
        }
    }
}

impl Ord for GroupKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.site_id
            .cmp(&other.site_id)
            .then(self.latitude.total_cmp(&other.latitude))
            .then(self.longitude.total_cmp(&other.longitude))
            .then(self.year.cmp(&other.year))
    }
}

impl PartialOrd for GroupKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for GroupKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for GroupKey {}

/// Running sum that remembers how many values were undefined.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct SumAccumulator {
    sum: f64,
    defined: u32,
    missing: u32,
}

impl SumAccumulator {
    pub fn add(&mut self, value: Option<f64>) {
        match value {
            Some(v) => {
                self.sum += v;
                self.defined += 1;
            }
            None => self.missing += 1,
        }
    }

    pub fn missing(&self) -> u32 {
        self.missing
    }

    pub fn finish(&self, policy: MissingValuePolicy) -> Option<f64> {
        if self.defined == 0 {
            return None;
        }
        match policy {
            MissingValuePolicy::Exclude => Some(self.sum),
            MissingValuePolicy::Propagate if self.missing > 0 => None,
            MissingValuePolicy::Propagate => Some(self.sum),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct GroupTotals {
    production: SumAccumulator,
    respiration: SumAccumulator,
    days: u32,
    gated_days: u32,
}

impl GroupTotals {
    fn from_days(days: &[JoinedDay<'_>], threshold_hours: f64) -> Self {
        let mut totals = GroupTotals::default();
        for day in days {
            let gated = GatedDay::new(day.record, day.leaf_on_day_of_year, threshold_hours);
            totals.production.add(gated.gross_primary_production);
            totals.respiration.add(gated.respiration);
            totals.days += 1;
            if gated.gate.is_closed() {
                totals.gated_days += 1;
            }
        }
        totals
    }

    fn into_row(self, key: GroupKey, policy: MissingValuePolicy) -> AnnualAssimilation {
        AnnualAssimilation {
            site_id: key.site_id,
            latitude: key.latitude,
            longitude: key.longitude,
            year: key.year,
            net_assimilation_sum: self.production.finish(policy),
            respiration_sum: self.respiration.finish(policy),
            days: self.days,
            gated_days: self.gated_days,
            missing_production_days: self.production.missing(),
            gated_fraction_of_year: self.gated_days as f64 / self.days as f64,
        }
    }
}

fn group_days<'a>(joined: &[JoinedDay<'a>]) -> Vec<(GroupKey, Vec<JoinedDay<'a>>)> {
    let mut groups: BTreeMap<GroupKey, Vec<JoinedDay<'a>>> = BTreeMap::new();
    for day in joined {
        groups.entry(GroupKey::of(day.record)).or_default().push(*day);
    }
    groups.into_iter().collect()
}

#[cfg(not(feature = "parallel"))]
fn sum_groups(
    groups: Vec<(GroupKey, Vec<JoinedDay<'_>>)>,
    threshold_hours: f64,
) -> Vec<(GroupKey, GroupTotals)> {
    groups
        .into_iter()
        .map(|(key, days)| (key, GroupTotals::from_days(&days, threshold_hours)))
        .collect()
}

// Each group is still summed in input order, so results match the serial path.
#[cfg(feature = "parallel")]
fn sum_groups(
    groups: Vec<(GroupKey, Vec<JoinedDay<'_>>)>,
    threshold_hours: f64,
) -> Vec<(GroupKey, GroupTotals)> {
    groups
        .into_par_iter()
        .map(|(key, days)| (key, GroupTotals::from_days(&days, threshold_hours)))
        .collect()
}

/// Apply the zero-sum policy to a row; returns true if a sum was nulled.
fn apply_zero_sum_policy(row: &mut AnnualAssimilation, policy: ZeroSumPolicy) -> bool {
    match policy {
        ZeroSumPolicy::Keep => false,
        ZeroSumPolicy::FullyGatedAsMissing => {
            if !row.is_fully_gated() {
                return false;
            }
            let mut nulled = false;
            for sum in [&mut row.net_assimilation_sum, &mut row.respiration_sum] {
                if *sum == Some(0.0) {
                    *sum = None;
                    nulled = true;
                }
            }
            nulled
        }
        ZeroSumPolicy::AllZeroAsMissing => {
            if row.net_assimilation_sum == Some(0.0) {
                row.net_assimilation_sum = None;
                true
            } else {
                false
            }
        }
    }
}

/// Aggregate daily simulated fluxes into annual gated sums.
///
/// Fails only on an invalid configuration; daily records without a matching
/// phenology record are dropped and listed in the report.
pub fn aggregate(
    daily: &[DailyRecord],
    phenology: &[PhenologyRecord],
    config: &AggregationConfig,
) -> Result<Aggregation, AggregateError> {
    config.validate()?;
    if config.zero_sum_policy == ZeroSumPolicy::AllZeroAsMissing {
        log::warn!(
            "aggregate: every zero net assimilation sum will be written as missing, including genuine zero years"
        );
    }

    let join = join_phenology(daily, phenology);
    let groups = group_days(&join.joined);
    let totals = sum_groups(groups, config.daylength_threshold_hours);

    let mut zero_sums_set_missing = 0;
    let mut missing_production_days = 0;
    let rows: Vec<AnnualAssimilation> = totals
        .into_iter()
        .map(|(key, totals)| {
            let mut row = totals.into_row(key, config.missing_value_policy);
            if apply_zero_sum_policy(&mut row, config.zero_sum_policy) {
                zero_sums_set_missing += 1;
            }
            missing_production_days += row.missing_production_days as usize;
            log::debug!(
                "aggregate: {} {}: {} days, {} gated, net {:?}",
                row.site_id,
                row.year,
                row.days,
                row.gated_days,
                row.net_assimilation_sum
            );
            row
        })
        .collect();

    log::info!(
        "aggregate: {} daily records -> {} annual rows (threshold {} h, {} join mismatches)",
        daily.len(),
        rows.len(),
        config.daylength_threshold_hours,
        join.mismatch_count()
    );

    let report = RunReport {
        config: config.clone(),
        daily_rows: daily.len(),
        phenology_rows: phenology.len(),
        joined_rows: join.joined.len(),
        join_mismatches: join.mismatch_count(),
        annual_rows: rows.len(),
        unmatched_site_years: join.mismatches,
        missing_production_days,
        zero_sums_set_missing,
    };
    Ok(Aggregation { rows, report })
}
