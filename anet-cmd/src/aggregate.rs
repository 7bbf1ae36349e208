//! `aggregate`: daily simulation output to annual gated sums.

use crate::PolicyArgs;
use anet_core::{
    annual::AnnualAssimilation,
    daily_record::{DailyRecord, DaylengthSource},
    phenology::PhenologyRecord,
};
use anet_data::{aggregate::aggregate, report::RunReport};
use anyhow::Context;
use log::{info, warn};
use std::path::Path;

/// Load both input tables, validating their headers before any row is read.
pub fn load_inputs(
    daily_csv: &str,
    phenology_csv: &str,
    source: DaylengthSource,
) -> anyhow::Result<(Vec<DailyRecord>, Vec<PhenologyRecord>)> {
    let daily = DailyRecord::read_daily_path(Path::new(daily_csv), source)
        .with_context(|| format!("failed to load daily table {daily_csv}"))?;
    let phenology = PhenologyRecord::read_phenology_path(Path::new(phenology_csv))
        .with_context(|| format!("failed to load phenology table {phenology_csv}"))?;
    Ok((daily, phenology))
}

/// Write a run report as pretty JSON.
pub fn write_report(report: &RunReport, path: &str) -> anyhow::Result<()> {
    let json = report.to_json_pretty()?;
    std::fs::write(path, json).with_context(|| format!("failed to write report {path}"))?;
    info!("Report written to {}", path);
    Ok(())
}

pub(crate) fn log_mismatches(report: &RunReport) {
    if report.has_join_mismatches() {
        warn!(
            "{} daily rows from {} site-years had no phenology record and were dropped",
            report.join_mismatches,
            report.unmatched_site_years.len()
        );
    }
}

/// Run a single aggregation.
///
/// The configuration is validated before the inputs are read, so an invalid
/// threshold rejects the run without touching any file.
pub fn run_aggregate(
    daily_csv: &str,
    phenology_csv: &str,
    output_csv: &str,
    threshold: Option<f64>,
    report_json: Option<&str>,
    policy: &PolicyArgs,
) -> anyhow::Result<RunReport> {
    let mut config = policy.load_config()?;
    if let Some(threshold) = threshold {
        config.daylength_threshold_hours = threshold;
    }
    config.validate()?;

    info!(
        "Aggregating {} with phenology {} (threshold {} h, missing values: {}, zero sums: {})",
        daily_csv,
        phenology_csv,
        config.daylength_threshold_hours,
        config.missing_value_policy,
        config.zero_sum_policy
    );

    let (daily, phenology) = load_inputs(daily_csv, phenology_csv, policy.daylength_source())?;
    let result = aggregate(&daily, &phenology, &config)?;
    log_mismatches(&result.report);

    AnnualAssimilation::write_annual_path(&result.rows, Path::new(output_csv))
        .with_context(|| format!("failed to write {output_csv}"))?;
    if let Some(path) = report_json {
        write_report(&result.report, path)?;
    }

    info!(
        "Aggregation complete. {} annual rows written to {}",
        result.rows.len(),
        output_csv
    );
    Ok(result.report)
}

#[cfg(test)]
mod tests {
    use super::run_aggregate;
    use crate::test_support::{path_str, scratch_dir};
    use crate::PolicyArgs;
    use anet_core::annual::AnnualAssimilation;

    #[test]
    fn test_run_aggregate_writes_table_and_report() {
        let dir = scratch_dir("aggregate");
        let output = dir.join("annual.csv");
        let report_path = dir.join("report.json");
        let report = run_aggregate(
            &path_str(&dir.join("daily.csv")),
            &path_str(&dir.join("phenology.csv")),
            &path_str(&output),
            None,
            Some(&path_str(&report_path)),
            &PolicyArgs::default(),
        )
        .unwrap();

        assert_eq!(report.join_mismatches, 1);
        assert_eq!(report.annual_rows, 1);

        let rows =
            AnnualAssimilation::parse_annual_csv(&std::fs::read_to_string(&output).unwrap())
                .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].site_id, "A");
        assert_eq!(rows[0].net_assimilation_sum, Some(5.0));
        assert_eq!(rows[0].gated_days, 2);

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&report_path).unwrap()).unwrap();
        assert_eq!(json["join_mismatches"], 1);
        assert_eq!(json["unmatched_site_years"][0]["site_id"], "B");
        assert_eq!(json["config"]["missing_value_policy"], "exclude");
    }

    #[test]
    fn test_threshold_flag_changes_gating() {
        let dir = scratch_dir("aggregate-threshold");
        let output = dir.join("annual.csv");
        run_aggregate(
            &path_str(&dir.join("daily.csv")),
            &path_str(&dir.join("phenology.csv")),
            &path_str(&output),
            Some(11.0),
            None,
            &PolicyArgs::default(),
        )
        .unwrap();
        let rows =
            AnnualAssimilation::parse_annual_csv(&std::fs::read_to_string(&output).unwrap())
                .unwrap();
        // only day 282 (11.1 h) is longer than 11 h
        assert_eq!(rows[0].net_assimilation_sum, Some(2.0));
    }

    #[test]
    fn test_negative_threshold_rejected_before_reading_inputs() {
        let dir = scratch_dir("aggregate-invalid");
        let output = dir.join("annual.csv");
        let err = run_aggregate(
            "/nonexistent/daily.csv",
            "/nonexistent/phenology.csv",
            &path_str(&output),
            Some(-3.0),
            None,
            &PolicyArgs::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("daylength threshold"));
        assert!(!output.exists());
    }

    #[test]
    fn test_all_rows_unmatched_still_writes_header() {
        let dir = scratch_dir("aggregate-unmatched");
        std::fs::write(
            dir.join("phenology.csv"),
            "site_id,year,leaf_on_day_of_year\nC,2011,120\n",
        )
        .unwrap();
        let output = dir.join("annual.csv");
        let report = run_aggregate(
            &path_str(&dir.join("daily.csv")),
            &path_str(&dir.join("phenology.csv")),
            &path_str(&output),
            None,
            None,
            &PolicyArgs::default(),
        )
        .unwrap();
        assert_eq!(report.annual_rows, 0);
        assert_eq!(report.join_mismatches, 5);

        let text = std::fs::read_to_string(&output).unwrap();
        assert!(text.starts_with("site_id,latitude,longitude,year,net_assimilation_sum"));
        assert!(AnnualAssimilation::parse_annual_csv(&text).unwrap().is_empty());
    }

    #[test]
    fn test_missing_column_fails_run() {
        let dir = scratch_dir("aggregate-schema");
        std::fs::write(
            dir.join("daily.csv"),
            "site_id,year,doy,lat,lon,gpp\nA,2010,281,46.5,7.5,3.0\n",
        )
        .unwrap();
        let err = run_aggregate(
            &path_str(&dir.join("daily.csv")),
            &path_str(&dir.join("phenology.csv")),
            &path_str(&dir.join("annual.csv")),
            None,
            None,
            &PolicyArgs::default(),
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("respiration"));
    }
}
