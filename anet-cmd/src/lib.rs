//! Command implementations for the anet CLI.
//!
//! Provides subcommands for aggregating daily simulated carbon fluxes into
//! gated annual sums, for running daylength-threshold sensitivity batches,
//! and for validating a regression formula against an output table.

use anet_core::daily_record::DaylengthSource;
use anet_data::config::{AggregationConfig, MissingValuePolicy, ZeroSumPolicy};
use anyhow::Context;
use clap::{Args, Subcommand};

pub mod aggregate;
pub mod formula;
pub mod sensitivity;

/// Options shared by every command that runs the aggregator.
#[derive(Args, Debug, Clone, Default)]
pub struct PolicyArgs {
    /// JSON file with aggregation settings; flags below override it
    #[arg(long)]
    pub config: Option<String>,

    /// How undefined daily values enter annual sums: exclude or propagate
    #[arg(long)]
    pub missing_policy: Option<MissingValuePolicy>,

    /// Treatment of zero annual sums: keep, fully-gated-as-missing or all-zero-as-missing
    #[arg(long)]
    pub zero_policy: Option<ZeroSumPolicy>,

    /// Accept that all-zero-as-missing discards genuine zero assimilation years
    #[arg(long)]
    pub confirm_zero_as_missing: bool,

    /// Compute daylength from latitude and day of year instead of reading it
    #[arg(long)]
    pub compute_daylength: bool,
}

impl PolicyArgs {
    /// Build the run configuration: defaults, then the config file, then flags.
    pub fn load_config(&self) -> anyhow::Result<AggregationConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let json = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read config {path}"))?;
                AggregationConfig::from_json_str(&json)
                    .with_context(|| format!("failed to parse config {path}"))?
            }
            None => AggregationConfig::default(),
        };
        if let Some(policy) = self.missing_policy {
            config.missing_value_policy = policy;
        }
        if let Some(policy) = self.zero_policy {
            config.zero_sum_policy = policy;
        }
        if self.confirm_zero_as_missing {
            config.confirm_zero_as_missing = true;
        }
        Ok(config)
    }

    pub fn daylength_source(&self) -> DaylengthSource {
        if self.compute_daylength {
            DaylengthSource::Computed
        } else {
            DaylengthSource::Column
        }
    }
}

#[derive(Subcommand)]
pub enum Command {
    /// Aggregate daily simulation output into gated annual net assimilation sums
    Aggregate {
        /// Daily simulation output CSV (site, year, day, location, gpp, respiration, daylength)
        #[arg(short = 'd', long)]
        daily_csv: String,

        /// Phenology CSV with one leaf-on day per site and year
        #[arg(short = 'p', long)]
        phenology_csv: String,

        /// Output path for the annual sums CSV
        #[arg(short = 'o', long)]
        output_csv: String,

        /// Daylength threshold in hours; days at or below it are gated
        #[arg(short = 't', long)]
        threshold: Option<f64>,

        /// Output path for the JSON run report
        #[arg(long)]
        report_json: Option<String>,

        #[command(flatten)]
        policy: PolicyArgs,
    },

    /// Aggregate once per daylength threshold (default 10 and 11.2 hours)
    Sensitivity {
        /// Daily simulation output CSV
        #[arg(short = 'd', long)]
        daily_csv: String,

        /// Phenology CSV with one leaf-on day per site and year
        #[arg(short = 'p', long)]
        phenology_csv: String,

        /// Directory for the per-threshold annual CSVs and reports
        #[arg(short = 'o', long)]
        output_dir: String,

        /// Daylength threshold in hours; repeat for several runs
        #[arg(short = 't', long = "threshold")]
        thresholds: Vec<f64>,

        #[command(flatten)]
        policy: PolicyArgs,
    },

    /// Check that a regression formula only uses columns present in a table
    CheckFormula {
        /// CSV table the formula will be fitted on
        #[arg(short = 't', long)]
        table_csv: String,

        /// Formula such as "eos ~ net_assimilation_sum + (1 | site_id)"
        #[arg(short = 'f', long)]
        formula: String,
    },
}

pub fn run(command: Command) -> anyhow::Result<()> {
    match command {
        Command::Aggregate {
            daily_csv,
            phenology_csv,
            output_csv,
            threshold,
            report_json,
            policy,
        } => aggregate::run_aggregate(
            &daily_csv,
            &phenology_csv,
            &output_csv,
            threshold,
            report_json.as_deref(),
            &policy,
        )
        .map(|_| ()),
        Command::Sensitivity {
            daily_csv,
            phenology_csv,
            output_dir,
            thresholds,
            policy,
        } => sensitivity::run_sensitivity_batch(
            &daily_csv,
            &phenology_csv,
            &output_dir,
            &thresholds,
            &policy,
        )
        .map(|_| ()),
        Command::CheckFormula {
            table_csv,
            formula: expression,
        } => formula::run_check_formula(&table_csv, &expression).map(|_| ()),
    }
}


#[cfg(test)]
mod tests {
    use super::PolicyArgs;
    use super::test_support::scratch_dir;
    use anet_data::config::{MissingValuePolicy, ZeroSumPolicy};

    #[test]
    fn test_flags_override_config_file() {
        let dir = scratch_dir("config");
        let path = dir.join("config.json");
        std::fs::write(
            &path,
            r#"{"daylength_threshold_hours": 11.2, "missing_value_policy": "propagate", "zero_sum_policy": "fully-gated-as-missing"}"#,
        )
        .unwrap();
        let args = PolicyArgs {
            config: Some(path.to_string_lossy().into_owned()),
            zero_policy: Some(ZeroSumPolicy::Keep),
            ..PolicyArgs::default()
        };
        let config = args.load_config().unwrap();
        assert_eq!(config.daylength_threshold_hours, 11.2);
        assert_eq!(config.missing_value_policy, MissingValuePolicy::Propagate);
        assert_eq!(config.zero_sum_policy, ZeroSumPolicy::Keep);
    }

    #[test]
    fn test_unreadable_config_is_an_error() {
        let args = PolicyArgs {
            config: Some("/nonexistent/anet-config.json".to_string()),
            ..PolicyArgs::default()
        };
        assert!(args.load_config().is_err());
    }
}
