//! `check-formula`: validate a regression formula against a table header.

use anet_data::formula::{ModelFormula, ModelFrame};
use anyhow::Context;
use log::info;

/// Parse `formula`, check its variables against the columns of `table_csv`
/// and return how many rows have every variable defined.
pub fn run_check_formula(table_csv: &str, formula: &str) -> anyhow::Result<usize> {
    let formula =
        ModelFormula::parse(formula).with_context(|| format!("invalid formula `{formula}`"))?;
    let file = std::fs::File::open(table_csv)
        .with_context(|| format!("failed to open {table_csv}"))?;
    let frame =
        ModelFrame::read_csv(file).with_context(|| format!("failed to read {table_csv}"))?;
    let complete = frame
        .complete_cases(&formula)
        .with_context(|| format!("formula `{formula}` does not fit {table_csv}"))?;
    info!(
        "Formula `{}` is valid for {}: {} of {} rows complete",
        formula,
        table_csv,
        complete,
        frame.rows.len()
    );
    Ok(complete)
}
