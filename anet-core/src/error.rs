use thiserror::Error;

/// Errors raised while loading or writing anet tables.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("{table} table is missing required column `{column}`")]
    MissingColumn {
        table: &'static str,
        column: &'static str,
    },

    #[error("{table} table line {line}: invalid {column} value `{value}`")]
    InvalidField {
        table: &'static str,
        line: u64,
        column: &'static str,
        value: String,
    },

    #[error("{table} table line {line}: day {day_of_year} does not exist in year {year}")]
    InvalidDayOfYear {
        table: &'static str,
        line: u64,
        year: i32,
        day_of_year: u32,
    },

    #[error("duplicate daily record for site {site_id}, year {year}, day {day_of_year}")]
    DuplicateDailyRecord {
        site_id: String,
        year: i32,
        day_of_year: u32,
    },

    #[error("duplicate phenology record for site {site_id}, year {year}")]
    DuplicatePhenology { site_id: String, year: i32 },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
