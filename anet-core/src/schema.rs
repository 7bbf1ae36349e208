//! Column schemas for the input tables.
//!
//! Columns are resolved by header name once, before any row is read, so a
//! table exported with a missing or misspelled column fails the run up front
//! instead of producing silently shifted values. Each logical column accepts
//! a short list of aliases matching the names used by the P-model and
//! LPJ-GUESS exports (`sitename`, `doy`, `gpp`, `rd`, ...).

use crate::error::CoreError;
use csv::StringRecord;
use std::str::FromStr;

/// A logical column and the header names it may appear under.
#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
}

/// The set of columns a table must provide.
#[derive(Debug, Clone, Copy)]
pub struct TableSchema {
    pub table: &'static str,
    pub columns: &'static [Column],
}

pub const SITE_ID: &str = "site_id";
pub const YEAR: &str = "year";
pub const DAY_OF_YEAR: &str = "day_of_year";
pub const LATITUDE: &str = "latitude";
pub const LONGITUDE: &str = "longitude";
pub const GROSS_PRIMARY_PRODUCTION: &str = "gross_primary_production";
pub const RESPIRATION: &str = "respiration";
pub const DAYLENGTH_HOURS: &str = "daylength_hours";
pub const LEAF_ON_DAY_OF_YEAR: &str = "leaf_on_day_of_year";

const SITE_ID_COLUMN: Column = Column {
    name: SITE_ID,
    aliases: &["site_id", "sitename", "site"],
};

const YEAR_COLUMN: Column = Column {
    name: YEAR,
    aliases: &["year"],
};

/// Per-site, per-day simulation output.
pub const DAILY_SCHEMA: TableSchema = TableSchema {
    table: "daily",
    columns: &[
        SITE_ID_COLUMN,
        YEAR_COLUMN,
        Column {
            name: DAY_OF_YEAR,
            aliases: &["day_of_year", "doy"],
        },
        Column {
            name: LATITUDE,
            aliases: &["latitude", "lat"],
        },
        Column {
            name: LONGITUDE,
            aliases: &["longitude", "lon"],
        },
        Column {
            name: GROSS_PRIMARY_PRODUCTION,
            aliases: &["gross_primary_production", "gpp"],
        },
        Column {
            name: RESPIRATION,
            aliases: &["respiration", "rd"],
        },
        Column {
            name: DAYLENGTH_HOURS,
            aliases: &["daylength_hours", "daylength"],
        },
    ],
};

/// Observed leaf-on dates, one row per site-year.
pub const PHENOLOGY_SCHEMA: TableSchema = TableSchema {
    table: "phenology",
    columns: &[
        SITE_ID_COLUMN,
        YEAR_COLUMN,
        Column {
            name: LEAF_ON_DAY_OF_YEAR,
            aliases: &["leaf_on_day_of_year", "leaf_on", "sos"],
        },
    ],
};

/// Tokens read as an undefined numeric value (compared case-insensitively).
pub const MISSING_TOKENS: [&str; 5] = ["", "na", "nan", "null", "n/a"];

/// Returns true if a cell holds one of the [`MISSING_TOKENS`].
pub fn is_missing_token(cell: &str) -> bool {
    let lowered = cell.trim().to_lowercase();
    MISSING_TOKENS.contains(&lowered.as_str())
}

/// Header positions of a table's logical columns.
#[derive(Debug, Clone)]
pub struct ResolvedColumns {
    table: &'static str,
    positions: Vec<(&'static str, Option<usize>)>,
}

impl TableSchema {
    /// Resolve every column of the schema against a header row.
    ///
    /// Columns named in `optional` may be absent; any other unresolved column
    /// is a [`CoreError::MissingColumn`].
    pub fn resolve(
        &self,
        headers: &StringRecord,
        optional: &[&str],
    ) -> Result<ResolvedColumns, CoreError> {
        let normalized: Vec<String> = headers.iter().map(|h| h.trim().to_lowercase()).collect();
        let mut positions = Vec::with_capacity(self.columns.len());
        for column in self.columns {
            let position = normalized
                .iter()
                .position(|header| column.aliases.contains(&header.as_str()));
            if position.is_none() && !optional.contains(&column.name) {
                return Err(CoreError::MissingColumn {
                    table: self.table,
                    column: column.name,
                });
            }
            positions.push((column.name, position));
        }
        Ok(ResolvedColumns {
            table: self.table,
            positions,
        })
    }

    /// Logical column names in schema order.
    pub fn column_names(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.name).collect()
    }
}

impl ResolvedColumns {
    /// Returns true if the column was found in the header.
    pub fn contains(&self, column: &str) -> bool {
        self.position(column).is_some()
    }

    fn position(&self, column: &str) -> Option<usize> {
        self.positions
            .iter()
            .find(|(name, _)| *name == column)
            .and_then(|(_, position)| *position)
    }

    /// Bind a data row to these columns for typed field access.
    pub fn row<'r>(&'r self, record: &'r StringRecord) -> Row<'r> {
        Row {
            columns: self,
            record,
        }
    }
}

/// A data row with typed, schema-aware accessors.
pub struct Row<'r> {
    columns: &'r ResolvedColumns,
    record: &'r StringRecord,
}

impl Row<'_> {
    /// 1-based line number of the row in its source, or 0 if unknown.
    pub fn line(&self) -> u64 {
        self.record.position().map(|p| p.line()).unwrap_or_default()
    }

    fn cell(&self, column: &'static str) -> &str {
        self.columns
            .position(column)
            .and_then(|position| self.record.get(position))
            .unwrap_or("")
            .trim()
    }

    pub fn invalid(&self, column: &'static str, value: &str) -> CoreError {
        CoreError::InvalidField {
            table: self.columns.table,
            line: self.line(),
            column,
            value: value.to_string(),
        }
    }

    /// A non-empty text cell.
    pub fn text(&self, column: &'static str) -> Result<String, CoreError> {
        let cell = self.cell(column);
        if cell.is_empty() {
            return Err(self.invalid(column, cell));
        }
        Ok(cell.to_string())
    }

    /// A required cell parsed as `T`; missing tokens are rejected.
    pub fn parse<T: FromStr>(&self, column: &'static str) -> Result<T, CoreError> {
        let cell = self.cell(column);
        cell.parse::<T>().map_err(|_| self.invalid(column, cell))
    }

    /// A required finite floating point cell.
    pub fn finite(&self, column: &'static str) -> Result<f64, CoreError> {
        let value: f64 = self.parse(column)?;
        if !value.is_finite() {
            return Err(self.invalid(column, self.cell(column)));
        }
        Ok(value)
    }

    /// An optional floating point cell: missing tokens read as `None`.
    pub fn optional_f64(&self, column: &'static str) -> Result<Option<f64>, CoreError> {
        let cell = self.cell(column);
        if is_missing_token(cell) {
            return Ok(None);
        }
        match cell.parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(Some(value)),
            _ => Err(self.invalid(column, cell)),
        }
    }

    /// An optional whole-number day, accepting `280` as well as `280.0`.
    pub fn optional_day(&self, column: &'static str) -> Result<Option<u32>, CoreError> {
        match self.optional_f64(column)? {
            None => Ok(None),
            Some(value) if value.fract() == 0.0 && (1.0..=366.0).contains(&value) => {
                Ok(Some(value as u32))
            }
            Some(_) => Err(self.invalid(column, self.cell(column))),
        }
    }
}
