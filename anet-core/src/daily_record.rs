use crate::{
    error::CoreError,
    schema::{
        Row, DAILY_SCHEMA, DAYLENGTH_HOURS, DAY_OF_YEAR, GROSS_PRIMARY_PRODUCTION, LATITUDE,
        LONGITUDE, RESPIRATION, SITE_ID, YEAR,
    },
    site_year::SiteYear,
};
use anet_utils::{dates::is_valid_day_of_year, daylength::daylength_hours};
use csv::{ReaderBuilder, Trim};
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, io::Read, path::Path};

/// Where a day's daylength comes from.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DaylengthSource {
    /// Read from the `daylength_hours` column.
    #[default]
    Column,
    /// Derived from latitude and day of year; the column is ignored.
    Computed,
}

/// One simulated day at one site.
///
/// `gross_primary_production` and `respiration` are `None` where the
/// simulation produced no value; they are never coerced to zero on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyRecord {
    pub site_id: String,
    pub year: i32,
    /// 1..=366
    pub day_of_year: u32,
    pub latitude: f64,
    pub longitude: f64,
    pub gross_primary_production: Option<f64>,
    pub respiration: Option<f64>,
    pub daylength_hours: f64,
}

impl DailyRecord {
    pub fn site_year(&self) -> SiteYear {
        SiteYear::new(self.site_id.clone(), self.year)
    }

    /// Parse a daily simulation CSV string (with headers) into records.
    pub fn parse_daily_csv(
        csv_object: &str,
        source: DaylengthSource,
    ) -> Result<Vec<DailyRecord>, CoreError> {
        DailyRecord::read_daily(csv_object.as_bytes(), source)
    }

    /// Read a daily simulation CSV file into records.
    pub fn read_daily_path(
        path: &Path,
        source: DaylengthSource,
    ) -> Result<Vec<DailyRecord>, CoreError> {
        let file = std::fs::File::open(path)?;
        let records = DailyRecord::read_daily(file, source)?;
        log::info!(
            "loader: loaded {} daily records from {}",
            records.len(),
            path.display()
        );
        Ok(records)
    }

    /// Read daily records from any CSV source, validating the header first
    /// and rejecting duplicate (site_id, year, day_of_year) keys.
    pub fn read_daily<R: Read>(
        reader: R,
        source: DaylengthSource,
    ) -> Result<Vec<DailyRecord>, CoreError> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .trim(Trim::All)
            .from_reader(reader);
        let optional: &[&str] = match source {
            DaylengthSource::Column => &[],
            DaylengthSource::Computed => &[DAYLENGTH_HOURS],
        };
        let columns = DAILY_SCHEMA.resolve(rdr.headers()?, optional)?;

        let mut seen: HashSet<(String, i32, u32)> = HashSet::new();
        let mut records = Vec::new();
        for result in rdr.records() {
            let record = result?;
            let daily = DailyRecord::from_row(&columns.row(&record), source)?;
            let key = (daily.site_id.clone(), daily.year, daily.day_of_year);
            if !seen.insert(key) {
                return Err(CoreError::DuplicateDailyRecord {
                    site_id: daily.site_id,
                    year: daily.year,
                    day_of_year: daily.day_of_year,
                });
            }
            records.push(daily);
        }
        Ok(records)
    }

    fn from_row(row: &Row<'_>, source: DaylengthSource) -> Result<DailyRecord, CoreError> {
        let site_id = row.text(SITE_ID)?;
        let year: i32 = row.parse(YEAR)?;
        let day_of_year: u32 = row.parse(DAY_OF_YEAR)?;
        if !is_valid_day_of_year(year, day_of_year) {
            return Err(CoreError::InvalidDayOfYear {
                table: DAILY_SCHEMA.table,
                line: row.line(),
                year,
                day_of_year,
            });
        }
        let latitude = row.finite(LATITUDE)?;
        let longitude = row.finite(LONGITUDE)?;
        let daylength_hours = match source {
            DaylengthSource::Column => row.finite(DAYLENGTH_HOURS)?,
            DaylengthSource::Computed => daylength_hours(latitude, day_of_year)
                .map_err(|_| row.invalid(LATITUDE, &latitude.to_string()))?,
        };
        Ok(DailyRecord {
            site_id,
            year,
            day_of_year,
            latitude,
            longitude,
            gross_primary_production: row.optional_f64(GROSS_PRIMARY_PRODUCTION)?,
            respiration: row.optional_f64(RESPIRATION)?,
            daylength_hours,
        })
    }
}
