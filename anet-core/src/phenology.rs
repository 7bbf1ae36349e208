use crate::{
    error::CoreError,
    schema::{LEAF_ON_DAY_OF_YEAR, PHENOLOGY_SCHEMA, SITE_ID, YEAR},
    site_year::SiteYear,
};
use anet_utils::dates::is_valid_day_of_year;
use csv::{ReaderBuilder, Trim};
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, io::Read, path::Path};

/// Observed leaf-on date for one site-year.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct PhenologyRecord {
    pub site_id: String,
    pub year: i32,
    pub leaf_on_day_of_year: u32,
}

impl PhenologyRecord {
    pub fn site_year(&self) -> SiteYear {
        SiteYear::new(self.site_id.clone(), self.year)
    }

    /// Parse a phenology CSV string (with headers) into records.
    ///
    /// Expected columns: site_id, year, leaf_on_day_of_year
    pub fn parse_phenology_csv(csv_object: &str) -> Result<Vec<PhenologyRecord>, CoreError> {
        PhenologyRecord::read_phenology(csv_object.as_bytes())
    }

    /// Read a phenology CSV file into records.
    pub fn read_phenology_path(path: &Path) -> Result<Vec<PhenologyRecord>, CoreError> {
        let file = std::fs::File::open(path)?;
        let records = PhenologyRecord::read_phenology(file)?;
        log::info!(
            "loader: loaded {} phenology records from {}",
            records.len(),
            path.display()
        );
        Ok(records)
    }

    /// Read phenology records from any CSV source.
    ///
    /// Rows without an observed leaf-on date are skipped with a warning; the
    /// daily records of those site-years then surface as join mismatches.
    pub fn read_phenology<R: Read>(reader: R) -> Result<Vec<PhenologyRecord>, CoreError> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .trim(Trim::All)
            .from_reader(reader);
        let columns = PHENOLOGY_SCHEMA.resolve(rdr.headers()?, &[])?;

        let mut seen: HashSet<SiteYear> = HashSet::new();
        let mut records = Vec::new();
        let mut skipped = 0u32;
        for result in rdr.records() {
            let record = result?;
            let row = columns.row(&record);
            let site_id = row.text(SITE_ID)?;
            let year: i32 = row.parse(YEAR)?;
            let key = SiteYear::new(site_id.clone(), year);
            if !seen.insert(key) {
                return Err(CoreError::DuplicatePhenology { site_id, year });
            }
            let Some(leaf_on_day_of_year) = row.optional_day(LEAF_ON_DAY_OF_YEAR)? else {
                skipped += 1;
                continue;
            };
            if !is_valid_day_of_year(year, leaf_on_day_of_year) {
                return Err(CoreError::InvalidDayOfYear {
                    table: PHENOLOGY_SCHEMA.table,
                    line: row.line(),
                    year,
                    day_of_year: leaf_on_day_of_year,
                });
            }
            records.push(PhenologyRecord {
                site_id,
                year,
                leaf_on_day_of_year,
            });
        }
        if skipped > 0 {
            log::warn!(
                "loader: skipped {} phenology rows without a leaf-on date",
                skipped
            );
        }
        Ok(records)
    }
}
