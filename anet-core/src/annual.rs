use crate::{error::CoreError, schema::is_missing_token, site_year::SiteYear};
use csv::{ReaderBuilder, Trim, WriterBuilder};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{
    io::{Read, Write},
    path::Path,
};

/// Token written for an undefined annual sum.
pub const MISSING_VALUE: &str = "NA";

/// Header of the annual table, in field order.
pub const ANNUAL_COLUMNS: [&str; 10] = [
    "site_id",
    "latitude",
    "longitude",
    "year",
    "net_assimilation_sum",
    "respiration_sum",
    "days",
    "gated_days",
    "missing_production_days",
    "gated_fraction_of_year",
];

/// Annual gated sums for one (site_id, latitude, longitude, year) group.
///
/// `gated_days` and `gated_fraction_of_year` record how much of the year was
/// zeroed by the leaf-on and daylength gates, so a sum of zero caused by
/// gating can be told apart from a simulated zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnualAssimilation {
    pub site_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub year: i32,
    #[serde(serialize_with = "na_for_none", deserialize_with = "none_for_na")]
    pub net_assimilation_sum: Option<f64>,
    #[serde(serialize_with = "na_for_none", deserialize_with = "none_for_na")]
    pub respiration_sum: Option<f64>,
    /// Daily records in the group.
    pub days: u32,
    /// Days whose gate was closed (pre-leaf-on or short day).
    pub gated_days: u32,
    /// Days with an undefined gross primary production value.
    pub missing_production_days: u32,
    pub gated_fraction_of_year: f64,
}

fn na_for_none<S: Serializer>(value: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error> {
    match value {
        Some(v) => serializer.serialize_f64(*v),
        None => serializer.serialize_str(MISSING_VALUE),
    }
}

fn none_for_na<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    let cell = String::deserialize(deserializer)?;
    if is_missing_token(&cell) {
        return Ok(None);
    }
    cell.trim()
        .parse::<f64>()
        .map(Some)
        .map_err(serde::de::Error::custom)
}

impl AnnualAssimilation {
    pub fn site_year(&self) -> SiteYear {
        SiteYear::new(self.site_id.clone(), self.year)
    }

    /// True when every day of the group was gated, so any zero sum carries
    /// no information about simulated assimilation.
    pub fn is_fully_gated(&self) -> bool {
        self.days > 0 && self.gated_days == self.days
    }

    /// Write rows as CSV with a header; undefined sums are written as `NA`.
    /// An empty table still gets its header row.
    pub fn write_annual_csv<W: Write>(
        rows: &[AnnualAssimilation],
        writer: W,
    ) -> Result<(), CoreError> {
        let mut wtr = WriterBuilder::new().has_headers(true).from_writer(writer);
        if rows.is_empty() {
            wtr.write_record(ANNUAL_COLUMNS)?;
        }
        for row in rows {
            wtr.serialize(row)?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// Write rows to a CSV file, replacing it if it exists.
    pub fn write_annual_path(rows: &[AnnualAssimilation], path: &Path) -> Result<(), CoreError> {
        let file = std::fs::File::create(path)?;
        AnnualAssimilation::write_annual_csv(rows, file)?;
        log::info!("writer: wrote {} annual rows to {}", rows.len(), path.display());
        Ok(())
    }

    /// Read rows previously written by [`AnnualAssimilation::write_annual_csv`].
    pub fn read_annual<R: Read>(reader: R) -> Result<Vec<AnnualAssimilation>, CoreError> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .trim(Trim::All)
            .from_reader(reader);
        let rows = rdr
            .deserialize()
            .collect::<Result<Vec<AnnualAssimilation>, _>>()?;
        Ok(rows)
    }

    pub fn parse_annual_csv(csv_object: &str) -> Result<Vec<AnnualAssimilation>, CoreError> {
        AnnualAssimilation::read_annual(csv_object.as_bytes())
    }
}
