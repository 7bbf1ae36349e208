//! Many-to-one join of daily records onto phenology records by site-year.

use anet_core::{daily_record::DailyRecord, phenology::PhenologyRecord, site_year::SiteYear};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Leaf-on day lookup by site and year.
#[derive(Debug, Default, Clone)]
pub struct PhenologyIndex(HashMap<String, HashMap<i32, u32>>);

impl PhenologyIndex {
    pub fn new(phenology: &[PhenologyRecord]) -> Self {
        let mut index: HashMap<String, HashMap<i32, u32>> = HashMap::new();
        for record in phenology {
            index
                .entry(record.site_id.clone())
                .or_default()
                .insert(record.year, record.leaf_on_day_of_year);
        }
        PhenologyIndex(index)
    }

    pub fn leaf_on(&self, site_id: &str, year: i32) -> Option<u32> {
        self.0
            .get(site_id)
            .and_then(|years| years.get(&year))
            .copied()
    }
}

/// A daily record paired with its site-year's leaf-on day.
#[derive(Debug, Clone, Copy)]
pub struct JoinedDay<'a> {
    pub record: &'a DailyRecord,
    pub leaf_on_day_of_year: u32,
}

/// A site-year present in the daily table with no phenology record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JoinMismatch {
    pub site_id: String,
    pub year: i32,
    /// Daily rows dropped for this site-year.
    pub daily_rows: usize,
}

#[derive(Debug)]
pub struct Join<'a> {
    pub joined: Vec<JoinedDay<'a>>,
    /// Sorted by site and year.
    pub mismatches: Vec<JoinMismatch>,
}

impl Join<'_> {
    /// Total number of daily rows dropped by the join.
    pub fn mismatch_count(&self) -> usize {
        self.mismatches.iter().map(|m| m.daily_rows).sum()
    }
}

/// Join daily records to phenology. Unmatched daily records are dropped and
/// reported, never fatal.
pub fn join_phenology<'a>(daily: &'a [DailyRecord], phenology: &[PhenologyRecord]) -> Join<'a> {
    let index = PhenologyIndex::new(phenology);
    let mut joined = Vec::with_capacity(daily.len());
    let mut unmatched: BTreeMap<SiteYear, usize> = BTreeMap::new();
    for record in daily {
        match index.leaf_on(&record.site_id, record.year) {
            Some(leaf_on_day_of_year) => joined.push(JoinedDay {
                record,
                leaf_on_day_of_year,
            }),
            None => *unmatched.entry(record.site_year()).or_default() += 1,
        }
    }

    let mismatches: Vec<JoinMismatch> = unmatched
        .into_iter()
        .map(|(key, daily_rows)| {
            log::debug!("join: no phenology for {} ({} daily rows)", key, daily_rows);
            JoinMismatch {
                site_id: key.site_id,
                year: key.year,
                daily_rows,
            }
        })
        .collect();
    if !mismatches.is_empty() {
        log::warn!(
            "join: dropped {} daily rows from {} site-years without phenology",
            daily.len() - joined.len(),
            mismatches.len()
        );
    }
    Join { joined, mismatches }
}
