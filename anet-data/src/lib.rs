//! Gating and annual aggregation of simulated daily carbon fluxes.
//!
//! Daily gross primary production and respiration are joined to observed
//! leaf-on dates, zeroed outside the physiologically active window (before
//! leaf-on, or on days at or below a daylength threshold) and summed into one
//! row per site, location and year.
//!
//! ```rust
//! use anet_core::{daily_record::DailyRecord, phenology::PhenologyRecord};
//! use anet_data::{aggregate::aggregate, config::AggregationConfig};
//!
//! let daily = vec![DailyRecord {
//!     site_id: "A".to_string(),
//!     year: 2010,
//!     day_of_year: 281,
//!     latitude: 46.5,
//!     longitude: 7.5,
//!     gross_primary_production: Some(3.0),
//!     respiration: Some(0.5),
//!     daylength_hours: 11.0,
//! }];
//! let phenology = vec![PhenologyRecord {
//!     site_id: "A".to_string(),
//!     year: 2010,
//!     leaf_on_day_of_year: 280,
//! }];
//! let result = aggregate(&daily, &phenology, &AggregationConfig::default()).unwrap();
//! assert_eq!(result.rows[0].net_assimilation_sum, Some(3.0));
//! ```

pub mod aggregate;
pub mod config;
pub mod error;
pub mod formula;
pub mod gating;
pub mod join;
pub mod report;
pub mod sensitivity;
