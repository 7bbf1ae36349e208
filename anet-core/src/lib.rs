//! Record types, table schemas and CSV ingestion for simulated daily carbon
//! fluxes, observed leaf-on dates and the annual sums derived from them.

pub mod annual;
pub mod daily_record;
pub mod error;
pub mod phenology;
pub mod schema;
pub mod site_year;
