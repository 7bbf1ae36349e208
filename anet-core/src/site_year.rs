use serde::{Deserialize, Serialize};
use std::fmt;

/// Join key shared by the daily and phenology tables.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SiteYear {
    pub site_id: String,
    pub year: i32,
}

impl SiteYear {
    pub fn new(site_id: impl Into<String>, year: i32) -> Self {
        SiteYear {
            site_id: site_id.into(),
            year,
        }
    }
}

impl fmt::Display for SiteYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.site_id, self.year)
    }
}
