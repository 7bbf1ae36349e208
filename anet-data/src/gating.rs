//! Per-day gating of simulated fluxes.
//!
//! A day only contributes carbon uptake to its year once leaves are out and
//! the day is long enough for photosynthesis. Closed days contribute zero;
//! undefined values stay undefined whether the gate is open or not.

use anet_core::daily_record::DailyRecord;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Gate {
    Open,
    /// Before the observed leaf-on day.
    PreLeafOn,
    /// Daylength at or below the threshold.
    ShortDay,
}

impl Gate {
    pub fn evaluate(
        day_of_year: u32,
        leaf_on_day_of_year: u32,
        daylength_hours: f64,
        threshold_hours: f64,
    ) -> Gate {
        if day_of_year < leaf_on_day_of_year {
            Gate::PreLeafOn
        } else if daylength_hours <= threshold_hours {
            Gate::ShortDay
        } else {
            Gate::Open
        }
    }

    pub fn is_closed(self) -> bool {
        self != Gate::Open
    }

    /// Gate a single value: closed and defined becomes zero, everything else
    /// passes through.
    pub fn apply(self, value: Option<f64>) -> Option<f64> {
        if self.is_closed() {
            value.map(|_| 0.0)
        } else {
            value
        }
    }
}

/// A day's fluxes after gating.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GatedDay {
    pub gate: Gate,
    pub gross_primary_production: Option<f64>,
    pub respiration: Option<f64>,
}

impl GatedDay {
    pub fn new(record: &DailyRecord, leaf_on_day_of_year: u32, threshold_hours: f64) -> Self {
        let gate = Gate::evaluate(
            record.day_of_year,
            leaf_on_day_of_year,
            record.daylength_hours,
            threshold_hours,
        );
        GatedDay {
            gate,
            gross_primary_production: gate.apply(record.gross_primary_production),
            respiration: gate.apply(record.respiration),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Gate, GatedDay};
    use anet_core::daily_record::DailyRecord;

    fn day(day_of_year: u32, daylength_hours: f64, gpp: Option<f64>) -> DailyRecord {
        DailyRecord {
            site_id: "A".to_string(),
            year: 2010,
            day_of_year,
            latitude: 46.5,
            longitude: 7.5,
            gross_primary_production: gpp,
            respiration: gpp.map(|v| v / 10.0),
            daylength_hours,
        }
    }

    #[test]
    fn test_pre_leaf_on_days_are_zeroed() {
        for doy in [1, 100, 279] {
            let gated = GatedDay::new(&day(doy, 14.0, Some(5.0)), 280, 10.0);
            assert_eq!(gated.gate, Gate::PreLeafOn);
            assert_eq!(gated.gross_primary_production, Some(0.0));
            assert_eq!(gated.respiration, Some(0.0));
        }
    }

    #[test]
    fn test_short_days_are_zeroed_at_and_below_threshold() {
        for daylength in [0.0, 9.99, 10.0] {
            let gated = GatedDay::new(&day(300, daylength, Some(5.0)), 280, 10.0);
            assert_eq!(gated.gate, Gate::ShortDay);
            assert_eq!(gated.gross_primary_production, Some(0.0));
        }
    }

    #[test]
    fn test_open_days_pass_raw_values() {
        for (doy, gpp) in [(280, 1.25), (281, -0.3), (365, 1e-12)] {
            let gated = GatedDay::new(&day(doy, 10.01, Some(gpp)), 280, 10.0);
            assert_eq!(gated.gate, Gate::Open);
            assert_eq!(gated.gross_primary_production, Some(gpp));
            assert_eq!(gated.respiration, Some(gpp / 10.0));
        }
    }

    #[test]
    fn test_missing_values_stay_missing() {
        let pre_leaf_on = GatedDay::new(&day(10, 14.0, None), 280, 10.0);
        assert_eq!(pre_leaf_on.gross_primary_production, None);
        let short = GatedDay::new(&day(300, 8.0, None), 280, 10.0);
        assert_eq!(short.gross_primary_production, None);
        let open = GatedDay::new(&day(300, 12.0, None), 280, 10.0);
        assert_eq!(open.gross_primary_production, None);
    }

    #[test]
    fn test_pre_leaf_on_takes_precedence() {
        assert_eq!(Gate::evaluate(10, 280, 5.0, 10.0), Gate::PreLeafOn);
    }
}
