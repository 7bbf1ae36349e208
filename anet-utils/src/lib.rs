//! Shared utility functions for anet crates.

/// Day-of-year calendar helpers
pub mod dates {
    use chrono::NaiveDate;

    /// Returns true if `day_of_year` is a real day of `year`.
    /// Day 1 is January 1; day 366 only exists in leap years.
    pub fn is_valid_day_of_year(year: i32, day_of_year: u32) -> bool {
        NaiveDate::from_yo_opt(year, day_of_year).is_some()
    }

}

/// Astronomical daylength
pub mod daylength {
    use std::f64::consts::PI;

    /// Sunrise/sunset is taken as the sun's upper limb touching the horizon,
    /// corrected for refraction (degrees).
    pub const SUNRISE_ANGLE_DEGREES: f64 = 0.8333;

    /// Daylength in hours for a latitude (degrees) and day of year, using the
    /// CBM model of Forsythe et al. (1995).
    ///
    /// Polar day and polar night clamp to 24 and 0 hours.
    pub fn daylength_hours(latitude: f64, day_of_year: u32) -> anyhow::Result<f64> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            anyhow::bail!("latitude {latitude} is outside [-90, 90]");
        }
        let doy = day_of_year as f64;
        let revolution = 0.2163108 + 2.0 * (0.9671396 * (0.00860 * (doy - 186.0)).tan()).atan();
        let declination = (0.39795 * revolution.cos()).asin();
        let lat = latitude * PI / 180.0;
        let a = ((SUNRISE_ANGLE_DEGREES * PI / 180.0).sin() + lat.sin() * declination.sin())
            / (lat.cos() * declination.cos());
        let a = a.clamp(-1.0, 1.0);
        Ok(24.0 - (24.0 / PI) * a.acos())
    }

}
