// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sunrise/sunset computation (spec §4.1).
//!
//! Implements the standard almanac sunrise/sunset equation (zenith 90.833°,
//! adjusted for site elevation) rather than depending on a sun-position
//! crate — none of the pack's example repos pull one in, and the math is
//! self-contained. `next_rising`/`next_setting` walk day offsets
//! `-1, 0, +1, …` exactly as the original `update_sun` does, skipping days
//! with no result (polar day/night) and stopping at the first instant
//! strictly after `after_ts`.

use autod_core::{KernelError, SunEvent};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, TimeZone};
use chrono_tz::Tz;

/// Converts a unix timestamp to `tz`'s local time. UTC-to-local conversion
/// never hits the spring-forward gap / fall-back fold ambiguity that makes
/// `timestamp_opt` fallible (that only applies to local-to-UTC), so this is
/// infallible in practice; the fallback only matters for timestamps outside
/// chrono's representable range.
pub fn local_from_ts(tz: Tz, ts: i64) -> DateTime<Tz> {
    let naive = DateTime::from_timestamp(ts, 0).map(|dt| dt.naive_utc()).unwrap_or(NaiveDateTime::UNIX_EPOCH);
    tz.from_utc_datetime(&naive)
}

/// A safety bound on the day-offset walk so a location that never has a
/// sunrise/sunset (exact poles) can't spin forever. The original Python can
/// loop indefinitely here; this is a deliberate robustness addition, not a
/// behavior change for any real-world latitude.
const MAX_DAY_WALK: i64 = 400;

#[derive(Debug, Clone, Copy)]
pub struct SunCalculator {
    latitude: f64,
    longitude: f64,
    elevation: f64,
    tz: Tz,
}

impl SunCalculator {
    pub fn new(latitude: f64, longitude: f64, elevation: f64, tz: Tz) -> Result<Self, KernelError> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(KernelError::LatitudeOutOfRange(latitude));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(KernelError::LongitudeOutOfRange(longitude));
        }
        Ok(Self { latitude, longitude, elevation, tz })
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Unix timestamp of `event` on `date` in this location, or `None` if
    /// the sun doesn't rise/set that day (polar day/night).
    pub fn event_on(&self, date: NaiveDate, event: SunEvent) -> Option<i64> {
        let day_of_year = date.ordinal() as f64;
        let lng_hour = self.longitude / 15.0;
        let t = match event {
            SunEvent::NextRising => day_of_year + ((6.0 - lng_hour) / 24.0),
            SunEvent::NextSetting => day_of_year + ((18.0 - lng_hour) / 24.0),
        };

        let m = (0.9856 * t) - 3.289;
        let mut l = m
            + (1.916 * m.to_radians().sin())
            + (0.020 * (2.0 * m).to_radians().sin())
            + 282.634;
        l = normalize_deg(l);

        let mut ra = (0.91764 * l.to_radians().tan()).atan().to_degrees();
        ra = normalize_deg(ra);
        // RA must be in the same quadrant as L.
        let l_quadrant = (l / 90.0).floor() * 90.0;
        let ra_quadrant = (ra / 90.0).floor() * 90.0;
        ra += l_quadrant - ra_quadrant;
        ra /= 15.0;

        let sin_dec = 0.39782 * l.to_radians().sin();
        let cos_dec = sin_dec.asin().cos();

        let zenith = 90.833 + 0.0347 * self.elevation.max(0.0).sqrt();
        let cos_h = (zenith.to_radians().cos() - (sin_dec * self.latitude.to_radians().sin()))
            / (cos_dec * self.latitude.to_radians().cos());

        if cos_h > 1.0 || cos_h < -1.0 {
            return None;
        }

        let mut h = cos_h.acos().to_degrees();
        h = match event {
            SunEvent::NextRising => 360.0 - h,
            SunEvent::NextSetting => h,
        };
        h /= 15.0;

        let local_t = h + ra - (0.06571 * t) - 6.622;
        let mut ut = local_t - lng_hour;
        ut = ut.rem_euclid(24.0);

        let whole_hours = ut.floor() as i64;
        let frac_minutes = (ut - ut.floor()) * 60.0;
        let whole_minutes = frac_minutes.floor() as i64;
        let whole_seconds = ((frac_minutes - frac_minutes.floor()) * 60.0).round() as i64;

        let dt = date.and_hms_opt(0, 0, 0)?
            + chrono::Duration::hours(whole_hours)
            + chrono::Duration::minutes(whole_minutes)
            + chrono::Duration::seconds(whole_seconds);
        Some(dt.and_utc().timestamp())
    }

    /// Walks day offsets until it finds `event`'s instant strictly after
    /// `after_ts`, interpreting dates in this location's local timezone
    /// (spec §4.1).
    pub fn next(&self, after_ts: i64, event: SunEvent) -> i64 {
        let base_date = local_from_ts(self.tz, after_ts).date_naive();

        for offset in -1..MAX_DAY_WALK {
            let Some(date) = base_date.checked_add_signed(chrono::Duration::days(offset)) else {
                break;
            };
            if let Some(ts) = self.event_on(date, event) {
                if ts > after_ts {
                    return ts;
                }
            }
        }
        // Unreachable for any real-world location; fall back to "a year
        // from now" rather than panicking.
        after_ts + 365 * 86_400
    }
}

fn normalize_deg(mut v: f64) -> f64 {
    v %= 360.0;
    if v < 0.0 {
        v += 360.0;
    }
    v
}

#[cfg(test)]
#[path = "sun_tests.rs"]
mod tests;
