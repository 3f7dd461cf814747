//! Astronomical subroutines for the lunisolar and lunar calendars.
//!
//! Low-order periodic-term approximations (Duffett-Smith, *Practical
//! Astronomy With Your Calculator*), accurate to well under a degree for
//! the sun and a few arc-minutes for the moon over several centuries
//! around the present. All functions are pure over an epoch-millisecond
//! instant; angles are radians.

use std::f64::consts::PI;

use tracing::trace;

use crate::date::DAY_MILLIS;

/// 2π.
pub const PI2: f64 = PI * 2.0;

const DEG: f64 = PI / 180.0;

/// Mean length of the synodic month (new moon to new moon), in days.
pub const SYNODIC_MONTH: f64 = 29.530588853;
/// Mean length of the tropical year, in days.
pub const TROPICAL_YEAR: f64 = 365.242191;

/// Sun angle of the December solstice.
pub const WINTER_SOLSTICE: f64 = PI * 3.0 / 2.0;
/// Sun angle of the March equinox.
pub const VERNAL_EQUINOX: f64 = 0.0;
/// Moon-age angle of the new moon.
pub const NEW_MOON: f64 = 0.0;

const MINUTE_MILLIS: i64 = 60 * 1000;

/// Epoch milliseconds of the -4712-01-01 12:00 Julian day origin.
const JULIAN_EPOCH_MILLIS: i64 = -210_866_760_000_000;
/// Reference epoch of the periodic terms: 1990.0 (JD 2447891.5).
const JD_EPOCH: f64 = 2_447_891.5;

// Solar orbit elements at the 1990.0 epoch.
const SUN_ETA_G: f64 = 279.403303 * DEG; // ecliptic longitude
const SUN_OMEGA_G: f64 = 282.768422 * DEG; // longitude of perigee
const SUN_E: f64 = 0.016713; // orbit eccentricity

// Lunar orbit elements at the 1990.0 epoch.
const MOON_L0: f64 = 318.351648 * DEG; // mean longitude
const MOON_P0: f64 = 36.340410 * DEG; // mean longitude of perigee
const MOON_N0: f64 = 318.510107 * DEG; // mean longitude of node
const MOON_I: f64 = 5.145366 * DEG; // orbit inclination
const MOON_E: f64 = 0.0549; // orbit eccentricity

fn julian_day(time: i64) -> f64 {
    (time - JULIAN_EPOCH_MILLIS) as f64 / DAY_MILLIS as f64
}

/// Normalizes `value` into `0..range`.
fn normalize(value: f64, range: f64) -> f64 {
    value - range * (value / range).floor()
}

/// Normalizes an angle into `0..2π`.
fn norm_2pi(angle: f64) -> f64 {
    normalize(angle, PI2)
}

/// Normalizes an angle into `-π..π`.
fn norm_pi(angle: f64) -> f64 {
    normalize(angle + PI, PI2) - PI
}

/// Solves Kepler's equation for the eccentric anomaly, then derives the
/// true anomaly.
fn true_anomaly(mean_anomaly: f64, eccentricity: f64) -> f64 {
    // Newton iteration on E - e·sin(E) = M.
    let mut e = mean_anomaly;
    loop {
        let delta = e - eccentricity * e.sin() - mean_anomaly;
        e -= delta / (1.0 - eccentricity * e.cos());
        if delta.abs() <= 1e-5 {
            break;
        }
    }
    2.0 * (((1.0 + eccentricity) / (1.0 - eccentricity)).sqrt() * (e / 2.0).tan()).atan()
}

/// Ecliptic longitude of the sun and its mean anomaly at `jd`.
fn sun_longitude_at(jd: f64) -> (f64, f64) {
    let day = jd - JD_EPOCH;
    let epoch_angle = norm_2pi(PI2 / TROPICAL_YEAR * day);
    let mean_anomaly = norm_2pi(epoch_angle + SUN_ETA_G - SUN_OMEGA_G);
    let longitude = norm_2pi(true_anomaly(mean_anomaly, SUN_E) + SUN_OMEGA_G);
    (longitude, mean_anomaly)
}

/// Ecliptic longitude of the sun at an epoch-millisecond instant, in
/// `0..2π`. 0 is the vernal equinox direction.
pub fn sun_longitude(time: i64) -> f64 {
    sun_longitude_at(julian_day(time)).0
}

/// Ecliptic longitude of the moon at an epoch-millisecond instant, in
/// `0..2π`.
pub fn moon_longitude(time: i64) -> f64 {
    let jd = julian_day(time);
    let (sun_longitude, sun_mean_anomaly) = sun_longitude_at(jd);
    let day = jd - JD_EPOCH;

    let mean_longitude = norm_2pi(13.1763966 * DEG * day + MOON_L0);
    let mut mean_anomaly = norm_2pi(mean_longitude - 0.1114041 * DEG * day - MOON_P0);

    // Principal periodic corrections.
    let evection =
        1.2739 * DEG * (2.0 * (mean_longitude - sun_longitude) - mean_anomaly).sin();
    let annual = 0.1858 * DEG * sun_mean_anomaly.sin();
    let a3 = 0.3700 * DEG * sun_mean_anomaly.sin();
    mean_anomaly += evection - annual - a3;
    let center = 6.2886 * DEG * mean_anomaly.sin();
    let a4 = 0.2140 * DEG * (2.0 * mean_anomaly).sin();
    let mut longitude = mean_longitude + evection + center - annual + a4;
    let variation = 0.6583 * DEG * (2.0 * (longitude - sun_longitude)).sin();
    longitude += variation;

    // Project from the lunar orbit plane onto the ecliptic.
    let node = norm_2pi(MOON_N0 - 0.0529539 * DEG * day) - 0.16 * DEG * sun_mean_anomaly.sin();
    let y = (longitude - node).sin();
    let x = (longitude - node).cos();
    (y * MOON_I.cos()).atan2(x) + node
}

/// Age of the moon at an instant: the angle of the moon ahead of the sun
/// along the ecliptic, in `0..2π`. 0 is the new moon, π the full moon.
pub fn moon_age(time: i64) -> f64 {
    norm_2pi(moon_longitude(time) - sun_longitude(time))
}

/// Finds the instant at which the sun reaches ecliptic longitude
/// `desired`, searching forward from `start` if `next`, else backward.
pub fn sun_time(start: i64, desired: f64, next: bool) -> i64 {
    time_of_angle(start, sun_longitude, desired, TROPICAL_YEAR, next)
}

/// Finds the instant at which the moon age reaches `desired`, searching
/// forward from `start` if `next`, else backward. `desired` of
/// [`NEW_MOON`] finds new moons.
pub fn moon_time(start: i64, desired: f64, next: bool) -> i64 {
    time_of_angle(start, moon_age, desired, SYNODIC_MONTH, next)
}

/// Inverts a monotonically advancing angle function: finds the instant
/// nearest `start` (in the given direction) at which `angle_at` takes the
/// value `desired`. Converges to within one minute.
///
/// The iteration uses the locally observed angular rate; if a step
/// overshoots into divergence (the angle function is not quite linear),
/// the search restarts an eighth of a period away from `start`.
fn time_of_angle(
    start: i64,
    angle_at: fn(i64) -> f64,
    desired: f64,
    period_days: f64,
    next: bool,
) -> i64 {
    let period_millis = period_days * DAY_MILLIS as f64;
    let mut time = start;
    let mut last_angle = angle_at(time);

    // First guess from the mean rate.
    let delta_angle = norm_2pi(desired - last_angle);
    let mut delta_t = (delta_angle + if next { 0.0 } else { -PI2 }) * period_millis / PI2;
    let mut last_delta_t = delta_t;
    time += delta_t as i64;

    loop {
        let angle = angle_at(time);
        let factor = (delta_t / norm_pi(angle - last_angle)).abs();
        delta_t = norm_pi(desired - angle) * factor;
        if delta_t.abs() > last_delta_t.abs() {
            // Diverging; restart away from the inflection.
            let nudge = (period_millis / 8.0) as i64;
            let restart = if next { start + nudge } else { start - nudge };
            trace!(start, restart, desired, "angle search diverged, restarting");
            return time_of_angle(restart, angle_at, desired, period_days, next);
        }
        last_delta_t = delta_t;
        last_angle = angle;
        time += delta_t as i64;
        if delta_t.abs() <= MINUTE_MILLIS as f64 {
            return time;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::date::Date;

    fn millis(y: i32, m: i32, d: i32, hour: i64, minute: i64) -> i64 {
        Date::from_gregorian(y, m, d).millis_at_midnight()
            + (hour * 60 + minute) * MINUTE_MILLIS
    }

    #[test]
    fn sun_longitude_at_equinox_and_solstice() {
        // March equinox 2000: 2000-03-20 07:35 UTC.
        let equinox = millis(2000, 3, 20, 7, 35);
        assert!(norm_pi(sun_longitude(equinox) - VERNAL_EQUINOX).abs() < 0.01);
        // December solstice 1999: 1999-12-22 07:44 UTC.
        let solstice = millis(1999, 12, 22, 7, 44);
        assert!(norm_pi(sun_longitude(solstice) - WINTER_SOLSTICE).abs() < 0.01);
    }

    #[test]
    fn next_winter_solstice() {
        let found = sun_time(millis(1999, 12, 1, 0, 0), WINTER_SOLSTICE, true);
        let (date, _) = Date::from_millis(found);
        assert_eq!((1999, 12, 22), date.gregorian());
    }

    #[test]
    fn new_moon_search_both_directions() {
        // New moon: 2000-01-06 18:14 UTC.
        let next = moon_time(millis(2000, 1, 1, 0, 0), NEW_MOON, true);
        let (date, _) = Date::from_millis(next);
        assert_eq!((2000, 1, 6), date.gregorian());

        let prev = moon_time(millis(2000, 1, 31, 0, 0), NEW_MOON, false);
        let (date, _) = Date::from_millis(prev);
        assert_eq!((2000, 1, 6), date.gregorian());
    }

    #[test]
    fn moon_age_straddles_new_moon() {
        let before = millis(2000, 1, 6, 6, 0);
        let after = millis(2000, 1, 7, 6, 0);
        assert!(moon_age(before) > PI, "waning crescent before new moon");
        assert!(moon_age(after) < PI / 4.0, "waxing crescent after new moon");
    }

    #[test]
    fn successive_new_moons_are_a_synodic_month_apart() {
        let first = moon_time(millis(2000, 1, 1, 0, 0), NEW_MOON, true);
        let second = moon_time(first + DAY_MILLIS, NEW_MOON, true);
        let gap_days = (second - first) as f64 / DAY_MILLIS as f64;
        assert!((gap_days - SYNODIC_MONTH).abs() < 0.8, "gap {gap_days}");
    }
}
