//! Coptic and Ethiopic calendars.
//!
//! Both run twelve 30-day months followed by a 5- or 6-day epagomenal
//! month, with a leap day every four years (years ≡ 3 mod 4). They
//! differ only in epoch and era handling: the Coptic Era of Martyrs
//! begins 284-08-29 (Julian), the Ethiopic Amete Mihret 8-08-29
//! (Julian), and Ethiopic optionally counts in the Amete Alem era,
//! 5500 years earlier.

use crate::calendar::{CalendarSystem, GregorianDay};
use crate::fields::{Field, FieldSet};

/// JDN of Coptic 0-01-01 (the year before the Era of Martyrs).
const COPTIC_EPOCH: i32 = 1_824_665;
/// JDN of Ethiopic 0-01-01 (the year before Amete Mihret).
const ETHIOPIC_EPOCH: i32 = 1_723_856;
/// Years between the Amete Alem and Amete Mihret epochs.
const AMETE_MIHRET_DELTA: i32 = 5500;

/// Ethiopic era value for Amete Alem ("year of the world").
pub const AMETE_ALEM: i32 = 0;
/// Ethiopic era value for Amete Mihret ("year of mercy").
pub const AMETE_MIHRET: i32 = 1;

fn normalize(year: i32, month: i32) -> (i32, i32) {
    if (0..13).contains(&month) {
        (year, month)
    } else {
        (year + month.div_euclid(13), month.rem_euclid(13))
    }
}

/// Day before the first of the month, relative to an epoch offset.
/// `epoch` is the JDN of day 1 of the epoch's year 0.
fn month_start(year: i32, month: i32, epoch: i32) -> i32 {
    let (year, month) = normalize(year, month);
    let y = year as i64;
    (epoch as i64 + 365 * y + y.div_euclid(4) + 30 * month as i64 - 1) as i32
}

/// `(year, month, day)` of a JDN, relative to an epoch offset.
fn year_month_day(jdn: i32, epoch: i32) -> (i32, i32, i32) {
    let c4 = (jdn - epoch).div_euclid(1461);
    let r = (jdn - epoch).rem_euclid(1461);
    // Day 1460 is the leap epagomenal day at the end of the cycle.
    let year = 4 * c4 + (r / 365 - r / 1460);
    let day_of_year = if r == 1460 { 365 } else { r % 365 };
    (year, day_of_year / 30, day_of_year % 30 + 1)
}

fn is_leap(year: i32) -> bool {
    year.rem_euclid(4) == 3
}

fn month_len(year: i32, month: i32) -> i32 {
    let (year, month) = normalize(year, month);
    if month < 12 {
        30
    } else if is_leap(year) {
        6
    } else {
        5
    }
}

fn set_common_fields(fields: &mut FieldSet, eyear: i32, month: i32, day: i32) {
    fields.set_internal(Field::ExtendedYear, eyear);
    fields.set_internal(Field::Month, month);
    fields.set_internal(Field::DayOfMonth, day);
    fields.set_internal(Field::DayOfYear, 30 * month + day);
}

/// The Coptic calendar. Years before the Era of Martyrs count backward
/// in era 0, like BC years.
#[derive(Debug, Clone, Copy, Default)]
pub struct Coptic;

impl CalendarSystem for Coptic {
    fn kind(&self) -> &'static str {
        "coptic"
    }

    fn month_start(
        &self,
        extended_year: i32,
        month: i32,
        _use_month: bool,
        _leap_month: bool,
    ) -> i32 {
        month_start(extended_year, month, COPTIC_EPOCH)
    }

    fn extended_year(&self, fields: &FieldSet) -> i32 {
        if fields.newer_field(Field::ExtendedYear, Field::Year) == Field::ExtendedYear {
            fields.get_or(Field::ExtendedYear, 1)
        } else if fields.get_or(Field::Era, 1) == 0 {
            1 - fields.get_or(Field::Year, 1)
        } else {
            fields.get_or(Field::Year, 1)
        }
    }

    fn compute_fields(&self, jdn: i32, _greg: &GregorianDay, fields: &mut FieldSet) {
        let (eyear, month, day) = year_month_day(jdn, COPTIC_EPOCH);
        set_common_fields(fields, eyear, month, day);
        if eyear < 1 {
            fields.set_internal(Field::Era, 0);
            fields.set_internal(Field::Year, 1 - eyear);
        } else {
            fields.set_internal(Field::Era, 1);
            fields.set_internal(Field::Year, eyear);
        }
    }

    fn month_length(&self, extended_year: i32, month: i32) -> i32 {
        month_len(extended_year, month)
    }

    fn year_length(&self, extended_year: i32) -> i32 {
        if is_leap(extended_year) { 366 } else { 365 }
    }

    fn months_in_year(&self, _extended_year: i32) -> i32 {
        13
    }

    fn limits(&self, field: Field) -> (i32, i32) {
        match field {
            Field::Month => (0, 12),
            Field::DayOfMonth => (1, 30),
            _ => crate::calendar::default_limits(field),
        }
    }

    fn era0_years_backward(&self) -> bool {
        true
    }
}

/// The Ethiopic calendar.
#[derive(Debug, Clone, Copy)]
pub struct Ethiopic {
    amete_alem: bool,
}

impl Default for Ethiopic {
    fn default() -> Self {
        Self::new()
    }
}

impl Ethiopic {
    /// Amete Mihret numbering: era 1 from year 1 on, era 0 (Amete Alem)
    /// before.
    pub fn new() -> Self {
        Self { amete_alem: false }
    }

    /// Amete Alem numbering: a single era counted from 5500 before
    /// Amete Mihret.
    pub fn amete_alem() -> Self {
        Self { amete_alem: true }
    }
}

impl CalendarSystem for Ethiopic {
    fn kind(&self) -> &'static str {
        if self.amete_alem {
            "ethiopic-amete-alem"
        } else {
            "ethiopic"
        }
    }

    fn month_start(
        &self,
        extended_year: i32,
        month: i32,
        _use_month: bool,
        _leap_month: bool,
    ) -> i32 {
        month_start(extended_year, month, ETHIOPIC_EPOCH)
    }

    fn extended_year(&self, fields: &FieldSet) -> i32 {
        if fields.newer_field(Field::ExtendedYear, Field::Year) == Field::ExtendedYear {
            fields.get_or(Field::ExtendedYear, 1)
        } else if self.amete_alem || fields.get_or(Field::Era, AMETE_MIHRET) == AMETE_ALEM {
            fields.get_or(Field::Year, 1 + AMETE_MIHRET_DELTA) - AMETE_MIHRET_DELTA
        } else {
            fields.get_or(Field::Year, 1)
        }
    }

    fn compute_fields(&self, jdn: i32, _greg: &GregorianDay, fields: &mut FieldSet) {
        let (eyear, month, day) = year_month_day(jdn, ETHIOPIC_EPOCH);
        set_common_fields(fields, eyear, month, day);
        if self.amete_alem {
            fields.set_internal(Field::Era, AMETE_ALEM);
            fields.set_internal(Field::Year, eyear + AMETE_MIHRET_DELTA);
        } else if eyear < 1 {
            fields.set_internal(Field::Era, AMETE_ALEM);
            fields.set_internal(Field::Year, eyear + AMETE_MIHRET_DELTA);
        } else {
            fields.set_internal(Field::Era, AMETE_MIHRET);
            fields.set_internal(Field::Year, eyear);
        }
    }

    fn month_length(&self, extended_year: i32, month: i32) -> i32 {
        month_len(extended_year, month)
    }

    fn year_length(&self, extended_year: i32) -> i32 {
        if is_leap(extended_year) { 366 } else { 365 }
    }

    fn months_in_year(&self, _extended_year: i32) -> i32 {
        13
    }

    fn limits(&self, field: Field) -> (i32, i32) {
        match field {
            Field::Month => (0, 12),
            Field::DayOfMonth => (1, 30),
            _ => crate::calendar::default_limits(field),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::date::Date;

    #[test]
    fn coptic_new_year_1741() {
        // 1 Thout 1741 AM = 2024-09-11 Gregorian.
        assert_eq!(
            Date::from_gregorian(2024, 9, 11).jdn(),
            month_start(1741, 0, COPTIC_EPOCH) + 1
        );
    }

    #[test]
    fn ethiopic_millennium() {
        // 1 Mäskäräm 2000 (Amete Mihret) = 2007-09-12 Gregorian.
        assert_eq!(
            Date::from_gregorian(2007, 9, 12).jdn(),
            month_start(2000, 0, ETHIOPIC_EPOCH) + 1
        );
    }

    #[test]
    fn round_trip_through_fields() {
        for jdn in (1_800_000..2_500_000).step_by(8111) {
            let (y, m, d) = year_month_day(jdn, COPTIC_EPOCH);
            assert_eq!(jdn, month_start(y, m, COPTIC_EPOCH) + d, "jdn {jdn}");
        }
    }

    #[test]
    fn epagomenal_month_length() {
        assert_eq!(5, month_len(1740, 12));
        assert_eq!(6, month_len(1739, 12)); // 1739 % 4 == 3
        assert_eq!(30, month_len(1740, 0));
        // Normalized out-of-range month.
        assert_eq!(month_len(1740, 0), month_len(1739, 13));
    }

    #[test]
    fn leap_cycle() {
        assert!(is_leap(3));
        assert!(is_leap(-1));
        assert!(!is_leap(0));
        assert!(!is_leap(2000));
        assert!(is_leap(1739));
    }

    #[test]
    fn year_lengths_sum() {
        for year in 1735..1745 {
            let total: i32 = (0..13).map(|m| month_len(year, m)).sum();
            let len = if is_leap(year) { 366 } else { 365 };
            assert_eq!(len, total, "year {year}");
        }
    }
}
