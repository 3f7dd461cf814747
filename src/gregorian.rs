//! Hybrid Gregorian/Julian calendar with a configurable cutover.
//!
//! Days at or after the cutover JDN read as Gregorian; days before it
//! read as Julian. The default cutover is 1582-10-15 (JDN 2299161), the
//! day the Gregorian reform took effect; the preceding Julian day is
//! 1582-10-04, so 1582-10-05 through 1582-10-14 never existed.

use tracing::trace;

use crate::calendar::{
    CalendarSystem, GregorianDay, ResolveContext, julian_day_from_parts, resolve_extended_year,
};
use crate::date::{JAN_1_1_JDN, days_before_month};
use crate::fields::{Field, FieldSet};

/// Era value for years before the common era.
pub const BC: i32 = 0;
/// Era value for the common era.
pub const AD: i32 = 1;

const EPOCH_YEAR: i32 = 1970;

/// The hybrid Gregorian/Julian calendar system.
#[derive(Debug, Clone, Copy)]
pub struct Gregorian {
    cutover_jdn: i32,
    cutover_year: i32,
}

impl Default for Gregorian {
    fn default() -> Self {
        Self::new()
    }
}

impl Gregorian {
    /// JDN of 1582-10-15, the historical reform date.
    pub const DEFAULT_CUTOVER_JDN: i32 = 2_299_161;

    pub fn new() -> Self {
        Self::with_cutover(Self::DEFAULT_CUTOVER_JDN)
    }

    /// A hybrid calendar switching rules at `cutover_jdn` (the first day
    /// counted as Gregorian).
    pub fn with_cutover(cutover_jdn: i32) -> Self {
        let (cutover_year, _, _) = crate::date::Date::from_jdn(cutover_jdn).gregorian();
        Self {
            cutover_jdn,
            cutover_year,
        }
    }

    /// A purely proleptic Gregorian calendar (cutover pushed to the
    /// infinite past).
    pub fn proleptic() -> Self {
        Self {
            cutover_jdn: i32::MIN,
            cutover_year: i32::MIN,
        }
    }

    pub fn cutover_jdn(&self) -> i32 {
        self.cutover_jdn
    }

    /// Leap-year test under the rule in force for `extended_year`.
    pub fn is_leap_year(&self, extended_year: i32) -> bool {
        if extended_year >= self.cutover_year {
            extended_year % 4 == 0 && (extended_year % 100 != 0 || extended_year % 400 == 0)
        } else {
            extended_year % 4 == 0
        }
    }

    fn normalize(extended_year: i32, month: i32) -> (i32, i32) {
        if (0..12).contains(&month) {
            (extended_year, month)
        } else {
            (
                extended_year + month.div_euclid(12),
                month.rem_euclid(12),
            )
        }
    }

    /// Day before the first of the month. `invert` flips the rule choice
    /// for the cutover retry.
    fn month_start_impl(&self, extended_year: i32, month: i32, invert: bool) -> i32 {
        let (eyear, month) = Self::normalize(extended_year, month);
        let gregorian = (eyear >= self.cutover_year) != invert;
        let mut is_leap = eyear % 4 == 0;
        let y = (eyear - 1) as i64;
        let mut jdn = 365 * y + y.div_euclid(4) + (JAN_1_1_JDN as i64 - 3);
        if gregorian {
            is_leap = is_leap && (eyear % 100 != 0 || eyear % 400 == 0);
            jdn += y.div_euclid(400) - y.div_euclid(100) + 2;
        }
        if month != 0 {
            jdn += days_before_month(month + 1, is_leap) as i64;
        }
        jdn as i32
    }
}

impl CalendarSystem for Gregorian {
    fn kind(&self) -> &'static str {
        "gregorian"
    }

    fn month_start(
        &self,
        extended_year: i32,
        month: i32,
        _use_month: bool,
        _leap_month: bool,
    ) -> i32 {
        self.month_start_impl(extended_year, month, false)
    }

    fn extended_year(&self, fields: &FieldSet) -> i32 {
        if fields.newer_field(Field::ExtendedYear, Field::Year) == Field::ExtendedYear {
            fields.get_or(Field::ExtendedYear, EPOCH_YEAR)
        } else if fields.get_or(Field::Era, AD) == BC {
            1 - fields.get_or(Field::Year, 1)
        } else {
            fields.get_or(Field::Year, EPOCH_YEAR)
        }
    }

    fn compute_fields(&self, jdn: i32, greg: &GregorianDay, fields: &mut FieldSet) {
        let (eyear, month, day_of_month, day_of_year) = if jdn >= self.cutover_jdn {
            (greg.year, greg.month - 1, greg.day_of_month, greg.day_of_year)
        } else {
            // Julian reading: days since Julian 1-01-01.
            let julian_day = (jdn - (JAN_1_1_JDN - 2)) as i64;
            let eyear = ((4 * julian_day + 1464).div_euclid(1461)) as i32;
            let january1 = 365 * (eyear as i64 - 1) + (eyear as i64 - 1).div_euclid(4);
            let doy0 = (julian_day - january1) as i32;
            let is_leap = eyear.rem_euclid(4) == 0;
            let march1 = if is_leap { 60 } else { 59 };
            let correction = if doy0 >= march1 {
                if is_leap { 1 } else { 2 }
            } else {
                0
            };
            let month = (12 * (doy0 + correction) + 6) / 367;
            let day = doy0 - days_before_month(month + 1, is_leap) + 1;
            (eyear, month, day, doy0 + 1)
        };
        fields.set_internal(Field::ExtendedYear, eyear);
        fields.set_internal(Field::Month, month);
        fields.set_internal(Field::DayOfMonth, day_of_month);
        fields.set_internal(Field::DayOfYear, day_of_year);
        if eyear < 1 {
            fields.set_internal(Field::Era, BC);
            fields.set_internal(Field::Year, 1 - eyear);
        } else {
            fields.set_internal(Field::Era, AD);
            fields.set_internal(Field::Year, eyear);
        }
    }

    fn month_length(&self, extended_year: i32, month: i32) -> i32 {
        let (eyear, month) = Self::normalize(extended_year, month);
        MONTH_LENGTHS[month as usize][self.is_leap_year(eyear) as usize]
    }

    fn year_length(&self, extended_year: i32) -> i32 {
        if self.is_leap_year(extended_year) { 366 } else { 365 }
    }

    fn era0_years_backward(&self) -> bool {
        true
    }

    fn compute_julian_day(&self, ctx: &ResolveContext<'_>) -> (i32, i32) {
        let year = resolve_extended_year(self, ctx);
        let jdn = julian_day_from_parts(
            ctx,
            year,
            |y, m, _, _| self.month_start_impl(y, m, false),
            |y, m| self.month_length(y, m),
        );
        // The rule is chosen by the year, but the resulting day must lie
        // on the same side of the cutover; near the gap, retry once with
        // the other rule.
        let month = match ctx.best_field {
            Field::DayOfMonth | Field::WeekOfMonth | Field::DayOfWeekInMonth => {
                ctx.fields.get_or(Field::Month, 0)
            }
            _ => 0,
        };
        let (effective_year, _) = Self::normalize(year, month);
        let gregorian = effective_year >= self.cutover_year;
        if gregorian != (jdn >= self.cutover_jdn) {
            trace!(jdn, year, "date fell across the cutover, recomputing");
            let jdn = julian_day_from_parts(
                ctx,
                year,
                |y, m, _, _| self.month_start_impl(y, m, true),
                |y, m| self.month_length(y, m),
            );
            return (jdn, year);
        }
        (jdn, year)
    }
}

/// Month lengths, common and leap.
const MONTH_LENGTHS: [[i32; 2]; 12] = [
    [31, 31],
    [28, 29],
    [31, 31],
    [30, 30],
    [31, 31],
    [30, 30],
    [31, 31],
    [30, 30],
    [31, 31],
    [30, 30],
    [31, 31],
    [30, 31],
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leap_years_follow_the_rule_in_force() {
        let cal = Gregorian::new();
        // Gregorian rule from 1582 on.
        for (year, leap) in [(1600, true), (1700, false), (1900, false), (2000, true), (2024, true), (2023, false)] {
            assert_eq!(leap, cal.is_leap_year(year), "year {year}");
        }
        // Julian rule before the cutover: all multiples of 4.
        for (year, leap) in [(1500, true), (1100, true), (900, true), (1, false), (0, true), (-1, false)] {
            assert_eq!(leap, cal.is_leap_year(year), "year {year}");
        }
    }

    #[test]
    fn month_start_matches_known_epochs() {
        let cal = Gregorian::new();
        // Day before 1970-01-01.
        assert_eq!(2440587, cal.month_start(1970, 0, false, false));
        // Day before 2000-01-01.
        assert_eq!(2451544, cal.month_start(2000, 0, false, false));
        // Out-of-range months normalize.
        assert_eq!(
            cal.month_start(2000, 0, true, false),
            cal.month_start(1999, 12, true, false)
        );
    }

    #[test]
    fn cutover_boundary_days() {
        use crate::fields::FieldSet;
        let cal = Gregorian::new();
        // 1582-10-15 Gregorian is the cutover day itself.
        assert_eq!(2299161, cal.month_start(1582, 9, true, false) + 15);
        // The day before reads as Julian 1582-10-04.
        let mut fields = FieldSet::new();
        cal.compute_fields(2299160, &crate::calendar::gregorian_day(2299160), &mut fields);
        assert_eq!(9, fields.get(Field::Month));
        assert_eq!(4, fields.get(Field::DayOfMonth));
        assert_eq!(1582, fields.get(Field::ExtendedYear));
        // And the cutover day reads as Gregorian 1582-10-15.
        let mut fields = FieldSet::new();
        cal.compute_fields(2299161, &crate::calendar::gregorian_day(2299161), &mut fields);
        assert_eq!(9, fields.get(Field::Month));
        assert_eq!(15, fields.get(Field::DayOfMonth));
    }

    #[test]
    fn proleptic_has_no_gap() {
        let cal = Gregorian::proleptic();
        // Oct 5, 1582 exists proleptically.
        assert_eq!(
            crate::date::Date::from_gregorian(1582, 10, 5).jdn(),
            cal.month_start(1582, 9, true, false) + 5
        );
    }

    #[test]
    fn month_lengths_sum_to_year_length() {
        let cal = Gregorian::new();
        for year in [1999, 2000, 1581, 1583, -44] {
            let total: i32 = (0..12).map(|m| cal.month_length(year, m)).sum();
            assert_eq!(cal.year_length(year), total, "year {year}");
        }
    }
}
