//! Hebrew calendar.
//!
//! Years begin at the molad of Tishri, deferred by the four traditional
//! postponements; month lengths then follow from the resulting year
//! length (deficient, normal, or complete), with a thirteenth month
//! (Adar I) inserted in leap years of the 19-year Metonic cycle.

use crate::cache::EventCache;
use crate::calendar::{CalendarSystem, GregorianDay, MonthShift, ResolvedDate};
use crate::error::{CalendarError, Result};
use crate::fields::{Field, FieldSet};

pub const TISHRI: i32 = 0;
pub const HESHVAN: i32 = 1;
pub const KISLEV: i32 = 2;
pub const TEVET: i32 = 3;
pub const SHEVAT: i32 = 4;
/// The leap month, present only in leap years.
pub const ADAR_1: i32 = 5;
pub const ADAR: i32 = 6;
pub const NISAN: i32 = 7;
pub const IYAR: i32 = 8;
pub const SIVAN: i32 = 9;
pub const TAMUZ: i32 = 10;
pub const AV: i32 = 11;
pub const ELUL: i32 = 12;

/// JDN of the day before Hebrew 1-01-01.
const HEBREW_EPOCH: i32 = 347_997;

// Molad arithmetic in "parts": 1080 parts per hour.
const HOUR_PARTS: i64 = 1080;
const DAY_PARTS: i64 = 24 * HOUR_PARTS;
/// Fractional-day part of the lunar cycle: 12 hours, 793 parts.
const MONTH_FRACT: i64 = 12 * HOUR_PARTS + 793;
const MONTH_PARTS: i64 = 29 * DAY_PARTS + MONTH_FRACT;
/// Time of the first molad: 5 hours, 204 parts into day 1.
const BAHARAD: i64 = 11 * HOUR_PARTS + 204;

/// Month lengths by year type (deficient, normal, complete). Only
/// Heshvan and Kislev vary.
const MONTH_LENGTH: [[i32; 3]; 13] = [
    [30, 30, 30], // Tishri
    [29, 29, 30], // Heshvan
    [29, 30, 30], // Kislev
    [29, 29, 29], // Tevet
    [30, 30, 30], // Shevat
    [30, 30, 30], // Adar I (leap years only)
    [29, 29, 29], // Adar
    [30, 30, 30], // Nisan
    [29, 29, 29], // Iyar
    [30, 30, 30], // Sivan
    [29, 29, 29], // Tamuz
    [30, 30, 30], // Av
    [29, 29, 29], // Elul
];

/// Days before each month in a non-leap year, by year type. The Adar I
/// row duplicates Shevat's end so month numbers stay stable.
const MONTH_START: [[i32; 3]; 14] = [
    [0, 0, 0],
    [30, 30, 30],
    [59, 59, 60],
    [88, 89, 90],
    [117, 118, 119],
    [147, 148, 149],
    [147, 148, 149], // Adar I placeholder
    [176, 177, 178],
    [206, 207, 208],
    [235, 236, 237],
    [265, 266, 267],
    [294, 295, 296],
    [324, 325, 326],
    [353, 354, 355],
];

/// Days before each month in a leap year, by year type.
const LEAP_MONTH_START: [[i32; 3]; 14] = [
    [0, 0, 0],
    [30, 30, 30],
    [59, 59, 60],
    [88, 89, 90],
    [117, 118, 119],
    [147, 148, 149],
    [177, 178, 179],
    [206, 207, 208],
    [236, 237, 238],
    [265, 266, 267],
    [295, 296, 297],
    [324, 325, 326],
    [354, 355, 356],
    [383, 384, 385],
];

/// Whether `year` is a leap year of the Metonic cycle.
pub fn is_leap_year(year: i32) -> bool {
    (year as i64 * 12 + 17).rem_euclid(19) >= 12
}

fn months_in_year(year: i32) -> i32 {
    if is_leap_year(year) { 13 } else { 12 }
}

/// The Hebrew calendar system.
#[derive(Debug)]
pub struct Hebrew {
    year_starts: EventCache,
}

impl Default for Hebrew {
    fn default() -> Self {
        Self::new()
    }
}

impl Hebrew {
    pub fn new() -> Self {
        Self {
            year_starts: EventCache::new("hebrew-year-start"),
        }
    }

    /// Day number (from the Hebrew epoch) of the day before Tishri 1.
    fn start_of_year(&self, year: i32) -> i64 {
        self.year_starts.get_or_compute(year as i64, || {
            let months = (235 * year as i64 - 234).div_euclid(19);
            let mut frac = months * MONTH_FRACT + BAHARAD;
            let mut day = months * 29 + frac.div_euclid(DAY_PARTS);
            frac = frac.rem_euclid(DAY_PARTS);

            // Postponements. Weekday 0 here is Monday.
            let mut wd = day.rem_euclid(7);
            if wd == 2 || wd == 4 || wd == 6 {
                // Lo ADU rosh: never Sunday, Wednesday, Friday.
                day += 1;
                wd = day.rem_euclid(7);
            }
            if wd == 1 && frac > 15 * HOUR_PARTS + 204 && !is_leap_year(year) {
                // Late Tuesday molad of a common year.
                day += 2;
            } else if wd == 0 && frac > 21 * HOUR_PARTS + 589 && is_leap_year(year - 1) {
                // Late Monday molad following a leap year.
                day += 1;
            }
            day
        })
    }

    /// Year type index: 0 deficient, 1 normal, 2 complete.
    fn year_type(&self, year: i32) -> usize {
        let mut len = self.year_length_inner(year);
        if len > 380 {
            len -= 30; // leap years: classify by the common part
        }
        // The postponements admit no other lengths.
        debug_assert!((353..=355).contains(&len), "year {year} length {len}");
        (len - 353).clamp(0, 2) as usize
    }

    fn year_length_inner(&self, year: i32) -> i32 {
        (self.start_of_year(year + 1) - self.start_of_year(year)) as i32
    }

    /// Out-of-range months shift into adjacent years; 0..=12 is kept
    /// as-is in every year, leap or not.
    fn normalize(&self, mut year: i32, mut month: i32) -> (i32, i32) {
        while month < 0 {
            year -= 1;
            month += months_in_year(year);
        }
        while month > 12 {
            month -= months_in_year(year);
            year += 1;
        }
        (year, month)
    }
}

impl CalendarSystem for Hebrew {
    fn kind(&self) -> &'static str {
        "hebrew"
    }

    fn month_start(
        &self,
        extended_year: i32,
        month: i32,
        _use_month: bool,
        _leap_month: bool,
    ) -> i32 {
        let (year, month) = self.normalize(extended_year, month);
        let mut day = self.start_of_year(year);
        if month != 0 {
            let table = if is_leap_year(year) {
                &LEAP_MONTH_START
            } else {
                &MONTH_START
            };
            day += table[month as usize][self.year_type(year)] as i64;
        }
        (day + HEBREW_EPOCH as i64) as i32
    }

    fn extended_year(&self, fields: &FieldSet) -> i32 {
        if fields.newer_field(Field::ExtendedYear, Field::Year) == Field::ExtendedYear {
            fields.get_or(Field::ExtendedYear, 1)
        } else {
            fields.get_or(Field::Year, 1)
        }
    }

    fn compute_fields(&self, jdn: i32, _greg: &GregorianDay, fields: &mut FieldSet) {
        let d = (jdn - HEBREW_EPOCH) as i64;
        let m = (d * DAY_PARTS).div_euclid(MONTH_PARTS);
        let mut year = ((19 * m + 234).div_euclid(235)) as i32 + 1;
        let mut day_of_year = (d - self.start_of_year(year)) as i32;
        while day_of_year < 1 {
            year -= 1;
            day_of_year = (d - self.start_of_year(year)) as i32;
        }
        let year_type = self.year_type(year);
        let table = if is_leap_year(year) {
            &LEAP_MONTH_START
        } else {
            &MONTH_START
        };
        let mut month = 0usize;
        while day_of_year > table[month][year_type] {
            month += 1;
        }
        month -= 1;
        let day_of_month = day_of_year - table[month][year_type];

        fields.set_internal(Field::Era, 0);
        fields.set_internal(Field::Year, year);
        fields.set_internal(Field::ExtendedYear, year);
        fields.set_internal(Field::Month, month as i32);
        fields.set_internal(Field::DayOfMonth, day_of_month);
        fields.set_internal(Field::DayOfYear, day_of_year);
    }

    fn month_length(&self, extended_year: i32, month: i32) -> i32 {
        let (year, month) = self.normalize(extended_year, month);
        match month {
            HESHVAN | KISLEV => MONTH_LENGTH[month as usize][self.year_type(year)],
            _ => MONTH_LENGTH[month as usize][0],
        }
    }

    fn year_length(&self, extended_year: i32) -> i32 {
        self.year_length_inner(extended_year)
    }

    fn months_in_year(&self, extended_year: i32) -> i32 {
        months_in_year(extended_year)
    }

    fn limits(&self, field: Field) -> (i32, i32) {
        match field {
            Field::Era => (0, 0),
            Field::Month => (0, 12),
            Field::DayOfMonth => (1, 30),
            Field::DayOfYear => (1, 385),
            Field::WeekOfYear => (1, 56),
            _ => crate::calendar::default_limits(field),
        }
    }

    fn validate(&self, fields: &FieldSet) -> Result<()> {
        if fields.stamp(Field::Month) >= crate::fields::MINIMUM_USER_STAMP
            && fields.get(Field::Month) == ADAR_1
            && !is_leap_year(self.extended_year(fields))
        {
            return Err(CalendarError::InvalidFieldCombination(
                "Adar I in a non-leap year",
            ));
        }
        Ok(())
    }

    fn shift_months(
        &self,
        date: &ResolvedDate,
        _jdn: i32,
        amount: i32,
        rolling: bool,
    ) -> MonthShift {
        let mut month = date.month;
        let mut year = date.extended_year;
        if rolling {
            let leap = is_leap_year(year);
            let n = months_in_year(year);
            let mut new_month = month + amount % n;
            // In a common year the roll must skip over the absent Adar I.
            if !leap {
                if amount > 0 && month < ADAR_1 && new_month >= ADAR_1 {
                    new_month += 1;
                } else if amount < 0 && month > ADAR_1 && new_month <= ADAR_1 {
                    new_month -= 1;
                }
            }
            return MonthShift::Date(ResolvedDate {
                extended_year: year,
                month: (new_month + 13) % 13,
                is_leap_month: false,
                day_of_month: date.day_of_month,
            });
        }
        // Adding: walk across year boundaries, stepping over Adar I
        // whenever a common year is crossed into from the far side.
        if amount > 0 {
            let mut across_adar1 = month < ADAR_1;
            month += amount;
            loop {
                if across_adar1 && month >= ADAR_1 && !is_leap_year(year) {
                    month += 1;
                }
                if month > ELUL {
                    month -= 13;
                    year += 1;
                    across_adar1 = true;
                } else {
                    break;
                }
            }
        } else {
            let mut across_adar1 = month > ADAR_1;
            month += amount;
            loop {
                if across_adar1 && month <= ADAR_1 && !is_leap_year(year) {
                    month -= 1;
                }
                if month < 0 {
                    month += 13;
                    year -= 1;
                    across_adar1 = true;
                } else {
                    break;
                }
            }
        }
        MonthShift::Date(ResolvedDate {
            extended_year: year,
            month,
            is_leap_month: false,
            day_of_month: date.day_of_month,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::Calendar;
    use crate::date::Date;

    #[test]
    fn leap_rule_matches_metonic_positions() {
        // Leap years fall at cycle positions 3, 6, 8, 11, 14, 17, 19.
        for year in 1..200 {
            let expected = (7 * year as i64 + 1).rem_euclid(19) < 7;
            assert_eq!(expected, is_leap_year(year), "year {year}");
        }
        // Seven leap years per 19-year cycle.
        let leaps = (5700..5719).filter(|&y| is_leap_year(y)).count();
        assert_eq!(7, leaps);
    }

    #[test]
    fn year_lengths_are_admissible() {
        let cal = Hebrew::new();
        for year in 5700..5800 {
            let len = cal.year_length(year);
            if is_leap_year(year) {
                assert!([383, 384, 385].contains(&len), "year {year}: {len}");
            } else {
                assert!([353, 354, 355].contains(&len), "year {year}: {len}");
            }
        }
    }

    #[test]
    fn rosh_hashanah_5758() {
        let cal = Hebrew::new();
        // 1 Tishri 5758 = 1997-10-02 Gregorian.
        assert_eq!(
            Date::from_gregorian(1997, 10, 2).jdn(),
            cal.month_start(5758, TISHRI, true, false) + 1
        );
    }

    #[test]
    fn fields_round_trip() {
        let cal = Hebrew::new();
        for jdn in (2_440_000..2_470_000).step_by(1237) {
            let mut fields = FieldSet::new();
            cal.compute_fields(jdn, &crate::calendar::gregorian_day(jdn), &mut fields);
            let year = fields.get(Field::ExtendedYear);
            let month = fields.get(Field::Month);
            let day = fields.get(Field::DayOfMonth);
            assert_eq!(
                jdn,
                cal.month_start(year, month, true, false) + day,
                "jdn {jdn}"
            );
            assert!(day >= 1 && day <= cal.month_length(year, month));
        }
    }

    #[test]
    fn month_lengths_sum_to_year_length() {
        let cal = Hebrew::new();
        for year in [5757, 5758, 5765, 5776] {
            let n = months_in_year(year);
            let months: Vec<i32> = (0..13)
                .filter(|&m| is_leap_year(year) || m != ADAR_1)
                .collect();
            assert_eq!(n as usize, months.len());
            let total: i32 = months.iter().map(|&m| cal.month_length(year, m)).sum();
            assert_eq!(cal.year_length(year), total, "year {year}");
        }
    }

    #[test]
    fn av_thirtieth_pins_to_elul_twentyninth() {
        let mut cal = Calendar::new(Hebrew::new());
        cal.set(Field::Year, 5765);
        cal.set(Field::Month, AV);
        cal.set(Field::DayOfMonth, 30);
        cal.add(Field::Month, 1).unwrap();
        assert_eq!(ELUL, cal.get(Field::Month).unwrap());
        assert_eq!(29, cal.get(Field::DayOfMonth).unwrap());
        // Going back does not restore the 30th.
        cal.add(Field::Month, -1).unwrap();
        assert_eq!(AV, cal.get(Field::Month).unwrap());
        assert_eq!(29, cal.get(Field::DayOfMonth).unwrap());
    }

    #[test]
    fn add_skips_adar_1_in_common_years() {
        // 5765 is a common year; stepping from Shevat lands in Adar.
        assert!(!is_leap_year(5765));
        let mut cal = Calendar::new(Hebrew::new());
        cal.set(Field::Year, 5765);
        cal.set(Field::Month, SHEVAT);
        cal.set(Field::DayOfMonth, 10);
        cal.add(Field::Month, 1).unwrap();
        assert_eq!(ADAR, cal.get(Field::Month).unwrap());
        // 5768 is a leap year; the same step lands in Adar I.
        assert!(is_leap_year(5768));
        let mut cal = Calendar::new(Hebrew::new());
        cal.set(Field::Year, 5768);
        cal.set(Field::Month, SHEVAT);
        cal.set(Field::DayOfMonth, 10);
        cal.add(Field::Month, 1).unwrap();
        assert_eq!(ADAR_1, cal.get(Field::Month).unwrap());
    }

    #[test]
    fn strict_mode_rejects_adar_1_in_common_year() {
        let mut cal = Calendar::new(Hebrew::new());
        cal.set_lenient(false);
        cal.set(Field::Year, 5765);
        cal.set(Field::Month, ADAR_1);
        cal.set(Field::DayOfMonth, 1);
        assert_eq!(
            Err(CalendarError::InvalidFieldCombination(
                "Adar I in a non-leap year"
            )),
            cal.complete()
        );
    }
}
