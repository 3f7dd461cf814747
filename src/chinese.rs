//! Chinese lunisolar calendar.
//!
//! Months begin at the computed new moon and are numbered by the major
//! solar terms they contain; a month with no major solar term repeats
//! the previous month's number as a leap month. Month 11 always
//! contains the winter solstice, which anchors each year. Astronomical
//! computations run in the traditional China zone (GMT+8).

use crate::astro::{NEW_MOON, SYNODIC_MONTH, WINTER_SOLSTICE, moon_time, sun_longitude, sun_time};
use crate::cache::EventCache;
use crate::calendar::{CalendarSystem, GregorianDay, MonthShift, ResolvedDate};
use crate::date::{DAY_MILLIS, Date, EPOCH_JDN};
use crate::fields::{Field, FieldSet, PrecedenceTable, ResolveLine, UNSET};

/// Gregorian year of Chinese extended year 1: the 61st year of the
/// reign of Huang Di.
const CHINESE_EPOCH_YEAR: i32 = -2636;

const CHINA_ZONE_OFFSET: i64 = 8 * 60 * 60 * 1000;

/// Days to step from a new moon to land inside the next (or previous)
/// lunation without crossing it.
const SYNODIC_GAP: i32 = 25;

/// Precedence table with the leap-month flag folded into the
/// day-of-month line.
const CHINESE_DATE_PRECEDENCE: PrecedenceTable = &[
    &[
        ResolveLine::of(&[Field::DayOfMonth]),
        ResolveLine::of(&[Field::WeekOfYear, Field::DayOfWeek]),
        ResolveLine::of(&[Field::WeekOfMonth, Field::DayOfWeek]),
        ResolveLine::of(&[Field::DayOfWeekInMonth, Field::DayOfWeek]),
        ResolveLine::of(&[Field::WeekOfYear, Field::DowLocal]),
        ResolveLine::of(&[Field::WeekOfMonth, Field::DowLocal]),
        ResolveLine::of(&[Field::DayOfWeekInMonth, Field::DowLocal]),
        ResolveLine::of(&[Field::DayOfYear]),
        ResolveLine::remapped(Field::DayOfMonth, &[Field::IsLeapMonth]),
    ],
    &[
        ResolveLine::of(&[Field::WeekOfYear]),
        ResolveLine::of(&[Field::WeekOfMonth]),
        ResolveLine::of(&[Field::DayOfWeekInMonth]),
        ResolveLine::remapped(Field::DayOfWeekInMonth, &[Field::DayOfWeek]),
        ResolveLine::remapped(Field::DayOfWeekInMonth, &[Field::DowLocal]),
    ],
];

/// Reading of a single lunation.
struct LunarMonth {
    /// 1-based month number.
    month: i32,
    is_leap_month: bool,
    /// Local days of the first day of the month.
    start: i32,
    /// Whether the surrounding solstice-to-solstice year has 13 moons.
    is_leap_year: bool,
}

/// The Chinese lunisolar calendar system.
#[derive(Debug)]
pub struct Chinese {
    /// Gregorian year corresponding to extended year 1.
    epoch_year: i32,
    /// Zone offset of the astronomical base zone, in milliseconds.
    zone_offset: i64,
    solstices: EventCache,
    new_years: EventCache,
}

impl Default for Chinese {
    fn default() -> Self {
        Self::new()
    }
}

impl Chinese {
    pub fn new() -> Self {
        Self::with_epoch(CHINESE_EPOCH_YEAR, CHINA_ZONE_OFFSET)
    }

    /// A lunisolar calendar counting years from a different epoch or
    /// observing from a different meridian (e.g. the Korean reckoning).
    pub fn with_epoch(epoch_year: i32, zone_offset_millis: i64) -> Self {
        Self {
            epoch_year,
            zone_offset: zone_offset_millis,
            solstices: EventCache::new("chinese-winter-solstice"),
            new_years: EventCache::new("chinese-new-year"),
        }
    }

    /// Local days (days after 1970-01-01 00:00 in the base zone) to an
    /// epoch-millisecond instant.
    fn days_to_millis(&self, days: i32) -> i64 {
        days as i64 * DAY_MILLIS - self.zone_offset
    }

    fn millis_to_days(&self, millis: i64) -> i32 {
        (millis + self.zone_offset).div_euclid(DAY_MILLIS) as i32
    }

    /// Local days of the winter solstice on or after December 1 of a
    /// Gregorian year.
    fn winter_solstice(&self, gyear: i32) -> i32 {
        self.solstices.get_or_compute(gyear as i64, || {
            let december = Date::from_gregorian(gyear, 12, 1).epoch_days();
            let found = sun_time(self.days_to_millis(december), WINTER_SOLSTICE, true);
            self.millis_to_days(found) as i64
        }) as i32
    }

    /// Local days of the new moon on or after (or before) a day.
    fn new_moon_near(&self, days: i32, after: bool) -> i32 {
        self.millis_to_days(moon_time(self.days_to_millis(days), NEW_MOON, after))
    }

    /// Major solar term in force on a day: 1 (at 330°) through 12 (at
    /// 300°), advancing every 30° of solar longitude.
    fn major_solar_term(&self, days: i32) -> i32 {
        let longitude = sun_longitude(self.days_to_millis(days));
        let term = (((6.0 * longitude / std::f64::consts::PI).floor() as i32) + 2) % 12;
        if term < 1 { term + 12 } else { term }
    }

    /// A month with no major solar term is a leap month.
    fn has_no_major_solar_term(&self, new_moon: i32) -> bool {
        self.major_solar_term(new_moon)
            == self.major_solar_term(self.new_moon_near(new_moon + SYNODIC_GAP, true))
    }

    /// Whether a leap month starts in `new_moon1..=new_moon2` (both new
    /// moons).
    fn is_leap_month_between(&self, new_moon1: i32, new_moon2: i32) -> bool {
        debug_assert!(
            synodic_months_between(new_moon1, new_moon2) < 50,
            "is_leap_month_between called across years"
        );
        new_moon2 >= new_moon1
            && (self
                .is_leap_month_between(new_moon1, self.new_moon_near(new_moon2 - SYNODIC_GAP, false))
                || self.has_no_major_solar_term(new_moon2))
    }

    /// Numbers the lunation containing a day. The winter solstices
    /// before and after the day bound the lunisolar year; month numbers
    /// count from the moon after month 11.
    fn lunar_month(&self, days: i32) -> LunarMonth {
        let gyear = Date::from_jdn(days + EPOCH_JDN).gregorian().0;
        let mut solstice_after = self.winter_solstice(gyear);
        let solstice_before = if days < solstice_after {
            self.winter_solstice(gyear - 1)
        } else {
            let before = solstice_after;
            solstice_after = self.winter_solstice(gyear + 1);
            before
        };

        let first_moon = self.new_moon_near(solstice_before + 1, true);
        let last_moon = self.new_moon_near(solstice_after + 1, false);
        let this_moon = self.new_moon_near(days + 1, false);
        let is_leap_year = synodic_months_between(first_moon, last_moon) == 12;

        let mut month = synodic_months_between(first_moon, this_moon);
        if is_leap_year && self.is_leap_month_between(first_moon, this_moon) {
            month -= 1;
        }
        if month < 1 {
            month += 12;
        }
        let is_leap_month = is_leap_year
            && self.has_no_major_solar_term(this_moon)
            && !self.is_leap_month_between(
                first_moon,
                self.new_moon_near(this_moon - SYNODIC_GAP, false),
            );
        LunarMonth {
            month,
            is_leap_month,
            start: this_moon,
            is_leap_year,
        }
    }

    /// Local days of the Chinese new year in a Gregorian year: the
    /// second (or third) new moon after the prior winter solstice.
    fn new_year(&self, gyear: i32) -> i32 {
        self.new_years.get_or_compute(gyear as i64, || {
            let solstice_before = self.winter_solstice(gyear - 1);
            let solstice_after = self.winter_solstice(gyear);
            let new_moon1 = self.new_moon_near(solstice_before + 1, true);
            let new_moon2 = self.new_moon_near(new_moon1 + SYNODIC_GAP, true);
            let new_moon11 = self.new_moon_near(solstice_after + 1, false);

            let new_year = if synodic_months_between(new_moon1, new_moon11) == 12
                && (self.has_no_major_solar_term(new_moon1)
                    || self.has_no_major_solar_term(new_moon2))
            {
                // Month 11 or 12 is a leap month; new year is one moon
                // later.
                self.new_moon_near(new_moon2 + SYNODIC_GAP, true)
            } else {
                new_moon2
            };
            new_year as i64
        }) as i32
    }

    /// Month start (local days) and length for pinned month arithmetic.
    fn month_range(&self, start: i32, day_of_month: i32, delta: i32) -> MonthShift {
        // Middle of the month before the target, then forward to its new
        // moon.
        let guess = start + (SYNODIC_MONTH * (delta as f64 - 0.5)) as i32;
        let new_moon = self.new_moon_near(guess, true);
        let length = self.new_moon_near(new_moon + SYNODIC_GAP, true) - new_moon;
        MonthShift::JulianDay(new_moon + EPOCH_JDN - 1 + day_of_month.min(length))
    }
}

/// Nearest integer count of synodic months between two local days.
fn synodic_months_between(day1: i32, day2: i32) -> i32 {
    ((day2 - day1) as f64 / SYNODIC_MONTH).round() as i32
}

impl CalendarSystem for Chinese {
    fn kind(&self) -> &'static str {
        "chinese"
    }

    fn month_start(
        &self,
        extended_year: i32,
        month: i32,
        use_month: bool,
        leap_month: bool,
    ) -> i32 {
        let eyear = extended_year + month.div_euclid(12);
        let month = month.rem_euclid(12);

        let gyear = eyear + self.epoch_year - 1;
        let mut new_moon = self.new_moon_near(self.new_year(gyear) + month * 29, true);

        // The mean-length estimate can land one month short when a leap
        // month intervenes; verify and step forward once.
        let target_leap = use_month && leap_month;
        let found = self.lunar_month(new_moon);
        if month != found.month - 1 || target_leap != found.is_leap_month {
            new_moon = self.new_moon_near(new_moon + SYNODIC_GAP, true);
        }
        new_moon + EPOCH_JDN - 1
    }

    fn extended_year(&self, fields: &FieldSet) -> i32 {
        if fields.newest_stamp(&[Field::Era, Field::Year], UNSET)
            <= fields.stamp(Field::ExtendedYear)
        {
            fields.get_or(Field::ExtendedYear, 1)
        } else {
            // Era is the 60-year cycle, year the year within it.
            let cycle = fields.get_or(Field::Era, 1) - 1;
            cycle * 60 + fields.get_or(Field::Year, 1) - (self.epoch_year - CHINESE_EPOCH_YEAR)
        }
    }

    fn compute_fields(&self, jdn: i32, greg: &GregorianDay, fields: &mut FieldSet) {
        let days = jdn - EPOCH_JDN;
        let info = self.lunar_month(days);

        let mut extended_year = greg.year - self.epoch_year;
        let mut cycle_year = greg.year - CHINESE_EPOCH_YEAR;
        if info.month < 11 || greg.month >= 7 {
            // Months 1..10 and late-Gregorian months 11, 12 belong to
            // the year that began this Gregorian year.
            extended_year += 1;
            cycle_year += 1;
        }
        let cycle = (cycle_year - 1).div_euclid(60);
        let year_of_cycle = (cycle_year - 1).rem_euclid(60);

        let mut new_year = self.new_year(greg.year);
        if days < new_year {
            // Months 11, leap 11, and 12 precede the new year we found.
            new_year = self.new_year(greg.year - 1);
        }

        fields.set_internal(Field::Era, cycle + 1);
        fields.set_internal(Field::Year, year_of_cycle + 1);
        fields.set_internal(Field::ExtendedYear, extended_year);
        fields.set_internal(Field::Month, info.month - 1);
        fields.set_internal(Field::IsLeapMonth, info.is_leap_month as i32);
        fields.set_internal(Field::DayOfMonth, days - info.start + 1);
        fields.set_internal(Field::DayOfYear, days - new_year + 1);
    }

    fn month_length(&self, extended_year: i32, month: i32) -> i32 {
        let start = self.month_start(extended_year, month, true, false) - EPOCH_JDN + 1;
        self.new_moon_near(start + SYNODIC_GAP, true) - start
    }

    fn year_length(&self, extended_year: i32) -> i32 {
        let gyear = extended_year + self.epoch_year - 1;
        self.new_year(gyear + 1) - self.new_year(gyear)
    }

    fn months_in_year(&self, extended_year: i32) -> i32 {
        let gyear = extended_year + self.epoch_year - 1;
        synodic_months_between(self.new_year(gyear), self.new_year(gyear + 1))
    }

    fn day_of_month_limit(&self, date: &ResolvedDate) -> i32 {
        let start =
            self.month_start(date.extended_year, date.month, true, date.is_leap_month) - EPOCH_JDN
                + 1;
        self.new_moon_near(start + SYNODIC_GAP, true) - start
    }

    fn limits(&self, field: Field) -> (i32, i32) {
        match field {
            Field::Era => (1, 83333),
            Field::Year => (1, 60),
            Field::DayOfMonth => (1, 30),
            Field::DayOfYear => (1, 385),
            Field::IsLeapMonth => (0, 1),
            _ => crate::calendar::default_limits(field),
        }
    }

    fn resolution_table(&self) -> PrecedenceTable {
        CHINESE_DATE_PRECEDENCE
    }

    fn shift_months(
        &self,
        date: &ResolvedDate,
        jdn: i32,
        amount: i32,
        rolling: bool,
    ) -> MonthShift {
        let day = jdn - EPOCH_JDN;
        let start = day - date.day_of_month + 1;
        if !rolling {
            return self.month_range(start, date.day_of_month, amount);
        }

        // Adjusted 0-based month number counting any elapsed leap month,
        // so the roll wraps within the real 12 or 13 months of the year.
        let info = self.lunar_month(start);
        let mut m = date.month;
        if info.is_leap_year {
            if date.is_leap_month {
                m += 1;
            } else {
                // Start of month 0 (or of month 1 if a leap month came
                // between).
                let guess = start - (SYNODIC_MONTH * (m as f64 - 0.5)) as i32;
                let moon1 = self.new_moon_near(guess, true);
                if self.is_leap_month_between(moon1, start) {
                    m += 1;
                }
            }
        }
        let n = if info.is_leap_year { 13 } else { 12 };
        let new_m = (m + amount).rem_euclid(n);
        if new_m == m {
            MonthShift::JulianDay(jdn)
        } else {
            self.month_range(start, date.day_of_month, new_m - m)
        }
    }
}
