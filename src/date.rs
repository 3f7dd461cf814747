//! Calendar-independant date.

use std::ops::{Add, Sub};

/// Number of milliseconds in a day.
pub const DAY_MILLIS: i64 = 24 * 60 * 60 * 1000;

/// JDN of January 1, 1970 (Gregorian).
pub const EPOCH_JDN: i32 = 2_440_588;

/// JDN of January 1, year 1 (proleptic Gregorian). Anchor of the cycle
/// arithmetic below and of the calendar strategies.
pub(crate) const JAN_1_1_JDN: i32 = 1_721_426;

/// A calendar-independant date.
///
/// Wraps a Julian day number. Negative JDNs are allowed; the proleptic
/// Gregorian conversions are exact over the whole supported year range
/// (about ±5 000 000 years).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct Date {
    jdn: i32,
}

impl Date {
    /// Creates a `Date` with a Julian day number (JDN).
    pub fn from_jdn(jdn: i32) -> Self {
        Self { jdn }
    }
    /// Returns the Julian day number (JDN) of the date.
    pub fn jdn(&self) -> i32 {
        self.jdn
    }

    /// Creates a `Date` with a proleptic Gregorian calendar date.
    ///
    /// `year` should be an astronomical year number, i.e. 1 BC is `0`, 2
    /// BC is `-1`, etc. Months outside `1..=12` are normalized into the
    /// adjacent years.
    ///
    /// # Example
    ///
    /// ```
    /// use kalendaro::Date;
    ///
    /// let date = Date::from_gregorian(2000, 1, 1);
    /// assert_eq!(2451545, date.jdn());
    /// ```
    pub fn from_gregorian(year: i32, month: i32, day: i32) -> Self {
        let year = year + (month - 1).div_euclid(12);
        let month = (month - 1).rem_euclid(12) + 1;
        let y = year - 1;
        let jdn = 365 * y + y.div_euclid(4) - y.div_euclid(100) + y.div_euclid(400)
            + (JAN_1_1_JDN - 1)
            + ordinal_day_number(month, day, YearType::from_gregorian(year));
        Self { jdn }
    }
    /// Represents the date in the proleptic Gregorian calendar.
    ///
    /// Returns in `(year, month, day)` format.
    ///
    /// # Example
    ///
    /// ```
    /// use kalendaro::Date;
    ///
    /// let date = Date::from_jdn(2451545);
    /// assert_eq!((2000, 1, 1), date.gregorian());
    /// ```
    pub fn gregorian(&self) -> (i32, i32, i32) {
        let (year, _, month, day) = self.gregorian_year_doy();
        (year, month, day)
    }

    /// Gregorian year, day-of-year (1-based), month and day-of-month, in
    /// one pass. The field model wants all four at once.
    pub(crate) fn gregorian_year_doy(&self) -> (i32, i32, i32, i32) {
        let epoch_day = self.jdn - JAN_1_1_JDN;
        // 400-, 100-, 4- and 1-year cycles.
        let n400 = epoch_day.div_euclid(146_097);
        let mut rem = epoch_day.rem_euclid(146_097);
        let n100 = rem / 36_524;
        rem %= 36_524;
        let n4 = rem / 1461;
        rem %= 1461;
        let n1 = rem / 365;
        let mut year = 400 * n400 + 100 * n100 + 4 * n4 + n1;
        let mut day_of_year = rem % 365;
        if n100 == 4 || n1 == 4 {
            // Dec 31 at the end of a 4- or 400-year cycle.
            day_of_year = 365;
        } else {
            year += 1;
        }
        let is_leap = YearType::from_gregorian(year).is_leap();
        // Branchless month estimate from the day of year, then the day.
        let march1 = if is_leap { 60 } else { 59 };
        let correction = if day_of_year >= march1 {
            if is_leap { 1 } else { 2 }
        } else {
            0
        };
        let month = (12 * (day_of_year + correction) + 6) / 367;
        let day = day_of_year - days_before_month(month + 1, is_leap) + 1;
        (year, day_of_year + 1, month + 1, day)
    }

    /// Formats the date in ISO 8601 format.
    ///
    /// # Example
    ///
    /// ```
    /// use kalendaro::Date;
    ///
    /// let date = Date::from_gregorian(2000, 1, 1);
    /// assert_eq!("2000-01-01", date.iso_gregorian());
    /// ```
    pub fn iso_gregorian(&self) -> String {
        let (y, m, d) = self.gregorian();
        format!("{:04}-{:02}-{:02}", y, m, d)
    }

    /// Returns the day of week of the date, in ISO-8601 numbering (i.e.
    /// `1..=7` for Monday through Sunday)
    ///
    /// # Example
    ///
    /// ```
    /// use kalendaro::Date;
    ///
    /// let date = Date::from_gregorian(2000, 1, 1);
    /// assert_eq!(6, date.day_of_week()); // Saturday
    /// ```
    pub fn day_of_week(&self) -> i32 {
        self.jdn.rem_euclid(7) + 1
    }
    /// Returns the Chinese sexagenary day number of the date, numbered from 1
    /// (甲子) to 60 (癸亥).
    ///
    /// # Example
    ///
    /// ```
    /// use kalendaro::Date;
    ///
    /// let date = Date::from_gregorian(2000, 1, 1);
    /// assert_eq!(55, date.sexagenary()); // 戊午
    /// ```
    pub fn sexagenary(&self) -> i32 {
        (self.jdn + 49).rem_euclid(60) + 1
    }

    /// Days since January 1, 1970.
    pub fn epoch_days(&self) -> i32 {
        self.jdn - EPOCH_JDN
    }
    /// Creates a `Date` from a count of days since January 1, 1970.
    pub fn from_epoch_days(days: i32) -> Self {
        Self::from_jdn(days + EPOCH_JDN)
    }
    /// Milliseconds since the 1970 epoch at local midnight of this date.
    pub fn millis_at_midnight(&self) -> i64 {
        self.epoch_days() as i64 * DAY_MILLIS
    }
    /// Splits an epoch-millisecond instant into its date and the remaining
    /// milliseconds within the day (always in `0..DAY_MILLIS`).
    ///
    /// # Example
    ///
    /// ```
    /// use kalendaro::Date;
    ///
    /// let (date, in_day) = Date::from_millis(-1);
    /// assert_eq!((1969, 12, 31), date.gregorian());
    /// assert_eq!(86_399_999, in_day);
    /// ```
    pub fn from_millis(millis: i64) -> (Self, i32) {
        let days = millis.div_euclid(DAY_MILLIS);
        let in_day = millis.rem_euclid(DAY_MILLIS) as i32;
        (Self::from_epoch_days(days as i32), in_day)
    }
}

impl Add<i32> for Date {
    type Output = Date;
    fn add(self, rhs: i32) -> Self::Output {
        Date::from_jdn(self.jdn + rhs)
    }
}
impl Sub<Date> for Date {
    type Output = i32;
    fn sub(self, rhs: Date) -> Self::Output {
        self.jdn - rhs.jdn
    }
}

/// Indicates whether a year is a leap year or common year.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum YearType {
    Common,
    Leap,
}

impl YearType {
    /// Determines if `year` is a leap year in the Gregorian calendar.
    pub fn from_gregorian(year: i32) -> Self {
        if year % 4 == 0 && year % 100 != 0 || year % 400 == 0 {
            Self::Leap
        } else {
            Self::Common
        }
    }
    /// Determines if `year` is a leap year in the Julian calendar.
    pub fn from_julian(year: i32) -> Self {
        if year.rem_euclid(4) == 0 {
            Self::Leap
        } else {
            Self::Common
        }
    }
    /// Returns `true` if `self` is `Leap`, otherwise `false`.
    pub fn is_leap(&self) -> bool {
        matches!(self, YearType::Leap)
    }
}

/// Ordinal number (1-based) of the day within its year.
pub(crate) fn ordinal_day_number(month: i32, day: i32, year_type: YearType) -> i32 {
    day + match month {
        1 => 0,
        2 => 31,
        _ => 59 + (153 * (month - 3) + 2) / 5 + year_type.is_leap() as i32,
    }
}

/// Days in the year before the first of `month` (1-based).
pub(crate) fn days_before_month(month: i32, is_leap: bool) -> i32 {
    let year_type = if is_leap { YearType::Leap } else { YearType::Common };
    ordinal_day_number(month, 1, year_type) - 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_works() {
        let date = Date::from_jdn(2440588);
        assert_eq!(2440588, date.jdn());
    }

    #[test]
    fn from_gregorian() {
        let date = Date::from_gregorian(1970, 1, 1);
        assert_eq!(2440588, date.jdn());
        let date = Date::from_gregorian(2021, 9, 8);
        assert_eq!(2459466, date.jdn());
        let date = Date::from_gregorian(2000, 1, 1);
        assert_eq!(2451545, date.jdn());
    }

    #[test]
    fn from_gregorian_normalizes_month() {
        assert_eq!(
            Date::from_gregorian(2000, 1, 1),
            Date::from_gregorian(1999, 13, 1)
        );
        assert_eq!(
            Date::from_gregorian(1999, 12, 1),
            Date::from_gregorian(2000, 0, 1)
        );
    }

    #[test]
    fn to_gregorian() {
        for (jdn, ymd) in [
            (2440588, (1970, 1, 1)),
            (2459466, (2021, 9, 8)),
            (2451545, (2000, 1, 1)),
            (2299161, (1582, 10, 15)),
            (1721426, (1, 1, 1)),
            (1721425, (0, 12, 31)),
        ] {
            assert_eq!(ymd, Date::from_jdn(jdn).gregorian(), "jdn {jdn}");
        }
    }

    #[test]
    fn gregorian_round_trip() {
        for jdn in (1700000..2500000).step_by(9973) {
            let date = Date::from_jdn(jdn);
            let (y, m, d) = date.gregorian();
            assert_eq!(date, Date::from_gregorian(y, m, d), "jdn {jdn}");
        }
        // Negative JDNs too.
        for jdn in (-200000..0).step_by(9973) {
            let date = Date::from_jdn(jdn);
            let (y, m, d) = date.gregorian();
            assert_eq!(date, Date::from_gregorian(y, m, d), "jdn {jdn}");
        }
    }

    #[test]
    fn to_day_of_week() {
        let date = Date::from_gregorian(1970, 1, 1);
        assert_eq!(4, date.day_of_week());
        let date = Date::from_gregorian(2021, 9, 8);
        assert_eq!(3, date.day_of_week());
    }

    #[test]
    fn to_sexagenary() {
        let date = Date::from_gregorian(1970, 1, 1);
        assert_eq!(18, date.sexagenary());
        let date = Date::from_gregorian(2021, 9, 8);
        assert_eq!(56, date.sexagenary());
    }

    #[test]
    fn millis_split() {
        assert_eq!(
            (Date::from_gregorian(1970, 1, 1), 0),
            Date::from_millis(0)
        );
        assert_eq!(
            (Date::from_gregorian(1970, 1, 2), 1),
            Date::from_millis(DAY_MILLIS + 1)
        );
        assert_eq!(
            (Date::from_gregorian(1969, 12, 31), (DAY_MILLIS - 1) as i32),
            Date::from_millis(-1)
        );
    }

    #[test]
    fn iso_format() {
        assert_eq!(
            "2021-09-08",
            Date::from_gregorian(2021, 9, 8).iso_gregorian()
        );
    }
}

#[cfg(test)]
mod tests_priv {
    use super::*;

    #[test]
    fn priv_ordinal_day_number() {
        use YearType::*;
        assert_eq!(1, ordinal_day_number(1, 1, Common));
        assert_eq!(256, ordinal_day_number(9, 13, Common));
        assert_eq!(366, ordinal_day_number(12, 31, Leap));
    }

    #[test]
    fn priv_days_before_month() {
        assert_eq!(0, days_before_month(1, false));
        assert_eq!(59, days_before_month(3, false));
        assert_eq!(60, days_before_month(3, true));
        assert_eq!(335, days_before_month(12, false));
    }
}
