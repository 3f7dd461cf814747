//! The calendar entity: field resolution, completion, and arithmetic.
//!
//! A [`Calendar`] pairs a [`CalendarSystem`] strategy with a mutable
//! [`FieldSet`] and an instant. At any moment at most one representation
//! is authoritative, tracked by two dirty flags; [`Calendar::complete`]
//! reconciles them explicitly, and `get`/`add`/`roll` invoke it at their
//! boundary.

use tracing::trace;

use crate::date::{DAY_MILLIS, Date};
use crate::error::{CalendarError, Result};
use crate::fields::{
    DATE_PRECEDENCE, DOW_PRECEDENCE, Field, FieldSet, MINIMUM_USER_STAMP, PrecedenceTable,
    UNSET, resolve_fields,
};

pub const SUNDAY: i32 = 1;
pub const MONDAY: i32 = 2;
pub const TUESDAY: i32 = 3;
pub const WEDNESDAY: i32 = 4;
pub const THURSDAY: i32 = 5;
pub const FRIDAY: i32 = 6;
pub const SATURDAY: i32 = 7;

const WEEK_MILLIS: i64 = 7 * DAY_MILLIS;

/// Day of week (1 = Sunday .. 7 = Saturday) of a Julian day number.
pub(crate) fn day_of_week(jdn: i32) -> i32 {
    (jdn + 1).rem_euclid(7) + 1
}

/// Source of time-zone offsets.
///
/// Returns the raw and daylight-saving offsets, in milliseconds, that are
/// added to a UTC instant to obtain local time. On the fields→time path
/// the probe instant is the local wall time; implementations with
/// transitions should resolve it by their own convention (the shipped
/// [`FixedZone`] is exact either way).
pub trait ZoneOffset: Send + Sync {
    fn offsets(&self, instant: i64) -> (i32, i32);
}

/// A zone with a constant offset and no daylight saving.
#[derive(Debug, Clone, Copy)]
pub struct FixedZone {
    offset_millis: i32,
}

impl FixedZone {
    pub fn utc() -> Self {
        Self { offset_millis: 0 }
    }
    pub fn new(offset_millis: i32) -> Self {
        Self { offset_millis }
    }
    pub fn from_hours(hours: i32) -> Self {
        Self {
            offset_millis: hours * 60 * 60 * 1000,
        }
    }
}

impl ZoneOffset for FixedZone {
    fn offsets(&self, _instant: i64) -> (i32, i32) {
        (self.offset_millis, 0)
    }
}

/// Gregorian reading of a day, precomputed once per field computation so
/// every strategy can anchor on it. `month` and `day_of_year` are
/// 1-based.
#[derive(Debug, Clone, Copy)]
pub struct GregorianDay {
    pub year: i32,
    pub month: i32,
    pub day_of_month: i32,
    pub day_of_year: i32,
}

pub(crate) fn gregorian_day(jdn: i32) -> GregorianDay {
    let (year, day_of_year, month, day_of_month) = Date::from_jdn(jdn).gregorian_year_doy();
    GregorianDay {
        year,
        month,
        day_of_month,
        day_of_year,
    }
}

/// A fully resolved calendar date, handed to strategies for month
/// arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedDate {
    pub extended_year: i32,
    /// 0-based month.
    pub month: i32,
    pub is_leap_month: bool,
    pub day_of_month: i32,
}

/// Inputs to the fields→JDN conversion.
pub struct ResolveContext<'a> {
    pub fields: &'a FieldSet,
    pub best_field: Field,
    pub first_day_of_week: i32,
    pub minimal_days_in_first_week: i32,
}

/// Outcome of a strategy's month add/roll hook.
pub enum MonthShift {
    /// No calendar-specific rule; the framework adjusts the month field
    /// and pins the day.
    Generic,
    /// Move to this date (the framework still pins the day).
    Date(ResolvedDate),
    /// Jump to this exact Julian day number.
    JulianDay(i32),
}

/// A calendar system: the per-calendar arithmetic behind a [`Calendar`].
///
/// Implementations are immutable apart from their private event caches,
/// so one instance can back any number of calendars.
pub trait CalendarSystem: Send + Sync {
    /// Identifier, e.g. `"gregorian"`.
    fn kind(&self) -> &'static str;

    /// JDN of the day before the first day of the given month
    /// (exclusive-boundary convention). `month` may lie outside the
    /// year; it normalizes into adjacent extended years. When
    /// `use_month` is false the first month of the year is meant.
    /// `leap_month` selects the leap month of that number where the
    /// calendar has leap months.
    fn month_start(
        &self,
        extended_year: i32,
        month: i32,
        use_month: bool,
        leap_month: bool,
    ) -> i32;

    /// Extended year implied by the currently set era/year fields.
    fn extended_year(&self, fields: &FieldSet) -> i32;

    /// Computes this calendar's fields for a day: era, year, extended
    /// year, month, day-of-month, day-of-year (and the leap-month flag
    /// where applicable). Week fields are derived by the framework.
    fn compute_fields(&self, jdn: i32, greg: &GregorianDay, fields: &mut FieldSet);

    /// Days in a month.
    fn month_length(&self, extended_year: i32, month: i32) -> i32 {
        self.month_start(extended_year, month + 1, true, false)
            - self.month_start(extended_year, month, true, false)
    }

    /// Days in a year.
    fn year_length(&self, extended_year: i32) -> i32 {
        self.month_start(extended_year + 1, 0, false, false)
            - self.month_start(extended_year, 0, false, false)
    }

    /// Months in a year (12, or 13 in lunisolar leap years).
    fn months_in_year(&self, _extended_year: i32) -> i32 {
        12
    }

    /// Largest valid day-of-month at a resolved date; `add`/`roll` pin
    /// the day to it.
    fn day_of_month_limit(&self, date: &ResolvedDate) -> i32 {
        self.month_length(date.extended_year, date.month)
    }

    /// Valid range of a field, for strict validation and roll wrapping.
    fn limits(&self, field: Field) -> (i32, i32) {
        default_limits(field)
    }

    /// Precedence table used to choose among set date fields.
    fn resolution_table(&self) -> PrecedenceTable {
        DATE_PRECEDENCE
    }

    /// Calendar-specific combination checks beyond per-field ranges.
    fn validate(&self, _fields: &FieldSet) -> Result<()> {
        Ok(())
    }

    /// Whether years in era 0 run backward in time (1 BC, 2 BC, ...).
    fn era0_years_backward(&self) -> bool {
        false
    }

    /// Resolves date fields to a JDN; returns the JDN and the extended
    /// year it was computed in. The default suits calendars whose month
    /// rule does not depend on the resulting day; the hybrid calendar
    /// overrides it to retry across its cutover.
    fn compute_julian_day(&self, ctx: &ResolveContext<'_>) -> (i32, i32) {
        let year = resolve_extended_year(self, ctx);
        let jdn = julian_day_from_parts(
            ctx,
            year,
            |y, m, um, lm| self.month_start(y, m, um, lm),
            |y, m| self.month_length(y, m),
        );
        (jdn, year)
    }

    /// Month arithmetic hook. `Generic` defers to the framework rule;
    /// calendars with leap months or skipped months override this.
    fn shift_months(
        &self,
        _date: &ResolvedDate,
        _jdn: i32,
        _amount: i32,
        _rolling: bool,
    ) -> MonthShift {
        MonthShift::Generic
    }
}

/// Framework-wide field ranges; strategies override per field.
pub(crate) fn default_limits(field: Field) -> (i32, i32) {
    match field {
        Field::Era => (0, 1),
        Field::Year | Field::ExtendedYear | Field::YearWoy => (-5_000_000, 5_000_000),
        Field::Month => (0, 11),
        Field::WeekOfYear => (1, 53),
        Field::WeekOfMonth => (0, 6),
        Field::DayOfMonth => (1, 31),
        Field::DayOfYear => (1, 366),
        Field::DayOfWeek | Field::DowLocal => (1, 7),
        Field::DayOfWeekInMonth => (-5, 5),
        Field::JulianDay => (-0x7F00_0000, 0x7F00_0000),
        Field::MillisInDay => (0, DAY_MILLIS as i32 - 1),
        Field::IsLeapMonth => (0, 0),
    }
}

/// Extended year to resolve in: the week-of-year path may pick the
/// year-of-week-of-year instead of the calendar year.
pub(crate) fn resolve_extended_year<S: CalendarSystem + ?Sized>(
    system: &S,
    ctx: &ResolveContext<'_>,
) -> i32 {
    if ctx.best_field == Field::WeekOfYear
        && ctx.fields.newer_field(Field::YearWoy, Field::Year) == Field::YearWoy
        && ctx.fields.is_set(Field::YearWoy)
    {
        ctx.fields.get(Field::YearWoy)
    } else {
        system.extended_year(ctx.fields)
    }
}

/// Generic fields→JDN conversion given the winning field and the month
/// boundary rule.
pub(crate) fn julian_day_from_parts(
    ctx: &ResolveContext<'_>,
    year: i32,
    month_start: impl Fn(i32, i32, bool, bool) -> i32,
    month_length: impl Fn(i32, i32) -> i32,
) -> i32 {
    let fields = ctx.fields;
    let best = ctx.best_field;
    let use_month = matches!(
        best,
        Field::DayOfMonth | Field::WeekOfMonth | Field::DayOfWeekInMonth
    );
    let month = if use_month {
        fields.get_or(Field::Month, 0)
    } else {
        0
    };
    let leap = use_month && fields.get_or(Field::IsLeapMonth, 0) != 0;
    let julian_day = month_start(year, month, use_month, leap);

    match best {
        Field::DayOfMonth => return julian_day + fields.get_or(Field::DayOfMonth, 1),
        Field::DayOfYear => return julian_day + fields.get(Field::DayOfYear),
        _ => {}
    }

    // 0-based localized weekday of day one of the month or year.
    let first = (day_of_week(julian_day + 1) - ctx.first_day_of_week).rem_euclid(7);

    let dow_local = match resolve_fields(fields, DOW_PRECEDENCE) {
        Some(Field::DayOfWeek) => fields.get(Field::DayOfWeek) - ctx.first_day_of_week,
        Some(Field::DowLocal) => fields.get(Field::DowLocal) - 1,
        _ => 0,
    }
    .rem_euclid(7);

    // First occurrence of the target weekday; may precede the period.
    let mut date = 1 - first + dow_local;
    if best == Field::DayOfWeekInMonth {
        if date < 1 {
            date += 7;
        }
        let dim = fields.get_or(Field::DayOfWeekInMonth, 1);
        if dim >= 0 {
            date += 7 * (dim - 1);
        } else {
            // Count back from the end of the month.
            let len = month_length(year, fields.get_or(Field::Month, 0));
            date += ((len - date) / 7 + dim + 1) * 7;
        }
    } else {
        if 7 - first < ctx.minimal_days_in_first_week {
            date += 7;
        }
        date += 7 * (fields.get(best) - 1);
    }
    julian_day + date
}

/// A date (and time-of-day) under one calendar system.
pub struct Calendar {
    system: Box<dyn CalendarSystem>,
    zone: Box<dyn ZoneOffset>,
    fields: FieldSet,
    time: i64,
    is_time_set: bool,
    are_fields_set: bool,
    next_stamp: u32,
    lenient: bool,
    first_day_of_week: i32,
    minimal_days_in_first_week: i32,
}

impl Calendar {
    /// Creates a calendar in UTC, positioned at the 1970 epoch.
    pub fn new(system: impl CalendarSystem + 'static) -> Self {
        Self::with_zone(system, FixedZone::utc())
    }

    pub fn with_zone(
        system: impl CalendarSystem + 'static,
        zone: impl ZoneOffset + 'static,
    ) -> Self {
        Self {
            system: Box::new(system),
            zone: Box::new(zone),
            fields: FieldSet::new(),
            time: 0,
            is_time_set: true,
            are_fields_set: false,
            next_stamp: MINIMUM_USER_STAMP,
            lenient: true,
            first_day_of_week: SUNDAY,
            minimal_days_in_first_week: 1,
        }
    }

    pub fn system(&self) -> &dyn CalendarSystem {
        self.system.as_ref()
    }

    /// In lenient mode (the default) out-of-range fields normalize
    /// arithmetically; in strict mode `complete` rejects them.
    pub fn set_lenient(&mut self, lenient: bool) {
        self.lenient = lenient;
    }
    pub fn is_lenient(&self) -> bool {
        self.lenient
    }

    pub fn set_first_day_of_week(&mut self, day: i32) {
        self.first_day_of_week = day.clamp(SUNDAY, SATURDAY);
        if self.is_time_set {
            self.are_fields_set = false;
        }
    }
    pub fn first_day_of_week(&self) -> i32 {
        self.first_day_of_week
    }

    pub fn set_minimal_days_in_first_week(&mut self, days: i32) {
        self.minimal_days_in_first_week = days.clamp(1, 7);
        if self.is_time_set {
            self.are_fields_set = false;
        }
    }
    pub fn minimal_days_in_first_week(&self) -> i32 {
        self.minimal_days_in_first_week
    }

    /// Sets a field. Marks both the instant and the other computed
    /// fields stale; nothing is validated until completion.
    pub fn set(&mut self, field: Field, value: i32) {
        self.next_stamp += 1;
        self.fields.set(field, value, self.next_stamp);
        self.is_time_set = false;
        self.are_fields_set = false;
    }

    /// Convenience: sets year, 0-based month, and day-of-month.
    pub fn set_ymd(&mut self, year: i32, month: i32, day: i32) {
        self.set(Field::Year, year);
        self.set(Field::Month, month);
        self.set(Field::DayOfMonth, day);
    }

    pub fn clear(&mut self, field: Field) {
        self.fields.clear(field);
        self.is_time_set = false;
        self.are_fields_set = false;
    }

    pub fn clear_all(&mut self) {
        self.fields.clear_all();
        self.next_stamp = MINIMUM_USER_STAMP;
        self.is_time_set = false;
        self.are_fields_set = false;
    }

    /// Positions the calendar at an epoch-millisecond instant.
    pub fn set_millis(&mut self, millis: i64) {
        self.time = millis;
        self.is_time_set = true;
        self.are_fields_set = false;
    }

    /// The instant, completing first if fields were set.
    pub fn millis(&mut self) -> Result<i64> {
        self.complete()?;
        Ok(self.time)
    }

    /// Reconciles the two representations: computes the instant from set
    /// fields and/or recomputes all fields from the instant. On error
    /// (strict mode) the field set is left untouched.
    pub fn complete(&mut self) -> Result<()> {
        if !self.is_time_set {
            self.compute_time()?;
        }
        if !self.are_fields_set {
            self.compute_fields();
        }
        Ok(())
    }

    /// Value of a field after completion.
    pub fn get(&mut self, field: Field) -> Result<i32> {
        self.complete()?;
        Ok(self.fields.get(field))
    }

    /// The Julian day number after completion.
    pub fn julian_day(&mut self) -> Result<i32> {
        self.get(Field::JulianDay)
    }

    pub fn set_julian_day(&mut self, jdn: i32) {
        self.set(Field::JulianDay, jdn);
    }

    // ------------------------------------------------------------------
    // time <-> fields

    fn compute_fields(&mut self) {
        let (raw, dst) = self.zone.offsets(self.time);
        let local = self.time + raw as i64 + dst as i64;
        let (date, millis_in_day) = Date::from_millis(local);
        let jdn = date.jdn();

        self.fields.clear_all();
        self.fields.set_internal(Field::JulianDay, jdn);
        let dow = day_of_week(jdn);
        self.fields.set_internal(Field::DayOfWeek, dow);
        self.fields
            .set_internal(Field::DowLocal, (dow - self.first_day_of_week).rem_euclid(7) + 1);

        let greg = gregorian_day(jdn);
        self.system.compute_fields(jdn, &greg, &mut self.fields);
        self.compute_week_fields();
        self.fields.set_internal(Field::MillisInDay, millis_in_day);
        self.are_fields_set = true;
    }

    /// Week-of-year (with its year), week-of-month, day-of-week-in-month,
    /// from the fields the strategy set.
    fn compute_week_fields(&mut self) {
        let eyear = self.fields.get(Field::ExtendedYear);
        let dow = self.fields.get(Field::DayOfWeek);
        let doy = self.fields.get(Field::DayOfYear);
        let mut year_woy = eyear;

        let rel_dow = (dow + 7 - self.first_day_of_week) % 7;
        let rel_dow_jan1 = (dow - doy + 7001 - self.first_day_of_week) % 7;

        let mut woy = (doy - 1 + rel_dow_jan1) / 7;
        if 7 - rel_dow_jan1 >= self.minimal_days_in_first_week {
            woy += 1;
        }

        if woy == 0 {
            // Belongs to the last week of the previous year.
            let prev_doy = doy + self.system.year_length(eyear - 1);
            woy = self.week_number(prev_doy, prev_doy, dow);
            year_woy -= 1;
        } else {
            let last_doy = self.system.year_length(eyear);
            if doy >= last_doy - 5 {
                let last_rel_dow = (rel_dow + last_doy - doy).rem_euclid(7);
                if 6 - last_rel_dow >= self.minimal_days_in_first_week
                    && doy + 7 - rel_dow > last_doy
                {
                    woy = 1;
                    year_woy += 1;
                }
            }
        }
        self.fields.set_internal(Field::WeekOfYear, woy);
        self.fields.set_internal(Field::YearWoy, year_woy);

        let dom = self.fields.get(Field::DayOfMonth);
        let wom = self.week_number(dom, dom, dow);
        self.fields.set_internal(Field::WeekOfMonth, wom);
        self.fields
            .set_internal(Field::DayOfWeekInMonth, (dom - 1) / 7 + 1);
    }

    /// Week number of `desired_day` within a period in which
    /// `day_of_period` falls on `dow`. Week 1 requires at least
    /// `minimal_days_in_first_week` days before the first week boundary.
    fn week_number(&self, desired_day: i32, day_of_period: i32, dow: i32) -> i32 {
        let period_start_dow =
            (dow - self.first_day_of_week - day_of_period + 1).rem_euclid(7);
        let mut week_no = (desired_day + period_start_dow - 1) / 7;
        if 7 - period_start_dow >= self.minimal_days_in_first_week {
            week_no += 1;
        }
        week_no
    }

    fn compute_time(&mut self) -> Result<()> {
        if !self.lenient {
            self.validate_fields()?;
        }
        let jd_stamp = self.fields.stamp(Field::JulianDay);
        let (jdn, eyear) = if jd_stamp >= MINIMUM_USER_STAMP
            && self.fields.newest_stamp(&Field::DATE_FIELDS, UNSET) <= jd_stamp
        {
            (self.fields.get(Field::JulianDay), None)
        } else {
            let best_field = resolve_fields(&self.fields, self.system.resolution_table())
                .unwrap_or(Field::DayOfMonth);
            let ctx = ResolveContext {
                fields: &self.fields,
                best_field,
                first_day_of_week: self.first_day_of_week,
                minimal_days_in_first_week: self.minimal_days_in_first_week,
            };
            let (jdn, eyear) = self.system.compute_julian_day(&ctx);
            (jdn, Some(eyear))
        };

        let millis_in_day = self.fields.get_or(Field::MillisInDay, 0);
        let wall = Date::from_jdn(jdn).millis_at_midnight() + millis_in_day as i64;
        let (raw, dst) = self.zone.offsets(wall);
        self.time = wall - raw as i64 - dst as i64;
        if let Some(eyear) = eyear {
            self.fields.set_internal(Field::ExtendedYear, eyear);
        }
        self.is_time_set = true;
        Ok(())
    }

    // ------------------------------------------------------------------
    // validation

    fn validate_fields(&self) -> Result<()> {
        for field in Field::ALL {
            if self.fields.stamp(field) >= MINIMUM_USER_STAMP {
                self.validate_field(field)?;
            }
        }
        self.system.validate(&self.fields)
    }

    fn validate_field(&self, field: Field) -> Result<()> {
        let value = self.fields.get(field);
        match field {
            Field::DayOfMonth => {
                let eyear = self.system.extended_year(&self.fields);
                let month = self.fields.get_or(Field::Month, 0);
                check_range(field, value, 1, self.system.month_length(eyear, month))
            }
            Field::DayOfYear => {
                let eyear = self.system.extended_year(&self.fields);
                check_range(field, value, 1, self.system.year_length(eyear))
            }
            Field::DayOfWeekInMonth => {
                if value == 0 {
                    return Err(CalendarError::InvalidFieldCombination(
                        "day-of-week-in-month cannot be 0",
                    ));
                }
                let (min, max) = self.system.limits(field);
                check_range(field, value, min, max)
            }
            _ => {
                let (min, max) = self.system.limits(field);
                check_range(field, value, min, max)
            }
        }
    }

    // ------------------------------------------------------------------
    // actual range queries

    /// Largest value `field` can take at the current date.
    pub fn actual_maximum(&mut self, field: Field) -> Result<i32> {
        self.complete()?;
        Ok(match field {
            Field::WeekOfYear => {
                let eyear = self.fields.get(Field::ExtendedYear);
                let year_len = self.system.year_length(eyear);
                let doy = self.fields.get(Field::DayOfYear);
                let dow = self.fields.get(Field::DayOfWeek);
                let last_dow = (dow - 1 + (year_len - doy)).rem_euclid(7) + 1;
                let count = self.week_number(year_len, year_len, last_dow);
                let last_rel = (last_dow + 7 - self.first_day_of_week) % 7;
                // A trailing partial week may belong to week 1 of the
                // next year.
                if 6 - last_rel >= self.minimal_days_in_first_week {
                    count - 1
                } else {
                    count
                }
            }
            Field::WeekOfMonth => {
                let len = self.field_ceiling(Field::DayOfMonth);
                let dom = self.fields.get(Field::DayOfMonth);
                let dow = self.fields.get(Field::DayOfWeek);
                let last_dow = (dow - 1 + (len - dom)).rem_euclid(7) + 1;
                self.week_number(len, len, last_dow)
            }
            Field::DayOfWeekInMonth => (self.field_ceiling(Field::DayOfMonth) + 6) / 7,
            _ => self.field_ceiling(field),
        })
    }

    /// Smallest value `field` can take at the current date.
    pub fn actual_minimum(&mut self, field: Field) -> Result<i32> {
        self.complete()?;
        Ok(self.field_floor(field))
    }

    /// Upper bound of `field` against the *currently set* fields, without
    /// completing. This is what pinning uses mid-arithmetic.
    fn field_ceiling(&self, field: Field) -> i32 {
        match field {
            Field::DayOfMonth => {
                let date = ResolvedDate {
                    extended_year: self.system.extended_year(&self.fields),
                    month: self.fields.get_or(Field::Month, 0),
                    is_leap_month: self.fields.get_or(Field::IsLeapMonth, 0) != 0,
                    day_of_month: 1,
                };
                self.system.day_of_month_limit(&date)
            }
            Field::DayOfYear => {
                let eyear = self.system.extended_year(&self.fields);
                self.system.year_length(eyear)
            }
            Field::Month => {
                let eyear = self.system.extended_year(&self.fields);
                self.system.months_in_year(eyear) - 1
            }
            _ => self.system.limits(field).1,
        }
    }

    fn field_floor(&self, field: Field) -> i32 {
        self.system.limits(field).0
    }

    /// Clamps a field into its actual range at the current date.
    fn pin_field(&mut self, field: Field) {
        let min = self.field_floor(field);
        let max = self.field_ceiling(field);
        let value = self.fields.get(field);
        if value < min {
            self.set(field, min);
        } else if value > max {
            self.set(field, max);
        }
    }

    fn resolved_date(&self) -> ResolvedDate {
        ResolvedDate {
            extended_year: self.fields.get(Field::ExtendedYear),
            month: self.fields.get(Field::Month),
            is_leap_month: self.fields.get(Field::IsLeapMonth) != 0,
            day_of_month: self.fields.get(Field::DayOfMonth),
        }
    }

    fn apply_resolved(&mut self, date: &ResolvedDate) {
        self.set(Field::ExtendedYear, date.extended_year);
        self.set(Field::Month, date.month);
        self.set(Field::IsLeapMonth, date.is_leap_month as i32);
        self.set(Field::DayOfMonth, date.day_of_month);
    }

    // ------------------------------------------------------------------
    // add

    /// Adds a signed amount to a field, letting larger fields carry.
    /// Smaller fields pin where the target month is shorter; day and
    /// week amounts preserve the wall time across offset changes.
    pub fn add(&mut self, field: Field, amount: i32) -> Result<()> {
        if amount == 0 {
            return Ok(());
        }
        self.complete()?;

        match field {
            Field::Era => {
                let value = self.fields.get(Field::Era) + amount;
                self.set(Field::Era, value);
                self.pin_field(Field::Era);
                Ok(())
            }
            Field::Year | Field::YearWoy | Field::ExtendedYear | Field::Month => {
                let adjusted = if matches!(field, Field::Year | Field::YearWoy)
                    && self.fields.get(Field::Era) == 0
                    && self.system.era0_years_backward()
                {
                    -amount
                } else {
                    amount
                };
                let was_lenient = self.lenient;
                self.lenient = true;
                if field == Field::Month {
                    self.shift_month_field(adjusted, false);
                } else {
                    let value = self.fields.get(field) + adjusted;
                    self.set(field, value);
                    self.pin_field(Field::DayOfMonth);
                }
                let result = if was_lenient { Ok(()) } else { self.complete() };
                self.lenient = was_lenient;
                result
            }
            Field::WeekOfYear | Field::WeekOfMonth | Field::DayOfWeekInMonth => {
                self.add_millis(amount as i64 * WEEK_MILLIS, true)
            }
            Field::DayOfMonth
            | Field::DayOfYear
            | Field::DayOfWeek
            | Field::DowLocal
            | Field::JulianDay => self.add_millis(amount as i64 * DAY_MILLIS, true),
            Field::MillisInDay => self.add_millis(amount as i64, false),
            Field::IsLeapMonth => Err(CalendarError::UnsupportedField {
                field,
                operation: "add",
            }),
        }
    }

    fn shift_month_field(&mut self, amount: i32, rolling: bool) {
        let date = self.resolved_date();
        let jdn = self.fields.get(Field::JulianDay);
        match self.system.shift_months(&date, jdn, amount, rolling) {
            MonthShift::Generic => {
                let month = if rolling {
                    let n = self.system.months_in_year(date.extended_year);
                    (date.month + amount).rem_euclid(n)
                } else {
                    date.month + amount
                };
                self.set(Field::Month, month);
                self.pin_field(Field::DayOfMonth);
            }
            MonthShift::Date(new_date) => {
                self.apply_resolved(&new_date);
                self.pin_field(Field::DayOfMonth);
            }
            MonthShift::JulianDay(jdn) => {
                self.set(Field::JulianDay, jdn);
            }
        }
    }

    /// Shifts the instant, optionally re-aligning so the wall time is
    /// unchanged when the zone offset differs at the target.
    fn add_millis(&mut self, delta: i64, keep_wall_time: bool) -> Result<()> {
        let (raw, dst) = self.zone.offsets(self.time);
        let prev_offset = raw as i64 + dst as i64;
        self.set_millis(self.time + delta);
        if keep_wall_time {
            let (raw, dst) = self.zone.offsets(self.time);
            let new_offset = raw as i64 + dst as i64;
            if new_offset != prev_offset {
                self.set_millis(self.time + (prev_offset - new_offset));
            }
        }
        self.complete()
    }

    // ------------------------------------------------------------------
    // roll

    /// Adds a signed amount to a field without changing larger fields,
    /// wrapping around within the field's actual range.
    pub fn roll(&mut self, field: Field, amount: i32) -> Result<()> {
        if amount == 0 {
            return Ok(());
        }
        self.complete()?;

        match field {
            Field::DayOfMonth | Field::Era | Field::MillisInDay => {
                let min = self.field_floor(field);
                let max = self.field_ceiling(field);
                let gap = max - min + 1;
                let value = min + (self.fields.get(field) + amount - min).rem_euclid(gap);
                self.set(field, value);
                Ok(())
            }
            Field::Month => {
                self.shift_month_field(amount, true);
                self.complete()
            }
            Field::Year | Field::YearWoy => {
                let era = self.fields.get(Field::Era);
                let backwards = era == 0 && self.system.era0_years_backward();
                let adjusted = if backwards { -amount } else { amount };
                let mut new_year = self.fields.get(field) + adjusted;
                if era > 0 || new_year >= 1 {
                    let max_year = self.system.limits(Field::Year).1;
                    if max_year < 32768 {
                        // A genuinely bounded year-in-era: wrap.
                        if new_year < 1 {
                            new_year = max_year - (-new_year) % max_year;
                        } else if new_year > max_year {
                            new_year = (new_year - 1) % max_year + 1;
                        }
                    } else if new_year < 1 {
                        new_year = 1;
                    }
                } else if backwards {
                    new_year = 1;
                }
                self.set(field, new_year);
                self.pin_field(Field::Month);
                self.pin_field(Field::DayOfMonth);
                Ok(())
            }
            Field::ExtendedYear => {
                let value = self.fields.get(field) + amount;
                self.set(field, value);
                self.pin_field(Field::Month);
                self.pin_field(Field::DayOfMonth);
                Ok(())
            }
            Field::WeekOfMonth => {
                // Fill the month out to whole weeks, roll inside the
                // block, then pin phantom days to the real month ends.
                let dow =
                    (self.fields.get(Field::DayOfWeek) - self.first_day_of_week).rem_euclid(7);
                let dom = self.fields.get(Field::DayOfMonth);
                let fdm = (dow - dom + 1).rem_euclid(7);
                let start = if 7 - fdm < self.minimal_days_in_first_week {
                    8 - fdm
                } else {
                    1 - fdm
                };
                let month_len = self.field_ceiling(Field::DayOfMonth);
                let ldm = (month_len - dom + dow) % 7;
                let limit = month_len + 7 - ldm;
                let gap = limit - start;
                let day = (start + (dom + amount * 7 - start).rem_euclid(gap)).clamp(1, month_len);
                self.set(Field::DayOfMonth, day);
                Ok(())
            }
            Field::WeekOfYear => {
                let dow =
                    (self.fields.get(Field::DayOfWeek) - self.first_day_of_week).rem_euclid(7);
                let doy = self.fields.get(Field::DayOfYear);
                let fdy = (dow - doy + 1).rem_euclid(7);
                let start = if 7 - fdy < self.minimal_days_in_first_week {
                    8 - fdy
                } else {
                    1 - fdy
                };
                let year_len = self.field_ceiling(Field::DayOfYear);
                let ldy = (year_len - doy + dow) % 7;
                let limit = year_len + 7 - ldy;
                let gap = limit - start;
                let day = (start + (doy + amount * 7 - start).rem_euclid(gap)).clamp(1, year_len);
                self.set(Field::DayOfYear, day);
                self.clear(Field::Month);
                Ok(())
            }
            Field::DayOfYear => {
                let year_len = self.field_ceiling(Field::DayOfYear) as i64;
                let start = self.time
                    - (self.fields.get(Field::DayOfYear) as i64 - 1) * DAY_MILLIS;
                let rolled =
                    (self.time + amount as i64 * DAY_MILLIS - start).rem_euclid(year_len * DAY_MILLIS);
                self.set_millis(start + rolled);
                self.complete()
            }
            Field::DayOfWeek | Field::DowLocal => {
                let lead = (self.fields.get(field)
                    - if field == Field::DayOfWeek {
                        self.first_day_of_week
                    } else {
                        1
                    })
                .rem_euclid(7);
                let start = self.time - lead as i64 * DAY_MILLIS;
                let rolled =
                    (self.time + amount as i64 * DAY_MILLIS - start).rem_euclid(WEEK_MILLIS);
                self.set_millis(start + rolled);
                self.complete()
            }
            Field::DayOfWeekInMonth => {
                let dom = self.fields.get(Field::DayOfMonth);
                let pre_weeks = (dom - 1) / 7;
                let post_weeks = (self.field_ceiling(Field::DayOfMonth) - dom) / 7;
                let start = self.time - pre_weeks as i64 * WEEK_MILLIS;
                let gap = WEEK_MILLIS * (pre_weeks + post_weeks + 1) as i64;
                let rolled = (self.time + amount as i64 * WEEK_MILLIS - start).rem_euclid(gap);
                self.set_millis(start + rolled);
                self.complete()
            }
            Field::JulianDay => {
                let value = self.fields.get(field) + amount;
                self.set(field, value);
                Ok(())
            }
            Field::IsLeapMonth => Err(CalendarError::UnsupportedField {
                field,
                operation: "roll",
            }),
        }
    }
}

fn check_range(field: Field, value: i32, min: i32, max: i32) -> Result<()> {
    if value < min || value > max {
        trace!(?field, value, min, max, "field validation failed");
        return Err(CalendarError::FieldOutOfRange {
            field,
            value,
            min,
            max,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::date::EPOCH_JDN;
    use crate::gregorian::{BC, Gregorian};

    fn gregorian() -> Calendar {
        Calendar::new(Gregorian::new())
    }

    #[test]
    fn starts_at_the_epoch() {
        let mut cal = gregorian();
        assert_eq!(Ok(EPOCH_JDN), cal.julian_day());
        assert_eq!(Ok(1970), cal.get(Field::Year));
        assert_eq!(Ok(0), cal.get(Field::Month));
        assert_eq!(Ok(1), cal.get(Field::DayOfMonth));
        assert_eq!(Ok(THURSDAY), cal.get(Field::DayOfWeek));
    }

    #[test]
    fn fields_to_julian_day() {
        let mut cal = gregorian();
        cal.set_ymd(2000, 0, 1);
        assert_eq!(Ok(2451545), cal.julian_day());
        assert_eq!(Ok(0), cal.millis());
        // Time of day rides along.
        cal.set(Field::MillisInDay, 3_600_000);
        assert_eq!(Ok(3_600_000), cal.millis());
    }

    #[test]
    fn julian_day_to_fields_across_the_cutover() {
        let mut cal = gregorian();
        cal.set_julian_day(2_299_160);
        assert_eq!(Ok(1582), cal.get(Field::Year));
        assert_eq!(Ok(9), cal.get(Field::Month));
        assert_eq!(Ok(4), cal.get(Field::DayOfMonth));

        cal.set_julian_day(2_299_161);
        assert_eq!(Ok(15), cal.get(Field::DayOfMonth));
        assert_eq!(Ok(288), cal.get(Field::DayOfYear));
    }

    #[test]
    fn lenient_overflow_normalizes() {
        let mut cal = gregorian();
        cal.set_ymd(2000, 0, 32); // Jan 32
        assert_eq!(Ok(1), cal.get(Field::Month));
        assert_eq!(Ok(1), cal.get(Field::DayOfMonth));
    }

    #[test]
    fn strict_mode_rejects_overflow() {
        let mut cal = gregorian();
        cal.set_lenient(false);
        cal.set_ymd(2001, 3, 31); // Apr 31
        assert_eq!(
            Err(CalendarError::FieldOutOfRange {
                field: Field::DayOfMonth,
                value: 31,
                min: 1,
                max: 30,
            }),
            cal.complete()
        );
        // The fields survive the error; relaxing succeeds.
        cal.set_lenient(true);
        assert_eq!(Ok(4), cal.get(Field::Month));
    }

    #[test]
    fn add_month_pins_the_day() {
        let mut cal = gregorian();
        cal.set_ymd(2000, 0, 31);
        cal.add(Field::Month, 1).unwrap();
        assert_eq!(Ok(29), cal.get(Field::DayOfMonth)); // leap Feb
        cal.add(Field::Month, 12).unwrap();
        assert_eq!(Ok(28), cal.get(Field::DayOfMonth));
        assert_eq!(Ok(2001), cal.get(Field::Year));
    }

    #[test]
    fn add_year_in_bc_runs_backward() {
        let mut cal = gregorian();
        cal.set(Field::Era, BC);
        cal.set_ymd(5, 2, 15); // 5 BC
        let before = cal.julian_day().unwrap();
        cal.add(Field::Year, 1).unwrap();
        // One year later in time is 4 BC.
        assert_eq!(Ok(4), cal.get(Field::Year));
        assert!(cal.julian_day().unwrap() > before);
    }

    #[test]
    fn add_day_crosses_month_and_year() {
        let mut cal = gregorian();
        cal.set_ymd(1999, 11, 31);
        cal.add(Field::DayOfMonth, 1).unwrap();
        assert_eq!(Ok(2000), cal.get(Field::Year));
        assert_eq!(Ok(0), cal.get(Field::Month));
        assert_eq!(Ok(1), cal.get(Field::DayOfMonth));
    }

    #[test]
    fn roll_month_wraps_within_the_year() {
        let mut cal = gregorian();
        cal.set_ymd(1999, 11, 6); // Dec 6
        cal.roll(Field::Month, 1).unwrap();
        assert_eq!(Ok(0), cal.get(Field::Month));
        assert_eq!(Ok(1999), cal.get(Field::Year));
        cal.roll(Field::Month, -1).unwrap();
        assert_eq!(Ok(11), cal.get(Field::Month));
    }

    #[test]
    fn roll_day_of_month_wraps_within_the_month() {
        let mut cal = gregorian();
        cal.set_ymd(2000, 1, 29);
        cal.roll(Field::DayOfMonth, 1).unwrap();
        assert_eq!(Ok(1), cal.get(Field::DayOfMonth));
        assert_eq!(Ok(1), cal.get(Field::Month));
    }

    #[test]
    fn roll_day_of_week_stays_in_the_week() {
        let mut cal = gregorian();
        cal.set_ymd(2021, 8, 8); // Wednesday 2021-09-08
        assert_eq!(Ok(WEDNESDAY), cal.get(Field::DayOfWeek));
        cal.roll(Field::DayOfWeek, 4).unwrap();
        // Wraps past Saturday into the same Sunday-first week.
        assert_eq!(Ok(SUNDAY), cal.get(Field::DayOfWeek));
        assert_eq!(Ok(5), cal.get(Field::DayOfMonth));
    }

    #[test]
    fn week_of_year_resolution() {
        let mut cal = gregorian();
        cal.set(Field::YearWoy, 1999);
        cal.set(Field::WeekOfYear, 1);
        cal.set(Field::DayOfWeek, FRIDAY);
        assert_eq!(Ok(Date::from_gregorian(1999, 1, 1).jdn()), cal.julian_day());
    }

    #[test]
    fn week_fields_at_a_year_boundary() {
        let mut cal = gregorian();
        cal.set_minimal_days_in_first_week(4); // ISO-like rule
        // 1999-01-01 is a Friday: fewer than 4 days in its first week.
        cal.set_julian_day(Date::from_gregorian(1999, 1, 1).jdn());
        assert_eq!(Ok(52), cal.get(Field::WeekOfYear));
        assert_eq!(Ok(1998), cal.get(Field::YearWoy));
        assert_eq!(Ok(1999), cal.get(Field::Year));
    }

    #[test]
    fn actual_maximum_follows_the_date() {
        let mut cal = gregorian();
        cal.set_ymd(2000, 1, 1);
        assert_eq!(Ok(29), cal.actual_maximum(Field::DayOfMonth));
        assert_eq!(Ok(366), cal.actual_maximum(Field::DayOfYear));
        cal.set_ymd(1999, 1, 1);
        assert_eq!(Ok(28), cal.actual_maximum(Field::DayOfMonth));
        assert_eq!(Ok(4), cal.actual_maximum(Field::DayOfWeekInMonth));
    }

    #[test]
    fn zone_offset_shifts_the_instant() {
        let mut cal = Calendar::with_zone(Gregorian::new(), FixedZone::from_hours(8));
        cal.set_ymd(1970, 0, 1);
        // Midnight in GMT+8 is 16:00 the previous day in UTC.
        assert_eq!(Ok(-8 * 3_600_000), cal.millis());
        // And reading back the instant restores the local fields.
        cal.set_millis(-8 * 3_600_000);
        assert_eq!(Ok(1), cal.get(Field::DayOfMonth));
        assert_eq!(Ok(0), cal.get(Field::MillisInDay));
    }

    #[test]
    fn user_julian_day_outranks_older_fields() {
        let mut cal = gregorian();
        cal.set_ymd(2000, 0, 1);
        cal.set_julian_day(EPOCH_JDN);
        assert_eq!(Ok(1970), cal.get(Field::Year));
        // Setting a date field afterwards shifts the balance back.
        cal.set(Field::DayOfMonth, 15);
        assert_eq!(Ok(15), cal.get(Field::DayOfMonth));
        assert_eq!(Ok(1970), cal.get(Field::Year));
    }

    #[test]
    fn day_of_week_in_month_resolution() {
        let mut cal = gregorian();
        cal.set(Field::Year, 2021);
        cal.set(Field::Month, 8);
        cal.set(Field::DayOfWeekInMonth, 2);
        cal.set(Field::DayOfWeek, WEDNESDAY);
        // Second Wednesday of September 2021.
        assert_eq!(Ok(Date::from_gregorian(2021, 9, 8).jdn()), cal.julian_day());
        // Negative counts from the end of the month.
        cal.clear_all();
        cal.set(Field::Year, 2021);
        cal.set(Field::Month, 8);
        cal.set(Field::DayOfWeekInMonth, -1);
        cal.set(Field::DayOfWeek, WEDNESDAY);
        assert_eq!(Ok(Date::from_gregorian(2021, 9, 29).jdn()), cal.julian_day());
    }
}
