//! Calendar fields, generation stamps, and precedence resolution.

/// A calendar field.
///
/// `DayOfWeek` uses 1 = Sunday through 7 = Saturday (the week-handling
/// algorithms wrap relative to a configurable first day of week);
/// `DowLocal` is the same day renumbered so the configured first day of
/// the week is 1. `Month` is 0-based. `YearWoy` is the year that the
/// week-of-year belongs to, which differs from `Year` at year boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Era,
    Year,
    Month,
    WeekOfYear,
    WeekOfMonth,
    DayOfMonth,
    DayOfYear,
    DayOfWeek,
    DayOfWeekInMonth,
    DowLocal,
    ExtendedYear,
    JulianDay,
    MillisInDay,
    IsLeapMonth,
    YearWoy,
}

impl Field {
    /// Number of fields.
    pub const COUNT: usize = 15;

    /// All fields, in slot order.
    pub const ALL: [Field; Self::COUNT] = [
        Field::Era,
        Field::Year,
        Field::Month,
        Field::WeekOfYear,
        Field::WeekOfMonth,
        Field::DayOfMonth,
        Field::DayOfYear,
        Field::DayOfWeek,
        Field::DayOfWeekInMonth,
        Field::DowLocal,
        Field::ExtendedYear,
        Field::JulianDay,
        Field::MillisInDay,
        Field::IsLeapMonth,
        Field::YearWoy,
    ];

    /// Date fields: the fields that participate in choosing the day.
    /// Used to decide whether a user-set `JulianDay` wins resolution.
    pub const DATE_FIELDS: [Field; 12] = [
        Field::Era,
        Field::Year,
        Field::Month,
        Field::WeekOfYear,
        Field::WeekOfMonth,
        Field::DayOfMonth,
        Field::DayOfYear,
        Field::DayOfWeek,
        Field::DayOfWeekInMonth,
        Field::DowLocal,
        Field::ExtendedYear,
        Field::YearWoy,
    ];

    fn index(self) -> usize {
        match self {
            Field::Era => 0,
            Field::Year => 1,
            Field::Month => 2,
            Field::WeekOfYear => 3,
            Field::WeekOfMonth => 4,
            Field::DayOfMonth => 5,
            Field::DayOfYear => 6,
            Field::DayOfWeek => 7,
            Field::DayOfWeekInMonth => 8,
            Field::DowLocal => 9,
            Field::ExtendedYear => 10,
            Field::JulianDay => 11,
            Field::MillisInDay => 12,
            Field::IsLeapMonth => 13,
            Field::YearWoy => 14,
        }
    }
}

/// Stamp of a field that has never been set.
pub const UNSET: u32 = 0;
/// Stamp of a field computed from the time value.
pub const INTERNALLY_SET: u32 = 1;
/// Smallest stamp a user `set` can carry.
pub const MINIMUM_USER_STAMP: u32 = 2;

/// Field values plus their generation stamps.
///
/// A stamp records *when* a field was last set relative to the others;
/// resolution prefers the combination containing the newest stamp.
#[derive(Debug, Clone)]
pub struct FieldSet {
    values: [i32; Field::COUNT],
    stamps: [u32; Field::COUNT],
}

impl Default for FieldSet {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldSet {
    pub fn new() -> Self {
        Self {
            values: [0; Field::COUNT],
            stamps: [UNSET; Field::COUNT],
        }
    }

    /// Value of `field`; 0 when unset.
    pub fn get(&self, field: Field) -> i32 {
        self.values[field.index()]
    }

    /// Value of `field`, or `default` when unset.
    pub fn get_or(&self, field: Field, default: i32) -> i32 {
        if self.is_set(field) {
            self.values[field.index()]
        } else {
            default
        }
    }

    pub fn stamp(&self, field: Field) -> u32 {
        self.stamps[field.index()]
    }

    pub fn is_set(&self, field: Field) -> bool {
        self.stamps[field.index()] != UNSET
    }

    pub fn set(&mut self, field: Field, value: i32, stamp: u32) {
        self.values[field.index()] = value;
        self.stamps[field.index()] = stamp;
    }

    /// Sets a field as computed output rather than user input.
    pub fn set_internal(&mut self, field: Field, value: i32) {
        self.set(field, value, INTERNALLY_SET);
    }

    pub fn clear(&mut self, field: Field) {
        self.values[field.index()] = 0;
        self.stamps[field.index()] = UNSET;
    }

    pub fn clear_all(&mut self) {
        self.values = [0; Field::COUNT];
        self.stamps = [UNSET; Field::COUNT];
    }

    /// Largest stamp among `fields`, at least `floor`.
    pub fn newest_stamp(&self, fields: &[Field], floor: u32) -> u32 {
        fields
            .iter()
            .map(|&f| self.stamp(f))
            .fold(floor, u32::max)
    }

    /// Of two alternate fields, the one set more recently; ties go to
    /// `default`.
    pub fn newer_field(&self, default: Field, alternate: Field) -> Field {
        if self.stamp(alternate) > self.stamp(default) {
            alternate
        } else {
            default
        }
    }
}

/// One line of a precedence table: a combination of fields that together
/// determine the date. If `remap` is present, a line whose fields win is
/// reported as `remap` instead of its first field.
#[derive(Debug, Clone, Copy)]
pub struct ResolveLine {
    pub remap: Option<Field>,
    pub fields: &'static [Field],
}

impl ResolveLine {
    pub(crate) const fn of(fields: &'static [Field]) -> Self {
        Self { remap: None, fields }
    }
    pub(crate) const fn remapped(remap: Field, fields: &'static [Field]) -> Self {
        Self {
            remap: Some(remap),
            fields,
        }
    }
}

/// Groups of resolve lines. Groups are considered in order; within a
/// group the line with the newest stamp wins.
pub type PrecedenceTable = &'static [&'static [ResolveLine]];

/// Default precedence for choosing how the day within the year is
/// specified.
pub const DATE_PRECEDENCE: PrecedenceTable = &[
    &[
        ResolveLine::of(&[Field::DayOfMonth]),
        ResolveLine::of(&[Field::WeekOfYear, Field::DayOfWeek]),
        ResolveLine::of(&[Field::WeekOfMonth, Field::DayOfWeek]),
        ResolveLine::of(&[Field::DayOfWeekInMonth, Field::DayOfWeek]),
        ResolveLine::of(&[Field::WeekOfYear, Field::DowLocal]),
        ResolveLine::of(&[Field::WeekOfMonth, Field::DowLocal]),
        ResolveLine::of(&[Field::DayOfWeekInMonth, Field::DowLocal]),
        ResolveLine::of(&[Field::DayOfYear]),
        ResolveLine::remapped(Field::DayOfMonth, &[Field::Year]),
        ResolveLine::remapped(Field::WeekOfYear, &[Field::YearWoy]),
    ],
    &[
        ResolveLine::of(&[Field::WeekOfYear]),
        ResolveLine::of(&[Field::WeekOfMonth]),
        ResolveLine::of(&[Field::DayOfWeekInMonth]),
        ResolveLine::remapped(Field::DayOfWeekInMonth, &[Field::DayOfWeek]),
        ResolveLine::remapped(Field::DayOfWeekInMonth, &[Field::DowLocal]),
    ],
];

/// Precedence for choosing between the two day-of-week numberings.
pub const DOW_PRECEDENCE: PrecedenceTable = &[&[
    ResolveLine::of(&[Field::DayOfWeek]),
    ResolveLine::of(&[Field::DowLocal]),
]];

/// Picks the winning field of a precedence table given the current
/// stamps. Returns `None` when no line has all its fields set.
pub fn resolve_fields(fields: &FieldSet, table: PrecedenceTable) -> Option<Field> {
    let mut best: Option<Field> = None;
    for group in table {
        let mut best_stamp = UNSET;
        'line: for line in *group {
            // Skip lines with any unset field.
            for &f in line.fields {
                if !fields.is_set(f) {
                    continue 'line;
                }
            }
            let line_stamp = fields.newest_stamp(line.fields, UNSET);
            if line_stamp > best_stamp {
                let candidate = match line.remap {
                    // A remap to day-of-month must not displace a newer
                    // week-of-month; the year alone doesn't outrank it.
                    Some(Field::DayOfMonth)
                        if fields.stamp(Field::WeekOfMonth)
                            >= fields.stamp(Field::DayOfMonth) =>
                    {
                        continue;
                    }
                    Some(f) => f,
                    None => line.fields[0],
                };
                best = Some(candidate);
                best_stamp = line_stamp;
            }
        }
        if best.is_some() {
            break;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_set(fs: &mut FieldSet, stamp: &mut u32, field: Field, value: i32) {
        *stamp += 1;
        fs.set(field, value, *stamp);
    }

    #[test]
    fn stamps_track_recency() {
        let mut fs = FieldSet::new();
        let mut stamp = MINIMUM_USER_STAMP;
        user_set(&mut fs, &mut stamp, Field::Year, 2000);
        user_set(&mut fs, &mut stamp, Field::ExtendedYear, 1999);
        assert_eq!(Field::ExtendedYear, fs.newer_field(Field::Year, Field::ExtendedYear));
        user_set(&mut fs, &mut stamp, Field::Year, 2001);
        assert_eq!(Field::Year, fs.newer_field(Field::Year, Field::ExtendedYear));
    }

    #[test]
    fn day_of_month_wins_by_default() {
        let mut fs = FieldSet::new();
        let mut stamp = MINIMUM_USER_STAMP;
        user_set(&mut fs, &mut stamp, Field::Year, 2000);
        user_set(&mut fs, &mut stamp, Field::Month, 5);
        user_set(&mut fs, &mut stamp, Field::DayOfMonth, 17);
        assert_eq!(Some(Field::DayOfMonth), resolve_fields(&fs, DATE_PRECEDENCE));
    }

    #[test]
    fn newer_week_combination_wins() {
        let mut fs = FieldSet::new();
        let mut stamp = MINIMUM_USER_STAMP;
        user_set(&mut fs, &mut stamp, Field::DayOfMonth, 17);
        user_set(&mut fs, &mut stamp, Field::WeekOfYear, 10);
        user_set(&mut fs, &mut stamp, Field::DayOfWeek, 3);
        assert_eq!(Some(Field::WeekOfYear), resolve_fields(&fs, DATE_PRECEDENCE));
    }

    #[test]
    fn lone_year_defers_to_caller_default() {
        // Nothing but the year: no line matches, the caller supplies the
        // day-of-month default.
        let mut fs = FieldSet::new();
        let mut stamp = MINIMUM_USER_STAMP;
        user_set(&mut fs, &mut stamp, Field::Year, 2000);
        assert_eq!(None, resolve_fields(&fs, DATE_PRECEDENCE));
    }

    #[test]
    fn year_over_internal_fields_keeps_day_of_month() {
        // After a completed computation all fields carry internal stamps;
        // setting just the year then resolves through the day-of-month.
        let mut fs = FieldSet::new();
        for f in Field::ALL {
            fs.set_internal(f, 1);
        }
        fs.set(Field::Year, 2000, MINIMUM_USER_STAMP);
        assert_eq!(Some(Field::DayOfMonth), resolve_fields(&fs, DATE_PRECEDENCE));
    }

    #[test]
    fn nothing_set_resolves_to_none() {
        let fs = FieldSet::new();
        assert_eq!(None, resolve_fields(&fs, DATE_PRECEDENCE));
    }

    #[test]
    fn incomplete_week_combination_falls_through() {
        let mut fs = FieldSet::new();
        let mut stamp = MINIMUM_USER_STAMP;
        // Week-of-year without a day-of-week only matches in the second
        // group.
        user_set(&mut fs, &mut stamp, Field::WeekOfYear, 10);
        assert_eq!(Some(Field::WeekOfYear), resolve_fields(&fs, DATE_PRECEDENCE));
    }
}
