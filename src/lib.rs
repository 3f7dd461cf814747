//! Calendrical computation across calendar systems.
//!
//! A [`Calendar`] holds a set of stamped fields (year, month, week and
//! day numbers, time of day) and an epoch-millisecond instant, keeping
//! the two reconciled through an explicit [`Calendar::complete`] step.
//! The per-calendar arithmetic lives behind the [`CalendarSystem`]
//! trait; shipped systems cover the hybrid Gregorian/Julian calendar
//! (with a configurable cutover), the Hebrew calendar, four reckonings
//! of the Islamic calendar, the Chinese lunisolar calendar, and the
//! Coptic and Ethiopic calendars.
//!
//! # Examples
//!
//! Plain day conversions with [`Date`]:
//!
//! ```
//! use kalendaro::Date;
//!
//! let date = Date::from_gregorian(2000, 1, 1);
//!
//! assert_eq!(6, date.day_of_week()); // Saturday
//! assert_eq!(2451545, date.jdn());
//! ```
//!
//! Field arithmetic under a calendar system:
//!
//! ```
//! use kalendaro::{Calendar, Field, Hebrew};
//!
//! let mut cal = Calendar::new(Hebrew::new());
//! cal.set_ymd(5758, 0, 1); // 1 Tishri 5758
//! assert_eq!(Ok(2450724), cal.julian_day()); // 1997-10-02
//!
//! cal.add(Field::Month, 2).unwrap();
//! assert_eq!(Ok(2), cal.get(Field::Month));
//! ```
//!
//! Converting a day between systems goes through the Julian day number:
//!
//! ```
//! use kalendaro::{Calendar, Chinese, Date, Field};
//!
//! let mut cal = Calendar::new(Chinese::new());
//! cal.set_julian_day(Date::from_gregorian(2000, 1, 1).jdn());
//! assert_eq!(Ok(25), cal.get(Field::DayOfMonth));
//! ```

pub mod astro;
mod cache;
pub mod calendar;
pub mod chinese;
pub mod coptic;
pub mod date;
pub mod error;
pub mod fields;
pub mod gregorian;
pub mod hebrew;
pub mod islamic;

pub use calendar::{Calendar, CalendarSystem, FixedZone, MonthShift, ResolvedDate, ZoneOffset};
pub use chinese::Chinese;
pub use coptic::{Coptic, Ethiopic};
pub use date::{Date, YearType};
pub use error::{CalendarError, Result};
pub use fields::{Field, FieldSet};
pub use gregorian::Gregorian;
pub use hebrew::Hebrew;
pub use islamic::{Islamic, IslamicVariant};
