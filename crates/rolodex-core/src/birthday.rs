//! Upcoming-birthday window
//!
//! A birthday is upcoming when its month/day falls within
//! `[today, today + 7 days]`, whatever the birth year. The window is
//! enumerated day by day so month and year boundaries need no special
//! casing: 28 December yields keys through 4 January.

use chrono::{Datelike, Duration, NaiveDate};

/// Days after `today` still counted as upcoming
pub const UPCOMING_DAYS: i64 = 7;

/// Inclusive month/day range starting at a given date
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BirthdayWindow {
    start: NaiveDate,
    days: i64,
}

impl BirthdayWindow {
    /// The default window: `today` plus the following seven days
    pub fn upcoming(today: NaiveDate) -> Self {
        Self {
            start: today,
            days: UPCOMING_DAYS,
        }
    }

    pub fn end(&self) -> NaiveDate {
        self.start + Duration::days(self.days)
    }

    /// Month/day keys (`month * 100 + day`) covered by the window
    ///
    /// When the window contains 28 February of a non-leap year, 29 February
    /// is included as well so leap-day birthdays are not skipped.
    pub fn keys(&self) -> Vec<i32> {
        let mut keys = Vec::with_capacity(self.days as usize + 2);
        for offset in 0..=self.days {
            let date = self.start + Duration::days(offset);
            keys.push(month_day_key(date.month(), date.day()));
            if date.month() == 2 && date.day() == 28 && !is_leap_year(date.year()) {
                keys.push(month_day_key(2, 29));
            }
        }
        keys
    }

    /// Whether a birth date's anniversary falls inside the window
    pub fn contains(&self, date_of_birth: NaiveDate) -> bool {
        let key = month_day_key(date_of_birth.month(), date_of_birth.day());
        self.keys().contains(&key)
    }
}

/// Encode a month/day pair as a sortable integer, e.g. 1 Feb -> 201
pub fn month_day_key(month: u32, day: u32) -> i32 {
    (month * 100 + day) as i32
}

fn is_leap_year(year: i32) -> bool {
    NaiveDate::from_ymd_opt(year, 2, 29).is_some()
}
