//! Gap-free calendars of daily dates.
use std::ops::Range;

use chrono::{Datelike, NaiveDate};
use itertools::Itertools;

use crate::error::{Result, SplashError};

/// Returns `true` for Gregorian leap years.
#[inline]
pub fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

/// Number of days in a calendar year.
#[inline]
pub fn days_in_year(year: i32) -> u32 {
    if is_leap_year(year) {
        366
    } else {
        365
    }
}

/// Number of days in a month, `month` in 1..=12.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    debug_assert!((1..=12).contains(&month));
    match month {
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 31,
    }
}

/// A contiguous run of dates, inclusive at both ends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Period {
    /// First day.
    pub start: NaiveDate,
    /// Last day.
    pub end: NaiveDate,
}

impl Period {
    /// Create a new period, `start` must not be after `end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(SplashError::NonMonotonicDates {
                previous: start,
                next: end,
            });
        }
        Ok(Period { start, end })
    }

    /// 1 January to 31 December of `first_year..=last_year`.
    pub fn years(first_year: i32, last_year: i32) -> Result<Self> {
        let start = year_start(first_year)?;
        let end = year_end(last_year)?;
        Period::new(start, end)
    }

    /// Number of days in the period.
    #[inline]
    pub fn len(&self) -> usize {
        (self.end.signed_duration_since(self.start).num_days() + 1) as usize
    }

    /// Always `false`, a period holds at least one day.
    #[inline]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Returns `true` if the date is in the period.
    #[inline]
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Returns `true` if the periods share at least one day.
    #[inline]
    pub fn overlaps(&self, other: &Period) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}

fn year_start(year: i32) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(year, 1, 1)
        .ok_or_else(|| SplashError::InvalidConfig(format!("year {} out of range", year)))
}

fn year_end(year: i32) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(year, 12, 31)
        .ok_or_else(|| SplashError::InvalidConfig(format!("year {} out of range", year)))
}

/// The span of one calendar year within a calendar.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct YearSpan {
    /// The calendar year.
    pub year: i32,
    /// Indexes into the calendar.
    pub indexes: Range<usize>,
    /// Whether the span includes 31 December.
    pub ends_year: bool,
}

/// An ordered, gap-free sequence of dates.
///
/// # Examples
///
/// ```rust
/// use chrono::NaiveDate;
/// use splash_driver::Calendar;
///
/// let cal = Calendar::for_year(2000).unwrap();
/// assert_eq!(cal.len(), 366);
/// assert_eq!(cal.day_of_year(59), 60); // 29 February
///
/// let d = |day| NaiveDate::from_ymd_opt(2001, 1, day).unwrap();
/// assert!(Calendar::new(vec![d(1), d(2), d(4)]).is_err());
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Calendar {
    dates: Vec<NaiveDate>,
}

impl Calendar {
    /// Create a calendar, checking the dates are ascending with no gaps.
    pub fn new(dates: Vec<NaiveDate>) -> Result<Self> {
        if dates.is_empty() {
            return Err(SplashError::EmptyCalendar);
        }

        for (&previous, &next) in dates.iter().tuple_windows() {
            let step = next.signed_duration_since(previous).num_days();
            if step <= 0 {
                return Err(SplashError::NonMonotonicDates { previous, next });
            } else if step > 1 {
                return Err(SplashError::MissingDay {
                    after: previous,
                    next,
                });
            }
        }

        Ok(Calendar { dates })
    }

    /// Every date in a period.
    pub fn from_period(period: &Period) -> Self {
        let dates = period
            .start
            .iter_days()
            .take_while(|d| *d <= period.end)
            .collect();
        Calendar { dates }
    }

    /// Every date of a calendar year.
    pub fn for_year(year: i32) -> Result<Self> {
        Ok(Calendar::from_period(&Period::years(year, year)?))
    }

    /// The dates.
    #[inline]
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Number of dates.
    #[inline]
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    /// Always `false`, empty calendars are rejected on construction.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// First date.
    #[inline]
    pub fn first(&self) -> NaiveDate {
        self.dates[0]
    }

    /// Last date.
    #[inline]
    pub fn last(&self) -> NaiveDate {
        self.dates[self.dates.len() - 1]
    }

    /// The covered period.
    #[inline]
    pub fn period(&self) -> Period {
        Period {
            start: self.first(),
            end: self.last(),
        }
    }

    /// Day of year (1-based) of the date at `idx`.
    #[inline]
    pub fn day_of_year(&self, idx: usize) -> u32 {
        self.dates[idx].ordinal()
    }

    /// Length of the year containing the date at `idx`.
    #[inline]
    pub fn year_length(&self, idx: usize) -> u32 {
        days_in_year(self.dates[idx].year())
    }

    /// Returns `true` if the calendar is exactly 1 January to 31 December of one year.
    pub fn is_full_year(&self) -> bool {
        let first = self.first();
        first.ordinal() == 1 && self.len() == days_in_year(first.year()) as usize
    }

    /// Split the calendar into consecutive spans by calendar year.
    pub fn year_spans(&self) -> Vec<YearSpan> {
        let mut spans = vec![];
        let mut start = 0;
        for (year, group) in &self.dates.iter().group_by(|d| d.year()) {
            let n = group.count();
            let end = start + n;
            spans.push(YearSpan {
                year,
                indexes: start..end,
                ends_year: self.dates[end - 1].ordinal() == days_in_year(year),
            });
            start = end;
        }
        spans
    }

    /// The calendar restricted to the given index range.
    pub fn slice(&self, indexes: Range<usize>) -> Calendar {
        debug_assert!(!indexes.is_empty());
        Calendar {
            dates: self.dates[indexes].to_vec(),
        }
    }
}
