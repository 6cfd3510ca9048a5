//! Error types for the splash-driver crate.
use chrono::NaiveDate;
use thiserror::Error;

use crate::grid::Shape;

/// Error type for the crate.
///
/// Everything except `Cancelled` and `Sink` is a configuration error: the forcing record or the run
/// configuration is malformed, and the run must not process any further days.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum SplashError {
    /// A calendar or forcing record with no dates.
    #[error("Calendar contains no dates.")]
    EmptyCalendar,
    /// Two consecutive dates are more than one day apart.
    #[error("Missing day(s) in forcing record between {after} and {next}.")]
    MissingDay {
        /// Last date before the gap.
        after: NaiveDate,
        /// First date after the gap.
        next: NaiveDate,
    },
    /// A date is repeated or precedes the date before it.
    #[error("Dates are not strictly ascending: {next} follows {previous}.")]
    NonMonotonicDates {
        /// The earlier entry in the sequence.
        previous: NaiveDate,
        /// The offending entry.
        next: NaiveDate,
    },
    /// A grid does not have the shape of the static grid.
    #[error("Grid shape mismatch for {what}: expected {expected}, found {found}.")]
    ShapeMismatch {
        /// Which grid failed the check.
        what: &'static str,
        /// The shape of the static grid.
        expected: Shape,
        /// The shape that was supplied.
        found: Shape,
    },
    /// The number of daily forcing entries does not match the number of dates.
    #[error("Forcing record has {days} days of data for {dates} dates.")]
    DayCountMismatch {
        /// Number of dates in the calendar.
        dates: usize,
        /// Number of daily forcing entries.
        days: usize,
    },
    /// A loaded chunk does not cover the period it was requested for.
    #[error("Forcing for period {expected_start}..={expected_end} covers {found_start}..={found_end}.")]
    PeriodMismatch {
        /// Requested first date.
        expected_start: NaiveDate,
        /// Requested last date.
        expected_end: NaiveDate,
        /// First date of the returned record.
        found_start: NaiveDate,
        /// Last date of the returned record.
        found_end: NaiveDate,
    },
    /// The provider's periods do not cover the requested run years.
    #[error("Forcing periods do not cover {start_year}..={end_year}.")]
    IncompleteCoverage {
        /// First run year.
        start_year: i32,
        /// Last run year.
        end_year: i32,
    },
    /// A reference record for spin-up that is not exactly one calendar year.
    #[error("Spin-up requires one full calendar year of forcing, found {first}..={last}.")]
    NotAFullYear {
        /// First date of the record.
        first: NaiveDate,
        /// Last date of the record.
        last: NaiveDate,
    },
    /// Invalid run or spin-up configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    /// An annual block lacks a variable a derived quantity needs.
    #[error("Annual block has no {0} layer.")]
    MissingVariable(&'static str),
    /// The run was cancelled before the given date was processed.
    #[error("Run cancelled before {date}.")]
    Cancelled {
        /// First date that was not processed.
        date: NaiveDate,
    },
    /// The annual output sink refused a block.
    #[error("Annual output sink failed: {0}")]
    Sink(String),
}

impl SplashError {
    /// Returns `true` for errors caused by a malformed forcing record or configuration.
    pub fn is_configuration_error(&self) -> bool {
        !matches!(self, SplashError::Cancelled { .. } | SplashError::Sink(_))
    }
}

/// Shorthand for results.
pub type Result<T> = ::std::result::Result<T, SplashError>;
