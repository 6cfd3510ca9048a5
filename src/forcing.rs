//! Daily forcing records and the providers that load them chunk by chunk.
//!
//! The core only ever sees canonical row-major grids with precipitation as a daily rate and
//! temperature already cleaned. Providers are responsible for getting the data into that form.
use chrono::Datelike;

use crate::{
    calendar::{Calendar, Period},
    error::{Result, SplashError},
    grid::{Grid, Shape, StaticGrid},
};

mod monthly;
pub use monthly::{MonthlyField, MonthlyForcing, TemperatureFloor};

/// Forcing for a single day.
#[derive(Clone, Debug, PartialEq)]
pub struct DailyForcing {
    /// Mean air temperature (°C).
    pub temperature: Grid,
    /// Precipitation (mm/day).
    pub precipitation: Grid,
    /// Sunshine fraction (0-1).
    pub sunshine_fraction: Grid,
}

impl DailyForcing {
    /// Check every grid has the expected shape.
    pub fn check_shape(&self, expected: Shape) -> Result<()> {
        self.temperature.check_shape("temperature", expected)?;
        self.precipitation.check_shape("precipitation", expected)?;
        self.sunshine_fraction
            .check_shape("sunshine fraction", expected)
    }

    /// Copy out a band of whole rows.
    pub fn rows(&self, rows: std::ops::Range<usize>) -> DailyForcing {
        DailyForcing {
            temperature: self.temperature.rows(rows.clone()),
            precipitation: self.precipitation.rows(rows.clone()),
            sunshine_fraction: self.sunshine_fraction.rows(rows),
        }
    }
}

/// A contiguous run of daily forcing on a fixed grid.
#[derive(Clone, Debug, PartialEq)]
pub struct ForcingRecord {
    calendar: Calendar,
    shape: Shape,
    days: Vec<DailyForcing>,
}

impl ForcingRecord {
    /// Create a record, validating that there is one day of forcing per date and that every grid
    /// has the given shape.
    pub fn new(calendar: Calendar, shape: Shape, days: Vec<DailyForcing>) -> Result<Self> {
        if calendar.len() != days.len() {
            return Err(SplashError::DayCountMismatch {
                dates: calendar.len(),
                days: days.len(),
            });
        }

        for day in &days {
            day.check_shape(shape)?;
        }

        Ok(ForcingRecord {
            calendar,
            shape,
            days,
        })
    }

    /// The dates covered.
    #[inline]
    pub fn calendar(&self) -> &Calendar {
        &self.calendar
    }

    /// Grid shape of every day.
    #[inline]
    pub fn shape(&self) -> Shape {
        self.shape
    }

    /// Forcing for every date, in calendar order.
    #[inline]
    pub fn days(&self) -> &[DailyForcing] {
        &self.days
    }

    /// Number of days.
    #[inline]
    pub fn len(&self) -> usize {
        self.days.len()
    }

    /// Always `false`, calendars are never empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// The record restricted to the given index range.
    pub fn slice(&self, indexes: std::ops::Range<usize>) -> ForcingRecord {
        ForcingRecord {
            calendar: self.calendar.slice(indexes.clone()),
            shape: self.shape,
            days: self.days[indexes].to_vec(),
        }
    }

    /// The record restricted to a single calendar year, if that whole year is present.
    pub fn year(&self, year: i32) -> Option<ForcingRecord> {
        self.calendar
            .year_spans()
            .into_iter()
            .find(|span| span.year == year)
            .map(|span| self.slice(span.indexes))
            .filter(|rec| rec.calendar.is_full_year())
    }
}

/// A source of daily forcing loaded one period (chunk) at a time.
pub trait ForcingProvider {
    /// Elevation and latitude of every cell.
    fn static_grid(&self) -> &StaticGrid;

    /// The chunks the forcing is organised in, in calendar order, e.g. decades.
    fn periods(&self) -> Vec<Period>;

    /// Load the forcing for one of the periods returned by `periods`.
    fn forcing_for_period(&mut self, period: &Period) -> Result<ForcingRecord>;
}

/// A provider serving a fully materialised daily record in chunks of whole years.
///
/// # Examples
///
/// ```rust
/// use splash_driver::{Calendar, DailyForcing, ForcingProvider, Grid, InMemoryForcing, Period,
///     Shape, StaticGrid};
///
/// let shape = Shape::new(1, 1);
/// let statics = StaticGrid::from_row_latitudes(Grid::filled(shape, 0.0), &[45.0]).unwrap();
/// let calendar = Calendar::from_period(&Period::years(2001, 2003).unwrap());
/// let day = DailyForcing {
///     temperature: Grid::filled(shape, 10.0),
///     precipitation: Grid::filled(shape, 2.0),
///     sunshine_fraction: Grid::filled(shape, 0.5),
/// };
/// let days = vec![day; calendar.len()];
///
/// let provider = InMemoryForcing::new(statics, calendar, days, 2).unwrap();
/// assert_eq!(provider.periods(), vec![
///     Period::years(2001, 2002).unwrap(),
///     Period::years(2003, 2003).unwrap(),
/// ]);
/// ```
#[derive(Clone, Debug)]
pub struct InMemoryForcing {
    statics: StaticGrid,
    record: ForcingRecord,
    years_per_chunk: usize,
}

impl InMemoryForcing {
    /// Create a provider splitting the record into chunks of `years_per_chunk` calendar years.
    pub fn new(
        statics: StaticGrid,
        calendar: Calendar,
        days: Vec<DailyForcing>,
        years_per_chunk: usize,
    ) -> Result<Self> {
        if years_per_chunk == 0 {
            return Err(SplashError::InvalidConfig(
                "years per chunk must be at least 1".to_owned(),
            ));
        }

        let record = ForcingRecord::new(calendar, statics.shape(), days)?;
        Ok(InMemoryForcing {
            statics,
            record,
            years_per_chunk,
        })
    }

    /// The whole record.
    #[inline]
    pub fn record(&self) -> &ForcingRecord {
        &self.record
    }
}

impl ForcingProvider for InMemoryForcing {
    fn static_grid(&self) -> &StaticGrid {
        &self.statics
    }

    fn periods(&self) -> Vec<Period> {
        let dates = self.record.calendar().dates();
        self.record
            .calendar()
            .year_spans()
            .chunks(self.years_per_chunk)
            .map(|spans| Period {
                start: dates[spans[0].indexes.start],
                end: dates[spans[spans.len() - 1].indexes.end - 1],
            })
            .collect()
    }

    fn forcing_for_period(&mut self, period: &Period) -> Result<ForcingRecord> {
        let cal = self.record.calendar();
        if !cal.period().overlaps(period) {
            return Err(SplashError::IncompleteCoverage {
                start_year: period.start.year(),
                end_year: period.end.year(),
            });
        }

        let start = period.start.max(cal.first());
        let end = period.end.min(cal.last());
        let first = start.signed_duration_since(cal.first()).num_days() as usize;
        let last = end.signed_duration_since(cal.first()).num_days() as usize;

        Ok(self.record.slice(first..last + 1))
    }
}
