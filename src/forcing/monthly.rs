//! Monthly climate fields expanded to daily forcing.
//!
//! Each monthly value applies to every day of its month (a forward fill from the first of the month
//! to the first of the next). Monthly precipitation totals are spread evenly over the days of the
//! month and cloud cover (%) is converted to sunshine fraction as `1 - cld / 100`.
use chrono::{Datelike, NaiveDate};
use itertools::Itertools;

use super::{DailyForcing, ForcingProvider, ForcingRecord};
use crate::{
    calendar::{days_in_month, Calendar, Period},
    error::{Result, SplashError},
    grid::{Grid, StaticGrid},
};

/// Policy for physically implausible low temperatures.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TemperatureFloor {
    /// Raise values below the floor to the floor.
    Clamp(f64),
    /// Replace values below the floor with a missing value, masking the cell for that month.
    Mask(f64),
    /// Leave temperatures untouched.
    Off,
}

impl Default for TemperatureFloor {
    fn default() -> Self {
        TemperatureFloor::Clamp(-25.0)
    }
}

impl TemperatureFloor {
    /// Apply the policy to one value.
    #[inline]
    pub fn apply(self, t: f64) -> f64 {
        match self {
            TemperatureFloor::Clamp(floor) if t < floor => floor,
            TemperatureFloor::Mask(floor) if t < floor => f64::NAN,
            _ => t,
        }
    }
}

/// Monthly climate for one month.
#[derive(Clone, Debug, PartialEq)]
pub struct MonthlyField {
    /// Calendar year.
    pub year: i32,
    /// Month, 1-12.
    pub month: u32,
    /// Mean monthly temperature (°C).
    pub temperature: Grid,
    /// Total monthly precipitation (mm).
    pub precipitation: Grid,
    /// Mean monthly cloud cover (%).
    pub cloud_cover: Grid,
}

impl MonthlyField {
    fn first_day(&self) -> Result<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).ok_or_else(|| {
            SplashError::InvalidConfig(format!("invalid month {}-{}", self.year, self.month))
        })
    }

    fn last_day(&self) -> Result<NaiveDate> {
        let n = days_in_month(self.year, self.month);
        NaiveDate::from_ymd_opt(self.year, self.month, n).ok_or_else(|| {
            SplashError::InvalidConfig(format!("invalid month {}-{}", self.year, self.month))
        })
    }
}

/// A forcing provider built from consecutive whole years of monthly fields, served in chunks of
/// whole years (decades by default).
#[derive(Clone, Debug)]
pub struct MonthlyForcing {
    statics: StaticGrid,
    months: Vec<MonthlyField>,
    floor: TemperatureFloor,
    years_per_chunk: usize,
}

impl MonthlyForcing {
    /// Create a provider, checking the months are consecutive, cover whole years, and match the
    /// static grid.
    pub fn new(statics: StaticGrid, months: Vec<MonthlyField>) -> Result<Self> {
        let shape = statics.shape();

        for field in &months {
            if !(1..=12).contains(&field.month) {
                return Err(SplashError::InvalidConfig(format!(
                    "invalid month {}-{}",
                    field.year, field.month
                )));
            }
            field.temperature.check_shape("monthly temperature", shape)?;
            field.precipitation.check_shape("monthly precipitation", shape)?;
            field.cloud_cover.check_shape("monthly cloud cover", shape)?;
        }

        for (prev, next) in months.iter().tuple_windows() {
            let expected = if prev.month == 12 {
                (prev.year + 1, 1)
            } else {
                (prev.year, prev.month + 1)
            };

            if (next.year, next.month) != expected {
                let after = prev.last_day()?;
                let next = next.first_day()?;
                return Err(if next > after {
                    SplashError::MissingDay { after, next }
                } else {
                    SplashError::NonMonotonicDates {
                        previous: after,
                        next,
                    }
                });
            }
        }

        match (months.first(), months.last()) {
            (Some(first), Some(last)) if first.month == 1 && last.month == 12 => {}
            (Some(first), Some(last)) => {
                return Err(SplashError::NotAFullYear {
                    first: first.first_day()?,
                    last: last.last_day()?,
                })
            }
            _ => return Err(SplashError::EmptyCalendar),
        }

        Ok(MonthlyForcing {
            statics,
            months,
            floor: TemperatureFloor::default(),
            years_per_chunk: 10,
        })
    }

    /// Builder method for the low temperature policy.
    pub fn with_temperature_floor(self, floor: TemperatureFloor) -> Self {
        MonthlyForcing { floor, ..self }
    }

    /// Builder method for the chunk length in years, which must be at least 1.
    pub fn with_years_per_chunk(self, years_per_chunk: usize) -> Result<Self> {
        if years_per_chunk == 0 {
            return Err(SplashError::InvalidConfig(
                "years per chunk must be at least 1".to_owned(),
            ));
        }

        Ok(MonthlyForcing {
            years_per_chunk,
            ..self
        })
    }

    /// The daily forcing for every day of one month.
    fn expand_month(&self, field: &MonthlyField) -> Vec<DailyForcing> {
        let n_days = days_in_month(field.year, field.month);

        let floor = self.floor;
        let day = DailyForcing {
            temperature: field.temperature.map(|t| floor.apply(t)),
            precipitation: field.precipitation.map(|p| p / f64::from(n_days)),
            sunshine_fraction: field.cloud_cover.map(|cld| 1.0 - cld / 100.0),
        };

        vec![day; n_days as usize]
    }
}

impl ForcingProvider for MonthlyForcing {
    fn static_grid(&self) -> &StaticGrid {
        &self.statics
    }

    fn periods(&self) -> Vec<Period> {
        let first_year = self.months[0].year;
        let last_year = self.months[self.months.len() - 1].year;

        (first_year..=last_year)
            .step_by(self.years_per_chunk)
            .filter_map(|start| {
                let end = (start + self.years_per_chunk as i32 - 1).min(last_year);
                Period::years(start, end).ok()
            })
            .collect()
    }

    fn forcing_for_period(&mut self, period: &Period) -> Result<ForcingRecord> {
        let mut days = vec![];
        let mut first_date = None;

        for field in &self.months {
            if field.first_day()? < period.start || field.last_day()? > period.end {
                continue;
            }
            if first_date.is_none() {
                first_date = Some(field.first_day()?);
            }
            days.extend(self.expand_month(field));
        }

        let start = first_date.ok_or(SplashError::IncompleteCoverage {
            start_year: period.start.year(),
            end_year: period.end.year(),
        })?;

        let dates: Vec<NaiveDate> = start.iter_days().take(days.len()).collect();
        ForcingRecord::new(Calendar::new(dates)?, self.statics.shape(), days)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::grid::Shape;
    use crate::test_data::single_cell_statics;

    fn field(year: i32, month: u32, tmp: f64, pre: f64, cld: f64) -> MonthlyField {
        let shape = Shape::new(1, 1);
        MonthlyField {
            year,
            month,
            temperature: Grid::filled(shape, tmp),
            precipitation: Grid::filled(shape, pre),
            cloud_cover: Grid::filled(shape, cld),
        }
    }

    fn years(first: i32, last: i32) -> Vec<MonthlyField> {
        (first..=last)
            .flat_map(|y| (1..=12).map(move |m| field(y, m, m as f64 - 30.0, 31.0, 25.0)))
            .collect()
    }

    #[test]
    fn test_forward_fill() {
        let mut provider = MonthlyForcing::new(single_cell_statics(), years(2000, 2000)).unwrap();
        let periods = provider.periods();
        assert_eq!(periods, vec![Period::years(2000, 2000).unwrap()]);

        let rec = provider.forcing_for_period(&periods[0]).unwrap();
        assert_eq!(rec.len(), 366);
        assert!(rec.calendar().is_full_year());

        // 29 February 2000 carries February values, precipitation spread over 29 days.
        let feb29 = &rec.days()[59];
        assert_eq!(feb29.temperature.get(0, 0), -25.0); // clamped from -28
        assert_eq!(feb29.precipitation.get(0, 0), 31.0 / 29.0);
        assert_eq!(feb29.sunshine_fraction.get(0, 0), 0.75);

        // 1 March switches to the March values.
        let mar1 = &rec.days()[60];
        assert_eq!(mar1.temperature.get(0, 0), -25.0); // clamped from -27
        assert_eq!(mar1.precipitation.get(0, 0), 1.0);

        let dec31 = &rec.days()[365];
        assert_eq!(dec31.temperature.get(0, 0), -18.0);
    }

    #[test]
    fn test_temperature_floor_policies() {
        assert_eq!(TemperatureFloor::Clamp(-25.0).apply(-30.0), -25.0);
        assert_eq!(TemperatureFloor::Clamp(-25.0).apply(-10.0), -10.0);
        assert!(TemperatureFloor::Mask(-25.0).apply(-30.0).is_nan());
        assert_eq!(TemperatureFloor::Mask(-25.0).apply(-25.0), -25.0);
        assert_eq!(TemperatureFloor::Off.apply(-60.0), -60.0);

        let mut provider = MonthlyForcing::new(single_cell_statics(), years(2001, 2001))
            .unwrap()
            .with_temperature_floor(TemperatureFloor::Mask(-25.0));
        let rec = provider
            .forcing_for_period(&Period::years(2001, 2001).unwrap())
            .unwrap();
        assert!(rec.days()[0].temperature.get(0, 0).is_nan());
        assert_eq!(rec.days()[364].temperature.get(0, 0), -18.0);
    }

    #[test]
    fn test_decade_chunks() {
        let provider = MonthlyForcing::new(single_cell_statics(), years(1901, 1925)).unwrap();
        assert_eq!(
            provider.periods(),
            vec![
                Period::years(1901, 1910).unwrap(),
                Period::years(1911, 1920).unwrap(),
                Period::years(1921, 1925).unwrap(),
            ]
        );

        let yearly = provider.clone().with_years_per_chunk(1).unwrap();
        assert_eq!(yearly.periods().len(), 25);

        assert!(matches!(
            provider.with_years_per_chunk(0),
            Err(SplashError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_rejects_bad_months() {
        let mut months = years(2001, 2002);
        months.remove(14);
        assert!(matches!(
            MonthlyForcing::new(single_cell_statics(), months),
            Err(SplashError::MissingDay { .. })
        ));

        let mut months = years(2001, 2001);
        months.pop();
        assert!(matches!(
            MonthlyForcing::new(single_cell_statics(), months),
            Err(SplashError::NotAFullYear { .. })
        ));

        let mut months = years(2001, 2001);
        months[3].cloud_cover = Grid::filled(Shape::new(2, 2), 0.0);
        assert!(matches!(
            MonthlyForcing::new(single_cell_statics(), months),
            Err(SplashError::ShapeMismatch { .. })
        ));

        assert_eq!(
            MonthlyForcing::new(single_cell_statics(), vec![]).unwrap_err(),
            SplashError::EmptyCalendar
        );
    }
}
