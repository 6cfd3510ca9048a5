//! Synthetic forcing and toy water-balance models used in tests.
use std::sync::Mutex;

use chrono::{Datelike, NaiveDate};

use crate::{
    calendar::{Calendar, Period},
    error::Result,
    forcing::{DailyForcing, ForcingProvider, ForcingRecord, InMemoryForcing},
    grid::{Grid, Shape, StaticGrid},
    water_balance::{DailyOutput, WaterBalance},
};

pub fn constant_day(shape: Shape, tc: f64, pn: f64, sf: f64) -> DailyForcing {
    DailyForcing {
        temperature: Grid::filled(shape, tc),
        precipitation: Grid::filled(shape, pn),
        sunshine_fraction: Grid::filled(shape, sf),
    }
}

pub fn single_cell_statics() -> StaticGrid {
    StaticGrid::from_row_latitudes(Grid::filled(Shape::new(1, 1), 100.0), &[45.0]).unwrap()
}

/// A record for whole years with precipitation from `precip(date)` in every cell.
pub fn years_record<F>(shape: Shape, first: i32, last: i32, precip: F) -> ForcingRecord
where
    F: Fn(NaiveDate) -> f64,
{
    let cal = Calendar::from_period(&Period::years(first, last).unwrap());
    let days = cal
        .dates()
        .iter()
        .map(|&d| constant_day(shape, 15.0, precip(d), 0.5))
        .collect();
    ForcingRecord::new(cal, shape, days).unwrap()
}

pub fn years_provider<F>(
    statics: StaticGrid,
    first: i32,
    last: i32,
    years_per_chunk: usize,
    precip: F,
) -> InMemoryForcing
where
    F: Fn(NaiveDate) -> f64,
{
    let rec = years_record(statics.shape(), first, last, precip);
    InMemoryForcing::new(
        statics,
        rec.calendar().clone(),
        rec.days().to_vec(),
        years_per_chunk,
    )
    .unwrap()
}

/// Serves slices of another provider's record under an arbitrary chunk layout.
#[derive(Clone, Debug)]
pub struct SplitForcing {
    pub inner: InMemoryForcing,
    pub periods: Vec<Period>,
}

impl ForcingProvider for SplitForcing {
    fn static_grid(&self) -> &StaticGrid {
        self.inner.static_grid()
    }

    fn periods(&self) -> Vec<Period> {
        self.periods.clone()
    }

    fn forcing_for_period(&mut self, period: &Period) -> Result<ForcingRecord> {
        self.inner.forcing_for_period(period)
    }
}

/// Loses a fixed fraction of soil moisture each day: `aet = rate * wn`.
#[derive(Clone, Copy, Debug)]
pub struct LinearBucket {
    pub rate: f64,
    pub capacity: f64,
}

impl WaterBalance for LinearBucket {
    fn field_capacity(&self) -> f64 {
        self.capacity
    }

    fn step(
        &self,
        prior: &Grid,
        forcing: &DailyForcing,
        _statics: &StaticGrid,
        _date: NaiveDate,
    ) -> DailyOutput {
        let shape = prior.shape();
        let aet = prior.map(|wn| self.rate * wn);
        let pet = Grid::filled(shape, self.rate * self.capacity);

        let wet: Vec<f64> = prior
            .values()
            .iter()
            .zip(forcing.precipitation.values())
            .map(|(wn, pn)| wn + pn - self.rate * wn)
            .collect();
        let runoff = Grid::from_raw(
            shape,
            wet.iter().map(|w| (w - self.capacity).max(0.0)).collect(),
        );
        let soil_moisture =
            Grid::from_raw(shape, wet.iter().map(|w| w.min(self.capacity)).collect());

        DailyOutput {
            pet,
            aet,
            runoff,
            soil_moisture,
        }
    }
}

/// Sets soil moisture to the day's precipitation, handy for pinning exact values.
#[derive(Clone, Copy, Debug)]
pub struct PrecipEcho;

impl WaterBalance for PrecipEcho {
    fn field_capacity(&self) -> f64 {
        150.0
    }

    fn step(
        &self,
        prior: &Grid,
        forcing: &DailyForcing,
        _statics: &StaticGrid,
        _date: NaiveDate,
    ) -> DailyOutput {
        let shape = prior.shape();
        DailyOutput {
            pet: Grid::filled(shape, 1.0),
            aet: Grid::filled(shape, 0.5),
            runoff: Grid::filled(shape, 0.0),
            soil_moisture: forcing.precipitation.clone(),
        }
    }
}

/// Holds 50 mm except on 31 December, when it overshoots a 100 mm capacity.
#[derive(Clone, Copy, Debug)]
pub struct YearEndSpike;

impl WaterBalance for YearEndSpike {
    fn field_capacity(&self) -> f64 {
        100.0
    }

    fn step(
        &self,
        prior: &Grid,
        _forcing: &DailyForcing,
        _statics: &StaticGrid,
        date: NaiveDate,
    ) -> DailyOutput {
        let shape = prior.shape();
        let wn = if date.month() == 12 && date.day() == 31 {
            130.0
        } else {
            50.0
        };
        DailyOutput {
            pet: Grid::filled(shape, 1.0),
            aet: Grid::filled(shape, 1.0),
            runoff: Grid::filled(shape, 0.0),
            soil_moisture: Grid::filled(shape, wn),
        }
    }
}

/// Wraps a model and records the prior soil moisture it was called with for every date.
#[derive(Debug)]
pub struct Recording<M> {
    pub inner: M,
    pub calls: Mutex<Vec<(NaiveDate, Grid)>>,
}

impl<M> Recording<M> {
    pub fn new(inner: M) -> Self {
        Recording {
            inner,
            calls: Mutex::new(vec![]),
        }
    }

    pub fn prior_on(&self, date: NaiveDate) -> Vec<Grid> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(d, _)| *d == date)
            .map(|(_, g)| g.clone())
            .collect()
    }
}

impl<M: WaterBalance> WaterBalance for Recording<M> {
    fn field_capacity(&self) -> f64 {
        self.inner.field_capacity()
    }

    fn step(
        &self,
        prior: &Grid,
        forcing: &DailyForcing,
        statics: &StaticGrid,
        date: NaiveDate,
    ) -> DailyOutput {
        self.calls.lock().unwrap().push((date, prior.clone()));
        self.inner.step(prior, forcing, statics, date)
    }
}
