#![warn(missing_docs)]
//! Spin-up and day-by-day driver for the SPLASH water-balance model on gridded forcing.
//!
//! A run estimates a stationary soil moisture by cycling the first run year until it stops
//! changing, then steps every day of the run years in order, carrying soil moisture across year
//! boundaries and handing one [`AnnualBlock`] of daily output to an [`AnnualSink`] per calendar
//! year. Forcing is pulled chunk by chunk from a [`ForcingProvider`], and the daily physics sit
//! behind the [`WaterBalance`] trait, with [`Splash`] as the reference model.

//
// API
//
pub use crate::{
    annual::{AnnualBlock, AnnualSink},
    calendar::{days_in_month, days_in_year, is_leap_year, Calendar, Period, YearSpan},
    driver::{CancelToken, DriverState, RunConfig, RunDriver, RunReport},
    error::{Result, SplashError},
    forcing::{
        DailyForcing, ForcingProvider, ForcingRecord, InMemoryForcing, MonthlyField,
        MonthlyForcing, TemperatureFloor,
    },
    grid::{Grid, Shape, StaticGrid},
    spin_up::{spin_up, ConvergenceWarning, SpinUpConfig, SpinUpOutcome},
    splash::{CellForcing, CellOutput, Splash, DEFAULT_FIELD_CAPACITY},
    variables::{Descriptor, Variable, MISSING_PACKED},
    water_balance::{AnomalyKind, DailyOutput, NumericAnomaly, WaterBalance},
};

pub mod aridity;

//
// Internal use only
//
mod annual;
mod calendar;
mod driver;
mod error;
mod forcing;
mod grid;
mod spin_up;
mod splash;
mod variables;
mod water_balance;

#[cfg(test)]
mod test_data;
