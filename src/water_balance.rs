//! The contract of a daily water-balance step, and the bounds its output is held to.
use std::fmt;

use chrono::NaiveDate;
use itertools::izip;

use crate::{
    forcing::DailyForcing,
    grid::{Grid, StaticGrid},
};

/// Output of one day of the water balance.
#[derive(Clone, Debug, PartialEq)]
pub struct DailyOutput {
    /// Potential evapotranspiration (mm/day).
    pub pet: Grid,
    /// Actual evapotranspiration (mm/day).
    pub aet: Grid,
    /// Runoff (mm/day).
    pub runoff: Grid,
    /// Soil moisture at the end of the day (mm).
    pub soil_moisture: Grid,
}

impl DailyOutput {
    /// Copy out a band of whole rows.
    pub fn rows(&self, rows: std::ops::Range<usize>) -> DailyOutput {
        DailyOutput {
            pet: self.pet.rows(rows.clone()),
            aet: self.aet.rows(rows.clone()),
            runoff: self.runoff.rows(rows.clone()),
            soil_moisture: self.soil_moisture.rows(rows),
        }
    }

    /// Stack row bands back into a single output.
    pub fn stack_rows(bands: &[&DailyOutput]) -> DailyOutput {
        DailyOutput {
            pet: Grid::stack_rows(bands.iter().map(|b| &b.pet)),
            aet: Grid::stack_rows(bands.iter().map(|b| &b.aet)),
            runoff: Grid::stack_rows(bands.iter().map(|b| &b.runoff)),
            soil_moisture: Grid::stack_rows(bands.iter().map(|b| &b.soil_moisture)),
        }
    }
}

/// A daily water-balance model.
///
/// Implementations must be pure functions of their inputs: the same prior soil moisture, forcing,
/// statics and date always produce the same output. Soil moisture stays in
/// `[0, field_capacity()]`, with any excess leaving as runoff, and PET and AET are non-negative.
/// Cells with `NaN` statics or prior soil moisture are masked and yield `NaN` outputs. A cell
/// with missing forcing yields `NaN` fluxes for the day and keeps its soil moisture.
pub trait WaterBalance: Sync {
    /// The soil water holding capacity (mm).
    fn field_capacity(&self) -> f64;

    /// Advance every cell by one day from the soil moisture at the end of the previous day.
    fn step(
        &self,
        prior_soil_moisture: &Grid,
        forcing: &DailyForcing,
        statics: &StaticGrid,
        date: NaiveDate,
    ) -> DailyOutput;
}

/// The kind of out-of-bounds value found in a model's output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AnomalyKind {
    /// Potential evapotranspiration below zero.
    NegativePet,
    /// Actual evapotranspiration below zero.
    NegativeAet,
    /// Soil moisture below zero.
    SoilMoistureBelowZero,
    /// Soil moisture above the field capacity.
    SoilMoistureAboveCapacity,
}

impl fmt::Display for AnomalyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let desc = match self {
            AnomalyKind::NegativePet => "negative PET",
            AnomalyKind::NegativeAet => "negative AET",
            AnomalyKind::SoilMoistureBelowZero => "negative soil moisture",
            AnomalyKind::SoilMoistureAboveCapacity => "soil moisture above capacity",
        };
        f.write_str(desc)
    }
}

/// A cell whose output was clamped back into bounds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NumericAnomaly {
    /// The day of the step.
    pub date: NaiveDate,
    /// Grid row.
    pub row: usize,
    /// Grid column.
    pub col: usize,
    /// What was out of bounds.
    pub kind: AnomalyKind,
    /// The value before clamping.
    pub value: f64,
}

impl fmt::Display for NumericAnomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}) at row {}, col {} on {}, clamped",
            self.kind, self.value, self.row, self.col, self.date
        )
    }
}

/// Force the output back into its physical bounds, recording every cell that was outside them.
///
/// Soil moisture above capacity spills into runoff, the same way the bucket itself overflows.
pub(crate) fn clamp_output(
    output: &mut DailyOutput,
    capacity: f64,
    date: NaiveDate,
    row_offset: usize,
    cols: usize,
    anomalies: &mut Vec<NumericAnomaly>,
) {
    let DailyOutput {
        pet,
        aet,
        runoff,
        soil_moisture,
    } = output;

    let cells = izip!(
        pet.values_mut(),
        aet.values_mut(),
        runoff.values_mut(),
        soil_moisture.values_mut()
    );

    for (i, (pet, aet, ro, wn)) in cells.enumerate() {
        let mut record = |kind, value| {
            anomalies.push(NumericAnomaly {
                date,
                row: row_offset + i / cols,
                col: i % cols,
                kind,
                value,
            })
        };

        if *pet < 0.0 {
            record(AnomalyKind::NegativePet, *pet);
            *pet = 0.0;
        }
        if *aet < 0.0 {
            record(AnomalyKind::NegativeAet, *aet);
            *aet = 0.0;
        }
        if *wn < 0.0 {
            record(AnomalyKind::SoilMoistureBelowZero, *wn);
            *wn = 0.0;
        } else if *wn > capacity {
            record(AnomalyKind::SoilMoistureAboveCapacity, *wn);
            *ro += *wn - capacity;
            *wn = capacity;
        }
    }
}
