//! Estimate a stationary initial soil moisture by cycling a reference year.
//!
//! No initial soil moisture is observable, so the reference year is run repeatedly, each pass
//! starting from the soil moisture the previous pass ended with, until the end-of-year grid stops
//! changing. Every day is held to the same bounds as in the run itself, so an out-of-range model
//! output is clamped and reported rather than carried into the first run day.
use std::fmt;

use chrono::Datelike;
use itertools::izip;
use log::{debug, warn};

use crate::{
    error::{Result, SplashError},
    forcing::ForcingRecord,
    grid::{Grid, StaticGrid},
    water_balance::{clamp_output, NumericAnomaly, WaterBalance},
};

/// Configuration for the spin-up procedure.
///
/// # Examples
///
/// ```rust
/// use splash_driver::SpinUpConfig;
///
/// let config = SpinUpConfig::new().with_tolerance(1.5).with_max_iterations(30);
/// assert!(config.validate().is_ok());
///
/// assert!(SpinUpConfig::new().with_max_iterations(0).validate().is_err());
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpinUpConfig {
    /// Largest acceptable change (mm) in any cell between the start and end of a pass.
    pub tolerance: f64,
    /// Maximum number of passes over the reference year.
    pub max_iterations: usize,
    /// Soil moisture (mm) every cell starts the first pass with.
    pub initial_value: f64,
}

impl Default for SpinUpConfig {
    fn default() -> Self {
        SpinUpConfig {
            tolerance: 1.0,
            max_iterations: 10,
            initial_value: 0.0,
        }
    }
}

impl SpinUpConfig {
    /// Create the default configuration: 1 mm tolerance, 10 passes, starting from 0 mm.
    pub fn new() -> Self {
        SpinUpConfig::default()
    }

    /// Builder method for the tolerance.
    pub fn with_tolerance(self, tolerance: f64) -> Self {
        SpinUpConfig { tolerance, ..self }
    }

    /// Builder method for the maximum number of passes.
    pub fn with_max_iterations(self, max_iterations: usize) -> Self {
        SpinUpConfig {
            max_iterations,
            ..self
        }
    }

    /// Builder method for the starting soil moisture.
    pub fn with_initial_value(self, initial_value: f64) -> Self {
        SpinUpConfig {
            initial_value,
            ..self
        }
    }

    /// Check the configuration is usable.
    pub fn validate(&self) -> Result<()> {
        if !(self.tolerance > 0.0) {
            return Err(SplashError::InvalidConfig(format!(
                "spin-up tolerance must be positive, found {}",
                self.tolerance
            )));
        }
        if self.max_iterations == 0 {
            return Err(SplashError::InvalidConfig(
                "spin-up needs at least one iteration".to_owned(),
            ));
        }
        if !(self.initial_value >= 0.0) {
            return Err(SplashError::InvalidConfig(format!(
                "initial soil moisture must be non-negative, found {}",
                self.initial_value
            )));
        }
        Ok(())
    }
}

/// The spin-up hit its iteration cap before the tolerance was met.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConvergenceWarning {
    /// Number of passes run.
    pub iterations: usize,
    /// The tolerance that was not met.
    pub tolerance: f64,
    /// Change over the final pass.
    pub max_difference: f64,
}

impl fmt::Display for ConvergenceWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "soil moisture spin-up did not converge after {} iterations: \
             max change {:.4} mm exceeds tolerance {} mm",
            self.iterations, self.max_difference, self.tolerance
        )
    }
}

/// Result of the spin-up procedure.
#[derive(Clone, Debug, PartialEq)]
pub struct SpinUpOutcome {
    /// Soil moisture at the end of the final pass, the initial condition for 1 January.
    pub soil_moisture: Grid,
    /// Number of passes run.
    pub iterations: usize,
    /// Change over the final pass.
    pub max_difference: f64,
    /// Change over every pass, in order.
    pub history: Vec<f64>,
    /// Set when the iteration cap was reached without meeting the tolerance.
    pub warning: Option<ConvergenceWarning>,
    /// Cells clamped back into bounds during the final pass, ordered by date, row and column.
    pub anomalies: Vec<NumericAnomaly>,
}

impl SpinUpOutcome {
    /// Returns `true` if the tolerance was met.
    #[inline]
    pub fn converged(&self) -> bool {
        self.warning.is_none()
    }
}

/// Run the spin-up procedure over one full calendar year of forcing.
///
/// Never fails for lack of convergence: if the cap is reached the best-effort grid is returned
/// with a [`ConvergenceWarning`]. Errors only for a reference record that is not one whole year or
/// does not match the static grid.
pub fn spin_up<M>(
    model: &M,
    reference: &ForcingRecord,
    statics: &StaticGrid,
    config: &SpinUpConfig,
) -> Result<SpinUpOutcome>
where
    M: WaterBalance + ?Sized,
{
    config.validate()?;

    let cal = reference.calendar();
    if !cal.is_full_year() {
        return Err(SplashError::NotAFullYear {
            first: cal.first(),
            last: cal.last(),
        });
    }
    if reference.shape() != statics.shape() {
        return Err(SplashError::ShapeMismatch {
            what: "spin-up forcing",
            expected: statics.shape(),
            found: reference.shape(),
        });
    }

    let year = cal.first().year();
    let mut start = Grid::filled(statics.shape(), config.initial_value);
    let mut history = Vec::with_capacity(config.max_iterations);

    // At least one pass runs, the config guarantees max_iterations >= 1.
    let mut iterations = 0;
    let (diff, anomalies) = loop {
        iterations += 1;
        let (end, anomalies) = run_year(model, start.clone(), reference, statics);
        let diff = end.max_abs_diff(&start);
        history.push(diff);

        debug!(
            "Spin-up on {} pass {}: max soil moisture change {:.4} mm",
            year, iterations, diff
        );

        start = end;
        if diff <= config.tolerance || iterations >= config.max_iterations {
            break (diff, anomalies);
        }
    };

    for anomaly in &anomalies {
        warn!("Spin-up on {}: {}", year, anomaly);
    }

    let warning = if diff <= config.tolerance {
        None
    } else {
        let warning = ConvergenceWarning {
            iterations,
            tolerance: config.tolerance,
            max_difference: diff,
        };
        warn!("Spin-up on {}: {}", year, warning);
        Some(warning)
    };

    Ok(SpinUpOutcome {
        soil_moisture: start,
        iterations,
        max_difference: diff,
        history,
        warning,
        anomalies,
    })
}

fn run_year<M>(
    model: &M,
    start: Grid,
    reference: &ForcingRecord,
    statics: &StaticGrid,
) -> (Grid, Vec<NumericAnomaly>)
where
    M: WaterBalance + ?Sized,
{
    let capacity = model.field_capacity();
    let cols = statics.shape().cols;
    let mut anomalies = vec![];

    let end = izip!(reference.calendar().dates(), reference.days()).fold(start, |wn, (&date, day)| {
        let mut output = model.step(&wn, day, statics, date);
        clamp_output(&mut output, capacity, date, 0, cols, &mut anomalies);
        output.soil_moisture
    });

    (end, anomalies)
}
