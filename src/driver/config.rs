//! Run configuration and the cooperative cancellation token.
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use crate::{
    error::{Result, SplashError},
    grid::{Grid, Shape},
    spin_up::SpinUpConfig,
    variables::Variable,
};

/// Configuration of a sequential run.
///
/// # Examples
///
/// ```rust
/// use splash_driver::{RunConfig, SpinUpConfig, Variable};
///
/// let config = RunConfig::new(1991, 2000)
///     .with_variables(vec![Variable::Aet, Variable::SoilMoisture])
///     .with_spin_up(SpinUpConfig::new().with_tolerance(0.5))
///     .with_tile_rows(64);
///
/// assert_eq!(config.start_year, 1991);
/// assert_eq!(config.tile_rows, Some(64));
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct RunConfig {
    /// First calendar year written out.
    pub start_year: i32,
    /// Last calendar year written out, inclusive.
    pub end_year: i32,
    /// Variables stored in each annual block, in order.
    pub variables: Vec<Variable>,
    /// Settings for the spin-up on `start_year`.
    pub spin_up: SpinUpConfig,
    /// Rows per spatial tile, `None` runs the whole grid as one tile.
    pub tile_rows: Option<usize>,
    /// Soil moisture for 1 January of `start_year`, skipping the spin-up when set.
    pub initial_soil_moisture: Option<Grid>,
}

impl RunConfig {
    /// Run `start_year..=end_year` with the default outputs and spin-up settings.
    pub fn new(start_year: i32, end_year: i32) -> Self {
        RunConfig {
            start_year,
            end_year,
            variables: Variable::default_block_outputs(),
            spin_up: SpinUpConfig::default(),
            tile_rows: None,
            initial_soil_moisture: None,
        }
    }

    /// Builder method for the output variables.
    pub fn with_variables(self, variables: Vec<Variable>) -> Self {
        RunConfig { variables, ..self }
    }

    /// Builder method for the spin-up settings.
    pub fn with_spin_up(self, spin_up: SpinUpConfig) -> Self {
        RunConfig { spin_up, ..self }
    }

    /// Builder method for the number of rows per spatial tile.
    pub fn with_tile_rows(self, tile_rows: usize) -> Self {
        RunConfig {
            tile_rows: Some(tile_rows),
            ..self
        }
    }

    /// Builder method for a known initial soil moisture.
    pub fn with_initial_soil_moisture(self, soil_moisture: Grid) -> Self {
        RunConfig {
            initial_soil_moisture: Some(soil_moisture),
            ..self
        }
    }

    /// Check the configuration against the grid shape and bucket size of a run.
    pub fn validate(&self, shape: Shape, field_capacity: f64) -> Result<()> {
        if self.start_year > self.end_year {
            return Err(SplashError::InvalidConfig(format!(
                "start year {} is after end year {}",
                self.start_year, self.end_year
            )));
        }

        if self.variables.is_empty() {
            return Err(SplashError::InvalidConfig(
                "no output variables selected".to_owned(),
            ));
        }
        for (i, var) in self.variables.iter().enumerate() {
            if self.variables[..i].contains(var) {
                return Err(SplashError::InvalidConfig(format!(
                    "{} selected more than once",
                    var.name()
                )));
            }
        }

        if self.tile_rows == Some(0) {
            return Err(SplashError::InvalidConfig(
                "tiles need at least one row".to_owned(),
            ));
        }

        self.spin_up.validate()?;

        if let Some(ref initial) = self.initial_soil_moisture {
            initial.check_shape("initial soil moisture", shape)?;

            let out_of_range = initial
                .values()
                .iter()
                .find(|&&wn| wn < 0.0 || wn > field_capacity);
            if let Some(wn) = out_of_range {
                return Err(SplashError::InvalidConfig(format!(
                    "initial soil moisture {} outside 0..={}",
                    wn, field_capacity
                )));
            }
        }

        Ok(())
    }
}

/// A shared flag that stops a run before its next day.
///
/// Clones share the flag, so one can be handed to another thread and cancelled from there.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Create a token that is not cancelled.
    pub fn new() -> Self {
        CancelToken::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Returns `true` once cancellation has been requested.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
