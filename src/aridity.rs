//! Aridity indices and soil-moisture stress factors derived from annual output.
//!
//! Two aridity measures are used. The annual aridity index `AI = Σ PET / Σ P` of a single year
//! feeds the Mengoli stress factor, while the long-run Priestley-Taylor coefficient
//! `α = Σ AET / Σ PET` over all run years feeds the Stocker stress factor. Both stress factors take
//! relative soil moisture, `wn / Wm`.
use itertools::izip;
use optional::{none, some, Optioned};

use crate::{
    annual::AnnualBlock,
    error::{Result, SplashError},
    grid::{Grid, Shape},
    variables::Variable,
};

/// Parameters of the Stocker et al. (2020) soil-moisture stress function.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StockerParams {
    /// Relative soil moisture at which stress is greatest.
    pub theta0: f64,
    /// Relative soil moisture above which there is no stress.
    pub thetastar: f64,
    /// Intercept of the stress at `theta0` as a function of `α`.
    pub a: f64,
    /// Slope of the stress at `theta0` as a function of `α`.
    pub b: f64,
}

impl Default for StockerParams {
    fn default() -> Self {
        StockerParams {
            theta0: 0.0,
            thetastar: 0.6,
            a: 0.0,
            b: 0.733,
        }
    }
}

/// Parameters of the Mengoli et al. (2023) soil-moisture stress function.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MengoliParams {
    /// Coefficient of the plateau level.
    pub y_a: f64,
    /// Aridity exponent of the plateau level.
    pub y_b: f64,
    /// Coefficient of the threshold soil moisture.
    pub psi_a: f64,
    /// Aridity exponent of the threshold soil moisture.
    pub psi_b: f64,
}

impl Default for MengoliParams {
    fn default() -> Self {
        MengoliParams {
            y_a: 0.62,
            y_b: -0.45,
            psi_a: 0.34,
            psi_b: -0.60,
        }
    }
}

/// Aridity index from total PET and precipitation, missing when there was no precipitation.
///
/// ```rust
/// use splash_driver::aridity::aridity_index;
///
/// assert_eq!(aridity_index(900.0, 600.0).unpack(), 1.5);
/// assert!(aridity_index(900.0, 0.0).is_none());
/// ```
pub fn aridity_index(total_pet: f64, total_precipitation: f64) -> Optioned<f64> {
    let ai = total_pet / total_precipitation;
    if ai.is_finite() {
        some(ai)
    } else {
        none()
    }
}

/// Per-cell annual aridity index of a block, `NaN` where it is missing.
///
/// Requires the block to hold both PET and precipitation.
pub fn annual_aridity_index(block: &AnnualBlock) -> Result<Grid> {
    let pet = total(block, Variable::Pet)?;
    let pre = total(block, Variable::Precipitation)?;

    let values = izip!(pet.values(), pre.values())
        .map(|(&pet, &pre)| aridity_index(pet, pre).unwrap_or(f64::NAN))
        .collect();
    Ok(Grid::from_raw(block.shape(), values))
}

/// Per-cell long-run Priestley-Taylor coefficient `Σ AET / Σ PET` over a run of blocks.
///
/// Requires at least one block, every block holding AET and PET on the same grid.
pub fn long_run_alpha(blocks: &[AnnualBlock]) -> Result<Grid> {
    let shape = match blocks.first() {
        Some(block) => block.shape(),
        None => {
            return Err(SplashError::InvalidConfig(
                "long-run aridity needs at least one year".to_owned(),
            ))
        }
    };

    let mut aet = vec![0.0; shape.len()];
    let mut pet = vec![0.0; shape.len()];
    for block in blocks {
        if block.shape() != shape {
            return Err(SplashError::ShapeMismatch {
                what: "annual block",
                expected: shape,
                found: block.shape(),
            });
        }
        accumulate(&mut aet, &total(block, Variable::Aet)?);
        accumulate(&mut pet, &total(block, Variable::Pet)?);
    }

    let values = izip!(aet, pet).map(|(aet, pet)| aet / pet).collect();
    Ok(Grid::from_raw(shape, values))
}

/// Soil moisture as a fraction of field capacity.
#[inline]
pub fn relative_soil_moisture(soil_moisture: f64, field_capacity: f64) -> f64 {
    soil_moisture / field_capacity
}

/// Stocker soil-moisture stress factor with the default parameters.
///
/// # References
///
/// Stocker, B. D., Wang, H., Smith, N. G., Harrison, S. P., Keenan, T. F., Sandoval, D., Davis,
///     T., and Prentice, I. C.: P-model v1.0: an optimality-based light use efficiency model for
///     simulating ecosystem gross primary production, Geosci. Model Dev., 13, 1545–1581, 2020.
#[inline]
pub fn stocker_penalty(relative_soilm: f64, mean_alpha: f64) -> f64 {
    stocker_penalty_with(relative_soilm, mean_alpha, &StockerParams::default())
}

/// Stocker soil-moisture stress factor.
///
/// The factor is 1 above `thetastar` and falls quadratically below it, to `a + b * α` at
/// `theta0`. The result is clipped to `[0, 1]`.
pub fn stocker_penalty_with(relative_soilm: f64, mean_alpha: f64, params: &StockerParams) -> f64 {
    if relative_soilm.is_nan() || mean_alpha.is_nan() {
        return f64::NAN;
    }
    if relative_soilm > params.thetastar {
        return 1.0;
    }

    let y0 = params.a + params.b * mean_alpha;
    let beta = (1.0 - y0) / (params.theta0 - params.thetastar).powi(2);
    let stress = 1.0 - beta * (relative_soilm - params.thetastar).powi(2);
    stress.max(0.0).min(1.0)
}

/// Mengoli soil-moisture stress factor with the default parameters.
///
/// # References
///
/// Mengoli, G., Harrison, S. P., and Prentice, I. C.: A global function of climatic aridity
///     accounts for soil moisture stress on carbon assimilation, EGUsphere, 2023.
#[inline]
pub fn mengoli_penalty(relative_soilm: f64, aridity_index: f64) -> f64 {
    mengoli_penalty_with(relative_soilm, aridity_index, &MengoliParams::default())
}

/// Mengoli soil-moisture stress factor.
///
/// Below the threshold `ψ = min(psi_a * AI^psi_b, 1)` the factor rises linearly from zero to the
/// plateau `y = min(y_a * AI^y_b, 1)`, and stays on the plateau above it.
pub fn mengoli_penalty_with(relative_soilm: f64, aridity_index: f64, params: &MengoliParams) -> f64 {
    if relative_soilm.is_nan() || aridity_index.is_nan() {
        return f64::NAN;
    }

    let y_max = (params.y_a * aridity_index.powf(params.y_b)).min(1.0);
    let psi = (params.psi_a * aridity_index.powf(params.psi_b)).min(1.0);

    if relative_soilm >= psi {
        y_max
    } else {
        (y_max / psi) * relative_soilm
    }
}

/// Stocker stress factor for each month of a block, from the monthly mean soil moisture.
pub fn monthly_stocker_penalty(
    block: &AnnualBlock,
    mean_alpha: &Grid,
    field_capacity: f64,
) -> Result<Vec<Grid>> {
    mean_alpha.check_shape("mean alpha", block.shape())?;

    let months = block
        .monthly_mean(Variable::SoilMoisture)
        .ok_or_else(|| missing(Variable::SoilMoisture))?;

    Ok(months
        .iter()
        .map(|wn| {
            cellwise(block.shape(), wn, mean_alpha, |wn, alpha| {
                stocker_penalty(relative_soil_moisture(wn, field_capacity), alpha)
            })
        })
        .collect())
}

/// Mengoli stress factor for each day of a block, using the block's own aridity index.
pub fn daily_mengoli_penalty(block: &AnnualBlock, field_capacity: f64) -> Result<Vec<Grid>> {
    let ai = annual_aridity_index(block)?;
    let days = block
        .series(Variable::SoilMoisture)
        .ok_or_else(|| missing(Variable::SoilMoisture))?;

    Ok(days
        .iter()
        .map(|wn| {
            cellwise(block.shape(), wn, &ai, |wn, ai| {
                mengoli_penalty(relative_soil_moisture(wn, field_capacity), ai)
            })
        })
        .collect())
}

fn total(block: &AnnualBlock, var: Variable) -> Result<Grid> {
    block.annual_total(var).ok_or_else(|| missing(var))
}

fn missing(var: Variable) -> SplashError {
    SplashError::MissingVariable(var.name())
}

fn accumulate(totals: &mut [f64], grid: &Grid) {
    for (total, v) in izip!(totals.iter_mut(), grid.values()) {
        *total += v;
    }
}

fn cellwise<F>(shape: Shape, a: &Grid, b: &Grid, f: F) -> Grid
where
    F: Fn(f64, f64) -> f64,
{
    let values = izip!(a.values(), b.values())
        .map(|(&a, &b)| f(a, b))
        .collect();
    Grid::from_raw(shape, values)
}
