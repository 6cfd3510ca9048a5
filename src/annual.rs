//! Annual output blocks and the sink they are handed to.
use chrono::{Datelike, NaiveDate};
use itertools::{izip, Itertools};

use crate::{
    error::Result,
    forcing::DailyForcing,
    grid::{Grid, Shape},
    variables::Variable,
    water_balance::DailyOutput,
};

/// One calendar year of daily output, time-indexed by day of year.
///
/// Each selected variable holds one grid per day, so the block is a `time × lat × lon` cube per
/// variable.
#[derive(Clone, Debug, PartialEq)]
pub struct AnnualBlock {
    year: i32,
    shape: Shape,
    dates: Vec<NaiveDate>,
    layers: Vec<(Variable, Vec<Grid>)>,
}

impl AnnualBlock {
    /// The calendar year.
    #[inline]
    pub fn year(&self) -> i32 {
        self.year
    }

    /// Grid shape of every layer.
    #[inline]
    pub fn shape(&self) -> Shape {
        self.shape
    }

    /// The dates of the time axis.
    #[inline]
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// The variables present in the block, in selection order.
    pub fn variables(&self) -> Vec<Variable> {
        self.layers.iter().map(|(v, _)| *v).collect()
    }

    /// Daily grids for a variable, if it was selected.
    pub fn series(&self, var: Variable) -> Option<&[Grid]> {
        self.layers
            .iter()
            .find(|(v, _)| *v == var)
            .map(|(_, grids)| grids.as_slice())
    }

    /// The grid of a variable on a date.
    pub fn on(&self, var: Variable, date: NaiveDate) -> Option<&Grid> {
        let idx = self.dates.binary_search(&date).ok()?;
        self.series(var).map(|grids| &grids[idx])
    }

    /// The grid of a variable on the last day of the year.
    pub fn last(&self, var: Variable) -> Option<&Grid> {
        self.series(var).and_then(|grids| grids.last())
    }

    /// A variable as a flat time-major `time × lat × lon` array.
    pub fn cube(&self, var: Variable) -> Option<Vec<f64>> {
        self.series(var).map(|grids| {
            grids
                .iter()
                .flat_map(|g| g.values().iter().cloned())
                .collect()
        })
    }

    /// Per-cell sum of a variable over the year.
    pub fn annual_total(&self, var: Variable) -> Option<Grid> {
        self.series(var).map(|grids| cell_sum(self.shape, grids))
    }

    /// Per-cell sum of a variable for each month present, in calendar order.
    pub fn monthly_total(&self, var: Variable) -> Option<Vec<Grid>> {
        self.monthly(var, |sum, _n| sum)
    }

    /// Per-cell mean of a variable for each month present, in calendar order.
    pub fn monthly_mean(&self, var: Variable) -> Option<Vec<Grid>> {
        self.monthly(var, |sum, n| sum.map(|v| v / n as f64))
    }

    fn monthly<F>(&self, var: Variable, finish: F) -> Option<Vec<Grid>>
    where
        F: Fn(Grid, usize) -> Grid,
    {
        let grids = self.series(var)?;

        let mut months = vec![];
        for (_, group) in &izip!(&self.dates, grids).group_by(|(d, _)| d.month()) {
            let members: Vec<&Grid> = group.map(|(_, g)| g).collect();
            let n = members.len();
            months.push(finish(cell_sum(self.shape, members), n));
        }
        Some(months)
    }
}

fn cell_sum<'a, I>(shape: Shape, grids: I) -> Grid
where
    I: IntoIterator<Item = &'a Grid>,
{
    let mut totals = vec![0.0; shape.len()];
    for grid in grids {
        for (total, v) in izip!(totals.iter_mut(), grid.values()) {
            *total += v;
        }
    }
    Grid::from_raw(shape, totals)
}

/// Accumulates daily output for one year until it can be emitted as a block.
#[derive(Clone, Debug)]
pub(crate) struct YearBuffer {
    year: i32,
    shape: Shape,
    dates: Vec<NaiveDate>,
    layers: Vec<(Variable, Vec<Grid>)>,
}

impl YearBuffer {
    pub fn new(year: i32, shape: Shape, variables: &[Variable]) -> Self {
        YearBuffer {
            year,
            shape,
            dates: Vec::with_capacity(366),
            layers: variables
                .iter()
                .map(|&v| (v, Vec::with_capacity(366)))
                .collect(),
        }
    }

    #[inline]
    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn push(&mut self, date: NaiveDate, output: &DailyOutput, forcing: &DailyForcing) {
        debug_assert_eq!(date.year(), self.year);

        self.dates.push(date);
        for (var, grids) in self.layers.iter_mut() {
            let grid = match var {
                Variable::Pet => &output.pet,
                Variable::Aet => &output.aet,
                Variable::SoilMoisture => &output.soil_moisture,
                Variable::Runoff => &output.runoff,
                Variable::Precipitation => &forcing.precipitation,
                Variable::Temperature => &forcing.temperature,
                Variable::SunshineFraction => &forcing.sunshine_fraction,
            };
            grids.push(grid.clone());
        }
    }

    pub fn into_block(self) -> AnnualBlock {
        AnnualBlock {
            year: self.year,
            shape: self.shape,
            dates: self.dates,
            layers: self.layers,
        }
    }
}

/// Consumer of annual output blocks, e.g. a file writer.
pub trait AnnualSink {
    /// Take ownership of one complete year of output.
    fn accept(&mut self, block: AnnualBlock) -> Result<()>;
}

impl AnnualSink for Vec<AnnualBlock> {
    fn accept(&mut self, block: AnnualBlock) -> Result<()> {
        self.push(block);
        Ok(())
    }
}
