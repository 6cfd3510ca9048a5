//! The sequential run driver.
//!
//! A run spins up soil moisture on its first year, then steps every day of the run years in
//! calendar order. Soil moisture is carried from each day to the next, across year and chunk
//! boundaries alike, and one [`AnnualBlock`](crate::AnnualBlock) is handed to the sink on every
//! 31 December. A year is never emitted partially.
use std::collections::VecDeque;

use chrono::Datelike;
use itertools::{izip, Itertools};
use log::{debug, info, warn};

use crate::{
    annual::{AnnualSink, YearBuffer},
    calendar::{Calendar, Period, YearSpan},
    error::{Result, SplashError},
    forcing::{ForcingProvider, ForcingRecord},
    grid::{Grid, StaticGrid},
    spin_up::{spin_up, ConvergenceWarning, SpinUpOutcome},
    water_balance::{NumericAnomaly, WaterBalance},
};

mod config;
mod tiles;

pub use config::{CancelToken, RunConfig};

/// Where a [`RunDriver`] is in its run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DriverState {
    /// No soil moisture for the first day exists yet.
    AwaitingInitialCondition,
    /// Stepping through the days of a year.
    RunningYear(i32),
    /// Handing a completed year to the sink.
    EmittingAnnualBlock(i32),
    /// Every run year has been emitted.
    Done,
}

/// Summary of a completed run.
#[derive(Clone, Debug, PartialEq)]
pub struct RunReport {
    /// The spin-up result, `None` if an initial soil moisture was supplied.
    pub spin_up: Option<SpinUpOutcome>,
    /// The years handed to the sink, in order.
    pub years: Vec<i32>,
    /// Every clamped cell, ordered by date, row and column.
    pub anomalies: Vec<NumericAnomaly>,
    /// Soil moisture at the end of the last run year.
    pub final_soil_moisture: Grid,
}

impl RunReport {
    /// The spin-up warning, if the spin-up hit its iteration cap.
    pub fn convergence_warning(&self) -> Option<&ConvergenceWarning> {
        self.spin_up.as_ref().and_then(|s| s.warning.as_ref())
    }
}

/// Drives a water-balance model through a multi-year run.
///
/// # Examples
///
/// ```rust
/// use splash_driver::{AnnualBlock, Calendar, DailyForcing, DriverState, Grid, InMemoryForcing,
///     Period, RunConfig, RunDriver, Shape, Splash, StaticGrid, Variable};
///
/// let shape = Shape::new(1, 1);
/// let statics = StaticGrid::from_row_latitudes(Grid::filled(shape, 100.0), &[45.0]).unwrap();
/// let calendar = Calendar::from_period(&Period::years(2001, 2002).unwrap());
/// let day = DailyForcing {
///     temperature: Grid::filled(shape, 12.0),
///     precipitation: Grid::filled(shape, 2.0),
///     sunshine_fraction: Grid::filled(shape, 0.5),
/// };
/// let days = vec![day; calendar.len()];
/// let provider = InMemoryForcing::new(statics, calendar, days, 1).unwrap();
///
/// let model = Splash::new();
/// let mut driver = RunDriver::new(&model, provider, RunConfig::new(2001, 2002)).unwrap();
/// let mut blocks: Vec<AnnualBlock> = vec![];
/// let report = driver.run(&mut blocks).unwrap();
///
/// assert_eq!(driver.state(), DriverState::Done);
/// assert_eq!(report.years, vec![2001, 2002]);
/// assert_eq!(blocks[1].series(Variable::SoilMoisture).unwrap().len(), 365);
/// ```
pub struct RunDriver<'m, M: ?Sized, P> {
    model: &'m M,
    provider: P,
    config: RunConfig,
    cancel: CancelToken,
    state: DriverState,
}

impl<'m, M, P> RunDriver<'m, M, P>
where
    M: WaterBalance + ?Sized,
    P: ForcingProvider,
{
    /// Create a driver, validating the configuration against the provider's grid.
    pub fn new(model: &'m M, provider: P, config: RunConfig) -> Result<Self> {
        config.validate(provider.static_grid().shape(), model.field_capacity())?;

        Ok(RunDriver {
            model,
            provider,
            config,
            cancel: CancelToken::new(),
            state: DriverState::AwaitingInitialCondition,
        })
    }

    /// Builder method to share a cancellation token with the caller.
    pub fn with_cancel_token(self, cancel: CancelToken) -> Self {
        RunDriver { cancel, ..self }
    }

    /// A handle that cancels this driver.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// The current state.
    #[inline]
    pub fn state(&self) -> DriverState {
        self.state
    }

    /// The run configuration.
    #[inline]
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Run every configured year, handing each completed year to `sink`.
    ///
    /// The chunk layout of the provider is checked before any day is processed, and each chunk
    /// is checked against its period when it is loaded. Any error stops the run, and the year in
    /// progress is discarded.
    pub fn run<S>(&mut self, sink: &mut S) -> Result<RunReport>
    where
        S: AnnualSink + ?Sized,
    {
        if self.state != DriverState::AwaitingInitialCondition {
            return Err(SplashError::InvalidConfig(
                "a driver can only be run once".to_owned(),
            ));
        }

        let (start_year, end_year) = (self.config.start_year, self.config.end_year);
        let statics = self.provider.static_grid().clone();
        let run_period = Period::years(start_year, end_year)?;

        let mut pending: VecDeque<Period> =
            check_layout(&self.provider.periods(), &run_period)?.into();
        let mut loaded: VecDeque<ForcingRecord> = VecDeque::new();

        let (mut soil_moisture, spin_up_outcome) = match self.config.initial_soil_moisture.clone() {
            Some(initial) => {
                info!("Using the supplied initial soil moisture for {}", start_year);
                (initial, None)
            }
            None => {
                let reference = self.reference_year(&mut pending, &mut loaded, &statics)?;
                let outcome = spin_up(self.model, &reference, &statics, &self.config.spin_up)?;
                info!(
                    "Spin-up on {} finished after {} iterations, max change {:.4} mm",
                    start_year, outcome.iterations, outcome.max_difference
                );
                (outcome.soil_moisture.clone(), Some(outcome))
            }
        };

        self.transition(DriverState::RunningYear(start_year));

        let mut buffer: Option<YearBuffer> = None;
        let mut years = Vec::with_capacity((end_year - start_year + 1) as usize);
        let mut anomalies = vec![];

        while self.state != DriverState::Done {
            let chunk = match loaded.pop_front() {
                Some(chunk) => chunk,
                None => {
                    let period = pending.pop_front().ok_or(SplashError::IncompleteCoverage {
                        start_year,
                        end_year,
                    })?;
                    self.load(&period, &statics)?
                }
            };

            for YearSpan {
                year,
                indexes,
                ends_year,
            } in chunk.calendar().year_spans()
            {
                if year < start_year || year > end_year {
                    continue;
                }
                self.transition(DriverState::RunningYear(year));

                let segment = chunk.slice(indexes);
                let output = tiles::run_segment(
                    self.model,
                    &segment,
                    &statics,
                    &soil_moisture,
                    self.config.tile_rows,
                    &self.cancel,
                )?;

                for anomaly in &output.anomalies {
                    warn!("{}", anomaly);
                }
                anomalies.extend(output.anomalies);

                let variables = &self.config.variables;
                let buf = buffer
                    .get_or_insert_with(|| YearBuffer::new(year, statics.shape(), variables));
                debug_assert_eq!(buf.year(), year);
                for (&date, day, out) in izip!(segment.calendar().dates(), segment.days(), &output.days)
                {
                    buf.push(date, out, day);
                }
                if let Some(last) = output.days.into_iter().last() {
                    soil_moisture = last.soil_moisture;
                }

                if ends_year {
                    self.transition(DriverState::EmittingAnnualBlock(year));
                    if let Some(full) = buffer.take() {
                        sink.accept(full.into_block())?;
                    }
                    info!("Emitted annual block for {}", year);
                    years.push(year);

                    if year == end_year {
                        self.transition(DriverState::Done);
                        break;
                    }
                    self.transition(DriverState::RunningYear(year + 1));
                }
            }
        }

        Ok(RunReport {
            spin_up: spin_up_outcome,
            years,
            anomalies,
            final_soil_moisture: soil_moisture,
        })
    }

    fn transition(&mut self, next: DriverState) {
        if self.state != next {
            debug!("Driver state {:?} -> {:?}", self.state, next);
            self.state = next;
        }
    }

    /// Load a chunk and make sure it is exactly what was asked for.
    fn load(&mut self, period: &Period, statics: &StaticGrid) -> Result<ForcingRecord> {
        let record = self.provider.forcing_for_period(period)?;

        let found = record.calendar().period();
        if found != *period {
            return Err(SplashError::PeriodMismatch {
                expected_start: period.start,
                expected_end: period.end,
                found_start: found.start,
                found_end: found.end,
            });
        }
        if record.shape() != statics.shape() {
            return Err(SplashError::ShapeMismatch {
                what: "forcing",
                expected: statics.shape(),
                found: record.shape(),
            });
        }

        info!(
            "Loaded forcing for {} to {} ({} days)",
            period.start,
            period.end,
            record.len()
        );
        Ok(record)
    }

    /// Assemble the first run year from as many chunks as it spans, keeping the chunks for the
    /// run itself.
    fn reference_year(
        &mut self,
        pending: &mut VecDeque<Period>,
        loaded: &mut VecDeque<ForcingRecord>,
        statics: &StaticGrid,
    ) -> Result<ForcingRecord> {
        let year = self.config.start_year;
        let mut dates = vec![];
        let mut days = vec![];

        loop {
            let period = pending
                .pop_front()
                .ok_or(SplashError::IncompleteCoverage {
                    start_year: year,
                    end_year: self.config.end_year,
                })?;
            let chunk = self.load(&period, statics)?;

            let span = chunk
                .calendar()
                .year_spans()
                .into_iter()
                .find(|span| span.year == year);
            let complete = match span {
                Some(span) => {
                    dates.extend_from_slice(&chunk.calendar().dates()[span.indexes.clone()]);
                    days.extend_from_slice(&chunk.days()[span.indexes]);
                    span.ends_year
                }
                None => false,
            };

            loaded.push_back(chunk);
            if complete {
                break;
            }
        }

        ForcingRecord::new(Calendar::new(dates)?, statics.shape(), days)
    }
}

/// The provider periods that overlap the run, checked to be contiguous and to cover it.
fn check_layout(periods: &[Period], run: &Period) -> Result<Vec<Period>> {
    let overlapping: Vec<Period> = periods.iter().filter(|p| p.overlaps(run)).cloned().collect();

    for (prev, next) in overlapping.iter().tuple_windows() {
        let step = next.start.signed_duration_since(prev.end).num_days();
        if step <= 0 {
            return Err(SplashError::NonMonotonicDates {
                previous: prev.end,
                next: next.start,
            });
        } else if step > 1 {
            return Err(SplashError::MissingDay {
                after: prev.end,
                next: next.start,
            });
        }
    }

    match (overlapping.first(), overlapping.last()) {
        (Some(first), Some(last)) if first.start <= run.start && last.end >= run.end => {
            Ok(overlapping)
        }
        _ => Err(SplashError::IncompleteCoverage {
            start_year: run.start.year(),
            end_year: run.end.year(),
        }),
    }
}
