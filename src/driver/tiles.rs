//! Runs a segment of days over row bands of the grid.
//!
//! Every band carries its own soil moisture through the segment, so bands are independent and
//! run on the rayon pool. The per-day grids are stacked back together afterwards.
use chrono::NaiveDate;
use itertools::izip;
use rayon::prelude::*;

use super::CancelToken;
use crate::{
    error::{Result, SplashError},
    forcing::{DailyForcing, ForcingRecord},
    grid::{row_bands, Grid, StaticGrid},
    water_balance::{clamp_output, DailyOutput, NumericAnomaly, WaterBalance},
};

pub(crate) struct SegmentOutput {
    pub days: Vec<DailyOutput>,
    pub anomalies: Vec<NumericAnomaly>,
}

pub(crate) fn run_segment<M>(
    model: &M,
    segment: &ForcingRecord,
    statics: &StaticGrid,
    start: &Grid,
    tile_rows: Option<usize>,
    cancel: &CancelToken,
) -> Result<SegmentOutput>
where
    M: WaterBalance + ?Sized,
{
    let n_rows = statics.shape().rows;
    let dates = segment.calendar().dates();

    let bands = match tile_rows {
        Some(rows) if rows < n_rows => row_bands(n_rows, rows),
        _ => {
            let mut whole = run_band(model, dates, segment.days(), statics, start, 0, cancel)?;
            whole.anomalies.sort_by_key(|a| (a.date, a.row, a.col, a.kind));
            return Ok(whole);
        }
    };

    let tiles: Vec<SegmentOutput> = bands
        .par_iter()
        .map(|rows| {
            let forcing: Vec<DailyForcing> =
                segment.days().iter().map(|d| d.rows(rows.clone())).collect();
            run_band(
                model,
                dates,
                &forcing,
                &statics.rows(rows.clone()),
                &start.rows(rows.clone()),
                rows.start,
                cancel,
            )
        })
        .collect::<Result<Vec<_>>>()?;

    let days = (0..dates.len())
        .map(|i| {
            let parts: Vec<&DailyOutput> = tiles.iter().map(|t| &t.days[i]).collect();
            DailyOutput::stack_rows(&parts)
        })
        .collect();

    let mut anomalies: Vec<NumericAnomaly> =
        tiles.into_iter().flat_map(|t| t.anomalies).collect();
    anomalies.sort_by_key(|a| (a.date, a.row, a.col, a.kind));

    Ok(SegmentOutput { days, anomalies })
}

fn run_band<M>(
    model: &M,
    dates: &[NaiveDate],
    forcing: &[DailyForcing],
    statics: &StaticGrid,
    start: &Grid,
    row_offset: usize,
    cancel: &CancelToken,
) -> Result<SegmentOutput>
where
    M: WaterBalance + ?Sized,
{
    let capacity = model.field_capacity();
    let cols = statics.shape().cols;

    let mut days: Vec<DailyOutput> = Vec::with_capacity(dates.len());
    let mut anomalies = vec![];

    for (&date, day) in izip!(dates, forcing) {
        if cancel.is_cancelled() {
            return Err(SplashError::Cancelled { date });
        }

        let prior = days.last().map(|d| &d.soil_moisture).unwrap_or(start);
        let mut output = model.step(prior, day, statics, date);
        clamp_output(&mut output, capacity, date, row_offset, cols, &mut anomalies);
        days.push(output);
    }

    Ok(SegmentOutput { days, anomalies })
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::Datelike;
    use crate::{
        grid::Shape,
        splash::Splash,
        test_data::{years_record, LinearBucket},
    };

    fn statics(shape: Shape) -> StaticGrid {
        let elevation = Grid::new(shape, (0..shape.len()).map(|i| 50.0 * i as f64).collect())
            .unwrap();
        let latitudes: Vec<f64> = (0..shape.rows).map(|r| -60.0 + 25.0 * r as f64).collect();
        StaticGrid::from_row_latitudes(elevation, &latitudes).unwrap()
    }

    #[test]
    fn test_bands_match_whole_grid() {
        let shape = Shape::new(5, 3);
        let statics = statics(shape);
        let segment = years_record(shape, 2001, 2001, |d| (d.ordinal() % 7) as f64);
        let start = Grid::filled(shape, 75.0);
        let cancel = CancelToken::new();
        let model = Splash::new();

        let whole = run_segment(&model, &segment, &statics, &start, None, &cancel).unwrap();
        for &rows in &[1, 2, 4] {
            let tiled =
                run_segment(&model, &segment, &statics, &start, Some(rows), &cancel).unwrap();
            assert_eq!(whole.days, tiled.days);
        }
    }

    #[test]
    fn test_cancelled_before_first_day() {
        let shape = Shape::new(2, 1);
        let segment = years_record(shape, 2001, 2001, |_| 1.0);
        let cancel = CancelToken::new();
        cancel.cancel();

        let res = run_segment(
            &LinearBucket {
                rate: 0.1,
                capacity: 150.0,
            },
            &segment,
            &statics(shape),
            &Grid::filled(shape, 0.0),
            Some(1),
            &cancel,
        );

        assert!(matches!(res, Err(SplashError::Cancelled { .. })));
    }
}
