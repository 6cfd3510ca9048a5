use chrono::Datelike;
use splash_driver::{Calendar, DailyForcing, Grid, InMemoryForcing, Period, Shape, StaticGrid};

/// A grid spanning the tropics to the boreal zone with a smooth seasonal cycle.
pub fn synthetic_forcing(rows: usize, cols: usize, years: i32) -> InMemoryForcing {
    let shape = Shape::new(rows, cols);
    let latitudes: Vec<f64> = (0..rows)
        .map(|r| -60.0 + 120.0 * r as f64 / (rows.max(2) - 1) as f64)
        .collect();
    let elevation = Grid::new(
        shape,
        (0..shape.len()).map(|i| (i % 17) as f64 * 50.0).collect(),
    )
    .expect("oops");
    let statics = StaticGrid::from_row_latitudes(elevation, &latitudes).expect("oops");

    let calendar =
        Calendar::from_period(&Period::years(2001, 2000 + years).expect("oops"));
    let days = calendar
        .dates()
        .iter()
        .map(|date| {
            let season = (f64::from(date.ordinal()) / 365.0 * 2.0 * std::f64::consts::PI).cos();
            let temperature = latitudes
                .iter()
                .flat_map(|lat| {
                    let t = 27.0 - 0.45 * lat.abs() - 12.0 * season * lat.signum();
                    std::iter::repeat(t).take(cols)
                })
                .collect();

            DailyForcing {
                temperature: Grid::new(shape, temperature).expect("oops"),
                precipitation: Grid::filled(shape, 2.0 + 1.5 * season),
                sunshine_fraction: Grid::filled(shape, 0.5),
            }
        })
        .collect();

    InMemoryForcing::new(statics, calendar, days, 1).expect("oops")
}
