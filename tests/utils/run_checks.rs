use super::*;
use chrono::Datelike;
use splash_driver::{days_in_year, Period, Variable};

#[allow(dead_code)] // False alarm - lint is done before macro expansion.
pub fn check_block_layout(blocks: &[AnnualBlock]) {
    for block in blocks {
        let dates = block.dates();
        assert_eq!(dates.len(), days_in_year(block.year()) as usize);
        assert_eq!(dates[0], NaiveDate::from_ymd_opt(block.year(), 1, 1).unwrap());
        assert!(dates.iter().all(|d| d.year() == block.year()));

        for var in block.variables() {
            assert_eq!(block.series(var).unwrap().len(), dates.len());
            assert_eq!(
                block.cube(var).unwrap().len(),
                dates.len() * block.shape().len()
            );
        }
    }
}

#[allow(dead_code)]
pub fn check_bounds(blocks: &[AnnualBlock], field_capacity: f64) {
    for block in blocks {
        for grid in block.series(Variable::SoilMoisture).unwrap() {
            assert!(grid
                .values()
                .iter()
                .all(|&wn| wn >= 0.0 && wn <= field_capacity));
        }

        for var in &[Variable::Pet, Variable::Aet] {
            for grid in block.series(*var).unwrap() {
                assert!(grid.values().iter().all(|&v| v >= 0.0), "{:?}", var);
            }
        }
    }
}

#[allow(dead_code)]
pub fn check_spin_up(report: &RunReport) {
    let outcome = report.spin_up.as_ref().unwrap();

    assert_eq!(outcome.history.len(), outcome.iterations);
    assert!(outcome.converged() || outcome.iterations == 10);
    assert_eq!(outcome.converged(), report.convergence_warning().is_none());
    assert!(outcome.anomalies.is_empty(), "{:?}", outcome.anomalies);

    // The bucket is non-expansive, so passes never move further apart.
    for pair in outcome.history.windows(2) {
        assert!(pair[1] <= pair[0] + 1.0e-9, "{:?}", outcome.history);
    }
}

/// The first day of every year must start from the last soil moisture of the year before.
#[allow(dead_code)]
pub fn check_carry_over<M, P>(model: &M, provider: &mut P, blocks: &[AnnualBlock])
where
    M: WaterBalance + ?Sized,
    P: ForcingProvider,
{
    for pair in blocks.windows(2) {
        let (before, after) = (&pair[0], &pair[1]);
        let jan1 = after.dates()[0];

        let record = provider
            .forcing_for_period(&Period::years(after.year(), after.year()).unwrap())
            .unwrap();
        let statics = provider.static_grid().clone();

        let prior = before.last(Variable::SoilMoisture).unwrap();
        let expected = model.step(prior, &record.days()[0], &statics, jan1);

        assert_eq!(
            after.on(Variable::SoilMoisture, jan1).unwrap(),
            &expected.soil_moisture
        );
    }
}

/// Stepping the model by hand from the stored soil moisture reproduces three stored days.
#[allow(dead_code)]
pub fn check_round_trip<M, P>(
    model: &M,
    provider: &mut P,
    report: &RunReport,
    blocks: &[AnnualBlock],
) where
    M: WaterBalance + ?Sized,
    P: ForcingProvider,
{
    let first = &blocks[0];
    let year = first.year();
    let record = provider
        .forcing_for_period(&Period::years(year, year).unwrap())
        .unwrap();
    let statics = provider.static_grid().clone();

    let initial = report.spin_up.as_ref().unwrap().soil_moisture.clone();
    for &idx in &[0, 45, 200] {
        let date = first.dates()[idx];
        let prior = if idx == 0 {
            initial.clone()
        } else {
            first.series(Variable::SoilMoisture).unwrap()[idx - 1].clone()
        };

        let expected = model.step(&prior, &record.days()[idx], &statics, date);

        assert_eq!(first.on(Variable::Aet, date).unwrap(), &expected.aet);
        assert_eq!(first.on(Variable::Pet, date).unwrap(), &expected.pet);
        assert_eq!(
            first.on(Variable::SoilMoisture, date).unwrap(),
            &expected.soil_moisture
        );
        assert_eq!(
            first.on(Variable::Precipitation, date).unwrap(),
            &record.days()[idx].precipitation
        );
    }
}
