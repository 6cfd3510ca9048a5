use std::{fs::File, io::Read, path::PathBuf, str::FromStr};

use chrono::NaiveDate;
use splash_driver::{
    AnnualBlock, DailyForcing, DailyOutput, ForcingProvider, Grid, MonthlyField, MonthlyForcing,
    Result, RunConfig, RunDriver, RunReport, Shape, StaticGrid, WaterBalance,
};

pub mod run_checks;

#[allow(unused_macros)] // False alarm
macro_rules! site_test {
    ($test_mod_name:ident, $fname:expr) => {
        mod $test_mod_name {
            use crate::utils::{self, run_checks};
            use splash_driver::{AnnualBlock, MonthlyForcing, RunConfig, RunReport, Splash};

            fn load_data() -> MonthlyForcing {
                utils::sites_forcing(&[$fname])
            }

            fn run() -> (RunReport, Vec<AnnualBlock>) {
                utils::run_model(&Splash::new(), load_data(), RunConfig::new(2001, 2003)).unwrap()
            }

            #[test]
            fn all_years_emitted() {
                let (report, blocks) = run();
                assert_eq!(report.years, vec![2001, 2002, 2003]);
                run_checks::check_block_layout(&blocks);
            }

            #[test]
            fn output_bounds() {
                let (report, blocks) = run();
                run_checks::check_bounds(&blocks, splash_driver::DEFAULT_FIELD_CAPACITY);
                assert!(report.anomalies.is_empty());
            }

            #[test]
            fn spin_up_behaviour() {
                let (report, _) = run();
                run_checks::check_spin_up(&report);
            }

            #[test]
            fn year_carry_over() {
                let (_, blocks) = run();
                run_checks::check_carry_over(&Splash::new(), &mut load_data(), &blocks);
            }

            #[test]
            fn block_round_trip() {
                let (report, blocks) = run();
                run_checks::check_round_trip(&Splash::new(), &mut load_data(), &report, &blocks);
            }
        }
    };
}

/// A single site read from a CSV file in `test_data`.
#[allow(dead_code)]
pub struct Site {
    pub latitude: f64,
    pub elevation: f64,
    /// Year, month, temperature (°C), precipitation (mm/month), cloud cover (%).
    pub months: Vec<(i32, u32, f64, f64, f64)>,
}

#[allow(dead_code)]
pub fn load_site(fname: &str) -> Site {
    let mut path = PathBuf::new();
    path.push("test_data");
    path.push(fname);

    let mut f = File::open(&path).expect(&format!("Error opening file: {:#?}", path));
    let mut contents = String::new();
    f.read_to_string(&mut contents)
        .expect(&format!("Error reading file: {:#?}", path));

    let mut site = Site {
        latitude: f64::NAN,
        elevation: f64::NAN,
        months: vec![],
    };

    // Headers and section markers fail to parse and are skipped.
    for line in contents.lines() {
        let tokens: Vec<&str> = line.split(',').map(str::trim).collect();
        match tokens.len() {
            2 => {
                if let (Ok(lat), Ok(elv)) = (f64::from_str(tokens[0]), f64::from_str(tokens[1])) {
                    site.latitude = lat;
                    site.elevation = elv;
                }
            }
            5 => {
                let year = i32::from_str(tokens[0]);
                let month = u32::from_str(tokens[1]);
                let vals: Vec<f64> = tokens[2..]
                    .iter()
                    .filter_map(|t| f64::from_str(t).ok())
                    .collect();
                if let (Ok(year), Ok(month), 3) = (year, month, vals.len()) {
                    site.months.push((year, month, vals[0], vals[1], vals[2]));
                }
            }
            _ => {}
        }
    }

    site
}

/// Monthly forcing for a column of sites, one grid row per site.
#[allow(dead_code)]
pub fn sites_forcing(fnames: &[&str]) -> MonthlyForcing {
    let sites: Vec<Site> = fnames.iter().map(|f| load_site(f)).collect();
    let shape = Shape::new(sites.len(), 1);

    let elevation = Grid::new(shape, sites.iter().map(|s| s.elevation).collect()).unwrap();
    let latitudes: Vec<f64> = sites.iter().map(|s| s.latitude).collect();
    let statics = StaticGrid::from_row_latitudes(elevation, &latitudes).unwrap();

    let n_months = sites[0].months.len();
    let months = (0..n_months)
        .map(|i| {
            let (year, month, _, _, _) = sites[0].months[i];
            let column = |pick: fn(&(i32, u32, f64, f64, f64)) -> f64| {
                let vals = sites
                    .iter()
                    .map(|s| {
                        assert_eq!((s.months[i].0, s.months[i].1), (year, month));
                        pick(&s.months[i])
                    })
                    .collect();
                Grid::new(shape, vals).unwrap()
            };

            MonthlyField {
                year,
                month,
                temperature: column(|m| m.2),
                precipitation: column(|m| m.3),
                cloud_cover: column(|m| m.4),
            }
        })
        .collect();

    MonthlyForcing::new(statics, months).unwrap()
}

/// Run a model, collecting the blocks in memory.
#[allow(dead_code)]
pub fn run_model<M, P>(model: &M, provider: P, config: RunConfig) -> Result<(RunReport, Vec<AnnualBlock>)>
where
    M: WaterBalance + ?Sized,
    P: ForcingProvider,
{
    let mut blocks: Vec<AnnualBlock> = vec![];
    let report = RunDriver::new(model, provider, config)?.run(&mut blocks)?;
    Ok((report, blocks))
}

#[allow(dead_code)]
pub fn approx_equal(val1: f64, val2: f64, tol: f64) -> bool {
    assert!(tol > 0.0);
    (val1 - val2).abs() <= tol
}

/// Loses a fixed fraction of its soil moisture every day.
#[allow(dead_code)]
pub struct LeakyBucket {
    pub rate: f64,
    pub capacity: f64,
}

impl WaterBalance for LeakyBucket {
    fn field_capacity(&self) -> f64 {
        self.capacity
    }

    fn step(
        &self,
        prior: &Grid,
        forcing: &DailyForcing,
        _statics: &StaticGrid,
        _date: NaiveDate,
    ) -> DailyOutput {
        let shape = prior.shape();
        let wet: Vec<f64> = prior
            .values()
            .iter()
            .zip(forcing.precipitation.values())
            .map(|(wn, pn)| wn + pn - self.rate * wn)
            .collect();

        DailyOutput {
            pet: Grid::filled(shape, self.rate * self.capacity),
            aet: prior.map(|wn| self.rate * wn),
            runoff: Grid::new(
                shape,
                wet.iter().map(|w| (w - self.capacity).max(0.0)).collect(),
            )
            .unwrap(),
            soil_moisture: Grid::new(shape, wet.iter().map(|w| w.min(self.capacity)).collect())
                .unwrap(),
        }
    }
}

/// Soil moisture becomes the day's precipitation.
#[allow(dead_code)]
pub struct PrecipEcho;

impl WaterBalance for PrecipEcho {
    fn field_capacity(&self) -> f64 {
        150.0
    }

    fn step(
        &self,
        prior: &Grid,
        forcing: &DailyForcing,
        _statics: &StaticGrid,
        _date: NaiveDate,
    ) -> DailyOutput {
        let shape = prior.shape();
        DailyOutput {
            pet: Grid::filled(shape, 1.0),
            aet: Grid::filled(shape, 0.5),
            runoff: Grid::filled(shape, 0.0),
            soil_moisture: forcing.precipitation.clone(),
        }
    }
}
