//! Evaporation terms: Priestley-Taylor equilibrium evaporation, condensation and the
//! supply-limited actual evapotranspiration.
use std::f64::consts::PI;

use super::solar::SolarFluxes;

// Priestley-Taylor coefficient minus one
const KW: f64 = 0.26;
// Standard sea-level pressure (Pa)
const KPO: f64 = 101_325.0;
// Temperature lapse rate (K/m)
const KL: f64 = 0.0065;
// Base temperature (K)
const KTO: f64 = 288.15;
// Gravitational acceleration (m/s^2)
const KG: f64 = 9.80665;
// Molecular weight of dry air and water vapour (kg/mol)
const KMA: f64 = 0.028963;
const KMV: f64 = 0.01802;
// Universal gas constant (J/mol/K)
const KR: f64 = 8.31447;

/// Atmospheric pressure (Pa) at an elevation (m), Allen et al. (1998).
pub(crate) fn atmospheric_pressure(elv: f64) -> f64 {
    KPO * (1.0 - KL * elv / KTO).powf(KG * KMA / (KR * KL))
}

/// Slope of the saturation vapour pressure curve (Pa/K).
fn sat_slope(tc: f64) -> f64 {
    (17.269 * 237.3 * 610.78) * (17.269 * tc / (tc + 237.3)).exp() / (tc + 237.3).powi(2)
}

/// Latent heat of vaporisation of water (J/kg), Henderson-Sellers (1984).
fn latent_heat(tc: f64) -> f64 {
    1.91846e6 * ((tc + 273.15) / (tc + 273.15 - 33.91)).powi(2)
}

/// Density of water (kg/m^3) at a temperature and pressure, Chen et al. (1977).
fn water_density(tc: f64, patm: f64) -> f64 {
    let po = 0.99983952 + 6.788260e-5 * tc - 9.08659e-6 * tc.powi(2) + 1.022130e-7 * tc.powi(3)
        - 1.35439e-9 * tc.powi(4)
        + 1.471150e-11 * tc.powi(5)
        - 1.11663e-13 * tc.powi(6)
        + 5.044070e-16 * tc.powi(7)
        - 1.00659e-18 * tc.powi(8);

    let ko = 19652.17 + 148.1830 * tc - 2.29995 * tc.powi(2) + 0.01281 * tc.powi(3)
        - 4.91564e-5 * tc.powi(4)
        + 1.035530e-7 * tc.powi(5);

    let ca = 3.26138 + 5.223e-4 * tc + 1.324e-4 * tc.powi(2) - 7.655e-6 * tc.powi(3)
        + 8.584e-8 * tc.powi(4);

    let cb = 7.2061e-5 - 5.8948e-6 * tc + 8.69900e-8 * tc.powi(2) - 1.01e-9 * tc.powi(3)
        + 4.3220e-12 * tc.powi(4);

    // Pressure in bar
    let pbar = 1.0e-5 * patm;
    let k = ko + ca * pbar + cb * pbar.powi(2);

    1000.0 * po * k / (k - pbar)
}

/// Specific heat of moist air (J/kg/K), Tsilingiris (2008).
fn specific_heat(tc: f64) -> f64 {
    let tc = tc.max(0.0).min(100.0);
    1.0e3
        * (1.0045714270 + 2.050632750e-3 * tc - 1.631537093e-4 * tc.powi(2)
            + 6.212300300e-6 * tc.powi(3)
            - 8.830478888e-8 * tc.powi(4)
            + 5.071307038e-10 * tc.powi(5))
}

/// Psychrometric constant (Pa/K), Allen et al. (2006).
fn psychrometric(tc: f64, patm: f64) -> f64 {
    specific_heat(tc) * KMA * patm / (KMV * latent_heat(tc))
}

/// Evaporation terms for one cell and day, all in mm unless noted.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Evaporation {
    /// Water-to-energy conversion (m^3/J).
    pub econ: f64,
    /// Daily condensation.
    pub cn: f64,
    /// Daily equilibrium evapotranspiration.
    pub eet_d: f64,
    /// Daily potential evapotranspiration.
    pub pet_d: f64,
    /// Variable substitute (mm/hr per W/m^2).
    rx: f64,
}

impl Evaporation {
    pub fn new(solar: &SolarFluxes, tc: f64, elv: f64) -> Self {
        let patm = atmospheric_pressure(elv);
        let s = sat_slope(tc);
        let lv = latent_heat(tc);
        let pw = water_density(tc, patm);
        let g = psychrometric(tc, patm);

        let econ = s / (lv * pw * (s + g));

        let cn = 1000.0 * econ * solar.rnn_d.abs();
        let eet_d = 1000.0 * econ * solar.rn_d;
        let pet_d = (1.0 + KW) * eet_d;
        let rx = 3.6e6 * (1.0 + KW) * econ;

        Evaporation {
            econ,
            cn,
            eet_d,
            pet_d,
            rx,
        }
    }

    /// Actual evapotranspiration for a soil water supply rate `sw` (mm/hr).
    pub fn aet(&self, solar: &SolarFluxes, sw: f64) -> f64 {
        let SolarFluxes {
            ru, rv, rw, rnl, hn, ..
        } = *solar;
        let rx = self.rx;

        // Intersection hour angle of supply and demand
        let cos_hi = sw / (rw * rv * rx) + rnl / (rw * rv) - ru / rv;
        let hi = if cos_hi >= 1.0 {
            0.0
        } else if cos_hi <= -1.0 {
            180.0
        } else {
            cos_hi.acos().to_degrees()
        };

        (24.0 / PI)
            * (sw * hi.to_radians()
                + rx * rw * rv * (hn.to_radians().sin() - hi.to_radians().sin())
                + (rx * rw * ru - rx * rnl) * (hn - hi).to_radians())
    }
}
