//! Daily radiation terms: orbital position, day length and net radiation.
use std::f64::consts::PI;

/// Entrainment factor (mm/hr), Federer (1982).
pub(crate) const CW: f64 = 1.05;

// Eccentricity of earth's orbit, 2000 CE
const KE: f64 = 0.0167;
// Longitude of perihelion (degrees), 2000 CE
const KOMEGA: f64 = 283.0;
// Obliquity (degrees), 2000 CE
const KEPS: f64 = 23.44;
// Solar constant (W/m^2)
const KGSC: f64 = 1360.8;
// Shortwave albedo
const KALB_SW: f64 = 0.17;
// Angstrom-Prescott coefficients
const KC: f64 = 0.25;
const KD: f64 = 0.50;
// Longwave net radiation coefficients
const KA: f64 = 107.0;
const KB: f64 = 0.20;

const SECS_PER_DAY: f64 = 86_400.0;

#[inline]
fn rad(deg: f64) -> f64 {
    deg.to_radians()
}

// Hour angle (degrees) from its cosine, clipped to polar day (180) or night (0).
#[inline]
fn hour_angle(cos_h: f64) -> f64 {
    if cos_h >= 1.0 {
        0.0
    } else if cos_h <= -1.0 {
        180.0
    } else {
        cos_h.acos().to_degrees()
    }
}

/// True anomaly and true longitude (degrees) for a day of the year, Berger (1978).
pub(crate) fn heliocentric_longitudes(day_of_year: u32, year_length: u32) -> (f64, f64) {
    let xee = KE * KE;
    let xec = KE * KE * KE;
    let xse = (1.0 - xee).sqrt();

    // Mean longitude of the vernal equinox
    let xlam = (KE / 2.0 + xec / 8.0) * (1.0 + xse) * rad(KOMEGA).sin()
        - xee / 4.0 * (0.5 + xse) * rad(2.0 * KOMEGA).sin()
        + xec / 8.0 * (1.0 / 3.0 + xse) * rad(3.0 * KOMEGA).sin();
    let xlam = (2.0 * xlam).to_degrees();

    // Mean longitude for the day, vernal equinox fixed at day 80
    let dlamm = xlam + (f64::from(day_of_year) - 80.0) * (360.0 / f64::from(year_length));
    let ranm = rad(dlamm - KOMEGA);

    let ranv = ranm
        + (2.0 * KE - xec / 4.0) * ranm.sin()
        + 5.0 / 4.0 * xee * (2.0 * ranm).sin()
        + 13.0 / 12.0 * xec * (3.0 * ranm).sin();

    let lambda = (ranv.to_degrees() + KOMEGA).rem_euclid(360.0);
    let nu = (lambda - KOMEGA).rem_euclid(360.0);

    (nu, lambda)
}

/// Earth-sun distance factor for a true anomaly (degrees).
#[inline]
fn distance_factor(nu: f64) -> f64 {
    (1.0 / ((1.0 - KE * KE) / (1.0 + KE * rad(nu).cos()))).powi(2)
}

/// Solar declination (degrees) for a true longitude (degrees).
#[inline]
fn declination(lambda: f64) -> f64 {
    (rad(lambda).sin() * rad(KEPS).sin()).asin().to_degrees()
}

/// Sunset hour angle (degrees), 0 for polar night and 180 for polar day.
#[inline]
fn sunset_hour_angle(ru: f64, rv: f64) -> f64 {
    hour_angle(-ru / rv)
}

/// Radiation terms for one cell and day.
#[derive(Clone, Copy, Debug)]
pub(crate) struct SolarFluxes {
    /// Variable substitutes: sin(delta)sin(lat) and cos(delta)cos(lat).
    pub ru: f64,
    pub rv: f64,
    /// Net longwave radiation (W/m^2).
    pub rnl: f64,
    /// Shortwave radiation term (W/m^2).
    pub rw: f64,
    /// Net radiation cross-over hour angle (degrees).
    pub hn: f64,
    /// Daytime net radiation (J/m^2).
    pub rn_d: f64,
    /// Nighttime net radiation (J/m^2).
    pub rnn_d: f64,
}

impl SolarFluxes {
    pub fn new(lat: f64, elv: f64, sf: f64, tc: f64, day_of_year: u32, year_length: u32) -> Self {
        let (nu, lambda) = heliocentric_longitudes(day_of_year, year_length);

        let dr = distance_factor(nu);
        let delta = declination(lambda);

        let ru = rad(delta).sin() * rad(lat).sin();
        let rv = rad(delta).cos() * rad(lat).cos();
        let hs = sunset_hour_angle(ru, rv);

        // Transmittivity with the elevation correction of Allen (1996)
        let tau = (KC + KD * sf) * (1.0 + 2.67e-5 * elv);

        let rnl = (KB + (1.0 - KB) * sf) * (KA - tc);
        let rw = (1.0 - KALB_SW) * tau * KGSC * dr;

        let hn = hour_angle((rnl - rw * ru) / (rw * rv));

        let rn_d = (SECS_PER_DAY / PI)
            * (rad(hn) * (rw * ru - rnl) + rw * rv * rad(hn).sin());
        let rnn_d = (SECS_PER_DAY / PI)
            * (rw * rv * (rad(hs).sin() - rad(hn).sin()) + rw * ru * rad(hs - hn)
                - rnl * (PI - rad(hn)));

        SolarFluxes {
            ru,
            rv,
            rnl,
            rw,
            hn,
            rn_d,
            rnn_d,
        }
    }
}
