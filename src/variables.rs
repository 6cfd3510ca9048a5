//! The closed set of variables handled by the crate and their encoding metadata.
//!
//! Each variable has one static [`Descriptor`] describing how it is stored as a packed `i16` in
//! gridded output: `value = packed * scale + offset`, with a sentinel for missing values.
use optional::{none, some, Optioned};
use strum_macros::EnumIter;

/// Sentinel stored for missing values in packed output.
pub const MISSING_PACKED: i16 = i16::MIN;

/// Variables read as forcing or produced by the water balance. Any of them can be carried in an
/// annual output block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, Hash, PartialOrd, Ord)]
pub enum Variable {
    /// Daily mean air temperature (°C).
    Temperature,
    /// Daily precipitation (mm/day).
    Precipitation,
    /// Fraction of daylight hours with direct sun.
    SunshineFraction,
    /// Potential evapotranspiration (mm/day).
    Pet,
    /// Actual evapotranspiration (mm/day).
    Aet,
    /// Soil moisture (mm).
    SoilMoisture,
    /// Runoff (mm/day).
    Runoff,
}

/// Encoding metadata for a variable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Descriptor {
    /// Short name used in output files.
    pub name: &'static str,
    /// Units of the unpacked value.
    pub units: &'static str,
    /// Multiplier applied to packed values.
    pub scale: f64,
    /// Offset added to packed values after scaling.
    pub offset: f64,
    /// Smallest physically valid value.
    pub valid_min: f64,
    /// Largest physically valid value.
    pub valid_max: f64,
}

const TEMPERATURE: Descriptor = Descriptor {
    name: "tmp",
    units: "degC",
    scale: 0.01,
    offset: 0.0,
    valid_min: -100.0,
    valid_max: 100.0,
};

const PRECIPITATION: Descriptor = Descriptor {
    name: "pre",
    units: "mm day-1",
    scale: 0.01,
    offset: 0.0,
    valid_min: 0.0,
    valid_max: 300.0,
};

const SUNSHINE_FRACTION: Descriptor = Descriptor {
    name: "sf",
    units: "1",
    scale: 0.0001,
    offset: 0.0,
    valid_min: 0.0,
    valid_max: 1.0,
};

const PET: Descriptor = Descriptor {
    name: "pet",
    units: "mm day-1",
    scale: 0.001,
    offset: 0.0,
    valid_min: 0.0,
    valid_max: 30.0,
};

const AET: Descriptor = Descriptor {
    name: "aet",
    units: "mm day-1",
    scale: 0.001,
    offset: 0.0,
    valid_min: 0.0,
    valid_max: 30.0,
};

const SOIL_MOISTURE: Descriptor = Descriptor {
    name: "wn",
    units: "mm",
    scale: 0.01,
    offset: 0.0,
    valid_min: 0.0,
    valid_max: 300.0,
};

const RUNOFF: Descriptor = Descriptor {
    name: "ro",
    units: "mm day-1",
    scale: 0.01,
    offset: 0.0,
    valid_min: 0.0,
    valid_max: 300.0,
};

impl Variable {
    /// The encoding metadata for this variable.
    pub fn descriptor(self) -> &'static Descriptor {
        use Variable::*;

        match self {
            Temperature => &TEMPERATURE,
            Precipitation => &PRECIPITATION,
            SunshineFraction => &SUNSHINE_FRACTION,
            Pet => &PET,
            Aet => &AET,
            SoilMoisture => &SOIL_MOISTURE,
            Runoff => &RUNOFF,
        }
    }

    /// Short name used in output files.
    #[inline]
    pub fn name(self) -> &'static str {
        self.descriptor().name
    }

    /// Look up a variable by its short name.
    pub fn from_name(name: &str) -> Option<Variable> {
        use strum::IntoEnumIterator;

        Variable::iter().find(|v| v.name() == name)
    }

    /// The variables written to annual output blocks by default: `aet`, `wn`, `pre` and `pet`.
    pub fn default_block_outputs() -> Vec<Variable> {
        vec![
            Variable::Aet,
            Variable::SoilMoisture,
            Variable::Precipitation,
            Variable::Pet,
        ]
    }
}

impl Descriptor {
    /// Returns `true` if the value is inside the valid range.
    #[inline]
    pub fn is_valid(&self, value: f64) -> bool {
        value >= self.valid_min && value <= self.valid_max
    }

    /// Pack a value into an `i16`, missing or out of range values become [`MISSING_PACKED`].
    ///
    /// # Examples
    ///
    /// ```rust
    /// use splash_driver::{Variable, MISSING_PACKED};
    ///
    /// let wn = Variable::SoilMoisture.descriptor();
    /// assert_eq!(wn.pack(42.0), 4200);
    /// assert_eq!(wn.pack(f64::NAN), MISSING_PACKED);
    /// assert_eq!(wn.pack(-1.0), MISSING_PACKED);
    /// ```
    pub fn pack(&self, value: f64) -> i16 {
        if value.is_nan() || !self.is_valid(value) {
            return MISSING_PACKED;
        }

        let packed = ((value - self.offset) / self.scale).round();
        if packed <= f64::from(MISSING_PACKED) || packed > f64::from(i16::MAX) {
            MISSING_PACKED
        } else {
            packed as i16
        }
    }

    /// Unpack an `i16`, the sentinel becomes a missing value.
    pub fn unpack(&self, packed: i16) -> Optioned<f64> {
        if packed == MISSING_PACKED {
            none()
        } else {
            some(f64::from(packed) * self.scale + self.offset)
        }
    }
}
