//! Model length units and conversion into paper millimetres.

use serde::{Deserialize, Serialize};

/// SI prefix applied to the metre.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SiPrefix {
    /// 10^3
    Kilo,
    /// 10^2
    Hecto,
    /// 10^1
    Deca,
    /// 10^-1
    Deci,
    /// 10^-2
    Centi,
    /// 10^-3
    Milli,
    /// 10^-6
    Micro,
}

impl SiPrefix {
    /// Multiplier relative to the unprefixed unit.
    pub fn factor(self) -> f64 {
        match self {
            SiPrefix::Kilo => 1e3,
            SiPrefix::Hecto => 1e2,
            SiPrefix::Deca => 1e1,
            SiPrefix::Deci => 1e-1,
            SiPrefix::Centi => 1e-2,
            SiPrefix::Milli => 1e-3,
            SiPrefix::Micro => 1e-6,
        }
    }
}

/// Project length unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "unit", rename_all = "UPPERCASE")]
pub enum LengthUnit {
    /// Metre, optionally prefixed (e.g. millimetre).
    Metre {
        /// SI prefix, `None` for plain metres.
        #[serde(default)]
        prefix: Option<SiPrefix>,
    },
    /// International foot.
    Foot,
    /// International inch.
    Inch,
}

impl Default for LengthUnit {
    fn default() -> Self {
        LengthUnit::Metre { prefix: None }
    }
}

impl LengthUnit {
    /// Millimetre shorthand.
    pub const MILLIMETRE: Self = LengthUnit::Metre {
        prefix: Some(SiPrefix::Milli),
    };

    /// Length of one model unit in metres.
    pub fn metres_per_unit(&self) -> f64 {
        match self {
            LengthUnit::Metre { prefix } => prefix.map_or(1.0, SiPrefix::factor),
            LengthUnit::Foot => 0.3048,
            LengthUnit::Inch => 0.0254,
        }
    }

    /// Convert a real-world length in metres into model units.
    pub fn from_metres(&self, metres: f64) -> f64 {
        metres / self.metres_per_unit()
    }

    /// Paper millimetres per model unit at the given drawing scale ratio.
    ///
    /// A 1:100 drawing in a metre model gives `1000 * 0.01 = 10` mm per unit.
    pub fn paper_mm_per_unit(&self, scale_ratio: f64) -> f64 {
        self.metres_per_unit() * 1000.0 * scale_ratio
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_millimetre_conversion() {
        let mm = LengthUnit::MILLIMETRE;
        assert_relative_eq!(mm.from_metres(0.03), 30.0, epsilon = 1e-9);
        assert_relative_eq!(mm.paper_mm_per_unit(0.01), 0.01, epsilon = 1e-12);
    }

    #[test]
    fn test_imperial_units() {
        assert_relative_eq!(LengthUnit::Foot.from_metres(0.3048), 1.0, epsilon = 1e-12);
        assert_relative_eq!(LengthUnit::Inch.metres_per_unit(), 0.0254);
    }

    #[test]
    fn test_unit_serde_tag() {
        let json = r#"{"unit":"METRE","prefix":"MILLI"}"#;
        let unit: LengthUnit = serde_json::from_str(json).unwrap();
        assert_eq!(unit, LengthUnit::MILLIMETRE);

        let plain: LengthUnit = serde_json::from_str(r#"{"unit":"METRE"}"#).unwrap();
        assert_eq!(plain, LengthUnit::default());
    }
}
