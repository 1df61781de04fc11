//! Measurement units for lab materials and the conversions between them.
//!
//! Quantities move between three unit families: volume (anchored on mL),
//! mass (anchored on g) and discrete counts (units, vials, bottles).
//! Conversion multiplies into the family's base unit and divides back out,
//! so converting between families is permitted and behaves as a factor-1
//! relabel. Unknown unit symbols decode to the discrete base unit rather
//! than failing, since imported spreadsheets routinely carry free-text
//! units.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};
use utoipa::ToSchema;

/// The family a unit belongs to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum UnitCategory {
    Volume,
    Mass,
    Discrete,
}

/// A measurement unit, serialized by its display symbol (e.g. "mL", "kg").
#[derive(
    Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Display, EnumString, EnumIter, ToSchema,
)]
pub enum Unit {
    #[serde(rename = "mL")]
    #[strum(serialize = "mL")]
    Milliliters,
    #[serde(rename = "L")]
    #[strum(serialize = "L")]
    Liters,
    #[serde(rename = "µL")]
    #[strum(serialize = "µL")]
    Microliters,
    #[serde(rename = "mg")]
    #[strum(serialize = "mg")]
    Milligrams,
    #[serde(rename = "g")]
    #[strum(serialize = "g")]
    Grams,
    #[serde(rename = "kg")]
    #[strum(serialize = "kg")]
    Kilograms,
    #[default]
    #[serde(rename = "units")]
    #[strum(serialize = "units")]
    Units,
    #[serde(rename = "vials")]
    #[strum(serialize = "vials")]
    Vials,
    #[serde(rename = "bottles")]
    #[strum(serialize = "bottles")]
    Bottles,
}

// Unknown symbols fall back to the discrete base unit instead of erroring,
// so stored records with free-text units stay readable.
impl<'de> Deserialize<'de> for Unit {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse_or_default(&raw))
    }
}

impl Unit {
    /// Multiplier into the family's base unit (mL for volume, g for mass,
    /// 1 for discrete counts).
    pub fn factor(&self) -> f64 {
        match self {
            Unit::Milliliters => 1.0,
            Unit::Liters => 1000.0,
            Unit::Microliters => 0.001,
            Unit::Milligrams => 0.001,
            Unit::Grams => 1.0,
            Unit::Kilograms => 1000.0,
            Unit::Units | Unit::Vials | Unit::Bottles => 1.0,
        }
    }

    pub fn category(&self) -> UnitCategory {
        match self {
            Unit::Milliliters | Unit::Liters | Unit::Microliters => UnitCategory::Volume,
            Unit::Milligrams | Unit::Grams | Unit::Kilograms => UnitCategory::Mass,
            Unit::Units | Unit::Vials | Unit::Bottles => UnitCategory::Discrete,
        }
    }

    /// Parses a unit symbol, falling back to [`Unit::Units`] for anything
    /// unrecognized.
    pub fn parse_or_default(raw: &str) -> Self {
        raw.trim().parse().unwrap_or_default()
    }
}

/// Converts `value` from one unit into another.
///
/// Same-unit conversion returns the value untouched, so quantities that
/// never leave their recorded unit stay bit-exact. Cross-family conversion
/// is intentionally allowed and only applies the numeric factors.
pub fn convert(value: f64, from: Unit, to: Unit) -> f64 {
    if from == to {
        return value;
    }
    value * from.factor() / to.factor()
}

/// Parses a numeric string, returning 0.0 for anything unparseable.
pub fn parse_f64_or_zero(raw: &str) -> f64 {
    raw.trim().parse().unwrap_or(0.0)
}

/// Deserializes a numeric field that may arrive as a JSON number, a numeric
/// string, or garbage. Strings are parsed, everything else collapses to 0.0.
pub fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
        Other(serde_json::Value),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Number(n) => n,
        Raw::Text(raw) => parse_f64_or_zero(&raw),
        Raw::Other(_) => 0.0,
    })
}
