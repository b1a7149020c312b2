/// Measurement units for ingredients and grocery items
///
/// Units are a closed set stored as the `measurement_unit` Postgres enum.
/// Each unit belongs to a [`UnitFamily`]; metric mass and metric volume units
/// convert through a base unit (grams and millilitres) so grocery aggregation
/// can merge `500 g` and `1 kg` into one line. Everything else only merges
/// with itself.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Unit of measure
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "measurement_unit", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MeasurementUnit {
    Piece,
    Mg,
    G,
    Kg,
    Ml,
    L,
    Tsp,
    Tbsp,
    Cup,
    FlOz,
    Pint,
    Quart,
    Gallon,
    Oz,
    Lb,
    Pinch,
    Dash,
    Clove,
    Can,
    Package,
    Bunch,
    Slice,
}

/// Broad grouping of units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitFamily {
    Count,
    Mass,
    Volume,
    Other,
}

/// Error returned when a unit alias is not recognised
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown measurement unit: {0}")]
pub struct UnknownUnit(pub String);

impl MeasurementUnit {
    /// All units in declaration order
    pub const ALL: [MeasurementUnit; 22] = [
        MeasurementUnit::Piece,
        MeasurementUnit::Mg,
        MeasurementUnit::G,
        MeasurementUnit::Kg,
        MeasurementUnit::Ml,
        MeasurementUnit::L,
        MeasurementUnit::Tsp,
        MeasurementUnit::Tbsp,
        MeasurementUnit::Cup,
        MeasurementUnit::FlOz,
        MeasurementUnit::Pint,
        MeasurementUnit::Quart,
        MeasurementUnit::Gallon,
        MeasurementUnit::Oz,
        MeasurementUnit::Lb,
        MeasurementUnit::Pinch,
        MeasurementUnit::Dash,
        MeasurementUnit::Clove,
        MeasurementUnit::Can,
        MeasurementUnit::Package,
        MeasurementUnit::Bunch,
        MeasurementUnit::Slice,
    ];

    /// Canonical short form, matching the database and JSON representation
    pub fn as_str(&self) -> &'static str {
        match self {
            MeasurementUnit::Piece => "piece",
            MeasurementUnit::Mg => "mg",
            MeasurementUnit::G => "g",
            MeasurementUnit::Kg => "kg",
            MeasurementUnit::Ml => "ml",
            MeasurementUnit::L => "l",
            MeasurementUnit::Tsp => "tsp",
            MeasurementUnit::Tbsp => "tbsp",
            MeasurementUnit::Cup => "cup",
            MeasurementUnit::FlOz => "fl_oz",
            MeasurementUnit::Pint => "pint",
            MeasurementUnit::Quart => "quart",
            MeasurementUnit::Gallon => "gallon",
            MeasurementUnit::Oz => "oz",
            MeasurementUnit::Lb => "lb",
            MeasurementUnit::Pinch => "pinch",
            MeasurementUnit::Dash => "dash",
            MeasurementUnit::Clove => "clove",
            MeasurementUnit::Can => "can",
            MeasurementUnit::Package => "package",
            MeasurementUnit::Bunch => "bunch",
            MeasurementUnit::Slice => "slice",
        }
    }

    pub fn family(&self) -> UnitFamily {
        match self {
            MeasurementUnit::Mg
            | MeasurementUnit::G
            | MeasurementUnit::Kg
            | MeasurementUnit::Oz
            | MeasurementUnit::Lb => UnitFamily::Mass,
            MeasurementUnit::Ml
            | MeasurementUnit::L
            | MeasurementUnit::Tsp
            | MeasurementUnit::Tbsp
            | MeasurementUnit::Cup
            | MeasurementUnit::FlOz
            | MeasurementUnit::Pint
            | MeasurementUnit::Quart
            | MeasurementUnit::Gallon => UnitFamily::Volume,
            MeasurementUnit::Piece
            | MeasurementUnit::Clove
            | MeasurementUnit::Can
            | MeasurementUnit::Package
            | MeasurementUnit::Bunch
            | MeasurementUnit::Slice => UnitFamily::Count,
            MeasurementUnit::Pinch | MeasurementUnit::Dash => UnitFamily::Other,
        }
    }

    /// Metric base unit and the factor to convert into it
    ///
    /// Only metric mass (mg, g, kg → g) and metric volume (ml, l → ml) have a
    /// base. Imperial and count units return `None`.
    pub fn metric_base(&self) -> Option<(MeasurementUnit, f64)> {
        let base = match self.family() {
            UnitFamily::Mass => MeasurementUnit::G,
            UnitFamily::Volume => MeasurementUnit::Ml,
            UnitFamily::Count | UnitFamily::Other => return None,
        };

        let factor = match self {
            MeasurementUnit::Mg => 0.001,
            MeasurementUnit::G | MeasurementUnit::Ml => 1.0,
            MeasurementUnit::Kg | MeasurementUnit::L => 1000.0,
            _ => return None,
        };

        Some((base, factor))
    }

    /// Parses a unit from the canonical form or a common alias
    ///
    /// Matching is case-insensitive and ignores a trailing period, except
    /// for `T` (tablespoon) vs `t` (teaspoon), the one alias pair where case
    /// carries meaning.
    pub fn from_alias(alias: &str) -> Option<MeasurementUnit> {
        let trimmed = alias.trim().trim_end_matches('.');
        match trimmed {
            "T" | "Tb" | "Tbs" => return Some(MeasurementUnit::Tbsp),
            "t" => return Some(MeasurementUnit::Tsp),
            _ => {}
        }

        let unit = match trimmed.to_lowercase().as_str() {
            "piece" | "pieces" | "pc" | "pcs" | "whole" | "each" | "ea" => MeasurementUnit::Piece,
            "mg" | "milligram" | "milligrams" => MeasurementUnit::Mg,
            "g" | "gr" | "gram" | "grams" | "gramme" | "grammes" => MeasurementUnit::G,
            "kg" | "kilo" | "kilos" | "kilogram" | "kilograms" => MeasurementUnit::Kg,
            "ml" | "milliliter" | "milliliters" | "millilitre" | "millilitres" => {
                MeasurementUnit::Ml
            }
            "l" | "liter" | "liters" | "litre" | "litres" => MeasurementUnit::L,
            "tsp" | "tsps" | "teaspoon" | "teaspoons" => MeasurementUnit::Tsp,
            "tbsp" | "tbsps" | "tablespoon" | "tablespoons" | "tbl" => MeasurementUnit::Tbsp,
            "cup" | "cups" | "c" => MeasurementUnit::Cup,
            "fl_oz" | "fl oz" | "floz" | "fluid ounce" | "fluid ounces" => MeasurementUnit::FlOz,
            "pint" | "pints" | "pt" => MeasurementUnit::Pint,
            "quart" | "quarts" | "qt" => MeasurementUnit::Quart,
            "gallon" | "gallons" | "gal" => MeasurementUnit::Gallon,
            "oz" | "ounce" | "ounces" => MeasurementUnit::Oz,
            "lb" | "lbs" | "pound" | "pounds" => MeasurementUnit::Lb,
            "pinch" | "pinches" => MeasurementUnit::Pinch,
            "dash" | "dashes" => MeasurementUnit::Dash,
            "clove" | "cloves" => MeasurementUnit::Clove,
            "can" | "cans" | "tin" | "tins" => MeasurementUnit::Can,
            "package" | "packages" | "pkg" | "pack" | "packet" | "packets" => {
                MeasurementUnit::Package
            }
            "bunch" | "bunches" => MeasurementUnit::Bunch,
            "slice" | "slices" => MeasurementUnit::Slice,
            _ => return None,
        };

        Some(unit)
    }
}

impl fmt::Display for MeasurementUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MeasurementUnit {
    type Err = UnknownUnit;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MeasurementUnit::from_alias(s).ok_or_else(|| UnknownUnit(s.to_string()))
    }
}
