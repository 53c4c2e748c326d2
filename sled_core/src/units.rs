//! Mass unit conversion with grams as the pivot unit.
//!
//! Recognized units are "g", "kg", "oz" and "lb" (with "lbs" accepted as an
//! alias). Unknown unit strings pass the value through unchanged rather than
//! erroring. Conversion out of grams multiplies by fixed reciprocal constants
//! instead of dividing, so round trips are only accurate to about 1e-6
//! relative.

pub const GRAMS_PER_OUNCE: f64 = 28.3495;
pub const GRAMS_PER_POUND: f64 = 453.592;
pub const OUNCES_PER_GRAM: f64 = 0.035_273_961_95;
pub const POUNDS_PER_GRAM: f64 = 0.002_204_622_62;

/// Convert `value` from `from_unit` into grams.
#[inline]
pub fn to_grams(value: f64, from_unit: &str) -> f64 {
    match from_unit {
        "kg" => value * 1000.0,
        "oz" => value * GRAMS_PER_OUNCE,
        "lb" | "lbs" => value * GRAMS_PER_POUND,
        // "g" and unrecognized units are taken as-is
        _ => value,
    }
}

/// Convert a gram `value` into `to_unit`.
#[inline]
pub fn from_grams(value: f64, to_unit: &str) -> f64 {
    match to_unit {
        "g" => value,
        "kg" => value / 1000.0,
        "oz" => value * OUNCES_PER_GRAM,
        "lb" | "lbs" => value * POUNDS_PER_GRAM,
        // unrecognized target units leave the gram value unchanged
        _ => value,
    }
}

/// Convert `value` between two units via grams.
#[inline]
pub fn convert(value: f64, from_unit: &str, to_unit: &str) -> f64 {
    from_grams(to_grams(value, from_unit), to_unit)
}
