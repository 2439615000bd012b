//! Fixed-point math utilities for deterministic scheduling.
//!
//! Initiative scores mix a base stat, a small random jitter and a
//! speed-derived tiebreaker. Doing that in floating point would make turn
//! order depend on the CPU, so every score is a fixed-point number.

use fixed::types::I32F32;

/// Fixed-point number type for all scheduling math.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
pub type Fixed = I32F32;

/// Build a fixed-point value from a ratio of two integers.
///
/// `ratio(1, 10)` is the initiative jitter bound of 0.1.
#[must_use]
pub fn ratio(numerator: i32, denominator: i32) -> Fixed {
    if denominator == 0 {
        return Fixed::ZERO;
    }
    Fixed::from_num(numerator) / Fixed::from_num(denominator)
}

/// Serde support for fixed-point numbers.
///
/// Serializes fixed-point numbers as their raw bit representation (i64)
/// to preserve exact precision across serialization boundaries.
pub mod fixed_serde {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a fixed-point number as its raw bit representation.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_bits().serialize(serializer)
    }

    /// Deserialize a fixed-point number from its raw bit representation.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bits = i64::deserialize(deserializer)?;
        Ok(Fixed::from_bits(bits))
    }
}

/// Serde support for human-edited fixed-point values.
///
/// Config and scenario files are written by hand, so these values are read
/// as decimal literals (`0.1`, `4.5`) and converted once at load time.
pub mod decimal_serde {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a fixed-point number as a decimal literal.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_num::<f64>().serialize(serializer)
    }

    /// Deserialize a fixed-point number from a decimal literal.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = f64::deserialize(deserializer)?;
        Ok(Fixed::saturating_from_num(value))
    }
}
