//! Trade direction with direction-aware price comparisons.
//!
//! Shared by the risk setup builder and the exit test so the sign logic for
//! longs and shorts lives in exactly one place.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Long,
    Short,
}

impl Side {
    /// +1.0 for longs, -1.0 for shorts.
    pub fn sign(self) -> f64 {
        match self {
            Side::Long => 1.0,
            Side::Short => -1.0,
        }
    }

    /// Integer signal encoding: 1 long, -1 short.
    pub fn as_i8(self) -> i8 {
        match self {
            Side::Long => 1,
            Side::Short => -1,
        }
    }

    /// True when `price` has reached `level` moving against the position.
    pub fn is_adverse(self, price: f64, level: f64) -> bool {
        match self {
            Side::Long => price <= level,
            Side::Short => price >= level,
        }
    }

    /// True when `price` has reached `level` moving in favour of the position.
    pub fn is_favorable(self, price: f64, level: f64) -> bool {
        match self {
            Side::Long => price >= level,
            Side::Short => price <= level,
        }
    }

    /// The bar extreme that tests the stop: low for longs, high for shorts.
    pub fn adverse_extreme(self, high: f64, low: f64) -> f64 {
        match self {
            Side::Long => low,
            Side::Short => high,
        }
    }

    /// The bar extreme that tests the target: high for longs, low for shorts.
    pub fn favorable_extreme(self, high: f64, low: f64) -> f64 {
        match self {
            Side::Long => high,
            Side::Short => low,
        }
    }

    /// Move `distance` away from `price` in the profitable direction.
    pub fn offset(self, price: f64, distance: f64) -> f64 {
        price + self.sign() * distance
    }

    /// Signed move from `from` to `to`, positive when profitable.
    pub fn gain(self, from: f64, to: f64) -> f64 {
        (to - from) * self.sign()
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Long => write!(f, "long"),
            Side::Short => write!(f, "short"),
        }
    }
}
