//! Semantic unit types for type-safe physical quantity handling
//!
//! This module provides newtype wrappers for the scalar quantities that cross
//! API seams: grid spacing and Earth radius in meters, pressure thresholds in
//! pascals, transport magnitudes in terawatts. Gridded arrays stay plain f64;
//! wrapping every array element would bury the numerics.
//!
//! # Design Philosophy
//! - All quantities use f64 (the budget algebra needs the precision)
//! - Total ordering via Ord trait (`total_cmp`, NaN ordered after all values)
//! - Private inner fields with validated constructors
//! - Serde support for serialization

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Deref, Neg, Sub};

// ============================================================================
// LENGTH
// ============================================================================

/// Length or distance in meters.
///
/// Used for the Earth radius and the finite-difference grid spacings.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Meters(f64);

impl Eq for Meters {}

impl PartialOrd for Meters {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Meters {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl Deref for Meters {
    type Target = f64;
    #[inline]
    fn deref(&self) -> &f64 {
        &self.0
    }
}

impl Meters {
    /// Create a new length. Asserts the value is non-negative.
    #[inline]
    #[must_use]
    #[track_caller]
    pub const fn new(value: f64) -> Self {
        assert!(value >= 0.0, "Meters::new: length cannot be negative");
        Meters(value)
    }

    /// Raw value in meters
    #[inline]
    #[must_use]
    pub const fn value(self) -> f64 {
        self.0
    }
}

impl Add for Meters {
    type Output = Meters;
    fn add(self, rhs: Meters) -> Meters {
        Meters(self.0 + rhs.0)
    }
}

impl fmt::Display for Meters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} m", self.0)
    }
}

// ============================================================================
// PRESSURE
// ============================================================================

/// Pressure in pascals.
///
/// Used for surface-pressure magnitudes and the degeneracy floor on the
/// correction-wind denominator.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Pascals(f64);

impl Eq for Pascals {}

impl PartialOrd for Pascals {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Pascals {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl Deref for Pascals {
    type Target = f64;
    #[inline]
    fn deref(&self) -> &f64 {
        &self.0
    }
}

impl Pascals {
    /// Standard sea-level pressure
    pub const STANDARD_ATMOSPHERE: Pascals = Pascals(101_325.0);

    /// Create a new pressure. Asserts the value is non-negative.
    #[inline]
    #[must_use]
    #[track_caller]
    pub const fn new(value: f64) -> Self {
        assert!(value >= 0.0, "Pascals::new: pressure cannot be negative");
        Pascals(value)
    }

    /// Raw value in pascals
    #[inline]
    #[must_use]
    pub const fn value(self) -> f64 {
        self.0
    }
}

impl fmt::Display for Pascals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} Pa", self.0)
    }
}

// ============================================================================
// ENERGY TRANSPORT
// ============================================================================

/// Energy transport in terawatts (1e12 W).
///
/// Signed: positive is northward, negative southward, following the
/// meridional-transport sign convention.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Terawatts(f64);

impl Eq for Terawatts {}

impl PartialOrd for Terawatts {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Terawatts {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl Deref for Terawatts {
    type Target = f64;
    #[inline]
    fn deref(&self) -> &f64 {
        &self.0
    }
}

impl Terawatts {
    /// Create a new transport value. Asserts the value is finite.
    #[inline]
    #[must_use]
    #[track_caller]
    pub fn new(value: f64) -> Self {
        assert!(value.is_finite(), "Terawatts::new: value must be finite");
        Terawatts(value)
    }

    /// Raw value in terawatts
    #[inline]
    #[must_use]
    pub const fn value(self) -> f64 {
        self.0
    }

    /// Convert to petawatts (the usual plotting scale for meridional transport)
    #[inline]
    #[must_use]
    pub const fn to_petawatts(self) -> f64 {
        self.0 / 1000.0
    }
}

impl Add for Terawatts {
    type Output = Terawatts;
    fn add(self, rhs: Terawatts) -> Terawatts {
        Terawatts(self.0 + rhs.0)
    }
}

impl Sub for Terawatts {
    type Output = Terawatts;
    fn sub(self, rhs: Terawatts) -> Terawatts {
        Terawatts(self.0 - rhs.0)
    }
}

impl Neg for Terawatts {
    type Output = Terawatts;
    fn neg(self) -> Terawatts {
        Terawatts(-self.0)
    }
}

impl fmt::Display for Terawatts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} TW", self.0)
    }
}
