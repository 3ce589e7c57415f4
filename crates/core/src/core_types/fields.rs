//! Field data containers for gridded atmospheric quantities
//!
//! This module defines the two array shapes the pipeline works with: a 2D
//! surface field on the `nlat x nlon` grid and a 3D level field with an
//! additional model-level axis. Both store values as flat `Vec<f64>` in
//! row-major order; f64 is required because the budget algebra subtracts
//! near-equal terms of order 1e5 Pa.

use serde::{Deserialize, Serialize};

/// 2D field on the horizontal grid, latitude rows by longitude columns.
///
/// Stored as a flat `Vec<f64>` in row-major order (`lat * nlon + lon`).
/// Latitude index 0 is the northernmost row, matching the grid convention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceField {
    /// Field values in row-major order (lat * nlon + lon)
    pub data: Vec<f64>,
    /// Number of latitude rows
    pub nlat: usize,
    /// Number of longitude columns
    pub nlon: usize,
}

impl SurfaceField {
    /// Create a new field with given dimensions, initialized to zero
    #[must_use]
    pub fn new(nlat: usize, nlon: usize) -> Self {
        Self {
            data: vec![0.0; nlat * nlon],
            nlat,
            nlon,
        }
    }

    /// Create a new field with given dimensions, initialized to a value
    #[must_use]
    pub fn with_value(nlat: usize, nlon: usize, value: f64) -> Self {
        Self {
            data: vec![value; nlat * nlon],
            nlat,
            nlon,
        }
    }

    /// Get reference to field data
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Get mutable reference to field data
    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    /// Get value at grid position
    ///
    /// # Panics
    ///
    /// Panics if coordinates are out of bounds
    #[must_use]
    pub fn get(&self, lat: usize, lon: usize) -> f64 {
        assert!(
            lat < self.nlat && lon < self.nlon,
            "Coordinates out of bounds"
        );
        self.data[lat * self.nlon + lon]
    }

    /// Set value at grid position
    ///
    /// # Panics
    ///
    /// Panics if coordinates are out of bounds
    pub fn set(&mut self, lat: usize, lon: usize, value: f64) {
        assert!(
            lat < self.nlat && lon < self.nlon,
            "Coordinates out of bounds"
        );
        self.data[lat * self.nlon + lon] = value;
    }

    /// View one latitude row as a slice of `nlon` values
    ///
    /// # Panics
    ///
    /// Panics if the row index is out of bounds
    #[must_use]
    pub fn row(&self, lat: usize) -> &[f64] {
        assert!(lat < self.nlat, "Coordinates out of bounds");
        &self.data[lat * self.nlon..(lat + 1) * self.nlon]
    }

    /// Mutable view of one latitude row
    ///
    /// # Panics
    ///
    /// Panics if the row index is out of bounds
    pub fn row_mut(&mut self, lat: usize) -> &mut [f64] {
        assert!(lat < self.nlat, "Coordinates out of bounds");
        &mut self.data[lat * self.nlon..(lat + 1) * self.nlon]
    }

    /// Fill entire field with a value
    pub fn fill(&mut self, value: f64) {
        self.data.fill(value);
    }

    /// Add another field element-wise, in place
    ///
    /// Used by the streaming pool accumulators.
    ///
    /// # Panics
    ///
    /// Panics if dimensions differ
    pub fn accumulate(&mut self, other: &Self) {
        assert!(
            self.nlat == other.nlat && self.nlon == other.nlon,
            "Field dimensions do not match"
        );
        for (dst, src) in self.data.iter_mut().zip(&other.data) {
            *dst += src;
        }
    }

    /// Multiply every value by a scalar, in place
    pub fn scale(&mut self, factor: f64) {
        for v in &mut self.data {
            *v *= factor;
        }
    }

    /// Sum over the longitude axis, producing one value per latitude row
    #[must_use]
    pub fn zonal_sum(&self) -> Vec<f64> {
        (0..self.nlat)
            .map(|lat| self.row(lat).iter().sum())
            .collect()
    }
}

/// 3D field resolved on model levels, shaped `[nlev, nlat, nlon]`.
///
/// Level index 0 is the top of the atmosphere, `nlev - 1` the lowest model
/// level, matching the half-level coefficient ordering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelField {
    /// Field values, level-major then row-major (level * nlat * nlon + lat * nlon + lon)
    pub data: Vec<f64>,
    /// Number of model levels
    pub nlev: usize,
    /// Number of latitude rows
    pub nlat: usize,
    /// Number of longitude columns
    pub nlon: usize,
}

impl LevelField {
    /// Create a new level field with given dimensions, initialized to zero
    #[must_use]
    pub fn new(nlev: usize, nlat: usize, nlon: usize) -> Self {
        Self {
            data: vec![0.0; nlev * nlat * nlon],
            nlev,
            nlat,
            nlon,
        }
    }

    /// Create a new level field with given dimensions, initialized to a value
    #[must_use]
    pub fn with_value(nlev: usize, nlat: usize, nlon: usize, value: f64) -> Self {
        Self {
            data: vec![value; nlev * nlat * nlon],
            nlev,
            nlat,
            nlon,
        }
    }

    /// Get value at (level, lat, lon)
    ///
    /// # Panics
    ///
    /// Panics if coordinates are out of bounds
    #[must_use]
    pub fn get(&self, level: usize, lat: usize, lon: usize) -> f64 {
        assert!(
            level < self.nlev && lat < self.nlat && lon < self.nlon,
            "Coordinates out of bounds"
        );
        self.data[(level * self.nlat + lat) * self.nlon + lon]
    }

    /// Set value at (level, lat, lon)
    ///
    /// # Panics
    ///
    /// Panics if coordinates are out of bounds
    pub fn set(&mut self, level: usize, lat: usize, lon: usize, value: f64) {
        assert!(
            level < self.nlev && lat < self.nlat && lon < self.nlon,
            "Coordinates out of bounds"
        );
        self.data[(level * self.nlat + lat) * self.nlon + lon] = value;
    }

    /// View one level as a slice of `nlat * nlon` values
    ///
    /// # Panics
    ///
    /// Panics if the level index is out of bounds
    #[must_use]
    pub fn level(&self, level: usize) -> &[f64] {
        assert!(level < self.nlev, "Coordinates out of bounds");
        let layer = self.nlat * self.nlon;
        &self.data[level * layer..(level + 1) * layer]
    }

    /// Mutable view of one level
    ///
    /// # Panics
    ///
    /// Panics if the level index is out of bounds
    pub fn level_mut(&mut self, level: usize) -> &mut [f64] {
        assert!(level < self.nlev, "Coordinates out of bounds");
        let layer = self.nlat * self.nlon;
        &mut self.data[level * layer..(level + 1) * layer]
    }

    /// Fill entire field with a value
    pub fn fill(&mut self, value: f64) {
        self.data.fill(value);
    }
}
