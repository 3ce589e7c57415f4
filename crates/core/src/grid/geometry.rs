//! Horizontal grid geometry on the sphere
//!
//! Derives the finite-difference spacings from the latitude array and the
//! Earth radius. The grid is latitude-major, ordered north to south (+90 to
//! -90), with longitude west to east over [0, 360) and periodic wraparound.
//!
//! # Formula
//!
//! ```text
//! dx[j] = 2 * pi * R * cos(lat[j]) / nlon     (zonal spacing per row)
//! dy    = pi * R / (nlat - 1)                 (meridional spacing, uniform)
//! ```
//!
//! `dx` degenerates toward zero at the pole rows; the divergence operator
//! handles those rows with one-sided meridional differences instead of
//! leaning on the vanishing zonal spacing.

use serde::{Deserialize, Serialize};

use crate::core_types::units::Meters;
use crate::physics::constants::EARTH_RADIUS;

/// Grid dimensions plus derived finite-difference spacings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridGeometry {
    /// Latitude of each row in degrees, strictly decreasing north to south
    latitude: Vec<f64>,
    /// Number of longitude columns
    nlon: usize,
    /// Zonal grid length per latitude row [m]
    dx: Vec<f64>,
    /// Meridional grid length [m]
    dy: f64,
}

impl GridGeometry {
    /// Build the geometry for a given latitude array and longitude count.
    ///
    /// # Panics
    ///
    /// Panics if fewer than 2 rows or columns are given, or if the latitude
    /// array is not strictly decreasing (the grid must run north to south).
    #[must_use]
    pub fn new(radius: Meters, latitude: Vec<f64>, nlon: usize) -> Self {
        let nlat = latitude.len();
        assert!(nlat >= 2, "GridGeometry requires at least 2 latitude rows");
        assert!(nlon >= 2, "GridGeometry requires at least 2 longitude columns");
        assert!(
            latitude.windows(2).all(|pair| pair[0] > pair[1]),
            "Latitude must decrease strictly from north to south"
        );

        let r = radius.value();
        let dx = latitude
            .iter()
            .map(|lat| 2.0 * std::f64::consts::PI * r * lat.to_radians().cos() / nlon as f64)
            .collect();
        let dy = std::f64::consts::PI * r / (nlat - 1) as f64;

        Self {
            latitude,
            nlon,
            dx,
            dy,
        }
    }

    /// Evenly spaced latitude rows from +90 to -90 inclusive, Earth radius.
    ///
    /// Production grids carry their own (Gaussian) latitude arrays; this
    /// helper serves tests and synthetic runs.
    #[must_use]
    pub fn regular(nlat: usize, nlon: usize) -> Self {
        assert!(nlat >= 2, "GridGeometry requires at least 2 latitude rows");
        let step = 180.0 / (nlat - 1) as f64;
        let latitude = (0..nlat).map(|j| 90.0 - j as f64 * step).collect();
        Self::new(Meters::new(EARTH_RADIUS), latitude, nlon)
    }

    /// Number of latitude rows
    #[must_use]
    pub fn nlat(&self) -> usize {
        self.latitude.len()
    }

    /// Number of longitude columns
    #[must_use]
    pub fn nlon(&self) -> usize {
        self.nlon
    }

    /// Latitude of each row in degrees, north to south
    #[must_use]
    pub fn latitude(&self) -> &[f64] {
        &self.latitude
    }

    /// Zonal grid length per latitude row [m]
    #[must_use]
    pub fn dx(&self) -> &[f64] {
        &self.dx
    }

    /// Meridional grid length [m]
    #[must_use]
    pub fn dy(&self) -> f64 {
        self.dy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_regular_grid_spans_pole_to_pole() {
        let geo = GridGeometry::regular(5, 8);
        assert_eq!(geo.latitude(), &[90.0, 45.0, 0.0, -45.0, -90.0]);
        assert_eq!(geo.nlat(), 5);
        assert_eq!(geo.nlon(), 8);
    }

    #[test]
    fn test_zonal_spacing_max_at_equator() {
        let geo = GridGeometry::regular(5, 8);
        // Equator row: full circumference over nlon columns
        let expected = 2.0 * std::f64::consts::PI * EARTH_RADIUS / 8.0;
        assert_relative_eq!(geo.dx()[2], expected, max_relative = 1e-12);
        // cos(45 deg) shrinks the mid-latitude rows
        assert_relative_eq!(
            geo.dx()[1],
            expected * std::f64::consts::FRAC_1_SQRT_2,
            max_relative = 1e-12
        );
    }

    #[test]
    fn test_zonal_spacing_degenerates_at_poles() {
        let geo = GridGeometry::regular(5, 8);
        // cos(90 deg) is not exactly zero in floating point, but the pole
        // rows must come out many orders of magnitude below the equator row
        assert!(geo.dx()[0] < geo.dx()[2] * 1e-15);
        assert!(geo.dx()[4] < geo.dx()[2] * 1e-15);
    }

    #[test]
    fn test_meridional_spacing() {
        let geo = GridGeometry::regular(5, 8);
        let expected = std::f64::consts::PI * EARTH_RADIUS / 4.0;
        assert_relative_eq!(geo.dy(), expected, max_relative = 1e-12);
    }

    #[test]
    #[should_panic(expected = "north to south")]
    fn test_rejects_south_to_north_ordering() {
        let _ = GridGeometry::new(Meters::new(EARTH_RADIUS), vec![-90.0, 0.0, 90.0], 4);
    }

    #[test]
    #[should_panic(expected = "at least 2 latitude rows")]
    fn test_rejects_single_row() {
        let _ = GridGeometry::new(Meters::new(EARTH_RADIUS), vec![0.0], 4);
    }
}
