//! Horizontal divergence on the lat-lon sphere grid
//!
//! Centered finite differences with two boundary treatments:
//!
//! - Longitude is periodic: the stencil wraps across the dateline, so the
//!   first and last columns difference against each other instead of
//!   falling back to one-sided forms.
//! - Latitude ends at the poles: the two pole rows use one-sided
//!   differences over the same `2 * dy` denominator.
//!
//! The meridional term carries a leading minus sign. Latitude index grows
//! north to south while y grows south to north, so the index-space
//! difference has the opposite sign of the spatial derivative:
//!
//! ```text
//! d(Fu)/dx ~  (Fu[j, k+1] - Fu[j, k-1]) / (2 * dx[j])      (k periodic)
//! d(Fv)/dy ~ -(Fv[j+1, k] - Fv[j-1, k]) / (2 * dy)         (interior j)
//!            -(Fv[1, k]   - Fv[0, k])   / (2 * dy)         (j = 0)
//!            -(Fv[J, k]   - Fv[J-1, k]) / (2 * dy)         (j = J = nlat-1)
//! ```
//!
//! `dx` shrinks toward zero at the pole rows; the zonal term still divides
//! by it there, which is safe only because the numerator vanishes for
//! zonally uniform fields. The budget stage forces the meridional
//! correction wind to zero at the poles for the same reason.

use crate::core_types::fields::SurfaceField;

/// Zonal contribution to the divergence, periodic in longitude.
///
/// # Panics
///
/// Panics if `dx` does not provide one spacing per latitude row.
#[must_use]
pub fn divergence_zonal(flux: &SurfaceField, dx: &[f64]) -> SurfaceField {
    let (nlat, nlon) = (flux.nlat, flux.nlon);
    assert_eq!(dx.len(), nlat, "dx must have one entry per latitude row");

    let mut div = SurfaceField::new(nlat, nlon);
    for j in 0..nlat {
        let row = flux.row(j);
        let out = div.row_mut(j);
        let denom = 2.0 * dx[j];
        for k in 0..nlon {
            let east = if k == nlon - 1 { row[0] } else { row[k + 1] };
            let west = if k == 0 { row[nlon - 1] } else { row[k - 1] };
            out[k] = (east - west) / denom;
        }
    }
    div
}

/// Meridional contribution to the divergence, one-sided at the pole rows.
///
/// # Panics
///
/// Panics if the field has fewer than 2 latitude rows.
#[must_use]
pub fn divergence_meridional(flux: &SurfaceField, dy: f64) -> SurfaceField {
    let (nlat, nlon) = (flux.nlat, flux.nlon);
    assert!(nlat >= 2, "Meridional divergence needs at least 2 rows");

    let mut div = SurfaceField::new(nlat, nlon);
    let denom = 2.0 * dy;
    for j in 0..nlat {
        let south = flux.row(if j == nlat - 1 { nlat - 1 } else { j + 1 });
        let north = flux.row(if j == 0 { 0 } else { j - 1 });
        let out = div.row_mut(j);
        for k in 0..nlon {
            out[k] = -(south[k] - north[k]) / denom;
        }
    }
    div
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_field_has_zero_zonal_divergence() {
        // Includes the pole rows, where dx is vanishingly small: the
        // wraparound numerator must be exactly zero so no artifact appears
        let flux = SurfaceField::with_value(4, 8, 42.0);
        let dx = vec![1e-10, 1.0, 1.0, 1e-10];
        let div = divergence_zonal(&flux, &dx);
        assert!(
            div.data.iter().all(|&v| v == 0.0),
            "constant field must produce exactly zero zonal divergence"
        );
    }

    #[test]
    fn test_constant_field_has_zero_meridional_divergence() {
        let flux = SurfaceField::with_value(4, 8, -7.5);
        let div = divergence_meridional(&flux, 1000.0);
        assert!(div.data.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_zonal_wraparound_stencil() {
        // One sine period sampled at 4 points: [0, 1, 0, -1]
        let mut flux = SurfaceField::new(2, 4);
        for j in 0..2 {
            flux.row_mut(j).copy_from_slice(&[0.0, 1.0, 0.0, -1.0]);
        }
        let div = divergence_zonal(&flux, &[2.0, 2.0]);
        for j in 0..2 {
            assert_eq!(div.get(j, 0), 0.5, "wrap at west edge");
            assert_eq!(div.get(j, 1), 0.0);
            assert_eq!(div.get(j, 2), -0.5);
            assert_eq!(div.get(j, 3), 0.0, "wrap at east edge");
        }
    }

    #[test]
    fn test_meridional_interior_and_pole_stencils() {
        // Flux increasing with row index (i.e. toward the south)
        let mut flux = SurfaceField::new(3, 2);
        flux.row_mut(0).fill(0.0);
        flux.row_mut(1).fill(1.0);
        flux.row_mut(2).fill(2.0);
        let dy = 10.0;
        let div = divergence_meridional(&flux, dy);

        // North pole row: one-sided over rows 0..=1, same 2*dy denominator
        assert_eq!(div.get(0, 0), -(1.0 - 0.0) / (2.0 * dy));
        // Interior row: centered over rows 0 and 2
        assert_eq!(div.get(1, 0), -(2.0 - 0.0) / (2.0 * dy));
        // South pole row: one-sided over rows 1..=2
        assert_eq!(div.get(2, 1), -(2.0 - 1.0) / (2.0 * dy));
    }

    #[test]
    fn test_meridional_sign_convention() {
        // Northward flux growing toward the north (decreasing row index)
        // piles mass up southward in index space: divergence is positive
        let mut flux = SurfaceField::new(3, 1);
        flux.row_mut(0).fill(3.0);
        flux.row_mut(1).fill(2.0);
        flux.row_mut(2).fill(1.0);
        let div = divergence_meridional(&flux, 0.5);
        assert!(div.data.iter().all(|&v| v > 0.0));
    }
}
