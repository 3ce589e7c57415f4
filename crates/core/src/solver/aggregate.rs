//! Assembly of the final transport products
//!
//! Takes the batch time-means and the closed mass budget and produces the
//! deliverable fields: barotropic-corrected energy transport per grid point
//! in terawatts, zonal (per-latitude) profiles, the correction wind pair,
//! and the budget diagnostics. Only the meridional correction component
//! enters the energy correction; the zonal component is reported for
//! inspection but never subtracted.
//!
//! # Formula
//!
//! ```text
//! correction_X = vc * mean(bare_X)
//! E_X[j, k]    = (mean_flux_X[j, k] - correction_X[j, k]) * dx[j] / 1e12
//! E[j, k]      = E_cpT + E_Lvq + E_gz + E_uv2
//! zonal_X[j]   = sum_k E_X[j, k]
//! zonal_E[j]   = zonal_cpT + zonal_Lvq + zonal_gz + zonal_uv2
//! ```
//!
//! The total profile is the sum of the component profiles, not the zonal
//! sum of the total field; the two differ in the last ulps and the archive
//! carries the former.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::core_types::fields::SurfaceField;
use crate::grid::geometry::GridGeometry;
use crate::physics::budget::BudgetSolution;
use crate::physics::constants::WATTS_PER_TERAWATT;
use crate::solver::pools::PoolMeans;

/// Barotropic correction wind components, `m/s`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrectionWind {
    /// Zonal correction component (diagnostic only)
    pub uc: SurfaceField,
    /// Meridional correction component, applied to every energy term
    pub vc: SurfaceField,
}

/// Corrected meridional energy transport per grid point, in terawatts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportPointFields {
    /// Total transport, the sum of the four components
    pub total: SurfaceField,
    /// Internal-energy component
    pub internal: SurfaceField,
    /// Latent-heat component
    pub latent: SurfaceField,
    /// Geopotential component
    pub geopotential: SurfaceField,
    /// Kinetic-energy component
    pub kinetic: SurfaceField,
}

/// Zonally summed transport, one value per latitude row, in terawatts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportProfile {
    /// Total transport per latitude
    pub total: Vec<f64>,
    /// Internal-energy component per latitude
    pub internal: Vec<f64>,
    /// Latent-heat component per latitude
    pub latent: Vec<f64>,
    /// Geopotential component per latitude
    pub geopotential: Vec<f64>,
    /// Kinetic-energy component per latitude
    pub kinetic: Vec<f64>,
}

/// Closure residuals kept alongside the products for inspection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetDiagnostics {
    /// Evaporation minus precipitation proxy, `kg m^-2 s^-1`
    pub e_minus_p: SurfaceField,
    /// Mass residual the correction wind was derived from, `Pa s^-1`
    pub mass_residual: SurfaceField,
    /// Count of near-degenerate denominators encountered during closure
    pub degenerate_denominators: usize,
}

/// Complete output of one batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportAnalysis {
    /// Latitude of each row, degrees north
    pub latitude: Vec<f64>,
    /// Per-point corrected transport fields
    pub point: TransportPointFields,
    /// Per-latitude zonal sums
    pub zonal: TransportProfile,
    /// Correction wind pair
    pub correction: CorrectionWind,
    /// Budget closure diagnostics
    pub diagnostics: BudgetDiagnostics,
}

/// Output names matching the historical archive layout, with units.
pub const NAMED_OUTPUTS: [(&str, &str); 7] = [
    ("E", "tera watt"),
    ("E_cpT", "tera watt"),
    ("E_Lvq", "tera watt"),
    ("E_gz", "tera watt"),
    ("E_uv2", "tera watt"),
    ("uc", "m/s"),
    ("vc", "m/s"),
];

impl TransportAnalysis {
    /// Borrow every deliverable field under its archive name.
    #[must_use]
    pub fn named_fields(&self) -> FxHashMap<&'static str, &SurfaceField> {
        let mut map = FxHashMap::default();
        map.insert("E", &self.point.total);
        map.insert("E_cpT", &self.point.internal);
        map.insert("E_Lvq", &self.point.latent);
        map.insert("E_gz", &self.point.geopotential);
        map.insert("E_uv2", &self.point.kinetic);
        map.insert("uc", &self.correction.uc);
        map.insert("vc", &self.correction.vc);
        map
    }

    /// Unit string for a named output, if the name is known
    #[must_use]
    pub fn unit_of(name: &str) -> Option<&'static str> {
        NAMED_OUTPUTS
            .iter()
            .find(|(candidate, _)| *candidate == name)
            .map(|(_, unit)| *unit)
    }

    /// Latitude and value of the largest northward total transport
    #[must_use]
    pub fn peak_northward(&self) -> Option<(f64, f64)> {
        self.peak_by(|value| value)
    }

    /// Latitude and value of the largest southward total transport
    #[must_use]
    pub fn peak_southward(&self) -> Option<(f64, f64)> {
        self.peak_by(|value| -value)
    }

    fn peak_by(&self, key: impl Fn(f64) -> f64) -> Option<(f64, f64)> {
        self.latitude
            .iter()
            .zip(self.zonal.total.iter())
            .max_by(|(_, a), (_, b)| key(**a).total_cmp(&key(**b)))
            .map(|(lat, value)| (*lat, *value))
    }
}

/// Apply the meridional correction and convert to transport products.
#[must_use]
pub fn assemble_analysis(
    means: &PoolMeans,
    solution: BudgetSolution,
    geometry: &GridGeometry,
) -> TransportAnalysis {
    let nlat = geometry.nlat();
    let nlon = geometry.nlon();
    let dx = geometry.dx();

    let mut internal = SurfaceField::new(nlat, nlon);
    let mut latent = SurfaceField::new(nlat, nlon);
    let mut geopotential = SurfaceField::new(nlat, nlon);
    let mut kinetic = SurfaceField::new(nlat, nlon);
    let mut total = SurfaceField::new(nlat, nlon);

    for j in 0..nlat {
        let scale = dx[j] / WATTS_PER_TERAWATT;
        for k in 0..nlon {
            let vc = solution.vc.get(j, k);
            let e_internal = (means.internal.get(j, k) - vc * means.bare_heat.get(j, k)) * scale;
            let e_latent = (means.latent.get(j, k) - vc * means.bare_vapor.get(j, k)) * scale;
            let e_geo = (means.geopotential.get(j, k) - vc * means.bare_geo.get(j, k)) * scale;
            let e_kinetic = (means.kinetic.get(j, k) - vc * means.bare_velocity.get(j, k)) * scale;
            internal.set(j, k, e_internal);
            latent.set(j, k, e_latent);
            geopotential.set(j, k, e_geo);
            kinetic.set(j, k, e_kinetic);
            total.set(j, k, e_internal + e_latent + e_geo + e_kinetic);
        }
    }

    let zonal_internal = internal.zonal_sum();
    let zonal_latent = latent.zonal_sum();
    let zonal_geopotential = geopotential.zonal_sum();
    let zonal_kinetic = kinetic.zonal_sum();
    let zonal_total = (0..nlat)
        .map(|j| zonal_internal[j] + zonal_latent[j] + zonal_geopotential[j] + zonal_kinetic[j])
        .collect();
    let zonal = TransportProfile {
        total: zonal_total,
        internal: zonal_internal,
        latent: zonal_latent,
        geopotential: zonal_geopotential,
        kinetic: zonal_kinetic,
    };

    TransportAnalysis {
        latitude: geometry.latitude().to_vec(),
        point: TransportPointFields {
            total,
            internal,
            latent,
            geopotential,
            kinetic,
        },
        zonal,
        correction: CorrectionWind {
            uc: solution.uc,
            vc: solution.vc,
        },
        diagnostics: BudgetDiagnostics {
            e_minus_p: solution.e_minus_p,
            mass_residual: solution.mass_residual,
            degenerate_denominators: solution.degenerate_denominators,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn uniform_means(nlat: usize, nlon: usize) -> PoolMeans {
        PoolMeans {
            internal: SurfaceField::with_value(nlat, nlon, 3.0e8),
            latent: SurfaceField::with_value(nlat, nlon, 4.0e7),
            geopotential: SurfaceField::with_value(nlat, nlon, 2.0e7),
            kinetic: SurfaceField::with_value(nlat, nlon, 1.0e6),
            bare_heat: SurfaceField::with_value(nlat, nlon, 2.5e7),
            bare_vapor: SurfaceField::with_value(nlat, nlon, 3.0e6),
            bare_geo: SurfaceField::with_value(nlat, nlon, 1.5e6),
            bare_velocity: SurfaceField::with_value(nlat, nlon, 8.0e4),
            div_moisture_u: SurfaceField::new(nlat, nlon),
            div_moisture_v: SurfaceField::new(nlat, nlon),
            div_mass_u: SurfaceField::new(nlat, nlon),
            div_mass_v: SurfaceField::new(nlat, nlon),
            precipitable_water: SurfaceField::with_value(nlat, nlon, 20.0),
            surface_pressure: SurfaceField::with_value(nlat, nlon, 100_000.0),
        }
    }

    fn zero_solution(nlat: usize, nlon: usize) -> BudgetSolution {
        BudgetSolution {
            e_minus_p: SurfaceField::new(nlat, nlon),
            mass_residual: SurfaceField::new(nlat, nlon),
            uc: SurfaceField::new(nlat, nlon),
            vc: SurfaceField::new(nlat, nlon),
            degenerate_denominators: 0,
        }
    }

    #[test]
    fn test_zero_correction_passes_means_through() {
        let geometry = GridGeometry::regular(5, 8);
        let means = uniform_means(5, 8);
        let analysis = assemble_analysis(&means, zero_solution(5, 8), &geometry);

        let j = 2;
        let expected = 3.0e8 * geometry.dx()[j] / WATTS_PER_TERAWATT;
        assert_relative_eq!(analysis.point.internal.get(j, 0), expected, max_relative = 1e-12);

        let expected_total = (3.0e8 + 4.0e7 + 2.0e7 + 1.0e6) * geometry.dx()[j] / WATTS_PER_TERAWATT;
        assert_relative_eq!(analysis.point.total.get(j, 3), expected_total, max_relative = 1e-12);
    }

    #[test]
    fn test_correction_subtracts_vc_weighted_bare_mean() {
        let geometry = GridGeometry::regular(5, 8);
        let means = uniform_means(5, 8);
        let mut solution = zero_solution(5, 8);
        solution.vc.fill(2.0);
        let analysis = assemble_analysis(&means, solution, &geometry);

        let j = 1;
        let expected = (3.0e8 - 2.0 * 2.5e7) * geometry.dx()[j] / WATTS_PER_TERAWATT;
        assert_relative_eq!(analysis.point.internal.get(j, 5), expected, max_relative = 1e-12);

        // The kinetic component uses its own correction variant
        let expected_kinetic = (1.0e6 - 2.0 * 8.0e4) * geometry.dx()[j] / WATTS_PER_TERAWATT;
        assert_relative_eq!(analysis.point.kinetic.get(j, 5), expected_kinetic, max_relative = 1e-12);
    }

    #[test]
    fn test_zonal_profile_sums_longitudes() {
        let geometry = GridGeometry::regular(5, 8);
        let means = uniform_means(5, 8);
        let analysis = assemble_analysis(&means, zero_solution(5, 8), &geometry);

        for j in 0..5 {
            // Both sums walk the longitude ring left to right, so the
            // results are bitwise equal.
            let by_hand: f64 = (0..8).map(|k| analysis.point.internal.get(j, k)).sum();
            assert_eq!(analysis.zonal.internal[j], by_hand);

            // The total profile is the sum of the component profiles
            let component_sum = analysis.zonal.internal[j]
                + analysis.zonal.latent[j]
                + analysis.zonal.geopotential[j]
                + analysis.zonal.kinetic[j];
            assert_eq!(analysis.zonal.total[j], component_sum);
        }
        assert_eq!(analysis.zonal.total.len(), 5);
    }

    #[test]
    fn test_total_is_sum_of_components() {
        let geometry = GridGeometry::regular(5, 8);
        let means = uniform_means(5, 8);
        let mut solution = zero_solution(5, 8);
        solution.vc.fill(-0.5);
        let analysis = assemble_analysis(&means, solution, &geometry);

        for j in 0..5 {
            for k in 0..8 {
                let sum = analysis.point.internal.get(j, k)
                    + analysis.point.latent.get(j, k)
                    + analysis.point.geopotential.get(j, k)
                    + analysis.point.kinetic.get(j, k);
                assert_relative_eq!(analysis.point.total.get(j, k), sum, max_relative = 1e-12);
            }
        }
    }

    #[test]
    fn test_named_fields_cover_archive_layout() {
        let geometry = GridGeometry::regular(3, 4);
        let analysis = assemble_analysis(&uniform_means(3, 4), zero_solution(3, 4), &geometry);
        let named = analysis.named_fields();
        for (name, _) in NAMED_OUTPUTS {
            assert!(named.contains_key(name), "Missing output {name}");
        }
        assert_eq!(TransportAnalysis::unit_of("E_Lvq"), Some("tera watt"));
        assert_eq!(TransportAnalysis::unit_of("vc"), Some("m/s"));
        assert_eq!(TransportAnalysis::unit_of("unknown"), None);
    }

    #[test]
    fn test_peak_lookup_reports_latitude() {
        let geometry = GridGeometry::regular(3, 4);
        let means = uniform_means(3, 4);
        let mut analysis = assemble_analysis(&means, zero_solution(3, 4), &geometry);
        analysis.zonal.total = vec![-4.0, 1.0, 6.0];

        let (lat_north, peak_north) = analysis.peak_northward().unwrap();
        assert_eq!(peak_north, 6.0);
        assert_eq!(lat_north, -90.0);

        let (lat_south, peak_south) = analysis.peak_southward().unwrap();
        assert_eq!(peak_south, -4.0);
        assert_eq!(lat_south, 90.0);
    }
}
