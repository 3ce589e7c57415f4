//! Vertical integration of energy and mass fluxes
//!
//! One time step in, thirteen column-integrated surface fields out. Every
//! integral is a plain sum over model levels weighted by the layer pressure
//! thickness, divided once by g:
//!
//! ```text
//! internal      = sum_k( cp * v * T  * dp ) / g      [W/m, per meter of zonal width]
//! latent        = sum_k( Lv * v * q  * dp ) / g
//! geopotential  = sum_k(      v * gz * dp ) / g
//! kinetic       = sum_k( v * (u^2 + v^2)/2 * dp ) / g
//! ```
//!
//! The four "bare" variants drop the meridional-wind factor; they are the
//! quantities the barotropic correction wind later multiplies:
//!
//! ```text
//! bare_heat     = sum_k( cp * T  * dp ) / g
//! bare_vapor    = sum_k( Lv * q  * dp ) / g
//! bare_geo      = sum_k(      gz * dp ) / g
//! bare_velocity = sum_k( (u^2 + v^2)/2 * dp ) / g
//! ```
//!
//! Moisture and mass fluxes feed the budget closure, and the precipitable
//! water column enters the correction-wind denominator:
//!
//! ```text
//! moisture_u/v  = sum_k( u_or_v * q * dp ) / g
//! mass_u/v      = sum_k( u_or_v     * dp ) / g
//! pw            = sum_k(          q * dp ) / g
//! ```
//!
//! This is a pure, stateless reduction over the level axis; the caller
//! validates snapshot shapes before it runs.

use crate::core_types::fields::{LevelField, SurfaceField};
use crate::core_types::snapshot::FieldSnapshot;
use crate::physics::constants::{CP_AIR, G, LV_VAPORIZATION};

/// Column-integrated fluxes for one time step.
///
/// All fields are `[nlat, nlon]`; the step's pool contribution is exactly
/// this struct plus the snapshot's surface pressure.
#[derive(Debug, Clone)]
pub struct StepFluxes {
    /// Internal-energy flux, v-weighted
    pub internal: SurfaceField,
    /// Latent-heat flux, v-weighted
    pub latent: SurfaceField,
    /// Geopotential flux, v-weighted
    pub geopotential: SurfaceField,
    /// Kinetic-energy flux, v-weighted
    pub kinetic: SurfaceField,
    /// Internal-energy correction variant (no v factor)
    pub bare_heat: SurfaceField,
    /// Latent-heat correction variant (no v factor)
    pub bare_vapor: SurfaceField,
    /// Geopotential correction variant (no v factor)
    pub bare_geo: SurfaceField,
    /// Kinetic-energy correction variant (no v factor)
    pub bare_velocity: SurfaceField,
    /// Zonal moisture flux
    pub moisture_u: SurfaceField,
    /// Meridional moisture flux
    pub moisture_v: SurfaceField,
    /// Zonal mass flux
    pub mass_u: SurfaceField,
    /// Meridional mass flux
    pub mass_v: SurfaceField,
    /// Precipitable water column
    pub precipitable_water: SurfaceField,
}

impl StepFluxes {
    /// Integrate one snapshot over the level axis.
    ///
    /// `dp` must be the thickness field derived from this snapshot's surface
    /// pressure (recomputed per step; it depends on instantaneous sp).
    ///
    /// # Panics
    ///
    /// Panics if `dp` and the snapshot fields disagree in shape. Shape
    /// errors against the declared grid are reported as typed errors by the
    /// pipeline before this runs.
    #[must_use]
    pub fn compute(snapshot: &FieldSnapshot, dp: &LevelField) -> Self {
        let (nlev, nlat, nlon) = (dp.nlev, dp.nlat, dp.nlon);
        assert!(
            snapshot.u.nlev == nlev && snapshot.u.nlat == nlat && snapshot.u.nlon == nlon,
            "Snapshot and thickness dimensions do not match"
        );

        let mut fluxes = Self::zeros(nlat, nlon);
        let layer = nlat * nlon;

        for level in 0..nlev {
            let u = snapshot.u.level(level);
            let v = snapshot.v.level(level);
            let t = snapshot.temperature.level(level);
            let q = snapshot.humidity.level(level);
            let gz = snapshot.geopotential.level(level);
            let w = dp.level(level);

            for idx in 0..layer {
                let weight = w[idx];
                let kinetic_energy = 0.5 * (u[idx] * u[idx] + v[idx] * v[idx]);

                fluxes.internal.data[idx] += CP_AIR * v[idx] * t[idx] * weight;
                fluxes.latent.data[idx] += LV_VAPORIZATION * v[idx] * q[idx] * weight;
                fluxes.geopotential.data[idx] += v[idx] * gz[idx] * weight;
                fluxes.kinetic.data[idx] += v[idx] * kinetic_energy * weight;

                fluxes.bare_heat.data[idx] += CP_AIR * t[idx] * weight;
                fluxes.bare_vapor.data[idx] += LV_VAPORIZATION * q[idx] * weight;
                fluxes.bare_geo.data[idx] += gz[idx] * weight;
                fluxes.bare_velocity.data[idx] += kinetic_energy * weight;

                fluxes.moisture_u.data[idx] += u[idx] * q[idx] * weight;
                fluxes.moisture_v.data[idx] += v[idx] * q[idx] * weight;
                fluxes.mass_u.data[idx] += u[idx] * weight;
                fluxes.mass_v.data[idx] += v[idx] * weight;
                fluxes.precipitable_water.data[idx] += q[idx] * weight;
            }
        }

        fluxes.scale_all(1.0 / G);
        fluxes
    }

    fn zeros(nlat: usize, nlon: usize) -> Self {
        Self {
            internal: SurfaceField::new(nlat, nlon),
            latent: SurfaceField::new(nlat, nlon),
            geopotential: SurfaceField::new(nlat, nlon),
            kinetic: SurfaceField::new(nlat, nlon),
            bare_heat: SurfaceField::new(nlat, nlon),
            bare_vapor: SurfaceField::new(nlat, nlon),
            bare_geo: SurfaceField::new(nlat, nlon),
            bare_velocity: SurfaceField::new(nlat, nlon),
            moisture_u: SurfaceField::new(nlat, nlon),
            moisture_v: SurfaceField::new(nlat, nlon),
            mass_u: SurfaceField::new(nlat, nlon),
            mass_v: SurfaceField::new(nlat, nlon),
            precipitable_water: SurfaceField::new(nlat, nlon),
        }
    }

    fn scale_all(&mut self, factor: f64) {
        self.internal.scale(factor);
        self.latent.scale(factor);
        self.geopotential.scale(factor);
        self.kinetic.scale(factor);
        self.bare_heat.scale(factor);
        self.bare_vapor.scale(factor);
        self.bare_geo.scale(factor);
        self.bare_velocity.scale(factor);
        self.moisture_u.scale(factor);
        self.moisture_v.scale(factor);
        self.mass_u.scale(factor);
        self.mass_v.scale(factor);
        self.precipitable_water.scale(factor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Uniform two-level snapshot matching the end-to-end reference scenario
    fn uniform_snapshot(nlat: usize, nlon: usize) -> FieldSnapshot {
        FieldSnapshot {
            u: LevelField::with_value(2, nlat, nlon, 10.0),
            v: LevelField::with_value(2, nlat, nlon, 10.0),
            temperature: LevelField::with_value(2, nlat, nlon, 250.0),
            humidity: LevelField::with_value(2, nlat, nlon, 0.001),
            geopotential: LevelField::with_value(2, nlat, nlon, 500.0),
            surface_pressure: SurfaceField::with_value(nlat, nlon, 100_000.0),
        }
    }

    fn uniform_thickness(nlat: usize, nlon: usize) -> LevelField {
        // A=[0,50,100], B=[0,0.5,1.0] at sp=100000 gives 50050 per level
        LevelField::with_value(2, nlat, nlon, 50_050.0)
    }

    #[test]
    fn test_uniform_column_integrals() {
        let snapshot = uniform_snapshot(4, 8);
        let dp = uniform_thickness(4, 8);
        let fluxes = StepFluxes::compute(&snapshot, &dp);

        let column = 2.0 * 50_050.0; // total column mass in Pa
        let expected_internal = CP_AIR * 10.0 * 250.0 * column / G;
        let expected_latent = LV_VAPORIZATION * 10.0 * 0.001 * column / G;
        let expected_kinetic = 10.0 * 0.5 * 200.0 * column / G;

        for idx in 0..32 {
            assert_relative_eq!(
                fluxes.internal.data[idx],
                expected_internal,
                max_relative = 1e-12
            );
            assert_relative_eq!(
                fluxes.latent.data[idx],
                expected_latent,
                max_relative = 1e-12
            );
            assert_relative_eq!(
                fluxes.kinetic.data[idx],
                expected_kinetic,
                max_relative = 1e-12
            );
        }
    }

    #[test]
    fn test_bare_variants_drop_wind_factor() {
        let snapshot = uniform_snapshot(2, 2);
        let dp = uniform_thickness(2, 2);
        let fluxes = StepFluxes::compute(&snapshot, &dp);

        // v = 10 everywhere, so each v-weighted flux is 10x its bare variant
        for idx in 0..4 {
            assert_relative_eq!(
                fluxes.internal.data[idx],
                10.0 * fluxes.bare_heat.data[idx],
                max_relative = 1e-12
            );
            assert_relative_eq!(
                fluxes.geopotential.data[idx],
                10.0 * fluxes.bare_geo.data[idx],
                max_relative = 1e-12
            );
            assert_relative_eq!(
                fluxes.kinetic.data[idx],
                10.0 * fluxes.bare_velocity.data[idx],
                max_relative = 1e-12
            );
        }
    }

    #[test]
    fn test_mass_and_moisture_fluxes() {
        let snapshot = uniform_snapshot(2, 2);
        let dp = uniform_thickness(2, 2);
        let fluxes = StepFluxes::compute(&snapshot, &dp);

        let column = 2.0 * 50_050.0;
        assert_relative_eq!(
            fluxes.mass_u.data[0],
            10.0 * column / G,
            max_relative = 1e-12
        );
        assert_relative_eq!(
            fluxes.moisture_v.data[0],
            10.0 * 0.001 * column / G,
            max_relative = 1e-12
        );
        assert_relative_eq!(
            fluxes.precipitable_water.data[0],
            0.001 * column / G,
            max_relative = 1e-12
        );
    }

    #[test]
    fn test_only_lowest_level_contributes_when_upper_thickness_is_zero() {
        let snapshot = uniform_snapshot(2, 2);
        let mut dp = LevelField::new(2, 2, 2);
        dp.level_mut(1).fill(100_000.0);
        let fluxes = StepFluxes::compute(&snapshot, &dp);
        assert_relative_eq!(
            fluxes.precipitable_water.data[0],
            0.001 * 100_000.0 / G,
            max_relative = 1e-12
        );
    }

    #[test]
    #[should_panic(expected = "dimensions do not match")]
    fn test_rejects_mismatched_thickness() {
        let snapshot = uniform_snapshot(2, 2);
        let dp = LevelField::new(3, 2, 2);
        let _ = StepFluxes::compute(&snapshot, &dp);
    }
}
