//! Streaming pool accumulators for the batch reduction
//!
//! The original pipeline retained every per-step field in `[T, nlat, nlon]`
//! pools and reduced them with a time-mean at batch end. Only two reductions
//! ever touch the pools: the arithmetic mean, and the first/last-snapshot
//! difference for the tendency terms. The mean needs just a running sum and
//! a count, so the pools here are single-pass accumulators: fourteen
//! `[nlat, nlon]` sum fields, bounded in memory regardless of batch length.
//! Endpoint snapshots are captured separately by the caller, which knows the
//! step ordering (the sums themselves are order-independent, which is what
//! makes the parallel fold/merge below correct).

use crate::core_types::fields::SurfaceField;
use crate::grid::geometry::GridGeometry;
use crate::physics::divergence::{divergence_meridional, divergence_zonal};
use crate::physics::vertical::StepFluxes;

/// Divergence fields derived from one step's integrated fluxes.
#[derive(Debug, Clone)]
pub struct StepDivergences {
    /// Divergence of the zonal moisture flux
    pub moisture_u: SurfaceField,
    /// Divergence of the meridional moisture flux
    pub moisture_v: SurfaceField,
    /// Divergence of the zonal mass flux
    pub mass_u: SurfaceField,
    /// Divergence of the meridional mass flux
    pub mass_v: SurfaceField,
}

impl StepDivergences {
    /// Apply the divergence operators to the step's moisture and mass fluxes
    #[must_use]
    pub fn compute(fluxes: &StepFluxes, geometry: &GridGeometry) -> Self {
        Self {
            moisture_u: divergence_zonal(&fluxes.moisture_u, geometry.dx()),
            moisture_v: divergence_meridional(&fluxes.moisture_v, geometry.dy()),
            mass_u: divergence_zonal(&fluxes.mass_u, geometry.dx()),
            mass_v: divergence_meridional(&fluxes.mass_v, geometry.dy()),
        }
    }
}

/// Running sums over the batch, one field per pooled quantity.
#[derive(Debug, Clone)]
pub struct FluxPools {
    steps: usize,
    internal: SurfaceField,
    latent: SurfaceField,
    geopotential: SurfaceField,
    kinetic: SurfaceField,
    bare_heat: SurfaceField,
    bare_vapor: SurfaceField,
    bare_geo: SurfaceField,
    bare_velocity: SurfaceField,
    div_moisture_u: SurfaceField,
    div_moisture_v: SurfaceField,
    div_mass_u: SurfaceField,
    div_mass_v: SurfaceField,
    precipitable_water: SurfaceField,
    surface_pressure: SurfaceField,
}

impl FluxPools {
    /// Empty pools for a grid of the given dimensions
    #[must_use]
    pub fn new(nlat: usize, nlon: usize) -> Self {
        Self {
            steps: 0,
            internal: SurfaceField::new(nlat, nlon),
            latent: SurfaceField::new(nlat, nlon),
            geopotential: SurfaceField::new(nlat, nlon),
            kinetic: SurfaceField::new(nlat, nlon),
            bare_heat: SurfaceField::new(nlat, nlon),
            bare_vapor: SurfaceField::new(nlat, nlon),
            bare_geo: SurfaceField::new(nlat, nlon),
            bare_velocity: SurfaceField::new(nlat, nlon),
            div_moisture_u: SurfaceField::new(nlat, nlon),
            div_moisture_v: SurfaceField::new(nlat, nlon),
            div_mass_u: SurfaceField::new(nlat, nlon),
            div_mass_v: SurfaceField::new(nlat, nlon),
            precipitable_water: SurfaceField::new(nlat, nlon),
            surface_pressure: SurfaceField::new(nlat, nlon),
        }
    }

    /// Number of steps folded in so far
    #[must_use]
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Fold one step's contribution into the running sums
    pub fn fold_step(
        &mut self,
        fluxes: &StepFluxes,
        divergences: &StepDivergences,
        surface_pressure: &SurfaceField,
    ) {
        self.internal.accumulate(&fluxes.internal);
        self.latent.accumulate(&fluxes.latent);
        self.geopotential.accumulate(&fluxes.geopotential);
        self.kinetic.accumulate(&fluxes.kinetic);
        self.bare_heat.accumulate(&fluxes.bare_heat);
        self.bare_vapor.accumulate(&fluxes.bare_vapor);
        self.bare_geo.accumulate(&fluxes.bare_geo);
        self.bare_velocity.accumulate(&fluxes.bare_velocity);
        self.div_moisture_u.accumulate(&divergences.moisture_u);
        self.div_moisture_v.accumulate(&divergences.moisture_v);
        self.div_mass_u.accumulate(&divergences.mass_u);
        self.div_mass_v.accumulate(&divergences.mass_v);
        self.precipitable_water.accumulate(&fluxes.precipitable_water);
        self.surface_pressure.accumulate(surface_pressure);
        self.steps += 1;
    }

    /// Combine two partial accumulations (the parallel reduce step)
    #[must_use]
    pub fn merge(mut self, other: &Self) -> Self {
        self.internal.accumulate(&other.internal);
        self.latent.accumulate(&other.latent);
        self.geopotential.accumulate(&other.geopotential);
        self.kinetic.accumulate(&other.kinetic);
        self.bare_heat.accumulate(&other.bare_heat);
        self.bare_vapor.accumulate(&other.bare_vapor);
        self.bare_geo.accumulate(&other.bare_geo);
        self.bare_velocity.accumulate(&other.bare_velocity);
        self.div_moisture_u.accumulate(&other.div_moisture_u);
        self.div_moisture_v.accumulate(&other.div_moisture_v);
        self.div_mass_u.accumulate(&other.div_mass_u);
        self.div_mass_v.accumulate(&other.div_mass_v);
        self.precipitable_water.accumulate(&other.precipitable_water);
        self.surface_pressure.accumulate(&other.surface_pressure);
        self.steps += other.steps;
        self
    }

    /// Reduce the sums to arithmetic time-means.
    ///
    /// # Panics
    ///
    /// Panics if no steps were folded; the pipeline rejects short batches
    /// with a typed error before finalizing.
    #[must_use]
    pub fn finalize(mut self) -> PoolMeans {
        assert!(self.steps > 0, "Cannot finalize empty pools");
        let inv = 1.0 / self.steps as f64;
        self.internal.scale(inv);
        self.latent.scale(inv);
        self.geopotential.scale(inv);
        self.kinetic.scale(inv);
        self.bare_heat.scale(inv);
        self.bare_vapor.scale(inv);
        self.bare_geo.scale(inv);
        self.bare_velocity.scale(inv);
        self.div_moisture_u.scale(inv);
        self.div_moisture_v.scale(inv);
        self.div_mass_u.scale(inv);
        self.div_mass_v.scale(inv);
        self.precipitable_water.scale(inv);
        self.surface_pressure.scale(inv);
        PoolMeans {
            internal: self.internal,
            latent: self.latent,
            geopotential: self.geopotential,
            kinetic: self.kinetic,
            bare_heat: self.bare_heat,
            bare_vapor: self.bare_vapor,
            bare_geo: self.bare_geo,
            bare_velocity: self.bare_velocity,
            div_moisture_u: self.div_moisture_u,
            div_moisture_v: self.div_moisture_v,
            div_mass_u: self.div_mass_u,
            div_mass_v: self.div_mass_v,
            precipitable_water: self.precipitable_water,
            surface_pressure: self.surface_pressure,
        }
    }
}

/// Time-mean fields over the whole batch.
#[derive(Debug, Clone)]
pub struct PoolMeans {
    /// Mean internal-energy flux
    pub internal: SurfaceField,
    /// Mean latent-heat flux
    pub latent: SurfaceField,
    /// Mean geopotential flux
    pub geopotential: SurfaceField,
    /// Mean kinetic-energy flux
    pub kinetic: SurfaceField,
    /// Mean internal-energy correction variant
    pub bare_heat: SurfaceField,
    /// Mean latent-heat correction variant
    pub bare_vapor: SurfaceField,
    /// Mean geopotential correction variant
    pub bare_geo: SurfaceField,
    /// Mean kinetic-energy correction variant
    pub bare_velocity: SurfaceField,
    /// Mean divergence of the zonal moisture flux
    pub div_moisture_u: SurfaceField,
    /// Mean divergence of the meridional moisture flux
    pub div_moisture_v: SurfaceField,
    /// Mean divergence of the zonal mass flux
    pub div_mass_u: SurfaceField,
    /// Mean divergence of the meridional mass flux
    pub div_mass_v: SurfaceField,
    /// Mean precipitable water
    pub precipitable_water: SurfaceField,
    /// Mean surface pressure
    pub surface_pressure: SurfaceField,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    use crate::core_types::fields::LevelField;
    use crate::core_types::snapshot::FieldSnapshot;

    fn snapshot_with_v(v_value: f64) -> FieldSnapshot {
        FieldSnapshot {
            u: LevelField::with_value(1, 3, 4, 5.0),
            v: LevelField::with_value(1, 3, 4, v_value),
            temperature: LevelField::with_value(1, 3, 4, 260.0),
            humidity: LevelField::with_value(1, 3, 4, 0.002),
            geopotential: LevelField::with_value(1, 3, 4, 1000.0),
            surface_pressure: SurfaceField::with_value(3, 4, 100_000.0),
        }
    }

    fn step(v_value: f64) -> (StepFluxes, StepDivergences, SurfaceField) {
        let geometry = GridGeometry::regular(3, 4);
        let snapshot = snapshot_with_v(v_value);
        let mut dp = LevelField::new(1, 3, 4);
        crate::physics::sigma::SigmaLevels::new(vec![0.0, 0.0], vec![0.0, 1.0])
            .thickness_field(&snapshot.surface_pressure, &mut dp);
        let fluxes = StepFluxes::compute(&snapshot, &dp);
        let divergences = StepDivergences::compute(&fluxes, &geometry);
        (fluxes, divergences, snapshot.surface_pressure.clone())
    }

    #[test]
    fn test_mean_of_two_steps() {
        let mut pools = FluxPools::new(3, 4);
        let (f1, d1, sp1) = step(10.0);
        let (f2, d2, sp2) = step(20.0);
        pools.fold_step(&f1, &d1, &sp1);
        pools.fold_step(&f2, &d2, &sp2);
        assert_eq!(pools.steps(), 2);

        let means = pools.finalize();
        // v averages to 15, so the internal flux mean sits midway
        let expected = (f1.internal.data[0] + f2.internal.data[0]) / 2.0;
        assert_eq!(means.internal.data[0], expected);
        assert_eq!(means.surface_pressure.data[0], 100_000.0);
    }

    #[test]
    fn test_merge_matches_sequential_fold() {
        let (f1, d1, sp1) = step(10.0);
        let (f2, d2, sp2) = step(-4.0);
        let (f3, d3, sp3) = step(7.5);

        let mut sequential = FluxPools::new(3, 4);
        sequential.fold_step(&f1, &d1, &sp1);
        sequential.fold_step(&f2, &d2, &sp2);
        sequential.fold_step(&f3, &d3, &sp3);

        let mut left = FluxPools::new(3, 4);
        left.fold_step(&f1, &d1, &sp1);
        let mut right = FluxPools::new(3, 4);
        right.fold_step(&f2, &d2, &sp2);
        right.fold_step(&f3, &d3, &sp3);
        let merged = left.merge(&right);

        assert_eq!(merged.steps(), 3);
        let a = sequential.finalize();
        let b = merged.finalize();
        // Merging regroups the additions, so allow rounding in the last ulps
        for (lhs, rhs) in [
            (&a.internal, &b.internal),
            (&a.div_mass_v, &b.div_mass_v),
            (&a.precipitable_water, &b.precipitable_water),
        ] {
            for (x, y) in lhs.data.iter().zip(&rhs.data) {
                assert_relative_eq!(*x, *y, max_relative = 1e-12, epsilon = 1e-30);
            }
        }
    }

    #[test]
    #[should_panic(expected = "empty pools")]
    fn test_finalize_rejects_empty_pools() {
        let _ = FluxPools::new(2, 2).finalize();
    }
}
