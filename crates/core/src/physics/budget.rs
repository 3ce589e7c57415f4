//! Mass and moisture budget closure
//!
//! Raw model winds do not satisfy mass continuity to numerical precision,
//! so a meridional transport integrated from them drifts. The closure
//! derives the minimal barotropic (depth-uniform) wind adjustment that
//! zeroes the residual of the column mass budget over the batch:
//!
//! ```text
//! E - P          = d(pw)/dt + div(moisture flux)
//! mass residual  = d(sp)/dt + g * div(mass flux) - g * (E - P)
//! vc             = residual * dy / (mean sp - g * mean pw)
//! uc[j]          = residual[j] * dx[j] / (mean sp[j] - g * mean pw[j])
//! ```
//!
//! Tendency terms use only the first and last snapshot of the batch; the
//! divergence terms are arithmetic time-means over every step. `vc` is
//! forced to zero on both pole rows, where the formula is singular.
//!
//! The denominator is the column dry-air mass. It can only approach zero on
//! pathological input (surface pressure dominates the precipitable-water
//! term by three orders of magnitude on real atmospheres); such points are
//! counted and reported, never clamped, because an extreme correction wind
//! is a physically meaningful budget failure that must stay visible.

use crate::core_types::fields::{LevelField, SurfaceField};
use crate::core_types::snapshot::BatchWindow;
use crate::physics::constants::G;
use crate::physics::sigma::SigmaLevels;

/// Endpoint tendency terms of the batch.
#[derive(Debug, Clone)]
pub struct TendencyTerms {
    /// Moisture tendency d(pw)/dt [kg/(m^2 s)]
    pub moisture: SurfaceField,
    /// Surface pressure tendency, g-scaled like the moisture term
    pub surface_pressure: SurfaceField,
}

impl TendencyTerms {
    /// Compute tendencies from the batch's first and last snapshot.
    ///
    /// Thickness is rederived from each endpoint's own surface pressure;
    /// interior snapshots never contribute.
    ///
    /// # Panics
    ///
    /// Panics if the endpoint fields disagree in shape.
    #[must_use]
    pub fn from_endpoints(
        sigma: &SigmaLevels,
        window: &BatchWindow,
        humidity_start: &LevelField,
        sp_start: &SurfaceField,
        humidity_end: &LevelField,
        sp_end: &SurfaceField,
    ) -> Self {
        let (nlat, nlon) = (sp_start.nlat, sp_start.nlon);
        assert!(
            sp_end.nlat == nlat && sp_end.nlon == nlon,
            "Endpoint surface pressure dimensions do not match"
        );

        let mut dp = LevelField::new(sigma.nlev(), nlat, nlon);
        sigma.thickness_field(sp_start, &mut dp);
        let moisture_start = column_moisture(humidity_start, &dp);
        sigma.thickness_field(sp_end, &mut dp);
        let moisture_end = column_moisture(humidity_end, &dp);

        // One day has 86400 s; both tendencies share the 1/g scaling
        let inv = 1.0 / (window.seconds() * G);
        let mut moisture = SurfaceField::new(nlat, nlon);
        let mut surface_pressure = SurfaceField::new(nlat, nlon);
        for idx in 0..nlat * nlon {
            moisture.data[idx] = (moisture_end.data[idx] - moisture_start.data[idx]) * inv;
            surface_pressure.data[idx] = (sp_end.data[idx] - sp_start.data[idx]) * inv;
        }

        Self {
            moisture,
            surface_pressure,
        }
    }
}

/// Column moisture content: q weighted by layer thickness, summed over levels
fn column_moisture(humidity: &LevelField, dp: &LevelField) -> SurfaceField {
    assert!(
        humidity.nlev == dp.nlev && humidity.nlat == dp.nlat && humidity.nlon == dp.nlon,
        "Humidity and thickness dimensions do not match"
    );
    let mut column = SurfaceField::new(dp.nlat, dp.nlon);
    for level in 0..dp.nlev {
        let q = humidity.level(level);
        let w = dp.level(level);
        for (sum, (&qv, &wv)) in column.data.iter_mut().zip(q.iter().zip(w)) {
            *sum += qv * wv;
        }
    }
    column
}

/// Everything the closure consumes: endpoint tendencies, pooled time-means,
/// and the grid spacings.
#[derive(Debug)]
pub struct BudgetInputs<'a> {
    /// Endpoint tendency terms
    pub tendency: &'a TendencyTerms,
    /// Time-mean divergence of the zonal moisture flux
    pub div_moisture_u: &'a SurfaceField,
    /// Time-mean divergence of the meridional moisture flux
    pub div_moisture_v: &'a SurfaceField,
    /// Time-mean divergence of the zonal mass flux
    pub div_mass_u: &'a SurfaceField,
    /// Time-mean divergence of the meridional mass flux
    pub div_mass_v: &'a SurfaceField,
    /// Time-mean surface pressure
    pub surface_pressure: &'a SurfaceField,
    /// Time-mean precipitable water
    pub precipitable_water: &'a SurfaceField,
    /// Zonal grid length per latitude row [m]
    pub dx: &'a [f64],
    /// Meridional grid length [m]
    pub dy: f64,
    /// Denominators with magnitude below this [Pa] count as degenerate
    pub degeneracy_floor: f64,
}

/// Result of the closure: diagnostics plus the correction wind.
#[derive(Debug, Clone)]
pub struct BudgetSolution {
    /// Evapotranspiration-minus-precipitation proxy [kg/(m^2 s)]
    pub e_minus_p: SurfaceField,
    /// Column mass residual the correction wind must absorb
    pub mass_residual: SurfaceField,
    /// Zonal barotropic correction wind [m/s]
    pub uc: SurfaceField,
    /// Meridional barotropic correction wind [m/s], zero on the pole rows
    pub vc: SurfaceField,
    /// Grid points whose denominator fell below the degeneracy floor
    pub degenerate_denominators: usize,
}

/// Solve the budget for the barotropic correction wind.
///
/// # Panics
///
/// Panics if the input fields disagree in shape or `dx` does not provide
/// one spacing per row.
#[must_use]
pub fn close_mass_budget(inputs: &BudgetInputs<'_>) -> BudgetSolution {
    let (nlat, nlon) = (
        inputs.tendency.moisture.nlat,
        inputs.tendency.moisture.nlon,
    );
    assert_eq!(
        inputs.dx.len(),
        nlat,
        "dx must have one entry per latitude row"
    );

    let mut e_minus_p = SurfaceField::new(nlat, nlon);
    let mut mass_residual = SurfaceField::new(nlat, nlon);
    let mut uc = SurfaceField::new(nlat, nlon);
    let mut vc = SurfaceField::new(nlat, nlon);
    let mut degenerate = 0usize;

    for j in 0..nlat {
        let polar = j == 0 || j == nlat - 1;
        for k in 0..nlon {
            let idx = j * nlon + k;

            let ep = inputs.tendency.moisture.data[idx]
                + inputs.div_moisture_u.data[idx]
                + inputs.div_moisture_v.data[idx];
            e_minus_p.data[idx] = ep;

            let residual = inputs.tendency.surface_pressure.data[idx]
                + G * (inputs.div_mass_u.data[idx] + inputs.div_mass_v.data[idx])
                - G * ep;
            mass_residual.data[idx] = residual;

            let denom =
                inputs.surface_pressure.data[idx] - G * inputs.precipitable_water.data[idx];
            if denom.abs() < inputs.degeneracy_floor {
                degenerate += 1;
            }

            uc.data[idx] = residual * inputs.dx[j] / denom;
            vc.data[idx] = if polar { 0.0 } else { residual * inputs.dy / denom };
        }
    }

    BudgetSolution {
        e_minus_p,
        mass_residual,
        uc,
        vc,
        degenerate_denominators: degenerate,
    }
}
