//! Batch pipeline driver
//!
//! Owns the grid, the vertical discretization and the tuning knobs, and runs
//! one bounded batch of snapshots end to end:
//!
//! 1. Per step: layer thickness, vertical flux integrals, divergences,
//!    folded into the running pools.
//! 2. Tendency terms from the first and last snapshot.
//! 3. Mass budget closure into the correction wind.
//! 4. Correction and conversion into the transport products.
//!
//! Two entry styles cover both decoder shapes: `begin`/`push`/`finish`
//! streams snapshots one at a time in arrival order, and `process` takes a
//! full in-memory batch and can fan the per-step work out across threads.
//! Both produce identical results on the same input.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::core_types::error::TransportError;
use crate::core_types::fields::{LevelField, SurfaceField};
use crate::core_types::snapshot::{BatchWindow, FieldSnapshot};
use crate::grid::geometry::GridGeometry;
use crate::physics::budget::{close_mass_budget, BudgetInputs, TendencyTerms};
use crate::physics::sigma::SigmaLevels;
use crate::physics::vertical::StepFluxes;
use crate::solver::aggregate::{assemble_analysis, TransportAnalysis};
use crate::solver::pools::{FluxPools, StepDivergences};

/// Tuning knobs for a pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Fan the per-step flux work out across threads in `process`
    pub parallel: bool,
    /// Smallest batch worth fanning out; shorter batches run sequentially
    pub parallel_threshold: usize,
    /// Budget denominators with magnitude below this [Pa] are counted
    /// as degenerate
    pub degeneracy_floor: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            parallel_threshold: 8,
            degeneracy_floor: 1.0,
        }
    }
}

/// Batch driver binding a grid, a vertical discretization and a config.
#[derive(Debug, Clone)]
pub struct TransportPipeline {
    geometry: GridGeometry,
    sigma: SigmaLevels,
    config: PipelineConfig,
}

impl TransportPipeline {
    /// Pipeline with default tuning
    #[must_use]
    pub fn new(geometry: GridGeometry, sigma: SigmaLevels) -> Self {
        Self::with_config(geometry, sigma, PipelineConfig::default())
    }

    /// Pipeline with explicit tuning
    #[must_use]
    pub fn with_config(geometry: GridGeometry, sigma: SigmaLevels, config: PipelineConfig) -> Self {
        info!(
            "Transport pipeline created: {}x{} grid, {} levels, parallel={}",
            geometry.nlat(),
            geometry.nlon(),
            sigma.nlev(),
            config.parallel
        );
        Self {
            geometry,
            sigma,
            config,
        }
    }

    /// Grid this pipeline runs on
    #[must_use]
    pub fn geometry(&self) -> &GridGeometry {
        &self.geometry
    }

    /// Vertical discretization this pipeline runs on
    #[must_use]
    pub fn sigma(&self) -> &SigmaLevels {
        &self.sigma
    }

    /// Active tuning
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Check a snapshot against the pipeline's grid and level counts.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::ShapeMismatch`] naming the first offending
    /// array.
    pub fn validate(&self, snapshot: &FieldSnapshot) -> Result<(), TransportError> {
        snapshot.validate_shape(self.sigma.nlev(), self.geometry.nlat(), self.geometry.nlon())
    }

    /// Open a streaming run; snapshots are pushed in time order.
    #[must_use]
    pub fn begin(&self, window: BatchWindow) -> BatchRun<'_> {
        debug!(
            "Streaming run opened: {} expected steps over {:.3} days",
            window.steps, window.days
        );
        BatchRun {
            pipeline: self,
            window,
            pools: FluxPools::new(self.geometry.nlat(), self.geometry.nlon()),
            first: None,
            last: None,
        }
    }

    /// Run a full in-memory batch.
    ///
    /// Snapshots must be in time order; the first and last entries supply
    /// the tendency terms. With `parallel` set and the batch at least
    /// `parallel_threshold` long, the per-step flux work is distributed and
    /// the partial pools merged, which changes nothing in the result because
    /// the pools are plain sums.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::InsufficientBatch`] for fewer than two
    /// snapshots and [`TransportError::ShapeMismatch`] if any snapshot
    /// disagrees with the grid.
    pub fn process(
        &self,
        snapshots: &[FieldSnapshot],
        window: BatchWindow,
    ) -> Result<TransportAnalysis, TransportError> {
        if snapshots.len() < 2 {
            return Err(TransportError::InsufficientBatch {
                steps: snapshots.len(),
            });
        }
        for snapshot in snapshots {
            self.validate(snapshot)?;
        }

        info!(
            "Processing batch: {} steps over {:.3} days",
            snapshots.len(),
            window.days
        );

        // 1. Fold every step into the pools
        let parallel = self.config.parallel && snapshots.len() >= self.config.parallel_threshold;
        let pools = if parallel {
            snapshots
                .par_iter()
                .fold(
                    || FluxPools::new(self.geometry.nlat(), self.geometry.nlon()),
                    |mut pools, snapshot| {
                        let (fluxes, divergences) = self.step_terms(snapshot);
                        pools.fold_step(&fluxes, &divergences, &snapshot.surface_pressure);
                        pools
                    },
                )
                .reduce(
                    || FluxPools::new(self.geometry.nlat(), self.geometry.nlon()),
                    |left, right| left.merge(&right),
                )
        } else {
            let mut pools = FluxPools::new(self.geometry.nlat(), self.geometry.nlon());
            for snapshot in snapshots {
                let (fluxes, divergences) = self.step_terms(snapshot);
                pools.fold_step(&fluxes, &divergences, &snapshot.surface_pressure);
            }
            pools
        };

        // 2. Tendencies from the batch endpoints
        let first = &snapshots[0];
        let last = &snapshots[snapshots.len() - 1];
        let tendency = TendencyTerms::from_endpoints(
            &self.sigma,
            &window,
            &first.humidity,
            &first.surface_pressure,
            &last.humidity,
            &last.surface_pressure,
        );
        debug!("Tendency terms computed from batch endpoints");

        Ok(self.close_and_assemble(pools, &tendency))
    }

    /// Run an in-memory batch of 3-hourly records, deriving the day count
    /// from the step count.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`TransportPipeline::process`].
    pub fn process_three_hourly(
        &self,
        snapshots: &[FieldSnapshot],
    ) -> Result<TransportAnalysis, TransportError> {
        self.process(
            snapshots,
            BatchWindow::from_three_hourly_steps(snapshots.len()),
        )
    }

    /// Thickness, flux integrals and divergences for one step
    fn step_terms(&self, snapshot: &FieldSnapshot) -> (StepFluxes, StepDivergences) {
        let mut dp = LevelField::new(self.sigma.nlev(), self.geometry.nlat(), self.geometry.nlon());
        self.sigma.thickness_field(&snapshot.surface_pressure, &mut dp);
        let fluxes = StepFluxes::compute(snapshot, &dp);
        let divergences = StepDivergences::compute(&fluxes, &self.geometry);
        (fluxes, divergences)
    }

    /// Stages 3 and 4: budget closure and product assembly
    fn close_and_assemble(&self, pools: FluxPools, tendency: &TendencyTerms) -> TransportAnalysis {
        let steps = pools.steps();
        let means = pools.finalize();

        // 3. Close the mass budget
        debug!("Closing mass budget over {} steps", steps);
        let solution = close_mass_budget(&BudgetInputs {
            tendency,
            div_moisture_u: &means.div_moisture_u,
            div_moisture_v: &means.div_moisture_v,
            div_mass_u: &means.div_mass_u,
            div_mass_v: &means.div_mass_v,
            surface_pressure: &means.surface_pressure,
            precipitable_water: &means.precipitable_water,
            dx: self.geometry.dx(),
            dy: self.geometry.dy(),
            degeneracy_floor: self.config.degeneracy_floor,
        });
        if solution.degenerate_denominators > 0 {
            let extreme = solution
                .vc
                .data
                .iter()
                .fold(0.0_f64, |acc, value| acc.max(value.abs()));
            warn!(
                "{} near-degenerate budget denominators, largest |vc|={:.3e} m/s",
                solution.degenerate_denominators, extreme
            );
        }
        debug!("Correction wind derived, applying to time-mean fluxes");

        // 4. Correct and convert
        let analysis = assemble_analysis(&means, solution, &self.geometry);
        if let Some((latitude, peak)) = analysis.peak_northward() {
            info!(
                "Batch complete: peak northward transport {:.2} TW at {:.1} deg",
                peak, latitude
            );
        }
        analysis
    }
}

/// Saved endpoint state for the tendency terms
#[derive(Debug, Clone)]
struct Endpoint {
    humidity: LevelField,
    surface_pressure: SurfaceField,
}

impl Endpoint {
    fn capture(snapshot: &FieldSnapshot) -> Self {
        Self {
            humidity: snapshot.humidity.clone(),
            surface_pressure: snapshot.surface_pressure.clone(),
        }
    }
}

/// In-progress streaming run.
///
/// Holds the running pools and the first and last pushed endpoint; dropped
/// without `finish`, the partial state simply disappears.
#[derive(Debug)]
pub struct BatchRun<'a> {
    pipeline: &'a TransportPipeline,
    window: BatchWindow,
    pools: FluxPools,
    first: Option<Endpoint>,
    last: Option<Endpoint>,
}

impl BatchRun<'_> {
    /// Steps folded in so far
    #[must_use]
    pub fn steps(&self) -> usize {
        self.pools.steps()
    }

    /// Fold one snapshot into the run.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::ShapeMismatch`] if the snapshot disagrees
    /// with the pipeline's grid; the run state is unchanged in that case.
    pub fn push(&mut self, snapshot: &FieldSnapshot) -> Result<(), TransportError> {
        self.pipeline.validate(snapshot)?;
        let (fluxes, divergences) = self.pipeline.step_terms(snapshot);
        self.pools
            .fold_step(&fluxes, &divergences, &snapshot.surface_pressure);
        let endpoint = Endpoint::capture(snapshot);
        if self.first.is_none() {
            self.first = Some(endpoint.clone());
        }
        self.last = Some(endpoint);
        Ok(())
    }

    /// Close the run and produce the transport products.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::InsufficientBatch`] if fewer than two
    /// snapshots were pushed.
    pub fn finish(self) -> Result<TransportAnalysis, TransportError> {
        let steps = self.pools.steps();
        if steps < 2 {
            return Err(TransportError::InsufficientBatch { steps });
        }
        let (Some(first), Some(last)) = (self.first, self.last) else {
            return Err(TransportError::InsufficientBatch { steps });
        };
        let tendency = TendencyTerms::from_endpoints(
            &self.pipeline.sigma,
            &self.window,
            &first.humidity,
            &first.surface_pressure,
            &last.humidity,
            &last.surface_pressure,
        );
        debug!("Tendency terms computed from batch endpoints");
        Ok(self.pipeline.close_and_assemble(self.pools, &tendency))
    }
}
