//! Batch reduction and transport product assembly
//!
//! This module turns a time-ordered batch of [`FieldSnapshot`]s into the
//! corrected meridional energy transport. The driver is
//! [`TransportPipeline`], which owns the grid and the vertical
//! discretization; [`FluxPools`] holds the running sums and
//! [`TransportAnalysis`] is the finished product.
//!
//! # Entry Styles
//!
//! - Streaming: `begin` a [`BatchRun`], `push` snapshots as the decoder
//!   yields them, `finish` for the products.
//! - In-memory: hand `process` the whole batch; with `parallel` configured
//!   the per-step work is fanned out and the partial pools merged.
//!
//! # Example
//!
//! ```rust,ignore
//! use amet_core::core_types::BatchWindow;
//! use amet_core::solver::create_transport_pipeline;
//!
//! let pipeline = create_transport_pipeline(121, 240);
//! let analysis = pipeline.process(&snapshots, BatchWindow::from_three_hourly_steps(snapshots.len()))?;
//! println!("{:?}", analysis.zonal.total);
//! ```
//!
//! [`FieldSnapshot`]: crate::core_types::snapshot::FieldSnapshot

pub mod aggregate;
pub mod pipeline;
pub mod pools;

// Re-exports
pub use aggregate::{
    assemble_analysis, BudgetDiagnostics, CorrectionWind, TransportAnalysis, TransportPointFields,
    TransportProfile, NAMED_OUTPUTS,
};
pub use pipeline::{BatchRun, PipelineConfig, TransportPipeline};
pub use pools::{FluxPools, PoolMeans, StepDivergences};

use tracing::info;

use crate::grid::geometry::GridGeometry;
use crate::physics::sigma::SigmaLevels;

/// Create a pipeline for a regular lat-lon grid on the standard 91-level
/// vertical discretization
///
/// # Arguments
///
/// * `nlat` - Number of latitude rows, poles included
/// * `nlon` - Number of longitude columns
///
/// # Returns
///
/// A [`TransportPipeline`] with default tuning
#[must_use]
pub fn create_transport_pipeline(nlat: usize, nlon: usize) -> TransportPipeline {
    info!(
        "Creating transport pipeline on a regular {}x{} grid, 91 levels",
        nlat, nlon
    );
    TransportPipeline::new(GridGeometry::regular(nlat, nlon), SigmaLevels::ec_earth_l91())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_binds_regular_grid_to_l91() {
        let pipeline = create_transport_pipeline(11, 20);
        assert_eq!(pipeline.geometry().nlat(), 11);
        assert_eq!(pipeline.geometry().nlon(), 20);
        assert_eq!(pipeline.sigma().nlev(), 91);
        assert_eq!(pipeline.geometry().latitude()[0], 90.0);
    }
}
