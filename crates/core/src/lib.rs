//! Atmospheric Meridional Energy Transport Core Library
//!
//! Computes the meridional energy transport of the atmosphere from batches of
//! model-level reanalysis snapshots. Implements the vertical flux integrals,
//! the mass budget closure with barotropic wind correction, and the
//! conversion into per-point and zonal transport products in terawatts.
//!
//! ## Pipeline
//!
//! - Hybrid sigma-pressure layer thickness from surface pressure
//! - Vertically integrated energy and mass fluxes per snapshot
//! - Centered flux divergences on the sphere, poles one-sided
//! - Mass and moisture budget closure into a correction wind
//! - Corrected transport fields, zonal profiles and archive-named outputs

// Core types and utilities
pub mod core_types;

// Spherical grid geometry
pub mod grid;

// Numerical kernels
pub mod physics;

// Batch pipeline and products
pub mod solver;

// Re-export core types
pub use core_types::{BatchWindow, FieldSnapshot, LevelField, SurfaceField, TransportError};
pub use core_types::{Meters, Pascals, Terawatts};

// Re-export grid and kernel types
pub use grid::GridGeometry;
pub use physics::{SigmaLevels, StepFluxes};

// Re-export pipeline types
pub use solver::{
    create_transport_pipeline, BatchRun, PipelineConfig, TransportAnalysis, TransportPipeline,
};
