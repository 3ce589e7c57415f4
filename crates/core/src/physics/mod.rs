//! Numerical physics for the meridional energy transport pipeline

pub mod budget;
pub mod divergence;
pub mod sigma;
pub mod vertical;

// Re-export main types
pub use budget::{close_mass_budget, BudgetInputs, BudgetSolution, TendencyTerms};
pub use divergence::{divergence_meridional, divergence_zonal};
pub use sigma::SigmaLevels;
pub use vertical::StepFluxes;

/// Physical constants used throughout the pipeline
///
/// Values follow the EC-Earth post-processing convention; in particular the
/// Earth radius is the IUGG mean radius and Lv is the latent heat of
/// vaporization at the freezing point.
pub mod constants {
    /// Gravitational acceleration (m/s^2)
    pub const G: f64 = 9.80616;

    /// Mean radius of the Earth (m)
    pub const EARTH_RADIUS: f64 = 6_371_009.0;

    /// Specific heat capacity of air at constant pressure (J/(kg*K))
    pub const CP_AIR: f64 = 1004.64;

    /// Latent heat of vaporization of water (J/kg)
    pub const LV_VAPORIZATION: f64 = 2_264_670.0;

    /// Gas constant of dry air (J/(kg*K))
    pub const R_DRY: f64 = 286.9;

    /// Gas constant of water vapour (J/(kg*K))
    pub const R_VAPOR: f64 = 461.5;

    /// Seconds per day, for tendency denominators
    pub const SECONDS_PER_DAY: f64 = 86_400.0;

    /// Watts per terawatt, the output scale of the transport fields
    pub const WATTS_PER_TERAWATT: f64 = 1.0e12;
}
