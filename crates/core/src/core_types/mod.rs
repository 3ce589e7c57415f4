//! Core types and utilities

pub mod error;
pub mod fields;
pub mod snapshot;
pub mod units;

pub use error::TransportError;
pub use fields::{LevelField, SurfaceField};
pub use snapshot::{BatchWindow, FieldSnapshot};
pub use units::*;
