//! Horizontal grid modules

pub mod geometry;

// Re-export main types
pub use geometry::GridGeometry;
