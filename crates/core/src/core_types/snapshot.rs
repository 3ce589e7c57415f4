//! Per-step model state and batch metadata
//!
//! A [`FieldSnapshot`] is one decoded 3-hourly record of the model state:
//! five level-resolved fields plus surface pressure. Snapshots are supplied
//! by an external decoder in time order; the pipeline folds each one into
//! its accumulators and does not retain it (only the first and last step's
//! humidity and surface pressure survive, for the tendency terms).

use serde::{Deserialize, Serialize};

use super::error::TransportError;
use super::fields::{LevelField, SurfaceField};

/// One time step of decoded model output.
///
/// All level fields are shaped `[nlev, nlat, nlon]` with level 0 at the top
/// of the atmosphere; surface pressure is `[nlat, nlon]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSnapshot {
    /// Zonal wind u [m/s]
    pub u: LevelField,
    /// Meridional wind v [m/s], positive northward
    pub v: LevelField,
    /// Air temperature T [K]
    pub temperature: LevelField,
    /// Specific humidity q [kg/kg]
    pub humidity: LevelField,
    /// Geopotential gz [m^2/s^2]
    pub geopotential: LevelField,
    /// Surface pressure sp [Pa]
    pub surface_pressure: SurfaceField,
}

impl FieldSnapshot {
    /// Check every array against the declared grid and level counts.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::ShapeMismatch`] naming the first offending
    /// array.
    pub fn validate_shape(
        &self,
        nlev: usize,
        nlat: usize,
        nlon: usize,
    ) -> Result<(), TransportError> {
        let level_len = nlev * nlat * nlon;
        let surface_len = nlat * nlon;
        let level_fields: [(&LevelField, &'static str); 5] = [
            (&self.u, "zonal wind"),
            (&self.v, "meridional wind"),
            (&self.temperature, "temperature"),
            (&self.humidity, "humidity"),
            (&self.geopotential, "geopotential"),
        ];
        for (field, context) in level_fields {
            if field.nlev != nlev || field.nlat != nlat || field.nlon != nlon {
                return Err(TransportError::ShapeMismatch {
                    context,
                    expected: level_len,
                    actual: field.data.len(),
                });
            }
        }
        if self.surface_pressure.nlat != nlat || self.surface_pressure.nlon != nlon {
            return Err(TransportError::ShapeMismatch {
                context: "surface pressure",
                expected: surface_len,
                actual: self.surface_pressure.data.len(),
            });
        }
        Ok(())
    }
}

/// Batch-level time metadata: how many steps and how many elapsed days.
///
/// The elapsed days feed the tendency denominators (`days * 86400` seconds).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BatchWindow {
    /// Number of time steps in the batch
    pub steps: usize,
    /// Elapsed days covered by the batch
    pub days: f64,
}

impl BatchWindow {
    /// Create a window with an explicit day count.
    ///
    /// # Panics
    ///
    /// Panics if `days` is not a positive finite number.
    #[must_use]
    #[track_caller]
    pub fn new(steps: usize, days: f64) -> Self {
        assert!(
            days.is_finite() && days > 0.0,
            "BatchWindow::new: days must be positive and finite"
        );
        Self { steps, days }
    }

    /// Window for a 3-hourly leg whose first midnight record is absent.
    ///
    /// Model legs start at 03:00, so a full day contributes 8 records with
    /// the leading 00:00 omitted: `days = (steps + 1) / 8`.
    #[must_use]
    pub fn from_three_hourly_steps(steps: usize) -> Self {
        Self::new(steps, (steps + 1) as f64 / 8.0)
    }

    /// Elapsed time in seconds
    #[must_use]
    pub fn seconds(&self) -> f64 {
        self.days * 86_400.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(nlev: usize, nlat: usize, nlon: usize) -> FieldSnapshot {
        FieldSnapshot {
            u: LevelField::new(nlev, nlat, nlon),
            v: LevelField::new(nlev, nlat, nlon),
            temperature: LevelField::new(nlev, nlat, nlon),
            humidity: LevelField::new(nlev, nlat, nlon),
            geopotential: LevelField::new(nlev, nlat, nlon),
            surface_pressure: SurfaceField::new(nlat, nlon),
        }
    }

    #[test]
    fn test_validate_accepts_matching_shapes() {
        let snap = snapshot(2, 4, 8);
        assert!(snap.validate_shape(2, 4, 8).is_ok());
    }

    #[test]
    fn test_validate_names_offending_array() {
        let mut snap = snapshot(2, 4, 8);
        snap.temperature = LevelField::new(2, 4, 7);
        let err = snap.validate_shape(2, 4, 8).unwrap_err();
        match err {
            TransportError::ShapeMismatch { context, .. } => {
                assert_eq!(context, "temperature");
            }
            other => panic!("expected ShapeMismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_checks_surface_pressure() {
        let mut snap = snapshot(2, 4, 8);
        snap.surface_pressure = SurfaceField::new(3, 8);
        let err = snap.validate_shape(2, 4, 8).unwrap_err();
        match err {
            TransportError::ShapeMismatch { context, .. } => {
                assert_eq!(context, "surface pressure");
            }
            other => panic!("expected ShapeMismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_three_hourly_window() {
        // A 31-day month of 3-hourly records without the first midnight:
        // 31 * 8 - 1 = 247 records
        let window = BatchWindow::from_three_hourly_steps(247);
        assert_eq!(window.days, 31.0);
        assert_eq!(window.seconds(), 31.0 * 86_400.0);
    }

    #[test]
    #[should_panic(expected = "days must be positive")]
    fn test_window_rejects_zero_days() {
        let _ = BatchWindow::new(8, 0.0);
    }
}
