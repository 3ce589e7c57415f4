//! Hybrid sigma-pressure vertical levels
//!
//! The vertical coordinate blends terrain-following and pure-pressure
//! surfaces through two coefficient tables A (pressure offset, Pa) and B
//! (surface-pressure fraction). Half-level `k` sits at pressure
//!
//! ```text
//! p_half[k] = A[k] + B[k] * sp
//! ```
//!
//! and full level `k` is the layer between half-levels `k` and `k+1`, so its
//! pressure thickness is
//!
//! ```text
//! dp[k] = (A[k+1] + B[k+1] * sp) - (A[k] + B[k] * sp)
//! ```
//!
//! Levels are ordered top-of-atmosphere (k = 0, where B = 0) down to the
//! surface (k = L-1, where B reaches 1), matching the snapshot convention.
//! The thickness telescopes: summing dp over all levels reproduces sp minus
//! the model-top pressure exactly.
//!
//! A non-monotonic coefficient table would produce negative thickness; that
//! is an external precondition on the table, not checked per step. The test
//! suite pins it down for the built-in EC-Earth table instead.

use serde::{Deserialize, Serialize};

use crate::core_types::fields::{LevelField, SurfaceField};

/// Hybrid-level coefficient table defining the vertical discretization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SigmaLevels {
    /// Half-level pressure offsets A [Pa], top first, length L + 1
    a: Vec<f64>,
    /// Half-level pressure fractions B [dimensionless, 0..=1], length L + 1
    b: Vec<f64>,
}

impl SigmaLevels {
    /// Build a table from half-level coefficient arrays.
    ///
    /// # Panics
    ///
    /// Panics if the arrays differ in length or describe fewer than one
    /// full level (two half-levels).
    #[must_use]
    pub fn new(a: Vec<f64>, b: Vec<f64>) -> Self {
        assert_eq!(
            a.len(),
            b.len(),
            "Sigma coefficient arrays must have equal length"
        );
        assert!(
            a.len() >= 2,
            "Sigma coefficients need at least two half-levels"
        );
        Self { a, b }
    }

    /// Number of full model levels (one fewer than half-levels)
    #[must_use]
    pub fn nlev(&self) -> usize {
        self.a.len() - 1
    }

    /// Pressure of half-level `k` for a given surface pressure [Pa]
    ///
    /// # Panics
    ///
    /// Panics if `k` exceeds the half-level count.
    #[must_use]
    pub fn half_level_pressure(&self, k: usize, sp: f64) -> f64 {
        self.a[k] + self.b[k] * sp
    }

    /// Pressure thickness of full level `level` for a scalar surface pressure
    ///
    /// # Panics
    ///
    /// Panics if `level >= nlev()`.
    #[must_use]
    pub fn thickness_at(&self, level: usize, sp: f64) -> f64 {
        assert!(level < self.nlev(), "Level index out of bounds");
        (self.a[level + 1] - self.a[level]) + (self.b[level + 1] - self.b[level]) * sp
    }

    /// Compute the full thickness field for one step's surface pressure.
    ///
    /// Writes `dp[k, j, i] = (A[k+1] - A[k]) + (B[k+1] - B[k]) * sp[j, i]`
    /// for every level and grid point.
    ///
    /// # Panics
    ///
    /// Panics if `out` does not match the surface-pressure grid and this
    /// table's level count.
    pub fn thickness_field(&self, sp: &SurfaceField, out: &mut LevelField) {
        assert!(
            out.nlev == self.nlev() && out.nlat == sp.nlat && out.nlon == sp.nlon,
            "Thickness field dimensions do not match"
        );
        for level in 0..self.nlev() {
            let da = self.a[level + 1] - self.a[level];
            let db = self.b[level + 1] - self.b[level];
            for (dp, &p) in out.level_mut(level).iter_mut().zip(sp.as_slice()) {
                *dp = da + db * p;
            }
        }
    }

    /// The EC-Earth 91-level coefficient table (92 half-levels).
    ///
    /// Top of atmosphere first: A and B are both zero at the model top, and
    /// B reaches exactly 1 at the surface half-level.
    #[must_use]
    pub fn ec_earth_l91() -> Self {
        #[rustfmt::skip]
        let a = vec![
            0.0, 2.00004, 3.980832, 7.387186,
            12.908319, 21.413612, 33.952858, 51.746601,
            76.167656, 108.715561, 150.986023, 204.637451,
            271.356506, 352.824493, 450.685791, 566.519226,
            701.813354, 857.945801, 1036.166504, 1237.585449,
            1463.16394, 1713.709595, 1989.87439, 2292.155518,
            2620.898438, 2976.302246, 3358.425781, 3767.196045,
            4202.416504, 4663.776367, 5150.859863, 5663.15625,
            6199.839355, 6759.727051, 7341.469727, 7942.92627,
            8564.624023, 9208.305664, 9873.560547, 10558.881836,
            11262.484375, 11982.662109, 12713.897461, 13453.225586,
            14192.009766, 14922.685547, 15638.053711, 16329.560547,
            16990.623047, 17613.28125, 18191.029297, 18716.96875,
            19184.544922, 19587.513672, 19919.796875, 20175.394531,
            20348.916016, 20434.158203, 20426.21875, 20319.011719,
            20107.03125, 19785.357422, 19348.775391, 18798.822266,
            18141.296875, 17385.595703, 16544.585938, 15633.566406,
            14665.645508, 13653.219727, 12608.383789, 11543.166992,
            10471.310547, 9405.222656, 8356.25293, 7335.164551,
            6353.920898, 5422.802734, 4550.21582, 3743.464355,
            3010.146973, 2356.202637, 1784.854614, 1297.656128,
            895.193542, 576.314148, 336.772369, 162.043427,
            54.208336, 6.575628, 0.00316, 0.0,
        ];
        #[rustfmt::skip]
        let b = vec![
            0.0, 0.0, 0.0, 0.0,
            0.0, 0.0, 0.0, 0.0,
            0.0, 0.0, 0.0, 0.0,
            0.0, 0.0, 0.0, 0.0,
            0.0, 0.0, 0.0, 0.0,
            0.0, 0.0, 0.0, 0.0,
            0.0, 0.0, 0.0, 0.0,
            0.0, 0.0, 0.0, 0.0,
            0.0, 0.0, 0.0, 1.4e-5,
            5.5e-5, 0.000131, 0.000279, 0.000548,
            0.001, 0.001701, 0.002765, 0.004267,
            0.006322, 0.009035, 0.012508, 0.01686,
            0.022189, 0.02861, 0.036227, 0.045146,
            0.055474, 0.067316, 0.080777, 0.095964,
            0.112979, 0.131935, 0.152934, 0.176091,
            0.20152, 0.229315, 0.259554, 0.291993,
            0.326329, 0.362203, 0.399205, 0.436906,
            0.475016, 0.51328, 0.551458, 0.589317,
            0.626559, 0.662934, 0.698224, 0.732224,
            0.764679, 0.795385, 0.824185, 0.85095,
            0.875518, 0.897767, 0.917651, 0.935157,
            0.950274, 0.963007, 0.973466, 0.982238,
            0.989153, 0.994204, 0.99763, 1.0,
        ];
        Self::new(a, b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_structural_validation() {
        let levels = SigmaLevels::new(vec![0.0, 50.0, 100.0], vec![0.0, 0.5, 1.0]);
        assert_eq!(levels.nlev(), 2);
    }

    #[test]
    #[should_panic(expected = "equal length")]
    fn test_rejects_mismatched_tables() {
        let _ = SigmaLevels::new(vec![0.0, 50.0, 100.0], vec![0.0, 1.0]);
    }

    #[test]
    fn test_two_level_thickness() {
        // 2-level table: both layers span 50 Pa + half the surface pressure
        let levels = SigmaLevels::new(vec![0.0, 50.0, 100.0], vec![0.0, 0.5, 1.0]);
        assert_eq!(levels.thickness_at(0, 100_000.0), 50_050.0);
        assert_eq!(levels.thickness_at(1, 100_000.0), 50_050.0);
    }

    #[test]
    fn test_thickness_field_matches_scalar_path() {
        let levels = SigmaLevels::new(vec![0.0, 50.0, 100.0], vec![0.0, 0.5, 1.0]);
        let mut sp = SurfaceField::new(2, 3);
        sp.fill(95_000.0);
        sp.set(1, 2, 101_325.0);
        let mut dp = LevelField::new(2, 2, 3);
        levels.thickness_field(&sp, &mut dp);
        assert_eq!(dp.get(0, 0, 0), levels.thickness_at(0, 95_000.0));
        assert_eq!(dp.get(1, 1, 2), levels.thickness_at(1, 101_325.0));
    }

    #[test]
    fn test_l91_table_structure() {
        let levels = SigmaLevels::ec_earth_l91();
        assert_eq!(levels.nlev(), 91);
        // Model top is pure pressure at 0 Pa; surface half-level is pure sigma
        assert_eq!(levels.half_level_pressure(0, 100_000.0), 0.0);
        assert_eq!(levels.half_level_pressure(91, 100_000.0), 100_000.0);
    }

    #[test]
    fn test_l91_thickness_positive_over_realistic_pressure_range() {
        let levels = SigmaLevels::ec_earth_l91();
        // From deep cyclones up past the highest recorded sea-level pressure
        let mut sp = 40_000.0;
        while sp <= 110_000.0 {
            for level in 0..levels.nlev() {
                let dp = levels.thickness_at(level, sp);
                assert!(
                    dp >= 0.0,
                    "negative thickness {dp} at level {level}, sp {sp}"
                );
            }
            sp += 2_500.0;
        }
    }

    #[test]
    fn test_l91_column_mass_telescopes_to_surface_pressure() {
        let levels = SigmaLevels::ec_earth_l91();
        for &sp in &[54_321.0, 98_765.0, 101_325.0] {
            let total: f64 = (0..levels.nlev())
                .map(|level| levels.thickness_at(level, sp))
                .sum();
            assert_relative_eq!(total, sp, max_relative = 1e-12);
        }
    }
}
