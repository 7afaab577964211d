// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

use telmount_elements::mount_error::{MountError, MountResult};

// Linear calibration of one mount axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisConfig {
    // Axis angle (degrees) at tick zero.
    pub zero_offset: f64,

    // Signed; a negative value means ticks decrease as the angle increases.
    pub ticks_per_degree: f64,

    // Inclusive valid tick range.
    pub tick_min: i32,
    pub tick_max: i32,
}

/// Maps between an axis angle in degrees and a signed encoder count.
#[derive(Debug, Clone)]
pub struct AxisTickModel {
    name: String,
    config: AxisConfig,
}

impl AxisTickModel {
    pub fn new(name: &str, config: AxisConfig) -> MountResult<Self> {
        if !config.ticks_per_degree.is_finite()
            || config.ticks_per_degree == 0.0
        {
            return Err(MountError::InvalidArgument(format!(
                "{} axis ticks_per_degree must be finite and non-zero; got {}",
                name, config.ticks_per_degree
            )));
        }
        if !config.zero_offset.is_finite() {
            return Err(MountError::InvalidArgument(format!(
                "{} axis zero offset must be finite",
                name
            )));
        }
        if config.tick_min > config.tick_max {
            return Err(MountError::InvalidArgument(format!(
                "{} axis tick_min {} exceeds tick_max {}",
                name, config.tick_min, config.tick_max
            )));
        }
        Ok(AxisTickModel {
            name: name.to_string(),
            config,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &AxisConfig {
        &self.config
    }

    pub fn ticks_per_degree(&self) -> f64 {
        self.config.ticks_per_degree
    }

    /// Number of ticks in one full axis revolution (always positive).
    pub fn ticks_per_turn(&self) -> f64 {
        360.0 * self.config.ticks_per_degree.abs()
    }

    /// Unbounded tick value for `angle`, rounded to the nearest tick.
    pub fn raw_ticks(&self, angle: f64) -> MountResult<i64> {
        let ticks =
            ((angle - self.config.zero_offset) * self.config.ticks_per_degree)
                .round();
        if !ticks.is_finite() || ticks.abs() > i64::MAX as f64 / 2.0 {
            return Err(MountError::SingularGeometry(format!(
                "{} axis angle {} has no tick representation",
                self.name, angle
            )));
        }
        Ok(ticks as i64)
    }

    /// Tick value for `angle`; fails with OutOfRange outside the configured
    /// tick range.
    pub fn to_ticks(&self, angle: f64) -> MountResult<i32> {
        let ticks = self.raw_ticks(angle)?;
        self.check(ticks)
    }

    pub fn to_angle(&self, ticks: i32) -> f64 {
        ticks as f64 / self.config.ticks_per_degree + self.config.zero_offset
    }

    pub fn contains(&self, ticks: i64) -> bool {
        ticks >= self.config.tick_min as i64 && ticks <= self.config.tick_max as i64
    }

    pub fn check(&self, ticks: i64) -> MountResult<i32> {
        if self.contains(ticks) {
            Ok(ticks as i32)
        } else {
            Err(self.out_of_range(ticks))
        }
    }

    pub fn out_of_range(&self, ticks: i64) -> MountError {
        MountError::OutOfRange {
            axis: self.name.clone(),
            ticks,
            min: self.config.tick_min,
            max: self.config.tick_max,
        }
    }

    /// Limits `ticks` to the configured range. Used for simulated stepping.
    pub fn clamp(&self, ticks: i64) -> i32 {
        ticks.clamp(self.config.tick_min as i64, self.config.tick_max as i64)
            as i32
    }

    /// Among the full-turn aliases of `ticks`, returns the in-range one
    /// closest to `reference`, or None when no alias is in range.
    pub fn nearest_alias(&self, ticks: i64, reference: i32) -> Option<i32> {
        let turn = self.ticks_per_turn().round() as i64;
        let reference = reference as i64;
        let turns = ((reference - ticks) as f64 / turn as f64).round() as i64;
        let base = ticks + turns * turn;
        (-2..=2)
            .map(|k| base + k * turn)
            .filter(|t| self.contains(*t))
            .min_by_key(|t| (t - reference).abs())
            .map(|t| t as i32)
    }
}

#[cfg(test)]
mod tests {
    extern crate approx;
    use approx::assert_abs_diff_eq;

    use super::*;

    fn ra_axis() -> AxisTickModel {
        AxisTickModel::new(
            "ra",
            AxisConfig {
                zero_offset: 90.0,
                ticks_per_degree: 67108864.0 / 360.0,
                tick_min: -80000000,
                tick_max: 80000000,
            },
        )
        .unwrap()
    }

    #[test]
    fn test_to_ticks() {
        let axis = ra_axis();
        assert_eq!(axis.to_ticks(90.0).unwrap(), 0);
        assert_eq!(axis.to_ticks(20.0).unwrap(), -13048946);
        assert_abs_diff_eq!(axis.to_angle(-13048946), 20.0, epsilon = 1e-5);
    }

    #[test]
    fn test_out_of_range() {
        let axis = ra_axis();
        match axis.to_ticks(90.0 + 500.0) {
            Err(MountError::OutOfRange { axis, min, max, .. }) => {
                assert_eq!(axis, "ra");
                assert_eq!(min, -80000000);
                assert_eq!(max, 80000000);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(axis.clamp(100000000), 80000000);
        assert_eq!(axis.clamp(-100000000), -80000000);
    }

    #[test]
    fn test_negative_scale() {
        let axis = AxisTickModel::new(
            "dec",
            AxisConfig {
                zero_offset: 0.0,
                ticks_per_degree: -100.0,
                tick_min: -100000,
                tick_max: 100000,
            },
        )
        .unwrap();
        assert_eq!(axis.to_ticks(10.0).unwrap(), -1000);
        assert_abs_diff_eq!(axis.to_angle(-1000), 10.0, epsilon = 1e-12);
        assert_eq!(axis.ticks_per_turn(), 36000.0);
    }

    #[test]
    fn test_nearest_alias() {
        let axis = ra_axis();
        let turn = 67108864;
        // Closest alias to the reference wins.
        assert_eq!(axis.nearest_alias(-13048946, -20000000), Some(-13048946));
        assert_eq!(
            axis.nearest_alias(-13048946, 60000000),
            Some(-13048946 + turn)
        );
        // Out-of-range aliases are skipped.
        assert_eq!(axis.nearest_alias(79000000, 79000000), Some(79000000));
        assert_eq!(
            axis.nearest_alias((79000000 + turn) as i64, 79000000),
            Some(79000000)
        );
    }

    #[test]
    fn test_invalid_config() {
        let bad = AxisConfig {
            zero_offset: 0.0,
            ticks_per_degree: 0.0,
            tick_min: 0,
            tick_max: 10,
        };
        assert!(AxisTickModel::new("x", bad).is_err());
        let bad = AxisConfig {
            zero_offset: 0.0,
            ticks_per_degree: 1.0,
            tick_min: 10,
            tick_max: 0,
        };
        assert!(AxisTickModel::new("x", bad).is_err());
    }
}  // mod tests.
