// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

use telmount_elements::mount_error::{MountError, MountResult};
use telmount_elements::mount_types::{MountGeometry, ObserverSite};

use crate::atmosphere::{DEFAULT_TEMPERATURE_C, REFERENCE_PRESSURE_HPA};
use crate::axis::AxisConfig;

/// How a GEM chooses between pier sides when both can reach a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum FlipStrategy {
    // Smaller of the two largest-axis moves.
    Shortest,
    // Stay on the current pier side.
    Same,
    // Change pier side.
    Opposite,
    // Never flipped.
    West,
    // Always flipped.
    East,
    // Larger of the two largest-axis moves. Decided once, then held until
    // the converter's flip memory is reset.
    Longest,
    // Hour angle axis nearer the counterweight-down position.
    CounterweightDown,
    // Hour angle axis farther from the counterweight-down position.
    CounterweightUp,
}

/// Mount setup, supplied by the device configuration at initialization.
#[derive(Debug, Clone)]
pub struct MountConfig {
    pub geometry: MountGeometry,
    pub site: ObserverSite,

    // GEM: hour angle axis; AltAz: azimuth axis (degrees from north).
    pub axis1: AxisConfig,

    // GEM: declination axis; AltAz: zenith distance axis.
    pub axis2: AxisConfig,

    // Treat sky positions as J2000 and precess them to the date.
    pub apply_precession: bool,
    pub apply_refraction: bool,
    pub apply_model: bool,

    // Sea level pressure (hPa) used to derive the site pressure.
    pub reference_pressure: f64,
    // Celsius, used unless a sensor value is supplied.
    pub temperature: f64,

    // Hard horizon, degrees of true altitude.
    pub min_altitude: f64,

    // Largest accepted pointing model correction, degrees.
    pub model_limit: f64,

    pub flip_strategy: FlipStrategy,
}

impl MountConfig {
    /// Configuration with all corrections off and default limits.
    pub fn new(
        geometry: MountGeometry,
        site: ObserverSite,
        axis1: AxisConfig,
        axis2: AxisConfig,
    ) -> Self {
        MountConfig {
            geometry,
            site,
            axis1,
            axis2,
            apply_precession: false,
            apply_refraction: false,
            apply_model: false,
            reference_pressure: REFERENCE_PRESSURE_HPA,
            temperature: DEFAULT_TEMPERATURE_C,
            min_altitude: -5.0,
            model_limit: 5.0,
            flip_strategy: FlipStrategy::Shortest,
        }
    }

    pub fn validate(&self) -> MountResult<()> {
        let site = &self.site;
        if !(-90.0..=90.0).contains(&site.latitude) {
            return Err(MountError::InvalidArgument(format!(
                "latitude {} outside [-90, 90]",
                site.latitude
            )));
        }
        if !site.longitude.is_finite() || !site.altitude.is_finite() {
            return Err(MountError::InvalidArgument(
                "site longitude and altitude must be finite".to_string(),
            ));
        }
        if self.reference_pressure.is_nan() || self.reference_pressure <= 0.0 {
            return Err(MountError::InvalidArgument(format!(
                "reference pressure must be positive; got {}",
                self.reference_pressure
            )));
        }
        if self.temperature.is_nan() || self.temperature <= -273.0 {
            return Err(MountError::InvalidArgument(format!(
                "temperature {} below absolute zero",
                self.temperature
            )));
        }
        if self.model_limit.is_nan() || self.model_limit <= 0.0 {
            return Err(MountError::InvalidArgument(format!(
                "model limit must be positive; got {}",
                self.model_limit
            )));
        }
        if !self.min_altitude.is_finite() {
            return Err(MountError::InvalidArgument(
                "minimum altitude must be finite".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> MountConfig {
        let axis = AxisConfig {
            zero_offset: 0.0,
            ticks_per_degree: 1000.0,
            tick_min: -1000000,
            tick_max: 1000000,
        };
        MountConfig::new(
            MountGeometry::Gem,
            ObserverSite {
                latitude: 50.0,
                longitude: 14.0,
                altitude: 300.0,
            },
            axis,
            axis,
        )
    }

    #[test]
    fn test_defaults_validate() {
        let config = config();
        assert!(config.validate().is_ok());
        assert_eq!(config.flip_strategy, FlipStrategy::Shortest);
        assert_eq!(config.reference_pressure, 1010.0);
    }

    #[test]
    fn test_validate_rejects() {
        let mut config = config();
        config.site.latitude = 95.0;
        assert!(config.validate().is_err());

        let mut config = self::config();
        config.temperature = -300.0;
        assert!(config.validate().is_err());

        let mut config = self::config();
        config.reference_pressure = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = self::config();
        config.model_limit = 0.0;
        assert!(config.validate().is_err());
    }
}  // mod tests.
