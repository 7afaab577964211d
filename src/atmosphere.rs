// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

use log::debug;

use telmount_elements::astro_util::{
    alt_az_from_hour_angle, hour_angle_from_alt_az, local_sidereal_time,
};
use telmount_elements::mount_error::{MountError, MountResult};
use telmount_elements::mount_types::{ObserverSite, SkyPosition};

/// Sea level pressure assumed when no barometer reading is available.
pub const REFERENCE_PRESSURE_HPA: f64 = 1010.0;

/// Temperature assumed when no sensor reading is supplied.
pub const DEFAULT_TEMPERATURE_C: f64 = 10.0;

// Below this true altitude the refraction formula is not trusted.
const MIN_REFRACTION_ALTITUDE: f64 = -1.0;

// International standard atmosphere, troposphere layer.
const LAPSE_RATE: f64 = 0.0065; // K/m.
const SEA_LEVEL_TEMPERATURE: f64 = 288.15; // K.
const GRAVITY: f64 = 9.80665; // m/s².
const AIR_MOLAR_MASS: f64 = 0.0289644; // kg/mol.
const GAS_CONSTANT: f64 = 8.31447; // J/(mol K).

/// Translates `reference_pressure` (hPa, at sea level) to the pressure at
/// `altitude` meters using the barometric formula with a constant
/// temperature lapse rate. Negative altitudes yield pressures above the
/// reference.
pub fn pressure_at_altitude(altitude: f64, reference_pressure: f64) -> f64 {
    let exponent = GRAVITY * AIR_MOLAR_MASS / (GAS_CONSTANT * LAPSE_RATE);
    let base = (1.0 - LAPSE_RATE * altitude / SEA_LEVEL_TEMPERATURE).max(0.0);
    reference_pressure * base.powf(exponent)
}

/// Converts between true and apparent altitude for a given local pressure
/// and temperature.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RefractionCorrector {
    // hPa at the observer.
    pressure: f64,
    // Celsius.
    temperature: f64,
}

impl RefractionCorrector {
    pub fn new(pressure: f64, temperature: f64) -> Self {
        RefractionCorrector {
            pressure,
            temperature,
        }
    }

    /// Corrector for a site, deriving local pressure from the site altitude.
    pub fn for_site(
        site: &ObserverSite,
        reference_pressure: f64,
        temperature: f64,
    ) -> Self {
        Self::new(
            pressure_at_altitude(site.altitude, reference_pressure),
            temperature,
        )
    }

    pub fn pressure(&self) -> f64 {
        self.pressure
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    /// Returns a corrector using `temperature` if supplied.
    pub fn with_temperature(&self, temperature: Option<f64>) -> Self {
        Self::new(self.pressure, temperature.unwrap_or(self.temperature))
    }

    /// Refraction (degrees) to add to the true altitude `true_alt` (degrees).
    /// Saemundsson's formula, scaled for pressure and temperature.
    pub fn refraction(&self, true_alt: f64) -> MountResult<f64> {
        if !true_alt.is_finite() || true_alt < MIN_REFRACTION_ALTITUDE {
            return Err(MountError::SingularGeometry(format!(
                "refraction undefined at altitude {}",
                true_alt
            )));
        }
        if self.temperature <= -273.0 || !self.pressure.is_finite() {
            return Err(MountError::InvalidArgument(format!(
                "bad atmosphere: {} hPa, {} C",
                self.pressure, self.temperature
            )));
        }
        let arg = (true_alt + 10.3 / (true_alt + 5.11)).to_radians();
        let arcmin = 1.02 / arg.tan() + 0.0019279;
        let scale = (self.pressure / REFERENCE_PRESSURE_HPA) * (283.0 / (273.0 + self.temperature));
        Ok(arcmin * scale / 60.0)
    }

    /// True altitude to apparent altitude.
    pub fn refract(&self, true_alt: f64) -> MountResult<f64> {
        Ok((true_alt + self.refraction(true_alt)?).min(90.0))
    }

    /// Apparent altitude to true altitude.
    pub fn unrefract(&self, apparent_alt: f64) -> MountResult<f64> {
        let mut true_alt = apparent_alt;
        for _i in 0..30 {
            let next = apparent_alt - self.refraction(true_alt)?;
            let delta = (next - true_alt).abs();
            true_alt = next;
            if delta < 1e-10 {
                break;
            }
        }
        Ok(true_alt)
    }

    /// Moves `pos` to its apparent (refracted) place as seen from `site` at
    /// `jd`. `temperature` overrides the configured temperature when a
    /// sensor reading is available. Not self-inverse; see
    /// remove_refraction().
    pub fn apply_refraction(
        &self,
        site: &ObserverSite,
        jd: f64,
        pos: &SkyPosition,
        temperature: Option<f64>,
    ) -> MountResult<SkyPosition> {
        let corrector = self.with_temperature(temperature);
        self.shift_altitude(site, jd, pos, |alt| corrector.refract(alt))
    }

    /// Recovers the true place from an apparent place.
    pub fn remove_refraction(
        &self,
        site: &ObserverSite,
        jd: f64,
        pos: &SkyPosition,
        temperature: Option<f64>,
    ) -> MountResult<SkyPosition> {
        let corrector = self.with_temperature(temperature);
        self.shift_altitude(site, jd, pos, |alt| corrector.unrefract(alt))
    }

    // Applies `f` to the altitude of `pos`, keeping its azimuth.
    fn shift_altitude<F>(
        &self,
        site: &ObserverSite,
        jd: f64,
        pos: &SkyPosition,
        f: F,
    ) -> MountResult<SkyPosition>
    where
        F: Fn(f64) -> MountResult<f64>,
    {
        let lat = site.latitude.to_radians();
        let lst = local_sidereal_time(jd, site.longitude.to_radians());
        let ha = lst - pos.ra.to_radians();
        let (alt, az) = alt_az_from_hour_angle(ha, pos.dec.to_radians(), lat);
        let shifted = f(alt.to_degrees())?;
        debug!(
            "refraction at az {:.4}: alt {:.6} -> {:.6}",
            az.to_degrees(),
            alt.to_degrees(),
            shifted
        );
        let (ha, dec) = hour_angle_from_alt_az(shifted.to_radians(), az, lat);
        SkyPosition::new((lst - ha).to_degrees(), dec.to_degrees())
    }
}

// mod tests.
