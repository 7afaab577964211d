// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

use std::fmt;

use crate::astro_util::range_degrees;
use crate::mount_error::{MountError, MountResult};

// Equatorial position in the mean (catalog) frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkyPosition {
    // Degrees, 0..360.
    pub ra: f64,
    // Degrees, -90..90.
    pub dec: f64,
}

impl SkyPosition {
    /// Returns a position with `ra` normalized into [0, 360). Fails if `dec`
    /// is outside [-90, 90] or either coordinate is not finite.
    pub fn new(ra: f64, dec: f64) -> MountResult<Self> {
        if !ra.is_finite() || !dec.is_finite() {
            return Err(MountError::InvalidArgument(format!(
                "non-finite sky position ra={} dec={}",
                ra, dec
            )));
        }
        if !(-90.0..=90.0).contains(&dec) {
            return Err(MountError::InvalidArgument(format!(
                "declination {} outside [-90, 90]",
                dec
            )));
        }
        Ok(SkyPosition {
            ra: range_degrees(ra),
            dec,
        })
    }
}

impl fmt::Display for SkyPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RA {:.5} Dec {:+.5}", self.ra, self.dec)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HorizontalPosition {
    // Degrees, clockwise from north, 0..360.
    pub az: f64,
    // Degrees above the horizon.
    pub alt: f64,
}

impl HorizontalPosition {
    pub fn new(az: f64, alt: f64) -> Self {
        HorizontalPosition {
            az: range_degrees(az),
            alt,
        }
    }
}

impl fmt::Display for HorizontalPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Az {:.5} Alt {:+.5}", self.az, self.alt)
    }
}

/// Raw actuator counts. For a GEM, axis1 is the hour angle axis and axis2 the
/// declination axis; for an AltAz mount, axis1 is azimuth and axis2 zenith
/// distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EncoderPosition {
    pub axis1: i32,
    pub axis2: i32,
}

impl EncoderPosition {
    pub fn new(axis1: i32, axis2: i32) -> Self {
        EncoderPosition { axis1, axis2 }
    }
}

impl fmt::Display for EncoderPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.axis1, self.axis2)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObserverSite {
    // Degrees, positive north.
    pub latitude: f64,
    // Degrees, positive east.
    pub longitude: f64,
    // Meters above sea level.
    pub altitude: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountGeometry {
    Gem,
    AltAz,
}

/// Which of the two mechanically equivalent configurations a GEM uses. On an
/// AltAz mount, Flipped means the altitude axis went over the zenith.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PierSide {
    Normal,
    Flipped,
}

impl PierSide {
    pub fn opposite(self) -> Self {
        match self {
            PierSide::Normal => PierSide::Flipped,
            PierSide::Flipped => PierSide::Normal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sky_position_normalizes_ra() {
        let pos = SkyPosition::new(-10.0, 45.0).unwrap();
        assert_eq!(pos.ra, 350.0);
        let pos = SkyPosition::new(725.0, -45.0).unwrap();
        assert_eq!(pos.ra, 5.0);
    }

    #[test]
    fn test_sky_position_rejects_bad_dec() {
        assert!(SkyPosition::new(10.0, 90.5).is_err());
        assert!(SkyPosition::new(10.0, f64::NAN).is_err());
        assert!(SkyPosition::new(10.0, -90.0).is_ok());
    }

    #[test]
    fn test_horizontal_position() {
        let hrz = HorizontalPosition::new(-90.0, 30.0);
        assert_eq!(hrz.az, 270.0);
        assert_eq!(PierSide::Normal.opposite(), PierSide::Flipped);
    }
}  // mod tests.
