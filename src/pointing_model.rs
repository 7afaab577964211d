// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

use std::fmt;
use std::fs;
use std::path::Path;

use telmount_elements::mount_error::{MountError, MountResult};
use telmount_elements::mount_types::MountGeometry;

use crate::gpoint::{GPointFrame, GPointModel};
use crate::tpoint::TpointModel;

/// A loaded pointing model. Corrections map mean coordinates to telescope
/// coordinates and back; the coordinate pair is (hour angle, declination)
/// for equatorial models and (azimuth, altitude) for horizontal ones.
#[derive(Debug, Clone, PartialEq)]
pub enum PointingModel {
    Tpoint(TpointModel),
    GPoint(GPointModel),
}

impl PointingModel {
    /// Parses either text format, distinguished by the header line.
    pub fn parse(text: &str) -> MountResult<Self> {
        let first_token = text
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty() && !l.starts_with('#'))
            .and_then(|l| l.split_whitespace().next());
        match first_token {
            Some("RTS2_MODEL") | Some("RTS2_ALTAZ") => {
                Ok(PointingModel::GPoint(GPointModel::parse(text)?))
            }
            _ => Ok(PointingModel::Tpoint(TpointModel::parse(text)?)),
        }
    }

    pub fn load_file(path: &Path) -> MountResult<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            MountError::InvalidArgument(format!(
                "cannot read pointing model {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::parse(&text)
    }

    /// Whether this model corrects in the frame `geometry` uses.
    pub fn supports(&self, geometry: MountGeometry) -> bool {
        match self {
            PointingModel::Tpoint(_) => geometry == MountGeometry::Gem,
            PointingModel::GPoint(m) => match m.frame {
                GPointFrame::Equatorial => geometry == MountGeometry::Gem,
                GPointFrame::Horizontal => geometry == MountGeometry::AltAz,
            },
        }
    }

    /// Mean to telescope; degrees in and out. `lat` is the site latitude.
    pub fn to_telescope(&self, a: f64, b: f64, lat: f64) -> (f64, f64) {
        let (a, b, lat) = (a.to_radians(), b.to_radians(), lat.to_radians());
        let (ta, tb) = match self {
            PointingModel::Tpoint(m) => m.apply(a, b, lat),
            PointingModel::GPoint(m) => m.apply(a, b, lat),
        };
        (ta.to_degrees(), tb.to_degrees())
    }

    /// Telescope to mean; degrees in and out. None where the model cannot
    /// be inverted.
    pub fn to_mean(&self, a: f64, b: f64, lat: f64) -> Option<(f64, f64)> {
        let (a, b, lat) = (a.to_radians(), b.to_radians(), lat.to_radians());
        let (ma, mb) = match self {
            PointingModel::Tpoint(m) => m.reverse(a, b, lat),
            PointingModel::GPoint(m) => m.reverse(a, b, lat),
        }?;
        Some((ma.to_degrees(), mb.to_degrees()))
    }
}

impl fmt::Display for PointingModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PointingModel::Tpoint(m) => fmt::Display::fmt(m, f),
            PointingModel::GPoint(m) => fmt::Display::fmt(m, f),
        }
    }
}

#[cfg(test)]
mod tests {
    extern crate approx;
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn test_parse_dispatch() {
        let tpoint = PointingModel::parse("caption\nT 10 1.0 0 0\nIH 36\nEND\n").unwrap();
        assert!(matches!(tpoint, PointingModel::Tpoint(_)));
        assert!(tpoint.supports(MountGeometry::Gem));
        assert!(!tpoint.supports(MountGeometry::AltAz));

        let altaz = PointingModel::parse("# fitted 2016\nRTS2_ALTAZ 0 0 0 0 0 0 0\n").unwrap();
        assert!(altaz.supports(MountGeometry::AltAz));
        assert!(!altaz.supports(MountGeometry::Gem));

        let equ = PointingModel::parse("RTS2_MODEL 0 0 0 0 0 0 0 0 0").unwrap();
        assert!(equ.supports(MountGeometry::Gem));
    }

    #[test]
    fn test_degrees_interface() {
        let model = PointingModel::parse("caption\nT 10 1.0 0 0\nIH 36\nID -72\nEND\n").unwrap();
        let (ha, dec) = model.to_telescope(10.0, 20.0, 45.0);
        assert_abs_diff_eq!(ha, 10.0 - 0.01, epsilon = 1e-12);
        assert_abs_diff_eq!(dec, 20.0 + 0.02, epsilon = 1e-12);
        let (ha, dec) = model.to_mean(ha, dec, 45.0).unwrap();
        assert_abs_diff_eq!(ha, 10.0, epsilon = 1e-12);
        assert_abs_diff_eq!(dec, 20.0, epsilon = 1e-12);
    }

    #[test]
    fn test_load_missing_file() {
        let err = PointingModel::load_file(Path::new("/nonexistent/model.dat"));
        match err {
            Err(MountError::InvalidArgument(msg)) => {
                assert!(msg.contains("/nonexistent/model.dat"))
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}  // mod tests.
