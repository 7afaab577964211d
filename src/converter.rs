// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

use std::sync::{Arc, Mutex};

use log::debug;

use telmount_elements::astro_util::{
    alt_az_from_hour_angle, angular_separation, hour_angle_from_alt_az,
    local_sidereal_time, parallactic_angle, parallactic_angle_rate,
    precess_from_j2000, precess_to_j2000, range_degrees, range_degrees_180,
};
use telmount_elements::mount_error::{MountError, MountResult};
use telmount_elements::mount_types::{
    EncoderPosition, HorizontalPosition, MountGeometry, PierSide, SkyPosition,
};

use crate::atmosphere::RefractionCorrector;
use crate::axis::AxisTickModel;
use crate::model_handle::ModelHandle;
use crate::mount_config::{FlipStrategy, MountConfig};

// Interval used to difference positions for tracking rates, seconds.
const TRACKING_STEP_SEC: f64 = 10.0;

#[derive(Debug, Clone, Copy)]
enum SideChoice {
    Auto { allow_flip: bool },
    Fixed(PierSide),
}

/// Converts between catalog sky coordinates and encoder ticks for one
/// mount. Applies precession, refraction and the active pointing model as
/// configured, and resolves GEM pier side and AltAz over-zenith choices.
pub struct CoordinateConverter {
    config: MountConfig,
    axis1: AxisTickModel,
    axis2: AxisTickModel,
    refraction: RefractionCorrector,
    model: Arc<ModelHandle>,
    // Side chosen by the Longest strategy, held until reset_flip_memory().
    longest_side: Mutex<Option<PierSide>>,
}

impl CoordinateConverter {
    pub fn new(config: MountConfig, model: Arc<ModelHandle>) -> MountResult<Self> {
        config.validate()?;
        if model.geometry() != config.geometry {
            return Err(MountError::InvalidArgument(format!(
                "model handle is for {:?}, mount is {:?}",
                model.geometry(),
                config.geometry
            )));
        }
        let (name1, name2) = match config.geometry {
            MountGeometry::Gem => ("ha", "dec"),
            MountGeometry::AltAz => ("az", "zd"),
        };
        let axis1 = AxisTickModel::new(name1, config.axis1)?;
        let axis2 = AxisTickModel::new(name2, config.axis2)?;
        let refraction = RefractionCorrector::for_site(
            &config.site,
            config.reference_pressure,
            config.temperature,
        );
        Ok(CoordinateConverter {
            config,
            axis1,
            axis2,
            refraction,
            model,
            longest_side: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &MountConfig {
        &self.config
    }

    pub fn axis1(&self) -> &AxisTickModel {
        &self.axis1
    }

    pub fn axis2(&self) -> &AxisTickModel {
        &self.axis2
    }

    pub fn model_handle(&self) -> &Arc<ModelHandle> {
        &self.model
    }

    /// Local mean sidereal time in degrees.
    pub fn local_sidereal_time(&self, jd: f64) -> f64 {
        local_sidereal_time(jd, self.config.site.longitude.to_radians())
            .to_degrees()
    }

    /// Encoder ticks that point the telescope at `sky` at time `jd`. Among
    /// the valid tick aliases, the one nearest `current` is used. With
    /// `allow_flip` false a GEM stays in the normal configuration and an
    /// AltAz mount does not go over the zenith.
    pub fn sky2counts(
        &self,
        jd: f64,
        sky: &SkyPosition,
        current: &EncoderPosition,
        allow_flip: bool,
    ) -> MountResult<EncoderPosition> {
        self.sky_to_counts(jd, sky, current, SideChoice::Auto { allow_flip })
    }

    /// As sky2counts(), but on the given pier side only.
    pub fn sky2counts_on_side(
        &self,
        jd: f64,
        sky: &SkyPosition,
        reference: &EncoderPosition,
        side: PierSide,
    ) -> MountResult<EncoderPosition> {
        self.sky_to_counts(jd, sky, reference, SideChoice::Fixed(side))
    }

    /// Catalog position the telescope points at, with the pier side it
    /// does so from.
    pub fn counts2sky(
        &self,
        jd: f64,
        pos: &EncoderPosition,
    ) -> MountResult<(SkyPosition, PierSide)> {
        check_jd(jd)?;
        let (a, b, side) = self.axis_coordinates(pos);
        let (a, b) = self.correct(a, b, false)?;
        let lat = self.config.site.latitude.to_radians();
        let lst = self.local_sidereal_time(jd);
        let true_pos = match self.config.geometry {
            MountGeometry::Gem => {
                let apparent = SkyPosition::new(lst - a, b.clamp(-90.0, 90.0))?;
                if self.config.apply_refraction {
                    self.refraction.remove_refraction(
                        &self.config.site,
                        jd,
                        &apparent,
                        None,
                    )?
                } else {
                    apparent
                }
            }
            MountGeometry::AltAz => {
                let alt = if self.config.apply_refraction {
                    self.refraction.unrefract(b)?
                } else {
                    b
                };
                let (ha, dec) =
                    hour_angle_from_alt_az(alt.to_radians(), a.to_radians(), lat);
                SkyPosition::new(lst - ha.to_degrees(), dec.to_degrees())?
            }
        };
        Ok((self.to_catalog(jd, &true_pos), side))
    }

    /// Horizontal position encoded by `pos`, uncorrected. Used for
    /// reporting and slew progress.
    pub fn counts2hrz(&self, pos: &EncoderPosition) -> HorizontalPosition {
        let (a, b, _side) = self.axis_coordinates(pos);
        match self.config.geometry {
            MountGeometry::AltAz => HorizontalPosition::new(a, b),
            MountGeometry::Gem => {
                let (alt, az) = alt_az_from_hour_angle(
                    a.to_radians(),
                    b.to_radians(),
                    self.config.site.latitude.to_radians(),
                );
                HorizontalPosition::new(az.to_degrees(), alt.to_degrees())
            }
        }
    }

    /// Inverse of counts2hrz(): ticks for a horizontal position, subject to
    /// the horizon limit.
    pub fn hrz2counts(
        &self,
        hrz: &HorizontalPosition,
        current: &EncoderPosition,
        allow_flip: bool,
    ) -> MountResult<EncoderPosition> {
        if !hrz.alt.is_finite() || !hrz.az.is_finite() {
            return Err(MountError::InvalidArgument(format!(
                "non-finite horizontal position {}",
                hrz
            )));
        }
        if hrz.alt < self.config.min_altitude {
            return Err(MountError::Unreachable(format!(
                "{} below horizon limit {}",
                hrz, self.config.min_altitude
            )));
        }
        let choice = SideChoice::Auto { allow_flip };
        match self.config.geometry {
            MountGeometry::AltAz => self.altaz_counts(hrz.az, hrz.alt, current, choice),
            MountGeometry::Gem => {
                let (ha, dec) = hour_angle_from_alt_az(
                    hrz.alt.to_radians(),
                    hrz.az.to_radians(),
                    self.config.site.latitude.to_radians(),
                );
                self.gem_counts(ha.to_degrees(), dec.to_degrees(), current, choice)
            }
        }
    }

    pub fn pier_side(&self, pos: &EncoderPosition) -> PierSide {
        self.axis_coordinates(pos).2
    }

    /// GEM hour angle axis distance (degrees, 0..180) from the position
    /// where the counterweight hangs straight down.
    pub fn counterweight_angle(&self, pos: &EncoderPosition) -> f64 {
        range_degrees_180(self.axis1.to_angle(pos.axis1)).abs()
    }

    /// Forgets the pier side the Longest flip strategy settled on, so the
    /// next conversion decides afresh. Call when a new target is selected.
    pub fn reset_flip_memory(&self) {
        *self.longest_side.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }

    /// Axis rates, ticks per second, that keep `sky` centered while staying
    /// on the pier side sky2counts() picks from `current`.
    pub fn tracking_rates(
        &self,
        jd: f64,
        sky: &SkyPosition,
        current: &EncoderPosition,
    ) -> MountResult<(f64, f64)> {
        let start = self.sky2counts(jd, sky, current, true)?;
        let side = self.pier_side(&start);
        let later = self.sky2counts_on_side(
            jd + TRACKING_STEP_SEC / 86400.0,
            sky,
            &start,
            side,
        )?;
        Ok((
            (later.axis1 as f64 - start.axis1 as f64) / TRACKING_STEP_SEC,
            (later.axis2 as f64 - start.axis2 as f64) / TRACKING_STEP_SEC,
        ))
    }

    /// Parallactic angle (degrees) of `sky` at `jd`, and its rate in
    /// degrees per hour. Drives field derotation on AltAz mounts.
    pub fn parallactic(&self, jd: f64, sky: &SkyPosition) -> (f64, f64) {
        let mean = self.of_date(jd, sky);
        let ha = (self.local_sidereal_time(jd) - mean.ra).to_radians();
        let dec = mean.dec.to_radians();
        let lat = self.config.site.latitude.to_radians();
        (
            parallactic_angle(ha, dec, lat).to_degrees(),
            parallactic_angle_rate(ha, dec, lat),
        )
    }

    fn sky_to_counts(
        &self,
        jd: f64,
        sky: &SkyPosition,
        reference: &EncoderPosition,
        choice: SideChoice,
    ) -> MountResult<EncoderPosition> {
        check_jd(jd)?;
        let mean = self.of_date(jd, sky);
        let lst = self.local_sidereal_time(jd);
        let (alt, az) = alt_az_from_hour_angle(
            (lst - mean.ra).to_radians(),
            mean.dec.to_radians(),
            self.config.site.latitude.to_radians(),
        );
        let (alt, az) = (alt.to_degrees(), az.to_degrees());
        if alt < self.config.min_altitude {
            return Err(MountError::Unreachable(format!(
                "{} is at altitude {:.3}, below horizon limit {}",
                sky, alt, self.config.min_altitude
            )));
        }
        match self.config.geometry {
            MountGeometry::Gem => {
                let apparent = if self.config.apply_refraction {
                    self.refraction.apply_refraction(
                        &self.config.site,
                        jd,
                        &mean,
                        None,
                    )?
                } else {
                    mean
                };
                let (ha, dec) =
                    self.correct(range_degrees_180(lst - apparent.ra), apparent.dec, true)?;
                self.gem_counts(ha, dec, reference, choice)
            }
            MountGeometry::AltAz => {
                let alt = if self.config.apply_refraction {
                    self.refraction.refract(alt)?
                } else {
                    alt
                };
                let (az, alt) = self.correct(az, alt, true)?;
                self.altaz_counts(az, alt, reference, choice)
            }
        }
    }

    // Catalog position to mean place of date.
    fn of_date(&self, jd: f64, sky: &SkyPosition) -> SkyPosition {
        if !self.config.apply_precession {
            return *sky;
        }
        let (ra, dec) =
            precess_from_j2000(sky.ra.to_radians(), sky.dec.to_radians(), jd);
        SkyPosition {
            ra: range_degrees(ra.to_degrees()),
            dec: dec.to_degrees(),
        }
    }

    fn to_catalog(&self, jd: f64, pos: &SkyPosition) -> SkyPosition {
        if !self.config.apply_precession {
            return *pos;
        }
        let (ra, dec) =
            precess_to_j2000(pos.ra.to_radians(), pos.dec.to_radians(), jd);
        SkyPosition {
            ra: range_degrees(ra.to_degrees()),
            dec: dec.to_degrees(),
        }
    }

    // Applies the active pointing model, mean to telescope when `forward`.
    // Corrections that are non-finite, that cannot be inverted, or that move
    // the sky position or either axis by more than the configured limit are
    // rejected. The per-axis bound catches terms that diverge at the pole or
    // the zenith, where a large axis motion is a tiny step on the sky.
    fn correct(&self, a: f64, b: f64, forward: bool) -> MountResult<(f64, f64)> {
        if !self.config.apply_model {
            return Ok((a, b));
        }
        let Some(model) = self.model.current() else {
            return Ok((a, b));
        };
        let lat = self.config.site.latitude;
        let corrected = if forward {
            Some(model.to_telescope(a, b, lat))
        } else {
            model.to_mean(a, b, lat)
        };
        let Some((ca, cb)) = corrected else {
            return Err(MountError::SingularGeometry(format!(
                "pointing model has no inverse at ({:.4}, {:.4})",
                a, b
            )));
        };
        if !ca.is_finite() || !cb.is_finite() {
            return Err(MountError::SingularGeometry(format!(
                "pointing model diverges at ({:.4}, {:.4})",
                a, b
            )));
        }
        let on_sky = angular_separation(
            a.to_radians(),
            b.to_radians(),
            ca.to_radians(),
            cb.to_radians(),
        )
        .to_degrees();
        // A normalized model output can wrap by at most one turn; anything
        // beyond that is divergence.
        let shift_a = if (ca - a).abs() > 360.0 {
            (ca - a).abs()
        } else {
            range_degrees_180(ca - a).abs()
        };
        let size = on_sky.max(shift_a).max((cb - b).abs());
        if size > self.config.model_limit {
            return Err(MountError::SingularGeometry(format!(
                "pointing model correction {:.3} deg at ({:.4}, {:.4}) exceeds limit {}",
                size, a, b, self.config.model_limit
            )));
        }
        debug!("model ({:.6}, {:.6}) -> ({:.6}, {:.6})", a, b, ca, cb);
        Ok((ca, cb))
    }

    fn gem_counts(
        &self,
        ha: f64,
        dec: f64,
        reference: &EncoderPosition,
        choice: SideChoice,
    ) -> MountResult<EncoderPosition> {
        let dec_axis = if self.southern() { -dec } else { dec };
        let ha = range_degrees_180(ha);
        let normal = self.place(
            self.axis1.raw_ticks(ha)?,
            self.axis2.raw_ticks(dec_axis)?,
            reference,
        );
        let flipped = self.place(
            self.axis1.raw_ticks(ha - 180.0)?,
            self.axis2.raw_ticks(180.0 - dec_axis)?,
            reference,
        );
        self.choose(normal, flipped, reference, choice)
    }

    fn altaz_counts(
        &self,
        az: f64,
        alt: f64,
        reference: &EncoderPosition,
        choice: SideChoice,
    ) -> MountResult<EncoderPosition> {
        let zd = 90.0 - alt;
        let normal = self.place(
            self.axis1.raw_ticks(az)?,
            self.axis2.raw_ticks(zd)?,
            reference,
        );
        let over_zenith = self.place(
            self.axis1.raw_ticks(az + 180.0)?,
            self.axis2.raw_ticks(-zd)?,
            reference,
        );
        self.choose(normal, over_zenith, reference, choice)
    }

    // In-range aliases of the raw tick pair nearest `reference`.
    fn place(
        &self,
        raw1: i64,
        raw2: i64,
        reference: &EncoderPosition,
    ) -> MountResult<EncoderPosition> {
        let axis1 = self
            .axis1
            .nearest_alias(raw1, reference.axis1)
            .ok_or_else(|| self.axis1.out_of_range(raw1))?;
        let axis2 = self
            .axis2
            .nearest_alias(raw2, reference.axis2)
            .ok_or_else(|| self.axis2.out_of_range(raw2))?;
        Ok(EncoderPosition::new(axis1, axis2))
    }

    fn choose(
        &self,
        normal: MountResult<EncoderPosition>,
        flipped: MountResult<EncoderPosition>,
        reference: &EncoderPosition,
        choice: SideChoice,
    ) -> MountResult<EncoderPosition> {
        match choice {
            SideChoice::Fixed(PierSide::Normal) => normal,
            SideChoice::Fixed(PierSide::Flipped) => flipped,
            SideChoice::Auto { allow_flip: false } => normal,
            SideChoice::Auto { allow_flip: true } => match (normal, flipped) {
                (Ok(n), Ok(f)) => Ok(match self.preferred_side(&n, &f, reference) {
                    PierSide::Normal => n,
                    PierSide::Flipped => f,
                }),
                (Ok(n), Err(_)) => Ok(n),
                (Err(_), Ok(f)) => {
                    debug!("only the flipped configuration reaches target");
                    Ok(f)
                }
                (Err(e), Err(_)) => Err(e),
            },
        }
    }

    fn preferred_side(
        &self,
        normal: &EncoderPosition,
        flipped: &EncoderPosition,
        reference: &EncoderPosition,
    ) -> PierSide {
        if self.config.geometry == MountGeometry::AltAz {
            return PierSide::Normal;
        }
        let travel = |p: &EncoderPosition| {
            let d1 = (p.axis1 as i64 - reference.axis1 as i64).abs();
            let d2 = (p.axis2 as i64 - reference.axis2 as i64).abs();
            d1.max(d2)
        };
        let current = self.pier_side(reference);
        let side = match self.config.flip_strategy {
            FlipStrategy::Shortest => {
                if travel(flipped) < travel(normal) {
                    PierSide::Flipped
                } else {
                    PierSide::Normal
                }
            }
            FlipStrategy::Longest => {
                let longer = if travel(flipped) > travel(normal) {
                    PierSide::Flipped
                } else {
                    PierSide::Normal
                };
                let mut held = self.longest_side.lock().unwrap_or_else(|e| e.into_inner());
                *held.get_or_insert(longer)
            }
            FlipStrategy::Same => current,
            FlipStrategy::Opposite => current.opposite(),
            FlipStrategy::West => PierSide::Normal,
            FlipStrategy::East => PierSide::Flipped,
            FlipStrategy::CounterweightDown => {
                if self.counterweight_angle(flipped) < self.counterweight_angle(normal) {
                    PierSide::Flipped
                } else {
                    PierSide::Normal
                }
            }
            FlipStrategy::CounterweightUp => {
                if self.counterweight_angle(flipped) > self.counterweight_angle(normal) {
                    PierSide::Flipped
                } else {
                    PierSide::Normal
                }
            }
        };
        debug!(
            "{:?} strategy picks {:?} (normal {}, flipped {})",
            self.config.flip_strategy, side, normal, flipped
        );
        side
    }

    // Telescope-frame coordinates encoded by `pos`: (ha, dec) for a GEM,
    // (az, alt) for an AltAz mount, plus the configuration used.
    fn axis_coordinates(&self, pos: &EncoderPosition) -> (f64, f64, PierSide) {
        let a1 = self.axis1.to_angle(pos.axis1);
        let a2 = range_degrees_180(self.axis2.to_angle(pos.axis2));
        match self.config.geometry {
            MountGeometry::Gem => {
                let (ha, dec_axis, side) = if a2 > 90.0 {
                    (a1 + 180.0, 180.0 - a2, PierSide::Flipped)
                } else if a2 < -90.0 {
                    (a1 + 180.0, -180.0 - a2, PierSide::Flipped)
                } else {
                    (a1, a2, PierSide::Normal)
                };
                let dec = if self.southern() { -dec_axis } else { dec_axis };
                (range_degrees_180(ha), dec, side)
            }
            MountGeometry::AltAz => {
                if a2 < 0.0 {
                    (range_degrees(a1 + 180.0), 90.0 + a2, PierSide::Flipped)
                } else {
                    (range_degrees(a1), 90.0 - a2, PierSide::Normal)
                }
            }
        }
    }

    fn southern(&self) -> bool {
        self.config.site.latitude < 0.0
    }
}

fn check_jd(jd: f64) -> MountResult<()> {
    if jd.is_finite() {
        Ok(())
    } else {
        Err(MountError::InvalidArgument(format!("invalid julian date {}", jd)))
    }
}

// mod tests.
