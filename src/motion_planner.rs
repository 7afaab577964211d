// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

use log::{debug, info, warn};

use telmount_elements::astro_util::range_degrees_180;
use telmount_elements::mount_error::{MountError, MountResult};
use telmount_elements::mount_types::{
    EncoderPosition, MountGeometry, PierSide, SkyPosition,
};

use crate::converter::CoordinateConverter;

// Each non-final step stops this far (degrees) short of its waypoint.
const APPROACH_MARGIN_DEG: f64 = 1.0;

// Minimum duration of one planning step, seconds.
const MIN_STEP_SEC: f64 = 1.0;

// Axes within this many degrees of the target count as settled. Must
// exceed APPROACH_MARGIN_DEG.
const SETTLE_TOLERANCE_DEG: f64 = 2.0;

// Phase code of a declination-to-pole partial move.
const POLE_PHASE: u32 = 3;

// Path sampling interval of the trajectory check, degrees per axis.
const TRAJECTORY_STEP_DEG: f64 = 0.5;

// Band above the hard horizon in which a path is stopped short when it
// would continue into the horizon, degrees.
const SOFT_ALTITUDE_MARGIN_DEG: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlannerState {
    Idle,
    Converging,
    Arrived,
    Failed,
}

/// Outcome of one call to a MoveCalculator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovePhase {
    Unreachable,
    // The waypoint is the final target.
    Arrived,
    // More travel is needed after reaching the waypoint. The value
    // identifies the partial move.
    Intermediate(u32),
}

impl MovePhase {
    /// Wire code: -1 unreachable, 0 arrived, positive for partial moves.
    pub fn code(self) -> i32 {
        match self {
            MovePhase::Unreachable => -1,
            MovePhase::Arrived => 0,
            MovePhase::Intermediate(n) => n as i32,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveStep {
    pub phase: MovePhase,
    // Where to drive next. Equal to the target when phase is Arrived.
    pub waypoint: EncoderPosition,
}

/// Single-step move planning, normally supplied by the mount driver.
pub trait MoveCalculator {
    fn calculate_move(
        &self,
        jd: f64,
        current: &EncoderPosition,
        target: &EncoderPosition,
        prev_phase: Option<MovePhase>,
    ) -> MoveStep;
}

/// Drives both axes straight at the target, finishing once they are close.
pub struct DirectMove<'a> {
    converter: &'a CoordinateConverter,
}

impl<'a> DirectMove<'a> {
    pub fn new(converter: &'a CoordinateConverter) -> Self {
        DirectMove { converter }
    }
}

impl MoveCalculator for DirectMove<'_> {
    fn calculate_move(
        &self,
        _jd: f64,
        current: &EncoderPosition,
        target: &EncoderPosition,
        _prev_phase: Option<MovePhase>,
    ) -> MoveStep {
        settle_or_approach(self.converter, current, target)
    }
}

/// GEM move that parks the declination axis at the pole before changing
/// pier side, so the tube never sweeps below the polar axis.
pub struct PoleFirstMove<'a> {
    converter: &'a CoordinateConverter,
}

impl<'a> PoleFirstMove<'a> {
    pub fn new(converter: &'a CoordinateConverter) -> MountResult<Self> {
        if converter.config().geometry != MountGeometry::Gem {
            return Err(MountError::InvalidArgument(
                "pole-first moves need an equatorial mount".to_string(),
            ));
        }
        Ok(PoleFirstMove { converter })
    }

    fn near_pole(&self, pos: &EncoderPosition) -> bool {
        let dec_axis =
            range_degrees_180(self.converter.axis2().to_angle(pos.axis2));
        (dec_axis - 90.0).abs() <= SETTLE_TOLERANCE_DEG
    }
}

impl MoveCalculator for PoleFirstMove<'_> {
    fn calculate_move(
        &self,
        _jd: f64,
        current: &EncoderPosition,
        target: &EncoderPosition,
        prev_phase: Option<MovePhase>,
    ) -> MoveStep {
        let conv = self.converter;
        if conv.pier_side(current) == conv.pier_side(target) {
            return settle_or_approach(conv, current, target);
        }
        if self.near_pole(current) {
            if prev_phase == Some(MovePhase::Intermediate(POLE_PHASE)) {
                debug!("declination at pole, crossing to {:?}", conv.pier_side(target));
            }
            return MoveStep {
                phase: MovePhase::Intermediate(1),
                waypoint: *target,
            };
        }
        let axis2 = conv.axis2();
        let pole = axis2
            .raw_ticks(90.0)
            .ok()
            .and_then(|t| axis2.nearest_alias(t, current.axis2));
        match pole {
            Some(pole) => MoveStep {
                phase: MovePhase::Intermediate(POLE_PHASE),
                waypoint: EncoderPosition::new(current.axis1, pole),
            },
            None => MoveStep {
                phase: MovePhase::Unreachable,
                waypoint: *current,
            },
        }
    }
}

/// Result of walking a straight axis path against the horizon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrajectoryOutcome {
    // The whole path stays above the horizon.
    Clear,
    // The path enters the soft band and then the horizon; it may be
    // followed up to the point where it entered the band.
    SoftStop,
    // The path starts inside the soft band and goes into the horizon
    // without leaving the band first.
    IntoHorizon,
    // The path would change pier side, which was not allowed.
    SideChange,
}

impl TrajectoryOutcome {
    /// Partial move code of the outcome; 0 for a clear path.
    pub fn code(self) -> u32 {
        match self {
            TrajectoryOutcome::Clear => 0,
            TrajectoryOutcome::SoftStop => 2,
            TrajectoryOutcome::IntoHorizon => 3,
            TrajectoryOutcome::SideChange => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrajectoryCheck {
    pub outcome: TrajectoryOutcome,
    // Farthest position along the path that may be driven to.
    pub reach: EncoderPosition,
}

/// Samples the path both axes take when driven from `from` to `to` at the
/// same angular speed, every `step_deg` degrees, and checks each sample's
/// uncorrected altitude against the configured hard horizon. Samples less
/// than `alt_margin` above the horizon form the soft band.
pub fn check_trajectory(
    conv: &CoordinateConverter,
    from: &EncoderPosition,
    to: &EncoderPosition,
    step_deg: f64,
    alt_margin: f64,
    keep_side: bool,
) -> TrajectoryCheck {
    let hard = conv.config().min_altitude;
    let soft_limit = hard + alt_margin;
    let step1 = ((step_deg * conv.axis1().ticks_per_degree().abs()) as i64).max(1);
    let step2 = ((step_deg * conv.axis2().ticks_per_degree().abs()) as i64).max(1);
    let side = conv.pier_side(from);

    let mut here = *from;
    // Still inside the soft band we started in.
    let mut in_start_band = conv.counts2hrz(from).alt < soft_limit;
    let mut soft: Option<EncoderPosition> = None;
    while here != *to {
        let next = EncoderPosition::new(
            advance(here.axis1, to.axis1, step1),
            advance(here.axis2, to.axis2, step2),
        );
        if keep_side && conv.pier_side(&next) != side {
            return TrajectoryCheck {
                outcome: TrajectoryOutcome::SideChange,
                reach: here,
            };
        }
        let alt = conv.counts2hrz(&next).alt;
        if alt < soft_limit {
            if !in_start_band && soft.is_none() {
                soft = Some(here);
            }
        } else {
            in_start_band = false;
        }
        if alt < hard {
            debug!("path from {} to {} meets the horizon at {}", from, to, next);
            return match soft {
                Some(reach) => TrajectoryCheck {
                    outcome: TrajectoryOutcome::SoftStop,
                    reach,
                },
                None => TrajectoryCheck {
                    outcome: TrajectoryOutcome::IntoHorizon,
                    reach: here,
                },
            };
        }
        here = next;
    }
    TrajectoryCheck {
        outcome: TrajectoryOutcome::Clear,
        reach: *to,
    }
}

// One sampling step from `from` toward `to`.
fn advance(from: i32, to: i32, step: i64) -> i32 {
    let delta = to as i64 - from as i64;
    if delta.abs() <= step {
        to
    } else {
        (from as i64 + delta.signum() * step) as i32
    }
}

/// Direct move that first walks the path against the horizon. A blocked
/// path is followed as far as it is safe, as a partial move carrying the
/// trajectory outcome code; when that leaves the mount still blocked the
/// move is unreachable.
pub struct HorizonCheckedMove<'a> {
    converter: &'a CoordinateConverter,
    keep_side: bool,
}

impl<'a> HorizonCheckedMove<'a> {
    pub fn new(converter: &'a CoordinateConverter) -> Self {
        HorizonCheckedMove {
            converter,
            keep_side: false,
        }
    }

    /// Refuses paths that change pier side.
    pub fn keep_pier_side(mut self) -> Self {
        self.keep_side = true;
        self
    }
}

fn horizon_blocked(phase: MovePhase) -> bool {
    matches!(phase, MovePhase::Intermediate(2..=4))
}

impl MoveCalculator for HorizonCheckedMove<'_> {
    fn calculate_move(
        &self,
        _jd: f64,
        current: &EncoderPosition,
        target: &EncoderPosition,
        prev_phase: Option<MovePhase>,
    ) -> MoveStep {
        let direct = settle_or_approach(self.converter, current, target);
        if direct.phase == MovePhase::Arrived {
            return direct;
        }
        let check = check_trajectory(
            self.converter,
            current,
            target,
            TRAJECTORY_STEP_DEG,
            SOFT_ALTITUDE_MARGIN_DEG,
            self.keep_side,
        );
        if check.outcome == TrajectoryOutcome::Clear {
            return direct;
        }
        if check.reach == *current || prev_phase.is_some_and(horizon_blocked) {
            debug!("no safe path from {} to {}: {:?}", current, target, check.outcome);
            return MoveStep {
                phase: MovePhase::Unreachable,
                waypoint: *current,
            };
        }
        MoveStep {
            phase: MovePhase::Intermediate(check.outcome.code()),
            waypoint: check.reach,
        }
    }
}

fn settle_or_approach(
    conv: &CoordinateConverter,
    current: &EncoderPosition,
    target: &EncoderPosition,
) -> MoveStep {
    let (d1, d2) = axis_delta_degrees(conv, current, target);
    let phase = if d1 <= SETTLE_TOLERANCE_DEG && d2 <= SETTLE_TOLERANCE_DEG {
        MovePhase::Arrived
    } else {
        MovePhase::Intermediate(1)
    };
    MoveStep {
        phase,
        waypoint: *target,
    }
}

// Absolute per-axis travel in degrees.
fn axis_delta_degrees(
    conv: &CoordinateConverter,
    from: &EncoderPosition,
    to: &EncoderPosition,
) -> (f64, f64) {
    let d1 = (to.axis1 as f64 - from.axis1 as f64).abs()
        / conv.axis1().ticks_per_degree().abs();
    let d2 = (to.axis2 as f64 - from.axis2 as f64).abs()
        / conv.axis2().ticks_per_degree().abs();
    (d1, d2)
}

// Moves `from` toward `to`, stopping `margin` ticks short when further.
fn approach(from: i32, to: i32, margin: i64) -> i32 {
    let delta = to as i64 - from as i64;
    if delta.abs() <= margin {
        to
    } else {
        (to as i64 - delta.signum() * margin) as i32
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlewRequest {
    pub start_jd: f64,
    pub target: SkyPosition,
    pub current: EncoderPosition,
    // Degrees per second, applied to both axes.
    pub axis_speed: f64,
    pub max_elapsed: f64,
}

/// One entry of the planner's trace.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanStep {
    pub jd: f64,
    pub phase: MovePhase,
    pub waypoint: EncoderPosition,
    // Simulated position after the step.
    pub position: EncoderPosition,
    pub elapsed: f64,
}

/// Simulates a slew by repeatedly asking a MoveCalculator for the next
/// waypoint, advancing simulated time by the axis travel at `axis_speed`.
/// The sky target is re-converted each step on the pier side chosen at
/// the start, since it moves during the slew.
pub struct MotionPlanner<'a, C: MoveCalculator> {
    converter: &'a CoordinateConverter,
    calculator: C,
    state: PlannerState,
    request: Option<SlewRequest>,
    current: EncoderPosition,
    target: Option<EncoderPosition>,
    side: PierSide,
    prev_phase: Option<MovePhase>,
    elapsed: f64,
    trace: Vec<PlanStep>,
}

impl<'a, C: MoveCalculator> MotionPlanner<'a, C> {
    pub fn new(converter: &'a CoordinateConverter, calculator: C) -> Self {
        MotionPlanner {
            converter,
            calculator,
            state: PlannerState::Idle,
            request: None,
            current: EncoderPosition::default(),
            target: None,
            side: PierSide::Normal,
            prev_phase: None,
            elapsed: 0.0,
            trace: Vec::new(),
        }
    }

    pub fn state(&self) -> PlannerState {
        self.state
    }

    pub fn current(&self) -> EncoderPosition {
        self.current
    }

    pub fn target(&self) -> Option<EncoderPosition> {
        self.target
    }

    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    pub fn trace(&self) -> &[PlanStep] {
        &self.trace
    }

    pub fn reset(&mut self) {
        self.state = PlannerState::Idle;
        self.request = None;
        self.target = None;
        self.prev_phase = None;
        self.elapsed = 0.0;
        self.trace.clear();
    }

    /// Starts a move. Fails, leaving the planner Failed, when the target
    /// cannot be converted to ticks.
    pub fn begin(&mut self, request: SlewRequest) -> MountResult<()> {
        self.reset();
        self.current = request.current;
        if request.axis_speed.is_nan()
            || request.axis_speed <= 0.0
            || !request.max_elapsed.is_finite()
        {
            self.state = PlannerState::Failed;
            return Err(MountError::InvalidArgument(format!(
                "axis speed {} and time budget {} must be positive and finite",
                request.axis_speed, request.max_elapsed
            )));
        }
        self.converter.reset_flip_memory();
        let target = self
            .converter
            .sky2counts(request.start_jd, &request.target, &request.current, true)
            .map_err(|e| self.fail(e))?;
        self.side = self.converter.pier_side(&target);
        info!(
            "slew to {} from {} begins; target {} {:?}",
            request.target, request.current, target, self.side
        );
        self.target = Some(target);
        self.request = Some(request);
        self.state = PlannerState::Converging;
        Ok(())
    }

    /// Advances the simulation by one planning step. Returns the state
    /// after the step; calling again once Arrived or Failed is a no-op.
    pub fn step(&mut self) -> MountResult<PlannerState> {
        if self.state != PlannerState::Converging {
            return Ok(self.state);
        }
        let (Some(request), Some(prev_target)) = (self.request, self.target) else {
            return Err(self.fail(MountError::InvalidArgument(
                "no move in progress".to_string(),
            )));
        };
        if self.elapsed >= request.max_elapsed {
            return Err(self.fail(MountError::SlewTimeout {
                elapsed: self.elapsed,
            }));
        }

        let jd = request.start_jd + self.elapsed / 86400.0;
        let target = if self.elapsed > 0.0 {
            self.converter
                .sky2counts_on_side(jd, &request.target, &prev_target, self.side)
                .map_err(|e| self.fail(e))?
        } else {
            prev_target
        };
        self.target = Some(target);

        let mv = self
            .calculator
            .calculate_move(jd, &self.current, &target, self.prev_phase);
        if mv.phase == MovePhase::Unreachable {
            return Err(self.fail(MountError::Unreachable(format!(
                "no move from {} to {}",
                self.current, target
            ))));
        }

        let (d1, d2) = axis_delta_degrees(self.converter, &self.current, &mv.waypoint);
        let dt = (d1.max(d2) / request.axis_speed).max(MIN_STEP_SEC);
        self.elapsed += dt;
        self.current = if mv.phase == MovePhase::Arrived {
            mv.waypoint
        } else {
            let m1 = (APPROACH_MARGIN_DEG * self.converter.axis1().ticks_per_degree().abs()) as i64;
            let m2 = (APPROACH_MARGIN_DEG * self.converter.axis2().ticks_per_degree().abs()) as i64;
            EncoderPosition::new(
                approach(self.current.axis1, mv.waypoint.axis1, m1),
                approach(self.current.axis2, mv.waypoint.axis2, m2),
            )
        };
        debug!(
            "phase {} waypoint {} now at {} after {:.1}s",
            mv.phase.code(),
            mv.waypoint,
            self.current,
            self.elapsed
        );
        self.trace.push(PlanStep {
            jd,
            phase: mv.phase,
            waypoint: mv.waypoint,
            position: self.current,
            elapsed: self.elapsed,
        });
        self.prev_phase = Some(mv.phase);
        if mv.phase == MovePhase::Arrived {
            self.state = PlannerState::Arrived;
            info!("arrived at {} after {:.1}s", self.current, self.elapsed);
        }
        Ok(self.state)
    }

    /// Runs a whole move; returns the simulated elapsed seconds.
    pub fn plan_move(&mut self, request: SlewRequest) -> MountResult<f64> {
        self.begin(request)?;
        while self.step()? == PlannerState::Converging {}
        Ok(self.elapsed)
    }

    fn fail(&mut self, error: MountError) -> MountError {
        warn!("slew failed after {:.1}s: {}", self.elapsed, error);
        self.state = PlannerState::Failed;
        error
    }
}

// mod tests.
