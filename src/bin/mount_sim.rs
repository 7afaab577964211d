// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use clap::Parser;
use env_logger;
use log::{error, info};

use telmount::axis::AxisConfig;
use telmount::converter::CoordinateConverter;
use telmount::model_handle::ModelHandle;
use telmount::motion_planner::{
    DirectMove, MotionPlanner, MoveCalculator, PoleFirstMove, SlewRequest,
};
use telmount::mount_config::{FlipStrategy, MountConfig};
use telmount_elements::astro_util::julian_date;
use telmount_elements::mount_error::MountResult;
use telmount_elements::mount_types::{
    EncoderPosition, MountGeometry, ObserverSite, SkyPosition,
};

/// Converts a sky position to mount encoder ticks and back, and optionally
/// simulates the slew to it.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about=None)]
struct Args {
    /// Mount geometry: "gem" or "altaz".
    #[arg(long, value_parser = parse_geometry, default_value = "gem")]
    geometry: MountGeometry,

    /// Site latitude, degrees north.
    #[arg(long, allow_hyphen_values = true, default_value_t = -40.0)]
    latitude: f64,

    /// Site longitude, degrees east.
    #[arg(long, allow_hyphen_values = true, default_value_t = -5.0)]
    longitude: f64,

    /// Site altitude, meters.
    #[arg(long, allow_hyphen_values = true, default_value_t = 200.0)]
    altitude: f64,

    /// Encoder ticks per axis revolution. Negative reverses the axis.
    #[arg(long, allow_hyphen_values = true, default_value_t = 67108864.0)]
    ticks_per_rev: f64,

    /// Axis angles (degrees) at tick zero.
    #[arg(long, allow_hyphen_values = true, default_value_t = 0.0)]
    axis1_zero: f64,
    #[arg(long, allow_hyphen_values = true, default_value_t = 0.0)]
    axis2_zero: f64,

    /// Symmetric tick limit for both axes.
    #[arg(long, default_value_t = 80000000)]
    tick_limit: i32,

    /// Target right ascension, degrees.
    #[arg(long)]
    ra: f64,

    /// Target declination, degrees.
    #[arg(long, allow_hyphen_values = true)]
    dec: f64,

    /// Julian date; defaults to now.
    #[arg(long)]
    jd: Option<f64>,

    /// Current encoder position, axis 1.
    #[arg(long, allow_hyphen_values = true, default_value_t = 0)]
    current1: i32,

    /// Current encoder position, axis 2.
    #[arg(long, allow_hyphen_values = true, default_value_t = 0)]
    current2: i32,

    #[arg(long, value_enum, default_value = "shortest")]
    flip: FlipStrategy,

    /// Keep a GEM on the normal side (AltAz: never over the zenith).
    #[arg(long)]
    no_flip: bool,

    /// Treat --ra/--dec as J2000 and precess to date.
    #[arg(long)]
    precession: bool,

    #[arg(long)]
    refraction: bool,

    /// Pointing model file, TPOINT or RTS2_MODEL/RTS2_ALTAZ format.
    #[arg(long)]
    model: Option<PathBuf>,

    /// Simulate the slew at this axis speed, degrees per second.
    #[arg(long)]
    slew_speed: Option<f64>,

    /// Time budget for the simulated slew, seconds.
    #[arg(long, default_value_t = 600.0)]
    max_elapsed: f64,

    /// Park declination at the pole before changing pier side.
    #[arg(long)]
    pole_first: bool,
}

fn parse_geometry(arg: &str) -> Result<MountGeometry, String> {
    match arg.to_ascii_lowercase().as_str() {
        "gem" => Ok(MountGeometry::Gem),
        "altaz" => Ok(MountGeometry::AltAz),
        other => Err(format!("unknown geometry '{}'", other)),
    }
}

fn main() {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    if let Err(e) = run(&args) {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> MountResult<()> {
    let tpd = args.ticks_per_rev / 360.0;
    let axis = |zero_offset| AxisConfig {
        zero_offset,
        ticks_per_degree: tpd,
        tick_min: -args.tick_limit,
        tick_max: args.tick_limit,
    };
    let mut config = MountConfig::new(
        args.geometry,
        ObserverSite {
            latitude: args.latitude,
            longitude: args.longitude,
            altitude: args.altitude,
        },
        axis(args.axis1_zero),
        axis(args.axis2_zero),
    );
    config.flip_strategy = args.flip;
    config.apply_precession = args.precession;
    config.apply_refraction = args.refraction;

    let handle = Arc::new(ModelHandle::new(args.geometry));
    if let Some(path) = &args.model {
        handle.load_file(path)?;
        config.apply_model = true;
        info!("Using pointing model {}", path.display());
    }
    let conv = CoordinateConverter::new(config, handle)?;

    let jd = args.jd.unwrap_or_else(|| julian_date(&Utc::now()));
    let sky = SkyPosition::new(args.ra, args.dec)?;
    let current = EncoderPosition::new(args.current1, args.current2);
    info!("Converting {} at JD {:.6}", sky, jd);

    let ticks = conv.sky2counts(jd, &sky, &current, !args.no_flip)?;
    let (back, side) = conv.counts2sky(jd, &ticks)?;
    println!("ticks        {}", ticks);
    println!("pier side    {:?}", side);
    println!("sky          {}", back);
    println!("horizontal   {}", conv.counts2hrz(&ticks));
    let (rate1, rate2) = conv.tracking_rates(jd, &sky, &current)?;
    println!("tracking     {:.3} {:.3} ticks/s", rate1, rate2);
    let (angle, rate) = conv.parallactic(jd, &sky);
    println!("parallactic  {:.4} deg, {:.4} deg/h", angle, rate);

    let Some(speed) = args.slew_speed else {
        return Ok(());
    };
    let request = SlewRequest {
        start_jd: jd,
        target: sky,
        current,
        axis_speed: speed,
        max_elapsed: args.max_elapsed,
    };
    if args.pole_first {
        simulate(&conv, PoleFirstMove::new(&conv)?, request)
    } else {
        simulate(&conv, DirectMove::new(&conv), request)
    }
}

fn simulate<C: MoveCalculator>(
    conv: &CoordinateConverter,
    calculator: C,
    request: SlewRequest,
) -> MountResult<()> {
    let mut planner = MotionPlanner::new(conv, calculator);
    let result = planner.plan_move(request);
    for step in planner.trace() {
        println!(
            "  phase {:2} at {:8.1}s -> {}",
            step.phase.code(),
            step.elapsed,
            step.position
        );
    }
    let elapsed = result?;
    println!("slew         {:.1}s, {:?}", elapsed, planner.state());
    Ok(())
}
