// Copyright (c) 2024 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

use std::f64::consts::PI;

use astro::{
    angle::{anglr_sepr, limit_to_two_PI},
    coords::{alt_frm_eq, az_frm_eq, hr_angl_frm_hz},
    time::{julian_day, mn_sidr, CalType, Date},
};
use chrono::{DateTime, Datelike, Timelike, Utc};

extern crate nalgebra as na;

/// Julian date of the J2000.0 epoch.
pub const J2000: f64 = 2451545.0;

/// Ratio of sidereal to solar time rate.
pub const SIDEREAL_RATE: f64 = 1.00273790935;

/// Normalizes an angle in degrees into [0, 360).
pub fn range_degrees(deg: f64) -> f64 {
    let r = deg.rem_euclid(360.0);
    // rem_euclid() can round up to exactly 360 for tiny negative inputs.
    if r >= 360.0 {
        0.0
    } else {
        r
    }
}

/// Normalizes an angle in degrees into (-180, 180].
pub fn range_degrees_180(deg: f64) -> f64 {
    let r = range_degrees(deg);
    if r > 180.0 {
        r - 360.0
    } else {
        r
    }
}

/// Convert ra/dec (radians) to x/y/z on unit sphere.
pub fn to_unit_vector(ra: f64, dec: f64) -> [f64; 3] {
    [
        (ra.cos() * dec.cos()), // x
        (ra.sin() * dec.cos()), // y
        dec.sin(),
    ] // z
}

/// Convert x/y/z on unitsphere to ra/dec (radians).
pub fn from_unit_vector(v: &[f64; 3]) -> (f64, f64) {
    let x = v[0];
    let y = v[1];
    let z = v[2];
    let dec = z.clamp(-1.0, 1.0).asin();
    let mut ra = y.atan2(x);
    if ra < 0.0 {
        ra += 2.0 * PI;
    }
    (ra, dec)
}

/// Returns the separation, in radians, between the given celestial coordinates
/// (in radians).
pub fn angular_separation(
    p0_ra: f64,
    p0_dec: f64,
    p1_ra: f64,
    p1_dec: f64,
) -> f64 {
    anglr_sepr(p0_ra, p0_dec, p1_ra, p1_dec)
}

/// Julian date (UT) of the given instant.
pub fn julian_date(dt: &DateTime<Utc>) -> f64 {
    let seconds = dt.time().num_seconds_from_midnight() as f64
        + dt.time().nanosecond() as f64 / 1e9;
    let date = Date {
        year: dt.date_naive().year() as i16,
        month: dt.date_naive().month() as u8,
        decimal_day: dt.date_naive().day() as f64 + seconds / 86400.0,
        cal_type: CalType::Gregorian,
    };
    julian_day(&date)
}

/// Greenwich mean sidereal time (radians, 0..2PI) at the given Julian date.
pub fn greenwich_mean_sidereal_time(jd: f64) -> f64 {
    // Evaluate at the preceding 0h UT and advance at the sidereal rate;
    // this keeps the polynomial argument small.
    let jd0 = (jd - 0.5).floor() + 0.5;
    let ut_hours = (jd - jd0) * 24.0;
    let gmst_hours = mn_sidr(jd0).to_degrees() / 15.0 + ut_hours * SIDEREAL_RATE;
    limit_to_two_PI((gmst_hours * 15.0).to_radians())
}

/// Local mean sidereal time (radians, 0..2PI).
/// long: observer longitude in radians, positive east.
pub fn local_sidereal_time(jd: f64, long: f64) -> f64 {
    limit_to_two_PI(greenwich_mean_sidereal_time(jd) + long)
}

/// Returns (alt, az) in radians. Returned azimuth is clockwise from north.
/// ha: hour angle in radians.
/// dec: declination in radians.
/// lat: observer latitude in radians.
pub fn alt_az_from_hour_angle(
    ha: f64,
    dec: f64,
    lat: f64,
) -> (/* alt */ f64, /* az */ f64) {
    let meeus_az = az_frm_eq(ha, dec, lat);
    let az = limit_to_two_PI(meeus_az + PI);
    (alt_frm_eq(ha, dec, lat), az)
}

/// Returns (ha, dec) in radians; hour angle is -PI..PI.
/// alt: elevation in radians
/// az: radians, clockwise from north
/// lat: observer latitude in radians.
pub fn hour_angle_from_alt_az(alt: f64, az: f64, lat: f64) -> (f64, f64) {
    let meeus_az = limit_to_two_PI(az - PI);

    // astro::coords::dec_frm_hz() is incorrect.
    let dec = (lat.sin() * alt.sin() - lat.cos() * alt.cos() * meeus_az.cos())
        .clamp(-1.0, 1.0)
        .asin();
    let ha = hr_angl_frm_hz(meeus_az, alt, lat);
    (ha, dec)
}

// IAU 1976 precession from J2000 to the mean equinox of `jd`.
fn precession_rotation(jd: f64) -> na::Rotation3<f64> {
    let t = (jd - J2000) / 36525.0;
    let arcsec = |a: f64| (a / 3600.0).to_radians();
    let zeta = arcsec(2306.2181 * t + 0.30188 * t * t + 0.017998 * t * t * t);
    let z = arcsec(2306.2181 * t + 1.09468 * t * t + 0.018203 * t * t * t);
    let theta = arcsec(2004.3109 * t - 0.42665 * t * t - 0.041833 * t * t * t);

    na::Rotation3::from_axis_angle(&na::Vector3::z_axis(), z)
        * na::Rotation3::from_axis_angle(&na::Vector3::y_axis(), -theta)
        * na::Rotation3::from_axis_angle(&na::Vector3::z_axis(), zeta)
}

fn rotate(rot: &na::Rotation3<f64>, ra: f64, dec: f64) -> (f64, f64) {
    let v = to_unit_vector(ra, dec);
    let r = rot * na::Vector3::new(v[0], v[1], v[2]);
    from_unit_vector(&[r[0], r[1], r[2]])
}

/// Precesses J2000 mean coordinates (radians) to the mean equinox of `jd`.
pub fn precess_from_j2000(ra: f64, dec: f64, jd: f64) -> (f64, f64) {
    rotate(&precession_rotation(jd), ra, dec)
}

/// Inverse of precess_from_j2000().
pub fn precess_to_j2000(ra: f64, dec: f64, jd: f64) -> (f64, f64) {
    rotate(&precession_rotation(jd).inverse(), ra, dec)
}

/// Parallactic angle (radians, -PI..PI) of a target at hour angle `ha` and
/// declination `dec` seen from latitude `lat`, all in radians.
pub fn parallactic_angle(ha: f64, dec: f64, lat: f64) -> f64 {
    ha.sin().atan2(lat.tan() * dec.cos() - dec.sin() * ha.cos())
}

/// Rate of change of the parallactic angle, in degrees per hour of sidereal
/// time.
pub fn parallactic_angle_rate(ha: f64, dec: f64, lat: f64) -> f64 {
    let x = ha.sin();
    let y = lat.tan() * dec.cos() - dec.sin() * ha.cos();
    let dx = ha.cos();
    let dy = dec.sin() * ha.sin();
    15.0 * (dx * y - x * dy) / (x * x + y * y)
}

#[cfg(test)]
mod tests {
    extern crate approx;
    use approx::assert_abs_diff_eq;
    use astro::angle::{deg_frm_dms, deg_frm_hms};
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_range_degrees() {
        assert_eq!(range_degrees(-1e-18), 0.0);
        assert_eq!(range_degrees(360.0), 0.0);
        assert_eq!(range_degrees(-90.0), 270.0);
        assert_eq!(range_degrees_180(190.0), -170.0);
        assert_eq!(range_degrees_180(180.0), 180.0);
        assert_eq!(range_degrees_180(-180.0), 180.0);
    }

    #[test]
    fn test_ra_dec_xyz() {
        let v = to_unit_vector(PI / 2.0, -PI / 4.0);
        let (ra, dec) = from_unit_vector(&v);
        assert_abs_diff_eq!(ra, PI / 2.0, epsilon = 0.001);
        assert_abs_diff_eq!(dec, -PI / 4.0, epsilon = 0.001);
    }

    #[test]
    fn test_julian_date() {
        let dt = Utc.with_ymd_and_hms(2000, 1, 1, 12, 0, 0).unwrap();
        assert_abs_diff_eq!(julian_date(&dt), J2000, epsilon = 1e-6);

        let dt = Utc.with_ymd_and_hms(2016, 1, 15, 18, 0, 0).unwrap();
        assert_abs_diff_eq!(julian_date(&dt), 2457403.25, epsilon = 1e-6);
    }

    #[test]
    fn test_sidereal_time() {
        // Meeus example 12.a: 1987 April 10, 0h UT.
        let gmst = greenwich_mean_sidereal_time(2446895.5);
        assert_abs_diff_eq!(
            gmst.to_degrees(),
            deg_frm_hms(13, 10, 46.3668),
            epsilon = 1e-5
        );
        // Meeus example 12.b: 1987 April 10, 19h21m00s UT.
        let gmst = greenwich_mean_sidereal_time(2446896.30625);
        assert_abs_diff_eq!(gmst.to_degrees(), 128.7378734, epsilon = 1e-4);

        let lst = local_sidereal_time(2446896.30625, -(77_f64.to_radians()));
        assert_abs_diff_eq!(lst.to_degrees(), 51.7378734, epsilon = 1e-4);
    }

    #[test]
    fn test_alt_az_hour_angle_conversion() {
        let lat = 37_f64.to_radians();

        // On the meridian, south of zenith.
        let (alt, az) = alt_az_from_hour_angle(0.0, 0.0, lat);
        assert_abs_diff_eq!(alt.to_degrees(), 53.0, epsilon = 1e-9);
        assert_abs_diff_eq!(az.to_degrees(), 180.0, epsilon = 1e-9);

        // Celestial pole sits due north at altitude == latitude.
        let (alt, az) = alt_az_from_hour_angle(0.3, PI / 2.0 - 1e-9, lat);
        assert_abs_diff_eq!(alt.to_degrees(), 37.0, epsilon = 1e-6);
        assert_abs_diff_eq!(
            range_degrees_180(az.to_degrees()),
            0.0,
            epsilon = 1e-6
        );

        let ha = -deg_frm_hms(2, 29, 50.9).to_radians();
        let dec = deg_frm_dms(54, 55, 31.3).to_radians();
        let (alt, az) = alt_az_from_hour_angle(ha, dec, lat);
        // Rising targets are east of the meridian.
        assert!(az.to_degrees() < 180.0);
        let (ha2, dec2) = hour_angle_from_alt_az(alt, az, lat);
        assert_abs_diff_eq!(ha2, ha, epsilon = 1e-9);
        assert_abs_diff_eq!(dec2, dec, epsilon = 1e-9);
    }

    #[test]
    fn test_angular_separation() {
        let sep = angular_separation(PI, 0.0, PI + 1.0, 1.0);
        assert_abs_diff_eq!(sep, 1.27, epsilon = 0.01);
    }

    #[test]
    fn test_precession() {
        // Meeus example 21.b, theta Persei to 2028 November 13.19 TD.
        let (ra, dec) = precess_from_j2000(
            41.054063_f64.to_radians(),
            49.227750_f64.to_radians(),
            2462088.69,
        );
        assert_abs_diff_eq!(ra.to_degrees(), 41.547214, epsilon = 1e-4);
        assert_abs_diff_eq!(dec.to_degrees(), 49.348483, epsilon = 1e-4);

        let (ra0, dec0) = precess_to_j2000(ra, dec, 2462088.69);
        assert_abs_diff_eq!(ra0.to_degrees(), 41.054063, epsilon = 1e-9);
        assert_abs_diff_eq!(dec0.to_degrees(), 49.227750, epsilon = 1e-9);
    }

    #[test]
    fn test_precession_identity_at_epoch() {
        let (ra, dec) = precess_from_j2000(1.0, 0.5, J2000);
        assert_abs_diff_eq!(ra, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(dec, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_parallactic_angle() {
        // (hour angle, declination, angle, rate) seen from latitude -40.
        let table: &[(f64, f64, f64, f64)] = &[
            (0.0, -70.0, 0.0, 22.9813),
            (1.0, -70.0, 1.5319, 22.9765),
            (15.0, -70.0, 22.6356, 21.9735),
            (-15.0, -70.0, -22.6356, 21.9735),
            (30.0, -70.0, 43.5044, 19.6526),
            (45.0, -70.0, 61.9054, 17.2009),
            (60.0, -70.0, 78.0773, 15.2443),
            (90.0, -70.0, 106.0128, 13.0227),
            (120.0, -70.0, 131.1507, 12.2828),
            (150.0, -70.0, 155.5714, 12.1934),
            (179.0, -70.0, 179.1847, 12.2281),
            (180.0, -70.0, 180.0, 12.2281),
            (181.0, -70.0, -179.1847, 12.2281),
            (210.0, -70.0, -155.5714, 12.1934),
            (240.0, -70.0, -131.1507, 12.2828),
            (270.0, -70.0, -106.0128, 13.0227),
            (300.0, -70.0, -78.0773, 15.2443),
            (315.0, -70.0, -61.9054, 17.2009),
            (330.0, -70.0, -43.5044, 19.6526),
            (359.0, -70.0, -1.5319, 22.9765),
            (360.0, -70.0, 0.0, 22.9813),
            (1.0, -40.0, 90.3214, 4.8211),
            (-1.0, -40.0, -90.3214, 4.8211),
            (0.0, -39.99, 180.0, -65836.6706),
            (0.0, -40.01, 0.0, 65836.6705),
            (0.01, -40.01, 37.4549, 41493.6137),
            (-0.01, -40.01, -37.4549, 41493.6137),
            (0.01, -39.99, 142.5474, -41485.5540),
            (-0.01, -39.99, -142.5474, -41485.5540),
            (15.0, -40.0, 94.8371, 4.8695),
            (30.0, -40.0, 99.7724, 5.0181),
            (60.0, -40.0, 110.3605, 5.6497),
            (90.0, -40.0, 122.7324, 6.8227),
            (120.0, -40.0, 138.0698, 8.6105),
            (150.0, -40.0, 157.3709, 10.6542),
            (179.0, -40.0, 179.2221, 11.6666),
            (180.0, -40.0, 180.0, 11.6679),
            (181.0, -40.0, -179.2221, 11.6666),
            (210.0, -40.0, -157.3709, 10.6542),
            (240.0, -40.0, -138.0698, 8.6105),
            (270.0, -40.0, -122.7324, 6.8227),
            (300.0, -40.0, -110.3605, 5.6497),
            (330.0, -40.0, -99.7724, 5.0181),
            (345.0, -40.0, -94.8371, 4.8695),
            (0.0, -80.0, 0.0, 17.8763),
            (1.0, -80.0, 1.1917, 17.8754),
            (-1.0, -80.0, -1.1917, 17.8754),
            (15.0, -80.0, 17.8120, 17.6857),
            (30.0, -80.0, 35.2623, 17.1706),
            (60.0, -80.0, 68.1823, 15.7197),
            (90.0, -80.0, 98.2901, 14.4650),
            (120.0, -80.0, 126.3838, 13.7099),
            (150.0, -80.0, 153.4022, 13.3623),
            (179.0, -80.0, 179.1154, 13.2682),
            (180.0, -80.0, 180.0, 13.2682),
            (181.0, -80.0, -179.1154, 13.2682),
            (210.0, -80.0, -153.4022, 13.3623),
            (240.0, -80.0, -126.3838, 13.7099),
            (270.0, -80.0, -98.2901, 14.4650),
            (300.0, -80.0, -68.1823, 15.7197),
            (330.0, -80.0, -35.2623, 17.1706),
            (345.0, -80.0, -17.8120, 17.6857),
            (0.0, -39.5, 180.0, -1316.750118),
            (0.0, -39.5 + 2.0 / 60.0, 180.0, -1234.455394),
            (0.0, -39.5 - 2.0 / 60.0, 180.0, -1410.801390),
            (0.0 + 2.0 / 60.0, -39.5, 177.076456, -1313.287352),
            (0.0 - 2.0 / 60.0, -39.5, -177.076456, -1313.287352),
            (15.0, -39.5, 97.280406, 2.350959),
            (15.0, -39.5 - 2.0 / 60.0, 97.118261, 2.517749),
            (15.0, -39.5 + 2.0 / 60.0, 97.442431, 2.184371),
            (15.0 + 2.0 / 60.0, -39.5, 97.285642, 2.362140),
            (15.0 - 2.0 / 60.0, -39.5, 97.275194, 2.339706),
        ];
        let lat = (-40_f64).to_radians();
        for &(ha, dec, pa, rate) in table {
            let (ha, dec) = (ha.to_radians(), dec.to_radians());
            assert_abs_diff_eq!(
                parallactic_angle(ha, dec, lat).to_degrees(),
                pa,
                epsilon = 1e-3
            );
            assert_abs_diff_eq!(parallactic_angle_rate(ha, dec, lat), rate, epsilon = 1e-3);
        }
    }
}  // mod tests.
