// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

//! Equatorial pointing model in the TPOINT convention. Each term perturbs a
//! running (hour angle, declination) pair; terms run in file order from mean
//! to telescope coordinates and in reverse order back.

use std::fmt;

use log::debug;

use telmount_elements::mount_error::{MountError, MountResult};

// Fixed-point iterations used to invert a term.
const MAX_REVERSE_ITERATIONS: usize = 50;
const REVERSE_TOLERANCE: f64 = 1e-14;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EquatorialAxis {
    Ha,
    Dec,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarmonicFn {
    Sin,
    Cos,
}

/// One factor of a harmonic term: `func(multiple * arg)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Harmonic {
    pub func: HarmonicFn,
    pub arg: EquatorialAxis,
    pub multiple: u32,
}

impl Harmonic {
    fn eval(&self, ha: f64, dec: f64) -> f64 {
        let x = self.multiple as f64
            * match self.arg {
                EquatorialAxis::Ha => ha,
                EquatorialAxis::Dec => dec,
            };
        match self.func {
            HarmonicFn::Sin => x.sin(),
            HarmonicFn::Cos => x.cos(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TermKind {
    Me,  // Polar axis misalignment in elevation.
    Ma,  // Polar axis misalignment in azimuth.
    Ih,  // Hour angle index error.
    Id,  // Declination index error.
    Ch,  // East-west collimation error.
    Np,  // HA/Dec non-perpendicularity.
    Fo,  // Fork flexure.
    Phh, // Hour angle scale error.
    Pdd, // Declination scale error.
    Tf,  // Tube flexure, sine law.
    Tx,  // Tube flexure, tangent law.
    Dab, // Declination axis bending.
    Daf, // Declination axis flexure.
    Hcec,
    Hces,
    Dcec,
    Dces,
    // TPOINT generic harmonic, e.g. HDSH2 or HHCDSH.
    Harmonic {
        result: EquatorialAxis,
        factors: Vec<Harmonic>,
    },
}

impl TermKind {
    /// Resolves a TPOINT term name.
    pub fn from_name(name: &str) -> Option<TermKind> {
        let kind = match name {
            "ME" => TermKind::Me,
            "MA" => TermKind::Ma,
            "IH" => TermKind::Ih,
            "ID" => TermKind::Id,
            "CH" => TermKind::Ch,
            "NP" => TermKind::Np,
            "FO" => TermKind::Fo,
            "PHH" => TermKind::Phh,
            "PDD" => TermKind::Pdd,
            "TF" => TermKind::Tf,
            "TX" => TermKind::Tx,
            "DAB" => TermKind::Dab,
            "DAF" => TermKind::Daf,
            "HCEC" => TermKind::Hcec,
            "HCES" => TermKind::Hces,
            "DCEC" => TermKind::Dcec,
            "DCES" => TermKind::Dces,
            _ => return parse_harmonic(name),
        };
        Some(kind)
    }
}

// Parses H<result><fn><arg>[n][<fn><arg>[n]].
fn parse_harmonic(name: &str) -> Option<TermKind> {
    let chars: Vec<char> = name.chars().collect();
    if chars.len() < 4 || chars[0] != 'H' {
        return None;
    }
    let axis = |c: char| match c {
        'H' => Some(EquatorialAxis::Ha),
        'D' => Some(EquatorialAxis::Dec),
        _ => None,
    };
    let result = axis(chars[1])?;
    let mut factors = Vec::new();
    let mut i = 2;
    while i < chars.len() {
        if factors.len() == 2 || i + 1 >= chars.len() {
            return None;
        }
        let func = match chars[i] {
            'S' => HarmonicFn::Sin,
            'C' => HarmonicFn::Cos,
            _ => return None,
        };
        let arg = axis(chars[i + 1])?;
        i += 2;
        let start = i;
        while i < chars.len() && chars[i].is_ascii_digit() {
            i += 1;
        }
        let multiple = if start == i {
            1
        } else {
            let digits: String = chars[start..i].iter().collect();
            digits.parse::<u32>().ok()?
        };
        if multiple == 0 {
            return None;
        }
        factors.push(Harmonic {
            func,
            arg,
            multiple,
        });
    }
    Some(TermKind::Harmonic { result, factors })
}

#[derive(Debug, Clone, PartialEq)]
pub struct TpointTerm {
    pub name: String,
    pub kind: TermKind,

    // Coefficient as written in the model file, arcseconds.
    pub value: f64,

    // Coefficient converted to degrees at load time.
    pub corr: f64,

    // Fitted uncertainty, arcseconds. Informational only.
    pub sigma: Option<f64>,

    // True for terms held fixed during the fit ('=' prefix).
    pub fixed: bool,
}

impl TpointTerm {
    pub fn new(name: &str, value: f64, sigma: Option<f64>, fixed: bool) -> Option<Self> {
        let kind = TermKind::from_name(name)?;
        Some(TpointTerm {
            name: name.to_string(),
            kind,
            value,
            corr: value / 3600.0,
            sigma,
            fixed,
        })
    }

    /// Mean to telescope. All angles in radians.
    pub fn apply(&self, ha: f64, dec: f64, lat: f64) -> (f64, f64) {
        if self.kind == TermKind::Me {
            return rotate_polar_elevation(ha, dec, -self.corr.to_radians());
        }
        let (dh, dd) = self.offset(ha, dec, lat);
        (ha + dh, dec + dd)
    }

    /// Telescope to mean; inverse of apply(). None when the iteration does
    /// not converge, as happens where the term diverges.
    pub fn reverse(&self, ha: f64, dec: f64, lat: f64) -> Option<(f64, f64)> {
        if self.kind == TermKind::Me {
            return Some(rotate_polar_elevation(ha, dec, self.corr.to_radians()));
        }
        // Solve x + offset(x) = (ha, dec).
        let (mut h, mut d) = (ha, dec);
        for _i in 0..MAX_REVERSE_ITERATIONS {
            let (dh, dd) = self.offset(h, d, lat);
            let (nh, nd) = (ha - dh, dec - dd);
            let change = (nh - h).abs().max((nd - d).abs());
            h = nh;
            d = nd;
            if change.is_nan() {
                return None;
            }
            if change <= REVERSE_TOLERANCE {
                return Some((h, d));
            }
        }
        None
    }

    // Additive correction for all terms except ME.
    fn offset(&self, h: f64, d: f64, lat: f64) -> (f64, f64) {
        let c = self.corr.to_radians();
        match &self.kind {
            TermKind::Me => (0.0, 0.0),
            TermKind::Ma => (c * h.cos() * d.tan(), -c * h.sin()),
            TermKind::Ih => (-c, 0.0),
            TermKind::Id => (0.0, -c),
            TermKind::Ch => (-c / d.cos(), 0.0),
            // Driven by the hour angle, as in the established model files.
            TermKind::Np => (-c * h.tan(), 0.0),
            TermKind::Fo => (0.0, -c * h.cos()),
            TermKind::Phh => (-c * h, 0.0),
            TermKind::Pdd => (0.0, -c * d),
            TermKind::Tf => (
                -c * lat.cos() * h.sin() / d.cos(),
                -c * (lat.cos() * h.cos() * d.sin() - lat.sin() * d.cos()),
            ),
            TermKind::Tx => {
                let sin_alt = d.sin() * lat.sin() + d.cos() * h.cos() * lat.cos();
                (
                    -c * lat.cos() * h.sin() / (sin_alt * d.cos()),
                    -c * (lat.cos() * h.cos() * d.sin() - lat.sin() * d.cos())
                        / sin_alt,
                )
            }
            TermKind::Dab => {
                let (sh, ch, sf) = (h.sin(), h.cos(), lat.sin());
                (
                    c * (sh * sh * sf * sf + ch * ch)
                        * (sf * d.tan() + lat.cos() * ch),
                    0.0,
                )
            }
            TermKind::Daf => (c * (lat.sin() * d.tan() + lat.cos() * h.cos()), 0.0),
            TermKind::Hcec => (-c * h.cos(), 0.0),
            TermKind::Hces => (-c * h.sin(), 0.0),
            TermKind::Dcec => (0.0, -c * d.cos()),
            TermKind::Dces => (0.0, -c * d.sin()),
            TermKind::Harmonic { result, factors } => {
                let v = factors.iter().fold(c, |acc, f| acc * f.eval(h, d));
                match result {
                    EquatorialAxis::Ha => (-v, 0.0),
                    EquatorialAxis::Dec => (0.0, -v),
                }
            }
        }
    }
}

// ME tilts the polar axis in the meridian plane, a rotation about the
// east-west axis. N is the angle out of the meridian plane, M the angle
// within it measured from the equator; atan2 resolves the hemisphere when
// |ha| > 90°.
fn rotate_polar_elevation(ha: f64, dec: f64, tilt: f64) -> (f64, f64) {
    let n = (ha.sin() * dec.cos()).clamp(-1.0, 1.0).asin();
    let m = dec.sin().atan2(ha.cos() * dec.cos()) + tilt;
    let dec1 = (m.sin() * n.cos()).clamp(-1.0, 1.0).asin();
    let ha1 = n.sin().atan2(m.cos() * n.cos());
    (ha1, dec1)
}

/// A parsed TPOINT model file.
#[derive(Debug, Clone, PartialEq)]
pub struct TpointModel {
    pub caption: String,
    // 'T' or 'S'.
    pub method: char,
    // Number of observations in the fit.
    pub num_obs: u32,
    // Sky RMS, arcseconds.
    pub rms: f64,
    // Refraction constants, arcseconds.
    pub ref_a: f64,
    pub ref_b: f64,
    pub terms: Vec<TpointTerm>,
}

fn parse_number<T: std::str::FromStr>(
    token: Option<&str>,
    line: usize,
    field: &str,
) -> MountResult<T> {
    let token =
        token.ok_or_else(|| MountError::model_parse(line, field, "missing"))?;
    token.parse::<T>().map_err(|_| {
        MountError::model_parse(line, field, &format!("cannot parse '{}'", token))
    })
}

fn parse_finite(token: Option<&str>, line: usize, field: &str) -> MountResult<f64> {
    let v: f64 = parse_number(token, line, field)?;
    if !v.is_finite() {
        return Err(MountError::model_parse(line, field, "not finite"));
    }
    Ok(v)
}

impl TpointModel {
    /// Parses the TPOINT text format: caption line, header line
    /// `method num rms refA refB`, then `NAME value [sigma]` lines (a '='
    /// prefix marks a fixed term with no sigma) up to a line `END`.
    pub fn parse(text: &str) -> MountResult<Self> {
        let mut lines = text.lines().enumerate().map(|(i, l)| (i + 1, l));

        let caption = match lines.next() {
            Some((_, l)) => l.trim_end().to_string(),
            None => return Err(MountError::model_parse(1, "caption", "empty model file")),
        };

        let (hline, header) = lines
            .next()
            .ok_or_else(|| MountError::model_parse(2, "header", "missing"))?;
        let mut tokens = header.split_whitespace();
        let method = tokens
            .next()
            .and_then(|t| t.chars().next())
            .ok_or_else(|| MountError::model_parse(hline, "method", "missing"))?;
        let num_obs: u32 = parse_number(tokens.next(), hline, "observation count")?;
        let rms = parse_finite(tokens.next(), hline, "rms")?;
        let ref_a = parse_finite(tokens.next(), hline, "refA")?;
        let ref_b = parse_finite(tokens.next(), hline, "refB")?;

        let mut terms = Vec::new();
        let mut last_line = hline;
        for (lnum, line) in lines {
            last_line = lnum;
            let mut tokens = line.split_whitespace();
            let Some(raw_name) = tokens.next() else {
                continue;
            };
            if raw_name == "END" {
                debug!("loaded TPOINT model '{}' with {} terms", caption, terms.len());
                return Ok(TpointModel {
                    caption,
                    method,
                    num_obs,
                    rms,
                    ref_a,
                    ref_b,
                    terms,
                });
            }
            let (name, fixed) = match raw_name.strip_prefix('=') {
                Some(n) => (n, true),
                None => (raw_name, false),
            };
            let value = parse_finite(tokens.next(), lnum, "coefficient")?;
            let sigma = if fixed {
                None
            } else {
                match tokens.next() {
                    Some(t) => Some(parse_finite(Some(t), lnum, "sigma")?),
                    None => None,
                }
            };
            if let Some(extra) = tokens.next() {
                return Err(MountError::model_parse(
                    lnum,
                    "trailing field",
                    &format!("unexpected '{}'", extra),
                ));
            }
            let term = TpointTerm::new(name, value, sigma, fixed).ok_or_else(|| {
                MountError::model_parse(lnum, "term name", &format!("unknown term '{}'", name))
            })?;
            terms.push(term);
        }
        Err(MountError::model_parse(last_line + 1, "END", "missing END line"))
    }

    /// Mean to telescope, radians.
    pub fn apply(&self, ha: f64, dec: f64, lat: f64) -> (f64, f64) {
        self.terms
            .iter()
            .fold((ha, dec), |(h, d), term| term.apply(h, d, lat))
    }

    /// Telescope to mean, radians. None when some term cannot be inverted.
    pub fn reverse(&self, ha: f64, dec: f64, lat: f64) -> Option<(f64, f64)> {
        self.terms
            .iter()
            .rev()
            .try_fold((ha, dec), |(h, d), term| term.reverse(h, d, lat))
    }
}

impl fmt::Display for TpointModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.caption)?;
        writeln!(
            f,
            "{} {} {} {} {}",
            self.method, self.num_obs, self.rms, self.ref_a, self.ref_b
        )?;
        for term in &self.terms {
            if term.fixed {
                writeln!(f, "={} {}", term.name, term.value)?;
            } else {
                match term.sigma {
                    Some(sigma) => writeln!(f, "{} {} {}", term.name, term.value, sigma)?,
                    None => writeln!(f, "{} {}", term.name, term.value)?,
                }
            }
        }
        writeln!(f, "END")
    }
}

// mod tests.
