// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

//! Nine-parameter pointing model with an open-ended list of extra harmonic
//! terms. The horizontal form (RTS2_ALTAZ) corrects azimuth/elevation for
//! AltAz mounts; the equatorial form (RTS2_MODEL) corrects hour angle and
//! declination.

use std::fmt;

use log::debug;

use telmount_elements::astro_util::{alt_az_from_hour_angle, hour_angle_from_alt_az};
use telmount_elements::mount_error::{MountError, MountResult};

const MAX_REVERSE_ITERATIONS: usize = 50;
const REVERSE_TOLERANCE: f64 = 1e-14;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GPointFrame {
    Equatorial,
    Horizontal,
}

impl GPointFrame {
    fn header(&self) -> &'static str {
        match self {
            GPointFrame::Equatorial => "RTS2_MODEL",
            GPointFrame::Horizontal => "RTS2_ALTAZ",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtraFunction {
    Offset,
    Sin,
    Cos,
    Tan,
    SinCos,
    CosCos,
    SinSin,
    AbsSin,
    AbsCos,
    Csc,
    Sec,
    Cot,
    Sinh,
    Cosh,
    Tanh,
    Sech,
    Csch,
    Coth,
}

const FUNCTIONS: [(&str, ExtraFunction); 18] = [
    ("offset", ExtraFunction::Offset),
    ("sin", ExtraFunction::Sin),
    ("cos", ExtraFunction::Cos),
    ("tan", ExtraFunction::Tan),
    ("sincos", ExtraFunction::SinCos),
    ("coscos", ExtraFunction::CosCos),
    ("sinsin", ExtraFunction::SinSin),
    ("abssin", ExtraFunction::AbsSin),
    ("abscos", ExtraFunction::AbsCos),
    ("csc", ExtraFunction::Csc),
    ("sec", ExtraFunction::Sec),
    ("cot", ExtraFunction::Cot),
    ("sinh", ExtraFunction::Sinh),
    ("cosh", ExtraFunction::Cosh),
    ("tanh", ExtraFunction::Tanh),
    ("sech", ExtraFunction::Sech),
    ("csch", ExtraFunction::Csch),
    ("coth", ExtraFunction::Coth),
];

impl ExtraFunction {
    pub fn from_name(name: &str) -> Option<Self> {
        FUNCTIONS
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, f)| *f)
    }

    pub fn name(&self) -> &'static str {
        FUNCTIONS
            .iter()
            .find(|(_, f)| f == self)
            .map_or("offset", |(n, _)| *n)
    }

    /// Number of input angles the function consumes.
    pub fn arity(&self) -> usize {
        match self {
            ExtraFunction::Offset => 0,
            ExtraFunction::SinCos | ExtraFunction::CosCos | ExtraFunction::SinSin => 2,
            _ => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtraInput {
    Az,
    El,
    Zd,
    Ha,
    Dec,
}

impl ExtraInput {
    fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "az" => Some(ExtraInput::Az),
            "el" => Some(ExtraInput::El),
            "zd" => Some(ExtraInput::Zd),
            "ha" => Some(ExtraInput::Ha),
            "dec" => Some(ExtraInput::Dec),
            _ => None,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            ExtraInput::Az => "az",
            ExtraInput::El => "el",
            ExtraInput::Zd => "zd",
            ExtraInput::Ha => "ha",
            ExtraInput::Dec => "dec",
        }
    }
}

/// Axis an extra term contributes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtraAxis {
    Az,
    El,
    Ha,
    Dec,
}

impl ExtraAxis {
    fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "az" => Some(ExtraAxis::Az),
            "el" => Some(ExtraAxis::El),
            "ha" => Some(ExtraAxis::Ha),
            "dec" => Some(ExtraAxis::Dec),
            _ => None,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            ExtraAxis::Az => "AZ",
            ExtraAxis::El => "EL",
            ExtraAxis::Ha => "HA",
            ExtraAxis::Dec => "DEC",
        }
    }
}

// Both frames of one position, radians.
#[derive(Debug, Clone, Copy)]
struct ModelAngles {
    az: f64,
    el: f64,
    ha: f64,
    dec: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtraTerm {
    pub axis: ExtraAxis,
    // Radians.
    pub coefficient: f64,
    pub function: ExtraFunction,
    pub inputs: Vec<ExtraInput>,
    // Per-input scale factors, defaulting to 1.
    pub consts: Vec<f64>,
}

impl ExtraTerm {
    fn value(&self, angles: &ModelAngles) -> f64 {
        let x = |i: usize| {
            let angle = match self.inputs.get(i) {
                Some(ExtraInput::Az) => angles.az,
                Some(ExtraInput::El) => angles.el,
                Some(ExtraInput::Zd) => std::f64::consts::FRAC_PI_2 - angles.el,
                Some(ExtraInput::Ha) => angles.ha,
                Some(ExtraInput::Dec) => angles.dec,
                None => 0.0,
            };
            self.consts.get(i).copied().unwrap_or(1.0) * angle
        };
        let c = self.coefficient;
        match self.function {
            ExtraFunction::Offset => c,
            ExtraFunction::Sin => c * x(0).sin(),
            ExtraFunction::Cos => c * x(0).cos(),
            ExtraFunction::Tan => c * x(0).tan(),
            ExtraFunction::SinCos => c * x(0).sin() * x(1).cos(),
            ExtraFunction::CosCos => c * x(0).cos() * x(1).cos(),
            ExtraFunction::SinSin => c * x(0).sin() * x(1).sin(),
            ExtraFunction::AbsSin => c * x(0).sin().abs(),
            ExtraFunction::AbsCos => c * x(0).cos().abs(),
            ExtraFunction::Csc => c / x(0).sin(),
            ExtraFunction::Sec => c / x(0).cos(),
            ExtraFunction::Cot => c / x(0).tan(),
            ExtraFunction::Sinh => c * x(0).sinh(),
            ExtraFunction::Cosh => c * x(0).cosh(),
            ExtraFunction::Tanh => c * x(0).tanh(),
            ExtraFunction::Sech => c / x(0).cosh(),
            ExtraFunction::Csch => c / x(0).sinh(),
            ExtraFunction::Coth => c / x(0).tanh(),
        }
    }
}

/// Reads an angle with an optional unit suffix: none for radians, `d` for
/// degrees, `'` or `m` for arcminutes, `"` or `s` for arcseconds. Returns
/// radians.
pub fn parse_angle(token: &str) -> Option<f64> {
    let (number, scale) = match token.chars().last()? {
        'd' => (&token[..token.len() - 1], 1.0_f64.to_radians()),
        '\'' | 'm' => (&token[..token.len() - 1], (1.0_f64 / 60.0).to_radians()),
        '"' | 's' => (&token[..token.len() - 1], (1.0_f64 / 3600.0).to_radians()),
        _ => (token, 1.0),
    };
    let v = number.parse::<f64>().ok()?;
    if v.is_finite() {
        Some(v * scale)
    } else {
        None
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GPointModel {
    pub frame: GPointFrame,
    // Radians.
    pub params: [f64; 9],
    pub extra: Vec<ExtraTerm>,
}

impl GPointModel {
    /// Parses a model beginning with an `RTS2_MODEL` or `RTS2_ALTAZ` header
    /// line. Lines starting with '#' are comments.
    pub fn parse(text: &str) -> MountResult<Self> {
        let mut lines = text
            .lines()
            .enumerate()
            .map(|(i, l)| (i + 1, l.trim()))
            .filter(|(_, l)| !l.is_empty() && !l.starts_with('#'));

        let (hline, header) = lines
            .next()
            .ok_or_else(|| MountError::model_parse(1, "header", "empty model file"))?;
        let mut tokens = header.split_whitespace();
        let frame = match tokens.next() {
            Some("RTS2_MODEL") => GPointFrame::Equatorial,
            Some("RTS2_ALTAZ") => GPointFrame::Horizontal,
            other => {
                return Err(MountError::model_parse(
                    hline,
                    "header",
                    &format!("expected RTS2_MODEL or RTS2_ALTAZ, got {:?}", other),
                ))
            }
        };
        let mut params = [0.0; 9];
        let mut count = 0;
        for token in tokens {
            if count == params.len() {
                return Err(MountError::model_parse(hline, "parameter", "too many parameters"));
            }
            params[count] = parse_angle(token).ok_or_else(|| {
                MountError::model_parse(
                    hline,
                    &format!("parameter {}", count),
                    &format!("cannot parse '{}'", token),
                )
            })?;
            count += 1;
        }
        let valid_count = match frame {
            GPointFrame::Equatorial => count == 9,
            // Older horizontal models carry only the first seven.
            GPointFrame::Horizontal => count == 7 || count == 9,
        };
        if !valid_count {
            return Err(MountError::model_parse(
                hline,
                "parameter",
                &format!("wrong parameter count {}", count),
            ));
        }

        let mut extra = Vec::new();
        for (lnum, line) in lines {
            extra.push(Self::parse_extra(lnum, line)?);
        }
        debug!("loaded {} model with {} extra terms", frame.header(), extra.len());
        Ok(GPointModel {
            frame,
            params,
            extra,
        })
    }

    // AXIS COEFFICIENT FUNCTION INPUT[;INPUT] [CONST[;CONST]]
    fn parse_extra(lnum: usize, line: &str) -> MountResult<ExtraTerm> {
        let mut tokens = line.split_whitespace();
        let axis_name = tokens.next().unwrap_or_default();
        let axis = ExtraAxis::from_name(axis_name).ok_or_else(|| {
            MountError::model_parse(lnum, "axis", &format!("invalid axis '{}'", axis_name))
        })?;
        let coef = tokens
            .next()
            .ok_or_else(|| MountError::model_parse(lnum, "coefficient", "missing"))?;
        let coefficient = parse_angle(coef).ok_or_else(|| {
            MountError::model_parse(lnum, "coefficient", &format!("cannot parse '{}'", coef))
        })?;
        let fname = tokens
            .next()
            .ok_or_else(|| MountError::model_parse(lnum, "function", "missing"))?;
        let function = ExtraFunction::from_name(fname).ok_or_else(|| {
            MountError::model_parse(lnum, "function", &format!("unknown function '{}'", fname))
        })?;

        let mut inputs = Vec::new();
        match tokens.next() {
            Some(list) => {
                for name in list.split(';') {
                    inputs.push(ExtraInput::from_name(name).ok_or_else(|| {
                        MountError::model_parse(lnum, "input", &format!("invalid input '{}'", name))
                    })?);
                }
            }
            None if function.arity() == 0 => (),
            None => return Err(MountError::model_parse(lnum, "input", "missing")),
        }
        if inputs.len() < function.arity() || inputs.len() > 2 {
            return Err(MountError::model_parse(
                lnum,
                "input",
                &format!("{} needs {} inputs", function.name(), function.arity()),
            ));
        }

        let mut consts = Vec::new();
        if let Some(list) = tokens.next() {
            for c in list.split(';') {
                let v = c.parse::<f64>().ok().filter(|v| v.is_finite()).ok_or_else(|| {
                    MountError::model_parse(lnum, "constant", &format!("cannot parse '{}'", c))
                })?;
                consts.push(v);
            }
        }
        if consts.len() > inputs.len() {
            return Err(MountError::model_parse(lnum, "constant", "more constants than inputs"));
        }
        consts.resize(inputs.len(), 1.0);
        if let Some(t) = tokens.next() {
            return Err(MountError::model_parse(
                lnum,
                "trailing field",
                &format!("unexpected '{}'", t),
            ));
        }
        Ok(ExtraTerm {
            axis,
            coefficient,
            function,
            inputs,
            consts,
        })
    }

    fn extra_sum(&self, axis: ExtraAxis, angles: &ModelAngles) -> f64 {
        self.extra
            .iter()
            .filter(|t| t.axis == axis)
            .map(|t| t.value(angles))
            .sum()
    }

    // Horizontal error (errAz, errEl) at the given position.
    fn horizontal_error(&self, az: f64, el: f64, lat: f64) -> (f64, f64) {
        let p = &self.params;
        let (ha, dec) = hour_angle_from_alt_az(el, az, lat);
        let angles = ModelAngles { az, el, ha, dec };
        let (sin_az, cos_az) = az.sin_cos();
        let tan_el = el.tan();
        let err_az = -p[0] - p[1] * sin_az * tan_el - p[2] * cos_az * tan_el
            - p[3] * tan_el
            + p[4] / el.cos()
            + self.extra_sum(ExtraAxis::Az, &angles);
        let err_el = -p[5] - p[2] * sin_az + p[6] * el.cos() + p[7] * cos_az
            + p[8] * sin_az
            + self.extra_sum(ExtraAxis::El, &angles);
        (err_az, err_el)
    }

    // Equatorial error (errHa, errDec) at the given position.
    fn equatorial_error(&self, ha: f64, dec: f64, lat: f64) -> (f64, f64) {
        let p = &self.params;
        let (el, az) = alt_az_from_hour_angle(ha, dec, lat);
        let angles = ModelAngles { az, el, ha, dec };
        let (sin_h, cos_h) = ha.sin_cos();
        let (sin_f, cos_f) = lat.sin_cos();
        let tan_d = dec.tan();
        let err_dec = -p[0] - p[1] * cos_h - p[2] * sin_h
            - p[3] * (cos_f * dec.sin() * cos_h - sin_f * dec.cos())
            - p[8] * cos_h
            - self.extra_sum(ExtraAxis::Dec, &angles);
        let err_ha = -p[4] - p[5] / dec.cos() - p[6] * tan_d
            - (p[1] * sin_h - p[2] * cos_h) * tan_d
            - p[3] * cos_f * sin_h / dec.cos()
            - p[7] * (sin_f * tan_d + cos_f * cos_h)
            - self.extra_sum(ExtraAxis::Ha, &angles);
        (err_ha, err_dec)
    }

    fn error(&self, a: f64, b: f64, lat: f64) -> (f64, f64) {
        match self.frame {
            GPointFrame::Horizontal => self.horizontal_error(a, b, lat),
            GPointFrame::Equatorial => self.equatorial_error(a, b, lat),
        }
    }

    /// Mean to telescope. For the horizontal frame the pair is (az, el),
    /// for the equatorial frame (ha, dec); radians.
    pub fn apply(&self, a: f64, b: f64, lat: f64) -> (f64, f64) {
        let (ea, eb) = self.error(a, b, lat);
        (a + ea, b + eb)
    }

    /// Telescope to mean; inverse of apply(). None when the fixed-point
    /// iteration does not settle.
    pub fn reverse(&self, a: f64, b: f64, lat: f64) -> Option<(f64, f64)> {
        let (mut x, mut y) = (a, b);
        for _i in 0..MAX_REVERSE_ITERATIONS {
            let (ea, eb) = self.error(x, y, lat);
            let (nx, ny) = (a - ea, b - eb);
            let change = (nx - x).abs().max((ny - y).abs());
            x = nx;
            y = ny;
            if change.is_nan() {
                return None;
            }
            if change <= REVERSE_TOLERANCE {
                return Some((x, y));
            }
        }
        None
    }
}

fn arcsec(radians: f64) -> f64 {
    radians.to_degrees() * 3600.0
}

impl fmt::Display for GPointModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.frame.header())?;
        for p in &self.params {
            write!(f, " {}\"", arcsec(*p))?;
        }
        writeln!(f)?;
        for term in &self.extra {
            write!(
                f,
                "{} {}\" {}",
                term.axis.name(),
                arcsec(term.coefficient),
                term.function.name()
            )?;
            if !term.inputs.is_empty() {
                let inputs: Vec<&str> = term.inputs.iter().map(|i| i.name()).collect();
                let consts: Vec<String> = term.consts.iter().map(|c| c.to_string()).collect();
                write!(f, " {} {}", inputs.join(";"), consts.join(";"))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    extern crate approx;
    use approx::assert_abs_diff_eq;

    use super::*;

    const ALTAZ_MODEL: &str = "RTS2_ALTAZ -32.9560351668\" 37.8603669032\" \
33.69867556175\" -22.4029458503\" -6.3810740497\" -15.8279575851\" 9.97752718308\"
AZ 6.52266606181\" sincos az;el 2.0;2.0
AZ 2.86981868859\" sincos el;az 5.0;3.0
EL -0.142425289668\" sincos az;el 4.0;4.0
EL 1.42907527224\" sin az 1.0
";

    fn as_rad(arcsec: f64) -> f64 {
        (arcsec / 3600.0).to_radians()
    }

    #[test]
    fn test_parse_angle() {
        assert_abs_diff_eq!(parse_angle("1.5").unwrap(), 1.5, epsilon = 1e-15);
        assert_abs_diff_eq!(
            parse_angle("90d").unwrap(),
            std::f64::consts::FRAC_PI_2,
            epsilon = 1e-15
        );
        assert_abs_diff_eq!(parse_angle("30'").unwrap(), 0.5_f64.to_radians(), epsilon = 1e-15);
        assert_abs_diff_eq!(parse_angle("30m").unwrap(), 0.5_f64.to_radians(), epsilon = 1e-15);
        assert_abs_diff_eq!(parse_angle("36s").unwrap(), 0.01_f64.to_radians(), epsilon = 1e-15);
        assert!(parse_angle("12x").is_none());
        assert!(parse_angle("\"").is_none());
        assert!(parse_angle("").is_none());
    }

    #[test]
    fn test_parse_altaz() {
        let model = GPointModel::parse(ALTAZ_MODEL).unwrap();
        assert_eq!(model.frame, GPointFrame::Horizontal);
        assert_abs_diff_eq!(model.params[0], as_rad(-32.9560351668), epsilon = 1e-15);
        assert_abs_diff_eq!(model.params[6], as_rad(9.97752718308), epsilon = 1e-15);
        assert_eq!(model.params[7], 0.0);
        assert_eq!(model.params[8], 0.0);
        assert_eq!(model.extra.len(), 4);

        let t = &model.extra[1];
        assert_eq!(t.axis, ExtraAxis::Az);
        assert_eq!(t.function, ExtraFunction::SinCos);
        assert_eq!(t.inputs, vec![ExtraInput::El, ExtraInput::Az]);
        assert_eq!(t.consts, vec![5.0, 3.0]);
        assert_eq!(model.extra[3].axis, ExtraAxis::El);
        assert_eq!(model.extra[3].function, ExtraFunction::Sin);
    }

    #[test]
    fn test_horizontal_error() {
        let mut params = [0.0; 9];
        params[0] = as_rad(10.0);
        params[5] = as_rad(20.0);
        params[6] = as_rad(4.0);
        let model = GPointModel {
            frame: GPointFrame::Horizontal,
            params,
            extra: vec![],
        };
        let az = 1.0;
        let el = 0.5;
        let (az1, el1) = model.apply(az, el, 0.3);
        assert_abs_diff_eq!(az1, az - as_rad(10.0), epsilon = 1e-15);
        assert_abs_diff_eq!(el1, el - as_rad(20.0) + as_rad(4.0) * el.cos(), epsilon = 1e-15);
    }

    #[test]
    fn test_extra_defaults() {
        let model =
            GPointModel::parse("RTS2_ALTAZ 0 0 0 0 0 0 0\nEL 2d cos zd\nAZ 1d offset\n").unwrap();
        let t = &model.extra[0];
        assert_eq!(t.consts, vec![1.0]);
        // At the zenith, cos(zd) = 1.
        let (_, el1) = model.apply(0.2, std::f64::consts::FRAC_PI_2 - 1e-9, 0.5);
        assert_abs_diff_eq!(
            el1,
            std::f64::consts::FRAC_PI_2 + 2.0_f64.to_radians(),
            epsilon = 1e-8
        );
        let (az1, _) = model.apply(0.2, 0.1, 0.5);
        assert_abs_diff_eq!(az1, 0.2 + 1.0_f64.to_radians(), epsilon = 1e-12);
    }

    #[test]
    fn test_altaz_apply_reverse() {
        let model = GPointModel::parse(ALTAZ_MODEL).unwrap();
        let lat = (-40.0_f64).to_radians();
        for (az, el) in [(0.3, 0.4), (2.0, 1.2), (4.0, 0.1), (5.9, 0.8)] {
            let (taz, tel) = model.apply(az, el, lat);
            assert!((taz - az).abs() > 1e-6);
            let (maz, mel) = model.reverse(taz, tel, lat).unwrap();
            assert_abs_diff_eq!(maz, az, epsilon = 1e-11);
            assert_abs_diff_eq!(mel, el, epsilon = 1e-11);
        }
    }

    #[test]
    fn test_reverse_near_zenith_diverges() {
        let mut params = [0.0; 9];
        params[1] = as_rad(10.0);
        let model = GPointModel { frame: GPointFrame::Horizontal, params, extra: vec![] };
        let lat = (-40.0_f64).to_radians();
        assert!(model.reverse(0.3, 89.9999_f64.to_radians(), lat).is_none());
        assert!(model.reverse(0.3, 0.8, lat).is_some());
    }

    #[test]
    fn test_equatorial_apply_reverse() {
        let text = concat!(
            "RTS2_MODEL 10\" -5\" 3\" 2\" 30\" 7\" -4\" 1\" 2\"\n",
            "HA 3\" cos dec\nDEC 2\" sinsin ha;el 2\n",
        );
        let model = GPointModel::parse(text).unwrap();
        assert_eq!(model.frame, GPointFrame::Equatorial);
        assert_eq!(model.extra[1].consts, vec![2.0, 1.0]);
        let lat = 35.0_f64.to_radians();
        for (ha, dec) in [(0.3, 0.4), (2.0, -0.2), (-1.0, 1.0)] {
            let (tha, tdec) = model.apply(ha, dec, lat);
            let (mha, mdec) = model.reverse(tha, tdec, lat).unwrap();
            assert_abs_diff_eq!(mha, ha, epsilon = 1e-11);
            assert_abs_diff_eq!(mdec, dec, epsilon = 1e-11);
        }

        // Index terms alone shift by the plain offsets.
        let mut params = [0.0; 9];
        params[0] = as_rad(10.0);
        params[4] = as_rad(30.0);
        let model = GPointModel { frame: GPointFrame::Equatorial, params, extra: vec![] };
        let (tha, tdec) = model.apply(0.5, 0.5, lat);
        assert_abs_diff_eq!(tha, 0.5 - as_rad(30.0), epsilon = 1e-15);
        assert_abs_diff_eq!(tdec, 0.5 - as_rad(10.0), epsilon = 1e-15);
    }

    #[test]
    fn test_parse_errors() {
        let check = |text: &str, want_line: usize, want_field: &str| {
            match GPointModel::parse(text) {
                Err(MountError::ModelParse { line, field, .. }) => {
                    assert_eq!(line, want_line, "{}", text);
                    assert_eq!(field, want_field, "{}", text);
                }
                other => panic!("unexpected {:?} for {}", other, text),
            }
        };
        check("RTS2_FOO 1 2 3", 1, "header");
        check("RTS2_MODEL 1 2 3", 1, "parameter");
        check("RTS2_ALTAZ 1 2 3 4 5 6 7x", 1, "parameter 6");
        check("RTS2_ALTAZ 0 0 0 0 0 0 0\n\nAZ 1\" bogus az", 3, "function");
        check("RTS2_ALTAZ 0 0 0 0 0 0 0\nXX 1\" sin az", 2, "axis");
        check("RTS2_ALTAZ 0 0 0 0 0 0 0\nAZ 1\" sincos az", 2, "input");
        check("RTS2_ALTAZ 0 0 0 0 0 0 0\nAZ 1\" sin foo", 2, "input");
        check("RTS2_ALTAZ 0 0 0 0 0 0 0\nAZ 1\" sin az 1;2", 2, "constant");
        check("RTS2_ALTAZ 0 0 0 0 0 0 0\nEL abc sin az", 2, "coefficient");
        check("", 1, "header");
    }

    #[test]
    fn test_display_round_trip() {
        let model = GPointModel::parse(ALTAZ_MODEL).unwrap();
        let text = model.to_string();
        assert!(text.starts_with("RTS2_ALTAZ "));
        let reparsed = GPointModel::parse(&text).unwrap();
        assert_eq!(reparsed.extra.len(), model.extra.len());
        for (a, b) in model.params.iter().zip(reparsed.params.iter()) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-15);
        }
        for (a, b) in model.extra.iter().zip(reparsed.extra.iter()) {
            assert_eq!(a.function, b.function);
            assert_eq!(a.inputs, b.inputs);
            assert_eq!(a.consts, b.consts);
            assert_abs_diff_eq!(a.coefficient, b.coefficient, epsilon = 1e-15);
        }
    }
}  // mod tests.
