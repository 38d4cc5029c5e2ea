//! Lengths with units and their conversion to device pixels.
//!
//! Absolute units use the CSS reference of 96 pixels per inch. Percentages
//! are contextual: axis-bound lengths scale with the reference width or
//! height, everything else uses the normalized diagonal
//! `sqrt(w² + h²) / sqrt(2)`.

use std::str::FromStr;

use crate::error::SvgError;
use crate::types::Size;

const PX_PER_IN: f64 = 96.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LengthUnit {
    Number,
    Px,
    Pt,
    Pc,
    Cm,
    Mm,
    In,
    Em,
    Ex,
    Percentage,
}

impl LengthUnit {
    pub fn suffix(self) -> &'static str {
        match self {
            LengthUnit::Number => "",
            LengthUnit::Px => "px",
            LengthUnit::Pt => "pt",
            LengthUnit::Pc => "pc",
            LengthUnit::Cm => "cm",
            LengthUnit::Mm => "mm",
            LengthUnit::In => "in",
            LengthUnit::Em => "em",
            LengthUnit::Ex => "ex",
            LengthUnit::Percentage => "%",
        }
    }

    fn from_suffix(suffix: &str) -> Option<Self> {
        let unit = match suffix {
            "" => LengthUnit::Number,
            "px" => LengthUnit::Px,
            "pt" => LengthUnit::Pt,
            "pc" => LengthUnit::Pc,
            "cm" => LengthUnit::Cm,
            "mm" => LengthUnit::Mm,
            "in" => LengthUnit::In,
            "em" => LengthUnit::Em,
            "ex" => LengthUnit::Ex,
            "%" => LengthUnit::Percentage,
            _ => return None,
        };
        Some(unit)
    }

    fn px_factor(self) -> Option<f64> {
        match self {
            LengthUnit::Number | LengthUnit::Px => Some(1.0),
            LengthUnit::Pt => Some(PX_PER_IN / 72.0),
            LengthUnit::Pc => Some(PX_PER_IN / 6.0),
            LengthUnit::Cm => Some(PX_PER_IN / 2.54),
            LengthUnit::Mm => Some(PX_PER_IN / 25.4),
            LengthUnit::In => Some(PX_PER_IN),
            LengthUnit::Em | LengthUnit::Ex | LengthUnit::Percentage => None,
        }
    }
}

/// Which reference dimension a percentage resolves against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Diagonal,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Length {
    pub value: f64,
    pub unit: LengthUnit,
}

impl Length {
    pub const ZERO: Length = Length {
        value: 0.0,
        unit: LengthUnit::Number,
    };

    pub fn new(value: f64, unit: LengthUnit) -> Self {
        Self { value, unit }
    }

    pub fn number(value: f64) -> Self {
        Self::new(value, LengthUnit::Number)
    }

    pub fn percent(value: f64) -> Self {
        Self::new(value, LengthUnit::Percentage)
    }

    pub fn to_pixels(&self, axis: Axis, reference: Size) -> Result<f32, SvgError> {
        if let Some(factor) = self.unit.px_factor() {
            return Ok((self.value * factor) as f32);
        }
        match self.unit {
            LengthUnit::Percentage => {
                let w = reference.width as f64;
                let h = reference.height as f64;
                let basis = match axis {
                    Axis::X => w,
                    Axis::Y => h,
                    Axis::Diagonal => (w * w + h * h).sqrt() / std::f64::consts::SQRT_2,
                };
                Ok((self.value * basis / 100.0) as f32)
            }
            unit => Err(SvgError::UnsupportedUnit(unit)),
        }
    }
}

impl FromStr for Length {
    type Err = SvgError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let bytes = input.as_bytes();
        let end = scan_number(bytes, 0);
        if end == 0 {
            return Err(SvgError::MalformedLength(input.to_string()));
        }
        let value = input[..end]
            .parse::<f64>()
            .map_err(|_| SvgError::MalformedLength(input.to_string()))?;
        let unit = LengthUnit::from_suffix(&input[end..])
            .ok_or_else(|| SvgError::MalformedLength(input.to_string()))?;
        Ok(Length { value, unit })
    }
}

/// Scans `sign? digits? ('.' digits)? (exponent)?` from `start` and
/// returns the end offset, or `start` when no digit was seen. An `e` not
/// followed by digits is left for the unit suffix (`2em`).
pub(crate) fn scan_number(bytes: &[u8], start: usize) -> usize {
    let mut i = start;
    let mut digits = false;
    if i < bytes.len() && matches!(bytes[i], b'+' | b'-') {
        i += 1;
    }
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
        digits = true;
    }
    if i < bytes.len() && bytes[i] == b'.' {
        let mut j = i + 1;
        let mut frac = false;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
            frac = true;
        }
        if frac {
            i = j;
            digits = true;
        }
    }
    if !digits {
        return start;
    }
    if i < bytes.len() && matches!(bytes[i], b'e' | b'E') {
        let mut j = i + 1;
        if j < bytes.len() && matches!(bytes[j], b'+' | b'-') {
            j += 1;
        }
        let exp_start = j;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        if j > exp_start {
            i = j;
        }
    }
    i
}

/// Converts lengths against a fixed reference size (the canvas, or the
/// unit square for object-bounding-box content).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LengthContext {
    pub reference: Size,
}

impl LengthContext {
    pub fn new(reference: Size) -> Self {
        Self { reference }
    }

    pub fn unit_square() -> Self {
        Self::new(Size::new(1.0, 1.0))
    }

    pub fn convert_x(&self, length: Length) -> Result<f32, SvgError> {
        length.to_pixels(Axis::X, self.reference)
    }

    pub fn convert_y(&self, length: Length) -> Result<f32, SvgError> {
        length.to_pixels(Axis::Y, self.reference)
    }

    /// Non-axis-bound lengths such as stroke width.
    pub fn convert(&self, length: Length) -> Result<f32, SvgError> {
        length.to_pixels(Axis::Diagonal, self.reference)
    }
}
