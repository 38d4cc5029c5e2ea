use crate::dasharray::DashArray;
use crate::document::{Document, NodeId};
use crate::error::SvgError;
use crate::length::LengthContext;
use crate::style::{Paint, StrokeLinecap, StrokeLinejoin, StyleSnapshot};
use crate::types::Color;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResolvedPaint {
    None,
    /// `alpha` already includes the colour's own alpha and the
    /// fill/stroke opacity.
    Solid { color: Color, alpha: f32 },
    /// Gradient element plus the fill/stroke opacity to composite it with.
    GradientRef { gradient: NodeId, opacity: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapStyle {
    Flat,
    Round,
    Square,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineJoin {
    MiterOrBevel,
    Round,
    Bevel,
}

/// Stroke parameters in stroke-width-relative units: every dash entry and
/// the dash offset are multiples of the stroke width.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedStrokeStyle {
    pub start_cap: CapStyle,
    pub end_cap: CapStyle,
    pub line_join: LineJoin,
    pub miter_limit: f32,
    pub dash_pattern: Option<Vec<f32>>,
    pub dash_offset: f32,
}

impl Default for ResolvedStrokeStyle {
    fn default() -> Self {
        Self {
            start_cap: CapStyle::Flat,
            end_cap: CapStyle::Flat,
            line_join: LineJoin::MiterOrBevel,
            miter_limit: 4.0,
            dash_pattern: None,
            dash_offset: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedStroke {
    pub paint: ResolvedPaint,
    pub width: f32,
    pub style: ResolvedStrokeStyle,
}

/// Fill paint; an unspecified fill is opaque black.
pub fn resolve_fill(doc: &Document, style: &StyleSnapshot) -> Result<ResolvedPaint, SvgError> {
    let opacity = style.fill_opacity.unwrap_or(1.0);
    match &style.fill {
        None => Ok(ResolvedPaint::Solid {
            color: Color::BLACK,
            alpha: opacity,
        }),
        Some(paint) => resolve_paint(doc, paint, style, opacity),
    }
}

/// Stroke paint, width and style, or `None` when nothing should be
/// stroked (no stroke, `none`, or a non-positive width).
pub fn resolve_stroke(
    doc: &Document,
    style: &StyleSnapshot,
    lengths: &LengthContext,
) -> Result<Option<ResolvedStroke>, SvgError> {
    let Some(paint) = &style.stroke else {
        return Ok(None);
    };
    if *paint == Paint::None {
        return Ok(None);
    }

    let width = match style.stroke_width {
        Some(length) => lengths.convert(length)?,
        None => 1.0,
    };
    if width <= 0.0 || width.is_nan() {
        log::debug!("stroke width {width} disables the stroke");
        return Ok(None);
    }

    let paint = resolve_paint(doc, paint, style, style.stroke_opacity.unwrap_or(1.0))?;
    if paint == ResolvedPaint::None {
        return Ok(None);
    }
    let stroke_style = resolve_stroke_style(style, width, lengths)?;
    Ok(Some(ResolvedStroke {
        paint,
        width,
        style: stroke_style,
    }))
}

pub fn resolve_paint(
    doc: &Document,
    paint: &Paint,
    style: &StyleSnapshot,
    opacity: f32,
) -> Result<ResolvedPaint, SvgError> {
    match paint {
        Paint::None => Ok(ResolvedPaint::None),
        Paint::Color { color, alpha } => Ok(ResolvedPaint::Solid {
            color: *color,
            alpha: alpha * opacity,
        }),
        Paint::CurrentColor => {
            let (color, alpha) = style.color.unwrap_or((Color::BLACK, 1.0));
            Ok(ResolvedPaint::Solid {
                color,
                alpha: alpha * opacity,
            })
        }
        Paint::Url(target) => {
            let gradient = doc
                .resolve_local_ref(target)
                .filter(|id| doc.node(*id).kind.is_gradient())
                .ok_or_else(|| SvgError::UnknownPaintReference(target.clone()))?;
            Ok(ResolvedPaint::GradientRef { gradient, opacity })
        }
    }
}

/// Caps, joins and the dash pattern normalized to `width`.
pub fn resolve_stroke_style(
    style: &StyleSnapshot,
    width: f32,
    lengths: &LengthContext,
) -> Result<ResolvedStrokeStyle, SvgError> {
    let cap = match style.stroke_linecap {
        Some(StrokeLinecap::Round) => CapStyle::Round,
        Some(StrokeLinecap::Square) => CapStyle::Square,
        Some(StrokeLinecap::Butt) | None => CapStyle::Flat,
    };
    let line_join = match style.stroke_linejoin {
        Some(StrokeLinejoin::Round) => LineJoin::Round,
        Some(StrokeLinejoin::Bevel) => LineJoin::Bevel,
        Some(StrokeLinejoin::Miter) | None => LineJoin::MiterOrBevel,
    };

    let dash_pattern = match &style.stroke_dasharray {
        Some(DashArray::Lengths(values)) if !values.is_empty() => {
            let mut px = values
                .iter()
                .map(|l| lengths.convert(*l))
                .collect::<Result<Vec<f32>, SvgError>>()?;
            if px.len() % 2 == 1 {
                px.extend_from_within(..);
            }
            if px.iter().all(|v| *v == 0.0) {
                None
            } else {
                Some(px.into_iter().map(|v| v / width).collect())
            }
        }
        _ => None,
    };
    let dash_offset = match style.stroke_dashoffset {
        Some(length) => lengths.convert(length)? / width,
        None => 0.0,
    };

    Ok(ResolvedStrokeStyle {
        start_cap: cap,
        end_cap: cap,
        line_join,
        miter_limit: style.stroke_miterlimit.unwrap_or(4.0),
        dash_pattern,
        dash_offset,
    })
}
