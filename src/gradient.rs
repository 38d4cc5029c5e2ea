//! Linear and radial gradient resolution.
//!
//! Attributes and stops are inherited along the gradient's `href` chain.
//! Coordinates in object-bounding-box space are resolved against the unit
//! square and mapped onto the painted shape by the descriptor transform.

use crate::document::{Document, ElementKind, NodeId};
use crate::error::SvgError;
use crate::length::{Length, LengthContext};
use crate::style::Paint;
use crate::types::{Color, Matrix, Point, Rect};

const MAX_HREF_CHAIN: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpreadMode {
    #[default]
    Clamp,
    Mirror,
    Wrap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GradientUnits {
    ObjectBoundingBox,
    UserSpaceOnUse,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientStop {
    pub offset: f32,
    pub color: Color,
    pub alpha: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GradientGeometry {
    Linear {
        p1: Point,
        p2: Point,
    },
    Radial {
        center: Point,
        focus: Point,
        radius_x: f32,
        radius_y: f32,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct GradientDescriptor {
    pub stops: Vec<GradientStop>,
    pub spread: SpreadMode,
    pub transform: Matrix,
    pub geometry: GradientGeometry,
}

impl GradientDescriptor {
    /// `focus - center` for radial gradients, zero for linear ones.
    pub fn origin_offset(&self) -> Point {
        match self.geometry {
            GradientGeometry::Radial { center, focus, .. } => {
                Point::new(focus.x - center.x, focus.y - center.y)
            }
            GradientGeometry::Linear { .. } => Point::ORIGIN,
        }
    }
}

pub fn gradient_units(doc: &Document, gradient: NodeId) -> GradientUnits {
    match chain_attribute(doc, &href_chain(doc, gradient), "gradientUnits") {
        Some("userSpaceOnUse") => GradientUnits::UserSpaceOnUse,
        _ => GradientUnits::ObjectBoundingBox,
    }
}

/// Resolves `gradient` for a shape with bounds `bbox`. `lengths` is the
/// user-space context; it is ignored in object-bounding-box space.
pub fn resolve_gradient(
    doc: &Document,
    gradient: NodeId,
    bbox: Rect,
    lengths: &LengthContext,
) -> Result<GradientDescriptor, SvgError> {
    let chain = href_chain(doc, gradient);
    let attr = |name: &str| chain_attribute(doc, &chain, name);
    let length = |name: &str, default: Length| -> Result<Length, SvgError> {
        attr(name).map_or(Ok(default), |raw| raw.trim().parse::<Length>())
    };

    let units = gradient_units(doc, gradient);
    let (ctx, transform) = match units {
        GradientUnits::ObjectBoundingBox => (
            LengthContext::unit_square(),
            Matrix::new(bbox.width, 0.0, 0.0, bbox.height, bbox.x, bbox.y)
                .mul(chain_transform(doc, &chain)),
        ),
        GradientUnits::UserSpaceOnUse => (*lengths, chain_transform(doc, &chain)),
    };

    let spread = match attr("spreadMethod") {
        Some("reflect") => SpreadMode::Mirror,
        Some("repeat") => SpreadMode::Wrap,
        _ => SpreadMode::Clamp,
    };

    let geometry = match doc.node(gradient).kind {
        ElementKind::RadialGradient => {
            let half = Length::percent(50.0);
            let cx = ctx.convert_x(length("cx", half)?)?;
            let cy = ctx.convert_y(length("cy", half)?)?;
            let r = length("r", half)?;
            let fx = match attr("fx") {
                Some(raw) => ctx.convert_x(raw.trim().parse()?)?,
                None => cx,
            };
            let fy = match attr("fy") {
                Some(raw) => ctx.convert_y(raw.trim().parse()?)?,
                None => cy,
            };
            GradientGeometry::Radial {
                center: Point::new(cx, cy),
                focus: Point::new(fx, fy),
                radius_x: ctx.convert_x(r)?,
                radius_y: ctx.convert_y(r)?,
            }
        }
        _ => GradientGeometry::Linear {
            p1: Point::new(
                ctx.convert_x(length("x1", Length::percent(0.0))?)?,
                ctx.convert_y(length("y1", Length::percent(0.0))?)?,
            ),
            p2: Point::new(
                ctx.convert_x(length("x2", Length::percent(100.0))?)?,
                ctx.convert_y(length("y2", Length::percent(0.0))?)?,
            ),
        },
    };

    Ok(GradientDescriptor {
        stops: collect_stops(doc, &chain),
        spread,
        transform,
        geometry,
    })
}

/// `gradient` followed by the gradients its `href` points at.
fn href_chain(doc: &Document, gradient: NodeId) -> Vec<NodeId> {
    let mut chain = vec![gradient];
    let mut current = gradient;
    while chain.len() < MAX_HREF_CHAIN {
        let Some(next) = doc
            .node(current)
            .attribute("href")
            .and_then(|href| doc.resolve_local_ref(href))
            .filter(|id| doc.node(*id).kind.is_gradient())
        else {
            break;
        };
        if chain.contains(&next) {
            log::debug!("gradient href cycle at node {}", next.index());
            break;
        }
        chain.push(next);
        current = next;
    }
    chain
}

fn chain_attribute<'a>(doc: &'a Document, chain: &[NodeId], name: &str) -> Option<&'a str> {
    chain.iter().find_map(|id| doc.node(*id).attribute(name))
}

fn chain_transform(doc: &Document, chain: &[NodeId]) -> Matrix {
    chain
        .iter()
        .find(|id| doc.node(**id).attribute("gradientTransform").is_some())
        .map(|id| doc.node(*id).transform)
        .unwrap_or_default()
}

/// Stops of the first gradient in the chain that has any, in document
/// order, with offsets clamped to `[0, 1]` and made non-decreasing.
fn collect_stops(doc: &Document, chain: &[NodeId]) -> Vec<GradientStop> {
    for id in chain {
        let stop_nodes: Vec<NodeId> = doc
            .children(*id)
            .iter()
            .copied()
            .filter(|c| doc.node(*c).kind == ElementKind::Stop)
            .collect();
        if stop_nodes.is_empty() {
            continue;
        }

        let mut stops = Vec::with_capacity(stop_nodes.len());
        let mut last = 0.0f32;
        for stop_id in stop_nodes {
            let node = doc.node(stop_id);
            let offset = parse_stop_offset(node.attribute("offset")).max(last);
            last = offset;
            let (color, color_alpha) = match &node.style.stop_color {
                Some(Paint::Color { color, alpha }) => (*color, *alpha),
                Some(Paint::CurrentColor) => node.style.color.unwrap_or((Color::BLACK, 1.0)),
                _ => (Color::BLACK, 1.0),
            };
            stops.push(GradientStop {
                offset,
                color,
                alpha: color_alpha * node.style.stop_opacity.unwrap_or(1.0),
            });
        }
        return stops;
    }
    Vec::new()
}

fn parse_stop_offset(input: Option<&str>) -> f32 {
    let Some(raw) = input.map(str::trim) else {
        return 0.0;
    };
    let value = match raw.strip_suffix('%') {
        Some(pct) => pct.trim().parse::<f32>().map(|v| v / 100.0),
        None => raw.parse::<f32>(),
    };
    value.unwrap_or(0.0).clamp(0.0, 1.0)
}
