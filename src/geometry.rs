//! Backend-agnostic outlines and the segment walker that builds them.

use crate::path_data::PathSegment;
use crate::types::{Point, Rect};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FillRule {
    #[default]
    NonZero,
    EvenOdd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArcSize {
    Small,
    Large,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepDirection {
    Clockwise,
    CounterClockwise,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArcTo {
    pub to: Point,
    pub radius_x: f32,
    pub radius_y: f32,
    /// x-axis rotation in degrees.
    pub rotation_deg: f32,
    pub size: ArcSize,
    pub sweep: SweepDirection,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutlineSegment {
    Line(Point),
    Quadratic { control: Point, to: Point },
    Cubic { c1: Point, c2: Point, to: Point },
    Arc(ArcTo),
}

impl OutlineSegment {
    pub fn end(&self) -> Point {
        match *self {
            OutlineSegment::Line(to) => to,
            OutlineSegment::Quadratic { to, .. } => to,
            OutlineSegment::Cubic { to, .. } => to,
            OutlineSegment::Arc(arc) => arc.to,
        }
    }
}

/// One sub-path. A closed figure connects its last point back to `start`.
#[derive(Debug, Clone, PartialEq)]
pub struct Figure {
    pub start: Point,
    pub segments: Vec<OutlineSegment>,
    pub closed: bool,
}

impl Figure {
    fn new(start: Point) -> Self {
        Self {
            start,
            segments: Vec::new(),
            closed: false,
        }
    }

    /// Start point plus every segment end point.
    pub fn vertices(&self) -> usize {
        1 + self.segments.len()
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Outline {
    pub figures: Vec<Figure>,
    pub fill_rule: FillRule,
}

impl Outline {
    pub fn from_segments(segments: &[PathSegment], fill_rule: FillRule) -> Self {
        let mut builder = OutlineBuilder::new();
        for seg in segments {
            builder.push(seg);
        }
        builder.finish(fill_rule)
    }

    pub fn line(from: Point, to: Point) -> Self {
        let mut figure = Figure::new(from);
        figure.segments.push(OutlineSegment::Line(to));
        Self {
            figures: vec![figure],
            fill_rule: FillRule::NonZero,
        }
    }

    pub fn polyline(points: &[Point], closed: bool, fill_rule: FillRule) -> Self {
        let Some((&first, rest)) = points.split_first() else {
            return Self::default();
        };
        let mut figure = Figure::new(first);
        figure
            .segments
            .extend(rest.iter().map(|&p| OutlineSegment::Line(p)));
        figure.closed = closed;
        Self {
            figures: vec![figure],
            fill_rule,
        }
    }

    /// Axis-aligned rectangle with corner radii already clamped by the caller.
    pub fn rounded_rect(rect: Rect, rx: f32, ry: f32) -> Self {
        let Rect {
            x,
            y,
            width: w,
            height: h,
        } = rect;
        if rx <= 0.0 || ry <= 0.0 {
            return Self::polyline(
                &[
                    Point::new(x, y),
                    Point::new(x + w, y),
                    Point::new(x + w, y + h),
                    Point::new(x, y + h),
                ],
                true,
                FillRule::NonZero,
            );
        }

        let corner = |to: Point| {
            OutlineSegment::Arc(ArcTo {
                to,
                radius_x: rx,
                radius_y: ry,
                rotation_deg: 0.0,
                size: ArcSize::Small,
                sweep: SweepDirection::Clockwise,
            })
        };
        let mut figure = Figure::new(Point::new(x + rx, y));
        figure.segments = vec![
            OutlineSegment::Line(Point::new(x + w - rx, y)),
            corner(Point::new(x + w, y + ry)),
            OutlineSegment::Line(Point::new(x + w, y + h - ry)),
            corner(Point::new(x + w - rx, y + h)),
            OutlineSegment::Line(Point::new(x + rx, y + h)),
            corner(Point::new(x, y + h - ry)),
            OutlineSegment::Line(Point::new(x, y + ry)),
            corner(Point::new(x + rx, y)),
        ];
        figure.closed = true;
        Self {
            figures: vec![figure],
            fill_rule: FillRule::NonZero,
        }
    }

    pub fn ellipse(center: Point, rx: f32, ry: f32) -> Self {
        // Four cubic quarter arcs.
        let k = 0.5522847498f32;
        let (cx, cy) = (center.x, center.y);
        let ox = rx * k;
        let oy = ry * k;
        let cubic = |c1x, c1y, c2x, c2y, x, y| OutlineSegment::Cubic {
            c1: Point::new(c1x, c1y),
            c2: Point::new(c2x, c2y),
            to: Point::new(x, y),
        };
        let mut figure = Figure::new(Point::new(cx + rx, cy));
        figure.segments = vec![
            cubic(cx + rx, cy + oy, cx + ox, cy + ry, cx, cy + ry),
            cubic(cx - ox, cy + ry, cx - rx, cy + oy, cx - rx, cy),
            cubic(cx - rx, cy - oy, cx - ox, cy - ry, cx, cy - ry),
            cubic(cx + ox, cy - ry, cx + rx, cy - oy, cx + rx, cy),
        ];
        figure.closed = true;
        Self {
            figures: vec![figure],
            fill_rule: FillRule::NonZero,
        }
    }

    pub fn with_fill_rule(mut self, fill_rule: FillRule) -> Self {
        self.fill_rule = fill_rule;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.figures.is_empty()
    }

    /// Control-point bounding box; arcs are measured through their cubic
    /// approximation.
    pub fn bounds(&self) -> Option<Rect> {
        let mut min_x = f32::INFINITY;
        let mut min_y = f32::INFINITY;
        let mut max_x = f32::NEG_INFINITY;
        let mut max_y = f32::NEG_INFINITY;
        let mut add = |p: Point| {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        };

        for figure in &self.figures {
            add(figure.start);
            let mut current = figure.start;
            for seg in &figure.segments {
                match *seg {
                    OutlineSegment::Line(to) => add(to),
                    OutlineSegment::Quadratic { control, to } => {
                        add(control);
                        add(to);
                    }
                    OutlineSegment::Cubic { c1, c2, to } => {
                        add(c1);
                        add(c2);
                        add(to);
                    }
                    OutlineSegment::Arc(arc) => {
                        for [c1, c2, to] in arc_to_cubics(current, &arc) {
                            add(c1);
                            add(c2);
                            add(to);
                        }
                        add(arc.to);
                    }
                }
                current = seg.end();
            }
        }

        if !min_x.is_finite() || !min_y.is_finite() || !max_x.is_finite() || !max_y.is_finite() {
            return None;
        }
        Some(Rect::new(
            min_x,
            min_y,
            (max_x - min_x).max(0.0),
            (max_y - min_y).max(0.0),
        ))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CurveFamily {
    Cubic,
    Quadratic,
}

/// Walks path segments, resolving relative and smooth commands into
/// absolute outline segments.
#[derive(Debug, Default)]
pub struct OutlineBuilder {
    figures: Vec<Figure>,
    open: Option<Figure>,
    current: Point,
    /// Trailing control point of the previous segment, when that segment
    /// was a curve.
    previous_control: Option<(CurveFamily, Point)>,
}

impl OutlineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_point(&self) -> Point {
        self.current
    }

    pub fn push(&mut self, seg: &PathSegment) {
        let cur = self.current;
        match *seg {
            PathSegment::ClosePath => {
                if let Some(mut figure) = self.open.take() {
                    figure.closed = true;
                    self.current = figure.start;
                    self.figures.push(figure);
                }
                self.previous_control = None;
            }
            PathSegment::MoveToAbs { x, y } => self.move_to(Point::new(x, y)),
            PathSegment::MoveToRel { x, y } => self.move_to(cur.offset(x, y)),
            PathSegment::LineToAbs { x, y } => self.line_to(Point::new(x, y)),
            PathSegment::LineToRel { x, y } => self.line_to(cur.offset(x, y)),
            PathSegment::LineToHorizontalAbs { x } => self.line_to(Point::new(x, cur.y)),
            PathSegment::LineToHorizontalRel { x } => self.line_to(cur.offset(x, 0.0)),
            PathSegment::LineToVerticalAbs { y } => self.line_to(Point::new(cur.x, y)),
            PathSegment::LineToVerticalRel { y } => self.line_to(cur.offset(0.0, y)),
            PathSegment::CurveToCubicAbs {
                x1,
                y1,
                x2,
                y2,
                x,
                y,
            } => self.cubic_to(Point::new(x1, y1), Point::new(x2, y2), Point::new(x, y)),
            PathSegment::CurveToCubicRel {
                x1,
                y1,
                x2,
                y2,
                x,
                y,
            } => self.cubic_to(cur.offset(x1, y1), cur.offset(x2, y2), cur.offset(x, y)),
            PathSegment::CurveToCubicSmoothAbs { x2, y2, x, y } => {
                let c1 = self.reflected_control(CurveFamily::Cubic);
                self.cubic_to(c1, Point::new(x2, y2), Point::new(x, y));
            }
            PathSegment::CurveToCubicSmoothRel { x2, y2, x, y } => {
                let c1 = self.reflected_control(CurveFamily::Cubic);
                self.cubic_to(c1, cur.offset(x2, y2), cur.offset(x, y));
            }
            PathSegment::CurveToQuadraticAbs { x1, y1, x, y } => {
                self.quad_to(Point::new(x1, y1), Point::new(x, y))
            }
            PathSegment::CurveToQuadraticRel { x1, y1, x, y } => {
                self.quad_to(cur.offset(x1, y1), cur.offset(x, y))
            }
            PathSegment::CurveToQuadraticSmoothAbs { x, y } => {
                let control = self.reflected_control(CurveFamily::Quadratic);
                self.quad_to(control, Point::new(x, y));
            }
            PathSegment::CurveToQuadraticSmoothRel { x, y } => {
                let control = self.reflected_control(CurveFamily::Quadratic);
                self.quad_to(control, cur.offset(x, y));
            }
            PathSegment::ArcAbs(arc) => self.arc_to(&arc, Point::new(arc.x, arc.y)),
            PathSegment::ArcRel(arc) => self.arc_to(&arc, cur.offset(arc.x, arc.y)),
        }
    }

    /// Ends any open figure as open and returns the outline.
    pub fn finish(mut self, fill_rule: FillRule) -> Outline {
        if let Some(figure) = self.open.take() {
            self.figures.push(figure);
        }
        Outline {
            figures: self.figures,
            fill_rule,
        }
    }

    fn move_to(&mut self, to: Point) {
        if let Some(figure) = self.open.take() {
            self.figures.push(figure);
        }
        self.current = to;
        self.open = Some(Figure::new(to));
    }

    fn figure(&mut self) -> &mut Figure {
        let start = self.current;
        self.open.get_or_insert_with(|| Figure::new(start))
    }

    fn emit(&mut self, seg: OutlineSegment) {
        self.figure().segments.push(seg);
        self.current = seg.end();
    }

    fn line_to(&mut self, to: Point) {
        self.emit(OutlineSegment::Line(to));
        self.previous_control = None;
    }

    fn cubic_to(&mut self, c1: Point, c2: Point, to: Point) {
        self.emit(OutlineSegment::Cubic { c1, c2, to });
        self.previous_control = Some((CurveFamily::Cubic, c2));
    }

    fn quad_to(&mut self, control: Point, to: Point) {
        self.emit(OutlineSegment::Quadratic { control, to });
        self.previous_control = Some((CurveFamily::Quadratic, control));
    }

    fn arc_to(&mut self, arc: &crate::path_data::ArcArgs, to: Point) {
        self.emit(OutlineSegment::Arc(ArcTo {
            to,
            radius_x: arc.radius_x,
            radius_y: arc.radius_y,
            rotation_deg: 180.0 * arc.angle / std::f32::consts::PI,
            size: if arc.large_arc {
                ArcSize::Large
            } else {
                ArcSize::Small
            },
            sweep: if arc.sweep {
                SweepDirection::Clockwise
            } else {
                SweepDirection::CounterClockwise
            },
        }));
        self.previous_control = None;
    }

    fn reflected_control(&self, family: CurveFamily) -> Point {
        match self.previous_control {
            Some((prev_family, control)) if prev_family == family => reflect(control, self.current),
            _ => self.current,
        }
    }
}

pub fn reflect(control: Point, about: Point) -> Point {
    Point::new(2.0 * about.x - control.x, 2.0 * about.y - control.y)
}

/// Converts an elliptical arc starting at `from` into cubic pieces
/// `[c1, c2, end]`. Degenerate arcs (zero radius or coincident end
/// points) yield no pieces; callers draw a straight line instead.
pub(crate) fn arc_to_cubics(from: Point, arc: &ArcTo) -> Vec<[Point; 3]> {
    use std::f32::consts::PI;

    let (x0, y0) = (from.x, from.y);
    let (x1, y1) = (arc.to.x, arc.to.y);
    let mut rx = arc.radius_x.abs();
    let mut ry = arc.radius_y.abs();
    if rx == 0.0 || ry == 0.0 || (x0 == x1 && y0 == y1) {
        return Vec::new();
    }
    let large_arc = arc.size == ArcSize::Large;
    let sweep = arc.sweep == SweepDirection::Clockwise;

    let phi = arc.rotation_deg.to_radians();
    let sin_phi = libm::sinf(phi);
    let cos_phi = libm::cosf(phi);

    let dx2 = (x0 - x1) / 2.0;
    let dy2 = (y0 - y1) / 2.0;
    let x1p = cos_phi * dx2 + sin_phi * dy2;
    let y1p = -sin_phi * dx2 + cos_phi * dy2;

    // Scale radii up when they cannot span the end points.
    let x1p2 = x1p * x1p;
    let y1p2 = y1p * y1p;
    let lambda = x1p2 / (rx * rx) + y1p2 / (ry * ry);
    if lambda > 1.0 {
        let s = libm::sqrtf(lambda);
        rx *= s;
        ry *= s;
    }

    let rx2 = rx * rx;
    let ry2 = ry * ry;
    let num = rx2 * ry2 - rx2 * y1p2 - ry2 * x1p2;
    let den = rx2 * y1p2 + ry2 * x1p2;
    let mut coef = 0.0;
    if den != 0.0 {
        let sign = if large_arc == sweep { -1.0 } else { 1.0 };
        coef = sign * libm::sqrtf((num / den).max(0.0));
    }
    let cxp = coef * (rx * y1p / ry);
    let cyp = coef * (-ry * x1p / rx);

    let cx = cos_phi * cxp - sin_phi * cyp + (x0 + x1) / 2.0;
    let cy = sin_phi * cxp + cos_phi * cyp + (y0 + y1) / 2.0;

    fn angle(ux: f32, uy: f32, vx: f32, vy: f32) -> f32 {
        libm::atan2f(ux * vy - uy * vx, ux * vx + uy * vy)
    }

    let ux = (x1p - cxp) / rx;
    let uy = (y1p - cyp) / ry;
    let vx = (-x1p - cxp) / rx;
    let vy = (-y1p - cyp) / ry;

    let mut theta = angle(1.0, 0.0, ux, uy);
    let mut dtheta = angle(ux, uy, vx, vy);
    if !sweep && dtheta > 0.0 {
        dtheta -= 2.0 * PI;
    } else if sweep && dtheta < 0.0 {
        dtheta += 2.0 * PI;
    }

    let count = libm::ceilf(dtheta.abs() / (PI / 2.0)).max(1.0) as usize;
    let delta = dtheta / count as f32;
    let k = (4.0 / 3.0) * libm::tanf(delta / 4.0);

    let map = |x: f32, y: f32| {
        let x = rx * x;
        let y = ry * y;
        Point::new(
            cx + cos_phi * x - sin_phi * y,
            cy + sin_phi * x + cos_phi * y,
        )
    };

    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        let (s1, c1) = (libm::sinf(theta), libm::cosf(theta));
        let t2 = theta + delta;
        let (s2, c2) = (libm::sinf(t2), libm::cosf(t2));
        out.push([
            map(c1 - k * s1, s1 + k * c1),
            map(c2 + k * s2, s2 - k * c2),
            map(c2, s2),
        ]);
        theta = t2;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path_data::parse_path_data;

    fn near(a: Point, b: Point) -> bool {
        (a.x - b.x).abs() < 1e-3 && (a.y - b.y).abs() < 1e-3
    }

    #[test]
    fn closed_triangle_has_three_vertices() {
        let segs = [
            PathSegment::MoveToAbs { x: 0.0, y: 0.0 },
            PathSegment::LineToAbs { x: 10.0, y: 0.0 },
            PathSegment::LineToAbs { x: 10.0, y: 10.0 },
            PathSegment::ClosePath,
        ];
        let outline = Outline::from_segments(&segs, FillRule::NonZero);
        assert_eq!(outline.figures.len(), 1);
        let figure = &outline.figures[0];
        assert!(figure.closed);
        assert_eq!(figure.vertices(), 3);
    }

    #[test]
    fn smooth_cubic_reflects_previous_control() {
        // Previous control (10,10), current point (20,20).
        let segs = parse_path_data("M0 0 C0 0 10 10 20 20 S40 40 50 50");
        let outline = Outline::from_segments(&segs, FillRule::NonZero);
        let OutlineSegment::Cubic { c1, c2, to } = outline.figures[0].segments[1] else {
            panic!("expected cubic");
        };
        assert!(near(c1, Point::new(30.0, 30.0)));
        assert!(near(c2, Point::new(40.0, 40.0)));
        assert!(near(to, Point::new(50.0, 50.0)));
    }

    #[test]
    fn move_keeps_previous_control_for_smooth_cubic() {
        let segs = parse_path_data("M0 0 C0 0 10 10 20 20 M20 20 S40 40 50 50");
        let outline = Outline::from_segments(&segs, FillRule::NonZero);
        assert_eq!(outline.figures.len(), 2);
        let OutlineSegment::Cubic { c1, .. } = outline.figures[1].segments[0] else {
            panic!("expected cubic");
        };
        assert!(near(c1, Point::new(30.0, 30.0)));
    }

    #[test]
    fn smooth_curve_after_line_uses_current_point() {
        let segs = parse_path_data("M0 0 L20 20 S40 40 50 50");
        let outline = Outline::from_segments(&segs, FillRule::NonZero);
        let OutlineSegment::Cubic { c1, .. } = outline.figures[0].segments[1] else {
            panic!("expected cubic");
        };
        assert!(near(c1, Point::new(20.0, 20.0)));
    }

    #[test]
    fn smooth_quadratic_does_not_reflect_cubic_control() {
        let segs = parse_path_data("M0 0 C0 0 10 10 20 20 T40 0");
        let outline = Outline::from_segments(&segs, FillRule::NonZero);
        let OutlineSegment::Quadratic { control, .. } = outline.figures[0].segments[1] else {
            panic!("expected quadratic");
        };
        assert!(near(control, Point::new(20.0, 20.0)));
    }

    #[test]
    fn chained_smooth_quadratics_reflect() {
        let segs = parse_path_data("M0 0 Q10 10 20 0 T40 0");
        let outline = Outline::from_segments(&segs, FillRule::NonZero);
        let OutlineSegment::Quadratic { control, .. } = outline.figures[0].segments[1] else {
            panic!("expected quadratic");
        };
        assert!(near(control, Point::new(30.0, -10.0)));
    }

    #[test]
    fn relative_commands_accumulate() {
        let segs = parse_path_data("m10 10 h5 v5 l-5 0");
        let outline = Outline::from_segments(&segs, FillRule::NonZero);
        let ends: Vec<Point> = outline.figures[0].segments.iter().map(|s| s.end()).collect();
        assert_eq!(
            ends,
            vec![
                Point::new(15.0, 10.0),
                Point::new(15.0, 15.0),
                Point::new(10.0, 15.0)
            ]
        );
    }

    #[test]
    fn move_ends_previous_figure_open() {
        let segs = parse_path_data("M0 0 L1 1 M5 5 L6 6 Z");
        let outline = Outline::from_segments(&segs, FillRule::NonZero);
        assert_eq!(outline.figures.len(), 2);
        assert!(!outline.figures[0].closed);
        assert!(outline.figures[1].closed);
    }

    #[test]
    fn drawing_without_move_starts_figure_at_origin() {
        let segs = [PathSegment::LineToAbs { x: 3.0, y: 4.0 }];
        let outline = Outline::from_segments(&segs, FillRule::NonZero);
        assert_eq!(outline.figures[0].start, Point::ORIGIN);
        assert!(!outline.figures[0].closed);
    }

    #[test]
    fn close_returns_to_figure_start() {
        let segs = parse_path_data("M5 5 l10 0 l0 10 z l1 1");
        let outline = Outline::from_segments(&segs, FillRule::NonZero);
        assert_eq!(outline.figures.len(), 2);
        assert_eq!(outline.figures[1].start, Point::new(5.0, 5.0));
        assert_eq!(outline.figures[1].segments[0].end(), Point::new(6.0, 6.0));
    }

    #[test]
    fn arc_flags_and_angle_convert() {
        let segs = parse_path_data("M0 0 A10 5 30 1 0 20 0");
        let outline = Outline::from_segments(&segs, FillRule::NonZero);
        let OutlineSegment::Arc(arc) = outline.figures[0].segments[0] else {
            panic!("expected arc");
        };
        assert_eq!(arc.size, ArcSize::Large);
        assert_eq!(arc.sweep, SweepDirection::CounterClockwise);
        assert!((arc.rotation_deg - 30.0).abs() < 1e-3);
    }

    #[test]
    fn ellipse_and_rect_bounds() {
        let ellipse = Outline::ellipse(Point::new(50.0, 40.0), 20.0, 10.0);
        assert_eq!(ellipse.bounds(), Some(Rect::new(30.0, 30.0, 40.0, 20.0)));

        let rect = Outline::rounded_rect(Rect::new(10.0, 10.0, 30.0, 20.0), 5.0, 5.0);
        let b = rect.bounds().unwrap();
        assert!((b.x - 10.0).abs() < 1e-3 && (b.width - 30.0).abs() < 1e-3);
        assert!((b.y - 10.0).abs() < 1e-3 && (b.height - 20.0).abs() < 1e-3);
        assert_eq!(rect.figures[0].segments.len(), 8);
    }

    #[test]
    fn half_circle_arc_ends_on_target() {
        let arc = ArcTo {
            to: Point::new(20.0, 0.0),
            radius_x: 10.0,
            radius_y: 10.0,
            rotation_deg: 0.0,
            size: ArcSize::Small,
            sweep: SweepDirection::Clockwise,
        };
        let pieces = arc_to_cubics(Point::ORIGIN, &arc);
        assert!(pieces.len() >= 2);
        let last = pieces.last().unwrap()[2];
        assert!(near(last, Point::new(20.0, 0.0)));
        for [_, _, end] in &pieces {
            let r = ((end.x - 10.0).powi(2) + end.y.powi(2)).sqrt();
            assert!((r - 10.0).abs() < 1e-3);
        }
        // Clockwise in y-down space goes through the upper half.
        assert!(pieces[0][2].y < 0.0);
    }
}
