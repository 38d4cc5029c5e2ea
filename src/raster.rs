use std::collections::HashMap;

use tiny_skia::{
    FillRule as SkFillRule, GradientStop as SkGradientStop, LineCap, LineJoin as SkLineJoin,
    LinearGradient, Mask, Paint, Path, PathBuilder, Pixmap, PixmapPaint, PremultipliedColorU8,
    RadialGradient, Shader, SpreadMode as SkSpreadMode, Stroke, StrokeDash, Transform,
};

use crate::backend::{BrushDescriptor, BrushHandle, DrawingBackend, GeometryHandle, Resource};
use crate::error::SvgError;
use crate::geometry::{FillRule, Outline, OutlineSegment, arc_to_cubics};
use crate::gradient::{GradientDescriptor, GradientGeometry, GradientStop, SpreadMode};
use crate::paint::{CapStyle, LineJoin, ResolvedStrokeStyle};
use crate::types::{Color, Matrix, Rect};

struct RasterGeometry {
    path: Option<Path>,
    fill_rule: SkFillRule,
    /// Paths the geometry is intersected with, in the same user space.
    clips: Vec<(Path, SkFillRule)>,
    bounds: Option<Rect>,
}

struct Layer {
    pixmap: Pixmap,
    opacity: f32,
}

pub struct TinySkiaBackend {
    surface: Pixmap,
    layers: Vec<Layer>,
    next_handle: u64,
    geometries: HashMap<GeometryHandle, RasterGeometry>,
    brushes: HashMap<BrushHandle, BrushDescriptor>,
}

impl TinySkiaBackend {
    /// Transparent surface of `width` x `height` pixels.
    pub fn new(width: u32, height: u32) -> Result<Self, SvgError> {
        let surface = Pixmap::new(width, height).ok_or_else(|| {
            SvgError::Backend(format!("invalid surface size {width}x{height}"))
        })?;
        Ok(Self {
            surface,
            layers: Vec::new(),
            next_handle: 0,
            geometries: HashMap::new(),
            brushes: HashMap::new(),
        })
    }

    pub fn with_background(mut self, color: Color) -> Self {
        self.surface.fill(to_sk_color(color, 1.0));
        self
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.surface
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<PremultipliedColorU8> {
        self.surface.pixel(x, y)
    }

    pub fn encode_png(&self) -> Result<Vec<u8>, SvgError> {
        self.surface
            .encode_png()
            .map_err(|err| SvgError::Backend(format!("png encoding failed: {err}")))
    }

    pub fn live_resources(&self) -> usize {
        self.geometries.len() + self.brushes.len()
    }

    fn next(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }

    /// Looks up both handles and draws onto the innermost layer.
    fn draw_with<F>(
        &mut self,
        geometry: GeometryHandle,
        brush: BrushHandle,
        transform: Matrix,
        draw: F,
    ) -> Result<(), SvgError>
    where
        F: FnOnce(&mut Pixmap, &Path, SkFillRule, &Paint<'_>, Transform, Option<&Mask>),
    {
        let geom = self
            .geometries
            .get(&geometry)
            .ok_or_else(|| SvgError::Backend(format!("geometry {} is not live", geometry.0)))?;
        let descriptor = self
            .brushes
            .get(&brush)
            .ok_or_else(|| SvgError::Backend(format!("brush {} is not live", brush.0)))?;
        let Some(path) = &geom.path else {
            return Ok(());
        };
        let Some(paint) = build_paint(descriptor) else {
            return Ok(());
        };

        let ts = to_transform(transform);
        let width = self.surface.width();
        let height = self.surface.height();
        let mask = build_mask(&geom.clips, ts, width, height);
        if !geom.clips.is_empty() && mask.is_none() {
            return Ok(());
        }

        let target = match self.layers.last_mut() {
            Some(layer) => &mut layer.pixmap,
            None => &mut self.surface,
        };
        draw(target, path, geom.fill_rule, &paint, ts, mask.as_ref());
        Ok(())
    }
}

impl DrawingBackend for TinySkiaBackend {
    fn create_geometry(&mut self, outline: &Outline) -> Result<GeometryHandle, SvgError> {
        let handle = GeometryHandle(self.next());
        self.geometries.insert(
            handle,
            RasterGeometry {
                path: outline_to_path(outline),
                fill_rule: to_sk_fill_rule(outline.fill_rule),
                clips: Vec::new(),
                bounds: outline.bounds(),
            },
        );
        Ok(handle)
    }

    fn intersect_clip(
        &mut self,
        geometry: GeometryHandle,
        clip: GeometryHandle,
    ) -> Result<GeometryHandle, SvgError> {
        let missing = |h: GeometryHandle| SvgError::Backend(format!("geometry {} is not live", h.0));
        let base = self.geometries.get(&geometry).ok_or_else(|| missing(geometry))?;
        let clip_geom = self.geometries.get(&clip).ok_or_else(|| missing(clip))?;

        let mut clips = base.clips.clone();
        clips.extend(clip_geom.clips.iter().cloned());
        if let Some(path) = &clip_geom.path {
            clips.push((path.clone(), clip_geom.fill_rule));
        }
        let bounds = match (base.bounds, clip_geom.bounds) {
            (Some(a), Some(b)) => a.intersect(&b),
            _ => None,
        };
        // A clip without area hides everything.
        let path = if clip_geom.path.is_some() {
            base.path.clone()
        } else {
            None
        };
        let combined = RasterGeometry {
            path,
            fill_rule: base.fill_rule,
            clips,
            bounds,
        };

        let handle = GeometryHandle(self.next());
        self.geometries.insert(handle, combined);
        Ok(handle)
    }

    fn geometry_bounds(&self, geometry: GeometryHandle) -> Option<Rect> {
        self.geometries.get(&geometry).and_then(|g| g.bounds)
    }

    fn create_brush(&mut self, descriptor: &BrushDescriptor) -> Result<BrushHandle, SvgError> {
        let handle = BrushHandle(self.next());
        self.brushes.insert(handle, descriptor.clone());
        Ok(handle)
    }

    fn fill(
        &mut self,
        geometry: GeometryHandle,
        brush: BrushHandle,
        transform: Matrix,
    ) -> Result<(), SvgError> {
        self.draw_with(geometry, brush, transform, |pixmap, path, rule, paint, ts, mask| {
            pixmap.fill_path(path, paint, rule, ts, mask);
        })
    }

    fn stroke(
        &mut self,
        geometry: GeometryHandle,
        brush: BrushHandle,
        width: f32,
        style: &ResolvedStrokeStyle,
        transform: Matrix,
    ) -> Result<(), SvgError> {
        let stroke = build_stroke(width, style);
        self.draw_with(geometry, brush, transform, |pixmap, path, _, paint, ts, mask| {
            pixmap.stroke_path(path, paint, &stroke, ts, mask);
        })
    }

    fn begin_layer(&mut self, opacity: f32) -> Result<(), SvgError> {
        let pixmap = Pixmap::new(self.surface.width(), self.surface.height())
            .ok_or_else(|| SvgError::Backend("cannot allocate layer".to_string()))?;
        self.layers.push(Layer {
            pixmap,
            opacity: opacity.clamp(0.0, 1.0),
        });
        Ok(())
    }

    fn end_layer(&mut self) -> Result<(), SvgError> {
        let layer = self
            .layers
            .pop()
            .ok_or_else(|| SvgError::Backend("end_layer without begin_layer".to_string()))?;
        let target = match self.layers.last_mut() {
            Some(parent) => &mut parent.pixmap,
            None => &mut self.surface,
        };
        let paint = PixmapPaint {
            opacity: layer.opacity,
            ..PixmapPaint::default()
        };
        target.draw_pixmap(
            0,
            0,
            layer.pixmap.as_ref(),
            &paint,
            Transform::identity(),
            None,
        );
        Ok(())
    }

    fn dispose(&mut self, resource: Resource) {
        let released = match resource {
            Resource::Geometry(handle) => self.geometries.remove(&handle).is_some(),
            Resource::Brush(handle) => self.brushes.remove(&handle).is_some(),
        };
        if !released {
            log::warn!("dispose of unknown backend resource {resource:?}");
        }
    }
}

fn to_transform(m: Matrix) -> Transform {
    Transform::from_row(m.a, m.b, m.c, m.d, m.e, m.f)
}

fn to_sk_fill_rule(rule: FillRule) -> SkFillRule {
    match rule {
        FillRule::NonZero => SkFillRule::Winding,
        FillRule::EvenOdd => SkFillRule::EvenOdd,
    }
}

fn outline_to_path(outline: &Outline) -> Option<Path> {
    let mut pb = PathBuilder::new();
    for figure in &outline.figures {
        pb.move_to(figure.start.x, figure.start.y);
        let mut current = figure.start;
        for seg in &figure.segments {
            match *seg {
                OutlineSegment::Line(to) => pb.line_to(to.x, to.y),
                OutlineSegment::Quadratic { control, to } => {
                    pb.quad_to(control.x, control.y, to.x, to.y)
                }
                OutlineSegment::Cubic { c1, c2, to } => {
                    pb.cubic_to(c1.x, c1.y, c2.x, c2.y, to.x, to.y)
                }
                OutlineSegment::Arc(arc) => {
                    let pieces = arc_to_cubics(current, &arc);
                    if pieces.is_empty() {
                        pb.line_to(arc.to.x, arc.to.y);
                    }
                    for [c1, c2, to] in pieces {
                        pb.cubic_to(c1.x, c1.y, c2.x, c2.y, to.x, to.y);
                    }
                }
            }
            current = seg.end();
        }
        if figure.closed {
            pb.close();
        }
    }
    pb.finish()
}

fn build_mask(clips: &[(Path, SkFillRule)], ts: Transform, width: u32, height: u32) -> Option<Mask> {
    let ((first, first_rule), rest) = clips.split_first()?;
    let mut mask = Mask::new(width, height)?;
    mask.fill_path(first, *first_rule, true, ts);
    for (path, rule) in rest {
        mask.intersect_path(path, *rule, true, ts);
    }
    Some(mask)
}

fn build_stroke(width: f32, style: &ResolvedStrokeStyle) -> Stroke {
    let mut stroke = Stroke {
        width: width.max(0.0),
        miter_limit: style.miter_limit.max(1.0),
        ..Stroke::default()
    };
    stroke.line_cap = match style.start_cap {
        CapStyle::Flat => LineCap::Butt,
        CapStyle::Round => LineCap::Round,
        CapStyle::Square => LineCap::Square,
    };
    stroke.line_join = match style.line_join {
        LineJoin::MiterOrBevel => SkLineJoin::Miter,
        LineJoin::Round => SkLineJoin::Round,
        LineJoin::Bevel => SkLineJoin::Bevel,
    };
    // Dash values arrive in stroke-width units.
    if let Some(pattern) = &style.dash_pattern {
        let pattern: Vec<f32> = pattern.iter().map(|v| v * width).collect();
        stroke.dash = StrokeDash::new(pattern, style.dash_offset * width);
    }
    stroke
}

fn build_paint(descriptor: &BrushDescriptor) -> Option<Paint<'static>> {
    let mut paint = Paint {
        anti_alias: true,
        ..Paint::default()
    };
    match descriptor {
        BrushDescriptor::Solid { color, alpha } => paint.set_color(to_sk_color(*color, *alpha)),
        BrushDescriptor::Gradient(gradient) => paint.shader = build_shader(gradient)?,
    }
    Some(paint)
}

fn build_shader(gradient: &GradientDescriptor) -> Option<Shader<'static>> {
    let last = gradient.stops.last()?;
    let stops = sk_stops(&gradient.stops);
    let mode = match gradient.spread {
        SpreadMode::Clamp => SkSpreadMode::Pad,
        SpreadMode::Mirror => SkSpreadMode::Reflect,
        SpreadMode::Wrap => SkSpreadMode::Repeat,
    };
    let ts = to_transform(gradient.transform);

    let shader = match gradient.geometry {
        GradientGeometry::Linear { p1, p2 } => LinearGradient::new(
            tiny_skia::Point::from_xy(p1.x, p1.y),
            tiny_skia::Point::from_xy(p2.x, p2.y),
            stops,
            mode,
            ts,
        ),
        GradientGeometry::Radial {
            center,
            focus,
            radius_x,
            radius_y,
        } => {
            // Elliptical gradients are circular ones squashed about the centre.
            let ts = if radius_x > 0.0 && radius_y != radius_x {
                ts.pre_translate(center.x, center.y)
                    .pre_scale(1.0, radius_y / radius_x)
                    .pre_translate(-center.x, -center.y)
            } else {
                ts
            };
            let focus_y = if radius_x > 0.0 {
                center.y + (focus.y - center.y) * radius_x / radius_y.max(f32::EPSILON)
            } else {
                focus.y
            };
            RadialGradient::new(
                tiny_skia::Point::from_xy(focus.x, focus_y),
                tiny_skia::Point::from_xy(center.x, center.y),
                radius_x,
                stops,
                mode,
                ts,
            )
        }
    };
    // Degenerate geometry paints the last stop colour.
    Some(shader.unwrap_or_else(|| Shader::SolidColor(to_sk_color(last.color, last.alpha))))
}

fn sk_stops(stops: &[GradientStop]) -> Vec<SkGradientStop> {
    stops
        .iter()
        .map(|s| SkGradientStop::new(s.offset.clamp(0.0, 1.0), to_sk_color(s.color, s.alpha)))
        .collect()
}

fn to_sk_color(color: Color, opacity: f32) -> tiny_skia::Color {
    let r = color.r.clamp(0.0, 1.0);
    let g = color.g.clamp(0.0, 1.0);
    let b = color.b.clamp(0.0, 1.0);
    let a = opacity.clamp(0.0, 1.0);
    tiny_skia::Color::from_rgba(r, g, b, a)
        .unwrap_or_else(|| tiny_skia::Color::from_rgba8(0, 0, 0, 255))
}
