//! Tree walk that turns a [`Document`] into backend draw calls.
//!
//! A [`Renderer`] owns the geometry and paint caches for one document.
//! Every cached backend resource is registered in a single disposal list
//! and released exactly once by [`Renderer::dispose`] (also run on drop).

use std::collections::{HashMap, HashSet};

use crate::backend::{BrushDescriptor, BrushHandle, DrawingBackend, GeometryHandle, Resource};
use crate::document::{Document, ElementKind, Node, NodeId};
use crate::error::SvgError;
use crate::geometry::Outline;
use crate::gradient::{GradientDescriptor, GradientUnits, gradient_units, resolve_gradient};
use crate::length::{Axis, Length, LengthContext};
use crate::paint::{ResolvedPaint, resolve_fill, resolve_stroke};
use crate::types::{Matrix, Point, Rect, Size, parse_number_list};

const DEFAULT_VIEWPORT: Size = Size {
    width: 300.0,
    height: 150.0,
};

#[derive(Debug)]
pub struct ElementFailure {
    pub node: NodeId,
    pub element_id: Option<String>,
    pub tag: String,
    pub error: SvgError,
}

/// Outcome of one render pass. Failed elements were skipped together
/// with their subtrees; everything else was drawn.
#[derive(Debug, Default)]
pub struct RenderSummary {
    pub elements_drawn: usize,
    pub failures: Vec<ElementFailure>,
}

impl RenderSummary {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct RendererBuilder {
    viewport: Option<Size>,
    max_use_depth: usize,
    apply_view_box: bool,
}

impl Default for RendererBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RendererBuilder {
    pub fn new() -> Self {
        Self {
            viewport: None,
            max_use_depth: 32,
            apply_view_box: true,
        }
    }

    pub fn viewport(mut self, width: f32, height: f32) -> Self {
        self.viewport = Some(Size::new(width, height));
        self
    }

    pub fn max_use_depth(mut self, depth: usize) -> Self {
        self.max_use_depth = depth.max(1);
        self
    }

    pub fn apply_view_box(mut self, enabled: bool) -> Self {
        self.apply_view_box = enabled;
        self
    }

    pub fn build<B: DrawingBackend>(self, backend: &mut B) -> Renderer<'_, B> {
        Renderer {
            backend,
            config: self,
            lengths: LengthContext::new(DEFAULT_VIEWPORT),
            geometry_cache: HashMap::new(),
            clipped_cache: HashMap::new(),
            paint_cache: HashMap::new(),
            cyclic_uses: HashSet::new(),
            owned: Vec::new(),
            disposed: false,
        }
    }
}

#[derive(Debug, Clone)]
struct CachedGradient {
    descriptor: GradientDescriptor,
    brush: BrushHandle,
    /// Shape bounds the descriptor was built for; unused in user space.
    bbox: Rect,
}

pub struct Renderer<'a, B: DrawingBackend> {
    backend: &'a mut B,
    config: RendererBuilder,
    lengths: LengthContext,
    geometry_cache: HashMap<NodeId, Option<GeometryHandle>>,
    clipped_cache: HashMap<NodeId, Option<GeometryHandle>>,
    paint_cache: HashMap<NodeId, Vec<CachedGradient>>,
    cyclic_uses: HashSet<NodeId>,
    owned: Vec<Resource>,
    disposed: bool,
}

impl<'a, B: DrawingBackend> Renderer<'a, B> {
    pub fn new(backend: &'a mut B) -> Self {
        RendererBuilder::new().build(backend)
    }

    pub fn backend(&self) -> &B {
        &*self.backend
    }

    pub fn length_context(&self) -> LengthContext {
        self.lengths
    }

    /// Renders the whole document. Per-element failures are collected in
    /// the summary; only a disposed renderer or a backend layer error
    /// outside any element fails the call.
    pub fn render(&mut self, doc: &Document) -> Result<RenderSummary, SvgError> {
        if self.disposed {
            return Err(SvgError::Backend("renderer already disposed".to_string()));
        }

        let root = doc.node(doc.root());
        let viewport = self.config.viewport.unwrap_or_else(|| root_viewport(root));
        let view_box = if self.config.apply_view_box {
            parse_viewbox(root.attribute("viewBox"))
        } else {
            None
        };
        let reference = view_box.map_or(viewport, |vb| Size::new(vb.width, vb.height));
        self.lengths = LengthContext::new(reference);
        let base = viewbox_to_viewport_matrix(view_box, viewport.width, viewport.height);
        self.cyclic_uses = cyclic_uses(doc);

        let mut summary = RenderSummary::default();
        let mut use_stack = Vec::new();
        self.render_child(doc, doc.root(), base, &mut use_stack, &mut summary);
        log::debug!(
            "render pass drew {} elements, {} failures",
            summary.elements_drawn,
            summary.failures.len()
        );
        Ok(summary)
    }

    /// Cached geometry for a leaf shape, or `None` when the shape has
    /// nothing to draw (zero size, empty path).
    pub fn element_geometry(
        &mut self,
        doc: &Document,
        id: NodeId,
    ) -> Result<Option<GeometryHandle>, SvgError> {
        if let Some(cached) = self.geometry_cache.get(&id) {
            log::debug!("geometry cache hit for node {}", id.index());
            return Ok(*cached);
        }
        log::debug!("geometry cache miss for node {}", id.index());

        let outline = shape_outline(doc.node(id), &self.lengths)?;
        let handle = match outline {
            Some(outline) if !outline.is_empty() => {
                let handle = self.backend.create_geometry(&outline)?;
                self.owned.push(Resource::Geometry(handle));
                Some(handle)
            }
            _ => None,
        };
        self.geometry_cache.insert(id, handle);
        Ok(handle)
    }

    /// Cached brush for `gradient` painted over a shape with bounds
    /// `bbox`. `None` means the gradient paints nothing (no stops, or an
    /// empty box).
    ///
    /// User-space gradients keep a single brush per element. An
    /// object-bounding-box gradient keeps one brush per distinct box, so
    /// its cache key is (element, box) rather than the element alone and
    /// a new box allocates a new brush.
    pub fn gradient_brush(
        &mut self,
        doc: &Document,
        gradient: NodeId,
        bbox: Rect,
    ) -> Result<Option<BrushHandle>, SvgError> {
        let units = gradient_units(doc, gradient);
        if units == GradientUnits::ObjectBoundingBox && (bbox.width <= 0.0 || bbox.height <= 0.0)
        {
            log::debug!("gradient {} over an empty box paints nothing", gradient.index());
            return Ok(None);
        }

        let hit = self.paint_cache.get(&gradient).and_then(|entries| {
            entries
                .iter()
                .find(|e| units == GradientUnits::UserSpaceOnUse || e.bbox == bbox)
        });
        if let Some(entry) = hit {
            log::debug!("paint cache hit for gradient {}", gradient.index());
            return Ok((!entry.descriptor.stops.is_empty()).then_some(entry.brush));
        }

        log::debug!("paint cache miss for gradient {}", gradient.index());
        let descriptor = resolve_gradient(doc, gradient, bbox, &self.lengths)?;
        let brush = self
            .backend
            .create_brush(&BrushDescriptor::Gradient(descriptor.clone()))?;
        self.owned.push(Resource::Brush(brush));
        let paints = !descriptor.stops.is_empty();
        self.paint_cache
            .entry(gradient)
            .or_default()
            .push(CachedGradient {
                descriptor,
                brush,
                bbox,
            });
        Ok(paints.then_some(brush))
    }

    /// Releases every cached backend resource. Safe to call repeatedly.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        log::debug!("disposing {} cached backend resources", self.owned.len());
        for resource in self.owned.drain(..) {
            self.backend.dispose(resource);
        }
        self.geometry_cache.clear();
        self.clipped_cache.clear();
        self.paint_cache.clear();
        self.disposed = true;
    }

    fn render_child(
        &mut self,
        doc: &Document,
        id: NodeId,
        transform: Matrix,
        use_stack: &mut Vec<NodeId>,
        summary: &mut RenderSummary,
    ) {
        if let Err(error) = self.render_node(doc, id, transform, use_stack, summary) {
            let node = doc.node(id);
            log::warn!(
                "skipping <{}> {:?}: {}",
                node.tag_name(),
                node.id.as_deref().unwrap_or(""),
                error
            );
            summary.failures.push(ElementFailure {
                node: id,
                element_id: node.id.clone(),
                tag: node.tag_name().to_string(),
                error,
            });
        }
    }

    fn render_node(
        &mut self,
        doc: &Document,
        id: NodeId,
        transform: Matrix,
        use_stack: &mut Vec<NodeId>,
        summary: &mut RenderSummary,
    ) -> Result<(), SvgError> {
        let node = doc.node(id);
        if node.style.is_display_none() {
            log::debug!("display:none skips <{}> and its subtree", node.tag_name());
            return Ok(());
        }
        let transform = transform.mul(node.transform);

        match &node.kind {
            ElementKind::Svg | ElementKind::Group => {
                self.with_group_opacity(node, |this| {
                    for child in doc.children(id) {
                        this.render_child(doc, *child, transform, use_stack, summary);
                    }
                    Ok(())
                })
            }
            ElementKind::Use { instance_root } => {
                let Some(target) = *instance_root else {
                    log::debug!("use element without a resolvable target");
                    return Ok(());
                };
                if self.cyclic_uses.contains(&id) {
                    return Err(SvgError::CyclicReference(format!(
                        "use {:?} refers back to itself",
                        node.id.as_deref().unwrap_or("")
                    )));
                }
                if use_stack.contains(&id) || use_stack.len() >= self.config.max_use_depth {
                    return Err(SvgError::CyclicReference(format!(
                        "use {:?} re-entered at depth {}",
                        node.id.as_deref().unwrap_or(""),
                        use_stack.len()
                    )));
                }
                let x = optional_length(node, "x", Axis::X, &self.lengths)?.unwrap_or(0.0);
                let y = optional_length(node, "y", Axis::Y, &self.lengths)?.unwrap_or(0.0);
                let transform = transform.mul(Matrix::translate(x, y));

                use_stack.push(id);
                let result = self.with_group_opacity(node, |this| {
                    this.render_node(doc, target, transform, use_stack, summary)
                });
                use_stack.pop();
                result
            }
            ElementKind::Path { .. }
            | ElementKind::Rect
            | ElementKind::Circle
            | ElementKind::Ellipse
            | ElementKind::Line
            | ElementKind::Polyline
            | ElementKind::Polygon => {
                if self.render_leaf(doc, id, transform)? {
                    summary.elements_drawn += 1;
                }
                Ok(())
            }
            ElementKind::Defs
            | ElementKind::ClipPath
            | ElementKind::LinearGradient
            | ElementKind::RadialGradient
            | ElementKind::Stop => Ok(()),
            ElementKind::Unknown(name) => {
                log::debug!("ignoring unsupported element <{name}>");
                Ok(())
            }
        }
    }

    /// Wraps `draw` in an offscreen layer when the element has
    /// `opacity < 1`. The layer is closed even when `draw` fails.
    fn with_group_opacity<F>(&mut self, node: &Node, draw: F) -> Result<(), SvgError>
    where
        F: FnOnce(&mut Self) -> Result<(), SvgError>,
    {
        let opacity = node.style.opacity.unwrap_or(1.0);
        if opacity >= 1.0 {
            return draw(self);
        }
        self.backend.begin_layer(opacity)?;
        let result = draw(self);
        let closed = self.backend.end_layer();
        result.and(closed)
    }

    /// Returns whether anything was drawn.
    fn render_leaf(
        &mut self,
        doc: &Document,
        id: NodeId,
        transform: Matrix,
    ) -> Result<bool, SvgError> {
        let node = doc.node(id);
        if node.style.is_hidden() || node.style.opacity == Some(0.0) {
            return Ok(false);
        }

        let geometry = match &node.style.clip_path {
            Some(reference) => self.clipped_geometry(doc, id, reference)?,
            None => self.element_geometry(doc, id)?,
        };
        let Some(geometry) = geometry else {
            return Ok(false);
        };

        let mut transient = Vec::new();
        let result = self.paint_leaf(doc, node, geometry, transform, &mut transient);
        for resource in transient {
            self.backend.dispose(resource);
        }
        result
    }

    fn paint_leaf(
        &mut self,
        doc: &Document,
        node: &Node,
        geometry: GeometryHandle,
        transform: Matrix,
        transient: &mut Vec<Resource>,
    ) -> Result<bool, SvgError> {
        let fill = match node.kind {
            ElementKind::Line => ResolvedPaint::None,
            _ => resolve_fill(doc, &node.style)?,
        };
        let stroke = resolve_stroke(doc, &node.style, &self.lengths)?;

        let fill_brush = self.brush_for(doc, fill, geometry, transient)?;
        let stroke_brush = match &stroke {
            Some(stroke) => self.brush_for(doc, stroke.paint, geometry, transient)?,
            None => None,
        };
        if fill_brush.is_none() && stroke_brush.is_none() {
            return Ok(false);
        }

        self.with_group_opacity(node, |this| {
            if let Some((brush, opacity)) = fill_brush {
                log::trace!("fill geometry {} with brush {}", geometry.0, brush.0);
                this.with_paint_opacity(opacity, |b| b.fill(geometry, brush, transform))?;
            }
            if let (Some((brush, opacity)), Some(stroke)) = (stroke_brush, &stroke) {
                log::trace!(
                    "stroke geometry {} with brush {} at width {}",
                    geometry.0,
                    brush.0,
                    stroke.width
                );
                this.with_paint_opacity(opacity, |b| {
                    b.stroke(geometry, brush, stroke.width, &stroke.style, transform)
                })?;
            }
            Ok(())
        })?;
        Ok(true)
    }

    /// Gradient brushes carry no opacity of their own; a translucent
    /// gradient paint is drawn through a layer.
    fn with_paint_opacity<F>(&mut self, opacity: f32, draw: F) -> Result<(), SvgError>
    where
        F: FnOnce(&mut B) -> Result<(), SvgError>,
    {
        if opacity >= 1.0 {
            return draw(&mut *self.backend);
        }
        self.backend.begin_layer(opacity)?;
        let result = draw(&mut *self.backend);
        let closed = self.backend.end_layer();
        result.and(closed)
    }

    /// Brush plus the layer opacity it needs. Solid brushes are created
    /// per draw and registered in `transient`.
    fn brush_for(
        &mut self,
        doc: &Document,
        paint: ResolvedPaint,
        geometry: GeometryHandle,
        transient: &mut Vec<Resource>,
    ) -> Result<Option<(BrushHandle, f32)>, SvgError> {
        match paint {
            ResolvedPaint::None => Ok(None),
            ResolvedPaint::Solid { color, alpha } => {
                if alpha <= 0.0 {
                    return Ok(None);
                }
                let brush = self
                    .backend
                    .create_brush(&BrushDescriptor::Solid { color, alpha })?;
                transient.push(Resource::Brush(brush));
                Ok(Some((brush, 1.0)))
            }
            ResolvedPaint::GradientRef { gradient, opacity } => {
                if opacity <= 0.0 {
                    return Ok(None);
                }
                let bbox = self
                    .backend
                    .geometry_bounds(geometry)
                    .unwrap_or(Rect::new(0.0, 0.0, 0.0, 0.0));
                let brush = self.gradient_brush(doc, gradient, bbox)?;
                Ok(brush.map(|b| (b, opacity)))
            }
        }
    }

    fn clipped_geometry(
        &mut self,
        doc: &Document,
        id: NodeId,
        reference: &str,
    ) -> Result<Option<GeometryHandle>, SvgError> {
        if let Some(cached) = self.clipped_cache.get(&id) {
            return Ok(*cached);
        }

        let clip_source = self.clip_source(doc, reference)?;
        let handle = match (
            self.element_geometry(doc, id)?,
            self.element_geometry(doc, clip_source)?,
        ) {
            (Some(geometry), Some(clip)) => {
                let clipped = self.backend.intersect_clip(geometry, clip)?;
                self.owned.push(Resource::Geometry(clipped));
                Some(clipped)
            }
            _ => None,
        };
        self.clipped_cache.insert(id, handle);
        Ok(handle)
    }

    /// The path or rect a `clip-path` reference stands for, following a
    /// `use` child to its instance root.
    fn clip_source(&self, doc: &Document, reference: &str) -> Result<NodeId, SvgError> {
        if !reference.trim_start().starts_with('#') {
            return Err(SvgError::UnsupportedClipPath(format!(
                "non-local reference {reference:?}"
            )));
        }
        let clip = doc
            .resolve_local_ref(reference)
            .filter(|id| doc.node(*id).kind == ElementKind::ClipPath)
            .ok_or_else(|| {
                SvgError::UnsupportedClipPath(format!("{reference:?} is not a clipPath"))
            })?;
        let mut child = *doc
            .children(clip)
            .first()
            .ok_or_else(|| SvgError::UnsupportedClipPath(format!("{reference:?} is empty")))?;

        for _ in 0..self.config.max_use_depth {
            let node = doc.node(child);
            match node.kind {
                ElementKind::Path { .. } | ElementKind::Rect => return Ok(child),
                ElementKind::Use {
                    instance_root: Some(target),
                } => child = target,
                _ => {
                    return Err(SvgError::UnsupportedClipPath(format!(
                        "<{}> cannot be used as a clip shape",
                        node.tag_name()
                    )));
                }
            }
        }
        Err(SvgError::CyclicReference(format!(
            "clip {reference:?} use chain exceeds {}",
            self.config.max_use_depth
        )))
    }
}

impl<B: DrawingBackend> Drop for Renderer<'_, B> {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// `use` elements whose reference chain leads back to themselves, either
/// through an ancestor or through other `use` elements.
fn cyclic_uses(doc: &Document) -> HashSet<NodeId> {
    let targets: HashMap<NodeId, NodeId> = doc
        .descendants(doc.root())
        .into_iter()
        .filter_map(|id| match &doc.node(id).kind {
            ElementKind::Use {
                instance_root: Some(target),
            } => Some((id, *target)),
            _ => None,
        })
        .collect();
    let successors: HashMap<NodeId, Vec<NodeId>> = targets
        .iter()
        .map(|(id, target)| {
            let uses = doc
                .descendants(*target)
                .into_iter()
                .filter(|d| targets.contains_key(d))
                .collect();
            (*id, uses)
        })
        .collect();

    let mut cyclic = HashSet::new();
    for start in targets.keys() {
        let mut seen = HashSet::new();
        let mut stack: Vec<NodeId> = successors.get(start).cloned().unwrap_or_default();
        while let Some(next) = stack.pop() {
            if next == *start {
                cyclic.insert(*start);
                break;
            }
            if seen.insert(next) {
                stack.extend(successors.get(&next).into_iter().flatten().copied());
            }
        }
    }
    cyclic
}

/// Outline of a leaf shape in its own user space. `Ok(None)` means the
/// shape is valid but draws nothing.
pub fn shape_outline(node: &Node, lengths: &LengthContext) -> Result<Option<Outline>, SvgError> {
    let fill_rule = node.style.fill_rule.unwrap_or_default();
    let len = |name: &str, axis: Axis| optional_length(node, name, axis, lengths);

    let outline = match &node.kind {
        ElementKind::Path { segments } => {
            if segments.is_empty() {
                return Ok(None);
            }
            Outline::from_segments(segments, fill_rule)
        }
        ElementKind::Rect => {
            let x = len("x", Axis::X)?.unwrap_or(0.0);
            let y = len("y", Axis::Y)?.unwrap_or(0.0);
            let width = len("width", Axis::X)?.unwrap_or(0.0);
            let height = len("height", Axis::Y)?.unwrap_or(0.0);
            if width <= 0.0 || height <= 0.0 {
                return Ok(None);
            }
            let rx = len("rx", Axis::X)?.filter(|v| *v >= 0.0);
            let ry = len("ry", Axis::Y)?.filter(|v| *v >= 0.0);
            let (rx, ry) = match (rx, ry) {
                (Some(rx), Some(ry)) => (rx, ry),
                (Some(r), None) | (None, Some(r)) => (r, r),
                (None, None) => (0.0, 0.0),
            };
            Outline::rounded_rect(
                Rect::new(x, y, width, height),
                rx.min(width / 2.0),
                ry.min(height / 2.0),
            )
            .with_fill_rule(fill_rule)
        }
        ElementKind::Circle => {
            let r = len("r", Axis::Diagonal)?.unwrap_or(0.0);
            if r <= 0.0 {
                return Ok(None);
            }
            let center = Point::new(
                len("cx", Axis::X)?.unwrap_or(0.0),
                len("cy", Axis::Y)?.unwrap_or(0.0),
            );
            Outline::ellipse(center, r, r).with_fill_rule(fill_rule)
        }
        ElementKind::Ellipse => {
            let rx = len("rx", Axis::X)?.unwrap_or(0.0);
            let ry = len("ry", Axis::Y)?.unwrap_or(0.0);
            if rx <= 0.0 || ry <= 0.0 {
                return Ok(None);
            }
            let center = Point::new(
                len("cx", Axis::X)?.unwrap_or(0.0),
                len("cy", Axis::Y)?.unwrap_or(0.0),
            );
            Outline::ellipse(center, rx, ry).with_fill_rule(fill_rule)
        }
        ElementKind::Line => Outline::line(
            Point::new(
                len("x1", Axis::X)?.unwrap_or(0.0),
                len("y1", Axis::Y)?.unwrap_or(0.0),
            ),
            Point::new(
                len("x2", Axis::X)?.unwrap_or(0.0),
                len("y2", Axis::Y)?.unwrap_or(0.0),
            ),
        ),
        ElementKind::Polyline | ElementKind::Polygon => {
            let numbers = parse_number_list(node.attribute("points").unwrap_or(""));
            let points: Vec<Point> = numbers
                .chunks_exact(2)
                .map(|pair| Point::new(pair[0], pair[1]))
                .collect();
            if points.len() < 2 {
                return Ok(None);
            }
            let closed = matches!(node.kind, ElementKind::Polygon);
            Outline::polyline(&points, closed, fill_rule)
        }
        _ => return Ok(None),
    };
    Ok(Some(outline))
}

fn optional_length(
    node: &Node,
    name: &str,
    axis: Axis,
    lengths: &LengthContext,
) -> Result<Option<f32>, SvgError> {
    let Some(raw) = node.attribute(name) else {
        return Ok(None);
    };
    let length: Length = raw.trim().parse()?;
    Ok(Some(length.to_pixels(axis, lengths.reference)?))
}

fn root_viewport(root: &Node) -> Size {
    let dimension = |name: &str, axis: Axis, fallback: f32| {
        root.attribute(name)
            .and_then(|raw| raw.trim().parse::<Length>().ok())
            .and_then(|l| l.to_pixels(axis, DEFAULT_VIEWPORT).ok())
            .filter(|v| *v > 0.0)
            .unwrap_or(fallback)
    };
    Size::new(
        dimension("width", Axis::X, DEFAULT_VIEWPORT.width),
        dimension("height", Axis::Y, DEFAULT_VIEWPORT.height),
    )
}

fn parse_viewbox(view_box: Option<&str>) -> Option<Rect> {
    let values = parse_number_list(view_box?);
    let [min_x, min_y, w, h] = values.as_slice() else {
        return None;
    };
    if *w <= 0.0 || *h <= 0.0 {
        return None;
    }
    Some(Rect::new(*min_x, *min_y, *w, *h))
}

/// Uniform "meet" scale, centred in the viewport.
fn viewbox_to_viewport_matrix(view_box: Option<Rect>, w: f32, h: f32) -> Matrix {
    let Some(vb) = view_box else {
        return Matrix::identity();
    };
    let s = (w / vb.width).min(h / vb.height);
    let tx = (w - vb.width * s) * 0.5 - vb.x * s;
    let ty = (h - vb.height * s) * 0.5 - vb.y * s;
    Matrix::translate(tx, ty).mul(Matrix::scale(s, s))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Resource;
    use crate::recording::{DrawCall, RecordingBackend};

    fn parse(svg: &str) -> Document {
        Document::parse(svg).unwrap()
    }

    fn render(doc: &Document) -> (RecordingBackend, RenderSummary) {
        let mut backend = RecordingBackend::new();
        let summary = {
            let mut renderer = Renderer::new(&mut backend);
            renderer.render(doc).unwrap()
        };
        (backend, summary)
    }

    #[test]
    fn fills_and_strokes_basic_shapes() {
        let doc = parse(
            r##"<svg xmlns="http://www.w3.org/2000/svg" width="100" height="100">
                <rect width="10" height="10"/>
                <circle cx="5" cy="5" r="2" fill="none" stroke="red"/>
                <line x2="10" y2="10" stroke="blue"/>
                <polygon points="0,0 5,0 5,5"/>
                <path d="M0 0 L5 5"/>
            </svg>"##,
        );
        let (backend, summary) = render(&doc);
        assert!(summary.is_clean());
        assert_eq!(summary.elements_drawn, 5);
        // rect, polygon and path fill; circle and line stroke only.
        assert_eq!(backend.fill_count(), 3);
        assert_eq!(backend.stroke_count(), 2);
    }

    #[test]
    fn display_none_suppresses_subtree() {
        let doc = parse(
            r##"<svg xmlns="http://www.w3.org/2000/svg">
                <g style="display:none">
                    <rect width="10" height="10" fill="red" stroke="blue"/>
                    <g><circle r="4"/></g>
                </g>
            </svg>"##,
        );
        let (backend, summary) = render(&doc);
        assert!(backend.calls().is_empty());
        assert!(backend.created().is_empty());
        assert_eq!(summary.elements_drawn, 0);
    }

    #[test]
    fn hidden_leaf_skips_but_visible_child_draws() {
        let doc = parse(
            r##"<svg xmlns="http://www.w3.org/2000/svg">
                <g visibility="hidden">
                    <rect width="10" height="10"/>
                    <rect width="10" height="10" visibility="visible"/>
                </g>
            </svg>"##,
        );
        let (backend, _) = render(&doc);
        assert_eq!(backend.fill_count(), 1);
    }

    #[test]
    fn use_cycle_fails_without_recursing_forever() {
        let doc = parse(
            r##"<svg xmlns="http://www.w3.org/2000/svg">
                <rect width="1" height="1"/>
                <g id="a"><use href="#b"/></g>
                <g id="b"><use href="#c"/></g>
                <g id="c"><use id="back" href="#a"/></g>
            </svg>"##,
        );
        let (backend, summary) = render(&doc);
        assert!(
            summary
                .failures
                .iter()
                .any(|f| matches!(f.error, SvgError::CyclicReference(_)))
        );
        // The sibling rect still draws.
        assert_eq!(backend.fill_count(), 1);
    }

    #[test]
    fn self_referencing_group_fails_once_per_use() {
        let mut uses = String::new();
        for _ in 0..12 {
            uses.push_str(r##"<use href="#a"/>"##);
        }
        let svg = format!(
            r##"<svg xmlns="http://www.w3.org/2000/svg">
                <g id="a"><rect width="1" height="1"/>{uses}</g>
            </svg>"##
        );
        let (backend, summary) = render(&parse(&svg));
        assert_eq!(summary.failures.len(), 12);
        assert!(
            summary
                .failures
                .iter()
                .all(|f| f.tag == "use" && matches!(f.error, SvgError::CyclicReference(_)))
        );
        assert_eq!(backend.fill_count(), 1);
    }

    #[test]
    fn use_of_a_cyclic_group_is_cut_at_the_cycle() {
        let doc = parse(
            r##"<svg xmlns="http://www.w3.org/2000/svg">
                <defs>
                    <g id="a"><use href="#b"/><use href="#b"/><use href="#b"/></g>
                    <g id="b"><use href="#a"/><use href="#a"/><use href="#a"/></g>
                </defs>
                <use id="entry" href="#a"/>
            </svg>"##,
        );
        let (_, summary) = render(&doc);
        // `entry` is not on the cycle; its three children are.
        assert_eq!(summary.failures.len(), 3);
        assert!(summary.failures.iter().all(|f| f.element_id.is_none()));
    }

    #[test]
    fn use_depth_is_bounded() {
        let doc = parse(
            r##"<svg xmlns="http://www.w3.org/2000/svg">
                <g id="l1"><rect width="1" height="1"/></g>
                <g id="l2"><use href="#l1"/></g>
                <g id="l3"><use href="#l2"/></g>
                <use id="top" href="#l3"/>
            </svg>"##,
        );
        let mut backend = RecordingBackend::new();
        let summary = RendererBuilder::new()
            .max_use_depth(2)
            .build(&mut backend)
            .render(&doc)
            .unwrap();
        assert!(
            summary
                .failures
                .iter()
                .any(|f| matches!(f.error, SvgError::CyclicReference(_)))
        );
    }

    #[test]
    fn use_applies_offset_and_transform() {
        let doc = parse(
            r##"<svg xmlns="http://www.w3.org/2000/svg">
                <defs><rect id="r" width="1" height="1"/></defs>
                <use href="#r" x="10" y="20" transform="scale(2)"/>
            </svg>"##,
        );
        let (backend, _) = render(&doc);
        let [DrawCall::Fill { transform, .. }] = backend.calls() else {
            panic!("expected one fill, got {:?}", backend.calls());
        };
        assert_eq!(transform.apply(0.0, 0.0), (20.0, 40.0));
    }

    #[test]
    fn path_geometry_is_cached_across_renders() {
        let doc = parse(
            r##"<svg xmlns="http://www.w3.org/2000/svg">
                <path id="p" d="M0 0 L10 0 L10 10 Z"/>
                <use href="#p"/>
            </svg>"##,
        );
        let mut backend = RecordingBackend::new();
        {
            let mut renderer = Renderer::new(&mut backend);
            renderer.render(&doc).unwrap();
            renderer.render(&doc).unwrap();
            let p = doc.get_element_by_id("p").unwrap();
            let first = renderer.element_geometry(&doc, p).unwrap();
            let second = renderer.element_geometry(&doc, p).unwrap();
            assert_eq!(first, second);
        }
        let geometries = backend
            .created()
            .iter()
            .filter(|r| matches!(r, Resource::Geometry(_)))
            .count();
        assert_eq!(geometries, 1);
        assert_eq!(backend.fill_count(), 4);
    }

    #[test]
    fn same_gradient_resolves_to_identical_handle() {
        let doc = parse(
            r##"<svg xmlns="http://www.w3.org/2000/svg">
                <linearGradient id="g" gradientUnits="userSpaceOnUse">
                    <stop offset="0" stop-color="red"/><stop offset="1" stop-color="blue"/>
                </linearGradient>
                <rect width="10" height="10" fill="url(#g)"/>
                <rect x="20" width="30" height="10" fill="url(#g)" stroke="url(#g)"/>
            </svg>"##,
        );
        let mut backend = RecordingBackend::new();
        {
            let mut renderer = Renderer::new(&mut backend);
            renderer.render(&doc).unwrap();
            let g = doc.get_element_by_id("g").unwrap();
            let a = renderer.gradient_brush(&doc, g, Rect::new(0.0, 0.0, 1.0, 1.0)).unwrap();
            let b = renderer.gradient_brush(&doc, g, Rect::new(5.0, 5.0, 9.0, 9.0)).unwrap();
            assert!(a.is_some());
            assert_eq!(a, b);
        }
        assert_eq!(backend.gradient_brushes_created(), 1);
        let brushes: Vec<_> = backend
            .calls()
            .iter()
            .filter_map(|c| match c {
                DrawCall::Fill { brush, .. } | DrawCall::Stroke { brush, .. } => Some(*brush),
                _ => None,
            })
            .collect();
        assert_eq!(brushes.len(), 3);
        assert!(brushes.iter().all(|b| *b == brushes[0]));
    }

    #[test]
    fn bounding_box_gradient_is_cached_per_box() {
        let doc = parse(
            r##"<svg xmlns="http://www.w3.org/2000/svg">
                <linearGradient id="g"><stop offset="0"/></linearGradient>
                <rect width="10" height="10" fill="url(#g)"/>
                <rect width="10" height="10" fill="url(#g)"/>
                <rect width="30" height="10" fill="url(#g)"/>
            </svg>"##,
        );
        let (backend, summary) = render(&doc);
        assert!(summary.is_clean());
        assert_eq!(backend.gradient_brushes_created(), 2);
    }

    #[test]
    fn unknown_paint_reference_skips_only_that_element() {
        let doc = parse(
            r##"<svg xmlns="http://www.w3.org/2000/svg">
                <rect id="bad" width="10" height="10" fill="url(#other)"/>
                <rect id="other" width="10" height="10"/>
            </svg>"##,
        );
        let (backend, summary) = render(&doc);
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].element_id.as_deref(), Some("bad"));
        assert!(matches!(
            summary.failures[0].error,
            SvgError::UnknownPaintReference(_)
        ));
        assert_eq!(backend.fill_count(), 1);
    }

    #[test]
    fn clip_path_intersects_with_path_or_rect() {
        let doc = parse(
            r##"<svg xmlns="http://www.w3.org/2000/svg">
                <clipPath id="c1"><rect width="5" height="5"/></clipPath>
                <clipPath id="c2"><use href="#shape"/></clipPath>
                <path id="shape" d="M0 0 H4 V4 Z"/>
                <rect width="10" height="10" clip-path="url(#c1)"/>
                <rect width="10" height="10" clip-path="url(#c2)"/>
            </svg>"##,
        );
        let mut backend = RecordingBackend::new();
        let mut renderer = Renderer::new(&mut backend);
        let summary = renderer.render(&doc).unwrap();
        assert!(summary.is_clean());
        let recorded = renderer.backend();
        assert_eq!(recorded.fill_count(), 3);
        let widths: Vec<f32> = recorded
            .calls()
            .iter()
            .filter_map(|c| match c {
                DrawCall::Fill { geometry, .. } => recorded.geometry_bounds(*geometry),
                _ => None,
            })
            .map(|b| b.width)
            .collect();
        assert_eq!(widths, vec![4.0, 5.0, 4.0]);
    }

    #[test]
    fn unsupported_clip_paths_fail_the_element() {
        let doc = parse(
            r##"<svg xmlns="http://www.w3.org/2000/svg">
                <clipPath id="circle"><circle r="3"/></clipPath>
                <rect id="a" width="10" height="10" clip-path="url(#circle)"/>
                <rect id="b" width="10" height="10" clip-path="url(other.svg#c)"/>
                <rect id="c" width="10" height="10"/>
            </svg>"##,
        );
        let (backend, summary) = render(&doc);
        let failed: Vec<_> = summary
            .failures
            .iter()
            .map(|f| {
                assert!(matches!(f.error, SvgError::UnsupportedClipPath(_)));
                f.element_id.clone().unwrap_or_default()
            })
            .collect();
        assert_eq!(failed, vec!["a", "b"]);
        assert_eq!(backend.fill_count(), 1);
    }

    #[test]
    fn malformed_geometry_fails_the_element() {
        let doc = parse(
            r##"<svg xmlns="http://www.w3.org/2000/svg">
                <rect id="a" width="1em" height="10"/>
                <rect id="b" width="ten" height="10"/>
                <rect width="10" height="10"/>
            </svg>"##,
        );
        let (backend, summary) = render(&doc);
        assert!(matches!(summary.failures[0].error, SvgError::UnsupportedUnit(_)));
        assert!(matches!(summary.failures[1].error, SvgError::MalformedLength(_)));
        assert_eq!(backend.fill_count(), 1);
    }

    #[test]
    fn element_opacity_wraps_fill_and_stroke_in_one_layer() {
        let doc = parse(
            r##"<svg xmlns="http://www.w3.org/2000/svg">
                <rect width="10" height="10" fill="red" stroke="blue" opacity="0.5"/>
            </svg>"##,
        );
        let (backend, _) = render(&doc);
        let kinds: Vec<&str> = backend
            .calls()
            .iter()
            .map(|c| match c {
                DrawCall::BeginLayer { .. } => "begin",
                DrawCall::Fill { .. } => "fill",
                DrawCall::Stroke { .. } => "stroke",
                DrawCall::EndLayer => "end",
            })
            .collect();
        assert_eq!(kinds, vec!["begin", "fill", "stroke", "end"]);
        assert_eq!(backend.calls()[0], DrawCall::BeginLayer { opacity: 0.5 });
    }

    #[test]
    fn dash_pattern_reaches_backend_normalized() {
        let doc = parse(
            r##"<svg xmlns="http://www.w3.org/2000/svg">
                <line x2="100" stroke="black" stroke-width="2" stroke-dasharray="4 2 1"/>
            </svg>"##,
        );
        let (backend, _) = render(&doc);
        let [DrawCall::Stroke { width, style, .. }] = backend.calls() else {
            panic!("expected one stroke");
        };
        assert_eq!(*width, 2.0);
        assert_eq!(
            style.dash_pattern,
            Some(vec![2.0, 1.0, 0.5, 2.0, 1.0, 0.5])
        );
    }

    #[test]
    fn dispose_releases_each_resource_once() {
        let doc = parse(
            r##"<svg xmlns="http://www.w3.org/2000/svg">
                <linearGradient id="g"><stop offset="0"/></linearGradient>
                <path d="M0 0 L1 1" stroke="red"/>
                <rect width="3" height="3" fill="url(#g)"/>
            </svg>"##,
        );
        let mut backend = RecordingBackend::new();
        {
            let mut renderer = Renderer::new(&mut backend);
            renderer.render(&doc).unwrap();
            renderer.dispose();
            renderer.dispose();
            assert!(matches!(
                renderer.render(&doc),
                Err(SvgError::Backend(_))
            ));
        }
        assert!(backend.double_disposals().is_empty());
        assert_eq!(backend.live_resources(), 0);
        assert_eq!(backend.disposed().len(), backend.created().len());
    }

    #[test]
    fn drop_disposes_cached_resources() {
        let doc = parse(
            r##"<svg xmlns="http://www.w3.org/2000/svg"><circle r="3"/></svg>"##,
        );
        let (backend, _) = render(&doc);
        assert_eq!(backend.live_resources(), 0);
        assert!(backend.double_disposals().is_empty());
    }

    #[test]
    fn viewport_and_view_box() {
        let doc = parse(
            r##"<svg xmlns="http://www.w3.org/2000/svg" width="200" height="100" viewBox="0 0 20 20">
                <rect width="50%" height="10"/>
            </svg>"##,
        );
        let mut backend = RecordingBackend::new();
        let mut renderer = Renderer::new(&mut backend);
        renderer.render(&doc).unwrap();
        // Percentages resolve against the viewBox.
        assert_eq!(renderer.length_context().reference, Size::new(20.0, 20.0));
        drop(renderer);
        let [DrawCall::Fill { transform, .. }] = backend.calls() else {
            panic!("expected one fill");
        };
        // Meet scale 5, centred horizontally: (200 - 100) / 2.
        assert_eq!(transform.apply(0.0, 0.0), (50.0, 0.0));
        assert_eq!(transform.apply(20.0, 20.0), (150.0, 100.0));
    }

    #[test]
    fn rect_radius_rules() {
        let lengths = LengthContext::new(Size::new(100.0, 100.0));
        let node = Node::new(ElementKind::Rect)
            .with_attribute("width", "10")
            .with_attribute("height", "4")
            .with_attribute("rx", "3");
        let outline = shape_outline(&node, &lengths).unwrap().unwrap();
        let crate::geometry::OutlineSegment::Arc(arc) = outline.figures[0].segments[1] else {
            panic!("expected rounded corner");
        };
        // ry copies rx and is clamped to half the height.
        assert_eq!((arc.radius_x, arc.radius_y), (3.0, 2.0));
    }
}
