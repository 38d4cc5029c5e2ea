//! The drawing capability the renderer issues calls against.

use crate::error::SvgError;
use crate::geometry::Outline;
use crate::gradient::GradientDescriptor;
use crate::paint::ResolvedStrokeStyle;
use crate::types::{Color, Matrix, Rect};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GeometryHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BrushHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Geometry(GeometryHandle),
    Brush(BrushHandle),
}

#[derive(Debug, Clone, PartialEq)]
pub enum BrushDescriptor {
    Solid { color: Color, alpha: f32 },
    Gradient(GradientDescriptor),
}

/// Device-side resource creation and drawing.
///
/// Handles stay valid until passed to [`DrawingBackend::dispose`]. Dash
/// values inside a [`ResolvedStrokeStyle`] are already divided by the
/// stroke width; implementations scale them back if their native dash
/// unit is pixels.
pub trait DrawingBackend {
    fn create_geometry(&mut self, outline: &Outline) -> Result<GeometryHandle, SvgError>;

    /// New geometry covering the intersection of `geometry` and `clip`.
    /// Both inputs stay alive.
    fn intersect_clip(
        &mut self,
        geometry: GeometryHandle,
        clip: GeometryHandle,
    ) -> Result<GeometryHandle, SvgError>;

    /// Untransformed bounds, or `None` for empty geometry.
    fn geometry_bounds(&self, geometry: GeometryHandle) -> Option<Rect>;

    fn create_brush(&mut self, descriptor: &BrushDescriptor) -> Result<BrushHandle, SvgError>;

    fn fill(
        &mut self,
        geometry: GeometryHandle,
        brush: BrushHandle,
        transform: Matrix,
    ) -> Result<(), SvgError>;

    fn stroke(
        &mut self,
        geometry: GeometryHandle,
        brush: BrushHandle,
        width: f32,
        style: &ResolvedStrokeStyle,
        transform: Matrix,
    ) -> Result<(), SvgError>;

    /// Starts an offscreen group composited with `opacity` at the
    /// matching [`DrawingBackend::end_layer`].
    fn begin_layer(&mut self, opacity: f32) -> Result<(), SvgError>;

    fn end_layer(&mut self) -> Result<(), SvgError>;

    fn dispose(&mut self, resource: Resource);
}
