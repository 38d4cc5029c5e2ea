mod backend;
mod dasharray;
mod document;
mod error;
mod geometry;
mod gradient;
mod length;
mod loader;
mod paint;
mod path_data;
mod raster;
mod recording;
mod render;
mod style;
mod types;

pub use backend::{BrushDescriptor, BrushHandle, DrawingBackend, GeometryHandle, Resource};
pub use dasharray::{DashArray, parse_dash_array};
pub use document::{Document, ElementKind, Node, NodeId};
pub use error::SvgError;
pub use geometry::{
    ArcSize, ArcTo, Figure, FillRule, Outline, OutlineBuilder, OutlineSegment, SweepDirection,
    reflect,
};
pub use gradient::{
    GradientDescriptor, GradientGeometry, GradientStop, GradientUnits, SpreadMode,
    gradient_units, resolve_gradient,
};
pub use length::{Axis, Length, LengthContext, LengthUnit};
pub use paint::{
    CapStyle, LineJoin, ResolvedPaint, ResolvedStroke, ResolvedStrokeStyle, resolve_fill,
    resolve_paint, resolve_stroke, resolve_stroke_style,
};
pub use path_data::{ArcArgs, PathSegment, parse_path_data};
pub use raster::TinySkiaBackend;
pub use recording::{DrawCall, RecordingBackend};
pub use render::{
    ElementFailure, RenderSummary, Renderer, RendererBuilder, shape_outline,
};
pub use style::{
    Display, PRESENTATION_ATTRIBUTES, Paint, StrokeLinecap, StrokeLinejoin, StyleSnapshot,
    Visibility, parse_color, parse_paint, parse_url_ref,
};
pub use types::{Color, Matrix, Point, Rect, Size, parse_transform};

/// Parses `svg` and renders it onto a fresh `width` x `height` raster.
/// Elements that fail to resolve are logged and skipped.
pub fn rasterize(svg: &str, width: u32, height: u32) -> Result<TinySkiaBackend, SvgError> {
    let doc = Document::parse(svg)?;
    let mut backend = TinySkiaBackend::new(width, height)?;
    {
        let mut renderer = RendererBuilder::new()
            .viewport(width as f32, height as f32)
            .build(&mut backend);
        renderer.render(&doc)?;
    }
    Ok(backend)
}
