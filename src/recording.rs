use std::collections::HashMap;

use crate::backend::{BrushDescriptor, BrushHandle, DrawingBackend, GeometryHandle, Resource};
use crate::error::SvgError;
use crate::geometry::Outline;
use crate::paint::ResolvedStrokeStyle;
use crate::types::{Matrix, Rect};

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCall {
    Fill {
        geometry: GeometryHandle,
        brush: BrushHandle,
        transform: Matrix,
    },
    Stroke {
        geometry: GeometryHandle,
        brush: BrushHandle,
        width: f32,
        style: ResolvedStrokeStyle,
        transform: Matrix,
    },
    BeginLayer {
        opacity: f32,
    },
    EndLayer,
}

#[derive(Debug, Default)]
pub struct RecordingBackend {
    next_handle: u64,
    calls: Vec<DrawCall>,
    geometries: HashMap<GeometryHandle, Option<Rect>>,
    brushes: HashMap<BrushHandle, BrushDescriptor>,
    created: Vec<Resource>,
    disposed: Vec<Resource>,
    double_disposals: Vec<Resource>,
    gradient_brushes_created: usize,
    layer_depth: usize,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> &[DrawCall] {
        &self.calls
    }

    pub fn fill_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, DrawCall::Fill { .. }))
            .count()
    }

    pub fn stroke_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, DrawCall::Stroke { .. }))
            .count()
    }

    /// Every handle ever created, in creation order.
    pub fn created(&self) -> &[Resource] {
        &self.created
    }

    pub fn disposed(&self) -> &[Resource] {
        &self.disposed
    }

    /// Handles passed to `dispose` after they were already released, or
    /// that were never created.
    pub fn double_disposals(&self) -> &[Resource] {
        &self.double_disposals
    }

    pub fn live_resources(&self) -> usize {
        self.geometries.len() + self.brushes.len()
    }

    pub fn brush(&self, handle: BrushHandle) -> Option<&BrushDescriptor> {
        self.brushes.get(&handle)
    }

    pub fn gradient_brushes_created(&self) -> usize {
        self.gradient_brushes_created
    }

    fn next(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }

    fn check_geometry(&self, geometry: GeometryHandle) -> Result<(), SvgError> {
        if self.geometries.contains_key(&geometry) {
            Ok(())
        } else {
            Err(SvgError::Backend(format!(
                "geometry {} is not live",
                geometry.0
            )))
        }
    }

    fn check_brush(&self, brush: BrushHandle) -> Result<(), SvgError> {
        if self.brushes.contains_key(&brush) {
            Ok(())
        } else {
            Err(SvgError::Backend(format!("brush {} is not live", brush.0)))
        }
    }
}

impl DrawingBackend for RecordingBackend {
    fn create_geometry(&mut self, outline: &Outline) -> Result<GeometryHandle, SvgError> {
        let handle = GeometryHandle(self.next());
        self.geometries.insert(handle, outline.bounds());
        self.created.push(Resource::Geometry(handle));
        Ok(handle)
    }

    fn intersect_clip(
        &mut self,
        geometry: GeometryHandle,
        clip: GeometryHandle,
    ) -> Result<GeometryHandle, SvgError> {
        self.check_geometry(geometry)?;
        self.check_geometry(clip)?;
        let bounds = match (self.geometry_bounds(geometry), self.geometry_bounds(clip)) {
            (Some(a), Some(b)) => a.intersect(&b),
            _ => None,
        };
        let handle = GeometryHandle(self.next());
        self.geometries.insert(handle, bounds);
        self.created.push(Resource::Geometry(handle));
        Ok(handle)
    }

    fn geometry_bounds(&self, geometry: GeometryHandle) -> Option<Rect> {
        self.geometries.get(&geometry).copied().flatten()
    }

    fn create_brush(&mut self, descriptor: &BrushDescriptor) -> Result<BrushHandle, SvgError> {
        let handle = BrushHandle(self.next());
        if matches!(descriptor, BrushDescriptor::Gradient(_)) {
            self.gradient_brushes_created += 1;
        }
        self.brushes.insert(handle, descriptor.clone());
        self.created.push(Resource::Brush(handle));
        Ok(handle)
    }

    fn fill(
        &mut self,
        geometry: GeometryHandle,
        brush: BrushHandle,
        transform: Matrix,
    ) -> Result<(), SvgError> {
        self.check_geometry(geometry)?;
        self.check_brush(brush)?;
        self.calls.push(DrawCall::Fill {
            geometry,
            brush,
            transform,
        });
        Ok(())
    }

    fn stroke(
        &mut self,
        geometry: GeometryHandle,
        brush: BrushHandle,
        width: f32,
        style: &ResolvedStrokeStyle,
        transform: Matrix,
    ) -> Result<(), SvgError> {
        self.check_geometry(geometry)?;
        self.check_brush(brush)?;
        self.calls.push(DrawCall::Stroke {
            geometry,
            brush,
            width,
            style: style.clone(),
            transform,
        });
        Ok(())
    }

    fn begin_layer(&mut self, opacity: f32) -> Result<(), SvgError> {
        self.layer_depth += 1;
        self.calls.push(DrawCall::BeginLayer { opacity });
        Ok(())
    }

    fn end_layer(&mut self) -> Result<(), SvgError> {
        if self.layer_depth == 0 {
            return Err(SvgError::Backend("end_layer without begin_layer".to_string()));
        }
        self.layer_depth -= 1;
        self.calls.push(DrawCall::EndLayer);
        Ok(())
    }

    fn dispose(&mut self, resource: Resource) {
        let released = match resource {
            Resource::Geometry(handle) => self.geometries.remove(&handle).is_some(),
            Resource::Brush(handle) => self.brushes.remove(&handle).is_some(),
        };
        if released {
            self.disposed.push(resource);
        } else {
            self.double_disposals.push(resource);
        }
    }
}
