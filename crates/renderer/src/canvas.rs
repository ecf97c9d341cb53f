use crate::compile::ShaderProgram;
use crate::error::SketchError;
use crate::gpu::UniformValue;
use crate::types::CanvasMode;
use crate::viewport::{CanvasStyle, Viewport};

/// Axis-aligned rectangle in canvas pixels, origin at the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle spanning the whole canvas.
    pub fn covering(viewport: Viewport) -> Self {
        Self::new(0.0, 0.0, viewport.width as f32, viewport.height as f32)
    }
}

/// Drawing surface the host hands to a [`Sketch`](crate::Sketch).
///
/// The host owns the concrete implementation (a window-backed wgpu canvas in
/// production); sketches only see these primitives. Calls happen on the event
/// loop thread, never concurrently.
pub trait Canvas {
    /// Backing pixels per viewport pixel. Sketches that size the canvas in
    /// device pixels themselves set this to 1.
    fn set_pixel_density(&mut self, density: f32);

    /// Creates the drawing surface, acquiring the graphics context on first
    /// use. Context failures are returned, never swallowed.
    fn create(&mut self, viewport: Viewport, mode: CanvasMode) -> Result<(), SketchError>;

    /// Resizes the surface. Resizing to the current size is a no-op.
    fn resize(&mut self, viewport: Viewport);

    fn apply_style(&mut self, style: CanvasStyle);

    /// Current canvas size, or `None` before [`Canvas::create`].
    fn viewport(&self) -> Option<Viewport>;

    /// Makes `program` the active shader for subsequent uniforms and draws.
    fn bind_program(&mut self, program: &ShaderProgram) -> Result<(), SketchError>;

    /// Assigns a uniform on the bound program. Names the program never
    /// declared are ignored.
    fn set_uniform(&mut self, name: &str, value: UniformValue) -> Result<(), SketchError>;

    /// Submits a rectangle rasterized with the bound program.
    fn rect(&mut self, rect: Rect) -> Result<(), SketchError>;
}
