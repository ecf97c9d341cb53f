use std::sync::Arc;

use winit::dpi::PhysicalSize;
use winit::window::Window;

use crate::canvas::{Canvas, Rect};
use crate::compile::ShaderProgram;
use crate::error::SketchError;
use crate::types::{Antialiasing, CanvasMode, ContextTier, GpuPowerPreference, SketchConfig};
use crate::viewport::{CanvasStyle, Viewport};

use super::context::{self, GpuContext, DEPTH_CLEAR, DEPTH_FORMAT};
use super::pipeline::ShaderPipeline;
use super::quad::{rect_vertices, QuadVertex, VERTICES_PER_RECT};
use super::UniformValue;

/// Window-backed [`Canvas`] rendering through wgpu.
///
/// The graphics context is acquired lazily by [`Canvas::create`]. Draw calls
/// made between [`GpuCanvas::begin_frame`] and [`GpuCanvas::end_frame`] are
/// recorded and submitted in one render pass; uniforms are uploaded once at
/// the end of the frame, so the last value assigned wins.
pub struct GpuCanvas {
    window: Arc<Window>,
    tiers: &'static [ContextTier],
    power: GpuPowerPreference,
    antialiasing: Antialiasing,
    density: f32,
    style: CanvasStyle,
    mode: CanvasMode,
    size: Option<Viewport>,
    gpu: Option<GpuContext>,
    targets: Option<FrameTargets>,
    pipeline: Option<ShaderPipeline>,
    vertices: Vec<QuadVertex>,
    vertex_buffer: Option<wgpu::Buffer>,
}

impl GpuCanvas {
    pub fn new(window: Arc<Window>, config: &SketchConfig) -> Self {
        Self {
            window,
            tiers: config.backend.tiers(),
            power: config.power,
            antialiasing: config.antialiasing,
            density: 1.0,
            style: CanvasStyle::default(),
            mode: CanvasMode::Webgl,
            size: None,
            gpu: None,
            targets: None,
            pipeline: None,
            vertices: Vec::new(),
            vertex_buffer: None,
        }
    }

    pub fn style(&self) -> CanvasStyle {
        self.style
    }

    /// Tier the graphics context was created with, once negotiated.
    pub fn tier(&self) -> Option<ContextTier> {
        self.gpu.as_ref().map(|gpu| gpu.tier)
    }

    /// Follows the window's physical size. The canvas size itself only
    /// changes through [`Canvas::resize`].
    pub fn surface_resized(&mut self, size: PhysicalSize<u32>) {
        let Some(gpu) = self.gpu.as_mut() else {
            return;
        };
        if size == gpu.size || size.width == 0 || size.height == 0 {
            return;
        }
        gpu.resize(size);
        self.targets = Some(FrameTargets::new(gpu, self.mode));
        tracing::debug!(width = size.width, height = size.height, "surface resized");
    }

    /// Reconfigures the swapchain after a lost or outdated surface.
    pub fn reconfigure(&mut self) {
        if let Some(gpu) = self.gpu.as_mut() {
            gpu.reconfigure();
        }
    }

    /// Starts recording a frame, discarding anything left from a failed one.
    pub fn begin_frame(&mut self) {
        self.vertices.clear();
    }

    /// Uploads uniforms and recorded rects, renders them and presents.
    pub fn end_frame(&mut self) -> Result<(), SketchError> {
        let (Some(gpu), Some(targets), Some(size)) =
            (self.gpu.as_ref(), self.targets.as_ref(), self.size)
        else {
            return Err(SketchError::CanvasMissing);
        };

        let surface = Viewport::new(gpu.config.width, gpu.config.height);
        let placement = self.style.placement(size, surface);

        if let Some(pipeline) = self.pipeline.as_mut() {
            pipeline.uniforms.set_presentation(
                [placement.x, placement.y, placement.width, placement.height],
                size.resolution(),
            );
            pipeline.upload_uniforms(&gpu.queue);
        }

        let vertex_bytes: &[u8] = bytemuck::cast_slice(&self.vertices);
        if !vertex_bytes.is_empty() {
            let needs_buffer = self
                .vertex_buffer
                .as_ref()
                .map_or(true, |buffer| buffer.size() < vertex_bytes.len() as u64);
            if needs_buffer {
                self.vertex_buffer = Some(gpu.device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some("rect vertices"),
                    size: (vertex_bytes.len() as u64).next_power_of_two(),
                    usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                }));
            }
            if let Some(buffer) = self.vertex_buffer.as_ref() {
                gpu.queue.write_buffer(buffer, 0, vertex_bytes);
            }
        }

        let frame = gpu.surface.get_current_texture()?;
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("sketch encoder"),
            });

        {
            let (attachment_view, resolve_target) = match targets.multisample.as_ref() {
                Some(msaa) => (msaa, Some(&view)),
                None => (&view, None),
            };
            let depth_stencil_attachment =
                targets
                    .depth
                    .as_ref()
                    .map(|depth| wgpu::RenderPassDepthStencilAttachment {
                        view: depth,
                        depth_ops: Some(wgpu::Operations {
                            load: wgpu::LoadOp::Clear(DEPTH_CLEAR),
                            store: wgpu::StoreOp::Store,
                        }),
                        stencil_ops: None,
                    });

            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("sketch pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: attachment_view,
                    depth_slice: None,
                    resolve_target,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment,
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            if let (Some(pipeline), Some(buffer)) = (self.pipeline.as_ref(), self.vertex_buffer.as_ref()) {
                if !vertex_bytes.is_empty() && placement.width > 0.0 && placement.height > 0.0 {
                    pass.set_viewport(
                        placement.x,
                        placement.y,
                        placement.width,
                        placement.height,
                        0.0,
                        1.0,
                    );
                    pass.set_pipeline(&pipeline.pipeline);
                    pass.set_bind_group(0, &pipeline.uniform_bind_group, &[]);
                    pass.set_vertex_buffer(0, buffer.slice(..vertex_bytes.len() as u64));
                    pass.draw(0..self.vertices.len() as u32, 0..1);
                }
            }
        }

        gpu.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        tracing::trace!(
            rects = self.vertices.len() / VERTICES_PER_RECT,
            width = surface.width,
            height = surface.height,
            "presented frame"
        );
        self.vertices.clear();
        Ok(())
    }

    fn acquire_context(&mut self) -> Result<(), SketchError> {
        if self.gpu.is_some() {
            return Ok(());
        }
        let window = self.window.clone();
        let size = window.inner_size();
        let (antialiasing, power) = (self.antialiasing, self.power);
        let (tier, gpu) = context::negotiate(self.tiers, |tier| {
            GpuContext::new(window.clone(), tier, size, antialiasing, power)
        })?;
        tracing::info!(
            %tier,
            adapter = %gpu.adapter_profile.name,
            backend = ?gpu.adapter_profile.backend,
            format = ?gpu.surface_format,
            sample_count = gpu.sample_count,
            "graphics context ready"
        );
        self.gpu = Some(gpu);
        Ok(())
    }
}

impl Canvas for GpuCanvas {
    fn set_pixel_density(&mut self, density: f32) {
        self.density = if density.is_finite() && density > 0.0 {
            density
        } else {
            1.0
        };
    }

    fn create(&mut self, viewport: Viewport, mode: CanvasMode) -> Result<(), SketchError> {
        self.acquire_context()?;
        let Some(gpu) = self.gpu.as_ref() else {
            return Err(SketchError::CanvasMissing);
        };
        self.mode = mode;
        self.size = Some(viewport.scaled(self.density));
        self.targets = Some(FrameTargets::new(gpu, mode));
        // A new drawing surface starts without a bound program.
        self.pipeline = None;
        tracing::debug!(
            width = viewport.width,
            height = viewport.height,
            density = self.density,
            ?mode,
            "canvas created"
        );
        Ok(())
    }

    fn resize(&mut self, viewport: Viewport) {
        let scaled = viewport.scaled(self.density);
        if self.size == Some(scaled) {
            return;
        }
        self.size = Some(scaled);
        tracing::debug!(width = scaled.width, height = scaled.height, "canvas resized");
    }

    fn apply_style(&mut self, style: CanvasStyle) {
        if self.style == style {
            return;
        }
        self.style = style;
        tracing::debug!(?style, "canvas style applied");
    }

    fn viewport(&self) -> Option<Viewport> {
        self.size
    }

    fn bind_program(&mut self, program: &ShaderProgram) -> Result<(), SketchError> {
        if self
            .pipeline
            .as_ref()
            .is_some_and(|pipeline| pipeline.program() == program.id())
        {
            return Ok(());
        }
        let Some(gpu) = self.gpu.as_ref() else {
            return Err(SketchError::CanvasMissing);
        };
        if !self.vertices.is_empty() {
            tracing::warn!(
                rects = self.vertices.len() / VERTICES_PER_RECT,
                "switching programs mid-frame; discarding rects recorded with the previous one"
            );
            self.vertices.clear();
        }
        let pipeline = ShaderPipeline::new(
            &gpu.device,
            program,
            gpu.surface_format,
            gpu.sample_count,
            self.mode.uses_depth(),
        )?;
        self.pipeline = Some(pipeline);
        Ok(())
    }

    fn set_uniform(&mut self, name: &str, value: UniformValue) -> Result<(), SketchError> {
        let pipeline = self.pipeline.as_mut().ok_or(SketchError::NoProgramBound)?;
        if !pipeline.uniforms.set(name, value)? {
            tracing::trace!(name, "ignoring uniform the program does not declare");
        }
        Ok(())
    }

    fn rect(&mut self, rect: Rect) -> Result<(), SketchError> {
        if self.pipeline.is_none() {
            return Err(SketchError::NoProgramBound);
        }
        let size = self.size.ok_or(SketchError::CanvasMissing)?;
        self.vertices.extend(rect_vertices(rect, size));
        Ok(())
    }
}

/// Attachments sized to the surface: the optional depth buffer and the
/// multisampled color buffer that resolves into the swapchain image.
struct FrameTargets {
    depth: Option<wgpu::TextureView>,
    multisample: Option<wgpu::TextureView>,
}

impl FrameTargets {
    fn new(gpu: &GpuContext, mode: CanvasMode) -> Self {
        let depth = mode
            .uses_depth()
            .then(|| attachment(gpu, "depth buffer", DEPTH_FORMAT));
        let multisample =
            (gpu.sample_count > 1).then(|| attachment(gpu, "msaa color buffer", gpu.surface_format));
        Self { depth, multisample }
    }
}

fn attachment(gpu: &GpuContext, label: &str, format: wgpu::TextureFormat) -> wgpu::TextureView {
    let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width: gpu.config.width.max(1),
            height: gpu.config.height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: gpu.sample_count,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}
