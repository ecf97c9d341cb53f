//! wgpu side of the canvas.
//!
//! - `context` negotiates the graphics context over the configured tiers and
//!   knows how to reconfigure the swapchain on resize.
//! - `pipeline` turns a translated [`ShaderProgram`](crate::ShaderProgram)
//!   into a render pipeline with depth testing and MSAA.
//! - `uniforms` mirrors the generated std140 block on the CPU and is written
//!   straight through the queue once per frame.
//! - `quad` expands rectangles into the vertex stream the sketch shaders read
//!   through `aPosition` / `aTexCoord`.
//! - `canvas` glues everything into [`GpuCanvas`], the `Canvas` the host
//!   hands to sketches.

mod canvas;
mod context;
mod pipeline;
mod quad;
pub(crate) mod uniforms;

pub use canvas::GpuCanvas;
pub use uniforms::{UniformField, UniformKind, UniformLayout, UniformValue};
