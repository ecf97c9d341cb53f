//! Renderer crate for shadersketch.
//!
//! Runs a WebGL-style shader sketch natively: a vertex/fragment pair is loaded
//! once, and a rectangle covering the window is redrawn every frame with the
//! `resolution` and `time` uniforms. The overall flow is:
//!
//! ```text
//!   CLI / shadersketch
//!          │ SketchConfig
//!          ▼
//!   host::run ──▶ winit event loop ──▶ Sketch::on_frame ──▶ GpuCanvas
//!          │                                                   │
//!          └─▶ Sketch::on_preload ──▶ ShaderProgram            └─▶ wgpu pass
//! ```
//!
//! Sketch shaders are written in the WebGL GLSL dialects. [`compile`]
//! rewrites them to Vulkan GLSL, gathering loose uniforms into one block, and
//! validates the result with naga before any window exists. The
//! [`Canvas`] trait is the seam between the sketch lifecycle and the GPU, so
//! sketches can be exercised against a recording canvas in tests.

pub mod canvas;
pub mod clock;
pub mod compile;
pub mod error;
pub mod gpu;
pub mod host;
pub mod sketch;
pub mod types;
pub mod viewport;

pub use canvas::{Canvas, Rect};
pub use clock::{FrameClock, FrameTime};
pub use compile::{ProgramId, ShaderProgram, StageSource};
pub use error::{ContextAttempt, ContextError, ShaderStage, SketchError};
pub use gpu::{GpuCanvas, UniformField, UniformKind, UniformLayout, UniformValue};
pub use host::run;
pub use sketch::{AssetLoader, ShaderSketch, Sketch};
pub use types::{
    Antialiasing, BackendPreference, CanvasMode, ContextTier, GpuPowerPreference, SketchConfig,
};
pub use viewport::{CanvasStyle, Fit, Placement, Viewport, WindowMetrics};
