use std::path::{Path, PathBuf};

use crate::canvas::{Canvas, Rect};
use crate::clock::FrameTime;
use crate::compile::ShaderProgram;
use crate::error::SketchError;
use crate::gpu::UniformValue;
use crate::types::CanvasMode;
use crate::viewport::{CanvasStyle, Viewport, WindowMetrics};

/// Lifecycle hooks driven by the host.
///
/// The host calls `on_preload` once, then `on_setup` once, then `on_frame`
/// for every displayed frame. `on_resize` may arrive at any point after
/// setup.
pub trait Sketch {
    fn on_preload(&mut self, assets: &AssetLoader) -> Result<(), SketchError>;

    fn on_setup(&mut self, canvas: &mut dyn Canvas, window: WindowMetrics)
        -> Result<(), SketchError>;

    fn on_frame(&mut self, canvas: &mut dyn Canvas, frame: FrameTime) -> Result<(), SketchError>;

    fn on_resize(&mut self, canvas: &mut dyn Canvas, window: WindowMetrics);
}

/// Resolves sketch assets relative to the sketch directory.
#[derive(Debug, Clone)]
pub struct AssetLoader {
    root: PathBuf,
}

impl AssetLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    /// Reads, translates and validates a vertex/fragment pair.
    pub fn load_shader(&self, vertex: &Path, fragment: &Path) -> Result<ShaderProgram, SketchError> {
        ShaderProgram::load(&self.resolve(vertex), &self.resolve(fragment))
    }
}

/// The shader canvas runner: one full-surface rectangle per frame, fed
/// `resolution` and `time`.
///
/// Field ownership: `program` is written by preload, `viewport` by setup and
/// resize, `start_seed` by setup. Drawing only reads.
#[derive(Debug)]
pub struct ShaderSketch {
    vertex: PathBuf,
    fragment: PathBuf,
    style: CanvasStyle,
    program: Option<ShaderProgram>,
    viewport: Option<Viewport>,
    start_seed: Option<f64>,
}

impl ShaderSketch {
    pub fn new(vertex: impl Into<PathBuf>, fragment: impl Into<PathBuf>) -> Self {
        Self {
            vertex: vertex.into(),
            fragment: fragment.into(),
            style: CanvasStyle::default(),
            program: None,
            viewport: None,
            start_seed: None,
        }
    }

    pub fn with_style(mut self, style: CanvasStyle) -> Self {
        self.style = style;
        self
    }

    pub fn program(&self) -> Option<&ShaderProgram> {
        self.program.as_ref()
    }

    pub fn viewport(&self) -> Option<Viewport> {
        self.viewport
    }

    /// Random value captured during setup. Nothing consumes it yet.
    pub fn start_seed(&self) -> Option<f64> {
        self.start_seed
    }
}

impl Default for ShaderSketch {
    fn default() -> Self {
        Self::new("vert.glsl", "frag.glsl")
    }
}

impl Sketch for ShaderSketch {
    fn on_preload(&mut self, assets: &AssetLoader) -> Result<(), SketchError> {
        let program = assets.load_shader(&self.vertex, &self.fragment)?;
        self.program = Some(program);
        Ok(())
    }

    fn on_setup(
        &mut self,
        canvas: &mut dyn Canvas,
        window: WindowMetrics,
    ) -> Result<(), SketchError> {
        // The viewport is already in device pixels.
        canvas.set_pixel_density(1.0);
        let viewport = window.viewport();
        canvas.create(viewport, CanvasMode::Webgl)?;
        canvas.apply_style(self.style);
        self.viewport = Some(viewport);

        let seed = rand::random::<f64>();
        self.start_seed = Some(seed);
        tracing::debug!(
            width = viewport.width,
            height = viewport.height,
            device_pixel_ratio = window.device_pixel_ratio,
            seed,
            "sketch setup complete"
        );
        Ok(())
    }

    fn on_frame(&mut self, canvas: &mut dyn Canvas, frame: FrameTime) -> Result<(), SketchError> {
        let program = self.program.as_ref().ok_or(SketchError::NoProgramBound)?;
        let viewport = self.viewport.ok_or(SketchError::CanvasMissing)?;

        canvas.bind_program(program)?;
        canvas.set_uniform("resolution", UniformValue::Vec2(viewport.resolution()))?;
        canvas.set_uniform("time", UniformValue::Float(frame.seconds()))?;
        canvas.rect(Rect::covering(viewport))
    }

    fn on_resize(&mut self, canvas: &mut dyn Canvas, window: WindowMetrics) {
        if self.viewport.is_none() {
            tracing::trace!("resize before setup ignored");
            return;
        }
        let viewport = window.viewport();
        canvas.resize(viewport);
        canvas.apply_style(self.style);
        if self.viewport != Some(viewport) {
            tracing::debug!(
                width = viewport.width,
                height = viewport.height,
                "sketch viewport resized"
            );
        }
        self.viewport = Some(viewport);
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::time::{Duration, Instant};

    use super::*;
    use crate::clock::FrameClock;

    const VERT: &str = r"attribute vec3 aPosition;
attribute vec2 aTexCoord;
varying vec2 vTexCoord;
void main() {
    vTexCoord = aTexCoord;
    vec4 positionVec4 = vec4(aPosition, 1.0);
    positionVec4.xy = positionVec4.xy * 2.0 - 1.0;
    gl_Position = positionVec4;
}
";

    const FRAG: &str = r"precision mediump float;
varying vec2 vTexCoord;
uniform vec2 resolution;
uniform float time;
void main() {
    vec2 st = gl_FragCoord.xy / resolution;
    gl_FragColor = vec4(st, 0.5 + 0.5 * sin(time), 1.0);
}
";

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        PixelDensity(f32),
        Create(Viewport, CanvasMode),
        Resize(Viewport),
        Style(CanvasStyle),
        Bind,
        Uniform(String, UniformValue),
        Rect(Rect),
    }

    #[derive(Default)]
    struct RecordingCanvas {
        calls: Vec<Call>,
        viewport: Option<Viewport>,
        fail_create: bool,
    }

    impl RecordingCanvas {
        fn take(&mut self) -> Vec<Call> {
            std::mem::take(&mut self.calls)
        }
    }

    impl Canvas for RecordingCanvas {
        fn set_pixel_density(&mut self, density: f32) {
            self.calls.push(Call::PixelDensity(density));
        }

        fn create(&mut self, viewport: Viewport, mode: CanvasMode) -> Result<(), SketchError> {
            if self.fail_create {
                return Err(crate::error::ContextError::Unavailable { attempts: Vec::new() }.into());
            }
            self.viewport = Some(viewport);
            self.calls.push(Call::Create(viewport, mode));
            Ok(())
        }

        fn resize(&mut self, viewport: Viewport) {
            self.viewport = Some(viewport);
            self.calls.push(Call::Resize(viewport));
        }

        fn apply_style(&mut self, style: CanvasStyle) {
            self.calls.push(Call::Style(style));
        }

        fn viewport(&self) -> Option<Viewport> {
            self.viewport
        }

        fn bind_program(&mut self, _program: &ShaderProgram) -> Result<(), SketchError> {
            self.calls.push(Call::Bind);
            Ok(())
        }

        fn set_uniform(&mut self, name: &str, value: UniformValue) -> Result<(), SketchError> {
            self.calls.push(Call::Uniform(name.to_string(), value));
            Ok(())
        }

        fn rect(&mut self, rect: Rect) -> Result<(), SketchError> {
            self.calls.push(Call::Rect(rect));
            Ok(())
        }
    }

    fn preloaded_sketch() -> (tempfile::TempDir, ShaderSketch) {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("vert.glsl"), VERT).expect("write vert");
        fs::write(dir.path().join("frag.glsl"), FRAG).expect("write frag");
        let mut sketch = ShaderSketch::default();
        sketch
            .on_preload(&AssetLoader::new(dir.path()))
            .expect("preload");
        (dir, sketch)
    }

    fn resolution_of(calls: &[Call]) -> Option<[f32; 2]> {
        calls.iter().find_map(|call| match call {
            Call::Uniform(name, UniformValue::Vec2(value)) if name == "resolution" => Some(*value),
            _ => None,
        })
    }

    fn time_of(calls: &[Call]) -> Option<f32> {
        calls.iter().find_map(|call| match call {
            Call::Uniform(name, UniformValue::Float(value)) if name == "time" => Some(*value),
            _ => None,
        })
    }

    #[test]
    fn setup_creates_device_pixel_canvas_with_density_one() {
        let (_dir, mut sketch) = preloaded_sketch();
        let mut canvas = RecordingCanvas::default();
        sketch
            .on_setup(&mut canvas, WindowMetrics::new(800.0, 600.0, 2.0))
            .expect("setup");

        let calls = canvas.take();
        assert_eq!(calls[0], Call::PixelDensity(1.0));
        assert_eq!(
            calls[1],
            Call::Create(Viewport::new(1600, 1200), CanvasMode::Webgl)
        );
        assert_eq!(calls[2], Call::Style(CanvasStyle::default()));
        assert!(sketch.start_seed().is_some_and(|seed| (0.0..1.0).contains(&seed)));
    }

    #[test]
    fn resolution_tracks_the_latest_resize() {
        let (_dir, mut sketch) = preloaded_sketch();
        let mut canvas = RecordingCanvas::default();
        let mut clock = FrameClock::new();
        let start = Instant::now();

        sketch
            .on_setup(&mut canvas, WindowMetrics::new(800.0, 600.0, 2.0))
            .expect("setup");
        canvas.take();

        sketch
            .on_frame(&mut canvas, clock.tick(start))
            .expect("first frame");
        assert_eq!(resolution_of(&canvas.take()), Some([1600.0, 1200.0]));

        sketch.on_resize(&mut canvas, WindowMetrics::new(400.0, 300.0, 2.0));
        assert_eq!(canvas.viewport(), Some(Viewport::new(800, 600)));
        canvas.take();

        sketch
            .on_frame(&mut canvas, clock.tick(start + Duration::from_millis(16)))
            .expect("second frame");
        let calls = canvas.take();
        assert_eq!(resolution_of(&calls), Some([800.0, 600.0]));
        assert!(calls.contains(&Call::Rect(Rect::new(0.0, 0.0, 800.0, 600.0))));
    }

    #[test]
    fn every_frame_binds_once_and_draws_one_full_rect() {
        let (_dir, mut sketch) = preloaded_sketch();
        let mut canvas = RecordingCanvas::default();
        let mut clock = FrameClock::new();
        let start = Instant::now();
        sketch
            .on_setup(&mut canvas, WindowMetrics::new(320.0, 200.0, 1.0))
            .expect("setup");
        canvas.take();

        let mut last_time = -1.0;
        for frame in 0..5u64 {
            sketch
                .on_frame(
                    &mut canvas,
                    clock.tick(start + Duration::from_millis(frame * 17)),
                )
                .expect("frame");
            let calls = canvas.take();
            assert_eq!(calls[0], Call::Bind);
            assert_eq!(calls.iter().filter(|call| **call == Call::Bind).count(), 1);
            let rects: Vec<_> = calls
                .iter()
                .filter(|call| matches!(call, Call::Rect(_)))
                .collect();
            assert_eq!(rects, vec![&Call::Rect(Rect::new(0.0, 0.0, 320.0, 200.0))]);

            let time = time_of(&calls).expect("time uniform");
            assert!(time >= 0.0);
            assert!(time >= last_time);
            last_time = time;
        }
        assert!((last_time - 0.068).abs() < 1e-4);
    }

    #[test]
    fn resize_with_same_window_is_stable() {
        let (_dir, mut sketch) = preloaded_sketch();
        let mut canvas = RecordingCanvas::default();
        let metrics = WindowMetrics::new(640.0, 480.0, 1.5);
        sketch.on_setup(&mut canvas, metrics).expect("setup");
        sketch.on_resize(&mut canvas, metrics);
        sketch.on_resize(&mut canvas, metrics);
        assert_eq!(sketch.viewport(), Some(Viewport::new(960, 720)));
        assert_eq!(canvas.viewport(), Some(Viewport::new(960, 720)));
    }

    #[test]
    fn resize_before_setup_is_ignored() {
        let (_dir, mut sketch) = preloaded_sketch();
        let mut canvas = RecordingCanvas::default();
        sketch.on_resize(&mut canvas, WindowMetrics::new(100.0, 100.0, 1.0));
        assert!(canvas.take().is_empty());
        assert_eq!(sketch.viewport(), None);
    }

    #[test]
    fn context_failure_propagates_out_of_setup() {
        let (_dir, mut sketch) = preloaded_sketch();
        let mut canvas = RecordingCanvas {
            fail_create: true,
            ..Default::default()
        };
        let err = sketch
            .on_setup(&mut canvas, WindowMetrics::new(800.0, 600.0, 1.0))
            .unwrap_err();
        assert!(matches!(err, SketchError::Context(_)));
    }

    #[test]
    fn preload_failure_is_fatal() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut sketch = ShaderSketch::default();
        let err = sketch
            .on_preload(&AssetLoader::new(dir.path()))
            .unwrap_err();
        assert!(matches!(err, SketchError::ShaderRead { .. }));
        assert!(sketch.program().is_none());
    }

    #[test]
    fn asset_loader_keeps_absolute_paths() {
        let loader = AssetLoader::new("/sketches/plasma");
        assert_eq!(
            loader.resolve(Path::new("frag.glsl")),
            PathBuf::from("/sketches/plasma/frag.glsl")
        );
        assert_eq!(
            loader.resolve(Path::new("/tmp/vert.glsl")),
            PathBuf::from("/tmp/vert.glsl")
        );
    }
}
