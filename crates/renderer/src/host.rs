use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use winit::dpi::LogicalSize;
use winit::event::{ElementState, Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowBuilder};

use crate::clock::{FrameClock, FrameStats};
use crate::error::SketchError;
use crate::gpu::GpuCanvas;
use crate::sketch::{AssetLoader, Sketch};
use crate::types::SketchConfig;
use crate::viewport::WindowMetrics;

/// Opens the window and drives `sketch` through preload, setup and the frame
/// loop until the window is closed or a lifecycle hook fails.
pub fn run<S: Sketch>(config: &SketchConfig, sketch: &mut S) -> Result<()> {
    let event_loop =
        EventLoop::new().map_err(|err| anyhow!("failed to create event loop: {err}"))?;
    let (width, height) = config.window_size;
    let window = WindowBuilder::new()
        .with_title(config.title.as_str())
        .with_inner_size(LogicalSize::new(width, height))
        .build(&event_loop)
        .map_err(|err| anyhow!("failed to create sketch window: {err}"))?;
    let window = Arc::new(window);

    let assets = AssetLoader::new(&config.sketch_dir);
    sketch
        .on_preload(&assets)
        .context("sketch preload failed")?;
    tracing::info!(sketch_dir = %assets.root().display(), "sketch assets loaded");

    let mut canvas = GpuCanvas::new(window.clone(), config);
    sketch
        .on_setup(&mut canvas, metrics(&window))
        .context("sketch setup failed")?;
    let touch_gestures = canvas.style().touch_gestures;

    let mut clock = FrameClock::new();
    let mut stats = FrameStats::new(Instant::now());
    let mut result: Result<()> = Ok(());

    event_loop
        .run(|event, elwt| match event {
            Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
                WindowEvent::CloseRequested | WindowEvent::Destroyed => elwt.exit(),
                WindowEvent::KeyboardInput { event, .. } => {
                    if event.state == ElementState::Pressed
                        && matches!(event.logical_key, Key::Named(NamedKey::Escape))
                    {
                        elwt.exit();
                    }
                }
                WindowEvent::Touch(touch) if !touch_gestures => {
                    tracing::trace!(id = touch.id, phase = ?touch.phase, "touch gesture ignored");
                }
                WindowEvent::TouchpadMagnify { .. } | WindowEvent::TouchpadRotate { .. }
                    if !touch_gestures =>
                {
                    tracing::trace!("touchpad gesture ignored");
                }
                WindowEvent::Resized(size) => {
                    canvas.surface_resized(size);
                    sketch.on_resize(&mut canvas, metrics(&window));
                    window.request_redraw();
                }
                WindowEvent::RedrawRequested => {
                    let now = Instant::now();
                    let frame = clock.tick(now);
                    canvas.begin_frame();
                    let drawn = sketch
                        .on_frame(&mut canvas, frame)
                        .and_then(|()| canvas.end_frame());
                    match drawn {
                        Ok(()) => {
                            if let Some(fps) = stats.record(now) {
                                tracing::debug!(
                                    fps,
                                    frames = clock.frames(),
                                    time = frame.seconds(),
                                    "render stats"
                                );
                            }
                        }
                        Err(SketchError::Surface(err)) => match err {
                            wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => {
                                tracing::debug!(?err, "surface needs reconfiguring");
                                canvas.reconfigure();
                            }
                            wgpu::SurfaceError::OutOfMemory => {
                                tracing::error!("surface out of memory; exiting");
                                result = Err(anyhow!("surface out of memory"));
                                elwt.exit();
                            }
                            wgpu::SurfaceError::Timeout => {
                                tracing::warn!("surface timeout; retrying next frame");
                            }
                            other => {
                                tracing::warn!(?other, "surface error; retrying next frame");
                            }
                        },
                        Err(err) => {
                            tracing::error!(error = %err, frame = frame.index, "sketch draw failed");
                            result = Err(anyhow::Error::new(err).context("sketch draw failed"));
                            elwt.exit();
                        }
                    }
                }
                _ => {}
            },
            Event::AboutToWait => {
                window.request_redraw();
                elwt.set_control_flow(ControlFlow::Wait);
            }
            _ => {}
        })
        .map_err(|err| anyhow!("window event loop error: {err}"))?;

    result
}

fn metrics(window: &Window) -> WindowMetrics {
    WindowMetrics::from_physical(window.inner_size(), window.scale_factor())
}
