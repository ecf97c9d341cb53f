use winit::dpi::PhysicalSize;

/// Drawing-surface dimensions in device pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
        }
    }

    /// `[width, height]` as the shader sees it.
    pub fn resolution(self) -> [f32; 2] {
        [self.width as f32, self.height as f32]
    }

    pub fn aspect(self) -> f32 {
        self.width as f32 / self.height as f32
    }

    pub fn scaled(self, density: f32) -> Self {
        let density = if density.is_finite() && density > 0.0 {
            density
        } else {
            1.0
        };
        Self::new(
            (self.width as f32 * density).round() as u32,
            (self.height as f32 * density).round() as u32,
        )
    }
}

impl From<PhysicalSize<u32>> for Viewport {
    fn from(size: PhysicalSize<u32>) -> Self {
        Self::new(size.width, size.height)
    }
}

/// Window size in logical pixels plus the current device pixel ratio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowMetrics {
    pub logical_width: f64,
    pub logical_height: f64,
    pub device_pixel_ratio: f64,
}

impl WindowMetrics {
    pub fn new(logical_width: f64, logical_height: f64, device_pixel_ratio: f64) -> Self {
        Self {
            logical_width,
            logical_height,
            device_pixel_ratio,
        }
    }

    /// Builds metrics from what winit reports: a physical inner size and the
    /// window's scale factor.
    pub fn from_physical(size: PhysicalSize<u32>, scale_factor: f64) -> Self {
        let ratio = sanitize_ratio(scale_factor);
        Self::new(
            f64::from(size.width) / ratio,
            f64::from(size.height) / ratio,
            ratio,
        )
    }

    /// Logical size times device pixel ratio, rounded to whole pixels.
    pub fn viewport(&self) -> Viewport {
        let ratio = sanitize_ratio(self.device_pixel_ratio);
        Viewport::new(
            (self.logical_width * ratio).round().max(0.0) as u32,
            (self.logical_height * ratio).round().max(0.0) as u32,
        )
    }
}

fn sanitize_ratio(ratio: f64) -> f64 {
    if ratio.is_finite() && ratio > 0.0 {
        ratio
    } else {
        1.0
    }
}

/// How the canvas is fitted into the window when their sizes disagree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Fit {
    /// Preserve the canvas aspect ratio, letterboxing the remainder.
    #[default]
    Contain,
    /// Fill the window, distorting the aspect ratio if needed.
    Stretch,
}

/// Presentation style re-applied to the canvas after every resize.
///
/// Mirrors `width:100%; height:auto; object-fit:contain; touch-action:none`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanvasStyle {
    pub fill_width: bool,
    pub fit: Fit,
    pub touch_gestures: bool,
}

impl Default for CanvasStyle {
    fn default() -> Self {
        Self {
            fill_width: true,
            fit: Fit::Contain,
            touch_gestures: false,
        }
    }
}

/// Pixel rectangle inside the window that the canvas is presented into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl CanvasStyle {
    /// Where a canvas of size `canvas` lands inside a window of size `window`.
    pub fn placement(&self, canvas: Viewport, window: Viewport) -> Placement {
        let window_w = window.width as f32;
        let window_h = window.height as f32;
        match self.fit {
            Fit::Stretch => Placement {
                x: 0.0,
                y: 0.0,
                width: window_w,
                height: window_h,
            },
            Fit::Contain => {
                let width = if self.fill_width {
                    window_w
                } else {
                    (canvas.width as f32).min(window_w)
                };
                let mut height = width / canvas.aspect();
                let mut width = width;
                if height > window_h {
                    height = window_h;
                    width = height * canvas.aspect();
                }
                Placement {
                    x: (window_w - width) * 0.5,
                    y: (window_h - height) * 0.5,
                    width,
                    height,
                }
            }
        }
    }
}
