use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// One rung of the graphics-context negotiation ladder.
///
/// The host tries the tiers in order and keeps the first one that yields a
/// device for the window surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextTier {
    /// Native modern APIs (Vulkan, Metal, DX12).
    Modern,
    /// OpenGL / GLES through wgpu's GL backend.
    Legacy,
}

impl ContextTier {
    pub fn backends(self) -> wgpu::Backends {
        match self {
            ContextTier::Modern => wgpu::Backends::PRIMARY,
            ContextTier::Legacy => wgpu::Backends::GL,
        }
    }
}

impl fmt::Display for ContextTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextTier::Modern => f.write_str("modern"),
            ContextTier::Legacy => f.write_str("legacy"),
        }
    }
}

/// Which context tiers the host is allowed to try.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendPreference {
    /// Prefer the modern tier and fall back to the legacy one.
    #[default]
    Auto,
    Modern,
    Legacy,
}

impl BackendPreference {
    /// Ordered tier list handed to the context negotiation.
    pub fn tiers(self) -> &'static [ContextTier] {
        match self {
            BackendPreference::Auto => &[ContextTier::Modern, ContextTier::Legacy],
            BackendPreference::Modern => &[ContextTier::Modern],
            BackendPreference::Legacy => &[ContextTier::Legacy],
        }
    }
}

impl FromStr for BackendPreference {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "modern" => Ok(Self::Modern),
            "legacy" | "gl" => Ok(Self::Legacy),
            other => Err(format!(
                "unknown backend `{other}` (expected auto, modern or legacy)"
            )),
        }
    }
}

/// Adapter selection hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GpuPowerPreference {
    Low,
    #[default]
    High,
}

impl GpuPowerPreference {
    pub(crate) fn to_wgpu(self) -> wgpu::PowerPreference {
        match self {
            GpuPowerPreference::Low => wgpu::PowerPreference::LowPower,
            GpuPowerPreference::High => wgpu::PowerPreference::HighPerformance,
        }
    }
}

impl FromStr for GpuPowerPreference {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "high" => Ok(Self::High),
            other => Err(format!("unknown power preference `{other}` (expected high or low)")),
        }
    }
}

/// Anti-aliasing policy for the render pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Antialiasing {
    /// Pick the highest sample count supported by the surface format.
    #[default]
    Auto,
    /// Disable MSAA and render directly into the swapchain.
    Off,
    /// Request a specific MSAA sample count (clamped to what the device supports).
    Samples(u32),
}

impl FromStr for Antialiasing {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim().to_ascii_lowercase();
        match value.as_str() {
            "auto" => Ok(Self::Auto),
            "off" | "none" | "0" | "1" => Ok(Self::Off),
            other => {
                let samples: u32 = other
                    .parse()
                    .map_err(|_| format!("invalid antialias value `{other}`"))?;
                if samples.is_power_of_two() && samples <= 16 {
                    Ok(Self::Samples(samples))
                } else {
                    Err(format!(
                        "unsupported MSAA sample count {samples} (expected 2, 4, 8 or 16)"
                    ))
                }
            }
        }
    }
}

/// Rendering mode requested when the canvas is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanvasMode {
    /// Flat drawing without a depth attachment.
    P2d,
    /// 3D-capable drawing: depth testing with a `LessEqual` compare.
    Webgl,
}

impl CanvasMode {
    pub fn uses_depth(self) -> bool {
        matches!(self, CanvasMode::Webgl)
    }
}

/// Immutable configuration passed to the host at start-up.
#[derive(Debug, Clone)]
pub struct SketchConfig {
    /// Window title.
    pub title: String,
    /// Directory the shader paths are resolved against.
    pub sketch_dir: PathBuf,
    /// Vertex shader path, relative to `sketch_dir` unless absolute.
    pub vertex_shader: PathBuf,
    /// Fragment shader path, relative to `sketch_dir` unless absolute.
    pub fragment_shader: PathBuf,
    /// Initial window size in logical pixels.
    pub window_size: (u32, u32),
    pub backend: BackendPreference,
    pub power: GpuPowerPreference,
    pub antialiasing: Antialiasing,
}

impl Default for SketchConfig {
    fn default() -> Self {
        Self {
            title: "shadersketch".to_string(),
            sketch_dir: PathBuf::from("."),
            vertex_shader: PathBuf::from("vert.glsl"),
            fragment_shader: PathBuf::from("frag.glsl"),
            window_size: (1280, 720),
            backend: BackendPreference::default(),
            power: GpuPowerPreference::default(),
            antialiasing: Antialiasing::default(),
        }
    }
}
