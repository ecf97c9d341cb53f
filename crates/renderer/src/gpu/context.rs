use std::sync::Arc;

use anyhow::{Context as AnyhowContext, Result};
use wgpu::TextureFormatFeatureFlags;
use winit::dpi::PhysicalSize;
use winit::window::Window;

use crate::error::{ContextAttempt, ContextError};
use crate::types::{Antialiasing, ContextTier, GpuPowerPreference};

/// Depth attachment format used in `CanvasMode::Webgl`.
pub(crate) const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
/// Incoming fragments pass when their depth is less than or equal to the
/// stored value.
pub(crate) const DEPTH_COMPARE: wgpu::CompareFunction = wgpu::CompareFunction::LessEqual;
/// Value the depth attachment is cleared to at the start of every frame.
pub(crate) const DEPTH_CLEAR: f32 = 1.0;

/// Tries each tier in order and returns the first context that comes up.
///
/// Every failure is recorded; when no tier succeeds the full list is returned
/// in [`ContextError::Unavailable`] so the caller can report why.
pub(crate) fn negotiate<T>(
    tiers: &[ContextTier],
    mut attempt: impl FnMut(ContextTier) -> Result<T>,
) -> Result<(ContextTier, T), ContextError> {
    if tiers.is_empty() {
        return Err(ContextError::NoTiers);
    }

    let mut attempts = Vec::with_capacity(tiers.len());
    for &tier in tiers {
        match attempt(tier) {
            Ok(context) => {
                if !attempts.is_empty() {
                    tracing::info!(%tier, failed = attempts.len(), "fell back to graphics context tier");
                }
                return Ok((tier, context));
            }
            Err(err) => {
                tracing::warn!(%tier, error = %format!("{err:#}"), "graphics context tier unavailable");
                attempts.push(ContextAttempt {
                    tier,
                    reason: format!("{err:#}"),
                });
            }
        }
    }
    Err(ContextError::Unavailable { attempts })
}

/// Adapter facts worth logging and reacting to.
#[derive(Debug, Clone)]
pub(crate) struct AdapterProfile {
    pub name: String,
    pub backend: wgpu::Backend,
    pub device_type: wgpu::DeviceType,
}

impl AdapterProfile {
    fn from_info(info: &wgpu::AdapterInfo) -> Self {
        Self {
            name: info.name.clone(),
            backend: info.backend,
            device_type: info.device_type,
        }
    }

    pub fn is_software(&self) -> bool {
        matches!(self.device_type, wgpu::DeviceType::Cpu)
    }
}

pub(crate) struct GpuContext {
    pub _instance: wgpu::Instance,
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub size: PhysicalSize<u32>,
    pub sample_count: u32,
    pub surface_format: wgpu::TextureFormat,
    pub tier: ContextTier,
    pub adapter_profile: AdapterProfile,
}

impl GpuContext {
    /// Brings up instance, surface, adapter and device restricted to the
    /// backends of `tier`.
    pub(crate) fn new(
        window: Arc<Window>,
        tier: ContextTier,
        initial_size: PhysicalSize<u32>,
        antialiasing: Antialiasing,
        power: GpuPowerPreference,
    ) -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: tier.backends(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(window)
            .context("failed to create rendering surface")?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: power.to_wgpu(),
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .context("failed to find a suitable GPU adapter")?;

        let adapter_profile = AdapterProfile::from_info(&adapter.get_info());
        let limits = adapter.limits();
        tracing::debug!(
            %tier,
            name = %adapter_profile.name,
            backend = ?adapter_profile.backend,
            device_type = ?adapter_profile.device_type,
            "selected GPU adapter"
        );

        let max_dimension = limits.max_texture_dimension_2d;
        let width = initial_size.width.max(1);
        let height = initial_size.height.max(1);
        if width > max_dimension || height > max_dimension {
            anyhow::bail!(
                "GPU max texture dimension is {max_dimension}, requested surface is {width}x{height}"
            );
        }

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|format| !format.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .context("surface reports no supported formats")?;

        let format_features = adapter.get_texture_format_features(surface_format);
        let sample_count = choose_sample_count(
            antialiasing,
            format_features.flags,
            adapter_profile.is_software(),
        );

        let mut required_features = wgpu::Features::empty();
        if sample_count > 4 {
            required_features |= wgpu::Features::TEXTURE_ADAPTER_SPECIFIC_FORMAT_FEATURES;
        }

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("shadersketch device"),
            required_features,
            required_limits: limits.clone(),
            memory_hints: wgpu::MemoryHints::Performance,
            trace: wgpu::Trace::default(),
        }))
        .context("failed to create GPU device")?;

        let present_mode = surface_caps
            .present_modes
            .iter()
            .copied()
            .find(|mode| *mode == wgpu::PresentMode::Fifo)
            .or_else(|| surface_caps.present_modes.first().copied())
            .unwrap_or(wgpu::PresentMode::Fifo);
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let size = PhysicalSize::new(width, height);
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width,
            height,
            present_mode,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);
        tracing::debug!(?present_mode, ?surface_format, sample_count, "surface configured");

        Ok(Self {
            _instance: instance,
            surface,
            device,
            queue,
            config,
            size,
            sample_count,
            surface_format,
            tier,
            adapter_profile,
        })
    }

    /// Reconfigures the swapchain; zero-sized requests are ignored.
    pub(crate) fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }

        self.size = new_size;
        self.config.width = new_size.width;
        self.config.height = new_size.height;
        self.surface.configure(&self.device, &self.config);
    }

    /// Re-applies the current configuration after a lost or outdated surface.
    pub(crate) fn reconfigure(&mut self) {
        self.surface.configure(&self.device, &self.config);
    }
}

fn choose_sample_count(
    antialiasing: Antialiasing,
    flags: TextureFormatFeatureFlags,
    is_software: bool,
) -> u32 {
    let mut supported_samples = flags.supported_sample_counts();
    if !supported_samples.contains(&1) {
        supported_samples.push(1);
    }
    supported_samples.sort_unstable();
    supported_samples.dedup();

    let mut sample_count = match antialiasing {
        Antialiasing::Auto => *supported_samples.last().unwrap_or(&1),
        Antialiasing::Off => 1,
        Antialiasing::Samples(requested) => {
            if supported_samples.contains(&requested) {
                requested
            } else {
                let fallback = supported_samples
                    .iter()
                    .copied()
                    .filter(|&count| count <= requested)
                    .max()
                    .unwrap_or(1);
                tracing::warn!(
                    requested,
                    fallback,
                    ?supported_samples,
                    "requested MSAA sample count not supported; falling back"
                );
                fallback
            }
        }
    };

    if sample_count > 1 && !flags.contains(TextureFormatFeatureFlags::MULTISAMPLE_RESOLVE) {
        tracing::warn!("surface format does not support MSAA resolve; disabling MSAA");
        sample_count = 1;
    }

    if is_software && sample_count > 1 {
        tracing::warn!(
            sample_count,
            "software rasterizer detected; disabling MSAA for performance"
        );
        sample_count = 1;
    }

    sample_count
}
