use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use winit::dpi::PhysicalSize;

use crate::error::{RenderError, RenderResult};

/// Format of the offscreen export texture.
pub(crate) const OFFSCREEN_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

pub(crate) enum RenderTarget {
    Window {
        surface: wgpu::Surface<'static>,
        config: wgpu::SurfaceConfiguration,
    },
    Offscreen {
        texture: wgpu::Texture,
        view: wgpu::TextureView,
    },
}

/// The texture a frame is drawn into, plus the swapchain image to present.
pub(crate) struct FrameTarget {
    pub view: wgpu::TextureView,
    pub surface_texture: Option<wgpu::SurfaceTexture>,
}

pub(crate) struct GpuContext {
    pub _instance: wgpu::Instance,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub target: RenderTarget,
    pub format: wgpu::TextureFormat,
    pub size: PhysicalSize<u32>,
    pub max_dimension: u32,
}

fn create_instance() -> wgpu::Instance {
    wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::all(),
        flags: wgpu::InstanceFlags::default(),
        memory_budget_thresholds: wgpu::MemoryBudgetThresholds::default(),
        backend_options: wgpu::BackendOptions::default(),
    })
}

fn request_device(
    instance: &wgpu::Instance,
    compatible_surface: Option<&wgpu::Surface<'_>>,
    label: &str,
) -> RenderResult<(wgpu::Adapter, wgpu::Device, wgpu::Queue)> {
    let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
        power_preference: wgpu::PowerPreference::default(),
        compatible_surface,
        force_fallback_adapter: false,
    }))
    .map_err(|err| RenderError::ContextUnavailable(format!("no suitable GPU adapter: {err}")))?;

    let info = adapter.get_info();
    tracing::debug!(
        name = %info.name,
        backend = ?info.backend,
        device_type = ?info.device_type,
        "selected GPU adapter"
    );

    let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
        label: Some(label),
        required_features: wgpu::Features::empty(),
        required_limits: adapter.limits(),
        memory_hints: wgpu::MemoryHints::MemoryUsage,
        trace: wgpu::Trace::default(),
    }))
    .map_err(|err| RenderError::ContextUnavailable(format!("failed to create GPU device: {err}")))?;

    Ok((adapter, device, queue))
}

impl GpuContext {
    /// Binds a context to a window surface for the live preview.
    pub(crate) fn for_window<T>(target: &T, initial_size: PhysicalSize<u32>) -> RenderResult<Self>
    where
        T: HasDisplayHandle + HasWindowHandle,
    {
        let instance = create_instance();
        let window_handle = target.window_handle().map_err(|err| {
            RenderError::ContextUnavailable(format!("failed to acquire window handle: {err}"))
        })?;
        let display_handle = target.display_handle().map_err(|err| {
            RenderError::ContextUnavailable(format!("failed to acquire display handle: {err}"))
        })?;

        // The caller keeps the window alive for as long as the context.
        let surface = unsafe {
            instance.create_surface_unsafe(wgpu::SurfaceTargetUnsafe::RawHandle {
                raw_display_handle: display_handle.as_raw(),
                raw_window_handle: window_handle.as_raw(),
            })
        }
        .map_err(|err| {
            RenderError::ContextUnavailable(format!("failed to create rendering surface: {err}"))
        })?;

        let (adapter, device, queue) = request_device(&instance, Some(&surface), "liquid live device")?;
        let max_dimension = adapter.limits().max_texture_dimension_2d;
        let size = PhysicalSize::new(initial_size.width.max(1), initial_size.height.max(1));
        if size.width > max_dimension || size.height > max_dimension {
            return Err(RenderError::ContextUnavailable(format!(
                "GPU max texture dimension is {max_dimension}, window is {}x{}",
                size.width, size.height
            )));
        }

        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|format| !format.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .ok_or_else(|| {
                RenderError::ContextUnavailable("surface reports no supported formats".into())
            })?;
        let alpha_mode = caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width,
            height: size.height,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);
        tracing::debug!(?format, width = size.width, height = size.height, "configured window surface");

        Ok(Self {
            _instance: instance,
            device,
            queue,
            target: RenderTarget::Window { surface, config },
            format,
            size,
            max_dimension,
        })
    }

    /// Builds an independent context rendering into a `side` x `side`
    /// texture that can be copied back to the CPU.
    pub(crate) fn offscreen(side: u32) -> RenderResult<Self> {
        if side == 0 {
            return Err(RenderError::ContextUnavailable("offscreen side must be non-zero".into()));
        }
        let instance = create_instance();
        let (adapter, device, queue) = request_device(&instance, None, "liquid export device")?;
        let max_dimension = adapter.limits().max_texture_dimension_2d;
        if side > max_dimension {
            return Err(RenderError::ContextUnavailable(format!(
                "GPU max texture dimension is {max_dimension}, export side is {side}"
            )));
        }

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("export target"),
            size: wgpu::Extent3d {
                width: side,
                height: side,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: OFFSCREEN_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Ok(Self {
            _instance: instance,
            device,
            queue,
            target: RenderTarget::Offscreen { texture, view },
            format: OFFSCREEN_FORMAT,
            size: PhysicalSize::new(side, side),
            max_dimension,
        })
    }

    /// Largest square that fits the target, centred.
    pub(crate) fn viewport(&self) -> (f32, f32, f32) {
        let side = self.size.width.min(self.size.height);
        let x = (self.size.width - side) / 2;
        let y = (self.size.height - side) / 2;
        (x as f32, y as f32, side as f32)
    }

    pub(crate) fn side(&self) -> u32 {
        self.size.width.min(self.size.height)
    }

    pub(crate) fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        if let RenderTarget::Window { surface, config } = &mut self.target {
            let width = new_size.width.min(self.max_dimension);
            let height = new_size.height.min(self.max_dimension);
            self.size = PhysicalSize::new(width, height);
            config.width = width;
            config.height = height;
            surface.configure(&self.device, config);
        }
    }

    fn reconfigure(&self) {
        if let RenderTarget::Window { surface, config } = &self.target {
            surface.configure(&self.device, config);
        }
    }

    pub(crate) fn acquire(&self) -> RenderResult<FrameTarget> {
        match &self.target {
            RenderTarget::Offscreen { view, .. } => Ok(FrameTarget {
                view: view.clone(),
                surface_texture: None,
            }),
            RenderTarget::Window { surface, .. } => match surface.get_current_texture() {
                Ok(frame) => {
                    let view = frame
                        .texture
                        .create_view(&wgpu::TextureViewDescriptor::default());
                    Ok(FrameTarget {
                        view,
                        surface_texture: Some(frame),
                    })
                }
                Err(err @ (wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated)) => {
                    self.reconfigure();
                    Err(RenderError::Surface(err.to_string()))
                }
                Err(wgpu::SurfaceError::OutOfMemory) => Err(RenderError::ContextUnavailable(
                    "surface ran out of memory".into(),
                )),
                Err(err) => Err(RenderError::Surface(err.to_string())),
            },
        }
    }

    pub(crate) fn offscreen_texture(&self) -> Option<&wgpu::Texture> {
        match &self.target {
            RenderTarget::Offscreen { texture, .. } => Some(texture),
            RenderTarget::Window { .. } => None,
        }
    }
}
