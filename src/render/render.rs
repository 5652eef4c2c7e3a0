use std::cell::Cell;

use wgpu::{Device, Queue, Surface, SurfaceConfiguration, TextureView};

pub(crate) const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// The wgpu surface and device the viewer draws with.
pub struct Renderer {
    pub surface: Surface<'static>,
    pub config: SurfaceConfiguration,
    pub device: Device,
    pub queue: Queue,
    pub depth_texture_view: TextureView,
}

/// Tracks a renderer that is still being created. Only the first request
/// starts a creation; later ones just record the newest surface size.
#[derive(Debug, Default)]
pub struct PendingRenderer {
    size: Cell<Option<(u32, u32)>>,
}

impl PendingRenderer {
    /// True when the caller should start creating the renderer.
    pub fn begin(&self, width: u32, height: u32) -> bool {
        self.size.replace(Some((width, height))).is_none()
    }

    /// Ends the creation and returns the size to configure the surface with.
    pub fn finish(&self) -> Option<(u32, u32)> {
        self.size.take()
    }
}

fn create_depth_view(device: &Device, width: u32, height: u32) -> TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("depth_texture"),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

impl Renderer {
    #[cfg(target_arch = "wasm32")]
    pub async fn new(
        canvas: web_sys::HtmlCanvasElement,
        width: u32,
        height: u32,
    ) -> anyhow::Result<Self> {
        let width = width.max(1);
        let height = height.max(1);
        let instance = wgpu::Instance::default();
        let surface = instance.create_surface(wgpu::SurfaceTarget::Canvas(canvas))?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                force_fallback_adapter: false,
                compatible_surface: Some(&surface),
            })
            .await
            .ok_or(anyhow::anyhow!("Failed to find an appropriate adapter"))?;
        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: None,
                    required_features: wgpu::Features::empty(),
                    // Make sure we use the texture resolution limits from the adapter, so we can support images the size of the swapchain.
                    required_limits: wgpu::Limits::downlevel_webgl2_defaults()
                        .using_resolution(adapter.limits()),
                    memory_hints: wgpu::MemoryHints::default(),
                },
                None,
            )
            .await?;

        let config = surface
            .get_default_config(&adapter, width, height)
            .ok_or(anyhow::anyhow!("surface is not supported by the adapter"))?;
        surface.configure(&device, &config);
        let depth_texture_view = create_depth_view(&device, width, height);
        leptos::logging::log!("renderer ready at {}x{}", width, height);

        Ok(Self {
            surface,
            config,
            device,
            queue,
            depth_texture_view,
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        self.depth_texture_view = create_depth_view(&self.device, width, height);
    }

    #[inline]
    pub fn w(&self) -> u32 {
        self.config.width
    }

    #[inline]
    pub fn h(&self) -> u32 {
        self.config.height
    }
}
