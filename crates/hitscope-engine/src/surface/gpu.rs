//! wgpu-backed display surface.
//!
//! The surface owns an `Rgba32Float` texture. Uploads go through
//! [`wgpu::Queue::write_texture`], so no staging buffer or command encoder
//! is needed on the render context thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::{check_region, DisplaySurface};
use crate::buffer::TileRegion;
use crate::UploadError;

/// Texture format of every [`WgpuSurface`]; matches
/// [`LinearColor`](crate::buffer::LinearColor) byte for byte.
pub const SURFACE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba32Float;

/// A texture the tile image is uploaded into.
pub struct WgpuSurface {
    queue: Arc<wgpu::Queue>,
    texture: wgpu::Texture,
    width: u32,
    height: u32,
    valid: AtomicBool,
    /// Kept alive for surfaces that created their own device.
    _device: Option<wgpu::Device>,
}

impl WgpuSurface {
    /// Create a surface texture on an existing device.
    pub fn new(device: &wgpu::Device, queue: Arc<wgpu::Queue>, width: u32, height: u32) -> Self {
        let texture = create_texture(device, width, height);
        Self {
            queue,
            texture,
            width,
            height,
            valid: AtomicBool::new(true),
            _device: None,
        }
    }

    /// Create a surface on a fresh device with no window attached.
    ///
    /// # Errors
    ///
    /// Returns an error if no suitable GPU adapter or device is available.
    pub async fn new_headless(width: u32, height: u32) -> Result<Self, anyhow::Error> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::LowPower,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| anyhow::anyhow!("no suitable GPU adapter found"))?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("hitscope_surface_device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: wgpu::MemoryHints::default(),
                },
                None,
            )
            .await?;

        let texture = create_texture(&device, width, height);
        tracing::info!(width, height, adapter = ?adapter.get_info().name, "headless surface created");

        Ok(Self {
            queue: Arc::new(queue),
            texture,
            width,
            height,
            valid: AtomicBool::new(true),
            _device: Some(device),
        })
    }

    /// Blocking variant of [`WgpuSurface::new_headless`].
    ///
    /// # Errors
    ///
    /// See [`WgpuSurface::new_headless`].
    pub fn new_headless_blocking(width: u32, height: u32) -> Result<Self, anyhow::Error> {
        pollster::block_on(Self::new_headless(width, height))
    }

    pub fn texture(&self) -> &wgpu::Texture {
        &self.texture
    }

    /// Mark the surface released and destroy its texture.
    pub fn invalidate(&self) {
        if self.valid.swap(false, Ordering::SeqCst) {
            self.texture.destroy();
        }
    }
}

fn create_texture(device: &wgpu::Device, width: u32, height: u32) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some("hitscope_collision_view"),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: SURFACE_FORMAT,
        usage: wgpu::TextureUsages::TEXTURE_BINDING
            | wgpu::TextureUsages::COPY_DST
            | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    })
}

impl DisplaySurface for WgpuSurface {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn is_valid(&self) -> bool {
        self.valid.load(Ordering::SeqCst)
    }

    fn write_region(
        &self,
        region: &TileRegion,
        data: &[u8],
        bytes_per_row: usize,
    ) -> Result<(), UploadError> {
        check_region(self, region, data, bytes_per_row)?;
        if region.pixel_count() == 0 {
            return Ok(());
        }

        self.queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d {
                    x: region.x,
                    y: region.y,
                    z: 0,
                },
                aspect: wgpu::TextureAspect::All,
            },
            data,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(bytes_per_row as u32),
                rows_per_image: Some(region.height),
            },
            wgpu::Extent3d {
                width: region.width,
                height: region.height,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(std::iter::empty());
        Ok(())
    }
}
