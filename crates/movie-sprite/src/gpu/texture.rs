use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use glam::UVec2;
use wgpu::{Device, Queue, Texture, TextureFormat, TextureView};

use crate::buffer::{PixelFormat, PlaneView};
use crate::texture::{TextureError, TextureFactory, TextureHandle, UploadTarget, check_region};

pub fn wgpu_format(format: PixelFormat) -> TextureFormat {
    match format {
        PixelFormat::L8 => TextureFormat::R8Unorm,
        PixelFormat::LA8 => TextureFormat::Rg8Unorm,
    }
}

/// Live texture views by handle, so the renderer can bind what the
/// players uploaded.
#[derive(Default)]
pub struct TextureRegistry {
    views: Mutex<HashMap<TextureHandle, Arc<TextureView>>>,
    next_id: AtomicU64,
}

impl TextureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(&self) -> TextureHandle {
        TextureHandle(self.next_id.fetch_add(1, Ordering::Relaxed) + 1)
    }

    fn insert(&self, handle: TextureHandle, view: TextureView) {
        self.views
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(handle, Arc::new(view));
    }

    fn remove(&self, handle: TextureHandle) {
        self.views
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&handle);
    }

    pub fn view(&self, handle: TextureHandle) -> Option<Arc<TextureView>> {
        self.views
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&handle)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.views.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct WgpuTextureFactory {
    device: Arc<Device>,
    queue: Arc<Queue>,
    registry: Arc<TextureRegistry>,
}

impl WgpuTextureFactory {
    pub fn new(device: Arc<Device>, queue: Arc<Queue>, registry: Arc<TextureRegistry>) -> Self {
        Self {
            device,
            queue,
            registry,
        }
    }

    pub fn registry(&self) -> &Arc<TextureRegistry> {
        &self.registry
    }
}

impl TextureFactory for WgpuTextureFactory {
    fn create_texture(&self) -> Box<dyn UploadTarget> {
        Box::new(WgpuPlaneTexture {
            device: self.device.clone(),
            queue: self.queue.clone(),
            registry: self.registry.clone(),
            texture: None,
            handle: None,
            size: UVec2::ZERO,
            format: PixelFormat::L8,
        })
    }
}

/// One movie plane as an `R8Unorm`/`Rg8Unorm` texture.
pub struct WgpuPlaneTexture {
    device: Arc<Device>,
    queue: Arc<Queue>,
    registry: Arc<TextureRegistry>,
    texture: Option<Texture>,
    handle: Option<TextureHandle>,
    size: UVec2,
    format: PixelFormat,
}

impl UploadTarget for WgpuPlaneTexture {
    fn init(&mut self, width: u32, height: u32, format: PixelFormat, mipmaps: bool) {
        self.release();
        let width = width.max(1);
        let height = height.max(1);
        let mip_level_count = if mipmaps {
            32 - width.max(height).leading_zeros()
        } else {
            1
        };

        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("movie-plane"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu_format(format),
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let handle = self.registry.allocate();
        self.registry.insert(handle, view);
        self.texture = Some(texture);
        self.handle = Some(handle);
        self.size = UVec2::new(width, height);
        self.format = format;
    }

    fn update_region(&mut self, x: u32, y: u32, view: &PlaneView<'_>) -> Result<(), TextureError> {
        check_region(self.size, self.format, x, y, view)?;
        let Some(texture) = &self.texture else {
            return Err(TextureError::NotInitialized);
        };
        if view.is_empty() {
            return Ok(());
        }

        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d { x, y, z: 0 },
                aspect: wgpu::TextureAspect::All,
            },
            view.data(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(view.pitch() as u32),
                rows_per_image: Some(view.height()),
            },
            wgpu::Extent3d {
                width: view.width(),
                height: view.height(),
                depth_or_array_layers: 1,
            },
        );
        Ok(())
    }

    fn release(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.registry.remove(handle);
        }
        if let Some(texture) = self.texture.take() {
            texture.destroy();
        }
        self.size = UVec2::ZERO;
    }

    fn handle(&self) -> Option<TextureHandle> {
        self.handle
    }

    fn format(&self) -> PixelFormat {
        self.format
    }

    fn size(&self) -> UVec2 {
        self.size
    }
}

impl Drop for WgpuPlaneTexture {
    fn drop(&mut self) {
        self.release();
    }
}
