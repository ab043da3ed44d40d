//! Upload-target contract for the GPU side of the pipeline.
//!
//! A target owns GPU memory between `init` and `release`. The player keeps
//! the luma(+alpha) and chroma targets together in [`PlaneTextures`] so the
//! pair is always created and released as one.

use glam::UVec2;

use crate::buffer::{PixelFormat, PlaneView};
use crate::geometry::PlaneLayout;

/// Backend-assigned identity of a live texture. Handles are never reused
/// within one factory, so a stale handle cannot alias a newer texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureHandle(pub u64);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TextureError {
    #[error("texture is not initialized")]
    NotInitialized,
    #[error("pixel format mismatch: texture is {texture:?}, data is {data:?}")]
    FormatMismatch {
        texture: PixelFormat,
        data: PixelFormat,
    },
    #[error("region {width}x{height} at ({x}, {y}) exceeds texture {texture_width}x{texture_height}")]
    OutOfBounds {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        texture_width: u32,
        texture_height: u32,
    },
}

/// GPU texture that accepts CPU plane uploads.
pub trait UploadTarget: Send {
    /// Allocate storage. Re-initializing replaces the previous allocation.
    fn init(&mut self, width: u32, height: u32, format: PixelFormat, mipmaps: bool);

    /// Upload `view` with its top-left corner at (`x`, `y`).
    fn update_region(&mut self, x: u32, y: u32, view: &PlaneView<'_>) -> Result<(), TextureError>;

    /// Free GPU memory. Safe to call repeatedly.
    fn release(&mut self);

    /// `None` until initialized and after release.
    fn handle(&self) -> Option<TextureHandle>;

    /// Format the backend stores the plane as.
    fn format(&self) -> PixelFormat;

    fn size(&self) -> UVec2;
}

/// Creates upload targets (one per plane).
pub trait TextureFactory: Send + Sync {
    fn create_texture(&self) -> Box<dyn UploadTarget>;
}

/// Shared validation for `update_region` implementations.
pub fn check_region(
    texture_size: UVec2,
    texture_format: PixelFormat,
    x: u32,
    y: u32,
    view: &PlaneView<'_>,
) -> Result<(), TextureError> {
    if texture_size == UVec2::ZERO {
        return Err(TextureError::NotInitialized);
    }
    if view.format() != texture_format {
        return Err(TextureError::FormatMismatch {
            texture: texture_format,
            data: view.format(),
        });
    }
    let right = u64::from(x) + u64::from(view.width());
    let bottom = u64::from(y) + u64::from(view.height());
    if right > u64::from(texture_size.x) || bottom > u64::from(texture_size.y) {
        return Err(TextureError::OutOfBounds {
            x,
            y,
            width: view.width(),
            height: view.height(),
            texture_width: texture_size.x,
            texture_height: texture_size.y,
        });
    }
    Ok(())
}

/// The YA + UV texture pair of one movie session.
pub struct PlaneTextures {
    ya: Box<dyn UploadTarget>,
    uv: Box<dyn UploadTarget>,
}

impl PlaneTextures {
    /// Create both targets at the padded layout sizes, without mipmaps.
    pub fn create(
        factory: &dyn TextureFactory,
        layout: &PlaneLayout,
        ya_format: PixelFormat,
        uv_format: PixelFormat,
    ) -> Self {
        let mut uv = factory.create_texture();
        uv.init(layout.uv_size.x, layout.uv_size.y, uv_format, false);
        let mut ya = factory.create_texture();
        ya.init(layout.ya_size.x, layout.ya_size.y, ya_format, false);
        Self { ya, uv }
    }

    /// Upload both planes over their full extent.
    pub fn upload(&mut self, ya: &PlaneView<'_>, uv: &PlaneView<'_>) -> Result<(), TextureError> {
        self.uv.update_region(0, 0, uv)?;
        self.ya.update_region(0, 0, ya)
    }

    /// Both handles, or `None` if either target is not live.
    pub fn handles(&self) -> Option<(TextureHandle, TextureHandle)> {
        Some((self.ya.handle()?, self.uv.handle()?))
    }

    pub fn ya(&self) -> &dyn UploadTarget {
        self.ya.as_ref()
    }

    pub fn uv(&self) -> &dyn UploadTarget {
        self.uv.as_ref()
    }

    pub fn release(&mut self) {
        self.uv.release();
        self.ya.release();
    }
}

impl Drop for PlaneTextures {
    fn drop(&mut self) {
        self.release();
    }
}
