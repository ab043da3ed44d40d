//! Render-thread side: drawable and renderer contracts, and the step that
//! moves decoded planes to the GPU and draws them with the movie shader.

use std::sync::Arc;

use glam::{Affine2, Vec2};

use crate::decoder::ChromaLayout;
use crate::geometry::{MovieRect, TexRect};
use crate::player::MoviePlayer;
use crate::shader::{ShaderProgram, UV_SCALE_UNIFORM, UniformSink};
use crate::shared::{get, set};
use crate::texture::TextureHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendMode {
    /// Opaque movies overwrite the destination.
    #[default]
    Disabled,
    /// Source color is already multiplied by its alpha.
    PremultipliedAlpha,
}

impl BlendMode {
    pub const ALL: &[BlendMode] = &[BlendMode::Disabled, BlendMode::PremultipliedAlpha];

    pub fn display_name(self) -> &'static str {
        match self {
            BlendMode::Disabled => "Disabled",
            BlendMode::PremultipliedAlpha => "Premultiplied Alpha",
        }
    }
}

/// The textures and coordinates a drawable shows for the current session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MovieFrame {
    pub ya: TextureHandle,
    pub uv: TextureHandle,
    /// Whether `uv` carries V next to U.
    pub chroma: ChromaLayout,
    pub premultiplied: bool,
    /// Movie rect in the luma texture's normalized space.
    pub tex_rect: TexRect,
    pub src_rect: MovieRect,
    /// Natural display size (the movie rect size).
    pub size: Vec2,
}

/// One textured quad handed to the renderer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpriteDraw {
    pub frame: MovieFrame,
    pub blend: BlendMode,
    pub transform: Affine2,
    pub alpha: f32,
    pub size: Vec2,
}

pub trait Renderer {
    /// Program the next draws will use.
    fn shader_program(&self) -> Arc<dyn ShaderProgram>;

    fn set_shader_program(&mut self, program: Arc<dyn ShaderProgram>);

    /// Draw with the current program.
    fn draw_sprite(&mut self, sprite: &SpriteDraw);
}

pub struct RenderState<'a> {
    pub renderer: &'a mut dyn Renderer,
    pub transform: Affine2,
    pub alpha: f32,
}

impl<'a> RenderState<'a> {
    pub fn new(renderer: &'a mut dyn Renderer) -> Self {
        Self {
            renderer,
            transform: Affine2::IDENTITY,
            alpha: 1.0,
        }
    }
}

/// The sprite a player draws through.
pub trait Drawable: Send {
    /// Replace the displayed frame. Installing a frame resets the size to
    /// its natural size; removing one keeps the size.
    fn set_frame(&mut self, frame: Option<MovieFrame>);

    fn frame(&self) -> Option<MovieFrame>;

    fn set_blend_mode(&mut self, blend: BlendMode);

    fn blend_mode(&self) -> BlendMode;

    fn size(&self) -> Vec2;

    fn set_size(&mut self, size: Vec2);

    /// Default sprite draw path using the renderer's current program.
    fn draw(&mut self, rs: &mut RenderState<'_>);
}

/// A positioned quad showing the movie frame.
#[derive(Debug, Clone, PartialEq)]
pub struct QuadSprite {
    frame: Option<MovieFrame>,
    blend: BlendMode,
    size: Vec2,
    pub position: Vec2,
    pub alpha: f32,
    pub visible: bool,
}

impl Default for QuadSprite {
    fn default() -> Self {
        Self {
            frame: None,
            blend: BlendMode::Disabled,
            size: Vec2::ZERO,
            position: Vec2::ZERO,
            alpha: 1.0,
            visible: true,
        }
    }
}

impl QuadSprite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_size(size: Vec2) -> Self {
        Self {
            size,
            ..Self::default()
        }
    }
}

impl Drawable for QuadSprite {
    fn set_frame(&mut self, frame: Option<MovieFrame>) {
        if let Some(f) = frame {
            self.size = f.size;
        }
        self.frame = frame;
    }

    fn frame(&self) -> Option<MovieFrame> {
        self.frame
    }

    fn set_blend_mode(&mut self, blend: BlendMode) {
        self.blend = blend;
    }

    fn blend_mode(&self) -> BlendMode {
        self.blend
    }

    fn size(&self) -> Vec2 {
        self.size
    }

    fn set_size(&mut self, size: Vec2) {
        self.size = size;
    }

    fn draw(&mut self, rs: &mut RenderState<'_>) {
        let Some(frame) = self.frame else { return };
        if !self.visible || self.size.x <= 0.0 || self.size.y <= 0.0 {
            return;
        }
        rs.renderer.draw_sprite(&SpriteDraw {
            frame,
            blend: self.blend,
            transform: rs.transform * Affine2::from_translation(self.position),
            alpha: rs.alpha * self.alpha,
            size: self.size,
        });
    }
}

impl MoviePlayer {
    /// Upload the latest decoded planes if the decoder wrote since the last
    /// upload. Render thread only. Returns true when an upload happened.
    pub fn convert(&mut self) -> bool {
        let Some(textures) = self.textures.as_mut() else {
            return false;
        };
        if !get(&self.core.flags.dirty) {
            return false;
        }

        let mut planes = self.core.lock_planes();
        if !get(&self.core.flags.dirty) || planes.is_empty() {
            return false;
        }
        let planes = &mut *planes;
        let result = textures.upload(&planes.ya.lock().as_view(), &planes.uv.lock().as_view());
        set(&self.core.flags.dirty, false);
        match result {
            Ok(()) => {
                set(&self.core.flags.ready, true);
                true
            }
            Err(e) => {
                log::warn!("Movie upload failed for '{}': {e}", self.source);
                false
            }
        }
    }

    /// Convert, then draw the drawable with the movie shader bound. Nothing
    /// is drawn until the first frame has been uploaded. Returns whether a
    /// draw was issued.
    pub fn render(&mut self, rs: &mut RenderState<'_>) -> bool {
        self.convert();
        if !get(&self.core.flags.ready) {
            return false;
        }
        let Some(layout) = self.layout else {
            return false;
        };

        let uv_scale = layout.uv_scale;
        self.shader
            .set_uniforms_callback(Some(Box::new(move |u: &mut dyn UniformSink| {
                u.set_vec2(UV_SCALE_UNIFORM, uv_scale);
            })));

        let previous = rs.renderer.shader_program();
        rs.renderer.set_shader_program(self.shader.clone());
        self.drawable.draw(rs);
        rs.renderer.set_shader_program(previous);

        self.shader.set_uniforms_callback(None);
        true
    }
}
