use bytemuck::{Pod, Zeroable};
use glam::{Affine2, Vec2};

use crate::decoder::ChromaLayout;
use crate::render::SpriteDraw;

/// Per-draw uniforms (112 bytes).
/// Must be kept in sync with the WGSL `MovieUniforms` struct.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct MovieUniforms {
    /// Affine columns (x axis, y axis, translation), padded to vec4.
    pub transform: [[f32; 4]; 3],
    // 48 bytes
    pub viewport: [f32; 2],
    pub size: [f32; 2],
    pub tex_pos: [f32; 2],
    pub tex_size: [f32; 2],
    // 80 bytes
    pub uv_scale: [f32; 2],
    pub alpha: f32,
    pub has_alpha: f32,
    // 96 bytes
    /// 1.0 when the chroma texture holds V in its second channel.
    pub interleaved_chroma: f32,
    pub _pad: [f32; 3],
    // 112 bytes
}

fn column(v: Vec2) -> [f32; 4] {
    [v.x, v.y, 0.0, 0.0]
}

impl MovieUniforms {
    pub fn new(sprite: &SpriteDraw, viewport: Vec2, uv_scale: Vec2) -> Self {
        let Affine2 {
            matrix2,
            translation,
        } = sprite.transform;
        Self {
            transform: [
                column(matrix2.x_axis),
                column(matrix2.y_axis),
                column(translation),
            ],
            viewport: viewport.max(Vec2::ONE).to_array(),
            size: sprite.size.to_array(),
            tex_pos: sprite.frame.tex_rect.pos.to_array(),
            tex_size: sprite.frame.tex_rect.size.to_array(),
            uv_scale: uv_scale.to_array(),
            alpha: sprite.alpha.clamp(0.0, 1.0),
            has_alpha: if sprite.blend == crate::render::BlendMode::PremultipliedAlpha {
                1.0
            } else {
                0.0
            },
            interleaved_chroma: if sprite.frame.chroma == ChromaLayout::Interleaved {
                1.0
            } else {
                0.0
            },
            _pad: [0.0; 3],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{MovieRect, TexRect};
    use crate::render::{BlendMode, MovieFrame};
    use crate::texture::TextureHandle;

    #[test]
    fn layout_matches_wgsl() {
        assert_eq!(std::mem::size_of::<MovieUniforms>(), 112);
        assert_eq!(std::mem::size_of::<MovieUniforms>() % 16, 0);
    }

    #[test]
    fn packs_sprite_draw() {
        let sprite = SpriteDraw {
            frame: MovieFrame {
                ya: TextureHandle(1),
                uv: TextureHandle(2),
                chroma: ChromaLayout::Interleaved,
                premultiplied: true,
                tex_rect: TexRect {
                    pos: Vec2::new(0.125, 0.0),
                    size: Vec2::new(0.75, 0.5),
                },
                src_rect: MovieRect::new(16, 0, 96, 32),
                size: Vec2::new(96.0, 32.0),
            },
            blend: BlendMode::PremultipliedAlpha,
            transform: Affine2::from_translation(Vec2::new(5.0, 6.0)),
            alpha: 2.0,
            size: Vec2::new(96.0, 32.0),
        };
        let u = MovieUniforms::new(&sprite, Vec2::new(800.0, 600.0), Vec2::new(0.5, 0.5));
        assert_eq!(u.transform[0], [1.0, 0.0, 0.0, 0.0]);
        assert_eq!(u.transform[2], [5.0, 6.0, 0.0, 0.0]);
        assert_eq!(u.tex_pos, [0.125, 0.0]);
        assert_eq!(u.uv_scale, [0.5, 0.5]);
        assert_eq!(u.alpha, 1.0);
        assert_eq!(u.has_alpha, 1.0);
        assert_eq!(u.interleaved_chroma, 1.0);

        let mut single = sprite;
        single.frame.chroma = ChromaLayout::SingleChannel;
        let u = MovieUniforms::new(&single, Vec2::new(800.0, 600.0), Vec2::new(0.5, 0.5));
        assert_eq!(u.interleaved_chroma, 0.0);
    }
}
