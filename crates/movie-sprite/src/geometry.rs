//! Movie rectangle, power-of-two padding and the derived plane layout.
//!
//! GPU textures are allocated at power-of-two sizes while the visible movie
//! generally is not, so the layout carries the normalized sub-rectangle the
//! movie occupies inside the padded luma texture.

use glam::{UVec2, Vec2};

/// Source rectangle of the visible movie, in buffer pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MovieRect {
    pub origin: UVec2,
    pub size: UVec2,
}

impl MovieRect {
    pub const EMPTY: MovieRect = MovieRect {
        origin: UVec2::ZERO,
        size: UVec2::ZERO,
    };

    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            origin: UVec2::new(x, y),
            size: UVec2::new(width, height),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.size.x == 0 || self.size.y == 0
    }
}

/// Normalized texture-coordinate rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TexRect {
    pub pos: Vec2,
    pub size: Vec2,
}

/// What the decoder reports for a session: where the movie sits and how
/// large a buffer it wants to decode into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MovieGeometry {
    pub movie_rect: MovieRect,
    pub buffer_size: UVec2,
}

impl MovieGeometry {
    pub fn new(movie_rect: MovieRect, buffer_size: UVec2) -> Self {
        Self {
            movie_rect,
            buffer_size,
        }
    }

    /// Movie fills the whole buffer.
    pub fn from_size(width: u32, height: u32) -> Self {
        Self {
            movie_rect: MovieRect::new(0, 0, width, height),
            buffer_size: UVec2::new(width, height),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.buffer_size.x == 0 || self.buffer_size.y == 0
    }
}

/// Smallest power of two >= `v` (1 for 0). `None` above `1 << 31`.
pub fn next_pot(v: u32) -> Option<u32> {
    v.max(1).checked_next_power_of_two()
}

pub fn next_pot2(v: UVec2) -> Option<UVec2> {
    Some(UVec2::new(next_pot(v.x)?, next_pot(v.y)?))
}

/// Chroma plane dimensions for a 4:2:0 luma size. Odd sizes round up so the
/// last chroma column/row is kept.
pub fn chroma_size(luma: UVec2) -> UVec2 {
    luma / 2 + luma % 2
}

/// Padded plane sizes and the coordinates the shader samples with.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PlaneLayout {
    /// Padded luma(+alpha) texture size.
    pub ya_size: UVec2,
    /// Padded chroma texture size.
    pub uv_size: UVec2,
    pub movie_rect: MovieRect,
    /// Movie rect in the padded luma texture's normalized space.
    pub tex_rect: TexRect,
    /// Padded chroma size / padded luma size, per axis.
    pub uv_scale: Vec2,
}

impl PlaneLayout {
    /// `None` when the buffer is too large to pad to a power of two.
    pub fn compute(geometry: &MovieGeometry) -> Option<Self> {
        let ya_size = next_pot2(geometry.buffer_size)?;
        let uv_size = next_pot2(chroma_size(geometry.buffer_size))?;

        let ya = ya_size.as_vec2();
        let mr = geometry.movie_rect;
        let tex_rect = TexRect {
            pos: mr.origin.as_vec2() / ya,
            size: mr.size.as_vec2() / ya,
        };

        Some(Self {
            ya_size,
            uv_size,
            movie_rect: mr,
            tex_rect,
            uv_scale: uv_size.as_vec2() / ya,
        })
    }
}
