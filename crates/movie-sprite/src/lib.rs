//! Double-buffered YUV(A) movie sprite.
//!
//! A decoder thread writes luma(+alpha) and chroma planes into CPU buffers
//! through a [`FrameSink`]; the render thread uploads them to two textures
//! with [`MoviePlayer::convert`] and draws them with the shared
//! [`MovieShader`] in [`MoviePlayer::render`]. End of stream is reported as
//! [`MovieEvent::Complete`] on whichever thread drains the
//! [`MainThreadQueue`].

pub mod buffer;
pub mod config;
pub mod decoder;
pub mod events;
pub mod geometry;
pub mod gpu;
pub mod player;
pub mod queue;
pub mod render;
pub mod shader;
mod shared;
pub mod sink;
pub mod texture;

#[cfg(test)]
mod testing;

pub use buffer::{MovieBuffer, PixelFormat, PlaneView, PlaneViewMut};
pub use config::MovieConfig;
pub use decoder::{ChromaLayout, Decoder, DecoderError, SessionSetup, UpdateState};
pub use events::{ListenerId, MovieEvent};
pub use geometry::{MovieGeometry, MovieRect, PlaneLayout, TexRect};
pub use player::{MoviePlayer, PlayerState};
pub use queue::MainThreadQueue;
pub use render::{BlendMode, Drawable, MovieFrame, QuadSprite, RenderState, Renderer, SpriteDraw};
pub use shader::{MovieShader, ShaderProgram, ShaderQuality};
pub use shared::PlaybackState;
pub use sink::FrameSink;
pub use texture::{TextureFactory, TextureHandle, UploadTarget};
