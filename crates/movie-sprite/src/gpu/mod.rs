//! wgpu backend: plane textures, the YUV(A) pipeline and a draw recorder
//! that replays into a render pass.

pub mod context;
pub mod pipeline;
pub mod renderer;
pub mod texture;
pub mod uniforms;

pub use context::HeadlessGpu;
pub use pipeline::MoviePipeline;
pub use renderer::{DrawCall, QueuedRenderer};
pub use texture::{TextureRegistry, WgpuTextureFactory};
pub use uniforms::MovieUniforms;
