use std::sync::Arc;

use glam::Vec2;

use crate::render::{Renderer, SpriteDraw};
use crate::shader::{DefaultProgram, ProgramId, ShaderProgram, ShaderQuality, UV_SCALE_UNIFORM, UniformSink};

/// A sprite draw resolved against the program that was bound for it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawCall {
    pub program: ProgramId,
    pub sprite: SpriteDraw,
    pub uv_scale: Vec2,
}

impl DrawCall {
    /// Movie shader variant, `None` for draws made with another program.
    pub fn quality(&self) -> Option<ShaderQuality> {
        match self.program {
            ProgramId::Movie(q) => Some(q),
            ProgramId::Default => None,
        }
    }
}

#[derive(Default)]
struct UniformRecorder {
    uv_scale: Option<Vec2>,
}

impl UniformSink for UniformRecorder {
    fn set_vec2(&mut self, name: &str, value: Vec2) {
        if name == UV_SCALE_UNIFORM {
            self.uv_scale = Some(value);
        } else {
            log::debug!("Ignoring unknown movie uniform '{name}'");
        }
    }
}

/// Collects draws for a frame; [`super::MoviePipeline::encode`] replays them
/// into a render pass.
pub struct QueuedRenderer {
    program: Arc<dyn ShaderProgram>,
    calls: Vec<DrawCall>,
}

impl QueuedRenderer {
    pub fn new() -> Self {
        Self {
            program: Arc::new(DefaultProgram),
            calls: Vec::new(),
        }
    }

    pub fn calls(&self) -> &[DrawCall] {
        &self.calls
    }

    pub fn take_calls(&mut self) -> Vec<DrawCall> {
        std::mem::take(&mut self.calls)
    }
}

impl Default for QueuedRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for QueuedRenderer {
    fn shader_program(&self) -> Arc<dyn ShaderProgram> {
        self.program.clone()
    }

    fn set_shader_program(&mut self, program: Arc<dyn ShaderProgram>) {
        self.program = program;
    }

    fn draw_sprite(&mut self, sprite: &SpriteDraw) {
        let mut uniforms = UniformRecorder::default();
        self.program.apply_uniforms(&mut uniforms);
        self.calls.push(DrawCall {
            program: self.program.id(),
            sprite: *sprite,
            uv_scale: uniforms.uv_scale.unwrap_or(Vec2::splat(0.5)),
        });
    }
}
