//! The movie shader program and the contract renderers use for programs.
//!
//! One [`MovieShader`] is created at composition time and shared by every
//! player through an `Arc`. A player installs its uniform callback just for
//! the duration of its draw, so sharing is safe as long as draws happen on
//! one render thread.

use std::sync::{Mutex, PoisonError};

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::config::MovieConfig;

/// Name of the chroma-to-luma coordinate scale uniform.
pub const UV_SCALE_UNIFORM: &str = "uvScale";

/// Receives uniform values while a program prepares a draw.
pub trait UniformSink {
    fn set_vec2(&mut self, name: &str, value: Vec2);
}

pub type UniformsCallback = Box<dyn Fn(&mut dyn UniformSink) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ShaderQuality {
    /// BT.601 approximation.
    #[default]
    Fast,
    /// BT.709 with limited-range expansion.
    HighQuality,
}

impl ShaderQuality {
    pub const ALL: &[ShaderQuality] = &[ShaderQuality::Fast, ShaderQuality::HighQuality];

    pub fn display_name(self) -> &'static str {
        match self {
            ShaderQuality::Fast => "Fast",
            ShaderQuality::HighQuality => "High Quality",
        }
    }
}

/// Identifies which pipeline a draw should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProgramId {
    /// The renderer's regular sprite program.
    Default,
    /// Two-plane YUV(A) program.
    Movie(ShaderQuality),
}

pub trait ShaderProgram: Send + Sync {
    fn id(&self) -> ProgramId;

    /// Push per-draw uniforms.
    fn apply_uniforms(&self, sink: &mut dyn UniformSink);
}

/// Stand-in for the renderer's own program. Sets no uniforms.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultProgram;

impl ShaderProgram for DefaultProgram {
    fn id(&self) -> ProgramId {
        ProgramId::Default
    }

    fn apply_uniforms(&self, _sink: &mut dyn UniformSink) {}
}

pub struct MovieShader {
    quality: ShaderQuality,
    callback: Mutex<Option<UniformsCallback>>,
}

impl MovieShader {
    pub fn new(quality: ShaderQuality) -> Self {
        Self {
            quality,
            callback: Mutex::new(None),
        }
    }

    pub fn from_config(config: &MovieConfig) -> Self {
        Self::new(config.shader_quality)
    }

    pub fn quality(&self) -> ShaderQuality {
        self.quality
    }

    /// Install (or with `None`, remove) the per-draw uniform callback.
    pub fn set_uniforms_callback(&self, callback: Option<UniformsCallback>) {
        *self.callback.lock().unwrap_or_else(PoisonError::into_inner) = callback;
    }

    pub fn has_uniforms_callback(&self) -> bool {
        self.callback
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

impl ShaderProgram for MovieShader {
    fn id(&self) -> ProgramId {
        ProgramId::Movie(self.quality)
    }

    fn apply_uniforms(&self, sink: &mut dyn UniformSink) {
        let callback = self.callback.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(cb) = callback.as_ref() {
            cb(sink);
        }
    }
}

impl std::fmt::Debug for MovieShader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MovieShader")
            .field("quality", &self.quality)
            .field("has_uniforms_callback", &self.has_uniforms_callback())
            .finish()
    }
}
