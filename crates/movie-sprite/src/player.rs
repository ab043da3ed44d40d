//! Playback controller.
//!
//! [`MoviePlayer`] owns a session's plane buffers (inside the shared core),
//! its texture pair and its decoder, and drives the lifecycle
//! `set_movie -> play -> pause/resume -> stop`. Every lifecycle call is a
//! no-op when its precondition does not hold; none of them fail.

use std::sync::Arc;

use glam::{UVec2, Vec2};

use crate::buffer::PixelFormat;
use crate::config::MovieConfig;
use crate::decoder::{Decoder, DecoderError, SessionSetup, UpdateState};
use crate::events::{ListenerId, MovieEvent};
use crate::geometry::{MovieGeometry, PlaneLayout};
use crate::queue::MainThreadQueue;
use crate::render::{BlendMode, Drawable, MovieFrame};
use crate::shader::MovieShader;
use crate::shared::{PlaybackState, PlayerCore, get, set};
use crate::sink::FrameSink;
use crate::texture::{PlaneTextures, TextureFactory, TextureHandle};

/// Coarse lifecycle position, derived from the playback flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    Uninitialized,
    Initialized,
    Playing,
    Paused,
}

pub struct MoviePlayer {
    pub(crate) core: Arc<PlayerCore>,
    decoder: Box<dyn Decoder>,
    factory: Arc<dyn TextureFactory>,
    pub(crate) textures: Option<PlaneTextures>,
    pub(crate) drawable: Box<dyn Drawable>,
    pub(crate) shader: Arc<MovieShader>,
    queue: MainThreadQueue,
    pub(crate) source: String,
    geometry: MovieGeometry,
    pub(crate) layout: Option<PlaneLayout>,
    volume: u8,
}

impl MoviePlayer {
    pub fn new(
        decoder: Box<dyn Decoder>,
        factory: Arc<dyn TextureFactory>,
        drawable: Box<dyn Drawable>,
        shader: Arc<MovieShader>,
        queue: MainThreadQueue,
    ) -> Self {
        Self {
            core: Arc::new(PlayerCore::new()),
            decoder,
            factory,
            textures: None,
            drawable,
            shader,
            queue,
            source: String::new(),
            geometry: MovieGeometry::default(),
            layout: None,
            volume: 100,
        }
    }

    /// Apply the configured default volume and looping.
    pub fn with_config(mut self, config: &MovieConfig) -> Self {
        self.set_volume(i32::from(config.volume));
        self.set_looped(config.looped);
        self
    }

    /// Switch to a new source. Any current session is torn down first and
    /// buffers and textures are rebuilt for the new one.
    pub fn set_movie(&mut self, source: impl Into<String>, has_alpha: bool) {
        self.clear();
        self.source = source.into();
        set(&self.core.flags.has_alpha_channel, has_alpha);
        self.init_player();
    }

    /// Build the session: ask the decoder for its geometry, then allocate
    /// both planes, both textures and the drawable frame. Does nothing if
    /// already initialized. A decoder failure leaves the player cleared.
    pub fn init_player(&mut self) {
        if get(&self.core.flags.initialized) {
            return;
        }

        let has_alpha = get(&self.core.flags.has_alpha_channel);
        let result = {
            let setup = SessionSetup {
                source: &self.source,
                has_alpha,
                sink: FrameSink::new(&self.core, self.queue.clone()),
            };
            self.decoder.init_player(&setup)
        };
        let geometry = match result {
            Ok(g) if !g.is_empty() && !g.movie_rect.is_empty() => g,
            Ok(g) => {
                log::error!(
                    "Movie '{}' reported an empty size {}x{}",
                    self.source,
                    g.buffer_size.x,
                    g.buffer_size.y
                );
                self.clear();
                return;
            }
            Err(e) => {
                log::error!("Failed to open movie '{}': {e}", self.source);
                self.clear();
                return;
            }
        };
        let Some(layout) = PlaneLayout::compute(&geometry) else {
            log::error!(
                "Failed to open movie '{}': {}",
                self.source,
                DecoderError::InvalidSize {
                    width: geometry.buffer_size.x,
                    height: geometry.buffer_size.y,
                }
            );
            self.clear();
            return;
        };
        set(&self.core.flags.initialized, true);

        let chroma = self.decoder.chroma_layout();
        let uv_format = chroma.pixel_format();
        let ya_format = if has_alpha {
            PixelFormat::LA8
        } else {
            PixelFormat::L8
        };
        {
            let mut planes = self.core.lock_planes();
            planes.uv.init(layout.uv_size.x, layout.uv_size.y, uv_format);
            planes.uv.fill_zero();
            planes.ya.init(layout.ya_size.x, layout.ya_size.y, ya_format);
            planes.ya.fill_zero();
        }
        let textures = PlaneTextures::create(self.factory.as_ref(), &layout, ya_format, uv_format);

        self.drawable.set_blend_mode(if has_alpha {
            BlendMode::PremultipliedAlpha
        } else {
            BlendMode::Disabled
        });
        match textures.handles() {
            Some((ya, uv)) => {
                let size = self.drawable.size();
                self.drawable.set_frame(Some(MovieFrame {
                    ya,
                    uv,
                    chroma,
                    premultiplied: true,
                    tex_rect: layout.tex_rect,
                    src_rect: geometry.movie_rect,
                    size: geometry.movie_rect.size.as_vec2(),
                }));
                if size != Vec2::ZERO {
                    self.drawable.set_size(size);
                }
            }
            None => log::warn!("Movie textures for '{}' have no handles", self.source),
        }

        self.textures = Some(textures);
        self.geometry = geometry;
        self.layout = Some(layout);
        log::info!(
            "Movie '{}' initialized: {}x{} (YA {}x{} {}, UV {}x{} {})",
            self.source,
            geometry.movie_rect.size.x,
            geometry.movie_rect.size.y,
            layout.ya_size.x,
            layout.ya_size.y,
            ya_format.display_name(),
            layout.uv_size.x,
            layout.uv_size.y,
            uv_format.display_name(),
        );
    }

    /// Start playback, or resume it when paused.
    pub fn play(&mut self) {
        let flags = &self.core.flags;
        if get(&flags.playing) {
            if get(&flags.paused) {
                self.decoder.resume();
                set(&flags.paused, false);
                log::debug!("Movie '{}' resumed", self.source);
            }
            return;
        }

        set(&flags.playing, true);
        self.init_player();
        let flags = &self.core.flags;
        if !get(&flags.initialized) {
            set(&flags.playing, false);
            return;
        }
        set(&flags.complete_dispatched, false);
        self.decoder.play();
        log::debug!("Movie '{}' playing", self.source);
    }

    pub fn pause(&mut self) {
        let flags = &self.core.flags;
        if get(&flags.paused) || !get(&flags.playing) {
            return;
        }
        self.decoder.pause();
        set(&flags.paused, true);
        log::debug!("Movie '{}' paused", self.source);
    }

    /// Stop and release everything the session holds.
    pub fn stop(&mut self) {
        if get(&self.core.flags.initialized) {
            self.decoder.stop();
        }
        self.clear();
    }

    /// Tear the session down from any state. Safe to call repeatedly.
    pub fn clear(&mut self) {
        let was_initialized = get(&self.core.flags.initialized);
        // Invalidate the sink and any queued completion before the decoder
        // is told to quiesce.
        self.core.next_session();
        self.decoder.clear();

        let flags = &self.core.flags;
        set(&flags.playing, false);
        set(&flags.paused, false);
        set(&flags.ready, false);

        if let Some(mut textures) = self.textures.take() {
            textures.release();
        }
        self.geometry = MovieGeometry::default();
        self.layout = None;
        self.drawable.set_frame(None);
        set(&flags.initialized, false);

        {
            let mut planes = self.core.lock_planes();
            planes.uv.cleanup();
            planes.ya.cleanup();
            set(&flags.dirty, false);
        }
        if was_initialized {
            log::info!("Movie '{}' cleared", self.source);
        }
    }

    /// 0..=100, clamped.
    pub fn set_volume(&mut self, volume: i32) {
        let v = u8::try_from(volume.clamp(0, 100)).unwrap_or(100);
        self.volume = v;
        self.decoder.set_volume(f32::from(v) / 100.0);
    }

    pub fn volume(&self) -> u8 {
        self.volume
    }

    pub fn set_looped(&mut self, looped: bool) {
        set(&self.core.flags.looped, looped);
    }

    pub fn is_looped(&self) -> bool {
        get(&self.core.flags.looped)
    }

    pub fn is_playing(&self) -> bool {
        self.core.flags.snapshot().is_playing()
    }

    /// Size of the visible movie, zero when no session is initialized.
    pub fn movie_size(&self) -> UVec2 {
        self.geometry.movie_rect.size
    }

    /// Per-tick hook for decoders that advance on the host's clock.
    pub fn update(&mut self, state: &UpdateState) {
        self.decoder.update(state);
    }

    pub fn add_event_listener<F>(&self, event: MovieEvent, callback: F) -> ListenerId
    where
        F: FnMut(&MovieEvent) + Send + 'static,
    {
        self.core.events.add_listener(event, callback)
    }

    pub fn remove_event_listener(&self, id: ListenerId) -> bool {
        self.core.events.remove_listener(id)
    }

    pub fn state(&self) -> PlaybackState {
        self.core.flags.snapshot()
    }

    pub fn player_state(&self) -> PlayerState {
        let s = self.state();
        match (s.initialized, s.playing, s.paused) {
            (false, _, _) => PlayerState::Uninitialized,
            (true, true, true) => PlayerState::Paused,
            (true, true, false) => PlayerState::Playing,
            (true, false, _) => PlayerState::Initialized,
        }
    }

    pub fn has_alpha_channel(&self) -> bool {
        get(&self.core.flags.has_alpha_channel)
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn geometry(&self) -> MovieGeometry {
        self.geometry
    }

    pub fn layout(&self) -> Option<PlaneLayout> {
        self.layout
    }

    /// (YA, UV) handles while a session is initialized.
    pub fn texture_handles(&self) -> Option<(TextureHandle, TextureHandle)> {
        self.textures.as_ref().and_then(PlaneTextures::handles)
    }

    /// A frame has been uploaded and can be drawn.
    pub fn is_ready(&self) -> bool {
        get(&self.core.flags.ready)
    }

    /// Whether the decoder is producing frames right now.
    pub fn is_decoding(&self) -> bool {
        self.decoder.is_playing()
    }

    pub fn drawable(&self) -> &dyn Drawable {
        self.drawable.as_ref()
    }

    pub fn drawable_mut(&mut self) -> &mut dyn Drawable {
        self.drawable.as_mut()
    }

    pub fn shader(&self) -> &Arc<MovieShader> {
        &self.shader
    }
}

impl Drop for MoviePlayer {
    fn drop(&mut self) {
        self.clear();
    }
}
