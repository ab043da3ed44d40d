//! Fakes shared by the unit tests.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use glam::{UVec2, Vec2};

use crate::buffer::{PixelFormat, PlaneView};
use crate::decoder::{ChromaLayout, Decoder, DecoderError, SessionSetup, UpdateState};
use crate::geometry::MovieGeometry;
use crate::player::MoviePlayer;
use crate::queue::MainThreadQueue;
use crate::render::{BlendMode, Drawable, MovieFrame, RenderState, Renderer, SpriteDraw};
use crate::shader::{DefaultProgram, MovieShader, ProgramId, ShaderProgram, ShaderQuality, UniformSink};
use crate::sink::FrameSink;
use crate::texture::{TextureFactory, TextureHandle, UploadTarget, check_region};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// --- decoder ---

#[derive(Debug, Clone, PartialEq)]
pub enum DecoderCall {
    InitPlayer { source: String, has_alpha: bool },
    Play,
    Pause,
    Resume,
    Stop,
    Clear,
    SetVolume(f32),
    Update,
}

#[derive(Default)]
struct ProbeState {
    calls: Vec<DecoderCall>,
    sink: Option<FrameSink>,
}

/// Test-side view of a [`RecordingDecoder`] owned by a player.
#[derive(Clone, Default)]
pub struct DecoderProbe {
    state: Arc<Mutex<ProbeState>>,
}

impl DecoderProbe {
    pub fn calls(&self) -> Vec<DecoderCall> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Sink from the latest `init_player`.
    pub fn sink(&self) -> Option<FrameSink> {
        self.state.lock().unwrap().sink.clone()
    }

    /// Write a frame with every YA byte `ya` and every UV byte `uv`.
    pub fn write_fill(&self, ya: u8, uv: u8) -> bool {
        self.sink().is_some_and(|sink| {
            sink.write_frame(|y, c| {
                y.data_mut().fill(ya);
                c.data_mut().fill(uv);
            })
        })
    }
}

pub struct RecordingDecoder {
    probe: DecoderProbe,
    geometry: Option<MovieGeometry>,
    chroma: ChromaLayout,
    playing: bool,
}

impl RecordingDecoder {
    /// `None` geometry makes `init_player` fail.
    pub fn new(geometry: Option<MovieGeometry>, chroma: ChromaLayout) -> (Self, DecoderProbe) {
        let probe = DecoderProbe::default();
        (
            Self {
                probe: probe.clone(),
                geometry,
                chroma,
                playing: false,
            },
            probe,
        )
    }

    fn record(&self, call: DecoderCall) {
        self.probe.state.lock().unwrap().calls.push(call);
    }
}

impl Decoder for RecordingDecoder {
    fn init_player(&mut self, setup: &SessionSetup<'_>) -> Result<MovieGeometry, DecoderError> {
        self.record(DecoderCall::InitPlayer {
            source: setup.source.to_string(),
            has_alpha: setup.has_alpha,
        });
        self.probe.state.lock().unwrap().sink = Some(setup.sink.clone());
        self.geometry
            .ok_or_else(|| DecoderError::Probe(format!("cannot open {}", setup.source)))
    }

    fn play(&mut self) {
        self.playing = true;
        self.record(DecoderCall::Play);
    }

    fn pause(&mut self) {
        self.playing = false;
        self.record(DecoderCall::Pause);
    }

    fn resume(&mut self) {
        self.playing = true;
        self.record(DecoderCall::Resume);
    }

    fn stop(&mut self) {
        self.playing = false;
        self.record(DecoderCall::Stop);
    }

    fn clear(&mut self) {
        self.playing = false;
        self.record(DecoderCall::Clear);
    }

    fn set_volume(&mut self, volume: f32) {
        self.record(DecoderCall::SetVolume(volume));
    }

    fn is_playing(&self) -> bool {
        self.playing
    }

    fn update(&mut self, _state: &UpdateState) {
        self.record(DecoderCall::Update);
    }

    fn chroma_layout(&self) -> ChromaLayout {
        self.chroma
    }
}

// --- textures ---

#[derive(Debug, Clone)]
pub struct FakeUpload {
    pub handle: TextureHandle,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub bytes: Vec<u8>,
}

#[derive(Default)]
struct FakeGpu {
    next_id: u64,
    live: HashSet<TextureHandle>,
    formats: Vec<PixelFormat>,
    uploads: Vec<FakeUpload>,
}

#[derive(Clone, Default)]
pub struct FakeTextureFactory {
    gpu: Arc<Mutex<FakeGpu>>,
}

impl FakeTextureFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn live_count(&self) -> usize {
        self.gpu.lock().unwrap().live.len()
    }

    pub fn is_live(&self, handle: TextureHandle) -> bool {
        self.gpu.lock().unwrap().live.contains(&handle)
    }

    /// Formats passed to `init`, in call order.
    pub fn formats(&self) -> Vec<PixelFormat> {
        self.gpu.lock().unwrap().formats.clone()
    }

    pub fn uploads(&self) -> Vec<FakeUpload> {
        self.gpu.lock().unwrap().uploads.clone()
    }

    pub fn upload_count(&self) -> usize {
        self.gpu.lock().unwrap().uploads.len()
    }
}

impl TextureFactory for FakeTextureFactory {
    fn create_texture(&self) -> Box<dyn UploadTarget> {
        Box::new(FakeTexture {
            gpu: self.gpu.clone(),
            handle: None,
            size: UVec2::ZERO,
            format: PixelFormat::L8,
        })
    }
}

struct FakeTexture {
    gpu: Arc<Mutex<FakeGpu>>,
    handle: Option<TextureHandle>,
    size: UVec2,
    format: PixelFormat,
}

impl UploadTarget for FakeTexture {
    fn init(&mut self, width: u32, height: u32, format: PixelFormat, _mipmaps: bool) {
        self.release();
        let mut gpu = self.gpu.lock().unwrap();
        gpu.next_id += 1;
        let handle = TextureHandle(gpu.next_id);
        gpu.live.insert(handle);
        gpu.formats.push(format);
        self.handle = Some(handle);
        self.size = UVec2::new(width, height);
        self.format = format;
    }

    fn update_region(&mut self, x: u32, y: u32, view: &PlaneView<'_>) -> Result<(), crate::texture::TextureError> {
        check_region(self.size, self.format, x, y, view)?;
        let handle = self.handle.ok_or(crate::texture::TextureError::NotInitialized)?;
        self.gpu.lock().unwrap().uploads.push(FakeUpload {
            handle,
            width: view.width(),
            height: view.height(),
            format: view.format(),
            bytes: view.data().to_vec(),
        });
        Ok(())
    }

    fn release(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.gpu.lock().unwrap().live.remove(&handle);
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

// --- rendering ---

#[derive(Debug, Default)]
pub struct UniformCapture {
    pub values: Vec<(String, Vec2)>,
}

impl UniformCapture {
    pub fn get(&self, name: &str) -> Option<Vec2> {
        self.values.iter().find(|(n, _)| n == name).map(|(_, v)| *v)
    }
}

impl UniformSink for UniformCapture {
    fn set_vec2(&mut self, name: &str, value: Vec2) {
        self.values.push((name.to_string(), value));
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DrawRecord {
    pub program: ProgramId,
    pub uniforms: Vec<(String, Vec2)>,
}

#[derive(Debug, Default)]
pub struct DrawableState {
    pub frame: Option<MovieFrame>,
    pub blend: BlendMode,
    pub size: Vec2,
    pub draws: Vec<DrawRecord>,
}

pub struct RecordingDrawable {
    state: Arc<Mutex<DrawableState>>,
}

impl RecordingDrawable {
    pub fn new() -> (Self, Arc<Mutex<DrawableState>>) {
        let state = Arc::new(Mutex::new(DrawableState::default()));
        (
            Self {
                state: state.clone(),
            },
            state,
        )
    }
}

impl Drawable for RecordingDrawable {
    fn set_frame(&mut self, frame: Option<MovieFrame>) {
        let mut s = self.state.lock().unwrap();
        if let Some(f) = frame {
            s.size = f.size;
        }
        s.frame = frame;
    }

    fn frame(&self) -> Option<MovieFrame> {
        self.state.lock().unwrap().frame
    }

    fn set_blend_mode(&mut self, blend: BlendMode) {
        self.state.lock().unwrap().blend = blend;
    }

    fn blend_mode(&self) -> BlendMode {
        self.state.lock().unwrap().blend
    }

    fn size(&self) -> Vec2 {
        self.state.lock().unwrap().size
    }

    fn set_size(&mut self, size: Vec2) {
        self.state.lock().unwrap().size = size;
    }

    fn draw(&mut self, rs: &mut RenderState<'_>) {
        let program = rs.renderer.shader_program();
        let mut capture = UniformCapture::default();
        program.apply_uniforms(&mut capture);

        let mut s = self.state.lock().unwrap();
        s.draws.push(DrawRecord {
            program: program.id(),
            uniforms: capture.values,
        });
        if let Some(frame) = s.frame {
            rs.renderer.draw_sprite(&SpriteDraw {
                frame,
                blend: s.blend,
                transform: rs.transform,
                alpha: rs.alpha,
                size: s.size,
            });
        }
    }
}

pub struct FakeRenderer {
    program: Arc<dyn ShaderProgram>,
    pub sprites: Vec<(ProgramId, SpriteDraw)>,
}

impl FakeRenderer {
    pub fn new() -> Self {
        Self {
            program: Arc::new(DefaultProgram),
            sprites: Vec::new(),
        }
    }
}

impl Renderer for FakeRenderer {
    fn shader_program(&self) -> Arc<dyn ShaderProgram> {
        self.program.clone()
    }

    fn set_shader_program(&mut self, program: Arc<dyn ShaderProgram>) {
        self.program = program;
    }

    fn draw_sprite(&mut self, sprite: &SpriteDraw) {
        self.sprites.push((self.program.id(), *sprite));
    }
}

// --- player ---

/// A player wired to fakes, with `set_movie("clip.webm", ..)` already done.
pub struct TestRig {
    pub player: MoviePlayer,
    pub probe: DecoderProbe,
    pub factory: FakeTextureFactory,
    pub drawable: Arc<Mutex<DrawableState>>,
    pub shader: Arc<MovieShader>,
    pub queue: MainThreadQueue,
}

impl TestRig {
    pub fn new(geometry: MovieGeometry) -> Self {
        Self::build(geometry, false, ChromaLayout::Interleaved)
    }

    pub fn with_alpha(geometry: MovieGeometry, has_alpha: bool) -> Self {
        Self::build(geometry, has_alpha, ChromaLayout::Interleaved)
    }

    pub fn build(geometry: MovieGeometry, has_alpha: bool, chroma: ChromaLayout) -> Self {
        Self::assemble(Some(geometry), has_alpha, chroma)
    }

    /// Decoder refuses to open anything.
    pub fn failing() -> Self {
        Self::assemble(None, false, ChromaLayout::Interleaved)
    }

    fn assemble(geometry: Option<MovieGeometry>, has_alpha: bool, chroma: ChromaLayout) -> Self {
        let (decoder, probe) = RecordingDecoder::new(geometry, chroma);
        let factory = FakeTextureFactory::new();
        let (drawable, drawable_state) = RecordingDrawable::new();
        let shader = Arc::new(MovieShader::new(ShaderQuality::Fast));
        let queue = MainThreadQueue::new();
        let mut player = MoviePlayer::new(
            Box::new(decoder),
            Arc::new(factory.clone()),
            Box::new(drawable),
            shader.clone(),
            queue.clone(),
        );
        player.set_movie("clip.webm", has_alpha);
        Self {
            player,
            probe,
            factory,
            drawable: drawable_state,
            shader,
            queue,
        }
    }
}
