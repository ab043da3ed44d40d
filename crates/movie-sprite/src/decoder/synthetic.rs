//! Test-pattern decoder. Produces moving YUV(A) ramps on a background
//! thread at a fixed rate, with no external dependencies.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use super::planar::{Yuv420Frame, pack_yuv420};
use super::worker::{Worker, WorkerControl};
use super::{ChromaLayout, Decoder, DecoderError, SessionSetup};
use crate::config::MovieConfig;
use crate::geometry::MovieGeometry;
use crate::sink::FrameSink;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyntheticSettings {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    /// Frames until end of stream. 0 runs forever.
    pub frame_count: u32,
}

impl Default for SyntheticSettings {
    fn default() -> Self {
        Self {
            width: 320,
            height: 180,
            fps: 30.0,
            frame_count: 90,
        }
    }
}

/// Frame rate from the config, everything else at its default. A rate that
/// is not a positive number keeps the default rate.
impl From<&MovieConfig> for SyntheticSettings {
    fn from(config: &MovieConfig) -> Self {
        let defaults = Self::default();
        let fps = if config.synthetic_fps.is_finite() && config.synthetic_fps > 0.0 {
            config.synthetic_fps
        } else {
            defaults.fps
        };
        Self { fps, ..defaults }
    }
}

pub struct SyntheticDecoder {
    settings: SyntheticSettings,
    chroma: ChromaLayout,
    sink: Option<FrameSink>,
    has_alpha: bool,
    worker: Option<Worker>,
    volume: f32,
    frames_written: Arc<AtomicU64>,
}

impl SyntheticDecoder {
    pub fn new(settings: SyntheticSettings) -> Self {
        Self {
            settings,
            chroma: ChromaLayout::Interleaved,
            sink: None,
            has_alpha: false,
            worker: None,
            volume: 1.0,
            frames_written: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn with_chroma_layout(mut self, chroma: ChromaLayout) -> Self {
        self.chroma = chroma;
        self
    }

    pub fn settings(&self) -> &SyntheticSettings {
        &self.settings
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Frames delivered to the player since creation.
    pub fn frames_written(&self) -> u64 {
        self.frames_written.load(Ordering::Relaxed)
    }

    fn stop_worker(&mut self) {
        if let Some(mut worker) = self.worker.take() {
            worker.stop();
        }
    }
}

impl Decoder for SyntheticDecoder {
    fn init_player(&mut self, setup: &SessionSetup<'_>) -> Result<MovieGeometry, DecoderError> {
        let SyntheticSettings { width, height, .. } = self.settings;
        if width == 0 || height == 0 {
            return Err(DecoderError::InvalidSize { width, height });
        }
        self.stop_worker();
        self.sink = Some(setup.sink.clone());
        self.has_alpha = setup.has_alpha;
        log::info!(
            "Synthetic decoder: {width}x{height} @ {:.1} fps for '{}'",
            self.settings.fps,
            setup.source
        );
        Ok(MovieGeometry::from_size(width, height))
    }

    fn play(&mut self) {
        let Some(sink) = self.sink.clone() else {
            log::warn!("Synthetic decoder: play() without a session");
            return;
        };
        self.stop_worker();

        let settings = self.settings;
        let has_alpha = self.has_alpha;
        let frames = self.frames_written.clone();
        match Worker::spawn("movie-synthetic", move |control| {
            run(&control, &sink, settings, has_alpha, &frames);
        }) {
            Ok(worker) => self.worker = Some(worker),
            Err(e) => log::error!("Synthetic decoder: {e}"),
        }
    }

    fn pause(&mut self) {
        if let Some(worker) = &self.worker {
            worker.pause();
        }
    }

    fn resume(&mut self) {
        if let Some(worker) = &self.worker {
            worker.resume();
        }
    }

    fn stop(&mut self) {
        self.stop_worker();
    }

    fn clear(&mut self) {
        self.stop_worker();
        self.sink = None;
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
    }

    fn is_playing(&self) -> bool {
        self.worker
            .as_ref()
            .is_some_and(|w| w.is_running() && !w.is_paused())
    }

    fn chroma_layout(&self) -> ChromaLayout {
        self.chroma
    }
}

impl Drop for SyntheticDecoder {
    fn drop(&mut self) {
        self.stop_worker();
    }
}

fn run(
    control: &WorkerControl,
    sink: &FrameSink,
    settings: SyntheticSettings,
    has_alpha: bool,
    frames: &AtomicU64,
) {
    let SyntheticSettings {
        width,
        height,
        fps,
        frame_count,
    } = settings;
    let interval = Duration::from_secs_f64(1.0 / fps.max(1.0));
    let mut data = vec![0u8; Yuv420Frame::frame_size(width, height, has_alpha)];
    let mut index = 0u32;
    let mut next = Instant::now();

    while control.wait_while_paused() {
        fill_pattern(&mut data, width, height, has_alpha, index);
        if let Some(frame) = Yuv420Frame::split(&data, width, height, has_alpha)
            && sink.write_frame(|ya, uv| pack_yuv420(&frame, ya, uv))
        {
            frames.fetch_add(1, Ordering::Relaxed);
        }

        index += 1;
        if frame_count > 0 && index >= frame_count {
            if sink.is_looped() {
                index = 0;
            } else {
                sink.async_done();
                return;
            }
        }

        next = (next + interval).max(Instant::now());
        if !control.sleep_until(next) {
            return;
        }
    }
}

/// Diagonal luma ramp scrolling with `index`, horizontal alpha ramp and a
/// chroma split between left and right halves.
fn fill_pattern(data: &mut [u8], width: u32, height: u32, has_alpha: bool, index: u32) {
    let (w, h) = (width as usize, height as usize);
    let (cw, ch) = (w.div_ceil(2), h.div_ceil(2));
    let luma = w * h;
    let chroma = cw * ch;
    let shift = index as usize * 4;

    let (y_plane, rest) = data.split_at_mut(luma);
    for (i, px) in y_plane.iter_mut().enumerate() {
        let (x, y) = (i % w, i / w);
        *px = ((x + y + shift) & 0xFF) as u8;
    }

    let (u_plane, rest) = rest.split_at_mut(chroma);
    let (v_plane, rest) = rest.split_at_mut(chroma);
    for i in 0..chroma {
        let left = i % cw < cw / 2;
        u_plane[i] = if left { 90 } else { 160 };
        v_plane[i] = if left { 200 } else { 60 };
    }

    if has_alpha {
        for (i, px) in rest[..luma].iter_mut().enumerate() {
            *px = ((i % w) * 255 / w.max(2).saturating_sub(1)).min(255) as u8;
        }
    }
}
