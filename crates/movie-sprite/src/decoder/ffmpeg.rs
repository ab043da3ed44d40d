//! Streaming decode through an ffmpeg subprocess.
//!
//! - `ffprobe` reads dimensions, frame rate and pixel format at init
//! - `ffmpeg -f rawvideo -pix_fmt yuv420p|yuva420p` streams frames over a pipe
//! - frames are paced to the probed rate and packed straight into the planes

use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use super::planar::{Yuv420Frame, pack_yuv420};
use super::worker::{Worker, WorkerControl};
use super::{Decoder, DecoderError, SessionSetup};
use crate::config::MovieConfig;
use crate::geometry::MovieGeometry;
use crate::sink::FrameSink;

/// Stream metadata from ffprobe.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoMeta {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub duration_secs: f64,
    pub pix_fmt: String,
}

impl VideoMeta {
    /// Whether the stream itself carries an alpha plane.
    pub fn has_alpha(&self) -> bool {
        self.pix_fmt.starts_with("yuva") || self.pix_fmt.contains("rgba") || self.pix_fmt.contains("argb")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FfmpegSettings {
    pub ffmpeg_path: String,
    pub ffprobe_path: String,
}

impl Default for FfmpegSettings {
    fn default() -> Self {
        Self {
            ffmpeg_path: "ffmpeg".into(),
            ffprobe_path: "ffprobe".into(),
        }
    }
}

impl From<&MovieConfig> for FfmpegSettings {
    fn from(config: &MovieConfig) -> Self {
        Self {
            ffmpeg_path: config.ffmpeg_path.clone(),
            ffprobe_path: config.ffprobe_path.clone(),
        }
    }
}

/// Run ffprobe on `path`.
pub fn probe(ffprobe: &str, path: &str) -> Result<VideoMeta, DecoderError> {
    let output = Command::new(ffprobe)
        .args([
            "-v", "quiet",
            "-print_format", "json",
            "-show_streams",
            "-show_format",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .output()
        .map_err(|source| DecoderError::Spawn {
            program: ffprobe.to_string(),
            source,
        })?;

    if !output.status.success() {
        return Err(DecoderError::Probe(format!(
            "{ffprobe} exited with {} for {path}",
            output.status
        )));
    }
    parse_probe_output(&output.stdout, path)
}

/// Parse ffprobe's `-print_format json -show_streams -show_format` output.
pub fn parse_probe_output(json: &[u8], path: &str) -> Result<VideoMeta, DecoderError> {
    let json: serde_json::Value = serde_json::from_slice(json)
        .map_err(|e| DecoderError::Probe(format!("Failed to parse ffprobe JSON: {e}")))?;

    let video_stream = json["streams"]
        .as_array()
        .and_then(|streams| {
            streams
                .iter()
                .find(|s| s["codec_type"].as_str() == Some("video"))
        })
        .ok_or_else(|| DecoderError::NoVideoStream(path.to_string()))?;

    let dim = |key: &str| {
        video_stream[key]
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(|| DecoderError::Probe(format!("Missing {key}")))
    };
    let width = dim("width")?;
    let height = dim("height")?;
    if width == 0 || height == 0 {
        return Err(DecoderError::InvalidSize { width, height });
    }

    let fps = parse_frame_rate(video_stream["r_frame_rate"].as_str().unwrap_or("30/1"));

    let duration_secs = json["format"]["duration"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .or_else(|| {
            video_stream["duration"]
                .as_str()
                .and_then(|s| s.parse::<f64>().ok())
        })
        .unwrap_or(0.0);

    let pix_fmt = video_stream["pix_fmt"].as_str().unwrap_or("yuv420p").to_string();

    Ok(VideoMeta {
        width,
        height,
        fps,
        duration_secs,
        pix_fmt,
    })
}

/// "30000/1001" -> 29.97. Falls back to 30 for anything unparsable.
pub fn parse_frame_rate(rate: &str) -> f64 {
    let fps = if let Some((num, den)) = rate.split_once('/') {
        let n: f64 = num.parse().unwrap_or(30.0);
        let d: f64 = den.parse().unwrap_or(1.0);
        if d > 0.0 { n / d } else { 30.0 }
    } else {
        rate.parse().unwrap_or(30.0)
    };
    if fps.is_finite() && fps > 0.0 { fps } else { 30.0 }
}

/// Raw pixel format to request from ffmpeg.
pub fn output_pix_fmt(has_alpha: bool) -> &'static str {
    if has_alpha { "yuva420p" } else { "yuv420p" }
}

struct Session {
    path: PathBuf,
    meta: VideoMeta,
    has_alpha: bool,
    sink: FrameSink,
}

/// The ffmpeg process a stream job is reading from, reachable from the
/// stop path so a stalled pipe read can be broken.
#[derive(Clone, Default)]
struct ChildSlot(Arc<Mutex<Option<Child>>>);

impl ChildSlot {
    fn lock(&self) -> MutexGuard<'_, Option<Child>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn kill(&self) {
        if let Some(child) = self.lock().as_mut() {
            let _ = child.kill();
        }
    }

    fn reap(&self) {
        if let Some(mut child) = self.lock().take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

pub struct FfmpegDecoder {
    settings: FfmpegSettings,
    session: Option<Session>,
    worker: Option<Worker>,
    child: ChildSlot,
    volume: f32,
}

impl FfmpegDecoder {
    pub fn new(settings: FfmpegSettings) -> Self {
        Self {
            settings,
            session: None,
            worker: None,
            child: ChildSlot::default(),
            volume: 1.0,
        }
    }

    pub fn meta(&self) -> Option<&VideoMeta> {
        self.session.as_ref().map(|s| &s.meta)
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Stop the stream job. The flag goes up before the kill so a process
    /// spawned after the kill is torn down by the job itself.
    fn stop_worker(&mut self) {
        if let Some(mut worker) = self.worker.take() {
            worker.request_stop();
            self.child.kill();
            worker.stop();
        }
        self.child.reap();
    }
}

impl Decoder for FfmpegDecoder {
    fn init_player(&mut self, setup: &SessionSetup<'_>) -> Result<MovieGeometry, DecoderError> {
        self.stop_worker();
        let meta = probe(&self.settings.ffprobe_path, setup.source)?;
        if setup.has_alpha && !meta.has_alpha() {
            log::warn!(
                "'{}' has no alpha plane ({}), alpha will be opaque",
                setup.source,
                meta.pix_fmt
            );
        }
        log::info!(
            "Movie '{}': {}x{} @ {:.2} fps, {:.1}s, {}",
            setup.source,
            meta.width,
            meta.height,
            meta.fps,
            meta.duration_secs,
            meta.pix_fmt
        );
        let geometry = MovieGeometry::from_size(meta.width, meta.height);
        self.session = Some(Session {
            path: PathBuf::from(setup.source),
            meta,
            has_alpha: setup.has_alpha,
            sink: setup.sink.clone(),
        });
        Ok(geometry)
    }

    fn play(&mut self) {
        let Some(session) = &self.session else {
            log::warn!("ffmpeg decoder: play() without a session");
            return;
        };
        let job = StreamJob {
            ffmpeg: self.settings.ffmpeg_path.clone(),
            path: session.path.clone(),
            meta: session.meta.clone(),
            has_alpha: session.has_alpha,
            sink: session.sink.clone(),
            child: self.child.clone(),
        };
        self.stop_worker();
        match Worker::spawn("movie-ffmpeg", move |control| job.run(&control)) {
            Ok(worker) => self.worker = Some(worker),
            Err(e) => log::error!("ffmpeg decoder: {e}"),
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
        self.session = None;
    }

    fn set_volume(&mut self, volume: f32) {
        // Video only; kept so a host can query it.
        self.volume = volume;
    }

    fn is_playing(&self) -> bool {
        self.worker
            .as_ref()
            .is_some_and(|w| w.is_running() && !w.is_paused())
    }
}

impl Drop for FfmpegDecoder {
    fn drop(&mut self) {
        self.stop_worker();
    }
}

struct StreamJob {
    ffmpeg: String,
    path: PathBuf,
    meta: VideoMeta,
    has_alpha: bool,
    sink: FrameSink,
    child: ChildSlot,
}

impl StreamJob {
    fn spawn_ffmpeg(&self) -> Result<Child, DecoderError> {
        Command::new(&self.ffmpeg)
            .args(["-v", "quiet", "-i"])
            .arg(&self.path)
            .args([
                "-f", "rawvideo",
                "-pix_fmt", output_pix_fmt(self.has_alpha),
                "-s", &format!("{}x{}", self.meta.width, self.meta.height),
                "pipe:1",
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| DecoderError::Spawn {
                program: self.ffmpeg.clone(),
                source,
            })
    }

    fn run(self, control: &WorkerControl) {
        let (w, h) = (self.meta.width, self.meta.height);
        let mut buf = vec![0u8; Yuv420Frame::frame_size(w, h, self.has_alpha)];
        let interval = Duration::from_secs_f64(1.0 / self.meta.fps);

        loop {
            let mut child = match self.spawn_ffmpeg() {
                Ok(child) => child,
                Err(e) => {
                    log::error!("ffmpeg decoder: {e}");
                    return;
                }
            };
            let Some(mut stdout) = child.stdout.take() else {
                log::error!("ffmpeg decoder: no stdout pipe");
                let _ = child.kill();
                let _ = child.wait();
                return;
            };
            *self.child.lock() = Some(child);
            if control.should_stop() {
                self.child.reap();
                return;
            }

            let mut next = Instant::now();
            let mut frames = 0u64;
            let finished = loop {
                if !control.wait_while_paused() {
                    break false;
                }
                if stdout.read_exact(&mut buf).is_err() {
                    // EOF, or the process was killed by stop
                    break !control.should_stop();
                }
                if let Some(frame) = Yuv420Frame::split(&buf, w, h, self.has_alpha) {
                    self.sink.write_frame(|ya, uv| pack_yuv420(&frame, ya, uv));
                }
                frames += 1;
                next = (next + interval).max(Instant::now());
                if !control.sleep_until(next) {
                    break false;
                }
            };

            self.child.reap();

            if !finished {
                return;
            }
            log::debug!("ffmpeg stream ended after {frames} frames");
            if frames == 0 || !self.sink.is_looped() {
                if frames == 0 {
                    log::warn!("ffmpeg decoded zero frames from {}", self.path.display());
                }
                self.sink.async_done();
                return;
            }
        }
    }
}
