//! Decoder contract and backends.
//!
//! A decoder runs on its own thread, writes decoded planes through the
//! [`FrameSink`] it receives in [`Decoder::init_player`], and reports the end
//! of the stream with [`FrameSink::async_done`].

pub mod ffmpeg;
pub mod planar;
pub mod synthetic;
mod worker;

use std::time::Duration;

use crate::buffer::PixelFormat;
use crate::geometry::MovieGeometry;
use crate::sink::FrameSink;

pub use ffmpeg::FfmpegDecoder;
pub use synthetic::SyntheticDecoder;

#[derive(Debug, thiserror::Error)]
pub enum DecoderError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("probe failed: {0}")]
    Probe(String),
    #[error("no video stream in {0}")]
    NoVideoStream(String),
    #[error("invalid movie size {width}x{height}")]
    InvalidSize { width: u32, height: u32 },
}

/// How the decoder lays out the chroma plane it writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChromaLayout {
    /// U and V interleaved in one two-channel plane.
    #[default]
    Interleaved,
    /// A single one-channel chroma plane.
    SingleChannel,
}

impl ChromaLayout {
    pub fn pixel_format(self) -> PixelFormat {
        match self {
            ChromaLayout::Interleaved => PixelFormat::LA8,
            ChromaLayout::SingleChannel => PixelFormat::L8,
        }
    }
}

/// What a decoder gets when a session starts.
#[derive(Debug, Clone)]
pub struct SessionSetup<'a> {
    pub source: &'a str,
    pub has_alpha: bool,
    pub sink: FrameSink,
}

/// Per-tick timing forwarded from the host's update loop.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct UpdateState {
    pub time: Duration,
    pub dt: Duration,
}

pub trait Decoder: Send {
    /// Open `setup.source` and report where the movie sits and how large a
    /// buffer to decode into. Keep `setup.sink` for the session's writes.
    fn init_player(&mut self, setup: &SessionSetup<'_>) -> Result<MovieGeometry, DecoderError>;

    fn play(&mut self);

    fn pause(&mut self);

    fn resume(&mut self);

    fn stop(&mut self);

    /// Tear the session down. Must not return while the decoder thread can
    /// still write through the sink.
    fn clear(&mut self);

    /// 0.0..=1.0
    fn set_volume(&mut self, volume: f32);

    /// Whether frames are currently being produced.
    fn is_playing(&self) -> bool;

    fn update(&mut self, _state: &UpdateState) {}

    fn chroma_layout(&self) -> ChromaLayout {
        ChromaLayout::Interleaved
    }
}
