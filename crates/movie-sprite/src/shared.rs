//! State shared between the player, its decoder thread and queued
//! completion callbacks.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::buffer::MovieBuffer;
use crate::events::EventDispatcher;

/// Both planes of the session. Only ever touched through
/// [`PlayerCore::lock_planes`].
#[derive(Debug, Default)]
pub(crate) struct PlaneBuffers {
    pub ya: MovieBuffer,
    pub uv: MovieBuffer,
}

impl PlaneBuffers {
    pub fn is_empty(&self) -> bool {
        self.ya.is_empty() || self.uv.is_empty()
    }
}

#[derive(Debug, Default)]
pub(crate) struct PlaybackFlags {
    pub initialized: AtomicBool,
    pub playing: AtomicBool,
    pub paused: AtomicBool,
    pub dirty: AtomicBool,
    pub ready: AtomicBool,
    pub complete_dispatched: AtomicBool,
    pub has_alpha_channel: AtomicBool,
    pub looped: AtomicBool,
}

pub(crate) fn get(flag: &AtomicBool) -> bool {
    flag.load(Ordering::Acquire)
}

pub(crate) fn set(flag: &AtomicBool, value: bool) {
    flag.store(value, Ordering::Release);
}

impl PlaybackFlags {
    pub fn snapshot(&self) -> PlaybackState {
        PlaybackState {
            initialized: get(&self.initialized),
            playing: get(&self.playing),
            paused: get(&self.paused),
            dirty: get(&self.dirty),
            ready: get(&self.ready),
            complete_dispatched: get(&self.complete_dispatched),
            has_alpha_channel: get(&self.has_alpha_channel),
            looped: get(&self.looped),
        }
    }
}

/// Point-in-time copy of the playback flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlaybackState {
    pub initialized: bool,
    pub playing: bool,
    pub paused: bool,
    pub dirty: bool,
    pub ready: bool,
    pub complete_dispatched: bool,
    pub has_alpha_channel: bool,
    pub looped: bool,
}

impl PlaybackState {
    pub fn is_playing(&self) -> bool {
        self.playing && !self.paused
    }
}

#[derive(Debug, Default)]
pub(crate) struct PlayerCore {
    planes: Mutex<PlaneBuffers>,
    pub flags: PlaybackFlags,
    /// Bumped by every clear. Sinks and queued callbacks from an older
    /// session compare against it and back off.
    session: AtomicU64,
    pub events: EventDispatcher,
}

impl PlayerCore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lock_planes(&self) -> MutexGuard<'_, PlaneBuffers> {
        self.planes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn session(&self) -> u64 {
        self.session.load(Ordering::Acquire)
    }

    pub fn next_session(&self) -> u64 {
        self.session.fetch_add(1, Ordering::AcqRel) + 1
    }
}
