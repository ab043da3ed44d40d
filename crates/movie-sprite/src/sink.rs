//! Decoder-side handle into a player session.
//!
//! A [`FrameSink`] is the only way a decoder thread reaches the player: it
//! writes planes under the shared mutex and signals end of stream. The sink
//! holds a weak reference, so a decoder that outlives its player simply finds
//! nothing to write to.

use std::sync::{Arc, Weak};

use crate::buffer::PlaneViewMut;
use crate::events::MovieEvent;
use crate::queue::MainThreadQueue;
use crate::shared::{PlayerCore, get, set};

#[derive(Clone)]
pub struct FrameSink {
    core: Weak<PlayerCore>,
    session: u64,
    queue: MainThreadQueue,
}

impl FrameSink {
    pub(crate) fn new(core: &Arc<PlayerCore>, queue: MainThreadQueue) -> Self {
        Self {
            core: Arc::downgrade(core),
            session: core.session(),
            queue,
        }
    }

    /// A sink attached to no player. Writes and completions are dropped.
    pub fn detached() -> Self {
        Self {
            core: Weak::new(),
            session: 0,
            queue: MainThreadQueue::new(),
        }
    }

    fn live_core(&self) -> Option<Arc<PlayerCore>> {
        let core = self.core.upgrade()?;
        (core.session() == self.session).then_some(core)
    }

    /// Lock both planes and hand them to `write` as (luma+alpha, chroma).
    /// Marks the frame dirty afterwards. Returns false without calling
    /// `write` when the session is gone or its buffers are released.
    pub fn write_frame<F>(&self, write: F) -> bool
    where
        F: FnOnce(&mut PlaneViewMut<'_>, &mut PlaneViewMut<'_>),
    {
        let Some(core) = self.live_core() else {
            return false;
        };
        let mut planes = core.lock_planes();
        // Re-check under the lock: clear() bumps the session before it
        // takes the mutex to free the buffers.
        if core.session() != self.session || planes.is_empty() {
            return false;
        }
        let planes = &mut *planes;
        write(&mut planes.ya.lock(), &mut planes.uv.lock());
        set(&core.flags.dirty, true);
        true
    }

    /// Signal the natural end of the stream. Only the first call per
    /// `play()` is delivered; the player's flags and `Complete` listeners
    /// are updated on the thread draining the main-thread queue.
    pub fn async_done(&self) {
        let Some(core) = self.live_core() else {
            return;
        };
        if core.flags.complete_dispatched.swap(true, std::sync::atomic::Ordering::AcqRel) {
            return;
        }
        let session = self.session;
        self.queue.post(move || {
            if core.session() != session {
                log::debug!("Dropping completion from a cleared session");
                return;
            }
            set(&core.flags.playing, false);
            set(&core.flags.paused, false);
            log::debug!("Movie complete");
            core.events.dispatch(MovieEvent::Complete);
        });
    }

    /// Whether the player wants the stream to restart at its end.
    pub fn is_looped(&self) -> bool {
        self.live_core().is_some_and(|core| get(&core.flags.looped))
    }

    /// False once the player cleared the session this sink belongs to.
    pub fn is_live(&self) -> bool {
        self.live_core().is_some()
    }
}

impl std::fmt::Debug for FrameSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameSink")
            .field("session", &self.session)
            .field("live", &self.is_live())
            .finish()
    }
}
