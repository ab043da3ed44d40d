//! Deferred callbacks for the main thread.
//!
//! Decoder threads post work here; the host drains it once per frame on the
//! thread that owns the player.

use crossbeam_channel::{Receiver, Sender};

type Task = Box<dyn FnOnce() + Send>;

#[derive(Clone)]
pub struct MainThreadQueue {
    tx: Sender<Task>,
    rx: Receiver<Task>,
}

impl MainThreadQueue {
    pub fn new() -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self { tx, rx }
    }

    /// Enqueue `task`. Callable from any thread.
    pub fn post<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        // The queue owns a receiver, so the channel never disconnects.
        let _ = self.tx.send(Box::new(task));
    }

    /// Run everything queued so far on the calling thread. Tasks posted
    /// while draining run on the next call.
    pub fn run_pending(&self) -> usize {
        let pending = self.rx.len();
        let mut ran = 0;
        while ran < pending {
            match self.rx.try_recv() {
                Ok(task) => {
                    task();
                    ran += 1;
                }
                Err(_) => break,
            }
        }
        ran
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

impl Default for MainThreadQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MainThreadQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MainThreadQueue")
            .field("pending", &self.len())
            .finish()
    }
}
