use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use super::DecoderError;

const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Flags a decode loop polls between frames.
#[derive(Clone)]
pub(crate) struct WorkerControl {
    shutdown: Arc<AtomicBool>,
    paused: Arc<AtomicBool>,
}

impl WorkerControl {
    pub fn should_stop(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Relaxed)
    }

    /// Block while paused. Returns false once shutdown is requested.
    pub fn wait_while_paused(&self) -> bool {
        while self.is_paused() {
            if self.should_stop() {
                return false;
            }
            std::thread::sleep(POLL_INTERVAL);
        }
        !self.should_stop()
    }

    /// Sleep until `deadline`, waking early for shutdown. Returns false on
    /// shutdown.
    pub fn sleep_until(&self, deadline: Instant) -> bool {
        loop {
            if self.should_stop() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            std::thread::sleep((deadline - now).min(POLL_INTERVAL));
        }
    }
}

/// A named decode thread with pause and shutdown flags.
pub(crate) struct Worker {
    control: WorkerControl,
    thread: Option<JoinHandle<()>>,
}

impl Worker {
    pub fn spawn<F>(name: &str, body: F) -> Result<Self, DecoderError>
    where
        F: FnOnce(WorkerControl) + Send + 'static,
    {
        let control = WorkerControl {
            shutdown: Arc::new(AtomicBool::new(false)),
            paused: Arc::new(AtomicBool::new(false)),
        };
        let thread_control = control.clone();
        let thread_name = name.to_string();

        let handle = std::thread::Builder::new()
            .name(name.into())
            .spawn(move || {
                if let Err(e) = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                    body(thread_control);
                })) {
                    let msg = if let Some(s) = e.downcast_ref::<&str>() {
                        (*s).to_string()
                    } else if let Some(s) = e.downcast_ref::<String>() {
                        s.clone()
                    } else {
                        "unknown panic".into()
                    };
                    log::error!("Decoder thread '{thread_name}' panicked: {msg}");
                }
            })
            .map_err(|source| DecoderError::Spawn {
                program: name.to_string(),
                source,
            })?;

        Ok(Self {
            control,
            thread: Some(handle),
        })
    }

    pub fn pause(&self) {
        self.control.paused.store(true, Ordering::Relaxed);
    }

    pub fn resume(&self) {
        self.control.paused.store(false, Ordering::Relaxed);
    }

    pub fn is_paused(&self) -> bool {
        self.control.is_paused()
    }

    /// Thread alive and not told to stop.
    pub fn is_running(&self) -> bool {
        if self.control.should_stop() {
            return false;
        }
        match &self.thread {
            Some(h) => !h.is_finished(),
            None => false,
        }
    }

    /// Signal shutdown without waiting for the body to notice.
    pub fn request_stop(&self) {
        self.control.shutdown.store(true, Ordering::Release);
    }

    /// Signal shutdown and join. Once this returns the body has exited.
    pub fn stop(&mut self) {
        self.request_stop();
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    #[test]
    fn stop_joins_the_loop() {
        let ticks = Arc::new(AtomicU32::new(0));
        let t = ticks.clone();
        let mut worker = Worker::spawn("test-worker", move |control| {
            while control.wait_while_paused() {
                t.fetch_add(1, Ordering::Relaxed);
                if !control.sleep_until(Instant::now() + Duration::from_millis(1)) {
                    break;
                }
            }
        })
        .unwrap();
        assert!(worker.is_running());
        worker.stop();
        assert!(!worker.is_running());
        let after = ticks.load(Ordering::Relaxed);
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(ticks.load(Ordering::Relaxed), after);
    }

    #[test]
    fn paused_worker_still_stops() {
        let mut worker = Worker::spawn("test-paused", |control| {
            while control.wait_while_paused() {
                std::thread::sleep(Duration::from_millis(1));
            }
        })
        .unwrap();
        worker.pause();
        assert!(worker.is_paused());
        worker.stop();
        assert!(!worker.is_running());
    }

    #[test]
    fn panicking_body_is_contained() {
        let mut worker = Worker::spawn("test-panic", |_| panic!("boom")).unwrap();
        worker.stop();
        assert!(!worker.is_running());
    }
}
