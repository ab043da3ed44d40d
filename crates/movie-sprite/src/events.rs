use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MovieEvent {
    /// Playback reached the natural end of the stream.
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Arc<Mutex<dyn FnMut(&MovieEvent) + Send>>;

struct Entry {
    id: ListenerId,
    event: MovieEvent,
    callback: Listener,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    entries: Vec<Entry>,
}

/// Listener list shared between the player and its completion callbacks.
#[derive(Default)]
pub struct EventDispatcher {
    registry: Mutex<Registry>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_listener<F>(&self, event: MovieEvent, callback: F) -> ListenerId
    where
        F: FnMut(&MovieEvent) + Send + 'static,
    {
        let mut reg = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        reg.next_id += 1;
        let id = ListenerId(reg.next_id);
        reg.entries.push(Entry {
            id,
            event,
            callback: Arc::new(Mutex::new(callback)),
        });
        id
    }

    /// Returns false if `id` was not registered.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut reg = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        let before = reg.entries.len();
        reg.entries.retain(|e| e.id != id);
        reg.entries.len() != before
    }

    /// Call every listener for `event` in registration order. Listeners may
    /// add or remove listeners; changes apply to the next dispatch.
    pub fn dispatch(&self, event: MovieEvent) -> usize {
        let targets: Vec<Listener> = {
            let reg = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
            reg.entries
                .iter()
                .filter(|e| e.event == event)
                .map(|e| e.callback.clone())
                .collect()
        };
        for callback in &targets {
            let mut f = callback.lock().unwrap_or_else(PoisonError::into_inner);
            f(&event);
        }
        targets.len()
    }

    pub fn listener_count(&self, event: MovieEvent) -> usize {
        let reg = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        reg.entries.iter().filter(|e| e.event == event).count()
    }
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("complete_listeners", &self.listener_count(MovieEvent::Complete))
            .finish()
    }
}
