use super::*;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub type EventCallback = Arc<dyn Fn(&Event) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Listener registry the embedding environment dispatches viewport-change
/// notifications into.
pub struct EventSystem {
    global_handlers: RwLock<HashMap<String, Vec<(ListenerId, EventCallback)>>>,
    next_listener: AtomicU64,
}

impl EventSystem {
    pub fn new() -> Self {
        Self {
            global_handlers: RwLock::new(HashMap::new()),
            next_listener: AtomicU64::new(1),
        }
    }

    /// Calls every listener registered for the event's type, in
    /// registration order.
    pub fn dispatch_event(&self, event: &Event) {
        // Listeners run outside the lock so they may register or remove
        // listeners themselves.
        let callbacks: Vec<EventCallback> = self
            .global_handlers
            .read()
            .get(event.event_type())
            .map(|handlers| handlers.iter().map(|(_, cb)| Arc::clone(cb)).collect())
            .unwrap_or_default();

        for callback in callbacks {
            callback(event);
        }
    }

    pub fn add_global_listener<F>(&self, event_type: &str, callback: F) -> ListenerId
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_listener.fetch_add(1, Ordering::Relaxed));
        self.global_handlers
            .write()
            .entry(event_type.to_string())
            .or_default()
            .push((id, Arc::new(callback)));
        id
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut handlers = self.global_handlers.write();
        let mut removed = false;

        for callbacks in handlers.values_mut() {
            let before = callbacks.len();
            callbacks.retain(|(listener, _)| *listener != id);
            removed |= callbacks.len() != before;
        }

        removed
    }

    pub fn listener_count(&self, event_type: &str) -> usize {
        self.global_handlers
            .read()
            .get(event_type)
            .map_or(0, Vec::len)
    }
}

impl Default for EventSystem {
    fn default() -> Self {
        Self::new()
    }
}
