//! Pending lifecycle events awaiting the next broadcast tick

use shared::Event;
use std::sync::Arc;
use tokio::sync::Mutex;

pub type SharedEvents = Arc<Mutex<EventQueue>>;

/// Events are serialized into exactly one snapshot and then forgotten.
/// A subscriber that misses that snapshot never sees the event.
#[derive(Debug, Default)]
pub struct EventQueue {
    pending: Vec<Event>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedEvents {
        Arc::new(Mutex::new(Self::new()))
    }

    pub fn push(&mut self, event: Event) {
        self.pending.push(event);
    }

    /// Empties the queue, returning events in the order they were pushed.
    pub fn drain(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.pending)
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
