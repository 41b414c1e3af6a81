//! Thread-safe FIFO buffer of pending events.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::event::Event;

/// Mutex-guarded FIFO of events awaiting dispatch.
///
/// All operations take the same lock. Producers are request handlers;
/// the single consumer is the polling [`EventLoop`](crate::EventLoop).
#[derive(Debug, Default)]
pub struct EventQueue {
    inner: Mutex<VecDeque<Event>>,
}

impl EventQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event to the tail.
    pub fn enqueue(&self, event: Event) {
        self.lock().push_back(event);
    }

    /// Pop the head, or `None` if the queue is empty.
    ///
    /// The previous incarnation of this queue returned a zero-value event
    /// on empty and made callers pre-check the length; `Option` carries
    /// the same information without the ambiguity.
    pub fn dequeue(&self) -> Option<Event> {
        self.lock().pop_front()
    }

    /// Number of pending events.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<Event>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}
