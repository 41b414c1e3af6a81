//! The polling event loop.
//!
//! One explicit scheduler object, constructed at application start and
//! handed to producers through its queue handle. Each tick it dequeues at
//! most ONE event and dispatches it; this one-event-per-tick ceiling is an
//! inherited backpressure bound of the mesh, not something the loop tries
//! to beat. Propagation is detached by the handlers, so the loop never
//! waits on the network.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::handlers::EventHandlers;
use crate::propagate::EventTransport;
use crate::queue::EventQueue;
use crate::store::PeerStore;

/// Default interval between queue polls.
pub const DEFAULT_TICK: Duration = Duration::from_secs(1);

/// The single polling consumer of the event queue.
pub struct EventLoop<S, T> {
    queue: Arc<EventQueue>,
    handlers: Arc<EventHandlers<S, T>>,
    tick: Duration,
}

impl<S, T> EventLoop<S, T>
where
    S: PeerStore + 'static,
    T: EventTransport,
{
    /// Create a loop over a queue and handler set, with the default tick.
    pub fn new(queue: Arc<EventQueue>, handlers: Arc<EventHandlers<S, T>>) -> Self {
        Self {
            queue,
            handlers,
            tick: DEFAULT_TICK,
        }
    }

    /// Override the polling interval.
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    /// Handle to the queue, for producers.
    pub fn queue(&self) -> Arc<EventQueue> {
        Arc::clone(&self.queue)
    }

    /// Start the polling task.
    ///
    /// Runs until the handle is aborted or the runtime shuts down.
    pub fn spawn(self) -> JoinHandle<()> {
        info!(tick = ?self.tick, "event loop started");
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(self.tick).await;

                let Some(event) = self.queue.dequeue() else {
                    continue;
                };
                debug!(
                    event = event.name(),
                    pending = self.queue.len(),
                    "dispatching event"
                );
                // Handle returns the propagation handle; the loop does not
                // wait for the fan-out to settle.
                let _ = self.handlers.handle(event);
            }
        })
    }
}
