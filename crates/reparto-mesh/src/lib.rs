//! Reparto Mesh
//!
//! The propagation and membership engine of the Reparto delivery mesh.
//! Every node keeps a full replica of the peer table; changes travel as
//! events over a binary-split broadcast tree with O(log n) depth and
//! at-most-once delivery. Locally, events land on a mutex-guarded FIFO
//! queue drained by a single polling [`EventLoop`] at one event per tick.
//!
//! The moving parts:
//!
//! - [`Peer`] / [`PeerStore`]: the replicated peer table and partial
//!   field updates over it.
//! - [`Event`]: the closed set of mesh events and their wire format.
//! - [`EventQueue`] / [`EventLoop`]: FIFO intake and the polling
//!   consumer.
//! - [`EventHandlers`]: per-kind application plus guaranteed fan-out.
//! - [`Propagator`] / [`split`]: the broadcast tree and its failure
//!   rerouting.
//! - [`DeliveryAreaRecalculator`]: membership recomputation on radius
//!   change.
//! - [`PeerService`]: presentation of newcomers, broadcast-map
//!   construction, and the cross-peer restaurant duplicate check.
//!
//! Transport is abstracted behind [`EventTransport`] and [`PeerProbe`];
//! the HTTP implementations live in the node crate.

mod error;
mod event;
mod handlers;
mod peer;
mod propagate;
mod queue;
mod recalc;
mod scheduler;
mod service;
mod store;

pub use error::{Error, Result, StoreError, TransportError};
pub use event::{Event, EventKind, ADD_PEER, DELIVERY_AREA_UPDATED};
pub use handlers::EventHandlers;
pub use peer::{Peer, PeerId};
pub use propagate::{split, EventTransport, PropagationReport, Propagator};
pub use queue::EventQueue;
pub use recalc::{DeliveryAreaRecalculator, RecalcOutcome};
pub use scheduler::{EventLoop, DEFAULT_TICK};
pub use service::{
    MemoryRestaurantStore, PeerProbe, PeerService, Restaurant, RestaurantQuery, RestaurantStore,
};
pub use store::{MemoryPeerStore, PeerField, PeerStore};
