//! The propagatable unit: a named event, its peer payload, and the
//! remaining fan-out target list.
//!
//! Event kinds form a closed tagged union with one strongly-typed payload
//! per kind, dispatched exhaustively. An unknown name or a malformed
//! payload fails at deserialization on the wire boundary instead of being
//! type-asserted at handling time.

use serde::{Deserialize, Serialize};

use crate::peer::Peer;

/// Wire name of the peer-announcement event.
pub const ADD_PEER: &str = "addPeer";

/// Wire name of the delivery-area-change event.
pub const DELIVERY_AREA_UPDATED: &str = "deliveryAreaUpdated";

/// The closed set of event kinds, each carrying its peer snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "Name", content = "Payload")]
pub enum EventKind {
    /// A new peer announced itself to the mesh.
    #[serde(rename = "addPeer")]
    AddPeer(Peer),

    /// A peer changed its delivery radius.
    #[serde(rename = "deliveryAreaUpdated")]
    DeliveryAreaUpdated(Peer),
}

/// A propagatable event.
///
/// `send_to` is the ordered list of urls that have not yet received the
/// event. It shrinks as the broadcast tree is walked and never grows;
/// propagator-made copies with truncated lists are transient and never
/// persisted.
///
/// Serializes to the mesh wire format:
/// `{"Name": ..., "Payload": {...}, "SendTo": [...]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(flatten)]
    pub kind: EventKind,

    #[serde(rename = "SendTo", default)]
    pub send_to: Vec<String>,
}

impl Event {
    /// A peer-announcement event.
    pub fn add_peer(peer: Peer, send_to: Vec<String>) -> Self {
        Self {
            kind: EventKind::AddPeer(peer),
            send_to,
        }
    }

    /// A delivery-area-change event.
    pub fn delivery_area_updated(peer: Peer, send_to: Vec<String>) -> Self {
        Self {
            kind: EventKind::DeliveryAreaUpdated(peer),
            send_to,
        }
    }

    /// The wire name of this event.
    pub fn name(&self) -> &'static str {
        match self.kind {
            EventKind::AddPeer(_) => ADD_PEER,
            EventKind::DeliveryAreaUpdated(_) => DELIVERY_AREA_UPDATED,
        }
    }

    /// The peer snapshot carried by this event.
    pub fn payload(&self) -> &Peer {
        match &self.kind {
            EventKind::AddPeer(peer) | EventKind::DeliveryAreaUpdated(peer) => peer,
        }
    }
}
