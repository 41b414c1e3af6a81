//! Error types for reparto-mesh.

use thiserror::Error;

/// Result type for reparto-mesh operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while handling or propagating mesh events.
///
/// Validation and store errors abort the *local* application of an event
/// only; they never stop the event from being handed to the propagator.
/// Transport errors drive the reroute policy and, once a branch's
/// continuation list is exhausted, become a silent permanent drop.
#[derive(Debug, Error)]
pub enum Error {
    /// The event payload is not a well-formed peer.
    #[error("invalid peer payload: {0}")]
    Validation(String),

    /// The peer store rejected or failed an operation.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A peer could not be reached or answered with a non-success status.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Errors reported by a [`PeerStore`](crate::PeerStore) implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No peer with the given id exists.
    #[error("no peer with id {0}")]
    UnknownId(crate::PeerId),

    /// No peer with the given url exists.
    #[error("no peer with url {0}")]
    UnknownUrl(String),

    /// The url is already registered to another peer.
    #[error("url {0} is already registered")]
    DuplicateUrl(String),

    /// The store holds no record for this node itself.
    #[error("self peer is not in the store")]
    SelfMissing,

    /// The peer record carries no id; it was never inserted.
    #[error("peer record has no id")]
    Unidentified,
}

/// Delivery failure during broadcast fan-out.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The peer could not be reached at the transport level.
    #[error("peer {url} unreachable: {reason}")]
    Unreachable { url: String, reason: String },

    /// The peer answered, but not with a success status.
    #[error("peer {url} answered status {status}")]
    BadStatus { url: String, status: u16 },
}
