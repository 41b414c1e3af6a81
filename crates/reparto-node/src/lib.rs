//! Reparto Node
//!
//! The HTTP binary around [`reparto_mesh`]: configuration, the axum
//! routes other peers call, the reqwest transport the propagator sends
//! through, and the startup sequence that joins an existing mesh.

pub mod bootstrap;
pub mod config;
pub mod routes;
pub mod state;
pub mod transport;
pub mod wire;
