//! Joining the mesh at startup.

use anyhow::Context;
use reparto_mesh::{Peer, PeerStore};
use tracing::info;

use crate::config::NodeConfig;
use crate::state::AppState;
use crate::wire::PresentationBody;

/// Insert our own record and, when an initial peer is configured, pull
/// its peer table and present ourselves to the mesh through it.
///
/// A first node has no initial peer and simply starts alone. A failure
/// while joining is fatal: a node that half-joined would hold a partial
/// table forever, since nothing reconciles peer tables after the fact.
pub async fn join_mesh(state: &AppState, config: &NodeConfig) -> anyhow::Result<()> {
    let self_peer = Peer::new(
        config.host.clone(),
        config.center,
        config.city.clone(),
        config.country.clone(),
    )
    .with_delivery_radius(config.delivery_radius_km);
    self_peer
        .validate()
        .map_err(|e| anyhow::anyhow!("own peer record is invalid: {e}"))?;
    state.store.insert(self_peer).context("inserting self")?;

    let Some(initial) = &config.initial_peer else {
        info!(host = %config.host, "starting a new mesh");
        return Ok(());
    };

    let peers = state.client.fetch_peers(initial, &config.host).await?;
    let count = peers.len();
    state
        .store
        .insert_many(peers)
        .context("storing fetched peers")?;

    // Everyone except ourselves and the initial peer still has to hear
    // about us; the initial peer relays our presentation down the tree.
    let send_to = state
        .store
        .all_urls(&[config.host.as_str(), initial.as_str()])
        .context("building presentation targets")?;
    let new_peer = state.store.get_self().context("reading self back")?;
    state
        .client
        .present(initial, &PresentationBody { new_peer, send_to })
        .await?;

    info!(host = %config.host, via = %initial, peers = count, "joined the mesh");
    Ok(())
}
