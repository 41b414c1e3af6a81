//! Peer-facing service operations that sit above the store: presentation
//! of newly joined peers, broadcast-map construction, and the
//! cross-peer restaurant duplicate check.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use reparto_geo::{GeoCalculator, GeoCoord};
use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::error::{Result, StoreError, TransportError};
use crate::peer::Peer;
use crate::propagate::split;
use crate::store::{PeerField, PeerStore};

/// A restaurant registration, referenced only for duplicate checks.
/// Menu and ordering data live outside the mesh core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Restaurant {
    pub name: String,
    pub address: String,
    pub city: String,
    pub country: String,
    pub coord: GeoCoord,
}

/// Query for restaurant lookups; unset fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RestaurantQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

impl RestaurantQuery {
    /// Match a restaurant against the set fields.
    pub fn matches(&self, restaurant: &Restaurant) -> bool {
        fn field(query: &Option<String>, value: &str) -> bool {
            query.as_deref().map_or(true, |q| q == value)
        }
        field(&self.name, &restaurant.name)
            && field(&self.address, &restaurant.address)
            && field(&self.city, &restaurant.city)
            && field(&self.country, &restaurant.country)
    }
}

/// Restaurant lookup, specified only at this boundary.
pub trait RestaurantStore: Send + Sync {
    fn find_one(&self, query: &RestaurantQuery) -> std::result::Result<Option<Restaurant>, StoreError>;
}

/// In-memory restaurant store.
#[derive(Debug, Default)]
pub struct MemoryRestaurantStore {
    inner: RwLock<Vec<Restaurant>>,
}

impl MemoryRestaurantStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, restaurant: Restaurant) {
        self.inner
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(restaurant);
    }
}

impl RestaurantStore for MemoryRestaurantStore {
    fn find_one(&self, query: &RestaurantQuery) -> std::result::Result<Option<Restaurant>, StoreError> {
        Ok(self
            .inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .find(|r| query.matches(r))
            .cloned())
    }
}

/// Asking a remote peer whether it already has a restaurant.
#[async_trait]
pub trait PeerProbe: Send + Sync + 'static {
    async fn has_restaurant(
        &self,
        url: &str,
        query: &RestaurantQuery,
    ) -> std::result::Result<bool, TransportError>;
}

/// Service operations above the peer store.
pub struct PeerService<S, R> {
    store: Arc<S>,
    restaurants: Arc<R>,
    geo: GeoCalculator,
}

impl<S, R> PeerService<S, R>
where
    S: PeerStore,
    R: RestaurantStore,
{
    /// Create the service.
    pub fn new(store: Arc<S>, restaurants: Arc<R>, geo: GeoCalculator) -> Self {
        Self {
            store,
            restaurants,
            geo,
        }
    }

    /// Apply a peer presentation: insert the newcomer and, when it shares
    /// self's locale, extend self's membership sets where the geo
    /// predicates say so. Fields are persisted partially.
    pub fn presentation(&self, new_peer: Peer) -> Result<()> {
        new_peer.validate()?;
        let id = self.store.insert(new_peer.clone())?;
        let mut self_peer = self.store.get_self()?;

        if !new_peer.shares_locale(&self_peer) {
            debug!(url = %new_peer.url, "presented peer is outside our locale");
            return Ok(());
        }

        let mut changed = Vec::new();
        if self.geo.influence_overlap(self_peer.center, new_peer.center)
            && self_peer.in_area_peers.insert(id)
        {
            changed.push(PeerField::InAreaPeers);
        }
        if self
            .geo
            .in_delivery_area(self_peer.delivery_area(), new_peer.delivery_area())
            && self_peer.in_delivery_area_peers.insert(id)
        {
            changed.push(PeerField::InDeliveryAreaPeers);
        }
        if !changed.is_empty() {
            self.store.update(&self_peer, &changed)?;
        }
        Ok(())
    }

    /// Broadcast map over every known url except the excluded ones.
    pub fn send_map_excluding(
        &self,
        excludes: &[&str],
    ) -> Result<HashMap<String, Vec<String>>> {
        let urls = self.store.all_urls(excludes)?;
        Ok(split(&urls))
    }

    /// Whether this node already has a matching restaurant.
    pub fn have_restaurant(&self, query: &RestaurantQuery) -> Result<bool> {
        Ok(self.restaurants.find_one(query)?.is_some())
    }

    /// Ask several peers in parallel whether any already has a matching
    /// restaurant.
    ///
    /// One task per url; results come back over a channel and EVERY result
    /// is drained before answering, so an early positive never leaves a
    /// producer stuck behind an abandoned receiver. A peer that fails to
    /// answer counts as not having the restaurant.
    pub async fn any_peer_has_restaurant<P: PeerProbe>(
        &self,
        probe: &Arc<P>,
        urls: &[String],
        query: &RestaurantQuery,
    ) -> bool {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let mut probes = JoinSet::new();
        for url in urls {
            let probe = Arc::clone(probe);
            let tx = tx.clone();
            let url = url.clone();
            let query = query.clone();
            probes.spawn(async move {
                let result = probe.has_restaurant(&url, &query).await;
                let _ = tx.send((url, result));
            });
        }
        drop(tx);

        let mut found = false;
        let mut failures = 0usize;
        while let Some((url, result)) = rx.recv().await {
            match result {
                Ok(true) => found = true,
                Ok(false) => {}
                Err(err) => {
                    failures += 1;
                    warn!(url = %url, error = %err, "restaurant probe failed");
                }
            }
        }
        while probes.join_next().await.is_some() {}

        if failures > 0 {
            debug!(failures, total = urls.len(), "some restaurant probes failed");
        }
        found
    }
}
