//! Peer persistence: the store contract and an in-memory implementation.
//!
//! The store is an external collaborator to the propagation engine. It is
//! responsible for its own concurrency safety; the engine only relies on
//! the operations below. Updates are partial: only the fields named by the
//! caller are written, so concurrent writers touching different fields do
//! not clobber each other.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use crate::error::StoreError;
use crate::peer::{Peer, PeerId};

/// Selector for partial peer updates.
///
/// Only the fields this system ever writes back are representable, which
/// makes an update against an unknown field a compile error rather than a
/// runtime one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerField {
    DeliveryRadius,
    InAreaPeers,
    InDeliveryAreaPeers,
}

/// Persistence contract for peer records.
pub trait PeerStore: Send + Sync {
    /// Insert a peer, assigning it a fresh id. Fails if the url is taken.
    fn insert(&self, peer: Peer) -> Result<PeerId, StoreError>;

    /// Insert several peers at once, in order.
    fn insert_many(&self, peers: Vec<Peer>) -> Result<Vec<PeerId>, StoreError>;

    /// Write only the named fields of `peer` onto its stored record.
    fn update(&self, peer: &Peer, fields: &[PeerField]) -> Result<(), StoreError>;

    /// The record for this node itself.
    fn get_self(&self) -> Result<Peer, StoreError>;

    /// Look a peer up by id.
    fn get_by_id(&self, id: PeerId) -> Result<Peer, StoreError>;

    /// Look several peers up by id; ids with no record are skipped.
    ///
    /// Membership sets may reference peers another store never learned
    /// about, so a missing id is not an error here.
    fn get_many_by_ids(&self, ids: &[PeerId]) -> Result<Vec<Peer>, StoreError>;

    /// All peers sharing a locale.
    fn find_by_locale(&self, city: &str, country: &str) -> Result<Vec<Peer>, StoreError>;

    /// Apply an announced delivery radius to the peer with this url and
    /// return the updated record.
    fn set_radius_by_url(&self, url: &str, radius_km: f64) -> Result<Peer, StoreError>;

    /// All peers except those with an excluded url.
    fn all_peers(&self, excluding: &[&str]) -> Result<Vec<Peer>, StoreError>;

    /// All known urls except the excluded ones.
    fn all_urls(&self, excluding: &[&str]) -> Result<Vec<String>, StoreError>;

    /// Urls for the given ids; ids with no record are skipped.
    fn urls_by_ids(&self, ids: &[PeerId]) -> Result<Vec<String>, StoreError>;
}

#[derive(Debug, Default)]
struct Inner {
    next_id: u64,
    peers: BTreeMap<PeerId, Peer>,
    by_url: HashMap<String, PeerId>,
}

/// In-memory peer store.
///
/// Guarded by a single `RwLock`; `self_url` pins which record `get_self`
/// resolves to.
#[derive(Debug)]
pub struct MemoryPeerStore {
    self_url: String,
    inner: RwLock<Inner>,
}

impl MemoryPeerStore {
    /// Create an empty store for the node reachable at `self_url`.
    pub fn new(self_url: impl Into<String>) -> Self {
        Self {
            self_url: self_url.into(),
            inner: RwLock::new(Inner::default()),
        }
    }

    /// Number of stored peers.
    pub fn len(&self) -> usize {
        self.read().peers.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Inner> {
        // A poisoned lock means a writer panicked; the map itself is
        // still structurally sound, so keep serving.
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    fn insert_locked(inner: &mut Inner, mut peer: Peer) -> Result<PeerId, StoreError> {
        if inner.by_url.contains_key(&peer.url) {
            return Err(StoreError::DuplicateUrl(peer.url));
        }
        inner.next_id += 1;
        let id = PeerId::from_raw(inner.next_id);
        peer.id = Some(id);
        inner.by_url.insert(peer.url.clone(), id);
        inner.peers.insert(id, peer);
        Ok(id)
    }
}

impl PeerStore for MemoryPeerStore {
    fn insert(&self, peer: Peer) -> Result<PeerId, StoreError> {
        Self::insert_locked(&mut self.write(), peer)
    }

    fn insert_many(&self, peers: Vec<Peer>) -> Result<Vec<PeerId>, StoreError> {
        let mut inner = self.write();
        peers
            .into_iter()
            .map(|peer| Self::insert_locked(&mut inner, peer))
            .collect()
    }

    fn update(&self, peer: &Peer, fields: &[PeerField]) -> Result<(), StoreError> {
        let id = peer.id.ok_or(StoreError::Unidentified)?;
        let mut inner = self.write();
        let stored = inner.peers.get_mut(&id).ok_or(StoreError::UnknownId(id))?;
        for field in fields {
            match field {
                PeerField::DeliveryRadius => {
                    stored.delivery_radius_km = peer.delivery_radius_km;
                }
                PeerField::InAreaPeers => {
                    stored.in_area_peers = peer.in_area_peers.clone();
                }
                PeerField::InDeliveryAreaPeers => {
                    stored.in_delivery_area_peers = peer.in_delivery_area_peers.clone();
                }
            }
        }
        Ok(())
    }

    fn get_self(&self) -> Result<Peer, StoreError> {
        let inner = self.read();
        let id = inner
            .by_url
            .get(&self.self_url)
            .ok_or(StoreError::SelfMissing)?;
        inner
            .peers
            .get(id)
            .cloned()
            .ok_or(StoreError::SelfMissing)
    }

    fn get_by_id(&self, id: PeerId) -> Result<Peer, StoreError> {
        self.read()
            .peers
            .get(&id)
            .cloned()
            .ok_or(StoreError::UnknownId(id))
    }

    fn get_many_by_ids(&self, ids: &[PeerId]) -> Result<Vec<Peer>, StoreError> {
        let inner = self.read();
        Ok(ids
            .iter()
            .filter_map(|id| inner.peers.get(id).cloned())
            .collect())
    }

    fn find_by_locale(&self, city: &str, country: &str) -> Result<Vec<Peer>, StoreError> {
        Ok(self
            .read()
            .peers
            .values()
            .filter(|p| p.city == city && p.country == country)
            .cloned()
            .collect())
    }

    fn set_radius_by_url(&self, url: &str, radius_km: f64) -> Result<Peer, StoreError> {
        let mut inner = self.write();
        let id = *inner
            .by_url
            .get(url)
            .ok_or_else(|| StoreError::UnknownUrl(url.to_string()))?;
        let stored = inner.peers.get_mut(&id).ok_or(StoreError::UnknownId(id))?;
        stored.delivery_radius_km = radius_km;
        Ok(stored.clone())
    }

    fn all_peers(&self, excluding: &[&str]) -> Result<Vec<Peer>, StoreError> {
        Ok(self
            .read()
            .peers
            .values()
            .filter(|p| !excluding.contains(&p.url.as_str()))
            .cloned()
            .collect())
    }

    fn all_urls(&self, excluding: &[&str]) -> Result<Vec<String>, StoreError> {
        Ok(self
            .read()
            .peers
            .values()
            .map(|p| p.url.clone())
            .filter(|url| !excluding.contains(&url.as_str()))
            .collect())
    }

    fn urls_by_ids(&self, ids: &[PeerId]) -> Result<Vec<String>, StoreError> {
        let inner = self.read();
        Ok(ids
            .iter()
            .filter_map(|id| inner.peers.get(id).map(|p| p.url.clone()))
            .collect())
    }
}
