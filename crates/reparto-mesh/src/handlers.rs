//! Per-event-kind business logic.
//!
//! Every handler guarantees propagation: local application may fail on
//! validation or store errors (logged, no retry), but the event is always
//! handed to the propagator with its remaining target list afterwards. A
//! local failure never stops the rest of the mesh from hearing about the
//! event.

use std::sync::Arc;

use reparto_geo::GeoCalculator;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::{Result, StoreError};
use crate::event::{Event, EventKind};
use crate::peer::Peer;
use crate::propagate::{EventTransport, PropagationReport, Propagator};
use crate::store::{PeerField, PeerStore};

/// Event handlers over the peer store, geo math, and the propagator.
pub struct EventHandlers<S, T> {
    store: Arc<S>,
    geo: GeoCalculator,
    propagator: Arc<Propagator<T>>,
}

impl<S, T> EventHandlers<S, T>
where
    S: PeerStore,
    T: EventTransport,
{
    /// Create the handler set.
    pub fn new(store: Arc<S>, geo: GeoCalculator, propagator: Arc<Propagator<T>>) -> Self {
        Self {
            store,
            geo,
            propagator,
        }
    }

    /// Dispatch an event to its handler, exhaustively by kind.
    pub fn handle(&self, event: Event) -> JoinHandle<PropagationReport> {
        match event.kind {
            EventKind::AddPeer(_) => self.handle_add_peer(event),
            EventKind::DeliveryAreaUpdated(_) => self.handle_delivery_area_updated(event),
        }
    }

    /// Handle a peer announcement.
    ///
    /// Inserts the announced peer and incrementally extends self's
    /// membership sets where the geo predicates say so, persisting only
    /// the fields that changed. Returns the propagation handle; callers
    /// that care whether the fan-out finished can await it.
    pub fn handle_add_peer(&self, event: Event) -> JoinHandle<PropagationReport> {
        if let EventKind::AddPeer(announced) = &event.kind {
            if let Err(err) = self.apply_add_peer(announced.clone()) {
                warn!(url = %announced.url, error = %err, "addPeer not applied locally");
            }
        }
        self.propagator.spawn(event)
    }

    /// Handle a delivery-area change announcement.
    ///
    /// Applies the announced radius to the stored record and re-evaluates
    /// that one peer's delivery membership against self.
    pub fn handle_delivery_area_updated(&self, event: Event) -> JoinHandle<PropagationReport> {
        if let EventKind::DeliveryAreaUpdated(announced) = &event.kind {
            if let Err(err) = self.apply_delivery_area_updated(announced) {
                warn!(url = %announced.url, error = %err, "deliveryAreaUpdated not applied locally");
            }
        }
        self.propagator.spawn(event)
    }

    fn apply_add_peer(&self, announced: Peer) -> Result<()> {
        let mut self_peer = self.store.get_self()?;
        announced.validate()?;

        let id = self.store.insert(announced.clone())?;

        let mut changed = Vec::new();
        if self.geo.influence_overlap(self_peer.center, announced.center)
            && self_peer.in_area_peers.insert(id)
        {
            changed.push(PeerField::InAreaPeers);
        }
        if self
            .geo
            .in_delivery_area(self_peer.delivery_area(), announced.delivery_area())
            && self_peer.in_delivery_area_peers.insert(id)
        {
            changed.push(PeerField::InDeliveryAreaPeers);
        }

        if !changed.is_empty() {
            self.store.update(&self_peer, &changed)?;
        }
        debug!(url = %announced.url, %id, fields = changed.len(), "peer added");
        Ok(())
    }

    fn apply_delivery_area_updated(&self, announced: &Peer) -> Result<()> {
        let mut self_peer = self.store.get_self()?;
        announced.validate()?;

        let stored = self
            .store
            .set_radius_by_url(&announced.url, announced.delivery_radius_km)?;
        let id = stored.id.ok_or(StoreError::Unidentified)?;

        let in_range = self
            .geo
            .in_delivery_area(self_peer.delivery_area(), stored.delivery_area());
        let tracked = self_peer.in_delivery_area_peers.contains(&id);

        // Symmetric difference against current membership: touch the set
        // only when the peer actually entered or left range.
        let changed = if in_range && !tracked {
            self_peer.in_delivery_area_peers.insert(id)
        } else if !in_range && tracked {
            self_peer.in_delivery_area_peers.remove(&id)
        } else {
            false
        };

        if changed {
            self.store
                .update(&self_peer, &[PeerField::InDeliveryAreaPeers])?;
            debug!(url = %announced.url, in_range, "delivery membership updated");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::store::MemoryPeerStore;
    use async_trait::async_trait;
    use reparto_geo::GeoCoord;
    use std::sync::Mutex;

    /// Transport that records delivered events and always succeeds.
    #[derive(Default)]
    struct CapturingTransport {
        deliveries: Mutex<Vec<(String, Event)>>,
    }

    impl CapturingTransport {
        fn deliveries(&self) -> Vec<(String, Event)> {
            self.deliveries.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl EventTransport for CapturingTransport {
        async fn deliver(&self, url: &str, event: &Event) -> std::result::Result<(), TransportError> {
            self.deliveries
                .lock()
                .unwrap()
                .push((url.to_string(), event.clone()));
            Ok(())
        }
    }

    const SELF_URL: &str = "http://self.example";

    fn self_peer() -> Peer {
        Peer::new(
            SELF_URL,
            GeoCoord::new(-58.40, -34.60),
            "Buenos Aires",
            "Argentina",
        )
        .with_delivery_radius(5.0)
    }

    /// A peer ~4 km north of self: inside both overlap predicates.
    fn nearby_peer(url: &str) -> Peer {
        Peer::new(
            url,
            GeoCoord::new(-58.40, -34.5640),
            "Buenos Aires",
            "Argentina",
        )
        .with_delivery_radius(3.0)
    }

    /// A peer ~200 km away: outside both predicates.
    fn faraway_peer(url: &str) -> Peer {
        Peer::new(url, GeoCoord::new(-56.16, -34.90), "Montevideo", "Uruguay")
            .with_delivery_radius(3.0)
    }

    fn handlers(
        store: &Arc<MemoryPeerStore>,
        transport: &Arc<CapturingTransport>,
    ) -> EventHandlers<MemoryPeerStore, CapturingTransport> {
        EventHandlers::new(
            Arc::clone(store),
            GeoCalculator::default(),
            Arc::new(Propagator::new(Arc::clone(transport))),
        )
    }

    fn store_with_self() -> Arc<MemoryPeerStore> {
        let store = Arc::new(MemoryPeerStore::new(SELF_URL));
        store.insert(self_peer()).unwrap();
        store
    }

    #[tokio::test]
    async fn add_peer_extends_both_membership_sets() {
        let store = store_with_self();
        let transport = Arc::new(CapturingTransport::default());
        let handlers = handlers(&store, &transport);

        let event = Event::add_peer(nearby_peer("http://near.example"), Vec::new());
        handlers.handle_add_peer(event).await.unwrap();

        let me = store.get_self().unwrap();
        assert_eq!(me.in_area_peers.len(), 1);
        assert_eq!(me.in_delivery_area_peers.len(), 1);
    }

    #[tokio::test]
    async fn add_peer_out_of_range_changes_nothing() {
        let store = store_with_self();
        let transport = Arc::new(CapturingTransport::default());
        let handlers = handlers(&store, &transport);

        let event = Event::add_peer(faraway_peer("http://far.example"), Vec::new());
        handlers.handle_add_peer(event).await.unwrap();

        let me = store.get_self().unwrap();
        assert!(me.in_area_peers.is_empty());
        assert!(me.in_delivery_area_peers.is_empty());
        // The peer itself was still inserted.
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn invalid_payload_still_propagates() {
        let store = store_with_self();
        let transport = Arc::new(CapturingTransport::default());
        let handlers = handlers(&store, &transport);

        let mut bad = nearby_peer("http://bad.example");
        bad.url = String::new();
        let event = Event::add_peer(bad, vec!["http://next.example".into()]);

        let report = handlers.handle_add_peer(event).await.unwrap();
        assert_eq!(report.delivered, 1);

        // Local application was aborted: nothing was inserted.
        assert_eq!(store.len(), 1);
        // But the mesh still heard about it.
        assert_eq!(transport.deliveries().len(), 1);
    }

    #[tokio::test]
    async fn duplicate_announcement_still_propagates() {
        let store = store_with_self();
        let transport = Arc::new(CapturingTransport::default());
        let handlers = handlers(&store, &transport);

        let peer = nearby_peer("http://near.example");
        handlers
            .handle_add_peer(Event::add_peer(peer.clone(), Vec::new()))
            .await
            .unwrap();
        // Second announcement of the same url fails the insert but the
        // fan-out still runs.
        let report = handlers
            .handle_add_peer(Event::add_peer(peer, vec!["http://next.example".into()]))
            .await
            .unwrap();
        assert_eq!(report.delivered, 1);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn delivery_update_adds_peer_that_came_into_range() {
        let store = store_with_self();
        let transport = Arc::new(CapturingTransport::default());
        let handlers = handlers(&store, &transport);

        // Known peer ~6 km away with no radius: out of delivery range.
        let mut other = nearby_peer("http://other.example");
        other.center = GeoCoord::new(-58.40, -34.5460);
        other.delivery_radius_km = 0.0;
        let id = store.insert(other.clone()).unwrap();
        assert!(store.get_self().unwrap().in_delivery_area_peers.is_empty());

        // It announces a 2 km radius: 6 km <= 5 + 2, now in range.
        other.delivery_radius_km = 2.0;
        handlers
            .handle_delivery_area_updated(Event::delivery_area_updated(other, Vec::new()))
            .await
            .unwrap();

        let me = store.get_self().unwrap();
        assert!(me.in_delivery_area_peers.contains(&id));
        assert_eq!(store.get_by_id(id).unwrap().delivery_radius_km, 2.0);
    }

    #[tokio::test]
    async fn delivery_update_removes_peer_that_left_range() {
        let store = store_with_self();
        let transport = Arc::new(CapturingTransport::default());
        let handlers = handlers(&store, &transport);

        let mut other = nearby_peer("http://other.example");
        other.center = GeoCoord::new(-58.40, -34.5460);
        other.delivery_radius_km = 2.0;
        let id = store.insert(other.clone()).unwrap();

        // Seed membership as if the announcement had been applied.
        let mut me = store.get_self().unwrap();
        me.in_delivery_area_peers.insert(id);
        store
            .update(&me, &[PeerField::InDeliveryAreaPeers])
            .unwrap();

        // Radius shrinks to zero: 6 km > 5 + 0, out of range again.
        other.delivery_radius_km = 0.0;
        handlers
            .handle_delivery_area_updated(Event::delivery_area_updated(other, Vec::new()))
            .await
            .unwrap();

        assert!(store.get_self().unwrap().in_delivery_area_peers.is_empty());
    }

    #[tokio::test]
    async fn delivery_update_for_unknown_url_still_propagates() {
        let store = store_with_self();
        let transport = Arc::new(CapturingTransport::default());
        let handlers = handlers(&store, &transport);

        let event = Event::delivery_area_updated(
            nearby_peer("http://stranger.example"),
            vec!["http://next.example".into()],
        );
        let report = handlers.handle_delivery_area_updated(event).await.unwrap();
        assert_eq!(report.delivered, 1);
    }

    #[tokio::test]
    async fn handle_dispatches_by_kind() {
        let store = store_with_self();
        let transport = Arc::new(CapturingTransport::default());
        let handlers = handlers(&store, &transport);

        handlers
            .handle(Event::add_peer(nearby_peer("http://near.example"), Vec::new()))
            .await
            .unwrap();
        assert_eq!(store.len(), 2);
    }
}
