//! Incremental recomputation of delivery-area membership when a peer's
//! own radius changes.

use std::collections::BTreeSet;
use std::sync::Arc;

use reparto_geo::GeoCalculator;
use tracing::debug;

use crate::error::Result;
use crate::peer::{Peer, PeerId};
use crate::store::{PeerField, PeerStore};

/// What a recalculation scanned and concluded; lets callers and tests see
/// that the shrink path stayed bounded by the existing membership set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecalcOutcome {
    /// Candidates evaluated.
    pub scanned: usize,
    /// Whether the bounded shrink path was taken.
    pub shrank: bool,
    /// The recomputed membership set.
    pub in_area: BTreeSet<PeerId>,
}

/// Recomputes a peer's delivery-neighbor set on radius change.
pub struct DeliveryAreaRecalculator<S> {
    store: Arc<S>,
    geo: GeoCalculator,
}

impl<S: PeerStore> DeliveryAreaRecalculator<S> {
    /// Create a recalculator over the store and geo math.
    pub fn new(store: Arc<S>, geo: GeoCalculator) -> Self {
        Self { store, geo }
    }

    /// Apply a new delivery radius to `peer` and recompute its
    /// `in_delivery_area_peers` set.
    ///
    /// A smaller radius can only drop neighbors, so the scan is bounded by
    /// the current membership set. A larger (or equal) radius can pull
    /// previously out-of-range peers in, so the whole locale is rescanned.
    /// The membership set is overwritten wholesale and persisted in one
    /// update.
    ///
    /// Affected neighbors are NOT notified from this path; each only
    /// learns of the change if it observes a separate announcement.
    pub fn update_delivery_radius(
        &self,
        mut peer: Peer,
        new_radius_km: f64,
    ) -> Result<RecalcOutcome> {
        let old_radius = peer.delivery_radius_km;
        peer.delivery_radius_km = new_radius_km;
        self.store.update(&peer, &[PeerField::DeliveryRadius])?;

        let shrank = new_radius_km < old_radius;
        let candidates = if shrank {
            let ids: Vec<PeerId> = peer.in_delivery_area_peers.iter().copied().collect();
            self.store.get_many_by_ids(&ids)?
        } else {
            self.store.find_by_locale(&peer.city, &peer.country)?
        };

        let mut in_area = BTreeSet::new();
        let mut scanned = 0;
        for candidate in candidates {
            if candidate.id == peer.id {
                continue;
            }
            scanned += 1;
            if self
                .geo
                .in_delivery_area(peer.delivery_area(), candidate.delivery_area())
            {
                if let Some(id) = candidate.id {
                    in_area.insert(id);
                }
            }
        }

        peer.in_delivery_area_peers = in_area.clone();
        self.store
            .update(&peer, &[PeerField::InDeliveryAreaPeers])?;

        debug!(
            url = %peer.url,
            old_radius,
            new_radius_km,
            shrank,
            scanned,
            members = in_area.len(),
            "delivery area recalculated"
        );
        Ok(RecalcOutcome {
            scanned,
            shrank,
            in_area,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryPeerStore;
    use reparto_geo::GeoCoord;

    const SELF_URL: &str = "http://self.example";

    /// Place a peer `km` kilometers north of self's center.
    fn peer_at_km(url: &str, km: f64) -> Peer {
        Peer::new(
            url,
            GeoCoord::new(-58.40, -34.60 + km / 111.195),
            "Buenos Aires",
            "Argentina",
        )
    }

    fn setup() -> (Arc<MemoryPeerStore>, DeliveryAreaRecalculator<MemoryPeerStore>) {
        let store = Arc::new(MemoryPeerStore::new(SELF_URL));
        let recalc =
            DeliveryAreaRecalculator::new(Arc::clone(&store), GeoCalculator::default());
        (store, recalc)
    }

    #[test]
    fn growth_rescans_the_locale() {
        let (store, recalc) = setup();
        store
            .insert(peer_at_km(SELF_URL, 0.0).with_delivery_radius(2.0))
            .unwrap();
        let near = store.insert(peer_at_km("http://near.example", 4.0)).unwrap();
        let far = store.insert(peer_at_km("http://far.example", 8.0)).unwrap();
        // Different locale: never a candidate.
        let mut foreign = peer_at_km("http://mvd.example", 5.0);
        foreign.city = "Montevideo".into();
        foreign.country = "Uruguay".into();
        store.insert(foreign).unwrap();

        let me = store.get_self().unwrap();
        let outcome = recalc.update_delivery_radius(me, 6.0).unwrap();

        assert!(!outcome.shrank);
        // Locale scan: the two local peers, self excluded.
        assert_eq!(outcome.scanned, 2);
        assert!(outcome.in_area.contains(&near));
        assert!(!outcome.in_area.contains(&far));

        let stored = store.get_self().unwrap();
        assert_eq!(stored.delivery_radius_km, 6.0);
        assert_eq!(stored.in_delivery_area_peers, outcome.in_area);
    }

    #[test]
    fn shrink_only_rechecks_current_members() {
        let (store, recalc) = setup();
        store
            .insert(peer_at_km(SELF_URL, 0.0).with_delivery_radius(6.0))
            .unwrap();
        let near = store.insert(peer_at_km("http://near.example", 1.5)).unwrap();
        let mid = store.insert(peer_at_km("http://mid.example", 4.0)).unwrap();
        // In the locale but never in the membership set: must not be
        // scanned on the shrink path.
        store.insert(peer_at_km("http://other.example", 5.5)).unwrap();

        let mut me = store.get_self().unwrap();
        me.in_delivery_area_peers = [near, mid].into_iter().collect();
        store
            .update(&me, &[PeerField::InDeliveryAreaPeers])
            .unwrap();

        let me = store.get_self().unwrap();
        let outcome = recalc.update_delivery_radius(me, 2.0).unwrap();

        assert!(outcome.shrank);
        // Radius 6 -> 2: only the two current members were re-checked,
        // not the full locale.
        assert_eq!(outcome.scanned, 2);
        assert!(outcome.in_area.contains(&near));
        assert!(!outcome.in_area.contains(&mid));

        assert_eq!(
            store.get_self().unwrap().in_delivery_area_peers,
            outcome.in_area
        );
    }

    #[test]
    fn equal_radius_takes_the_locale_path() {
        let (store, recalc) = setup();
        store
            .insert(peer_at_km(SELF_URL, 0.0).with_delivery_radius(3.0))
            .unwrap();
        store.insert(peer_at_km("http://near.example", 2.0)).unwrap();

        let me = store.get_self().unwrap();
        let outcome = recalc.update_delivery_radius(me, 3.0).unwrap();
        assert!(!outcome.shrank);
        assert_eq!(outcome.scanned, 1);
    }

    #[test]
    fn membership_is_overwritten_wholesale() {
        let (store, recalc) = setup();
        store
            .insert(peer_at_km(SELF_URL, 0.0).with_delivery_radius(5.0))
            .unwrap();
        let near = store.insert(peer_at_km("http://near.example", 4.0)).unwrap();

        // Seed with a stale id that no longer resolves.
        let mut me = store.get_self().unwrap();
        me.in_delivery_area_peers.insert(PeerId::from_raw(999));
        store
            .update(&me, &[PeerField::InDeliveryAreaPeers])
            .unwrap();

        let me = store.get_self().unwrap();
        let outcome = recalc.update_delivery_radius(me, 6.0).unwrap();

        // The stale id is gone: the set is recomputed, not patched.
        assert_eq!(outcome.in_area, [near].into_iter().collect());
    }
}
