//! Shared state behind the HTTP handlers.

use std::sync::Arc;

use reparto_geo::GeoCalculator;
use reparto_mesh::{
    DeliveryAreaRecalculator, EventQueue, MemoryPeerStore, MemoryRestaurantStore, PeerService,
    Propagator,
};

use crate::transport::HttpPeerClient;

/// Everything the routes need: the stores, the event queue the loop
/// drains, and the propagator for fan-outs started at the boundary.
pub struct AppState {
    pub host: String,
    pub store: Arc<MemoryPeerStore>,
    pub restaurants: Arc<MemoryRestaurantStore>,
    pub queue: Arc<EventQueue>,
    pub service: PeerService<MemoryPeerStore, MemoryRestaurantStore>,
    pub propagator: Arc<Propagator<HttpPeerClient>>,
    pub recalc: DeliveryAreaRecalculator<MemoryPeerStore>,
    pub client: Arc<HttpPeerClient>,
    pub geo: GeoCalculator,
}

impl AppState {
    /// Wire the object graph for one node.
    pub fn new(host: impl Into<String>, geo: GeoCalculator, client: Arc<HttpPeerClient>) -> Self {
        let host = host.into();
        let store = Arc::new(MemoryPeerStore::new(host.clone()));
        let restaurants = Arc::new(MemoryRestaurantStore::new());
        Self {
            host,
            store: Arc::clone(&store),
            restaurants: Arc::clone(&restaurants),
            queue: Arc::new(EventQueue::new()),
            service: PeerService::new(Arc::clone(&store), Arc::clone(&restaurants), geo),
            propagator: Arc::new(Propagator::new(Arc::clone(&client))),
            recalc: DeliveryAreaRecalculator::new(store, geo),
            client,
            geo,
        }
    }
}
