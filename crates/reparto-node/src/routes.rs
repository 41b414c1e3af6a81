//! The peer-facing HTTP surface.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use reparto_mesh::{Error, Event, Peer, PeerStore, Restaurant, RestaurantQuery};
use tracing::{debug, info, warn};

use crate::state::AppState;
use crate::wire::{
    AllPeersQuery, DeliveryRadiusBody, DeliveryRadiusResponse, HaveRestaurantResponse,
    PresentationBody,
};

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/peer/event", post(receive_event))
        .route("/peer/present", post(peer_presentation))
        .route("/peer/all", get(all_peers))
        .route("/peer/restaurant/have", get(have_restaurant))
        .route("/peer/restaurant", post(add_restaurant))
        .route("/peer/delivery-radius", put(update_delivery_radius))
        .with_state(state)
}

fn status_of(err: &Error) -> StatusCode {
    match err {
        Error::Validation(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Intake for propagated events.
///
/// A decodable event is queued and acknowledged; a malformed one is
/// logged and dropped, still with a 200. Rerouting a body no node can
/// decode would only replay the same failure down the continuation.
async fn receive_event(State(state): State<Arc<AppState>>, body: Bytes) -> StatusCode {
    match serde_json::from_slice::<Event>(&body) {
        Ok(event) => {
            debug!(event = event.name(), "event queued");
            state.queue.enqueue(event);
        }
        Err(err) => warn!(error = %err, "undecodable event dropped"),
    }
    StatusCode::OK
}

/// A newcomer introducing itself, relayed along the broadcast tree.
async fn peer_presentation(
    State(state): State<Arc<AppState>>,
    Json(body): Json<PresentationBody>,
) -> Result<StatusCode, StatusCode> {
    state
        .service
        .presentation(body.new_peer.clone())
        .map_err(|e| {
            warn!(url = %body.new_peer.url, error = %e, "presentation rejected");
            status_of(&e)
        })?;
    info!(url = %body.new_peer.url, fanout = body.send_to.len(), "peer presented");

    if !body.send_to.is_empty() {
        // Detached: the newcomer gets its 200 before the fan-out settles.
        let _ = state
            .propagator
            .spawn(Event::add_peer(body.new_peer, body.send_to));
    }
    Ok(StatusCode::OK)
}

/// The full peer table, minus the urls the caller already knows.
async fn all_peers(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AllPeersQuery>,
) -> Result<Json<Vec<Peer>>, StatusCode> {
    let peers = state
        .store
        .all_peers(&query.excludes())
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    Ok(Json(peers))
}

/// Whether this node already registered a matching restaurant.
async fn have_restaurant(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RestaurantQuery>,
) -> Result<Json<HaveRestaurantResponse>, StatusCode> {
    let result = state
        .service
        .have_restaurant(&query)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    Ok(Json(HaveRestaurantResponse { result }))
}

/// Register a restaurant with this node.
///
/// Rejected when its coordinate falls outside our influence area, or when
/// this node or any in-area peer already has a matching registration.
async fn add_restaurant(
    State(state): State<Arc<AppState>>,
    Json(restaurant): Json<Restaurant>,
) -> Result<StatusCode, StatusCode> {
    let me = state
        .store
        .get_self()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    if !state.geo.in_influence_area(me.center, restaurant.coord) {
        return Err(StatusCode::BAD_REQUEST);
    }

    let query = RestaurantQuery {
        name: Some(restaurant.name.clone()),
        address: Some(restaurant.address.clone()),
        city: Some(restaurant.city.clone()),
        country: Some(restaurant.country.clone()),
    };
    let local = state
        .service
        .have_restaurant(&query)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    if local {
        return Err(StatusCode::BAD_REQUEST);
    }

    let in_area_ids: Vec<_> = me.in_area_peers.iter().copied().collect();
    let urls = state
        .store
        .urls_by_ids(&in_area_ids)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    if state
        .service
        .any_peer_has_restaurant(&state.client, &urls, &query)
        .await
    {
        return Err(StatusCode::BAD_REQUEST);
    }

    info!(name = %restaurant.name, "restaurant registered");
    state.restaurants.insert(restaurant);
    Ok(StatusCode::OK)
}

/// Change this node's delivery radius and recompute its delivery
/// neighbors.
async fn update_delivery_radius(
    State(state): State<Arc<AppState>>,
    Json(body): Json<DeliveryRadiusBody>,
) -> Result<Json<DeliveryRadiusResponse>, StatusCode> {
    if !body.delivery_radius_km.is_finite() || body.delivery_radius_km < 0.0 {
        return Err(StatusCode::BAD_REQUEST);
    }
    let me = state
        .store
        .get_self()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    let outcome = state
        .recalc
        .update_delivery_radius(me, body.delivery_radius_km)
        .map_err(|e| status_of(&e))?;
    Ok(Json(DeliveryRadiusResponse {
        scanned: outcome.scanned,
        members: outcome.in_area.len(),
    }))
}
