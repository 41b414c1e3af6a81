//! Request and response bodies of the peer HTTP boundary.

use reparto_mesh::Peer;
use serde::{Deserialize, Serialize};

/// Body of `POST /peer/present`: a newcomer introducing itself, plus the
/// urls the receiver should announce it to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresentationBody {
    #[serde(rename = "newPeer")]
    pub new_peer: Peer,
    #[serde(rename = "sendTo", default)]
    pub send_to: Vec<String>,
}

/// Query of `GET /peer/all`: comma-separated urls to leave out.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AllPeersQuery {
    #[serde(default)]
    pub excludes: Option<String>,
}

impl AllPeersQuery {
    /// The exclusion list as individual urls.
    pub fn excludes(&self) -> Vec<&str> {
        self.excludes
            .as_deref()
            .map(|s| s.split(',').filter(|u| !u.is_empty()).collect())
            .unwrap_or_default()
    }
}

/// Response of `GET /peer/restaurant/have`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HaveRestaurantResponse {
    pub result: bool,
}

/// Body of `PUT /peer/delivery-radius`.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct DeliveryRadiusBody {
    #[serde(rename = "deliveryRadiusKm")]
    pub delivery_radius_km: f64,
}

/// Response of `PUT /peer/delivery-radius`: what the recalculation did.
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryRadiusResponse {
    pub scanned: usize,
    pub members: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn excludes_splits_on_commas() {
        let query = AllPeersQuery {
            excludes: Some("http://a.example,http://b.example".into()),
        };
        assert_eq!(query.excludes(), vec!["http://a.example", "http://b.example"]);
    }

    #[test]
    fn empty_excludes_is_empty() {
        assert!(AllPeersQuery::default().excludes().is_empty());
        let trailing = AllPeersQuery {
            excludes: Some("http://a.example,".into()),
        };
        assert_eq!(trailing.excludes(), vec!["http://a.example"]);
    }

    #[test]
    fn presentation_body_uses_camel_case_keys() {
        let body = PresentationBody {
            new_peer: Peer::new(
                "http://new.example",
                reparto_geo::GeoCoord::new(-58.40, -34.60),
                "Buenos Aires",
                "Argentina",
            ),
            send_to: vec!["http://a.example".into()],
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("newPeer").is_some());
        assert_eq!(json["sendTo"][0], "http://a.example");
    }
}
