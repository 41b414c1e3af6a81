//! The peer record: one autonomous node per geographic delivery region.

use std::collections::BTreeSet;

use reparto_geo::{DeliveryArea, GeoCoord};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Unique peer identifier, assigned by the store on insert.
///
/// Ids are local to a store: the same peer is known under different ids on
/// different nodes. Peers reference each other across the wire by url.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct PeerId(u64);

impl PeerId {
    /// Create from a raw value.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw value.
    pub const fn raw(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for PeerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "peer#{}", self.0)
    }
}

/// A mesh participant representing one geographic delivery region.
///
/// The two membership sets are maintained incrementally as announcements
/// arrive; they are never globally recomputed, and membership is not
/// symmetric across peers (A may track B without B tracking A, because
/// each node updates only its own record).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Peer {
    /// Store-assigned id; `None` until inserted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<PeerId>,

    /// Reachable network address; unique across the store.
    pub url: String,

    /// Center of the region.
    pub center: GeoCoord,

    /// Locale tags used to scope candidate sets for re-scans.
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub country: String,

    /// Delivery radius in kilometers; 0 delivers nowhere but itself.
    #[serde(default)]
    pub delivery_radius_km: f64,

    /// Ids of peers whose influence areas overlap this peer's.
    #[serde(default)]
    pub in_area_peers: BTreeSet<PeerId>,

    /// Ids of peers within mutual delivery range.
    #[serde(default)]
    pub in_delivery_area_peers: BTreeSet<PeerId>,
}

impl Peer {
    /// Create a new, not-yet-inserted peer.
    pub fn new(
        url: impl Into<String>,
        center: GeoCoord,
        city: impl Into<String>,
        country: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            url: url.into(),
            center,
            city: city.into(),
            country: country.into(),
            delivery_radius_km: 0.0,
            in_area_peers: BTreeSet::new(),
            in_delivery_area_peers: BTreeSet::new(),
        }
    }

    /// Set the delivery radius (builder style).
    pub fn with_delivery_radius(mut self, radius_km: f64) -> Self {
        self.delivery_radius_km = radius_km;
        self
    }

    /// Check that this record is a well-formed peer.
    ///
    /// Malformed announcements are logged and skipped by the handlers;
    /// they still propagate.
    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(Error::Validation("url: must not be empty".into()));
        }
        if !self.center.is_valid() {
            return Err(Error::Validation(format!(
                "center: {} is not a valid coordinate",
                self.center
            )));
        }
        if !self.delivery_radius_km.is_finite() || self.delivery_radius_km < 0.0 {
            return Err(Error::Validation(format!(
                "delivery_radius_km: {} must be finite and non-negative",
                self.delivery_radius_km
            )));
        }
        Ok(())
    }

    /// This peer's delivery footprint.
    pub fn delivery_area(&self) -> DeliveryArea {
        DeliveryArea::new(self.center, self.delivery_radius_km)
    }

    /// Whether two peers share the same city and country.
    pub fn shares_locale(&self, other: &Peer) -> bool {
        self.city == other.city && self.country == other.country
    }
}
