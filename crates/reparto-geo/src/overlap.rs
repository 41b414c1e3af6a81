//! Influence and delivery overlap predicates.

use crate::{GeoCoord, DEFAULT_INFLUENCE_RADIUS_KM};

/// A peer's delivery footprint: its center and delivery radius.
///
/// A radius of zero means the peer delivers nowhere but its own center.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DeliveryArea {
    /// Center of the region.
    pub center: GeoCoord,
    /// Delivery radius in kilometers; never negative.
    pub radius_km: f64,
}

impl DeliveryArea {
    /// Create a delivery area.
    pub const fn new(center: GeoCoord, radius_km: f64) -> Self {
        Self { center, radius_km }
    }
}

/// Stateless overlap calculator.
///
/// Carries the influence radius as configuration. The mesh historically
/// used one system-wide constant; keeping it a parameter lets a deployment
/// tune it without touching the predicates.
#[derive(Debug, Clone, Copy)]
pub struct GeoCalculator {
    influence_radius_km: f64,
}

impl Default for GeoCalculator {
    fn default() -> Self {
        Self::new(DEFAULT_INFLUENCE_RADIUS_KM)
    }
}

impl GeoCalculator {
    /// Create a calculator with the given influence radius in kilometers.
    pub const fn new(influence_radius_km: f64) -> Self {
        Self { influence_radius_km }
    }

    /// The configured influence radius in kilometers.
    pub const fn influence_radius_km(&self) -> f64 {
        self.influence_radius_km
    }

    /// Whether a point falls inside the influence area around `center`.
    ///
    /// Used to decide which peer "owns" a new restaurant registration.
    pub fn in_influence_area(&self, center: GeoCoord, point: GeoCoord) -> bool {
        if center.is_same(&point) {
            return true;
        }
        center.distance_km(&point) <= self.influence_radius_km
    }

    /// Whether the influence areas around two centers overlap.
    ///
    /// Coincident centers always overlap; otherwise the areas intersect
    /// when the centers are within twice the influence radius.
    pub fn influence_overlap(&self, a: GeoCoord, b: GeoCoord) -> bool {
        if a.is_same(&b) {
            return true;
        }
        a.distance_km(&b) <= 2.0 * self.influence_radius_km
    }

    /// Whether `other` lies inside `self_area`'s delivery reach.
    ///
    /// Coincident centers are always in range. A zero own radius delivers
    /// nowhere but itself. Otherwise the two areas are in mutual range when
    /// the center distance is within the sum of the radii.
    pub fn in_delivery_area(&self, self_area: DeliveryArea, other: DeliveryArea) -> bool {
        if self_area.center.is_same(&other.center) {
            return true;
        }
        if self_area.radius_km == 0.0 {
            return false;
        }
        let distance = self_area.center.distance_km(&other.center);
        distance <= self_area.radius_km + other.radius_km
    }
}
