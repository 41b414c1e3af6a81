//! Reparto Geographic Math
//!
//! Pure geographic primitives for the Reparto mesh: great-circle distance,
//! exact coordinate coincidence, and the two overlap predicates that drive
//! peer membership:
//!
//! - **Influence overlap**: two peers' influence areas intersect when their
//!   centers are within twice the influence radius of each other.
//! - **Delivery overlap**: two peers can hand orders across when their
//!   center distance is within the sum of their delivery radii.
//!
//! Everything here is stateless and side-effect free. Coordinate
//! coincidence is exact `f64` equality, no epsilon — an inherited rule of
//! the mesh that the membership logic depends on.

mod coords;
mod overlap;

pub use coords::GeoCoord;
pub use overlap::{DeliveryArea, GeoCalculator};

/// Mean Earth radius in kilometers, used by the haversine distance.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Default influence radius in kilometers.
///
/// The influence radius is system-wide by default, but remains a parameter
/// of [`GeoCalculator`] so a deployment can tune it per node.
pub const DEFAULT_INFLUENCE_RADIUS_KM: f64 = 10.0;
