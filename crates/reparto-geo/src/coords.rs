//! Geographic coordinates and great-circle distance.

use crate::EARTH_RADIUS_KM;

/// A geographic coordinate in degrees.
///
/// Longitude first, matching the wire order the mesh has always used.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GeoCoord {
    /// Longitude in degrees, in [-180, 180].
    pub long: f64,
    /// Latitude in degrees, in [-90, 90].
    pub lat: f64,
}

impl GeoCoord {
    /// Create a coordinate from longitude and latitude in degrees.
    pub const fn new(long: f64, lat: f64) -> Self {
        Self { long, lat }
    }

    /// Exact component-wise equality.
    ///
    /// Deliberately no epsilon tolerance: two centers are "the same place"
    /// only when both components are bit-equal.
    pub fn is_same(&self, other: &GeoCoord) -> bool {
        self.long == other.long && self.lat == other.lat
    }

    /// Haversine great-circle distance to `other`, in kilometers.
    ///
    /// Symmetric and non-negative; zero when the coordinates coincide.
    pub fn distance_km(&self, other: &GeoCoord) -> f64 {
        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();
        let dlat = (other.lat - self.lat).to_radians();
        let dlong = (other.long - self.long).to_radians();

        let a = (dlat / 2.0).sin().powi(2)
            + lat1.cos() * lat2.cos() * (dlong / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().min(1.0).asin();

        EARTH_RADIUS_KM * c
    }

    /// Check that both components are finite and within range.
    pub fn is_valid(&self) -> bool {
        self.long.is_finite()
            && self.lat.is_finite()
            && self.long.abs() <= 180.0
            && self.lat.abs() <= 90.0
    }
}

impl std::fmt::Display for GeoCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.4}, {:.4})", self.long, self.lat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn distance_to_self_is_zero() {
        let p = GeoCoord::new(-58.40, -34.60);
        assert_eq!(p.distance_km(&p), 0.0);
    }

    #[test]
    fn known_distance_buenos_aires_to_montevideo() {
        // Buenos Aires and Montevideo are roughly 205 km apart.
        let ba = GeoCoord::new(-58.3816, -34.6037);
        let mvd = GeoCoord::new(-56.1645, -34.9011);
        let d = ba.distance_km(&mvd);
        assert!((200.0..210.0).contains(&d), "got {d}");
    }

    #[test]
    fn one_degree_of_latitude() {
        // 1 degree of latitude is ~111.19 km on a 6371 km sphere.
        let a = GeoCoord::new(0.0, 0.0);
        let b = GeoCoord::new(0.0, 1.0);
        let d = a.distance_km(&b);
        assert!((d - 111.195).abs() < 0.01, "got {d}");
    }

    #[test]
    fn same_coord_exact_only() {
        let a = GeoCoord::new(-58.40, -34.60);
        let b = GeoCoord::new(-58.40, -34.60);
        let c = GeoCoord::new(-58.40, -34.600001);
        assert!(a.is_same(&b));
        assert!(!a.is_same(&c));
    }

    #[test]
    fn validity_bounds() {
        assert!(GeoCoord::new(180.0, 90.0).is_valid());
        assert!(!GeoCoord::new(180.1, 0.0).is_valid());
        assert!(!GeoCoord::new(0.0, -90.5).is_valid());
        assert!(!GeoCoord::new(f64::NAN, 0.0).is_valid());
    }

    proptest! {
        #[test]
        fn distance_is_symmetric(
            long1 in -180.0f64..180.0, lat1 in -90.0f64..90.0,
            long2 in -180.0f64..180.0, lat2 in -90.0f64..90.0,
        ) {
            let a = GeoCoord::new(long1, lat1);
            let b = GeoCoord::new(long2, lat2);
            let ab = a.distance_km(&b);
            let ba = b.distance_km(&a);
            prop_assert!((ab - ba).abs() < 1e-9);
        }

        #[test]
        fn distance_is_non_negative(
            long1 in -180.0f64..180.0, lat1 in -90.0f64..90.0,
            long2 in -180.0f64..180.0, lat2 in -90.0f64..90.0,
        ) {
            let a = GeoCoord::new(long1, lat1);
            let b = GeoCoord::new(long2, lat2);
            prop_assert!(a.distance_km(&b) >= 0.0);
        }
    }
}
