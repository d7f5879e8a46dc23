//! Great-circle distance.

use crate::domain::Coordinates;

/// Mean Earth radius used for distances, in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine distance between two points, in kilometres.
pub fn haversine_km(a: Coordinates, b: Coordinates) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lon = (b.lon - a.lon).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lon / 2.0).sin().powi(2);

    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_KM * c
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn at(lat: f64, lon: f64) -> Coordinates {
        Coordinates::new(lat, lon).unwrap()
    }

    #[test]
    fn same_point_is_zero() {
        let madrid = at(40.4168, -3.7038);
        assert_eq!(haversine_km(madrid, madrid), 0.0);
    }

    #[test]
    fn madrid_to_barcelona() {
        let madrid = at(40.4168, -3.7038);
        let barcelona = at(41.3874, 2.1686);
        let d = haversine_km(madrid, barcelona);
        assert!((d - 505.0).abs() < 5.0, "got {d}");
    }

    #[test]
    fn one_degree_of_latitude() {
        let d = haversine_km(at(0.0, 0.0), at(1.0, 0.0));
        assert!((d - 111.19).abs() < 0.01, "got {d}");
    }

    proptest! {
        #[test]
        fn symmetric_and_bounded(
            lat1 in -90.0f64..=90.0, lon1 in -180.0f64..=180.0,
            lat2 in -90.0f64..=90.0, lon2 in -180.0f64..=180.0,
        ) {
            let a = at(lat1, lon1);
            let b = at(lat2, lon2);
            let ab = haversine_km(a, b);
            let ba = haversine_km(b, a);

            prop_assert!(ab >= 0.0);
            prop_assert!((ab - ba).abs() < 1e-6);
            prop_assert!(ab <= std::f64::consts::PI * EARTH_RADIUS_KM + 1e-6);
        }
    }
}
