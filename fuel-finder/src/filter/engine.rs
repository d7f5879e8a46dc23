//! Filter, sort and aggregate.
//!
//! [`evaluate`] is a pure function of the snapshot, the criteria and the
//! position. It is rerun from scratch whenever any of them changes.

use std::cmp::Ordering;
use std::sync::Arc;

use serde::Serialize;

use crate::dataset::DatasetSnapshot;
use crate::domain::{Coordinates, Station};
use crate::geo::haversine_km;

use super::criteria::{FilterCriteria, SortMode};

/// A station that passed every filter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisibleStation {
    pub station: Arc<Station>,

    /// Price of the selected fuel. Always positive.
    pub price: f64,

    /// Distance from the position, when one was usable.
    pub distance_km: Option<f64>,
}

/// Result of one evaluation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FilterOutcome {
    /// Visible stations, in display order.
    pub visible: Vec<VisibleStation>,

    /// Mean selected-fuel price of `visible`, rounded to 3 decimals.
    /// Zero when nothing is visible.
    pub average_price: f64,

    /// Closest visible station, when a position was usable.
    pub nearest: Option<VisibleStation>,
}

/// Run the criteria over a snapshot.
///
/// `position` must be a fresh, error-free fix; pass `None` to skip the
/// distance filter entirely. Filters apply in order: community and
/// municipality, free text, radius, then price (absent or non-positive
/// prices are dropped).
pub fn evaluate(
    snapshot: &DatasetSnapshot,
    criteria: &FilterCriteria,
    position: Option<Coordinates>,
) -> FilterOutcome {
    let needle = criteria.needle();

    let mut visible: Vec<VisibleStation> = snapshot
        .stations
        .iter()
        .filter(|s| in_area(s, criteria))
        .filter(|s| needle.as_deref().is_none_or(|n| s.matches_text(n)))
        .filter_map(|s| {
            let distance_km = match position {
                Some(origin) => {
                    let d = haversine_km(origin, s.location?);
                    if d > criteria.max_distance_km {
                        return None;
                    }
                    Some(d)
                }
                None => None,
            };
            let price = s.price(&criteria.fuel)?;
            Some(VisibleStation {
                station: s.clone(),
                price,
                distance_km,
            })
        })
        .collect();

    visible.sort_by(|a, b| compare(a, b, criteria.sort));

    let average_price = average(visible.iter().map(|v| v.price));

    let nearest = visible
        .iter()
        .filter(|v| v.distance_km.is_some())
        .min_by(|a, b| compare(a, b, SortMode::Distance))
        .cloned();

    FilterOutcome {
        visible,
        average_price,
        nearest,
    }
}

fn in_area(station: &Station, criteria: &FilterCriteria) -> bool {
    if let Some(community) = &criteria.community
        && station.region.trim() != community.as_str()
    {
        return false;
    }
    if let Some(municipality) = &criteria.municipality
        && station.municipality.trim() != municipality.as_str()
    {
        return false;
    }
    true
}

/// Missing distances sort last.
fn distance_key(v: &VisibleStation) -> f64 {
    v.distance_km.unwrap_or(f64::INFINITY)
}

fn compare(a: &VisibleStation, b: &VisibleStation, sort: SortMode) -> Ordering {
    let by_price = a.price.total_cmp(&b.price);
    let by_distance = distance_key(a).total_cmp(&distance_key(b));

    let primary = match sort {
        SortMode::Price => by_price.then(by_distance),
        SortMode::Distance => by_distance.then(by_price),
    };

    primary.then_with(|| a.station.id.cmp(&b.station.id))
}

/// Mean rounded to 3 decimals, 0 for an empty input.
fn average(prices: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = prices.fold((0.0, 0usize), |(sum, count), p| (sum + p, count + 1));
    if count == 0 {
        return 0.0;
    }
    round3(sum / count as f64)
}

fn round3(x: f64) -> f64 {
    (x * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FuelKey, StationId, parse_decimal_comma};
    use chrono::Utc;
    use proptest::prelude::*;

    const E5: &str = "Precio Gasolina 95 E5";
    const DIESEL: &str = "Precio Gasoleo A";

    fn madrid() -> Coordinates {
        Coordinates::new(40.4168, -3.7038).unwrap()
    }

    /// A point `km` kilometres due north of Madrid.
    fn north_of_madrid(km: f64) -> Coordinates {
        let deg = km / (std::f64::consts::PI * 6371.0 / 180.0);
        Coordinates::new(40.4168 + deg, -3.7038).unwrap()
    }

    fn station(id: &str, brand: &str, price: &str, location: Option<Coordinates>) -> Station {
        let mut s = Station::new(StationId::parse(id).unwrap(), brand);
        s.prices.insert(FuelKey::new(E5), parse_decimal_comma(price));
        s.location = location;
        s
    }

    fn snapshot(stations: Vec<Station>) -> DatasetSnapshot {
        DatasetSnapshot::new(Utc::now(), stations.into_iter().map(Arc::new).collect())
    }

    fn ids(outcome: &FilterOutcome) -> Vec<&str> {
        outcome
            .visible
            .iter()
            .map(|v| v.station.id.as_str())
            .collect()
    }

    #[test]
    fn radius_hides_far_station_regardless_of_price() {
        let snap = snapshot(vec![
            station("near", "A", "1,600", Some(north_of_madrid(3.0))),
            station("far", "B", "1,200", Some(north_of_madrid(12.0))),
        ]);
        let criteria = FilterCriteria::default().with_max_distance(10.0);

        let outcome = evaluate(&snap, &criteria, Some(madrid()));

        assert_eq!(ids(&outcome), vec!["near"]);
        let d = outcome.visible[0].distance_km.unwrap();
        assert!((d - 3.0).abs() < 0.01, "got {d}");
    }

    #[test]
    fn average_ignores_unsold() {
        let snap = snapshot(vec![
            station("1", "A", "1,479", None),
            station("2", "B", "1,523", None),
            station("3", "C", "0,000", None),
        ]);

        let outcome = evaluate(&snap, &FilterCriteria::default(), None);

        assert_eq!(outcome.visible.len(), 2);
        assert_eq!(outcome.visible[0].price, 1.479);
        assert_eq!(outcome.visible[1].price, 1.523);
        assert_eq!(outcome.average_price, 1.501);
    }

    #[test]
    fn empty_result_averages_zero() {
        let snap = snapshot(vec![station("1", "A", "", None)]);
        let outcome = evaluate(&snap, &FilterCriteria::default(), None);

        assert!(outcome.visible.is_empty());
        assert_eq!(outcome.average_price, 0.0);
        assert_eq!(outcome.nearest, None);
    }

    #[test]
    fn no_position_means_no_distance_ceiling() {
        let snap = snapshot(vec![
            station("1", "A", "1,5", Some(north_of_madrid(500.0))),
            station("2", "B", "1,4", None),
        ]);
        let criteria = FilterCriteria::default().with_max_distance(1.0);

        let outcome = evaluate(&snap, &criteria, None);

        assert_eq!(ids(&outcome), vec!["2", "1"]);
        assert!(outcome.visible.iter().all(|v| v.distance_km.is_none()));
        assert_eq!(outcome.nearest, None);
    }

    #[test]
    fn stations_without_location_drop_out_under_radius() {
        let snap = snapshot(vec![
            station("1", "A", "1,5", Some(north_of_madrid(1.0))),
            station("2", "B", "1,4", None),
        ]);

        let outcome = evaluate(&snap, &FilterCriteria::default(), Some(madrid()));

        assert_eq!(ids(&outcome), vec!["1"]);
    }

    #[test]
    fn sort_by_distance_breaks_ties_on_price() {
        let here = north_of_madrid(2.0);
        let snap = snapshot(vec![
            station("a", "A", "1,60", Some(north_of_madrid(5.0))),
            station("b", "B", "1,55", Some(here)),
            station("c", "C", "1,50", Some(here)),
        ]);
        let criteria = FilterCriteria::default().with_sort(SortMode::Distance);

        let outcome = evaluate(&snap, &criteria, Some(madrid()));

        assert_eq!(ids(&outcome), vec!["c", "b", "a"]);
        assert_eq!(outcome.nearest.unwrap().station.id.as_str(), "c");
    }

    #[test]
    fn sort_by_price_breaks_ties_on_distance() {
        let snap = snapshot(vec![
            station("far", "A", "1,50", Some(north_of_madrid(8.0))),
            station("near", "B", "1,50", Some(north_of_madrid(1.0))),
            station("cheap", "C", "1,40", Some(north_of_madrid(9.0))),
        ]);

        let outcome = evaluate(&snap, &FilterCriteria::default(), Some(madrid()));

        assert_eq!(ids(&outcome), vec!["cheap", "near", "far"]);
        assert_eq!(outcome.nearest.unwrap().station.id.as_str(), "near");
    }

    #[test]
    fn text_query_matches_brand_municipality_or_province() {
        let mut in_town = station("1", "BALLENOIL", "1,4", None);
        in_town.municipality = "Móstoles".to_string();
        let mut in_province = station("2", "Shell", "1,5", None);
        in_province.province = "TOLEDO".to_string();
        let snap = snapshot(vec![in_town, in_province, station("3", "Galp", "1,3", None)]);

        let by_town = FilterCriteria::default().with_query("mósto");
        assert_eq!(ids(&evaluate(&snap, &by_town, None)), vec!["1"]);

        let by_province = FilterCriteria::default().with_query("Toledo");
        assert_eq!(ids(&evaluate(&snap, &by_province, None)), vec!["2"]);

        let by_brand = FilterCriteria::default().with_query("GALP");
        assert_eq!(ids(&evaluate(&snap, &by_brand, None)), vec!["3"]);
    }

    #[test]
    fn community_and_municipality_filters() {
        let mut getafe = station("1", "A", "1,4", None);
        getafe.region = "Madrid".to_string();
        getafe.municipality = "Getafe".to_string();
        let mut leganes = station("2", "B", "1,5", None);
        leganes.region = "Madrid".to_string();
        leganes.municipality = "Leganés".to_string();
        let mut vigo = station("3", "C", "1,3", None);
        vigo.region = "Galicia".to_string();
        let snap = snapshot(vec![getafe, leganes, vigo]);

        let mut criteria = FilterCriteria::default();
        criteria.set_community(Some("Madrid".to_string()));
        assert_eq!(ids(&evaluate(&snap, &criteria, None)), vec!["1", "2"]);

        criteria.set_municipality(Some("Leganés".to_string()));
        assert_eq!(ids(&evaluate(&snap, &criteria, None)), vec!["2"]);
    }

    #[test]
    fn selected_fuel_drives_price() {
        let mut s = station("1", "A", "1,5", None);
        s.prices
            .insert(FuelKey::new(DIESEL), parse_decimal_comma("1,389"));
        let snap = snapshot(vec![s, station("2", "B", "1,4", None)]);

        let criteria = FilterCriteria::default().with_fuel(FuelKey::new(DIESEL));
        let outcome = evaluate(&snap, &criteria, None);

        assert_eq!(ids(&outcome), vec!["1"]);
        assert_eq!(outcome.average_price, 1.389);
    }

    // Property tests

    const BRANDS: &[&str] = &["Repsol", "Cepsa", "BP", "Shell", "Plenoil"];
    const PROVINCES: &[&str] = &["MADRID", "TOLEDO", "SEGOVIA"];

    fn arb_station(index: usize) -> impl Strategy<Value = Station> {
        (
            0..BRANDS.len(),
            0..PROVINCES.len(),
            prop::option::of((40.0f64..41.0, -4.5f64..-3.0)),
            prop::option::of(0u32..2500),
            prop::option::of(0u32..2500),
        )
            .prop_map(move |(brand, province, location, e5, diesel)| {
                let mut s = Station::new(StationId::parse(&index.to_string()).unwrap(), BRANDS[brand]);
                s.province = PROVINCES[province].to_string();
                s.location = location.and_then(|(lat, lon)| Coordinates::new(lat, lon));
                if let Some(p) = e5 {
                    s.prices.insert(FuelKey::new(E5), f64::from(p) / 1000.0);
                }
                if let Some(p) = diesel {
                    s.prices.insert(FuelKey::new(DIESEL), f64::from(p) / 1000.0);
                }
                s
            })
    }

    fn arb_snapshot() -> impl Strategy<Value = DatasetSnapshot> {
        (0usize..40)
            .prop_flat_map(|n| (0..n).map(arb_station).collect::<Vec<_>>())
            .prop_map(snapshot)
    }

    fn arb_criteria() -> impl Strategy<Value = FilterCriteria> {
        (
            prop::sample::select(vec![E5, DIESEL]),
            prop::sample::select(vec!["", "rep", "MADRID", "s", "zzz"]),
            0.0f64..120.0,
            prop::sample::select(vec![SortMode::Price, SortMode::Distance]),
        )
            .prop_map(|(fuel, query, radius, sort)| {
                FilterCriteria::default()
                    .with_fuel(FuelKey::new(fuel))
                    .with_query(query)
                    .with_max_distance(radius)
                    .with_sort(sort)
            })
    }

    fn passes(s: &Station, c: &FilterCriteria, position: Option<Coordinates>) -> bool {
        let text = c.needle().is_none_or(|n| s.matches_text(&n));
        let distance = match position {
            Some(p) => s.location.is_some_and(|l| haversine_km(p, l) <= c.max_distance_km),
            None => true,
        };
        text && distance && s.price(&c.fuel).is_some()
    }

    proptest! {
        #[test]
        fn visible_is_exactly_the_passing_set(
            snap in arb_snapshot(),
            criteria in arb_criteria(),
            position in prop::option::of(Just(madrid())),
        ) {
            let outcome = evaluate(&snap, &criteria, position);

            for v in &outcome.visible {
                prop_assert!(passes(&v.station, &criteria, position));
                prop_assert!(v.price > 0.0);
                prop_assert_eq!(v.distance_km.is_some(), position.is_some());
            }

            let expected = snap.stations.iter().filter(|s| passes(s, &criteria, position)).count();
            prop_assert_eq!(outcome.visible.len(), expected);
        }

        #[test]
        fn visible_is_strictly_ordered(
            snap in arb_snapshot(),
            criteria in arb_criteria(),
            position in prop::option::of(Just(madrid())),
        ) {
            let outcome = evaluate(&snap, &criteria, position);

            for pair in outcome.visible.windows(2) {
                prop_assert_eq!(compare(&pair[0], &pair[1], criteria.sort), Ordering::Less);

                let (a, b) = (&pair[0], &pair[1]);
                match criteria.sort {
                    SortMode::Price => prop_assert!(a.price <= b.price),
                    SortMode::Distance => prop_assert!(distance_key(a) <= distance_key(b)),
                }
            }
        }

        #[test]
        fn average_is_mean_of_visible_prices(
            snap in arb_snapshot(),
            criteria in arb_criteria(),
        ) {
            let outcome = evaluate(&snap, &criteria, None);

            if outcome.visible.is_empty() {
                prop_assert_eq!(outcome.average_price, 0.0);
            } else {
                let sum: f64 = outcome.visible.iter().map(|v| v.price).sum();
                let mean = sum / outcome.visible.len() as f64;
                prop_assert!((outcome.average_price - mean).abs() <= 0.0005 + 1e-9);
            }
        }

        #[test]
        fn nearest_has_minimum_distance(
            snap in arb_snapshot(),
            criteria in arb_criteria(),
        ) {
            let outcome = evaluate(&snap, &criteria, Some(madrid()));

            match &outcome.nearest {
                None => prop_assert!(outcome.visible.is_empty()),
                Some(nearest) => {
                    let d = nearest.distance_km.unwrap();
                    prop_assert!(outcome.visible.iter().all(|v| v.distance_km.unwrap() >= d));
                }
            }
        }
    }
}
