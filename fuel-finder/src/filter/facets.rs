//! Facets and the favorites listing.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use crate::dataset::DatasetSnapshot;
use crate::domain::{FuelKey, Station};
use crate::favorites::FavoriteSet;

/// Autonomous communities present in the snapshot, sorted.
pub fn communities(snapshot: &DatasetSnapshot) -> Vec<String> {
    distinct(snapshot.stations.iter().map(|s| s.region.as_str()))
}

/// Municipalities within `community`, sorted.
pub fn municipalities(snapshot: &DatasetSnapshot, community: &str) -> Vec<String> {
    let community = community.trim();
    distinct(
        snapshot
            .stations
            .iter()
            .filter(|s| s.region.trim() == community)
            .map(|s| s.municipality.as_str()),
    )
}

/// Trimmed, non-empty, unique names in Spanish alphabetical order.
fn distinct<'a>(names: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut unique = BTreeMap::new();
    for name in names.map(str::trim).filter(|n| !n.is_empty()) {
        unique.entry(name).or_insert_with(|| collation_key(name));
    }

    let mut names: Vec<(&str, String)> = unique.into_iter().collect();
    names.sort_by(|(a, ka), (b, kb)| ka.cmp(kb).then_with(|| a.cmp(b)));
    names.into_iter().map(|(name, _)| name.to_string()).collect()
}

/// Case- and accent-insensitive sort key.
fn collation_key(name: &str) -> String {
    let mut key = String::with_capacity(name.len());
    for c in name.to_lowercase().chars() {
        match c {
            'á' | 'à' | 'ä' | 'â' => key.push('a'),
            'é' | 'è' | 'ë' | 'ê' => key.push('e'),
            'í' | 'ì' | 'ï' | 'î' => key.push('i'),
            'ó' | 'ò' | 'ö' | 'ô' => key.push('o'),
            'ú' | 'ù' | 'ü' | 'û' => key.push('u'),
            'ç' => key.push('c'),
            // ñ is a letter of its own, between n and o
            'ñ' => key.push_str("n~"),
            other => key.push(other),
        }
    }
    key
}

/// One favorite station as listed on the favorites page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FavoriteEntry {
    pub station: Arc<Station>,

    /// Selected-fuel price, 0 when not sold.
    pub price: f64,
}

/// Favorites present in the snapshot, ordered by brand then id.
///
/// Favorites whose station is missing from the snapshot are left out.
pub fn favorites_view(
    snapshot: &DatasetSnapshot,
    fuel: &FuelKey,
    favorites: &FavoriteSet,
) -> Vec<FavoriteEntry> {
    let mut entries: Vec<FavoriteEntry> = snapshot
        .stations
        .iter()
        .filter(|s| favorites.contains(&s.id))
        .map(|s| FavoriteEntry {
            station: s.clone(),
            price: s.price(fuel).unwrap_or(0.0),
        })
        .collect();

    entries.sort_by(|a, b| by_brand(&a.station, &b.station));
    entries
}

fn by_brand(a: &Station, b: &Station) -> Ordering {
    collation_key(&a.brand)
        .cmp(&collation_key(&b.brand))
        .then_with(|| a.id.cmp(&b.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::StationId;
    use chrono::Utc;

    fn at(id: &str, brand: &str, region: &str, municipality: &str) -> Station {
        let mut s = Station::new(StationId::parse(id).unwrap(), brand);
        s.region = region.to_string();
        s.municipality = municipality.to_string();
        s
    }

    fn snapshot(stations: Vec<Station>) -> DatasetSnapshot {
        DatasetSnapshot::new(Utc::now(), stations.into_iter().map(Arc::new).collect())
    }

    #[test]
    fn communities_are_unique_trimmed_and_sorted() {
        let snap = snapshot(vec![
            at("1", "A", "Madrid", "Getafe"),
            at("2", "A", " Madrid ", "Móstoles"),
            at("3", "A", "Andalucía", "Sevilla"),
            at("4", "A", "Aragón", "Zaragoza"),
            at("5", "A", "", "Nowhere"),
        ]);

        assert_eq!(communities(&snap), vec!["Andalucía", "Aragón", "Madrid"]);
    }

    #[test]
    fn municipalities_within_community() {
        let snap = snapshot(vec![
            at("1", "A", "Madrid", "Móstoles"),
            at("2", "A", "Madrid", "Alcorcón"),
            at("3", "A", "Madrid", "Móstoles"),
            at("4", "A", "Galicia", "Vigo"),
        ]);

        assert_eq!(municipalities(&snap, "Madrid"), vec!["Alcorcón", "Móstoles"]);
        assert!(municipalities(&snap, "Cantabria").is_empty());
    }

    #[test]
    fn accented_names_sort_with_their_base_letter() {
        let snap = snapshot(vec![
            at("1", "A", "Madrid", "Ñora"),
            at("2", "A", "Madrid", "Ávila"),
            at("3", "A", "Madrid", "Nava"),
            at("4", "A", "Madrid", "Burgos"),
        ]);

        assert_eq!(
            municipalities(&snap, "Madrid"),
            vec!["Ávila", "Burgos", "Nava", "Ñora"]
        );
    }

    #[test]
    fn favorites_view_orders_by_brand_then_id() {
        let fuel = FuelKey::default();
        let mut cheap = at("30", "Repsol", "", "");
        cheap.prices.insert(fuel.clone(), 1.45);
        let snap = snapshot(vec![
            cheap,
            at("10", "Repsol", "", ""),
            at("20", "BP", "", ""),
            at("40", "Shell", "", ""),
        ]);
        let favorites: FavoriteSet = ["30", "10", "20", "99"]
            .iter()
            .map(|id| StationId::parse(id).unwrap())
            .collect();

        let view = favorites_view(&snap, &fuel, &favorites);

        let listed: Vec<(&str, f64)> = view
            .iter()
            .map(|e| (e.station.id.as_str(), e.price))
            .collect();
        assert_eq!(listed, vec![("20", 0.0), ("10", 0.0), ("30", 1.45)]);
    }
}
