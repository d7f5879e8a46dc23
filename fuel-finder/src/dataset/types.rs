//! Wire types for the station dataset endpoint.
//!
//! The endpoint returns a JSON object whose `ListaEESSPrecio` field holds one
//! object per station. Every value is a string, numbers use a decimal comma,
//! and each fuel price is its own `Precio ...` field.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::domain::{
    Coordinates, FuelKey, InvalidStationId, Station, StationId, parse_decimal_comma,
    parse_decimal_comma_opt,
};

use super::error::FetchError;

/// Name of the field holding the station list.
pub const LIST_FIELD: &str = "ListaEESSPrecio";

/// One station as published by the endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct StationRecord {
    #[serde(rename = "IDEESS")]
    pub id: String,

    #[serde(rename = "Rótulo", default)]
    pub brand: String,

    #[serde(rename = "Dirección", default)]
    pub address: String,

    #[serde(rename = "Localidad", default)]
    pub locality: String,

    #[serde(rename = "Municipio", default)]
    pub municipality: String,

    #[serde(rename = "Provincia", default)]
    pub province: String,

    #[serde(rename = "CCAA", default)]
    pub region: String,

    #[serde(rename = "Latitud", default)]
    pub latitude: String,

    #[serde(rename = "Longitud (WGS84)", default)]
    pub longitude: String,

    /// Everything else, including the `Precio ...` fields.
    #[serde(flatten)]
    pub other: BTreeMap<String, serde_json::Value>,
}

impl StationRecord {
    /// Convert to the domain representation, parsing numbers.
    pub fn into_station(self) -> Result<Station, InvalidStationId> {
        let id = StationId::parse(&self.id)?;

        let location = match (
            parse_decimal_comma_opt(&self.latitude),
            parse_decimal_comma_opt(&self.longitude),
        ) {
            (Some(lat), Some(lon)) => Coordinates::new(lat, lon),
            _ => None,
        };

        let prices = self
            .other
            .into_iter()
            .filter(|(field, _)| FuelKey::is_price_field(field))
            .map(|(field, value)| {
                let price = value.as_str().map(parse_decimal_comma).unwrap_or(0.0);
                (FuelKey::new(field), price)
            })
            .collect();

        Ok(Station {
            id,
            brand: self.brand.trim().to_string(),
            address: self.address.trim().to_string(),
            locality: self.locality.trim().to_string(),
            municipality: self.municipality.trim().to_string(),
            province: self.province.trim().to_string(),
            region: self.region.trim().to_string(),
            location,
            prices,
        })
    }
}

/// Parse a response body into stations.
///
/// Fails only when the body is not a JSON object with a list under
/// [`LIST_FIELD`]. Individual records that are not station-like (missing
/// id, wrong field types) are skipped, as are repeated ids after the first.
pub fn parse_stations(body: &str) -> Result<Vec<Arc<Station>>, FetchError> {
    let mut root: serde_json::Value =
        serde_json::from_str(body).map_err(|e| FetchError::malformed(e.to_string()))?;

    let list = root
        .as_object_mut()
        .ok_or_else(|| FetchError::malformed("response is not a JSON object"))?
        .remove(LIST_FIELD)
        .ok_or_else(|| FetchError::malformed(format!("missing {LIST_FIELD}")))?;

    let serde_json::Value::Array(items) = list else {
        return Err(FetchError::malformed(format!("{LIST_FIELD} is not a list")));
    };

    let total = items.len();
    let mut seen = HashSet::with_capacity(total);
    let mut stations = Vec::with_capacity(total);
    let mut skipped = 0usize;

    for item in items {
        let station = serde_json::from_value::<StationRecord>(item)
            .map_err(|e| e.to_string())
            .and_then(|record| record.into_station().map_err(|e| e.to_string()));

        match station {
            Ok(station) if seen.insert(station.id.clone()) => stations.push(Arc::new(station)),
            Ok(station) => {
                skipped += 1;
                warn!(id = %station.id, "duplicate station id in dataset, keeping first");
            }
            Err(reason) => {
                skipped += 1;
                debug!(%reason, "skipping malformed station record");
            }
        }
    }

    if skipped > 0 {
        warn!(skipped, total, "skipped station records");
    }

    Ok(stations)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_json(id: &str, gasoleo: &str) -> serde_json::Value {
        serde_json::json!({
            "IDEESS": id,
            "Rótulo": "REPSOL ",
            "Dirección": "CALLE MAYOR, 1",
            "Localidad": "MADRID",
            "Municipio": "Madrid",
            "Provincia": "MADRID",
            "CCAA": "Comunidad de Madrid",
            "Latitud": "40,416775",
            "Longitud (WGS84)": "-3,703790",
            "Precio Gasoleo A": gasoleo,
            "Precio Gasolina 95 E5": "",
            "Horario": "L-D: 24H",
        })
    }

    #[test]
    fn converts_record() {
        let record: StationRecord = serde_json::from_value(record_json("4375", "1,479")).unwrap();
        let station = record.into_station().unwrap();

        assert_eq!(station.id.as_str(), "4375");
        assert_eq!(station.brand, "REPSOL");
        assert_eq!(station.region, "Comunidad de Madrid");
        assert_eq!(station.location, Coordinates::new(40.416775, -3.70379));
        assert_eq!(station.price(&FuelKey::new("Precio Gasoleo A")), Some(1.479));
        assert_eq!(station.price(&FuelKey::new("Precio Gasolina 95 E5")), None);
        // Non-price fields are not treated as fuels
        assert_eq!(station.prices.len(), 2);
    }

    #[test]
    fn unparseable_coordinates_become_none() {
        let mut json = record_json("1", "1,4");
        json["Latitud"] = serde_json::json!("");
        let record: StationRecord = serde_json::from_value(json).unwrap();

        assert_eq!(record.into_station().unwrap().location, None);
    }

    #[test]
    fn parse_stations_accepts_wellformed_list() {
        let body = serde_json::json!({
            "Fecha": "01/06/2025 12:00:00",
            "ListaEESSPrecio": [record_json("1", "1,479"), record_json("2", "1,523")],
            "ResultadoConsulta": "OK",
        })
        .to_string();

        let stations = parse_stations(&body).unwrap();
        assert_eq!(stations.len(), 2);
        assert_eq!(stations[1].id.as_str(), "2");
    }

    #[test]
    fn parse_stations_rejects_missing_list() {
        let err = parse_stations("{\"ResultadoConsulta\":\"OK\"}").unwrap_err();
        assert!(matches!(err, FetchError::MalformedResponse { .. }));
        assert!(err.to_string().contains("missing ListaEESSPrecio"));
    }

    #[test]
    fn parse_stations_rejects_non_list() {
        let err = parse_stations("{\"ListaEESSPrecio\":{\"a\":1}}").unwrap_err();
        assert!(err.to_string().contains("is not a list"));

        let err = parse_stations("[1,2,3]").unwrap_err();
        assert!(err.to_string().contains("not a JSON object"));

        let err = parse_stations("<html>").unwrap_err();
        assert!(matches!(err, FetchError::MalformedResponse { .. }));
    }

    #[test]
    fn parse_stations_skips_bad_records_and_duplicates() {
        let body = serde_json::json!({
            "ListaEESSPrecio": [
                record_json("1", "1,479"),
                {"Rótulo": "NO ID"},
                42,
                record_json("1", "9,999"),
                record_json(" ", "1,0"),
            ],
        })
        .to_string();

        let stations = parse_stations(&body).unwrap();
        assert_eq!(stations.len(), 1);
        assert_eq!(
            stations[0].price(&FuelKey::new("Precio Gasoleo A")),
            Some(1.479)
        );
    }

    #[test]
    fn empty_list_is_valid() {
        let stations = parse_stations("{\"ListaEESSPrecio\":[]}").unwrap();
        assert!(stations.is_empty());
    }
}
