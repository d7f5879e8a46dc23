//! Station identity and records.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::{Coordinates, FuelKey};

/// Error returned when parsing an invalid station identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid station id: {reason}")]
pub struct InvalidStationId {
    reason: &'static str,
}

/// Identifier of a station within one dataset snapshot.
///
/// The endpoint publishes these as short numeric strings (`IDEESS`), but
/// nothing downstream relies on them being numeric, so any non-empty,
/// whitespace-free string is accepted.
///
/// # Examples
///
/// ```
/// use fuel_finder::domain::StationId;
///
/// let id = StationId::parse("4375").unwrap();
/// assert_eq!(id.as_str(), "4375");
///
/// // Surrounding whitespace is trimmed
/// assert_eq!(StationId::parse(" 4375 ").unwrap(), id);
///
/// // Empty is rejected
/// assert!(StationId::parse("  ").is_err());
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StationId(String);

impl StationId {
    /// Parse a station identifier, trimming surrounding whitespace.
    pub fn parse(s: &str) -> Result<Self, InvalidStationId> {
        let trimmed = s.trim();

        if trimmed.is_empty() {
            return Err(InvalidStationId {
                reason: "must not be empty",
            });
        }

        if trimmed.chars().any(char::is_whitespace) {
            return Err(InvalidStationId {
                reason: "must not contain whitespace",
            });
        }

        Ok(StationId(trimmed.to_string()))
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for StationId {
    type Error = InvalidStationId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<StationId> for String {
    fn from(id: StationId) -> Self {
        id.0
    }
}

impl fmt::Debug for StationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StationId({})", self.0)
    }
}

impl fmt::Display for StationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A fuel station as published in one dataset snapshot.
///
/// Records are immutable once a snapshot is built; a newer snapshot replaces
/// them wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    pub id: StationId,

    /// Brand or sign shown on the forecourt.
    pub brand: String,

    pub address: String,

    pub locality: String,

    pub municipality: String,

    pub province: String,

    /// Autonomous community.
    pub region: String,

    /// `None` when the published coordinates could not be parsed.
    pub location: Option<Coordinates>,

    /// Parsed price per fuel key, in €/litre. Zero means "not sold here".
    pub prices: BTreeMap<FuelKey, f64>,
}

impl Station {
    /// Create a station with no location and no prices.
    pub fn new(id: StationId, brand: impl Into<String>) -> Self {
        Self {
            id,
            brand: brand.into(),
            address: String::new(),
            locality: String::new(),
            municipality: String::new(),
            province: String::new(),
            region: String::new(),
            location: None,
            prices: BTreeMap::new(),
        }
    }

    /// Price of the given fuel, if this station sells it.
    ///
    /// Absent, zero and negative prices all mean "not sold".
    pub fn price(&self, fuel: &FuelKey) -> Option<f64> {
        self.prices.get(fuel).copied().filter(|p| *p > 0.0)
    }

    /// Case-insensitive match of `needle` against brand, municipality
    /// or province. `needle` must already be lowercase.
    pub fn matches_text(&self, needle: &str) -> bool {
        [&self.brand, &self.municipality, &self.province]
            .iter()
            .any(|field| field.to_lowercase().contains(needle))
    }
}
