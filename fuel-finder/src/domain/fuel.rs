//! Fuel price keys.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Prefix shared by every price field of the dataset endpoint.
pub const PRICE_FIELD_PREFIX: &str = "Precio ";

/// Price fields published by the endpoint, with display labels.
const CATALOG: &[(&str, &str)] = &[
    ("Precio Gasolina 95 E5", "Gasolina 95 E5"),
    ("Precio Gasolina 95 E10", "Gasolina 95 E10"),
    ("Precio Gasolina 95 E5 Premium", "Gasolina 95 E5 Premium"),
    ("Precio Gasolina 98 E5", "Gasolina 98 E5"),
    ("Precio Gasolina 98 E10", "Gasolina 98 E10"),
    ("Precio Gasoleo A", "Gasóleo A"),
    ("Precio Gasoleo B", "Gasóleo B"),
    ("Precio Gasoleo Premium", "Gasóleo Premium"),
    ("Precio Biodiesel", "Biodiésel"),
    ("Precio Bioetanol", "Bioetanol"),
    ("Precio Gas Natural Comprimido", "GNC"),
    ("Precio Gas Natural Licuado", "GNL"),
    ("Precio Gases licuados del petróleo", "GLP"),
    ("Precio Hidrogeno", "Hidrógeno"),
];

/// Key selecting one price field of a station record.
///
/// This is the raw field name as published (e.g. `"Precio Gasoleo A"`), so
/// fuels missing from [`FuelKey::catalog`] still work.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FuelKey(String);

impl FuelKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Human label: the catalog label if known, otherwise the key without
    /// its `Precio ` prefix.
    pub fn label(&self) -> &str {
        CATALOG
            .iter()
            .find(|(key, _)| *key == self.0)
            .map(|(_, label)| *label)
            .unwrap_or_else(|| self.0.strip_prefix(PRICE_FIELD_PREFIX).unwrap_or(&self.0))
    }

    /// All known fuels, in display order.
    pub fn catalog() -> impl Iterator<Item = FuelKey> {
        CATALOG.iter().map(|(key, _)| FuelKey::new(*key))
    }

    /// Whether a record field name holds a price.
    pub fn is_price_field(field: &str) -> bool {
        field.starts_with(PRICE_FIELD_PREFIX)
    }
}

impl Default for FuelKey {
    fn default() -> Self {
        Self::new(CATALOG[0].0)
    }
}

impl fmt::Debug for FuelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FuelKey({})", self.0)
    }
}

impl fmt::Display for FuelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
