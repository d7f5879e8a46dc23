//! Domain types for the fuel station pipeline.
//!
//! Station records are parsed from the endpoint's wire format once, at
//! snapshot construction, so code that receives these types never deals
//! with decimal-comma strings.

mod coordinates;
mod fuel;
mod number;
mod station;

pub use coordinates::{Coordinates, InvalidCoordinates};
pub use fuel::{FuelKey, PRICE_FIELD_PREFIX};
pub use number::{parse_decimal_comma, parse_decimal_comma_opt};
pub use station::{InvalidStationId, Station, StationId};
