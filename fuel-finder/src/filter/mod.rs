//! Station filtering, ordering and aggregation.

mod criteria;
mod engine;
mod facets;

pub use criteria::{DEFAULT_RADIUS_KM, FilterCriteria, SortMode, valid_radius};
pub use engine::{FilterOutcome, VisibleStation, evaluate};
pub use facets::{FavoriteEntry, communities, favorites_view, municipalities};
