//! opensky-core: Pure parsing, filtering, and geometry for OpenSky snapshots.
//!
//! No network, no database, just algorithms. `opensky-snapshots` wires
//! these into the ingestion and distance jobs.

pub mod config;
pub mod filter;
pub mod geo;
pub mod states;
pub mod types;

// Re-export commonly used types at crate root
pub use filter::NationalityFilter;
pub use geo::{great_circle_km, trajectory_distance_km, GeoPoint};
pub use states::parse_states;
pub use types::*;
