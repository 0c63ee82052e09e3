//! Nationality filter: keeps state vectors from one country of origin.
//!
//! Exact, case-sensitive match on `origin_country`, as OpenSky spells it
//! (e.g. "Mexico", "United States"). Order is preserved.

use crate::types::StateVector;

pub const DEFAULT_COUNTRY: &str = "Mexico";

#[derive(Debug, Clone)]
pub struct NationalityFilter {
    pub country: String,
}

impl NationalityFilter {
    pub fn new(country: &str) -> Self {
        NationalityFilter {
            country: country.to_string(),
        }
    }

    pub fn matches(&self, state: &StateVector) -> bool {
        state.origin_country == self.country
    }

    /// Keep the matching records, in input order.
    pub fn retain(&self, states: Vec<StateVector>) -> Vec<StateVector> {
        states.into_iter().filter(|s| self.matches(s)).collect()
    }
}

impl Default for NationalityFilter {
    fn default() -> Self {
        NationalityFilter::new(DEFAULT_COUNTRY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
