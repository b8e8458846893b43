//! In-progress search parameters of one conversation.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use roomfinder_core::types::{Currency, DistanceRange, HotelRecord, PriceRange, SearchMode};

/// Result count used until the user enters one.
pub const DEFAULT_RESULT_COUNT: u32 = 25;

/// Everything the user has told us so far about the current search.
///
/// Fields are plain data; the state machine is responsible for keeping
/// them consistent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryState {
    /// Correlates log lines of one search.
    pub search_id: Option<Uuid>,
    pub town: Option<String>,
    pub location_id: Option<String>,
    pub search_mode: SearchMode,
    pub result_count: u32,
    pub currency: Currency,
    pub check_in: Option<NaiveDate>,
    pub check_out: Option<NaiveDate>,
    pub price_range: Option<PriceRange>,
    pub distance_range: Option<DistanceRange>,
    pub photo_count: Option<u32>,
    pub results: Vec<HotelRecord>,
}

impl Default for QueryState {
    fn default() -> Self {
        Self {
            search_id: None,
            town: None,
            location_id: None,
            search_mode: SearchMode::Cheapest,
            result_count: DEFAULT_RESULT_COUNT,
            currency: Currency::Usd,
            check_in: None,
            check_out: None,
            price_range: None,
            distance_range: None,
            photo_count: None,
            results: Vec::new(),
        }
    }
}

impl QueryState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore every field to its default.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Start a fresh search in the given mode.
    pub fn begin(&mut self, mode: SearchMode, result_count: u32) {
        self.reset();
        self.search_id = Some(Uuid::new_v4());
        self.search_mode = mode;
        self.result_count = result_count.max(1);
    }

    /// Whether every parameter required by the provider is present.
    pub fn is_searchable(&self) -> bool {
        self.location_id.is_some()
            && self.check_in.is_some()
            && self.check_out.is_some()
            && (!self.search_mode.needs_ranges()
                || (self.price_range.is_some() && self.distance_range.is_some()))
    }
}
