//! Roomfinder provider crate - hotel search and speech-to-text collaborators.
//!
//! Defines the narrow async interfaces the conversation core depends on,
//! the request/response shapes exchanged with the hotel provider, a
//! RapidAPI hotels4 implementation, and mocks for testing without network.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use roomfinder_core::types::{Currency, SortOrder};

pub mod error;
pub mod mock;
pub mod rapidapi;
pub mod transcription;

pub use error::{ProviderError, TranscriptionError};
pub use mock::{MockHotelProvider, MockTranscriber};
pub use rapidapi::RapidApiProvider;
pub use transcription::{DisabledTranscriber, HttpTranscriber, Transcriber};

// =============================================================================
// Request / response shapes
// =============================================================================

/// A city returned by the town lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TownCandidate {
    /// City name as the provider spells it.
    pub display_name: String,
    /// Region or country, used to tell same-named cities apart.
    pub region: String,
    /// Opaque destination identifier required by the search call.
    pub location_id: String,
}

impl TownCandidate {
    /// Label shown on the selection button, e.g. `"Paris, France"`.
    pub fn label(&self) -> String {
        if self.region.is_empty() {
            self.display_name.clone()
        } else {
            format!("{}, {}", self.display_name, self.region)
        }
    }
}

/// Parameters of one property search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub location_id: String,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub page_size: u32,
    pub currency: Currency,
    pub sort_order: SortOrder,
    pub price_min: Option<u32>,
    pub price_max: Option<u32>,
}

/// One hotel entry as returned by the provider.
///
/// Every descriptive field except the name may be missing in provider data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawHotel {
    pub name: String,
    pub address: Option<String>,
    pub price_summary: Option<String>,
    pub distance: Option<String>,
    pub provider_id: String,
}

// =============================================================================
// Trait
// =============================================================================

/// Hotel search provider used by the conversation core.
///
/// Implementations perform one request per call, without retries.
#[async_trait]
pub trait HotelProvider: Send + Sync {
    /// Resolve a user-entered city name to candidate destinations.
    ///
    /// Matching is case-insensitive equality against city entries only.
    async fn lookup_town(&self, name: &str) -> Result<Vec<TownCandidate>, ProviderError>;

    /// Run a property search.
    async fn search(&self, request: &SearchRequest) -> Result<Vec<RawHotel>, ProviderError>;

    /// Fetch up to `count` photo URLs for a hotel.
    async fn fetch_photos(
        &self,
        provider_id: &str,
        count: u32,
    ) -> Result<Vec<String>, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_town_candidate_label() {
        let town = TownCandidate {
            display_name: "Paris".to_string(),
            region: "France".to_string(),
            location_id: "504261".to_string(),
        };
        assert_eq!(town.label(), "Paris, France");
    }

    #[test]
    fn test_town_candidate_label_without_region() {
        let town = TownCandidate {
            display_name: "Paris".to_string(),
            region: String::new(),
            location_id: "1".to_string(),
        };
        assert_eq!(town.label(), "Paris");
    }
}
