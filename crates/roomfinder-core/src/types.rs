//! Core domain types shared by every Roomfinder crate.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Address shown when the provider omits one.
pub const ADDRESS_PLACEHOLDER: &str = "not specified";

// =============================================================================
// Identifiers
// =============================================================================

/// Chat user identifier; one live conversation exists per user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        UserId(id)
    }
}

// =============================================================================
// Enums
// =============================================================================

/// Search strategy, chosen by the command that started the conversation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    #[default]
    Cheapest,
    Priciest,
    BestDeal,
}

impl SearchMode {
    /// The chat command that selects this mode.
    pub fn command(&self) -> &'static str {
        match self {
            SearchMode::Cheapest => "/lowprice",
            SearchMode::Priciest => "/highprice",
            SearchMode::BestDeal => "/bestdeal",
        }
    }

    /// Map a chat command to a mode.
    pub fn from_command(command: &str) -> Option<Self> {
        match command {
            "/lowprice" => Some(SearchMode::Cheapest),
            "/highprice" => Some(SearchMode::Priciest),
            "/bestdeal" => Some(SearchMode::BestDeal),
            _ => None,
        }
    }

    /// Provider sort order used for this mode.
    ///
    /// Best-deal searches are sorted by price; distance is filtered locally.
    pub fn sort_order(&self) -> SortOrder {
        match self {
            SearchMode::Cheapest | SearchMode::BestDeal => SortOrder::Price,
            SearchMode::Priciest => SortOrder::PriceHighestFirst,
        }
    }

    /// Whether the conversation asks for price and distance ranges.
    pub fn needs_ranges(&self) -> bool {
        matches!(self, SearchMode::BestDeal)
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchMode::Cheapest => write!(f, "cheapest"),
            SearchMode::Priciest => write!(f, "priciest"),
            SearchMode::BestDeal => write!(f, "best_deal"),
        }
    }
}

/// Sort order understood by the hotel search provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SortOrder {
    Price,
    PriceHighestFirst,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Price => "PRICE",
            SortOrder::PriceHighestFirst => "PRICE_HIGHEST_FIRST",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Currencies the provider is queried in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Usd,
    Rub,
    Eur,
}

impl Currency {
    /// All supported currencies, in keyboard order.
    pub const ALL: [Currency; 3] = [Currency::Usd, Currency::Rub, Currency::Eur];

    pub fn code(&self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Rub => "RUB",
            Currency::Eur => "EUR",
        }
    }

    /// Human-readable plural used in prompts ("enter a range in ...").
    pub fn label(&self) -> &'static str {
        match self {
            Currency::Usd => "US dollars",
            Currency::Rub => "roubles",
            Currency::Eur => "euros",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for Currency {
    type Err = String;

    /// Exact, case-sensitive match on the currency code.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "USD" => Ok(Currency::Usd),
            "RUB" => Ok(Currency::Rub),
            "EUR" => Ok(Currency::Eur),
            _ => Err(format!("Unknown currency: {}", s)),
        }
    }
}

// =============================================================================
// Value objects
// =============================================================================

/// Inclusive nightly price bounds, always stored with `min <= max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: u32,
    pub max: u32,
}

impl PriceRange {
    /// Build a range, swapping the bounds when given in reverse order.
    pub fn new(a: u32, b: u32) -> Self {
        if a <= b {
            Self { min: a, max: b }
        } else {
            Self { min: b, max: a }
        }
    }
}

/// Distance-from-center bounds in kilometres, always stored with `min <= max`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistanceRange {
    pub min: f64,
    pub max: f64,
}

impl DistanceRange {
    /// Build a range, swapping the bounds when given in reverse order.
    pub fn new(a: f64, b: f64) -> Self {
        if a <= b {
            Self { min: a, max: b }
        } else {
            Self { min: b, max: a }
        }
    }
}

/// One search result as presented to the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotelRecord {
    pub name: String,
    pub address: String,
    /// Formatted price exactly as the provider returned it.
    pub price_summary: String,
    /// Formatted distance from the city center, e.g. `"0,5 km"`.
    pub distance_from_center: String,
    /// Provider key used to fetch photos.
    pub provider_id: String,
    /// Filled on demand when the user asks for photos.
    pub photo_urls: Vec<String>,
}

impl fmt::Display for HotelRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} is located at: {}, {} from the center. Total price: {}",
            self.name, self.address, self.distance_from_center, self.price_summary
        )
    }
}
