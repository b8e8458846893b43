//! Search strategy dispatcher.
//!
//! Turns a completed [`QueryState`] into one provider request, converts the
//! answer into [`HotelRecord`]s and, for best-deal searches, filters them
//! by distance from the center.

use roomfinder_core::types::{DistanceRange, HotelRecord, SearchMode, ADDRESS_PLACEHOLDER};
use roomfinder_provider::{HotelProvider, RawHotel, SearchRequest};

use crate::query::QueryState;

/// Shown in place of a price or distance the provider did not send.
pub const UNKNOWN_PLACEHOLDER: &str = "unknown";

/// Runs searches against a [`HotelProvider`].
#[derive(Debug, Clone, Copy)]
pub struct SearchDispatcher {
    max_results: u32,
}

impl SearchDispatcher {
    pub fn new(max_results: u32) -> Self {
        Self {
            max_results: max_results.max(1),
        }
    }

    /// Build the provider request for a query, or `None` when required
    /// parameters are still missing.
    pub fn build_request(&self, query: &QueryState) -> Option<SearchRequest> {
        if !query.is_searchable() {
            return None;
        }
        let price = query.price_range.filter(|_| query.search_mode.needs_ranges());
        Some(SearchRequest {
            location_id: query.location_id.clone()?,
            check_in: query.check_in?,
            check_out: query.check_out?,
            page_size: query.result_count.clamp(1, self.max_results),
            currency: query.currency,
            sort_order: query.search_mode.sort_order(),
            price_min: price.map(|p| p.min),
            price_max: price.map(|p| p.max),
        })
    }

    /// Run the search for `query` and return the records to present.
    ///
    /// Provider failures are logged and yield no records; the caller
    /// treats an empty list as "nothing found".
    pub async fn dispatch(&self, provider: &dyn HotelProvider, query: &QueryState) -> Vec<HotelRecord> {
        let Some(request) = self.build_request(query) else {
            tracing::error!(
                search_id = ?query.search_id,
                "Search dispatched with incomplete parameters"
            );
            return Vec::new();
        };

        let raw = match provider.search(&request).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!(
                    search_id = ?query.search_id,
                    mode = %query.search_mode,
                    error = %e,
                    "Hotel search failed"
                );
                return Vec::new();
            }
        };

        let received = raw.len();
        let records: Vec<HotelRecord> = match (query.search_mode, query.distance_range) {
            (SearchMode::BestDeal, Some(range)) => raw
                .into_iter()
                .filter(|h| h.distance.as_deref().is_some_and(|d| within_distance(d, &range)))
                .map(to_record)
                .collect(),
            _ => raw.into_iter().map(to_record).collect(),
        };

        tracing::info!(
            search_id = ?query.search_id,
            mode = %query.search_mode,
            received,
            kept = records.len(),
            "Search finished"
        );
        records
    }
}

/// Convert a provider entry, filling placeholders for missing fields.
pub fn to_record(raw: RawHotel) -> HotelRecord {
    HotelRecord {
        name: raw.name,
        address: raw
            .address
            .unwrap_or_else(|| ADDRESS_PLACEHOLDER.to_string()),
        price_summary: raw
            .price_summary
            .unwrap_or_else(|| UNKNOWN_PLACEHOLDER.to_string()),
        distance_from_center: raw
            .distance
            .unwrap_or_else(|| UNKNOWN_PLACEHOLDER.to_string()),
        provider_id: raw.provider_id,
        photo_urls: Vec::new(),
    }
}

/// Scale a distance to tenths of a kilometre, truncating toward zero.
pub fn scale_tenths(km: f64) -> i64 {
    (km * 10.0).trunc() as i64
}

/// Parse the leading number of a provider distance such as `"0,5 km"`.
pub fn parse_distance(text: &str) -> Option<f64> {
    let prefix: String = text
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == ',' || *c == '.')
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    prefix.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Whether a provider distance falls in `range`.
///
/// Both sides are compared in truncated tenths and the upper bound is
/// exclusive: with `(0.3, 0.8)`, `"0,3 km"` is kept and `"0,8 km"` is not.
pub fn within_distance(distance: &str, range: &DistanceRange) -> bool {
    let Some(km) = parse_distance(distance) else {
        return false;
    };
    let value = scale_tenths(km);
    scale_tenths(range.min) <= value && value < scale_tenths(range.max)
}
