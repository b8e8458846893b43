//! RapidAPI hotels4 implementation of [`HotelProvider`].
//!
//! Three endpoints are used: `locations/search`, `properties/list` and
//! `properties/get-hotel-photos`. Response parsing is split into pure
//! functions so it can be tested against captured JSON.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use roomfinder_core::config::ProviderConfig;

use crate::error::ProviderError;
use crate::{HotelProvider, RawHotel, SearchRequest, TownCandidate};

/// Locale used for town lookups typed in Cyrillic.
const CYRILLIC_LOCALE: &str = "ru_RU";

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("Invalid tag regex"));

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Deserialize)]
struct LocationsResponse {
    suggestions: Option<Vec<SuggestionGroup>>,
}

#[derive(Debug, Deserialize)]
struct SuggestionGroup {
    #[serde(default)]
    entities: Vec<LocationEntity>,
}

#[derive(Debug, Deserialize)]
struct LocationEntity {
    #[serde(rename = "destinationId")]
    destination_id: Option<Value>,
    #[serde(rename = "type")]
    kind: Option<String>,
    name: Option<String>,
    caption: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PropertiesResponse {
    data: Option<PropertiesData>,
}

#[derive(Debug, Deserialize)]
struct PropertiesData {
    body: Option<PropertiesBody>,
}

#[derive(Debug, Deserialize)]
struct PropertiesBody {
    #[serde(rename = "searchResults")]
    search_results: Option<SearchResults>,
}

#[derive(Debug, Deserialize)]
struct SearchResults {
    #[serde(default)]
    results: Vec<PropertyItem>,
}

#[derive(Debug, Deserialize)]
struct PropertyItem {
    id: Option<Value>,
    name: Option<String>,
    #[serde(default)]
    address: PropertyAddress,
    #[serde(rename = "ratePlan")]
    rate_plan: Option<RatePlan>,
    #[serde(default)]
    landmarks: Vec<Landmark>,
}

#[derive(Debug, Default, Deserialize)]
struct PropertyAddress {
    #[serde(rename = "streetAddress")]
    street_address: Option<String>,
    #[serde(rename = "extendedAddress")]
    extended_address: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RatePlan {
    price: Option<RatePrice>,
}

#[derive(Debug, Deserialize)]
struct RatePrice {
    current: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Landmark {
    distance: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PhotosResponse {
    #[serde(rename = "hotelImages")]
    hotel_images: Option<Vec<HotelImage>>,
}

#[derive(Debug, Deserialize)]
struct HotelImage {
    #[serde(rename = "baseUrl")]
    base_url: Option<String>,
    #[serde(default)]
    sizes: Vec<ImageSize>,
}

#[derive(Debug, Deserialize)]
struct ImageSize {
    suffix: Option<String>,
}

// =============================================================================
// Provider
// =============================================================================

/// Hotel provider backed by the RapidAPI hotels4 REST API.
pub struct RapidApiProvider {
    client: reqwest::Client,
    base_url: String,
    api_host: String,
    api_key: String,
    search_locale: String,
    adults: u32,
}

impl RapidApiProvider {
    /// Build a provider from configuration.
    ///
    /// Fails with [`ProviderError::MissingApiKey`] when no key is configured.
    pub fn new(config: &ProviderConfig, adults: u32) -> Result<Self, ProviderError> {
        if config.api_key.trim().is_empty() {
            return Err(ProviderError::MissingApiKey);
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ProviderError::Http(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_host: config.api_host.clone(),
            api_key: config.api_key.clone(),
            search_locale: config.search_locale.clone(),
            adults: adults.max(1),
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ProviderError> {
        let url = format!("{}/{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .header("x-rapidapi-key", &self.api_key)
            .header("x-rapidapi-host", &self.api_host)
            .query(query)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(%url, status = status.as_u16(), body = %body, "Provider returned an error");
            return Err(ProviderError::Status(status.as_u16()));
        }

        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl HotelProvider for RapidApiProvider {
    async fn lookup_town(&self, name: &str) -> Result<Vec<TownCandidate>, ProviderError> {
        let locale = locale_for(name, &self.search_locale);
        let body: LocationsResponse = self
            .get_json(
                "locations/search",
                &[("query", name.to_string()), ("locale", locale.to_string())],
            )
            .await?;
        let towns = parse_towns(body, name)?;
        tracing::debug!(query = %name, locale, found = towns.len(), "Town lookup finished");
        Ok(towns)
    }

    async fn search(&self, request: &SearchRequest) -> Result<Vec<RawHotel>, ProviderError> {
        let mut query = vec![
            ("adults1", self.adults.to_string()),
            ("pageNumber", "1".to_string()),
            ("destinationId", request.location_id.clone()),
            ("pageSize", request.page_size.to_string()),
            ("checkIn", request.check_in.format("%Y-%m-%d").to_string()),
            ("checkOut", request.check_out.format("%Y-%m-%d").to_string()),
            ("sortOrder", request.sort_order.as_str().to_string()),
            ("locale", self.search_locale.clone()),
            ("currency", request.currency.code().to_string()),
        ];
        if let Some(min) = request.price_min {
            query.push(("priceMin", min.to_string()));
        }
        if let Some(max) = request.price_max {
            query.push(("priceMax", max.to_string()));
        }

        let body: PropertiesResponse = self.get_json("properties/list", &query).await?;
        let hotels = parse_hotels(body)?;
        tracing::debug!(
            location_id = %request.location_id,
            sort_order = %request.sort_order,
            found = hotels.len(),
            "Property search finished"
        );
        Ok(hotels)
    }

    async fn fetch_photos(
        &self,
        provider_id: &str,
        count: u32,
    ) -> Result<Vec<String>, ProviderError> {
        let body: PhotosResponse = self
            .get_json(
                "properties/get-hotel-photos",
                &[("id", provider_id.to_string())],
            )
            .await?;
        parse_photos(body, count)
    }
}

// =============================================================================
// Parsing helpers
// =============================================================================

/// Pick the lookup locale: Cyrillic input is searched in Russian.
fn locale_for<'a>(text: &str, default: &'a str) -> &'a str {
    if text.chars().any(|c| ('\u{0400}'..='\u{04FF}').contains(&c)) {
        CYRILLIC_LOCALE
    } else {
        default
    }
}

/// Render an opaque JSON identifier (string or number) as a string.
fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Extract the region from an HTML caption such as
/// `<span class='highlighted'>Paris</span>, France`.
fn caption_region(caption: &str) -> String {
    let plain = TAG_RE.replace_all(caption, "");
    plain
        .split_once(", ")
        .map(|(_, region)| region.trim().to_string())
        .unwrap_or_default()
}

fn parse_towns(body: LocationsResponse, query: &str) -> Result<Vec<TownCandidate>, ProviderError> {
    let groups = body
        .suggestions
        .ok_or_else(|| ProviderError::Malformed("missing suggestions".to_string()))?;
    let Some(first) = groups.into_iter().next() else {
        return Ok(Vec::new());
    };

    let wanted = query.trim().to_lowercase();
    let towns = first
        .entities
        .into_iter()
        .filter(|e| e.kind.as_deref() == Some("CITY"))
        .filter_map(|e| {
            let name = e.name?;
            if name.to_lowercase() != wanted {
                return None;
            }
            let location_id = e.destination_id.as_ref().and_then(id_string)?;
            let region = e.caption.as_deref().map(caption_region).unwrap_or_default();
            Some(TownCandidate {
                display_name: name,
                region,
                location_id,
            })
        })
        .collect();
    Ok(towns)
}

fn join_address(address: PropertyAddress) -> Option<String> {
    let street = address.street_address.filter(|s| !s.trim().is_empty())?;
    match address.extended_address.filter(|s| !s.trim().is_empty()) {
        Some(extended) => Some(format!("{}, {}", street, extended)),
        None => Some(street),
    }
}

fn parse_hotels(body: PropertiesResponse) -> Result<Vec<RawHotel>, ProviderError> {
    let results = body
        .data
        .and_then(|d| d.body)
        .and_then(|b| b.search_results)
        .ok_or_else(|| ProviderError::Malformed("missing data.body.searchResults".to_string()))?
        .results;

    let hotels = results
        .into_iter()
        .filter_map(|item| {
            let provider_id = item.id.as_ref().and_then(id_string);
            let (Some(name), Some(provider_id)) = (item.name, provider_id) else {
                tracing::debug!("Skipping property without name or id");
                return None;
            };
            Some(RawHotel {
                name,
                address: join_address(item.address),
                price_summary: item.rate_plan.and_then(|r| r.price).and_then(|p| p.current),
                distance: item.landmarks.into_iter().next().and_then(|l| l.distance),
                provider_id,
            })
        })
        .collect();
    Ok(hotels)
}

fn parse_photos(body: PhotosResponse, count: u32) -> Result<Vec<String>, ProviderError> {
    let images = body
        .hotel_images
        .ok_or_else(|| ProviderError::Malformed("missing hotelImages".to_string()))?;

    let urls = images
        .into_iter()
        .filter_map(|image| {
            let base = image.base_url?;
            let suffix = image.sizes.into_iter().find_map(|s| s.suffix)?;
            Some(base.replace("{size}", &suffix))
        })
        .take(count as usize)
        .collect();
    Ok(urls)
}

#[cfg(test)]
mod tests {
    use super::*;
    use roomfinder_core::config::ProviderConfig;

    fn locations(json: &str) -> LocationsResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_new_requires_api_key() {
        let config = ProviderConfig::default();
        assert!(matches!(
            RapidApiProvider::new(&config, 1),
            Err(ProviderError::MissingApiKey)
        ));
    }

    #[test]
    fn test_new_with_api_key() {
        let config = ProviderConfig {
            api_key: "k".to_string(),
            base_url: "https://example.test/".to_string(),
            ..ProviderConfig::default()
        };
        let provider = RapidApiProvider::new(&config, 0).unwrap();
        assert_eq!(provider.base_url, "https://example.test");
        assert_eq!(provider.adults, 1);
    }

    #[test]
    fn test_locale_for_cyrillic() {
        assert_eq!(locale_for("Москва", "en_US"), "ru_RU");
        assert_eq!(locale_for("Paris", "en_US"), "en_US");
    }

    #[test]
    fn test_caption_region() {
        assert_eq!(
            caption_region("<span class='highlighted'>Paris</span>, France"),
            "France"
        );
        assert_eq!(
            caption_region("<span class='highlighted'>Paris</span>, Texas, United States"),
            "Texas, United States"
        );
        assert_eq!(caption_region("Paris"), "");
    }

    #[test]
    fn test_parse_towns_filters_cities_case_insensitively() {
        let body = locations(
            r#"{"suggestions":[{"group":"CITY_GROUP","entities":[
                {"destinationId":"504261","type":"CITY","name":"Paris","caption":"<span class='highlighted'>Paris</span>, France"},
                {"destinationId":"1","type":"LANDMARK","name":"Paris","caption":"Paris landmark"},
                {"destinationId":"2","type":"CITY","name":"Parish","caption":"Parish, US"},
                {"destinationId":1633819,"type":"CITY","name":"PARIS","caption":"<span>Paris</span>, Texas, United States"}
            ]}]}"#,
        );
        let towns = parse_towns(body, "paris").unwrap();
        assert_eq!(towns.len(), 2);
        assert_eq!(towns[0].location_id, "504261");
        assert_eq!(towns[0].region, "France");
        assert_eq!(towns[1].location_id, "1633819");
        assert_eq!(towns[1].display_name, "PARIS");
    }

    #[test]
    fn test_parse_towns_empty_groups() {
        let towns = parse_towns(locations(r#"{"suggestions":[]}"#), "Paris").unwrap();
        assert!(towns.is_empty());
    }

    #[test]
    fn test_parse_towns_missing_suggestions_is_malformed() {
        let result = parse_towns(locations(r#"{"message":"quota"}"#), "Paris");
        assert!(matches!(result, Err(ProviderError::Malformed(_))));
    }

    #[test]
    fn test_parse_hotels_tolerates_missing_fields() {
        let body: PropertiesResponse = serde_json::from_str(
            r#"{"data":{"body":{"searchResults":{"results":[
                {"id":1,"name":"Full","address":{"streetAddress":"1 Main St","extendedAddress":"Suite 2"},
                 "ratePlan":{"price":{"current":"$100"}},"landmarks":[{"label":"City center","distance":"0,5 km"}]},
                {"id":"2","name":"Bare"},
                {"name":"No id"},
                {"id":4,"name":"Street only","address":{"streetAddress":"5 Side St","extendedAddress":""}}
            ]}}}}"#,
        )
        .unwrap();
        let hotels = parse_hotels(body).unwrap();
        assert_eq!(hotels.len(), 3);

        assert_eq!(hotels[0].provider_id, "1");
        assert_eq!(hotels[0].address.as_deref(), Some("1 Main St, Suite 2"));
        assert_eq!(hotels[0].price_summary.as_deref(), Some("$100"));
        assert_eq!(hotels[0].distance.as_deref(), Some("0,5 km"));

        assert_eq!(hotels[1].name, "Bare");
        assert!(hotels[1].address.is_none());
        assert!(hotels[1].price_summary.is_none());
        assert!(hotels[1].distance.is_none());

        assert_eq!(hotels[2].address.as_deref(), Some("5 Side St"));
    }

    #[test]
    fn test_parse_hotels_missing_body_is_malformed() {
        let body: PropertiesResponse = serde_json::from_str(r#"{"result":"ERROR"}"#).unwrap();
        assert!(matches!(parse_hotels(body), Err(ProviderError::Malformed(_))));
    }

    #[test]
    fn test_parse_photos_takes_requested_count() {
        let body: PhotosResponse = serde_json::from_str(
            r#"{"hotelImages":[
                {"baseUrl":"https://img.test/a_{size}.jpg","sizes":[{"type":14,"suffix":"b"},{"type":2,"suffix":"z"}]},
                {"baseUrl":"https://img.test/b_{size}.jpg","sizes":[]},
                {"baseUrl":"https://img.test/c_{size}.jpg","sizes":[{"suffix":"z"}]},
                {"baseUrl":"https://img.test/d_{size}.jpg","sizes":[{"suffix":"z"}]}
            ]}"#,
        )
        .unwrap();
        let urls = parse_photos(body, 2).unwrap();
        assert_eq!(
            urls,
            vec![
                "https://img.test/a_b.jpg".to_string(),
                "https://img.test/c_z.jpg".to_string()
            ]
        );
    }

    #[test]
    fn test_parse_photos_missing_images_is_malformed() {
        let body: PhotosResponse = serde_json::from_str("{}").unwrap();
        assert!(matches!(parse_photos(body, 3), Err(ProviderError::Malformed(_))));
    }
}
