//! In-memory collaborators for tests and offline runs.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{ProviderError, TranscriptionError};
use crate::transcription::Transcriber;
use crate::{HotelProvider, RawHotel, SearchRequest, TownCandidate};

// =============================================================================
// Hotel provider
// =============================================================================

/// Mock hotel provider serving canned towns, hotels and photos.
///
/// Records every search request so tests can assert on what the
/// conversation asked for. Individual calls can be made to fail, panic
/// or stall for a while.
#[derive(Debug, Default)]
pub struct MockHotelProvider {
    towns: Vec<TownCandidate>,
    hotels: Vec<RawHotel>,
    photos: Vec<String>,
    fail_lookup: bool,
    fail_search: bool,
    fail_photos: bool,
    panic_on_search: bool,
    delay: Option<Duration>,
    requests: Mutex<Vec<SearchRequest>>,
    lookups: AtomicUsize,
}

impl MockHotelProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_towns(mut self, towns: Vec<TownCandidate>) -> Self {
        self.towns = towns;
        self
    }

    pub fn with_hotels(mut self, hotels: Vec<RawHotel>) -> Self {
        self.hotels = hotels;
        self
    }

    pub fn with_photos(mut self, photos: Vec<String>) -> Self {
        self.photos = photos;
        self
    }

    /// Sleep before answering every call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn failing_lookup(mut self) -> Self {
        self.fail_lookup = true;
        self
    }

    pub fn failing_search(mut self) -> Self {
        self.fail_search = true;
        self
    }

    pub fn failing_photos(mut self) -> Self {
        self.fail_photos = true;
        self
    }

    /// Panic inside `search`, simulating a bug in a step.
    pub fn panicking_search(mut self) -> Self {
        self.panic_on_search = true;
        self
    }

    /// Search requests received so far, oldest first.
    pub fn search_requests(&self) -> Vec<SearchRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of town lookups received so far.
    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::Relaxed)
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl HotelProvider for MockHotelProvider {
    async fn lookup_town(&self, name: &str) -> Result<Vec<TownCandidate>, ProviderError> {
        self.lookups.fetch_add(1, Ordering::Relaxed);
        self.pause().await;
        if self.fail_lookup {
            return Err(ProviderError::Status(503));
        }
        let wanted = name.trim().to_lowercase();
        Ok(self
            .towns
            .iter()
            .filter(|t| t.display_name.to_lowercase() == wanted)
            .cloned()
            .collect())
    }

    async fn search(&self, request: &SearchRequest) -> Result<Vec<RawHotel>, ProviderError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());
        self.pause().await;
        if self.panic_on_search {
            panic!("mock provider asked to panic");
        }
        if self.fail_search {
            return Err(ProviderError::Http("connection reset".to_string()));
        }
        Ok(self
            .hotels
            .iter()
            .take(request.page_size as usize)
            .cloned()
            .collect())
    }

    async fn fetch_photos(
        &self,
        _provider_id: &str,
        count: u32,
    ) -> Result<Vec<String>, ProviderError> {
        self.pause().await;
        if self.fail_photos {
            return Err(ProviderError::Malformed("missing hotelImages".to_string()));
        }
        Ok(self.photos.iter().take(count as usize).cloned().collect())
    }
}

// =============================================================================
// Transcriber
// =============================================================================

/// Mock transcriber returning a fixed outcome for every clip.
#[derive(Debug, Clone)]
pub struct MockTranscriber {
    outcome: Result<String, TranscriptionError>,
    delay: Option<Duration>,
}

impl MockTranscriber {
    /// Every clip transcribes to `text`.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            outcome: Ok(text.into()),
            delay: None,
        }
    }

    pub fn not_understood() -> Self {
        Self {
            outcome: Err(TranscriptionError::NotUnderstood),
            delay: None,
        }
    }

    pub fn unavailable() -> Self {
        Self {
            outcome: Err(TranscriptionError::Unavailable(
                "mock service offline".to_string(),
            )),
            delay: None,
        }
    }

    /// Sleep this long before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl Transcriber for MockTranscriber {
    async fn transcribe(&self, audio: &[u8]) -> Result<String, TranscriptionError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if audio.is_empty() {
            return Err(TranscriptionError::NotUnderstood);
        }
        self.outcome.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use roomfinder_core::types::{Currency, SortOrder};

    fn town(name: &str, region: &str, id: &str) -> TownCandidate {
        TownCandidate {
            display_name: name.to_string(),
            region: region.to_string(),
            location_id: id.to_string(),
        }
    }

    fn hotel(name: &str) -> RawHotel {
        RawHotel {
            name: name.to_string(),
            address: None,
            price_summary: Some("$10".to_string()),
            distance: Some("1,0 km".to_string()),
            provider_id: name.to_lowercase(),
        }
    }

    fn request(page_size: u32) -> SearchRequest {
        SearchRequest {
            location_id: "1".to_string(),
            check_in: NaiveDate::from_ymd_opt(2026, 11, 1).unwrap(),
            check_out: NaiveDate::from_ymd_opt(2026, 11, 3).unwrap(),
            page_size,
            currency: Currency::Usd,
            sort_order: SortOrder::Price,
            price_min: None,
            price_max: None,
        }
    }

    #[tokio::test]
    async fn test_lookup_matches_case_insensitively() {
        let provider = MockHotelProvider::new().with_towns(vec![
            town("Paris", "France", "1"),
            town("Paris", "Texas", "2"),
            town("Lyon", "France", "3"),
        ]);
        let towns = provider.lookup_town("PARIS").await.unwrap();
        assert_eq!(towns.len(), 2);
        assert_eq!(provider.lookup_count(), 1);
        assert!(provider.lookup_town("Berlin").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_records_requests_and_honours_page_size() {
        let provider =
            MockHotelProvider::new().with_hotels(vec![hotel("A"), hotel("B"), hotel("C")]);
        let found = provider.search(&request(2)).await.unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].name, "A");
        let requests = provider.search_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].page_size, 2);
    }

    #[tokio::test]
    async fn test_failure_flags() {
        let provider = MockHotelProvider::new()
            .failing_lookup()
            .failing_search()
            .failing_photos();
        assert!(provider.lookup_town("Paris").await.is_err());
        assert!(provider.search(&request(5)).await.is_err());
        assert!(provider.fetch_photos("x", 3).await.is_err());
    }

    #[tokio::test]
    async fn test_fetch_photos_limits_count() {
        let provider = MockHotelProvider::new().with_photos(vec![
            "u1".to_string(),
            "u2".to_string(),
            "u3".to_string(),
        ]);
        assert_eq!(provider.fetch_photos("x", 2).await.unwrap().len(), 2);
        assert_eq!(provider.fetch_photos("x", 7).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_mock_transcriber_outcomes() {
        assert_eq!(
            MockTranscriber::text("Paris").transcribe(b"ogg").await,
            Ok("Paris".to_string())
        );
        assert_eq!(
            MockTranscriber::not_understood().transcribe(b"ogg").await,
            Err(TranscriptionError::NotUnderstood)
        );
        assert!(matches!(
            MockTranscriber::unavailable().transcribe(b"ogg").await,
            Err(TranscriptionError::Unavailable(_))
        ));
        assert_eq!(
            MockTranscriber::text("Paris").transcribe(b"").await,
            Err(TranscriptionError::NotUnderstood)
        );
    }
}
