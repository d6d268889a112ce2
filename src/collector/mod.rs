// Collector module: brand resolution and sold-item pagination over the marketplace API.

pub mod cancel;
pub mod fetcher;
pub mod retry;
pub mod traits;

pub use cancel::{CancelHandle, CancelSignal};
pub use fetcher::VintedClient;
pub use retry::{RetryPolicy, Sleeper, TokioSleeper, retry_with_backoff};
pub use traits::MarketApi;

use crate::catalog::index::words;
use crate::config::ApiConfig;
use crate::error::{AnalysisError, InfraError};
use crate::model::{AuthHeaders, Brand, SoldItem};
use crate::parser::{Parser, VintedParser};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Items requested per sold-items page.
pub const SOLD_ITEMS_PAGE_SIZE: u32 = 96;
pub const DEFAULT_PAGE_TIMEOUT: Duration = Duration::from_secs(15);

pub struct MarketDataCollector<A> {
    api: A,
    parser: VintedParser,
    retry: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
    page_timeout: Duration,
    max_pages: Option<u32>,
}

impl<A: MarketApi> MarketDataCollector<A> {
    pub fn new(api: A, retry: RetryPolicy) -> Self {
        Self {
            api,
            parser: VintedParser::new(),
            retry,
            sleeper: Arc::new(TokioSleeper),
            page_timeout: DEFAULT_PAGE_TIMEOUT,
            max_pages: None,
        }
    }

    pub fn from_config(api: A, cfg: &ApiConfig) -> Self {
        let retry = RetryPolicy::new(cfg.max_retries, Duration::from_millis(cfg.base_delay_ms))
            .with_jitter(Duration::from_millis(cfg.jitter_ms));
        Self::new(api, retry)
            .with_page_timeout(cfg.page_timeout())
            .with_max_pages(cfg.max_pages)
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn with_page_timeout(mut self, page_timeout: Duration) -> Self {
        self.page_timeout = page_timeout;
        self
    }

    pub fn with_max_pages(mut self, max_pages: Option<u32>) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Picks the suggestion whose name appears as whole words in the product name, else the first one.
    pub async fn resolve_brand_hint(
        &self,
        product_name: &str,
        catalog_id: i64,
        headers: &AuthHeaders,
        cancel: &CancelSignal,
    ) -> Result<Brand, AnalysisError> {
        info!("🔎 Resolving brand for '{}' in catalog {}", product_name, catalog_id);

        let body = cancel
            .guard(retry_with_backoff(&self.retry, self.sleeper.as_ref(), || {
                self.timed(self.api.brand_suggestions(product_name, catalog_id, headers))
            }))
            .await?;
        let brands = self.parser.parse_brands(&body)?;

        let product = words(product_name);
        let best = brands
            .iter()
            .position(|b| contains_phrase(&product, &words(&b.name)))
            .unwrap_or(0);
        let brand = brands.into_iter().nth(best).ok_or_else(|| {
            AnalysisError::NotFound(format!(
                "no brand suggestion for '{product_name}' in catalog {catalog_id}"
            ))
        })?;

        info!("🏷️ Brand hint: {} ({})", brand.name, brand.id);
        Ok(brand)
    }

    /// Fetches pages 1, 2, ... one at a time until a page comes back empty.
    pub async fn collect_sold_items(
        &self,
        brand_id: i64,
        catalog_id: i64,
        headers: &AuthHeaders,
        cancel: &CancelSignal,
    ) -> Result<Vec<SoldItem>, AnalysisError> {
        let mut items = Vec::new();
        let mut page: u32 = 1;

        loop {
            if let Some(max) = self.max_pages {
                if page > max {
                    warn!(
                        "Page cap {} reached for brand {} / catalog {}; stopping with {} items",
                        max,
                        brand_id,
                        catalog_id,
                        items.len()
                    );
                    break;
                }
            }

            let body = cancel
                .guard(retry_with_backoff(&self.retry, self.sleeper.as_ref(), || {
                    self.timed(self.api.sold_items_page(
                        brand_id,
                        catalog_id,
                        page,
                        SOLD_ITEMS_PAGE_SIZE,
                        headers,
                    ))
                }))
                .await?;
            let page_items = self.parser.parse_sold_items(&body, page)?;

            if page_items.is_empty() {
                debug!("Page {} empty, pagination done", page);
                break;
            }
            debug!("Page {}: {} items", page, page_items.len());
            items.extend(page_items);
            page += 1;
        }

        info!(
            "📦 Collected {} sold items over {} page(s) for brand {} / catalog {}",
            items.len(),
            page - 1,
            brand_id,
            catalog_id
        );
        Ok(items)
    }

    async fn timed<F>(&self, request: F) -> Result<String, AnalysisError>
    where
        F: std::future::Future<Output = Result<String, AnalysisError>>,
    {
        match timeout(self.page_timeout, request).await {
            Ok(result) => result,
            Err(_) => Err(InfraError::Timeout(self.page_timeout).into()),
        }
    }
}

/// Whole-word match: `phrase` occurs as consecutive words of `text`.
fn contains_phrase(text: &[String], phrase: &[String]) -> bool {
    !phrase.is_empty() && text.windows(phrase.len()).any(|w| w == phrase)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::collector::retry::tests::RecordingSleeper;
    use crate::error::CancelReason;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    pub(crate) enum Reply {
        Body(String),
        Fail(AnalysisError),
        Hang,
    }

    /// Scripted marketplace: replies are consumed in order; an exhausted script
    /// answers with an empty page.
    #[derive(Default)]
    pub(crate) struct FakeApi {
        pub(crate) brands: Mutex<VecDeque<Reply>>,
        pub(crate) pages: Mutex<VecDeque<Reply>>,
        pub(crate) page_calls: AtomicU32,
        pub(crate) requested_pages: Mutex<Vec<u32>>,
    }

    impl FakeApi {
        pub(crate) fn with_pages(pages: Vec<Reply>) -> Self {
            Self {
                pages: Mutex::new(pages.into()),
                ..Default::default()
            }
        }

        pub(crate) fn with_brands(self, brands: Vec<Reply>) -> Self {
            *self.brands.lock().unwrap() = brands.into();
            self
        }

        async fn answer(reply: Option<Reply>, fallback: &str) -> Result<String, AnalysisError> {
            match reply {
                Some(Reply::Body(body)) => Ok(body),
                Some(Reply::Fail(err)) => Err(err),
                Some(Reply::Hang) => std::future::pending().await,
                None => Ok(fallback.to_string()),
            }
        }
    }

    #[async_trait::async_trait]
    impl MarketApi for FakeApi {
        async fn brand_suggestions(
            &self,
            _query: &str,
            _catalog_id: i64,
            _headers: &AuthHeaders,
        ) -> Result<String, AnalysisError> {
            let reply = self.brands.lock().unwrap().pop_front();
            Self::answer(reply, r#"{"brands": []}"#).await
        }

        async fn sold_items_page(
            &self,
            _brand_id: i64,
            _catalog_id: i64,
            page: u32,
            per_page: u32,
            _headers: &AuthHeaders,
        ) -> Result<String, AnalysisError> {
            assert_eq!(per_page, SOLD_ITEMS_PAGE_SIZE);
            self.page_calls.fetch_add(1, Ordering::SeqCst);
            self.requested_pages.lock().unwrap().push(page);
            let reply = self.pages.lock().unwrap().pop_front();
            Self::answer(reply, r#"{"items": []}"#).await
        }
    }

    pub(crate) fn page_of(prices: &[&str]) -> Reply {
        let items: Vec<String> = prices
            .iter()
            .enumerate()
            .map(|(i, p)| format!(r#"{{"title": "item {i}", "price": {{"amount": "{p}"}}}}"#))
            .collect();
        Reply::Body(format!(r#"{{"items": [{}]}}"#, items.join(",")))
    }

    fn collector(api: FakeApi) -> MarketDataCollector<FakeApi> {
        MarketDataCollector::new(api, RetryPolicy::new(3, Duration::from_millis(100)))
            .with_sleeper(Arc::new(RecordingSleeper::default()))
    }

    #[tokio::test]
    async fn stops_at_first_empty_page() {
        let api = FakeApi::with_pages(vec![
            page_of(&["10", "20"]),
            page_of(&["30"]),
            page_of(&[]),
            page_of(&["99"]),
        ]);
        let c = collector(api);
        let items = c
            .collect_sold_items(53, 1242, &AuthHeaders::new(), &CancelSignal::never())
            .await
            .unwrap();

        assert_eq!(items.len(), 3);
        assert_eq!(c.api.page_calls.load(Ordering::SeqCst), 3);
        assert_eq!(*c.api.requested_pages.lock().unwrap(), vec![1, 2, 3]);
        let titles: Vec<&str> = items.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["item 0", "item 1", "item 0"]);
    }

    #[tokio::test]
    async fn transient_page_failures_are_retried() {
        let api = FakeApi::with_pages(vec![
            page_of(&["10"]),
            Reply::Fail(InfraError::RateLimited.into()),
            Reply::Fail(InfraError::Network("reset".into()).into()),
            page_of(&["20"]),
        ]);
        let c = collector(api);
        let items = c
            .collect_sold_items(1, 2, &AuthHeaders::new(), &CancelSignal::never())
            .await
            .unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(*c.api.requested_pages.lock().unwrap(), vec![1, 2, 2, 2, 3]);
    }

    #[tokio::test]
    async fn auth_failure_is_not_retried() {
        let api = FakeApi::with_pages(vec![Reply::Fail(AnalysisError::Auth("HTTP 401".into()))]);
        let c = collector(api);
        let err = c
            .collect_sold_items(1, 2, &AuthHeaders::new(), &CancelSignal::never())
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::Auth(_)));
        assert_eq!(c.api.page_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn invalid_item_fails_the_collection() {
        let api = FakeApi::with_pages(vec![
            page_of(&["10"]),
            Reply::Body(r#"{"items": [{"title": "no price"}]}"#.into()),
        ]);
        let err = collector(api)
            .collect_sold_items(1, 2, &AuthHeaders::new(), &CancelSignal::never())
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::Parsing { ref context, .. } if context.starts_with("page 2")));
    }

    #[tokio::test(start_paused = true)]
    async fn page_timeout_is_retryable() {
        let api = FakeApi::with_pages(vec![Reply::Hang, page_of(&["10"])]);
        let c = collector(api);
        let items = c
            .collect_sold_items(1, 2, &AuthHeaders::new(), &CancelSignal::never())
            .await
            .unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(*c.api.requested_pages.lock().unwrap(), vec![1, 1, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_timeouts_surface_the_timeout() {
        let api = FakeApi::with_pages(vec![Reply::Hang, Reply::Hang, Reply::Hang, Reply::Hang]);
        let err = collector(api)
            .collect_sold_items(1, 2, &AuthHeaders::new(), &CancelSignal::never())
            .await
            .unwrap_err();
        assert_eq!(err, AnalysisError::from(InfraError::Timeout(DEFAULT_PAGE_TIMEOUT)));
    }

    #[tokio::test]
    async fn cancellation_aborts_without_partial_result() {
        let (handle, signal) = CancelHandle::new();
        handle.cancel();
        let api = FakeApi::with_pages(vec![page_of(&["10"])]);
        let err = collector(api)
            .collect_sold_items(1, 2, &AuthHeaders::new(), &signal)
            .await
            .unwrap_err();
        assert_eq!(err, AnalysisError::Cancelled(CancelReason::Caller));
    }

    #[tokio::test]
    async fn page_cap_stops_early() {
        let api = FakeApi::with_pages(vec![page_of(&["1"]), page_of(&["2"]), page_of(&["3"])]);
        let c = collector(api).with_max_pages(Some(2));
        let items = c
            .collect_sold_items(1, 2, &AuthHeaders::new(), &CancelSignal::never())
            .await
            .unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(c.api.page_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn brand_hint_prefers_name_in_product() {
        let api = FakeApi::default().with_brands(vec![Reply::Body(
            r#"{"brands": [{"id": 1, "title": "Nike ACG"}, {"id": 53, "title": "Nike"}]}"#.into(),
        )]);
        let brand = collector(api)
            .resolve_brand_hint("nike air max 90", 1242, &AuthHeaders::new(), &CancelSignal::never())
            .await
            .unwrap();
        assert_eq!(brand, Brand { id: 53, name: "Nike".into() });
    }

    #[tokio::test]
    async fn brand_hint_ignores_partial_words() {
        let api = FakeApi::default().with_brands(vec![Reply::Body(
            r#"{"brands": [{"id": 9, "title": "On"}, {"id": 77, "title": "Onitsuka Tiger"}]}"#.into(),
        )]);
        let brand = collector(api)
            .resolve_brand_hint("onitsuka tiger mexico 66", 1242, &AuthHeaders::new(), &CancelSignal::never())
            .await
            .unwrap();
        assert_eq!(brand.id, 77);

        assert!(contains_phrase(&words("levi's 501 jeans"), &words("Levi's")));
        assert!(!contains_phrase(&words("longsleeve"), &words("On")));
    }

    #[tokio::test]
    async fn brand_hint_falls_back_to_first_and_reports_empty_as_not_found() {
        let api = FakeApi::default().with_brands(vec![
            Reply::Body(r#"{"brands": [{"id": 7, "title": "Levi's"}]}"#.into()),
            Reply::Body(r#"{"brands": []}"#.into()),
            Reply::Body(r#"{"brands": [{"title": "anonymous"}]}"#.into()),
        ]);
        let c = collector(api);
        let headers = AuthHeaders::new();
        let never = CancelSignal::never();

        let brand = c.resolve_brand_hint("501 jeans", 5, &headers, &never).await.unwrap();
        assert_eq!(brand.id, 7);

        let err = c.resolve_brand_hint("501 jeans", 5, &headers, &never).await.unwrap_err();
        assert!(matches!(err, AnalysisError::NotFound(_)));

        let err = c.resolve_brand_hint("501 jeans", 5, &headers, &never).await.unwrap_err();
        assert!(matches!(err, AnalysisError::Parsing { .. }));
    }
}
