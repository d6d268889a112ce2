use crate::collector::traits::MarketApi;
use crate::config::ApiConfig;
use crate::error::{AnalysisError, InfraError};
use crate::model::AuthHeaders;

use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::time::Duration;
use tracing::debug;

/// Error bodies are trimmed to this many characters before they land in an error.
const MAX_ERROR_BODY: usize = 200;

pub struct VintedClient {
    client: Client,
    base_url: String,
    brands_path: String,
    sold_items_path: String,
    timeout: Duration,
}

impl VintedClient {
    pub fn new(cfg: &ApiConfig) -> Result<Self, AnalysisError> {
        let client = Client::builder()
            .user_agent(cfg.user_agent.as_str())
            .timeout(cfg.page_timeout())
            .build()
            .map_err(|e| InfraError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            brands_path: cfg.brands_path.clone(),
            sold_items_path: cfg.sold_items_path.clone(),
            timeout: cfg.page_timeout(),
        })
    }

    fn header_map(headers: &AuthHeaders) -> Result<HeaderMap, AnalysisError> {
        let mut map = HeaderMap::new();
        for (name, value) in headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| AnalysisError::validation("auth_headers", format!("{name}: {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| AnalysisError::validation("auth_headers", format!("{name}: {e}")))?;
            map.insert(name, value);
        }
        Ok(map)
    }

    fn transport_error(&self, e: reqwest::Error) -> AnalysisError {
        if e.is_timeout() {
            InfraError::Timeout(self.timeout).into()
        } else {
            InfraError::Network(e.to_string()).into()
        }
    }

    async fn get(
        &self,
        path: &str,
        query: &[(&str, String)],
        headers: &AuthHeaders,
    ) -> Result<String, AnalysisError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {} {:?}", url, query);

        let response = self
            .client
            .get(&url)
            .headers(Self::header_map(headers)?)
            .query(query)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.transport_error(e))?;
        if status.is_success() {
            Ok(body)
        } else {
            Err(classify_status(status.as_u16(), &body))
        }
    }
}

/// Maps a non-success HTTP status onto the engine's error taxonomy.
pub fn classify_status(status: u16, body: &str) -> AnalysisError {
    let body: String = body.chars().take(MAX_ERROR_BODY).collect();
    match status {
        401 => AnalysisError::Auth(format!("HTTP 401: {body}")),
        404 => AnalysisError::NotFound(format!("upstream resource (HTTP 404): {body}")),
        429 => InfraError::RateLimited.into(),
        // any other 4xx will fail the same way next time
        400..=499 => AnalysisError::validation("upstream request", format!("HTTP {status}: {body}")),
        _ => InfraError::Status { status, body }.into(),
    }
}

#[async_trait::async_trait]
impl MarketApi for VintedClient {
    async fn brand_suggestions(
        &self,
        query: &str,
        catalog_id: i64,
        headers: &AuthHeaders,
    ) -> Result<String, AnalysisError> {
        let params = [
            ("search_text", query.to_string()),
            ("catalog_id", catalog_id.to_string()),
        ];
        self.get(&self.brands_path, &params, headers).await
    }

    async fn sold_items_page(
        &self,
        brand_id: i64,
        catalog_id: i64,
        page: u32,
        per_page: u32,
        headers: &AuthHeaders,
    ) -> Result<String, AnalysisError> {
        let params = [
            ("brand_id", brand_id.to_string()),
            ("catalog_id", catalog_id.to_string()),
            ("page", page.to_string()),
            ("per_page", per_page.to_string()),
        ];
        self.get(&self.sold_items_path, &params, headers).await
    }
}
