use crate::error::AnalysisError;
use crate::model::AuthHeaders;

/// Raw transport to the marketplace. Implementations return the response body and
/// map HTTP failures onto [`AnalysisError`]; parsing happens elsewhere.
#[async_trait::async_trait]
pub trait MarketApi: Send + Sync {
    async fn brand_suggestions(
        &self,
        query: &str,
        catalog_id: i64,
        headers: &AuthHeaders,
    ) -> Result<String, AnalysisError>;

    async fn sold_items_page(
        &self,
        brand_id: i64,
        catalog_id: i64,
        page: u32,
        per_page: u32,
        headers: &AuthHeaders,
    ) -> Result<String, AnalysisError>;
}
