use crate::analyzer::{Analyzer, AnalyzerImpl};
use crate::catalog::{Category, CategoryIndex, CategoryValidator, Level, ValidationResult};
use crate::collector::{CancelSignal, MarketApi, MarketDataCollector};
use crate::error::AnalysisError;
use crate::model::{AnalysisRequest, AnalysisResult, CatalogInfo};
use crate::normalizer::normalize_product_name;
use std::sync::Arc;
use tracing::info;

/// Entry point for callers: validation, collection and aggregation behind one call.
pub struct MarketAnalysisEngine<A> {
    validator: CategoryValidator,
    collector: MarketDataCollector<A>,
    analyzer: AnalyzerImpl,
}

impl<A: MarketApi> MarketAnalysisEngine<A> {
    pub fn new(index: Arc<CategoryIndex>, collector: MarketDataCollector<A>) -> Self {
        Self {
            validator: CategoryValidator::new(index),
            collector,
            analyzer: AnalyzerImpl::new(),
        }
    }

    pub fn validator(&self) -> &CategoryValidator {
        &self.validator
    }

    pub fn validate_category(&self, category_id: i64) -> ValidationResult {
        self.validator.validate_category_for_analysis(category_id)
    }

    pub fn suggest_categories(&self, product_name: &str) -> Vec<Category> {
        self.validator
            .index()
            .suggest_level3_for_product(product_name)
            .into_iter()
            .cloned()
            .collect()
    }

    pub async fn analyze_product(&self, request: &AnalysisRequest) -> Result<AnalysisResult, AnalysisError> {
        self.analyze_product_with_cancel(request, &CancelSignal::never())
            .await
    }

    pub async fn analyze_product_with_cancel(
        &self,
        request: &AnalysisRequest,
        cancel: &CancelSignal,
    ) -> Result<AnalysisResult, AnalysisError> {
        let product_name = normalize_product_name(&request.product_name);
        if product_name.is_empty() {
            return Err(AnalysisError::validation("product_name", "must not be empty"));
        }

        let catalog = self.checked_catalog(request.catalog_id)?;
        info!("🚀 Analyzing '{}' in '{}' ({})", product_name, catalog.name, catalog.id);

        let brand = self
            .collector
            .resolve_brand_hint(&product_name, catalog.id, &request.auth_headers, cancel)
            .await?;
        let items = self
            .collector
            .collect_sold_items(brand.id, catalog.id, &request.auth_headers, cancel)
            .await?;

        let result = self.analyzer.aggregate(items, Some(brand), catalog);
        info!(
            "✅ Analysis done: {} sold, avg {} (min {}, max {})",
            result.sales_volume, result.avg_price, result.price_range.min, result.price_range.max
        );
        Ok(result)
    }

    fn checked_catalog(&self, catalog_id: i64) -> Result<CatalogInfo, AnalysisError> {
        let category = self
            .validator
            .index()
            .find_category_by_id(catalog_id)
            .ok_or_else(|| AnalysisError::NotFound(format!("category {catalog_id}")))?;

        if category.level() != Level::Three {
            let validation = self.validator.validate_category_for_analysis(catalog_id);
            return Err(AnalysisError::validation("catalog_id", validation.message));
        }

        Ok(CatalogInfo {
            id: category.id,
            name: category.name.clone(),
        })
    }
}
