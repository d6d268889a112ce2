use crate::analyzer::market_indicators::MarketAnalyzer;
use crate::model::{AnalysisResult, Brand, CatalogInfo, PriceRange, SoldItem};
use chrono::Utc;
use rust_decimal::Decimal;

/// Trait defining the interface for reducing sold listings into market statistics.
pub trait Analyzer {
    fn aggregate(
        &self,
        items: Vec<SoldItem>,
        brand: Option<Brand>,
        catalog: CatalogInfo,
    ) -> AnalysisResult;
}

/// Implementation of the sold-items analyzer.
pub struct AnalyzerImpl;

impl AnalyzerImpl {
    pub fn new() -> Self {
        Self
    }
}

impl Analyzer for AnalyzerImpl {
    /// Count, mean, min/max and the extended indicators. An empty input yields zeros and
    /// no brand; item order is preserved and nothing is deduplicated.
    fn aggregate(
        &self,
        items: Vec<SoldItem>,
        brand: Option<Brand>,
        catalog: CatalogInfo,
    ) -> AnalysisResult {
        let prices: Vec<Decimal> = items.iter().map(|i| i.price.amount).collect();

        let avg_price = if prices.is_empty() {
            Decimal::ZERO
        } else {
            let total = prices.iter().fold(Decimal::ZERO, |acc, p| acc.saturating_add(*p));
            (total / Decimal::from(prices.len())).round_dp(2)
        };
        let price_range = PriceRange {
            min: prices.iter().min().copied().unwrap_or(Decimal::ZERO),
            max: prices.iter().max().copied().unwrap_or(Decimal::ZERO),
        };

        AnalysisResult {
            sales_volume: items.len(),
            avg_price,
            median_price: MarketAnalyzer::median(&prices),
            recommended_price: MarketAnalyzer::recommended_price(avg_price),
            price_range,
            brand_info: if items.is_empty() { None } else { brand },
            catalog_info: catalog,
            size_distribution: MarketAnalyzer::size_distribution(&items),
            raw_items: items,
            analysis_date: Utc::now(),
        }
    }
}
