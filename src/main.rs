use futures::future::join_all;
use market_scout::analyzer::MarketAnalyzer;
use market_scout::catalog::taxonomy::load_taxonomy;
use market_scout::catalog::CategoryIndex;
use market_scout::collector::{MarketDataCollector, VintedClient};
use market_scout::config::{load_config, AppConfig, ProductConfig};
use market_scout::model::AnalysisRequest;
use market_scout::storage::SqliteStorage;
use market_scout::MarketAnalysisEngine;
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

/// How many past analyses feed the trend line.
const HISTORY_DEPTH: usize = 10;

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt::init();

    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("😱 Panic occurred: {:?}", panic_info);
    }));

    let config: Arc<AppConfig> = match load_config("config.json") {
        Ok(cfg) => Arc::new(cfg),
        Err(e) => {
            error!("Config load error: {}", e);
            return;
        }
    };

    let index = match load_taxonomy(&config.taxonomy_path).and_then(|nodes| CategoryIndex::build(&nodes)) {
        Ok(index) => Arc::new(index),
        Err(e) => {
            error!("Taxonomy load error: {}", e);
            return;
        }
    };

    let client = match VintedClient::new(&config.api) {
        Ok(c) => c,
        Err(e) => {
            error!("HTTP client init failed: {}", e);
            return;
        }
    };
    let collector = MarketDataCollector::from_config(client, &config.api);
    let engine = MarketAnalysisEngine::new(index, collector);

    // SQLite access is serialized behind an async mutex
    let storage = match SqliteStorage::new(&config.database_path) {
        Ok(s) => Arc::new(Mutex::new(s)),
        Err(e) => {
            error!("Failed to initialize storage: {:?}", e);
            return;
        }
    };

    info!("Products to analyze: {}", config.products.len());
    let tasks: Vec<_> = config
        .products
        .iter()
        .map(|product| process_product(product, &engine, &config, storage.clone()))
        .collect();
    join_all(tasks).await;
    info!("🏁 All products processed.");
}

async fn process_product(
    product: &ProductConfig,
    engine: &MarketAnalysisEngine<VintedClient>,
    config: &AppConfig,
    storage: Arc<Mutex<SqliteStorage>>,
) {
    info!("Processing product: {}", product.product_name);

    let validation = engine.validate_category(product.catalog_id);
    if !validation.is_valid {
        warn!("{}", validation.message);
        for suggestion in &validation.suggestions {
            info!("  ↳ try {} ({})", suggestion.name, suggestion.id);
        }
        return;
    }

    let request = AnalysisRequest {
        product_name: product.product_name.clone(),
        catalog_id: product.catalog_id,
        auth_headers: config.auth_headers.clone(),
    };
    let result = match engine.analyze_product(&request).await {
        Ok(r) => r,
        Err(e) => {
            warn!("Analysis of '{}' failed ({:?}): {}", product.product_name, e.kind(), e);
            return;
        }
    };

    info!(
        "📊 {} | sold: {} | avg: {} € | median: {} € | range: {}-{} € | recommended: {} €",
        product.product_name,
        result.sales_volume,
        result.avg_price,
        result.median_price,
        result.price_range.min,
        result.price_range.max,
        result.recommended_price
    );
    for (size, count) in &result.size_distribution {
        info!("  size {}: {}", size, count);
    }

    let storage = storage.lock().await;
    match storage.get_historical_analyses(&product.product_name, HISTORY_DEPTH) {
        Ok(history) if !history.is_empty() => {
            let mut averages: Vec<Decimal> = vec![result.avg_price];
            averages.extend(history.iter().map(|h| h.avg_price));
            let trend = MarketAnalyzer::price_trend_percent(result.avg_price, &averages);
            info!("📈 Trend vs {} past run(s): {}%", history.len(), trend);
        }
        Ok(_) => info!("No history yet for '{}'", product.product_name),
        Err(e) => warn!("History lookup failed: {:?}", e),
    }

    if let Err(e) = storage.save_analysis(&product.product_name, &result) {
        warn!("DB save error: {:?}", e);
    }
}
