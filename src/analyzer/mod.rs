// Analyzer module: reduces collected sold items into market statistics.

pub mod market_indicators;
pub mod price_analysis;

pub use market_indicators::MarketAnalyzer;
pub use price_analysis::{Analyzer, AnalyzerImpl};
