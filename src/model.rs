// Core structs: SoldItem, AnalysisRequest, AnalysisResult
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Header set supplied by the session collaborator (cookies, bearer token, ...).
pub type AuthHeaders = HashMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Brand {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Price {
    pub amount: Decimal,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SoldItem {
    pub title: String,
    pub price: Price,
    pub brand: Option<Brand>,
    pub size: Option<String>,
    pub created_at: DateTime<Utc>,
    pub sold_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub product_name: String,
    pub catalog_id: i64,
    pub auth_headers: AuthHeaders,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogInfo {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: Decimal,
    pub max: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub sales_volume: usize,
    pub avg_price: Decimal,
    pub median_price: Decimal,
    pub recommended_price: Decimal,
    pub price_range: PriceRange,
    pub brand_info: Option<Brand>,
    pub catalog_info: CatalogInfo,
    pub size_distribution: BTreeMap<String, usize>,
    pub raw_items: Vec<SoldItem>,
    pub analysis_date: DateTime<Utc>,
}
