// Marketplace JSON parsing: brand suggestions and sold-item pages
use crate::error::AnalysisError;
use crate::model::{Brand, Price, SoldItem};
use crate::utils::{parse_datetime, parse_decimal, parse_unix_timestamp};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;

pub const DEFAULT_CURRENCY: &str = "EUR";

pub trait Parser {
    fn parse_brands(&self, body: &str) -> Result<Vec<Brand>, AnalysisError>;
    fn parse_sold_items(&self, body: &str, page: u32) -> Result<Vec<SoldItem>, AnalysisError>;
}

#[derive(Debug, Deserialize)]
struct BrandsEnvelope {
    brands: Option<Vec<RawBrand>>,
}

#[derive(Debug, Deserialize)]
struct RawBrand {
    id: Option<i64>,
    #[serde(alias = "title")]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ItemsEnvelope {
    items: Option<Vec<RawItem>>,
}

#[derive(Debug, Deserialize)]
struct RawItem {
    title: Option<String>,
    price: Option<RawPrice>,
    brand: Option<RawBrand>,
    brand_id: Option<i64>,
    brand_title: Option<String>,
    #[serde(alias = "size")]
    size_title: Option<String>,
    created_at: Option<RawTimestamp>,
    sold_at: Option<RawTimestamp>,
}

#[derive(Debug, Deserialize)]
struct RawPrice {
    amount: Option<RawAmount>,
    #[serde(alias = "currency_code")]
    currency: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawAmount {
    Text(String),
    Number(serde_json::Number),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Unix(i64),
    Text(String),
}

impl RawTimestamp {
    fn to_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            RawTimestamp::Unix(secs) => parse_unix_timestamp(*secs),
            RawTimestamp::Text(s) => parse_datetime(s),
        }
    }
}

/// Largest accepted item price. Anything above is treated as a malformed amount.
pub const MAX_ITEM_PRICE: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);

pub struct VintedParser;

impl VintedParser {
    pub fn new() -> Self {
        Self
    }

    fn item_from_raw(
        raw: RawItem,
        position: usize,
        page: u32,
        fetched_at: DateTime<Utc>,
    ) -> Result<SoldItem, AnalysisError> {
        let context = format!("page {page}, item #{position}");

        let title = raw
            .title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AnalysisError::parsing(&context, "missing required field `title`"))?;

        let raw_price = raw
            .price
            .ok_or_else(|| AnalysisError::parsing(&context, "missing required field `price`"))?;
        let amount = match raw_price.amount {
            Some(RawAmount::Text(s)) => parse_decimal(&s),
            Some(RawAmount::Number(n)) => parse_decimal(&n.to_string()),
            None => {
                return Err(AnalysisError::parsing(
                    &context,
                    "missing required field `price.amount`",
                ));
            }
        }
        .filter(|a| *a >= Decimal::ZERO)
        .ok_or_else(|| AnalysisError::parsing(&context, "`price.amount` is not a valid price"))?;
        if amount > MAX_ITEM_PRICE {
            return Err(AnalysisError::parsing(
                &context,
                format!("`price.amount` {amount} exceeds {MAX_ITEM_PRICE}"),
            ));
        }

        let brand = match (raw.brand, raw.brand_id, raw.brand_title) {
            (Some(RawBrand { id: Some(id), name: Some(name) }), _, _) => Some(Brand { id, name }),
            (_, Some(id), Some(name)) if !name.trim().is_empty() => Some(Brand { id, name }),
            _ => None,
        };

        Ok(SoldItem {
            title,
            price: Price {
                amount,
                currency: raw_price
                    .currency
                    .filter(|c| !c.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
            },
            brand,
            size: raw.size_title.filter(|s| !s.trim().is_empty()),
            // listings without a creation stamp are dated at fetch time
            created_at: raw
                .created_at
                .as_ref()
                .and_then(RawTimestamp::to_datetime)
                .unwrap_or(fetched_at),
            sold_at: raw.sold_at.as_ref().and_then(RawTimestamp::to_datetime),
        })
    }
}

impl Parser for VintedParser {
    fn parse_brands(&self, body: &str) -> Result<Vec<Brand>, AnalysisError> {
        let envelope: BrandsEnvelope = serde_json::from_str(body)
            .map_err(|e| AnalysisError::parsing("brand suggestions", e.to_string()))?;
        let raw = envelope
            .brands
            .ok_or_else(|| AnalysisError::parsing("brand suggestions", "missing `brands` list"))?;

        raw.into_iter()
            .enumerate()
            .map(|(i, b)| match (b.id, b.name) {
                (Some(id), Some(name)) if !name.trim().is_empty() => Ok(Brand {
                    id,
                    name: name.trim().to_string(),
                }),
                (None, _) => Err(AnalysisError::parsing(
                    format!("brand entry #{i}"),
                    "missing `id`",
                )),
                _ => Err(AnalysisError::parsing(
                    format!("brand entry #{i}"),
                    "missing `name`",
                )),
            })
            .collect()
    }

    /// Rejects the whole page if any item lacks a required field.
    fn parse_sold_items(&self, body: &str, page: u32) -> Result<Vec<SoldItem>, AnalysisError> {
        let envelope: ItemsEnvelope = serde_json::from_str(body)
            .map_err(|e| AnalysisError::parsing(format!("page {page}"), e.to_string()))?;
        let raw = envelope
            .items
            .ok_or_else(|| AnalysisError::parsing(format!("page {page}"), "missing `items` list"))?;

        let fetched_at = Utc::now();
        raw.into_iter()
            .enumerate()
            .map(|(i, item)| Self::item_from_raw(item, i, page, fetched_at))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn parses_brand_entries_with_title_alias() {
        let brands = VintedParser::new()
            .parse_brands(r#"{"brands": [{"id": 53, "title": "Nike"}, {"id": 14, "name": "Adidas"}]}"#)
            .unwrap();
        assert_eq!(brands[0], Brand { id: 53, name: "Nike".into() });
        assert_eq!(brands[1].name, "Adidas");
    }

    #[test]
    fn malformed_brand_entry_is_rejected() {
        let parser = VintedParser::new();
        let err = parser
            .parse_brands(r#"{"brands": [{"id": 53, "title": "Nike"}, {"title": "Puma"}]}"#)
            .unwrap_err();
        assert!(matches!(err, AnalysisError::Parsing { ref reason, .. } if reason.contains("id")));

        let err = parser.parse_brands(r#"{"brands": [{"id": 1}]}"#).unwrap_err();
        assert!(matches!(err, AnalysisError::Parsing { ref reason, .. } if reason.contains("name")));

        assert!(parser.parse_brands(r#"{"other": []}"#).is_err());
        assert!(parser.parse_brands("not json").is_err());
    }

    #[test]
    fn parses_sold_item_fields() {
        let body = r#"{"items": [
            {"title": "Air Max 90", "price": {"amount": "45.00", "currency_code": "EUR"},
             "brand": {"id": 53, "title": "Nike"}, "size_title": "42",
             "created_at": "2024-05-01T12:00:00Z", "sold_at": 1714600000},
            {"title": "Samba", "price": {"amount": 55}, "brand_id": 14, "brand_title": "Adidas"}
        ]}"#;
        let items = VintedParser::new().parse_sold_items(body, 1).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].price.amount, dec!(45.00));
        assert_eq!(items[0].brand.as_ref().map(|b| b.id), Some(53));
        assert_eq!(items[0].size.as_deref(), Some("42"));
        assert!(items[0].sold_at.is_some());
        assert_eq!(items[1].price.amount, dec!(55));
        assert_eq!(items[1].price.currency, DEFAULT_CURRENCY);
        assert_eq!(items[1].brand.as_ref().map(|b| b.name.as_str()), Some("Adidas"));
        assert!(items[1].sold_at.is_none());
    }

    #[test]
    fn one_bad_item_rejects_the_page() {
        let body = r#"{"items": [
            {"title": "ok", "price": {"amount": "10"}},
            {"title": "no price"}
        ]}"#;
        let err = VintedParser::new().parse_sold_items(body, 3).unwrap_err();
        match err {
            AnalysisError::Parsing { context, reason } => {
                assert_eq!(context, "page 3, item #1");
                assert!(reason.contains("price"));
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let blank_title = r#"{"items": [{"title": "  ", "price": {"amount": "10"}}]}"#;
        assert!(VintedParser::new().parse_sold_items(blank_title, 1).is_err());

        let negative = r#"{"items": [{"title": "x", "price": {"amount": "-1"}}]}"#;
        assert!(VintedParser::new().parse_sold_items(negative, 1).is_err());
    }

    #[test]
    fn absurd_price_rejects_the_page() {
        let body = r#"{"items": [
            {"title": "ok", "price": {"amount": "12.50"}},
            {"title": "huge", "price": {"amount": "79228162514264337593543950335"}}
        ]}"#;
        let err = VintedParser::new().parse_sold_items(body, 4).unwrap_err();
        assert!(matches!(err, AnalysisError::Parsing { ref context, .. } if context == "page 4, item #1"));

        let at_cap = r#"{"items": [{"title": "pricey", "price": {"amount": "1000000000"}}]}"#;
        let items = VintedParser::new().parse_sold_items(at_cap, 1).unwrap();
        assert_eq!(items[0].price.amount, MAX_ITEM_PRICE);
    }

    #[test]
    fn empty_page_is_fine() {
        let items = VintedParser::new().parse_sold_items(r#"{"items": []}"#, 7).unwrap();
        assert!(items.is_empty());
    }
}
