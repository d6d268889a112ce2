use crate::model::SoldItem;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// Share of the average price suggested as a competitive listing price.
const RECOMMENDED_PRICE_FACTOR: Decimal = Decimal::from_parts(95, 0, 0, false, 2);

pub struct MarketAnalyzer;

impl MarketAnalyzer {
    /// Median of the given prices; zero for an empty slice.
    pub fn median(prices: &[Decimal]) -> Decimal {
        if prices.is_empty() {
            return Decimal::ZERO;
        }
        let mut sorted = prices.to_vec();
        sorted.sort();
        let mid = sorted.len() / 2;
        if sorted.len() % 2 == 0 {
            let (lo, hi) = (sorted[mid - 1], sorted[mid]);
            match lo.checked_add(hi) {
                Some(sum) => sum / Decimal::TWO,
                // sum does not fit; the midpoint still does
                None => lo + (hi - lo) / Decimal::TWO,
            }
        } else {
            sorted[mid]
        }
    }

    /// 95% of the average, rounded to cents.
    pub fn recommended_price(avg_price: Decimal) -> Decimal {
        if avg_price <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        (avg_price * RECOMMENDED_PRICE_FACTOR).round_dp(2)
    }

    /// Count of sold items per size label. Items without a size are left out.
    pub fn size_distribution(items: &[SoldItem]) -> BTreeMap<String, usize> {
        let mut map = BTreeMap::new();
        for size in items.iter().filter_map(|i| i.size.as_ref()) {
            *map.entry(size.clone()).or_insert(0) += 1;
        }
        map
    }

    /// Percentage change of `current_avg` against the oldest of `history`
    /// (newest first). Zero when there is no usable baseline.
    pub fn price_trend_percent(current_avg: Decimal, history: &[Decimal]) -> Decimal {
        match history.last() {
            Some(oldest) if history.len() > 1 && *oldest > Decimal::ZERO => {
                ((current_avg - oldest) / oldest * Decimal::ONE_HUNDRED).round_dp(2)
            }
            _ => Decimal::ZERO,
        }
    }
}
