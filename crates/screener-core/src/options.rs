use std::collections::HashSet;

use crate::OptionQuote;

/// A target price paired with the quote whose strike is closest to it.
#[derive(Debug, Clone, PartialEq)]
pub struct StrikeMatch {
    pub target: f64,
    pub quote: OptionQuote,
}

/// Sort quotes by ascending strike. Stable, so equal strikes keep source order.
pub fn sort_by_strike(quotes: &mut [OptionQuote]) {
    quotes.sort_by(|a, b| a.strike_price.total_cmp(&b.strike_price));
}

/// Quote minimizing `|strike − target|`. Ties go to the earliest quote, which
/// for an ascending chain is the lower strike.
pub fn nearest_strike(quotes: &[OptionQuote], target: f64) -> Option<&OptionQuote> {
    if !target.is_finite() {
        return None;
    }

    let mut best: Option<(&OptionQuote, f64)> = None;
    for quote in quotes {
        let distance = (quote.strike_price - target).abs();
        match best {
            Some((_, best_distance)) if distance >= best_distance => {}
            _ => best = Some((quote, distance)),
        }
    }
    best.map(|(quote, _)| quote)
}

/// Match every distinct target against one fetched chain.
///
/// Targets equal to the cent are collapsed, keeping first-seen order. Several
/// targets may resolve to the same quote; each still gets its own match.
pub fn match_targets(quotes: &[OptionQuote], targets: &[f64]) -> Vec<StrikeMatch> {
    let mut seen = HashSet::new();
    targets
        .iter()
        .copied()
        .filter(|t| t.is_finite() && seen.insert(cents_key(*t)))
        .filter_map(|target| {
            nearest_strike(quotes, target).map(|quote| StrikeMatch {
                target,
                quote: quote.clone(),
            })
        })
        .collect()
}

/// Find the match for `target` among results produced by [`match_targets`].
pub fn find_match(matches: &[StrikeMatch], target: f64) -> Option<&StrikeMatch> {
    let key = cents_key(target);
    matches.iter().find(|m| cents_key(m.target) == key)
}

fn cents_key(price: f64) -> i64 {
    (price * 100.0).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn quote(strike: f64) -> OptionQuote {
        OptionQuote {
            base_symbol: "XYZ".to_string(),
            strike_price: strike,
            expiration_date: NaiveDate::from_ymd_opt(2025, 7, 18).unwrap(),
            bid_price: Some(1.0),
            ask_price: Some(1.1),
            delta: Some(-0.2),
            implied_volatility: Some(30.0),
        }
    }

    fn chain() -> Vec<OptionQuote> {
        vec![quote(90.0), quote(95.0), quote(100.0), quote(105.0)]
    }

    #[test]
    fn test_nearest_strike_basic() {
        let quotes = chain();
        assert_eq!(nearest_strike(&quotes, 97.0).unwrap().strike_price, 95.0);
        assert_eq!(nearest_strike(&quotes, 98.0).unwrap().strike_price, 100.0);
        assert_eq!(nearest_strike(&quotes, 10.0).unwrap().strike_price, 90.0);
        assert_eq!(nearest_strike(&quotes, 500.0).unwrap().strike_price, 105.0);
    }

    #[test]
    fn test_nearest_strike_tie_prefers_first() {
        let quotes = chain();
        assert_eq!(nearest_strike(&quotes, 97.5).unwrap().strike_price, 95.0);
    }

    #[test]
    fn test_nearest_strike_empty_or_nan() {
        assert!(nearest_strike(&[], 97.0).is_none());
        assert!(nearest_strike(&chain(), f64::NAN).is_none());
    }

    #[test]
    fn test_sort_by_strike() {
        let mut quotes = vec![quote(105.0), quote(90.0), quote(100.0)];
        sort_by_strike(&mut quotes);
        let strikes: Vec<f64> = quotes.iter().map(|q| q.strike_price).collect();
        assert_eq!(strikes, vec![90.0, 100.0, 105.0]);
    }

    #[test]
    fn test_match_targets_one_per_distinct_target() {
        let quotes = chain();
        let matches = match_targets(&quotes, &[96.0, 97.0, 96.0, 104.0]);

        assert_eq!(matches.len(), 3);
        // 96 and 97 both land on the 95 strike but stay separate results
        assert_eq!(matches[0].quote.strike_price, 95.0);
        assert_eq!(matches[1].quote.strike_price, 95.0);
        assert_eq!(matches[2].quote.strike_price, 105.0);

        assert_eq!(find_match(&matches, 97.0).unwrap().quote.strike_price, 95.0);
        assert!(find_match(&matches, 50.0).is_none());
    }

    #[test]
    fn test_match_targets_empty_chain() {
        assert!(match_targets(&[], &[96.0]).is_empty());
    }
}
