//! Parsing of the options API response (`data.Put[]`).

use chrono::NaiveDate;
use screener_core::{sort_by_strike, OptionQuote};
use serde_json::Value;

use crate::technicals::parse_number;

/// Fields requested from the options endpoint.
pub const OPTION_FIELDS: &str = "symbol,baseSymbol,strikePrice,expirationDate,moneyness,bidPrice,midpoint,askPrice,lastPrice,priceChange,percentChange,volume,openInterest,openInterestChange,volatility,delta,optionType,daysToExpiration,tradeTime,averageVolatility,historicVolatility30d,baseNextEarningsDate,dividendExDate,baseTimeCode,expirationType,impliedVolatilityRank1y,symbolCode,symbolType";

/// Put quotes in ascending strike order. Rows without a parseable strike are dropped.
pub fn parse_put_chain(body: &Value, fallback_symbol: &str, expiration: NaiveDate) -> Vec<OptionQuote> {
    let Some(puts) = body
        .get("data")
        .and_then(|d| d.get("Put"))
        .and_then(Value::as_array)
    else {
        return Vec::new();
    };

    let mut quotes: Vec<OptionQuote> = puts
        .iter()
        .filter_map(|item| parse_put(item, fallback_symbol, expiration))
        .collect();
    sort_by_strike(&mut quotes);
    quotes
}

fn parse_put(item: &Value, fallback_symbol: &str, expiration: NaiveDate) -> Option<OptionQuote> {
    // With `raw=1` every row carries a `raw` object of unformatted values next
    // to the display strings. Prefer it, fall back to the formatted field.
    let raw = item.get("raw");
    let field = |name: &str| -> Option<f64> {
        raw.and_then(|r| r.get(name))
            .and_then(number)
            .or_else(|| item.get(name).and_then(number))
    };

    let strike_price = field("strikePrice")?;
    let base_symbol = item
        .get("baseSymbol")
        .and_then(Value::as_str)
        .unwrap_or(fallback_symbol)
        .to_string();

    Some(OptionQuote {
        base_symbol,
        strike_price,
        expiration_date: expiration,
        bid_price: field("bidPrice"),
        ask_price: field("askPrice"),
        delta: field("delta"),
        implied_volatility: field("volatility"),
    })
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_number(s),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn expiration() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 7, 18).unwrap()
    }

    #[test]
    fn test_parse_formatted_rows() {
        let body = json!({
            "count": 3,
            "data": {
                "Call": [{"baseSymbol": "XYZ", "strikePrice": "50.00", "bidPrice": "9.00"}],
                "Put": [
                    {"baseSymbol": "XYZ", "strikePrice": "100.00", "bidPrice": "2.00", "askPrice": "2.40", "delta": "-0.3012", "volatility": "33.10%"},
                    {"baseSymbol": "XYZ", "strikePrice": "95.00", "bidPrice": "1.00", "askPrice": "1.20", "delta": "-0.1520", "volatility": "35.02%"},
                    {"baseSymbol": "XYZ", "strikePrice": "N/A", "bidPrice": "0.10"}
                ]
            }
        });

        let quotes = parse_put_chain(&body, "XYZ", expiration());
        assert_eq!(quotes.len(), 2);
        assert_eq!(quotes[0].strike_price, 95.0);
        assert_eq!(quotes[0].bid_price, Some(1.0));
        assert_eq!(quotes[0].ask_price, Some(1.2));
        assert_eq!(quotes[0].delta, Some(-0.152));
        assert_eq!(quotes[0].implied_volatility, Some(35.02));
        assert_eq!(quotes[1].strike_price, 100.0);
        assert_eq!(quotes[1].expiration_date, expiration());
    }

    #[test]
    fn test_parse_prefers_raw_values() {
        let body = json!({
            "data": {
                "Put": [{
                    "strikePrice": "1,000.00",
                    "bidPrice": "12.50",
                    "askPrice": "N/A",
                    "raw": {"strikePrice": 1000, "bidPrice": 12.5, "askPrice": 13.1, "delta": -0.11}
                }]
            }
        });

        let quotes = parse_put_chain(&body, "BIG", expiration());
        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes[0].base_symbol, "BIG");
        assert_eq!(quotes[0].strike_price, 1000.0);
        assert_eq!(quotes[0].ask_price, Some(13.1));
        assert_eq!(quotes[0].delta, Some(-0.11));
        assert_eq!(quotes[0].implied_volatility, None);
    }

    #[test]
    fn test_parse_missing_put_side() {
        assert!(parse_put_chain(&json!({"data": {"Call": []}}), "XYZ", expiration()).is_empty());
        assert!(parse_put_chain(&json!({"error": "unauthorized"}), "XYZ", expiration()).is_empty());
    }
}
