use screener_core::{FloorVariant, ScreenerError, ScreeningResult};
use serde::Serialize;
use std::cmp::Ordering;
use std::io::Write;
use std::path::Path;

/// One line of the result table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    #[serde(rename = "Symbol")]
    pub symbol: String,
    #[serde(rename = "Current Price")]
    pub current_price: Option<f64>,
    #[serde(rename = "Floor Tag")]
    pub floor_tag: String,
    #[serde(rename = "Floor Value")]
    pub floor_value: f64,
    #[serde(rename = "strikePrice")]
    pub strike_price: f64,
    #[serde(rename = "bidPrice")]
    pub bid_price: Option<f64>,
    #[serde(rename = "askPrice")]
    pub ask_price: Option<f64>,
    pub delta: Option<f64>,
    pub volatility: Option<f64>,
    #[serde(rename = "Profitability")]
    pub profitability: f64,
    #[serde(skip)]
    variant: FloorVariant,
}

impl From<&ScreeningResult> for ReportRow {
    fn from(result: &ScreeningResult) -> Self {
        Self {
            symbol: result.candidate.symbol.to_string(),
            current_price: result.current_price(),
            floor_tag: result.floor.variant.tag(),
            floor_value: result.floor.floor_price,
            strike_price: result.quote.strike_price,
            bid_price: result.quote.bid_price,
            ask_price: result.quote.ask_price,
            delta: result.quote.delta,
            volatility: result.quote.implied_volatility,
            profitability: result.profitability,
            variant: result.floor.variant,
        }
    }
}

impl ReportRow {
    pub fn variant(&self) -> FloorVariant {
        self.variant
    }
}

/// Build the report table ordered by floor tag, then profitability descending.
///
/// Tags compare by (window, sigma) numerically so `MA20` sorts before `MA100`.
pub fn build_report(results: &[ScreeningResult]) -> Vec<ReportRow> {
    let mut rows: Vec<ReportRow> = results.iter().map(ReportRow::from).collect();
    rows.sort_by(|a, b| {
        a.variant
            .cmp(&b.variant)
            .then_with(|| b.profitability.partial_cmp(&a.profitability).unwrap_or(Ordering::Equal))
    });
    rows
}

pub fn write_report<W: Write>(writer: W, rows: &[ReportRow]) -> Result<(), ScreenerError> {
    let mut wtr = csv::Writer::from_writer(writer);
    for row in rows {
        wtr.serialize(row).map_err(std::io::Error::other)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_csv(path: &Path, rows: &[ReportRow]) -> Result<(), ScreenerError> {
    let file = std::fs::File::create(path)?;
    write_report(file, rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{candidate, put, xyz_snapshot};
    use screener_core::{FloorEstimate, MaWindow};

    fn result(symbol: &str, variant: FloorVariant, strike: f64, bid: f64, ask: f64) -> ScreeningResult {
        let quote = put(strike, bid, ask);
        ScreeningResult {
            candidate: candidate(symbol),
            technicals: Some(xyz_snapshot()),
            floor: FloorEstimate {
                symbol: candidate(symbol).symbol,
                variant,
                moving_average: 100.0,
                historical_volatility: 31.75,
                floor_price: strike + 0.5,
            },
            profitability: quote.profitability().unwrap(),
            quote,
        }
    }

    #[test]
    fn test_report_ordering() {
        let ma20_2 = FloorVariant::new(MaWindow::Day20, 2.0);
        let ma20_1 = FloorVariant::new(MaWindow::Day20, 1.0);
        let ma100_1 = FloorVariant::new(MaWindow::Day100, 1.0);
        let results = vec![
            result("LOW", ma20_2, 95.0, 1.0, 1.2),
            result("WIDE", ma100_1, 90.0, 3.0, 3.2),
            result("HIGH", ma20_2, 95.0, 2.0, 2.2),
            result("ONE", ma20_1, 98.0, 1.5, 1.6),
        ];

        let rows = build_report(&results);
        let order: Vec<(&str, &str)> = rows.iter().map(|r| (r.floor_tag.as_str(), r.symbol.as_str())).collect();
        assert_eq!(
            order,
            vec![
                ("MA20-1SD", "ONE"),
                ("MA20-2SD", "HIGH"),
                ("MA20-2SD", "LOW"),
                ("MA100-1SD", "WIDE"),
            ]
        );
        assert_eq!(rows[0].current_price, Some(120.0));
    }

    #[test]
    fn test_write_report_columns() {
        let rows = build_report(&[result("XYZ", FloorVariant::new(MaWindow::Day20, 2.0), 95.0, 1.0, 1.2)]);
        let mut buf = Vec::new();
        write_report(&mut buf, &rows).unwrap();

        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "Symbol,Current Price,Floor Tag,Floor Value,strikePrice,bidPrice,askPrice,delta,volatility,Profitability"
        );
        assert!(lines.next().unwrap().starts_with("XYZ,120.0,MA20-2SD,95.5,95.0,1.0,1.2,-0.12,30.0,0.0115"));
    }

    #[test]
    fn test_write_csv_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stocks_data.csv");
        write_csv(&path, &[]).unwrap();
        assert!(path.exists());
    }
}
