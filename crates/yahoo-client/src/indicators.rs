use screener_core::floor::TRADING_DAYS_PER_YEAR;
use screener_core::{MaWindow, WindowSeries};
use statrs::statistics::Statistics;

/// Simple moving average over the trailing `period` values.
pub fn latest_sma(data: &[f64], period: usize) -> Option<f64> {
    if period == 0 || data.len() < period {
        return None;
    }
    let window = &data[data.len() - period..];
    Some(window.iter().sum::<f64>() / period as f64)
}

/// Daily log returns of consecutive closes. Non-positive closes break the
/// series and are skipped together with their neighbours.
pub fn log_returns(closes: &[f64]) -> Vec<f64> {
    closes
        .windows(2)
        .filter(|w| w[0] > 0.0 && w[1] > 0.0)
        .map(|w| (w[1] / w[0]).ln())
        .collect()
}

/// Annualized historical volatility, in percent, from the trailing `period`
/// daily log returns (sample standard deviation × sqrt(252)).
pub fn latest_historical_volatility(closes: &[f64], period: usize) -> Option<f64> {
    if period < 2 {
        return None;
    }
    let returns = log_returns(closes);
    if returns.len() < period {
        return None;
    }
    let window = &returns[returns.len() - period..];
    let sd = window.iter().std_dev();
    if !sd.is_finite() {
        return None;
    }
    Some(sd * TRADING_DAYS_PER_YEAR.sqrt() * 100.0)
}

/// Moving averages and historical volatility for every standard window.
pub fn window_figures(closes: &[f64]) -> (WindowSeries, WindowSeries) {
    let mut moving_averages = WindowSeries::default();
    let mut volatility = WindowSeries::default();

    for window in MaWindow::ALL {
        let days = window.days() as usize;
        if let Some(ma) = latest_sma(closes, days) {
            moving_averages.set(window, ma);
        }
        if let Some(hv) = latest_historical_volatility(closes, days) {
            volatility.set(window, hv);
        }
    }

    (moving_averages, volatility)
}
