/// Average True Range (ATR) indicator
///
/// Measures market volatility by averaging true ranges over a period.
/// True Range is the greatest of:
/// - Current High - Current Low
/// - Abs(Current High - Previous Close)
/// - Abs(Current Low - Previous Close)
///
/// Uses a plain rolling mean of the last `period` true ranges.
use crate::models::Candle;

/// True range per bar; the first bar has no previous close and no true range
pub fn true_ranges(candles: &[Candle]) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(candles.len());
    if candles.is_empty() {
        return out;
    }
    out.push(None);

    for i in 1..candles.len() {
        let high = candles[i].high;
        let low = candles[i].low;
        let prev_close = candles[i - 1].close;

        let tr = (high - low)
            .max((high - prev_close).abs())
            .max((low - prev_close).abs());

        out.push(Some(tr));
    }
    out
}

/// Calculate ATR for every bar, `None` until `period` true ranges exist
pub fn calculate_atr(candles: &[Candle], period: usize) -> Vec<Option<f64>> {
    super::moving_average::rolling_mean(&true_ranges(candles), period)
}
