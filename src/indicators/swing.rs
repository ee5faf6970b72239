//! Swing-point detection
//!
//! A bar is a swing high (+1) when its high exceeds every high in the `range`
//! bars on both sides, and a swing low (-1) when its low undercuts every low in
//! that symmetric window. Bars without a full window on both sides are 0.

use crate::models::Candle;

/// Extra requirements for the stricter swing detector
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwingConfirmation {
    /// Minimum separation from the neighbouring extremes, in ATRs
    pub atr_multiplier: f64,
    /// Bars after the swing in which a close must break the opposite side of its range
    pub confirmation_window: usize,
}

struct Neighbours {
    max_high: f64,
    min_low: f64,
    is_high: bool,
    is_low: bool,
}

fn neighbours(candles: &[Candle], i: usize, range: usize) -> Neighbours {
    let before = &candles[i - range..i];
    let after = &candles[i + 1..=i + range];

    let max_high = |w: &[Candle]| w.iter().map(|c| c.high).fold(f64::NEG_INFINITY, f64::max);
    let min_low = |w: &[Candle]| w.iter().map(|c| c.low).fold(f64::INFINITY, f64::min);

    let (prev_high, next_high) = (max_high(before), max_high(after));
    let (prev_low, next_low) = (min_low(before), min_low(after));
    let bar = &candles[i];

    Neighbours {
        max_high: prev_high.max(next_high),
        min_low: prev_low.min(next_low),
        is_high: bar.high > prev_high && bar.high > next_high,
        is_low: bar.low < prev_low && bar.low < next_low,
    }
}

fn eligible(len: usize, range: usize) -> std::ops::Range<usize> {
    if range == 0 || len <= 2 * range {
        return 0..0;
    }
    range..len - range
}

/// Detect swing highs (+1) and swing lows (-1)
///
/// When a bar qualifies as both, the swing high wins.
pub fn detect_swings(candles: &[Candle], range: usize) -> Vec<i8> {
    let mut swings = vec![0; candles.len()];

    for i in eligible(candles.len(), range) {
        let n = neighbours(candles, i, range);
        if n.is_high {
            swings[i] = 1;
        } else if n.is_low {
            swings[i] = -1;
        }
    }

    swings
}

/// Detect swings that clear their neighbours by `atr_multiplier x ATR` and are
/// retraced within the confirmation window
///
/// Bars without a defined ATR never qualify.
pub fn detect_confirmed_swings(
    candles: &[Candle],
    atr: &[Option<f64>],
    range: usize,
    confirmation: SwingConfirmation,
) -> Vec<i8> {
    let mut swings = vec![0; candles.len()];

    for i in eligible(candles.len(), range) {
        let atr_value = match atr.get(i).copied().flatten() {
            Some(value) => value,
            None => continue,
        };
        let min_separation = confirmation.atr_multiplier * atr_value;
        let n = neighbours(candles, i, range);
        let bar = &candles[i];

        let window_end = (i + confirmation.confirmation_window).min(candles.len() - 1);
        let following = &candles[i + 1..=window_end];

        let high_confirmed = n.is_high
            && bar.high - n.max_high >= min_separation
            && following.iter().any(|c| c.close < bar.low);
        let low_confirmed = n.is_low
            && n.min_low - bar.low >= min_separation
            && following.iter().any(|c| c.close > bar.high);

        if high_confirmed {
            swings[i] = 1;
        } else if low_confirmed {
            swings[i] = -1;
        }
    }

    swings
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    /// Candles with high = price + 1, low = price - 1, close = price
    fn candles(prices: &[f64]) -> Vec<Candle> {
        let start = Utc::now();
        prices
            .iter()
            .enumerate()
            .map(|(i, &p)| Candle {
                timestamp: start + Duration::hours(i as i64),
                open: p,
                high: p + 1.0,
                low: p - 1.0,
                close: p,
                volume: 1.0,
            })
            .collect()
    }

    #[test]
    fn test_detects_peak_and_trough() {
        let data = candles(&[10.0, 11.0, 12.0, 15.0, 12.0, 11.0, 10.0, 7.0, 10.0, 11.0, 12.0]);
        let swings = detect_swings(&data, 3);
        assert_eq!(swings[3], 1);
        assert_eq!(swings[7], -1);
        assert_eq!(swings.iter().filter(|&&s| s != 0).count(), 2);
    }

    #[test]
    fn test_edges_are_never_swings() {
        let data = candles(&[20.0, 10.0, 10.0, 10.0, 10.0, 10.0, 5.0]);
        let swings = detect_swings(&data, 3);
        assert_eq!(swings[0], 0);
        assert_eq!(swings[6], 0);
    }

    #[test]
    fn test_short_series_has_no_swings() {
        let data = candles(&[1.0, 5.0, 1.0]);
        assert_eq!(detect_swings(&data, 3), vec![0, 0, 0]);
    }

    #[test]
    fn test_equal_highs_are_not_swings() {
        let data = candles(&[10.0, 11.0, 12.0, 15.0, 15.0, 11.0, 10.0, 9.0]);
        let swings = detect_swings(&data, 3);
        assert_eq!(swings[3], 0);
        assert_eq!(swings[4], 0);
    }

    #[test]
    fn test_confirmed_swing_requires_retrace() {
        // Peak at 3, then closes fall below the peak bar's low (14)
        let data = candles(&[10.0, 11.0, 12.0, 15.0, 13.0, 12.0, 11.0, 10.0]);
        let atr = vec![Some(1.0); data.len()];
        let confirmation = SwingConfirmation {
            atr_multiplier: 1.0,
            confirmation_window: 3,
        };
        let swings = detect_confirmed_swings(&data, &atr, 3, confirmation);
        assert_eq!(swings[3], 1);

        // Same peak, but price never closes below 14 inside the window
        let data = candles(&[10.0, 11.0, 12.0, 15.0, 14.5, 14.2, 14.1, 10.0]);
        let confirmation = SwingConfirmation {
            atr_multiplier: 0.5,
            confirmation_window: 3,
        };
        let swings = detect_confirmed_swings(&data, &atr, 3, confirmation);
        assert_eq!(swings[3], 0);
    }

    #[test]
    fn test_confirmed_swing_requires_atr_separation() {
        let data = candles(&[10.0, 11.0, 12.0, 15.0, 13.0, 12.0, 11.0, 10.0]);
        // Peak high 16 vs neighbour max 14 => separation 2
        let atr = vec![Some(1.0); data.len()];
        let strict = SwingConfirmation {
            atr_multiplier: 3.0,
            confirmation_window: 3,
        };
        assert_eq!(detect_confirmed_swings(&data, &atr, 3, strict)[3], 0);

        let undefined = vec![None; data.len()];
        let loose = SwingConfirmation {
            atr_multiplier: 0.0,
            confirmation_window: 3,
        };
        assert_eq!(detect_confirmed_swings(&data, &undefined, 3, loose)[3], 0);
    }
}
