use super::moving_average::rolling_mean;
use crate::models::Candle;

/// Stochastic oscillator %K and %D
///
/// %K = 100 * (close - lowest low) / (highest high - lowest low) over `k_period`
/// bars, %D = mean of %K over `d_period` bars. A window with no range leaves
/// %K undefined.
pub fn calculate_stochastic(
    candles: &[Candle],
    k_period: usize,
    d_period: usize,
) -> (Vec<Option<f64>>, Vec<Option<f64>>) {
    let mut k = vec![None; candles.len()];

    if k_period > 0 && candles.len() >= k_period {
        for i in (k_period - 1)..candles.len() {
            let window = &candles[i + 1 - k_period..=i];
            let lowest = window.iter().map(|c| c.low).fold(f64::INFINITY, f64::min);
            let highest = window.iter().map(|c| c.high).fold(f64::NEG_INFINITY, f64::max);
            let range = highest - lowest;
            if range > 0.0 {
                k[i] = Some(100.0 * (candles[i].close - lowest) / range);
            }
        }
    }

    let d = rolling_mean(&k, d_period);
    (k, d)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn candles(hlc: &[(f64, f64, f64)]) -> Vec<Candle> {
        let start = Utc::now();
        hlc.iter()
            .enumerate()
            .map(|(i, &(high, low, close))| Candle {
                timestamp: start + Duration::hours(i as i64),
                open: close,
                high,
                low,
                close,
                volume: 1.0,
            })
            .collect()
    }

    #[test]
    fn test_stochastic_bounds() {
        let data = candles(&[
            (10.0, 8.0, 9.0),
            (11.0, 9.0, 10.0),
            (12.0, 10.0, 12.0),
            (12.0, 9.0, 9.0),
        ]);
        let (k, d) = calculate_stochastic(&data, 3, 2);
        assert!(k[1].is_none());
        // Window 0..=2: low 8, high 12, close 12 => 100
        assert_eq!(k[2], Some(100.0));
        // Window 1..=3: low 9, high 12, close 9 => 0
        assert_eq!(k[3], Some(0.0));
        assert_eq!(d[3], Some(50.0));
    }

    #[test]
    fn test_stochastic_flat_window_undefined() {
        let data = candles(&[(10.0, 10.0, 10.0); 5]);
        let (k, d) = calculate_stochastic(&data, 3, 2);
        assert!(k.iter().all(Option::is_none));
        assert!(d.iter().all(Option::is_none));
    }
}
