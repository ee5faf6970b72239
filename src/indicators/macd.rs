use super::moving_average::{ema_of_defined, ema_series};

/// MACD line, signal line and histogram for one bar
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Macd {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
}

/// Moving Average Convergence Divergence
///
/// Returns the MACD line for every bar where the slow EMA is defined, and the
/// full triple once the signal EMA is also defined.
pub fn calculate_macd(
    closes: &[f64],
    fast: usize,
    slow: usize,
    signal: usize,
) -> (Vec<Option<f64>>, Vec<Option<Macd>>) {
    let fast_ema = ema_series(closes, fast);
    let slow_ema = ema_series(closes, slow);

    let line: Vec<Option<f64>> = fast_ema
        .iter()
        .zip(slow_ema.iter())
        .map(|(f, s)| Some((*f)? - (*s)?))
        .collect();
    let signal_line = ema_of_defined(&line, signal);

    let full = line
        .iter()
        .zip(signal_line.iter())
        .map(|(m, s)| {
            let (macd, signal) = ((*m)?, (*s)?);
            Some(Macd {
                macd,
                signal,
                histogram: macd - signal,
            })
        })
        .collect();

    (line, full)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_macd_warmup() {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + i as f64).collect();
        let (line, full) = calculate_macd(&closes, 12, 26, 9);
        assert!(line[24].is_none());
        assert!(line[25].is_some());
        assert!(full[32].is_none());
        assert!(full[33].is_some());
    }

    #[test]
    fn test_macd_positive_in_uptrend() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 * 1.01f64.powi(i)).collect();
        let (_, full) = calculate_macd(&closes, 12, 26, 9);
        let last = full[59].unwrap();
        assert!(last.macd > 0.0);
        assert!((last.histogram - (last.macd - last.signal)).abs() < 1e-12);
    }
}
