use super::moving_average::{rolling_std, sma_series};

/// Divisor guard for zero-width bands
pub const BAND_EPSILON: f64 = 1e-8;

/// Bollinger band values for one bar
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BollingerBand {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
    /// (upper - lower) / middle
    pub width: f64,
    /// (close - lower) / (upper - lower), guarded against zero width
    pub position: f64,
}

/// Bollinger bands: SMA +/- `std_dev` sample standard deviations
pub fn calculate_bollinger(
    closes: &[f64],
    period: usize,
    std_dev: f64,
) -> Vec<Option<BollingerBand>> {
    let middle = sma_series(closes, period);
    let deviation = rolling_std(closes, period);

    closes
        .iter()
        .zip(middle.iter().zip(deviation.iter()))
        .map(|(&close, (mid, dev))| {
            let (middle, dev) = ((*mid)?, (*dev)?);
            let upper = middle + std_dev * dev;
            let lower = middle - std_dev * dev;
            let width = if middle.abs() > BAND_EPSILON {
                (upper - lower) / middle
            } else {
                0.0
            };
            let position = (close - lower) / (upper - lower + BAND_EPSILON);
            Some(BollingerBand {
                upper,
                middle,
                lower,
                width,
                position,
            })
        })
        .collect()
}
