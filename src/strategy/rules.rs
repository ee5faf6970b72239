use crate::config::{RuleSettings, Settings};
use crate::indicators::FeatureRow;
use crate::models::{Decision, Signal};
use crate::strategy::SignalClassifier;

/// Threshold rules over oscillators and trend-channel touches
///
/// BUY requires an oversold reading on all three oscillators at a support
/// bounce. SELL fires on an overbought reading with rising volume, or on any
/// resistance rejection.
#[derive(Debug, Clone)]
pub struct RuleClassifier {
    rules: RuleSettings,
}

impl RuleClassifier {
    pub fn new(settings: &Settings) -> Self {
        Self {
            rules: settings.rules.clone(),
        }
    }
}

impl SignalClassifier for RuleClassifier {
    fn classify(&self, row: &FeatureRow) -> Decision {
        let (Some(rsi), Some(stoch_k), Some(position)) =
            (row.rsi, row.stoch_k, row.bollinger_position)
        else {
            return Decision::neutral();
        };
        let r = &self.rules;
        let strength = row.candle.range();

        let buy = rsi < r.buy_rsi
            && stoch_k < r.buy_stoch
            && position < r.buy_bollinger_position
            && row.trend_touch == 1;
        if buy {
            return Decision::new(Signal::Buy, strength);
        }

        let overbought = rsi > r.sell_rsi
            && stoch_k > r.sell_stoch
            && position > r.sell_bollinger_position
            && row.volume_change > 0.0;
        if overbought || row.trend_touch == -1 {
            return Decision::new(Signal::Sell, strength);
        }

        Decision::neutral()
    }

    fn name(&self) -> &str {
        "Rules"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::FeaturePipeline;
    use crate::models::{AssetSeries, Candle};
    use chrono::{Duration, Utc};

    fn row(rsi: Option<f64>, stoch_k: f64, position: f64, volume_change: f64, touch: i8) -> FeatureRow {
        FeatureRow {
            candle: Candle {
                timestamp: Utc::now(),
                open: 100.0,
                high: 104.0,
                low: 98.0,
                close: 100.0,
                volume: 10.0,
            },
            rsi,
            stoch_k: Some(stoch_k),
            stoch_d: Some(stoch_k),
            bollinger_upper: Some(110.0),
            bollinger_lower: Some(90.0),
            bollinger_width: Some(0.2),
            bollinger_position: Some(position),
            macd: Some(0.0),
            macd_signal: Some(0.0),
            macd_hist: Some(0.0),
            atr: Some(2.0),
            volume_change,
            swing: 0,
            trend_support_score: 0,
            trend_support_line: None,
            trend_resistance_score: 0,
            trend_resistance_line: None,
            trend_touch: touch,
        }
    }

    #[test]
    fn test_buy_needs_support_bounce() {
        let clf = RuleClassifier::new(&Settings::default());

        let decision = clf.classify(&row(Some(25.0), 10.0, 0.1, 0.0, 1));
        assert_eq!(decision.signal, Signal::Buy);
        assert_eq!(decision.strength, 6.0);

        // Oversold but no touch
        assert_eq!(clf.classify(&row(Some(25.0), 10.0, 0.1, 0.0, 0)).signal, Signal::Neutral);
    }

    #[test]
    fn test_sell_on_overbought_or_rejection() {
        let clf = RuleClassifier::new(&Settings::default());

        assert_eq!(clf.classify(&row(Some(75.0), 90.0, 0.9, 0.2, 0)).signal, Signal::Sell);
        // Falling volume blocks the oscillator exit
        assert_eq!(clf.classify(&row(Some(75.0), 90.0, 0.9, -0.2, 0)).signal, Signal::Neutral);
        // Resistance rejection alone is enough
        assert_eq!(clf.classify(&row(Some(50.0), 50.0, 0.5, 0.0, -1)).signal, Signal::Sell);
    }

    #[test]
    fn test_undefined_features_are_neutral() {
        let clf = RuleClassifier::new(&Settings::default());
        assert_eq!(clf.classify(&row(None, 10.0, 0.1, 0.0, 1)), Decision::neutral());
    }

    #[test]
    fn test_rising_prices_never_buy() {
        let start = Utc::now();
        let candles = (0..200)
            .map(|i| {
                let price = 100.0 + i as f64;
                Candle {
                    timestamp: start + Duration::hours(i),
                    open: price - 0.5,
                    high: price + 0.5,
                    low: price - 1.0,
                    close: price,
                    volume: 1000.0,
                }
            })
            .collect();
        let series = AssetSeries::new("UP", candles);
        let enriched = FeaturePipeline::new(&Settings::default()).enrich(&series);

        let clf = RuleClassifier::new(&Settings::default());
        assert!(clf
            .classify_all(&enriched)
            .iter()
            .all(|d| d.signal != Signal::Buy));
        assert_eq!(enriched.rows[199].rsi, Some(100.0));
    }
}
