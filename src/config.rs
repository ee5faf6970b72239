//! Immutable runtime settings
//!
//! Loaded once at startup (optional TOML file, then `TRENDBOT__SECTION__KEY`
//! environment overrides) and passed by reference into the feature pipeline,
//! the classifiers and the simulator.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::strategy::gbm::BoostingParams;
use crate::Result;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub indicators: IndicatorSettings,
    pub swing: SwingSettings,
    pub trend: TrendSettings,
    pub rules: RuleSettings,
    pub classifier: ClassifierSettings,
    pub simulation: SimulationSettings,
}

/// Window lengths for the rolling indicators
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorSettings {
    pub rsi_period: usize,
    pub stoch_k_period: usize,
    pub stoch_d_period: usize,
    pub bollinger_period: usize,
    pub bollinger_std_dev: f64,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub atr_period: usize,
}

impl Default for IndicatorSettings {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            stoch_k_period: 14,
            stoch_d_period: 3,
            bollinger_period: 20,
            bollinger_std_dev: 2.0,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            atr_period: 14,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SwingSettings {
    /// Bars on each side a swing must dominate
    pub range: usize,
    /// Require ATR separation and a retrace before accepting a swing
    pub strict: bool,
    pub atr_multiplier: f64,
    pub confirmation_window: usize,
}

impl Default for SwingSettings {
    fn default() -> Self {
        Self {
            range: 3,
            strict: false,
            atr_multiplier: 0.5,
            confirmation_window: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendSettings {
    pub tolerance_pct: f64,
    /// First tracked bar and number of recent swings considered when refitting
    pub lookback: usize,
}

impl Default for TrendSettings {
    fn default() -> Self {
        Self {
            tolerance_pct: 0.005,
            lookback: 100,
        }
    }
}

/// Thresholds for the rule-based classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleSettings {
    pub buy_rsi: f64,
    pub sell_rsi: f64,
    pub buy_stoch: f64,
    pub sell_stoch: f64,
    pub buy_bollinger_position: f64,
    pub sell_bollinger_position: f64,
}

impl Default for RuleSettings {
    fn default() -> Self {
        Self {
            buy_rsi: 35.0,
            sell_rsi: 65.0,
            buy_stoch: 20.0,
            sell_stoch: 80.0,
            buy_bollinger_position: 0.25,
            sell_bollinger_position: 0.75,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierSettings {
    pub confidence_threshold: f64,
    pub future_candles: usize,
    pub future_gain: f64,
    pub future_loss: f64,
    /// Most recent bars per symbol kept out of training
    pub training_holdout_bars: usize,
    pub boosting: BoostingParams,
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.7,
            future_candles: 10,
            future_gain: 0.05,
            future_loss: 0.05,
            training_holdout_bars: 5000,
            boosting: BoostingParams::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    /// Number of aligned bars replayed
    pub backtest_window: usize,
    pub interval_minutes: i64,
    pub risk_management: bool,
    pub stop_multiplier: f64,
    pub target_multiplier: f64,
    pub cooldown_bars: usize,
    /// Share of the balance handed to the execution collaborator per entry
    pub position_fraction: f64,
    pub mark_to_market: bool,
    pub switching: bool,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            backtest_window: 1000,
            interval_minutes: 60,
            risk_management: false,
            stop_multiplier: 2.0,
            target_multiplier: 3.0,
            cooldown_bars: 3,
            position_fraction: 0.5,
            mark_to_market: false,
            switching: false,
        }
    }
}

impl Settings {
    /// Load settings from an optional file plus environment overrides
    ///
    /// Fails fast on any malformed value.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }
        builder = builder.add_source(
            config::Environment::with_prefix("TRENDBOT")
                .separator("__")
                .try_parsing(true),
        );

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;

        tracing::debug!("Loaded settings: {:?}", settings);
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        let ind = &self.indicators;
        for (name, period) in [
            ("indicators.rsi_period", ind.rsi_period),
            ("indicators.stoch_k_period", ind.stoch_k_period),
            ("indicators.stoch_d_period", ind.stoch_d_period),
            ("indicators.macd_fast", ind.macd_fast),
            ("indicators.macd_slow", ind.macd_slow),
            ("indicators.macd_signal", ind.macd_signal),
            ("indicators.atr_period", ind.atr_period),
            ("swing.range", self.swing.range),
            ("trend.lookback", self.trend.lookback),
            ("classifier.future_candles", self.classifier.future_candles),
        ] {
            if period == 0 {
                return Err(Error::configuration(format!("{} must be positive", name)));
            }
        }
        if ind.bollinger_period < 2 {
            return Err(Error::configuration(
                "indicators.bollinger_period must be at least 2",
            ));
        }
        if ind.macd_fast >= ind.macd_slow {
            return Err(Error::configuration(
                "indicators.macd_fast must be shorter than indicators.macd_slow",
            ));
        }
        check_positive("indicators.bollinger_std_dev", ind.bollinger_std_dev)?;

        let rules = &self.rules;
        for (name, value) in [
            ("rules.buy_rsi", rules.buy_rsi),
            ("rules.sell_rsi", rules.sell_rsi),
            ("rules.buy_stoch", rules.buy_stoch),
            ("rules.sell_stoch", rules.sell_stoch),
        ] {
            check_range(name, value, 0.0, 100.0)?;
        }
        for (name, value) in [
            ("rules.buy_bollinger_position", rules.buy_bollinger_position),
            ("rules.sell_bollinger_position", rules.sell_bollinger_position),
        ] {
            if !value.is_finite() {
                return Err(Error::configuration(format!("{} must be finite", name)));
            }
        }

        check_range("trend.tolerance_pct", self.trend.tolerance_pct, 0.0, 1.0)?;
        check_positive("trend.tolerance_pct", self.trend.tolerance_pct)?;
        check_range("swing.atr_multiplier", self.swing.atr_multiplier, 0.0, f64::MAX)?;

        let clf = &self.classifier;
        check_range("classifier.confidence_threshold", clf.confidence_threshold, 0.0, 1.0)?;
        check_positive("classifier.future_gain", clf.future_gain)?;
        check_range("classifier.future_loss", clf.future_loss, 0.0, 1.0)?;
        check_positive("classifier.future_loss", clf.future_loss)?;
        clf.boosting.validate()?;

        let sim = &self.simulation;
        if sim.backtest_window < 2 {
            return Err(Error::configuration(
                "simulation.backtest_window must be at least 2",
            ));
        }
        if sim.interval_minutes <= 0 {
            return Err(Error::configuration(
                "simulation.interval_minutes must be positive",
            ));
        }
        check_positive("simulation.stop_multiplier", sim.stop_multiplier)?;
        check_positive("simulation.target_multiplier", sim.target_multiplier)?;
        check_range("simulation.position_fraction", sim.position_fraction, 0.0, 1.0)?;
        check_positive("simulation.position_fraction", sim.position_fraction)?;

        Ok(())
    }
}

fn check_range(name: &str, value: f64, min: f64, max: f64) -> Result<()> {
    if !value.is_finite() || value < min || value > max {
        return Err(Error::configuration(format!(
            "{} = {} is outside [{}, {}]",
            name, value, min, max
        )));
    }
    Ok(())
}

pub(crate) fn check_positive(name: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(Error::configuration(format!(
            "{} = {} must be positive",
            name, value
        )));
    }
    Ok(())
}
