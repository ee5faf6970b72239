use chrono::Duration;

use crate::backtest::alignment::{AlignedMarket, SymbolFrame};
use crate::backtest::metrics::BacktestMetrics;
use crate::backtest::simulator::{SimulationConfig, SimulationResult, Simulator};
use crate::config::{Settings, SimulationSettings};
use crate::error::Error;
use crate::execution::{ExecutionClient, Notifier};
use crate::indicators::FeaturePipeline;
use crate::models::AssetSeries;
use crate::strategy::SignalClassifier;
use crate::Result;

/// Simulation output plus its statistics
#[derive(Debug, Clone)]
pub struct BacktestReport {
    pub simulation: SimulationResult,
    pub metrics: BacktestMetrics,
    /// Symbols dropped before alignment
    pub excluded: Vec<String>,
}

/// Backtest runner: window, enrich, classify, align, simulate, score
pub struct Backtester {
    settings: SimulationSettings,
    pipeline: FeaturePipeline,
    simulator: Simulator,
}

impl Backtester {
    pub fn new(settings: &Settings) -> Self {
        Self {
            settings: settings.simulation.clone(),
            pipeline: FeaturePipeline::new(settings),
            simulator: Simulator::new(SimulationConfig::from(&settings.simulation)),
        }
    }

    pub fn pipeline(&self) -> &FeaturePipeline {
        &self.pipeline
    }

    /// Window, validate, enrich and classify each series, then align them
    ///
    /// Short or malformed series are logged and left out; the run only fails
    /// when nothing tradable remains.
    pub fn prepare(
        &self,
        series: &[AssetSeries],
        classifier: &dyn SignalClassifier,
    ) -> Result<(AlignedMarket, Vec<String>)> {
        let window = self.settings.backtest_window;
        let required = window.max(self.pipeline.warmup_bars());
        let interval = Duration::minutes(self.settings.interval_minutes);

        let mut frames = Vec::new();
        let mut excluded = Vec::new();

        for s in series {
            if s.len() < required {
                let err = Error::InsufficientData {
                    symbol: s.symbol.clone(),
                    required,
                    available: s.len(),
                };
                tracing::warn!("Excluding symbol: {}", err);
                excluded.push(s.symbol.clone());
                continue;
            }

            let recent = s.tail(window);
            if let Err(e) = recent.validate(interval) {
                tracing::warn!("Excluding symbol: {}", e);
                excluded.push(s.symbol.clone());
                continue;
            }

            let enriched = self.pipeline.enrich(&recent);
            let decisions = classifier.classify_all(&enriched);
            frames.push(SymbolFrame::new(enriched, decisions));
        }

        if frames.is_empty() {
            return Err(Error::NoTradableSymbols);
        }

        let market = AlignedMarket::align(frames, window)?;
        Ok((market, excluded))
    }

    /// Run a backtest over every series with the given classifier
    pub fn run(
        &self,
        series: &[AssetSeries],
        classifier: &dyn SignalClassifier,
        execution: &mut dyn ExecutionClient,
        notifier: &dyn Notifier,
    ) -> Result<BacktestReport> {
        tracing::info!(
            "Starting backtest: {} symbols, {}-bar window, classifier {}",
            series.len(),
            self.settings.backtest_window,
            classifier.name()
        );

        let (market, excluded) = self.prepare(series, classifier)?;
        let simulation = self.simulator.run(&market, execution, notifier);

        let bars_per_year = 365.0 * 24.0 * 60.0 / self.settings.interval_minutes as f64;
        let metrics =
            BacktestMetrics::compute(&simulation.equity_curve, &simulation.trades, bars_per_year);

        tracing::info!(
            "Backtest complete: {} trades, total gain {:+.2}%",
            metrics.total_trades,
            metrics.total_gain_pct
        );

        Ok(BacktestReport {
            simulation,
            metrics,
            excluded,
        })
    }

    /// Run backtest and print report
    pub fn run_and_report(
        &self,
        series: &[AssetSeries],
        classifier: &dyn SignalClassifier,
        execution: &mut dyn ExecutionClient,
        notifier: &dyn Notifier,
        scenario_name: &str,
    ) -> Result<BacktestReport> {
        println!("\n🔬 Running backtest: {}", scenario_name);
        println!("   Classifier: {}", classifier.name());
        println!("   Symbols: {}", series.len());
        println!("   Window: {} bars", self.settings.backtest_window);

        let report = self.run(series, classifier, execution, notifier)?;
        if !report.excluded.is_empty() {
            println!("   Excluded: {}", report.excluded.join(", "));
        }
        if let Some(open) = &report.simulation.open_position {
            println!(
                "   Open position: {} since {} @ {:.4}",
                open.symbol, open.entry_time, open.entry_price
            );
        }
        report.metrics.print_report();

        Ok(report)
    }
}
