use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use trendbot::backtest::{Backtester, MarketScenario, SyntheticDataGenerator};
use trendbot::execution::{LogNotifier, PaperExecution};
use trendbot::persistence::CandleStore;
use trendbot::strategy::{LearnedClassifier, RuleClassifier};
use trendbot::{Settings, SignalClassifier};

#[derive(Parser)]
#[command(name = "trendbot", about = "Multi-asset trend-channel backtester")]
struct Cli {
    /// Settings file (TOML); TRENDBOT__SECTION__KEY variables override it
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Replay stored candles through the simulator
    Backtest {
        /// Candle store (JSON)
        #[arg(long)]
        data: PathBuf,
        /// Trained model artifact; the rule classifier is used without one
        #[arg(long)]
        model: Option<PathBuf>,
        /// Override simulation.backtest_window
        #[arg(long)]
        window: Option<usize>,
    },
    /// Train the gradient-boosted classifier on stored candles
    Train {
        #[arg(long)]
        data: PathBuf,
        #[arg(long, default_value = "model.json")]
        output: PathBuf,
    },
    /// Backtest the rule classifier on a generated market
    Demo {
        #[arg(long, default_value_t = 42)]
        seed: u64,
        #[arg(long, default_value_t = 1500)]
        bars: usize,
        /// Also write the generated candles to this store
        #[arg(long)]
        save: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    setup_logging();

    let cli = Cli::parse();
    let mut settings =
        Settings::load(cli.config.as_deref()).context("Failed to load settings")?;

    match cli.command {
        Command::Backtest {
            data,
            model,
            window,
        } => {
            if let Some(window) = window {
                settings.simulation.backtest_window = window;
                settings.validate()?;
            }
            let series = CandleStore::new(data).load()?;

            let classifier: Box<dyn SignalClassifier> = match model {
                Some(path) => Box::new(LearnedClassifier::load(
                    &path,
                    settings.classifier.confidence_threshold,
                )?),
                None => Box::new(RuleClassifier::new(&settings)),
            };

            Backtester::new(&settings).run_and_report(
                &series,
                classifier.as_ref(),
                &mut PaperExecution::new(),
                &LogNotifier,
                "stored candles",
            )?;
        }
        Command::Train { data, output } => {
            let series = CandleStore::new(data).load()?;
            let backtester = Backtester::new(&settings);
            let classifier =
                LearnedClassifier::train(backtester.pipeline(), &series, &settings.classifier)?;
            classifier.save(&output)?;
        }
        Command::Demo { seed, bars, save } => {
            println!("\n╔═══════════════════════════════════════════════════════╗");
            println!("║          TRENDBOT SYNTHETIC MARKET DEMO               ║");
            println!("╚═══════════════════════════════════════════════════════╝");

            let mut generator = SyntheticDataGenerator::new(seed);
            let series = generator.generate_market(
                &[
                    ("BTC", MarketScenario::Uptrend),
                    ("ETH", MarketScenario::Sideways),
                    ("SOL", MarketScenario::Volatile),
                    ("ADA", MarketScenario::Downtrend),
                ],
                bars,
            );
            if let Some(path) = save {
                CandleStore::new(path).save(&series)?;
            }

            settings.simulation.backtest_window = settings.simulation.backtest_window.min(bars);
            settings.validate()?;

            let classifier = RuleClassifier::new(&settings);
            Backtester::new(&settings).run_and_report(
                &series,
                &classifier,
                &mut PaperExecution::new(),
                &LogNotifier,
                "synthetic market",
            )?;
        }
    }

    Ok(())
}

fn setup_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("trendbot=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
