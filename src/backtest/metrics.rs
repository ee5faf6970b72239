use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::ExitReason;

/// Bars per year for hourly data
pub const HOURLY_BARS_PER_YEAR: f64 = 24.0 * 365.0;

/// Record of a single closed trade
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRecord {
    pub symbol: String,
    pub entry_time: DateTime<Utc>,
    pub exit_time: DateTime<Utc>,
    pub entry_price: f64,
    pub exit_price: f64,
    /// Realized gain as a fraction of the entry price
    pub gain: f64,
    pub bars_held: usize,
    pub exit_reason: ExitReason,
}

impl TradeRecord {
    pub fn is_win(&self) -> bool {
        self.gain > 0.0
    }
}

/// Summary statistics over an equity curve and trade ledger
///
/// Percentages are in percent units; `max_drawdown` is a fraction in [0, 1].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestMetrics {
    // Trade Statistics
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub win_rate: f64,

    // Gain Distribution
    pub avg_trade_pct: f64,
    pub avg_win_pct: f64,
    pub avg_loss_pct: f64,
    pub largest_win_pct: f64,
    pub largest_loss_pct: f64,
    pub expectancy_pct: f64,
    /// Sum of wins over absolute sum of losses; infinite with wins and no losses
    pub profit_factor: f64,

    // Returns
    pub final_equity: f64,
    pub total_gain_pct: f64,
    pub cagr: f64,

    // Risk Metrics
    pub max_drawdown: f64,
    pub sharpe_ratio: f64,

    // Holding Period
    pub avg_bars_in_trade: f64,
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

impl BacktestMetrics {
    /// Calculate metrics from a finished simulation
    pub fn compute(equity_curve: &[f64], trades: &[TradeRecord], bars_per_year: f64) -> Self {
        let gains: Vec<f64> = trades.iter().map(|t| t.gain).collect();
        let wins: Vec<f64> = gains.iter().copied().filter(|g| *g > 0.0).collect();
        let losses: Vec<f64> = gains.iter().copied().filter(|g| *g <= 0.0).collect();

        let total_trades = trades.len();
        let win_fraction = if total_trades > 0 {
            wins.len() as f64 / total_trades as f64
        } else {
            0.0
        };

        let avg_win_pct = mean(&wins) * 100.0;
        let avg_loss_pct = mean(&losses) * 100.0;
        let expectancy_pct = if total_trades > 0 {
            win_fraction * avg_win_pct + (1.0 - win_fraction) * avg_loss_pct
        } else {
            0.0
        };

        let final_equity = equity_curve.last().copied().unwrap_or(1.0);
        let start_equity = equity_curve.first().copied().unwrap_or(1.0);

        let bars_held: Vec<f64> = trades.iter().map(|t| t.bars_held as f64).collect();

        Self {
            total_trades,
            winning_trades: wins.len(),
            losing_trades: losses.len(),
            win_rate: win_fraction * 100.0,
            avg_trade_pct: mean(&gains) * 100.0,
            avg_win_pct,
            avg_loss_pct,
            largest_win_pct: wins.iter().copied().fold(0.0, f64::max) * 100.0,
            largest_loss_pct: losses.iter().copied().fold(0.0, f64::min) * 100.0,
            expectancy_pct,
            profit_factor: profit_factor(&wins, &losses),
            final_equity,
            total_gain_pct: (final_equity / start_equity - 1.0) * 100.0,
            cagr: cagr(equity_curve, bars_per_year),
            max_drawdown: max_drawdown(equity_curve),
            sharpe_ratio: sharpe_ratio(equity_curve),
            avg_bars_in_trade: mean(&bars_held),
        }
    }

    /// Print a formatted report to stdout
    pub fn print_report(&self) {
        println!("\n╔═══════════════════════════════════════════════════════╗");
        println!("║              BACKTEST PERFORMANCE REPORT              ║");
        println!("╚═══════════════════════════════════════════════════════╝\n");

        println!("📊 RETURNS");
        println!("  Final Equity:          {:.4}x", self.final_equity);
        println!("  Total Gain:            {:+.2}%", self.total_gain_pct);
        println!("  CAGR:                  {:+.2}%", self.cagr * 100.0);

        println!("\n📈 TRADE STATISTICS");
        println!("  Total Trades:          {}", self.total_trades);
        println!(
            "  Winning Trades:        {} ({:.2}%)",
            self.winning_trades, self.win_rate
        );
        println!("  Losing Trades:         {}", self.losing_trades);

        if self.total_trades > 0 {
            println!("\n💰 WIN/LOSS ANALYSIS");
            println!("  Average Trade:         {:+.2}%", self.avg_trade_pct);
            println!("  Average Win:           {:+.2}%", self.avg_win_pct);
            println!("  Average Loss:          {:+.2}%", self.avg_loss_pct);
            println!("  Largest Win:           {:+.2}%", self.largest_win_pct);
            println!("  Largest Loss:          {:+.2}%", self.largest_loss_pct);
            println!("  Expectancy:            {:+.2}%", self.expectancy_pct);
            if self.profit_factor.is_infinite() {
                println!("  Profit Factor:         ∞");
            } else {
                println!("  Profit Factor:         {:.2}", self.profit_factor);
            }
        }

        println!("\n⚠️  RISK METRICS");
        println!("  Max Drawdown:          {:.2}%", self.max_drawdown * 100.0);
        println!("  Sharpe Ratio:          {:.2}", self.sharpe_ratio);

        if self.total_trades > 0 {
            println!("\n⏱️  HOLDING PERIODS");
            println!("  Average:               {:.1} bars", self.avg_bars_in_trade);
        }

        println!("\n═════════════════════════════════════════════════════════\n");
    }
}

/// Sum of wins over the absolute sum of losses
///
/// Infinite when there are wins but no losing magnitude, 0 without trades.
pub fn profit_factor(wins: &[f64], losses: &[f64]) -> f64 {
    let total_wins: f64 = wins.iter().sum();
    let total_losses: f64 = losses.iter().sum::<f64>().abs();
    if total_losses > 0.0 {
        total_wins / total_losses
    } else if total_wins > 0.0 {
        f64::INFINITY
    } else {
        0.0
    }
}

/// Largest peak-to-trough decline as a fraction of the running peak
pub fn max_drawdown(equity_curve: &[f64]) -> f64 {
    let mut peak = f64::MIN;
    let mut max_dd: f64 = 0.0;
    for &value in equity_curve {
        peak = peak.max(value);
        if peak > 0.0 {
            max_dd = max_dd.max((peak - value) / peak);
        }
    }
    max_dd.clamp(0.0, 1.0)
}

/// Mean over population standard deviation of bar-to-bar equity returns
pub fn sharpe_ratio(equity_curve: &[f64]) -> f64 {
    let returns: Vec<f64> = equity_curve
        .windows(2)
        .map(|w| if w[0] > 0.0 { w[1] / w[0] - 1.0 } else { 0.0 })
        .collect();
    if returns.is_empty() {
        return 0.0;
    }

    let mean_return = mean(&returns);
    let variance = returns
        .iter()
        .map(|r| {
            let diff = r - mean_return;
            diff * diff
        })
        .sum::<f64>()
        / returns.len() as f64;
    let std_dev = variance.sqrt();

    if std_dev > 0.0 {
        mean_return / std_dev
    } else {
        0.0
    }
}

/// Compound annual growth over the curve, with `bars_per_year` bars in a year
pub fn cagr(equity_curve: &[f64], bars_per_year: f64) -> f64 {
    let (Some(&start), Some(&end)) = (equity_curve.first(), equity_curve.last()) else {
        return 0.0;
    };
    let years = equity_curve.len() as f64 / bars_per_year;
    if start <= 0.0 || end <= 0.0 || years <= 0.0 {
        return 0.0;
    }
    (end / start).powf(1.0 / years) - 1.0
}
