//! Single-position replay over an aligned market
//!
//! State is either FLAT or LONG one symbol. Each bar the held symbol is checked
//! for an exit (stop, target, SELL), then optionally for a switch to a stronger
//! BUY elsewhere. When FLAT, the strongest BUY across symbols is entered unless
//! a post-stop cooldown is running. Equity only moves on realized exits unless
//! mark-to-market is enabled.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::backtest::alignment::AlignedMarket;
use crate::backtest::metrics::TradeRecord;
use crate::backtest::trajectory::TrajectoryAverage;
use crate::config::SimulationSettings;
use crate::execution::{ExecutionClient, Notifier};
use crate::models::{ExitReason, Signal, TradeSide};
use crate::risk::{Cooldown, ExitLevels, RiskLimits};

/// Simulation variants
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// ATR stops/targets and the post-stop cooldown; `None` disables both
    pub risk: Option<RiskLimits>,
    pub cooldown_bars: usize,
    /// Share of the balance passed to the execution client per order
    pub position_fraction: f64,
    pub mark_to_market: bool,
    pub switching: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            risk: None,
            cooldown_bars: 3,
            position_fraction: 0.5,
            mark_to_market: false,
            switching: false,
        }
    }
}

impl From<&SimulationSettings> for SimulationConfig {
    fn from(settings: &SimulationSettings) -> Self {
        Self {
            risk: settings.risk_management.then_some(RiskLimits {
                stop_multiplier: settings.stop_multiplier,
                target_multiplier: settings.target_multiplier,
            }),
            cooldown_bars: settings.cooldown_bars,
            position_fraction: settings.position_fraction,
            mark_to_market: settings.mark_to_market,
            switching: settings.switching,
        }
    }
}

/// The single open position
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenPosition {
    pub symbol: String,
    #[serde(skip)]
    symbol_index: usize,
    pub entry_price: f64,
    pub entry_time: DateTime<Utc>,
    pub entry_bar: usize,
    pub levels: Option<ExitLevels>,
    /// Unrealized gain at every bar held, starting with 0 on the entry bar
    pub trajectory: Vec<f64>,
}

impl OpenPosition {
    pub fn unrealized_return(&self, price: f64) -> f64 {
        (price - self.entry_price) / self.entry_price
    }
}

#[derive(Debug, Clone)]
pub enum Position {
    Flat,
    Long(OpenPosition),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationResult {
    pub timestamps: Vec<DateTime<Utc>>,
    /// Capital multiplier per bar, starting at 1.0
    pub equity_curve: Vec<f64>,
    pub trades: Vec<TradeRecord>,
    /// Held symbol per bar
    pub holdings: Vec<Option<String>>,
    pub win_trajectory: TrajectoryAverage,
    pub loss_trajectory: TrajectoryAverage,
    /// Position still open after the last bar (never force-closed)
    pub open_position: Option<OpenPosition>,
}

impl SimulationResult {
    pub fn final_equity(&self) -> f64 {
        self.equity_curve.last().copied().unwrap_or(1.0)
    }
}

pub struct Simulator {
    config: SimulationConfig,
}

impl Simulator {
    pub fn new(config: SimulationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Replay every aligned bar; bar 0 only seeds the equity curve
    pub fn run(
        &self,
        market: &AlignedMarket,
        execution: &mut dyn ExecutionClient,
        notifier: &dyn Notifier,
    ) -> SimulationResult {
        let mut replay = Replay {
            config: &self.config,
            market,
            execution,
            notifier,
            capital: 1.0,
            position: Position::Flat,
            cooldown: Cooldown::new(self.config.cooldown_bars),
            trades: Vec::new(),
            wins: TrajectoryAverage::default(),
            losses: TrajectoryAverage::default(),
        };

        let mut equity_curve = Vec::with_capacity(market.len());
        let mut holdings = Vec::with_capacity(market.len());
        if !market.is_empty() {
            equity_curve.push(1.0);
            holdings.push(None);
        }

        for bar in 1..market.len() {
            equity_curve.push(replay.step(bar));
            holdings.push(match &replay.position {
                Position::Flat => None,
                Position::Long(pos) => Some(pos.symbol.clone()),
            });
        }

        let open_position = match replay.position {
            Position::Flat => None,
            Position::Long(pos) => Some(pos),
        };

        tracing::info!(
            "Simulation complete: {} bars, {} trades, capital {:.4}{}",
            market.len(),
            replay.trades.len(),
            replay.capital,
            if open_position.is_some() {
                " (position still open)"
            } else {
                ""
            }
        );

        SimulationResult {
            timestamps: market.timestamps.clone(),
            equity_curve,
            trades: replay.trades,
            holdings,
            win_trajectory: replay.wins,
            loss_trajectory: replay.losses,
            open_position,
        }
    }
}

struct Replay<'a> {
    config: &'a SimulationConfig,
    market: &'a AlignedMarket,
    execution: &'a mut dyn ExecutionClient,
    notifier: &'a dyn Notifier,
    capital: f64,
    position: Position,
    cooldown: Cooldown,
    trades: Vec<TradeRecord>,
    wins: TrajectoryAverage,
    losses: TrajectoryAverage,
}

impl Replay<'_> {
    /// Advance one bar and return its equity value
    fn step(&mut self, bar: usize) -> f64 {
        let mut pos = match std::mem::replace(&mut self.position, Position::Flat) {
            Position::Flat => {
                if !self.cooldown.tick() {
                    if let Some(candidate) = self.best_entry(bar, None, f64::NEG_INFINITY) {
                        self.open(candidate, bar);
                    }
                }
                return self.capital;
            }
            Position::Long(pos) => pos,
        };

        let price = self.market.symbols[pos.symbol_index].close(bar);
        let unrealized = pos.unrealized_return(price);
        pos.trajectory.push(unrealized);

        if let Some(reason) = self.exit_reason(&pos, bar, unrealized) {
            return match self.close(pos, bar, reason) {
                Ok(()) => self.capital,
                Err(pos) => self.keep(pos, unrealized),
            };
        }

        if self.config.switching {
            let held_strength = self.market.symbols[pos.symbol_index].decisions[bar].strength;
            if let Some(challenger) = self.best_entry(bar, Some(pos.symbol_index), held_strength) {
                return match self.close(pos, bar, ExitReason::Switch) {
                    Ok(()) => {
                        self.open(challenger, bar);
                        self.capital
                    }
                    Err(pos) => self.keep(pos, unrealized),
                };
            }
        }

        self.keep(pos, unrealized)
    }

    fn keep(&mut self, pos: OpenPosition, unrealized: f64) -> f64 {
        self.position = Position::Long(pos);
        if self.config.mark_to_market {
            self.capital * (1.0 + unrealized)
        } else {
            self.capital
        }
    }

    fn exit_reason(&self, pos: &OpenPosition, bar: usize, unrealized: f64) -> Option<ExitReason> {
        if let Some(levels) = &pos.levels {
            if let Err(reason) = levels.check(unrealized) {
                return Some(reason);
            }
        }
        let decision = self.market.symbols[pos.symbol_index].decisions[bar];
        (decision.signal == Signal::Sell).then_some(ExitReason::Signal)
    }

    /// Strongest BUY above `min_strength`; earlier symbols win ties
    fn best_entry(&self, bar: usize, exclude: Option<usize>, min_strength: f64) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (index, frame) in self.market.symbols.iter().enumerate() {
            if Some(index) == exclude {
                continue;
            }
            let decision = frame.decisions[bar];
            if decision.signal != Signal::Buy || decision.strength <= min_strength {
                continue;
            }
            if let Some(risk) = &self.config.risk {
                if risk.levels(frame.rows[bar].atr, frame.close(bar)).is_none() {
                    continue;
                }
            }
            if best.map_or(true, |(_, strength)| decision.strength > strength) {
                best = Some((index, decision.strength));
            }
        }
        best.map(|(index, _)| index)
    }

    fn open(&mut self, index: usize, bar: usize) {
        let frame = &self.market.symbols[index];
        let price = frame.close(bar);
        let levels = self
            .config
            .risk
            .as_ref()
            .and_then(|risk| risk.levels(frame.rows[bar].atr, price));

        if let Err(e) = self
            .execution
            .submit(&frame.symbol, TradeSide::Buy, self.config.position_fraction)
        {
            tracing::warn!("Buy order for {} failed, staying flat: {}", frame.symbol, e);
            return;
        }

        tracing::debug!("Opened {} @ {:.4} on bar {}", frame.symbol, price, bar);
        self.notifier
            .notify(&format!("BUY {} @ {:.4}", frame.symbol, price));

        self.position = Position::Long(OpenPosition {
            symbol: frame.symbol.clone(),
            symbol_index: index,
            entry_price: price,
            entry_time: self.market.timestamps[bar],
            entry_bar: bar,
            levels,
            trajectory: vec![0.0],
        });
    }

    /// Close the position; hands it back when the order fails
    fn close(
        &mut self,
        pos: OpenPosition,
        bar: usize,
        reason: ExitReason,
    ) -> Result<(), OpenPosition> {
        if let Err(e) = self
            .execution
            .submit(&pos.symbol, TradeSide::Sell, self.config.position_fraction)
        {
            tracing::warn!("Sell order for {} failed, still holding: {}", pos.symbol, e);
            return Err(pos);
        }

        let exit_price = self.market.symbols[pos.symbol_index].close(bar);
        let gain = pos.unrealized_return(exit_price);
        self.capital *= 1.0 + gain;

        if gain > 0.0 {
            self.wins.add(&pos.trajectory);
        } else {
            self.losses.add(&pos.trajectory);
        }
        if reason == ExitReason::StopLoss {
            self.cooldown.start();
        }

        tracing::debug!(
            "Closed {} @ {:.4} ({:+.2}%, {}) on bar {}",
            pos.symbol,
            exit_price,
            gain * 100.0,
            reason,
            bar
        );
        self.notifier.notify(&format!(
            "SELL {} @ {:.4} ({:+.2}%, {})",
            pos.symbol,
            exit_price,
            gain * 100.0,
            reason
        ));

        self.trades.push(TradeRecord {
            symbol: pos.symbol,
            entry_time: pos.entry_time,
            exit_time: self.market.timestamps[bar],
            entry_price: pos.entry_price,
            exit_price,
            gain,
            bars_held: bar - pos.entry_bar,
            exit_reason: reason,
        });
        Ok(())
    }
}
