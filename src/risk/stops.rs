use serde::{Deserialize, Serialize};

use crate::models::ExitReason;

/// ATR-scaled stop-loss and take-profit multipliers
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RiskLimits {
    pub stop_multiplier: f64,
    pub target_multiplier: f64,
}

impl Default for RiskLimits {
    fn default() -> Self {
        Self {
            stop_multiplier: 2.0,   // 2 ATR below entry
            target_multiplier: 3.0, // 3 ATR above entry
        }
    }
}

/// Exit distances for one position, as fractions of the entry price
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExitLevels {
    pub stop_loss_distance: f64,
    pub take_profit_distance: f64,
}

impl RiskLimits {
    /// Exit levels for an entry, `None` when ATR is undefined or not positive
    pub fn levels(&self, atr: Option<f64>, entry_price: f64) -> Option<ExitLevels> {
        let atr = atr.filter(|a| a.is_finite() && *a > 0.0)?;
        if entry_price <= 0.0 {
            return None;
        }
        Some(ExitLevels {
            stop_loss_distance: atr * self.stop_multiplier / entry_price,
            take_profit_distance: atr * self.target_multiplier / entry_price,
        })
    }
}

impl ExitLevels {
    /// Check an unrealized return against the levels; stop-loss wins over target
    pub fn check(&self, unrealized_return: f64) -> Result<(), ExitReason> {
        if unrealized_return <= -self.stop_loss_distance {
            return Err(ExitReason::StopLoss);
        }
        if unrealized_return >= self.take_profit_distance {
            return Err(ExitReason::TakeProfit);
        }
        Ok(())
    }
}

/// System-wide entry suppression after a stop-loss
#[derive(Debug, Clone, Default)]
pub struct Cooldown {
    length: usize,
    remaining: usize,
}

impl Cooldown {
    pub fn new(length: usize) -> Self {
        Self {
            length,
            remaining: 0,
        }
    }

    pub fn start(&mut self) {
        self.remaining = self.length;
    }

    pub fn remaining(&self) -> usize {
        self.remaining
    }

    /// Called once per FLAT bar; returns true when entries are suppressed on this bar
    pub fn tick(&mut self) -> bool {
        if self.remaining > 0 {
            self.remaining -= 1;
            true
        } else {
            false
        }
    }
}
