use crate::execution::ExecutionClient;
use crate::models::TradeSide;

/// A filled paper order
#[derive(Debug, Clone, PartialEq)]
pub struct Fill {
    pub symbol: String,
    pub side: TradeSide,
    pub fraction: f64,
}

/// Execution client that fills every order immediately
#[derive(Debug, Default)]
pub struct PaperExecution {
    fills: Vec<Fill>,
}

impl PaperExecution {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fills(&self) -> &[Fill] {
        &self.fills
    }
}

impl ExecutionClient for PaperExecution {
    fn submit(&mut self, symbol: &str, side: TradeSide, fraction: f64) -> anyhow::Result<()> {
        tracing::debug!("Paper fill: {:?} {} ({:.0}% of balance)", side, symbol, fraction * 100.0);
        self.fills.push(Fill {
            symbol: symbol.to_string(),
            side,
            fraction,
        });
        Ok(())
    }
}
