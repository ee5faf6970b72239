//! Intersect-then-reindex alignment of per-symbol feature rows

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};

use crate::error::Error;
use crate::indicators::{EnrichedSeries, FeatureRow};
use crate::models::Decision;
use crate::Result;

/// One symbol's rows and decisions, positionally indexed
#[derive(Debug, Clone)]
pub struct SymbolFrame {
    pub symbol: String,
    pub rows: Vec<FeatureRow>,
    pub decisions: Vec<Decision>,
}

impl SymbolFrame {
    pub fn new(series: EnrichedSeries, decisions: Vec<Decision>) -> Self {
        Self {
            symbol: series.symbol,
            rows: series.rows,
            decisions,
        }
    }

    pub fn close(&self, bar: usize) -> f64 {
        self.rows[bar].candle.close
    }
}

/// Every symbol reindexed onto one shared timestamp index
///
/// Symbols keep their input order, which is the tie-break order for entries.
#[derive(Debug, Clone)]
pub struct AlignedMarket {
    pub timestamps: Vec<DateTime<Utc>>,
    pub symbols: Vec<SymbolFrame>,
}

impl AlignedMarket {
    /// Keep the timestamps every symbol has, then the last `window` of them
    pub fn align(frames: Vec<SymbolFrame>, window: usize) -> Result<Self> {
        if frames.is_empty() {
            return Err(Error::NoTradableSymbols);
        }
        for frame in &frames {
            if frame.rows.len() != frame.decisions.len() {
                return Err(Error::InvalidSeries {
                    symbol: frame.symbol.clone(),
                    reason: format!(
                        "{} rows but {} decisions",
                        frame.rows.len(),
                        frame.decisions.len()
                    ),
                });
            }
        }

        let mut shared: BTreeSet<DateTime<Utc>> =
            frames[0].rows.iter().map(|r| r.candle.timestamp).collect();
        for frame in &frames[1..] {
            let present: BTreeSet<DateTime<Utc>> =
                frame.rows.iter().map(|r| r.candle.timestamp).collect();
            shared.retain(|ts| present.contains(ts));
        }

        let skip = shared.len().saturating_sub(window);
        let timestamps: Vec<DateTime<Utc>> = shared.into_iter().skip(skip).collect();
        if timestamps.is_empty() {
            return Err(Error::NoTradableSymbols);
        }

        let symbols = frames
            .into_iter()
            .map(|frame| {
                let position: HashMap<DateTime<Utc>, usize> = frame
                    .rows
                    .iter()
                    .enumerate()
                    .map(|(i, r)| (r.candle.timestamp, i))
                    .collect();
                let picks: Vec<usize> = timestamps.iter().map(|ts| position[ts]).collect();
                SymbolFrame {
                    rows: picks.iter().map(|&i| frame.rows[i].clone()).collect(),
                    decisions: picks.iter().map(|&i| frame.decisions[i]).collect(),
                    symbol: frame.symbol,
                }
            })
            .collect();

        tracing::debug!("Aligned market on {} shared timestamps", timestamps.len());

        Ok(Self {
            timestamps,
            symbols,
        })
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }
}
