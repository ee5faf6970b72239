//! Online trend-channel tracking
//!
//! Each side (support from swing lows, resistance from swing highs) carries at
//! most one active channel. Every new swing on that side is scored against the
//! active line: a hit within tolerance adds one point, a miss removes one. A
//! channel whose score reaches zero is destroyed, and the tracker then refits a
//! new one from consecutive pairs of recent swings, starting at score 2.

/// A straight line through two swing points, in (bar index, price) space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendLine {
    pub slope: f64,
    pub intercept: f64,
}

impl TrendLine {
    pub fn through(p1: (usize, f64), p2: (usize, f64)) -> Option<Self> {
        if p1.0 == p2.0 {
            return None;
        }
        let slope = (p2.1 - p1.1) / (p2.0 as f64 - p1.0 as f64);
        Some(Self {
            slope,
            intercept: p2.1 - slope * p2.0 as f64,
        })
    }

    pub fn at(&self, index: usize) -> f64 {
        self.slope * index as f64 + self.intercept
    }
}

/// Single-slot channel state for one side
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Channel {
    Inactive,
    Active { line: TrendLine, score: u32 },
}

/// Score and expected line price recorded on a swing bar
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelMark {
    pub score: u32,
    pub line: f64,
}

fn within_tolerance(price: f64, expected: f64, tolerance_pct: f64) -> bool {
    (price - expected).abs() <= expected * tolerance_pct
}

impl Channel {
    /// Score an active channel against a new swing price
    ///
    /// Returns the next state and the mark to record when the channel survives.
    pub fn observe(
        self,
        index: usize,
        price: f64,
        tolerance_pct: f64,
    ) -> (Channel, Option<ChannelMark>) {
        match self {
            Channel::Inactive => (Channel::Inactive, None),
            Channel::Active { line, score } => {
                let expected = line.at(index);
                let score = if within_tolerance(price, expected, tolerance_pct) {
                    score + 1
                } else {
                    score.saturating_sub(1)
                };

                if score == 0 {
                    (Channel::Inactive, None)
                } else {
                    (
                        Channel::Active { line, score },
                        Some(ChannelMark {
                            score,
                            line: expected,
                        }),
                    )
                }
            }
        }
    }

    /// Fit a new channel through the first pair of consecutive prior swings
    /// (oldest first) whose line passes within tolerance of `price` at `index`
    pub fn refit(
        prior_swings: &[usize],
        prices: &[f64],
        index: usize,
        price: f64,
        tolerance_pct: f64,
    ) -> (Channel, Option<ChannelMark>) {
        for pair in prior_swings.windows(2) {
            let (p1, p2) = (pair[0], pair[1]);
            let Some(line) = TrendLine::through((p1, prices[p1]), (p2, prices[p2])) else {
                continue;
            };
            let expected = line.at(index);
            if within_tolerance(price, expected, tolerance_pct) {
                return (
                    Channel::Active { line, score: 2 },
                    Some(ChannelMark {
                        score: 2,
                        line: expected,
                    }),
                );
            }
        }
        (Channel::Inactive, None)
    }

    /// Full transition on a new swing: score the active channel, refit if none survives
    pub fn step(
        self,
        prior_swings: &[usize],
        prices: &[f64],
        index: usize,
        tolerance_pct: f64,
    ) -> (Channel, Option<ChannelMark>) {
        let price = prices[index];
        match self.observe(index, price, tolerance_pct) {
            (channel @ Channel::Active { .. }, mark) => (channel, mark),
            (Channel::Inactive, _) => {
                Self::refit(prior_swings, prices, index, price, tolerance_pct)
            }
        }
    }

    pub fn score(&self) -> u32 {
        match self {
            Channel::Inactive => 0,
            Channel::Active { score, .. } => *score,
        }
    }
}

/// Per-bar output of the tracker
#[derive(Debug, Clone, Default)]
pub struct TrendFeatures {
    pub support_score: Vec<u32>,
    pub support_line: Vec<Option<f64>>,
    pub resistance_score: Vec<u32>,
    pub resistance_line: Vec<Option<f64>>,
    pub touch: Vec<i8>,
}

/// Additive touch flags: +1 for a support touch, -1 for a resistance touch
///
/// Both touching on one bar cancel to 0.
pub fn trend_touch(
    low: f64,
    high: f64,
    support_line: Option<f64>,
    resistance_line: Option<f64>,
    tolerance_pct: f64,
) -> i8 {
    let support = support_line
        .map(|line| within_tolerance(low, line, tolerance_pct) as i8)
        .unwrap_or(0);
    let resistance = resistance_line
        .map(|line| within_tolerance(high, line, tolerance_pct) as i8)
        .unwrap_or(0);
    support - resistance
}

struct SideTracker {
    channel: Channel,
    positions: Vec<usize>,
}

impl SideTracker {
    fn new(swings: &[i8], direction: i8) -> Self {
        Self {
            channel: Channel::Inactive,
            positions: swings
                .iter()
                .enumerate()
                .filter(|(_, &s)| s == direction)
                .map(|(i, _)| i)
                .collect(),
        }
    }

    fn advance(
        &mut self,
        prices: &[f64],
        index: usize,
        lookback: usize,
        tolerance_pct: f64,
    ) -> Option<ChannelMark> {
        let before = self.positions.partition_point(|&p| p < index);
        let recent = &self.positions[before.saturating_sub(lookback)..before];
        let (channel, mark) = self.channel.step(recent, prices, index, tolerance_pct);
        self.channel = channel;
        mark
    }
}

/// Track support and resistance channels bar by bar
///
/// Tracking starts at bar `lookback`; earlier swings still seed refits.
pub fn track_trend_channels(
    lows: &[f64],
    highs: &[f64],
    swings: &[i8],
    tolerance_pct: f64,
    lookback: usize,
) -> TrendFeatures {
    let n = swings.len();
    let mut out = TrendFeatures {
        support_score: vec![0; n],
        support_line: vec![None; n],
        resistance_score: vec![0; n],
        resistance_line: vec![None; n],
        touch: vec![0; n],
    };

    let mut support = SideTracker::new(swings, -1);
    let mut resistance = SideTracker::new(swings, 1);

    for i in lookback..n {
        if swings[i] == -1 {
            if let Some(mark) = support.advance(lows, i, lookback, tolerance_pct) {
                out.support_score[i] = mark.score;
                out.support_line[i] = Some(mark.line);
            }
        }
        if swings[i] == 1 {
            if let Some(mark) = resistance.advance(highs, i, lookback, tolerance_pct) {
                out.resistance_score[i] = mark.score;
                out.resistance_line[i] = Some(mark.line);
            }
        }
    }

    for i in 0..n {
        out.touch[i] = trend_touch(
            lows[i],
            highs[i],
            out.support_line[i],
            out.resistance_line[i],
            tolerance_pct,
        );
    }

    out
}
