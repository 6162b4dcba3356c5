use anyhow::anyhow;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// One OHLC bucket. `time` is the bucket start in unix seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: f64,
}

impl Candle {
    /// A fresh candle opened by a single trade/tick price.
    pub fn from_price(time: i64, price: f64) -> Self {
        Self {
            time,
            open: price,
            high: price,
            low: price,
            close: price,
            volume: 0.0,
        }
    }

    /// Folds another price into the candle (high/low/close).
    pub fn absorb(&mut self, price: f64) {
        if price > self.high {
            self.high = price;
        }
        if price < self.low {
            self.low = price;
        }
        self.close = price;
    }

    /// `low <= {open, close} <= high`.
    pub fn is_well_formed(&self) -> bool {
        self.low <= self.open.min(self.close) && self.open.max(self.close) <= self.high
    }

    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.time, 0)
    }
}

/// A single price observation from the live feed. Not candle-aligned.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceTick {
    pub time: i64,
    pub value: f64,
}

/// Chart timeframe. Exactly one is active per session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(try_from = "String", into = "String")]
pub enum Interval {
    Minute1,
    Minute5,
    Minute15,
    Minute30,
    Hour1,
    Hour4,
    Day1,
    Week1,
}

impl Interval {
    pub const ALL: [Interval; 8] = [
        Interval::Minute1,
        Interval::Minute5,
        Interval::Minute15,
        Interval::Minute30,
        Interval::Hour1,
        Interval::Hour4,
        Interval::Day1,
        Interval::Week1,
    ];

    pub fn seconds(self) -> i64 {
        match self {
            Interval::Minute1 => 60,
            Interval::Minute5 => 300,
            Interval::Minute15 => 900,
            Interval::Minute30 => 1_800,
            Interval::Hour1 => 3_600,
            Interval::Hour4 => 14_400,
            Interval::Day1 => 86_400,
            Interval::Week1 => 604_800,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Interval::Minute1 => "1m",
            Interval::Minute5 => "5m",
            Interval::Minute15 => "15m",
            Interval::Minute30 => "30m",
            Interval::Hour1 => "1h",
            Interval::Hour4 => "4h",
            Interval::Day1 => "1d",
            Interval::Week1 => "1w",
        }
    }

    /// Start of the bucket containing `time` (floor division, also for negative times).
    pub fn bucket_start(self, time: i64) -> i64 {
        let secs = self.seconds();
        time.div_euclid(secs) * secs
    }

    pub fn is_aligned(self, time: i64) -> bool {
        time.rem_euclid(self.seconds()) == 0
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interval {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Interval::ALL
            .iter()
            .copied()
            .find(|i| i.as_str() == s.trim())
            .ok_or_else(|| anyhow!("Unknown interval '{}'", s))
    }
}

impl TryFrom<String> for Interval {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Interval> for String {
    fn from(value: Interval) -> Self {
        value.as_str().to_string()
    }
}

/// Everything that identifies one chart session. Changing any field resets it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionKey {
    pub pair: String,
    pub base: String,
    pub interval: Interval,
    pub strategy: String,
}

impl SessionKey {
    pub fn new(pair: &str, base: &str, interval: Interval, strategy: &str) -> Self {
        Self {
            pair: pair.to_uppercase(),
            base: base.to_uppercase(),
            interval,
            strategy: strategy.to_string(),
        }
    }

    /// Same market and timeframe; the strategy may differ.
    pub fn same_market(&self, other: &SessionKey) -> bool {
        self.pair == other.pair && self.base == other.base && self.interval == other.interval
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}@{}[{}]", self.pair, self.base, self.interval, self.strategy)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }
}

/// Where the chart should draw the marker relative to the candle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MarkerPlacement {
    BelowBar,
    AboveBar,
}

impl From<Side> for MarkerPlacement {
    fn from(side: Side) -> Self {
        match side {
            Side::Buy => MarkerPlacement::BelowBar,
            Side::Sell => MarkerPlacement::AboveBar,
        }
    }
}

/// A crossover event at a candle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub side: Side,
    pub time: i64,
    pub price: f64,
    pub source_index: usize,
    pub placement: MarkerPlacement,
}

impl Signal {
    pub fn new(side: Side, candle: &Candle, source_index: usize) -> Self {
        Self {
            side,
            time: candle.time,
            price: candle.close,
            source_index,
            placement: side.into(),
        }
    }

    pub fn key(&self) -> (i64, Side) {
        (self.time, self.side)
    }

    /// Marker text, e.g. `BUY\n$43250.10`.
    pub fn label(&self, base: &str) -> String {
        format!("{}\n${}", self.side.as_str(), crate::utils::format_price(self.price, base))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinePoint {
    pub time: i64,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorLine {
    pub name: String,
    pub parameters: serde_json::Value,
    pub points: Vec<LinePoint>,
}

impl IndicatorLine {
    /// Pairs a NaN-sentinel series with candle times; NaN becomes `None`.
    pub fn from_series(name: &str, parameters: serde_json::Value, times: &[i64], values: &[f64]) -> Self {
        let points = times
            .iter()
            .zip(values.iter())
            .map(|(&time, &v)| LinePoint {
                time,
                value: if v.is_finite() { Some(v) } else { None },
            })
            .collect();
        Self {
            name: name.to_string(),
            parameters,
            points,
        }
    }
}

/// What the chart widget receives after every recomputation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderFrame {
    pub key: SessionKey,
    pub lines: BTreeMap<String, IndicatorLine>,
    pub signals: Vec<Signal>,
    pub forming: Option<Candle>,
}
