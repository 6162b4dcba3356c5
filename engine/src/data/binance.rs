// Binance REST market data (`/api/v3/klines`, `/api/v3/ticker/price`)
//
// The HTTP client itself lives outside the engine behind `RestTransport`;
// this module builds the requests and decodes the payloads.
use crate::data::candle_buffer::normalize;
use crate::data::source::{CandleSource, PriceFeed};
use crate::error::{EngineError, EngineResult};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use shared::models::{Candle, Interval, SessionKey};

pub const DEFAULT_KLINE_LIMIT: usize = 1000;
pub const KLINES_PATH: &str = "/api/v3/klines";
pub const TICKER_PRICE_PATH: &str = "/api/v3/ticker/price";

/// Issues a GET against the exchange and returns the response body.
#[async_trait]
pub trait RestTransport: Send + Sync {
    async fn get(&self, path: &str, query: &str) -> EngineResult<String>;
}

/// History from `/api/v3/klines`.
pub struct BinanceCandleSource<T> {
    transport: T,
    limit: usize,
}

impl<T: RestTransport> BinanceCandleSource<T> {
    pub fn new(transport: T) -> Self {
        BinanceCandleSource {
            transport,
            limit: DEFAULT_KLINE_LIMIT,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit.max(1);
        self
    }
}

#[async_trait]
impl<T: RestTransport> CandleSource for BinanceCandleSource<T> {
    async fn fetch_history(&self, key: &SessionKey) -> EngineResult<Vec<Candle>> {
        let body = self.transport.get(KLINES_PATH, &klines_query(key, self.limit)).await?;
        let candles = parse_klines(&body)?;
        tracing::debug!(key = %key, candles = candles.len(), "Fetched klines");
        Ok(normalize(candles))
    }
}

/// Latest trade price from `/api/v3/ticker/price`, for `PollingTickSource`.
pub struct BinancePriceFeed<T> {
    transport: T,
}

impl<T: RestTransport> BinancePriceFeed<T> {
    pub fn new(transport: T) -> Self {
        BinancePriceFeed { transport }
    }
}

#[async_trait]
impl<T: RestTransport> PriceFeed for BinancePriceFeed<T> {
    async fn latest_price(&self, pair: &str, base: &str) -> EngineResult<f64> {
        let query = format!("symbol={}{}", pair.to_uppercase(), base.to_uppercase());
        let body = self.transport.get(TICKER_PRICE_PATH, &query).await?;
        parse_ticker_price(&body)
    }
}

/// Query string for a klines request, e.g. `symbol=BTCUSDT&interval=1m&limit=1000`.
pub fn klines_query(key: &SessionKey, limit: usize) -> String {
    format!(
        "symbol={}{}&interval={}&limit={}",
        key.pair,
        key.base,
        kline_interval(key.interval),
        limit
    )
}

pub fn kline_interval(interval: Interval) -> &'static str {
    // Binance uses the same short names.
    interval.as_str()
}

/// Decodes a klines array. Each row is
/// `[openTimeMs, "open", "high", "low", "close", "volume", ...]`.
pub fn parse_klines(payload: &str) -> EngineResult<Vec<Candle>> {
    let rows: Vec<Vec<Value>> = serde_json::from_str(payload)?;
    rows.iter()
        .enumerate()
        .map(|(idx, row)| parse_row(idx, row))
        .collect()
}

fn parse_row(idx: usize, row: &[Value]) -> EngineResult<Candle> {
    if row.len() < 6 {
        return Err(EngineError::PayloadFormatError(format!(
            "kline row {} has {} fields, expected at least 6",
            idx,
            row.len()
        )));
    }
    let open_time_ms = row[0].as_i64().ok_or_else(|| {
        EngineError::PayloadFormatError(format!("kline row {}: open time is not an integer: {}", idx, row[0]))
    })?;
    let candle = Candle {
        time: open_time_ms.div_euclid(1000),
        open: decimal(&row[1], "open", idx)?,
        high: decimal(&row[2], "high", idx)?,
        low: decimal(&row[3], "low", idx)?,
        close: decimal(&row[4], "close", idx)?,
        volume: decimal(&row[5], "volume", idx)?,
    };
    if !candle.is_well_formed() {
        return Err(EngineError::PayloadFormatError(format!("kline row {}: inconsistent OHLC", idx)));
    }
    Ok(candle)
}

// Prices arrive as strings; plain numbers are accepted too.
fn decimal(value: &Value, field: &str, idx: usize) -> EngineResult<f64> {
    let parsed = match value {
        Value::String(s) => s.parse::<f64>().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite()).ok_or_else(|| {
        EngineError::PayloadFormatError(format!("kline row {}: bad '{}' value {}", idx, field, value))
    })
}

#[derive(Debug, Deserialize)]
struct TickerPrice {
    price: String,
}

/// Decodes `{"symbol":"BTCUSDT","price":"43250.10"}`.
pub fn parse_ticker_price(payload: &str) -> EngineResult<f64> {
    let ticker: TickerPrice = serde_json::from_str(payload)?;
    ticker
        .price
        .parse::<f64>()
        .ok()
        .filter(|p| p.is_finite() && *p > 0.0)
        .ok_or_else(|| EngineError::PayloadFormatError(format!("bad ticker price '{}'", ticker.price)))
}
