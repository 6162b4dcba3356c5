// Rolling store of sealed candles for one session
use shared::models::Candle;
use std::collections::BTreeMap;

/// Sealed candles, strictly increasing by time, capped at `limit` (oldest evicted).
#[derive(Debug, Clone, PartialEq)]
pub struct CandleBuffer {
    candles: Vec<Candle>,
    limit: usize,
}

/// Sorts by time and removes duplicates; for equal times the later entry wins.
pub fn normalize(candles: impl IntoIterator<Item = Candle>) -> Vec<Candle> {
    let by_time: BTreeMap<i64, Candle> = candles.into_iter().map(|c| (c.time, c)).collect();
    by_time.into_values().collect()
}

impl CandleBuffer {
    pub fn new(limit: usize) -> Self {
        CandleBuffer {
            candles: Vec::new(),
            limit: limit.max(1),
        }
    }

    pub fn from_candles(candles: Vec<Candle>, limit: usize) -> Self {
        let mut buffer = Self::new(limit);
        buffer.candles = normalize(candles);
        buffer.enforce_limit();
        buffer
    }

    /// Merges a re-fetched batch. Candles in `incoming` replace stored ones
    /// with the same time. Returns the number of candles evicted by the cap.
    pub fn merge(&mut self, incoming: Vec<Candle>) -> usize {
        let existing = std::mem::take(&mut self.candles);
        self.candles = normalize(existing.into_iter().chain(incoming));
        self.enforce_limit()
    }

    /// Seals one candle. Appending is the common case; a candle at an
    /// existing time replaces it. Returns the evicted candle, if any.
    pub fn push(&mut self, candle: Candle) -> Option<Candle> {
        match self.candles.last() {
            Some(last) if last.time == candle.time => {
                if let Some(slot) = self.candles.last_mut() {
                    *slot = candle;
                }
                None
            }
            Some(last) if last.time > candle.time => {
                self.merge(vec![candle]);
                None
            }
            _ => {
                self.candles.push(candle);
                if self.candles.len() > self.limit {
                    Some(self.candles.remove(0))
                } else {
                    None
                }
            }
        }
    }

    /// Removes and returns the newest candle.
    pub fn pop_last(&mut self) -> Option<Candle> {
        self.candles.pop()
    }

    pub fn last(&self) -> Option<&Candle> {
        self.candles.last()
    }

    pub fn as_slice(&self) -> &[Candle] {
        &self.candles
    }

    pub fn closes(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.close).collect()
    }

    pub fn times(&self) -> Vec<i64> {
        self.candles.iter().map(|c| c.time).collect()
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn clear(&mut self) {
        self.candles.clear();
    }

    fn enforce_limit(&mut self) -> usize {
        let excess = self.candles.len().saturating_sub(self.limit);
        if excess > 0 {
            self.candles.drain(..excess);
        }
        excess
    }
}
