// Incremental update coordinator
//
// Owns one session's candles, the forming candle, the computed lines and the
// signal book. Sealed candles trigger a full recompute and re-detection;
// ticks inside the forming candle only evaluate the hypothetical tail.
pub mod signal_book;
pub mod tail;

pub use signal_book::SignalBook;
pub use tail::{advance_line, evaluate_line, extend_line, EvaluatedLine, TailState};

use crate::data::CandleBuffer;
use crate::error::EngineResult;
use crate::indicators::EmaSeed;
use crate::signals::{check_transition, detect};
use crate::strategies::{LineSpec, StrategyCatalog, StrategyDescriptor};
use shared::models::{Candle, IndicatorLine, PriceTick, RenderFrame, SessionKey, Signal};
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

pub const DEFAULT_HISTORY_LIMIT: usize = 1000;
pub const DEFAULT_PENDING_TICK_LIMIT: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorConfig {
    pub history_limit: usize,
    pub pending_tick_limit: usize,
    pub ema_seed: EmaSeed,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        CoordinatorConfig {
            history_limit: DEFAULT_HISTORY_LIMIT,
            pending_tick_limit: DEFAULT_PENDING_TICK_LIMIT,
            ema_seed: EmaSeed::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No history yet; ticks are queued.
    Uninitialized,
    /// History loaded, no forming candle.
    Loaded,
    /// A forming candle is being updated by ticks.
    Streaming,
}

#[derive(Debug, Clone)]
struct LineRuntime {
    spec: LineSpec,
    values: Vec<f64>,
    state: TailState,
    /// Value at the forming candle, if one exists.
    tail: Option<f64>,
}

impl LineRuntime {
    fn previous(&self) -> Option<f64> {
        self.values.last().copied()
    }

    /// Appends the sealed close's value and drops the oldest one, keeping
    /// the values aligned with a full buffer.
    fn roll(&mut self, closes: &[f64], close: f64, seed: EmaSeed) {
        let (value, state) = advance_line(&self.spec.source, &self.state, closes, close, seed);
        if !self.values.is_empty() {
            self.values.remove(0);
        }
        self.values.push(value);
        self.state = state;
        self.tail = None;
    }
}

#[derive(Debug, Clone)]
struct ComputedPair {
    fast: LineRuntime,
    slow: LineRuntime,
    closes: Vec<f64>,
}

pub struct Coordinator {
    key: SessionKey,
    catalog: Arc<StrategyCatalog>,
    strategy: StrategyDescriptor,
    config: CoordinatorConfig,
    state: SessionState,
    history: CandleBuffer,
    forming: Option<Candle>,
    lines: Option<ComputedPair>,
    book: SignalBook,
    pending: VecDeque<PriceTick>,
    /// Earliest candle the lines were ever seeded from.
    window_origin: Option<i64>,
    /// Newest candle already covered by detection.
    detected_through: Option<i64>,
}

impl Coordinator {
    pub fn new(key: SessionKey, catalog: Arc<StrategyCatalog>, config: CoordinatorConfig) -> EngineResult<Self> {
        let strategy = catalog.get(&key.strategy)?.clone();
        Ok(Coordinator {
            key,
            catalog,
            strategy,
            history: CandleBuffer::new(config.history_limit),
            config,
            state: SessionState::Uninitialized,
            forming: None,
            lines: None,
            book: SignalBook::new(),
            pending: VecDeque::new(),
            window_origin: None,
            detected_through: None,
        })
    }

    pub fn key(&self) -> &SessionKey {
        &self.key
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn strategy(&self) -> &StrategyDescriptor {
        &self.strategy
    }

    pub fn history(&self) -> &[Candle] {
        self.history.as_slice()
    }

    pub fn forming(&self) -> Option<&Candle> {
        self.forming.as_ref()
    }

    pub fn signals(&self) -> &[Signal] {
        self.book.as_slice()
    }

    pub fn pending_ticks(&self) -> usize {
        self.pending.len()
    }

    /// Discards everything and starts over for `key`. An unknown strategy is
    /// rejected before any state is touched.
    pub fn reset(&mut self, key: SessionKey) -> EngineResult<()> {
        let strategy = self.catalog.get(&key.strategy)?.clone();
        tracing::info!(from = %self.key, to = %key, "Resetting chart session");
        self.key = key;
        self.strategy = strategy;
        self.state = SessionState::Uninitialized;
        self.history = CandleBuffer::new(self.config.history_limit);
        self.forming = None;
        self.lines = None;
        self.book.clear();
        self.pending.clear();
        self.window_origin = None;
        self.detected_through = None;
        Ok(())
    }

    /// Installs the initial history, runs the batch path and replays queued ticks.
    /// On an already loaded session this is a merge.
    pub fn load_history(&mut self, candles: Vec<Candle>) -> EngineResult<RenderFrame> {
        if self.state != SessionState::Uninitialized {
            return self.merge_history(candles);
        }
        self.history = CandleBuffer::from_candles(candles, self.config.history_limit);
        self.state = SessionState::Loaded;
        self.recompute()?;
        tracing::info!(
            pair = %self.key.pair,
            interval = %self.key.interval,
            strategy = %self.key.strategy,
            candles = self.history.len(),
            signals = self.book.len(),
            "History loaded"
        );

        let queued: Vec<PriceTick> = self.pending.drain(..).collect();
        if !queued.is_empty() {
            tracing::debug!(count = queued.len(), "Replaying ticks received before history");
        }
        for tick in queued {
            self.apply_tick(tick)?;
        }
        Ok(self.frame())
    }

    /// Folds a re-fetched batch into the loaded history (newer wins on equal
    /// time) and reruns the batch path. The live forming candle takes
    /// precedence over fetched candles at or after its bucket.
    pub fn merge_history(&mut self, candles: Vec<Candle>) -> EngineResult<RenderFrame> {
        if self.state == SessionState::Uninitialized {
            return self.load_history(candles);
        }
        let evicted = self.history.merge(candles);
        if let Some(forming) = self.forming {
            while self.history.last().is_some_and(|c| c.time >= forming.time) {
                self.history.pop_last();
            }
        }
        self.recompute()?;
        self.tail_check();
        tracing::debug!(candles = self.history.len(), evicted, signals = self.book.len(), "History merged");
        Ok(self.frame())
    }

    /// Feeds one live price. Returns the frame to publish, or `None` when the
    /// tick was queued or dropped.
    pub fn on_tick(&mut self, tick: PriceTick) -> EngineResult<Option<RenderFrame>> {
        if !tick.value.is_finite() || tick.value <= 0.0 {
            tracing::warn!(time = tick.time, value = tick.value, "Ignoring invalid tick price");
            return Ok(None);
        }
        if self.state == SessionState::Uninitialized {
            if self.pending.len() >= self.config.pending_tick_limit.max(1) {
                self.pending.pop_front();
                tracing::debug!(limit = self.config.pending_tick_limit, "Pending tick queue full, dropping oldest");
            }
            self.pending.push_back(tick);
            return Ok(None);
        }
        if self.apply_tick(tick)? {
            Ok(Some(self.frame()))
        } else {
            Ok(None)
        }
    }

    // Returns whether anything changed.
    fn apply_tick(&mut self, tick: PriceTick) -> EngineResult<bool> {
        let bucket = self.key.interval.bucket_start(tick.time);
        let price = tick.value;

        match self.forming {
            Some(forming) if bucket == forming.time => {
                let mut updated = forming;
                updated.absorb(price);
                self.forming = Some(updated);
            }
            Some(forming) if bucket < forming.time => {
                tracing::debug!(bucket, forming = forming.time, "Dropping late tick");
                return Ok(false);
            }
            Some(forming) => {
                let evicted = self.history.push(forming);
                tracing::debug!(time = forming.time, close = forming.close, "Sealed candle");
                self.forming = Some(Candle::from_price(bucket, price));
                match evicted {
                    Some(evicted) => {
                        tracing::debug!(time = evicted.time, "Evicted oldest candle");
                        self.roll_forward(forming);
                    }
                    None => self.recompute()?,
                }
            }
            None => match self.history.last().copied() {
                Some(last) if bucket < last.time => {
                    tracing::debug!(bucket, last = last.time, "Dropping tick older than history");
                    return Ok(false);
                }
                Some(last) if bucket == last.time => {
                    // The fetch already contained the current interval; keep building it.
                    self.history.pop_last();
                    let mut reopened = last;
                    reopened.absorb(price);
                    self.forming = Some(reopened);
                    self.recompute()?;
                }
                _ => {
                    self.forming = Some(Candle::from_price(bucket, price));
                }
            },
        }

        self.state = SessionState::Streaming;
        self.tail_check();
        Ok(true)
    }

    /// Batch path: every line over the sealed history, then full detection.
    fn recompute(&mut self) -> EngineResult<()> {
        let Some(pair) = self.strategy.lines.clone() else {
            self.lines = None;
            return Ok(());
        };
        let closes = self.history.closes();
        let seed = self.config.ema_seed;
        let fast = evaluate_line(&pair.fast.source, &closes, seed)?;
        let slow = evaluate_line(&pair.slow.source, &closes, seed)?;

        let floor = self.detection_floor();
        let detected = detect(self.history.as_slice(), &fast.values, &slow.values, self.strategy.kind)
            .into_iter()
            .filter(|signal| floor.map_or(true, |time| signal.time > time));
        let added = self.book.extend(detected);
        self.detected_through = self.history.last().map(|c| c.time);
        if added > 0 {
            tracing::debug!(added, total = self.book.len(), "Batch detection added signals");
        }

        self.lines = Some(ComputedPair {
            fast: LineRuntime {
                spec: pair.fast,
                values: fast.values,
                state: fast.state,
                tail: None,
            },
            slow: LineRuntime {
                spec: pair.slow,
                values: slow.values,
                state: slow.state,
                tail: None,
            },
            closes,
        });
        Ok(())
    }

    /// Lower time bound for batch detections. While the window still starts
    /// at (or before) the earliest candle seen, everything is eligible. Once
    /// eviction or a merge has moved the start forward, EMA-based lines are
    /// reseeded at a later close and only candles newer than the last pass
    /// count.
    fn detection_floor(&mut self) -> Option<i64> {
        let first = self.history.as_slice().first()?.time;
        match self.window_origin {
            Some(origin) if first > origin => self.detected_through,
            _ => {
                self.window_origin = Some(first);
                None
            }
        }
    }

    /// Seal into a full buffer: each line continues its recurrence from the
    /// stored state instead of reseeding at the new first candle, and only
    /// the sealed candle is tested.
    fn roll_forward(&mut self, sealed: Candle) {
        let seed = self.config.ema_seed;
        let kind = self.strategy.kind;
        let index = self.history.len().saturating_sub(1);
        self.detected_through = Some(sealed.time);
        let Some(lines) = self.lines.as_mut() else {
            return;
        };

        let previous = (lines.fast.previous(), lines.slow.previous());
        lines.fast.roll(&lines.closes, sealed.close, seed);
        lines.slow.roll(&lines.closes, sealed.close, seed);
        if !lines.closes.is_empty() {
            lines.closes.remove(0);
        }
        lines.closes.push(sealed.close);

        let (Some(prev_fast), Some(prev_slow)) = previous else {
            return;
        };
        let (Some(fast), Some(slow)) = (lines.fast.previous(), lines.slow.previous()) else {
            return;
        };
        if let Some(side) = check_transition(prev_fast, prev_slow, fast, slow, kind) {
            if self.book.insert(Signal::new(side, &sealed, index)) {
                tracing::debug!(side = side.as_str(), time = sealed.time, "Sealed candle confirmed signal");
            }
        }
    }

    /// Tail path: evaluate both lines at the forming candle and test the
    /// newest transition only.
    fn tail_check(&mut self) {
        let (Some(forming), Some(lines)) = (self.forming, self.lines.as_mut()) else {
            return;
        };
        let seed = self.config.ema_seed;
        let fast = extend_line(&lines.fast.spec.source, &lines.fast.state, &lines.closes, forming.close, seed);
        let slow = extend_line(&lines.slow.spec.source, &lines.slow.state, &lines.closes, forming.close, seed);
        lines.fast.tail = Some(fast);
        lines.slow.tail = Some(slow);

        let (Some(prev_fast), Some(prev_slow)) = (lines.fast.previous(), lines.slow.previous()) else {
            return;
        };
        if let Some(side) = check_transition(prev_fast, prev_slow, fast, slow, self.strategy.kind) {
            let signal = Signal::new(side, &forming, self.history.len());
            if self.book.insert(signal) {
                tracing::debug!(side = side.as_str(), time = forming.time, price = forming.close, "Tail check found signal");
            }
        }
    }

    /// Snapshot for the render boundary. Lines include the forming candle's
    /// hypothetical point when one exists.
    pub fn frame(&self) -> RenderFrame {
        let mut lines = BTreeMap::new();
        if let Some(computed) = &self.lines {
            let mut times = self.history.times();
            if let Some(forming) = &self.forming {
                times.push(forming.time);
            }
            for line in [&computed.fast, &computed.slow] {
                let mut values = line.values.clone();
                if self.forming.is_some() {
                    values.push(line.tail.unwrap_or(f64::NAN));
                }
                let rendered =
                    IndicatorLine::from_series(&line.spec.name, line.spec.source.parameters(), &times, &values);
                lines.insert(line.spec.name.clone(), rendered);
            }
        }
        RenderFrame {
            key: self.key.clone(),
            lines,
            signals: self.book.as_slice().to_vec(),
            forming: self.forming,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::{LineSource, StrategyKind};
    use shared::models::{Interval, Side};

    fn catalog() -> Arc<StrategyCatalog> {
        let fast_slow = StrategyDescriptor::crossover(
            "sma_2_3",
            "SMA 2/3",
            "",
            StrategyKind::MaCross,
            LineSpec::new("Fast", LineSource::Sma { period: 2 }),
            LineSpec::new("Slow", LineSource::Sma { period: 3 }),
        );
        Arc::new(StrategyCatalog::with_extra(vec![fast_slow]).unwrap())
    }

    fn coordinator(strategy: &str) -> Coordinator {
        let key = SessionKey::new("BTC", "USDT", Interval::Minute1, strategy);
        Coordinator::new(key, catalog(), CoordinatorConfig::default()).unwrap()
    }

    fn candles(closes: &[f64]) -> Vec<Candle> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Candle::from_price(i as i64 * 60, c))
            .collect()
    }

    fn tick(time: i64, value: f64) -> PriceTick {
        PriceTick { time, value }
    }

    #[test]
    fn test_unknown_strategy_is_rejected() {
        let key = SessionKey::new("BTC", "USDT", Interval::Minute1, "does_not_exist");
        assert!(Coordinator::new(key, catalog(), CoordinatorConfig::default()).is_err());
    }

    #[test]
    fn test_three_ticks_then_next_bucket_seal_one_candle() {
        let mut c = coordinator("none");
        c.load_history(Vec::new()).unwrap();

        c.on_tick(tick(600, 10.0)).unwrap();
        c.on_tick(tick(615, 12.0)).unwrap();
        c.on_tick(tick(659, 9.0)).unwrap();
        assert!(c.history().is_empty());

        c.on_tick(tick(660, 11.0)).unwrap();
        assert_eq!(c.history().len(), 1);
        let sealed = c.history()[0];
        assert_eq!(sealed.time, 600);
        assert_eq!((sealed.open, sealed.high, sealed.low, sealed.close), (10.0, 12.0, 9.0, 9.0));
        let forming = c.forming().unwrap();
        assert_eq!(forming.time, 660);
        assert_eq!((forming.open, forming.high, forming.low, forming.close), (11.0, 11.0, 11.0, 11.0));
        assert_eq!(c.state(), SessionState::Streaming);
    }

    #[test]
    fn test_load_history_runs_batch_detection() {
        let mut c = coordinator("sma_2_3");
        // fast SMA(2) crosses above slow SMA(3) when the series turns up
        let frame = c.load_history(candles(&[10.0, 9.0, 8.0, 7.0, 9.0, 12.0])).unwrap();
        assert_eq!(c.state(), SessionState::Loaded);
        assert_eq!(frame.signals.len(), 1);
        assert_eq!(frame.signals[0].side, Side::Buy);
        // SMA(2) only touches SMA(3) at index 4 and crosses at index 5
        assert_eq!(frame.signals[0].time, 5 * 60);
        assert_eq!(frame.lines.len(), 2);
        assert_eq!(frame.lines["Fast"].points.len(), 6);
        assert_eq!(frame.lines["Fast"].points[0].value, None);
        assert!(frame.forming.is_none());
    }

    #[test]
    fn test_load_history_sorts_dedupes_and_caps() {
        let key = SessionKey::new("BTC", "USDT", Interval::Minute1, "none");
        let config = CoordinatorConfig {
            history_limit: 3,
            ..CoordinatorConfig::default()
        };
        let mut c = Coordinator::new(key, catalog(), config).unwrap();
        let mut input = candles(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        input.reverse();
        input.push(Candle::from_price(240, 50.0));
        c.load_history(input).unwrap();
        let times: Vec<i64> = c.history().iter().map(|c| c.time).collect();
        assert_eq!(times, vec![120, 180, 240]);
        assert_eq!(c.history()[2].close, 50.0);
    }

    #[test]
    fn test_tail_check_emits_signal_once() {
        let mut c = coordinator("sma_2_3");
        c.load_history(candles(&[10.0, 9.0, 8.0, 7.0])).unwrap();
        assert!(c.signals().is_empty());

        // forming candle at 240: price jump makes fast cross above slow
        let frame = c.on_tick(tick(240, 12.0)).unwrap().unwrap();
        assert_eq!(frame.signals.len(), 1);
        assert_eq!(frame.signals[0].side, Side::Buy);
        assert_eq!(frame.signals[0].time, 240);
        assert_eq!(frame.signals[0].source_index, 4);

        // same bucket, still above: no duplicate
        c.on_tick(tick(250, 13.0)).unwrap();
        assert_eq!(c.signals().len(), 1);

        // sealing confirms the same crossing in batch mode without duplicating it
        c.on_tick(tick(300, 13.0)).unwrap();
        assert_eq!(c.history().len(), 5);
        assert_eq!(c.signals().len(), 1);
    }

    #[test]
    fn test_frame_includes_hypothetical_point() {
        let mut c = coordinator("sma_2_3");
        c.load_history(candles(&[10.0, 11.0, 12.0])).unwrap();
        let frame = c.on_tick(tick(180, 14.0)).unwrap().unwrap();
        let fast = &frame.lines["Fast"];
        assert_eq!(fast.points.len(), 4);
        assert_eq!(fast.points[3].time, 180);
        assert_eq!(fast.points[3].value, Some(13.0));
        assert_eq!(frame.forming.map(|f| f.close), Some(14.0));
    }

    #[test]
    fn test_tail_values_match_batch_after_seal() {
        let mut c = coordinator("ema_crossover");
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + (i as f64 * 0.5).sin() * 3.0).collect();
        c.load_history(candles(&closes)).unwrap();
        let before = c.on_tick(tick(40 * 60 + 5, 101.5)).unwrap().unwrap();
        let after = c.on_tick(tick(41 * 60, 102.0)).unwrap().unwrap();
        for name in ["Fast EMA (9)", "Slow EMA (21)"] {
            let tail = before.lines[name].points[40].value.unwrap();
            let batch = after.lines[name].points[40].value.unwrap();
            assert_eq!(tail.to_bits(), batch.to_bits());
        }
    }

    #[test]
    fn test_late_tick_is_dropped() {
        let mut c = coordinator("none");
        c.load_history(candles(&[1.0, 2.0])).unwrap();
        assert!(c.on_tick(tick(180, 3.0)).unwrap().is_some());
        assert!(c.on_tick(tick(100, 9.0)).unwrap().is_none());
        assert_eq!(c.forming().map(|f| f.high), Some(3.0));
        assert_eq!(c.history().len(), 2);
    }

    #[test]
    fn test_tick_older_than_history_is_dropped() {
        let mut c = coordinator("none");
        c.load_history(candles(&[1.0, 2.0, 3.0])).unwrap();
        assert!(c.on_tick(tick(30, 9.0)).unwrap().is_none());
        assert!(c.forming().is_none());
        assert_eq!(c.state(), SessionState::Loaded);
    }

    #[test]
    fn test_tick_in_last_history_bucket_reopens_candle() {
        let mut c = coordinator("none");
        let mut history = candles(&[1.0, 2.0]);
        history[1].high = 2.5;
        c.load_history(history).unwrap();

        c.on_tick(tick(70, 3.0)).unwrap();
        assert_eq!(c.history().len(), 1);
        let forming = c.forming().unwrap();
        assert_eq!(forming.time, 60);
        assert_eq!(forming.open, 2.0);
        assert_eq!(forming.high, 3.0);
        assert_eq!(forming.close, 3.0);
    }

    #[test]
    fn test_ticks_before_history_are_replayed() {
        let mut c = coordinator("none");
        assert!(c.on_tick(tick(120, 5.0)).unwrap().is_none());
        assert!(c.on_tick(tick(130, 6.0)).unwrap().is_none());
        assert_eq!(c.pending_ticks(), 2);

        let frame = c.load_history(candles(&[1.0, 2.0])).unwrap();
        assert_eq!(c.pending_ticks(), 0);
        assert_eq!(c.state(), SessionState::Streaming);
        let forming = frame.forming.unwrap();
        assert_eq!((forming.time, forming.open, forming.close), (120, 5.0, 6.0));
    }

    #[test]
    fn test_pending_queue_is_bounded() {
        let key = SessionKey::new("BTC", "USDT", Interval::Minute1, "none");
        let config = CoordinatorConfig {
            pending_tick_limit: 2,
            ..CoordinatorConfig::default()
        };
        let mut c = Coordinator::new(key, catalog(), config).unwrap();
        for t in 0..5 {
            c.on_tick(tick(t, 1.0 + t as f64)).unwrap();
        }
        assert_eq!(c.pending_ticks(), 2);
        c.load_history(Vec::new()).unwrap();
        // oldest ticks dropped: the candle opens at the fourth tick's price
        assert_eq!(c.forming().map(|f| f.open), Some(4.0));
    }

    #[test]
    fn test_invalid_tick_price_ignored() {
        let mut c = coordinator("none");
        c.load_history(Vec::new()).unwrap();
        assert!(c.on_tick(tick(0, f64::NAN)).unwrap().is_none());
        assert!(c.on_tick(tick(0, -1.0)).unwrap().is_none());
        assert!(c.forming().is_none());
    }

    #[test]
    fn test_rolling_buffer_evicts_on_seal() {
        let key = SessionKey::new("BTC", "USDT", Interval::Minute1, "none");
        let config = CoordinatorConfig {
            history_limit: 2,
            ..CoordinatorConfig::default()
        };
        let mut c = Coordinator::new(key, catalog(), config).unwrap();
        c.load_history(candles(&[1.0, 2.0])).unwrap();
        c.on_tick(tick(120, 3.0)).unwrap();
        c.on_tick(tick(180, 4.0)).unwrap();
        let times: Vec<i64> = c.history().iter().map(|c| c.time).collect();
        assert_eq!(times, vec![60, 120]);
    }

    fn full_buffer(strategy: &str, limit: usize) -> Coordinator {
        let key = SessionKey::new("BTC", "USDT", Interval::Minute1, strategy);
        let config = CoordinatorConfig {
            history_limit: limit,
            ..CoordinatorConfig::default()
        };
        Coordinator::new(key, catalog(), config).unwrap()
    }

    fn signal_keys(c: &Coordinator) -> Vec<(i64, Side)> {
        c.signals().iter().map(|s| s.key()).collect()
    }

    #[test]
    fn test_sealing_into_full_buffer_keeps_signals() {
        let mut c = full_buffer("ema_crossover", 50);
        let rising: Vec<f64> = (0..70).map(|i| 100.0 + i as f64).collect();
        c.load_history(candles(&rising[..50])).unwrap();
        assert_eq!(signal_keys(&c), vec![(60, Side::Buy)]);

        for (i, price) in rising[50..].iter().enumerate() {
            c.on_tick(tick((50 + i as i64) * 60, *price)).unwrap();
        }
        assert_eq!(c.history().len(), 50);
        assert_eq!(c.history()[0].time, 19 * 60);
        assert_eq!(signal_keys(&c), vec![(60, Side::Buy)]);

        // a re-fetch of the same window does not reseed old crossings either
        c.merge_history(c.history().to_vec()).unwrap();
        assert_eq!(signal_keys(&c), vec![(60, Side::Buy)]);
    }

    #[test]
    fn test_full_buffer_still_detects_new_crossing() {
        let mut c = full_buffer("ema_crossover", 50);
        let rising: Vec<f64> = (0..50).map(|i| 100.0 + i as f64).collect();
        c.load_history(candles(&rising)).unwrap();

        for i in 0..20i64 {
            c.on_tick(tick((50 + i) * 60, 149.0 - 5.0 * i as f64)).unwrap();
        }
        let keys = signal_keys(&c);
        assert_eq!(keys.len(), 2);
        assert_eq!(keys[0], (60, Side::Buy));
        assert_eq!(keys[1].1, Side::Sell);
        assert!(keys[1].0 >= 50 * 60);
    }

    #[test]
    fn test_rolled_lines_continue_unbounded_series() {
        let closes: Vec<f64> = (0..80).map(|i| 100.0 + (i as f64 * 0.3).sin() * 4.0).collect();
        let mut rolled = full_buffer("macd", 40);
        let mut unbounded = full_buffer("macd", 1000);
        for c in [&mut rolled, &mut unbounded] {
            c.load_history(candles(&closes[..40])).unwrap();
            for (i, price) in closes[40..].iter().enumerate() {
                c.on_tick(tick((40 + i as i64) * 60, *price)).unwrap();
            }
        }
        let a = rolled.frame();
        let b = unbounded.frame();
        for name in ["MACD", "MACD Signal"] {
            let tail_a: Vec<Option<f64>> = a.lines[name].points.iter().map(|p| p.value).collect();
            let tail_b: Vec<Option<f64>> = b.lines[name].points.iter().rev().take(tail_a.len()).rev().map(|p| p.value).collect();
            assert_eq!(tail_a, tail_b, "{}", name);
        }
        assert_eq!(signal_keys(&rolled).last(), signal_keys(&unbounded).last());
    }

    #[test]
    fn test_merge_history_newer_wins_and_keeps_forming() {
        let mut c = coordinator("sma_2_3");
        c.load_history(candles(&[1.0, 2.0, 3.0])).unwrap();
        c.on_tick(tick(180, 4.0)).unwrap();

        let refetch = candles(&[1.0, 2.5, 3.0, 3.9]);
        let frame = c.merge_history(refetch).unwrap();
        assert_eq!(c.history().len(), 3);
        assert_eq!(c.history()[1].close, 2.5);
        // the fetched candle at 180 does not replace the live one
        assert_eq!(frame.forming.map(|f| f.close), Some(4.0));
    }

    #[test]
    fn test_reset_returns_to_uninitialized() {
        let mut c = coordinator("sma_2_3");
        c.load_history(candles(&[10.0, 9.0, 8.0, 7.0, 9.0, 12.0])).unwrap();
        assert!(!c.signals().is_empty());

        let next = SessionKey::new("ETH", "USDT", Interval::Minute5, "macd");
        c.reset(next.clone()).unwrap();
        assert_eq!(c.state(), SessionState::Uninitialized);
        assert_eq!(c.key(), &next);
        assert!(c.signals().is_empty());
        assert!(c.history().is_empty());
        assert_eq!(c.strategy().kind, StrategyKind::MacdCross);
    }

    #[test]
    fn test_reset_to_unknown_strategy_keeps_state() {
        let mut c = coordinator("sma_2_3");
        c.load_history(candles(&[1.0, 2.0, 3.0])).unwrap();
        let bad = SessionKey::new("BTC", "USDT", Interval::Minute1, "nope");
        assert!(c.reset(bad).is_err());
        assert_eq!(c.state(), SessionState::Loaded);
        assert_eq!(c.history().len(), 3);
    }

    #[test]
    fn test_none_strategy_has_no_lines() {
        let mut c = coordinator("none");
        let frame = c.load_history(candles(&[1.0, 2.0, 3.0])).unwrap();
        assert!(frame.lines.is_empty());
        assert!(frame.signals.is_empty());
    }
}
