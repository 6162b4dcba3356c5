// Collaborator boundary: where candles and live prices come from
use crate::error::{EngineError, EngineResult};
use async_trait::async_trait;
use shared::models::{Candle, Interval, PriceTick, SessionKey};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

pub type TickCallback = Arc<dyn Fn(PriceTick) + Send + Sync>;

#[async_trait]
pub trait CandleSource: Send + Sync {
    /// Historical candles for the key's market and interval, oldest first.
    async fn fetch_history(&self, key: &SessionKey) -> EngineResult<Vec<Candle>>;
}

pub trait TickSource: Send + Sync {
    /// Starts delivering ticks for the key's market. Delivery stops when the
    /// returned `Subscription` is dropped.
    fn subscribe(&self, key: &SessionKey, callback: TickCallback) -> EngineResult<Subscription>;
}

#[async_trait]
pub trait PriceFeed: Send + Sync {
    async fn latest_price(&self, pair: &str, base: &str) -> EngineResult<f64>;
}

/// Handle to a running tick delivery task.
pub struct Subscription {
    active: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    pub fn new(active: Arc<AtomicBool>, task: JoinHandle<()>) -> Self {
        Subscription {
            active,
            task: Some(task),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.active.store(false, Ordering::SeqCst);
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("active", &self.is_active()).finish()
    }
}

fn spawn_guarded<F>(future: F) -> EngineResult<JoinHandle<()>>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let handle = tokio::runtime::Handle::try_current()
        .map_err(|_| EngineError::ConfigError("tick subscriptions need a running tokio runtime".to_string()))?;
    Ok(handle.spawn(future))
}

fn now_seconds() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Polls a `PriceFeed` on a fixed interval and turns each answer into a tick.
pub struct PollingTickSource {
    feed: Arc<dyn PriceFeed>,
    period: Duration,
}

impl PollingTickSource {
    pub fn new(feed: Arc<dyn PriceFeed>, period: Duration) -> Self {
        PollingTickSource { feed, period }
    }
}

impl TickSource for PollingTickSource {
    fn subscribe(&self, key: &SessionKey, callback: TickCallback) -> EngineResult<Subscription> {
        let active = Arc::new(AtomicBool::new(true));
        let flag = active.clone();
        let feed = self.feed.clone();
        let period = self.period;
        let pair = key.pair.clone();
        let base = key.base.clone();

        let task = spawn_guarded(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if !flag.load(Ordering::SeqCst) {
                    break;
                }
                match feed.latest_price(&pair, &base).await {
                    Ok(price) if price.is_finite() && price > 0.0 => {
                        if flag.load(Ordering::SeqCst) {
                            callback(PriceTick {
                                time: now_seconds(),
                                value: price,
                            });
                        }
                    }
                    Ok(price) => {
                        tracing::warn!(pair = %pair, base = %base, price, "Ignoring non-positive price from feed");
                    }
                    Err(e) => {
                        tracing::warn!(pair = %pair, base = %base, error = %e, "Price poll failed, skipping");
                    }
                }
            }
        })?;

        tracing::debug!(pair = %key.pair, base = %key.base, period_ms = self.period.as_millis() as u64, "Polling subscription started");
        Ok(Subscription::new(active, task))
    }
}

/// A tick pushed by a streaming feed, tagged with its market.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketTick {
    pub pair: String,
    pub base: String,
    pub tick: PriceTick,
}

/// Fans pushed ticks out to subscribers of the matching market.
pub struct BroadcastTickSource {
    sender: broadcast::Sender<MarketTick>,
}

impl BroadcastTickSource {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        BroadcastTickSource { sender }
    }

    /// Publishes a tick; returns how many subscribers were listening.
    pub fn publish(&self, pair: &str, base: &str, tick: PriceTick) -> usize {
        let message = MarketTick {
            pair: pair.to_uppercase(),
            base: base.to_uppercase(),
            tick,
        };
        self.sender.send(message).unwrap_or(0)
    }

    pub fn sender(&self) -> broadcast::Sender<MarketTick> {
        self.sender.clone()
    }
}

impl TickSource for BroadcastTickSource {
    fn subscribe(&self, key: &SessionKey, callback: TickCallback) -> EngineResult<Subscription> {
        let active = Arc::new(AtomicBool::new(true));
        let flag = active.clone();
        let mut receiver = self.sender.subscribe();
        let pair = key.pair.clone();
        let base = key.base.clone();

        let task = spawn_guarded(async move {
            loop {
                match receiver.recv().await {
                    Ok(message) => {
                        if !flag.load(Ordering::SeqCst) {
                            break;
                        }
                        if message.pair == pair && message.base == base {
                            callback(message.tick);
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(pair = %pair, base = %base, skipped, "Tick subscriber lagged behind the feed");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })?;

        Ok(Subscription::new(active, task))
    }
}

type MarketId = (String, String, Interval);

#[derive(Debug, Clone, Default)]
struct StaticEntry {
    candles: Vec<Candle>,
    delay: Duration,
    failure: Option<String>,
}

/// In-memory candle source. Optional per-market delay and failure make it
/// usable for exercising out-of-order and failed fetches.
#[derive(Debug, Default)]
pub struct StaticCandleSource {
    entries: HashMap<MarketId, StaticEntry>,
    fetches: AtomicUsize,
}

impl StaticCandleSource {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&mut self, pair: &str, base: &str, interval: Interval) -> &mut StaticEntry {
        self.entries
            .entry((pair.to_uppercase(), base.to_uppercase(), interval))
            .or_default()
    }

    pub fn with_candles(mut self, pair: &str, base: &str, interval: Interval, candles: Vec<Candle>) -> Self {
        self.entry(pair, base, interval).candles = candles;
        self
    }

    pub fn with_delay(mut self, pair: &str, base: &str, interval: Interval, delay: Duration) -> Self {
        self.entry(pair, base, interval).delay = delay;
        self
    }

    pub fn with_failure(mut self, pair: &str, base: &str, interval: Interval, message: &str) -> Self {
        self.entry(pair, base, interval).failure = Some(message.to_string());
        self
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CandleSource for StaticCandleSource {
    async fn fetch_history(&self, key: &SessionKey) -> EngineResult<Vec<Candle>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let id = (key.pair.clone(), key.base.clone(), key.interval);
        let entry = self.entries.get(&id).cloned().unwrap_or_default();
        if !entry.delay.is_zero() {
            tokio::time::sleep(entry.delay).await;
        }
        match entry.failure {
            Some(message) => Err(EngineError::NetworkError(message)),
            None => Ok(entry.candles),
        }
    }
}
