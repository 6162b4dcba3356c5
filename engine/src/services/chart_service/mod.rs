// engine/src/services/chart_service/mod.rs
// Async shell around one Coordinator. A single task owns it; everything
// that mutates it arrives as a ServiceEvent and is handled in order.
use crate::coordinator::{Coordinator, CoordinatorConfig};
use crate::data::{CandleSource, Subscription, TickCallback, TickSource};
use crate::error::{EngineError, EngineResult};
use crate::services::render_sink::RenderSink;
use crate::strategies::StrategyCatalog;
use shared::models::{Candle, PriceTick, RenderFrame, SessionKey};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

pub mod load_history;
pub mod select_session;
pub mod stream_ticks;

#[derive(Debug)]
pub enum ServiceEvent {
    /// Switch pair, base, interval or strategy.
    Select(SessionKey),
    /// Re-fetch history for the current session and merge it.
    Reload,
    HistoryLoaded {
        generation: u64,
        key: SessionKey,
        result: EngineResult<Vec<Candle>>,
    },
    Tick {
        generation: u64,
        tick: PriceTick,
    },
    Shutdown,
}

pub struct ChartService {
    session_id: Uuid,
    coordinator: Coordinator,
    candles: Arc<dyn CandleSource>,
    ticks: Arc<dyn TickSource>,
    sink: Arc<dyn RenderSink>,
    generation: u64,
    subscription: Option<Subscription>,
    events: mpsc::UnboundedSender<ServiceEvent>,
}

/// Caller side of a running chart service.
pub struct ChartHandle {
    session_id: Uuid,
    events: mpsc::UnboundedSender<ServiceEvent>,
    task: JoinHandle<()>,
}

impl ChartService {
    /// Validates the initial key, then starts the event loop on the current
    /// tokio runtime. History for `key` is requested immediately.
    pub fn spawn(
        key: SessionKey,
        catalog: Arc<StrategyCatalog>,
        config: CoordinatorConfig,
        candles: Arc<dyn CandleSource>,
        ticks: Arc<dyn TickSource>,
        sink: Arc<dyn RenderSink>,
    ) -> EngineResult<ChartHandle> {
        let coordinator = Coordinator::new(key, catalog, config)?;
        let (events, rx) = mpsc::unbounded_channel();
        let service = ChartService {
            session_id: Uuid::new_v4(),
            coordinator,
            candles,
            ticks,
            sink,
            generation: 0,
            subscription: None,
            events: events.clone(),
        };
        let session_id = service.session_id;
        let task = tokio::spawn(service.run(rx));
        Ok(ChartHandle {
            session_id,
            events,
            task,
        })
    }

    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<ServiceEvent>) {
        tracing::info!(session = %self.session_id, key = %self.coordinator.key(), "Chart service started");
        self.begin_session();

        while let Some(event) = rx.recv().await {
            match event {
                ServiceEvent::Select(key) => select_session::handle_select(&mut self, key),
                ServiceEvent::Reload => {
                    tracing::info!(session = %self.session_id, key = %self.coordinator.key(), "Reloading history");
                    self.request_history();
                }
                ServiceEvent::HistoryLoaded { generation, key, result } => {
                    load_history::handle_history_loaded(&mut self, generation, key, result)
                }
                ServiceEvent::Tick { generation, tick } => stream_ticks::handle_tick(&mut self, generation, tick),
                ServiceEvent::Shutdown => break,
            }
        }

        self.subscription.take();
        tracing::info!(session = %self.session_id, "Chart service stopped");
    }

    /// New generation: drop the old subscription first, then subscribe and
    /// fetch for the current key.
    fn begin_session(&mut self) {
        self.generation += 1;
        if let Some(old) = self.subscription.take() {
            old.unsubscribe();
        }
        stream_ticks::subscribe(self);
        self.request_history();
    }

    fn request_history(&self) {
        let generation = self.generation;
        let key = self.coordinator.key().clone();
        let source = self.candles.clone();
        let events = self.events.clone();
        tracing::debug!(session = %self.session_id, key = %key, generation, "Requesting history");
        tokio::spawn(async move {
            let result = source.fetch_history(&key).await;
            // The loop may already be gone; nothing to report to.
            let _ = events.send(ServiceEvent::HistoryLoaded { generation, key, result });
        });
    }

    fn tick_callback(&self) -> TickCallback {
        let events = self.events.clone();
        let generation = self.generation;
        Arc::new(move |tick| {
            let _ = events.send(ServiceEvent::Tick { generation, tick });
        })
    }

    fn publish(&self, frame: &RenderFrame) {
        self.sink.render(frame);
    }
}

impl ChartHandle {
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn select(&self, key: SessionKey) -> EngineResult<()> {
        self.send(ServiceEvent::Select(key))
    }

    pub fn reload(&self) -> EngineResult<()> {
        self.send(ServiceEvent::Reload)
    }

    /// Stops the loop and waits for it to finish.
    pub async fn shutdown(self) -> EngineResult<()> {
        // Already stopped is fine.
        let _ = self.events.send(ServiceEvent::Shutdown);
        self.task
            .await
            .map_err(|e| EngineError::ChannelClosed(format!("chart service task failed: {}", e)))
    }

    fn send(&self, event: ServiceEvent) -> EngineResult<()> {
        self.events
            .send(event)
            .map_err(|_| EngineError::ChannelClosed("chart service is not running".to_string()))
    }
}
