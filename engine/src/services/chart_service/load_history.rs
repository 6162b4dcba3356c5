// Handler for ServiceEvent::HistoryLoaded
use super::ChartService;
use crate::error::{EngineError, EngineResult};
use shared::models::{Candle, SessionKey};

pub fn handle_history_loaded(
    service: &mut ChartService,
    generation: u64,
    key: SessionKey,
    result: EngineResult<Vec<Candle>>,
) {
    if generation != service.generation || &key != service.coordinator.key() {
        let stale = EngineError::StaleResponse {
            expected: service.generation,
            got: generation,
        };
        tracing::debug!(session = %service.session_id, key = %key, error = %stale, "Dropping history response");
        return;
    }

    let candles = match result {
        Ok(candles) => candles,
        Err(e) => {
            // Whatever is on the chart stays there.
            tracing::warn!(session = %service.session_id, key = %key, generation, transient = e.is_transient(), error = %e, "History fetch failed");
            return;
        }
    };

    match service.coordinator.load_history(candles) {
        Ok(frame) => {
            tracing::info!(
                session = %service.session_id,
                pair = %key.pair,
                interval = %key.interval,
                strategy = %key.strategy,
                generation,
                signals = frame.signals.len(),
                "History applied"
            );
            service.publish(&frame);
        }
        Err(e) => {
            tracing::warn!(session = %service.session_id, key = %key, error = %e, "Failed to apply history");
        }
    }
}
