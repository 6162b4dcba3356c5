// Handler for ServiceEvent::Select
use super::ChartService;
use shared::models::SessionKey;

pub fn handle_select(service: &mut ChartService, key: SessionKey) {
    if service.coordinator.key() == &key {
        tracing::debug!(session = %service.session_id, key = %key, "Session already selected");
        return;
    }
    match service.coordinator.reset(key.clone()) {
        Ok(()) => {
            tracing::info!(
                session = %service.session_id,
                pair = %key.pair,
                base = %key.base,
                interval = %key.interval,
                strategy = %key.strategy,
                "Session selected"
            );
            service.begin_session();
        }
        Err(e) => {
            tracing::warn!(session = %service.session_id, key = %key, error = %e, "Rejected session selection");
        }
    }
}
