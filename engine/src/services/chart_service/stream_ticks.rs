// Tick subscription and ServiceEvent::Tick handling
use super::ChartService;
use shared::models::PriceTick;

/// Subscribes for the current key. The callback is tagged with the current
/// generation so ticks from an older subscription can be told apart.
pub fn subscribe(service: &mut ChartService) {
    let key = service.coordinator.key().clone();
    match service.ticks.subscribe(&key, service.tick_callback()) {
        Ok(subscription) => {
            tracing::debug!(session = %service.session_id, key = %key, generation = service.generation, "Subscribed to ticks");
            service.subscription = Some(subscription);
        }
        Err(e) => {
            tracing::warn!(session = %service.session_id, key = %key, error = %e, "Tick subscription failed");
        }
    }
}

pub fn handle_tick(service: &mut ChartService, generation: u64, tick: PriceTick) {
    if generation != service.generation {
        tracing::debug!(session = %service.session_id, got = generation, expected = service.generation, "Dropping tick from previous session");
        return;
    }
    match service.coordinator.on_tick(tick) {
        Ok(Some(frame)) => service.publish(&frame),
        Ok(None) => {}
        Err(e) => {
            tracing::warn!(session = %service.session_id, time = tick.time, error = %e, "Tick processing failed");
        }
    }
}
