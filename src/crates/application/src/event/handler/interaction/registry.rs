use super::on_interaction_recorded::InteractionLogHandler;
use crate::event::event_bus::EventBus;
use domain::interaction::InteractionEvent;
use std::sync::Arc;

pub async fn register_handlers<B: EventBus + Clone + 'static>(bus: &mut B) -> Arc<InteractionLogHandler> {
    let handler = Arc::new(InteractionLogHandler::new());
    bus.subscribe::<InteractionEvent>(handler.clone()).await;
    handler
}
