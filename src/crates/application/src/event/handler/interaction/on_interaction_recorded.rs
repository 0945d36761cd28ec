use crate::event::event_bus::{EventEnvelope, Handler};
use domain::event::DomainEvent;
use domain::interaction::InteractionEvent;
use log::info;
use std::sync::atomic::{AtomicU64, Ordering};

/// 把行为事件写入日志，下游消息系统接入前的默认订阅者
#[derive(Default)]
pub struct InteractionLogHandler {
    handled: AtomicU64,
}

impl InteractionLogHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handled(&self) -> u64 {
        self.handled.load(Ordering::Relaxed)
    }
}

#[async_trait::async_trait]
impl Handler<InteractionEvent> for InteractionLogHandler {
    async fn handle(&self, envelope: &EventEnvelope<InteractionEvent>) {
        self.handled.fetch_add(1, Ordering::Relaxed);
        let evt = &envelope.payload;
        match evt {
            InteractionEvent::Toggled {
                user_id,
                kind,
                target_id,
                ..
            } => info!(
                "[event] {} {} user={} target={} correlation={}",
                evt.name(),
                kind,
                user_id,
                target_id,
                envelope.correlation_id
            ),
            InteractionEvent::Played { video_id, user_id }
            | InteractionEvent::Shared { video_id, user_id } => info!(
                "[event] {} user={} video={} correlation={}",
                evt.name(),
                user_id,
                video_id,
                envelope.correlation_id
            ),
            InteractionEvent::Commented {
                video_id,
                user_id,
                comment_id,
            } => info!(
                "[event] {} user={} video={} comment={} correlation={}",
                evt.name(),
                user_id,
                video_id,
                comment_id,
                envelope.correlation_id
            ),
        }
    }
}
