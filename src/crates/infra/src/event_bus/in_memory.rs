use application::error::AppError;
use application::event::event_bus::EventEnvelope;
use application::event::event_bus::{ErasedHandler, EventBus, Handler};
use async_trait::async_trait;
use futures::future::join_all;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// 桥接，将 Handler<E> 擦除为 ErasedHandler
pub struct HandlerWrapper<E> {
    inner: Arc<dyn Handler<E>>,
}

#[async_trait]
impl<E> ErasedHandler for HandlerWrapper<E>
where
    E: Send + Sync + 'static,
{
    async fn handle_erased(&self, event: &(dyn Any + Send + Sync)) {
        if let Some(e) = event.downcast_ref::<EventEnvelope<E>>() {
            self.inner.handle(e).await;
        }
    }
}

/// 内存事件总线，按事件类型分发
#[derive(Clone)]
pub struct InMemoryEventBus {
    handlers: Arc<RwLock<HashMap<TypeId, Vec<Arc<dyn ErasedHandler>>>>>,
    /// 是否异步触发处理器（不等待完成）
    fire_and_forget: bool,
}

impl InMemoryEventBus {
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(RwLock::new(HashMap::new())),
            fire_and_forget: false,
        }
    }

    /// 发布方不等待处理器完成，行为写路径使用这种模式
    pub fn new_async() -> Self {
        Self {
            handlers: Arc::new(RwLock::new(HashMap::new())),
            fire_and_forget: true,
        }
    }

    pub async fn handler_count<E: 'static>(&self) -> usize {
        self.handlers
            .read()
            .await
            .get(&TypeId::of::<E>())
            .map_or(0, |list| list.len())
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventBus for InMemoryEventBus {
    async fn publish<E>(&self, event: EventEnvelope<E>) -> Result<(), AppError>
    where
        E: Send + Sync + 'static,
    {
        let type_id = TypeId::of::<E>();

        let handlers: Option<Vec<Arc<dyn ErasedHandler>>> = {
            let guard = self.handlers.read().await;
            guard.get(&type_id).cloned()
        };

        if let Some(list) = handlers {
            if self.fire_and_forget {
                let event_arc = Arc::new(event);
                tokio::spawn(async move {
                    let futures = list.iter().map(|h| h.handle_erased(event_arc.as_ref()));
                    join_all(futures).await;
                });
            } else {
                let futures = list.iter().map(|h| h.handle_erased(&event));
                join_all(futures).await;
            }
        }
        Ok(())
    }

    async fn subscribe<E>(&mut self, handler: Arc<dyn Handler<E>>)
    where
        E: Send + Sync + 'static,
    {
        let wrapper = Arc::new(HandlerWrapper { inner: handler }) as Arc<dyn ErasedHandler>;
        self.handlers
            .write()
            .await
            .entry(TypeId::of::<E>())
            .or_default()
            .push(wrapper);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use application::context::AppContext;
    use domain::interaction::InteractionEvent;
    use domain::value::{UserId, VideoId};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting(Arc<AtomicUsize>);

    #[async_trait]
    impl Handler<InteractionEvent> for Counting {
        async fn handle(&self, _event: &EventEnvelope<InteractionEvent>) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn shared() -> EventEnvelope<InteractionEvent> {
        AppContext::new().envelope(InteractionEvent::Shared {
            video_id: VideoId::from(1),
            user_id: UserId::from(1),
        })
    }

    #[tokio::test]
    async fn test_publish_reaches_typed_handlers() {
        let hits = Arc::new(AtomicUsize::new(0));
        let mut bus = InMemoryEventBus::new();
        bus.subscribe::<InteractionEvent>(Arc::new(Counting(hits.clone())))
            .await;
        assert_eq!(bus.handler_count::<InteractionEvent>().await, 1);
        assert_eq!(bus.handler_count::<String>().await, 0);

        bus.publish(shared()).await.unwrap();
        bus.publish(EventEnvelope::new(
            0,
            0,
            "ignored".to_string(),
            Default::default(),
            Default::default(),
        ))
        .await
        .unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_async_bus_does_not_wait() {
        let hits = Arc::new(AtomicUsize::new(0));
        let mut bus = InMemoryEventBus::new_async();
        bus.subscribe::<InteractionEvent>(Arc::new(Counting(hits.clone())))
            .await;
        bus.publish(shared()).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
