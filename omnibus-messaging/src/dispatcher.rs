//! 处理器分发（HandlerDispatcher）
//!
//! 以事件名为键维护处理器列表，注册顺序即调用顺序。
//! 分发按顺序逐个 await；单个处理器失败被捕获并记录，
//! 不影响其余处理器，也不向传输的投递循环传播。
//!
use dashmap::DashMap;
use omnibus_domain::domain_event::DomainEvent;
use omnibus_domain::handler::EventHandler;
use std::sync::Arc;
use tracing::{error, warn};

/// 事件名 -> 处理器集合
#[derive(Default)]
pub struct HandlerDispatcher {
    handlers: DashMap<String, Vec<Arc<dyn EventHandler>>>,
}

impl HandlerDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// 在指定事件名下注册处理器（追加，保序）
    pub fn register(&self, event_name: impl Into<String>, handler: Arc<dyn EventHandler>) {
        self.handlers
            .entry(event_name.into())
            .or_default()
            .push(handler);
    }

    /// 指定事件名下已注册的处理器数量
    pub fn handler_count(&self, event_name: &str) -> usize {
        self.handlers.get(event_name).map(|h| h.len()).unwrap_or(0)
    }

    /// 分发事件：顺序调用事件名下的全部处理器，逐个隔离失败
    pub async fn dispatch(&self, event: Arc<dyn DomainEvent>) {
        // 克隆出临界区再逐个 await
        let matched: Vec<Arc<dyn EventHandler>> = self
            .handlers
            .get(event.event_name())
            .map(|h| h.clone())
            .unwrap_or_default();

        if matched.is_empty() {
            warn!(
                event_name = event.event_name(),
                "no handlers registered for event; dropped"
            );
            return;
        }

        for handler in matched {
            if let Err(err) = handler.handle(event.clone()).await {
                error!(
                    event_name = event.event_name(),
                    handler = handler.handler_name(),
                    error = %err,
                    "event handler failed; continuing with remaining handlers"
                );
            }
        }
    }
}
